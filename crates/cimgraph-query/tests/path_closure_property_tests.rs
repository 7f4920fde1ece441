use std::collections::{BTreeSet, HashMap, VecDeque};

use cimgraph_factdb::{FactGraph, Node};
use cimgraph_query::{evaluate, name, parse_path, var, Query};
use proptest::prelude::*;

const MAX_NODE: u8 = 8;

fn node(i: u8) -> Node {
    Node::iri(format!("http://example.org/n{i}"))
}

fn build(edges: &[(u8, u8, bool)]) -> FactGraph {
    let mut g = FactGraph::with_default_prefixes();
    g.register_prefix("ex", "http://example.org/");
    for &(s, o, is_p) in edges {
        let pred = if is_p { "P" } else { "Q" };
        g.add_statement(node(s), Node::iri(format!("http://example.org/{pred}")), node(o));
    }
    g
}

/// Reference: nodes reachable from `start` by zero or more P-edges.
fn reference_closure(edges: &[(u8, u8, bool)], start: u8) -> BTreeSet<u8> {
    let mut adj: HashMap<u8, Vec<u8>> = HashMap::new();
    for &(s, o, is_p) in edges {
        if is_p {
            adj.entry(s).or_default().push(o);
        }
    }
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(n) = queue.pop_front() {
        for &next in adj.get(&n).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

fn index_of(g: &FactGraph, term: &cimgraph_factdb::Term) -> u8 {
    let local = g.compact_term(term);
    local.trim_start_matches('n').parse().unwrap()
}

fn edges_strategy() -> impl Strategy<Value = Vec<(u8, u8, bool)>> {
    prop::collection::vec((0..MAX_NODE, 0..MAX_NODE, any::<bool>()), 0..30)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn forward_closure_matches_reference_bfs(edges in edges_strategy(), start in 0..MAX_NODE) {
        let g = build(&edges);
        let q = Query::builder()
            .path(name(&format!("ex:n{start}")), parse_path("ex:P*").unwrap(), var("y"))
            .build();
        let rows = evaluate(&g, &q).unwrap();
        let got: BTreeSet<u8> = rows.iter().map(|r| index_of(&g, r.get("y").unwrap())).collect();
        // Set semantics: no duplicate rows.
        prop_assert_eq!(got.len(), rows.len());

        let expected = if g.node_id(&node(start)).is_some() {
            reference_closure(&edges, start)
        } else {
            BTreeSet::new()
        };
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn backward_and_free_evaluation_agree_with_forward(edges in edges_strategy()) {
        let g = build(&edges);
        let path = parse_path("ex:P*/ex:Q").unwrap();

        let free = Query::builder().path(var("x"), path.clone(), var("y")).build();
        let free_pairs: BTreeSet<(u8, u8)> = evaluate(&g, &free)
            .unwrap()
            .iter()
            .map(|r| (index_of(&g, r.get("x").unwrap()), index_of(&g, r.get("y").unwrap())))
            .collect();

        let mut expected: BTreeSet<(u8, u8)> = BTreeSet::new();
        for start in 0..MAX_NODE {
            if g.node_id(&node(start)).is_none() {
                continue;
            }
            for mid in reference_closure(&edges, start) {
                for &(s, o, is_p) in &edges {
                    if !is_p && s == mid {
                        expected.insert((start, o));
                    }
                }
            }
        }
        prop_assert_eq!(&free_pairs, &expected);

        for end in 0..MAX_NODE {
            let q = Query::builder()
                .path(var("x"), path.clone(), name(&format!("ex:n{end}")))
                .build();
            let starts: BTreeSet<u8> = evaluate(&g, &q)
                .unwrap()
                .iter()
                .map(|r| index_of(&g, r.get("x").unwrap()))
                .collect();
            let want: BTreeSet<u8> = expected
                .iter()
                .filter(|(_, o)| *o == end)
                .map(|(s, _)| *s)
                .collect();
            prop_assert_eq!(starts, want);
        }
    }
}
