use anyhow::Result;
use cimgraph_factdb::{FactDbError, FactGraph, Literal, Node, Term};
use cimgraph_query::{
    evaluate, name, parse_path, var, Clause, Expr, Operand, OrderKey, PathExpr, Query, QueryError,
    Solutions,
};

const EX: &str = "http://example.org/";

fn graph(edges: &[(&str, &str, &str)]) -> FactGraph {
    let mut g = FactGraph::with_default_prefixes();
    g.register_prefix("ex", EX);
    for (s, p, o) in edges {
        g.add_prefixed(&format!("ex:{s}"), &format!("ex:{p}"), &format!("ex:{o}"))
            .unwrap();
    }
    g
}

fn ex(local: &str) -> Node {
    Node::iri(format!("{EX}{local}"))
}

fn cells(g: &FactGraph, rows: &Solutions, vars: &[&str]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            vars.iter()
                .map(|v| row.get(v).map(|t| g.compact_term(t)).unwrap_or_default())
                .collect()
        })
        .collect()
}

fn sorted(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    rows.sort();
    rows
}

fn closure_query(subject: cimgraph_query::TermPattern, object: cimgraph_query::TermPattern) -> Query {
    let path = PathExpr::seq([
        PathExpr::zero_or_more(PathExpr::link("ex:P")),
        PathExpr::link("ex:Q"),
    ]);
    Query::builder().path(subject, path, object).build()
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn closure_then_step_binds_every_reaching_start() -> Result<()> {
    let g = graph(&[("a", "P", "b"), ("b", "P", "c"), ("c", "Q", "d")]);
    let rows = evaluate(&g, &closure_query(var("x"), var("y")))?;
    assert_eq!(
        sorted(cells(&g, &rows, &["x", "y"])),
        vec![
            vec!["a".to_string(), "d".to_string()],
            vec!["b".to_string(), "d".to_string()],
            vec!["c".to_string(), "d".to_string()],
        ]
    );
    Ok(())
}

#[test]
fn closure_terminates_on_cycles() -> Result<()> {
    let g = graph(&[
        ("a", "P", "b"),
        ("b", "P", "c"),
        ("c", "P", "a"),
        ("c", "Q", "d"),
    ]);
    let rows = evaluate(&g, &closure_query(var("x"), var("y")))?;
    assert_eq!(rows.len(), 3);

    // Backward from a bound object.
    let rows = evaluate(&g, &closure_query(var("x"), name("ex:d")))?;
    let mut starts: Vec<_> = cells(&g, &rows, &["x"]).into_iter().flatten().collect();
    starts.sort();
    assert_eq!(starts, vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn closure_is_reflexive_and_deduplicated() -> Result<()> {
    // Two routes a -> c; the pair is reported once.
    let g = graph(&[("a", "P", "b"), ("a", "P", "c"), ("b", "P", "c")]);
    let q = Query::builder()
        .path(name("ex:a"), parse_path("ex:P*")?, var("y"))
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(
        sorted(cells(&g, &rows, &["y"])),
        vec![vec!["a".to_string()], vec!["b".to_string()], vec!["c".to_string()]]
    );
    Ok(())
}

#[test]
fn path_with_both_ends_bound_checks_reachability() -> Result<()> {
    let g = graph(&[("a", "P", "b"), ("b", "Q", "c")]);
    let yes = Query::builder()
        .path(name("ex:a"), parse_path("ex:P/ex:Q")?, name("ex:c"))
        .build();
    let no = Query::builder()
        .path(name("ex:b"), parse_path("ex:P/ex:Q")?, name("ex:c"))
        .build();
    assert_eq!(evaluate(&g, &yes)?.len(), 1);
    assert_eq!(evaluate(&g, &no)?.len(), 0);
    Ok(())
}

// ============================================================================
// Optional groups
// ============================================================================

fn labelled_graph() -> FactGraph {
    let mut g = graph(&[("s1", "type", "T"), ("s2", "type", "T")]);
    g.add_statement(ex("s1"), ex("label"), Literal::plain("one"));
    g.add_statement(ex("s1"), ex("label"), Literal::plain("uno"));
    g
}

#[test]
fn optional_keeps_unmatched_rows_once_and_multiplies_matches() -> Result<()> {
    let g = labelled_graph();
    let q = Query::builder()
        .triple(var("s"), name("ex:type"), name("ex:T"))
        .optional([Clause::triple(var("s"), name("ex:label"), var("l"))])
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(
        cells(&g, &rows, &["s", "l"]),
        vec![
            vec!["s1".to_string(), "one".to_string()],
            vec!["s1".to_string(), "uno".to_string()],
            vec!["s2".to_string(), String::new()],
        ]
    );
    assert!(!rows.rows()[2].is_bound("l"));
    Ok(())
}

#[test]
fn optional_group_is_all_or_nothing() -> Result<()> {
    let g = labelled_graph();
    // The second clause never matches, so the whole group contributes nothing.
    let q = Query::builder()
        .triple(var("s"), name("ex:type"), name("ex:T"))
        .optional([
            Clause::triple(var("s"), name("ex:label"), var("l")),
            Clause::triple(var("s"), name("ex:missing"), var("m")),
        ])
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| !r.is_bound("l") && !r.is_bound("m")));
    Ok(())
}

// ============================================================================
// Modifiers
// ============================================================================

#[test]
fn order_by_is_stable_and_puts_unbound_first() -> Result<()> {
    let g = labelled_graph();
    let q = Query::builder()
        .triple(var("s"), name("ex:type"), name("ex:T"))
        .optional([Clause::triple(var("s"), name("ex:label"), var("l"))])
        .order_key(OrderKey::asc("l"))
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(
        cells(&g, &rows, &["s", "l"])[0],
        vec!["s2".to_string(), String::new()]
    );

    // All keys equal: evaluation order survives.
    let q = Query::builder()
        .triple(var("s"), name("ex:type"), var("t"))
        .order_by(["t"])
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(cells(&g, &rows, &["s"]), vec![vec!["s1"], vec!["s2"]]);
    Ok(())
}

#[test]
fn numeric_literals_order_numerically() -> Result<()> {
    let mut g = graph(&[]);
    g.add_statement(ex("a"), ex("v"), Literal::integer(10));
    g.add_statement(ex("b"), ex("v"), Literal::integer(2));
    let q = Query::builder()
        .triple(var("s"), name("ex:v"), var("v"))
        .order_by(["v"])
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(cells(&g, &rows, &["v"]), vec![vec!["2"], vec!["10"]]);
    Ok(())
}

#[test]
fn distinct_collapses_projected_duplicates() -> Result<()> {
    let g = labelled_graph();
    let q = Query::builder()
        .triple(var("s"), name("ex:type"), var("t"))
        .select(["t"])
        .distinct()
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(rows.vars(), ["t".to_string()]);
    assert_eq!(cells(&g, &rows, &["t"]), vec![vec!["T"]]);
    Ok(())
}

#[test]
fn count_returns_one_row_even_when_empty() -> Result<()> {
    let g = labelled_graph();
    let q = Query::builder()
        .triple(var("s"), name("ex:type"), name("ex:T"))
        .count("s", "total")
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.count_value("total"), Some(2));
    assert_eq!(
        rows.rows()[0].literal("total"),
        Some(&Literal::integer(2))
    );

    let q = Query::builder()
        .triple(var("s"), name("ex:type"), name("ex:Nothing"))
        .count("s", "total")
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.count_value("total"), Some(0));
    Ok(())
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn filter_over_never_bound_variable_drops_rows() -> Result<()> {
    let g = labelled_graph();
    let q = Query::builder()
        .triple(var("s"), name("ex:type"), name("ex:T"))
        .filter(Expr::eq(Operand::var("ghost"), Operand::int(1)))
        .build();
    assert!(evaluate(&g, &q)?.is_empty());

    let q = Query::builder()
        .triple(var("s"), name("ex:type"), name("ex:T"))
        .filter(Expr::bound("ghost").not())
        .build();
    assert_eq!(evaluate(&g, &q)?.len(), 2);
    Ok(())
}

#[test]
fn error_or_true_passes_error_and_true_drops() -> Result<()> {
    let g = labelled_graph();
    let err = Expr::eq(Operand::var("ghost"), Operand::int(1));
    let q = Query::builder()
        .triple(var("s"), name("ex:type"), name("ex:T"))
        .filter(err.clone().or(Expr::bound("s")))
        .build();
    assert_eq!(evaluate(&g, &q)?.len(), 2);

    let q = Query::builder()
        .triple(var("s"), name("ex:type"), name("ex:T"))
        .filter(err.and(Expr::bound("s")))
        .build();
    assert_eq!(evaluate(&g, &q)?.len(), 0);
    Ok(())
}

#[test]
fn not_equal_against_a_name_and_integer_cast() -> Result<()> {
    let mut g = graph(&[("p1", "datatype", "id"), ("p2", "datatype", "text")]);
    g.add_statement(ex("p1"), ex("minCount"), Literal::plain("1"));
    g.add_statement(ex("p2"), ex("minCount"), Literal::plain("none"));

    let q = Query::builder()
        .triple(var("p"), name("ex:datatype"), var("dt"))
        .filter(Expr::ne(Operand::var("dt"), Operand::name("ex:id")))
        .build();
    assert_eq!(cells(&g, &evaluate(&g, &q)?, &["p"]), vec![vec!["p2"]]);

    // An unparseable count is an error, not zero.
    let q = Query::builder()
        .triple(var("p"), name("ex:minCount"), var("m"))
        .select(["p"])
        .select_bind(
            "required",
            Expr::gt(Operand::integer_of("m"), Operand::int(0)),
        )
        .order_by(["p"])
        .build();
    let rows = evaluate(&g, &q)?;
    assert_eq!(rows.vars(), ["p".to_string(), "required".to_string()]);
    assert_eq!(
        rows.rows()[0].get("required"),
        Some(&Term::Literal(Literal::boolean(true)))
    );
    assert_eq!(rows.rows()[1].get("required"), None);
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn unknown_prefix_is_an_error_before_evaluation() {
    let g = labelled_graph();
    let q = Query::builder()
        .triple(var("s"), name("rdf:type"), name("nope:Thing"))
        .build();
    let err = evaluate(&g, &q).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Resolve(FactDbError::UnknownPrefix { ref prefix, .. }) if prefix == "nope"
    ));

    let q = Query::builder()
        .path(var("s"), PathExpr::link("nope:p"), var("o"))
        .build();
    assert!(matches!(evaluate(&g, &q), Err(QueryError::Resolve(_))));
}

#[test]
fn constants_missing_from_the_graph_match_nothing() -> Result<()> {
    let g = labelled_graph();
    let q = Query::builder()
        .triple(var("s"), name("ex:neverUsed"), var("o"))
        .build();
    assert!(evaluate(&g, &q)?.is_empty());
    Ok(())
}

#[test]
fn repeated_variable_must_bind_the_same_value() -> Result<()> {
    let g = graph(&[("a", "P", "a"), ("a", "P", "b")]);
    let q = Query::builder()
        .triple(var("x"), name("ex:P"), var("x"))
        .build();
    assert_eq!(cells(&g, &evaluate(&g, &q)?, &["x"]), vec![vec!["a"]]);
    Ok(())
}
