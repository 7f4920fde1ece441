//! Text syntax for property paths.
//!
//! ```text
//! path  := step ( "/" step )*
//! step  := atom "*"*
//! atom  := prefix:local | <iri> | a | "(" path ")"
//! ```
//!
//! `a` abbreviates `rdf:type`.

use std::str::FromStr;

use cimgraph_factdb::vocab::rdf;
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_while, take_while1};
use nom::character::complete::{char as pchar, multispace0};
use nom::combinator::{all_consuming, map, not, opt, peek, recognize, value};
use nom::multi::{many0_count, separated_list1};
use nom::sequence::{delimited, pair, terminated, tuple};
use nom::IResult;

use crate::ast::{mk_seq, Name, PathExpr};
use crate::QueryError;

/// Parse a path such as `sh:and*/sh:property/sh:path`.
pub fn parse_path(input: &str) -> Result<PathExpr, QueryError> {
    match all_consuming(ws(path_seq))(input) {
        Ok((_, path)) => Ok(path),
        Err(e) => Err(QueryError::PathSyntax {
            input: input.to_string(),
            message: describe(e),
        }),
    }
}

impl FromStr for PathExpr {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s)
    }
}

fn describe(e: nom::Err<nom::error::Error<&str>>) -> String {
    match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            if e.input.is_empty() {
                "unexpected end of input".to_string()
            } else {
                format!("unexpected `{}`", e.input)
            }
        }
        nom::Err::Incomplete(_) => "incomplete input".to_string(),
    }
}

fn path_seq(input: &str) -> IResult<&str, PathExpr> {
    map(separated_list1(ws(pchar('/')), path_step), mk_seq)(input)
}

fn path_step(input: &str) -> IResult<&str, PathExpr> {
    map(
        pair(ws(path_atom), many0_count(ws(pchar('*')))),
        |(atom, stars)| {
            // `p**` is the same closure as `p*`.
            if stars > 0 {
                PathExpr::ZeroOrMore(Box::new(atom))
            } else {
                atom
            }
        },
    )(input)
}

fn path_atom(input: &str) -> IResult<&str, PathExpr> {
    alt((
        map(prefixed_name, |n| PathExpr::Link(Name::Prefixed(n))),
        map(iri_ref, |iri| PathExpr::Link(Name::Iri(iri))),
        value(
            PathExpr::Link(Name::Iri(rdf::TYPE.to_string())),
            terminated(tag("a"), not(peek(take_while1(is_local_char)))),
        ),
        delimited(ws(pchar('(')), path_seq, ws(pchar(')'))),
    ))(input)
}

fn prefixed_name(input: &str) -> IResult<&str, String> {
    map(
        recognize(tuple((
            opt(pair(take_while1(is_prefix_start), take_while(is_local_char))),
            pchar(':'),
            take_while(is_local_char),
        ))),
        |s: &str| s.to_string(),
    )(input)
}

fn iri_ref(input: &str) -> IResult<&str, String> {
    map(delimited(pchar('<'), is_not("<>\" {}|^`\\"), pchar('>')), |s: &str| {
        s.to_string()
    })(input)
}

fn is_prefix_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_paths() {
        let p = parse_path("sh:and*/sh:property/sh:path").unwrap();
        assert_eq!(
            p,
            PathExpr::Seq(vec![
                PathExpr::zero_or_more(PathExpr::link("sh:and")),
                PathExpr::link("sh:property"),
                PathExpr::link("sh:path"),
            ])
        );
        assert_eq!(parse_path("sh:property").unwrap(), PathExpr::link("sh:property"));
    }

    #[test]
    fn parses_iris_keyword_and_groups() {
        let p = parse_path("( <http://x/p> / a )*").unwrap();
        let PathExpr::ZeroOrMore(inner) = p else {
            panic!("expected closure");
        };
        assert_eq!(
            *inner,
            PathExpr::Seq(vec![
                PathExpr::Link(Name::Iri("http://x/p".into())),
                PathExpr::Link(Name::Iri(rdf::TYPE.into())),
            ])
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "sh:and/", "/sh:and", "sh:and+", "(sh:and", "abc", "<http://x"] {
            let err = parse_path(bad).unwrap_err();
            assert!(
                matches!(err, QueryError::PathSyntax { .. }),
                "expected syntax error for {bad:?}"
            );
        }
    }

    #[test]
    fn display_parses_back() {
        let text = "(sh:and/sh:or)*/sh:node";
        let p: PathExpr = text.parse().unwrap();
        assert_eq!(p.to_string(), text);
        assert_eq!(parse_path(&p.to_string()).unwrap(), p);
    }
}
