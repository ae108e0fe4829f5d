//! Turtle and N-Triples format implementation

use crate::rdf::{BlankNode, Literal, NamedNode, RdfObject, RdfPredicate, RdfSubject, Triple};
use super::{ParseError, ParseResult, SerializeError, SerializeResult};
use rio_api::formatter::TriplesFormatter;
use rio_api::model;
use rio_api::parser::TriplesParser;
use rio_turtle::{NTriplesFormatter, NTriplesParser, TurtleFormatter, TurtleParser};
use std::io::Cursor;

/// Parse a Turtle document
pub fn parse_turtle(input: &str) -> ParseResult<Vec<Triple>> {
    collect(TurtleParser::new(Cursor::new(input), None))
}

/// Parse an N-Triples document
pub fn parse_ntriples(input: &str) -> ParseResult<Vec<Triple>> {
    collect(NTriplesParser::new(Cursor::new(input)))
}

/// Serialize triples as Turtle
pub fn write_turtle(triples: &[Triple]) -> SerializeResult<String> {
    let mut formatter = TurtleFormatter::new(Vec::new());
    format_all(&mut formatter, triples)?;
    into_string(formatter.finish()?)
}

/// Serialize triples as N-Triples
pub fn write_ntriples(triples: &[Triple]) -> SerializeResult<String> {
    let mut formatter = NTriplesFormatter::new(Vec::new());
    format_all(&mut formatter, triples)?;
    into_string(formatter.finish()?)
}

fn collect<P>(mut parser: P) -> ParseResult<Vec<Triple>>
where
    P: TriplesParser,
    ParseError: From<P::Error>,
{
    let mut triples = Vec::new();
    parser.parse_all(&mut |t| -> Result<(), ParseError> {
        triples.push(Triple::new(
            convert_subject(t.subject)?,
            convert_predicate(t.predicate)?,
            convert_object(t.object)?,
        ));
        Ok(())
    })?;
    Ok(triples)
}

fn format_all<F>(formatter: &mut F, triples: &[Triple]) -> SerializeResult<()>
where
    F: TriplesFormatter,
    F::Error: std::fmt::Display,
{
    for triple in triples {
        let subject = match &triple.subject {
            RdfSubject::NamedNode(n) => model::Subject::NamedNode(model::NamedNode { iri: n.as_str() }),
            RdfSubject::BlankNode(b) => model::Subject::BlankNode(model::BlankNode { id: b.as_str() }),
        };
        let predicate = model::NamedNode { iri: triple.predicate.as_named_node().as_str() };
        let object = match &triple.object {
            RdfObject::NamedNode(n) => model::Term::NamedNode(model::NamedNode { iri: n.as_str() }),
            RdfObject::BlankNode(b) => model::Term::BlankNode(model::BlankNode { id: b.as_str() }),
            RdfObject::Literal(l) => model::Term::Literal(match l.language() {
                Some(language) => model::Literal::LanguageTaggedString { value: l.value(), language },
                None if l.is_simple() => model::Literal::Simple { value: l.value() },
                None => model::Literal::Typed {
                    value: l.value(),
                    datatype: model::NamedNode { iri: l.datatype_iri() },
                },
            }),
        };

        formatter
            .format(&model::Triple { subject, predicate, object })
            .map_err(|e| SerializeError::Serialize(e.to_string()))?;
    }
    Ok(())
}

fn into_string(bytes: Vec<u8>) -> SerializeResult<String> {
    String::from_utf8(bytes).map_err(|e| SerializeError::Serialize(e.to_string()))
}

fn convert_subject(s: model::Subject<'_>) -> ParseResult<RdfSubject> {
    match s {
        model::Subject::NamedNode(n) => Ok(RdfSubject::NamedNode(named(n)?)),
        model::Subject::BlankNode(b) => Ok(RdfSubject::BlankNode(blank(b)?)),
        _ => Err(ParseError::Parse("Unsupported subject type".to_string())),
    }
}

fn convert_predicate(p: model::NamedNode<'_>) -> ParseResult<RdfPredicate> {
    Ok(named(p)?.into())
}

fn convert_object(o: model::Term<'_>) -> ParseResult<RdfObject> {
    match o {
        model::Term::NamedNode(n) => Ok(RdfObject::NamedNode(named(n)?)),
        model::Term::BlankNode(b) => Ok(RdfObject::BlankNode(blank(b)?)),
        model::Term::Literal(model::Literal::Simple { value }) => {
            Ok(RdfObject::Literal(Literal::new_simple_literal(value)))
        }
        model::Term::Literal(model::Literal::LanguageTaggedString { value, language }) => {
            Literal::new_language_tagged_literal(value, language)
                .map(RdfObject::Literal)
                .map_err(|e| ParseError::Parse(e.to_string()))
        }
        model::Term::Literal(model::Literal::Typed { value, datatype }) => {
            Ok(RdfObject::Literal(Literal::new_typed_literal(value, named(datatype)?)))
        }
        _ => Err(ParseError::Parse("Unsupported object type".to_string())),
    }
}

fn named(n: model::NamedNode<'_>) -> ParseResult<NamedNode> {
    NamedNode::new(n.iri).map_err(|e| ParseError::Parse(e.to_string()))
}

fn blank(b: model::BlankNode<'_>) -> ParseResult<BlankNode> {
    BlankNode::from_id(b.id).map_err(|e| ParseError::Parse(e.to_string()))
}
