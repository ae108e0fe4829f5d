//! FILTER expressions
//!
//! The set of supported expressions is closed. Evaluation follows SPARQL value
//! semantics closely enough for row filtering: numeric literals compare by value,
//! other literals by lexical form, resources only by identity.

use super::algebra::Variable;
use super::results::RowView;
use super::{SparqlError, SparqlResult};
use crate::rdf::{Literal, NamedNode, RdfTerm, XSD};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use thiserror::Error;

/// Filter evaluation errors
///
/// The group evaluator treats any of these as the filter rejecting the row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Unbound variable: {0}")]
    Unbound(Variable),

    #[error("Type error: {0}")]
    Type(String),
}

pub type FilterResult<T> = Result<T, FilterError>;

/// Expression tree
#[derive(Debug, Clone)]
pub enum Expression {
    Variable(Variable),
    Constant(RdfTerm),
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    Less(Box<Expression>, Box<Expression>),
    LessOrEqual(Box<Expression>, Box<Expression>),
    Greater(Box<Expression>, Box<Expression>),
    GreaterOrEqual(Box<Expression>, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Bound(Variable),
    IsIri(Box<Expression>),
    IsBlank(Box<Expression>),
    IsLiteral(Box<Expression>),
    Str(Box<Expression>),
    Lang(Box<Expression>),
    Datatype(Box<Expression>),
    Contains(Box<Expression>, Box<Expression>),
    StrStarts(Box<Expression>, Box<Expression>),
    /// Precompiled pattern applied to the string value of the operand
    Regex(Box<Expression>, Regex),
}

impl Expression {
    pub fn var(name: &str) -> Self {
        Expression::Variable(Variable::new(name))
    }

    pub fn constant(term: impl Into<RdfTerm>) -> Self {
        Expression::Constant(term.into())
    }

    pub fn equal(left: Expression, right: Expression) -> Self {
        Expression::Equal(Box::new(left), Box::new(right))
    }

    pub fn not_equal(left: Expression, right: Expression) -> Self {
        Expression::NotEqual(Box::new(left), Box::new(right))
    }

    pub fn less(left: Expression, right: Expression) -> Self {
        Expression::Less(Box::new(left), Box::new(right))
    }

    pub fn less_or_equal(left: Expression, right: Expression) -> Self {
        Expression::LessOrEqual(Box::new(left), Box::new(right))
    }

    pub fn greater(left: Expression, right: Expression) -> Self {
        Expression::Greater(Box::new(left), Box::new(right))
    }

    pub fn greater_or_equal(left: Expression, right: Expression) -> Self {
        Expression::GreaterOrEqual(Box::new(left), Box::new(right))
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    pub fn bound(name: &str) -> Self {
        Expression::Bound(Variable::new(name))
    }

    pub fn is_iri(inner: Expression) -> Self {
        Expression::IsIri(Box::new(inner))
    }

    pub fn is_blank(inner: Expression) -> Self {
        Expression::IsBlank(Box::new(inner))
    }

    pub fn is_literal(inner: Expression) -> Self {
        Expression::IsLiteral(Box::new(inner))
    }

    pub fn str(inner: Expression) -> Self {
        Expression::Str(Box::new(inner))
    }

    pub fn lang(inner: Expression) -> Self {
        Expression::Lang(Box::new(inner))
    }

    pub fn datatype(inner: Expression) -> Self {
        Expression::Datatype(Box::new(inner))
    }

    pub fn contains(haystack: Expression, needle: Expression) -> Self {
        Expression::Contains(Box::new(haystack), Box::new(needle))
    }

    pub fn str_starts(haystack: Expression, prefix: Expression) -> Self {
        Expression::StrStarts(Box::new(haystack), Box::new(prefix))
    }

    /// `REGEX(text, pattern, flags)`; flags may contain `i`, `m`, `s` and `x`
    pub fn regex(text: Expression, pattern: &str, flags: &str) -> SparqlResult<Self> {
        let mut builder = RegexBuilder::new(pattern);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    return Err(SparqlError::InvalidFilter(format!("unsupported regex flag '{}'", other)))
                }
            };
        }
        let regex = builder
            .build()
            .map_err(|e| SparqlError::InvalidFilter(e.to_string()))?;
        Ok(Expression::Regex(Box::new(text), regex))
    }

    /// Evaluate to a term; boolean results are `xsd:boolean` literals
    pub fn evaluate(&self, row: &RowView<'_>) -> FilterResult<RdfTerm> {
        match self {
            Expression::Variable(v) => row.get(v).cloned().ok_or_else(|| FilterError::Unbound(v.clone())),
            Expression::Constant(t) => Ok(t.clone()),
            Expression::Str(inner) => match inner.evaluate(row)? {
                RdfTerm::NamedNode(n) => Ok(Literal::new_simple_literal(n.as_str()).into()),
                RdfTerm::Literal(l) => Ok(Literal::new_simple_literal(l.value()).into()),
                RdfTerm::BlankNode(b) => Err(FilterError::Type(format!("STR of blank node {}", b))),
            },
            Expression::Lang(inner) => {
                let literal = as_literal(inner.evaluate(row)?)?;
                Ok(Literal::new_simple_literal(literal.language().unwrap_or_default()).into())
            }
            Expression::Datatype(inner) => {
                let literal = as_literal(inner.evaluate(row)?)?;
                Ok(literal.datatype().into())
            }
            _ => self.test(row).map(|b| Literal::boolean(b).into()),
        }
    }

    /// Evaluate to an effective boolean value
    pub fn test(&self, row: &RowView<'_>) -> FilterResult<bool> {
        match self {
            Expression::Equal(l, r) => equals(&l.evaluate(row)?, &r.evaluate(row)?),
            Expression::NotEqual(l, r) => equals(&l.evaluate(row)?, &r.evaluate(row)?).map(|b| !b),
            Expression::Less(l, r) => Ok(compare(&l.evaluate(row)?, &r.evaluate(row)?)? == Ordering::Less),
            Expression::LessOrEqual(l, r) => {
                Ok(compare(&l.evaluate(row)?, &r.evaluate(row)?)? != Ordering::Greater)
            }
            Expression::Greater(l, r) => Ok(compare(&l.evaluate(row)?, &r.evaluate(row)?)? == Ordering::Greater),
            Expression::GreaterOrEqual(l, r) => {
                Ok(compare(&l.evaluate(row)?, &r.evaluate(row)?)? != Ordering::Less)
            }
            // Logical connectives tolerate an error on one side when the other decides
            Expression::And(l, r) => match (l.test(row), r.test(row)) {
                (Ok(false), _) | (_, Ok(false)) => Ok(false),
                (Ok(true), Ok(true)) => Ok(true),
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            Expression::Or(l, r) => match (l.test(row), r.test(row)) {
                (Ok(true), _) | (_, Ok(true)) => Ok(true),
                (Ok(false), Ok(false)) => Ok(false),
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            Expression::Not(inner) => inner.test(row).map(|b| !b),
            Expression::Bound(v) => Ok(row.get(v).is_some()),
            Expression::IsIri(inner) => Ok(inner.evaluate(row)?.is_named_node()),
            Expression::IsBlank(inner) => Ok(inner.evaluate(row)?.is_blank_node()),
            Expression::IsLiteral(inner) => Ok(inner.evaluate(row)?.is_literal()),
            Expression::Contains(h, n) => {
                let (haystack, needle) = (string_value(&h.evaluate(row)?)?, string_value(&n.evaluate(row)?)?);
                Ok(haystack.contains(&needle))
            }
            Expression::StrStarts(h, p) => {
                let (haystack, prefix) = (string_value(&h.evaluate(row)?)?, string_value(&p.evaluate(row)?)?);
                Ok(haystack.starts_with(&prefix))
            }
            Expression::Regex(text, regex) => Ok(regex.is_match(&string_value(&text.evaluate(row)?)?)),
            Expression::Variable(_) | Expression::Constant(_) | Expression::Str(_) | Expression::Lang(_)
            | Expression::Datatype(_) => effective_boolean_value(&self.evaluate(row)?),
        }
    }
}

/// Row predicate used by pattern groups
#[derive(Debug, Clone)]
pub struct Filter {
    expression: Expression,
}

impl Filter {
    pub fn new(expression: Expression) -> Self {
        Self { expression }
    }

    /// `FILTER REGEX(?var, pattern, flags)`, compiled once
    pub fn regex(variable: &str, pattern: &str, flags: &str) -> SparqlResult<Self> {
        Ok(Self::new(Expression::regex(Expression::var(variable), pattern, flags)?))
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Whether the row passes; errors are returned, not swallowed
    pub fn evaluate(&self, row: &RowView<'_>) -> FilterResult<bool> {
        self.expression.test(row)
    }
}

impl From<Expression> for Filter {
    fn from(expression: Expression) -> Self {
        Filter::new(expression)
    }
}

fn as_literal(term: RdfTerm) -> FilterResult<Literal> {
    match term {
        RdfTerm::Literal(l) => Ok(l),
        other => Err(FilterError::Type(format!("{} is not a literal", other))),
    }
}

fn is_string_like(literal: &Literal) -> bool {
    literal.language().is_some() || literal.datatype_iri() == format!("{}string", XSD)
}

fn string_value(term: &RdfTerm) -> FilterResult<String> {
    match term {
        RdfTerm::Literal(l) if is_string_like(l) => Ok(l.value().to_string()),
        other => Err(FilterError::Type(format!("{} is not a string", other))),
    }
}

/// SPARQL effective boolean value
pub fn effective_boolean_value(term: &RdfTerm) -> FilterResult<bool> {
    let literal = term
        .as_literal()
        .ok_or_else(|| FilterError::Type(format!("no boolean value for {}", term)))?;
    if literal.is_boolean() {
        return Ok(matches!(literal.value(), "true" | "1"));
    }
    if literal.is_numeric() {
        return literal
            .as_f64()
            .map(|v| v != 0.0 && !v.is_nan())
            .ok_or_else(|| FilterError::Type(format!("malformed number {}", literal)));
    }
    if is_string_like(literal) {
        return Ok(!literal.value().is_empty());
    }
    Err(FilterError::Type(format!("no boolean value for {}", literal)))
}

fn equals(left: &RdfTerm, right: &RdfTerm) -> FilterResult<bool> {
    match (left, right) {
        (RdfTerm::Literal(a), RdfTerm::Literal(b)) if a.is_numeric() && b.is_numeric() => {
            Ok(numeric_cmp(a, b)? == Ordering::Equal)
        }
        _ => Ok(left == right),
    }
}

fn numeric_cmp(a: &Literal, b: &Literal) -> FilterResult<Ordering> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x
            .partial_cmp(&y)
            .ok_or_else(|| FilterError::Type(format!("cannot compare {} and {}", a, b))),
        _ => Err(FilterError::Type(format!("malformed number in {} or {}", a, b))),
    }
}

fn compare(left: &RdfTerm, right: &RdfTerm) -> FilterResult<Ordering> {
    match (left, right) {
        (RdfTerm::Literal(a), RdfTerm::Literal(b)) => {
            if a.is_numeric() && b.is_numeric() {
                numeric_cmp(a, b)
            } else if a.datatype_iri() == b.datatype_iri() && a.language() == b.language() {
                Ok(a.value().cmp(b.value()))
            } else {
                Err(FilterError::Type(format!("cannot compare {} and {}", a, b)))
            }
        }
        _ => Err(FilterError::Type(format!("cannot order {} and {}", left, right))),
    }
}

/// Datatype IRI helper for constants in expressions
pub fn xsd(local: &str) -> SparqlResult<NamedNode> {
    Ok(NamedNode::new(&format!("{}{}", XSD, local))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;

    fn ex(local: &str) -> RdfTerm {
        NamedNode::new(&format!("http://example.org/{}", local)).unwrap().into()
    }

    fn check(filter: &Filter, bindings: &[(&str, Option<RdfTerm>)]) -> FilterResult<bool> {
        let columns: IndexSet<Variable> = bindings.iter().map(|(n, _)| Variable::new(n)).collect();
        let row: Vec<Option<RdfTerm>> = bindings.iter().map(|(_, t)| t.clone()).collect();
        filter.evaluate(&RowView::new(&columns, &row))
    }

    #[test]
    fn test_numeric_comparison() {
        let filter = Filter::new(Expression::greater(Expression::var("age"), Expression::constant(Literal::integer(30))));
        assert_eq!(check(&filter, &[("age", Some(Literal::integer(42).into()))]), Ok(true));
        assert_eq!(check(&filter, &[("age", Some(Literal::decimal(12.5).into()))]), Ok(false));
    }

    #[test]
    fn test_numeric_equality_across_types() {
        let filter = Filter::new(Expression::equal(
            Expression::constant(Literal::integer(2)),
            Expression::constant(Literal::decimal(2.0)),
        ));
        assert_eq!(check(&filter, &[]), Ok(true));
    }

    #[test]
    fn test_unbound_is_error() {
        let filter = Filter::new(Expression::equal(Expression::var("x"), Expression::constant(ex("a"))));
        assert!(matches!(check(&filter, &[("x", None)]), Err(FilterError::Unbound(_))));
    }

    #[test]
    fn test_bound_and_not() {
        let filter = Filter::new(Expression::not(Expression::bound("x")));
        assert_eq!(check(&filter, &[("x", None)]), Ok(true));
        assert_eq!(check(&filter, &[("x", Some(ex("a")))]), Ok(false));
    }

    #[test]
    fn test_or_tolerates_error_when_other_side_true() {
        let filter = Filter::new(Expression::or(
            Expression::equal(Expression::var("missing"), Expression::constant(ex("a"))),
            Expression::is_iri(Expression::var("x")),
        ));
        assert_eq!(check(&filter, &[("x", Some(ex("a"))), ("missing", None)]), Ok(true));
    }

    #[test]
    fn test_regex_and_strings() {
        let filter = Filter::regex("name", "^al", "i").unwrap();
        assert_eq!(check(&filter, &[("name", Some(Literal::new_simple_literal("Alice").into()))]), Ok(true));
        assert_eq!(check(&filter, &[("name", Some(Literal::new_simple_literal("Bob").into()))]), Ok(false));
        assert!(check(&filter, &[("name", Some(ex("alice")))]).is_err());

        let contains = Filter::new(Expression::contains(
            Expression::str(Expression::var("s")),
            Expression::constant(Literal::new_simple_literal("example")),
        ));
        assert_eq!(check(&contains, &[("s", Some(ex("a")))]), Ok(true));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(Filter::regex("x", "(", ""), Err(SparqlError::InvalidFilter(_))));
        assert!(matches!(Filter::regex("x", "a", "q"), Err(SparqlError::InvalidFilter(_))));
    }

    #[test]
    fn test_lang_and_datatype() {
        let lang = Filter::new(Expression::equal(
            Expression::lang(Expression::var("l")),
            Expression::constant(Literal::new_simple_literal("en")),
        ));
        let tagged: RdfTerm = Literal::new_language_tagged_literal("hi", "en").unwrap().into();
        assert_eq!(check(&lang, &[("l", Some(tagged))]), Ok(true));

        let datatype = Filter::new(Expression::equal(
            Expression::datatype(Expression::var("n")),
            Expression::constant(xsd("integer").unwrap()),
        ));
        assert_eq!(check(&datatype, &[("n", Some(Literal::integer(1).into()))]), Ok(true));
    }

    #[test]
    fn test_effective_boolean_value() {
        assert_eq!(effective_boolean_value(&Literal::boolean(false).into()), Ok(false));
        assert_eq!(effective_boolean_value(&Literal::integer(3).into()), Ok(true));
        assert_eq!(effective_boolean_value(&Literal::new_simple_literal("").into()), Ok(false));
        assert!(effective_boolean_value(&ex("a")).is_err());
    }
}
