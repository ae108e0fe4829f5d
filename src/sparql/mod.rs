//! Graph-pattern query engine
//!
//! Queries are built as algebra values (patterns, property paths, pattern groups,
//! subqueries) and evaluated against a triple store, a quad store or a federation
//! of sources. Results are solution tables: ordered columns of variables and a
//! multiset of rows.
//!
//! # Example
//!
//! ```rust
//! use rdfkit::rdf::{NamedNode, RdfStore, Triple};
//! use rdfkit::sparql::{Pattern, PatternGroup, PatternTerm, Query, SparqlEngine};
//!
//! let ex = |s: &str| NamedNode::new(&format!("http://example.org/{}", s)).unwrap();
//! let mut store = RdfStore::new();
//! store.insert(Triple::new(ex("a").into(), ex("p").into(), ex("b").into())).unwrap();
//!
//! let query = Query::select(vec![])
//!     .with_group(PatternGroup::new().with(Pattern::new(PatternTerm::var("s"), ex("p"), PatternTerm::var("o"))));
//!
//! let results = SparqlEngine::new().query(&query, &store).unwrap();
//! assert_eq!(results.table().unwrap().len(), 1);
//! ```

mod algebra;
mod combine;
mod executor;
mod filter;
mod matcher;
mod modifier;
mod path;
mod results;
mod source;

pub use algebra::{
    GroupMember, MemberId, PathFlavor, PathStep, Pattern, PatternGroup, PatternTerm, Projection,
    PropertyPath, Query, QueryForm, QueryMember, Variable,
};
pub use combine::{combine, inner_combine, merge, outer_combine};
pub use executor::SparqlExecutor;
pub use filter::{effective_boolean_value, xsd, Expression, Filter, FilterError, FilterResult};
pub use matcher::{match_pattern, Hole};
pub use modifier::{
    apply_modifiers, compare_terms, Aggregate, AggregateFunction, GroupBy, Modifier, OrderKey,
};
pub use path::compile as compile_path;
pub use results::{QueryResults, QuerySolution, Row, RowView, SolutionTable};
pub use source::{union_facts, DataSource, Fact};

use crate::config::EngineConfig;
use crate::rdf::RdfError;
use thiserror::Error;
use tracing::info;

/// Query errors
#[derive(Error, Debug)]
pub enum SparqlError {
    /// Property path rejected at construction
    #[error("Invalid property path: {0}")]
    InvalidPath(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Filter rejected at construction
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Term error: {0}")]
    Term(#[from] RdfError),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A federation member failed, so the whole query fails
    #[error("Federation member {member} failed: {source}")]
    Federation {
        member: usize,
        source: Box<SparqlError>,
    },
}

pub type SparqlResult<T> = Result<T, SparqlError>;

/// Query engine
///
/// Holds configuration only; every evaluation keeps its state on its own stack,
/// so one engine can serve concurrent queries.
#[derive(Debug, Clone, Default)]
pub struct SparqlEngine {
    config: EngineConfig,
}

impl SparqlEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        info!(
            "query engine ready (parallel federation: {}, row cap: {:?})",
            config.parallel_federation, config.max_rows
        );
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a query against a store, quad store or federation
    pub fn query<'a>(&self, query: &Query, source: impl Into<DataSource<'a>>) -> SparqlResult<QueryResults> {
        SparqlExecutor::new(source.into(), &self.config).execute(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Literal, NamedNode, QuadStore, Quad, RdfStore, Triple};

    fn ex(local: &str) -> NamedNode {
        NamedNode::new(&format!("http://example.org/{}", local)).unwrap()
    }

    fn var(name: &str) -> PatternTerm {
        PatternTerm::var(name)
    }

    fn store(facts: &[(&str, &str, &str)]) -> RdfStore {
        let mut store = RdfStore::new();
        for (s, p, o) in facts {
            store.insert(Triple::new(ex(s).into(), ex(p).into(), ex(o).into())).unwrap();
        }
        store
    }

    fn group(pattern: Pattern) -> PatternGroup {
        PatternGroup::new().with(pattern)
    }

    #[test]
    fn test_select_basic_pattern() {
        let store = store(&[("a", "p", "b"), ("a", "p", "c")]);
        let query = Query::select(vec![]).with_group(group(Pattern::new(var("s"), ex("p"), var("o"))));

        let results = SparqlEngine::new().query(&query, &store).unwrap();
        let table = results.table().unwrap();
        assert_eq!(table.len(), 2);
        let names: Vec<&str> = table.columns().iter().map(Variable::name).collect();
        assert_eq!(names, vec!["S", "O"]);
    }

    #[test]
    fn test_path_query_strips_intermediates() {
        let store = store(&[("a", "p1", "m"), ("m", "p2", "z")]);
        let path = PropertyPath::sequence(ex("a"), var("o"), vec![ex("p1"), ex("p2")]).unwrap();
        let query = Query::select(vec![]).with_group(PatternGroup::new().with(path));

        let results = SparqlEngine::new().query(&query, &store).unwrap();
        let table = results.table().unwrap();
        assert_eq!(table.columns().len(), 1);
        assert_eq!(table.rows(), &[vec![Some(ex("z").into())]]);
    }

    #[test]
    fn test_ask() {
        let store = store(&[("a", "p", "b")]);
        let engine = SparqlEngine::new();
        let yes = Query::ask().with_group(group(Pattern::new(ex("a"), ex("p"), var("o"))));
        let no = Query::ask().with_group(group(Pattern::new(ex("b"), ex("p"), var("o"))));

        assert_eq!(engine.query(&yes, &store).unwrap().as_boolean(), Some(true));
        assert_eq!(engine.query(&no, &store).unwrap().as_boolean(), Some(false));
    }

    #[test]
    fn test_construct_skips_literal_subject() {
        let mut store = RdfStore::new();
        store
            .insert(Triple::new(ex("a").into(), ex("name").into(), Literal::new_simple_literal("A").into()))
            .unwrap();

        // ?o is a literal; using it as the subject must be skipped
        let query = Query::construct(vec![
            Pattern::new(var("o"), ex("label"), var("s")),
            Pattern::new(var("s"), ex("label"), var("o")),
        ])
        .with_group(group(Pattern::new(var("s"), ex("name"), var("o"))));

        let results = SparqlEngine::new().query(&query, &store).unwrap();
        let triples = results.table().unwrap().triples().unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].subject, ex("a").into());
    }

    #[test]
    fn test_construct_rejects_context_template() {
        let store = RdfStore::new();
        let query = Query::construct(vec![Pattern::new(var("s"), ex("p"), var("o")).in_context(ex("g"))]);
        assert!(matches!(
            SparqlEngine::new().query(&query, &store),
            Err(SparqlError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_describe_without_members() {
        let store = store(&[("a", "p", "b"), ("c", "p", "a"), ("x", "y", "z")]);
        let query = Query::describe(vec![ex("a").into(), var("ignored")]);

        let results = SparqlEngine::new().query(&query, &store).unwrap();
        assert_eq!(results.table().unwrap().len(), 2);
    }

    #[test]
    fn test_describe_on_quads_adds_context() {
        let mut quads = QuadStore::new();
        quads.insert(Quad::new(ex("a").into(), ex("p").into(), ex("b").into(), Some(ex("g")))).unwrap();

        let query = Query::describe(vec![ex("a").into()]);
        let results = SparqlEngine::new().query(&query, &quads).unwrap();
        let table = results.table().unwrap();
        assert_eq!(table.columns().len(), 4);
        assert_eq!(table.rows()[0][3], Some(ex("g").into()));
    }

    #[test]
    fn test_max_rows() {
        let store = store(&[("a", "p", "b"), ("a", "p", "c")]);
        let engine = SparqlEngine::with_config(EngineConfig {
            max_rows: Some(1),
            ..EngineConfig::default()
        });
        let query = Query::select(vec![]).with_group(group(Pattern::new(var("s"), ex("p"), var("o"))));
        assert!(matches!(engine.query(&query, &store), Err(SparqlError::Evaluation(_))));
    }

    #[test]
    fn test_federation_error_wraps_member() {
        let first = store(&[("a", "p", "b")]);
        let second = store(&[("a", "p", "c"), ("a", "p", "d")]);
        let members = [DataSource::from(&first), DataSource::from(&second)];
        let engine = SparqlEngine::with_config(EngineConfig {
            max_rows: Some(1),
            ..EngineConfig::default()
        });
        let query = Query::select(vec![]).with_group(group(Pattern::new(var("s"), ex("p"), var("o"))));

        match engine.query(&query, DataSource::Federation(&members)) {
            Err(SparqlError::Federation { member, .. }) => assert_eq!(member, 1),
            other => panic!("Expected federation error, got {:?}", other.map(|r| r.table().map(SolutionTable::len))),
        }
    }
}
