//! rdfkit
//!
//! An RDF toolkit built around an in-memory graph-pattern query engine.
//!
//! # Components
//!
//! - RDF data model: terms, triples, quads, an indexed triple store and a
//!   named-graph quad store, Turtle/N-Triples loading
//! - Query engine: pattern matching, property paths, union/optional/join
//!   combination of solution tables, filters, grouping and aggregates, ordering,
//!   projection and paging, over single stores or federations
//! - SELECT, ASK, CONSTRUCT and DESCRIBE query forms
//!
//! ## Example Usage
//!
//! ```rust
//! use rdfkit::rdf::{Literal, NamedNode, RdfStore, Triple};
//! use rdfkit::sparql::{Expression, Filter, Pattern, PatternGroup, PatternTerm, Query, SparqlEngine, Variable};
//!
//! let ex = |s: &str| NamedNode::new(&format!("http://example.org/{}", s)).unwrap();
//! let mut store = RdfStore::new();
//! store.insert(Triple::new(ex("alice").into(), ex("age").into(), Literal::integer(30).into())).unwrap();
//! store.insert(Triple::new(ex("bob").into(), ex("age").into(), Literal::integer(25).into())).unwrap();
//!
//! let group = PatternGroup::new()
//!     .with(Pattern::new(PatternTerm::var("person"), ex("age"), PatternTerm::var("age")))
//!     .with_filter(Filter::new(Expression::greater(
//!         Expression::var("age"),
//!         Expression::constant(Literal::integer(26)),
//!     )));
//! let query = Query::select(vec![Variable::new("person")]).with_group(group);
//!
//! let results = SparqlEngine::new().query(&query, &store).unwrap();
//! let people: Vec<_> = results.table().unwrap().solutions().collect();
//! assert_eq!(people.len(), 1);
//! assert_eq!(people[0].get("person"), Some(&ex("alice").into()));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod rdf;
pub mod sparql;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, EngineConfig};

pub use rdf::{
    BlankNode, Literal, NamedNode, NamespaceManager, Quad, QuadStore, RdfFormat, RdfObject,
    RdfParser, RdfPredicate, RdfSerializer, RdfStore, RdfStoreError, RdfStoreResult,
    RdfSubject, RdfTerm, Triple,
};

pub use sparql::{
    DataSource, Pattern, PatternGroup, PatternTerm, PropertyPath, Query, QueryResults,
    QuerySolution, SolutionTable, SparqlEngine, SparqlError, SparqlExecutor, SparqlResult,
    Variable,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
