//! RDF (Resource Description Framework) data model and collections
//!
//! This module implements the data-source side of the query engine:
//! - RDF terms, triples and quads
//! - Indexed triple store
//! - Named graphs (quad store)
//! - Namespace prefixes
//! - Turtle / N-Triples loading
//!
//! # Example
//!
//! ```rust
//! use rdfkit::rdf::{RdfStore, Triple, NamedNode, Literal, RdfPredicate};
//!
//! let mut store = RdfStore::new();
//!
//! let subject = NamedNode::new("http://example.org/alice").unwrap();
//! let predicate = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! let object = Literal::new_simple_literal("Alice");
//!
//! store.insert(Triple::new(subject.clone().into(), predicate, object.into())).unwrap();
//!
//! let results = store.get_triples_with_subject(&subject.into());
//! assert_eq!(results.len(), 1);
//! ```

mod types;
mod store;
mod dataset;
mod namespace;
mod serialization;

pub use types::{
    RdfTerm, RdfSubject, RdfPredicate, RdfObject,
    NamedNode, BlankNode, Literal, Triple, Quad,
    RdfError, RdfResult, XSD,
};

pub use store::{
    RdfStore, RdfStoreError, RdfStoreResult,
};

pub use dataset::QuadStore;

pub use namespace::{
    NamespaceManager, Namespace,
    PrefixError, PrefixResult,
};

pub use serialization::{
    RdfFormat, RdfParser, RdfSerializer,
    ParseError, ParseResult,
    SerializeError, SerializeResult,
};
