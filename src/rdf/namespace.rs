//! RDF namespace and prefix management
//!
//! This module handles namespace prefixes for compact IRI notation.

use super::types::{NamedNode, RdfError, RdfTerm};
use indexmap::IndexMap;
use thiserror::Error;

/// Prefix errors
#[derive(Error, Debug)]
pub enum PrefixError {
    /// Unknown prefix
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),
}

impl From<RdfError> for PrefixError {
    fn from(err: RdfError) -> Self {
        PrefixError::InvalidIri(err.to_string())
    }
}

pub type PrefixResult<T> = Result<T, PrefixError>;

/// Namespace (prefix → IRI mapping)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Prefix
    pub prefix: String,
    /// IRI
    pub iri: String,
}

impl Namespace {
    /// Create a new namespace
    pub fn new(prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            iri: iri.into(),
        }
    }
}

/// Namespace manager with common prefixes
///
/// Prefixes keep their registration order so listings and compaction are stable.
#[derive(Debug, Clone)]
pub struct NamespaceManager {
    /// Prefix → IRI mappings
    prefixes: IndexMap<String, String>,
}

impl NamespaceManager {
    /// Create a new namespace manager with common prefixes
    pub fn new() -> Self {
        let mut mgr = Self::empty();

        mgr.add_prefix("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#");
        mgr.add_prefix("rdfs", "http://www.w3.org/2000/01/rdf-schema#");
        mgr.add_prefix("xsd", "http://www.w3.org/2001/XMLSchema#");
        mgr.add_prefix("owl", "http://www.w3.org/2002/07/owl#");
        mgr.add_prefix("foaf", "http://xmlns.com/foaf/0.1/");

        mgr
    }

    /// Create a manager without any predefined prefix
    pub fn empty() -> Self {
        Self {
            prefixes: IndexMap::new(),
        }
    }

    /// Add a prefix (re-adding replaces the IRI)
    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    /// Get IRI for a prefix
    pub fn get_iri(&self, prefix: &str) -> PrefixResult<&str> {
        self.prefixes
            .get(prefix)
            .map(|s| s.as_str())
            .ok_or_else(|| PrefixError::UnknownPrefix(prefix.to_string()))
    }

    /// Expand a compact IRI (prefix:local) to full IRI
    pub fn expand(&self, compact_iri: &str) -> PrefixResult<String> {
        let (prefix, local) = compact_iri
            .split_once(':')
            .ok_or_else(|| PrefixError::InvalidIri(compact_iri.to_string()))?;
        Ok(format!("{}{}", self.get_iri(prefix)?, local))
    }

    /// Expand a compact IRI into a named node
    pub fn named_node(&self, compact_iri: &str) -> PrefixResult<NamedNode> {
        Ok(NamedNode::new(&self.expand(compact_iri)?)?)
    }

    /// Compact an IRI using the longest matching namespace
    pub fn compact(&self, iri: &str) -> Option<String> {
        self.prefixes
            .iter()
            .filter(|(_, ns)| iri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| format!("{}:{}", prefix, &iri[ns.len()..]))
    }

    /// Render a term, compacting IRIs where a prefix is known
    pub fn display_term(&self, term: &RdfTerm) -> String {
        match term {
            RdfTerm::NamedNode(n) => self.compact(n.as_str()).unwrap_or_else(|| n.to_string()),
            other => other.to_string(),
        }
    }

    /// Get all registered prefixes
    pub fn prefixes(&self) -> Vec<Namespace> {
        self.prefixes
            .iter()
            .map(|(prefix, iri)| Namespace::new(prefix.clone(), iri.clone()))
            .collect()
    }
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand() {
        let mgr = NamespaceManager::new();

        let expanded = mgr.expand("foaf:name").unwrap();
        assert_eq!(expanded, "http://xmlns.com/foaf/0.1/name");
        assert!(matches!(mgr.expand("nope:x"), Err(PrefixError::UnknownPrefix(_))));
        assert!(matches!(mgr.expand("no-colon"), Err(PrefixError::InvalidIri(_))));
    }

    #[test]
    fn test_compact_prefers_longest_namespace() {
        let mut mgr = NamespaceManager::empty();
        mgr.add_prefix("ex", "http://example.org/");
        mgr.add_prefix("people", "http://example.org/people/");

        assert_eq!(mgr.compact("http://example.org/people/alice"), Some("people:alice".to_string()));
        assert_eq!(mgr.compact("http://example.org/thing"), Some("ex:thing".to_string()));
        assert_eq!(mgr.compact("http://other.org/x"), None);
    }

    #[test]
    fn test_named_node_and_display() {
        let mut mgr = NamespaceManager::new();
        mgr.add_prefix("ex", "http://example.org/");

        let node = mgr.named_node("ex:alice").unwrap();
        assert_eq!(node.as_str(), "http://example.org/alice");
        assert_eq!(mgr.display_term(&node.into()), "ex:alice");
    }

    #[test]
    fn test_prefix_order_is_stable() {
        let mgr = NamespaceManager::new();
        let names: Vec<String> = mgr.prefixes().into_iter().map(|ns| ns.prefix).collect();
        assert_eq!(names, vec!["rdf", "rdfs", "xsd", "owl", "foaf"]);
    }
}
