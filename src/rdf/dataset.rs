//! RDF quad store (named graphs)
//!
//! Quads are partitioned by context: each named graph, and the default graph,
//! is an indexed [`RdfStore`]. The partition map is the context index.

use super::store::{RdfStore, RdfStoreError, RdfStoreResult};
use super::types::{NamedNode, Quad, RdfObject, RdfPredicate, RdfSubject, Triple};
use std::collections::HashMap;

/// In-memory quadruple collection
#[derive(Clone, Default)]
pub struct QuadStore {
    /// Default graph
    default_graph: RdfStore,
    /// Named graphs: context -> triples
    named_graphs: HashMap<NamedNode, RdfStore>,
}

impl QuadStore {
    /// Create a new empty quad store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quad
    pub fn insert(&mut self, quad: Quad) -> RdfStoreResult<()> {
        let triple = quad.as_triple();
        match quad.graph {
            Some(graph) => self.named_graphs.entry(graph).or_default().insert(triple),
            None => self.default_graph.insert(triple),
        }
    }

    /// Insert many quads, skipping duplicates; returns how many were new
    pub fn load(&mut self, quads: impl IntoIterator<Item = Quad>) -> usize {
        quads
            .into_iter()
            .filter(|quad| self.insert(quad.clone()).is_ok())
            .count()
    }

    /// Remove a quad
    pub fn remove(&mut self, quad: &Quad) -> RdfStoreResult<()> {
        let triple = quad.as_triple();
        let store = match &quad.graph {
            Some(graph) => self
                .named_graphs
                .get_mut(graph)
                .ok_or(RdfStoreError::QuadNotFound)?,
            None => &mut self.default_graph,
        };
        store.remove(&triple).map_err(|_| RdfStoreError::QuadNotFound)?;

        if let Some(graph) = &quad.graph {
            if self.named_graphs.get(graph).map_or(false, RdfStore::is_empty) {
                self.named_graphs.remove(graph);
            }
        }
        Ok(())
    }

    /// Check if a quad exists
    pub fn contains(&self, quad: &Quad) -> bool {
        let triple = quad.as_triple();
        match &quad.graph {
            Some(graph) => self
                .named_graphs
                .get(graph)
                .map_or(false, |store| store.contains(&triple)),
            None => self.default_graph.contains(&triple),
        }
    }

    /// Total number of quads across all graphs
    pub fn len(&self) -> usize {
        self.default_graph.len() + self.named_graphs.values().map(RdfStore::len).sum::<usize>()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The default graph
    pub fn default_graph(&self) -> &RdfStore {
        &self.default_graph
    }

    /// A named graph
    pub fn graph(&self, name: &NamedNode) -> RdfStoreResult<&RdfStore> {
        self.named_graphs
            .get(name)
            .ok_or_else(|| RdfStoreError::GraphNotFound(name.as_str().to_string()))
    }

    /// List all named graphs
    pub fn graph_names(&self) -> Vec<NamedNode> {
        self.named_graphs.keys().cloned().collect()
    }

    /// Select quads from named graphs
    ///
    /// `graph = Some(g)` restricts to one named graph; `None` ranges over every
    /// named graph. The default graph is never part of this selection.
    pub fn select(
        &self,
        graph: Option<&NamedNode>,
        subject: Option<&RdfSubject>,
        predicate: Option<&RdfPredicate>,
        object: Option<&RdfObject>,
    ) -> Vec<Quad> {
        match graph {
            Some(name) => self
                .named_graphs
                .get(name)
                .map(|store| with_graph(store.select(subject, predicate, object), Some(name)))
                .unwrap_or_default(),
            None => self
                .named_graphs
                .iter()
                .flat_map(|(name, store)| with_graph(store.select(subject, predicate, object), Some(name)))
                .collect(),
        }
    }

    /// Select quads from every graph, default graph included
    pub fn select_any(
        &self,
        subject: Option<&RdfSubject>,
        predicate: Option<&RdfPredicate>,
        object: Option<&RdfObject>,
    ) -> Vec<Quad> {
        let mut quads = with_graph(self.default_graph.select(subject, predicate, object), None);
        quads.extend(self.select(None, subject, predicate, object));
        quads
    }
}

fn with_graph(triples: Vec<Triple>, graph: Option<&NamedNode>) -> Vec<Quad> {
    triples
        .into_iter()
        .map(|t| Quad::new(t.subject, t.predicate, t.object, graph.cloned()))
        .collect()
}
