//! RDF triple store implementation
//!
//! This module provides an in-memory RDF store with efficient indexing.

use super::types::{Triple, RdfSubject, RdfPredicate, RdfObject};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// RDF store errors
#[derive(Error, Debug)]
pub enum RdfStoreError {
    /// Triple not found
    #[error("Triple not found")]
    TripleNotFound,

    /// Quad not found
    #[error("Quad not found")]
    QuadNotFound,

    /// Graph not found
    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    /// Duplicate triple
    #[error("Duplicate triple")]
    DuplicateTriple,
}

pub type RdfStoreResult<T> = Result<T, RdfStoreError>;

type Index<A, B, C> = HashMap<A, HashMap<B, HashSet<C>>>;

/// Index used to answer a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Nothing bound: walk every triple
    Scan,
    /// Subject bound (optionally predicate and object)
    Spo,
    /// Predicate bound, subject unbound
    Pos,
    /// Object bound, predicate unbound
    Osp,
}

/// Access path per bound mask (bit 2 = subject, bit 1 = predicate, bit 0 = object)
const ACCESS_BY_BOUND: [Access; 8] = [
    Access::Scan, // ---
    Access::Osp,  // --O
    Access::Pos,  // -P-
    Access::Pos,  // -PO
    Access::Spo,  // S--
    Access::Osp,  // S-O
    Access::Spo,  // SP-
    Access::Spo,  // SPO
];

/// RDF triple store with multiple indices for efficient queries
///
/// Implements:
/// - SPO index (Subject-Predicate-Object)
/// - POS index (Predicate-Object-Subject)
/// - OSP index (Object-Subject-Predicate)
///
/// Every combination of bound positions is answered from one of the three
/// indices; only the fully unbound selection walks the primary storage.
#[derive(Clone, Default)]
pub struct RdfStore {
    /// All triples (primary storage)
    triples: HashSet<Triple>,

    /// SPO index: Subject -> Predicate -> Set of Objects
    spo_index: Index<RdfSubject, RdfPredicate, RdfObject>,

    /// POS index: Predicate -> Object -> Set of Subjects
    pos_index: Index<RdfPredicate, RdfObject, RdfSubject>,

    /// OSP index: Object -> Subject -> Set of Predicates
    osp_index: Index<RdfObject, RdfSubject, RdfPredicate>,
}

impl RdfStore {
    /// Create a new empty RDF store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a triple into the store
    pub fn insert(&mut self, triple: Triple) -> RdfStoreResult<()> {
        if self.triples.contains(&triple) {
            return Err(RdfStoreError::DuplicateTriple);
        }

        self.update_indices_insert(&triple);
        self.triples.insert(triple);

        Ok(())
    }

    /// Insert many triples, skipping duplicates; returns how many were new
    pub fn load(&mut self, triples: impl IntoIterator<Item = Triple>) -> usize {
        triples
            .into_iter()
            .filter(|triple| self.insert(triple.clone()).is_ok())
            .count()
    }

    /// Remove a triple from the store
    pub fn remove(&mut self, triple: &Triple) -> RdfStoreResult<()> {
        if !self.triples.remove(triple) {
            return Err(RdfStoreError::TripleNotFound);
        }

        self.update_indices_remove(triple);

        Ok(())
    }

    /// Check if a triple exists in the store
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Get the total number of triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Clear all triples
    pub fn clear(&mut self) {
        self.triples.clear();
        self.spo_index.clear();
        self.pos_index.clear();
        self.osp_index.clear();
    }

    /// Select the exact set of triples matching the bound positions
    pub fn select(
        &self,
        subject: Option<&RdfSubject>,
        predicate: Option<&RdfPredicate>,
        object: Option<&RdfObject>,
    ) -> Vec<Triple> {
        let mask = (subject.is_some() as usize) << 2
            | (predicate.is_some() as usize) << 1
            | object.is_some() as usize;

        match ACCESS_BY_BOUND[mask] {
            Access::Scan => self.triples.iter().cloned().collect(),
            Access::Spo => self.select_spo(subject, predicate, object),
            Access::Pos => self.select_pos(predicate, object),
            Access::Osp => self.select_osp(subject, object),
        }
    }

    /// Get triples with a specific subject
    pub fn get_triples_with_subject(&self, subject: &RdfSubject) -> Vec<Triple> {
        self.select(Some(subject), None, None)
    }

    /// Get triples with a specific predicate
    pub fn get_triples_with_predicate(&self, predicate: &RdfPredicate) -> Vec<Triple> {
        self.select(None, Some(predicate), None)
    }

    /// Get triples with a specific object
    pub fn get_triples_with_object(&self, object: &RdfObject) -> Vec<Triple> {
        self.select(None, None, Some(object))
    }

    /// Get an iterator over all triples
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Get all distinct subjects in the store
    pub fn subjects(&self) -> Vec<RdfSubject> {
        self.spo_index.keys().cloned().collect()
    }

    /// Get all distinct predicates in the store
    pub fn predicates(&self) -> Vec<RdfPredicate> {
        self.pos_index.keys().cloned().collect()
    }

    /// Get all distinct objects in the store
    pub fn objects(&self) -> Vec<RdfObject> {
        self.osp_index.keys().cloned().collect()
    }

    // Private helper methods

    fn select_spo(
        &self,
        subject: Option<&RdfSubject>,
        predicate: Option<&RdfPredicate>,
        object: Option<&RdfObject>,
    ) -> Vec<Triple> {
        let Some(s) = subject else {
            return Vec::new();
        };
        let Some(preds) = self.spo_index.get(s) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for (p, objs) in preds {
            if predicate.map_or(false, |wanted| wanted != p) {
                continue;
            }
            match object {
                Some(o) if objs.contains(o) => {
                    out.push(Triple::new(s.clone(), p.clone(), o.clone()));
                }
                Some(_) => {}
                None => out.extend(
                    objs.iter()
                        .map(|o| Triple::new(s.clone(), p.clone(), o.clone())),
                ),
            }
        }
        out
    }

    fn select_pos(&self, predicate: Option<&RdfPredicate>, object: Option<&RdfObject>) -> Vec<Triple> {
        let Some(p) = predicate else {
            return Vec::new();
        };
        let Some(objs) = self.pos_index.get(p) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for (o, subjs) in objs {
            if object.map_or(false, |wanted| wanted != o) {
                continue;
            }
            out.extend(
                subjs.iter()
                    .map(|s| Triple::new(s.clone(), p.clone(), o.clone())),
            );
        }
        out
    }

    fn select_osp(&self, subject: Option<&RdfSubject>, object: Option<&RdfObject>) -> Vec<Triple> {
        let Some(o) = object else {
            return Vec::new();
        };
        let Some(subjs) = self.osp_index.get(o) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for (s, preds) in subjs {
            if subject.map_or(false, |wanted| wanted != s) {
                continue;
            }
            out.extend(
                preds.iter()
                    .map(|p| Triple::new(s.clone(), p.clone(), o.clone())),
            );
        }
        out
    }

    fn update_indices_insert(&mut self, triple: &Triple) {
        let Triple { subject, predicate, object } = triple;

        self.spo_index
            .entry(subject.clone())
            .or_default()
            .entry(predicate.clone())
            .or_default()
            .insert(object.clone());

        self.pos_index
            .entry(predicate.clone())
            .or_default()
            .entry(object.clone())
            .or_default()
            .insert(subject.clone());

        self.osp_index
            .entry(object.clone())
            .or_default()
            .entry(subject.clone())
            .or_default()
            .insert(predicate.clone());
    }

    fn update_indices_remove(&mut self, triple: &Triple) {
        let Triple { subject, predicate, object } = triple;
        remove_from_index(&mut self.spo_index, subject, predicate, object);
        remove_from_index(&mut self.pos_index, predicate, object, subject);
        remove_from_index(&mut self.osp_index, object, subject, predicate);
    }
}

fn remove_from_index<A, B, C>(index: &mut Index<A, B, C>, a: &A, b: &B, c: &C)
where
    A: std::hash::Hash + Eq,
    B: std::hash::Hash + Eq,
    C: std::hash::Hash + Eq,
{
    if let Some(level) = index.get_mut(a) {
        if let Some(leaves) = level.get_mut(b) {
            leaves.remove(c);
            if leaves.is_empty() {
                level.remove(b);
            }
        }
        if level.is_empty() {
            index.remove(a);
        }
    }
}
