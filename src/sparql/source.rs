//! Data sources the engine queries: a triple store, a quad store, or a federation of both

use crate::rdf::{
    NamedNode, Quad, QuadStore, RdfObject, RdfPredicate, RdfStore, RdfSubject, RdfTerm, Triple,
};
use indexmap::IndexSet;

/// A fact returned by a data source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fact {
    Triple(Triple),
    Quad(Quad),
}

impl Fact {
    pub fn subject(&self) -> &RdfSubject {
        match self {
            Fact::Triple(t) => &t.subject,
            Fact::Quad(q) => &q.subject,
        }
    }

    pub fn predicate(&self) -> &RdfPredicate {
        match self {
            Fact::Triple(t) => &t.predicate,
            Fact::Quad(q) => &q.predicate,
        }
    }

    pub fn object(&self) -> &RdfObject {
        match self {
            Fact::Triple(t) => &t.object,
            Fact::Quad(q) => &q.object,
        }
    }

    /// Named graph of a quad; `None` for triples and default-graph quads
    pub fn context(&self) -> Option<&NamedNode> {
        match self {
            Fact::Triple(_) => None,
            Fact::Quad(q) => q.graph.as_ref(),
        }
    }

    pub fn to_triple(&self) -> Triple {
        match self {
            Fact::Triple(t) => t.clone(),
            Fact::Quad(q) => q.as_triple(),
        }
    }
}

/// Set union of fact lists, keeping first-seen order
pub fn union_facts(left: Vec<Fact>, right: Vec<Fact>) -> Vec<Fact> {
    let mut seen: IndexSet<Fact> = left.into_iter().collect();
    seen.extend(right);
    seen.into_iter().collect()
}

/// Collection a query runs against
#[derive(Clone, Copy)]
pub enum DataSource<'a> {
    /// Triple collection (positions S, P, O)
    Triples(&'a RdfStore),
    /// Quadruple collection (positions C, S, P, O)
    Quads(&'a QuadStore),
    /// Ordered federation of independent sources
    Federation(&'a [DataSource<'a>]),
}

impl<'a> DataSource<'a> {
    pub fn is_federation(&self) -> bool {
        matches!(self, DataSource::Federation(_))
    }

    /// Federation members; a single collection is its own only member
    pub fn members(&self) -> &[DataSource<'a>] {
        match self {
            DataSource::Federation(members) => members,
            single => std::slice::from_ref(single),
        }
    }

    /// Whether any reachable collection carries contexts
    pub fn has_quads(&self) -> bool {
        match self {
            DataSource::Triples(_) => false,
            DataSource::Quads(_) => true,
            DataSource::Federation(members) => members.iter().any(DataSource::has_quads),
        }
    }

    /// Every fact mentioning `term` as subject, predicate, object or context
    pub fn describe(&self, term: &RdfTerm) -> Vec<Fact> {
        let subject = RdfSubject::try_from(term.clone()).ok();
        let predicate = RdfPredicate::try_from(term.clone()).ok();
        let object = RdfObject::from(term.clone());

        match self {
            DataSource::Triples(store) => {
                let mut triples = Vec::new();
                if let Some(s) = &subject {
                    triples.extend(store.select(Some(s), None, None));
                }
                if let Some(p) = &predicate {
                    triples.extend(store.select(None, Some(p), None));
                }
                triples.extend(store.select(None, None, Some(&object)));
                union_facts(Vec::new(), triples.into_iter().map(Fact::Triple).collect())
            }
            DataSource::Quads(store) => {
                let mut quads = Vec::new();
                if let Some(s) = &subject {
                    quads.extend(store.select_any(Some(s), None, None));
                }
                if let Some(p) = &predicate {
                    quads.extend(store.select_any(None, Some(p), None));
                }
                quads.extend(store.select_any(None, None, Some(&object)));
                if let RdfTerm::NamedNode(graph) = term {
                    quads.extend(store.select(Some(graph), None, None, None));
                }
                union_facts(Vec::new(), quads.into_iter().map(Fact::Quad).collect())
            }
            DataSource::Federation(members) => members
                .iter()
                .fold(Vec::new(), |acc, member| union_facts(acc, member.describe(term))),
        }
    }
}

impl<'a> From<&'a RdfStore> for DataSource<'a> {
    fn from(store: &'a RdfStore) -> Self {
        DataSource::Triples(store)
    }
}

impl<'a> From<&'a QuadStore> for DataSource<'a> {
    fn from(store: &'a QuadStore) -> Self {
        DataSource::Quads(store)
    }
}
