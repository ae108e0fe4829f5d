//! Pattern matcher
//!
//! A pattern is classified by its *hole*: the set of unbound positions. The hole is
//! a 4-bit mask (context, subject, predicate, object) and a static table maps every
//! mask to the positions that become output columns. Bound positions drive indexed
//! selection on the data source.

use super::algebra::{Pattern, PatternTerm, Variable};
use super::results::{Row, SolutionTable};
use super::source::DataSource;
use crate::rdf::{NamedNode, Quad, RdfObject, RdfPredicate, RdfSubject, RdfTerm};
use indexmap::IndexSet;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Context,
    Subject,
    Predicate,
    Object,
}

const CONTEXT: u8 = 0b1000;
const SUBJECT: u8 = 0b0100;
const PREDICATE: u8 = 0b0010;
const OBJECT: u8 = 0b0001;

use Position::{Context as C, Object as O, Predicate as P, Subject as S};

/// Unbound positions, in output column order, for every hole mask
static HOLE_LAYOUT: [&[Position]; 16] = [
    &[],
    &[O],
    &[P],
    &[P, O],
    &[S],
    &[S, O],
    &[S, P],
    &[S, P, O],
    &[C],
    &[C, O],
    &[C, P],
    &[C, P, O],
    &[C, S],
    &[C, S, O],
    &[C, S, P],
    &[C, S, P, O],
];

/// Pattern hole: the bitmask of unbound positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hole(u8);

impl Hole {
    /// Classify a pattern; an absent context is not part of the hole
    pub fn of(pattern: &Pattern) -> Self {
        let mut mask = 0;
        let unbound = |term: &PatternTerm| !term.is_bound();
        if pattern.context.as_ref().map_or(false, unbound) {
            mask |= CONTEXT;
        }
        if unbound(&pattern.subject) {
            mask |= SUBJECT;
        }
        if unbound(&pattern.predicate) {
            mask |= PREDICATE;
        }
        if unbound(&pattern.object) {
            mask |= OBJECT;
        }
        Hole(mask)
    }

    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }

    pub fn width(&self) -> usize {
        self.layout().len()
    }

    fn layout(&self) -> &'static [Position] {
        HOLE_LAYOUT[usize::from(self.0)]
    }
}

/// Column layout derived from a pattern hole
struct Layout {
    columns: IndexSet<Variable>,
    /// Fact position feeding each column
    sources: Vec<Position>,
    /// Repeated variable: position that must equal an existing column
    equalities: Vec<(Position, usize)>,
}

impl Layout {
    fn new(pattern: &Pattern, hole: Hole) -> Self {
        let mut layout = Layout {
            columns: IndexSet::new(),
            sources: Vec::new(),
            equalities: Vec::new(),
        };
        for &position in hole.layout() {
            let Some(var) = term_at(pattern, position).and_then(PatternTerm::as_variable) else {
                continue;
            };
            let (index, inserted) = layout.columns.insert_full(var.clone());
            if inserted {
                layout.sources.push(position);
            } else {
                layout.equalities.push((position, index));
            }
        }
        layout
    }

    fn row(&self, fact: &FactTerms) -> Option<Row> {
        let row: Row = self.sources.iter().map(|&p| fact.get(p)).collect();
        let consistent = self
            .equalities
            .iter()
            .all(|&(position, index)| fact.get(position) == row[index]);
        consistent.then_some(row)
    }
}

fn term_at(pattern: &Pattern, position: Position) -> Option<&PatternTerm> {
    match position {
        Position::Context => pattern.context.as_ref(),
        Position::Subject => Some(&pattern.subject),
        Position::Predicate => Some(&pattern.predicate),
        Position::Object => Some(&pattern.object),
    }
}

/// A matched fact, position-addressable
struct FactTerms {
    context: Option<RdfTerm>,
    subject: RdfTerm,
    predicate: RdfTerm,
    object: RdfTerm,
}

impl FactTerms {
    fn get(&self, position: Position) -> Option<RdfTerm> {
        match position {
            Position::Context => self.context.clone(),
            Position::Subject => Some(self.subject.clone()),
            Position::Predicate => Some(self.predicate.clone()),
            Position::Object => Some(self.object.clone()),
        }
    }
}

impl From<Quad> for FactTerms {
    fn from(quad: Quad) -> Self {
        Self {
            context: quad.graph.map(RdfTerm::from),
            subject: quad.subject.into(),
            predicate: quad.predicate.into(),
            object: quad.object.into(),
        }
    }
}

/// Bound positions converted to selection keys
///
/// `None` from [`Selection::new`] means a bound term cannot occur in its position,
/// so nothing matches.
struct Selection {
    context: Option<NamedNode>,
    subject: Option<RdfSubject>,
    predicate: Option<RdfPredicate>,
    object: Option<RdfObject>,
}

impl Selection {
    fn new(pattern: &Pattern) -> Option<Self> {
        let context = match pattern.context.as_ref().and_then(PatternTerm::as_term) {
            Some(RdfTerm::NamedNode(n)) => Some(n.clone()),
            Some(_) => return None,
            None => None,
        };
        let subject = match pattern.subject.as_term() {
            Some(t) => Some(RdfSubject::try_from(t.clone()).ok()?),
            None => None,
        };
        let predicate = match pattern.predicate.as_term() {
            Some(t) => Some(RdfPredicate::try_from(t.clone()).ok()?),
            None => None,
        };
        let object = pattern.object.as_term().cloned().map(RdfObject::from);
        Some(Self {
            context,
            subject,
            predicate,
            object,
        })
    }
}

/// Bind a pattern against a data source
///
/// Output columns are the distinct variables of the unbound positions, in
/// context, subject, predicate, object order. Duplicate rows are kept. A fully
/// ground pattern yields one empty row when the fact is present and none otherwise.
pub fn match_pattern(pattern: &Pattern, source: &DataSource<'_>) -> SolutionTable {
    let hole = Hole::of(pattern);
    let layout = Layout::new(pattern, hole);
    let mut table = SolutionTable::new(pattern_name(pattern), layout.columns.iter().cloned());

    let Some(selection) = Selection::new(pattern) else {
        trace!("pattern {} cannot match: bound term in invalid position", table.name());
        return table;
    };

    let mut rows = Vec::new();
    collect_rows(pattern, &selection, &layout, source, &mut rows);
    if hole.is_ground() {
        rows.truncate(1);
    }
    trace!("pattern {} (hole {:04b}) matched {} rows", table.name(), hole.0, rows.len());
    table.set_rows(rows);
    table
}

fn collect_rows(
    pattern: &Pattern,
    selection: &Selection,
    layout: &Layout,
    source: &DataSource<'_>,
    rows: &mut Vec<Row>,
) {
    let (s, p, o) = (
        selection.subject.as_ref(),
        selection.predicate.as_ref(),
        selection.object.as_ref(),
    );
    let facts: Vec<FactTerms> = match source {
        // A triple collection has no contexts to satisfy a quadruple pattern
        DataSource::Triples(_) if pattern.context.is_some() => Vec::new(),
        DataSource::Triples(store) => store
            .select(s, p, o)
            .into_iter()
            .map(|t| FactTerms::from(Quad::from_triple(t)))
            .collect(),
        DataSource::Quads(store) if pattern.context.is_none() => {
            store.select_any(s, p, o).into_iter().map(FactTerms::from).collect()
        }
        DataSource::Quads(store) => store
            .select(selection.context.as_ref(), s, p, o)
            .into_iter()
            .map(FactTerms::from)
            .collect(),
        DataSource::Federation(members) => {
            for member in members.iter() {
                collect_rows(pattern, selection, layout, member, rows);
            }
            return;
        }
    };
    rows.extend(facts.iter().filter_map(|fact| layout.row(fact)));
}

fn pattern_name(pattern: &Pattern) -> String {
    match &pattern.context {
        Some(c) => format!("{} {} {} {}", c, pattern.subject, pattern.predicate, pattern.object),
        None => format!("{} {} {}", pattern.subject, pattern.predicate, pattern.object),
    }
}
