//! Query algebra: variables, patterns, property paths, pattern groups and queries
//!
//! Everything here is built once per query invocation and consumed by the executor.

use super::filter::Filter;
use super::modifier::Modifier;
use super::{SparqlError, SparqlResult};
use crate::rdf::{BlankNode, Literal, NamedNode, RdfTerm};
use indexmap::IndexMap;
use std::fmt;

/// Query variable
///
/// Names are case-normalized (upper case, without the leading `?`), so `?name`,
/// `$Name` and `NAME` are the same variable. Synthetic variables are allocated by
/// the property path compiler and never compare equal to a user variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    name: String,
    synthetic: bool,
}

impl Variable {
    /// Create a variable from a name such as `?s`, `$s` or `s`
    pub fn new(name: &str) -> Self {
        let bare = name.trim_start_matches(['?', '$']);
        Self {
            name: bare.to_uppercase(),
            synthetic: false,
        }
    }

    /// Property-path intermediate variable
    pub(crate) fn synthetic(index: usize) -> Self {
        Self::scoped_synthetic("", index)
    }

    /// Intermediate variable of the path identified by `scope`
    pub(crate) fn scoped_synthetic(scope: &str, index: usize) -> Self {
        let name = if scope.is_empty() {
            format!("__PP{}", index)
        } else {
            format!("__PP{}_{}", scope, index)
        };
        Self { name, synthetic: true }
    }

    /// Normalized name, without `?`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the path compiler introduced this variable
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Variable::new(name)
    }
}

/// A pattern position: a concrete (bound) term or an (unbound) variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    /// Resource or literal
    Term(RdfTerm),
    /// Unbound slot
    Variable(Variable),
}

impl PatternTerm {
    /// Shorthand for a variable position
    pub fn var(name: &str) -> Self {
        PatternTerm::Variable(Variable::new(name))
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, PatternTerm::Term(_))
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            PatternTerm::Variable(v) => Some(v),
            PatternTerm::Term(_) => None,
        }
    }

    pub fn as_term(&self) -> Option<&RdfTerm> {
        match self {
            PatternTerm::Term(t) => Some(t),
            PatternTerm::Variable(_) => None,
        }
    }
}

impl fmt::Display for PatternTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternTerm::Term(t) => write!(f, "{}", t),
            PatternTerm::Variable(v) => write!(f, "{}", v),
        }
    }
}

impl From<Variable> for PatternTerm {
    fn from(v: Variable) -> Self {
        PatternTerm::Variable(v)
    }
}

impl From<RdfTerm> for PatternTerm {
    fn from(t: RdfTerm) -> Self {
        PatternTerm::Term(t)
    }
}

impl From<NamedNode> for PatternTerm {
    fn from(n: NamedNode) -> Self {
        PatternTerm::Term(n.into())
    }
}

impl From<BlankNode> for PatternTerm {
    fn from(b: BlankNode) -> Self {
        PatternTerm::Term(b.into())
    }
}

impl From<Literal> for PatternTerm {
    fn from(l: Literal) -> Self {
        PatternTerm::Term(l.into())
    }
}

/// Triple or quadruple pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Context (named graph); `None` leaves the graph unconstrained and unprojected
    pub context: Option<PatternTerm>,
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
    /// Rows must not be eliminated when this pattern has no match
    pub is_optional: bool,
    /// Rows are unioned with the next sibling instead of joined
    pub join_as_union: bool,
}

impl Pattern {
    /// Create a triple pattern
    pub fn new(
        subject: impl Into<PatternTerm>,
        predicate: impl Into<PatternTerm>,
        object: impl Into<PatternTerm>,
    ) -> Self {
        Self {
            context: None,
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            is_optional: false,
            join_as_union: false,
        }
    }

    /// Restrict the pattern to a context, making it a quadruple pattern
    #[must_use]
    pub fn in_context(mut self, context: impl Into<PatternTerm>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    #[must_use]
    pub fn union(mut self) -> Self {
        self.join_as_union = true;
        self
    }

    /// Variables of the pattern in C, S, P, O order (repeats included)
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.context
            .iter()
            .chain([&self.subject, &self.predicate, &self.object])
            .filter_map(PatternTerm::as_variable)
    }
}

/// How a path step relates to its neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFlavor {
    /// `a / b`
    Sequence,
    /// `a | b`: consecutive alternative steps share a start and an end
    Alternative,
}

/// One property of a property path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    property: NamedNode,
    flavor: PathFlavor,
    ordinal: usize,
    inverse: bool,
}

impl PathStep {
    /// Create a step; the property must be an IRI
    pub fn new(property: impl Into<PatternTerm>, flavor: PathFlavor, ordinal: usize) -> SparqlResult<Self> {
        match property.into() {
            PatternTerm::Term(RdfTerm::NamedNode(property)) => Ok(Self {
                property,
                flavor,
                ordinal,
                inverse: false,
            }),
            other => Err(SparqlError::InvalidPath(format!(
                "step {} needs an IRI property, got {}",
                ordinal, other
            ))),
        }
    }

    /// `^p`: traverse object to subject
    #[must_use]
    pub fn inverse(mut self) -> Self {
        self.inverse = true;
        self
    }

    pub fn property(&self) -> &NamedNode {
        &self.property
    }

    pub fn flavor(&self) -> PathFlavor {
        self.flavor
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn is_inverse(&self) -> bool {
        self.inverse
    }
}

/// Property path between a start and an end term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    start: PatternTerm,
    end: PatternTerm,
    steps: Vec<PathStep>,
    pub is_optional: bool,
    pub join_as_union: bool,
}

impl PropertyPath {
    /// Create a path; steps are ordered by their ordinal
    ///
    /// Start and end must be resources or variables, and at least one step is required.
    pub fn new(
        start: impl Into<PatternTerm>,
        end: impl Into<PatternTerm>,
        mut steps: Vec<PathStep>,
    ) -> SparqlResult<Self> {
        let start = start.into();
        let end = end.into();
        for (label, term) in [("start", &start), ("end", &end)] {
            if let PatternTerm::Term(RdfTerm::Literal(l)) = term {
                return Err(SparqlError::InvalidPath(format!("path {} cannot be the literal {}", label, l)));
            }
        }
        if steps.is_empty() {
            return Err(SparqlError::InvalidPath("path has no steps".to_string()));
        }
        steps.sort_by_key(PathStep::ordinal);

        Ok(Self {
            start,
            end,
            steps,
            is_optional: false,
            join_as_union: false,
        })
    }

    /// Sequence path `p1 / p2 / ...`
    pub fn sequence(
        start: impl Into<PatternTerm>,
        end: impl Into<PatternTerm>,
        properties: impl IntoIterator<Item = NamedNode>,
    ) -> SparqlResult<Self> {
        Self::from_properties(start, end, properties, PathFlavor::Sequence)
    }

    /// Alternative path `p1 | p2 | ...`
    pub fn alternative(
        start: impl Into<PatternTerm>,
        end: impl Into<PatternTerm>,
        properties: impl IntoIterator<Item = NamedNode>,
    ) -> SparqlResult<Self> {
        Self::from_properties(start, end, properties, PathFlavor::Alternative)
    }

    fn from_properties(
        start: impl Into<PatternTerm>,
        end: impl Into<PatternTerm>,
        properties: impl IntoIterator<Item = NamedNode>,
        flavor: PathFlavor,
    ) -> SparqlResult<Self> {
        let steps = properties
            .into_iter()
            .enumerate()
            .map(|(i, p)| PathStep::new(p, flavor, i))
            .collect::<SparqlResult<Vec<_>>>()?;
        Self::new(start, end, steps)
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    #[must_use]
    pub fn union(mut self) -> Self {
        self.join_as_union = true;
        self
    }

    pub fn start(&self) -> &PatternTerm {
        &self.start
    }

    pub fn end(&self) -> &PatternTerm {
        &self.end
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }
}

/// Member of a conjunctive pattern group
#[derive(Debug, Clone)]
pub enum GroupMember {
    Pattern(Pattern),
    Path(PropertyPath),
}

impl GroupMember {
    pub fn is_optional(&self) -> bool {
        match self {
            GroupMember::Pattern(p) => p.is_optional,
            GroupMember::Path(p) => p.is_optional,
        }
    }

    pub fn join_as_union(&self) -> bool {
        match self {
            GroupMember::Pattern(p) => p.join_as_union,
            GroupMember::Path(p) => p.join_as_union,
        }
    }
}

impl From<Pattern> for GroupMember {
    fn from(p: Pattern) -> Self {
        GroupMember::Pattern(p)
    }
}

impl From<PropertyPath> for GroupMember {
    fn from(p: PropertyPath) -> Self {
        GroupMember::Path(p)
    }
}

/// Conjunctive group of patterns and paths plus its filters
#[derive(Debug, Clone, Default)]
pub struct PatternGroup {
    members: Vec<GroupMember>,
    filters: Vec<Filter>,
    pub is_optional: bool,
    pub join_as_union: bool,
}

impl PatternGroup {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, member: impl Into<GroupMember>) -> Self {
        self.members.push(member.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    #[must_use]
    pub fn union(mut self) -> Self {
        self.join_as_union = true;
        self
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }
}

/// Stable identity of a query member, used to key its result table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub usize);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member{}", self.0)
    }
}

/// Evaluable member of a query
#[derive(Debug, Clone)]
pub enum QueryMember {
    Group(PatternGroup),
    SubQuery(Box<Query>),
}

/// Projection: variable -> output ordinal
pub type Projection = IndexMap<Variable, usize>;

/// Query form
#[derive(Debug, Clone)]
pub enum QueryForm {
    /// Empty projection selects every column
    Select { projection: Projection },
    Ask,
    Construct { templates: Vec<Pattern> },
    /// Empty term list with members present describes every projected variable
    Describe { terms: Vec<PatternTerm> },
}

/// Graph-pattern query
#[derive(Debug, Clone)]
pub struct Query {
    form: QueryForm,
    members: Vec<QueryMember>,
    modifiers: Vec<Modifier>,
    pub is_optional: bool,
    pub join_as_union: bool,
}

impl Query {
    fn with_form(form: QueryForm) -> Self {
        Self {
            form,
            members: Vec::new(),
            modifiers: Vec::new(),
            is_optional: false,
            join_as_union: false,
        }
    }

    /// SELECT with variables numbered in the given order (empty = `*`)
    pub fn select(variables: impl IntoIterator<Item = Variable>) -> Self {
        let mut projection = Projection::new();
        for var in variables {
            let ordinal = projection.len();
            projection.entry(var).or_insert(ordinal);
        }
        Self::with_form(QueryForm::Select { projection })
    }

    /// SELECT with explicit output ordinals
    pub fn select_with_ordinals(projection: Projection) -> Self {
        Self::with_form(QueryForm::Select { projection })
    }

    pub fn ask() -> Self {
        Self::with_form(QueryForm::Ask)
    }

    pub fn construct(templates: Vec<Pattern>) -> Self {
        Self::with_form(QueryForm::Construct { templates })
    }

    pub fn describe(terms: Vec<PatternTerm>) -> Self {
        Self::with_form(QueryForm::Describe { terms })
    }

    #[must_use]
    pub fn with_group(mut self, group: PatternGroup) -> Self {
        self.members.push(QueryMember::Group(group));
        self
    }

    #[must_use]
    pub fn with_subquery(mut self, query: Query) -> Self {
        self.members.push(QueryMember::SubQuery(Box::new(query)));
        self
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    #[must_use]
    pub fn union(mut self) -> Self {
        self.join_as_union = true;
        self
    }

    pub fn form(&self) -> &QueryForm {
        &self.form
    }

    /// Members with their stable ids
    pub fn members(&self) -> impl Iterator<Item = (MemberId, &QueryMember)> {
        self.members.iter().enumerate().map(|(i, m)| (MemberId(i), m))
    }

    pub fn has_members(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }
}
