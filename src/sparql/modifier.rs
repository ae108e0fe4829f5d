//! Solution modifiers
//!
//! Applied once to the combined, filtered table in a fixed order: group-by,
//! order-by, projection, distinct, offset, limit. Only SELECT queries group,
//! order and project.

use super::algebra::{Projection, Variable};
use super::results::{Row, SolutionTable};
use crate::rdf::{Literal, RdfTerm, XSD};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use tracing::trace;

/// Aggregate function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    GroupConcat { separator: String },
}

/// Aggregation in a GROUP BY
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub function: AggregateFunction,
    /// Input variable; `None` counts rows (`COUNT(*)`)
    pub variable: Option<Variable>,
    pub output: Variable,
    pub distinct: bool,
}

impl Aggregate {
    pub fn new(function: AggregateFunction, variable: Option<&str>, output: &str) -> Self {
        Self {
            function,
            variable: variable.map(Variable::new),
            output: Variable::new(output),
            distinct: false,
        }
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// GROUP BY keys with their aggregates
#[derive(Debug, Clone, Default)]
pub struct GroupBy {
    pub keys: Vec<Variable>,
    pub aggregates: Vec<Aggregate>,
}

impl GroupBy {
    pub fn new(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| Variable::new(k)).collect(),
            aggregates: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }
}

/// ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub variable: Variable,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(name: &str) -> Self {
        Self {
            variable: Variable::new(name),
            descending: false,
        }
    }

    pub fn desc(name: &str) -> Self {
        Self {
            variable: Variable::new(name),
            descending: true,
        }
    }
}

/// Query modifier
#[derive(Debug, Clone)]
pub enum Modifier {
    GroupBy(GroupBy),
    OrderBy(Vec<OrderKey>),
    Distinct,
    Offset(usize),
    Limit(usize),
}

/// Run the modifier pipeline
///
/// `projection` is `Some` for SELECT; other query forms only get distinct, offset
/// and limit. ORDER BY modifiers are concatenated into one comparator, first key
/// most significant.
pub fn apply_modifiers(
    mut table: SolutionTable,
    modifiers: &[Modifier],
    projection: Option<&Projection>,
) -> SolutionTable {
    if let Some(declared) = projection {
        let mut projection = declared.clone();
        for modifier in modifiers {
            if let Modifier::GroupBy(group_by) = modifier {
                table = group(table, group_by);
                projection = table
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(ordinal, var)| (var.clone(), ordinal))
                    .collect();
            }
        }

        let keys: Vec<&OrderKey> = modifiers
            .iter()
            .filter_map(|m| match m {
                Modifier::OrderBy(keys) => Some(keys.iter()),
                _ => None,
            })
            .flatten()
            .collect();
        if !keys.is_empty() {
            order_by(&mut table, &keys);
        }

        if !projection.is_empty() {
            table = project(table, &projection);
        }
    }

    if modifiers.iter().any(|m| matches!(m, Modifier::Distinct)) {
        distinct(&mut table);
    }
    for modifier in modifiers {
        if let Modifier::Offset(n) = modifier {
            table.map_rows(|rows| rows.into_iter().skip(*n).collect());
        }
    }
    for modifier in modifiers {
        if let Modifier::Limit(n) = modifier {
            table.map_rows(|rows| rows.into_iter().take(*n).collect());
        }
    }
    trace!("modifiers produced {} rows", table.len());
    table
}

/// Stable sort by the given keys
pub fn order_by(table: &mut SolutionTable, keys: &[&OrderKey]) {
    let positions: Vec<(Option<usize>, bool)> = keys
        .iter()
        .map(|k| (table.column_index(&k.variable), k.descending))
        .collect();

    table.map_rows(|mut rows| {
        rows.sort_by(|a, b| {
            for &(position, descending) in &positions {
                let Some(i) = position else { continue };
                let ordering = compare_terms(a[i].as_ref(), b[i].as_ref());
                let ordering = if descending { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        rows
    });
}

/// Keep and reorder columns by ordinal; missing variables become unbound columns
pub fn project(table: SolutionTable, projection: &Projection) -> SolutionTable {
    let mut selected: Vec<(&Variable, usize)> = projection.iter().map(|(v, &o)| (v, o)).collect();
    selected.sort_by_key(|&(_, ordinal)| ordinal);

    let sources: Vec<Option<usize>> = selected.iter().map(|(v, _)| table.column_index(v)).collect();
    let mut projected = SolutionTable::new(table.name(), selected.iter().map(|(v, _)| (*v).clone()))
        .with_flags(table.is_optional, table.join_as_union);
    let rows = table
        .into_rows()
        .into_iter()
        .map(|row| sources.iter().map(|s| s.and_then(|i| row[i].clone())).collect())
        .collect();
    projected.set_rows(rows);
    projected
}

/// Drop repeated rows, keeping first occurrences in order
pub fn distinct(table: &mut SolutionTable) {
    let mut seen: FxHashSet<Row> = FxHashSet::default();
    table.map_rows(|rows| rows.into_iter().filter(|row| seen.insert(row.clone())).collect());
}

/// Partition by the key columns and compute aggregates per partition
///
/// Output columns are the keys followed by the aggregate outputs. Without keys,
/// the whole table is one group, even when it is empty.
pub fn group(table: SolutionTable, group_by: &GroupBy) -> SolutionTable {
    let key_positions: Vec<Option<usize>> = group_by.keys.iter().map(|k| table.column_index(k)).collect();
    let input_positions: Vec<Option<usize>> = group_by
        .aggregates
        .iter()
        .map(|a| a.variable.as_ref().and_then(|v| table.column_index(v)))
        .collect();

    let mut index: FxHashMap<Row, usize> = FxHashMap::default();
    let mut groups: Vec<(Row, Vec<AggregatorState>)> = Vec::new();
    let new_states = || group_by.aggregates.iter().map(AggregatorState::new).collect::<Vec<_>>();

    if group_by.keys.is_empty() {
        groups.push((Vec::new(), new_states()));
        index.insert(Vec::new(), 0);
    }

    for row in table.rows() {
        let key: Row = key_positions.iter().map(|p| p.and_then(|i| row[i].clone())).collect();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, new_states()));
            groups.len() - 1
        });
        let states = &mut groups[slot].1;
        for ((state, aggregate), position) in states.iter_mut().zip(&group_by.aggregates).zip(&input_positions) {
            match (&aggregate.variable, position) {
                (None, _) => state.update_row(row),
                (Some(_), Some(i)) => {
                    if let Some(value) = &row[*i] {
                        state.update(value);
                    }
                }
                (Some(_), None) => {}
            }
        }
    }

    let columns = group_by
        .keys
        .iter()
        .chain(group_by.aggregates.iter().map(|a| &a.output))
        .cloned();
    let mut grouped = SolutionTable::new(table.name(), columns).with_flags(table.is_optional, table.join_as_union);
    trace!("grouped {} rows into {} groups", table.len(), groups.len());
    for (mut key, states) in groups {
        key.extend(states.into_iter().map(AggregatorState::result));
        grouped.push_row(key);
    }
    grouped
}

/// Running state for one aggregate in one group
#[derive(Debug, Clone)]
struct AggregatorState {
    kind: StateKind,
    /// DISTINCT inputs seen so far; whole rows for `COUNT(DISTINCT *)`
    seen: Option<FxHashSet<Row>>,
}

#[derive(Debug, Clone)]
enum StateKind {
    Count(i64),
    /// `exact` is kept while every input is an integer that fits
    Sum { total: f64, exact: Option<i128> },
    Avg { sum: f64, count: i64 },
    Min(Option<RdfTerm>),
    Max(Option<RdfTerm>),
    Sample(Option<RdfTerm>),
    GroupConcat { separator: String, parts: Vec<String> },
}

impl AggregatorState {
    fn new(aggregate: &Aggregate) -> Self {
        let kind = match &aggregate.function {
            AggregateFunction::Count => StateKind::Count(0),
            AggregateFunction::Sum => StateKind::Sum { total: 0.0, exact: Some(0) },
            AggregateFunction::Avg => StateKind::Avg { sum: 0.0, count: 0 },
            AggregateFunction::Min => StateKind::Min(None),
            AggregateFunction::Max => StateKind::Max(None),
            AggregateFunction::Sample => StateKind::Sample(None),
            AggregateFunction::GroupConcat { separator } => StateKind::GroupConcat {
                separator: separator.clone(),
                parts: Vec::new(),
            },
        };
        Self {
            kind,
            seen: aggregate.distinct.then(FxHashSet::default),
        }
    }

    /// `COUNT(*)`: one more row
    fn update_row(&mut self, row: &Row) {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(row.clone()) {
                return;
            }
        }
        if let StateKind::Count(c) = &mut self.kind {
            *c += 1;
        }
    }

    fn update(&mut self, value: &RdfTerm) {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(vec![Some(value.clone())]) {
                return;
            }
        }
        let number = value.as_literal().and_then(Literal::as_f64);
        match &mut self.kind {
            StateKind::Count(c) => *c += 1,
            StateKind::Sum { total, exact } => {
                if let Some(n) = number {
                    *total += n;
                    let integer = value
                        .as_literal()
                        .filter(|l| is_integral(l))
                        .and_then(|l| l.value().trim().parse::<i128>().ok());
                    *exact = exact.zip(integer).and_then(|(sum, i)| sum.checked_add(i));
                }
            }
            StateKind::Avg { sum, count } => {
                if let Some(n) = number {
                    *sum += n;
                    *count += 1;
                }
            }
            StateKind::Min(curr) => {
                if curr.as_ref().map_or(true, |c| compare_terms(Some(value), Some(c)) == Ordering::Less) {
                    *curr = Some(value.clone());
                }
            }
            StateKind::Max(curr) => {
                if curr.as_ref().map_or(true, |c| compare_terms(Some(value), Some(c)) == Ordering::Greater) {
                    *curr = Some(value.clone());
                }
            }
            StateKind::Sample(curr) => {
                if curr.is_none() {
                    *curr = Some(value.clone());
                }
            }
            StateKind::GroupConcat { parts, .. } => parts.push(lexical(value)),
        }
    }

    fn result(self) -> Option<RdfTerm> {
        match self.kind {
            StateKind::Count(c) => Some(Literal::integer(c).into()),
            StateKind::Sum { total, exact } => Some(match exact {
                Some(sum) => Literal::big_integer(sum).into(),
                None => Literal::decimal(total).into(),
            }),
            StateKind::Avg { sum, count } => {
                (count > 0).then(|| Literal::decimal(sum / count as f64).into())
            }
            StateKind::Min(v) | StateKind::Max(v) | StateKind::Sample(v) => v,
            StateKind::GroupConcat { separator, parts } => {
                Some(Literal::new_simple_literal(parts.join(&separator)).into())
            }
        }
    }
}

fn is_integral(literal: &Literal) -> bool {
    literal.is_numeric()
        && !matches!(
            literal.datatype_iri().strip_prefix(XSD),
            Some("decimal" | "double" | "float")
        )
}

fn lexical(term: &RdfTerm) -> String {
    match term {
        RdfTerm::NamedNode(n) => n.as_str().to_string(),
        RdfTerm::BlankNode(b) => b.as_str().to_string(),
        RdfTerm::Literal(l) => l.value().to_string(),
    }
}

fn kind_rank(term: Option<&RdfTerm>) -> u8 {
    match term {
        None => 0,
        Some(RdfTerm::BlankNode(_)) => 1,
        Some(RdfTerm::NamedNode(_)) => 2,
        Some(RdfTerm::Literal(_)) => 3,
    }
}

/// Total order over optional terms
///
/// Unbound < blank node < IRI < numeric literal < other literal. Numeric literals
/// compare by value; ties and other literals fall back to lexical form, then
/// datatype, then language.
pub fn compare_terms(a: Option<&RdfTerm>, b: Option<&RdfTerm>) -> Ordering {
    match (a, b) {
        (Some(RdfTerm::BlankNode(x)), Some(RdfTerm::BlankNode(y))) => x.as_str().cmp(y.as_str()),
        (Some(RdfTerm::NamedNode(x)), Some(RdfTerm::NamedNode(y))) => x.as_str().cmp(y.as_str()),
        (Some(RdfTerm::Literal(x)), Some(RdfTerm::Literal(y))) => {
            let (m, n) = (x.as_f64(), y.as_f64());
            let by_number = match (m, n) {
                (Some(m), Some(n)) => m.total_cmp(&n),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_number
                .then_with(|| x.value().cmp(y.value()))
                .then_with(|| x.datatype_iri().cmp(y.datatype_iri()))
                .then_with(|| x.language().cmp(&y.language()))
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{BlankNode, NamedNode};

    fn ex(local: &str) -> Option<RdfTerm> {
        Some(NamedNode::new(&format!("http://example.org/{}", local)).unwrap().into())
    }

    fn int(n: i64) -> Option<RdfTerm> {
        Some(Literal::integer(n).into())
    }

    fn people() -> SolutionTable {
        let mut table = SolutionTable::new("people", vec![Variable::new("p"), Variable::new("dept"), Variable::new("age")]);
        table.push_row(vec![ex("alice"), ex("eng"), int(30)]);
        table.push_row(vec![ex("bob"), ex("eng"), int(25)]);
        table.push_row(vec![ex("carol"), ex("ops"), int(41)]);
        table.push_row(vec![ex("dave"), ex("ops"), None]);
        table
    }

    fn select_all() -> Projection {
        Projection::new()
    }

    #[test]
    fn test_term_ordering() {
        let blank: RdfTerm = BlankNode::from_id("b1").unwrap().into();
        assert_eq!(compare_terms(None, Some(&blank)), Ordering::Less);
        assert_eq!(compare_terms(Some(&blank), ex("a").as_ref()), Ordering::Less);
        assert_eq!(compare_terms(ex("z").as_ref(), int(1).as_ref()), Ordering::Less);
        assert_eq!(compare_terms(int(9).as_ref(), int(10).as_ref()), Ordering::Less);
        assert_eq!(
            compare_terms(Some(&Literal::new_simple_literal("b").into()), Some(&Literal::new_simple_literal("a").into())),
            Ordering::Greater
        );
    }

    #[test]
    fn test_numbers_sort_before_other_literals() {
        let odd: RdfTerm = Literal::new_simple_literal("1x").into();
        assert_eq!(compare_terms(int(9).as_ref(), int(10).as_ref()), Ordering::Less);
        assert_eq!(compare_terms(int(10).as_ref(), Some(&odd)), Ordering::Less);
        assert_eq!(compare_terms(int(9).as_ref(), Some(&odd)), Ordering::Less);
        assert_eq!(compare_terms(Some(&odd), int(9).as_ref()), Ordering::Greater);

        let mut terms = vec![Some(odd.clone()), int(10), Some(Literal::new_simple_literal("0").into()), int(9), None];
        terms.sort_by(|a, b| compare_terms(a.as_ref(), b.as_ref()));
        assert_eq!(terms, vec![None, int(9), int(10), Some(Literal::new_simple_literal("0").into()), Some(odd)]);
        for pair in terms.windows(2) {
            assert_ne!(compare_terms(pair[0].as_ref(), pair[1].as_ref()), Ordering::Greater);
        }
    }

    #[test]
    fn test_order_by_desc_then_asc() {
        let modifiers = vec![
            Modifier::OrderBy(vec![OrderKey::desc("dept")]),
            Modifier::OrderBy(vec![OrderKey::asc("age")]),
        ];
        let result = apply_modifiers(people(), &modifiers, Some(&select_all()));
        let names: Vec<Option<RdfTerm>> = result.rows().iter().map(|r| r[0].clone()).collect();
        assert_eq!(names, vec![ex("dave"), ex("carol"), ex("bob"), ex("alice")]);
    }

    #[test]
    fn test_projection_reorders_and_adds_missing() {
        let mut projection = Projection::new();
        projection.insert(Variable::new("age"), 1);
        projection.insert(Variable::new("p"), 0);
        projection.insert(Variable::new("missing"), 2);

        let result = apply_modifiers(people(), &[], Some(&projection));
        let names: Vec<&str> = result.columns().iter().map(Variable::name).collect();
        assert_eq!(names, vec!["P", "AGE", "MISSING"]);
        assert_eq!(result.rows()[0], vec![ex("alice"), int(30), None]);
    }

    #[test]
    fn test_distinct_preserves_order() {
        let mut projection = Projection::new();
        projection.insert(Variable::new("dept"), 0);
        let modifiers = vec![Modifier::OrderBy(vec![OrderKey::desc("dept")]), Modifier::Distinct];

        let result = apply_modifiers(people(), &modifiers, Some(&projection));
        assert_eq!(result.rows(), &[vec![ex("ops")], vec![ex("eng")]]);
    }

    #[test]
    fn test_offset_and_limit() {
        let modifiers = vec![Modifier::Limit(2), Modifier::Offset(1)];
        let result = apply_modifiers(people(), &modifiers, None);
        assert_eq!(result.len(), 2);
        assert_eq!(result.rows()[0][0], ex("bob"));
    }

    #[test]
    fn test_non_select_skips_order_and_projection() {
        let modifiers = vec![Modifier::OrderBy(vec![OrderKey::desc("p")])];
        let result = apply_modifiers(people(), &modifiers, None);
        assert_eq!(result.rows()[0][0], ex("alice"));
        assert_eq!(result.columns().len(), 3);
    }

    #[test]
    fn test_group_by_with_aggregates() {
        let group_by = GroupBy::new(&["dept"])
            .with_aggregate(Aggregate::new(AggregateFunction::Count, None, "n"))
            .with_aggregate(Aggregate::new(AggregateFunction::Count, Some("age"), "aged"))
            .with_aggregate(Aggregate::new(AggregateFunction::Sum, Some("age"), "total"))
            .with_aggregate(Aggregate::new(AggregateFunction::Max, Some("age"), "oldest"));
        let mut projection = Projection::new();
        projection.insert(Variable::new("p"), 0);

        let result = apply_modifiers(people(), &[Modifier::GroupBy(group_by)], Some(&projection));
        let names: Vec<&str> = result.columns().iter().map(Variable::name).collect();
        assert_eq!(names, vec!["DEPT", "N", "AGED", "TOTAL", "OLDEST"]);
        assert_eq!(result.rows()[0], vec![ex("eng"), int(2), int(2), int(55), int(30)]);
        assert_eq!(result.rows()[1], vec![ex("ops"), int(2), int(1), int(41), int(41)]);
    }

    #[test]
    fn test_group_without_keys_over_empty_table() {
        let empty = SolutionTable::new("empty", vec![Variable::new("x")]);
        let group_by = GroupBy::new(&[]).with_aggregate(Aggregate::new(AggregateFunction::Count, None, "n"));
        let result = group(empty, &group_by);
        assert_eq!(result.rows(), &[vec![int(0)]]);
    }

    #[test]
    fn test_distinct_count_and_group_concat() {
        let group_by = GroupBy::new(&[])
            .with_aggregate(Aggregate::new(AggregateFunction::Count, Some("dept"), "depts").distinct())
            .with_aggregate(Aggregate::new(
                AggregateFunction::GroupConcat { separator: ",".to_string() },
                Some("age"),
                "ages",
            ))
            .with_aggregate(Aggregate::new(AggregateFunction::Avg, Some("age"), "avg"));
        let result = group(people(), &group_by);
        assert_eq!(result.rows()[0][0], int(2));
        assert_eq!(result.rows()[0][1], Some(Literal::new_simple_literal("30,25,41").into()));
        assert_eq!(result.rows()[0][2], Some(Literal::decimal(32.0).into()));
    }

    #[test]
    fn test_sum_of_large_integers_is_exact() {
        let mut table = SolutionTable::new("big", vec![Variable::new("n")]);
        table.push_row(vec![int(9_007_199_254_740_993)]);
        table.push_row(vec![int(0)]);
        let group_by = GroupBy::new(&[]).with_aggregate(Aggregate::new(AggregateFunction::Sum, Some("n"), "total"));
        assert_eq!(group(table, &group_by).rows()[0][0], int(9_007_199_254_740_993));

        let mut table = SolutionTable::new("big", vec![Variable::new("n")]);
        table.push_row(vec![int(i64::MAX)]);
        table.push_row(vec![int(i64::MAX)]);
        let result = group(table, &group_by);
        let total = result.rows()[0][0].clone().unwrap();
        let literal = total.as_literal().unwrap();
        assert_eq!(literal.value(), "18446744073709551614");
        assert_eq!(literal.datatype_iri(), format!("{}integer", XSD));
    }

    #[test]
    fn test_count_distinct_rows() {
        let mut table = people();
        table.push_row(vec![ex("alice"), ex("eng"), int(30)]);
        let group_by = GroupBy::new(&[])
            .with_aggregate(Aggregate::new(AggregateFunction::Count, None, "all"))
            .with_aggregate(Aggregate::new(AggregateFunction::Count, None, "unique").distinct());
        let result = group(table, &group_by);
        assert_eq!(result.rows()[0][0], int(5));
        assert_eq!(result.rows()[0][1], int(4));
    }
}
