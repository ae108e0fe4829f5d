//! Table combiner: union, inner join and optional (outer) combine of solution tables

use super::algebra::Variable;
use super::results::{Row, SolutionTable};
use crate::rdf::RdfTerm;
use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Combine tables left to right
///
/// First every table flagged `join_as_union` (or every table, with `force_merge`) is
/// merged into its successor's schema. Once a merge has happened, the remaining
/// joins keep unbound cells (outer combine). Otherwise a table flagged optional is
/// outer-combined and the rest are inner-joined.
pub fn combine(tables: Vec<SolutionTable>, force_merge: bool) -> SolutionTable {
    let mut preserve_unbound = false;
    let mut remaining: Vec<SolutionTable> = Vec::with_capacity(tables.len());
    let mut carry: Option<SolutionTable> = None;

    for table in tables {
        carry = Some(match carry.take() {
            None => table,
            Some(earlier) if force_merge || earlier.join_as_union => {
                preserve_unbound = true;
                merge(earlier, table)
            }
            Some(earlier) => {
                remaining.push(earlier);
                table
            }
        });
    }
    remaining.extend(carry);

    let mut iter = remaining.into_iter();
    let Some(mut acc) = iter.next() else {
        return SolutionTable::empty("combined");
    };
    for right in iter {
        acc = if preserve_unbound || right.is_optional {
            outer_combine(acc, &right)
        } else {
            inner_combine(acc, &right)
        };
    }
    acc
}

/// Merge `earlier`'s rows into `later`'s schema (row-set union)
pub fn merge(earlier: SolutionTable, mut later: SolutionTable) -> SolutionTable {
    for var in earlier.columns() {
        later.add_column(var.clone());
    }
    let mapping: Vec<usize> = earlier
        .columns()
        .iter()
        .filter_map(|var| later.column_index(var))
        .collect();
    let width = later.columns().len();

    trace!(
        "merging {} rows of {} into {}",
        earlier.len(),
        earlier.name(),
        later.name()
    );
    let mut rows: Vec<Row> = earlier
        .into_rows()
        .into_iter()
        .map(|row| {
            let mut out = vec![None; width];
            for (cell, &target) in row.into_iter().zip(&mapping) {
                out[target] = cell;
            }
            out
        })
        .collect();
    let mut merged = SolutionTable::new(later.name(), later.columns().iter().cloned())
        .with_flags(later.is_optional, later.join_as_union);
    rows.extend(later.into_rows());
    merged.set_rows(rows);
    merged
}

/// Columns shared by both tables, as (left index, right index)
fn shared_columns(left: &SolutionTable, right: &SolutionTable) -> Vec<(usize, usize)> {
    left.columns()
        .iter()
        .enumerate()
        .filter_map(|(li, var)| right.column_index(var).map(|ri| (li, ri)))
        .collect()
}

/// Output schema: left columns followed by right-only columns
fn joined_schema(left: &SolutionTable, right: &SolutionTable) -> (IndexSet<Variable>, Vec<usize>) {
    let mut columns = left.columns().clone();
    let mut right_only = Vec::new();
    for (ri, var) in right.columns().iter().enumerate() {
        if columns.insert(var.clone()) {
            right_only.push(ri);
        }
    }
    (columns, right_only)
}

fn extend_row(left: &Row, right: &Row, right_only: &[usize]) -> Row {
    let mut row = Vec::with_capacity(left.len() + right_only.len());
    row.extend_from_slice(left);
    row.extend(right_only.iter().map(|&ri| right[ri].clone()));
    row
}

/// Inner join on every shared column, or cartesian product when none are shared
///
/// An unbound key cell never matches.
pub fn inner_combine(left: SolutionTable, right: &SolutionTable) -> SolutionTable {
    let shared = shared_columns(&left, right);
    let (columns, right_only) = joined_schema(&left, right);
    let mut rows = Vec::new();

    if shared.is_empty() {
        trace!("cartesian product {} x {}", left.len(), right.len());
        rows.reserve(left.len() * right.len());
        for l in left.rows() {
            for r in right.rows() {
                rows.push(extend_row(l, r, &right_only));
            }
        }
    } else {
        trace!("hash join on {} shared columns", shared.len());
        let mut index: FxHashMap<Vec<&RdfTerm>, Vec<&Row>> = FxHashMap::default();
        for r in right.rows() {
            if let Some(key) = join_key(r, shared.iter().map(|&(_, ri)| ri)) {
                index.entry(key).or_default().push(r);
            }
        }
        for l in left.rows() {
            let Some(key) = join_key(l, shared.iter().map(|&(li, _)| li)) else {
                continue;
            };
            if let Some(matches) = index.get(&key) {
                rows.extend(matches.iter().map(|r| extend_row(l, r, &right_only)));
            }
        }
    }

    finish(&left, columns, rows)
}

fn join_key(row: &Row, positions: impl Iterator<Item = usize>) -> Option<Vec<&RdfTerm>> {
    positions.map(|i| row[i].as_ref()).collect()
}

/// Left-preserving combine with null-coalescing on shared columns
///
/// A pairing is kept when no shared column holds two different bound values; an
/// unbound side takes the other side's value. A left row with no valid pairing
/// survives only when `right` is optional.
pub fn outer_combine(left: SolutionTable, right: &SolutionTable) -> SolutionTable {
    let shared = shared_columns(&left, right);
    let (columns, right_only) = joined_schema(&left, right);
    let mut rows = Vec::new();

    for l in left.rows() {
        let mut paired = false;
        for r in right.rows() {
            let compatible = shared.iter().all(|&(li, ri)| match (&l[li], &r[ri]) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            });
            if !compatible {
                continue;
            }
            let mut row = extend_row(l, r, &right_only);
            for &(li, ri) in &shared {
                if row[li].is_none() {
                    row[li] = r[ri].clone();
                }
            }
            rows.push(row);
            paired = true;
        }
        if !paired && right.is_optional {
            let mut row = l.clone();
            row.resize(columns.len(), None);
            rows.push(row);
        }
    }

    trace!(
        "outer combine {} with {}: {} rows",
        left.name(),
        right.name(),
        rows.len()
    );
    finish(&left, columns, rows)
}

fn finish(left: &SolutionTable, columns: IndexSet<Variable>, rows: Vec<Row>) -> SolutionTable {
    let mut table = SolutionTable::new(left.name(), columns).with_flags(left.is_optional, left.join_as_union);
    table.set_rows(rows);
    table
}
