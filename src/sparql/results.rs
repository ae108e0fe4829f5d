//! Solution tables and query results

use super::algebra::Variable;
use super::{SparqlError, SparqlResult};
use crate::rdf::{RdfObject, RdfPredicate, RdfSubject, RdfTerm, Triple};
use indexmap::{IndexMap, IndexSet};
use serde_json::{json, Map, Value};

/// One row: a cell per column, `None` when the variable is unbound
pub type Row = Vec<Option<RdfTerm>>;

/// Named multiset of solutions over an ordered column schema
#[derive(Debug, Clone, Default)]
pub struct SolutionTable {
    name: String,
    columns: IndexSet<Variable>,
    rows: Vec<Row>,
    /// Absence of a match must not eliminate joined rows
    pub is_optional: bool,
    /// Rows are unioned with the next sibling table
    pub join_as_union: bool,
}

impl SolutionTable {
    /// Create an empty table with the given columns
    pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item = Variable>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().collect(),
            rows: Vec::new(),
            is_optional: false,
            join_as_union: false,
        }
    }

    /// Zero columns, zero rows
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, std::iter::empty())
    }

    /// Zero columns, one empty row: the identity for joins
    pub fn unit(name: impl Into<String>) -> Self {
        let mut table = Self::empty(name);
        table.rows.push(Vec::new());
        table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Set the combination flags
    #[must_use]
    pub fn with_flags(mut self, is_optional: bool, join_as_union: bool) -> Self {
        self.is_optional = is_optional;
        self.join_as_union = join_as_union;
        self
    }

    pub fn columns(&self) -> &IndexSet<Variable> {
        &self.columns
    }

    pub fn column_index(&self, variable: &Variable) -> Option<usize> {
        self.columns.get_index_of(variable)
    }

    pub fn has_column(&self, variable: &Variable) -> bool {
        self.columns.contains(variable)
    }

    /// Add a column, unbound in every existing row; returns its index
    pub fn add_column(&mut self, variable: Variable) -> usize {
        let (index, inserted) = self.columns.insert_full(variable);
        if inserted {
            for row in &mut self.rows {
                row.push(None);
            }
        }
        index
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn push_row(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub(crate) fn set_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
    }

    pub(crate) fn map_rows(&mut self, f: impl FnOnce(Vec<Row>) -> Vec<Row>) {
        let rows = std::mem::take(&mut self.rows);
        self.rows = f(rows);
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(RowView<'_>) -> bool) {
        let columns = &self.columns;
        self.rows.retain(|row| keep(RowView { columns, row }));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `variable` in row `index`
    pub fn value(&self, index: usize, variable: &Variable) -> Option<&RdfTerm> {
        let column = self.column_index(variable)?;
        self.rows.get(index)?.get(column)?.as_ref()
    }

    /// Borrowed views over every row
    pub fn views(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |row| RowView {
            columns: &self.columns,
            row,
        })
    }

    /// Owned solutions, one per row
    pub fn solutions(&self) -> impl Iterator<Item = QuerySolution> + '_ {
        self.views().map(|view| view.to_solution())
    }

    /// Drop columns holding property-path intermediates
    pub fn strip_synthetic(&mut self) {
        if !self.columns.iter().any(Variable::is_synthetic) {
            return;
        }
        let keep: Vec<bool> = self.columns.iter().map(|v| !v.is_synthetic()).collect();
        self.columns.retain(|v| !v.is_synthetic());
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| flags.next().copied().unwrap_or(true));
        }
    }

    /// Rebuild triples from a graph result (`?SUBJECT ?PREDICATE ?OBJECT`)
    pub fn triples(&self) -> SparqlResult<Vec<Triple>> {
        let [s, p, o] = fact_columns();
        let index = |var: &Variable| {
            self.column_index(var)
                .ok_or_else(|| SparqlError::Evaluation(format!("table {} has no {} column", self.name, var)))
        };
        let (si, pi, oi) = (index(&s)?, index(&p)?, index(&o)?);

        self.rows
            .iter()
            .filter_map(|row| match (&row[si], &row[pi], &row[oi]) {
                (Some(s), Some(p), Some(o)) => Some((s, p, o)),
                _ => None,
            })
            .map(|(s, p, o)| {
                Ok(Triple::new(
                    RdfSubject::try_from(s.clone())?,
                    RdfPredicate::try_from(p.clone())?,
                    RdfObject::from(o.clone()),
                ))
            })
            .collect()
    }
}

/// Columns of a fact-shaped table
pub(crate) fn fact_columns() -> [Variable; 3] {
    [
        Variable::new("subject"),
        Variable::new("predicate"),
        Variable::new("object"),
    ]
}

pub(crate) fn context_column() -> Variable {
    Variable::new("context")
}

/// A row together with the schema it belongs to
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a IndexSet<Variable>,
    row: &'a Row,
}

impl<'a> RowView<'a> {
    pub fn new(columns: &'a IndexSet<Variable>, row: &'a Row) -> Self {
        Self { columns, row }
    }

    /// Bound value of `variable`, if any
    pub fn get(&self, variable: &Variable) -> Option<&'a RdfTerm> {
        let index = self.columns.get_index_of(variable)?;
        self.row.get(index)?.as_ref()
    }

    pub fn to_solution(&self) -> QuerySolution {
        let bindings = self
            .columns
            .iter()
            .zip(self.row)
            .filter_map(|(var, cell)| cell.as_ref().map(|term| (var.clone(), term.clone())))
            .collect();
        QuerySolution { bindings }
    }
}

/// Query solution (variable bindings)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySolution {
    /// Bound variables in column order
    pub bindings: IndexMap<Variable, RdfTerm>,
}

impl QuerySolution {
    /// Get a binding by variable name (`?s`, `s` or `S`)
    pub fn get(&self, variable: &str) -> Option<&RdfTerm> {
        self.bindings.get(&Variable::new(variable))
    }
}

/// Result of a query
#[derive(Debug, Clone)]
pub enum QueryResults {
    /// SELECT
    Solutions(SolutionTable),
    /// ASK
    Boolean(bool),
    /// CONSTRUCT / DESCRIBE, as a fact table
    Graph(SolutionTable),
}

impl QueryResults {
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            QueryResults::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&SolutionTable> {
        match self {
            QueryResults::Solutions(t) | QueryResults::Graph(t) => Some(t),
            QueryResults::Boolean(_) => None,
        }
    }

    pub fn into_table(self) -> Option<SolutionTable> {
        match self {
            QueryResults::Solutions(t) | QueryResults::Graph(t) => Some(t),
            QueryResults::Boolean(_) => None,
        }
    }

    /// SPARQL 1.1 Query Results JSON document
    pub fn to_json(&self) -> Value {
        match self {
            QueryResults::Boolean(b) => json!({ "head": {}, "boolean": b }),
            QueryResults::Solutions(table) | QueryResults::Graph(table) => {
                let vars: Vec<&str> = table.columns().iter().map(Variable::name).collect();
                let bindings: Vec<Value> = table
                    .views()
                    .map(|view| {
                        let mut binding = Map::new();
                        for var in table.columns() {
                            if let Some(term) = view.get(var) {
                                binding.insert(var.name().to_string(), term_to_json(term));
                            }
                        }
                        Value::Object(binding)
                    })
                    .collect();
                json!({ "head": { "vars": vars }, "results": { "bindings": bindings } })
            }
        }
    }
}

fn term_to_json(term: &RdfTerm) -> Value {
    match term {
        RdfTerm::NamedNode(n) => json!({ "type": "uri", "value": n.as_str() }),
        RdfTerm::BlankNode(b) => json!({ "type": "bnode", "value": b.as_str() }),
        RdfTerm::Literal(l) => {
            let mut value = json!({ "type": "literal", "value": l.value() });
            if let Some(lang) = l.language() {
                value["xml:lang"] = json!(lang);
            } else if !l.is_simple() {
                value["datatype"] = json!(l.datatype_iri());
            }
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Literal, NamedNode};

    fn ex(local: &str) -> RdfTerm {
        NamedNode::new(&format!("http://example.org/{}", local)).unwrap().into()
    }

    #[test]
    fn test_add_column_pads_rows() {
        let mut table = SolutionTable::new("t", vec![Variable::new("s")]);
        table.push_row(vec![Some(ex("a"))]);
        let idx = table.add_column(Variable::new("o"));
        assert_eq!(idx, 1);
        assert_eq!(table.rows()[0], vec![Some(ex("a")), None]);
        assert_eq!(table.add_column(Variable::new("s")), 0);
    }

    #[test]
    fn test_strip_synthetic() {
        let mut table = SolutionTable::new("t", vec![Variable::new("s"), Variable::synthetic(0), Variable::new("o")]);
        table.push_row(vec![Some(ex("a")), Some(ex("m")), Some(ex("b"))]);
        table.strip_synthetic();

        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.rows()[0], vec![Some(ex("a")), Some(ex("b"))]);
    }

    #[test]
    fn test_solutions_skip_unbound() {
        let mut table = SolutionTable::new("t", vec![Variable::new("s"), Variable::new("o")]);
        table.push_row(vec![Some(ex("a")), None]);

        let solution = table.solutions().next().unwrap();
        assert_eq!(solution.get("?s"), Some(&ex("a")));
        assert_eq!(solution.get("o"), None);
    }

    #[test]
    fn test_triples_from_fact_table() {
        let mut table = SolutionTable::new("g", fact_columns());
        table.push_row(vec![Some(ex("a")), Some(ex("p")), Some(Literal::new_simple_literal("x").into())]);
        let triples = table.triples().unwrap();
        assert_eq!(triples.len(), 1);

        let other = SolutionTable::new("t", vec![Variable::new("s")]);
        assert!(other.triples().is_err());
    }

    #[test]
    fn test_json_format() {
        let mut table = SolutionTable::new("t", vec![Variable::new("s"), Variable::new("n")]);
        table.push_row(vec![Some(ex("a")), Some(Literal::integer(3).into())]);
        table.push_row(vec![None, Some(Literal::new_language_tagged_literal("hi", "en").unwrap().into())]);

        let json = QueryResults::Solutions(table).to_json();
        assert_eq!(json["head"]["vars"], json!(["S", "N"]));
        assert_eq!(json["results"]["bindings"][0]["S"]["type"], "uri");
        assert_eq!(json["results"]["bindings"][0]["N"]["datatype"], "http://www.w3.org/2001/XMLSchema#integer");
        assert!(json["results"]["bindings"][1].get("S").is_none());
        assert_eq!(json["results"]["bindings"][1]["N"]["xml:lang"], "en");

        assert_eq!(QueryResults::Boolean(true).to_json()["boolean"], true);
    }
}
