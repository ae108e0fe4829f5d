//! Query executor
//!
//! Evaluates the members of a query against a data source, folds their tables with
//! the combiner and runs the modifier pipeline. All intermediate state lives in the
//! call frames of one evaluation; the executor itself only borrows its inputs.

use super::algebra::{
    GroupMember, MemberId, Pattern, PatternGroup, PatternTerm, PropertyPath, Query, QueryForm, QueryMember,
};
use super::combine::combine;
use super::matcher::match_pattern;
use super::modifier::apply_modifiers;
use super::path;
use super::results::{context_column, fact_columns, QueryResults, RowView, SolutionTable};
use super::source::{DataSource, Fact};
use super::{SparqlError, SparqlResult};
use crate::config::EngineConfig;
use crate::rdf::{RdfObject, RdfPredicate, RdfSubject, RdfTerm, Triple};
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Query executor bound to one data source
pub struct SparqlExecutor<'a> {
    source: DataSource<'a>,
    config: &'a EngineConfig,
    /// Member path from the outermost query, keeps path intermediates of subqueries apart
    scope: String,
}

impl<'a> SparqlExecutor<'a> {
    pub fn new(source: DataSource<'a>, config: &'a EngineConfig) -> Self {
        Self {
            source,
            config,
            scope: String::new(),
        }
    }

    fn nested(&self, id: MemberId) -> Self {
        Self {
            source: self.source,
            config: self.config,
            scope: format!("{}{}/", self.scope, id.0),
        }
    }

    /// Execute any query form
    pub fn execute(&self, query: &Query) -> SparqlResult<QueryResults> {
        match query.form() {
            QueryForm::Select { .. } => self.execute_select(query),
            QueryForm::Ask => self.execute_ask(query).map(QueryResults::Boolean),
            QueryForm::Construct { templates } => self.execute_construct(query, templates),
            QueryForm::Describe { terms } => self.execute_describe(query, terms),
        }
    }

    /// Execute a SELECT query
    pub fn execute_select(&self, query: &Query) -> SparqlResult<QueryResults> {
        let mut table = self.solutions(query)?;
        table.set_name("SELECT");
        Ok(QueryResults::Solutions(table))
    }

    /// Execute an ASK query: whether the combined table has any row
    pub fn execute_ask(&self, query: &Query) -> SparqlResult<bool> {
        Ok(!self.evaluate_members(query)?.is_empty())
    }

    /// Execute a CONSTRUCT query
    ///
    /// A template is instantiated for every row binding all of its variables.
    /// Instantiations that would put a literal in subject position, or a
    /// non-IRI in predicate position, are skipped. Ground templates are emitted
    /// once whatever the row count.
    pub fn execute_construct(&self, query: &Query, templates: &[Pattern]) -> SparqlResult<QueryResults> {
        if let Some(template) = templates.iter().find(|t| t.context.is_some()) {
            return Err(SparqlError::InvalidPattern(format!(
                "CONSTRUCT template {} {} {} has a context",
                template.subject, template.predicate, template.object
            )));
        }
        let table = apply_modifiers(self.evaluate_members(query)?, query.modifiers(), None);

        let mut triples: IndexSet<Triple> = IndexSet::new();
        for template in templates {
            let variables: Vec<_> = template.variables().collect();
            if variables.is_empty() {
                triples.extend(instantiate(template, None));
                continue;
            }
            if let Some(missing) = variables.iter().find(|v| !table.has_column(v)) {
                trace!("skipping CONSTRUCT template: {} is not bound by the query", missing);
                continue;
            }
            for row in table.views() {
                match instantiate(template, Some(&row)) {
                    Some(triple) => {
                        triples.insert(triple);
                    }
                    None => trace!("skipping CONSTRUCT template for a row with an unusable binding"),
                }
            }
        }

        debug!("CONSTRUCT produced {} triples", triples.len());
        Ok(QueryResults::Graph(fact_table(
            "CONSTRUCT",
            triples.into_iter().map(Fact::Triple),
            false,
        )))
    }

    /// Execute a DESCRIBE query
    ///
    /// Without members only bound describe terms count. With members and no terms,
    /// every column of the combined table is described.
    pub fn execute_describe(&self, query: &Query, terms: &[PatternTerm]) -> SparqlResult<QueryResults> {
        let mut described: IndexSet<RdfTerm> = IndexSet::new();

        if !query.has_members() {
            described.extend(terms.iter().filter_map(PatternTerm::as_term).cloned());
        } else {
            let table = apply_modifiers(self.evaluate_members(query)?, query.modifiers(), None);
            let terms: Vec<PatternTerm> = if terms.is_empty() {
                table.columns().iter().cloned().map(PatternTerm::Variable).collect()
            } else {
                terms.to_vec()
            };
            for term in &terms {
                match term {
                    PatternTerm::Term(t) => {
                        described.insert(t.clone());
                    }
                    PatternTerm::Variable(v) => {
                        described.extend(table.views().filter_map(|row| row.get(v)).cloned());
                    }
                }
            }
        }

        let mut facts: IndexSet<Fact> = IndexSet::new();
        for term in &described {
            facts.extend(self.source.describe(term));
        }
        debug!("DESCRIBE of {} terms produced {} facts", described.len(), facts.len());
        Ok(QueryResults::Graph(fact_table(
            "DESCRIBE",
            facts,
            self.source.has_quads(),
        )))
    }

    /// Members combined and modified: the solutions a query hands back
    pub fn solutions(&self, query: &Query) -> SparqlResult<SolutionTable> {
        let projection = match query.form() {
            QueryForm::Select { projection } => Some(projection),
            _ => None,
        };
        let combined = self.evaluate_members(query)?;
        Ok(apply_modifiers(combined, query.modifiers(), projection))
    }

    /// Evaluate every member and combine their tables, before modifiers
    pub fn evaluate_members(&self, query: &Query) -> SparqlResult<SolutionTable> {
        let mut tables: IndexMap<MemberId, SolutionTable> = IndexMap::new();

        for (id, member) in query.members() {
            let table = match member {
                QueryMember::Group(group) => self.evaluate_group(group, &self.source, id)?,
                QueryMember::SubQuery(sub) => {
                    let mut table = self
                        .nested(id)
                        .solutions(sub)?
                        .with_flags(sub.is_optional, sub.join_as_union);
                    table.set_name(id.to_string());
                    table
                }
            };
            debug!("{} produced {} rows", id, table.len());
            tables.insert(id, table);
        }

        let combined = combine(tables.into_values().collect(), false);
        self.check_size(&combined)?;
        Ok(combined)
    }

    /// Evaluate a pattern group, fanning out over federation members
    ///
    /// Per-member tables are merged column-preserving; any failing member fails
    /// the whole group.
    pub fn evaluate_group(
        &self,
        group: &PatternGroup,
        source: &DataSource<'_>,
        id: MemberId,
    ) -> SparqlResult<SolutionTable> {
        let DataSource::Federation(members) = source else {
            return self.evaluate_group_in(group, source, id);
        };

        debug!("evaluating {} against {} federation members", id, members.len());
        let evaluate = |(index, member): (usize, &DataSource<'_>)| {
            self.evaluate_group(group, member, id)
                .map_err(|e| SparqlError::Federation {
                    member: index,
                    source: Box::new(e),
                })
        };
        let tables = if self.config.parallel_federation {
            members.par_iter().enumerate().map(&evaluate).collect::<SparqlResult<Vec<_>>>()?
        } else {
            members.iter().enumerate().map(&evaluate).collect::<SparqlResult<Vec<_>>>()?
        };

        let mut merged = combine(tables, true).with_flags(group.is_optional, group.join_as_union);
        merged.set_name(id.to_string());
        self.check_size(&merged)?;
        Ok(merged)
    }

    fn evaluate_group_in(
        &self,
        group: &PatternGroup,
        source: &DataSource<'_>,
        id: MemberId,
    ) -> SparqlResult<SolutionTable> {
        let mut tables = Vec::with_capacity(group.members().len());
        for (index, member) in group.members().iter().enumerate() {
            let table = match member {
                GroupMember::Pattern(pattern) => match_pattern(pattern, source),
                GroupMember::Path(path) => {
                    let scope = format!("{}{}.{}", self.scope, id.0, index);
                    self.evaluate_path(path, source, &scope)
                }
            }
            .with_flags(member.is_optional(), member.join_as_union());
            self.check_size(&table)?;
            tables.push(table);
        }

        let mut table = combine(tables, false).with_flags(group.is_optional, group.join_as_union);
        table.set_name(id.to_string());
        self.check_size(&table)?;

        if !group.filters().is_empty() {
            let before = table.len();
            table.retain_rows(|row| {
                group.filters().iter().all(|filter| match filter.evaluate(&row) {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        trace!("filter rejected row: {}", e);
                        false
                    }
                })
            });
            trace!("filters kept {} of {} rows in {}", table.len(), before, id);
        }
        Ok(table)
    }

    /// Compile a path, match its patterns and drop the intermediate columns
    fn evaluate_path(&self, path: &PropertyPath, source: &DataSource<'_>, scope: &str) -> SolutionTable {
        let tables = path::compile_scoped(path, scope)
            .iter()
            .map(|p| match_pattern(p, source).with_flags(p.is_optional, p.join_as_union))
            .collect();
        let mut table = combine(tables, false);
        if self.config.strip_synthetic {
            table.strip_synthetic();
        }
        table
    }

    fn check_size(&self, table: &SolutionTable) -> SparqlResult<()> {
        match self.config.max_rows {
            Some(max) if table.len() > max => Err(SparqlError::Evaluation(format!(
                "table {} has {} rows, more than the configured maximum of {}",
                table.name(),
                table.len(),
                max
            ))),
            _ => Ok(()),
        }
    }
}

/// Substitute row values into a template; `None` when the result is not a valid triple
fn instantiate(template: &Pattern, row: Option<&RowView<'_>>) -> Option<Triple> {
    let resolve = |term: &PatternTerm| match term {
        PatternTerm::Term(t) => Some(t.clone()),
        PatternTerm::Variable(v) => row?.get(v).cloned(),
    };
    Some(Triple::new(
        RdfSubject::try_from(resolve(&template.subject)?).ok()?,
        RdfPredicate::try_from(resolve(&template.predicate)?).ok()?,
        RdfObject::from(resolve(&template.object)?),
    ))
}

/// Fact-shaped table: `?SUBJECT ?PREDICATE ?OBJECT`, plus `?CONTEXT` when requested
fn fact_table(name: &str, facts: impl IntoIterator<Item = Fact>, with_context: bool) -> SolutionTable {
    let mut columns = fact_columns().to_vec();
    if with_context {
        columns.push(context_column());
    }
    let mut table = SolutionTable::new(name, columns);
    for fact in facts {
        let mut row = vec![
            Some(RdfTerm::from(fact.subject().clone())),
            Some(RdfTerm::from(fact.predicate().clone())),
            Some(RdfTerm::from(fact.object().clone())),
        ];
        if with_context {
            row.push(fact.context().cloned().map(RdfTerm::from));
        }
        table.push_row(row);
    }
    table
}
