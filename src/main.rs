use anyhow::{Context, Result};
use rdfkit::rdf::{NamespaceManager, RdfFormat, RdfParser, RdfSerializer, RdfStore};
use rdfkit::sparql::{
    Aggregate, AggregateFunction, GroupBy, Modifier, OrderKey, Pattern, PatternGroup, PatternTerm,
    PropertyPath, Query, QueryResults, SparqlEngine, Variable,
};
use rdfkit::EngineConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = r#"
@prefix foaf: <http://xmlns.com/foaf/0.1/> .
@prefix ex: <http://example.org/> .

ex:alice foaf:name "Alice" ; foaf:knows ex:bob ; ex:worksFor ex:acme .
ex:bob foaf:name "Bob" ; foaf:knows ex:carol ; ex:worksFor ex:acme .
ex:carol foaf:name "Carol" ; ex:worksFor ex:initech .
ex:acme foaf:name "ACME" .
ex:initech foaf:name "Initech" .
"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("rdfkit v{}", rdfkit::version());
    println!("==========================================");

    let store = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            let format = RdfFormat::from_path(&path).unwrap_or(RdfFormat::Turtle);
            RdfParser::load_store(&path, format).with_context(|| format!("loading {}", path.display()))?
        }
        None => {
            let mut store = RdfStore::new();
            store.load(RdfParser::parse(SAMPLE, RdfFormat::Turtle).context("parsing sample graph")?);
            store
        }
    };
    info!("loaded {} triples", store.len());

    let config = match std::env::var("RDFKIT_CONFIG") {
        Ok(path) => EngineConfig::load(&path).with_context(|| format!("loading config {}", path))?,
        Err(_) => EngineConfig::default(),
    };
    let engine = SparqlEngine::with_config(config);
    let ns = NamespaceManager::new();
    let foaf = |local: &str| ns.named_node(&format!("foaf:{}", local));

    // Friends of friends, through a property path
    println!("\n=== SELECT with a property path ===");
    let path = PropertyPath::sequence(PatternTerm::var("person"), PatternTerm::var("fof"), vec![foaf("knows")?, foaf("knows")?])?;
    let query = Query::select(vec![Variable::new("person"), Variable::new("fof")])
        .with_group(PatternGroup::new().with(path))
        .with_modifier(Modifier::OrderBy(vec![OrderKey::asc("person")]));
    print_results(&ns, &engine.query(&query, &store)?);

    println!("\n=== SELECT with GROUP BY ===");
    let works_for = rdfkit::NamedNode::new("http://example.org/worksFor")?;
    let query = Query::select(vec![])
        .with_group(PatternGroup::new().with(Pattern::new(PatternTerm::var("p"), works_for.clone(), PatternTerm::var("org"))))
        .with_modifier(Modifier::GroupBy(
            GroupBy::new(&["org"]).with_aggregate(Aggregate::new(AggregateFunction::Count, None, "staff")),
        ))
        .with_modifier(Modifier::OrderBy(vec![OrderKey::desc("staff")]));
    print_results(&ns, &engine.query(&query, &store)?);

    println!("\n=== ASK ===");
    let query = Query::ask().with_group(
        PatternGroup::new().with(Pattern::new(PatternTerm::var("p"), foaf("knows")?, PatternTerm::var("p"))),
    );
    print_results(&ns, &engine.query(&query, &store)?);

    println!("\n=== CONSTRUCT ===");
    let colleague = rdfkit::NamedNode::new("http://example.org/colleague")?;
    let query = Query::construct(vec![Pattern::new(PatternTerm::var("a"), colleague, PatternTerm::var("b"))])
        .with_group(
            PatternGroup::new()
                .with(Pattern::new(PatternTerm::var("a"), works_for.clone(), PatternTerm::var("org")))
                .with(Pattern::new(PatternTerm::var("b"), works_for, PatternTerm::var("org"))),
        );
    print_results(&ns, &engine.query(&query, &store)?);

    println!("\n=== DESCRIBE ===");
    let carol = rdfkit::NamedNode::new("http://example.org/carol")?;
    let query = Query::describe(vec![carol.into()]);
    print_results(&ns, &engine.query(&query, &store)?);

    Ok(())
}

fn print_results(ns: &NamespaceManager, results: &QueryResults) {
    match results {
        QueryResults::Boolean(b) => println!("{}", b),
        QueryResults::Graph(table) => match table.triples() {
            Ok(triples) => match RdfSerializer::serialize(&triples, RdfFormat::Turtle) {
                Ok(text) => print!("{}", text),
                Err(e) => println!("cannot serialize graph: {}", e),
            },
            Err(e) => println!("cannot read graph: {}", e),
        },
        QueryResults::Solutions(table) => {
            let header: Vec<String> = table.columns().iter().map(ToString::to_string).collect();
            println!("{}", header.join("\t"));
            for solution in table.solutions() {
                let cells: Vec<String> = table
                    .columns()
                    .iter()
                    .map(|var| {
                        solution
                            .bindings
                            .get(var)
                            .map(|term| ns.display_term(term))
                            .unwrap_or_default()
                    })
                    .collect();
                println!("{}", cells.join("\t"));
            }
            println!("({} rows)", table.len());
        }
    }
}
