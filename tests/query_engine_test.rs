use rdfkit::rdf::{Literal, NamedNode, RdfStore, RdfTerm, Triple};
use rdfkit::sparql::{
    combine, compile_path, match_pattern, DataSource, Expression, Filter, PathFlavor, PathStep, Pattern,
    PatternGroup, PatternTerm, PropertyPath, Query, QueryResults, SolutionTable, SparqlEngine, Variable,
};

fn ex(local: &str) -> NamedNode {
    NamedNode::new(&format!("http://example.org/{}", local)).unwrap()
}

fn term(local: &str) -> Option<RdfTerm> {
    Some(ex(local).into())
}

fn var(name: &str) -> PatternTerm {
    PatternTerm::var(name)
}

fn store(facts: &[(&str, &str, &str)]) -> RdfStore {
    let mut store = RdfStore::new();
    for (s, p, o) in facts {
        store.insert(Triple::new(ex(s).into(), ex(p).into(), ex(o).into())).unwrap();
    }
    store
}

fn select(engine: &SparqlEngine, query: &Query, store: &RdfStore) -> SolutionTable {
    match engine.query(query, store).unwrap() {
        QueryResults::Solutions(table) => table,
        other => panic!("Expected solutions, got {:?}", other),
    }
}

fn column_names(table: &SolutionTable) -> Vec<String> {
    table.columns().iter().map(|v| v.name().to_string()).collect()
}

#[test]
fn test_subject_object_pattern() {
    let store = store(&[("a", "p", "b"), ("a", "p", "c")]);
    let table = match_pattern(&Pattern::new(var("s"), ex("p"), var("o")), &DataSource::from(&store));

    assert_eq!(column_names(&table), vec!["S", "O"]);
    assert_eq!(table.len(), 2);
    assert!(table.rows().contains(&vec![term("a"), term("b")]));
    assert!(table.rows().contains(&vec![term("a"), term("c")]));
}

#[test]
fn test_sequence_path_hides_intermediates() {
    let store = store(&[("a", "p1", "m"), ("m", "p2", "z")]);
    let path = PropertyPath::sequence(ex("a"), var("o"), vec![ex("p1"), ex("p2")]).unwrap();
    let query = Query::select(vec![]).with_group(PatternGroup::new().with(path));

    let table = select(&SparqlEngine::new(), &query, &store);
    assert_eq!(column_names(&table), vec!["O"]);
    assert_eq!(table.rows(), &[vec![term("z")]]);
    assert!(!table.columns().iter().any(Variable::is_synthetic));
}

#[test]
fn test_construct_skips_literal_subjects() {
    let mut store = RdfStore::new();
    store
        .insert(Triple::new(ex("a").into(), ex("name").into(), Literal::new_simple_literal("A").into()))
        .unwrap();

    let query = Query::construct(vec![Pattern::new(var("s"), ex("label"), var("o"))])
        .with_group(PatternGroup::new().with(Pattern::new(var("o"), ex("name"), var("s"))));

    let results = SparqlEngine::new().query(&query, &store).unwrap();
    assert!(results.table().unwrap().is_empty());
}

#[test]
fn test_single_step_path_equals_pattern() {
    let store = store(&[("a", "p", "b"), ("c", "p", "d"), ("a", "q", "e")]);
    let source = DataSource::from(&store);

    for inverse in [false, true] {
        let mut step = PathStep::new(ex("p"), PathFlavor::Sequence, 0).unwrap();
        if inverse {
            step = step.inverse();
        }
        let path = PropertyPath::new(var("x"), var("y"), vec![step]).unwrap();
        let compiled = compile_path(&path);
        assert_eq!(compiled.len(), 1);

        let via_path = match_pattern(&compiled[0], &source);
        let direct = if inverse {
            match_pattern(&Pattern::new(var("y"), ex("p"), var("x")), &source)
        } else {
            match_pattern(&Pattern::new(var("x"), ex("p"), var("y")), &source)
        };
        assert_eq!(via_path.rows(), direct.rows());
        assert_eq!(via_path.columns(), direct.columns());
    }
}

#[test]
fn test_alternative_path() {
    let store = store(&[("a", "p", "b"), ("a", "q", "c"), ("a", "r", "d")]);
    let path = PropertyPath::alternative(ex("a"), var("o"), vec![ex("p"), ex("q")]).unwrap();
    let query = Query::select(vec![]).with_group(PatternGroup::new().with(path));

    let table = select(&SparqlEngine::new(), &query, &store);
    assert_eq!(table.len(), 2);
    assert!(table.rows().contains(&vec![term("b")]));
    assert!(table.rows().contains(&vec![term("c")]));
}

#[test]
fn test_two_paths_in_one_group_do_not_collide() {
    let store = store(&[
        ("a", "p1", "m"),
        ("m", "p2", "z"),
        ("a", "q1", "n"),
        ("n", "q2", "y"),
    ]);
    let first = PropertyPath::sequence(var("s"), var("x"), vec![ex("p1"), ex("p2")]).unwrap();
    let second = PropertyPath::sequence(var("s"), var("y"), vec![ex("q1"), ex("q2")]).unwrap();
    let query = Query::select(vec![]).with_group(PatternGroup::new().with(first).with(second));

    let table = select(&SparqlEngine::new(), &query, &store);
    assert_eq!(table.rows(), &[vec![term("a"), term("z"), term("y")]]);
}

#[test]
fn test_optional_member() {
    let mut store = store(&[("alice", "type", "person"), ("bob", "type", "person")]);
    store
        .insert(Triple::new(ex("alice").into(), ex("email").into(), Literal::new_simple_literal("a@x").into()))
        .unwrap();

    let group = PatternGroup::new()
        .with(Pattern::new(var("p"), ex("type"), ex("person")))
        .with(Pattern::new(var("p"), ex("email"), var("mail")).optional());
    let query = Query::select(vec![Variable::new("p"), Variable::new("mail")]).with_group(group);

    let table = select(&SparqlEngine::new(), &query, &store);
    assert_eq!(table.len(), 2);
    assert!(table.rows().contains(&vec![term("bob"), None]));
}

#[test]
fn test_union_members() {
    let store = store(&[("a", "p", "b"), ("c", "q", "d")]);
    let group = PatternGroup::new()
        .with(Pattern::new(var("s"), ex("p"), var("o")).union())
        .with(Pattern::new(var("s"), ex("q"), var("other")));
    let query = Query::select(vec![]).with_group(group);

    let table = select(&SparqlEngine::new(), &query, &store);
    assert_eq!(table.len(), 2);
    assert_eq!(table.columns().len(), 3);
}

#[test]
fn test_group_union_and_optional_groups() {
    let store = store(&[("a", "p", "b"), ("c", "q", "d"), ("a", "r", "x")]);
    let query = Query::select(vec![])
        .with_group(PatternGroup::new().with(Pattern::new(var("s"), ex("p"), var("o"))).union())
        .with_group(PatternGroup::new().with(Pattern::new(var("s"), ex("q"), var("o"))))
        .with_group(PatternGroup::new().with(Pattern::new(var("s"), ex("r"), var("extra"))).optional());

    let table = select(&SparqlEngine::new(), &query, &store);
    assert_eq!(table.len(), 2);
    assert!(table.rows().iter().any(|r| r.contains(&term("x"))));
}

#[test]
fn test_filters_fail_closed() {
    let mut store = RdfStore::new();
    for (who, age) in [("alice", 30), ("bob", 17)] {
        store
            .insert(Triple::new(ex(who).into(), ex("age").into(), Literal::integer(age).into()))
            .unwrap();
    }
    store
        .insert(Triple::new(ex("carol").into(), ex("age").into(), ex("unknown").into()))
        .unwrap();

    let group = PatternGroup::new()
        .with(Pattern::new(var("p"), ex("age"), var("age")))
        .with_filter(Filter::new(Expression::greater_or_equal(
            Expression::var("age"),
            Expression::constant(Literal::integer(18)),
        )));
    let query = Query::select(vec![Variable::new("p")]).with_group(group);

    // carol's age is an IRI: the comparison errors and the row is rejected
    let table = select(&SparqlEngine::new(), &query, &store);
    assert_eq!(table.rows(), &[vec![term("alice")]]);
}

#[test]
fn test_subquery_member() {
    let store = store(&[("a", "p", "b"), ("a", "p", "c"), ("b", "q", "z")]);
    let inner = Query::select(vec![Variable::new("o")])
        .with_group(PatternGroup::new().with(Pattern::new(ex("a"), ex("p"), var("o"))));
    let query = Query::select(vec![])
        .with_subquery(inner)
        .with_group(PatternGroup::new().with(Pattern::new(var("o"), ex("q"), var("z"))));

    let table = select(&SparqlEngine::new(), &query, &store);
    assert_eq!(column_names(&table), vec!["O", "Z"]);
    assert_eq!(table.rows(), &[vec![term("b"), term("z")]]);
}

#[test]
fn test_describe_star_form() {
    let store = store(&[("a", "type", "thing"), ("a", "p", "b"), ("b", "p", "c")]);
    let query = Query::describe(vec![])
        .with_group(PatternGroup::new().with(Pattern::new(var("x"), ex("type"), ex("thing"))));

    let results = SparqlEngine::new().query(&query, &store).unwrap();
    let triples = results.table().unwrap().triples().unwrap();
    assert_eq!(triples.len(), 2);
}

#[test]
fn test_ground_construct_template_emitted_once() {
    let store = store(&[("a", "p", "b"), ("c", "p", "d")]);
    let query = Query::construct(vec![
        Pattern::new(ex("fixed"), ex("p"), ex("value")),
        Pattern::new(var("s"), ex("copy"), var("o")),
    ])
    .with_group(PatternGroup::new().with(Pattern::new(var("s"), ex("p"), var("o"))));

    let results = SparqlEngine::new().query(&query, &store).unwrap();
    let triples = results.table().unwrap().triples().unwrap();
    assert_eq!(triples.len(), 3);
    assert_eq!(
        triples.iter().filter(|t| t.subject == ex("fixed").into()).count(),
        1
    );
}

#[test]
fn test_combine_properties() {
    let mut a = SolutionTable::new("a", vec![Variable::new("x")]);
    a.push_row(vec![term("1")]);
    a.push_row(vec![term("2")]);
    let mut b = SolutionTable::new("b", vec![Variable::new("y")]);
    for n in ["3", "4", "5"] {
        b.push_row(vec![term(n)]);
    }

    let product = combine(vec![a.clone(), b.clone()], false);
    assert_eq!(product.len(), 6);
    assert_eq!(product.columns().len(), 2);

    let union = combine(vec![a.with_flags(false, true), b], false);
    assert_eq!(union.len(), 5);
    assert_eq!(union.columns().len(), 2);
}

#[test]
fn test_json_output() {
    let store = store(&[("a", "p", "b")]);
    let query = Query::select(vec![Variable::new("o")])
        .with_group(PatternGroup::new().with(Pattern::new(ex("a"), ex("p"), var("o"))));

    let json = SparqlEngine::new().query(&query, &store).unwrap().to_json();
    assert_eq!(json["head"]["vars"][0], "O");
    assert_eq!(json["results"]["bindings"][0]["O"]["value"], "http://example.org/b");
}
