use oxigraph::io::RdfFormat;
use oxigraph::model::{GraphName, NamedNode};
use rdfdriver_cli::{is_url, parse_format, parse_graphs, run_from_args};

#[test]
fn graphs_accept_iris_and_default() {
    let graphs = parse_graphs(&["default".to_string(), "http://example.org/g".to_string()])
        .expect("valid graphs");
    assert_eq!(
        graphs,
        vec![
            GraphName::DefaultGraph,
            GraphName::NamedNode(NamedNode::new_unchecked("http://example.org/g")),
        ]
    );
    assert!(parse_graphs(&["not an iri".to_string()]).is_err());
}

#[test]
fn formats_accept_extensions_and_media_types() {
    assert_eq!(parse_format("ttl").unwrap(), RdfFormat::Turtle);
    assert_eq!(parse_format("nq").unwrap(), RdfFormat::NQuads);
    assert_eq!(parse_format("application/n-triples").unwrap(), RdfFormat::NTriples);
    assert!(parse_format("docx").is_err());
}

#[test]
fn unknown_subcommand_fails_to_parse() {
    let err = run_from_args(["rdfdriver", "frobnicate"]).unwrap_err();
    assert!(err.to_string().contains("frobnicate"), "{err}");
}

#[test]
fn serql_fails_in_process() {
    let err = run_from_args([
        "rdfdriver",
        "--endpoint",
        "http://127.0.0.1:9",
        "query",
        "--language",
        "serql",
        "SELECT * FROM {x} p {y}",
    ])
    .unwrap_err();
    assert!(err.to_string().contains("unsupported query language"), "{err}");
}

#[test]
fn load_sources_are_paths_or_urls() {
    assert!(is_url("https://example.org/data.ttl"));
    assert!(is_url("file:///tmp/data.ttl"));
    assert!(!is_url("data/people.ttl"));
    assert!(!is_url("/tmp/http.ttl"));
}
