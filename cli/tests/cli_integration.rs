use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

// nothing listens on the discard port, and none of these commands get far enough to connect
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn rdfdriver_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rdfdriver"))
}

fn tmp_dir(name: &str) -> PathBuf {
    let mut base = std::env::temp_dir();
    base.push(format!("rdfdriver-cli-{}-{}", name, std::process::id()));
    if base.exists() {
        let _ = fs::remove_dir_all(&base);
    }
    fs::create_dir_all(&base).unwrap();
    base
}

fn run(args: &[&str]) -> Output {
    Command::new(rdfdriver_bin())
        .env_remove("RDFDRIVER_LOG")
        .args(args)
        .output()
        .expect("run rdfdriver")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

#[test]
fn no_arguments_prints_help() {
    let out = run(&[]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Usage"), "stderr: {}", stderr(&out));
}

#[test]
fn unsupported_query_language_is_rejected_before_connecting() {
    let out = run(&[
        "--endpoint",
        UNREACHABLE,
        "query",
        "--language",
        "serql",
        "SELECT * FROM {x} p {y}",
    ]);
    assert!(!out.status.success());
    assert!(
        stderr(&out).contains("unsupported query language"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn invalid_endpoint_is_rejected() {
    let out = run(&["--endpoint", "not a url", "size"]);
    assert!(!out.status.success());
    assert!(
        stderr(&out).contains("invalid endpoint"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn clear_requires_a_graph_or_all() {
    let out = run(&["--endpoint", UNREACHABLE, "clear"]);
    assert!(!out.status.success());
    assert!(
        stderr(&out).contains("--graph or --all"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn export_rejects_unknown_format() {
    let out = run(&["--endpoint", UNREACHABLE, "export", "--format", "docx"]);
    assert!(!out.status.success());
    assert!(
        stderr(&out).contains("unknown RDF format"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn load_reports_syntax_errors_without_sending() {
    let root = tmp_dir("load");
    let file = root.join("broken.ttl");
    fs::write(&file, "<http://example.org/s> <http://example.org/p> .\n").unwrap();
    let out = run(&[
        "--endpoint",
        UNREACHABLE,
        "--no-cache",
        "load",
        file.to_str().unwrap(),
    ]);
    assert!(!out.status.success());
    assert!(
        stderr(&out).contains("failed to parse RDF input"),
        "stderr: {}",
        stderr(&out)
    );
    let _ = fs::remove_dir_all(&root);
}
