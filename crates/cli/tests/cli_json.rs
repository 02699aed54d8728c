use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn setup_repo() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("rag")).unwrap();
    fs::write(
        root.join("rag/store.go"),
        r#"package rag

type Store struct {
	docs []string
}

func NewStore() *Store {
	return &Store{}
}

func (s *Store) Save(doc string) {
	s.docs = append(s.docs, doc)
}
"#,
    )
    .unwrap();
    fs::write(root.join("rag/broken.go"), "package rag\n\nfunc (\n").unwrap();
    temp
}

#[allow(deprecated)]
fn run_cli(args: &[&str], workdir: &std::path::Path) -> Value {
    let output = Command::cargo_bin("goon")
        .expect("binary")
        .current_dir(workdir)
        .arg("--quiet")
        .args(args)
        .output()
        .expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn chunks_command_prints_chunks_and_report() {
    let temp = setup_repo();
    let body = run_cli(&["chunks", "."], temp.path());

    let chunks = body["chunks"].as_array().unwrap();
    let names: Vec<&str> = chunks
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Store", "NewStore", "Save"]);
    assert_eq!(chunks[2]["kind"], "method");
    assert_eq!(chunks[2]["receiver_name"], "Store");
    assert_eq!(chunks[2]["references"][0], "rag.Store");
    assert_eq!(body["stats"]["skipped_files"][0]["path"], "rag/broken.go");
}

#[test]
fn graph_command_prints_adjacency() {
    let temp = setup_repo();
    let body = run_cli(&["graph", "."], temp.path());
    assert_eq!(body["graph"]["rag.NewStore"][0], "rag.Store");
    assert_eq!(body["graph"]["rag.(Store).Save"][0], "rag.Store");
    assert_eq!(body["stats"]["edges"], 2);
}

#[test]
fn find_command_prints_exact_source() {
    let temp = setup_repo();
    let body = run_cli(
        &["find", ".", "--package", "rag", "--name", "NewStore"],
        temp.path(),
    );
    assert_eq!(body["path"], "rag/store.go");
    assert_eq!(body["source"], "func NewStore() *Store {\n\treturn &Store{}\n}");
}

#[test]
fn context_command_expands_one_hop() {
    let temp = setup_repo();
    let body = run_cli(&["context", ".", "--fqn", "rag.NewStore"], temp.path());
    assert_eq!(body["primary"]["name"], "NewStore");
    assert_eq!(body["related"][0]["chunk"]["name"], "Store");
    assert_eq!(body["related"][0]["distance"], 1);
}

#[test]
#[allow(deprecated)]
fn missing_root_fails() {
    let temp = tempdir().unwrap();
    Command::cargo_bin("goon")
        .expect("binary")
        .current_dir(temp.path())
        .args(["stats", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist"));
}
