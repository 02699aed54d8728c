use goon_code_chunker::{Chunk, ChunkKind, FailureKind};
use goon_indexer::{produce_graph, IndexerConfig, RepositoryIndexer};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, src: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, src).unwrap();
}

fn config() -> IndexerConfig {
    IndexerConfig {
        concurrency: 2,
        ..IndexerConfig::default()
    }
}

fn fixture_repo() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "rag/store.go",
        r#"package rag

import "example.com/app/golang"

// Store keeps parsed files.
type Store struct {
	files []*golang.File
}

func (s *Store) Save(src string) error {
	f, err := golang.Parse(src)
	if err != nil {
		return err
	}
	s.files = append(s.files, f)
	return nil
}
"#,
    );
    write(
        root,
        "rag/store_test.go",
        r#"package rag

import "testing"

func TestSave(t *testing.T) {
	s := &Store{}
	if err := s.Save("package x"); err != nil {
		t.Fatal(err)
	}
}
"#,
    );
    write(
        root,
        "rag/store_ext_test.go",
        r#"package rag_test

import "testing"

func TestExternal(t *testing.T) {}
"#,
    );
    write(
        root,
        "golang/parse.go",
        r#"package golang

type File struct {
	Name string
}

type Visitor interface {
	Visit(f *File)
}

func Parse(src string) (*File, error) {
	return &File{Name: src}, nil
}
"#,
    );
    temp
}

fn find<'a>(chunks: &'a [Chunk], fqn: &str) -> &'a Chunk {
    chunks
        .iter()
        .find(|c| c.fqn() == fqn)
        .unwrap_or_else(|| panic!("missing {fqn}"))
}

#[tokio::test]
async fn fqns_and_classification() {
    let repo = fixture_repo();
    let indexer = RepositoryIndexer::new(repo.path(), config()).unwrap();
    let run = indexer.produce_chunks().await.unwrap();

    let save = find(&run.chunks, "rag.(Store).Save");
    assert_eq!(save.kind, ChunkKind::Method);
    assert_eq!(save.receiver_name, "Store");
    assert_eq!(find(&run.chunks, "golang.Parse").kind, ChunkKind::Function);
    assert_eq!(find(&run.chunks, "golang.File").kind, ChunkKind::StructuredType);
    assert_eq!(find(&run.chunks, "golang.Visitor").kind, ChunkKind::InterfaceType);
    assert_eq!(find(&run.chunks, "rag.TestSave").kind, ChunkKind::Test);
    assert_eq!(find(&run.chunks, "rag_test.TestExternal").kind, ChunkKind::Test);
    assert_eq!(find(&run.chunks, "rag.Store").doc, "Store keeps parsed files.\n");

    // rag and rag_test share a directory but are separate units
    assert_eq!(run.stats.units, 3);
    assert_eq!(run.stats.files, 4);
    assert!(run.stats.skipped_files.is_empty());
}

#[tokio::test]
async fn references_never_cross_units() {
    let repo = fixture_repo();
    let indexer = RepositoryIndexer::new(repo.path(), config()).unwrap();
    let run = indexer.produce_graph().await.unwrap();

    assert_eq!(find(&run.chunks, "rag.(Store).Save").references, vec!["rag.Store"]);
    // Store's lines 6-8 also cover the Save call on line 7 of store_test.go
    assert_eq!(find(&run.chunks, "rag.Store").references, vec!["rag.(Store).Save"]);
    assert_eq!(
        find(&run.chunks, "rag.TestSave").references,
        vec!["rag.(Store).Save", "rag.Store"]
    );
    assert_eq!(find(&run.chunks, "golang.Parse").references, vec!["golang.File"]);

    for (from, to) in run.graph.edges() {
        let unit = |fqn: &str| fqn.split('.').next().unwrap().to_string();
        assert_eq!(unit(from), unit(to), "{from} -> {to}");
    }
    assert_eq!(run.stats.edges, run.graph.edge_count());
    assert_eq!(produce_graph(&run.chunks), run.graph);
}

#[tokio::test]
async fn chunks_are_ordered_by_discovery() {
    let repo = fixture_repo();
    let indexer = RepositoryIndexer::new(repo.path(), config()).unwrap();
    let run = indexer.produce_chunks().await.unwrap();

    let paths: Vec<&str> = run.chunks.iter().map(|c| c.file_path.as_str()).collect();
    let mut deduped = paths.clone();
    deduped.dedup();
    assert_eq!(
        deduped,
        vec![
            "golang/parse.go",
            "rag/store.go",
            "rag/store_ext_test.go",
            "rag/store_test.go"
        ]
    );
    for pair in run.chunks.windows(2) {
        if pair[0].file_path == pair[1].file_path {
            assert!(pair[0].start_byte < pair[1].start_byte);
        }
    }
}

#[tokio::test]
async fn span_fidelity_against_files_on_disk() {
    let repo = fixture_repo();
    let indexer = RepositoryIndexer::new(repo.path(), config()).unwrap();
    let run = indexer.produce_chunks().await.unwrap();

    for chunk in &run.chunks {
        let source = fs::read_to_string(repo.path().join(&chunk.file_path)).unwrap();
        assert_eq!(&source[chunk.start_byte..chunk.end_byte], chunk.content);
        assert!(!chunk.references.contains(&chunk.fqn()));
    }
}

#[tokio::test]
async fn runs_are_deterministic() {
    let repo = fixture_repo();
    let indexer = RepositoryIndexer::new(repo.path(), config()).unwrap();
    let first = indexer.produce_graph().await.unwrap();
    let second = indexer.produce_graph().await.unwrap();

    assert_eq!(first.chunks, second.chunks);
    assert_eq!(first.graph, second.graph);
}

#[tokio::test]
async fn one_broken_file_among_ten() {
    let temp = TempDir::new().unwrap();
    for idx in 0..9 {
        write(
            temp.path(),
            &format!("pkg{idx}/file.go"),
            &format!("package pkg{idx}\n\nfunc F{idx}() int {{ return {idx} }}\n"),
        );
    }
    write(temp.path(), "broken/file.go", "package broken\n\nfunc Oops( {\n");

    let indexer = RepositoryIndexer::new(temp.path(), config()).unwrap();
    let run = indexer.produce_chunks().await.unwrap();

    assert_eq!(run.chunks.len(), 9);
    assert_eq!(run.stats.files, 10);
    assert_eq!(run.stats.skipped_files.len(), 1);
    assert_eq!(run.stats.skipped_files[0].path, "broken/file.go");
    assert_eq!(run.stats.skipped_files[0].kind, FailureKind::Parse);
    assert!(!run.stats.cancelled);
}

#[tokio::test]
async fn cancelled_run_returns_no_partial_units() {
    let repo = fixture_repo();
    let indexer = RepositoryIndexer::new(repo.path(), config()).unwrap();
    indexer.cancellation().cancel();

    let run = indexer.produce_chunks().await.unwrap();
    assert!(run.chunks.is_empty());
    assert!(run.stats.cancelled);
    assert_eq!(run.stats.units, 0);
    assert!(run.stats.skipped_units.is_empty());
    assert_eq!(run.stats.skipped_files.len(), 4);
    assert!(run
        .stats
        .skipped_files
        .iter()
        .all(|f| f.kind == FailureKind::Cancelled));
}

#[tokio::test]
async fn expired_budget_dispatches_no_directory() {
    let repo = fixture_repo();
    let config = IndexerConfig {
        time_budget_ms: Some(0),
        ..config()
    };
    let indexer = RepositoryIndexer::new(repo.path(), config).unwrap();

    let run = indexer.produce_chunks().await.unwrap();
    assert!(run.chunks.is_empty());
    assert!(run.stats.cancelled);
    assert_eq!(run.stats.units, 0);
    let skipped: Vec<&str> = run.stats.skipped_files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        skipped,
        vec![
            "golang/parse.go",
            "rag/store.go",
            "rag/store_ext_test.go",
            "rag/store_test.go"
        ]
    );
}

#[tokio::test]
async fn stats_serialize_with_skip_reasons() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a/a.go", "package a\n\nfunc A() {}\n");
    write(temp.path(), "a/bad.go", "package a\n\nvar = \n");

    let indexer = RepositoryIndexer::new(temp.path(), config()).unwrap();
    let run = indexer.produce_chunks().await.unwrap();
    let json = serde_json::to_value(&run.stats).unwrap();

    assert_eq!(json["chunks"], 1);
    assert_eq!(json["skipped_files"][0]["path"], "a/bad.go");
    assert_eq!(json["skipped_files"][0]["kind"], "parse");
}
