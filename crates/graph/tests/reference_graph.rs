use goon_code_chunker::{CancellationFlag, Chunk, Chunker, ChunkerConfig, SourceInput};
use goon_graph::{produce_graph, AssemblyStrategy, ContextAssembler, GraphIndex};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CLIENT: &str = r#"package llm

import "net/http"

// Client talks to the completion endpoint.
type Client struct {
	http *http.Client
	opts Options
}

func New(opts Options) *Client {
	return &Client{http: http.DefaultClient, opts: opts}
}

func (c *Client) Complete(prompt string) string {
	return c.opts.Model + prompt
}
"#;

const OPTIONS: &str = r#"package llm

type Options struct {
	Model string
}

const DefaultModel = "small"

func Defaults() Options {
	return Options{Model: DefaultModel}
}
"#;

fn chunk_dir(files: &[(&str, &str)]) -> Vec<Chunk> {
    let dir = TempDir::new().unwrap();
    let inputs: Vec<SourceInput> = files
        .iter()
        .enumerate()
        .map(|(idx, (name, src))| {
            let path = dir.path().join(name);
            std::fs::write(&path, src).unwrap();
            SourceInput {
                path,
                display_path: format!("llm/{name}"),
                discovery_index: idx,
            }
        })
        .collect();
    let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
    let outcome = chunker.chunk_directory("llm", &inputs, &CancellationFlag::new());
    let mut files: Vec<_> = outcome.units.into_iter().flat_map(|u| u.files).collect();
    files.sort_by_key(|f| f.discovery_index);
    files.into_iter().flat_map(|f| f.chunks).collect()
}

#[test]
fn graph_mirrors_chunk_references() {
    let chunks = chunk_dir(&[("client.go", CLIENT), ("options.go", OPTIONS)]);
    let graph = produce_graph(&chunks);

    for chunk in &chunks {
        let targets: Vec<&str> = graph.references(&chunk.fqn()).collect();
        assert_eq!(targets, chunk.references.iter().map(String::as_str).collect::<Vec<_>>());
    }

    // the net/http import never produces an edge
    assert!(graph.edges().all(|(_, to)| to.starts_with("llm.")));
    // lines 9-11 of client.go fall inside Defaults' window too
    assert_eq!(
        graph.references("llm.Defaults").collect::<Vec<_>>(),
        vec!["llm.Client", "llm.DefaultModel", "llm.Options"]
    );
}

#[test]
fn one_hop_expansion_from_a_method() {
    let chunks = chunk_dir(&[("client.go", CLIENT), ("options.go", OPTIONS)]);
    let graph = produce_graph(&chunks);

    let hop: Vec<String> = graph
        .neighborhood("llm.(Client).Complete", 1)
        .unwrap()
        .into_iter()
        .map(|(fqn, _)| fqn)
        .collect();
    assert_eq!(hop, vec!["llm.Client"]);

    let index = GraphIndex::new(&graph);
    assert_eq!(
        index.referrers("llm.Options").unwrap(),
        vec!["llm.Client", "llm.Defaults", "llm.New"]
    );

    let assembler = ContextAssembler::new(&graph, &chunks);
    let ctx = assembler
        .assemble("llm.(Client).Complete", AssemblyStrategy::Extended)
        .unwrap();
    let related: Vec<String> = ctx.related.iter().map(|r| r.chunk.fqn()).collect();
    assert_eq!(related, vec!["llm.Client", "llm.Options"]);
}
