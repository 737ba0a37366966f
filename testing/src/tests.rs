use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use async_lsp::lsp_types::*;
use async_lsp::LanguageServer;
use futures::{stream::FuturesUnordered, StreamExt};
use pretty_assertions::Comparison;
use rstest::*;
use serde_json::{json, Value};

use crate::server;

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
	TRACING_INIT.call_once(|| {
		tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::builder().parse_lossy("warn,schema_lsp=trace"))
			.with_test_writer()
			.init();
	});
}

/// Each fixture is a workspace with a `schemas` folder and sources under `src`.
///
/// A `^complete a b` comment marks the column above it, on the previous line,
/// where completion must yield exactly `a b` in that order.
#[rstest]
#[case::basic("basic", 2, 1)]
#[case::nested("nested", 3, 0)]
#[timeout(Duration::from_secs(5))]
#[tokio::test(flavor = "current_thread")]
async fn fixture_test(#[case] fixture: &str, #[case] loaded: usize, #[case] skipped: usize) {
	init_tracing();
	let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(fixture);
	let mut server = server::setup_lsp_server();

	let init = server
		.initialize(InitializeParams {
			workspace_folders: Some(vec![WorkspaceFolder {
				uri: Url::from_file_path(&root).unwrap(),
				name: fixture.to_string(),
			}]),
			..Default::default()
		})
		.await
		.expect("initialization failed");
	let commands = init.capabilities.execute_command_provider.unwrap().commands;
	assert_eq!(commands, ["schema-lsp.loadFolders"]);

	_ = server.notify::<notification::Initialized>(InitializedParams {});

	// relative to the workspace folder
	let summary = server
		.execute_command(ExecuteCommandParams {
			command: "schema-lsp.loadFolders".to_string(),
			arguments: vec![Value::String("schemas".to_string())],
			work_done_progress_params: Default::default(),
		})
		.await
		.expect("loadFolders failed");
	assert_eq!(
		summary,
		Some(json!({ "loaded": loaded, "skipped": skipped, "failedFolders": 0 }))
	);

	let expected = gather_expected(&root.join("src"));
	assert!(!expected.is_empty(), "no ^complete markers in {fixture}");

	for (path, text, _) in &expected {
		let language_id = match path.extension().unwrap().to_string_lossy().as_ref() {
			"js" => "javascript",
			"ts" => "typescript",
			unk => panic!("unknown file extension {unk}"),
		};
		_ = server.did_open(DidOpenTextDocumentParams {
			text_document: TextDocumentItem {
				uri: Url::from_file_path(path).unwrap(),
				language_id: language_id.to_string(),
				version: 1,
				text: text.clone(),
			},
		});
	}

	let mut diffs: FuturesUnordered<_> = expected
		.iter()
		.flat_map(|(path, _, markers)| markers.iter().map(move |marker| (path, marker)))
		.map(|(path, (position, expected))| {
			let mut server = server.clone();
			async move {
				let completions = server
					.completion(CompletionParams {
						text_document_position: TextDocumentPositionParams {
							text_document: TextDocumentIdentifier {
								uri: Url::from_file_path(path).unwrap(),
							},
							position: *position,
						},
						work_done_progress_params: Default::default(),
						partial_result_params: Default::default(),
						context: None,
					})
					.await;
				let actual: Vec<String> = match completions {
					Ok(Some(CompletionResponse::List(list))) => list.items.into_iter().map(|item| item.label).collect(),
					Ok(None) => vec![],
					other => {
						return format!(
							"[complete] failed to get completions: {other:?}\n\tat {}:{}:{}",
							path.display(),
							position.line + 1,
							position.character + 1
						);
					}
				};
				if expected[..] == actual[..] {
					return String::new();
				}
				format!(
					"[complete] in {}:{}:{}\n{}",
					path.display(),
					position.line + 1,
					position.character + 1,
					Comparison::new(&expected[..], &actual[..]),
				)
			}
		})
		.collect();

	let mut messages = vec![];
	while let Some(diff) = diffs.next().await {
		messages.push(diff);
	}

	_ = server.shutdown(()).await;
	_ = server.exit(());

	let message = messages.join("\n");
	let message = message.trim_ascii();
	assert!(message.is_empty(), "{message}");
}

type Marker = (Position, Vec<String>);

/// Source files under `dir` with their text and `^complete` markers, sorted by path.
fn gather_expected(dir: &Path) -> Vec<(PathBuf, String, Vec<Marker>)> {
	let mut paths = std::fs::read_dir(dir)
		.unwrap()
		.map(|entry| entry.unwrap().path())
		.collect::<Vec<_>>();
	paths.sort();

	paths
		.into_iter()
		.map(|path| {
			let text = std::fs::read_to_string(&path).unwrap();
			let markers = text
				.lines()
				.enumerate()
				.filter_map(|(line, contents)| {
					let column = contents.find("^complete")?;
					let labels = contents[column..]["^complete".len()..]
						.split_whitespace()
						.map(String::from)
						.collect();
					Some((Position::new(line as u32 - 1, column as u32), labels))
				})
				.collect();
			(path, text, markers)
		})
		.collect()
}
