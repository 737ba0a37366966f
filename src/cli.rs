//! One-shot commands.

use std::io::{stdout, Write};
use std::path::PathBuf;
use std::process::exit;

use miette::{Context, IntoDiagnostic};
use schema_lsp::config::{Config, SchemaConfig};
use schema_lsp::loader::load_folder;
use schema_lsp::schema::SchemaStore;
use schema_lsp::{GITVER, NAME, VERSION};
use serde::Serialize;
use tracing::debug;

#[derive(Default)]
pub struct Args<'a> {
	pub folders: Vec<&'a str>,
	pub output: Option<&'a str>,
	pub threads: Option<usize>,
	pub log_format: LogFormat,
	pub command: Command,
}

#[derive(Default, Debug, PartialEq, Eq)]
pub enum Command {
	#[default]
	Run,
	Check,
	Init,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
	#[default]
	Compact,
	Json,
}

const HELP: &str = include_str!("../contrib/usage.txt");

pub fn parse_args<'r>(mut args: &[&'r str]) -> Args<'r> {
	let mut out = Args::default();
	loop {
		match args {
			["check", rest @ ..] if out.command == Command::Run => {
				args = rest;
				out.command = Command::Check;
			}
			["init", rest @ ..] if out.command == Command::Run => {
				args = rest;
				out.command = Command::Init;
			}
			["-h" | "--help", ..] => {
				eprintln!("{HELP}");
				exit(0);
			}
			["-v" | "--version", ..] => {
				eprintln!("{NAME} v{VERSION} git:{GITVER}");
				exit(0);
			}
			["-o" | "--out", path, rest @ ..] => {
				args = rest;
				out.output = Some(path);
			}
			["-j" | "--threads", threads, rest @ ..] => {
				args = rest;
				match threads.parse::<usize>() {
					Ok(0) => {
						eprintln!("Invalid thread count specified, ignoring.");
					}
					Ok(threads) => out.threads = Some(threads),
					Err(err) => {
						eprintln!("Cannot parse threads: {err}");
						exit(1);
					}
				}
			}
			["--log-format", "json", rest @ ..] => {
				args = rest;
				out.log_format = LogFormat::Json;
			}
			[folder, rest @ ..] if out.command != Command::Run && !folder.starts_with('-') => {
				args = rest;
				out.folders.push(folder);
			}
			[] => break,
			_ => {
				eprintln!("{HELP}");
				exit(1);
			}
		}
	}

	out
}

/// Returns true if a CLI handler has been invoked.
pub async fn run(args: Args<'_>) -> bool {
	match args.command {
		Command::Run => return false,
		Command::Check => match check(&args.folders, args.output).await {
			Ok(true) => {}
			Ok(false) => exit(1),
			Err(err) => {
				eprintln!("{err:?}");
				exit(1);
			}
		},
		Command::Init => {
			if let Err(err) = init(&args.folders, args.output) {
				eprintln!("{err:?}");
				exit(1);
			}
		}
	}
	true
}

#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
	models: Vec<ModelReport>,
	dangling: Vec<DanglingRelation>,
	skipped: Vec<String>,
	failed_folders: Vec<String>,
}

#[derive(Serialize, Debug)]
struct ModelReport {
	name: String,
	properties: usize,
	relations: usize,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct DanglingRelation {
	model: String,
	relation: String,
	target: Option<String>,
}

/// Loads `folders` the same way the server does and reports what a client would see.
///
/// Returns false if anything failed to load or a relation points nowhere.
async fn check(folders: &[&str], output: Option<&str>) -> miette::Result<bool> {
	if folders.is_empty() {
		miette::bail!("check expects at least one schema folder");
	}
	let mut report = CheckReport::default();
	let mut store = SchemaStore::default();
	for folder in folders {
		let load = match load_folder(&PathBuf::from(folder)).await {
			Ok(load) => load,
			Err(err) => {
				report.failed_folders.push(err.path.display().to_string());
				eprintln!("{:?}", miette::Report::new(err));
				continue;
			}
		};
		debug!(folder, "loaded {} models", load.tables.len());
		for skipped in load.skipped {
			report.skipped.push(skipped.path().display().to_string());
			eprintln!("{:?}", miette::Report::new(skipped));
		}
		store.extend(load.tables);
	}

	report.models = store
		.iter()
		.map(|table| ModelReport {
			name: table.name.clone(),
			properties: table.properties.len(),
			relations: table.relations.len(),
		})
		.collect();
	report.dangling = dangling_relations(&store);

	let clean = report.dangling.is_empty() && report.skipped.is_empty() && report.failed_folders.is_empty();
	write_json(&report, output)?;
	Ok(clean)
}

fn dangling_relations(store: &SchemaStore) -> Vec<DanglingRelation> {
	let mut dangling = vec![];
	for table in store {
		for (name, relation) in &table.relations {
			let target = relation.model.as_deref();
			if target.and_then(|target| store.find(target)).is_none() {
				dangling.push(DanglingRelation {
					model: table.name.clone(),
					relation: name.clone(),
					target: target.map(String::from),
				});
			}
		}
	}
	dangling
}

/// Prints initialization options that load `folders` on startup.
fn init(folders: &[&str], output: Option<&str>) -> miette::Result<()> {
	let config = Config {
		schema: Some(SchemaConfig {
			folders: Some(folders.iter().map(|folder| folder.to_string()).collect()),
		}),
		..Default::default()
	};
	write_json(&config, output)
}

fn write_json<T: Serialize>(value: &T, output: Option<&str>) -> miette::Result<()> {
	let mut json = serde_json::to_string_pretty(value).into_diagnostic()?;
	json.push('\n');
	match output {
		None | Some("-") => stdout().write_all(json.as_bytes()).into_diagnostic(),
		Some(path) => std::fs::write(path, json)
			.into_diagnostic()
			.wrap_err_with(|| format!("could not write {path}")),
	}
}
