//! Leaf methods for [Backend] that are not part of the [`LanguageServer`](tower_lsp_server::LanguageServer) surface.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::OnceLock;

use dashmap::{DashMap, DashSet};
use ropey::Rope;
use serde::Serialize;
use smart_default::SmartDefault;
use tokio::sync::{Mutex, RwLock};
use tower_lsp_server::lsp_types::*;
use tower_lsp_server::Client;
use tracing::{debug, info, instrument, warn};

use crate::completion::complete;
use crate::config::{Config, ResolverConfig, SchemaConfig};
use crate::loader::load_folder;
use crate::resolver::{Window, WINDOW_LINES};
use crate::schema::SchemaStore;
use crate::utils::{lsp_range_to_char_range, resolve_against, RangeExt};

pub const LOAD_FOLDERS_COMMAND: &str = "schema-lsp.loadFolders";

pub const DEFAULT_LANGUAGES: [&str; 4] = ["javascript", "typescript", "javascriptreact", "typescriptreact"];

pub struct Backend {
	pub client: Client,
	pub document_map: DashMap<String, Document>,
	pub store: RwLock<SchemaStore>,
	pub settings: Settings,
}

#[derive(SmartDefault)]
pub struct Settings {
	#[default(_code = "AtomicUsize::new(WINDOW_LINES)")]
	pub window_lines: AtomicUsize,
	#[default(_code = "DEFAULT_LANGUAGES.iter().map(|language| language.to_string()).collect()")]
	pub languages: DashSet<String>,
	/// Base for relative schema folders, taken from the first workspace folder.
	pub workspace_root: OnceLock<PathBuf>,
	/// Folders configured before the client finished initializing.
	pub pending_folders: Mutex<Vec<PathBuf>>,
}

pub struct Document {
	pub rope: Rope,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
	pub loaded: usize,
	pub skipped: usize,
	pub failed_folders: usize,
}

impl Backend {
	pub fn new(client: Client) -> Self {
		Backend {
			client,
			document_map: DashMap::new(),
			store: RwLock::new(SchemaStore::default()),
			settings: Settings::default(),
		}
	}

	/// Applies the settings present in `config`, returning the schema folders to load.
	pub fn on_change_config(&self, config: Config) -> Vec<PathBuf> {
		if let Some(ResolverConfig { lines: Some(lines) }) = config.resolver {
			self.settings.window_lines.store(lines, Relaxed);
		}
		if let Some(languages) = config.languages {
			self.settings.languages.clear();
			for language in languages {
				self.settings.languages.insert(language);
			}
		}
		let Some(SchemaConfig { folders: Some(folders) }) = config.schema else {
			return vec![];
		};
		let base = self.settings.workspace_root.get().map(PathBuf::as_path);
		folders
			.into_iter()
			.map(|folder| resolve_against(PathBuf::from(folder), base))
			.collect()
	}

	/// Loads each folder in turn and appends its schemas to the store.
	///
	/// Failures are reported to the user and never stop the remaining folders.
	#[instrument(skip_all, fields(folders = folders.len()))]
	pub async fn load_folders(&self, folders: Vec<PathBuf>) -> LoadSummary {
		let mut summary = LoadSummary::default();
		for folder in folders {
			let load = match load_folder(&folder).await {
				Ok(load) => load,
				Err(err) => {
					warn!("{err}");
					summary.failed_folders += 1;
					self.client
						.show_message(MessageType::ERROR, format!("Failed to read {}: {}", err.path.display(), err.source))
						.await;
					continue;
				}
			};
			for skipped in &load.skipped {
				warn!("{skipped}");
				self.client
					.show_message(MessageType::WARNING, format!("Skipped schema file: {skipped}"))
					.await;
			}
			let count = load.tables.len();
			summary.loaded += count;
			summary.skipped += load.skipped.len();
			self.store.write().await.extend(load.tables);
			info!(folder = %load.folder.display(), "loaded {count} models");
			self.client
				.show_message(
					MessageType::INFO,
					format!("Loaded {count} models from {}", load.folder.display()),
				)
				.await;
		}
		summary
	}

	pub fn is_tracked_language(&self, language_id: &str) -> bool {
		self.settings.languages.contains(language_id)
	}

	pub fn open_document(&self, uri: &Uri, language_id: String, text: &str) {
		if !self.is_tracked_language(&language_id) {
			debug!("not tracking {} ({language_id})", uri.as_str());
			return;
		}
		self.document_map.insert(
			uri.as_str().to_string(),
			Document {
				rope: Rope::from_str(text),
			},
		);
	}

	/// Changes are applied sequentially, each against the result of the previous one.
	///
	/// The batch is all or nothing: if any change is out of bounds the document is left as it was.
	pub fn apply_changes(&self, uri: &Uri, changes: Vec<TextDocumentContentChangeEvent>) -> miette::Result<()> {
		let Some(mut document) = self.document_map.get_mut(uri.as_str()) else {
			return Ok(());
		};
		let mut rope = document.rope.clone();
		for change in changes {
			let Some(range) = change.range else {
				rope = Rope::from_str(&change.text);
				continue;
			};
			let range = lsp_range_to_char_range(range, rope.slice(..))
				.ok_or_else(|| miette::miette!("change out of bounds: {range:?}"))?
				.map_unit(|unit| unit.0);
			let start = range.start;
			rope.remove(range);
			if !change.text.is_empty() {
				rope.insert(start, &change.text);
			}
		}
		document.rope = rope;
		Ok(())
	}

	pub async fn completions(&self, uri: &Uri, position: Position) -> Option<CompletionResponse> {
		let rope = match self.document_map.get(uri.as_str()) {
			Some(document) => document.rope.clone(),
			None => {
				debug!("untracked document {}", uri.as_str());
				return None;
			}
		};
		let lines = self.settings.window_lines.load(Relaxed);
		let window = Window::new(rope.slice(..), position, lines);
		let store = self.store.read().await;
		let candidates = complete(&window, &store)?;
		if candidates.is_empty() {
			return None;
		}
		Some(CompletionResponse::List(CompletionList {
			is_incomplete: false,
			items: candidates.into_iter().map(CompletionItem::from).collect(),
		}))
	}

	pub fn workspace_root(&self) -> Option<&Path> {
		self.settings.workspace_root.get().map(PathBuf::as_path)
	}
}
