use serde_json::Value;
use tower_lsp_server::jsonrpc::{Error, Result};
use tower_lsp_server::lsp_types::*;
use tower_lsp_server::{LanguageServer, UriExt};
use tracing::{debug, error, info, instrument, warn};

use crate::backend::{Backend, LOAD_FOLDERS_COMMAND};
use crate::completion::TRIGGER_CHARACTERS;
use crate::config::Config;
use crate::utils::{path_from_argument, resolve_against};
use crate::{NAME, VERSION};

impl LanguageServer for Backend {
	#[instrument(skip_all, ret)]
	async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
		let root = params
			.workspace_folders
			.as_deref()
			.and_then(<[_]>::first)
			.and_then(|folder| folder.uri.to_file_path())
			.map(|path| path.into_owned());
		if let Some(root) = root {
			_ = self.settings.workspace_root.set(root);
		}

		if let Some(options) = params.initialization_options {
			match serde_json::from_value::<Config>(options) {
				Ok(config) => {
					let folders = self.on_change_config(config);
					self.settings.pending_folders.lock().await.extend(folders);
				}
				Err(err) => error!("invalid initialization options:\n{err}"),
			}
		}

		Ok(InitializeResult {
			server_info: Some(ServerInfo {
				name: NAME.to_string(),
				version: Some(VERSION.to_string()),
			}),
			capabilities: ServerCapabilities {
				text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
					change: Some(TextDocumentSyncKind::INCREMENTAL),
					open_close: Some(true),
					..Default::default()
				})),
				completion_provider: Some(CompletionOptions {
					resolve_provider: None,
					trigger_characters: Some(TRIGGER_CHARACTERS.iter().map(char::to_string).collect()),
					all_commit_characters: None,
					completion_item: None,
					work_done_progress_options: Default::default(),
				}),
				execute_command_provider: Some(ExecuteCommandOptions {
					commands: vec![LOAD_FOLDERS_COMMAND.to_string()],
					..Default::default()
				}),
				..ServerCapabilities::default()
			},
		})
	}
	#[instrument(skip_all)]
	async fn initialized(&self, _: InitializedParams) {
		let folders = std::mem::take(&mut *self.settings.pending_folders.lock().await);
		if folders.is_empty() {
			return;
		}
		let summary = self.load_folders(folders).await;
		info!(?summary, "initial schema load");
	}
	#[instrument(skip_all)]
	async fn shutdown(&self) -> Result<()> {
		Ok(())
	}
	#[instrument(skip_all, fields(uri = params.text_document.uri.as_str()))]
	async fn did_open(&self, params: DidOpenTextDocumentParams) {
		let TextDocumentItem {
			uri, language_id, text, ..
		} = params.text_document;
		self.open_document(&uri, language_id, &text);
	}
	#[instrument(skip_all)]
	async fn did_change(&self, params: DidChangeTextDocumentParams) {
		let uri = params.text_document.uri;
		_ = self
			.apply_changes(&uri, params.content_changes)
			.inspect_err(|err| warn!("{}: {err}", uri.as_str()));
	}
	#[instrument(skip_all)]
	async fn did_close(&self, params: DidCloseTextDocumentParams) {
		self.document_map.remove(params.text_document.uri.as_str());
	}
	#[instrument(skip_all)]
	async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
		let TextDocumentPositionParams { text_document, position } = params.text_document_position;
		debug!("(completion) {} {position:?}", text_document.uri.as_str());
		Ok(self.completions(&text_document.uri, position).await)
	}
	#[instrument(skip_all)]
	async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
		let settings = match params.settings {
			Value::Object(mut settings) if settings.contains_key(NAME) => settings.remove(NAME).unwrap_or_default(),
			settings => settings,
		};
		let config = match serde_json::from_value::<Config>(settings) {
			Ok(config) => config,
			Err(err) => {
				error!("could not parse updated configuration:\n{err}");
				return;
			}
		};
		let folders = self.on_change_config(config);
		if !folders.is_empty() {
			let summary = self.load_folders(folders).await;
			info!(?summary, "configured schema load");
		}
	}
	#[instrument(skip_all, fields(command = %params.command))]
	async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
		if params.command != LOAD_FOLDERS_COMMAND {
			debug!("unknown command");
			return Ok(None);
		}
		let mut folders = vec![];
		for argument in &params.arguments {
			let Some(path) = argument.as_str().and_then(path_from_argument) else {
				return Err(Error::invalid_params(format!(
					"{LOAD_FOLDERS_COMMAND} expects folder paths or file URIs, got {argument}"
				)));
			};
			folders.push(resolve_against(path, self.workspace_root()));
		}
		if folders.is_empty() {
			return Ok(None);
		}
		let summary = self.load_folders(folders).await;
		Ok(serde_json::to_value(summary).ok())
	}
}
