//! Resolution of the model in scope at a cursor.
//!
//! The nearest `app.models.<Name>` above the cursor names the parent model,
//! then every `relation: '<name>'` token in the same window is replayed
//! through the schema graph to reach the nested model.

use std::borrow::Cow;

use ropey::RopeSlice;
use thiserror::Error;
use tower_lsp_server::lsp_types::Position;
use tracing::debug;

use crate::scanner::extract_relation_chain;
use crate::schema::{SchemaStore, TableSchema};
use crate::utils::{line_content_len, utf16_column_to_char};

pub const MODELS_PREFIX: &str = "app.models.";

/// Default number of lines above the cursor that are scanned.
pub const WINDOW_LINES: usize = 200;

/// Text surrounding a cursor, borrowed from the document where possible.
#[derive(Debug)]
pub struct Window<'a> {
	/// The cursor's line, up to the cursor.
	pub prefix: Cow<'a, str>,
	/// From the start of the line `lines` above the cursor through the cursor.
	pub text: Cow<'a, str>,
}

impl<'a> Window<'a> {
	/// Positions past the end of a line or of the document are clamped.
	pub fn new(rope: RopeSlice<'a>, position: Position, lines: usize) -> Self {
		let last_line = rope.len_lines().saturating_sub(1);
		let line = (position.line as usize).min(last_line);
		let line_start = rope.line_to_char(line);
		let column = utf16_column_to_char(rope.line(line), position.character).min(line_content_len(rope.line(line)));
		let cursor = line_start + column;
		let window_start = rope.line_to_char(line.saturating_sub(lines));
		Window {
			prefix: rope.slice(line_start..cursor).into(),
			text: rope.slice(window_start..cursor).into(),
		}
	}
}

/// Why a relation chain could not be followed to a model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveMiss {
	#[error("none of the relations {chain:?} are declared on `{model}`")]
	Unmatched { model: String, chain: Vec<String> },
	#[error("`{model}` declares no relation `{relation}`")]
	UnknownRelation { model: String, relation: String },
	#[error("`{model}.{relation}` targets `{target}`, which is not loaded")]
	Dangling {
		model: String,
		relation: String,
		target: String,
	},
}

/// Finds the model named by the rightmost `app.models.<Name>` in `text`.
pub fn parent_model<'s>(text: &str, store: &'s SchemaStore) -> Option<&'s TableSchema> {
	let start = text.rfind(MODELS_PREFIX)?;
	let name = text[start..].split('.').nth(2)?;
	store.find(name)
}

/// Follows the relation chain found in `text`, starting from `parent`.
///
/// Starts at the rightmost token that `parent` declares, so tokens belonging
/// to enclosing queries further left are skipped.
pub fn nested_model<'s>(
	text: &str,
	parent: &'s TableSchema,
	store: &'s SchemaStore,
) -> Result<&'s TableSchema, ResolveMiss> {
	let chain = extract_relation_chain(text);
	if chain.is_empty() {
		return Ok(parent);
	}
	let Some(start) = chain.iter().rposition(|name| parent.relations.contains_key(name)) else {
		return Err(ResolveMiss::Unmatched {
			model: parent.name.clone(),
			chain,
		});
	};

	let mut current = parent;
	for relation_name in &chain[start..] {
		let Some(relation) = current.relations.get(relation_name) else {
			return Err(ResolveMiss::UnknownRelation {
				model: current.name.clone(),
				relation: relation_name.clone(),
			});
		};
		let target = relation.model.as_deref().unwrap_or_default();
		let Some(next) = store.find(target) else {
			return Err(ResolveMiss::Dangling {
				model: current.name.clone(),
				relation: relation_name.clone(),
				target: target.to_string(),
			});
		};
		current = next;
	}
	Ok(current)
}

/// Parent lookup followed by the nested walk; misses are only logged.
pub fn resolve_model<'s>(text: &str, store: &'s SchemaStore) -> Option<&'s TableSchema> {
	let Some(parent) = parent_model(text, store) else {
		debug!("no parent model in window");
		return None;
	};
	nested_model(text, parent, store)
		.inspect_err(|miss| debug!(parent = %parent.name, "{miss}"))
		.ok()
}
