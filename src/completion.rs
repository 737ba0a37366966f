//! Trigger discrimination and conversion of resolved models into candidates.

use tower_lsp_server::lsp_types::{CompletionItem, CompletionItemKind};

use crate::resolver::{resolve_model, Window, MODELS_PREFIX};
use crate::schema::{SchemaStore, TableSchema};

/// Characters the client should send completion requests on.
pub const TRIGGER_CHARACTERS: [char; 3] = ['.', '\'', '{'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
	/// The line ends with `app.models.`
	ModelName,
	/// The line contains `where:`
	Where,
	/// The line contains `relation:`
	Relation,
}

impl Trigger {
	/// `where:` takes precedence over `relation:` when a line has both.
	pub fn classify(prefix: &str) -> Option<Self> {
		if prefix.ends_with(MODELS_PREFIX) {
			Some(Trigger::ModelName)
		} else if prefix.contains("where:") {
			Some(Trigger::Where)
		} else if prefix.contains("relation:") {
			Some(Trigger::Relation)
		} else {
			None
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
	Model,
	Field,
	Relation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
	pub name: String,
	pub kind: CandidateKind,
	pub detail: Option<String>,
}

/// Candidates for the cursor described by `window`, in stored order.
pub fn complete(window: &Window<'_>, store: &SchemaStore) -> Option<Vec<Candidate>> {
	match Trigger::classify(&window.prefix)? {
		Trigger::ModelName => complete_model_name(store),
		trigger @ (Trigger::Where | Trigger::Relation) => complete_member(trigger, &window.text, store),
	}
}

/// Offers every model, but only once more than one is loaded.
pub fn complete_model_name(store: &SchemaStore) -> Option<Vec<Candidate>> {
	if store.len() <= 1 {
		return None;
	}
	let candidates = store
		.iter()
		.map(|table| Candidate {
			name: table.name.clone(),
			kind: CandidateKind::Model,
			detail: Some(format!(
				"{} properties, {} relations",
				table.properties.len(),
				table.relations.len()
			)),
		})
		.collect();
	Some(candidates)
}

fn complete_member(trigger: Trigger, text: &str, store: &SchemaStore) -> Option<Vec<Candidate>> {
	let model = resolve_model(text, store)?;
	Some(match trigger {
		Trigger::Where => properties_of(model),
		_ => relations_of(model),
	})
}

fn properties_of(model: &TableSchema) -> Vec<Candidate> {
	model
		.properties
		.iter()
		.map(|(name, property)| Candidate {
			name: name.clone(),
			kind: CandidateKind::Field,
			detail: property.data_type.as_ref().map(|data_type| {
				if property.is_nullable() {
					format!("{data_type}?")
				} else {
					data_type.clone()
				}
			}),
		})
		.collect()
}

fn relations_of(model: &TableSchema) -> Vec<Candidate> {
	model
		.relations
		.iter()
		.map(|(name, relation)| Candidate {
			name: name.clone(),
			kind: CandidateKind::Relation,
			detail: Some(relation.to_string()),
		})
		.collect()
}

impl From<Candidate> for CompletionItem {
	fn from(candidate: Candidate) -> Self {
		let kind = match candidate.kind {
			CandidateKind::Model => CompletionItemKind::CLASS,
			CandidateKind::Field => CompletionItemKind::FIELD,
			CandidateKind::Relation => CompletionItemKind::REFERENCE,
		};
		CompletionItem {
			label: candidate.name,
			kind: Some(kind),
			detail: candidate.detail,
			..Default::default()
		}
	}
}
