//! Bulk loading of a folder of schema files.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::schema::TableSchema;

/// The whole folder could not be listed; it contributes no schemas.
#[derive(Debug, Error, Diagnostic)]
#[error("could not read folder {}: {source}", .path.display())]
#[diagnostic(code(schema_lsp::loader::folder))]
pub struct LoadError {
	pub path: PathBuf,
	#[source]
	pub source: std::io::Error,
}

/// A single file was skipped; the rest of its folder still loads.
#[derive(Debug, Error, Diagnostic)]
pub enum FileError {
	#[error("could not read {}: {source}", .path.display())]
	#[diagnostic(code(schema_lsp::loader::read))]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid schema in {}: {source}", .path.display())]
	#[diagnostic(
		code(schema_lsp::loader::parse),
		help("each file must hold one JSON object with at least a `name`")
	)]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

impl FileError {
	pub fn path(&self) -> &Path {
		match self {
			FileError::Read { path, .. } | FileError::Parse { path, .. } => path,
		}
	}
}

#[derive(Debug)]
pub struct FolderLoad {
	pub folder: PathBuf,
	/// In file name order.
	pub tables: Vec<TableSchema>,
	pub skipped: Vec<FileError>,
}

/// Any file name containing `.json` qualifies, so `foo.jsonx` and `foo.json.bak` are picked up too.
pub fn is_schema_file(file_name: &str) -> bool {
	file_name.contains(".json")
}

#[instrument(skip_all, fields(folder = %folder.display()))]
pub async fn load_folder(folder: &Path) -> Result<FolderLoad, LoadError> {
	let to_load_error = |source| LoadError {
		path: folder.to_path_buf(),
		source,
	};
	let mut entries = tokio::fs::read_dir(folder).await.map_err(to_load_error)?;
	let mut files = vec![];
	while let Some(entry) = entries.next_entry().await.map_err(to_load_error)? {
		if is_schema_file(&entry.file_name().to_string_lossy()) {
			files.push(entry.path());
		}
	}
	files.sort();
	debug!("{} candidate files", files.len());

	let results = futures::future::join_all(files.into_iter().map(load_file)).await;
	let mut tables = vec![];
	let mut skipped = vec![];
	for result in results {
		match result {
			Ok(table) => tables.push(table),
			Err(err) => skipped.push(err),
		}
	}

	Ok(FolderLoad {
		folder: folder.to_path_buf(),
		tables,
		skipped,
	})
}

async fn load_file(path: PathBuf) -> Result<TableSchema, FileError> {
	let contents = match tokio::fs::read_to_string(&path).await {
		Ok(contents) => contents,
		Err(source) => return Err(FileError::Read { path, source }),
	};
	serde_json::from_str(&contents).map_err(|source| FileError::Parse { path, source })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::SchemaStore;
	use pretty_assertions::assert_eq;

	fn fixture() -> tempfile::TempDir {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("a.json"),
			r#"{ "name": "User", "relations": { "posts": { "model": "Post" } } }"#,
		)
		.unwrap();
		std::fs::write(dir.path().join("b.json"), "{ this is not json").unwrap();
		std::fs::write(dir.path().join("c.txt"), r#"{ "name": "Ignored" }"#).unwrap();
		dir
	}

	#[test]
	fn test_is_schema_file() {
		assert!(is_schema_file("user.json"));
		assert!(is_schema_file("user.jsonx"));
		assert!(!is_schema_file("user.JSON"));
		assert!(!is_schema_file("user.txt"));
	}

	#[tokio::test]
	async fn test_load_folder_skips_invalid_files() {
		let dir = fixture();
		let load = load_folder(dir.path()).await.unwrap();
		assert_eq!(
			load.tables.iter().map(|table| table.name.as_str()).collect::<Vec<_>>(),
			["User"]
		);
		assert_eq!(load.skipped.len(), 1);
		assert!(matches!(&load.skipped[0], FileError::Parse { .. }));
		assert_eq!(load.skipped[0].path(), dir.path().join("b.json"));
	}

	#[tokio::test]
	async fn test_load_folder_in_name_order() {
		let dir = tempfile::tempdir().unwrap();
		for name in ["Zebra", "Apple", "Mango"] {
			std::fs::write(
				dir.path().join(format!("{}.json", name.to_lowercase())),
				format!(r#"{{ "name": "{name}" }}"#),
			)
			.unwrap();
		}
		let load = load_folder(dir.path()).await.unwrap();
		assert_eq!(
			load.tables.iter().map(|table| table.name.as_str()).collect::<Vec<_>>(),
			["Apple", "Mango", "Zebra"]
		);
	}

	#[tokio::test]
	async fn test_loosely_typed_files_load() {
		let dir = tempfile::tempdir().unwrap();
		let files = [
			("a.json", r#"{ "name": "A", "properties": { "id": { "nullable": 0 } } }"#),
			("b.json", r#"{ "name": "B", "relations": { "a": "A" } }"#),
			("c.json", r#"{ "name": "C", "relations": null }"#),
			("d.json", r#"{ "name": "D", "properties": { "code": { "dataType": ["varchar", 255] } } }"#),
		];
		for (name, contents) in files {
			std::fs::write(dir.path().join(name), contents).unwrap();
		}
		let load = load_folder(dir.path()).await.unwrap();
		assert!(load.skipped.is_empty(), "{:?}", load.skipped);
		assert_eq!(
			load.tables.iter().map(|table| table.name.as_str()).collect::<Vec<_>>(),
			["A", "B", "C", "D"]
		);
		assert_eq!(load.tables[1].relations["a"].model, None);
	}

	#[tokio::test]
	async fn test_missing_folder() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("missing");
		let err = load_folder(&missing).await.unwrap_err();
		assert_eq!(err.path, missing);
		assert!(err.to_string().contains("could not read folder"));
	}

	#[tokio::test]
	async fn test_reload_appends_duplicates() {
		let dir = fixture();
		let mut store = SchemaStore::default();
		store.extend(load_folder(dir.path()).await.unwrap().tables);
		std::fs::write(
			dir.path().join("a.json"),
			r#"{ "name": "User", "properties": { "email": {} } }"#,
		)
		.unwrap();
		store.extend(load_folder(dir.path()).await.unwrap().tables);

		assert_eq!(store.len(), 2);
		let user = store.find("User").unwrap();
		assert!(user.relations.contains_key("posts"));
		assert!(user.properties.is_empty());
	}
}
