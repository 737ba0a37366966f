//! Table schemas and the in-memory [`SchemaStore`] they are appended to.

use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One data model, as read from a single JSON schema file.
///
/// Only `name` is checked. Every other key is read leniently: `properties`
/// and `relations` that are absent, `null` or not objects are empty, and
/// entries of the wrong shape keep whatever could be read from them.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TableSchema {
	pub name: String,
	#[serde(default, deserialize_with = "lenient_map")]
	pub properties: IndexMap<String, PropertySchema>,
	#[serde(default, deserialize_with = "lenient_map")]
	pub relations: IndexMap<String, RelationSchema>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySchema {
	pub column_name: Option<String>,
	/// Non-string tags such as `["varchar", 255]` are kept as their JSON text.
	pub data_type: Option<String>,
	pub nullable: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationSchema {
	/// Name of the target [`TableSchema`]. May name a model that was never loaded,
	/// and is [`None`] when the entry has no string `model`.
	pub model: Option<String>,
	pub foreign_key: Option<String>,
	pub kind: Option<String>,
}

fn lenient_map<'de, D, T>(deserializer: D) -> Result<IndexMap<String, T>, D::Error>
where
	D: Deserializer<'de>,
	T: From<Value>,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::Object(entries) => entries.into_iter().map(|(key, value)| (key, T::from(value))).collect(),
		_ => IndexMap::new(),
	})
}

fn text(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(text) => Some(text.clone()),
		other => Some(other.to_string()),
	}
}

/// Schema files write nullability as booleans, numbers or strings such as `"YES"`.
fn truthy(value: &Value) -> bool {
	match value {
		Value::Bool(flag) => *flag,
		Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
		Value::String(text) => matches!(text.to_ascii_lowercase().as_str(), "true" | "yes" | "y" | "1"),
		_ => false,
	}
}

impl From<Value> for PropertySchema {
	fn from(value: Value) -> Self {
		let Value::Object(fields) = value else {
			return PropertySchema::default();
		};
		PropertySchema {
			column_name: fields.get("columnName").and_then(text),
			data_type: fields.get("dataType").and_then(text),
			nullable: fields.get("nullable").is_some_and(truthy),
		}
	}
}

impl From<Value> for RelationSchema {
	fn from(value: Value) -> Self {
		let Value::Object(fields) = value else {
			return RelationSchema::default();
		};
		RelationSchema {
			model: fields.get("model").and_then(Value::as_str).map(String::from),
			foreign_key: fields.get("foreignKey").and_then(text),
			kind: fields.get("type").and_then(text),
		}
	}
}

impl PropertySchema {
	#[inline]
	pub fn is_nullable(&self) -> bool {
		self.nullable
	}
}

impl Display for RelationSchema {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.model.as_deref().unwrap_or("?"))?;
		if let Some(kind) = &self.kind {
			write!(f, " ({kind})")?;
		}
		Ok(())
	}
}

/// Ordered, append-only collection of loaded schemas.
///
/// Lookups are linear and the first schema with a given name wins, so loading
/// the same folder twice leaves the earlier entries authoritative.
#[derive(Debug, Default)]
pub struct SchemaStore {
	tables: Vec<TableSchema>,
}

impl SchemaStore {
	pub fn append(&mut self, table: TableSchema) {
		self.tables.push(table);
	}

	pub fn find(&self, name: &str) -> Option<&TableSchema> {
		self.tables.iter().find(|table| table.name == name)
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.tables.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, TableSchema> {
		self.tables.iter()
	}
}

impl Extend<TableSchema> for SchemaStore {
	fn extend<T: IntoIterator<Item = TableSchema>>(&mut self, iter: T) {
		self.tables.extend(iter)
	}
}

impl FromIterator<TableSchema> for SchemaStore {
	fn from_iter<T: IntoIterator<Item = TableSchema>>(iter: T) -> Self {
		SchemaStore {
			tables: iter.into_iter().collect(),
		}
	}
}

impl<'a> IntoIterator for &'a SchemaStore {
	type Item = &'a TableSchema;
	type IntoIter = std::slice::Iter<'a, TableSchema>;

	fn into_iter(self) -> Self::IntoIter {
		self.tables.iter()
	}
}
