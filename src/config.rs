use serde::{Deserialize, Serialize};

/// Client settings, from `initializationOptions` or the `schema-lsp` configuration section.
///
/// Missing keys leave the current value untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema: Option<SchemaConfig>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolver: Option<ResolverConfig>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub languages: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SchemaConfig {
	pub folders: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ResolverConfig {
	/// How many lines above the cursor are scanned for references.
	pub lines: Option<usize>,
}
