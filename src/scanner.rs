//! Extraction of `relation: '<name>'` chains from raw text.
//!
//! Nesting is not tracked: every occurrence in the text contributes a token,
//! including ones from sibling objects that have already been closed.

use std::sync::LazyLock;

use regex::Regex;

static RELATION: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"\brelation["']?\s*:\s*["'`]?\s*([A-Za-z_$][\w$]*)"#).expect("relation pattern is valid")
});

/// Relation names in source order, outermost first.
pub fn extract_relation_chain(text: &str) -> Vec<String> {
	RELATION
		.captures_iter(text)
		.filter_map(|captures| captures.get(1))
		.map(|name| name.as_str().to_string())
		.collect()
}
