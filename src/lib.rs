#![warn(clippy::unused_async)]

pub mod backend;
pub mod completion;
pub mod config;
pub mod loader;
pub mod resolver;
pub mod scanner;
pub mod schema;
pub mod server;
pub mod utils;

pub use backend::Backend;
pub use schema::{SchemaStore, TableSchema};

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Exact tag if the build is tagged, otherwise `git describe` output.
pub const GITVER: &str = {
	const TAGGED: &str = git_version::git_version!(args = ["--tags", "--candidates=0"], fallback = "");
	if TAGGED.is_empty() {
		git_version::git_version!(fallback = "unknown")
	} else {
		TAGGED
	}
};
