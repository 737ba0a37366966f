use std::path::{Path, PathBuf};
use std::str::FromStr;

use ropey::RopeSlice;
use tower_lsp_server::lsp_types::{Position, Range, Uri};
use tower_lsp_server::UriExt;

mod catch_panic;
pub use catch_panic::CatchPanic;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CharOffset(pub usize);
pub type CharRange = core::ops::Range<CharOffset>;

pub trait RangeExt {
	type Unit;
	fn map_unit<F, V>(self, op: F) -> core::ops::Range<V>
	where
		F: FnMut(Self::Unit) -> V;
}

impl<T> RangeExt for core::ops::Range<T> {
	type Unit = T;

	#[inline]
	fn map_unit<F, V>(self, mut op: F) -> core::ops::Range<V>
	where
		F: FnMut(Self::Unit) -> V,
	{
		op(self.start)..op(self.end)
	}
}

/// Number of chars in `line`, excluding its line break.
pub fn line_content_len(line: RopeSlice<'_>) -> usize {
	let mut len = line.len_chars();
	if len > 0 && line.char(len - 1) == '\n' {
		len -= 1;
	}
	if len > 0 && line.char(len - 1) == '\r' {
		len -= 1;
	}
	len
}

/// Converts a UTF-16 column on `line` to a char column, clamped to the end of the line.
pub fn utf16_column_to_char(line: RopeSlice<'_>, character: u32) -> usize {
	let units = (character as usize).min(line.len_utf16_cu());
	line.utf16_cu_to_char(units)
}

/// Positions count UTF-16 code units. Returns [`None`] if the position is past the end of the document.
pub fn position_to_char(position: Position, rope: RopeSlice<'_>) -> Option<CharOffset> {
	let line_start = rope.try_line_to_char(position.line as usize).ok()?;
	let units = rope.char_to_utf16_cu(line_start) + position.character as usize;
	(units <= rope.len_utf16_cu()).then(|| CharOffset(rope.utf16_cu_to_char(units)))
}

pub fn lsp_range_to_char_range(range: Range, rope: RopeSlice<'_>) -> Option<CharRange> {
	let start = position_to_char(range.start, rope)?;
	let end = position_to_char(range.end, rope)?;
	(start <= end).then_some(start..end)
}

/// Accepts either a `file://` URI or a plain filesystem path.
pub fn path_from_argument(argument: &str) -> Option<PathBuf> {
	if argument.starts_with("file://") {
		let uri = Uri::from_str(argument).ok()?;
		return uri.to_file_path().map(|path| path.into_owned());
	}
	Some(PathBuf::from(argument))
}

/// Joins relative paths onto `base`, if any.
pub fn resolve_against(path: PathBuf, base: Option<&Path>) -> PathBuf {
	match base {
		Some(base) if path.is_relative() => base.join(path),
		_ => path,
	}
}

#[cfg(test)]
pub fn init_for_test() {
	use std::sync::Once;
	use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

	static INIT: Once = Once::new();
	INIT.call_once(|| {
		tracing_subscriber::registry()
			.with(tracing_subscriber::fmt::layer().with_test_writer())
			.with(EnvFilter::from("info,schema_lsp=trace"))
			.init();
	});
}
