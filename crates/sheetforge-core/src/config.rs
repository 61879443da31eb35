//! Writer/reader configuration objects. Plain data, no global state: every
//! entry point takes its configuration explicitly rather than reading from
//! thread-locals or statics.

/// Compression used when writing ZIP entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Deflate,
    Stored,
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Deflate
    }
}

/// Controls whether the container writer uses a shared string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SstMode {
    /// Decide per the pinned heuristic in [`crate::sst`].
    #[default]
    Auto,
    AlwaysShared,
    AlwaysInline,
}

/// Writer-side knobs for producing a `.xlsx` container.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    pub compression: Compression,
    pub sst_mode: SstMode,
    /// Pretty-print XML parts (indented) instead of the compact form Excel
    /// itself writes. Off by default: Excel's own output is unindented and
    /// matching it byte-for-byte matters more than human readability.
    pub pretty_print: bool,
    /// When set, a text cell whose content starts with `=`, `+`, `-`, or
    /// `@` is defensively prefixed with a literal leading apostrophe before
    /// being written, so that opening the file in a tool which treats any
    /// leading `=`/`+`/`-`/`@` as a formula trigger (common CSV-injection
    /// class mitigations) can't be tricked into evaluating cell text as a
    /// formula. Off by default, since it mutates cell text.
    pub strict_formula_guard: bool,
    pub max_file_size_bytes: u64,
    pub max_cell_count: u64,
    pub max_string_length: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            compression: Compression::default(),
            sst_mode: SstMode::default(),
            pretty_print: false,
            strict_formula_guard: false,
            max_file_size_bytes: 512 * 1024 * 1024,
            max_cell_count: 50_000_000,
            max_string_length: crate::utils::constants::MAX_CELL_CHARS as usize,
        }
    }
}

/// Reader-side limits that guard against zip-bomb / XML-bomb style hostile
/// containers before any part is fully inflated or parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderLimits {
    pub max_entry_count: usize,
    pub max_uncompressed_entry_bytes: u64,
    pub max_compression_ratio: u64,
}

impl Default for ReaderLimits {
    fn default() -> Self {
        ReaderLimits {
            max_entry_count: 10_000,
            max_uncompressed_entry_bytes: 1024 * 1024 * 1024,
            max_compression_ratio: 200,
        }
    }
}

/// Characters that trip the formula-injection guard when leading a text cell.
pub const FORMULA_GUARD_TRIGGERS: &[char] = &['=', '+', '-', '@'];

pub fn apply_formula_guard(text: &str) -> String {
    match text.chars().next() {
        Some(c) if FORMULA_GUARD_TRIGGERS.contains(&c) => format!("'{text}"),
        _ => text.to_string(),
    }
}
