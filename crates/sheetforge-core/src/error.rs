//! Error taxonomy for the sheetforge core.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. Errors are
//! grouped by the layer that raises them: addressing, structure (sheet/
//! workbook shape), typing (value conversions), content (style/string
//! limits), I/O and parsing, and security (hostile container rejection).

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // --- Addressing ---
    #[error("invalid cell reference: {0}")]
    InvalidCellReference(String),

    #[error("invalid column number: {0}")]
    InvalidColumnNumber(u32),

    #[error("invalid row number: {0}")]
    InvalidRowNumber(u32),

    #[error("column {0} exceeds the maximum of {1} columns")]
    ColumnOutOfRange(u32, u32),

    #[error("row {0} exceeds the maximum of {1} rows")]
    RowOutOfRange(u32, u32),

    #[error("invalid cell range: {0}")]
    InvalidRange(String),

    #[error("invalid sheet-qualified reference: {0}")]
    InvalidSheetReference(String),

    // --- Structure ---
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("a sheet named {0:?} already exists")]
    DuplicateSheetName(String),

    #[error("invalid sheet name {0:?}: {1}")]
    InvalidSheetName(String, String),

    #[error("workbook must contain at least one visible sheet")]
    NoVisibleSheets,

    #[error("cell range {0} overlaps an existing merge")]
    OverlappingMerge(String),

    #[error("cell range {0} is not a merged region")]
    NotMerged(String),

    // --- Typing ---
    #[error("cannot convert cell value to {0}")]
    TypeConversion(&'static str),

    #[error("invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("invalid datetime literal: {0}")]
    InvalidDateTime(String),

    #[error("unknown cell error code: {0}")]
    UnknownCellError(String),

    // --- Content / capacity ---
    #[error("style registry is full: at most {0} cell formats are supported")]
    StyleRegistryFull(u32),

    #[error("cell text exceeds the maximum of {0} characters")]
    CellTextTooLong(u32),

    #[error("sheet name {0:?} exceeds the maximum of {1} characters")]
    SheetNameTooLong(String, usize),

    #[error("style id {0} is not registered")]
    UnknownStyleId(u32),

    #[error("string id {0} is not present in the shared string table")]
    UnknownStringId(u32),

    #[error("comment references unknown authorId {0}")]
    UnknownCommentAuthor(u32),

    // --- I/O / parsing ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML read error: {0}")]
    XmlRead(String),

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("part not found in container: {0}")]
    PartNotFound(String),

    #[error("malformed relationship graph: {0}")]
    MalformedRelationships(String),

    #[error("not a valid OOXML package: {0}")]
    InvalidContainer(String),

    // --- Security ---
    #[error("archive exceeds the maximum allowed entry count ({0})")]
    TooManyEntries(usize),

    #[error("entry {0:?} exceeds the maximum allowed uncompressed size ({1} bytes)")]
    EntryTooLarge(String, u64),

    #[error("entry {0:?} exceeds the maximum allowed compression ratio")]
    SuspiciousCompressionRatio(String),

    #[error("entry path {0:?} escapes the archive root")]
    UnsafeEntryPath(String),

    #[error("XML document references an external entity or DOCTYPE, which is not permitted")]
    UnsafeXml,

    // --- Capability gaps (explicit Non-goals) ---
    #[error("{0} is outside the scope of this library and is preserved only as opaque bytes")]
    Unsupported(&'static str),
}

// quick-xml 0.36 uses a single `DeError` type for both `de::from_str` and
// `se::to_string`; there is no separate serialize-error type to convert
// from. Call sites that serialize map it to `Error::XmlWrite` explicitly
// with `.map_err(...)` instead of relying on this blanket conversion.
impl From<quick_xml::DeError> for Error {
    fn from(e: quick_xml::DeError) -> Self {
        Error::XmlRead(e.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::XmlRead(e.to_string())
    }
}
