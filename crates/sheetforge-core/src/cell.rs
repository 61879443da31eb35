//! The immutable `Cell`: a value plus an optional style reference, comment,
//! and hyperlink.

use crate::style_registry::StyleId;
use crate::value::CellValue;

/// A cell-attached note: an author plus free text, per `xl/comments*.xml`.
/// The legacy VML shape that anchors a comment's on-screen rendering is
/// outside this model — only the text content is represented.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub author: String,
    pub text: String,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Comment { author: author.into(), text: text.into() }
    }
}

/// Where a [`Hyperlink`] points: an external URL, or a location within the
/// same workbook (a sheet-qualified reference or a defined name).
#[derive(Debug, Clone, PartialEq)]
pub enum HyperlinkTarget {
    External(String),
    Location(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hyperlink {
    pub target: HyperlinkTarget,
    pub tooltip: Option<String>,
}

impl Hyperlink {
    pub fn external(url: impl Into<String>) -> Self {
        Hyperlink { target: HyperlinkTarget::External(url.into()), tooltip: None }
    }

    pub fn location(reference: impl Into<String>) -> Self {
        Hyperlink { target: HyperlinkTarget::Location(reference.into()), tooltip: None }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<StyleId>,
    pub comment: Option<Comment>,
    pub hyperlink: Option<Hyperlink>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Cell { value, style: None, comment: None, hyperlink: None }
    }

    pub fn empty() -> Self {
        Cell::new(CellValue::Empty)
    }

    pub fn with_style(mut self, style: StyleId) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn with_hyperlink(mut self, hyperlink: Hyperlink) -> Self {
        self.hyperlink = Some(hyperlink);
        self
    }

    /// A cell is empty only if it carries no value, no style, and no
    /// comment/hyperlink metadata — Excel still stores a row/cell entry for
    /// an otherwise-blank cell that only carries a comment or hyperlink.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style.is_none() && self.comment.is_none() && self.hyperlink.is_none()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::empty()
    }
}

impl<T: Into<CellValue>> From<T> for Cell {
    fn from(v: T) -> Self {
        Cell::new(v.into())
    }
}
