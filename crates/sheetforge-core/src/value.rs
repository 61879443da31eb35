//! Cell value types.
//!
//! `CellValue` is the in-memory representation of what lives in a cell,
//! independent of how it is encoded on disk (shared string vs. inline,
//! numeric literal text, etc). Numbers keep their original source text
//! alongside a [`BigDecimal`] so that round-tripping a workbook never loses
//! precision or reformats a literal Excel wrote (`"1.50"` stays `"1.50"`).

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// The standard Excel `#REF!`-style error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    Null,
    Div0,
    Value,
    Ref,
    Name,
    Num,
    NotAvailable,
    GettingData,
    Spill,
    Calc,
}

impl CellError {
    pub fn as_str(self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::NotAvailable => "#N/A",
            CellError::GettingData => "#GETTING_DATA",
            CellError::Spill => "#SPILL!",
            CellError::Calc => "#CALC!",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "#NULL!" => CellError::Null,
            "#DIV/0!" => CellError::Div0,
            "#VALUE!" => CellError::Value,
            "#REF!" => CellError::Ref,
            "#NAME?" => CellError::Name,
            "#NUM!" => CellError::Num,
            "#N/A" => CellError::NotAvailable,
            "#GETTING_DATA" => CellError::GettingData,
            "#SPILL!" => CellError::Spill,
            "#CALC!" => CellError::Calc,
            other => return Err(Error::UnknownCellError(other.to_string())),
        })
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A run of text sharing the same run properties, as stored in rich text
/// (`<si><r>...</r></si>` or inline `<is><r>...</is>`). The core treats run
/// properties as an opaque, preserved blob rather than modeling every font
/// attribute twice.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub font_name: Option<String>,
    pub size: Option<f64>,
    pub color_rgb: Option<String>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        TextRun {
            text: text.into(),
            bold: false,
            italic: false,
            font_name: None,
            size: None,
            color_rgb: None,
        }
    }

    /// True when the run carries no formatting, i.e. it renders the same
    /// as plain text.
    pub fn is_unformatted(&self) -> bool {
        !self.bold && !self.italic && self.font_name.is_none() && self.size.is_none() && self.color_rgb.is_none()
    }
}

/// The value held by a cell, independent of its on-disk encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    /// A numeric value. `original_text`, when present, is the exact literal
    /// the cell was read from (e.g. `"1.50"`, `"1e3"`) and is preferred over
    /// re-formatting `value` when the cell is copied through unmodified.
    Number {
        value: BigDecimal,
        original_text: Option<String>,
    },
    Bool(bool),
    DateTime(NaiveDateTime),
    /// A formula cell. `cached` is the last-calculated value Excel stored
    /// alongside the formula; this library never evaluates formulas.
    Formula {
        formula: String,
        cached: Option<Box<CellValue>>,
    },
    RichText(Vec<TextRun>),
    Error(CellError),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn number(value: impl Into<BigDecimal>) -> Self {
        CellValue::Number { value: value.into(), original_text: None }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The plain-text projection used for shared-string dedup and for
    /// `str`-typed cached formula output; rich text joins its runs without
    /// separators, matching how Excel concatenates `<r><t>` segments.
    pub fn plain_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::RichText(runs) => {
                Some(runs.iter().map(|r| r.text.as_str()).collect::<String>())
            }
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::RichText(runs) => {
                write!(f, "{}", runs.iter().map(|r| r.text.as_str()).collect::<String>())
            }
            CellValue::Number { value, original_text } => {
                write!(f, "{}", original_text.as_deref().unwrap_or(&value.to_string()))
            }
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => write!(f, "{dt}"),
            CellValue::Error(e) => write!(f, "{e}"),
            CellValue::Formula { formula, cached } => match cached {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "={formula}"),
            },
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number { value: BigDecimal::from(n), original_text: None }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        let value = BigDecimal::try_from(n).unwrap_or_default();
        CellValue::Number { value, original_text: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_error_roundtrips_through_code() {
        for e in [
            CellError::Null,
            CellError::Div0,
            CellError::Value,
            CellError::Ref,
            CellError::Name,
            CellError::Num,
            CellError::NotAvailable,
            CellError::GettingData,
            CellError::Spill,
            CellError::Calc,
        ] {
            assert_eq!(CellError::parse(e.as_str()).unwrap(), e);
        }
    }

    #[test]
    fn cell_error_rejects_unknown_code() {
        assert!(CellError::parse("#BOGUS!").is_err());
    }

    #[test]
    fn number_preserves_original_text() {
        let v = CellValue::Number {
            value: "1.50".parse().unwrap(),
            original_text: Some("1.50".to_string()),
        };
        match v {
            CellValue::Number { original_text, .. } => {
                assert_eq!(original_text.as_deref(), Some("1.50"));
            }
            _ => panic!("expected Number"),
        }
    }

    #[test]
    fn rich_text_plain_text_concatenates_runs_without_separator() {
        let v = CellValue::RichText(vec![TextRun::plain("Hello, "), TextRun::plain("world!")]);
        assert_eq!(v.plain_text().unwrap(), "Hello, world!");
    }

    #[test]
    fn empty_value_has_no_plain_text() {
        assert_eq!(CellValue::Empty.plain_text(), None);
        assert!(CellValue::Empty.is_empty());
    }
}
