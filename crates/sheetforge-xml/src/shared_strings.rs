//! Shared Strings XML schema structures.
//!
//! Represents `xl/sharedStrings.xml` in the OOXML package.

use serde::{Deserialize, Serialize};

use crate::namespaces;

/// Shared String Table root element (`xl/sharedStrings.xml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "sst")]
pub struct Sst {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,

    /// Total reference count of shared strings in the workbook.
    #[serde(rename = "@count", skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    /// Number of unique string entries.
    #[serde(rename = "@uniqueCount", skip_serializing_if = "Option::is_none")]
    pub unique_count: Option<u32>,

    /// Shared string items.
    #[serde(rename = "si", default)]
    pub items: Vec<Si>,
}

/// Shared String Item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Si {
    /// Plain text content.
    #[serde(rename = "t", skip_serializing_if = "Option::is_none")]
    pub t: Option<T>,

    /// Rich text runs (formatted text).
    #[serde(rename = "r", default)]
    pub r: Vec<R>,
}

/// Text element with optional space preservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct T {
    #[serde(
        rename = "@xml:space",
        alias = "@space",
        skip_serializing_if = "Option::is_none"
    )]
    pub xml_space: Option<String>,

    #[serde(rename = "$value", default)]
    pub value: String,
}

/// Rich text run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct R {
    /// Run properties (formatting).
    #[serde(rename = "rPr", skip_serializing_if = "Option::is_none")]
    pub r_pr: Option<RPr>,

    /// Text content.
    #[serde(rename = "t")]
    pub t: T,
}

/// Run properties (text formatting within a rich text run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RPr {
    #[serde(rename = "b", skip_serializing_if = "Option::is_none")]
    pub b: Option<BoolVal>,

    #[serde(rename = "i", skip_serializing_if = "Option::is_none")]
    pub i: Option<BoolVal>,

    #[serde(rename = "sz", skip_serializing_if = "Option::is_none")]
    pub sz: Option<FontSize>,

    #[serde(rename = "color", skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,

    #[serde(rename = "rFont", skip_serializing_if = "Option::is_none")]
    pub r_font: Option<FontName>,

    #[serde(rename = "family", skip_serializing_if = "Option::is_none")]
    pub family: Option<FontFamily>,

    #[serde(rename = "scheme", skip_serializing_if = "Option::is_none")]
    pub scheme: Option<FontScheme>,
}

/// Boolean value wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolVal {
    #[serde(rename = "@val", skip_serializing_if = "Option::is_none")]
    pub val: Option<bool>,
}

/// Font size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSize {
    #[serde(rename = "@val")]
    pub val: f64,
}

/// Color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    #[serde(rename = "@rgb", skip_serializing_if = "Option::is_none")]
    pub rgb: Option<String>,

    #[serde(rename = "@theme", skip_serializing_if = "Option::is_none")]
    pub theme: Option<u32>,

    #[serde(rename = "@tint", skip_serializing_if = "Option::is_none")]
    pub tint: Option<f64>,
}

/// Font name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontName {
    #[serde(rename = "@val")]
    pub val: String,
}

/// Font family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontFamily {
    #[serde(rename = "@val")]
    pub val: u32,
}

/// Font scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontScheme {
    #[serde(rename = "@val")]
    pub val: String,
}

impl Default for Sst {
    fn default() -> Self {
        Self {
            xmlns: namespaces::SPREADSHEET_ML.to_string(),
            count: Some(0),
            unique_count: Some(0),
            items: vec![],
        }
    }
}

/// Extracts every `<t>` element's literal text content from raw XML, in
/// document order, exactly as it appeared in the source bytes. Used to undo
/// `quick_xml::de::from_str`'s `StartTrimmer`, which strips leading/trailing
/// whitespace from text nodes even under `xml:space="preserve"`.
pub fn raw_t_texts(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut out = Vec::new();
    let mut depth = 0u32;
    // `<rPh>` (phonetic guide runs) nests its own `<t>` inside `<si>`, but
    // `Si`/`R` don't model it, so its text must not be counted as an entry.
    let mut rph_depth = 0u32;
    let mut current = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => rph_depth += 1,
            Event::End(e) if e.local_name().as_ref() == b"rPh" => rph_depth = rph_depth.saturating_sub(1),
            Event::Start(e) if rph_depth == 0 && e.local_name().as_ref() == b"t" => {
                depth += 1;
                current.clear();
            }
            Event::Empty(e) if rph_depth == 0 && e.local_name().as_ref() == b"t" => {
                out.push(String::new());
            }
            Event::End(e) if rph_depth == 0 && e.local_name().as_ref() == b"t" => {
                if depth > 0 {
                    depth -= 1;
                    out.push(std::mem::take(&mut current));
                }
            }
            Event::Text(t) if depth > 0 && rph_depth == 0 => current.push_str(&t.unescape()?),
            Event::CData(t) if depth > 0 && rph_depth == 0 => {
                current.push_str(&String::from_utf8_lossy(&t.into_inner()))
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Patches every `<t>` text value in `sst` with the literal text read
/// straight from `xml`, restoring whitespace the deserializer trimmed. A
/// no-op if `xml` fails to re-parse (it already parsed once to produce
/// `sst`, so this should never actually happen).
pub fn restore_whitespace(sst: &mut Sst, xml: &str) {
    let Ok(raw) = raw_t_texts(xml) else { return };
    let mut raw = raw.into_iter();
    for item in &mut sst.items {
        if let Some(t) = &mut item.t {
            if let Some(text) = raw.next() {
                t.value = text;
            }
        }
        for r in &mut item.r {
            if let Some(text) = raw.next() {
                r.t.value = text;
            }
        }
    }
}
