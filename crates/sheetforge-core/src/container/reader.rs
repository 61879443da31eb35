//! Reads an `.xlsx` ZIP package into a [`crate::workbook::Workbook`].
//!
//! Every part is located by walking the relationship graph — `_rels/.rels`
//! to the workbook part, then `xl/_rels/workbook.xml.rels` to each
//! worksheet/styles/sharedStrings part — never by assuming a filename or
//! ZIP entry order. A worksheet is *only* identified by the `r:id` its
//! `<sheet>` entry in `xl/workbook.xml` carries.

use std::collections::HashMap;
use std::io::{Cursor, Read as ZipRead, Seek};
use std::path::Path;
use std::sync::Arc;

use sheetforge_xml::comments::CommentsXml;
use sheetforge_xml::relationships::{rel_types, Relationships};
use sheetforge_xml::shared_strings::Sst;
use sheetforge_xml::styles::StyleSheet;
use sheetforge_xml::workbook::WorkbookXml;
use sheetforge_xml::worksheet::WorksheetXml;

use crate::codec::{sst_codec, styles_codec, worksheet_codec};
use crate::config::ReaderLimits;
use crate::error::{Error, Result};
use crate::sst::SharedString;
use crate::style_registry::StyleRegistry;
use crate::workbook::Workbook;
use crate::workbook_paths;

use super::security::{reject_doctype, validate_archive};
use super::source::SourceContext;

/// The resolved part layout of a container: where the workbook, each
/// worksheet, the styles part, and the shared-string table actually live.
/// Built once by walking relationships, then reused by both the reader and
/// the surgical writer so the two never disagree about part identity.
#[derive(Debug, Clone)]
pub(crate) struct PartLayout {
    pub workbook_part: String,
    /// `(sheet name, worksheet part path, visible)`, in workbook order.
    pub sheets: Vec<(String, String, bool)>,
    pub styles_part: Option<String>,
    pub shared_strings_part: Option<String>,
    pub active_tab: u32,
}

pub fn open(path: impl AsRef<Path>, limits: &ReaderLimits) -> Result<(Workbook, SourceContext)> {
    let bytes = std::fs::read(path)?;
    read_bytes(bytes, limits)
}

pub fn read_bytes(bytes: Vec<u8>, limits: &ReaderLimits) -> Result<(Workbook, SourceContext)> {
    let bytes = Arc::new(bytes);
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice()))?;
    validate_archive(&mut archive, limits)?;

    let part_manifest: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index_raw(i).map(|e| e.name().to_string()))
        .collect::<std::result::Result<_, _>>()?;

    let layout = locate_parts(&mut archive)?;

    let (registry, style_mapping) = match &layout.styles_part {
        Some(part) => {
            let xml: StyleSheet = read_xml_part(&mut archive, part)?;
            styles_codec::decode(&xml)?
        }
        None => (StyleRegistry::new(), Vec::new()),
    };

    let shared_strings: Vec<SharedString> = match &layout.shared_strings_part {
        Some(part) => {
            let xml = read_sst_part(&mut archive, part)?;
            sst_codec::decode(&xml)
        }
        None => Vec::new(),
    };

    let mut sheets = Vec::with_capacity(layout.sheets.len());
    for (name, part, visible) in &layout.sheets {
        let xml = read_worksheet_part(&mut archive, part)?;
        let (hyperlink_targets, comments_part) = resolve_worksheet_rels(&mut archive, part)?;
        let comments = match &comments_part {
            Some(p) => Some(read_comments_part(&mut archive, p)?),
            None => None,
        };
        let mut sheet =
            worksheet_codec::decode(name, &xml, &style_mapping, &shared_strings, &hyperlink_targets, comments.as_ref())?;
        if !visible {
            sheet.set_visible(false);
        }
        sheets.push(sheet);
    }

    let workbook = Workbook::from_parts(sheets, registry, layout.active_tab);
    let source = SourceContext::new(bytes, part_manifest);
    Ok((workbook, source))
}

/// Walks `_rels/.rels` -> `xl/workbook.xml` -> `xl/_rels/workbook.xml.rels`
/// to resolve every part this library understands the location of.
pub(crate) fn locate_parts<R: ZipRead + Seek>(archive: &mut zip::ZipArchive<R>) -> Result<PartLayout> {
    let package_rels: Relationships = read_xml_part(archive, "_rels/.rels")?;
    let office_doc = package_rels
        .relationships
        .iter()
        .find(|r| r.rel_type == rel_types::OFFICE_DOCUMENT)
        .ok_or_else(|| {
            Error::MalformedRelationships("package is missing the office document relationship".to_string())
        })?;
    let workbook_part = workbook_paths::resolve_relationship_target("", &office_doc.target);

    let workbook_xml: WorkbookXml = read_xml_part(archive, &workbook_part)?;

    let workbook_rels_path = workbook_paths::relationship_part_path(&workbook_part);
    let workbook_rels: Relationships = read_xml_part(archive, &workbook_rels_path)?;

    let targets: HashMap<&str, String> = workbook_rels
        .relationships
        .iter()
        .map(|r| (r.id.as_str(), workbook_paths::resolve_relationship_target(&workbook_part, &r.target)))
        .collect();

    let mut sheets = Vec::with_capacity(workbook_xml.sheets.sheets.len());
    for entry in &workbook_xml.sheets.sheets {
        let part = targets.get(entry.r_id.as_str()).ok_or_else(|| {
            Error::MalformedRelationships(format!(
                "sheet {:?} references unknown r:id {:?}",
                entry.name, entry.r_id
            ))
        })?;
        let visible = !matches!(entry.state.as_deref(), Some("hidden") | Some("veryHidden"));
        sheets.push((entry.name.clone(), part.clone(), visible));
    }

    let styles_part = workbook_rels
        .relationships
        .iter()
        .find(|r| r.rel_type == rel_types::STYLES)
        .map(|r| workbook_paths::resolve_relationship_target(&workbook_part, &r.target));

    let shared_strings_part = workbook_rels
        .relationships
        .iter()
        .find(|r| r.rel_type == rel_types::SHARED_STRINGS)
        .map(|r| workbook_paths::resolve_relationship_target(&workbook_part, &r.target));

    let active_tab = workbook_xml
        .book_views
        .as_ref()
        .and_then(|v| v.workbook_views.first())
        .and_then(|v| v.active_tab)
        .unwrap_or(0);

    Ok(PartLayout { workbook_part, sheets, styles_part, shared_strings_part, active_tab })
}

/// Reads a worksheet's own `.rels` part, if it has one, and pulls out
/// everything [`worksheet_codec::decode`] needs from it: a map of external
/// hyperlink `r:id` to target URL, and the resolved path of the sheet's
/// `xl/comments{N}.xml` part (comments are referenced from the worksheet's
/// own rels, never the workbook-level ones).
fn resolve_worksheet_rels<R: ZipRead + Seek>(
    archive: &mut zip::ZipArchive<R>,
    worksheet_part: &str,
) -> Result<(HashMap<String, String>, Option<String>)> {
    let rels_path = workbook_paths::relationship_part_path(worksheet_part);
    let rels: Relationships = match read_xml_part(archive, &rels_path) {
        Ok(rels) => rels,
        Err(Error::PartNotFound(_)) => return Ok((HashMap::new(), None)),
        Err(e) => return Err(e),
    };

    let mut hyperlink_targets = HashMap::new();
    let mut comments_part = None;
    for r in &rels.relationships {
        if r.rel_type == rel_types::HYPERLINK {
            hyperlink_targets.insert(r.id.clone(), r.target.clone());
        } else if r.rel_type == rel_types::COMMENTS {
            comments_part = Some(workbook_paths::resolve_relationship_target(worksheet_part, &r.target));
        }
    }
    Ok((hyperlink_targets, comments_part))
}

/// Reads a part's raw bytes, rejecting it outright if it carries a
/// `<!DOCTYPE` declaration before the bytes ever reach `quick_xml`.
pub(crate) fn read_part_bytes<R: ZipRead + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name).map_err(|_| Error::PartNotFound(name.to_string()))?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    reject_doctype(&buf)?;
    Ok(buf)
}

fn read_xml_part<T: serde::de::DeserializeOwned, R: ZipRead + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<T> {
    let bytes = read_part_bytes(archive, name)?;
    Ok(quick_xml::de::from_str(&String::from_utf8_lossy(&bytes))?)
}

/// Like [`read_xml_part`], but additionally restores the leading/trailing
/// whitespace `quick_xml::de::from_str`'s `StartTrimmer` strips from `<t>`
/// text, even under `xml:space="preserve"`.
fn read_sst_part<R: ZipRead + Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> Result<Sst> {
    let bytes = read_part_bytes(archive, name)?;
    let text = String::from_utf8_lossy(&bytes);
    let mut sst: Sst = quick_xml::de::from_str(&text)?;
    sheetforge_xml::shared_strings::restore_whitespace(&mut sst, &text);
    Ok(sst)
}

/// Like [`read_xml_part`], but additionally restores the leading/trailing
/// whitespace `quick_xml::de::from_str`'s `StartTrimmer` strips from inline
/// string `<t>` text, even under `xml:space="preserve"`.
fn read_worksheet_part<R: ZipRead + Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> Result<WorksheetXml> {
    let bytes = read_part_bytes(archive, name)?;
    let text = String::from_utf8_lossy(&bytes);
    let mut worksheet: WorksheetXml = quick_xml::de::from_str(&text)?;
    sheetforge_xml::worksheet::restore_whitespace(&mut worksheet, &text);
    Ok(worksheet)
}

/// Like [`read_xml_part`], but additionally restores the leading/trailing
/// whitespace `quick_xml::de::from_str`'s `StartTrimmer` strips from comment
/// `<t>` text, even under `xml:space="preserve"`.
fn read_comments_part<R: ZipRead + Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> Result<CommentsXml> {
    let bytes = read_part_bytes(archive, name)?;
    let text = String::from_utf8_lossy(&bytes);
    let mut comments: CommentsXml = quick_xml::de::from_str(&text)?;
    sheetforge_xml::comments::restore_whitespace(&mut comments, &text);
    Ok(comments)
}
