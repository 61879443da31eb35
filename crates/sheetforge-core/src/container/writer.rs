//! Writes a [`crate::workbook::Workbook`] out as an `.xlsx` ZIP package.
//!
//! Three strategies, cheapest first:
//!
//! - **Verbatim**: nothing changed since the workbook was read back
//!   ([`crate::container::source::ModificationTracker::is_clean`]) — the
//!   original bytes are returned untouched.
//! - **Surgical**: a source container exists and no sheet was added,
//!   removed, or renamed — every untouched ZIP entry is copied byte-for-byte
//!   from the source, and only dirty worksheet/styles/sharedStrings parts
//!   are re-encoded.
//! - **Full regeneration**: no source, or the sheet set itself changed —
//!   every part is built fresh from the in-memory model.

use std::io::{Cursor, Read as ZipRead, Seek, Write as _};
use std::path::Path;

use sheetforge_xml::content_types::{mime_types, ContentTypeOverride, ContentTypes};
use sheetforge_xml::namespaces;
use sheetforge_xml::relationships::{rel_types, Relationship, Relationships};
use sheetforge_xml::workbook::{BookViews, SheetEntry, Sheets, WorkbookView, WorkbookXml};

use crate::codec::{sst_codec, styles_codec, worksheet_codec};
use crate::config::{Compression, WriterConfig};
use crate::error::Result;
use crate::sst::SharedStringTable;
use crate::workbook::Workbook;

use super::reader::{locate_parts, read_part_bytes, PartLayout};
use super::source::SourceContext;
use crate::workbook_paths;

pub fn write_path(
    workbook: &Workbook,
    path: impl AsRef<Path>,
    source: Option<&SourceContext>,
    config: &WriterConfig,
) -> Result<()> {
    let bytes = write_bytes(workbook, source, config)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn write_bytes(workbook: &Workbook, source: Option<&SourceContext>, config: &WriterConfig) -> Result<Vec<u8>> {
    if let Some(ctx) = source {
        if ctx.tracker().is_clean() {
            return Ok((**ctx.source_bytes()).clone());
        }
        if !ctx.tracker().has_structural_change() {
            return write_surgical(workbook, ctx, config);
        }
    }
    write_full(workbook, source, config)
}

/// Copies every ZIP entry from the source container verbatim except the
/// worksheet/styles/sharedStrings parts the tracker marked dirty, which are
/// re-encoded from the current workbook state.
fn write_surgical(workbook: &Workbook, source: &SourceContext, config: &WriterConfig) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(source.source_bytes().as_slice()))?;
    let layout = locate_parts(&mut archive)?;

    if source.tracker().tables_dirty() {
        // A style or string table edit ripples through every worksheet's
        // encoded `@s`/`@v` indices, so there's no way to cheaply patch
        // just the table part: fall back to a full rewrite. The source is
        // still passed through so opaque parts (charts, drawings, theme,
        // ...) get copied forward instead of silently dropped.
        return write_full(workbook, Some(source), config);
    }

    let any_dirty_sheet_needs_new_parts = workbook
        .sheets()
        .iter()
        .any(|sheet| source.tracker().is_sheet_dirty(sheet.name()) && sheet_needs_own_parts(sheet));
    if any_dirty_sheet_needs_new_parts {
        // A dirty sheet that now carries a comment or an external hyperlink
        // needs brand-new ZIP parts (its own `.rels`, `xl/commentsN.xml`) a
        // surgical copy has no way to introduce: fall back to a full
        // rewrite, same as a table-wide change.
        return write_full(workbook, Some(source), config);
    }

    let mut sst = SharedStringTable::new();
    // Re-seed the table from the untouched parts so ids already referenced
    // by clean worksheets keep resolving to the same entries.
    if let Some(part) = &layout.shared_strings_part {
        let bytes = read_part_bytes(&mut archive, part)?;
        let text = String::from_utf8_lossy(&bytes);
        let mut xml: sheetforge_xml::shared_strings::Sst = quick_xml::de::from_str(&text)?;
        sheetforge_xml::shared_strings::restore_whitespace(&mut xml, &text);
        for entry in sst_codec::decode(&xml) {
            sst.intern(entry);
        }
    }

    let mut dirty_worksheets = Vec::new();
    for (name, part, _visible) in &layout.sheets {
        if source.tracker().is_sheet_dirty(name) {
            let sheet = workbook
                .sheet(name)
                .ok_or_else(|| crate::error::Error::SheetNotFound(name.clone()))?;
            let xml = worksheet_codec::encode(sheet, &mut sst, config).xml;
            let bytes = quick_xml::se::to_string(&xml)
                .map_err(|e| crate::error::Error::XmlWrite(e.to_string()))?
                .into_bytes();
            dirty_worksheets.push((part.clone(), with_xml_prolog(bytes)));
        }
    }

    let mut out = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut out));
        let options = zip_options(config);
        for i in 0..archive.len() {
            let name = archive.by_index_raw(i)?.name().to_string();
            if let Some((_, bytes)) = dirty_worksheets.iter().find(|(part, _)| part == &name) {
                zip.start_file(&name, options)?;
                zip.write_all(bytes)?;
            } else {
                let mut entry = archive.by_index(i)?;
                let mut buf = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut buf)?;
                zip.start_file(&name, options)?;
                zip.write_all(&buf)?;
            }
        }
        zip.finish()?;
    }
    Ok(out)
}

/// Whether `sheet` needs ZIP parts beyond its own worksheet XML: a
/// comment-bearing cell needs `xl/commentsN.xml`, and an external hyperlink
/// needs a `rId` relationship entry — both live in a worksheet-level
/// `.rels` part a surgical copy can't introduce.
fn sheet_needs_own_parts(sheet: &crate::sheet::Sheet) -> bool {
    sheet.cells().any(|(_, cell)| {
        cell.comment.is_some() || matches!(&cell.hyperlink, Some(h) if matches!(h.target, crate::cell::HyperlinkTarget::External(_)))
    })
}

/// Builds every part from scratch: the only strategy available for a
/// workbook with no source container, and the fallback whenever a
/// structural or table-wide change makes a surgical patch unsound.
///
/// When `source` is given, every part in its manifest that this function
/// doesn't itself regenerate (charts, drawings, theme, comments, and any
/// other part this core treats as opaque) is copied forward unchanged, along
/// with the content-type and relationship entries that describe them — a
/// full regeneration otherwise has no way to know those parts ever existed.
fn write_full(workbook: &Workbook, source: Option<&SourceContext>, config: &WriterConfig) -> Result<Vec<u8>> {
    let mut sst = SharedStringTable::new();
    let comments: Vec<Option<sheetforge_xml::comments::CommentsXml>> =
        workbook.sheets().iter().map(worksheet_codec::encode_comments).collect();
    let (mut worksheets, hyperlink_rels): (
        Vec<sheetforge_xml::worksheet::WorksheetXml>,
        Vec<Vec<(String, String)>>,
    ) = workbook
        .sheets()
        .iter()
        .map(|sheet| {
            let e = worksheet_codec::encode(sheet, &mut sst, config);
            (e.xml, e.hyperlink_rels)
        })
        .unzip();

    let use_sst = match config.sst_mode {
        crate::config::SstMode::AlwaysShared => true,
        crate::config::SstMode::AlwaysInline => false,
        crate::config::SstMode::Auto => sst.should_use_sst(),
    };
    let entries = sst.entries().to_vec();
    if !use_sst {
        for worksheet in &mut worksheets {
            worksheet_codec::inline_shared_strings(worksheet, &entries);
        }
    }

    let styles_xml = styles_codec::encode(workbook.styles());
    let sst_xml = use_sst.then(|| sst_codec::encode(&sst));

    let workbook_xml = build_workbook_xml(workbook);
    let mut workbook_rels = build_workbook_rels(workbook.sheets().len(), use_sst);
    let mut package_rels = build_package_rels();
    let mut content_types = build_content_types(workbook.sheets().len(), use_sst);

    let mut regenerated: std::collections::HashSet<String> = [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/styles.xml",
        "xl/sharedStrings.xml",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();
    for i in 0..worksheets.len() {
        regenerated.insert(format!("xl/worksheets/sheet{}.xml", i + 1));
    }

    // A worksheet with an external hyperlink or a comment needs its own
    // `.rels` part (comments are referenced from there, never from the
    // workbook-level rels) plus, for comments, a dedicated
    // `xl/commentsN.xml` part and content-type override.
    let mut worksheet_rels: Vec<Option<Relationships>> = vec![None; worksheets.len()];
    let mut comments_paths: Vec<Option<String>> = vec![None; worksheets.len()];
    for i in 0..worksheets.len() {
        let worksheet_part = format!("xl/worksheets/sheet{}.xml", i + 1);
        let mut rels = Vec::new();
        for (id, target) in &hyperlink_rels[i] {
            rels.push(Relationship {
                id: id.clone(),
                rel_type: rel_types::HYPERLINK.to_string(),
                target: target.clone(),
                target_mode: Some("External".to_string()),
            });
        }
        if comments[i].is_some() {
            let comments_part = format!("xl/comments{}.xml", i + 1);
            let target = workbook_paths::relative_relationship_target(&worksheet_part, &comments_part);
            rels.push(Relationship {
                id: format!("rId{}", rels.len() + 1),
                rel_type: rel_types::COMMENTS.to_string(),
                target,
                target_mode: None,
            });
            content_types.overrides.push(ContentTypeOverride {
                part_name: format!("/{comments_part}"),
                content_type: mime_types::COMMENTS.to_string(),
            });
            regenerated.insert(comments_part.clone());
            comments_paths[i] = Some(comments_part);
        }
        if !rels.is_empty() {
            regenerated.insert(workbook_paths::relationship_part_path(&worksheet_part));
            worksheet_rels[i] = Some(Relationships { xmlns: namespaces::PACKAGE_RELATIONSHIPS.to_string(), relationships: rels });
        }
    }

    let mut preserved_entries: Vec<(String, std::sync::Arc<Vec<u8>>)> = Vec::new();
    if let Some(ctx) = source {
        let mut archive = zip::ZipArchive::new(Cursor::new(ctx.source_bytes().as_slice())).ok();
        let old_layout = archive.as_mut().and_then(|a| locate_parts(a).ok());
        if let Some(layout) = &old_layout {
            regenerated.insert(layout.workbook_part.clone());
            regenerated.insert(workbook_paths::relationship_part_path(&layout.workbook_part));
            for (_, part, _) in &layout.sheets {
                regenerated.insert(part.clone());
            }
            if let Some(part) = &layout.styles_part {
                regenerated.insert(part.clone());
            }
            if let Some(part) = &layout.shared_strings_part {
                regenerated.insert(part.clone());
            }
        }

        merge_preserved_content_types(&mut content_types, ctx, &regenerated);
        merge_preserved_package_rels(&mut package_rels, ctx);
        merge_preserved_workbook_rels(&mut workbook_rels, ctx, &regenerated, old_layout.as_ref());

        for name in ctx.part_manifest() {
            if regenerated.contains(name) {
                continue;
            }
            if let Ok(bytes) = ctx.preserved_parts().get(name) {
                preserved_entries.push((name.clone(), bytes));
            }
        }
    }

    let mut out = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut out));
        let options = zip_options(config);

        write_xml_entry(&mut zip, options, "[Content_Types].xml", &content_types)?;
        write_xml_entry(&mut zip, options, "_rels/.rels", &package_rels)?;
        write_xml_entry(&mut zip, options, "xl/workbook.xml", &workbook_xml)?;
        write_xml_entry(&mut zip, options, "xl/_rels/workbook.xml.rels", &workbook_rels)?;
        write_xml_entry(&mut zip, options, "xl/styles.xml", &styles_xml)?;
        if let Some(sst_xml) = &sst_xml {
            write_xml_entry(&mut zip, options, "xl/sharedStrings.xml", sst_xml)?;
        }
        for (i, worksheet) in worksheets.iter().enumerate() {
            let path = format!("xl/worksheets/sheet{}.xml", i + 1);
            write_xml_entry(&mut zip, options, &path, worksheet)?;
            if let Some(rels) = &worksheet_rels[i] {
                let rels_path = workbook_paths::relationship_part_path(&path);
                write_xml_entry(&mut zip, options, &rels_path, rels)?;
            }
            if let (Some(comments), Some(path)) = (&comments[i], &comments_paths[i]) {
                write_xml_entry(&mut zip, options, path, comments)?;
            }
        }
        for (name, bytes) in &preserved_entries {
            zip.start_file(name, options)?;
            zip.write_all(bytes)?;
        }

        zip.finish()?;
    }
    Ok(out)
}

/// Reads and deserializes a part straight from `source`'s original archive,
/// independent of anything this function has since regenerated.
fn read_original_part<T: serde::de::DeserializeOwned>(source: &SourceContext, name: &str) -> Result<T> {
    let mut archive = zip::ZipArchive::new(Cursor::new(source.source_bytes().as_slice()))?;
    let bytes = read_part_bytes(&mut archive, name)?;
    Ok(quick_xml::de::from_str(&String::from_utf8_lossy(&bytes))?)
}

/// Folds the source container's `[Content_Types].xml` defaults/overrides for
/// every part outside `regenerated` into `content_types`, so parts preserved
/// from the source still declare the MIME type Excel expects for them.
fn merge_preserved_content_types(
    content_types: &mut ContentTypes,
    source: &SourceContext,
    regenerated: &std::collections::HashSet<String>,
) {
    let Ok(original) = read_original_part::<ContentTypes>(source, "[Content_Types].xml") else { return };

    let known_extensions: std::collections::HashSet<String> =
        content_types.defaults.iter().map(|d| d.extension.to_lowercase()).collect();
    for default in original.defaults {
        if known_extensions.iter().all(|ext| ext != &default.extension.to_lowercase()) {
            content_types.defaults.push(default);
        }
    }

    for over in original.overrides {
        let part = over.part_name.trim_start_matches('/');
        if !regenerated.contains(part) {
            content_types.overrides.push(over);
        }
    }
}

/// Folds every non-office-document relationship from the source's
/// `_rels/.rels` into `package_rels` (docProps, custom XML parts, ...).
fn merge_preserved_package_rels(package_rels: &mut Relationships, source: &SourceContext) {
    let Ok(original) = read_original_part::<Relationships>(source, "_rels/.rels") else { return };
    for rel in original.relationships {
        if rel.rel_type != rel_types::OFFICE_DOCUMENT {
            package_rels.relationships.push(rel);
        }
    }
}

/// Folds every workbook-level relationship that doesn't point at a part this
/// write already regenerates (worksheets, styles, sharedStrings) into
/// `workbook_rels` — themes, calc chains, external links, and the like.
fn merge_preserved_workbook_rels(
    workbook_rels: &mut Relationships,
    source: &SourceContext,
    regenerated: &std::collections::HashSet<String>,
    old_layout: Option<&PartLayout>,
) {
    let Some(old_layout) = old_layout else { return };
    let rels_path = workbook_paths::relationship_part_path(&old_layout.workbook_part);
    let Ok(original) = read_original_part::<Relationships>(source, &rels_path) else { return };

    let mut used_ids: std::collections::HashSet<String> =
        workbook_rels.relationships.iter().map(|r| r.id.clone()).collect();
    let mut next_id = used_ids.len() as u32 + 1;
    for rel in original.relationships {
        let already_rebuilt = rel.rel_type == rel_types::WORKSHEET
            || rel.rel_type == rel_types::STYLES
            || rel.rel_type == rel_types::SHARED_STRINGS;
        if already_rebuilt {
            continue;
        }
        let target = workbook_paths::resolve_relationship_target(&old_layout.workbook_part, &rel.target);
        if regenerated.contains(&target) {
            continue;
        }
        let id = if used_ids.contains(&rel.id) {
            let id = format!("rId{next_id}");
            next_id += 1;
            id
        } else {
            rel.id.clone()
        };
        used_ids.insert(id.clone());
        workbook_rels.relationships.push(Relationship { id, ..rel });
    }
}

fn write_xml_entry<W: std::io::Write + Seek, T: serde::Serialize>(
    zip: &mut zip::ZipWriter<W>,
    options: zip::write::SimpleFileOptions,
    name: &str,
    value: &T,
) -> Result<()> {
    let body = quick_xml::se::to_string(value).map_err(|e| crate::error::Error::XmlWrite(e.to_string()))?;
    zip.start_file(name, options)?;
    zip.write_all(&with_xml_prolog(body.into_bytes()))?;
    Ok(())
}

fn with_xml_prolog(mut body: Vec<u8>) -> Vec<u8> {
    const PROLOG: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
    let mut out = Vec::with_capacity(PROLOG.len() + body.len());
    out.extend_from_slice(PROLOG);
    out.append(&mut body);
    out
}

fn zip_options(config: &WriterConfig) -> zip::write::SimpleFileOptions {
    let method = match config.compression {
        Compression::Deflate => zip::CompressionMethod::Deflated,
        Compression::Stored => zip::CompressionMethod::Stored,
    };
    zip::write::SimpleFileOptions::default().compression_method(method)
}

fn build_workbook_xml(workbook: &Workbook) -> WorkbookXml {
    let sheets = workbook
        .sheets()
        .iter()
        .enumerate()
        .map(|(i, sheet)| SheetEntry {
            name: sheet.name().to_string(),
            sheet_id: i as u32 + 1,
            state: (!sheet.is_visible()).then(|| "hidden".to_string()),
            r_id: format!("rId{}", i + 1),
        })
        .collect();

    WorkbookXml {
        xmlns: namespaces::SPREADSHEET_ML.to_string(),
        xmlns_r: namespaces::RELATIONSHIPS.to_string(),
        file_version: None,
        workbook_pr: None,
        book_views: Some(BookViews {
            workbook_views: vec![WorkbookView {
                x_window: None,
                y_window: None,
                window_width: None,
                window_height: None,
                active_tab: (workbook.active_tab() != 0).then_some(workbook.active_tab()),
            }],
        }),
        sheets: Sheets { sheets },
        defined_names: None,
        calc_pr: None,
    }
}

/// Workbook-level relationships: one `WORKSHEET` entry per sheet (in sheet
/// order, matching `build_workbook_xml`'s `rId{i+1}` assignment), followed
/// by styles and, if used, sharedStrings.
fn build_workbook_rels(sheet_count: usize, use_sst: bool) -> Relationships {
    let mut relationships: Vec<Relationship> = (0..sheet_count)
        .map(|i| Relationship {
            id: format!("rId{}", i + 1),
            rel_type: rel_types::WORKSHEET.to_string(),
            target: format!("worksheets/sheet{}.xml", i + 1),
            target_mode: None,
        })
        .collect();

    relationships.push(Relationship {
        id: format!("rId{}", sheet_count + 1),
        rel_type: rel_types::STYLES.to_string(),
        target: "styles.xml".to_string(),
        target_mode: None,
    });

    if use_sst {
        relationships.push(Relationship {
            id: format!("rId{}", sheet_count + 2),
            rel_type: rel_types::SHARED_STRINGS.to_string(),
            target: "sharedStrings.xml".to_string(),
            target_mode: None,
        });
    }

    Relationships { xmlns: namespaces::PACKAGE_RELATIONSHIPS.to_string(), relationships }
}

/// Package-level relationships: the office-document relationship only.
/// docProps (core/extended properties) are outside this library's scope, so
/// unlike `sheetforge_xml::relationships::package_rels`'s template this
/// never points at parts that don't exist in the output.
fn build_package_rels() -> Relationships {
    Relationships {
        xmlns: namespaces::PACKAGE_RELATIONSHIPS.to_string(),
        relationships: vec![Relationship {
            id: "rId1".to_string(),
            rel_type: rel_types::OFFICE_DOCUMENT.to_string(),
            target: "xl/workbook.xml".to_string(),
            target_mode: None,
        }],
    }
}

fn build_content_types(sheet_count: usize, use_sst: bool) -> ContentTypes {
    let mut overrides = vec![
        ContentTypeOverride { part_name: "/xl/workbook.xml".to_string(), content_type: mime_types::WORKBOOK.to_string() },
        ContentTypeOverride { part_name: "/xl/styles.xml".to_string(), content_type: mime_types::STYLES.to_string() },
    ];
    for i in 0..sheet_count {
        overrides.push(ContentTypeOverride {
            part_name: format!("/xl/worksheets/sheet{}.xml", i + 1),
            content_type: mime_types::WORKSHEET.to_string(),
        });
    }
    if use_sst {
        overrides.push(ContentTypeOverride {
            part_name: "/xl/sharedStrings.xml".to_string(),
            content_type: mime_types::SHARED_STRINGS.to_string(),
        });
    }

    ContentTypes {
        xmlns: namespaces::CONTENT_TYPES.to_string(),
        defaults: vec![
            sheetforge_xml::content_types::ContentTypeDefault {
                extension: "rels".to_string(),
                content_type: mime_types::RELS.to_string(),
            },
            sheetforge_xml::content_types::ContentTypeDefault {
                extension: "xml".to_string(),
                content_type: mime_types::XML.to_string(),
            },
        ],
        overrides,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::addr::ARef;
    use crate::value::CellValue;

    #[test]
    fn writing_a_default_workbook_produces_a_valid_zip_with_expected_parts() {
        let wb = Workbook::new();
        let bytes = write_bytes(&wb, None, &WriterConfig::default()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: HashSet<String> = (0..archive.len())
            .map(|i| archive.by_index_raw(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains("[Content_Types].xml"));
        assert!(names.contains("_rels/.rels"));
        assert!(names.contains("xl/workbook.xml"));
        assert!(names.contains("xl/_rels/workbook.xml.rels"));
        assert!(names.contains("xl/styles.xml"));
        assert!(names.contains("xl/worksheets/sheet1.xml"));
    }

    #[test]
    fn a_clean_source_context_is_written_back_verbatim() {
        let wb = Workbook::new();
        let original = write_bytes(&wb, None, &WriterConfig::default()).unwrap();
        let source = SourceContext::new(std::sync::Arc::new(original.clone()), vec![]);
        let rewritten = write_bytes(&wb, Some(&source), &WriterConfig::default()).unwrap();
        assert_eq!(original, rewritten);
    }

    #[test]
    fn a_structural_change_forces_full_regeneration_with_the_new_sheet_present() {
        let wb = Workbook::new();
        let original = write_bytes(&wb, None, &WriterConfig::default()).unwrap();
        let mut source = SourceContext::new(std::sync::Arc::new(original), vec![]);
        source.tracker_mut().mark_structural_change();
        let wb2 = wb.add_sheet("Sheet2").unwrap();
        let bytes = write_bytes(&wb2, Some(&source), &WriterConfig::default()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("xl/worksheets/sheet2.xml").is_ok());
    }

    /// Adds an opaque `xl/charts/chart1.xml` part (plus the content-type
    /// override and workbook-level relationship that reference it) to a
    /// freshly written default workbook, so tests can exercise what happens
    /// to a part this core never interprets.
    fn add_fake_chart_part(original: Vec<u8>) -> Vec<u8> {
        let mut archive = zip::ZipArchive::new(Cursor::new(original)).unwrap();
        let mut out = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut out));
            let options = zip::write::SimpleFileOptions::default();
            for i in 0..archive.len() {
                let name = archive.by_index_raw(i).unwrap().name().to_string();
                let mut entry = archive.by_index(i).unwrap();
                let mut buf = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut buf).unwrap();
                if name == "[Content_Types].xml" {
                    let text = String::from_utf8(buf).unwrap();
                    let patched = text.replace(
                        "</Types>",
                        "<Override PartName=\"/xl/charts/chart1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.drawingml.chart+xml\"/></Types>",
                    );
                    zip.start_file(&name, options).unwrap();
                    zip.write_all(patched.as_bytes()).unwrap();
                } else if name == "xl/_rels/workbook.xml.rels" {
                    let text = String::from_utf8(buf).unwrap();
                    let patched = text.replace(
                        "</Relationships>",
                        "<Relationship Id=\"rIdChart1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart\" Target=\"charts/chart1.xml\"/></Relationships>",
                    );
                    zip.start_file(&name, options).unwrap();
                    zip.write_all(patched.as_bytes()).unwrap();
                } else {
                    zip.start_file(&name, options).unwrap();
                    zip.write_all(&buf).unwrap();
                }
            }
            zip.start_file("xl/charts/chart1.xml", options).unwrap();
            zip.write_all(b"<chartSpace/>").unwrap();
            zip.finish().unwrap();
        }
        out
    }

    #[test]
    fn a_full_regeneration_carries_opaque_preserved_parts_forward() {
        let wb = Workbook::new();
        let original = write_bytes(&wb, None, &WriterConfig::default()).unwrap();
        let with_chart = add_fake_chart_part(original);

        let part_manifest: Vec<String> = {
            let mut archive = zip::ZipArchive::new(Cursor::new(with_chart.clone())).unwrap();
            (0..archive.len())
                .map(|i| archive.by_index_raw(i).unwrap().name().to_string())
                .collect()
        };
        let mut source = SourceContext::new(std::sync::Arc::new(with_chart), part_manifest);
        source.tracker_mut().mark_structural_change();

        let wb2 = wb.add_sheet("Sheet2").unwrap();
        let bytes = write_bytes(&wb2, Some(&source), &WriterConfig::default()).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let chart_bytes = read_part_bytes(&mut archive, "xl/charts/chart1.xml").unwrap();
        assert_eq!(chart_bytes, b"<chartSpace/>");

        let content_types = read_part_bytes(&mut archive, "[Content_Types].xml").unwrap();
        let content_types = String::from_utf8(content_types).unwrap();
        assert!(content_types.contains("/xl/charts/chart1.xml"));

        let workbook_rels = read_part_bytes(&mut archive, "xl/_rels/workbook.xml.rels").unwrap();
        let workbook_rels = String::from_utf8(workbook_rels).unwrap();
        assert!(workbook_rels.contains("charts/chart1.xml"));
    }

    #[test]
    fn a_surgical_write_reuses_untouched_parts_and_rewrites_only_the_dirty_sheet() {
        let wb = Workbook::new()
            .add_sheet("Sheet2")
            .unwrap()
            .put_cell("Sheet1", ARef::parse("A1").unwrap(), CellValue::text("v1").into())
            .unwrap();
        let original = write_bytes(&wb, None, &WriterConfig::default()).unwrap();
        let mut source = SourceContext::new(std::sync::Arc::new(original), vec![]);
        source.tracker_mut().mark_sheet_dirty("Sheet1");

        let wb2 = wb.put_cell("Sheet1", ARef::parse("A1").unwrap(), CellValue::text("v2").into()).unwrap();
        let bytes = write_bytes(&wb2, Some(&source), &WriterConfig::default()).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
        let layout = locate_parts(&mut archive).unwrap();
        let (_, sheet2_part, _) = layout.sheets.iter().find(|(n, _, _)| n == "Sheet2").unwrap();
        let sheet2_bytes = read_part_bytes(&mut archive, sheet2_part).unwrap();
        assert!(!sheet2_bytes.is_empty());

        let (read_back, _) =
            super::super::reader::read_bytes(bytes, &crate::config::ReaderLimits::default()).unwrap();
        assert_eq!(
            read_back.sheet("Sheet1").unwrap().cell(ARef::parse("A1").unwrap()).unwrap().value,
            CellValue::text("v2")
        );
    }

    #[test]
    fn a_full_write_emits_a_worksheet_rels_and_comments_part_for_a_commented_cell() {
        use crate::cell::{Cell, Comment};

        let wb = Workbook::new()
            .put_cell(
                "Sheet1",
                ARef::parse("B2").unwrap(),
                Cell::new(CellValue::text("flagged")).with_comment(Comment::new("Jane Doe", "Needs review")),
            )
            .unwrap();
        let bytes = write_bytes(&wb, None, &WriterConfig::default()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        let comments_bytes = read_part_bytes(&mut archive, "xl/comments1.xml").unwrap();
        let comments_xml = String::from_utf8(comments_bytes).unwrap();
        assert!(comments_xml.contains("Jane Doe"));
        assert!(comments_xml.contains("Needs review"));

        let rels_bytes = read_part_bytes(&mut archive, "xl/worksheets/_rels/sheet1.xml.rels").unwrap();
        let rels_xml = String::from_utf8(rels_bytes).unwrap();
        assert!(rels_xml.contains("comments1.xml"));

        let content_types = read_part_bytes(&mut archive, "[Content_Types].xml").unwrap();
        let content_types = String::from_utf8(content_types).unwrap();
        assert!(content_types.contains("/xl/comments1.xml"));
    }

    #[test]
    fn a_dirty_sheet_gaining_a_comment_forces_a_full_rewrite_instead_of_a_surgical_one() {
        use crate::cell::{Cell, Comment};

        let wb = Workbook::new();
        let original = write_bytes(&wb, None, &WriterConfig::default()).unwrap();
        let mut source = SourceContext::new(std::sync::Arc::new(original), vec![]);
        source.tracker_mut().mark_sheet_dirty("Sheet1");

        let wb2 = wb
            .put_cell(
                "Sheet1",
                ARef::parse("A1").unwrap(),
                Cell::new(CellValue::text("x")).with_comment(Comment::new("Author", "note")),
            )
            .unwrap();
        let bytes = write_bytes(&wb2, Some(&source), &WriterConfig::default()).unwrap();

        let (read_back, _) =
            super::super::reader::read_bytes(bytes, &crate::config::ReaderLimits::default()).unwrap();
        let comment = read_back.sheet("Sheet1").unwrap().cell(ARef::parse("A1").unwrap()).unwrap().comment.as_ref();
        assert_eq!(comment.map(|c| c.text.as_str()), Some("note"));
    }
}
