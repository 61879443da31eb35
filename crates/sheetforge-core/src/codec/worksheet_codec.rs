//! `xl/worksheets/sheet*.xml` <-> [`Sheet`] conversion (whole-sheet,
//! in-memory). See [`crate::codec::worksheet_stream`] for the row-at-a-time
//! variant used on large sheets.

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::str::FromStr;

use sheetforge_xml::comments as xml_comments;
use sheetforge_xml::worksheet::{self as xml, cell_types};

use crate::addr::{ARef, CellRange, Column, Row};
use crate::cell::{Cell, Comment, Hyperlink, HyperlinkTarget};
use crate::config::{apply_formula_guard, WriterConfig};
use crate::error::{Error, Result};
use crate::sheet::Sheet;
use crate::sst::{SharedString, SharedStringTable};
use crate::style_registry::StyleId;
use crate::value::{CellError, CellValue, TextRun};

/// Fallback written to `sheetFormatPr/@defaultRowHeight` when a sheet has an
/// explicit default column width but no explicit default row height: the
/// attribute is mandatory in the schema even though only one default may be
/// set in practice.
const DEFAULT_ROW_HEIGHT: f64 = 15.0;

/// The result of encoding one worksheet: the part XML itself, plus any
/// external-hyperlink relationships (`rId -> target URL`) that must be
/// written to that worksheet's own `_rels/sheet{N}.xml.rels` part. Internal
/// (same-workbook) hyperlinks carry their target in `@location` directly and
/// need no relationship entry.
pub struct EncodedWorksheet {
    pub xml: xml::WorksheetXml,
    pub hyperlink_rels: Vec<(String, String)>,
}

/// Encodes `sheet` to worksheet XML. Every string-typed cell is interned
/// into `sst`; the caller decides afterward (via [`crate::sst::should_use_sst`])
/// whether to keep those as shared-string references or rewrite them inline.
pub fn encode(sheet: &Sheet, sst: &mut SharedStringTable, config: &WriterConfig) -> EncodedWorksheet {
    let rows = encode_rows(sheet, sst, config);
    let merge_cells = encode_merges(sheet);
    let cols = encode_cols(sheet);
    let (hyperlinks, hyperlink_rels) = encode_hyperlinks(sheet);

    let xml = xml::WorksheetXml {
        xmlns: sheetforge_xml::namespaces::SPREADSHEET_ML.to_string(),
        xmlns_r: sheetforge_xml::namespaces::RELATIONSHIPS.to_string(),
        dimension: sheet.dimension().map(|d| xml::Dimension { reference: d.to_string() }),
        sheet_views: None,
        sheet_format_pr: (sheet.default_row_height().is_some() || sheet.default_col_width().is_some())
            .then(|| xml::SheetFormatPr {
                default_row_height: sheet.default_row_height().unwrap_or(DEFAULT_ROW_HEIGHT),
                default_col_width: sheet.default_col_width(),
            }),
        cols,
        sheet_data: xml::SheetData { rows },
        merge_cells,
        hyperlinks,
        page_margins: None,
        page_setup: None,
        drawing: None,
        table_parts: None,
    };
    EncodedWorksheet { xml, hyperlink_rels }
}

/// Builds the `<hyperlinks>` element from every cell carrying a
/// [`Hyperlink`]. An external target mints a fresh `rId`, scoped to this
/// worksheet's own relationships part, and is returned alongside for the
/// caller to persist; a same-workbook location needs no relationship.
fn encode_hyperlinks(sheet: &Sheet) -> (Option<xml::Hyperlinks>, Vec<(String, String)>) {
    let mut hyperlinks = Vec::new();
    let mut rels = Vec::new();
    for (a, cell) in sheet.cells() {
        let Some(hl) = &cell.hyperlink else { continue };
        let (r_id, location) = match &hl.target {
            HyperlinkTarget::External(url) => {
                let id = format!("rId{}", rels.len() + 1);
                rels.push((id.clone(), url.clone()));
                (Some(id), None)
            }
            HyperlinkTarget::Location(loc) => (None, Some(loc.clone())),
        };
        hyperlinks.push(xml::Hyperlink {
            reference: a.to_a1(),
            r_id,
            location,
            display: None,
            tooltip: hl.tooltip.clone(),
        });
    }
    let container = (!hyperlinks.is_empty()).then(|| xml::Hyperlinks { hyperlinks });
    (container, rels)
}

/// Builds this sheet's `xl/comments{N}.xml` content from every cell carrying
/// a [`Comment`], or `None` if the sheet has no comments at all.
pub fn encode_comments(sheet: &Sheet) -> Option<xml_comments::CommentsXml> {
    let mut authors: Vec<String> = Vec::new();
    let mut comments = Vec::new();
    for (a, cell) in sheet.cells() {
        let Some(c) = &cell.comment else { continue };
        let author_id = match authors.iter().position(|existing| existing == &c.author) {
            Some(id) => id,
            None => {
                authors.push(c.author.clone());
                authors.len() - 1
            }
        };
        comments.push(xml_comments::Comment {
            reference: a.to_a1(),
            author_id: author_id as u32,
            text: xml_comments::CommentText {
                t: Some(sheetforge_xml::shared_strings::T {
                    xml_space: crate::codec::xml_space_preserve(&c.text),
                    value: c.text.clone(),
                }),
                r: Vec::new(),
            },
        });
    }
    (!comments.is_empty()).then(|| xml_comments::CommentsXml {
        xmlns: sheetforge_xml::namespaces::SPREADSHEET_ML.to_string(),
        authors: xml_comments::Authors { authors },
        comment_list: xml_comments::CommentList { comments },
    })
}

/// Rewrites every shared-string-typed cell in `worksheet` to inline string
/// encoding, in place. Used when the scan pass decided the SST threshold
/// wasn't met after all cells across the workbook were counted.
pub fn inline_shared_strings(worksheet: &mut xml::WorksheetXml, sst: &[SharedString]) {
    for row in &mut worksheet.sheet_data.rows {
        for cell in &mut row.cells {
            if cell.t.as_deref() == Some(cell_types::SHARED_STRING) {
                if let Some(idx) = cell.v.take().and_then(|v| v.parse::<usize>().ok()) {
                    if let Some(s) = sst.get(idx) {
                        cell.t = Some(cell_types::INLINE_STRING.to_string());
                        cell.is = Some(encode_inline(s));
                    }
                }
            }
        }
    }
}

fn encode_rows(sheet: &Sheet, sst: &mut SharedStringTable, config: &WriterConfig) -> Vec<xml::Row> {
    let mut by_row: std::collections::BTreeMap<u32, Vec<(ARef, xml::Cell)>> =
        std::collections::BTreeMap::new();
    for (a, cell) in sheet.cells() {
        by_row.entry(a.row().get()).or_default().push((a, encode_cell(a, cell, sst, config)));
    }
    by_row
        .into_iter()
        .map(|(r, entries)| {
            let props = sheet.row_properties(r);
            let min_col = entries.iter().map(|(a, _)| a.col().get()).min();
            let max_col = entries.iter().map(|(a, _)| a.col().get()).max();
            let spans = min_col.zip(max_col).map(|(lo, hi)| format!("{lo}:{hi}"));
            xml::Row {
                r,
                spans,
                s: None,
                custom_format: None,
                ht: props.height,
                hidden: props.hidden.then_some(true),
                custom_height: props.height.map(|_| true),
                outline_level: (props.outline_level != 0).then_some(props.outline_level),
                collapsed: props.collapsed.then_some(true),
                cells: entries.into_iter().map(|(_, c)| c).collect(),
            }
        })
        .collect()
}

fn encode_cell(a: ARef, cell: &Cell, sst: &mut SharedStringTable, config: &WriterConfig) -> xml::Cell {
    let s = cell.style.map(|id| id.0);
    let (t, v, is, f) = encode_value(&cell.value, sst, config);
    xml::Cell { r: a.to_a1(), s, t, v, f, is }
}

fn encode_value(
    value: &CellValue,
    sst: &mut SharedStringTable,
    config: &WriterConfig,
) -> (Option<String>, Option<String>, Option<xml::InlineString>, Option<xml::CellFormula>) {
    match value {
        CellValue::Empty => (None, None, None, None),
        CellValue::Text(text) => {
            let text = if config.strict_formula_guard { apply_formula_guard(text) } else { text.clone() };
            let id = sst.intern(SharedString::Plain(text));
            (Some(cell_types::SHARED_STRING.to_string()), Some(id.0.to_string()), None, None)
        }
        CellValue::RichText(runs) => {
            let id = sst.intern(SharedString::Rich(runs.clone()));
            (Some(cell_types::SHARED_STRING.to_string()), Some(id.0.to_string()), None, None)
        }
        CellValue::Number { value, original_text } => {
            let text = original_text.clone().unwrap_or_else(|| value.to_string());
            (None, Some(text), None, None)
        }
        CellValue::Bool(b) => {
            (Some(cell_types::BOOLEAN.to_string()), Some(if *b { "1" } else { "0" }.to_string()), None, None)
        }
        CellValue::DateTime(dt) => {
            let serial = crate::datetime::to_excel_serial(*dt);
            (None, Some(serial.to_string()), None, None)
        }
        CellValue::Error(e) => {
            (Some(cell_types::ERROR.to_string()), Some(e.as_str().to_string()), None, None)
        }
        CellValue::Formula { formula, cached } => {
            // A cached Text/RichText result is the literal formula output,
            // not shared-string content: interning it into the SST would
            // leave `v` holding an SST index under `t="str"`, which readers
            // interpret as the literal value itself.
            let (t, v, is) = match cached.as_deref() {
                Some(cv @ (CellValue::Text(_) | CellValue::RichText(_))) => {
                    (Some(cell_types::FORMULA_STRING.to_string()), cv.plain_text(), None)
                }
                Some(cv) => {
                    let (t, v, is, _) = encode_value(cv, sst, config);
                    (t, v, is)
                }
                None => (None, None, None),
            };
            (t, v, is, Some(xml::CellFormula { t: None, reference: None, si: None, value: Some(formula.clone()) }))
        }
    }
}

fn encode_inline(s: &SharedString) -> xml::InlineString {
    match s {
        SharedString::Plain(text) => xml::InlineString {
            t: Some(sheetforge_xml::shared_strings::T {
                xml_space: crate::codec::xml_space_preserve(text),
                value: text.clone(),
            }),
            r: Vec::new(),
        },
        SharedString::Rich(runs) => xml::InlineString {
            t: None,
            r: runs
                .iter()
                .map(|r| sheetforge_xml::shared_strings::R {
                    r_pr: None,
                    t: sheetforge_xml::shared_strings::T {
                        xml_space: crate::codec::xml_space_preserve(&r.text),
                        value: r.text.clone(),
                    },
                })
                .collect(),
        },
    }
}

fn encode_merges(sheet: &Sheet) -> Option<xml::MergeCells> {
    if sheet.merges().is_empty() {
        return None;
    }
    Some(xml::MergeCells {
        count: Some(sheet.merges().len() as u32),
        merge_cells: sheet.merges().iter().map(|m| xml::MergeCell { reference: m.to_string() }).collect(),
    })
}

/// Groups contiguous columns that share identical properties into a single
/// `<col min=".." max="..">` span, the way Excel itself writes runs of
/// same-width columns rather than one element per column.
fn encode_cols(sheet: &Sheet) -> Option<xml::Cols> {
    let mut cols: Vec<xml::Col> = Vec::new();
    for col in 1..=sheet.max_seen_column().unwrap_or(0) {
        let props = sheet.column_properties(col);
        if props.width.is_none() && !props.hidden && !props.collapsed && props.outline_level == 0 {
            continue;
        }
        match cols.last_mut() {
            Some(last)
                if last.max + 1 == col
                    && last.width == props.width
                    && last.hidden == props.hidden.then_some(true)
                    && last.collapsed == props.collapsed.then_some(true)
                    && last.outline_level == (props.outline_level != 0).then_some(props.outline_level) =>
            {
                last.max = col;
            }
            _ => cols.push(xml::Col {
                min: col,
                max: col,
                width: props.width,
                style: None,
                hidden: props.hidden.then_some(true),
                custom_width: props.width.map(|_| true),
                outline_level: (props.outline_level != 0).then_some(props.outline_level),
                collapsed: props.collapsed.then_some(true),
            }),
        }
    }
    (!cols.is_empty()).then_some(xml::Cols { cols })
}

/// Decodes worksheet XML into a [`Sheet`]. `style_mapping` resolves each
/// cell's raw `@s` index to the canonical [`StyleId`] produced by
/// [`crate::codec::styles_codec::decode`]; `sst` resolves `s`-typed cells'
/// `@v` index into shared string content. `hyperlink_targets` resolves an
/// external hyperlink's `r:id` (from this worksheet's own `.rels` part) to
/// its target URL; `comments` is this worksheet's parsed `xl/comments{N}.xml`
/// content, if it has one.
pub fn decode(
    name: &str,
    worksheet: &xml::WorksheetXml,
    style_mapping: &[StyleId],
    sst: &[SharedString],
    hyperlink_targets: &HashMap<String, String>,
    comments: Option<&xml_comments::CommentsXml>,
) -> Result<Sheet> {
    let mut sheet = Sheet::new(name);
    let mut cell_comments: HashMap<String, Comment> = HashMap::new();
    if let Some(comments) = comments {
        for c in &comments.comment_list.comments {
            let author = comments.author(c.author_id).map_err(|_| Error::UnknownCommentAuthor(c.author_id))?;
            let text = c.text.t.as_ref().map(|t| t.value.clone()).unwrap_or_default();
            cell_comments.insert(c.reference.clone(), Comment::new(author, text));
        }
    }
    let mut cell_hyperlinks: HashMap<String, Hyperlink> = HashMap::new();
    if let Some(hyperlinks) = &worksheet.hyperlinks {
        for h in &hyperlinks.hyperlinks {
            let target = if let Some(r_id) = &h.r_id {
                hyperlink_targets.get(r_id).map(|url| HyperlinkTarget::External(url.clone()))
            } else {
                h.location.clone().map(HyperlinkTarget::Location)
            };
            if let Some(target) = target {
                cell_hyperlinks.insert(h.reference.clone(), Hyperlink { target, tooltip: h.tooltip.clone() });
            }
        }
    }

    if let Some(fmt) = &worksheet.sheet_format_pr {
        sheet.set_default_row_height(fmt.default_row_height);
        if let Some(width) = fmt.default_col_width {
            sheet.set_default_col_width(width);
        }
    }

    for row in &worksheet.sheet_data.rows {
        if row.ht.is_some() || row.hidden.is_some() || row.outline_level.is_some() || row.collapsed.is_some() {
            sheet.set_row_properties(
                row.r,
                crate::sheet::RowProperties {
                    height: row.ht,
                    hidden: row.hidden.unwrap_or(false),
                    collapsed: row.collapsed.unwrap_or(false),
                    outline_level: row.outline_level.unwrap_or(0),
                },
            );
        }
        for cell in &row.cells {
            let a = ARef::parse(&cell.r)?;
            let value = decode_value(cell, sst)?;
            let style = cell.s.and_then(|i| style_mapping.get(i as usize)).copied();
            let comment = cell_comments.remove(&cell.r);
            let hyperlink = cell_hyperlinks.remove(&cell.r);
            sheet.put(a, Cell { value, style, comment, hyperlink });
        }
    }

    // A comment or hyperlink can reference a cell that `sheetData` never
    // mentions (Excel usually emits an entry regardless, but the schema
    // does not require it).
    for (reference, comment) in cell_comments {
        let a = ARef::parse(&reference)?;
        let mut cell = Cell::empty().with_comment(comment);
        if let Some(hyperlink) = cell_hyperlinks.remove(&reference) {
            cell = cell.with_hyperlink(hyperlink);
        }
        sheet.put(a, cell);
    }
    for (reference, hyperlink) in cell_hyperlinks {
        let a = ARef::parse(&reference)?;
        sheet.put(a, Cell::empty().with_hyperlink(hyperlink));
    }

    if let Some(merges) = &worksheet.merge_cells {
        for m in &merges.merge_cells {
            sheet.merge(CellRange::parse(&m.reference)?)?;
        }
    }

    if let Some(cols) = &worksheet.cols {
        for c in &cols.cols {
            for col in c.min..=c.max {
                sheet.set_column_properties(
                    col,
                    crate::sheet::ColumnProperties {
                        width: c.width,
                        hidden: c.hidden.unwrap_or(false),
                        collapsed: c.collapsed.unwrap_or(false),
                        outline_level: c.outline_level.unwrap_or(0),
                    },
                );
            }
        }
    }

    Ok(sheet)
}

fn decode_value(cell: &xml::Cell, sst: &[SharedString]) -> Result<CellValue> {
    let text_from_sst = |idx: &str| -> Result<CellValue> {
        let idx: usize = idx
            .parse()
            .map_err(|_| Error::InvalidCellReference(format!("non-numeric shared string index {idx:?}")))?;
        match sst.get(idx) {
            Some(SharedString::Plain(s)) => Ok(CellValue::Text(s.clone())),
            Some(SharedString::Rich(runs)) => Ok(CellValue::RichText(runs.clone())),
            None => Err(Error::UnknownStringId(idx as u32)),
        }
    };

    let base = match cell.t.as_deref() {
        Some(cell_types::SHARED_STRING) => match &cell.v {
            Some(v) => text_from_sst(v)?,
            None => CellValue::Empty,
        },
        Some(cell_types::INLINE_STRING) => match &cell.is {
            Some(is) => decode_inline(is),
            None => CellValue::Empty,
        },
        Some(cell_types::BOOLEAN) => CellValue::Bool(cell.v.as_deref() == Some("1")),
        Some(cell_types::ERROR) => match &cell.v {
            Some(v) => CellValue::Error(CellError::parse(v)?),
            None => CellValue::Empty,
        },
        Some(cell_types::FORMULA_STRING) => match &cell.v {
            Some(v) => CellValue::Text(v.clone()),
            None => CellValue::Empty,
        },
        None => match &cell.v {
            Some(v) => CellValue::Number {
                value: BigDecimal::from_str(v).unwrap_or_default(),
                original_text: Some(v.clone()),
            },
            None => CellValue::Empty,
        },
        Some(_) => match &cell.v {
            Some(v) => CellValue::Text(v.clone()),
            None => CellValue::Empty,
        },
    };

    Ok(match &cell.f {
        Some(f) => CellValue::Formula {
            formula: f.value.clone().unwrap_or_default(),
            cached: (!base.is_empty()).then(|| Box::new(base)),
        },
        None => base,
    })
}

fn decode_inline(is: &xml::InlineString) -> CellValue {
    if !is.r.is_empty() {
        return CellValue::RichText(
            is.r.iter()
                .map(|r| TextRun::plain(r.t.value.clone()))
                .collect(),
        );
    }
    match &is.t {
        Some(t) => CellValue::Text(t.value.clone()),
        None => CellValue::Empty,
    }
}

impl Sheet {
    fn max_seen_column(&self) -> Option<u32> {
        self.cells().map(|(a, _)| a.col().get()).max()
    }
}
