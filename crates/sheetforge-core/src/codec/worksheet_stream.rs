//! Row-at-a-time worksheet codec, built directly on `quick_xml`'s event API
//! instead of `serde`, so a multi-million-row sheet never has to live in
//! memory as one `WorksheetXml` tree.
//!
//! Per the two-phase resolution in `SPEC_FULL.md` §E.3: callers finish
//! registering every style and string a workbook uses (a full scan pass)
//! before streaming rows out, so style/string indices are stable by the
//! time any `<c>` element is emitted. [`SstSpill`] lets that scan's shared
//! string entries live on disk instead of in memory once they exceed
//! `spill_after`.

use std::io::{BufRead, Read, Seek, SeekFrom, Write};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::addr::ARef;
use crate::cell::Cell;
use crate::config::{apply_formula_guard, WriterConfig};
use crate::error::{Error, Result};
use crate::sheet::RowProperties;
use crate::sst::SharedString;
use crate::style_registry::StyleId;
use crate::value::CellValue;

/// One decoded row, pulled from the underlying XML stream on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRow {
    pub index: u32,
    pub properties: RowProperties,
    pub cells: Vec<(ARef, Cell)>,
}

/// Pulls `<row>` elements one at a time out of a worksheet XML stream.
pub struct WorksheetRowReader<B: BufRead> {
    reader: Reader<B>,
    buf: Vec<u8>,
}

impl<B: BufRead> WorksheetRowReader<B> {
    pub fn new(inner: B) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.config_mut().trim_text(true);
        WorksheetRowReader { reader, buf: Vec::new() }
    }

    /// Advances to and decodes the next `<row>`, or returns `None` once
    /// `</sheetData>` is reached.
    pub fn next_row(&mut self, style_mapping: &[StyleId], sst: &[SharedString]) -> Result<Option<StreamRow>> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.name().as_ref() == b"row" => {
                    // Owning the tag lets `self.buf` be reused by the
                    // nested read without `e` still borrowing it.
                    let start = e.into_owned();
                    return self.read_row_body(&start, style_mapping, sst).map(Some);
                }
                Event::End(e) if e.name().as_ref() == b"sheetData" => return Ok(None),
                Event::Eof => return Ok(None),
                _ => continue,
            }
        }
    }

    fn read_row_body(
        &mut self,
        start: &BytesStart,
        style_mapping: &[StyleId],
        sst: &[SharedString],
    ) -> Result<StreamRow> {
        let mut index = 0u32;
        let mut properties = RowProperties::default();
        for attr in start.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).into_owned();
            match attr.key.as_ref() {
                b"r" => index = value.parse().unwrap_or(0),
                b"ht" => properties.height = value.parse().ok(),
                b"hidden" => properties.hidden = value == "1" || value == "true",
                b"outlineLevel" => properties.outline_level = value.parse().unwrap_or(0),
                _ => {}
            }
        }

        let mut cells = Vec::new();
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.name().as_ref() == b"c" => {
                    let start = e.into_owned();
                    let cell = self.read_cell_body(&start, style_mapping, sst)?;
                    cells.push(cell);
                }
                Event::Empty(e) if e.name().as_ref() == b"c" => {
                    let start = e.into_owned();
                    cells.push(self.read_empty_cell(&start, style_mapping)?);
                }
                Event::End(e) if e.name().as_ref() == b"row" => break,
                Event::Eof => return Err(Error::XmlRead("unexpected end of worksheet stream inside <row>".into())),
                _ => continue,
            }
        }

        Ok(StreamRow { index, properties, cells })
    }

    fn read_empty_cell(&self, start: &BytesStart, style_mapping: &[StyleId]) -> Result<(ARef, Cell)> {
        let (r_attr, s, _t) = cell_attrs(start)?;
        let a = ARef::parse(&r_attr)?;
        let style = s.and_then(|i| style_mapping.get(i as usize)).copied();
        Ok((a, Cell { value: CellValue::Empty, style, comment: None, hyperlink: None }))
    }

    fn read_cell_body(
        &mut self,
        start: &BytesStart,
        style_mapping: &[StyleId],
        sst: &[SharedString],
    ) -> Result<(ARef, Cell)> {
        let (r_attr, s, t) = cell_attrs(start)?;
        let a = ARef::parse(&r_attr)?;
        let style = s.and_then(|i| style_mapping.get(i as usize)).copied();

        let mut v: Option<String> = None;
        let mut inline_text: Option<String> = None;
        let mut formula: Option<String> = None;

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.name().as_ref() == b"v" => {
                    v = Some(read_text(&mut self.reader, &mut self.buf)?);
                }
                Event::Start(e) if e.name().as_ref() == b"f" => {
                    formula = Some(read_text(&mut self.reader, &mut self.buf)?);
                }
                Event::Start(e) if e.name().as_ref() == b"is" => {
                    inline_text = Some(read_inline_string_text(&mut self.reader, &mut self.buf)?);
                }
                Event::End(e) if e.name().as_ref() == b"c" => break,
                Event::Eof => return Err(Error::XmlRead("unexpected end of worksheet stream inside <c>".into())),
                _ => continue,
            }
        }

        let base = decode_cell_value(t.as_deref(), v.as_deref(), inline_text.as_deref(), sst)?;
        let value = match formula {
            Some(f) => CellValue::Formula { formula: f, cached: (!base.is_empty()).then(|| Box::new(base)) },
            None => base,
        };
        Ok((a, Cell { value, style, comment: None, hyperlink: None }))
    }
}

fn cell_attrs(start: &BytesStart) -> Result<(String, Option<u32>, Option<String>)> {
    let mut r = None;
    let mut s = None;
    let mut t = None;
    for attr in start.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"r" => r = Some(value),
            b"s" => s = value.parse().ok(),
            b"t" => t = Some(value),
            _ => {}
        }
    }
    let r = r.ok_or_else(|| Error::XmlRead("<c> element missing required r attribute".into()))?;
    Ok((r, s, t))
}

fn read_text<B: BufRead>(reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<String> {
    let mut text = String::new();
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::End(_) => return Ok(text),
            Event::Eof => return Err(Error::XmlRead("unexpected end of worksheet stream reading text".into())),
            _ => continue,
        }
    }
}

fn read_inline_string_text<B: BufRead>(reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 1u32;
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::Start(e) if e.name().as_ref() == b"is" => depth += 1,
            Event::End(e) if e.name().as_ref() == b"is" => {
                depth -= 1;
                if depth == 0 {
                    return Ok(text);
                }
            }
            Event::Eof => return Err(Error::XmlRead("unexpected end of worksheet stream inside <is>".into())),
            _ => continue,
        }
    }
}

fn decode_cell_value(
    t: Option<&str>,
    v: Option<&str>,
    inline_text: Option<&str>,
    sst: &[SharedString],
) -> Result<CellValue> {
    use sheetforge_xml::worksheet::cell_types;
    use std::str::FromStr;

    Ok(match t {
        Some(cell_types::SHARED_STRING) => match v {
            Some(idx) => {
                let idx: usize = idx
                    .parse()
                    .map_err(|_| Error::InvalidCellReference(format!("non-numeric shared string index {idx:?}")))?;
                match sst.get(idx) {
                    Some(SharedString::Plain(s)) => CellValue::Text(s.clone()),
                    Some(SharedString::Rich(runs)) => CellValue::RichText(runs.clone()),
                    None => return Err(Error::UnknownStringId(idx as u32)),
                }
            }
            None => CellValue::Empty,
        },
        Some(cell_types::INLINE_STRING) => match inline_text {
            Some(s) => CellValue::Text(s.to_string()),
            None => CellValue::Empty,
        },
        Some(cell_types::BOOLEAN) => CellValue::Bool(v == Some("1")),
        Some(cell_types::ERROR) => match v {
            Some(v) => CellValue::Error(crate::value::CellError::parse(v)?),
            None => CellValue::Empty,
        },
        _ => match v {
            Some(v) => CellValue::Number {
                value: bigdecimal::BigDecimal::from_str(v).unwrap_or_default(),
                original_text: Some(v.to_string()),
            },
            None => CellValue::Empty,
        },
    })
}

/// Pushes `<row>` elements directly to a writer, bracketed by the caller
/// with `worksheet`/`sheetData` start and end tags (see
/// [`write_worksheet_open`]/[`write_worksheet_close`]).
pub struct WorksheetRowWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> WorksheetRowWriter<W> {
    pub fn new(inner: W) -> Self {
        WorksheetRowWriter { writer: Writer::new(inner) }
    }

    pub fn write_worksheet_open(&mut self, dimension: Option<&str>) -> Result<()> {
        self.writer.write_event(Event::Decl(quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        let mut start = BytesStart::new("worksheet");
        start.push_attribute(("xmlns", sheetforge_xml::namespaces::SPREADSHEET_ML));
        start.push_attribute(("xmlns:r", sheetforge_xml::namespaces::RELATIONSHIPS));
        self.writer.write_event(Event::Start(start))?;
        if let Some(reference) = dimension {
            let mut dim = BytesStart::new("dimension");
            dim.push_attribute(("ref", reference));
            self.writer.write_event(Event::Empty(dim))?;
        }
        self.writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &StreamRow, sst: &mut crate::sst::SharedStringTable, config: &WriterConfig) -> Result<()> {
        let mut start = BytesStart::new("row");
        start.push_attribute(("r", row.index.to_string().as_str()));
        if let Some(ht) = row.properties.height {
            start.push_attribute(("ht", ht.to_string().as_str()));
            start.push_attribute(("customHeight", "1"));
        }
        if row.properties.hidden {
            start.push_attribute(("hidden", "1"));
        }
        if row.properties.outline_level != 0 {
            start.push_attribute(("outlineLevel", row.properties.outline_level.to_string().as_str()));
        }
        self.writer.write_event(Event::Start(start))?;

        for (a, cell) in &row.cells {
            self.write_cell(*a, cell, sst, config)?;
        }

        self.writer.write_event(Event::End(BytesEnd::new("row")))?;
        Ok(())
    }

    fn write_cell(&mut self, a: ARef, cell: &Cell, sst: &mut crate::sst::SharedStringTable, config: &WriterConfig) -> Result<()> {
        use sheetforge_xml::worksheet::cell_types;

        let mut start = BytesStart::new("c");
        let a1 = a.to_a1();
        start.push_attribute(("r", a1.as_str()));
        let s_attr;
        if let Some(style) = cell.style {
            s_attr = style.0.to_string();
            start.push_attribute(("s", s_attr.as_str()));
        }

        match &cell.value {
            CellValue::Empty => {
                self.writer.write_event(Event::Empty(start))?;
            }
            CellValue::Text(text) => {
                let text = if config.strict_formula_guard { apply_formula_guard(text) } else { text.clone() };
                let id = sst.intern(SharedString::Plain(text));
                start.push_attribute(("t", cell_types::SHARED_STRING));
                self.writer.write_event(Event::Start(start))?;
                self.write_simple_child("v", &id.0.to_string())?;
                self.writer.write_event(Event::End(BytesEnd::new("c")))?;
            }
            CellValue::RichText(runs) => {
                let id = sst.intern(SharedString::Rich(runs.clone()));
                start.push_attribute(("t", cell_types::SHARED_STRING));
                self.writer.write_event(Event::Start(start))?;
                self.write_simple_child("v", &id.0.to_string())?;
                self.writer.write_event(Event::End(BytesEnd::new("c")))?;
            }
            CellValue::Number { value, original_text } => {
                let text = original_text.clone().unwrap_or_else(|| value.to_string());
                self.writer.write_event(Event::Start(start))?;
                self.write_simple_child("v", &text)?;
                self.writer.write_event(Event::End(BytesEnd::new("c")))?;
            }
            CellValue::Bool(b) => {
                start.push_attribute(("t", cell_types::BOOLEAN));
                self.writer.write_event(Event::Start(start))?;
                self.write_simple_child("v", if *b { "1" } else { "0" })?;
                self.writer.write_event(Event::End(BytesEnd::new("c")))?;
            }
            CellValue::DateTime(dt) => {
                let serial = crate::datetime::to_excel_serial(*dt);
                self.writer.write_event(Event::Start(start))?;
                self.write_simple_child("v", &serial.to_string())?;
                self.writer.write_event(Event::End(BytesEnd::new("c")))?;
            }
            CellValue::Error(e) => {
                start.push_attribute(("t", cell_types::ERROR));
                self.writer.write_event(Event::Start(start))?;
                self.write_simple_child("v", e.as_str())?;
                self.writer.write_event(Event::End(BytesEnd::new("c")))?;
            }
            CellValue::Formula { formula, cached } => {
                self.writer.write_event(Event::Start(start))?;
                self.write_simple_child("f", formula)?;
                if let Some(cv) = cached {
                    if let Some(text) = cv.plain_text() {
                        self.write_simple_child("v", &text)?;
                    }
                }
                self.writer.write_event(Event::End(BytesEnd::new("c")))?;
            }
        }
        Ok(())
    }

    fn write_simple_child(&mut self, tag: &str, text: &str) -> Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(tag)))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    pub fn write_worksheet_close(mut self) -> Result<W> {
        self.writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
        self.writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
        Ok(self.writer.into_inner())
    }
}

/// Escapes backslashes and newlines so a string containing an Excel
/// line break (Alt+Enter) can't be mistaken for a spill-file line boundary.
fn escape_line(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape_line(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Spills shared-string entries to a temp file once their count exceeds
/// `spill_after`, so a worksheet with millions of unique strings doesn't
/// have to hold them all in memory before `sharedStrings.xml` is written.
pub struct SstSpill {
    spill_after: usize,
    memory: Vec<SharedString>,
    file: Option<tempfile::NamedTempFile>,
}

impl SstSpill {
    pub fn new(spill_after: usize) -> Self {
        SstSpill { spill_after, memory: Vec::new(), file: None }
    }

    pub fn push(&mut self, entry: SharedString) -> Result<()> {
        if self.file.is_none() && self.memory.len() >= self.spill_after {
            self.file = Some(tempfile::NamedTempFile::new()?);
        }
        if let Some(file) = &mut self.file {
            let line = match &entry {
                SharedString::Plain(s) => format!("P{}\n", escape_line(s)),
                SharedString::Rich(runs) => {
                    let text: String = runs.iter().map(|r| r.text.as_str()).collect();
                    format!("R{}\n", escape_line(&text))
                }
            };
            file.write_all(line.as_bytes())?;
        } else {
            self.memory.push(entry);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.memory.len() + self.spilled_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spilled_len(&self) -> usize {
        let Some(file) = &self.file else { return 0 };
        let mut f = file.reopen().expect("temp file must remain openable for counting");
        let mut buf = Vec::new();
        f.read_to_end(&mut buf).ok();
        buf.iter().filter(|&&b| b == b'\n').count()
    }

    /// Replays every entry, spilled or not, in insertion order.
    pub fn iter_all(&self) -> Result<Vec<SharedString>> {
        // `memory` holds entries pushed before the spill threshold, `file`
        // holds everything pushed after it, so memory comes first.
        let mut out = self.memory.clone();
        if let Some(file) = &self.file {
            let mut f = file.reopen()?;
            f.seek(SeekFrom::Start(0))?;
            let mut buf = String::new();
            f.read_to_string(&mut buf)?;
            for line in buf.lines() {
                let (tag, rest) = line.split_at(1);
                let text = unescape_line(rest);
                out.push(match tag {
                    "R" => SharedString::Rich(vec![crate::value::TextRun::plain(text)]),
                    _ => SharedString::Plain(text),
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::Column;
    use crate::cell::Cell;
    use crate::sheet::RowProperties;
    use crate::sst::SharedStringTable;
    use crate::value::CellValue;
    use std::io::Cursor;

    fn sample_row() -> StreamRow {
        StreamRow {
            index: 1,
            properties: RowProperties::default(),
            cells: vec![
                (ARef::new(Column::new(1).unwrap(), crate::addr::Row::new(1).unwrap()), Cell::new(CellValue::text("hi"))),
                (ARef::new(Column::new(2).unwrap(), crate::addr::Row::new(1).unwrap()), Cell::new(CellValue::number(5i64))),
            ],
        }
    }

    #[test]
    fn streams_a_row_out_and_back_in() {
        let mut buf = Vec::new();
        let mut sst = SharedStringTable::new();
        {
            let mut w = WorksheetRowWriter::new(&mut buf);
            w.write_worksheet_open(Some("A1:B1")).unwrap();
            w.write_row(&sample_row(), &mut sst, &WriterConfig::default()).unwrap();
            w.write_worksheet_close().unwrap();
        }
        let xml = String::from_utf8(buf).unwrap();
        assert!(xml.contains("<row r=\"1\">"));

        let entries = sst.entries().to_vec();
        let mut reader = WorksheetRowReader::new(Cursor::new(xml.into_bytes()));
        let row = reader.next_row(&[], &entries).unwrap().unwrap();
        assert_eq!(row.index, 1);
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.cells[0].1.value, CellValue::text("hi"));
    }

    #[test]
    fn sst_spill_replays_entries_past_the_memory_threshold() {
        let mut spill = SstSpill::new(2);
        spill.push(SharedString::Plain("a".into())).unwrap();
        spill.push(SharedString::Plain("b".into())).unwrap();
        spill.push(SharedString::Plain("c".into())).unwrap();
        assert_eq!(spill.len(), 3);
        let all = spill.iter_all().unwrap();
        assert_eq!(all.len(), 3);
    }
}
