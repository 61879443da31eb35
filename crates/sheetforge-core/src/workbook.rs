//! `Workbook`: an ordered collection of sheets plus the shared style
//! registry, with the [`crate::patch::Patch`] algebra as its only mutating
//! surface.

use crate::addr::{ARef, CellRange, SheetName};
use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::patch::Patch;
use crate::sheet::{ColumnProperties, RowProperties, Sheet};
use crate::style::CellStyle;
use crate::style_registry::{StyleId, StyleRegistry};

#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    styles: StyleRegistry,
    next_sheet_id: u32,
    active_tab: u32,
}

impl Default for Workbook {
    fn default() -> Self {
        let mut wb = Workbook {
            sheets: Vec::new(),
            styles: StyleRegistry::new(),
            next_sheet_id: 1,
            active_tab: 0,
        };
        wb.sheets.push(Sheet::new("Sheet1"));
        wb.next_sheet_id = 2;
        wb
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A workbook with no sheets at all, for codecs building up a workbook
    /// sheet-by-sheet from a source container instead of starting from the
    /// default single-sheet template.
    pub fn empty() -> Self {
        Workbook { sheets: Vec::new(), styles: StyleRegistry::new(), next_sheet_id: 1, active_tab: 0 }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name() == name)
    }

    fn sheet_index(&self, name: &str) -> Result<usize> {
        self.sheets
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn active_tab(&self) -> u32 {
        self.active_tab
    }

    /// Applies a [`Patch`], returning the resulting workbook. This is the
    /// only place a `Workbook`'s contents change; every ergonomic setter
    /// below is sugar that builds a `Patch` and calls this.
    pub fn apply(&self, patch: Patch) -> Result<Workbook> {
        let mut wb = self.clone();
        wb.apply_mut(patch)?;
        Ok(wb)
    }

    fn apply_mut(&mut self, patch: Patch) -> Result<()> {
        match patch {
            Patch::Batch(patches) => {
                for p in patches {
                    self.apply_mut(p)?;
                }
            }
            Patch::AddSheet(name) => {
                let name = SheetName::new(name)?;
                if self.sheet(name.as_str()).is_some() {
                    return Err(Error::DuplicateSheetName(name.as_str().to_string()));
                }
                self.sheets.push(Sheet::new(name.as_str()));
                self.next_sheet_id += 1;
            }
            Patch::RemoveSheet(name) => {
                let idx = self.sheet_index(&name)?;
                if self.sheets.iter().enumerate().all(|(i, s)| i == idx || !s.is_visible()) {
                    return Err(Error::NoVisibleSheets);
                }
                self.sheets.remove(idx);
                if (self.active_tab as usize) > idx {
                    self.active_tab -= 1;
                }
                let last = self.sheets.len().saturating_sub(1) as u32;
                self.active_tab = self.active_tab.min(last);
            }
            Patch::RenameSheet { from, to } => {
                let to = SheetName::new(to)?;
                if self.sheet(to.as_str()).is_some() {
                    return Err(Error::DuplicateSheetName(to.as_str().to_string()));
                }
                let idx = self.sheet_index(&from)?;
                self.sheets[idx].set_name(to.as_str());
            }
            Patch::SetSheetVisibility { sheet, visible } => {
                let idx = self.sheet_index(&sheet)?;
                if !visible && self.sheets.iter().enumerate().all(|(i, s)| i == idx || !s.is_visible()) {
                    return Err(Error::NoVisibleSheets);
                }
                self.sheets[idx].set_visible(visible);
            }
            Patch::Put { sheet, at, cell } => {
                let idx = self.sheet_index(&sheet)?;
                self.sheets[idx].put(at, cell);
            }
            Patch::Remove { sheet, at } => {
                let idx = self.sheet_index(&sheet)?;
                self.sheets[idx].put(at, Cell::empty());
            }
            Patch::SetStyle { sheet, at, style } => {
                let style_id = self.styles.register(style)?;
                let idx = self.sheet_index(&sheet)?;
                let existing = self.sheets[idx].cell(at).cloned().unwrap_or_default();
                self.sheets[idx].put(at, existing.with_style(style_id));
            }
            Patch::StyleRange { sheet, range, style } => {
                let style_id = self.styles.register(style)?;
                let idx = self.sheet_index(&sheet)?;
                for a in range.cells() {
                    let existing = self.sheets[idx].cell(a).cloned().unwrap_or_default();
                    self.sheets[idx].put(a, existing.with_style(style_id));
                }
            }
            Patch::Merge { sheet, range } => {
                let idx = self.sheet_index(&sheet)?;
                self.sheets[idx].merge(range)?;
            }
            Patch::Unmerge { sheet, range } => {
                let idx = self.sheet_index(&sheet)?;
                self.sheets[idx].unmerge(range)?;
            }
            Patch::SetRowProperties { sheet, row, props } => {
                let idx = self.sheet_index(&sheet)?;
                self.sheets[idx].set_row_properties(row, props);
            }
            Patch::SetColumnProperties { sheet, col, props } => {
                let idx = self.sheet_index(&sheet)?;
                self.sheets[idx].set_column_properties(col, props);
            }
        }
        Ok(())
    }

    // --- Ergonomic sugar over `apply`, matching the teacher's direct-setter
    // surface but implemented purely in terms of the patch algebra. ---

    pub fn add_sheet(&self, name: impl Into<String>) -> Result<Workbook> {
        self.apply(Patch::AddSheet(name.into()))
    }

    pub fn remove_sheet(&self, name: impl Into<String>) -> Result<Workbook> {
        self.apply(Patch::RemoveSheet(name.into()))
    }

    pub fn rename_sheet(&self, from: impl Into<String>, to: impl Into<String>) -> Result<Workbook> {
        self.apply(Patch::RenameSheet { from: from.into(), to: to.into() })
    }

    pub fn put_cell(&self, sheet: impl Into<String>, at: ARef, cell: Cell) -> Result<Workbook> {
        self.apply(Patch::Put { sheet: sheet.into(), at, cell })
    }

    pub fn remove_cell(&self, sheet: impl Into<String>, at: ARef) -> Result<Workbook> {
        self.apply(Patch::Remove { sheet: sheet.into(), at })
    }

    /// `put(ref, f(existing_or_empty))`: reads the current cell (or the
    /// empty default if unset), applies `f`, and writes the result back.
    pub fn update_cell(
        &self,
        sheet: impl Into<String>,
        at: ARef,
        f: impl FnOnce(Cell) -> Cell,
    ) -> Result<Workbook> {
        let sheet = sheet.into();
        let existing = self
            .sheet(&sheet)
            .ok_or_else(|| Error::SheetNotFound(sheet.clone()))?
            .cell(at)
            .cloned()
            .unwrap_or_default();
        self.put_cell(sheet, at, f(existing))
    }

    pub fn set_style(&self, sheet: impl Into<String>, at: ARef, style: CellStyle) -> Result<Workbook> {
        self.apply(Patch::SetStyle { sheet: sheet.into(), at, style })
    }

    pub fn style_range(
        &self,
        sheet: impl Into<String>,
        range: CellRange,
        style: CellStyle,
    ) -> Result<Workbook> {
        self.apply(Patch::StyleRange { sheet: sheet.into(), range, style })
    }

    pub fn merge(&self, sheet: impl Into<String>, range: CellRange) -> Result<Workbook> {
        self.apply(Patch::Merge { sheet: sheet.into(), range })
    }

    pub fn unmerge(&self, sheet: impl Into<String>, range: CellRange) -> Result<Workbook> {
        self.apply(Patch::Unmerge { sheet: sheet.into(), range })
    }

    pub fn set_row_properties(
        &self,
        sheet: impl Into<String>,
        row: u32,
        props: RowProperties,
    ) -> Result<Workbook> {
        self.apply(Patch::SetRowProperties { sheet: sheet.into(), row, props })
    }

    pub fn set_column_properties(
        &self,
        sheet: impl Into<String>,
        col: u32,
        props: ColumnProperties,
    ) -> Result<Workbook> {
        self.apply(Patch::SetColumnProperties { sheet: sheet.into(), col, props })
    }

    /// Reconstitutes a `Workbook` directly from pre-built parts; used by the
    /// container codec when reading an existing `.xlsx`, where sheets and
    /// styles are produced from XML rather than assembled patch-by-patch.
    pub(crate) fn from_parts(sheets: Vec<Sheet>, styles: StyleRegistry, active_tab: u32) -> Self {
        let next_sheet_id = sheets.len() as u32 + 1;
        Workbook { sheets, styles, next_sheet_id, active_tab }
    }

    pub(crate) fn next_sheet_id(&self) -> u32 {
        self.next_sheet_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;

    #[test]
    fn default_workbook_has_one_visible_sheet() {
        let wb = Workbook::new();
        assert_eq!(wb.sheets().len(), 1);
        assert_eq!(wb.sheets()[0].name(), "Sheet1");
    }

    #[test]
    fn add_sheet_rejects_duplicate_names() {
        let wb = Workbook::new();
        assert!(wb.add_sheet("Sheet1").is_err());
    }

    #[test]
    fn apply_never_mutates_the_receiver() {
        let wb = Workbook::new();
        let wb2 = wb.add_sheet("Sheet2").unwrap();
        assert_eq!(wb.sheets().len(), 1);
        assert_eq!(wb2.sheets().len(), 2);
    }

    #[test]
    fn put_cell_is_visible_on_the_named_sheet_only() {
        let wb = Workbook::new().add_sheet("Sheet2").unwrap();
        let a1 = ARef::parse("A1").unwrap();
        let wb = wb.put_cell("Sheet1", a1, Cell::new(CellValue::text("hi"))).unwrap();
        assert_eq!(wb.sheet("Sheet1").unwrap().cell(a1).unwrap().value, CellValue::text("hi"));
        assert!(wb.sheet("Sheet2").unwrap().cell(a1).is_none());
    }

    #[test]
    fn removing_the_last_visible_sheet_is_rejected() {
        let wb = Workbook::new();
        assert!(wb.remove_sheet("Sheet1").is_err());
    }

    #[test]
    fn set_style_registers_and_attaches_a_style_id() {
        let wb = Workbook::new();
        let a1 = ARef::parse("A1").unwrap();
        let bold = CellStyle::default().with_font(crate::style::Font {
            bold: true,
            ..crate::style::Font::default()
        });
        let wb = wb.set_style("Sheet1", a1, bold).unwrap();
        let style_id = wb.sheet("Sheet1").unwrap().cell(a1).unwrap().style.unwrap();
        assert!(wb.styles().get(style_id).unwrap().font.bold);
    }

    #[test]
    fn put_empty_then_remove_is_a_no_op() {
        let wb = Workbook::new();
        let a1 = ARef::parse("A1").unwrap();
        let a = wb.put_cell("Sheet1", a1, Cell::empty()).unwrap();
        let b = a.remove_cell("Sheet1", a1).unwrap();
        assert_eq!(a.sheet("Sheet1").unwrap().cells().count(), b.sheet("Sheet1").unwrap().cells().count());
        assert!(b.sheet("Sheet1").unwrap().cell(a1).is_none());
    }

    #[test]
    fn update_cell_transforms_the_existing_or_default_value() {
        let wb = Workbook::new();
        let a1 = ARef::parse("A1").unwrap();
        let wb = wb
            .update_cell("Sheet1", a1, |c| {
                Cell::new(CellValue::text(format!("{}x", c.value.plain_text().unwrap_or_default())))
            })
            .unwrap();
        assert_eq!(wb.sheet("Sheet1").unwrap().cell(a1).unwrap().value, CellValue::text("x"));
    }

    #[test]
    fn batch_patch_applies_all_operations_atomically() {
        let wb = Workbook::new();
        let a1 = ARef::parse("A1").unwrap();
        let batch = Patch::Batch(vec![
            Patch::AddSheet("Sheet2".into()),
            Patch::Put { sheet: "Sheet1".into(), at: a1, cell: Cell::new(CellValue::text("x")) },
        ]);
        let wb = wb.apply(batch).unwrap();
        assert_eq!(wb.sheets().len(), 2);
        assert_eq!(wb.sheet("Sheet1").unwrap().cell(a1).unwrap().value, CellValue::text("x"));
    }
}
