//! SheetForge: a high-level API for reading and writing Excel (.xlsx) files.
//!
//! The heavy lifting — addressing, the style model, the patch algebra, and
//! the container codec — lives in `sheetforge-core` as a fully immutable,
//! clone-on-write document model. This crate wraps that model in a
//! [`Workbook`] handle that feels mutable: every setter applies a patch in
//! place and tells the originating container what changed, so [`Workbook::save`]
//! can pick the cheapest write strategy that is still correct.
//!
//! # Quick Start
//!
//! ```no_run
//! use sheetforge::Workbook;
//!
//! let mut wb = Workbook::new();
//! wb.set_cell_value("Sheet1", "A1", "hello").unwrap();
//! wb.save("output.xlsx").unwrap();
//! ```

use std::path::Path;

use sheetforge_core::addr::{ARef, CellRange};
use sheetforge_core::config::{ReaderLimits, WriterConfig};
use sheetforge_core::container::{self, source::ModificationTracker, SourceContext};
use sheetforge_core::patch::Patch;
use sheetforge_core::sheet::{ColumnProperties, RowProperties};
use sheetforge_core::style::CellStyle;

pub use sheetforge_core::cell::{Cell, Comment, Hyperlink, HyperlinkTarget};
pub use sheetforge_core::error::{Error, Result};
pub use sheetforge_core::sheet::Sheet;
pub use sheetforge_core::value::CellValue;
pub use sheetforge_core::value::CellValue as Value;

/// Utility functions for cell reference conversion.
pub mod utils {
    pub use sheetforge_core::utils::cell_ref::{
        cell_name_to_coordinates, column_name_to_number, column_number_to_name,
        coordinates_to_cell_name,
    };
    pub use sheetforge_core::utils::constants;
}

/// A spreadsheet document: an ordered set of sheets plus the shared style
/// registry, paired with the container it was read from (if any).
///
/// Every method that changes the workbook applies a [`Patch`] to the
/// underlying immutable core model and records which parts of the source
/// container it touched, so `save` never does more work than the edit
/// actually requires.
#[derive(Debug, Clone)]
pub struct Workbook {
    inner: sheetforge_core::workbook::Workbook,
    source: Option<SourceContext>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// A new workbook with a single sheet named `Sheet1`.
    pub fn new() -> Self {
        Workbook { inner: sheetforge_core::workbook::Workbook::new(), source: None }
    }

    /// Opens an existing `.xlsx` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let (inner, source) = container::open(path, &ReaderLimits::default())?;
        Ok(Workbook { inner, source: Some(source) })
    }

    /// Opens an existing `.xlsx` document already held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let (inner, source) = container::read_bytes(bytes, &ReaderLimits::default())?;
        Ok(Workbook { inner, source: Some(source) })
    }

    /// Writes the workbook to `path`, choosing the cheapest write strategy
    /// (verbatim, surgical, or full regeneration) its change history allows.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        container::write_path(&self.inner, path, self.source.as_ref(), &WriterConfig::default())
    }

    /// Serializes the workbook to an in-memory `.xlsx` byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        container::write_bytes(&self.inner, self.source.as_ref(), &WriterConfig::default())
    }

    /// The underlying, fully immutable document model.
    pub fn core(&self) -> &sheetforge_core::workbook::Workbook {
        &self.inner
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.inner.sheets().iter().map(Sheet::name).collect()
    }

    pub fn sheets(&self) -> &[Sheet] {
        self.inner.sheets()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.inner.sheet(name)
    }

    /// The name of the sheet Excel would show as active when the file is
    /// opened, i.e. the sheet at [`sheetforge_core::workbook::Workbook::active_tab`].
    pub fn active_sheet(&self) -> &str {
        let idx = self.inner.active_tab() as usize;
        self.inner.sheets().get(idx).map(Sheet::name).unwrap_or_else(|| {
            self.inner.sheets().first().map(Sheet::name).unwrap_or("Sheet1")
        })
    }

    /// Every non-empty cell on `sheet`, grouped by row and ordered by
    /// column, as `(row, [(col, value)])` pairs. Rows with no cells set are
    /// omitted entirely.
    pub fn rows(&self, sheet: &str) -> Result<Vec<(u32, Vec<(u32, CellValue)>)>> {
        let sheet = self.sheet(sheet).ok_or_else(|| Error::SheetNotFound(sheet.to_string()))?;
        let mut by_row: std::collections::BTreeMap<u32, Vec<(u32, CellValue)>> = Default::default();
        for (a, cell) in sheet.cells() {
            if cell.is_empty() {
                continue;
            }
            by_row.entry(a.row().get()).or_default().push((a.col().get(), cell.value.clone()));
        }
        for cells in by_row.values_mut() {
            cells.sort_by_key(|(col, _)| *col);
        }
        Ok(by_row.into_iter().collect())
    }

    pub fn cell_value(&self, sheet: &str, cell_ref: &str) -> Result<CellValue> {
        let at = ARef::parse(cell_ref)?;
        let sheet = self.sheet(sheet).ok_or_else(|| Error::SheetNotFound(sheet.to_string()))?;
        Ok(sheet.cell(at).map(|c| c.value.clone()).unwrap_or(CellValue::Empty))
    }

    pub fn set_cell_value(
        &mut self,
        sheet: impl Into<String>,
        cell_ref: &str,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        let at = ARef::parse(cell_ref)?;
        self.apply(Patch::Put { sheet: sheet.into(), at, cell: Cell::new(value.into()) })
    }

    /// Attaches `comment` to an existing cell, or to a freshly created empty
    /// one if nothing was there yet, leaving its value and style untouched.
    pub fn set_comment(&mut self, sheet: impl Into<String>, cell_ref: &str, comment: Comment) -> Result<()> {
        let sheet = sheet.into();
        let at = ARef::parse(cell_ref)?;
        let existing =
            self.inner.sheet(&sheet).ok_or_else(|| Error::SheetNotFound(sheet.clone()))?.cell(at).cloned();
        let cell = existing.unwrap_or_default().with_comment(comment);
        self.apply(Patch::Put { sheet, at, cell })
    }

    /// Attaches `hyperlink` to an existing cell, or to a freshly created
    /// empty one if nothing was there yet, leaving its value and style
    /// untouched.
    pub fn set_hyperlink(&mut self, sheet: impl Into<String>, cell_ref: &str, hyperlink: Hyperlink) -> Result<()> {
        let sheet = sheet.into();
        let at = ARef::parse(cell_ref)?;
        let existing =
            self.inner.sheet(&sheet).ok_or_else(|| Error::SheetNotFound(sheet.clone()))?.cell(at).cloned();
        let cell = existing.unwrap_or_default().with_hyperlink(hyperlink);
        self.apply(Patch::Put { sheet, at, cell })
    }

    pub fn remove_cell(&mut self, sheet: impl Into<String>, cell_ref: &str) -> Result<()> {
        let at = ARef::parse(cell_ref)?;
        self.apply(Patch::Remove { sheet: sheet.into(), at })
    }

    pub fn add_sheet(&mut self, name: impl Into<String>) -> Result<()> {
        self.apply(Patch::AddSheet(name.into()))
    }

    pub fn remove_sheet(&mut self, name: impl Into<String>) -> Result<()> {
        self.apply(Patch::RemoveSheet(name.into()))
    }

    pub fn rename_sheet(&mut self, from: impl Into<String>, to: impl Into<String>) -> Result<()> {
        self.apply(Patch::RenameSheet { from: from.into(), to: to.into() })
    }

    pub fn set_sheet_visible(&mut self, sheet: impl Into<String>, visible: bool) -> Result<()> {
        self.apply(Patch::SetSheetVisibility { sheet: sheet.into(), visible })
    }

    pub fn set_style(&mut self, sheet: impl Into<String>, cell_ref: &str, style: CellStyle) -> Result<()> {
        let at = ARef::parse(cell_ref)?;
        self.apply(Patch::SetStyle { sheet: sheet.into(), at, style })
    }

    pub fn style_range(&mut self, sheet: impl Into<String>, range: &str, style: CellStyle) -> Result<()> {
        let range = CellRange::parse(range)?;
        self.apply(Patch::StyleRange { sheet: sheet.into(), range, style })
    }

    pub fn merge(&mut self, sheet: impl Into<String>, range: &str) -> Result<()> {
        let range = CellRange::parse(range)?;
        self.apply(Patch::Merge { sheet: sheet.into(), range })
    }

    pub fn unmerge(&mut self, sheet: impl Into<String>, range: &str) -> Result<()> {
        let range = CellRange::parse(range)?;
        self.apply(Patch::Unmerge { sheet: sheet.into(), range })
    }

    pub fn set_row_properties(&mut self, sheet: impl Into<String>, row: u32, props: RowProperties) -> Result<()> {
        self.apply(Patch::SetRowProperties { sheet: sheet.into(), row, props })
    }

    pub fn set_column_properties(
        &mut self,
        sheet: impl Into<String>,
        col: u32,
        props: ColumnProperties,
    ) -> Result<()> {
        self.apply(Patch::SetColumnProperties { sheet: sheet.into(), col, props })
    }

    /// Applies an arbitrary [`Patch`] (including a [`Patch::Batch`]),
    /// updating both the document model and the source container's
    /// modification tracker in one step.
    pub fn apply(&mut self, patch: Patch) -> Result<()> {
        if let Some(source) = &mut self.source {
            mark_dirty(source.tracker_mut(), &patch);
        }
        self.inner = self.inner.apply(patch)?;
        Ok(())
    }
}

/// Tells a [`ModificationTracker`] what a patch is about to touch, so the
/// container writer can later tell a no-op save apart from a targeted edit.
fn mark_dirty(tracker: &mut ModificationTracker, patch: &Patch) {
    match patch {
        Patch::Batch(patches) => {
            for p in patches {
                mark_dirty(tracker, p);
            }
        }
        Patch::AddSheet(_)
        | Patch::RemoveSheet(_)
        | Patch::RenameSheet { .. }
        | Patch::SetSheetVisibility { .. } => tracker.mark_structural_change(),
        Patch::Put { sheet, cell, .. } => {
            tracker.mark_sheet_dirty(sheet);
            if matches!(cell.value, CellValue::Text(_) | CellValue::RichText(_)) {
                tracker.mark_strings_dirty();
            }
        }
        Patch::Remove { sheet, .. } => tracker.mark_sheet_dirty(sheet),
        Patch::SetStyle { sheet, .. } | Patch::StyleRange { sheet, .. } => {
            tracker.mark_sheet_dirty(sheet);
            tracker.mark_styles_dirty();
        }
        Patch::Merge { sheet, .. } | Patch::Unmerge { sheet, .. } => tracker.mark_sheet_dirty(sheet),
        Patch::SetRowProperties { sheet, .. } | Patch::SetColumnProperties { sheet, .. } => {
            tracker.mark_sheet_dirty(sheet)
        }
    }
}
