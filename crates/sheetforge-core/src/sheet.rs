//! `Sheet`: an immutable grid of cells plus row/column/merge metadata.
//!
//! Values here are never mutated in place; every apparent "edit" is a
//! [`crate::patch::Patch`] applied through [`crate::workbook::Workbook::apply`],
//! which clones the owning sheet, mutates the clone, and installs it as the
//! new current value. `Sheet` itself stays a plain, clonable data type with
//! no interior mutability.

use std::collections::BTreeMap;

use crate::addr::{ARef, CellRange};
use crate::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RowProperties {
    pub height: Option<f64>,
    pub hidden: bool,
    pub collapsed: bool,
    pub outline_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColumnProperties {
    pub width: Option<f64>,
    pub hidden: bool,
    pub collapsed: bool,
    pub outline_level: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<ARef, Cell>,
    merges: Vec<CellRange>,
    rows: BTreeMap<u32, RowProperties>,
    cols: BTreeMap<u32, ColumnProperties>,
    visible: bool,
    default_row_height: Option<f64>,
    default_col_width: Option<f64>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            cells: BTreeMap::new(),
            merges: Vec::new(),
            rows: BTreeMap::new(),
            cols: BTreeMap::new(),
            visible: true,
            default_row_height: None,
            default_col_width: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn cell(&self, a: ARef) -> Option<&Cell> {
        self.cells.get(&a)
    }

    /// Every non-empty cell, in row-major order (the `BTreeMap` key packs
    /// row into the high bits of `ARef`, so iteration order is already
    /// row-major for free).
    pub fn cells(&self) -> impl Iterator<Item = (ARef, &Cell)> {
        self.cells.iter().map(|(k, v)| (*k, v))
    }

    pub(crate) fn put(&mut self, a: ARef, cell: Cell) {
        if cell.is_empty() {
            self.cells.remove(&a);
        } else {
            self.cells.insert(a, cell);
        }
    }

    /// Cells whose reference lies inside `range`, without materializing the
    /// full rectangle: only stored (non-empty) cells are visited, walked
    /// once off the sorted `BTreeMap` rather than probed cell-by-cell.
    pub fn range(&self, range: CellRange) -> impl Iterator<Item = (ARef, &Cell)> {
        self.cells.range(range.top_left()..=range.bottom_right()).filter_map(move |(k, v)| {
            range.contains(*k).then_some((*k, v))
        })
    }

    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    pub(crate) fn merge(&mut self, range: CellRange) -> Result<(), crate::error::Error> {
        if self.merges.iter().any(|m| m.overlaps(range)) {
            return Err(crate::error::Error::OverlappingMerge(range.to_string()));
        }
        self.merges.push(range);
        Ok(())
    }

    pub(crate) fn unmerge(&mut self, range: CellRange) -> Result<(), crate::error::Error> {
        let before = self.merges.len();
        self.merges.retain(|m| *m != range);
        if self.merges.len() == before {
            return Err(crate::error::Error::NotMerged(range.to_string()));
        }
        Ok(())
    }

    pub fn row_properties(&self, row: u32) -> RowProperties {
        self.rows.get(&row).copied().unwrap_or_default()
    }

    pub(crate) fn set_row_properties(&mut self, row: u32, props: RowProperties) {
        self.rows.insert(row, props);
    }

    pub fn column_properties(&self, col: u32) -> ColumnProperties {
        self.cols.get(&col).copied().unwrap_or_default()
    }

    pub(crate) fn set_column_properties(&mut self, col: u32, props: ColumnProperties) {
        self.cols.insert(col, props);
    }

    /// The sheet-wide default row height (`sheetFormatPr/@defaultRowHeight`),
    /// in points. `None` if the worksheet carried no `sheetFormatPr`.
    pub fn default_row_height(&self) -> Option<f64> {
        self.default_row_height
    }

    pub(crate) fn set_default_row_height(&mut self, height: f64) {
        self.default_row_height = Some(height);
    }

    /// The sheet-wide default column width (`sheetFormatPr/@defaultColWidth`),
    /// in characters. `None` if the worksheet carried no explicit default.
    pub fn default_col_width(&self) -> Option<f64> {
        self.default_col_width
    }

    pub(crate) fn set_default_col_width(&mut self, width: f64) {
        self.default_col_width = Some(width);
    }

    /// The occupied extent, as `xl/worksheets/sheet*.xml`'s `<dimension>`
    /// element expects: `None` for a completely empty sheet.
    pub fn dimension(&self) -> Option<CellRange> {
        let mut iter = self.cells.keys();
        let first = *iter.next()?;
        let (mut min_c, mut max_c) = (first.col().get(), first.col().get());
        let (mut min_r, mut max_r) = (first.row().get(), first.row().get());
        for a in iter {
            min_c = min_c.min(a.col().get());
            max_c = max_c.max(a.col().get());
            min_r = min_r.min(a.row().get());
            max_r = max_r.max(a.row().get());
        }
        Some(CellRange::new(
            ARef::new(crate::addr::Column::new(min_c).unwrap(), crate::addr::Row::new(min_r).unwrap()),
            ARef::new(crate::addr::Column::new(max_c).unwrap(), crate::addr::Row::new(max_r).unwrap()),
        ))
    }
}
