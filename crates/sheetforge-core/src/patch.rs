//! The patch algebra: the only description of change a [`crate::workbook::Workbook`]
//! accepts. Every `Patch` is data, not a closure, so patches can be built up,
//! inspected, logged, or replayed without ever touching a live workbook.

use crate::addr::{ARef, CellRange};
use crate::cell::Cell;
use crate::sheet::{ColumnProperties, RowProperties};
use crate::style::CellStyle;

#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    AddSheet(String),
    RemoveSheet(String),
    RenameSheet { from: String, to: String },
    SetSheetVisibility { sheet: String, visible: bool },
    Put { sheet: String, at: ARef, cell: Cell },
    Remove { sheet: String, at: ARef },
    SetStyle { sheet: String, at: ARef, style: CellStyle },
    StyleRange { sheet: String, range: CellRange, style: CellStyle },
    Merge { sheet: String, range: CellRange },
    Unmerge { sheet: String, range: CellRange },
    SetRowProperties { sheet: String, row: u32, props: RowProperties },
    SetColumnProperties { sheet: String, col: u32, props: ColumnProperties },
    /// A sequence of patches applied as a unit: if any step fails, none of
    /// the batch's effects are visible (`Workbook::apply` clones before
    /// mutating, so a failed `Batch` simply discards the working clone).
    Batch(Vec<Patch>),
}

impl Patch {
    /// The monoid identity: applying it changes nothing.
    pub fn identity() -> Self {
        Patch::Batch(Vec::new())
    }

    /// Associative combination: `a.then(b).then(c)` behaves the same as
    /// `a.then(b.then(c))`, and `Patch::identity().then(p) == p`.
    pub fn then(self, next: Patch) -> Patch {
        match (self, next) {
            (Patch::Batch(mut a), Patch::Batch(b)) => {
                a.extend(b);
                Patch::Batch(a)
            }
            (Patch::Batch(mut a), b) => {
                a.push(b);
                Patch::Batch(a)
            }
            (a, Patch::Batch(mut b)) => {
                let mut v = vec![a];
                v.append(&mut b);
                Patch::Batch(v)
            }
            (a, b) => Patch::Batch(vec![a, b]),
        }
    }
}
