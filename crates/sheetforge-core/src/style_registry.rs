//! Append-only, deduplicating interner for styles and their components.
//!
//! Each of `Font`, `Fill`, `Border`, and `NumFmt` gets its own table so
//! identical fonts/fills/etc. shared by many cell styles are stored once,
//! mirroring how `xl/styles.xml` itself is laid out (`fonts`, `fills`,
//! `borders`, `cellXfs` each index into the one before). Insertion order is
//! preserved (first occurrence wins the lowest index), which keeps output
//! deterministic across runs for identical input.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::style::{CellStyle, CellStyleKey, Fill, NumFmt, CUSTOM_NUM_FMT_BASE_ID};
use crate::utils::constants::MAX_CELL_STYLES;

/// Opaque handle into a [`StyleRegistry`]'s `cellXfs` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleId(pub u32);

/// A deduplicating table: preserves first-occurrence order, returns the
/// existing index on a repeat insert.
#[derive(Debug, Clone)]
struct Interner<K: std::hash::Hash + Eq + Clone> {
    items: Vec<K>,
    index: HashMap<K, u32>,
}

// Written by hand rather than derived: `#[derive(Default)]` on a generic
// struct adds a `K: Default` bound even though neither field needs one.
impl<K: std::hash::Hash + Eq + Clone> Default for Interner<K> {
    fn default() -> Self {
        Interner { items: Vec::new(), index: HashMap::new() }
    }
}

impl<K: std::hash::Hash + Eq + Clone> Interner<K> {
    fn intern(&mut self, key: K) -> u32 {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.items.len() as u32;
        self.index.insert(key.clone(), id);
        self.items.push(key);
        id
    }

    fn get(&self, id: u32) -> Option<&K> {
        self.items.get(id as usize)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn iter(&self) -> impl Iterator<Item = &K> {
        self.items.iter()
    }
}

#[derive(Debug, Clone)]
pub struct StyleRegistry {
    fonts: Interner<crate::style::Font>,
    fills: Interner<Fill>,
    borders: Interner<crate::style::Border>,
    num_fmts: CustomNumFmtTable,
    styles: Interner<CellStyleKey>,
    style_components: Vec<CellStyle>,
}

/// Custom number formats, keyed by format code, each assigned a stable
/// numeric id. A style read with a preserved `numFmtId` keeps that exact id
/// on write — `<numFmts numFmtId="N">` and every `<xf numFmtId="N">`
/// referencing it must agree, so the id can't be reassigned by insertion
/// order the way fonts/fills/borders are. Only a custom format with no
/// preserved id (freshly authored, not read from a source container) gets
/// one auto-assigned, starting at 164 and skipping any id already taken by
/// a preserved one.
#[derive(Debug, Clone, Default)]
struct CustomNumFmtTable {
    entries: Vec<(String, u32)>,
    by_code: HashMap<String, u32>,
    by_id: HashSet<u32>,
    next_auto_id: u32,
}

impl CustomNumFmtTable {
    /// Registers `code`, returning its assigned id. `preserved_id`, when
    /// given and not already claimed by another code, is used verbatim;
    /// otherwise the next free id starting at 164 is assigned.
    fn register(&mut self, code: String, preserved_id: Option<u32>) -> u32 {
        if let Some(&id) = self.by_code.get(&code) {
            return id;
        }
        let id = match preserved_id {
            Some(id) if !self.by_id.contains(&id) => id,
            _ => {
                let mut candidate = self.next_auto_id.max(CUSTOM_NUM_FMT_BASE_ID);
                while self.by_id.contains(&candidate) {
                    candidate += 1;
                }
                candidate
            }
        };
        self.by_id.insert(id);
        self.next_auto_id = self.next_auto_id.max(id + 1);
        self.by_code.insert(code.clone(), id);
        self.entries.push((code, id));
        id
    }

    fn id_for_code(&self, code: &str) -> Option<u32> {
        self.by_code.get(code).copied()
    }

    fn iter(&self) -> impl Iterator<Item = &(String, u32)> {
        self.entries.iter()
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        let mut fills = Interner::default();
        // Fixed slots required by ECMA-376 §18.8.21: 0 = none, 1 = gray125.
        fills.intern(Fill::none());
        fills.intern(Fill::gray125());

        let mut reg = StyleRegistry {
            fonts: Interner::default(),
            fills,
            borders: Interner::default(),
            num_fmts: CustomNumFmtTable::default(),
            styles: Interner::default(),
            style_components: Vec::new(),
        };
        // Register the default style so StyleId(0) always resolves to
        // Excel's implicit "Normal" style, matching xl/styles.xml's
        // always-present first cellXf.
        reg.register(CellStyle::default());
        reg
    }
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `style`, returning its stable [`StyleId`]. Fonts, fills, and
    /// borders are deduplicated independently of the cell style itself.
    pub fn register(&mut self, style: CellStyle) -> Result<StyleId> {
        let key = style.canonical_key();
        if let Some(&id) = self.styles.index.get(&key) {
            return Ok(StyleId(id));
        }
        if self.styles.len() >= MAX_CELL_STYLES {
            return Err(Error::StyleRegistryFull(MAX_CELL_STYLES as u32));
        }

        self.fonts.intern(style.font.clone());
        self.fills.intern(style.fill.clone());
        self.borders.intern(style.border.clone());
        if !style.num_fmt.is_builtin() {
            let code = style.num_fmt.code.clone().unwrap_or_default();
            self.num_fmts.register(code, style.num_fmt_id);
        }

        let id = self.styles.intern(key);
        self.style_components.push(style);
        Ok(StyleId(id))
    }

    pub fn get(&self, id: StyleId) -> Result<&CellStyle> {
        self.style_components
            .get(id.0 as usize)
            .ok_or(Error::UnknownStyleId(id.0))
    }

    pub fn font_id(&self, font: &crate::style::Font) -> Option<u32> {
        self.fonts.index.get(font).copied()
    }

    pub fn fill_id(&self, fill: &Fill) -> Option<u32> {
        self.fills.index.get(fill).copied()
    }

    pub fn border_id(&self, border: &crate::style::Border) -> Option<u32> {
        self.borders.index.get(border).copied()
    }

    /// The resolved numFmtId for a style's number format, per the priority
    /// spec.md §4.5 mandates: (1) the style's preserved raw id, if any —
    /// this is what makes a read-then-write round-trip byte-exact even
    /// when the original id was an unrecognized builtin slot; (2) the id
    /// assigned to its custom code when registered; (3) the builtin id for
    /// its `NumFmt` variant; (4) General (0).
    pub fn num_fmt_id_for(&self, style: &CellStyle) -> u32 {
        if let Some(id) = style.num_fmt_id {
            return id;
        }
        if style.num_fmt.is_builtin() {
            return style.num_fmt.id;
        }
        let code = style.num_fmt.code.clone().unwrap_or_default();
        self.num_fmts.id_for_code(&code).unwrap_or(CUSTOM_NUM_FMT_BASE_ID)
    }

    pub fn fonts(&self) -> impl Iterator<Item = &crate::style::Font> {
        self.fonts.iter()
    }

    pub fn fills(&self) -> impl Iterator<Item = &Fill> {
        self.fills.iter()
    }

    pub fn borders(&self) -> impl Iterator<Item = &crate::style::Border> {
        self.borders.iter()
    }

    /// Custom number formats in registration order, each paired with its
    /// assigned id: a preserved source id when one was available, otherwise
    /// the next free id from 164.
    pub fn custom_num_fmts(&self) -> Vec<NumFmt> {
        self.num_fmts.iter().map(|(code, id)| NumFmt { id: *id, code: Some(code.clone()) }).collect()
    }

    pub fn styles(&self) -> &[CellStyle] {
        &self.style_components
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
