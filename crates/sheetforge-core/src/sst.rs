//! Shared string table runtime: dedup key, total/unique counters, and the
//! inline-vs-SST heuristic.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use crate::value::TextRun;

/// Below this many string cells, inline strings are always used — the SST
/// indirection isn't worth a separate part for a handful of cells.
pub const SST_MIN_CELLS: u32 = 10;

/// Minimum duplicate ratio, `(total - unique) / total`, required to prefer
/// an SST over inline strings once [`SST_MIN_CELLS`] is exceeded.
pub const SST_MIN_DEDUP_RATIO: f64 = 0.20;

/// A shared-string entry: either plain text or a run of rich text.
#[derive(Debug, Clone, PartialEq)]
pub enum SharedString {
    Plain(String),
    Rich(Vec<TextRun>),
}

impl SharedString {
    /// Two entries share a key only when they'd render identically: plain
    /// text and rich text whose runs carry no actual formatting collapse
    /// together, but a bold/italic/colored/sized run never collapses with
    /// plain text or with a run formatted differently, since the SST entry
    /// itself carries that formatting and a merge would corrupt it.
    fn dedup_key(&self) -> String {
        match self {
            SharedString::Plain(s) => format!("P:{}", s.nfc().collect::<String>()),
            SharedString::Rich(runs) if runs.iter().all(TextRun::is_unformatted) => {
                let text: String = runs.iter().map(|r| r.text.as_str()).collect();
                format!("P:{}", text.nfc().collect::<String>())
            }
            SharedString::Rich(runs) => {
                let mut key = String::from("R:");
                for r in runs {
                    key.push_str(&format!(
                        "{}\u{1}{}\u{1}{}\u{1}{:?}\u{1}{:?}\u{1}{:?}\u{2}",
                        r.text, r.bold, r.italic, r.font_name, r.size, r.color_rgb
                    ));
                }
                key.nfc().collect()
            }
        }
    }
}

/// A unique-id handle into a [`SharedStringTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(pub u32);

/// Append-only, deduplicating table of shared strings with precise
/// `total`/`unique` bookkeeping: `total` is the number of cell instances
/// referencing a string (including repeats), `unique` is `entries.len()`.
#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    entries: Vec<SharedString>,
    by_key: HashMap<String, u32>,
    total: u32,
}

impl SharedStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a use of `value`, returning its [`StringId`]. Always
    /// increments `total`; only increments `unique` on a new entry.
    pub fn intern(&mut self, value: SharedString) -> StringId {
        self.total += 1;
        let key = value.dedup_key();
        if let Some(&id) = self.by_key.get(&key) {
            return StringId(id);
        }
        let id = self.entries.len() as u32;
        self.by_key.insert(key, id);
        self.entries.push(value);
        StringId(id)
    }

    pub fn get(&self, id: StringId) -> Option<&SharedString> {
        self.entries.get(id.0 as usize)
    }

    pub fn unique_count(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn total_count(&self) -> u32 {
        self.total
    }

    pub fn entries(&self) -> &[SharedString] {
        &self.entries
    }

    /// Whether this table's usage pattern justifies writing `sharedStrings.xml`
    /// at all, per the pinned heuristic: more than [`SST_MIN_CELLS`] string
    /// cells total, and a duplicate ratio of at least [`SST_MIN_DEDUP_RATIO`].
    pub fn should_use_sst(&self) -> bool {
        should_use_sst(self.total, self.unique_count())
    }
}

/// Standalone predicate so codecs can evaluate the heuristic against counts
/// gathered during a scan pass, without needing a live table.
pub fn should_use_sst(total: u32, unique: u32) -> bool {
    if total <= SST_MIN_CELLS {
        return false;
    }
    let dup_ratio = (total - unique) as f64 / total as f64;
    dup_ratio >= SST_MIN_DEDUP_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_text_twice_bumps_total_not_unique() {
        let mut sst = SharedStringTable::new();
        let a = sst.intern(SharedString::Plain("hello".into()));
        let b = sst.intern(SharedString::Plain("hello".into()));
        assert_eq!(a, b);
        assert_eq!(sst.total_count(), 2);
        assert_eq!(sst.unique_count(), 1);
    }

    #[test]
    fn distinct_strings_each_get_their_own_id() {
        let mut sst = SharedStringTable::new();
        let a = sst.intern(SharedString::Plain("a".into()));
        let b = sst.intern(SharedString::Plain("b".into()));
        assert_ne!(a, b);
        assert_eq!(sst.total_count(), 2);
        assert_eq!(sst.unique_count(), 2);
    }

    #[test]
    fn dedup_key_is_nfc_normalized() {
        let mut sst = SharedStringTable::new();
        // "e" + combining acute vs precomposed "é" should collapse together.
        let decomposed = "e\u{0301}".to_string();
        let precomposed = "\u{00e9}".to_string();
        let a = sst.intern(SharedString::Plain(decomposed));
        let b = sst.intern(SharedString::Plain(precomposed));
        assert_eq!(a, b);
        assert_eq!(sst.unique_count(), 1);
    }

    #[test]
    fn sst_heuristic_requires_both_min_cells_and_dedup_ratio() {
        // 11 cells, 11 unique: over the count floor but 0% dedup -> inline.
        assert!(!should_use_sst(11, 11));
        // 10 cells, any dedup: at the floor, not over it -> inline.
        assert!(!should_use_sst(10, 1));
        // 11 cells, 8 unique: dedup ratio 3/11 = 0.27 >= 0.20 -> SST.
        assert!(should_use_sst(11, 8));
        // 11 cells, 10 unique: dedup ratio 1/11 = 0.09 < 0.20 -> inline.
        assert!(!should_use_sst(11, 10));
    }

    #[test]
    fn rich_text_dedup_key_ignores_run_boundaries() {
        let mut sst = SharedStringTable::new();
        let a = sst.intern(SharedString::Rich(vec![
            TextRun::plain("Hello, "),
            TextRun::plain("world"),
        ]));
        let b = sst.intern(SharedString::Plain("Hello, world".into()));
        assert_eq!(a, b);
    }
}
