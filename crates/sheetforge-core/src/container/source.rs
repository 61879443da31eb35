//! Tracks the relationship between an in-memory [`crate::workbook::Workbook`]
//! and the `.xlsx` container it was read from, so a subsequent write can
//! choose the cheapest strategy that still produces a correct result.

use std::collections::HashSet;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::preserved::PreservedPartStore;

/// A SHA-256 fingerprint of a container's raw bytes, used to detect whether
/// the bytes a [`SourceContext`] was built from are still the ones about to
/// be overwritten (relevant only to callers that reopen a path between read
/// and write; in-memory round-trips always match by construction).
pub fn fingerprint(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Records which parts of a workbook have changed since it was read, so the
/// container writer can tell a no-op save (verbatim copy) apart from a
/// targeted edit (surgical write) and a structural change (full rewrite).
#[derive(Debug, Clone, Default)]
pub struct ModificationTracker {
    dirty_sheets: HashSet<String>,
    styles_dirty: bool,
    strings_dirty: bool,
    structural_change: bool,
}

impl ModificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_sheet_dirty(&mut self, name: &str) {
        self.dirty_sheets.insert(name.to_string());
    }

    pub fn mark_styles_dirty(&mut self) {
        self.styles_dirty = true;
    }

    pub fn mark_strings_dirty(&mut self) {
        self.strings_dirty = true;
    }

    /// Marks a sheet added, removed, or renamed: any of these invalidates
    /// the part manifest itself, not just a part's content, and forces a
    /// full regeneration regardless of how few sheets actually changed.
    pub fn mark_structural_change(&mut self) {
        self.structural_change = true;
    }

    pub fn is_clean(&self) -> bool {
        !self.structural_change && !self.styles_dirty && !self.strings_dirty && self.dirty_sheets.is_empty()
    }

    pub fn has_structural_change(&self) -> bool {
        self.structural_change
    }

    pub fn is_sheet_dirty(&self, name: &str) -> bool {
        self.structural_change || self.styles_dirty || self.strings_dirty || self.dirty_sheets.contains(name)
    }

    /// Whether the styles or shared-string tables themselves need
    /// regenerating. Both interners are append-only, so a plain cell-value
    /// edit that registers no new style or string leaves every other
    /// worksheet's style/string references valid and a surgical write can
    /// still reuse `styles.xml`/`sharedStrings.xml` untouched.
    pub fn tables_dirty(&self) -> bool {
        self.structural_change || self.styles_dirty || self.strings_dirty
    }
}

/// Everything a write needs to know about the container a workbook came
/// from, to decide between a verbatim copy, a surgical write, or a full
/// regeneration. Absence of a `SourceContext` (a workbook built from
/// scratch, never read from a container) always forces full regeneration.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// The original container bytes, kept alive so untouched parts can be
    /// copied forward without reopening a file handle.
    source_bytes: Arc<Vec<u8>>,
    content_sha256: [u8; 32],
    part_manifest: Vec<String>,
    tracker: ModificationTracker,
    preserved: PreservedPartStore,
}

impl SourceContext {
    pub fn new(source_bytes: Arc<Vec<u8>>, part_manifest: Vec<String>) -> Self {
        let content_sha256 = fingerprint(&source_bytes);
        let preserved = PreservedPartStore::new(source_bytes.clone(), part_manifest.clone());
        SourceContext { source_bytes, content_sha256, part_manifest, tracker: ModificationTracker::new(), preserved }
    }

    /// Lazy, cached access to parts this core doesn't interpret (charts,
    /// drawings, theme, `vbaProject.bin`, ...). See
    /// [`PreservedPartStore`] for the caching contract.
    pub fn preserved_parts(&self) -> &PreservedPartStore {
        &self.preserved
    }

    pub fn source_bytes(&self) -> &Arc<Vec<u8>> {
        &self.source_bytes
    }

    pub fn content_sha256(&self) -> &[u8; 32] {
        &self.content_sha256
    }

    pub fn part_manifest(&self) -> &[String] {
        &self.part_manifest
    }

    pub fn tracker(&self) -> &ModificationTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ModificationTracker {
        &mut self.tracker
    }

    /// Whether `current_bytes` still matches the bytes this context was
    /// built from. A mismatch means something else wrote to the same
    /// handle between read and write, and forces full regeneration.
    pub fn fingerprint_matches(&self, current_bytes: &[u8]) -> bool {
        fingerprint(current_bytes) == self.content_sha256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tracker_is_clean() {
        assert!(ModificationTracker::new().is_clean());
    }

    #[test]
    fn marking_a_sheet_dirty_only_dirties_that_sheet() {
        let mut t = ModificationTracker::new();
        t.mark_sheet_dirty("Sheet1");
        assert!(!t.is_clean());
        assert!(t.is_sheet_dirty("Sheet1"));
        assert!(!t.is_sheet_dirty("Sheet2"));
    }

    #[test]
    fn structural_change_dirties_every_sheet() {
        let mut t = ModificationTracker::new();
        t.mark_structural_change();
        assert!(t.is_sheet_dirty("AnySheet"));
        assert!(t.has_structural_change());
    }

    #[test]
    fn styles_dirty_forces_every_sheet_dirty_since_indices_shift() {
        let mut t = ModificationTracker::new();
        t.mark_styles_dirty();
        assert!(t.is_sheet_dirty("Sheet1"));
        assert!(t.tables_dirty());
    }

    #[test]
    fn fingerprint_is_stable_for_identical_bytes() {
        let a = fingerprint(b"hello world");
        let b = fingerprint(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_for_different_bytes() {
        assert_ne!(fingerprint(b"hello"), fingerprint(b"world"));
    }

    #[test]
    fn source_context_detects_fingerprint_mismatch() {
        let ctx = SourceContext::new(Arc::new(b"original".to_vec()), vec!["xl/workbook.xml".to_string()]);
        assert!(ctx.fingerprint_matches(b"original"));
        assert!(!ctx.fingerprint_matches(b"modified"));
    }
}
