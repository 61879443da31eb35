//! Hardening checks applied to a ZIP archive before any entry is inflated.
//!
//! These guard against the standard zip-bomb family of attacks: an archive
//! with an absurd entry count, a single entry that inflates to gigabytes, or
//! an entry whose compressed-to-uncompressed ratio is implausible for real
//! XML/text content. Every check runs against ZIP central-directory metadata
//! alone, so a hostile archive is rejected before a single byte of entry
//! data is read.
//!
//! `quick_xml` has no DTD or entity-expansion machinery, so a `<!DOCTYPE`
//! declaration can never trigger billion-laughs-style expansion the way it
//! would against a DTD-aware parser. It is still rejected outright: a
//! DOCTYPE has no legitimate role in any OOXML part, and letting one
//! through silently would mean two XML parsers in the wild (this one and
//! whatever opens the file next) can disagree about what the document
//! means.

use crate::config::ReaderLimits;
use crate::error::{Error, Result};

/// Rejects a part whose raw bytes contain a `<!DOCTYPE` declaration,
/// checked before the bytes are handed to `quick_xml`.
pub fn reject_doctype(part_bytes: &[u8]) -> Result<()> {
    if contains_doctype(part_bytes) {
        return Err(Error::UnsafeXml);
    }
    Ok(())
}

fn contains_doctype(bytes: &[u8]) -> bool {
    const NEEDLE: &[u8] = b"<!DOCTYPE";
    bytes.windows(NEEDLE.len()).any(|w| w.eq_ignore_ascii_case(NEEDLE))
}

pub fn check_entry_count(count: usize, limits: &ReaderLimits) -> Result<()> {
    if count > limits.max_entry_count {
        return Err(Error::TooManyEntries(limits.max_entry_count));
    }
    Ok(())
}

/// Rejects absolute paths and `..` traversal segments, mirroring the classic
/// zip-slip vulnerability class.
pub fn check_entry_path(name: &str) -> Result<()> {
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(Error::UnsafeEntryPath(name.to_string()));
    }
    if name.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(Error::UnsafeEntryPath(name.to_string()));
    }
    Ok(())
}

pub fn check_entry_size(name: &str, uncompressed_size: u64, limits: &ReaderLimits) -> Result<()> {
    if uncompressed_size > limits.max_uncompressed_entry_bytes {
        return Err(Error::EntryTooLarge(name.to_string(), limits.max_uncompressed_entry_bytes));
    }
    Ok(())
}

/// Rejects an entry whose uncompressed size dwarfs its compressed size by
/// more than `limits.max_compression_ratio`. Stored (uncompressed) entries
/// and tiny entries are exempt, since ratio math is meaningless near zero.
pub fn check_compression_ratio(
    name: &str,
    compressed_size: u64,
    uncompressed_size: u64,
    limits: &ReaderLimits,
) -> Result<()> {
    if compressed_size == 0 || uncompressed_size < 4096 {
        return Ok(());
    }
    let ratio = uncompressed_size / compressed_size.max(1);
    if ratio > limits.max_compression_ratio {
        return Err(Error::SuspiciousCompressionRatio(name.to_string()));
    }
    Ok(())
}

/// Runs every structural check against an opened archive's central
/// directory, before any entry is decompressed.
pub fn validate_archive<R: std::io::Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    limits: &ReaderLimits,
) -> Result<()> {
    check_entry_count(archive.len(), limits)?;
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        check_entry_path(entry.name())?;
        check_entry_size(entry.name(), entry.size(), limits)?;
        check_compression_ratio(entry.name(), entry.compressed_size(), entry.size(), limits)?;
    }
    Ok(())
}
