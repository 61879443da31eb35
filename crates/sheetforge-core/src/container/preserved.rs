//! Lazy, cached access to container parts this core does not interpret —
//! charts, drawings, pivot tables, theme, VML comments, `vbaProject.bin`,
//! and anything else the workbook/worksheet/styles/SST codecs never touch.
//!
//! The surgical writer (`super::writer::write_surgical`) copies these parts
//! forward by streaming straight from the source archive and never goes
//! through this store; it exists for callers who want to *inspect* an
//! opaque part (say, to hand `xl/charts/chart1.xml`'s bytes to a separate
//! charting library) without reopening the file themselves. Each part is
//! decompressed at most once per `SourceContext`, regardless of how many
//! times it's requested.

use std::io::{Cursor, Read as _};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{Error, Result};

/// Re-opens the source ZIP on demand to fetch a named part's raw bytes,
/// caching each lookup in a concurrent map so repeated access from multiple
/// threads never pays the decompression cost twice for the same part.
#[derive(Debug, Default)]
pub struct PreservedPartStore {
    source_bytes: Option<Arc<Vec<u8>>>,
    manifest: Vec<String>,
    cache: DashMap<String, Arc<Vec<u8>>>,
}

impl Clone for PreservedPartStore {
    fn clone(&self) -> Self {
        // The cache is a lookup-time optimization, not part of a
        // `SourceContext`'s identity; a clone starts cold and re-populates
        // itself from the same source bytes on next access.
        PreservedPartStore {
            source_bytes: self.source_bytes.clone(),
            manifest: self.manifest.clone(),
            cache: DashMap::new(),
        }
    }
}

impl PreservedPartStore {
    pub fn new(source_bytes: Arc<Vec<u8>>, manifest: Vec<String>) -> Self {
        PreservedPartStore { source_bytes: Some(source_bytes), manifest, cache: DashMap::new() }
    }

    /// A store with no backing archive, for workbooks built from scratch.
    pub fn empty() -> Self {
        PreservedPartStore { source_bytes: None, manifest: Vec::new(), cache: DashMap::new() }
    }

    /// Every part name present in the source container's manifest, known or
    /// not. Callers typically filter this against the part names the
    /// workbook/styles/SST/worksheet codecs already understand to find the
    /// genuinely opaque parts.
    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    /// Fetches a part's raw bytes, decompressing from the source archive on
    /// first access and serving every later call for the same name from
    /// cache. Returns [`Error::PartNotFound`] if there is no source archive
    /// or the name isn't present in it.
    pub fn get(&self, name: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(hit) = self.cache.get(name) {
            return Ok(hit.clone());
        }
        let source = self.source_bytes.as_ref().ok_or_else(|| Error::PartNotFound(name.to_string()))?;
        let mut archive = zip::ZipArchive::new(Cursor::new(source.as_slice()))?;
        let mut file = archive.by_name(name).map_err(|_| Error::PartNotFound(name.to_string()))?;
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        let bytes = Arc::new(buf);
        self.cache.insert(name.to_string(), bytes.clone());
        Ok(bytes)
    }
}
