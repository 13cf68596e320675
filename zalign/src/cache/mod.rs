//! Caches shared across the pipeline.
//!
//! - [`VolumeCache`]: in-memory channel stacks, so the stack holding all tiles
//!   of a channel is loaded and preprocessed once.
//! - [`CurveCache`]: focus curves persisted as text next to the data, keyed by
//!   the tile's full name.
//!
//! Curve file format:
//! ```text
//! entries\t{n}
//! {value_0}
//! ...
//! {value_n-1}
//! ```
//! A cached curve is reused whenever its file exists. Nothing records which
//! volume or settings produced it, so after changing either the cache has to
//! be refreshed with [`CachePolicy::Refresh`].


use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{CacheConfig, CachePolicy};
use crate::error::Error;
use crate::tile::TileId;
use crate::volume::Volume;

// ============================================================================
// Volume cache
// ============================================================================

/// Preprocessed channel stacks keyed by channel tag. A key is written once:
/// when two loads of the same key race, the first stored value is kept and
/// returned to both.
#[derive(Debug, Default)]
pub struct VolumeCache {
    stacks: RwLock<HashMap<String, Arc<Volume>>>,
}

impl VolumeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Volume>> {
        self.stacks.read().get(key).cloned()
    }

    /// Cached stack for `key`, running `load` on a miss. The lock is not held
    /// while loading.
    pub fn get_or_load<F>(&self, key: &str, load: F) -> io::Result<Arc<Volume>>
    where
        F: FnOnce() -> io::Result<Volume>,
    {
        if let Some(volume) = self.get(key) {
            return Ok(volume);
        }
        let volume = Arc::new(load()?);
        let mut stacks = self.stacks.write();
        Ok(Arc::clone(
            stacks.entry(key.to_string()).or_insert(volume),
        ))
    }

    pub fn len(&self) -> usize {
        self.stacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.read().is_empty()
    }

    pub fn clear(&self) {
        self.stacks.write().clear();
    }
}

// ============================================================================
// Curve cache
// ============================================================================

const ENTRIES_TAG: &str = "entries";

#[derive(Debug, Clone, Default)]
pub struct CurveCache {
    config: CacheConfig,
}

impl CurveCache {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn policy(&self) -> CachePolicy {
        self.config.policy
    }

    /// `tmp_{full_name}_entropies.txt` in the configured directory, or in the
    /// tile's base directory when none is configured.
    pub fn path_for(&self, tile: &TileId) -> PathBuf {
        let dir = self.config.directory.as_deref().unwrap_or(&tile.base_dir);
        dir.join(format!("tmp_{}_entropies.txt", tile.full_name()))
    }

    /// Cached curve for `tile`. `Ok(None)` on a miss or when the policy skips
    /// reading.
    pub fn load(&self, tile: &TileId) -> Result<Option<Vec<f32>>, Error> {
        if self.config.policy != CachePolicy::ReadWrite {
            return Ok(None);
        }
        let path = self.path_for(tile);
        if !path.exists() {
            return Ok(None);
        }
        read_curve_file(&path).map(Some)
    }

    /// Persist a curve unless caching is disabled.
    pub fn store(&self, tile: &TileId, curve: &[f32]) -> Result<(), Error> {
        if self.config.policy == CachePolicy::Disabled {
            return Ok(());
        }
        write_curve_file(&self.path_for(tile), curve)
    }
}

pub fn write_curve_file(path: &Path, curve: &[f32]) -> Result<(), Error> {
    let mut text = String::with_capacity(16 + curve.len() * 12);
    let _ = writeln!(text, "{}\t{}", ENTRIES_TAG, curve.len());
    for v in curve {
        let _ = writeln!(text, "{}", v);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::CacheIo {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, text).map_err(|source| Error::CacheIo {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_curve_file(path: &Path) -> Result<Vec<f32>, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::CacheIo {
        path: path.to_path_buf(),
        source,
    })?;
    let format_error = |reason: String| Error::CacheFormat {
        path: path.to_path_buf(),
        reason,
    };

    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| format_error("empty file".to_string()))?;
    let count = match header.split_once('\t') {
        Some((ENTRIES_TAG, n)) => n
            .trim()
            .parse::<usize>()
            .map_err(|e| format_error(format!("bad entry count '{}': {}", n, e)))?,
        _ => return Err(format_error(format!("bad header '{}'", header))),
    };

    let mut curve = Vec::new();
    for (i, line) in lines.filter(|l| !l.trim().is_empty()).enumerate() {
        let value = line
            .trim()
            .parse::<f32>()
            .map_err(|e| format_error(format!("bad value at entry {}: {}", i, e)))?;
        curve.push(value);
    }
    if curve.len() != count {
        return Err(format_error(format!(
            "expected {} entries, found {}",
            count,
            curve.len()
        )));
    }
    Ok(curve)
}
