//! zalign - Z-alignment of microscopy tiles from focus curves.
//!
//! Tiles of a mosaic acquisition are recorded as Z stacks whose focal planes
//! do not line up. This library estimates one Z position per tile:
//! - Focus curves: bandpassed Shannon entropy per slice
//! - Pairwise 1D alignment of curves with Lanczos resampling
//! - RANSAC line filtering of each tile's offsets
//! - Robust global relaxation around a reference tile
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use zalign::{Config, FftBandpass, TileId, ZAligner};
//!
//! let config = Config::from_file("zalign.json")?;
//! let filter = FftBandpass::new();
//! let aligner = ZAligner::new(config, &my_loader, &filter);
//!
//! let report = aligner.run(vec![
//!     TileId::new("/data", "run1", "GFP", 0),
//!     TileId::new("/data", "run1", "GFP", 1),
//! ])?;
//! for (name, z) in report.positions() {
//!     println!("{name}: {z:?}");
//! }
//! ```

pub mod align;
pub mod cache;
mod config;
mod error;
pub mod focus;
pub mod graph;
pub mod outlier;
mod pipeline;
mod plane;
pub mod solver;
mod tile;
pub mod volume;

#[cfg(test)]
pub mod testing;

// ============================================================================
// Configuration and errors
// ============================================================================

pub use config::{
    AlignConfig, CacheConfig, CachePolicy, Config, FocusConfig, FrequencyBand, MosaicGrid,
    OutlierConfig, OutputConfig, ReferenceTile, SolverConfig,
};
pub use error::Error;

// ============================================================================
// Data
// ============================================================================

pub use plane::Plane;
pub use tile::{Mirroring, PairwiseOffset, Tile, TileId};
pub use volume::{Volume, VolumeDimensions, VolumeLoader};

// ============================================================================
// Stages
// ============================================================================

pub use align::{align_1d, prepare_curve};
pub use focus::{focus_curve, BandpassFilter, FftBandpass};
pub use outlier::{filter_tile_offsets, OutlierStats};
pub use solver::{relax_tiles, SolveResult};

// ============================================================================
// Pipeline
// ============================================================================

pub use pipeline::{
    pair_diagnostics_path, read_positions, write_pair_diagnostics, write_pair_log, write_positions,
    AlignmentReport, ZAligner, PAIR_LOG_FILE, POSITIONS_FILE,
};
