//! Configuration types for z-alignment.
//!
//! Every tunable of the pipeline lives here, grouped by stage. All structs
//! deserialize from JSON with missing fields falling back to their defaults,
//! so a config file only needs to name what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

// =============================================================================
// Focus measure
// =============================================================================

/// Radial band of the 2D spectrum kept by the bandpass filter, in frequency
/// bins from DC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low: f32,
    pub high: f32,
}

impl Default for FrequencyBand {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: 90.0,
        }
    }
}

impl FrequencyBand {
    #[inline]
    pub fn contains(&self, radius: f32) -> bool {
        radius >= self.low && radius <= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Histogram bins for the per-slice entropy.
    pub histogram_bins: usize,
    pub band: FrequencyBand,
    /// Gaussian smoothing along Z applied before the focus measure.
    /// 0 disables smoothing.
    pub sigma_z: f32,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 256,
            band: FrequencyBand::default(),
            sigma_z: 1.0,
        }
    }
}

impl FocusConfig {
    pub fn validate(&self) {
        assert!(
            self.histogram_bins >= 2,
            "histogram_bins must be at least 2, got {}",
            self.histogram_bins
        );
        assert!(
            self.band.low >= 0.0 && self.band.high > self.band.low,
            "frequency band must satisfy 0 <= low < high, got [{}, {}]",
            self.band.low,
            self.band.high
        );
        assert!(
            self.sigma_z.is_finite() && self.sigma_z >= 0.0,
            "sigma_z must be finite and non-negative, got {}",
            self.sigma_z
        );
    }
}

// =============================================================================
// 1D alignment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Divisor applied to the step between search levels.
    pub step_size: f32,
    /// The search stops once the step drops to this size.
    pub min_precision: f32,
    /// Lanczos kernel radius used to resample the template.
    pub lanczos_radius: usize,
    /// Percentile of the template used for taps outside its domain.
    pub floor_percentile: f32,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            step_size: 1.4,
            min_precision: 0.1,
            lanczos_radius: 5,
            floor_percentile: 0.02,
        }
    }
}

impl AlignConfig {
    pub fn validate(&self) {
        assert!(
            self.step_size > 1.0,
            "step_size must be > 1, got {}",
            self.step_size
        );
        assert!(
            self.min_precision > 0.0,
            "min_precision must be positive, got {}",
            self.min_precision
        );
        assert!(
            self.lanczos_radius >= 1,
            "lanczos_radius must be at least 1, got {}",
            self.lanczos_radius
        );
        assert!(
            (0.0..=1.0).contains(&self.floor_percentile),
            "floor_percentile must be in [0, 1], got {}",
            self.floor_percentile
        );
    }
}

// =============================================================================
// Outlier rejection
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Vertical distance from the line under which an offset is an inlier.
    pub epsilon: f64,
    pub min_inlier_ratio: f64,
    /// Random hypotheses drawn when the pair count is too large to enumerate.
    pub max_iterations: usize,
    pub seed: u64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.2,
            min_inlier_ratio: 0.5,
            max_iterations: 100,
            seed: 0,
        }
    }
}

impl OutlierConfig {
    pub fn validate(&self) {
        assert!(
            self.epsilon > 0.0,
            "outlier epsilon must be positive, got {}",
            self.epsilon
        );
        assert!(
            self.min_inlier_ratio > 0.0 && self.min_inlier_ratio <= 1.0,
            "min_inlier_ratio must be in (0, 1], got {}",
            self.min_inlier_ratio
        );
        assert!(
            self.max_iterations > 0,
            "outlier max_iterations must be positive, got {}",
            self.max_iterations
        );
    }
}

// =============================================================================
// Global solve
// =============================================================================

/// Which tile is pinned at Z = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferenceTile {
    /// The first tile whose tile index is the median of the distinct indices.
    #[default]
    Center,
    /// Position in the input tile list.
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub reference: ReferenceTile,
    /// Reweighting rounds. Each round after the first downweights constraints
    /// with large residuals.
    pub rounds: usize,
    /// Relaxation sweeps per round.
    pub max_iterations: usize,
    /// A round stops once the largest residual falls below this.
    pub convergence_threshold: f64,
    /// A round also stops once no position moves by more than this.
    pub min_update: f64,
    /// Huber threshold for reweighting. `None` keeps every weight at 1.
    pub huber_delta: Option<f64>,
    /// Largest residual still reported as converged.
    pub max_allowed_error: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            reference: ReferenceTile::Center,
            rounds: 10,
            max_iterations: 1000,
            convergence_threshold: 1e-3,
            min_update: 1e-9,
            huber_delta: Some(2.0),
            max_allowed_error: 10.0,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) {
        assert!(self.rounds > 0, "solver rounds must be positive");
        assert!(
            self.max_iterations > 0,
            "solver max_iterations must be positive"
        );
        assert!(
            self.convergence_threshold > 0.0,
            "convergence_threshold must be positive, got {}",
            self.convergence_threshold
        );
        assert!(
            self.min_update >= 0.0,
            "min_update must be non-negative, got {}",
            self.min_update
        );
        if let Some(delta) = self.huber_delta {
            assert!(delta > 0.0, "huber_delta must be positive, got {}", delta);
        }
        assert!(
            self.max_allowed_error > 0.0,
            "max_allowed_error must be positive, got {}",
            self.max_allowed_error
        );
    }
}

// =============================================================================
// Input layout, caching and output
// =============================================================================

/// Layout of tiles inside one acquired stack. Tile `i` sits at column
/// `i % columns`, row `i / columns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicGrid {
    pub columns: usize,
    pub rows: usize,
}

impl Default for MosaicGrid {
    fn default() -> Self {
        Self {
            columns: 1,
            rows: 1,
        }
    }
}

impl MosaicGrid {
    pub fn new(columns: usize, rows: usize) -> Self {
        assert!(
            columns > 0 && rows > 0,
            "mosaic grid must be at least 1x1, got {}x{}",
            columns,
            rows
        );
        Self { columns, rows }
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.columns * self.rows
    }

    /// `(column, row)` of a tile.
    #[inline]
    pub fn cell(&self, tile_index: usize) -> (usize, usize) {
        (tile_index % self.columns, tile_index / self.columns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CachePolicy {
    /// Reuse cached focus curves and write missing ones.
    #[default]
    ReadWrite,
    /// Recompute every curve and overwrite the cache.
    Refresh,
    /// Neither read nor write the cache.
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub policy: CachePolicy,
    /// Where curve files go. `None` places them in each tile's base directory.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the positions file and the pairwise log.
    /// `None` writes nothing.
    pub directory: Option<PathBuf>,
    /// Also write reference and aligned template series for every pair.
    pub pair_diagnostics: bool,
}

// =============================================================================
// Top-level configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mosaic: MosaicGrid,
    pub focus: FocusConfig,
    pub align: AlignConfig,
    pub outlier: OutlierConfig,
    pub solver: SolverConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load a JSON config. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate();
        Ok(config)
    }

    pub fn validate(&self) {
        assert!(
            self.mosaic.columns > 0 && self.mosaic.rows > 0,
            "mosaic grid must be at least 1x1"
        );
        self.focus.validate();
        self.align.validate();
        self.outlier.validate();
        self.solver.validate();
    }
}
