//! Tile identity and per-tile alignment state.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Horizontal flip applied to a channel's stack before tiles are cut out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mirroring {
    #[default]
    None,
    Horizontal,
}

/// Identifies one tile of one channel of one acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    pub base_dir: PathBuf,
    pub local_dir: String,
    /// Channel tag, e.g. `GFP`.
    pub channel: String,
    /// Position of the tile in the mosaic.
    pub tile_index: usize,
    pub mirroring: Mirroring,
}

impl TileId {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        local_dir: impl Into<String>,
        channel: impl Into<String>,
        tile_index: usize,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            local_dir: local_dir.into(),
            channel: channel.into(),
            tile_index,
            mirroring: Mirroring::None,
        }
    }

    pub fn mirrored(mut self, mirroring: Mirroring) -> Self {
        self.mirroring = mirroring;
        self
    }

    /// `{channel}_{local_dir}_{tile_index}`, used in every output file.
    pub fn full_name(&self) -> String {
        format!("{}_{}_{}", self.channel, self.local_dir, self.tile_index)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.channel, self.local_dir, self.tile_index)
    }
}

/// Measured relative Z offset from one tile to another.
///
/// `offset` is the shift that, applied to the target's focus curve, best
/// matches the source's curve, i.e. `position(target) - position(source)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseOffset {
    /// Position of the source tile in the tile list.
    pub source: usize,
    /// Position of the target tile in the tile list.
    pub target: usize,
    /// Mosaic index of the target tile, the abscissa for outlier rejection.
    pub target_tile_index: usize,
    pub offset: f32,
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub id: TileId,
    /// Normalized and median-filtered focus curve. `None` if it could not be
    /// computed.
    pub curve: Option<Vec<f32>>,
    pub same_channel: Vec<PairwiseOffset>,
    pub other_channel: Vec<PairwiseOffset>,
    /// Solved Z position. `None` before solving or when unreachable from the
    /// reference tile.
    pub position: Option<f64>,
}

impl Tile {
    pub fn new(id: TileId) -> Self {
        Self {
            id,
            curve: None,
            same_channel: Vec::new(),
            other_channel: Vec::new(),
            position: None,
        }
    }

    pub fn with_curve(id: TileId, curve: Vec<f32>) -> Self {
        Self {
            curve: Some(curve),
            ..Self::new(id)
        }
    }

    #[inline]
    pub fn full_name(&self) -> String {
        self.id.full_name()
    }

    pub fn offsets(&self) -> impl Iterator<Item = &PairwiseOffset> {
        self.same_channel.iter().chain(self.other_channel.iter())
    }
}
