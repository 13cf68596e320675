//! Consensus filtering of a tile's pairwise offsets.
//!
//! Seen from one source tile, the offsets to the other tiles plotted against
//! the target's mosaic index are expected to lie on a line. Offsets that a
//! RANSAC line fit rejects are dropped before the global solve.

mod line;
pub mod ransac;


pub use line::{LineEstimator, LineModel};
pub use ransac::{ransac, Estimator, RansacOptions, RansacResult};

use crate::config::OutlierConfig;
use crate::tile::{PairwiseOffset, Tile};

/// Keep only the offsets consistent with the best line through
/// `(target_tile_index, offset)`. Returns how many were removed.
///
/// When no line reaches the inlier ratio, or there are fewer than two
/// offsets, the whole list is cleared.
pub fn remove_outliers(offsets: &mut Vec<PairwiseOffset>, config: &OutlierConfig) -> usize {
    let before = offsets.len();
    if before == 0 {
        return 0;
    }

    let points: Vec<(f64, f64)> = offsets
        .iter()
        .map(|o| (o.target_tile_index as f64, o.offset as f64))
        .collect();
    let options = RansacOptions {
        max_iterations: config.max_iterations,
        inlier_threshold: config.epsilon,
        min_inlier_ratio: config.min_inlier_ratio,
        seed: config.seed,
    };

    let Some(result) = ransac::<LineEstimator>(&points, &options) else {
        tracing::debug!(offsets = before, "No line consensus, dropping all offsets");
        offsets.clear();
        return before;
    };

    let mut keep = vec![false; before];
    for &i in &result.inliers {
        keep[i] = true;
    }
    let mut flags = keep.into_iter();
    offsets.retain(|_| flags.next().unwrap_or(false));

    tracing::trace!(
        slope = result.model.slope,
        intercept = result.model.intercept,
        inliers = offsets.len(),
        "Line consensus"
    );
    before - offsets.len()
}

/// Offsets removed across a tile set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutlierStats {
    pub same_channel_removed: usize,
    pub same_channel_total: usize,
    pub other_channel_removed: usize,
    pub other_channel_total: usize,
}

/// Filter the same-channel and cross-channel lists of every tile
/// independently.
pub fn filter_tile_offsets(tiles: &mut [Tile], config: &OutlierConfig) -> OutlierStats {
    let mut stats = OutlierStats::default();
    for tile in tiles.iter_mut() {
        stats.same_channel_total += tile.same_channel.len();
        stats.other_channel_total += tile.other_channel.len();
        let same = remove_outliers(&mut tile.same_channel, config);
        let other = remove_outliers(&mut tile.other_channel, config);
        stats.same_channel_removed += same;
        stats.other_channel_removed += other;
        if same + other > 0 {
            tracing::debug!(
                tile = %tile.id,
                same_channel_removed = same,
                other_channel_removed = other,
                "Removed inconsistent offsets"
            );
        }
    }
    tracing::info!(
        same_channel_removed = stats.same_channel_removed,
        same_channel_total = stats.same_channel_total,
        other_channel_removed = stats.other_channel_removed,
        other_channel_total = stats.other_channel_total,
        "Outlier filtering complete"
    );
    stats
}
