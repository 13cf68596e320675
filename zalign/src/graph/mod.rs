//! All-pairs measurement graph between tiles.
//!
//! Every ordered pair of tiles with a focus curve is aligned independently,
//! so A→B and B→A are two separate measurements. Pairs run in parallel on
//! read-only curves; results are gathered in a fixed order and then appended
//! to the source tile's same-channel or cross-channel list.

#[cfg(test)]
mod tests;

use rayon::prelude::*;

use crate::align::align_1d;
use crate::config::AlignConfig;
use crate::tile::{PairwiseOffset, Tile};

/// Offsets for every ordered pair `(source, target)`, `source != target`, of
/// tiles that have a non-empty curve. Ordered by source, then target.
pub fn measure_pairs(tiles: &[Tile], config: &AlignConfig) -> Vec<PairwiseOffset> {
    let measurable = |t: &Tile| t.curve.as_ref().is_some_and(|c| !c.is_empty());
    let pairs: Vec<(usize, usize)> = (0..tiles.len())
        .flat_map(|a| (0..tiles.len()).map(move |b| (a, b)))
        .filter(|&(a, b)| a != b && measurable(&tiles[a]) && measurable(&tiles[b]))
        .collect();

    pairs
        .par_iter()
        .filter_map(|&(a, b)| {
            let reference = tiles[a].curve.as_deref()?;
            let template = tiles[b].curve.as_deref()?;
            let offset = align_1d(reference, template, config);
            tracing::debug!(
                reference = %tiles[a].id,
                template = %tiles[b].id,
                offset,
                "Pairwise offset"
            );
            Some(PairwiseOffset {
                source: a,
                target: b,
                target_tile_index: tiles[b].id.tile_index,
                offset,
            })
        })
        .collect()
}

/// Append each offset to its source tile, split by channel.
pub fn assign_offsets(tiles: &mut [Tile], offsets: &[PairwiseOffset]) {
    for o in offsets {
        let same_channel = tiles[o.source].id.channel == tiles[o.target].id.channel;
        let source = &mut tiles[o.source];
        if same_channel {
            source.same_channel.push(*o);
        } else {
            source.other_channel.push(*o);
        }
    }
}

/// Measure all pairs and fill the per-tile offset lists. Returns the
/// measurements in pair order.
pub fn build_measurement_graph(tiles: &mut [Tile], config: &AlignConfig) -> Vec<PairwiseOffset> {
    let offsets = measure_pairs(tiles, config);
    assign_offsets(tiles, &offsets);
    tracing::info!(
        tiles = tiles.len(),
        pairs = offsets.len(),
        "Measurement graph built"
    );
    offsets
}
