//! End-to-end z-alignment of a tile set.
//!
//! Stages run one after another, each finishing before the next starts:
//!
//! 1. focus curves: load (through the volume cache), preprocess, extract,
//!    normalize; or reuse the on-disk curve cache
//! 2. measurement graph: align every ordered pair of curves
//! 3. outlier filtering of each tile's offset lists
//! 4. global relaxation into one Z per tile
//!
//! A tile whose volume cannot be loaded is skipped with a warning and ends up
//! unresolved; the run itself only fails on an empty tile set, an invalid
//! reference or when results cannot be written.

mod results;


use std::io;
use std::path::Path;

pub use results::{
    pair_diagnostics_path, read_positions, write_pair_diagnostics, write_pair_log, write_positions,
    PAIR_LOG_FILE, POSITIONS_FILE,
};

use crate::align::prepare_curve;
use crate::cache::{CurveCache, VolumeCache};
use crate::config::Config;
use crate::error::Error;
use crate::focus::{focus_curve, BandpassFilter};
use crate::graph::build_measurement_graph;
use crate::outlier::{filter_tile_offsets, OutlierStats};
use crate::solver::{relax_tiles, resolve_reference, SolveResult};
use crate::tile::{Mirroring, PairwiseOffset, Tile, TileId};
use crate::volume::{Volume, VolumeLoader};

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct AlignmentReport {
    /// Tiles in input order, with curves, filtered offsets and positions.
    pub tiles: Vec<Tile>,
    /// Every measured pair, before outlier filtering.
    pub offsets: Vec<PairwiseOffset>,
    pub outliers: OutlierStats,
    pub solve: SolveResult,
    /// Input positions of tiles whose focus curve could not be produced.
    pub failed: Vec<usize>,
}

impl AlignmentReport {
    /// `(full_name, position)` per tile in input order.
    pub fn positions(&self) -> Vec<(String, Option<f64>)> {
        self.tiles
            .iter()
            .map(|t| (t.full_name(), t.position))
            .collect()
    }
}

/// Runs the alignment stages over tiles provided by a [`VolumeLoader`].
///
/// Owns the volume cache, so stacks loaded for one run are reused by later
/// runs on the same aligner.
pub struct ZAligner<'a, L: ?Sized, F: ?Sized> {
    config: Config,
    loader: &'a L,
    filter: &'a F,
    volumes: VolumeCache,
    curves: CurveCache,
}

impl<'a, L, F> ZAligner<'a, L, F>
where
    L: VolumeLoader + ?Sized,
    F: BandpassFilter + ?Sized,
{
    pub fn new(config: Config, loader: &'a L, filter: &'a F) -> Self {
        config.validate();
        let curves = CurveCache::new(config.cache.clone());
        Self {
            config,
            loader,
            filter,
            volumes: VolumeCache::new(),
            curves,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn volume_cache(&self) -> &VolumeCache {
        &self.volumes
    }

    /// Channel stack after dark-count subtraction and mirroring.
    fn load_channel_stack(&self, id: &TileId) -> io::Result<Volume> {
        let mut stack = self.loader.load_stack(id)?;
        if let Some(dark) = self.loader.load_dark_count(id)? {
            stack.subtract_dark_count(&dark);
        }
        if id.mirroring == Mirroring::Horizontal {
            stack.mirror_horizontal();
        }
        tracing::debug!(
            channel = %id.channel,
            width = stack.width(),
            height = stack.height(),
            depth = stack.depth(),
            "Loaded channel stack"
        );
        Ok(stack)
    }

    /// The tile's own volume, cut from its (cached) channel stack.
    pub fn tile_volume(&self, id: &TileId) -> io::Result<Volume> {
        let stack = self
            .volumes
            .get_or_load(&id.channel, || self.load_channel_stack(id))?;
        stack.extract_tile(self.config.mosaic, id.tile_index)
    }

    /// Normalized focus curve of a tile, from the curve cache when possible.
    pub fn tile_curve(&self, id: &TileId) -> Result<Vec<f32>, Error> {
        match self.curves.load(id) {
            Ok(Some(curve)) => {
                tracing::debug!(tile = %id, "Focus curve cache hit");
                return Ok(curve);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(tile = %id, error = %e, "Ignoring unreadable cached curve");
            }
        }

        let volume = self.tile_volume(id).map_err(|source| Error::Load {
            tile: id.full_name(),
            source,
        })?;
        let curve = prepare_curve(&focus_curve(&volume, self.filter, &self.config.focus));

        if let Err(e) = self.curves.store(id, &curve) {
            tracing::warn!(tile = %id, error = %e, "Failed to cache focus curve");
        }
        Ok(curve)
    }

    pub fn run(&self, ids: Vec<TileId>) -> Result<AlignmentReport, Error> {
        if ids.is_empty() {
            return Err(Error::EmptyTileSet);
        }
        let mut tiles: Vec<Tile> = ids.into_iter().map(Tile::new).collect();
        resolve_reference(&tiles, self.config.solver.reference)?;
        tracing::info!(tiles = tiles.len(), "Starting z-alignment");

        let mut failed = Vec::new();
        for (i, tile) in tiles.iter_mut().enumerate() {
            match self.tile_curve(&tile.id) {
                Ok(curve) => tile.curve = Some(curve),
                Err(e) => {
                    tracing::warn!(tile = %tile.id, error = %e, "Skipping tile");
                    failed.push(i);
                }
            }
        }
        tracing::info!(
            curves = tiles.len() - failed.len(),
            failed = failed.len(),
            "Focus curves ready"
        );

        let offsets = build_measurement_graph(&mut tiles, &self.config.align);
        let outliers = filter_tile_offsets(&mut tiles, &self.config.outlier);
        let solve = relax_tiles(&mut tiles, &self.config.solver)?;

        if let Some(dir) = &self.config.output.directory {
            self.write_outputs(dir, &tiles, &offsets)?;
        }

        Ok(AlignmentReport {
            tiles,
            offsets,
            outliers,
            solve,
            failed,
        })
    }

    fn write_outputs(
        &self,
        dir: &Path,
        tiles: &[Tile],
        offsets: &[PairwiseOffset],
    ) -> Result<(), Error> {
        std::fs::create_dir_all(dir).map_err(|source| Error::ResultIo {
            path: dir.to_path_buf(),
            source,
        })?;
        write_pair_log(&dir.join(PAIR_LOG_FILE), tiles, offsets)?;
        if self.config.output.pair_diagnostics {
            for o in offsets {
                write_pair_diagnostics(
                    dir,
                    &tiles[o.source],
                    &tiles[o.target],
                    o.offset,
                    &self.config.align,
                )?;
            }
        }
        let positions = dir.join(POSITIONS_FILE);
        write_positions(&positions, tiles)?;
        tracing::info!(path = %positions.display(), "Wrote tile positions");
        Ok(())
    }
}
