//! Testing utilities for zalign.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::FrequencyBand;
use crate::focus::BandpassFilter;
use crate::plane::Plane;
use crate::tile::TileId;
use crate::volume::{Volume, VolumeDimensions, VolumeLoader};

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Curves
// ============================================================================

/// Gaussian bump sampled at `0..len`.
pub fn gaussian_curve(len: usize, center: f32, sigma: f32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let d = i as f32 - center;
            (-d * d / (2.0 * sigma * sigma)).exp()
        })
        .collect()
}

// ============================================================================
// Volumes
// ============================================================================

/// Passes the slice through untouched, so the focus value is the entropy of
/// the raw intensities.
pub struct IdentityFilter;

impl BandpassFilter for IdentityFilter {
    fn filter(&self, plane: &Plane, _band: FrequencyBand) -> Plane {
        plane.clone()
    }
}

/// Number of distinct intensity levels in slice `z` of a tile focused at
/// `focus`. Peaks at `focus` and falls to 2 far from it.
pub fn focus_levels(z: usize, focus: f32) -> usize {
    let d = z as f32 - focus;
    2 + (60.0 * (-d * d / (2.0 * 4.0 * 4.0)).exp()).round() as usize
}

/// Plane cycling through `levels` evenly spaced values in `[1, 2]`. Both ends
/// are always present, so every such plane shares the same value range.
pub fn level_plane(width: usize, height: usize, levels: usize) -> Plane {
    assert!(levels >= 2);
    let pixels = (0..width * height)
        .map(|p| 1.0 + (p % levels) as f32 / (levels - 1) as f32)
        .collect();
    Plane::new(width, height, pixels)
}

/// Volume whose entropy curve under [`IdentityFilter`] peaks at slice `focus`.
/// Volumes built with integer-different foci have exactly shifted curves as
/// long as the peak stays well inside the stack.
pub fn level_volume(width: usize, height: usize, depth: usize, focus: f32) -> Volume {
    let planes: Vec<Plane> = (0..depth)
        .map(|z| level_plane(width, height, focus_levels(z, focus)))
        .collect();
    Volume::from_planes(&planes)
}

/// Seeded random texture that gets blurrier with distance from `focus`.
pub fn textured_volume(width: usize, height: usize, depth: usize, focus: f32, seed: u64) -> Volume {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let sharp: Vec<f32> = (0..width * height)
        .map(|_| rng.random_range(0.0..1000.0))
        .collect();

    let dims = VolumeDimensions::new(width, height, depth);
    let mut volume = Volume::zeros(dims);
    for z in 0..depth {
        let radius = (z as f32 - focus).abs().round() as usize;
        let blurred = box_blur(&sharp, width, height, radius);
        volume.slice_mut(z).copy_from_slice(&blurred);
    }
    volume
}

fn box_blur(src: &[f32], width: usize, height: usize, radius: usize) -> Vec<f32> {
    if radius == 0 {
        return src.to_vec();
    }
    let r = radius as isize;
    let mut out = vec![0.0; src.len()];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let mut sum = 0.0;
            let mut count = 0.0;
            for dy in -r..=r {
                for dx in -r..=r {
                    let (sx, sy) = (x + dx, y + dy);
                    if sx >= 0 && sy >= 0 && sx < width as isize && sy < height as isize {
                        sum += src[sy as usize * width + sx as usize];
                        count += 1.0;
                    }
                }
            }
            out[y as usize * width + x as usize] = sum / count;
        }
    }
    out
}

/// Mosaic stack with `columns x rows` level-volume tiles. Tile `i` is focused
/// at `focus(i)`. With `mirrored`, the stack is stored flipped left to right,
/// the way a mirrored camera would record it.
pub fn mosaic_stack(
    columns: usize,
    rows: usize,
    tile_size: usize,
    depth: usize,
    mirrored: bool,
    focus: impl Fn(usize) -> f32,
) -> Volume {
    let width = columns * tile_size;
    let height = rows * tile_size;
    let dims = VolumeDimensions::new(width, height, depth);
    let mut stack = Volume::zeros(dims);
    for tile in 0..columns * rows {
        let tile_volume = level_volume(tile_size, tile_size, depth, focus(tile));
        let (column, row) = (tile % columns, tile / columns);
        for z in 0..depth {
            let src = tile_volume.slice(z);
            let dst = stack.slice_mut(z);
            for y in 0..tile_size {
                for x in 0..tile_size {
                    let sx = if mirrored {
                        width - 1 - (column * tile_size + x)
                    } else {
                        column * tile_size + x
                    };
                    dst[(row * tile_size + y) * width + sx] = src[y * tile_size + x];
                }
            }
        }
    }
    stack
}

// ============================================================================
// Loader
// ============================================================================

/// In-memory stacks keyed by channel tag. Counts how often each channel is
/// loaded.
#[derive(Default)]
pub struct MemoryLoader {
    pub stacks: HashMap<String, Volume>,
    pub dark_counts: HashMap<String, Plane>,
    loads: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack(mut self, channel: &str, stack: Volume) -> Self {
        self.stacks.insert(channel.to_string(), stack);
        self
    }

    pub fn with_dark_count(mut self, channel: &str, dark: Plane) -> Self {
        self.dark_counts.insert(channel.to_string(), dark);
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl VolumeLoader for MemoryLoader {
    fn load_stack(&self, tile: &TileId) -> io::Result<Volume> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.stacks.get(&tile.channel).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no stack for channel {}", tile.channel),
            )
        })
    }

    fn load_dark_count(&self, tile: &TileId) -> io::Result<Option<Plane>> {
        Ok(self.dark_counts.get(&tile.channel).cloned())
    }
}

/// `count` tile ids of one channel in one directory.
pub fn tile_ids(base_dir: &std::path::Path, channel: &str, count: usize) -> Vec<TileId> {
    (0..count)
        .map(|i| TileId::new(base_dir, "run1", channel, i))
        .collect()
}
