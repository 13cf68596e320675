//! 3D intensity stacks and the preprocessing applied before the focus measure.
//!
//! A [`Volume`] is a dense `width x height x depth` stack of `f32` samples
//! stored slice after slice. Preprocessing mirrors what the acquisition needs:
//! dark-count subtraction, horizontal mirroring for flipped cameras, cutting a
//! tile out of a mosaic stack, and optional Gaussian smoothing along Z.


use std::io;

use common::parallel::ParChunksMutAuto;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::MosaicGrid;
use crate::plane::Plane;
use crate::tile::TileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeDimensions {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl VolumeDimensions {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    #[inline]
    pub fn plane_len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.plane_len() * self.depth
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    dims: VolumeDimensions,
    data: Vec<f32>,
}

impl Volume {
    pub fn from_data(dims: VolumeDimensions, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            dims.len(),
            "data length must equal width * height * depth"
        );
        Self { dims, data }
    }

    pub fn zeros(dims: VolumeDimensions) -> Self {
        Self {
            dims,
            data: vec![0.0; dims.len()],
        }
    }

    /// Stack of planes that all share the dimensions of the first one.
    pub fn from_planes(planes: &[Plane]) -> Self {
        let Some(first) = planes.first() else {
            return Self::zeros(VolumeDimensions::new(0, 0, 0));
        };
        let dims = VolumeDimensions::new(first.width(), first.height(), planes.len());
        let mut data = Vec::with_capacity(dims.len());
        for plane in planes {
            assert!(
                plane.width() == dims.width && plane.height() == dims.height,
                "all planes must be {}x{}",
                dims.width,
                dims.height
            );
            data.extend_from_slice(plane.pixels());
        }
        Self { dims, data }
    }

    #[inline]
    pub fn dims(&self) -> VolumeDimensions {
        self.dims
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.dims.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.dims.height
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.dims.depth
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        debug_assert!(x < self.dims.width && y < self.dims.height && z < self.dims.depth);
        self.data[z * self.dims.plane_len() + y * self.dims.width + x]
    }

    #[inline]
    pub fn slice(&self, z: usize) -> &[f32] {
        let len = self.dims.plane_len();
        &self.data[z * len..(z + 1) * len]
    }

    #[inline]
    pub fn slice_mut(&mut self, z: usize) -> &mut [f32] {
        let len = self.dims.plane_len();
        &mut self.data[z * len..(z + 1) * len]
    }

    /// Copy of slice `z` as a standalone plane.
    pub fn plane(&self, z: usize) -> Plane {
        Plane::new(self.dims.width, self.dims.height, self.slice(z).to_vec())
    }

    /// Smallest and largest finite sample, `None` if there is none.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data
            .par_iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(
                || None,
                |acc: Option<(f32, f32)>, v| match acc {
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                    None => Some((v, v)),
                },
            )
            .reduce(
                || None,
                |a, b| match (a, b) {
                    (Some((alo, ahi)), Some((blo, bhi))) => Some((alo.min(blo), ahi.max(bhi))),
                    (a, None) => a,
                    (None, b) => b,
                },
            )
    }

    /// Flip every slice left to right.
    pub fn mirror_horizontal(&mut self) {
        let width = self.dims.width;
        if width < 2 {
            return;
        }
        self.data
            .par_chunks_mut(width)
            .for_each(|row| row.reverse());
    }

    /// Subtract a dark-count frame from every slice, clamping at zero.
    ///
    /// Returns `false` and leaves the volume untouched when the frame's width
    /// or height differs from the volume's.
    pub fn subtract_dark_count(&mut self, dark: &Plane) -> bool {
        if dark.width() != self.dims.width || dark.height() != self.dims.height {
            tracing::warn!(
                volume_width = self.dims.width,
                volume_height = self.dims.height,
                dark_width = dark.width(),
                dark_height = dark.height(),
                "Dark-count frame size differs from volume, skipping subtraction"
            );
            return false;
        }
        let plane_len = self.dims.plane_len();
        if plane_len == 0 {
            return true;
        }
        let dark = dark.pixels();
        self.data
            .par_units_mut_auto(plane_len)
            .for_each(|(_, chunk)| {
                for slice in chunk.chunks_mut(plane_len) {
                    for (v, &d) in slice.iter_mut().zip(dark) {
                        *v = (*v - d).max(0.0);
                    }
                }
            });
        true
    }

    /// Cut tile `tile_index` out of a mosaic stack laid out as `grid`.
    /// Tile sizes are the integer division of the stack size by the grid.
    ///
    /// A 1x1 grid does not partition the stack, so every index gets the whole
    /// volume. On a larger grid an index past the last cell is an
    /// `InvalidInput` error.
    pub fn extract_tile(&self, grid: MosaicGrid, tile_index: usize) -> io::Result<Volume> {
        if grid.tile_count() == 1 {
            return Ok(self.clone());
        }
        if tile_index >= grid.tile_count() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "tile index {} out of range for a {}x{} mosaic",
                    tile_index, grid.columns, grid.rows
                ),
            ));
        }

        let tile_w = self.dims.width / grid.columns;
        let tile_h = self.dims.height / grid.rows;
        let (column, row) = grid.cell(tile_index);
        let (x0, y0) = (column * tile_w, row * tile_h);

        let dims = VolumeDimensions::new(tile_w, tile_h, self.dims.depth);
        let mut data = Vec::with_capacity(dims.len());
        for z in 0..self.dims.depth {
            let slice = self.slice(z);
            for y in y0..y0 + tile_h {
                let start = y * self.dims.width + x0;
                data.extend_from_slice(&slice[start..start + tile_w]);
            }
        }
        Ok(Volume { dims, data })
    }

    /// Mean over Z of every pixel.
    pub fn average_projection(&self) -> Plane {
        let plane_len = self.dims.plane_len();
        let mut sums = vec![0.0f64; plane_len];
        for z in 0..self.dims.depth {
            for (s, &v) in sums.iter_mut().zip(self.slice(z)) {
                *s += v as f64;
            }
        }
        let depth = self.dims.depth.max(1) as f64;
        Plane::new(
            self.dims.width,
            self.dims.height,
            sums.into_iter().map(|s| (s / depth) as f32).collect(),
        )
    }

    /// Gaussian blur along Z only, with reflected borders.
    pub fn smooth_z(&self, sigma: f32) -> Volume {
        if sigma <= 0.0 || self.dims.depth < 2 || self.dims.plane_len() == 0 {
            return self.clone();
        }
        let kernel = gaussian_kernel_1d(sigma);
        let radius = (kernel.len() / 2) as isize;
        let depth = self.dims.depth;
        let plane_len = self.dims.plane_len();

        let mut out = Volume::zeros(self.dims);
        out.data
            .par_units_mut_auto(plane_len)
            .for_each(|(first_z, chunk)| {
                for (k, dst) in chunk.chunks_mut(plane_len).enumerate() {
                    let z = (first_z + k) as isize;
                    for (tap, &w) in kernel.iter().enumerate() {
                        let src_z = reflect(z + tap as isize - radius, depth);
                        for (d, &s) in dst.iter_mut().zip(self.slice(src_z)) {
                            *d += w * s;
                        }
                    }
                }
            });
        out
    }
}

/// Normalized Gaussian with radius `ceil(3 * sigma)`.
pub(crate) fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    assert!(sigma > 0.0, "Sigma must be positive");

    let radius = (3.0 * sigma).ceil() as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Mirror an index into `0..len` without repeating the edge sample.
#[inline]
fn reflect(mut i: isize, len: usize) -> usize {
    let n = len as isize;
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}

// ============================================================================
// Loading
// ============================================================================

/// Source of raw stacks. Decoding image formats is up to the implementor.
///
/// A stack holds every tile of one channel; tiles are cut out of it according
/// to the configured [`MosaicGrid`].
pub trait VolumeLoader: Sync {
    /// Load the raw stack that contains `tile`.
    fn load_stack(&self, tile: &TileId) -> io::Result<Volume>;

    /// Dark-count calibration frame for the tile's channel, if any.
    fn load_dark_count(&self, _tile: &TileId) -> io::Result<Option<Plane>> {
        Ok(None)
    }
}
