//! Focus curves: one sharpness value per Z slice.
//!
//! Every slice is bandpass filtered, then the Shannon entropy of the filtered
//! slice's value histogram becomes the focus value. The histogram range is the
//! global minimum and maximum over the whole filtered stack, so entropies of
//! different slices are comparable. This needs two passes: filter every slice
//! first, then histogram them.
//!
//! Both passes split the stack into disjoint contiguous ranges of slices, one
//! per rayon task, and each task writes only its own output range.

mod bandpass;
mod entropy;

#[cfg(test)]
mod tests;

use common::parallel::ParChunksMutAuto;
use rayon::prelude::*;

pub use bandpass::{BandpassFilter, FftBandpass};
pub use entropy::histogram_entropy;

use crate::config::FocusConfig;
use crate::volume::Volume;

/// Focus curve of a tile volume, optionally smoothed along Z first.
pub fn focus_curve<F>(volume: &Volume, filter: &F, config: &FocusConfig) -> Vec<f32>
where
    F: BandpassFilter + ?Sized,
{
    if config.sigma_z > 0.0 {
        extract_focus_curve(&volume.smooth_z(config.sigma_z), filter, config)
    } else {
        extract_focus_curve(volume, filter, config)
    }
}

/// One entropy value per slice of `volume`, each in `[0, log2(bins)]`.
pub fn extract_focus_curve<F>(volume: &Volume, filter: &F, config: &FocusConfig) -> Vec<f32>
where
    F: BandpassFilter + ?Sized,
{
    let depth = volume.depth();
    let plane_len = volume.dims().plane_len();
    if depth == 0 || plane_len == 0 {
        return vec![0.0; depth];
    }

    let mut filtered = Volume::zeros(volume.dims());
    filtered
        .data_mut()
        .par_units_mut_auto(plane_len)
        .for_each(|(first_z, chunk)| {
            for (k, dst) in chunk.chunks_mut(plane_len).enumerate() {
                let response = filter.filter(&volume.plane(first_z + k), config.band);
                debug_assert_eq!(response.len(), plane_len);
                dst.copy_from_slice(response.pixels());
            }
        });

    let Some((min, max)) = filtered.min_max() else {
        return vec![0.0; depth];
    };

    let mut curve = vec![0.0f32; depth];
    curve.par_chunks_mut_auto().for_each(|(first_z, chunk)| {
        for (k, value) in chunk.iter_mut().enumerate() {
            *value = histogram_entropy(
                filtered.slice(first_z + k),
                config.histogram_bins,
                min,
                max,
            );
        }
    });

    tracing::debug!(depth, min, max, "Extracted focus curve");
    curve
}
