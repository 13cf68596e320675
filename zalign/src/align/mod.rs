//! Sub-sample 1D alignment of focus curves.
//!
//! The template curve is resampled through a Lanczos kernel and slid along
//! the reference. The shift is found by a coarse-to-fine search: starting at
//! zero, try one step in each direction and move while either side improves
//! the cost, then shrink the step geometrically until it reaches the requested
//! precision.

mod lanczos;
mod normalize;


pub use normalize::{median3, normalize_z_score, prepare_curve};

use crate::config::AlignConfig;
use lanczos::LanczosCurve;

/// Search steps for a curve of `len` samples: `len / 2` divided by
/// `step_size` repeatedly, ending with the first step at or below
/// `min_precision`.
pub fn compute_steps(len: usize, step_size: f32, min_precision: f32) -> Vec<f32> {
    assert!(step_size > 1.0, "step_size must be > 1, got {}", step_size);
    assert!(
        min_precision > 0.0,
        "min_precision must be positive, got {}",
        min_precision
    );

    let mut steps = Vec::new();
    let mut step = len as f32 / 2.0;
    loop {
        step /= step_size;
        steps.push(step);
        if step <= min_precision {
            break;
        }
    }
    steps
}

/// Value at the given percentile of `values`, by sorted index
/// `round(len * percentile)` clamped to the last element.
pub fn percentile_value(values: &[f32], percentile: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let idx = ((sorted.len() as f32 * percentile).round() as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Mean absolute difference between `reference[i]` and the template at
/// `i + offset`, over every `i` whose shifted position lies inside the
/// template. Infinite when there is no overlap.
fn alignment_cost(reference: &[f32], template: &LanczosCurve<'_>, offset: f32) -> f32 {
    let len = template.len() as f32;
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (i, &r) in reference.iter().enumerate() {
        let pos = i as f32 + offset;
        if pos < 0.0 || pos >= len {
            continue;
        }
        sum += (r - template.sample(pos)).abs() as f64;
        count += 1;
    }
    if count == 0 {
        f32::INFINITY
    } else {
        (sum / count as f64) as f32
    }
}

/// Shift `Δ` such that `template(i + Δ)` best matches `reference(i)`.
///
/// If the template is the reference delayed by `k` samples
/// (`template[i] = reference[i - k]`), the result is close to `k`.
pub fn align_1d(reference: &[f32], template: &[f32], config: &AlignConfig) -> f32 {
    if reference.is_empty() || template.is_empty() {
        return 0.0;
    }

    let floor = percentile_value(template, config.floor_percentile);
    let curve = LanczosCurve::new(template, config.lanczos_radius, floor);
    let steps = compute_steps(template.len(), config.step_size, config.min_precision);

    let mut offset = 0.0f32;
    let mut best = alignment_cost(reference, &curve, offset);
    for &step in &steps {
        loop {
            let d_minus = alignment_cost(reference, &curve, offset - step);
            let d_plus = alignment_cost(reference, &curve, offset + step);
            let improved = d_minus < best || d_plus < best;
            if !improved {
                break;
            }
            if d_minus < d_plus {
                offset -= step;
                best = d_minus;
            } else {
                offset += step;
                best = d_plus;
            }
        }
    }

    tracing::trace!(offset, cost = best, "Aligned curve pair");
    offset
}

/// Template resampled at `i + offset` for every reference index, i.e. the
/// template as it lines up with the reference after alignment.
pub fn aligned_series(template: &[f32], offset: f32, len: usize, config: &AlignConfig) -> Vec<f32> {
    if template.is_empty() {
        return vec![0.0; len];
    }
    let floor = percentile_value(template, config.floor_percentile);
    let curve = LanczosCurve::new(template, config.lanczos_radius, floor);
    (0..len).map(|i| curve.sample(i as f32 + offset)).collect()
}
