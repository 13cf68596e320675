//! Generic RANSAC over any [`Estimator`].
//!
//! Hypotheses come from minimal samples of the data. When the number of
//! distinct minimal samples does not exceed the iteration budget, every one of
//! them is tried in order; otherwise samples are drawn from a seeded ChaCha8
//! generator, so results are reproducible either way.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// A model family RANSAC can fit.
pub trait Estimator {
    type Datum;
    type Model;

    /// Minimal number of samples needed to estimate a model.
    const MIN_SAMPLES: usize;

    /// Fit a model from a subset of data indices. `None` if the subset is
    /// degenerate.
    fn fit(data: &[Self::Datum], sample: &[usize]) -> Option<Self::Model>;

    /// Non-negative residual of one datum, in the units of the threshold.
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Refit on the full consensus set. Default: keep the sampled model.
    fn refit(_data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct RansacOptions {
    /// Hypothesis budget.
    pub max_iterations: usize,
    /// Residual at or below which a datum is an inlier.
    pub inlier_threshold: f64,
    /// Minimum inlier fraction to accept a model.
    pub min_inlier_ratio: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    pub model: M,
    /// Inlier indices in ascending order.
    pub inliers: Vec<usize>,
    pub iterations: usize,
    pub inlier_ratio: f64,
}

/// Run RANSAC. `None` when there is too little data or no hypothesis reaches
/// `min_inlier_ratio`.
pub fn ransac<E: Estimator>(
    data: &[E::Datum],
    opts: &RansacOptions,
) -> Option<RansacResult<E::Model>> {
    let n = data.len();
    let k = E::MIN_SAMPLES;
    if n < k || k == 0 {
        return None;
    }

    let mut best: Option<(E::Model, Vec<usize>, f64)> = None;
    let mut iterations = 0;

    let consider = |sample: &[usize], best: &mut Option<(E::Model, Vec<usize>, f64)>| {
        let Some(model) = E::fit(data, sample) else {
            return;
        };
        let (inliers, residual_sum) = count_inliers::<E>(data, &model, opts.inlier_threshold);
        let better = match best {
            None => true,
            Some((_, best_inliers, best_sum)) => {
                inliers.len() > best_inliers.len()
                    || (inliers.len() == best_inliers.len() && residual_sum < *best_sum)
            }
        };
        if better {
            *best = Some((model, inliers, residual_sum));
        }
    };

    if binomial(n, k) <= opts.max_iterations {
        let mut sample: Vec<usize> = (0..k).collect();
        loop {
            iterations += 1;
            consider(&sample, &mut best);
            if !next_combination(&mut sample, n) {
                break;
            }
        }
    } else {
        let mut rng = ChaCha8Rng::seed_from_u64(opts.seed);
        let mut sample = Vec::with_capacity(k);
        while iterations < opts.max_iterations {
            iterations += 1;
            random_sample_into(&mut rng, n, k, &mut sample);
            consider(&sample, &mut best);
        }
    }

    let (model, inliers, _) = best?;
    if inliers.len() < k || (inliers.len() as f64 / n as f64) < opts.min_inlier_ratio {
        return None;
    }

    // Least-squares refinement, kept only if it does not lose consensus.
    let (model, inliers) = match E::refit(data, &inliers) {
        Some(refined) => {
            let (refined_inliers, _) = count_inliers::<E>(data, &refined, opts.inlier_threshold);
            if refined_inliers.len() >= inliers.len() {
                (refined, refined_inliers)
            } else {
                (model, inliers)
            }
        }
        None => (model, inliers),
    };

    let inlier_ratio = inliers.len() as f64 / n as f64;
    Some(RansacResult {
        model,
        inliers,
        iterations,
        inlier_ratio,
    })
}

fn count_inliers<E: Estimator>(
    data: &[E::Datum],
    model: &E::Model,
    threshold: f64,
) -> (Vec<usize>, f64) {
    let mut inliers = Vec::new();
    let mut residual_sum = 0.0;
    for (i, datum) in data.iter().enumerate() {
        let r = E::residual(model, datum);
        if r <= threshold {
            inliers.push(i);
            residual_sum += r;
        }
    }
    (inliers, residual_sum)
}

/// `n choose k`, saturating at `usize::MAX`.
pub(crate) fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = result * (n - i) as u128 / (i + 1) as u128;
        if result > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    result as usize
}

/// Advance `indices` to the next ascending `k`-combination of `0..n`.
/// Returns `false` after the last one.
pub(crate) fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if indices[i] < n - k + i {
            indices[i] += 1;
            for j in i + 1..k {
                indices[j] = indices[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

/// Randomly sample k unique indices from 0..n into `buffer` (Floyd's
/// algorithm).
fn random_sample_into<R: Rng>(rng: &mut R, n: usize, k: usize, buffer: &mut Vec<usize>) {
    debug_assert!(k <= n, "Cannot sample {} indices from {}", k, n);
    buffer.clear();
    for j in (n - k)..n {
        let t = rng.random_range(0..=j);
        if buffer.contains(&t) {
            buffer.push(j);
        } else {
            buffer.push(t);
        }
    }
}
