//! Curve conditioning applied before alignment.

/// In-place z-score with the population standard deviation. A constant curve
/// becomes all zeros.
pub fn normalize_z_score(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let std = variance.sqrt();

    for v in values.iter_mut() {
        let centered = *v as f64 - mean;
        *v = if std > 0.0 && std.is_finite() {
            (centered / std) as f32
        } else {
            centered as f32
        };
    }
}

/// 3-tap median filter. Each end takes the smaller of itself and its only
/// neighbour.
pub fn median3(values: &[f32]) -> Vec<f32> {
    let n = values.len();
    if n < 2 {
        return values.to_vec();
    }

    let mut out = Vec::with_capacity(n);
    out.push(values[0].min(values[1]));
    for w in values.windows(3) {
        out.push(median_of_three(w[0], w[1], w[2]));
    }
    out.push(values[n - 1].min(values[n - 2]));
    out
}

#[inline]
fn median_of_three(a: f32, b: f32, c: f32) -> f32 {
    a.max(b).min(a.min(b).max(c))
}

/// Z-score followed by the 3-tap median: the form in which focus curves are
/// cached and aligned.
pub fn prepare_curve(raw: &[f32]) -> Vec<f32> {
    let mut curve = raw.to_vec();
    normalize_z_score(&mut curve);
    median3(&curve)
}
