/// Shannon entropy in bits of a histogram of `values` over `[min, max]`.
///
/// Each value lands in bin `round((v - min) / (max - min) * (bins - 1))`.
/// Zero and non-finite samples are skipped: after the bandpass, zero marks
/// frequencies outside the band. A degenerate range or an empty sample gives 0.
pub fn histogram_entropy(values: &[f32], bins: usize, min: f32, max: f32) -> f32 {
    debug_assert!(bins >= 2);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return 0.0;
    }

    let mut histogram = vec![0u32; bins];
    let scale = (bins - 1) as f32 / range;
    let mut total = 0u64;
    for &v in values {
        if v == 0.0 || !v.is_finite() {
            continue;
        }
        let bin = ((v - min) * scale).round().clamp(0.0, (bins - 1) as f32) as usize;
        histogram[bin] += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    let entropy: f64 = histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();
    entropy as f32
}
