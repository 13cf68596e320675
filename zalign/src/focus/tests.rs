use super::*;
use crate::config::FrequencyBand;
use crate::plane::Plane;
use crate::testing::{level_volume, textured_volume, IdentityFilter};
use crate::volume::VolumeDimensions;

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() < eps
}

fn identity_config() -> FocusConfig {
    FocusConfig {
        sigma_z: 0.0,
        ..Default::default()
    }
}

// ============================================================================
// Entropy
// ============================================================================

#[test]
fn test_entropy_uniform_bins() {
    let values = [1.0, 2.0, 3.0, 4.0];
    assert!(approx_eq(histogram_entropy(&values, 4, 1.0, 4.0), 2.0, 1e-6));
}

#[test]
fn test_entropy_single_bin_is_zero() {
    let values = [5.0; 16];
    assert_eq!(histogram_entropy(&values, 256, 1.0, 10.0), 0.0);
}

#[test]
fn test_entropy_skips_zero_samples() {
    let values = [0.0, 0.0, 0.0, 1.0, 2.0];
    assert!(approx_eq(histogram_entropy(&values, 2, 1.0, 2.0), 1.0, 1e-6));
}

#[test]
fn test_entropy_degenerate_range() {
    assert_eq!(histogram_entropy(&[1.0, 2.0], 256, 3.0, 3.0), 0.0);
    assert_eq!(histogram_entropy(&[], 256, 0.0, 1.0), 0.0);
}

#[test]
fn test_entropy_bounded_by_bin_count() {
    let values: Vec<f32> = (1..=1000).map(|i| i as f32).collect();
    let h = histogram_entropy(&values, 16, 1.0, 1000.0);
    assert!(h > 3.9 && h <= 4.0 + 1e-6, "entropy {h}");
}

// ============================================================================
// Bandpass
// ============================================================================

#[test]
fn test_fft_bandpass_keeps_dimensions() {
    let filter = FftBandpass::new();
    let plane = Plane::new(6, 4, (0..24).map(|i| i as f32).collect());
    let out = filter.filter(&plane, FrequencyBand::default());
    assert_eq!(out.width(), 6);
    assert_eq!(out.height(), 4);
}

#[test]
fn test_fft_bandpass_constant_plane_has_only_dc() {
    let filter = FftBandpass::new();
    let plane = Plane::filled(8, 8, 2.0);
    let out = filter.filter(&plane, FrequencyBand::default());

    let dc = out.get(0, 0);
    assert!(approx_eq(dc, (1.0f32 + 128.0).ln(), 1e-4));
    assert!(out.pixels()[1..].iter().all(|&v| v.abs() < 1e-4));
}

#[test]
fn test_fft_bandpass_excludes_out_of_band() {
    let filter = FftBandpass::new();
    let plane = Plane::filled(8, 8, 2.0);
    let band = FrequencyBand {
        low: 1.0,
        high: 90.0,
    };
    let out = filter.filter(&plane, band);
    assert_eq!(out.get(0, 0), 0.0);
}

#[test]
fn test_fft_bandpass_detects_row_frequency() {
    // cos(2*pi*2*x/8) puts energy at u = 2 and u = 6 on the v = 0 row.
    let filter = FftBandpass::new();
    let pixels = (0..64)
        .map(|i| (2.0 * std::f32::consts::PI * 2.0 * (i % 8) as f32 / 8.0).cos())
        .collect();
    let out = filter.filter(&Plane::new(8, 8, pixels), FrequencyBand::default());
    assert!(out.get(2, 0) > 3.0);
    assert!(out.get(6, 0) > 3.0);
    assert!(out.get(1, 0) < 1e-3);
    assert!(out.get(2, 1) < 1e-3);
}

// ============================================================================
// Focus curves
// ============================================================================

#[test]
fn test_curve_length_and_range() {
    let volume = level_volume(16, 16, 30, 14.0);
    let config = identity_config();
    let curve = extract_focus_curve(&volume, &IdentityFilter, &config);

    assert_eq!(curve.len(), 30);
    let max_entropy = (config.histogram_bins as f32).log2();
    assert!(curve.iter().all(|&e| (0.0..=max_entropy).contains(&e)));
}

#[test]
fn test_curve_peaks_at_focus() {
    let volume = level_volume(16, 16, 40, 21.0);
    let curve = extract_focus_curve(&volume, &IdentityFilter, &identity_config());

    let (peak, _) = curve
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .unwrap();
    assert_eq!(peak, 21);
    // Far from focus only two levels remain.
    assert!(approx_eq(curve[0], 1.0, 1e-3));
}

#[test]
fn test_integer_focus_shift_shifts_curve() {
    let a = extract_focus_curve(&level_volume(16, 16, 48, 20.0), &IdentityFilter, &identity_config());
    let b = extract_focus_curve(&level_volume(16, 16, 48, 23.0), &IdentityFilter, &identity_config());
    for i in 3..48 {
        assert_eq!(b[i], a[i - 3], "slice {i}");
    }
}

#[test]
fn test_global_range_is_shared_by_slices() {
    // Slice 0 holds one bright outlier; slice 1 alone would span [1, 2] and
    // fill two bins, but under the global range both values share a bin.
    let dims = VolumeDimensions::new(2, 1, 2);
    let volume = crate::volume::Volume::from_data(dims, vec![1.0, 1000.0, 1.0, 2.0]);
    let config = FocusConfig {
        histogram_bins: 4,
        sigma_z: 0.0,
        ..Default::default()
    };
    let curve = extract_focus_curve(&volume, &IdentityFilter, &config);
    assert!(approx_eq(curve[0], 1.0, 1e-6));
    assert_eq!(curve[1], 0.0);
}

#[test]
fn test_empty_volume_gives_zero_curve() {
    let volume = crate::volume::Volume::zeros(VolumeDimensions::new(0, 0, 5));
    let curve = extract_focus_curve(&volume, &IdentityFilter, &identity_config());
    assert_eq!(curve, vec![0.0; 5]);
}

#[test]
fn test_fft_curve_is_deterministic_and_bounded() {
    let volume = textured_volume(32, 32, 12, 6.0, 7);
    let filter = FftBandpass::new();
    let config = FocusConfig::default();

    let first = focus_curve(&volume, &filter, &config);
    let second = focus_curve(&volume, &filter, &config);
    assert_eq!(first, second);
    assert_eq!(first.len(), 12);
    assert!(first.iter().all(|&e| (0.0..=8.0).contains(&e)));
}

#[test]
fn test_zero_sigma_skips_smoothing() {
    let volume = level_volume(8, 8, 20, 10.0);
    let config = identity_config();
    assert_eq!(
        focus_curve(&volume, &IdentityFilter, &config),
        extract_focus_curve(&volume, &IdentityFilter, &config)
    );
}
