//! Frequency-domain bandpass used as the first stage of the focus measure.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::FrequencyBand;
use crate::plane::Plane;

/// Turns a slice into a plane whose value distribution reflects how much
/// in-band detail the slice carries.
///
/// Implementations must return a plane of the same width and height and must
/// be callable from several threads at once.
pub trait BandpassFilter: Sync {
    fn filter(&self, plane: &Plane, band: FrequencyBand) -> Plane;
}

/// 2D FFT bandpass. Keeps frequencies whose radial distance from DC lies in
/// the band and stores `ln(1 + |F|)` for them, 0 elsewhere.
///
/// The output is the spectrum in FFT order, not an image.
#[derive(Default)]
pub struct FftBandpass {
    plans: Mutex<HashMap<usize, Arc<dyn Fft<f32>>>>,
}

impl FftBandpass {
    pub fn new() -> Self {
        Self::default()
    }

    fn plan(&self, len: usize) -> Arc<dyn Fft<f32>> {
        let mut plans = self.plans.lock();
        Arc::clone(
            plans
                .entry(len)
                .or_insert_with(|| FftPlanner::new().plan_fft_forward(len)),
        )
    }

    /// Row-column 2D FFT of a real plane.
    fn fft_2d(&self, plane: &Plane) -> Vec<Complex<f32>> {
        let (w, h) = (plane.width(), plane.height());
        let mut data: Vec<Complex<f32>> = plane
            .pixels()
            .iter()
            .map(|&v| Complex::new(v, 0.0))
            .collect();

        // Rows; process() walks every w-long chunk of the buffer.
        self.plan(w).process(&mut data);

        let mut columns = transpose(&data, w, h);
        self.plan(h).process(&mut columns);

        transpose(&columns, h, w)
    }
}

impl BandpassFilter for FftBandpass {
    fn filter(&self, plane: &Plane, band: FrequencyBand) -> Plane {
        let (w, h) = (plane.width(), plane.height());
        if plane.is_empty() {
            return Plane::zeros(w, h);
        }

        let spectrum = self.fft_2d(plane);
        let mut out = Vec::with_capacity(w * h);
        for v in 0..h {
            let fv = v.min(h - v) as f32;
            for u in 0..w {
                let fu = u.min(w - u) as f32;
                let radius = (fu * fu + fv * fv).sqrt();
                let value = if band.contains(radius) {
                    spectrum[v * w + u].norm().ln_1p()
                } else {
                    0.0
                };
                out.push(value);
            }
        }
        Plane::new(w, h, out)
    }
}

/// Transpose a `rows x cols` row-major buffer into `cols x rows`.
fn transpose(data: &[Complex<f32>], cols: usize, rows: usize) -> Vec<Complex<f32>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}
