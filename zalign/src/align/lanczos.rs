use std::f32::consts::PI;

/// Lanczos kernel value.
///
/// L(x) = sinc(x) * sinc(x/a) for |x| < a, 0 otherwise,
/// where sinc(x) = sin(pi*x) / (pi*x) and sinc(0) = 1.
#[inline]
pub(crate) fn lanczos_kernel(x: f32, a: f32) -> f32 {
    if x.abs() < 1e-6 {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }

    let pi_x = PI * x;
    let pi_x_a = pi_x / a;

    (pi_x.sin() / pi_x) * (pi_x_a.sin() / pi_x_a)
}

/// Continuous view of a sampled curve through a normalized Lanczos kernel.
/// Taps that fall outside the samples read `border` instead.
pub(crate) struct LanczosCurve<'a> {
    samples: &'a [f32],
    radius: usize,
    border: f32,
}

impl<'a> LanczosCurve<'a> {
    pub(crate) fn new(samples: &'a [f32], radius: usize, border: f32) -> Self {
        debug_assert!(radius >= 1);
        Self {
            samples,
            radius,
            border,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    fn tap(&self, i: i64) -> f32 {
        if i >= 0 && (i as usize) < self.samples.len() {
            self.samples[i as usize]
        } else {
            self.border
        }
    }

    /// Value at continuous position `x`.
    pub(crate) fn sample(&self, x: f32) -> f32 {
        let a = self.radius as i64;
        let base = x.floor() as i64;
        let mut sum = 0.0f32;
        let mut weight_sum = 0.0f32;
        for i in (base - a + 1)..=(base + a) {
            let w = lanczos_kernel(x - i as f32, self.radius as f32);
            sum += w * self.tap(i);
            weight_sum += w;
        }
        if weight_sum.abs() > 1e-10 {
            sum / weight_sum
        } else {
            sum
        }
    }
}
