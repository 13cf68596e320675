use super::ransac::Estimator;

/// `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineModel {
    pub slope: f64,
    pub intercept: f64,
}

impl LineModel {
    /// Line through two points. `None` if they share an x.
    pub fn through(a: (f64, f64), b: (f64, f64)) -> Option<Self> {
        let dx = b.0 - a.0;
        if dx == 0.0 {
            return None;
        }
        let slope = (b.1 - a.1) / dx;
        Some(Self {
            slope,
            intercept: a.1 - slope * a.0,
        })
    }

    /// Ordinary least squares in y. `None` for fewer than two distinct x.
    pub fn least_squares(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let (mut n, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (x, y) in points {
            n += 1.0;
            sx += x;
            sy += y;
            sxx += x * x;
            sxy += x * y;
        }
        if n < 2.0 {
            return None;
        }
        let denom = n * sxx - sx * sx;
        if denom.abs() < 1e-12 * n * sxx.max(1.0) {
            return None;
        }
        let slope = (n * sxy - sx * sy) / denom;
        Some(Self {
            slope,
            intercept: (sy - slope * sx) / n,
        })
    }

    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    #[inline]
    pub fn vertical_distance(&self, x: f64, y: f64) -> f64 {
        (y - self.eval(x)).abs()
    }
}

/// Fits [`LineModel`]s to `(x, y)` points, scored by vertical distance.
pub struct LineEstimator;

impl Estimator for LineEstimator {
    type Datum = (f64, f64);
    type Model = LineModel;

    const MIN_SAMPLES: usize = 2;

    fn fit(data: &[Self::Datum], sample: &[usize]) -> Option<Self::Model> {
        LineModel::through(data[sample[0]], data[sample[1]])
    }

    fn residual(model: &Self::Model, &(x, y): &Self::Datum) -> f64 {
        model.vertical_distance(x, y)
    }

    fn refit(data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
        LineModel::least_squares(inliers.iter().map(|&i| data[i]))
    }
}
