//! Small numeric helpers shared by the scoring crates.

/// Minimum and maximum of a slice, `None` when empty.
pub fn min_max(data: &[f64]) -> Option<(f64, f64)> {
    let first = *data.first()?;
    Some(
        data.iter()
            .fold((first, first), |(lo, hi), &x| (lo.min(x), hi.max(x))),
    )
}

/// Fitted min-max scaler mapping `[min, max]` onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
}

impl MinMaxScaler {
    pub fn fit(data: &[f64]) -> Option<Self> {
        min_max(data).map(|(min, max)| Self { min, max })
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    /// A flat series scales to 0.
    pub fn transform(&self, x: f64) -> f64 {
        if self.range() == 0.0 {
            0.0
        } else {
            (x - self.min) / self.range()
        }
    }

    pub fn inverse_transform(&self, scaled: f64) -> f64 {
        scaled * self.range() + self.min
    }
}

/// Rescale a series onto 0-100. A degenerate series (min == max) maps to 50.
pub fn normalize_0_100(data: &[f64]) -> Vec<f64> {
    match min_max(data) {
        Some((lo, hi)) if hi > lo => data.iter().map(|x| (x - lo) / (hi - lo) * 100.0).collect(),
        _ => vec![50.0; data.len()],
    }
}

/// Round to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
