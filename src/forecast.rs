//! Day-ahead forecast error model.

use rand::Rng;

use crate::sim::types::DaySeries;

/// Multiplicative uniform forecast error driven by the X3 accuracy factor.
///
/// Each slot of a forecast is scaled by `1 + e` with
/// `e ~ U(-(1 - accuracy), 1 - accuracy)` and clipped at zero, so an
/// accuracy of `1.0` reproduces the input exactly.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ForecastError {
    spread: f64,
}

impl ForecastError {
    /// Builds the error model for an accuracy in `[0.0, 1.0]`.
    pub fn new(accuracy: f64) -> Self {
        Self {
            spread: (1.0 - accuracy).clamp(0.0, 1.0),
        }
    }

    /// A model that never perturbs its input.
    pub fn perfect() -> Self {
        Self::default()
    }

    /// Half-width of the relative error interval.
    pub fn spread(&self) -> f64 {
        self.spread
    }

    /// Applies the error to a day-ahead series.
    ///
    /// Draws one value per slot from `rng` unless the model is perfect.
    pub fn apply<R: Rng + ?Sized>(&self, forecast: &DaySeries, rng: &mut R) -> DaySeries {
        let mut out = *forecast;
        if self.spread <= 0.0 {
            return out;
        }
        for v in out.iter_mut() {
            let e = rng.random_range(-self.spread..=self.spread);
            *v = (*v * (1.0 + e)).max(0.0);
        }
        out
    }
}
