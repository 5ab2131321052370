/// Expected nightly price with its uncertainty band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceInterval {
    pub expected: f64,
    pub lower: f64,
    pub upper: f64,
}

impl PriceInterval {
    /// Applies `convert` to all three values, keeping `lower <= expected <= upper`.
    pub fn try_map<E, F>(self, mut convert: F) -> Result<Self, E>
    where
        F: FnMut(f64) -> Result<f64, E>,
    {
        let expected = convert(self.expected)?;
        let (lower, upper) = ordered(convert(self.lower)?, convert(self.upper)?);
        Ok(Self {
            expected,
            lower,
            upper,
        })
    }
}

/// Turns a log-space estimate `p` and the market's median absolute percentage error `m` into
/// `exp(p)` and the band `exp(p ∓ p·m)`.
///
/// The band is multiplicative and scales with `p` itself. For `p < 0` the two formulas swap
/// roles, so the bounds are sorted instead of trusted by name. Values stay unrounded.
pub fn calibrate(point_log_price: f64, mape_median: f64) -> PriceInterval {
    let spread = point_log_price * mape_median;
    let (lower, upper) = ordered(
        (point_log_price - spread).exp(),
        (point_log_price + spread).exp(),
    );

    PriceInterval {
        expected: point_log_price.exp(),
        lower,
        upper,
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
