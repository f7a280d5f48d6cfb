use foundation::math::finite_extent;

/// Linear map from a value domain onto an output range.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LinearScale {
    pub domain: [f64; 2],
    pub range: [f64; 2],
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range }
    }

    /// Scale over the finite extent of `values`; an empty input gives the
    /// degenerate domain `[0, 0]`.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I, range: [f64; 2]) -> Self {
        let (lo, hi) = finite_extent(values).unwrap_or((0.0, 0.0));
        Self::new([lo, hi], range)
    }

    pub fn is_degenerate(&self) -> bool {
        self.domain[0] == self.domain[1]
    }

    /// Maps `value`; a degenerate domain maps everything to the range midpoint.
    pub fn apply(&self, value: f64) -> f64 {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        if self.is_degenerate() {
            return (r0 + r1) / 2.0;
        }
        let t = (value - d0) / (d1 - d0);
        r0 + (r1 - r0) * t
    }
}
