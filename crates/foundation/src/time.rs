/// Time primitives
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64); // seconds

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeSpan {
    pub start: Time,
    pub end: Time,
}

impl TimeSpan {
    pub fn starting_at(start: Time, duration_s: f64) -> Self {
        Self {
            start,
            end: Time(start.0 + duration_s.max(0.0)),
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end.0 - self.start.0).max(0.0)
    }

    /// Normalized progress in `[0, 1]`. Zero-length spans are complete at `start`.
    pub fn progress(&self, now: Time) -> f64 {
        let d = self.duration();
        if d <= 0.0 {
            return if now.0 >= self.start.0 { 1.0 } else { 0.0 };
        }
        ((now.0 - self.start.0) / d).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self, now: Time) -> bool {
        now.0 >= self.end.0
    }
}
