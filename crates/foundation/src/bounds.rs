use crate::math::Vec2;

/// Axis-aligned bounding box in screen space.
///
/// An empty box has `min > max`; extending it with a point makes it degenerate
/// around that point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn empty() -> Self {
        Aabb2 {
            min: [f64::INFINITY, f64::INFINITY],
            max: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        }
    }

    /// Bounds of all finite points; non-finite points are ignored.
    pub fn from_points<I: IntoIterator<Item = Vec2>>(points: I) -> Self {
        let mut b = Self::empty();
        for p in points {
            b.extend(p);
        }
        b
    }

    pub fn extend(&mut self, p: Vec2) {
        if !p.is_finite() {
            return;
        }
        self.min[0] = self.min[0].min(p.x);
        self.min[1] = self.min[1].min(p.y);
        self.max[0] = self.max[0].max(p.x);
        self.max[1] = self.max[1].max(p.y);
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;
    use crate::math::Vec2;

    #[test]
    fn from_points_skips_non_finite() {
        let b = Aabb2::from_points([
            Vec2::new(1.0, 5.0),
            Vec2::new(f64::INFINITY, 0.0),
            Vec2::new(-2.0, 3.0),
        ]);
        assert_eq!(b.min, [-2.0, 3.0]);
        assert_eq!(b.max, [1.0, 5.0]);
        assert_eq!(b.width(), 3.0);
        assert_eq!(b.height(), 2.0);
    }

    #[test]
    fn empty_box_contains_nothing() {
        let b = Aabb2::empty();
        assert!(b.is_empty());
        assert!(!b.contains(Vec2::new(0.0, 0.0)));
    }
}
