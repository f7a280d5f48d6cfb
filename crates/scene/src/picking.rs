use foundation::bounds::Aabb2;
use foundation::math::Vec2;

use crate::entity::NodeId;

/// Polygonal hit area bound to a scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRegion {
    pub node: NodeId,
    pub polygon: Vec<Vec2>,
    bounds: Aabb2,
}

impl HitRegion {
    pub fn new(node: NodeId, polygon: Vec<Vec2>) -> Self {
        let bounds = Aabb2::from_points(polygon.iter().copied());
        Self {
            node,
            polygon,
            bounds,
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        if self.polygon.len() < 3 || !self.bounds.contains(p) {
            return false;
        }
        point_in_polygon(&self.polygon, p)
    }
}

/// Index of the region containing `p`.
///
/// Ordering contract:
/// - Regions are tested in slice order and the lowest index wins, so shared
///   edges resolve deterministically.
pub fn pick_point(regions: &[HitRegion], p: Vec2) -> Option<usize> {
    if !p.is_finite() {
        return None;
    }
    regions.iter().position(|r| r.contains(p))
}

/// Even-odd ray casting with half-open edges.
fn point_in_polygon(polygon: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::{HitRegion, pick_point};
    use crate::entity::NodeId;
    use foundation::handles::Handle;
    use foundation::math::Vec2;

    fn square(x0: f64, y0: f64, size: f64, idx: u32) -> HitRegion {
        HitRegion::new(
            NodeId(Handle::new(idx, 0)),
            vec![
                Vec2::new(x0, y0),
                Vec2::new(x0 + size, y0),
                Vec2::new(x0 + size, y0 + size),
                Vec2::new(x0, y0 + size),
            ],
        )
    }

    #[test]
    fn picks_containing_region() {
        let regions = vec![square(0.0, 0.0, 10.0, 1), square(10.0, 0.0, 10.0, 2)];
        assert_eq!(pick_point(&regions, Vec2::new(5.0, 5.0)), Some(0));
        assert_eq!(pick_point(&regions, Vec2::new(15.0, 5.0)), Some(1));
        assert_eq!(pick_point(&regions, Vec2::new(25.0, 5.0)), None);
        assert_eq!(pick_point(&regions, Vec2::new(f64::NAN, 5.0)), None);
    }

    #[test]
    fn overlapping_regions_prefer_lowest_index() {
        let regions = vec![square(0.0, 0.0, 10.0, 7), square(5.0, 0.0, 10.0, 3)];
        assert_eq!(pick_point(&regions, Vec2::new(7.0, 5.0)), Some(0));
    }

    #[test]
    fn degenerate_polygons_never_hit() {
        let line = HitRegion::new(
            NodeId(Handle::new(0, 0)),
            vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)],
        );
        assert!(!line.contains(Vec2::new(5.0, 5.0)));
    }
}
