//! Voronoi hit cells over projected anchors.
//!
//! Each cell starts as the plot frame and is clipped by the perpendicular
//! bisector towards every Delaunay neighbour of its site. The tessellation is
//! planar in screen space.

use std::collections::BTreeSet;
use std::fmt::Write;

use delaunator::{Point, Triangulation, triangulate};
use formats::GeoPoint;
use foundation::math::Vec2;
use scene::{HitRegion, NodeId, Scene, pick_point};
use tracing::debug;

use crate::layer::{Layer, LayerId};

const EDGE_TOLERANCE: f64 = 1.0e-9;

/// A datum joined to its region anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiSite {
    /// Index of the datum in the caller's rows.
    pub datum: usize,
    pub feature_id: String,
    pub anchor: GeoPoint,
    pub position: Vec2,
}

/// One clipped cell polygon per site, in site order. Sites with a non-finite
/// position, or whose cell vanishes, get an empty polygon.
pub fn voronoi_cells(sites: &[Vec2], frame: [f64; 2]) -> Vec<Vec<Vec2>> {
    let [w, h] = frame;
    let frame_ring = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(w, 0.0),
        Vec2::new(w, h),
        Vec2::new(0.0, h),
    ];

    let finite: Vec<usize> = (0..sites.len()).filter(|i| sites[*i].is_finite()).collect();
    let points: Vec<Point> = finite
        .iter()
        .map(|i| Point {
            x: sites[*i].x,
            y: sites[*i].y,
        })
        .collect();
    let neighbors = neighbor_sets(&triangulate(&points), &finite, sites.len());

    (0..sites.len())
        .map(|i| {
            if !sites[i].is_finite() {
                return Vec::new();
            }
            let mut polygon = frame_ring.clone();
            let fallback: BTreeSet<usize>;
            let candidates: &BTreeSet<usize> = if neighbors[i].is_empty() {
                fallback = finite.iter().copied().filter(|j| *j != i).collect();
                &fallback
            } else {
                &neighbors[i]
            };
            for j in candidates {
                polygon = clip_by_bisector(&polygon, sites[i], sites[*j]);
                if polygon.is_empty() {
                    break;
                }
            }
            if polygon.len() < 3 {
                polygon.clear();
            }
            polygon
        })
        .collect()
}

/// Delaunay neighbours of every site, indexed by site.
fn neighbor_sets(tri: &Triangulation, finite: &[usize], count: usize) -> Vec<BTreeSet<usize>> {
    let mut sets = vec![BTreeSet::new(); count];
    for t in tri.triangles.chunks_exact(3) {
        let [a, b, c] = [finite[t[0]], finite[t[1]], finite[t[2]]];
        for (p, q) in [(a, b), (b, c), (c, a)] {
            sets[p].insert(q);
            sets[q].insert(p);
        }
    }
    sets
}

fn signed_distance_to_bisector(p: Vec2, site: Vec2, neighbor: Vec2) -> f64 {
    let mid = site.lerp(neighbor, 0.5);
    (p - mid).dot(neighbor - site)
}

/// Keeps the part of `polygon` closer to `site` than to `neighbor`.
fn clip_by_bisector(polygon: &[Vec2], site: Vec2, neighbor: Vec2) -> Vec<Vec2> {
    let Some(&last) = polygon.last() else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(polygon.len() + 1);
    let mut prev = last;
    let mut prev_dist = signed_distance_to_bisector(prev, site, neighbor);
    for &curr in polygon {
        let curr_dist = signed_distance_to_bisector(curr, site, neighbor);
        let prev_inside = prev_dist <= EDGE_TOLERANCE;
        let curr_inside = curr_dist <= EDGE_TOLERANCE;
        if curr_inside != prev_inside {
            let denom = prev_dist - curr_dist;
            let t = if denom.abs() < f64::EPSILON {
                0.5
            } else {
                (prev_dist / denom).clamp(0.0, 1.0)
            };
            out.push(prev.lerp(curr, t));
        }
        if curr_inside {
            out.push(curr);
        }
        prev = curr;
        prev_dist = curr_dist;
    }
    out
}

/// Closed path data of a cell, `None` for an empty cell.
pub fn cell_path(cell: &[Vec2]) -> Option<String> {
    let (first, rest) = cell.split_first()?;
    let mut d = format!("M{},{}", first.x, first.y);
    for p in rest {
        let _ = write!(d, "L{},{}", p.x, p.y);
    }
    d.push('Z');
    Some(d)
}

/// Hit regions of the drawn cells with the site each one belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoronoiCells {
    pub regions: Vec<HitRegion>,
    pub sites: Vec<usize>,
}

impl VoronoiCells {
    /// Site index of the cell under `p`; the earliest cell wins on shared edges.
    pub fn pick(&self, p: Vec2) -> Option<usize> {
        pick_point(&self.regions, p).map(|i| self.sites[i])
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VoronoiLayer {
    id: LayerId,
}

impl Layer for VoronoiLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn selector(&self) -> &'static str {
        "g.voronoi"
    }
}

impl VoronoiLayer {
    pub fn new(id: u64) -> Self {
        Self { id: LayerId(id) }
    }

    /// Replaces every cell under `plot` with the tessellation of `sites`
    /// clipped to `frame`.
    pub fn reconcile(
        &self,
        scene: &mut Scene,
        plot: NodeId,
        sites: &[VoronoiSite],
        frame: [f64; 2],
    ) -> VoronoiCells {
        let group = self.group(scene, plot);
        scene.clear_children(group);
        scene.set_style(group, "pointer-events", "all");

        let positions: Vec<Vec2> = sites.iter().map(|s| s.position).collect();
        let mut cells = VoronoiCells::default();
        for (i, polygon) in voronoi_cells(&positions, frame).into_iter().enumerate() {
            let Some(d) = cell_path(&polygon) else {
                continue;
            };
            let node = scene.append(group, "path");
            scene.set_attr(node, "d", d);
            scene.set_style(node, "fill", "transparent");
            cells.regions.push(HitRegion::new(node, polygon));
            cells.sites.push(i);
        }
        debug!(
            layer = self.id().0,
            sites = sites.len(),
            cells = cells.len(),
            "rebuilt voronoi cells"
        );
        cells
    }

    /// Drops the layer group under `plot`, if there is one.
    pub fn remove(&self, scene: &mut Scene, plot: NodeId) {
        if let Some(group) = scene.select(plot, self.selector()) {
            debug!("removing voronoi layer");
            scene.remove(group);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{VoronoiLayer, VoronoiSite, cell_path, voronoi_cells};
    use crate::layer::Layer;
    use formats::GeoPoint;
    use foundation::math::Vec2;
    use scene::Scene;

    fn area(poly: &[Vec2]) -> f64 {
        let n = poly.len();
        (0..n)
            .map(|i| poly[i].cross(poly[(i + 1) % n]))
            .sum::<f64>()
            .abs()
            / 2.0
    }

    #[test]
    fn two_sites_split_the_frame() {
        let cells = voronoi_cells(&[Vec2::new(25.0, 50.0), Vec2::new(75.0, 50.0)], [100.0, 100.0]);
        assert_eq!(cells.len(), 2);
        assert!((area(&cells[0]) - 5000.0).abs() < 1e-6);
        assert!((area(&cells[1]) - 5000.0).abs() < 1e-6);
        assert!(cells[0].iter().all(|p| p.x <= 50.0 + 1e-9));
        assert!(cells[1].iter().all(|p| p.x >= 50.0 - 1e-9));
    }

    #[test]
    fn cells_tile_the_frame() {
        let sites = [
            Vec2::new(10.0, 10.0),
            Vec2::new(90.0, 15.0),
            Vec2::new(50.0, 50.0),
            Vec2::new(20.0, 80.0),
            Vec2::new(85.0, 90.0),
        ];
        let cells = voronoi_cells(&sites, [100.0, 100.0]);
        let total: f64 = cells.iter().map(|c| area(c)).sum();
        assert!((total - 10_000.0).abs() < 1e-6, "total area {total}");
        for (site, cell) in sites.iter().zip(&cells) {
            let region = scene::HitRegion::new(
                scene::NodeId(foundation::handles::Handle::new(0, 0)),
                cell.clone(),
            );
            assert!(region.contains(*site));
        }
    }

    #[test]
    fn collinear_and_single_sites() {
        let single = voronoi_cells(&[Vec2::new(5.0, 5.0)], [10.0, 10.0]);
        assert!((area(&single[0]) - 100.0).abs() < 1e-9);

        let collinear = voronoi_cells(
            &[Vec2::new(2.0, 5.0), Vec2::new(5.0, 5.0), Vec2::new(8.0, 5.0)],
            [10.0, 10.0],
        );
        let total: f64 = collinear.iter().map(|c| area(c)).sum();
        assert!((total - 100.0).abs() < 1e-9);

        let with_nan = voronoi_cells(&[Vec2::new(f64::NAN, 0.0), Vec2::new(5.0, 5.0)], [10.0, 10.0]);
        assert!(with_nan[0].is_empty());
        assert!((area(&with_nan[1]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn layer_replaces_cells_and_picks_sites() {
        let mut scene = Scene::new();
        let plot = scene.append(scene.root(), "g.plot");
        let layer = VoronoiLayer::new(2);
        let sites: Vec<VoronoiSite> = [("A", 25.0), ("B", 75.0)]
            .into_iter()
            .enumerate()
            .map(|(i, (id, x))| VoronoiSite {
                datum: i,
                feature_id: id.to_string(),
                anchor: GeoPoint::new(0.0, 0.0),
                position: Vec2::new(x, 50.0),
            })
            .collect();

        let cells = layer.reconcile(&mut scene, plot, &sites, [100.0, 100.0]);
        assert_eq!(cells.pick(Vec2::new(10.0, 10.0)), Some(0));
        assert_eq!(cells.pick(Vec2::new(90.0, 10.0)), Some(1));
        assert_eq!(cells.pick(Vec2::new(150.0, 10.0)), None);

        let group = scene.select(plot, layer.selector()).expect("group");
        let first_cells = scene.children(group).to_vec();
        layer.reconcile(&mut scene, plot, &sites, [100.0, 100.0]);
        assert_eq!(scene.children(group).len(), 2);
        assert!(first_cells.iter().all(|n| !scene.contains(*n)));

        layer.remove(&mut scene, plot);
        assert_eq!(scene.select(plot, layer.selector()), None);
    }

    #[test]
    fn empty_cells_have_no_path() {
        assert_eq!(cell_path(&[]), None);
        assert_eq!(
            cell_path(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)]).as_deref(),
            Some("M0,0L1,0L1,1Z")
        );
    }
}
