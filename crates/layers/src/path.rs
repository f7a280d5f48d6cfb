//! Projected path strings and planar centroids for feature geometry.

use std::fmt::Write;

use formats::Geometry;
use foundation::math::{Projection, Vec2};

/// Radius of the circle drawn for point geometry.
pub const POINT_RADIUS: f64 = 4.5;

/// Geometry renderer bound to a fitted projection.
#[derive(Debug, Clone, Copy)]
pub struct GeoPath<'a> {
    projection: &'a Projection,
}

impl<'a> GeoPath<'a> {
    pub fn new(projection: &'a Projection) -> Self {
        Self { projection }
    }

    pub fn projection(&self) -> &'a Projection {
        self.projection
    }

    fn project_line(&self, line: &[formats::GeoPoint]) -> Vec<Vec2> {
        line.iter()
            .map(|p| self.projection.project(*p))
            .filter(|v| v.is_finite())
            .collect()
    }

    /// Path data (`M x,y L x,y ... Z`) of `geometry`, or `None` when nothing
    /// projects to a finite position.
    pub fn d(&self, geometry: &Geometry) -> Option<String> {
        let mut out = String::new();
        self.write_geometry(&mut out, geometry);
        (!out.is_empty()).then_some(out)
    }

    fn write_geometry(&self, out: &mut String, geometry: &Geometry) {
        match geometry {
            Geometry::Point(p) => self.write_point(out, *p),
            Geometry::MultiPoint(ps) => {
                for p in ps {
                    self.write_point(out, *p);
                }
            }
            Geometry::LineString(line) => write_line(out, &self.project_line(line), false),
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    write_line(out, &self.project_line(line), false);
                }
            }
            Geometry::Polygon(rings) => {
                for ring in rings {
                    write_line(out, &self.project_line(ring), true);
                }
            }
            Geometry::MultiPolygon(polys) => {
                for ring in polys.iter().flatten() {
                    write_line(out, &self.project_line(ring), true);
                }
            }
            Geometry::GeometryCollection(geoms) => {
                for g in geoms {
                    self.write_geometry(out, g);
                }
            }
        }
    }

    fn write_point(&self, out: &mut String, p: formats::GeoPoint) {
        let v = self.projection.project(p);
        if !v.is_finite() {
            return;
        }
        let r = POINT_RADIUS;
        let _ = write!(
            out,
            "M{},{}m0,{r}a{r},{r} 0 1,1 0,{}a{r},{r} 0 1,1 0,{}z",
            v.x,
            v.y,
            -2.0 * r,
            2.0 * r
        );
    }

    /// Planar centroid of the projected geometry.
    ///
    /// Areas dominate lines and lines dominate points: polygon rings are
    /// weighted by signed area, falling back to edge length for zero-area
    /// rings and to the vertex mean for zero-length lines.
    pub fn centroid(&self, geometry: &Geometry) -> Option<Vec2> {
        let mut acc = CentroidAccumulator::default();
        self.accumulate(&mut acc, geometry);
        acc.finish()
    }

    fn accumulate(&self, acc: &mut CentroidAccumulator, geometry: &Geometry) {
        match geometry {
            Geometry::Point(p) => acc.point(self.projection.project(*p)),
            Geometry::MultiPoint(ps) => {
                for p in ps {
                    acc.point(self.projection.project(*p));
                }
            }
            Geometry::LineString(line) => acc.line(&self.project_line(line)),
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    acc.line(&self.project_line(line));
                }
            }
            Geometry::Polygon(rings) => {
                for ring in rings {
                    acc.ring(&self.project_line(ring));
                }
            }
            Geometry::MultiPolygon(polys) => {
                for ring in polys.iter().flatten() {
                    acc.ring(&self.project_line(ring));
                }
            }
            Geometry::GeometryCollection(geoms) => {
                for g in geoms {
                    self.accumulate(acc, g);
                }
            }
        }
    }
}

fn write_line(out: &mut String, points: &[Vec2], closed: bool) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    let _ = write!(out, "M{},{}", first.x, first.y);
    for p in rest {
        let _ = write!(out, "L{},{}", p.x, p.y);
    }
    if closed {
        out.push('Z');
    }
}

/// First-moment sums per dimension: area, line length, point count.
#[derive(Debug, Default)]
struct CentroidAccumulator {
    area: f64,
    area_x: f64,
    area_y: f64,
    length: f64,
    length_x: f64,
    length_y: f64,
    count: f64,
    sum_x: f64,
    sum_y: f64,
}

impl CentroidAccumulator {
    fn point(&mut self, p: Vec2) {
        if !p.is_finite() {
            return;
        }
        self.count += 1.0;
        self.sum_x += p.x;
        self.sum_y += p.y;
    }

    fn line(&mut self, points: &[Vec2]) {
        for p in points {
            self.point(*p);
        }
        for w in points.windows(2) {
            let len = w[0].distance_squared(w[1]).sqrt();
            let mid = w[0].lerp(w[1], 0.5);
            self.length += len;
            self.length_x += mid.x * len;
            self.length_y += mid.y * len;
        }
    }

    fn ring(&mut self, points: &[Vec2]) {
        self.line(points);
        let n = points.len();
        if n < 3 {
            return;
        }
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            let cross = a.cross(b);
            self.area += cross;
            self.area_x += (a.x + b.x) * cross;
            self.area_y += (a.y + b.y) * cross;
        }
    }

    fn finish(&self) -> Option<Vec2> {
        let c = if self.area.abs() > 1e-12 {
            let k = 1.0 / (3.0 * self.area);
            Vec2::new(self.area_x * k, self.area_y * k)
        } else if self.length > 0.0 {
            Vec2::new(self.length_x / self.length, self.length_y / self.length)
        } else if self.count > 0.0 {
            Vec2::new(self.sum_x / self.count, self.sum_y / self.count)
        } else {
            return None;
        };
        c.is_finite().then_some(c)
    }
}
