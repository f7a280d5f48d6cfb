//! Map projections and a name-keyed projection registry.
//!
//! A [`Projection`] wraps a raw projection (radians in, unit plane out with y
//! pointing up) with a longitude rotation, a uniform scale and a translate.
//! Screen space has y growing downward.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::sync::Arc;

use super::{GeoPoint, Vec2};
use crate::bounds::Aabb2;

const EPSILON: f64 = 1e-6;

/// Raw projection on the unit sphere.
pub trait RawProjection: Send + Sync {
    /// `(lambda, phi)` in radians to plane coordinates, y up.
    fn forward(&self, lambda: f64, phi: f64) -> [f64; 2];

    /// Inverse of [`RawProjection::forward`]; `None` when not invertible there.
    fn inverse(&self, x: f64, y: f64) -> Option<[f64; 2]>;
}

#[derive(Clone)]
pub struct Projection {
    name: String,
    raw: Arc<dyn RawProjection>,
    scale: f64,
    translate: [f64; 2],
    rotate_deg: f64,
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("name", &self.name)
            .field("scale", &self.scale)
            .field("translate", &self.translate)
            .field("rotate_deg", &self.rotate_deg)
            .finish()
    }
}

impl Projection {
    pub fn new(name: impl Into<String>, raw: Arc<dyn RawProjection>) -> Self {
        Self {
            name: name.into(),
            raw,
            scale: 150.0,
            translate: [480.0, 250.0],
            rotate_deg: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> [f64; 2] {
        self.translate
    }

    pub fn rotate(&self) -> f64 {
        self.rotate_deg
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_translate(mut self, translate: [f64; 2]) -> Self {
        self.translate = translate;
        self
    }

    /// Longitude rotation in degrees, added before projecting.
    pub fn with_rotate(mut self, rotate_deg: f64) -> Self {
        self.rotate_deg = rotate_deg;
        self
    }

    pub fn project(&self, p: GeoPoint) -> Vec2 {
        let lambda = wrap_lon_deg(p.lon_deg + self.rotate_deg).to_radians();
        let phi = p.lat_deg.to_radians();
        let [x, y] = self.raw.forward(lambda, phi);
        Vec2::new(
            self.translate[0] + self.scale * x,
            self.translate[1] - self.scale * y,
        )
    }

    pub fn invert(&self, v: Vec2) -> Option<GeoPoint> {
        if self.scale == 0.0 || !v.is_finite() {
            return None;
        }
        let x = (v.x - self.translate[0]) / self.scale;
        let y = (self.translate[1] - v.y) / self.scale;
        let [lambda, phi] = self.raw.inverse(x, y)?;
        let p = GeoPoint::new(
            wrap_lon_deg(lambda.to_degrees() - self.rotate_deg),
            phi.to_degrees(),
        );
        p.is_finite().then_some(p)
    }

    /// Sets scale and translate so the projected points fill `size`, centered.
    ///
    /// Non-finite projected points are ignored. With no usable points the
    /// projection is left unchanged.
    pub fn fit_size<I>(&mut self, size: [f64; 2], points: I) -> &mut Self
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let unit = self.clone().with_scale(1.0).with_translate([0.0, 0.0]);
        let bounds = Aabb2::from_points(points.into_iter().map(|p| unit.project(p)));
        if bounds.is_empty() {
            return self;
        }

        let kx = size[0] / bounds.width();
        let ky = size[1] / bounds.height();
        let k = match (kx.is_finite(), ky.is_finite()) {
            (true, true) => kx.min(ky),
            (true, false) => kx,
            (false, true) => ky,
            (false, false) => self.scale,
        };

        self.scale = k;
        self.translate = [
            (size[0] - k * (bounds.max[0] + bounds.min[0])) / 2.0,
            (size[1] - k * (bounds.max[1] + bounds.min[1])) / 2.0,
        ];
        self
    }
}

/// Brings a longitude back into `[-180, 180]` after a single rotation step.
pub fn wrap_lon_deg(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct Equirectangular;

impl RawProjection for Equirectangular {
    fn forward(&self, lambda: f64, phi: f64) -> [f64; 2] {
        [lambda, phi]
    }

    fn inverse(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        Some([x, y])
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct Mercator;

impl RawProjection for Mercator {
    fn forward(&self, lambda: f64, phi: f64) -> [f64; 2] {
        [lambda, ((FRAC_PI_2 + phi) / 2.0).tan().ln()]
    }

    fn inverse(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        Some([x, 2.0 * y.exp().atan() - FRAC_PI_2])
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct NaturalEarth1;

impl RawProjection for NaturalEarth1 {
    fn forward(&self, lambda: f64, phi: f64) -> [f64; 2] {
        let phi2 = phi * phi;
        let phi4 = phi2 * phi2;
        [
            lambda
                * (0.8707 - 0.131979 * phi2
                    + phi4 * (-0.013791 + phi4 * (0.003971 * phi2 - 0.001529 * phi4))),
            phi * (1.007226
                + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4))),
        ]
    }

    fn inverse(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        // Newton iteration on the polynomial in phi.
        let mut phi = y;
        for _ in 0..25 {
            let phi2 = phi * phi;
            let phi4 = phi2 * phi2;
            let f = phi
                * (1.007226
                    + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4)))
                - y;
            let df = 1.007226
                + phi2
                    * (0.015085 * 3.0
                        + phi4 * (-0.044475 * 7.0 + 0.028874 * 9.0 * phi2 - 0.005916 * 11.0 * phi4));
            let delta = f / df;
            phi -= delta;
            if delta.abs() <= EPSILON {
                break;
            }
        }
        let phi2 = phi * phi;
        let lambda = x
            / (0.8707
                + phi2 * (-0.131979 + phi2 * (-0.013791 + phi2 * phi2 * phi2 * (0.003971 - 0.001529 * phi2))));
        Some([lambda, phi])
    }
}

/// Albers-style conic equal-area projection for two standard parallels.
#[derive(Debug, Copy, Clone)]
pub struct ConicEqualArea {
    n: f64,
    c: f64,
    r0: f64,
    cylindrical_cos: Option<f64>,
}

impl ConicEqualArea {
    pub fn new(parallel0_deg: f64, parallel1_deg: f64) -> Self {
        let y0 = parallel0_deg.to_radians();
        let y1 = parallel1_deg.to_radians();
        let sy0 = y0.sin();
        let n = (sy0 + y1.sin()) / 2.0;
        if n.abs() < EPSILON {
            // Degenerates to a cylindrical equal-area projection.
            return Self {
                n,
                c: 0.0,
                r0: 0.0,
                cylindrical_cos: Some(y0.cos()),
            };
        }
        let c = 1.0 + sy0 * (2.0 * n - sy0);
        Self {
            n,
            c,
            r0: c.sqrt() / n,
            cylindrical_cos: None,
        }
    }
}

impl RawProjection for ConicEqualArea {
    fn forward(&self, lambda: f64, phi: f64) -> [f64; 2] {
        if let Some(cos0) = self.cylindrical_cos {
            return [lambda * cos0, phi.sin() / cos0];
        }
        let r = (self.c - 2.0 * self.n * phi.sin()).sqrt() / self.n;
        let a = lambda * self.n;
        [r * a.sin(), self.r0 - r * a.cos()]
    }

    fn inverse(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        if let Some(cos0) = self.cylindrical_cos {
            return Some([x / cos0, (y * cos0).clamp(-1.0, 1.0).asin()]);
        }
        let r0y = self.r0 - y;
        let mut l = x.atan2(r0y.abs()) * sign(r0y);
        if r0y * self.n < 0.0 {
            l -= PI * sign(x) * sign(r0y);
        }
        let s = (self.c - (x * x + r0y * r0y) * self.n * self.n) / (2.0 * self.n);
        Some([l / self.n, s.clamp(-1.0, 1.0).asin()])
    }
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

pub type ProjectionFactory = fn() -> Projection;

/// Name-keyed projection factories with a designated fallback entry.
///
/// Names are matched case-insensitively and an optional `geo` prefix is
/// ignored, so `geoNaturalEarth1` and `naturalearth1` resolve alike.
#[derive(Clone)]
pub struct ProjectionRegistry {
    factories: BTreeMap<String, ProjectionFactory>,
    fallback: ProjectionFactory,
}

impl fmt::Debug for ProjectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub const DEFAULT_PROJECTION: &str = "naturalEarth1";

impl ProjectionRegistry {
    pub fn empty(fallback: ProjectionFactory) -> Self {
        Self {
            factories: BTreeMap::new(),
            fallback,
        }
    }

    pub fn register(&mut self, name: &str, factory: ProjectionFactory) -> &mut Self {
        self.factories.insert(normalize_name(name), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize_name(name))
    }

    pub fn get(&self, name: &str) -> Option<Projection> {
        self.factories.get(&normalize_name(name)).map(|f| f())
    }

    pub fn fallback(&self) -> Projection {
        (self.fallback)()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for ProjectionRegistry {
    fn default() -> Self {
        let mut r = Self::empty(natural_earth1);
        r.register("naturalEarth1", natural_earth1)
            .register("equirectangular", equirectangular)
            .register("mercator", mercator)
            .register("conicEqualArea", conic_equal_area)
            .register("albers", albers);
        r
    }
}

fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_prefix("geo") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => lower,
    }
}

pub fn natural_earth1() -> Projection {
    Projection::new("naturalEarth1", Arc::new(NaturalEarth1))
}

pub fn equirectangular() -> Projection {
    Projection::new("equirectangular", Arc::new(Equirectangular))
}

pub fn mercator() -> Projection {
    Projection::new("mercator", Arc::new(Mercator))
}

pub fn conic_equal_area() -> Projection {
    Projection::new("conicEqualArea", Arc::new(ConicEqualArea::new(0.0, 60.0)))
}

pub fn albers() -> Projection {
    Projection::new("albers", Arc::new(ConicEqualArea::new(29.5, 45.5))).with_rotate(96.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn every_builtin_round_trips_through_invert() {
        let registry = ProjectionRegistry::default();
        let samples = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(-100.0, 40.0),
            GeoPoint::new(12.5, -33.0),
            GeoPoint::new(150.0, 60.0),
        ];
        for name in registry.names().map(str::to_string).collect::<Vec<_>>() {
            let p = registry.get(&name).expect("registered");
            for s in samples {
                let back = p.invert(p.project(s)).expect("invertible");
                assert_close(back.lon_deg, s.lon_deg, 1e-6);
                assert_close(back.lat_deg, s.lat_deg, 1e-6);
            }
        }
    }

    #[test]
    fn names_ignore_case_and_geo_prefix() {
        let registry = ProjectionRegistry::default();
        assert!(registry.contains("geoNaturalEarth1"));
        assert!(registry.contains("MERCATOR"));
        assert!(registry.get("geoAlbersUsaPr").is_none());
        assert_eq!(registry.fallback().name(), DEFAULT_PROJECTION);
    }

    #[test]
    fn screen_y_grows_southward() {
        let p = equirectangular();
        let north = p.project(GeoPoint::new(0.0, 10.0));
        let south = p.project(GeoPoint::new(0.0, -10.0));
        assert!(north.y < south.y);
    }

    #[test]
    fn fit_size_centers_and_fills() {
        let mut p = equirectangular();
        p.fit_size(
            [200.0, 100.0],
            [GeoPoint::new(-10.0, -5.0), GeoPoint::new(10.0, 5.0)],
        );
        let sw = p.project(GeoPoint::new(-10.0, -5.0));
        let ne = p.project(GeoPoint::new(10.0, 5.0));
        assert_close(sw.x, 0.0, 1e-9);
        assert_close(sw.y, 100.0, 1e-9);
        assert_close(ne.x, 200.0, 1e-9);
        assert_close(ne.y, 0.0, 1e-9);
    }

    #[test]
    fn fit_size_keeps_aspect_and_centers_short_axis() {
        let mut p = equirectangular();
        p.fit_size(
            [100.0, 100.0],
            [GeoPoint::new(0.0, 0.0), GeoPoint::new(20.0, 10.0)],
        );
        let a = p.project(GeoPoint::new(0.0, 0.0));
        let b = p.project(GeoPoint::new(20.0, 10.0));
        assert_close(b.x - a.x, 100.0, 1e-9);
        assert_close(a.y - b.y, 50.0, 1e-9);
        assert_close((a.y + b.y) / 2.0, 50.0, 1e-9);
    }

    #[test]
    fn fit_size_without_points_is_noop() {
        let mut p = mercator();
        let before = (p.scale(), p.translate());
        p.fit_size([10.0, 10.0], std::iter::empty());
        assert_eq!((p.scale(), p.translate()), before);
    }

    #[test]
    fn rotation_moves_antimeridian_to_center() {
        let p = equirectangular().with_rotate(180.0);
        let west = p.project(GeoPoint::new(170.0, 0.0));
        let east = p.project(GeoPoint::new(-170.0, 0.0));
        assert!(west.x < east.x);
        assert_close(east.x - west.x, 20f64.to_radians() * p.scale(), 1e-9);
    }
}
