use std::collections::BTreeMap;

use formats::{Feature, GeoPoint};
use tracing::warn;

use crate::path::GeoPath;

pub type IdAccessor<'a> = &'a dyn Fn(&Feature) -> Option<String>;
pub type CentroidOverride<'a> = &'a dyn Fn(&Feature) -> Option<GeoPoint>;

/// Representative point of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: String,
    pub centroid: GeoPoint,
}

/// Anchors of one draw, in region order, looked up by region id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Anchors {
    anchors: Vec<Anchor>,
    by_id: BTreeMap<String, usize>,
}

impl Anchors {
    /// Inserts or replaces the anchor of `anchor.id`; the later one wins and
    /// keeps the position of the first.
    pub fn insert(&mut self, anchor: Anchor) {
        match self.by_id.get(&anchor.id) {
            Some(&i) => self.anchors[i] = anchor,
            None => {
                self.by_id.insert(anchor.id.clone(), self.anchors.len());
                self.anchors.push(anchor);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Anchor> {
        self.by_id.get(id).map(|&i| &self.anchors[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Resolves one anchor per region.
///
/// The override is used verbatim when supplied. Otherwise the planar centroid
/// of the projected region is inverted through the path's projection, so the
/// projection must already be fitted. Regions without an id or without a
/// resolvable centroid are skipped.
pub fn resolve_anchors(
    features: &[Feature],
    get_id: IdAccessor<'_>,
    get_centroid: Option<CentroidOverride<'_>>,
    path: &GeoPath<'_>,
) -> Anchors {
    let mut anchors = Anchors::default();
    for (i, feature) in features.iter().enumerate() {
        let Some(id) = get_id(feature) else {
            warn!(index = i, "region has no id; skipping");
            continue;
        };
        if anchors.contains(&id) {
            warn!(id = %id, "duplicate region id; later anchor wins");
        }

        let centroid = match get_centroid {
            Some(f) => f(feature),
            None => feature
                .geometry
                .as_ref()
                .and_then(|g| path.centroid(g))
                .and_then(|c| path.projection().invert(c)),
        };
        let Some(centroid) = centroid else {
            warn!(id = %id, "region centroid could not be resolved; skipping");
            continue;
        };
        anchors.insert(Anchor { id, centroid });
    }
    anchors
}

#[cfg(test)]
mod tests {
    use super::{Anchor, Anchors, resolve_anchors};
    use crate::path::GeoPath;
    use formats::{Feature, GeoPoint, Geometry};
    use foundation::math::equirectangular;
    use serde_json::Map;

    fn region(id: Option<&str>, x0: f64) -> Feature {
        Feature {
            id: id.map(str::to_string),
            properties: Map::new(),
            geometry: Some(Geometry::Polygon(vec![vec![
                GeoPoint::new(x0, 0.0),
                GeoPoint::new(x0 + 2.0, 0.0),
                GeoPoint::new(x0 + 2.0, 2.0),
                GeoPoint::new(x0, 2.0),
                GeoPoint::new(x0, 0.0),
            ]])),
        }
    }

    fn feature_id(f: &Feature) -> Option<String> {
        f.id.clone()
    }

    fn fixed_centroid(_: &Feature) -> Option<GeoPoint> {
        Some(GeoPoint::new(-75.0, 40.0))
    }

    #[test]
    fn inverts_projected_centroid() {
        let mut projection = equirectangular();
        let features = vec![region(Some("A"), 0.0), region(Some("B"), 10.0)];
        projection.fit_size(
            [400.0, 200.0],
            features.iter().flat_map(|f| f.geometry.as_ref().map(|g| g.points()).unwrap_or_default()),
        );
        let path = GeoPath::new(&projection);
        let anchors = resolve_anchors(&features, &feature_id, None, &path);

        assert_eq!(anchors.len(), 2);
        let b = anchors.get("B").expect("anchor").centroid;
        assert!((b.lon_deg - 11.0).abs() < 1e-6);
        assert!((b.lat_deg - 1.0).abs() < 1e-6);
    }

    #[test]
    fn override_is_used_verbatim_and_missing_ids_skip() {
        let projection = equirectangular();
        let path = GeoPath::new(&projection);
        let features = vec![region(None, 0.0), region(Some("B"), 10.0)];
        let anchors = resolve_anchors(&features, &feature_id, Some(&fixed_centroid), &path);
        assert_eq!(anchors.len(), 1);
        assert_eq!(
            anchors.get("B"),
            Some(&Anchor {
                id: "B".into(),
                centroid: GeoPoint::new(-75.0, 40.0)
            })
        );
    }

    #[test]
    fn later_duplicate_overwrites() {
        let mut anchors = Anchors::default();
        anchors.insert(Anchor {
            id: "A".into(),
            centroid: GeoPoint::new(0.0, 0.0),
        });
        anchors.insert(Anchor {
            id: "B".into(),
            centroid: GeoPoint::new(5.0, 5.0),
        });
        anchors.insert(Anchor {
            id: "A".into(),
            centroid: GeoPoint::new(1.0, 1.0),
        });
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors.get("A").map(|a| a.centroid), Some(GeoPoint::new(1.0, 1.0)));
        assert_eq!(anchors.iter().next().map(|a| a.id.as_str()), Some("A"));
    }
}
