//! TopoJSON topologies and their decoding into features.
//!
//! Arcs are shared between geometries. With a `transform` present, arc
//! positions are quantized and delta-encoded; point coordinates are only
//! quantized. A negative arc index `i` refers to arc `!i` traversed backwards.

use std::fmt;

use foundation::math::GeoPoint;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::feature::{Feature, FeatureCollection, Geometry};

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("expected a Topology, got type {0:?}")]
    NotATopology(String),
    #[error("topology has no objects")]
    NoObjects,
    #[error("object selector did not match any topology object")]
    ObjectNotSelected,
    #[error("arc index {index} out of range ({count} arcs)")]
    ArcOutOfRange { index: i64, count: usize },
    #[error("position must have at least two coordinates")]
    ShortPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TopologyTransform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Topology {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transform: Option<TopologyTransform>,
    #[serde(default)]
    pub objects: Objects,
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
}

impl Topology {
    pub fn from_json_str(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Named topology objects in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Objects(Vec<(String, TopoGeometry)>);

impl Objects {
    pub fn first(&self) -> Option<&TopoGeometry> {
        self.0.first().map(|(_, g)| g)
    }

    pub fn get(&self, name: &str) -> Option<&TopoGeometry> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, g)| g)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Objects {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedObjects;

        impl<'de> Visitor<'de> for OrderedObjects {
            type Value = Objects;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of named topology objects")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Objects, A::Error> {
                let mut out = Vec::new();
                while let Some((name, geom)) = map.next_entry::<String, TopoGeometry>()? {
                    out.push((name, geom));
                }
                Ok(Objects(out))
            }
        }

        deserializer.deserialize_map(OrderedObjects)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopoGeometry {
    /// `None` for a geometry whose `type` is null.
    pub shape: Option<TopoShape>,
    pub id: Option<Value>,
    pub properties: Option<Map<String, Value>>,
}

impl<'de> Deserialize<'de> for TopoGeometry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        let id = map.remove("id").filter(|v| !v.is_null());
        let properties = match map.remove("properties") {
            None | Some(Value::Null) => None,
            Some(Value::Object(props)) => Some(props),
            Some(other) => {
                return Err(<D::Error as de::Error>::custom(format!(
                    "geometry properties must be an object, got {other}"
                )));
            }
        };
        let shape = if map.get("type").is_some_and(Value::is_null) {
            None
        } else {
            let shape = TopoShape::deserialize(Value::Object(map))
                .map_err(<D::Error as de::Error>::custom)?;
            Some(shape)
        };
        Ok(Self {
            shape,
            id,
            properties,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum TopoShape {
    GeometryCollection { geometries: Vec<TopoGeometry> },
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
}

/// Picks the topology object to decode.
pub type ObjectSelector = dyn Fn(&Objects) -> Option<&TopoGeometry> + Send + Sync;

/// Default selector: the first object in document order.
pub fn first_object(objects: &Objects) -> Option<&TopoGeometry> {
    objects.first()
}

/// Decodes the selected object into a feature collection.
///
/// A `GeometryCollection` yields one feature per member geometry; any other
/// object yields a single feature.
pub fn decode_topology(
    topology: &Topology,
    select: &ObjectSelector,
) -> Result<FeatureCollection, TopologyError> {
    if topology.kind != "Topology" {
        return Err(TopologyError::NotATopology(topology.kind.clone()));
    }
    if topology.objects.is_empty() {
        return Err(TopologyError::NoObjects);
    }
    let object = select(&topology.objects).ok_or(TopologyError::ObjectNotSelected)?;
    let decoder = ArcDecoder::new(topology)?;

    let features = match &object.shape {
        Some(TopoShape::GeometryCollection { geometries }) => geometries
            .iter()
            .map(|g| decoder.feature(g))
            .collect::<Result<Vec<_>, _>>()?,
        _ => vec![decoder.feature(object)?],
    };
    Ok(FeatureCollection::new(features))
}

struct ArcDecoder<'a> {
    transform: Option<TopologyTransform>,
    arcs: &'a [Vec<Vec<f64>>],
}

impl<'a> ArcDecoder<'a> {
    fn new(topology: &'a Topology) -> Result<Self, TopologyError> {
        if topology.arcs.iter().flatten().any(|p| p.len() < 2) {
            return Err(TopologyError::ShortPosition);
        }
        Ok(Self {
            transform: topology.transform,
            arcs: &topology.arcs,
        })
    }

    fn feature(&self, geom: &TopoGeometry) -> Result<Feature, TopologyError> {
        let id = match &geom.id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Ok(Feature {
            id,
            properties: geom.properties.clone().unwrap_or_default(),
            geometry: geom.shape.as_ref().map(|s| self.geometry(s)).transpose()?,
        })
    }

    fn geometry(&self, shape: &TopoShape) -> Result<Geometry, TopologyError> {
        Ok(match shape {
            TopoShape::GeometryCollection { geometries } => Geometry::GeometryCollection(
                geometries
                    .iter()
                    .filter_map(|g| g.shape.as_ref())
                    .map(|s| self.geometry(s))
                    .collect::<Result<_, _>>()?,
            ),
            TopoShape::Point { coordinates } => Geometry::Point(self.point(coordinates)?),
            TopoShape::MultiPoint { coordinates } => Geometry::MultiPoint(
                coordinates
                    .iter()
                    .map(|c| self.point(c))
                    .collect::<Result<_, _>>()?,
            ),
            TopoShape::LineString { arcs } => Geometry::LineString(self.line(arcs)?),
            TopoShape::MultiLineString { arcs } => Geometry::MultiLineString(
                arcs.iter().map(|a| self.line(a)).collect::<Result<_, _>>()?,
            ),
            TopoShape::Polygon { arcs } => Geometry::Polygon(self.polygon(arcs)?),
            TopoShape::MultiPolygon { arcs } => Geometry::MultiPolygon(
                arcs.iter()
                    .map(|p| self.polygon(p))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    fn point(&self, coords: &[f64]) -> Result<GeoPoint, TopologyError> {
        let [x, y] = match coords {
            [x, y, ..] => [*x, *y],
            _ => return Err(TopologyError::ShortPosition),
        };
        Ok(match self.transform {
            Some(t) => GeoPoint::new(
                x * t.scale[0] + t.translate[0],
                y * t.scale[1] + t.translate[1],
            ),
            None => GeoPoint::new(x, y),
        })
    }

    /// Appends arc `index` to `points`, dropping the shared junction vertex.
    fn push_arc(&self, index: i64, points: &mut Vec<GeoPoint>) -> Result<(), TopologyError> {
        let resolved = if index < 0 { !index } else { index };
        let arc = usize::try_from(resolved)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .ok_or(TopologyError::ArcOutOfRange {
                index,
                count: self.arcs.len(),
            })?;

        points.pop();
        let start = points.len();
        let (mut x, mut y) = (0.0, 0.0);
        for position in arc {
            let p = match self.transform {
                Some(t) => {
                    x += position[0];
                    y += position[1];
                    GeoPoint::new(x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                }
                None => GeoPoint::new(position[0], position[1]),
            };
            points.push(p);
        }
        if index < 0 {
            points[start..].reverse();
        }
        Ok(())
    }

    fn line(&self, arcs: &[i64]) -> Result<Vec<GeoPoint>, TopologyError> {
        let mut points = Vec::new();
        for &a in arcs {
            self.push_arc(a, &mut points)?;
        }
        if points.len() == 1 {
            points.push(points[0]);
        }
        Ok(points)
    }

    fn ring(&self, arcs: &[i64]) -> Result<Vec<GeoPoint>, TopologyError> {
        let mut points = self.line(arcs)?;
        if let Some(&first) = points.first() {
            while points.len() < 4 {
                points.push(first);
            }
        }
        Ok(points)
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Vec<Vec<GeoPoint>>, TopologyError> {
        rings.iter().map(|r| self.ring(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Two unit squares sharing the edge x = 1, quantized with a 0.5 scale.
    const TWO_SQUARES: &str = r#"{
        "type": "Topology",
        "transform": {"scale": [0.5, 0.5], "translate": [10, 20]},
        "objects": {
            "regions": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "id": "A", "properties": {"name": "West"}, "arcs": [[0, 1]]},
                    {"type": "Polygon", "id": 7, "arcs": [[-1, 2]]}
                ]
            },
            "labels": {"type": "Point", "coordinates": [4, 4]}
        },
        "arcs": [
            [[2, 0], [0, 2]],
            [[2, 2], [-2, 0], [0, -2], [2, 0]],
            [[2, 0], [2, 0], [0, 2], [-2, 0]]
        ]
    }"#;

    fn topo() -> Topology {
        Topology::from_json_str(TWO_SQUARES).expect("parse topology")
    }

    fn labels(objects: &Objects) -> Option<&TopoGeometry> {
        objects.get("labels")
    }

    fn missing(objects: &Objects) -> Option<&TopoGeometry> {
        objects.get("missing")
    }

    fn pts(v: &[[f64; 2]]) -> Vec<GeoPoint> {
        v.iter().map(|p| GeoPoint::new(p[0], p[1])).collect()
    }

    #[test]
    fn objects_keep_document_order() {
        let t = topo();
        let names: Vec<&str> = t.objects.names().collect();
        assert_eq!(names, vec!["regions", "labels"]);
    }

    #[test]
    fn decodes_shared_and_reversed_arcs() {
        let fc = decode_topology(&topo(), &first_object).expect("decode");
        assert_eq!(fc.features.len(), 2);

        let west = &fc.features[0];
        assert_eq!(west.id.as_deref(), Some("A"));
        assert_eq!(west.properties["name"], "West");
        assert_eq!(
            west.geometry,
            Some(Geometry::Polygon(vec![pts(&[
                [11.0, 20.0],
                [11.0, 21.0],
                [10.0, 21.0],
                [10.0, 20.0],
                [11.0, 20.0],
            ])]))
        );

        let east = &fc.features[1];
        assert_eq!(east.id.as_deref(), Some("7"));
        assert_eq!(
            east.geometry,
            Some(Geometry::Polygon(vec![pts(&[
                [11.0, 21.0],
                [11.0, 20.0],
                [12.0, 20.0],
                [12.0, 21.0],
                [11.0, 21.0],
            ])]))
        );
    }

    #[test]
    fn single_object_becomes_one_feature() {
        let fc = decode_topology(&topo(), &labels).expect("decode");
        assert_eq!(fc.features.len(), 1);
        assert_eq!(
            fc.features[0].geometry,
            Some(Geometry::Point(GeoPoint::new(12.0, 22.0)))
        );
    }

    #[test]
    fn reports_selection_and_arc_errors() {
        let t = topo();
        assert!(matches!(
            decode_topology(&t, &missing),
            Err(TopologyError::ObjectNotSelected)
        ));

        let bad: Topology = serde_json::from_str(
            r#"{"type":"Topology","objects":{"x":{"type":"LineString","arcs":[5]}},"arcs":[]}"#,
        )
        .expect("parse");
        assert!(matches!(
            decode_topology(&bad, &first_object),
            Err(TopologyError::ArcOutOfRange { index: 5, count: 0 })
        ));
    }

    #[test]
    fn null_geometries_decode_to_empty_features() {
        let t = Topology::from_json_str(
            r#"{"type":"Topology","objects":{"regions":{"type":"GeometryCollection","geometries":[
                {"type":"Point","id":"A","coordinates":[1,2]},
                {"type":null,"id":"B","properties":{"name":"Nowhere"}}
            ]}},"arcs":[]}"#,
        )
        .expect("parse");
        let fc = decode_topology(&t, &first_object).expect("decode");
        assert_eq!(fc.features.len(), 2);
        assert_eq!(fc.features[1].id.as_deref(), Some("B"));
        assert_eq!(fc.features[1].properties["name"], "Nowhere");
        assert_eq!(fc.features[1].geometry, None);
        assert_eq!(fc.points(), vec![GeoPoint::new(1.0, 2.0)]);

        let missing_type = Topology::from_json_str(
            r#"{"type":"Topology","objects":{"x":{"id":"C"}},"arcs":[]}"#,
        );
        assert!(missing_type.is_err());
    }

    #[test]
    fn rejects_non_topology_documents() {
        let t: Topology =
            serde_json::from_str(r#"{"type":"FeatureCollection"}"#).expect("parse");
        assert!(matches!(
            decode_topology(&t, &first_object),
            Err(TopologyError::NotATopology(_))
        ));
    }
}
