use foundation::math::GeoPoint;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    MultiPoint(Vec<GeoPoint>),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(Vec<Vec<GeoPoint>>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    /// Every vertex of the geometry, in storage order.
    pub fn points(&self) -> Vec<GeoPoint> {
        let mut out = Vec::new();
        self.collect_points(&mut out);
        out
    }

    fn collect_points(&self, out: &mut Vec<GeoPoint>) {
        match self {
            Geometry::Point(p) => out.push(*p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => out.extend_from_slice(ps),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                for line in lines {
                    out.extend_from_slice(line);
                }
            }
            Geometry::MultiPolygon(polys) => {
                for ring in polys.iter().flatten() {
                    out.extend_from_slice(ring);
                }
            }
            Geometry::GeometryCollection(geoms) => {
                for g in geoms {
                    g.collect_points(out);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    /// `None` for features whose topology geometry type is null.
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Vertices of every feature, used for projection fitting.
    pub fn points(&self) -> Vec<GeoPoint> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .flat_map(|g| g.points())
            .collect()
    }

    /// Emits a GeoJSON FeatureCollection.
    /// (Property ordering may differ from the source document.)
    pub fn to_geojson_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );

        let mut features: Vec<Value> = Vec::with_capacity(self.features.len());
        for feat in &self.features {
            let mut fobj = Map::new();
            fobj.insert("type".to_string(), Value::String("Feature".to_string()));
            if let Some(id) = &feat.id {
                fobj.insert("id".to_string(), Value::String(id.clone()));
            }

            fobj.insert(
                "properties".to_string(),
                Value::Object(feat.properties.clone()),
            );

            fobj.insert(
                "geometry".to_string(),
                feat.geometry
                    .as_ref()
                    .map(geometry_to_geojson_value)
                    .unwrap_or(Value::Null),
            );
            features.push(Value::Object(fobj));
        }

        root.insert("features".to_string(), Value::Array(features));
        Value::Object(root)
    }

    pub fn to_geojson_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_geojson_value())
    }
}

fn geometry_to_geojson_value(geom: &Geometry) -> Value {
    let mut obj = Map::new();
    let (ty, key, payload) = match geom {
        Geometry::Point(p) => ("Point", "coordinates", point_coords(p)),
        Geometry::MultiPoint(ps) => ("MultiPoint", "coordinates", points_coords(ps)),
        Geometry::LineString(ps) => ("LineString", "coordinates", points_coords(ps)),
        Geometry::MultiLineString(lines) => (
            "MultiLineString",
            "coordinates",
            Value::Array(lines.iter().map(|l| points_coords(l)).collect()),
        ),
        Geometry::Polygon(rings) => (
            "Polygon",
            "coordinates",
            Value::Array(rings.iter().map(|r| points_coords(r)).collect()),
        ),
        Geometry::MultiPolygon(polys) => (
            "MultiPolygon",
            "coordinates",
            Value::Array(
                polys
                    .iter()
                    .map(|poly| Value::Array(poly.iter().map(|r| points_coords(r)).collect()))
                    .collect(),
            ),
        ),
        Geometry::GeometryCollection(geoms) => (
            "GeometryCollection",
            "geometries",
            Value::Array(geoms.iter().map(geometry_to_geojson_value).collect()),
        ),
    };
    obj.insert("type".to_string(), Value::String(ty.to_string()));
    obj.insert(key.to_string(), payload);
    Value::Object(obj)
}

fn point_coords(p: &GeoPoint) -> Value {
    Value::Array(vec![Value::from(p.lon_deg), Value::from(p.lat_deg)])
}

fn points_coords(ps: &[GeoPoint]) -> Value {
    Value::Array(ps.iter().map(point_coords).collect())
}
