//! Chart configuration: four option groups with explicit defaults and
//! per-group overrides.

use std::fmt;
use std::sync::Arc;

use formats::{Feature, GeoPoint, ObjectSelector, Objects, TopoGeometry, first_object};
use foundation::math::DEFAULT_PROJECTION;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SpikeMapError;
use crate::interaction::{HoverContext, PointerEvent};

pub type FeatureFn<T> = Arc<dyn Fn(&Feature) -> T + Send + Sync>;
pub type RowFn<T> = Arc<dyn Fn(&Value) -> T + Send + Sync>;
pub type HoverFn = Arc<dyn Fn(&PointerEvent, &Value, &mut HoverContext<'_>) + Send + Sync>;

#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 20.0,
            left: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutProps {
    pub margin: Margin,
    /// Svg height as a fraction of the container width.
    pub aspect_height: f64,
    pub projection: String,
    /// Central-meridian rotation in degrees; `None` keeps the projection's own.
    pub rotate: Option<f64>,
    /// `[[lon0, lat0], [lon1, lat1]]` box to fit instead of the features.
    pub clip_extent: Option<[[f64; 2]; 2]>,
}

impl Default for LayoutProps {
    fn default() -> Self {
        Self {
            margin: Margin::default(),
            aspect_height: 0.7,
            projection: DEFAULT_PROJECTION.to_string(),
            rotate: None,
            clip_extent: None,
        }
    }
}

#[derive(Clone)]
pub struct GeometryProps {
    pub get_objects: Arc<ObjectSelector>,
    pub filter: Option<FeatureFn<bool>>,
    pub get_centroid: Option<FeatureFn<Option<GeoPoint>>>,
    pub get_id: FeatureFn<Option<String>>,
    pub add_class: FeatureFn<String>,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

impl Default for GeometryProps {
    fn default() -> Self {
        Self {
            get_objects: object_selector(first_object),
            filter: None,
            get_centroid: None,
            get_id: Arc::new(|f: &Feature| f.id.clone()),
            add_class: Arc::new(|_: &Feature| String::new()),
            fill: "#ddd".to_string(),
            stroke: "#fff".to_string(),
            stroke_width: 1.0,
        }
    }
}

impl fmt::Debug for GeometryProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryProps")
            .field("filter", &self.filter.is_some())
            .field("get_centroid", &self.get_centroid.is_some())
            .field("fill", &self.fill)
            .field("stroke", &self.stroke)
            .field("stroke_width", &self.stroke_width)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct SpikeProps {
    pub get_feature_id: RowFn<Option<String>>,
    pub get_value: RowFn<Option<f64>>,
    pub range: [f64; 2],
    pub base: f64,
    pub add_class: RowFn<String>,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

impl Default for SpikeProps {
    fn default() -> Self {
        Self {
            get_feature_id: Arc::new(|row: &Value| default_feature_id(row)),
            get_value: Arc::new(|row: &Value| row.get("value").and_then(Value::as_f64)),
            range: [0.0, 40.0],
            base: 4.0,
            add_class: Arc::new(|_: &Value| String::new()),
            fill: "transparent".to_string(),
            stroke: "#333".to_string(),
            stroke_width: 1.0,
        }
    }
}

impl fmt::Debug for SpikeProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpikeProps")
            .field("range", &self.range)
            .field("base", &self.base)
            .field("fill", &self.fill)
            .field("stroke", &self.stroke)
            .field("stroke_width", &self.stroke_width)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct VoronoiProps {
    pub draw: bool,
    pub mouseover: HoverFn,
    pub mouseout: HoverFn,
}

impl Default for VoronoiProps {
    fn default() -> Self {
        Self {
            draw: true,
            mouseover: Arc::new(|_: &PointerEvent, _: &Value, _: &mut HoverContext<'_>| {}),
            mouseout: Arc::new(|_: &PointerEvent, _: &Value, _: &mut HoverContext<'_>| {}),
        }
    }
}

impl fmt::Debug for VoronoiProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoronoiProps")
            .field("draw", &self.draw)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Props {
    pub layout: LayoutProps,
    pub geometries: GeometryProps,
    pub spikes: SpikeProps,
    pub voronoi: VoronoiProps,
}

impl Props {
    pub fn validate(&self) -> Result<(), SpikeMapError> {
        let invalid = |msg: String| Err(SpikeMapError::InvalidProps(msg));
        let m = &self.layout.margin;
        if ![m.top, m.right, m.bottom, m.left].iter().all(|v| v.is_finite()) {
            return invalid(format!("margins must be finite, got {m:?}"));
        }
        let aspect = self.layout.aspect_height;
        if !(aspect.is_finite() && aspect > 0.0) {
            return invalid(format!("aspect_height must be positive, got {aspect}"));
        }
        if self.layout.rotate.is_some_and(|r| !r.is_finite()) {
            return invalid("rotate must be finite".to_string());
        }
        if let Some(extent) = self.layout.clip_extent
            && !extent.iter().flatten().all(|v| v.is_finite())
        {
            return invalid(format!("clip_extent must be finite, got {extent:?}"));
        }
        if !self.spikes.range.iter().all(|v| v.is_finite()) {
            return invalid(format!("spike range must be finite, got {:?}", self.spikes.range));
        }
        for (name, v) in [
            ("spike base", self.spikes.base),
            ("spike stroke_width", self.spikes.stroke_width),
            ("geometry stroke_width", self.geometries.stroke_width),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return invalid(format!("{name} must be non-negative, got {v}"));
            }
        }
        Ok(())
    }

    /// Applies `overrides` group by group; keys left out keep their value.
    pub fn merge_overrides(&mut self, overrides: PropsOverrides) {
        let PropsOverrides {
            margin,
            aspect_height,
            projection,
            rotate,
            clip_extent,
            geometries,
            spikes,
            voronoi,
        } = overrides;

        if let Some(m) = margin {
            let margin = &mut self.layout.margin;
            set(&mut margin.top, m.top);
            set(&mut margin.right, m.right);
            set(&mut margin.bottom, m.bottom);
            set(&mut margin.left, m.left);
        }
        set(&mut self.layout.aspect_height, aspect_height);
        set(&mut self.layout.projection, projection);
        if rotate.is_some() {
            self.layout.rotate = rotate;
        }
        if clip_extent.is_some() {
            self.layout.clip_extent = clip_extent;
        }

        if let Some(g) = geometries {
            let props = &mut self.geometries;
            if let Some(name) = g.object {
                props.get_objects = object_selector(move |objects| objects.get(&name));
            }
            if let Some(key) = g.id_property {
                props.get_id = Arc::new(move |f: &Feature| f.properties.get(&key).and_then(scalar_to_string));
            }
            set(&mut props.fill, g.fill);
            set(&mut props.stroke, g.stroke);
            set(&mut props.stroke_width, g.stroke_width);
        }

        if let Some(s) = spikes {
            let props = &mut self.spikes;
            if let Some(key) = s.id_field {
                props.get_feature_id =
                    Arc::new(move |row: &Value| row.get(&key).and_then(scalar_to_string));
            }
            if let Some(key) = s.value_field {
                props.get_value = Arc::new(move |row: &Value| row.get(&key).and_then(Value::as_f64));
            }
            set(&mut props.range, s.range);
            set(&mut props.base, s.base);
            set(&mut props.fill, s.fill);
            set(&mut props.stroke, s.stroke);
            set(&mut props.stroke_width, s.stroke_width);
        }

        if let Some(v) = voronoi {
            set(&mut self.voronoi.draw, v.draw);
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Boxes a selector closure with the signature topology decoding expects.
pub fn object_selector<F>(f: F) -> Arc<ObjectSelector>
where
    F: Fn(&Objects) -> Option<&TopoGeometry> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The row itself when it is a string or number, otherwise its `id` field.
pub fn default_feature_id(row: &Value) -> Option<String> {
    match row {
        Value::Object(map) => map.get("id").and_then(scalar_to_string),
        other => scalar_to_string(other),
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// JSON overrides. Layout keys sit at the top level next to the
/// `geometries`, `spikes` and `voronoi` groups.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropsOverrides {
    pub margin: Option<MarginOverrides>,
    pub aspect_height: Option<f64>,
    pub projection: Option<String>,
    pub rotate: Option<f64>,
    pub clip_extent: Option<[[f64; 2]; 2]>,
    pub geometries: Option<GeometryOverrides>,
    pub spikes: Option<SpikeOverrides>,
    pub voronoi: Option<VoronoiOverrides>,
}

impl PropsOverrides {
    pub fn from_json_str(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarginOverrides {
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeometryOverrides {
    /// Name of the topology object to draw.
    pub object: Option<String>,
    /// Feature property holding the region id.
    pub id_property: Option<String>,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpikeOverrides {
    /// Row field holding the feature id.
    pub id_field: Option<String>,
    /// Row field holding the value.
    pub value_field: Option<String>,
    pub range: Option<[f64; 2]>,
    pub base: Option<f64>,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoronoiOverrides {
    pub draw: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::{Props, PropsOverrides, default_feature_id};
    use crate::error::SpikeMapError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn group_overrides_keep_other_keys() {
        let mut props = Props::default();
        let overrides = PropsOverrides::from_json_str(
            r#"{"margin": {"top": 5}, "spikes": {"base": 8}, "projection": "geoMercator"}"#,
        )
        .expect("overrides");
        props.merge_overrides(overrides);

        assert_eq!(props.layout.margin.top, 5.0);
        assert_eq!(props.layout.margin.left, 20.0);
        assert_eq!(props.layout.aspect_height, 0.7);
        assert_eq!(props.layout.projection, "geoMercator");
        assert_eq!(props.spikes.base, 8.0);
        assert_eq!(props.spikes.range, [0.0, 40.0]);
        assert_eq!(props.spikes.stroke, "#333");
        assert_eq!(props.geometries.fill, "#ddd");
        assert!(props.voronoi.draw);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PropsOverrides::from_json_str(r#"{"spikes": {"heigth": 3}}"#).is_err());
    }

    #[test]
    fn field_overrides_replace_accessors() {
        let mut props = Props::default();
        props.merge_overrides(
            PropsOverrides::from_json_str(r#"{"spikes": {"idField": "fips", "valueField": "cases"}}"#)
                .expect("overrides"),
        );
        let row = json!({"fips": 6037, "cases": 12.5, "id": "x"});
        assert_eq!((props.spikes.get_feature_id)(&row), Some("6037".to_string()));
        assert_eq!((props.spikes.get_value)(&row), Some(12.5));
    }

    #[test]
    fn default_feature_id_accepts_scalars_and_rows() {
        assert_eq!(default_feature_id(&json!("A")), Some("A".to_string()));
        assert_eq!(default_feature_id(&json!(6)), Some("6".to_string()));
        assert_eq!(default_feature_id(&json!({"id": "B"})), Some("B".to_string()));
        assert_eq!(default_feature_id(&json!({"name": "B"})), None);
        assert_eq!(default_feature_id(&json!(null)), None);
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(Props::default().validate().is_ok());

        let mut props = Props::default();
        props.layout.aspect_height = 0.0;
        assert!(matches!(props.validate(), Err(SpikeMapError::InvalidProps(_))));

        let mut props = Props::default();
        props.spikes.base = -1.0;
        assert!(props.validate().is_err());

        let mut props = Props::default();
        props.layout.margin.left = f64::NAN;
        assert!(props.validate().is_err());

        let mut props = Props::default();
        props.spikes.range = [0.0, f64::INFINITY];
        assert!(props.validate().is_err());
    }
}
