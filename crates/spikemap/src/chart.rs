use std::collections::BTreeSet;
use std::sync::Arc;

use formats::{FeatureCollection, GeoPoint, Topology, clip_box_ring, decode_topology};
use foundation::math::{Projection, ProjectionRegistry, Vec2};
use foundation::time::Time;
use layers::anchors::{Anchors, CentroidOverride, resolve_anchors};
use layers::path::GeoPath;
use layers::regions::{Region, RegionLayer};
use layers::scale::LinearScale;
use layers::spikes::{SPIKE_ID_PREFIX, Spike, SpikeLayer, spike_path};
use layers::symbology::PathStyle;
use layers::voronoi::{VoronoiCells, VoronoiLayer, VoronoiSite};
use layers::{Layer, element_id};
use scene::{NodeId, Scene};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Props, PropsOverrides};
use crate::error::SpikeMapError;

const REGION_LAYER: u64 = 0;
const SPIKE_LAYER: u64 = 1;
const VORONOI_LAYER: u64 = 2;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Element the chart draws into.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Container {
    pub width: f64,
}

impl Default for Container {
    fn default() -> Self {
        Self { width: 600.0 }
    }
}

/// A datum that survived the exclusion rule.
#[derive(Debug, Clone, PartialEq)]
struct Included {
    row: usize,
    feature_id: String,
    value: f64,
    anchor: GeoPoint,
    position: Vec2,
}

/// Spike map chart.
///
/// Geo data and rows are shared with the caller; everything derived from them
/// is rebuilt on every [`SpikeMap::draw`].
#[derive(Debug, Default)]
pub struct SpikeMap {
    props: Props,
    geo_data: Option<Arc<Topology>>,
    data: Option<Arc<Vec<Value>>>,
    container: Container,
    registry: ProjectionRegistry,
    scene: Scene,
    projection: Option<Projection>,
    anchors: Anchors,
    sites: Vec<VoronoiSite>,
    cells: VoronoiCells,
    hovered: Option<usize>,
}

impl SpikeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut Props {
        &mut self.props
    }

    pub fn update_props(&mut self, f: impl FnOnce(&mut Props)) -> &mut Self {
        f(&mut self.props);
        self
    }

    pub fn merge_overrides(&mut self, overrides: PropsOverrides) -> &mut Self {
        self.props.merge_overrides(overrides);
        self
    }

    pub fn set_geo_data(&mut self, topology: impl Into<Arc<Topology>>) -> &mut Self {
        self.geo_data = Some(topology.into());
        self
    }

    pub fn geo_data(&self) -> Result<&Topology, SpikeMapError> {
        self.geo_data.as_deref().ok_or(SpikeMapError::MissingGeoData)
    }

    pub fn set_data(&mut self, rows: impl Into<Arc<Vec<Value>>>) -> &mut Self {
        self.data = Some(rows.into());
        self
    }

    pub fn data(&self) -> Result<&[Value], SpikeMapError> {
        self.data
            .as_deref()
            .map(Vec::as_slice)
            .ok_or(SpikeMapError::MissingData)
    }

    pub fn set_container(&mut self, container: Container) -> &mut Self {
        self.container = container;
        self
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn registry_mut(&mut self) -> &mut ProjectionRegistry {
        &mut self.registry
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Projection fitted by the last draw.
    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn anchors(&self) -> &Anchors {
        &self.anchors
    }

    pub fn sites(&self) -> &[VoronoiSite] {
        &self.sites
    }

    pub fn cells(&self) -> &VoronoiCells {
        &self.cells
    }

    /// Plot size inside the margins.
    pub fn plot_size(&self) -> [f64; 2] {
        let m = self.props.layout.margin;
        let w = self.container.width;
        [
            w - m.left - m.right,
            w * self.props.layout.aspect_height - m.top - m.bottom,
        ]
    }

    /// Advances transitions to `now` (seconds).
    pub fn advance_to(&mut self, now: Time) {
        self.scene.advance_to(now);
    }

    /// The rendered svg element as markup; empty before the first draw.
    pub fn to_svg(&self) -> String {
        self.scene
            .select(self.scene.root(), "svg")
            .map(|svg| self.scene.to_svg(svg))
            .unwrap_or_default()
    }

    pub(crate) fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub(crate) fn set_hovered(&mut self, site: Option<usize>) {
        self.hovered = site;
    }

    pub(crate) fn rows(&self) -> Option<Arc<Vec<Value>>> {
        self.data.clone()
    }

    fn plot(&self) -> Option<NodeId> {
        let svg = self.scene.select(self.scene.root(), "svg")?;
        self.scene.select(svg, "g.plot")
    }

    pub(crate) fn spike_group(&self) -> Option<NodeId> {
        self.scene.select(self.plot()?, self.spike_layer().selector())
    }

    pub(crate) fn geometry_group(&self) -> Option<NodeId> {
        self.scene.select(self.plot()?, self.region_layer().selector())
    }

    pub(crate) fn spike_nodes(&self) -> Vec<NodeId> {
        self.spike_group()
            .map(|g| self.scene.children(g).to_vec())
            .unwrap_or_default()
    }

    pub(crate) fn geometry_nodes(&self) -> Vec<NodeId> {
        self.geometry_group()
            .map(|g| self.scene.children(g).to_vec())
            .unwrap_or_default()
    }

    fn region_layer(&self) -> RegionLayer {
        let g = &self.props.geometries;
        RegionLayer::new(
            REGION_LAYER,
            PathStyle::new(g.fill.as_str(), g.stroke.as_str(), g.stroke_width),
        )
    }

    fn spike_layer(&self) -> SpikeLayer {
        let s = &self.props.spikes;
        SpikeLayer::new(
            SPIKE_LAYER,
            PathStyle::new(s.fill.as_str(), s.stroke.as_str(), s.stroke_width),
        )
    }

    fn resolve_projection(&self) -> Projection {
        let layout = &self.props.layout;
        let projection = match self.registry.get(&layout.projection) {
            Some(p) => p,
            None => {
                let fallback = self.registry.fallback();
                warn!(
                    requested = %layout.projection,
                    fallback = fallback.name(),
                    "unknown projection; using fallback"
                );
                fallback
            }
        };
        match layout.rotate {
            Some(r) => projection.with_rotate(r),
            None => projection,
        }
    }

    /// Decodes, fits and reconciles the whole chart.
    pub fn draw(&mut self) -> Result<&mut Self, SpikeMapError> {
        let geo_data = Arc::clone(self.geo_data.as_ref().ok_or(SpikeMapError::MissingGeoData)?);
        let rows = Arc::clone(self.data.as_ref().ok_or(SpikeMapError::MissingData)?);
        self.props.validate()?;
        let props = self.props.clone();
        let [width, height] = self.plot_size();

        let mut features = decode_topology(&geo_data, &*props.geometries.get_objects)?;
        if let Some(keep) = &props.geometries.filter {
            features.features.retain(|f| keep(f));
        }

        let mut projection = self.resolve_projection();
        match props.layout.clip_extent {
            Some(extent) => projection.fit_size([width, height], clip_box_ring(extent)),
            None => projection.fit_size([width, height], features.points()),
        };

        let path = GeoPath::new(&projection);
        let centroid_override: Option<CentroidOverride<'_>> = props
            .geometries
            .get_centroid
            .as_deref()
            .map(|f| f as CentroidOverride<'_>);
        let anchors = resolve_anchors(
            &features.features,
            &*props.geometries.get_id,
            centroid_override,
            &path,
        );

        let included = include_rows(&rows, &props, &anchors, &projection);
        let scale = LinearScale::from_values(included.iter().map(|d| d.value), props.spikes.range);
        debug!(
            regions = features.features.len(),
            anchors = anchors.len(),
            rows = rows.len(),
            included = included.len(),
            projection = projection.name(),
            "drawing spike map"
        );

        let root = self.scene.root();
        let svg = self.scene.append_select(root, "svg");
        self.scene.set_attr(svg, "xmlns", SVG_NAMESPACE);
        let m = props.layout.margin;
        self.scene.set_attr(svg, "width", (width + m.left + m.right).to_string());
        self.scene.set_attr(svg, "height", (height + m.top + m.bottom).to_string());
        let plot = self.scene.append_select(svg, "g.plot");
        self.scene
            .set_attr(plot, "transform", format!("translate({},{})", m.left, m.top));

        let regions = build_regions(&features, &props, &path);
        self.region_layer().reconcile(&mut self.scene, plot, &regions);

        let spikes: Vec<Spike> = included
            .iter()
            .map(|d| Spike {
                feature_id: d.feature_id.clone(),
                class: (props.spikes.add_class)(&rows[d.row]),
                d: spike_path(d.position, scale.apply(d.value), props.spikes.base),
            })
            .collect();
        self.spike_layer().reconcile(&mut self.scene, plot, &spikes);

        self.sites = included
            .iter()
            .map(|d| VoronoiSite {
                datum: d.row,
                feature_id: d.feature_id.clone(),
                anchor: d.anchor,
                position: d.position,
            })
            .collect();
        let voronoi = VoronoiLayer::new(VORONOI_LAYER);
        self.cells = if props.voronoi.draw {
            voronoi.reconcile(&mut self.scene, plot, &self.sites, [width, height])
        } else {
            voronoi.remove(&mut self.scene, plot);
            VoronoiCells::default()
        };

        self.hovered = None;
        self.anchors = anchors;
        self.projection = Some(projection);
        Ok(self)
    }
}

/// Rows with a matching anchor and a finite value, first row per spike id.
fn include_rows(
    rows: &[Value],
    props: &Props,
    anchors: &Anchors,
    projection: &Projection,
) -> Vec<Included> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let Some(feature_id) = (props.spikes.get_feature_id)(row) else {
            debug!(row = i, "row has no feature id; excluded");
            continue;
        };
        let Some(anchor) = anchors.get(&feature_id) else {
            debug!(row = i, feature_id = %feature_id, "no region for row; excluded");
            continue;
        };
        let Some(value) = (props.spikes.get_value)(row).filter(|v| v.is_finite()) else {
            debug!(row = i, feature_id = %feature_id, "row has no finite value; excluded");
            continue;
        };
        let position = projection.project(anchor.centroid);
        if !position.is_finite() {
            debug!(row = i, feature_id = %feature_id, "anchor does not project; excluded");
            continue;
        }
        if !seen.insert(element_id(SPIKE_ID_PREFIX, &feature_id)) {
            debug!(row = i, feature_id = %feature_id, "duplicate spike id; excluded");
            continue;
        }
        out.push(Included {
            row: i,
            feature_id,
            value,
            anchor: anchor.centroid,
            position,
        });
    }
    out
}

fn build_regions(features: &FeatureCollection, props: &Props, path: &GeoPath<'_>) -> Vec<Region> {
    features
        .features
        .iter()
        .map(|f| Region {
            id: (props.geometries.get_id)(f),
            class: (props.geometries.add_class)(f),
            d: f.geometry.as_ref().and_then(|g| path.d(g)).unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Container, SpikeMap};
    use crate::error::SpikeMapError;
    use formats::Topology;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ONE_SQUARE: &str = r#"{
        "type": "Topology",
        "objects": {"land": {"type": "GeometryCollection", "geometries": [
            {"type": "Polygon", "id": "A", "arcs": [[0]]}
        ]}},
        "arcs": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
    }"#;

    #[test]
    fn plot_size_subtracts_margins() {
        let mut chart = SpikeMap::new();
        chart.set_container(Container { width: 600.0 });
        assert_eq!(chart.plot_size(), [560.0, 380.0]);
    }

    #[test]
    fn accessors_fail_until_set() {
        let mut chart = SpikeMap::new();
        assert!(matches!(chart.geo_data(), Err(SpikeMapError::MissingGeoData)));
        assert!(matches!(chart.data(), Err(SpikeMapError::MissingData)));

        chart.set_data(vec![json!({"id": "A", "value": 1})]);
        assert_eq!(chart.data().expect("data").len(), 1);
        let err = chart.draw().err().expect("missing topology");
        assert_eq!(err.to_string(), "Must pass topojson to SpikeMap::set_geo_data()");
    }

    #[test]
    fn unknown_projection_falls_back() {
        let mut chart = SpikeMap::new();
        chart
            .set_geo_data(Topology::from_json_str(ONE_SQUARE).expect("topology"))
            .set_data(vec![json!({"id": "A", "value": 1})])
            .update_props(|p| p.layout.projection = "geoNoSuchThing".to_string());
        chart.draw().expect("draw");
        assert_eq!(chart.projection().map(|p| p.name()), Some("naturalEarth1"));
    }

    #[test]
    fn invalid_props_stop_the_draw() {
        let mut chart = SpikeMap::new();
        chart
            .set_geo_data(Topology::from_json_str(ONE_SQUARE).expect("topology"))
            .set_data(Vec::<serde_json::Value>::new())
            .update_props(|p| p.layout.aspect_height = -1.0);
        assert!(matches!(chart.draw(), Err(SpikeMapError::InvalidProps(_))));
    }

    #[test]
    fn clip_extent_drives_the_fit() {
        let mut chart = SpikeMap::new();
        chart
            .set_geo_data(Topology::from_json_str(ONE_SQUARE).expect("topology"))
            .set_data(vec![json!({"id": "A", "value": 1})])
            .update_props(|p| {
                p.layout.projection = "equirectangular".to_string();
                p.layout.clip_extent = Some([[-20.0, -20.0], [20.0, 20.0]]);
            });
        chart.draw().expect("draw");
        let projection = chart.projection().expect("fitted");
        let [w, h] = chart.plot_size();
        let corner = projection.project(formats::GeoPoint::new(-20.0, 20.0));
        let k = w.min(h) / 40.0_f64.to_radians();
        assert!((projection.scale() - k).abs() < 1e-9);
        assert!((corner.x - (w - h) / 2.0).abs() < 1e-6);
        assert!(corner.y.abs() < 1e-6);
    }
}
