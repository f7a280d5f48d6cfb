use scene::{NodeId, Scene};

/// Fill and stroke of a layer's paths.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStyle {
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

impl PathStyle {
    pub fn new(fill: impl Into<String>, stroke: impl Into<String>, stroke_width: f64) -> Self {
        Self {
            fill: fill.into(),
            stroke: stroke.into(),
            stroke_width,
        }
    }

    pub fn apply(&self, scene: &mut Scene, node: NodeId) {
        scene.set_style(node, "fill", self.fill.as_str());
        scene.set_style(node, "stroke", self.stroke.as_str());
        scene.set_style(node, "stroke-width", self.stroke_width.to_string());
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            fill: "transparent".to_string(),
            stroke: "none".to_string(),
            stroke_width: 0.0,
        }
    }
}
