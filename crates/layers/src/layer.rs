use scene::{NodeId, Scene};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// A named group of elements under the plot group.
pub trait Layer {
    fn id(&self) -> LayerId;

    /// `tag.class` selector of the layer group, e.g. `g.spikes`.
    fn selector(&self) -> &'static str;

    /// The layer group under `plot`, created on first use.
    fn group(&self, scene: &mut Scene, plot: NodeId) -> NodeId {
        scene.append_select(plot, self.selector())
    }
}

/// Element id of a keyed element: `<prefix>-<slug(key)>`.
pub fn element_id(prefix: &str, key: &str) -> String {
    format!("{prefix}-{}", slug::slugify(key))
}
