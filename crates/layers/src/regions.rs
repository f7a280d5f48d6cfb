use std::collections::BTreeSet;

use scene::{NodeId, Scene};
use tracing::debug;

use crate::layer::{Layer, LayerId, element_id};
use crate::symbology::PathStyle;

pub const REGION_ID_PREFIX: &str = "geometry";

/// One region path ready to bind. Regions without an id are drawn but get no
/// element id.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: Option<String>,
    pub class: String,
    pub d: String,
}

impl Region {
    pub fn element_id(&self) -> Option<String> {
        self.id.as_deref().map(|id| element_id(REGION_ID_PREFIX, id))
    }
}

/// Join key of every region: the element id for the first region carrying
/// it, a positional key otherwise.
fn region_keys(regions: &[Region]) -> Vec<(String, bool)> {
    let mut seen = BTreeSet::new();
    regions
        .iter()
        .enumerate()
        .map(|(i, region)| match region.element_id() {
            Some(id) if seen.insert(id.clone()) => (id, true),
            Some(id) => {
                debug!(id = %id, index = i, "duplicate region id; drawn without element id");
                (format!("{REGION_ID_PREFIX}#{i}"), false)
            }
            None => (format!("{REGION_ID_PREFIX}#{i}"), false),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionLayer {
    id: LayerId,
    style: PathStyle,
}

impl Layer for RegionLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn selector(&self) -> &'static str {
        "g.geometries"
    }
}

impl RegionLayer {
    pub fn new(id: u64, style: PathStyle) -> Self {
        Self {
            id: LayerId(id),
            style,
        }
    }

    /// Binds `regions` to the region paths under `plot`; every attribute is
    /// reassigned on each call, without transitions.
    pub fn reconcile(
        &self,
        scene: &mut Scene,
        plot: NodeId,
        regions: &[Region],
    ) -> Vec<(usize, NodeId)> {
        let group = self.group(scene, plot);
        let keyed = region_keys(regions);
        let keys: Vec<String> = keyed.iter().map(|(k, _)| k.clone()).collect();
        let join = scene.join_keyed(group, "path", &keys);
        debug!(
            layer = self.id().0,
            regions = regions.len(),
            removed = join.exit.len(),
            "reconciling regions"
        );

        let bound = scene.apply_join(group, "path", &join);
        for (i, node) in &bound {
            let region = &regions[*i];
            if keyed[*i].1 {
                scene.set_element_id(*node, keys[*i].as_str());
            }
            scene.set_class(*node, region.class.as_str());
            scene.set_attr(*node, "d", region.d.as_str());
            self.style.apply(scene, *node);
        }
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::{Region, RegionLayer};
    use crate::symbology::PathStyle;
    use scene::Scene;

    fn region(id: &str, class: &str) -> Region {
        Region {
            id: Some(id.to_string()),
            class: class.to_string(),
            d: format!("M0,0L1,1Z{id}"),
        }
    }

    #[test]
    fn regions_are_replaced_each_call() {
        let mut scene = Scene::new();
        let plot = scene.append(scene.root(), "g.plot");
        let layer = RegionLayer::new(0, PathStyle::new("#ddd", "#fff", 1.0));

        layer.reconcile(&mut scene, plot, &[region("A", ""), region("B", "")]);
        let b = scene.element_by_id("geometry-b").expect("region b");
        assert_eq!(scene.style(b, "fill"), Some("#ddd"));
        assert_eq!(scene.style(b, "stroke-width"), Some("1"));

        layer.reconcile(&mut scene, plot, &[region("B", "highlight")]);
        assert_eq!(scene.element_by_id("geometry-a"), None);
        assert_eq!(scene.element_by_id("geometry-b"), Some(b));
        assert!(scene.node(b).expect("node").has_class("highlight"));
        assert!(scene.transitions().is_empty());
    }

    #[test]
    fn regions_without_usable_id_are_still_drawn() {
        let mut scene = Scene::new();
        let plot = scene.append(scene.root(), "g.plot");
        let layer = RegionLayer::new(0, PathStyle::default());
        let unnamed = Region {
            id: None,
            class: String::new(),
            d: "M0,0L2,2Z".to_string(),
        };
        let regions = [region("A", ""), unnamed.clone(), region("A", "second")];

        let bound = layer.reconcile(&mut scene, plot, &regions);
        assert_eq!(bound.len(), 3);
        let group = scene.select(plot, "g.geometries").expect("group");
        assert_eq!(scene.children(group).len(), 3);
        assert_eq!(scene.element_by_id("geometry-a"), Some(bound[0].1));
        assert_eq!(scene.element_id(bound[1].1), None);
        assert_eq!(scene.attr(bound[1].1, "d"), Some("M0,0L2,2Z"));
        assert_eq!(scene.element_id(bound[2].1), None);
        assert!(scene.node(bound[2].1).expect("node").has_class("second"));

        let again = layer.reconcile(&mut scene, plot, &regions);
        assert_eq!(again, bound);
    }
}
