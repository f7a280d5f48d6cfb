use foundation::math::Vec2;
use scene::{NodeId, Scene};
use tracing::debug;

use crate::layer::{Layer, LayerId, element_id};
use crate::symbology::PathStyle;

/// Duration of the path transition on updated spikes, in seconds.
pub const SPIKE_TRANSITION_S: f64 = 0.5;

pub const SPIKE_ID_PREFIX: &str = "spike";

/// Isosceles triangle standing on `anchor`, apex `height` pixels above it.
pub fn spike_path(anchor: Vec2, height: f64, base: f64) -> String {
    let b = base / 2.0;
    format!(
        "M{} {} L{} {} L{} {}",
        anchor.x - b,
        anchor.y,
        anchor.x,
        anchor.y - height,
        anchor.x + b,
        anchor.y
    )
}

/// One spike ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub struct Spike {
    pub feature_id: String,
    pub class: String,
    pub d: String,
}

impl Spike {
    pub fn element_id(&self) -> String {
        element_id(SPIKE_ID_PREFIX, &self.feature_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpikeLayer {
    id: LayerId,
    style: PathStyle,
}

impl Layer for SpikeLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn selector(&self) -> &'static str {
        "g.spikes"
    }
}

impl SpikeLayer {
    pub fn new(id: u64, style: PathStyle) -> Self {
        Self {
            id: LayerId(id),
            style,
        }
    }

    /// Binds `spikes` to the spike paths under `plot`.
    ///
    /// Entering spikes get their path at once, updated ones transition to the
    /// new path and spikes without a datum are removed. Returns the bound path
    /// of every spike index, duplicates excluded.
    pub fn reconcile(
        &self,
        scene: &mut Scene,
        plot: NodeId,
        spikes: &[Spike],
    ) -> Vec<(usize, NodeId)> {
        let group = self.group(scene, plot);
        let keys: Vec<String> = spikes.iter().map(Spike::element_id).collect();
        let join = scene.join_keyed(group, "path", &keys);
        for i in &join.duplicates {
            debug!(id = %keys[*i], "duplicate spike id; keeping the first");
        }
        debug!(
            layer = self.id().0,
            enter = join.enter.len(),
            update = join.update.len(),
            exit = join.exit.len(),
            "reconciling spikes"
        );

        let mut entering = vec![false; spikes.len()];
        for (i, _) in &join.enter {
            entering[*i] = true;
        }
        let bound = scene.apply_join(group, "path", &join);
        for (i, node) in &bound {
            let spike = &spikes[*i];
            if entering[*i] {
                scene.set_element_id(*node, keys[*i].as_str());
                scene.set_attr(*node, "d", spike.d.as_str());
            } else {
                scene.transition_attr(*node, "d", spike.d.as_str(), SPIKE_TRANSITION_S);
            }
            scene.set_class(*node, spike.class.as_str());
            scene.set_style(*node, "pointer-events", "none");
            self.style.apply(scene, *node);
        }
        bound
    }
}
