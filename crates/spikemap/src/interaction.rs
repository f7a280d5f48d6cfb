use std::sync::Arc;

use foundation::math::Vec2;
use layers::regions::REGION_ID_PREFIX;
use layers::spikes::SPIKE_ID_PREFIX;
use layers::element_id;
use scene::{NodeId, Scene};
use tracing::trace;

use crate::chart::SpikeMap;
use crate::config::HoverFn;

/// Pointer position in svg coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Elements of the hovered datum; absent when nothing was rendered for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Selected {
    pub spike: Option<NodeId>,
    pub geometry: Option<NodeId>,
}

/// What hover callbacks may see and touch.
#[derive(Debug)]
pub struct HoverContext<'a> {
    scene: &'a mut Scene,
    selected: Option<Selected>,
    spikes: Vec<NodeId>,
    geometries: Vec<NodeId>,
}

impl<'a> HoverContext<'a> {
    /// Set on mouseover only.
    pub fn selected(&self) -> Option<Selected> {
        self.selected
    }

    pub fn spikes(&self) -> &[NodeId] {
        &self.spikes
    }

    pub fn geometries(&self) -> &[NodeId] {
        &self.geometries
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.scene.element_by_id(id)
    }

    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        self.scene.element_id(node)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.scene.attr(node, name)
    }

    pub fn style(&self, node: NodeId, name: &str) -> Option<&str> {
        self.scene.style(node, name)
    }

    pub fn set_style(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        self.scene.set_style(node, name, value);
    }

    pub fn raise(&mut self, node: NodeId) {
        self.scene.raise(node);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum HoverKind {
    Over,
    Out,
}

impl SpikeMap {
    /// Hit-tests the voronoi cells at `event` and fires mouseout for the
    /// previously hovered cell and mouseover for the new one.
    pub fn pointer_move(&mut self, event: PointerEvent) {
        let margin = self.props().layout.margin;
        let p = Vec2::new(event.x - margin.left, event.y - margin.top);
        let hit = self.cells().pick(p);
        if hit == self.hovered() {
            return;
        }
        if let Some(old) = self.hovered() {
            self.fire(HoverKind::Out, old, &event);
        }
        self.set_hovered(hit);
        if let Some(new) = hit {
            self.fire(HoverKind::Over, new, &event);
        }
    }

    /// Fires mouseout for the hovered cell, if any.
    pub fn pointer_leave(&mut self, event: PointerEvent) {
        if let Some(old) = self.hovered() {
            self.set_hovered(None);
            self.fire(HoverKind::Out, old, &event);
        }
    }

    fn fire(&mut self, kind: HoverKind, site: usize, event: &PointerEvent) {
        let Some(site) = self.sites().get(site).cloned() else {
            return;
        };
        let Some(rows) = self.rows() else {
            return;
        };
        let Some(datum) = rows.get(site.datum) else {
            return;
        };
        trace!(?kind, feature_id = %site.feature_id, "hover");

        let callback: HoverFn = match kind {
            HoverKind::Over => Arc::clone(&self.props().voronoi.mouseover),
            HoverKind::Out => Arc::clone(&self.props().voronoi.mouseout),
        };
        let selected = match kind {
            HoverKind::Over => {
                let spike = self.find_in_layer(
                    self.spike_group(),
                    &element_id(SPIKE_ID_PREFIX, &site.feature_id),
                );
                let geometry = self.find_in_layer(
                    self.geometry_group(),
                    &element_id(REGION_ID_PREFIX, &site.feature_id),
                );
                if let Some(geometry) = geometry {
                    self.scene_mut().raise(geometry);
                }
                Some(Selected { spike, geometry })
            }
            HoverKind::Out => None,
        };
        let spikes = self.spike_nodes();
        let geometries = self.geometry_nodes();

        let mut ctx = HoverContext {
            scene: self.scene_mut(),
            selected,
            spikes,
            geometries,
        };
        callback(event, datum, &mut ctx);
    }

    fn find_in_layer(&self, group: Option<NodeId>, id: &str) -> Option<NodeId> {
        group.and_then(|g| self.scene().find_by_element_id(g, id))
    }
}

