use std::collections::BTreeSet;

use foundation::handles::Handle;
use foundation::time::{Time, TimeSpan};
use tracing::trace;

use crate::entity::NodeId;
use crate::node::{Node, Selector};
use crate::transition::Transition;

/// Retained element tree with a clock for attribute transitions.
///
/// Slots of removed nodes are reused; the slot generation is bumped on reuse
/// so stale ids no longer resolve.
#[derive(Debug)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    now: Time,
    transitions: Vec<Transition>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// A scene whose root is an empty container element.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new("div", None)),
            }],
            free: Vec::new(),
            root: NodeId(Handle::new(0, 0)),
            now: Time(0.0),
            transitions: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn now(&self) -> Time {
        self.now
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index() as usize)
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.node.as_ref())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Allocated slots, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    /// Appends a new `selector` element (`tag` or `tag.class`) to `parent`.
    pub fn append(&mut self, parent: NodeId, selector: &str) -> NodeId {
        let sel = Selector::parse(selector);
        let mut node = Node::new(sel.tag, Some(parent));
        if let Some(class) = sel.class {
            node.class = class.to_string();
        }
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.node = Some(node);
                NodeId(Handle::new(index, slot.generation))
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId(Handle::new(index, 0))
            }
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// First child of `parent` matching `selector`.
    pub fn select(&self, parent: NodeId, selector: &str) -> Option<NodeId> {
        let sel = Selector::parse(selector);
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.node(*c).is_some_and(|n| sel.matches(n)))
    }

    /// Returns the first child of `parent` matching `selector`, appending one
    /// if there is none.
    pub fn append_select(&mut self, parent: NodeId, selector: &str) -> NodeId {
        match self.select(parent, selector) {
            Some(id) => id,
            None => self.append(parent, selector),
        }
    }

    /// Detaches and drops `id` with its subtree and pending transitions.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let Some(parent) = self.node(id).and_then(Node::parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
        }

        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(next.index() as usize)
                .filter(|s| s.generation == next.generation())
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                self.free.push(next.index());
                stack.extend(node.children);
            }
        }
        let transitions = std::mem::take(&mut self.transitions);
        self.transitions = transitions
            .into_iter()
            .filter(|t| self.contains(t.node))
            .collect();
    }

    /// Removes every child of `parent`.
    pub fn clear_children(&mut self, parent: NodeId) {
        for child in self.children(parent).to_vec() {
            self.remove(child);
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(n) = self.node_mut(id) {
            n.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).and_then(|n| n.attr(name))
    }

    pub fn set_style(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(n) = self.node_mut(id) {
            n.styles.insert(name.to_string(), value.into());
        }
    }

    pub fn style(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).and_then(|n| n.style(name))
    }

    pub fn set_class(&mut self, id: NodeId, class: impl Into<String>) {
        if let Some(n) = self.node_mut(id) {
            n.class = class.into();
        }
    }

    pub fn set_element_id(&mut self, id: NodeId, element_id: impl Into<String>) {
        if let Some(n) = self.node_mut(id) {
            n.element_id = Some(element_id.into());
        }
    }

    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.element_id.as_deref())
    }

    /// First node in document order under `scope` whose element id matches.
    pub fn find_by_element_id(&self, scope: NodeId, element_id: &str) -> Option<NodeId> {
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if node.element_id.as_deref() == Some(element_id) {
                return Some(id);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.find_by_element_id(self.root, element_id)
    }

    /// Moves `id` to the end of its parent's children so it paints last.
    pub fn raise(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(Node::parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
            p.children.push(id);
        }
    }

    /// Reorders the listed children of `parent` into the given order.
    ///
    /// Listed nodes come first; unlisted children keep their relative order
    /// after them.
    pub fn order(&mut self, parent: NodeId, ordered: &[NodeId]) {
        let Some(p) = self.node_mut(parent) else {
            return;
        };
        let current: BTreeSet<NodeId> = p.children.iter().copied().collect();
        let listed: BTreeSet<NodeId> = ordered.iter().copied().collect();
        let mut next: Vec<NodeId> = ordered
            .iter()
            .copied()
            .filter(|c| current.contains(c))
            .collect();
        next.extend(p.children.iter().copied().filter(|c| !listed.contains(c)));
        p.children = next;
    }

    /// Animates `name` on `id` from its current value to `to`.
    ///
    /// A transition already running on the same attribute is replaced and the
    /// new one starts from the value currently displayed. A non-positive
    /// duration sets the value immediately.
    pub fn transition_attr(
        &mut self,
        id: NodeId,
        name: &str,
        to: impl Into<String>,
        duration_s: f64,
    ) {
        let to = to.into();
        let before = self.transitions.len();
        self.transitions
            .retain(|t| !(t.node == id && t.attr == name));
        if self.transitions.len() != before {
            trace!(node = id.index(), attr = name, "retargeting running transition");
        }

        let from = self.attr(id, name).map(str::to_string);
        match from {
            Some(from) if duration_s > 0.0 && from != to => {
                self.transitions.push(Transition {
                    node: id,
                    attr: name.to_string(),
                    from,
                    to,
                    span: TimeSpan::starting_at(self.now, duration_s),
                });
            }
            _ => self.set_attr(id, name, to),
        }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn transition_for(&self, id: NodeId, name: &str) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.node == id && t.attr == name)
    }

    /// Advances the clock and applies running transitions.
    ///
    /// The clock never moves backwards.
    pub fn advance_to(&mut self, now: Time) {
        if now.0 > self.now.0 {
            self.now = now;
        }
        let now = self.now;
        let transitions = std::mem::take(&mut self.transitions);
        for t in transitions {
            let value = t.value_at(t.span.progress(now));
            self.set_attr(t.node, &t.attr, value);
            if !t.span.is_finished(now) {
                self.transitions.push(t);
            }
        }
    }
}
