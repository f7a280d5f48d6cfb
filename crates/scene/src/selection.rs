use std::collections::BTreeMap;

use crate::entity::NodeId;
use crate::graph::Scene;
use crate::node::Selector;

/// Outcome of matching a keyed list of data against existing children.
///
/// Ordering contract:
/// - `enter`, `update` and `duplicates` are in data order (the `usize` is the datum index).
/// - `exit` is in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Join {
    pub enter: Vec<(usize, String)>,
    pub update: Vec<(usize, NodeId)>,
    pub exit: Vec<NodeId>,
    /// Data whose key was already seen earlier in the list; they are not bound.
    pub duplicates: Vec<usize>,
}

impl Scene {
    /// Children of `parent` matching `selector` that carry a join key.
    pub fn keyed_children(&self, parent: NodeId, selector: &str) -> Vec<NodeId> {
        let sel = Selector::parse(selector);
        self.children(parent)
            .iter()
            .copied()
            .filter(|c| {
                self.node(*c)
                    .is_some_and(|n| n.key.is_some() && sel.matches(n))
            })
            .collect()
    }

    pub fn key(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.key.as_deref())
    }

    /// Matches `keys` against the keyed `selector` children of `parent`.
    ///
    /// Nothing in the tree changes; see [`Scene::apply_join`].
    pub fn join_keyed(&self, parent: NodeId, selector: &str, keys: &[String]) -> Join {
        let mut existing: BTreeMap<&str, NodeId> = BTreeMap::new();
        let mut join = Join::default();
        for child in self.keyed_children(parent, selector) {
            let Some(key) = self.key(child) else { continue };
            if existing.contains_key(key) {
                join.exit.push(child);
            } else {
                existing.insert(key, child);
            }
        }

        let mut seen: BTreeMap<&str, ()> = BTreeMap::new();
        for (i, key) in keys.iter().enumerate() {
            if seen.insert(key.as_str(), ()).is_some() {
                join.duplicates.push(i);
                continue;
            }
            match existing.remove(key.as_str()) {
                Some(node) => join.update.push((i, node)),
                None => join.enter.push((i, key.clone())),
            }
        }

        let mut leftover: Vec<NodeId> = existing.into_values().collect();
        leftover.extend(join.exit.drain(..));
        let position: BTreeMap<NodeId, usize> = self
            .children(parent)
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, i))
            .collect();
        leftover.sort_by_key(|n| position.get(n).copied());
        join.exit = leftover;
        join
    }

    /// Removes exiting nodes, appends entering ones and puts the bound nodes
    /// into data order.
    ///
    /// Returns the bound node of every non-duplicate datum, in data order.
    pub fn apply_join(
        &mut self,
        parent: NodeId,
        selector: &str,
        join: &Join,
    ) -> Vec<(usize, NodeId)> {
        for node in &join.exit {
            self.remove(*node);
        }
        let mut bound: Vec<(usize, NodeId)> = join.update.clone();
        for (i, key) in &join.enter {
            let node = self.append(parent, selector);
            if let Some(n) = self.node_mut(node) {
                n.key = Some(key.clone());
            }
            bound.push((*i, node));
        }
        bound.sort_by_key(|(i, _)| *i);
        let ordered: Vec<NodeId> = bound.iter().map(|(_, n)| *n).collect();
        self.order(parent, &ordered);
        bound
    }
}
