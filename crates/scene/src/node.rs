use std::collections::BTreeMap;

use crate::entity::NodeId;

/// One element of the retained scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: String,
    pub element_id: Option<String>,
    pub class: String,
    /// Data join key, set for nodes bound to a datum.
    pub key: Option<String>,
    pub attrs: BTreeMap<String, String>,
    pub styles: BTreeMap<String, String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_string(),
            element_id: None,
            class: String::new(),
            key: None,
            attrs: BTreeMap::new(),
            styles: BTreeMap::new(),
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn style(&self, name: &str) -> Option<&str> {
        self.styles.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class.split_whitespace().any(|c| c == class)
    }
}

/// `tag` or `tag.class` selector, as used by append-or-select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector<'a> {
    pub tag: &'a str,
    pub class: Option<&'a str>,
}

impl<'a> Selector<'a> {
    pub fn parse(s: &'a str) -> Self {
        match s.split_once('.') {
            Some((tag, class)) => Self {
                tag,
                class: Some(class),
            },
            None => Self { tag: s, class: None },
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        node.tag == self.tag && self.class.is_none_or(|c| node.has_class(c))
    }
}

#[cfg(test)]
mod tests {
    use super::{Node, Selector};

    #[test]
    fn selector_matches_tag_and_class() {
        let mut node = Node::new("g", None);
        node.class = "plot main".into();
        assert!(Selector::parse("g.plot").matches(&node));
        assert!(Selector::parse("g").matches(&node));
        assert!(!Selector::parse("g.spikes").matches(&node));
        assert!(!Selector::parse("path").matches(&node));
    }
}
