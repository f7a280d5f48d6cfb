//! Markup serialization of the scene tree.

use std::fmt::Write;

use crate::entity::NodeId;
use crate::graph::Scene;

impl Scene {
    /// Serializes `node` and its subtree as markup.
    ///
    /// Attributes are written in name order, styles as one `style` attribute.
    pub fn to_svg(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, node, 0);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let Some(node) = self.node(id) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}<{}", node.tag);
        if let Some(element_id) = &node.element_id {
            let _ = write!(out, " id=\"{}\"", escape(element_id));
        }
        if !node.class.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&node.class));
        }
        for (name, value) in &node.attrs {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        if !node.styles.is_empty() {
            let style: Vec<String> = node
                .styles
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect();
            let _ = write!(out, " style=\"{}\"", escape(&style.join("; ")));
        }

        if node.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push_str(">\n");
        for child in &node.children {
            self.write_node(out, *child, depth + 1);
        }
        let _ = writeln!(out, "{indent}</{}>", node.tag);
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
