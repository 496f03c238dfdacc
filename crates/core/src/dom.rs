//! Plan-then-serialize editing over a parsed HTML tree.
//!
//! `scraper` gives us an immutable parse tree; rather than mutating it in
//! place, callers record the edits they want against node ids in an
//! [`EditPlan`] and serialize the tree back to a string with the plan
//! applied. Each pipeline stage is therefore a pure string-to-string
//! transform, and stages cannot alias each other's trees.
//!
//! The serializer never emits comments or doctypes, escapes all text and
//! attribute values, and knows the HTML5 void elements.

use std::collections::{HashMap, HashSet};

use ego_tree::{NodeId, NodeRef};
use scraper::{Html, node::Node};

/// HTML5 void elements that must not have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// A synthesized element that a planned node gets wrapped in.
#[derive(Debug, Clone)]
pub struct Wrapper {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

/// Edits to apply while serializing a parsed tree.
///
/// All maps are keyed by `ego_tree::NodeId`; the serializer walks the
/// tree in document order, so output is deterministic for a fixed plan.
#[derive(Debug, Default)]
pub struct EditPlan {
    skip: HashSet<NodeId>,
    set_attrs: HashMap<NodeId, Vec<(String, String)>>,
    remove_attrs: HashMap<NodeId, HashSet<String>>,
    styles: HashMap<NodeId, Vec<(String, String)>>,
    wraps: HashMap<NodeId, Wrapper>,
    adoptions: HashMap<NodeId, Vec<NodeId>>,
    decode_text: bool,
}

impl EditPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the node (and its subtree) from the output.
    pub fn remove(&mut self, id: NodeId) {
        self.skip.insert(id);
    }

    /// Set (or override) an attribute on an element.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let entry = self.set_attrs.entry(id).or_default();
        if let Some(existing) = entry.iter_mut().find(|(n, _)| n == name) {
            existing.1 = value.to_string();
        } else {
            entry.push((name.to_string(), value.to_string()));
        }
    }

    /// Remove an attribute from an element.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        self.remove_attrs.entry(id).or_default().insert(name.to_string());
    }

    /// Merge an inline-style declaration into the element's style attribute.
    pub fn style(&mut self, id: NodeId, property: &str, value: &str) {
        let entry = self.styles.entry(id).or_default();
        if let Some(existing) = entry.iter_mut().find(|(p, _)| p == property) {
            existing.1 = value.to_string();
        } else {
            entry.push((property.to_string(), value.to_string()));
        }
    }

    /// Merge several style declarations at once, in order.
    pub fn style_all(&mut self, id: NodeId, declarations: &[(&str, &str)]) {
        for (property, value) in declarations {
            self.style(id, property, value);
        }
    }

    /// Wrap the node in a synthesized element.
    pub fn wrap(&mut self, id: NodeId, tag: &str, attrs: Vec<(String, String)>) {
        self.wraps.insert(id, Wrapper { tag: tag.to_string(), attrs });
    }

    /// Re-parent `child` to be serialized as the last child of `new_parent`,
    /// removing it from its original position.
    pub fn adopt(&mut self, new_parent: NodeId, child: NodeId) {
        self.adoptions.entry(new_parent).or_default().push(child);
        self.skip.insert(child);
    }

    /// Whether the node has been dropped or re-parented away.
    pub fn is_removed(&self, id: NodeId) -> bool {
        self.skip.contains(&id)
    }

    /// Decode residual HTML entities in every text node before re-escaping.
    pub fn decode_text_nodes(&mut self) {
        self.decode_text = true;
    }
}

/// Serialize a document parsed with `Html::parse_document`.
pub fn serialize_document(doc: &Html, plan: &EditPlan) -> String {
    let mut out = String::new();
    for child in doc.tree.root().children() {
        serialize_node(child, plan, &mut out, false);
    }
    out
}

/// Serialize a fragment parsed with `Html::parse_fragment`.
///
/// Fragment parsing wraps content in a synthetic `<html>` element; this
/// serializes only that element's children.
pub fn serialize_fragment(doc: &Html, plan: &EditPlan) -> String {
    let mut out = String::new();
    let synthetic_root = doc
        .tree
        .root()
        .children()
        .find(|n| matches!(n.value(), Node::Element(el) if el.name() == "html"));

    match synthetic_root {
        Some(root) => {
            for child in root.children() {
                serialize_node(child, plan, &mut out, false);
            }
        }
        None => {
            for child in doc.tree.root().children() {
                serialize_node(child, plan, &mut out, false);
            }
        }
    }
    out
}

fn serialize_node(node: NodeRef<'_, Node>, plan: &EditPlan, out: &mut String, forced: bool) {
    let id = node.id();
    if !forced && plan.skip.contains(&id) {
        return;
    }

    match node.value() {
        Node::Document | Node::Fragment => {
            for child in node.children() {
                serialize_node(child, plan, out, false);
            }
        }
        Node::Element(el) => {
            let tag = el.name();
            let wrapper = plan.wraps.get(&id);

            if let Some(w) = wrapper {
                out.push('<');
                out.push_str(&w.tag);
                for (name, value) in &w.attrs {
                    push_attr(out, name, value);
                }
                out.push('>');
            }

            out.push('<');
            out.push_str(tag);
            for (name, value) in final_attributes(el, plan, id) {
                push_attr(out, &name, &value);
            }
            out.push('>');

            if !VOID_ELEMENTS.contains(&tag) {
                for child in node.children() {
                    serialize_node(child, plan, out, false);
                }
                if let Some(adopted) = plan.adoptions.get(&id) {
                    for adopted_id in adopted {
                        if let Some(adopted_node) = node.tree().get(*adopted_id) {
                            serialize_node(adopted_node, plan, out, true);
                        }
                    }
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }

            if let Some(w) = wrapper {
                out.push_str("</");
                out.push_str(&w.tag);
                out.push('>');
            }
        }
        Node::Text(text) => {
            let raw: &str = text;
            if plan.decode_text {
                let decoded = html_escape::decode_html_entities(raw);
                out.push_str(&html_escape::encode_text(&decoded));
            } else {
                out.push_str(&html_escape::encode_text(raw));
            }
        }
        // Comments and doctypes never survive serialization.
        _ => {}
    }
}

/// Compute the final attribute list for an element: original attributes in
/// order minus removals, with overrides applied, new attributes appended,
/// and planned styles merged into the style attribute.
fn final_attributes(el: &scraper::node::Element, plan: &EditPlan, id: NodeId) -> Vec<(String, String)> {
    let removed = plan.remove_attrs.get(&id);
    let overrides = plan.set_attrs.get(&id);
    let styles = plan.styles.get(&id);

    let mut attrs: Vec<(String, String)> = Vec::new();
    for (name, value) in el.attrs() {
        if removed.is_some_and(|r| r.contains(name)) {
            continue;
        }
        let value = overrides
            .and_then(|o| o.iter().find(|(n, _)| n == name))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| value.to_string());
        attrs.push((name.to_string(), value));
    }

    if let Some(overrides) = overrides {
        for (name, value) in overrides {
            if !attrs.iter().any(|(n, _)| n == name) {
                attrs.push((name.clone(), value.clone()));
            }
        }
    }

    if let Some(styles) = styles {
        let merged = merge_styles(attrs.iter().find(|(n, _)| n == "style").map(|(_, v)| v.as_str()), styles);
        if let Some(existing) = attrs.iter_mut().find(|(n, _)| n == "style") {
            existing.1 = merged;
        } else {
            attrs.push(("style".to_string(), merged));
        }
    }

    attrs
}

/// Merge declarations keyed by property: an addition overrides an existing
/// declaration in place rather than appending a duplicate, so repeated
/// normalization converges instead of growing the attribute.
fn merge_styles(existing: Option<&str>, additions: &[(String, String)]) -> String {
    let mut parts: Vec<(String, String)> = Vec::new();
    if let Some(existing) = existing {
        for declaration in existing.split(';') {
            if let Some((property, value)) = declaration.split_once(':') {
                let (property, value) = (property.trim(), value.trim());
                if !property.is_empty() && !value.is_empty() {
                    upsert_style(&mut parts, property, value);
                }
            }
        }
    }
    for (property, value) in additions {
        upsert_style(&mut parts, property, value);
    }
    parts
        .iter()
        .map(|(property, value)| format!("{}: {}", property, value))
        .collect::<Vec<_>>()
        .join("; ")
}

fn upsert_style(parts: &mut Vec<(String, String)>, property: &str, value: &str) {
    if let Some(existing) = parts.iter_mut().find(|(p, _)| p == property) {
        existing.1 = value.to_string();
    } else {
        parts.push((property.to_string(), value.to_string()));
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}

/// First preceding sibling that is an element.
pub fn prev_sibling_element<'a>(node: NodeRef<'a, Node>) -> Option<NodeRef<'a, Node>> {
    node.prev_siblings().find(|n| n.value().is_element())
}

/// First following sibling that is an element.
pub fn next_sibling_element<'a>(node: NodeRef<'a, Node>) -> Option<NodeRef<'a, Node>> {
    node.next_siblings().find(|n| n.value().is_element())
}

/// Tag name when the node is an element.
pub fn element_name<'a>(node: &NodeRef<'a, Node>) -> Option<&'a str> {
    match node.value() {
        Node::Element(el) => Some(el.name()),
        _ => None,
    }
}

/// True for text nodes consisting only of whitespace.
pub fn is_whitespace_text(node: &NodeRef<'_, Node>) -> bool {
    matches!(node.value(), Node::Text(t) if t.trim().is_empty())
}
