//! Node types for the document snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Unique identifier for a node in a document snapshot.
///
/// Identifiers are derived so that the same underlying element gets the same id in two
/// consecutive captures, which is what lets [`crate::diff_snapshots`] describe the change
/// between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Id for an element carrying a stable `data-id` / `id` attribute.
    pub(crate) fn from_stable_key(attribute: &str, value: &str) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        attribute.hash(&mut hasher);
        value.hash(&mut hasher);
        NodeId(hasher.finish())
    }

    /// Fallback: hash the parent, the node's tag and its position among its siblings.
    pub(crate) fn from_position(parent: Option<NodeId>, tag: &str, index: usize) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        parent.hash(&mut hasher);
        tag.hash(&mut hasher);
        index.hash(&mut hasher);
        NodeId(hasher.finish())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{:x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

/// A single node inside a [`crate::DomSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
}

impl DomNode {
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    /// Lower-case tag name, `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attributes(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            NodeKind::Text(_) => None,
        }
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element { .. } => None,
        }
    }
}

/// Serialized form of a captured document: a plain string is a text node, an object is an
/// element with optional attributes and children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNode {
    Text(String),
    Element {
        tag: String,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<RawNode>,
    },
}

impl From<ElementBuilder> for RawNode {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

impl From<&str> for RawNode {
    fn from(text: &str) -> Self {
        RawNode::Text(text.to_string())
    }
}

/// Fluent builder for document fixtures.
///
/// ```
/// use podium_dom::{DomSnapshot, ElementBuilder};
///
/// let doc = DomSnapshot::from_raw(
///     ElementBuilder::new("div")
///         .class("_amk4")
///         .attr("data-id", "m1")
///         .child(ElementBuilder::new("span").class("_ao3e").text("Hello"))
///         .into(),
/// );
/// assert_eq!(doc.text_content(doc.root_id()), "Hello");
/// ```
#[derive(Debug, Clone)]
pub struct ElementBuilder {
    tag: String,
    attrs: BTreeMap<String, String>,
    children: Vec<RawNode>,
}

impl ElementBuilder {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Append one or more space-separated classes.
    pub fn class(mut self, class: &str) -> Self {
        let entry = self.attrs.entry("class".to_string()).or_default();
        for c in class.split_ascii_whitespace() {
            if !entry.is_empty() {
                entry.push(' ');
            }
            entry.push_str(c);
        }
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, child: impl Into<RawNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<RawNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.child(RawNode::Text(text.to_string()))
    }

    pub fn build(self) -> RawNode {
        RawNode::Element {
            tag: self.tag,
            attrs: self.attrs,
            children: self.children,
        }
    }
}
