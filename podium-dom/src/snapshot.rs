//! Immutable capture of the document tree plus the structural queries the
//! extraction pipeline runs against it.

use crate::node::{DomNode, NodeId, NodeKind, RawNode};
use crate::selector::Selector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Captures deeper than this are truncated; the chat surface never nests anywhere near it.
const MAX_DEPTH: usize = 512;

/// Error types for loading snapshots
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Complete snapshot of the document at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub captured_at: DateTime<Utc>,
    root_id: NodeId,
    nodes: HashMap<NodeId, DomNode>,
}

impl DomSnapshot {
    /// Build the node arena from a serialized tree.
    pub fn from_raw(raw: RawNode) -> Self {
        let mut nodes = HashMap::new();
        let root_id = insert_node(&raw, None, 0, &mut nodes, 0);
        DomSnapshot {
            captured_at: Utc::now(),
            root_id,
            nodes,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let raw: RawNode = serde_json::from_str(json)?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    /// Ancestors from the direct parent up to the root, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            snapshot: self,
            next: self.parent(id),
        }
    }

    /// Every node below `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = self
            .nodes
            .get(&id)
            .map(|node| node.children.iter().rev().copied().collect())
            .unwrap_or_default();
        Descendants {
            snapshot: self,
            stack,
        }
    }

    /// Concatenated text of all descendant text nodes. Inline images contribute nothing,
    /// which is why emoji rendered as `<img alt=..>` never show up here.
    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.nodes.get(&id) else {
            return String::new();
        };
        if let NodeKind::Text(text) = &node.kind {
            return text.clone();
        }
        self.descendants(id)
            .filter_map(|child| self.nodes.get(&child).and_then(DomNode::text))
            .collect()
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(&id).and_then(|node| node.attribute(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes
            .get(&id)
            .map(|node| node.has_class(class))
            .unwrap_or(false)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .map(DomNode::is_element)
            .unwrap_or(false)
    }

    /// Nearest element parent of a node (the parent of a text node, for instance).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|ancestor| self.is_element(*ancestor))
    }

    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        selector.matches(self, id)
    }

    /// The node itself or its nearest ancestor matching `selector`.
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|candidate| selector.matches(self, *candidate))
    }

    /// All descendants of `scope` matching `selector`, in document order.
    pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|id| selector.matches(self, *id))
            .collect()
    }

    pub fn query_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .find(|id| selector.matches(self, *id))
    }

    /// Convenience for whole-document queries.
    pub fn query_document(&self, selector: &Selector) -> Vec<NodeId> {
        let root = self.root_id;
        std::iter::once(root)
            .chain(self.descendants(root))
            .filter(|id| selector.matches(self, *id))
            .collect()
    }

    /// Element children of `id`, in order.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|node| {
                node.children
                    .iter()
                    .copied()
                    .filter(|child| self.is_element(*child))
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub struct Ancestors<'a> {
    snapshot: &'a DomSnapshot,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.snapshot.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    snapshot: &'a DomSnapshot,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        if let Some(node) = self.snapshot.nodes.get(&current) {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(current)
    }
}

fn insert_node(
    raw: &RawNode,
    parent: Option<NodeId>,
    index: usize,
    nodes: &mut HashMap<NodeId, DomNode>,
    depth: usize,
) -> NodeId {
    let (kind, raw_children) = match raw {
        RawNode::Text(text) => (NodeKind::Text(text.clone()), &[][..]),
        RawNode::Element {
            tag,
            attrs,
            children,
        } => (
            NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
                attributes: attrs.clone(),
            },
            children.as_slice(),
        ),
    };
    let position_tag = match &kind {
        NodeKind::Element { tag, .. } => tag.clone(),
        NodeKind::Text(_) => "#text".to_string(),
    };

    let stable = match &kind {
        NodeKind::Element { attributes, .. } => attributes
            .get("data-id")
            .map(|value| NodeId::from_stable_key("data-id", value))
            .or_else(|| {
                attributes
                    .get("id")
                    .map(|value| NodeId::from_stable_key("id", value))
            }),
        NodeKind::Text(_) => None,
    };

    let mut id = match stable {
        Some(id) if !nodes.contains_key(&id) => id,
        _ => NodeId::from_position(parent, &position_tag, index),
    };
    while nodes.contains_key(&id) {
        tracing::debug!(%id, "node id collision, probing");
        id = NodeId(id.0.wrapping_add(1));
    }

    // Reserve the slot before recursing so children cannot collide with their parent.
    nodes.insert(
        id,
        DomNode {
            id,
            parent,
            kind,
            children: Vec::new(),
        },
    );

    if depth >= MAX_DEPTH {
        tracing::warn!(%id, depth, "snapshot exceeded max depth, truncating subtree");
        return id;
    }

    let child_ids: Vec<NodeId> = raw_children
        .iter()
        .enumerate()
        .map(|(child_idx, child)| insert_node(child, Some(id), child_idx, nodes, depth + 1))
        .collect();

    if let Some(node) = nodes.get_mut(&id) {
        node.children = child_ids;
    }
    id
}
