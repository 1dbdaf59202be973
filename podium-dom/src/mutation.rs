//! Low-level change records between two document captures.

use crate::node::{NodeId, NodeKind};
use crate::snapshot::DomSnapshot;
use serde::{Deserialize, Serialize};

/// One structural change, shaped like the records a `MutationObserver` delivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomMutation {
    /// Children of `target` were inserted and/or removed. `added` ids resolve in the newer
    /// snapshot, `removed` ids only in the older one.
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        target: NodeId,
        attribute: String,
    },
    /// `target` is the text node whose data changed.
    CharacterData { target: NodeId },
}

impl DomMutation {
    pub fn added_nodes(&self) -> &[NodeId] {
        match self {
            DomMutation::ChildList { added, .. } => added,
            _ => &[],
        }
    }
}

/// A batch of mutations delivered together. Order carries no meaning.
pub type MutationBatch = Vec<DomMutation>;

/// Compute the mutation records that turn `old` into `new`.
///
/// Only the topmost node of an inserted or removed subtree is reported, grouped per parent,
/// the same way the browser reports a subtree insertion as a single `childList` record.
pub fn diff_snapshots(old: &DomSnapshot, new: &DomSnapshot) -> MutationBatch {
    let mut child_lists: Vec<(NodeId, Vec<NodeId>, Vec<NodeId>)> = Vec::new();
    let mut updates = Vec::new();

    fn child_list_entry(
        entries: &mut Vec<(NodeId, Vec<NodeId>, Vec<NodeId>)>,
        target: NodeId,
    ) -> &mut (NodeId, Vec<NodeId>, Vec<NodeId>) {
        let index = match entries.iter().position(|(t, _, _)| *t == target) {
            Some(index) => index,
            None => {
                entries.push((target, Vec::new(), Vec::new()));
                entries.len() - 1
            }
        };
        &mut entries[index]
    }

    // Find added and updated nodes
    let new_root = new.root_id();
    for id in std::iter::once(new_root).chain(new.descendants(new_root)) {
        let Some(new_node) = new.node(id) else {
            continue;
        };
        let parent = new_node.parent;
        match old.node(id) {
            None => match parent {
                Some(parent) if old.contains(parent) => {
                    child_list_entry(&mut child_lists, parent).1.push(id);
                }
                // Parent is new as well: already covered by the topmost insertion.
                Some(_) => {}
                None => child_list_entry(&mut child_lists, id).1.push(id),
            },
            Some(old_node) => match (&old_node.kind, &new_node.kind) {
                (
                    NodeKind::Element {
                        tag: old_tag,
                        attributes: old_attrs,
                    },
                    NodeKind::Element {
                        tag: new_tag,
                        attributes: new_attrs,
                    },
                ) if old_tag == new_tag => {
                    let mut names: Vec<&String> = old_attrs.keys().chain(new_attrs.keys()).collect();
                    names.sort();
                    names.dedup();
                    for name in names {
                        if old_attrs.get(name) != new_attrs.get(name) {
                            updates.push(DomMutation::Attributes {
                                target: id,
                                attribute: name.clone(),
                            });
                        }
                    }
                }
                (NodeKind::Text(old_text), NodeKind::Text(new_text)) => {
                    if old_text != new_text {
                        updates.push(DomMutation::CharacterData { target: id });
                    }
                }
                _ => {
                    // Same identity, different kind of node: report a replacement.
                    let entry = child_list_entry(&mut child_lists, parent.unwrap_or(id));
                    entry.1.push(id);
                    entry.2.push(id);
                }
            },
        }
    }

    // Find removed nodes
    let old_root = old.root_id();
    for id in std::iter::once(old_root).chain(old.descendants(old_root)) {
        if new.contains(id) {
            continue;
        }
        if let Some(parent) = old.parent(id) {
            if new.contains(parent) {
                child_list_entry(&mut child_lists, parent).2.push(id);
            }
        }
    }

    let mut batch: MutationBatch = child_lists
        .into_iter()
        .map(|(target, added, removed)| DomMutation::ChildList {
            target,
            added,
            removed,
        })
        .collect();
    batch.extend(updates);
    batch
}
