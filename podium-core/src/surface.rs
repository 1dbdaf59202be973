//! Chat-surface readiness. The chat application gives no readiness signal, so the host polls.

use crate::selectors::{SelectorResolver, SelectorTarget};
use podium_dom::{DomSnapshot, NodeId};
use std::time::Duration;

pub const SURFACE_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Wait before the first poll, while the chat application boots.
pub const INITIAL_DETECTION_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_CHAT_TITLE: &str = "WhatsApp Chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection<T> {
    Ready(T),
    /// Not there yet; poll again after [`SURFACE_POLL_INTERVAL`].
    NotYet,
}

impl<T> Detection<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Detection::Ready(_))
    }
}

impl<T> From<Option<T>> for Detection<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Detection::NotYet, Detection::Ready)
    }
}

/// An open conversation: its panel and the header inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatSurface {
    pub panel: NodeId,
    pub header: NodeId,
}

pub fn detect_chat_view(resolver: &SelectorResolver, doc: &DomSnapshot) -> Detection<ChatSurface> {
    resolver
        .resolve(doc, SelectorTarget::ChatPanel)
        .into_iter()
        .find_map(|panel| {
            resolver
                .resolve_first_within(doc, panel, SelectorTarget::ChatHeader)
                .map(|header| ChatSurface { panel, header })
        })
        .into()
}

/// Root of the message list, the subtree mutations are observed on.
pub fn locate_message_list(resolver: &SelectorResolver, doc: &DomSnapshot) -> Detection<NodeId> {
    resolver
        .resolve(doc, SelectorTarget::MessageList)
        .into_iter()
        .next()
        .into()
}

pub fn chat_title(resolver: &SelectorResolver, doc: &DomSnapshot) -> String {
    resolver
        .resolve(doc, SelectorTarget::ChatTitle)
        .first()
        .map(|node| doc.text_content(*node))
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CHAT_TITLE.to_string())
}
