//! Turns one raw message container into a [`MessageRecord`].
//!
//! Every lookup degrades to an empty value; a container that cannot be read at all is
//! reported as an error for that container only.

use crate::selectors::{compile, SelectorResolver, SelectorTarget};
use once_cell::sync::Lazy;
use podium_dom::{DomSnapshot, NodeId, Selector};
use regex::Regex;
use serde::Serialize;

/// Text stored for date dividers and other non-chat rows.
pub const SYSTEM_SENTINEL: &str = "__SYSTEM_MESSAGE__";
pub const FINGERPRINT_SEPARATOR: char = '-';
pub const MESSAGE_ID_ATTRIBUTE: &str = "data-id";
const SENDER_METADATA_ATTRIBUTE: &str = "data-pre-plain-text";
const OUTGOING_CLASS: &str = "message-out";
/// Parent class the chat application gives to system notices.
const SYSTEM_TEXT_PARENT_CLASS: &str = "_amkb";

/// Date markers like "TODAY" sit inside (or are) an element matching one of these.
static SYSTEM_ANCESTORS: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["._amjw._amk1._aotl"]));
static SYSTEM_DESCENDANTS: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["._amk1"]));
static DELIVERY_INDICATORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        r#"[data-icon="msg-check"]"#,
        r#"[data-icon="msg-dblcheck"]"#,
        r#"[data-icon="msg-dblcheck-ack"]"#,
    ])
});
static ANY_MESSAGE_ID: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["[data-id]"]));
// "[10:49 PM, 3/8/2025] Emmanuel Crown: "
static SENDER_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\](.*?):").ok());

/// Normalized view of one message. Built fresh on every extraction pass and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    /// Display text, or [`SYSTEM_SENTINEL`] for system rows
    pub text: String,
    /// Empty when it cannot be determined (direct chats, parse failures)
    pub sender: String,
    pub is_outgoing: bool,
    pub is_system: bool,
    /// Stable message identifier from the markup, when there is one
    pub raw_id: Option<String>,
    pub timestamp: String,
    pub fingerprint: String,
}

impl MessageRecord {
    pub fn is_visible(&self) -> bool {
        !self.is_system
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("container {0} is not part of the snapshot")]
    MissingNode(NodeId),
    #[error("container {0} is not an element")]
    NotAnElement(NodeId),
}

pub fn fingerprint(text: &str, timestamp: &str) -> String {
    format!("{text}{FINGERPRINT_SEPARATOR}{timestamp}")
}

/// Extract the canonical record for `container`.
pub fn normalize(
    resolver: &SelectorResolver,
    doc: &DomSnapshot,
    container: NodeId,
) -> Result<MessageRecord, NormalizeError> {
    if !doc.contains(container) {
        return Err(NormalizeError::MissingNode(container));
    }
    if !doc.is_element(container) {
        return Err(NormalizeError::NotAnElement(container));
    }

    let text_node = resolver.resolve_first_within(doc, container, SelectorTarget::Text);
    let is_system = is_system_message(doc, container, text_node);
    let text = if is_system {
        SYSTEM_SENTINEL.to_string()
    } else {
        extract_text(resolver, doc, container, text_node)
    };

    let timestamp = resolver
        .resolve_first_within(doc, container, SelectorTarget::Timestamp)
        .map(|node| doc.text_content(node))
        .unwrap_or_default();

    Ok(MessageRecord {
        fingerprint: fingerprint(&text, &timestamp),
        sender: extract_sender(resolver, doc, container),
        is_outgoing: is_outgoing(doc, container),
        raw_id: message_id(doc, container),
        text,
        is_system,
        timestamp,
    })
}

fn is_system_message(doc: &DomSnapshot, container: NodeId, text_node: Option<NodeId>) -> bool {
    if SYSTEM_ANCESTORS
        .iter()
        .any(|selector| doc.closest(container, selector).is_some())
    {
        return true;
    }

    let text_parent_is_notice = text_node
        .and_then(|node| doc.parent_element(node))
        .and_then(|parent| doc.attribute(parent, "class"))
        .map(|class| class == SYSTEM_TEXT_PARENT_CLASS)
        .unwrap_or(false);
    if text_parent_is_notice {
        return true;
    }

    SYSTEM_DESCENDANTS
        .iter()
        .any(|selector| doc.query_first(container, selector).is_some())
}

fn extract_text(
    resolver: &SelectorResolver,
    doc: &DomSnapshot,
    container: NodeId,
    text_node: Option<NodeId>,
) -> String {
    let Some(text_node) = text_node else {
        return doc.text_content(container);
    };

    let mut text = doc.text_content(text_node);
    // Emoji rendered as images have no character in the text stream.
    for emoji in resolver.resolve_within(doc, text_node, SelectorTarget::Emoji) {
        if let Some(alt) = doc.attribute(emoji, "alt").filter(|alt| !alt.is_empty()) {
            text.push_str(alt);
        }
    }
    text
}

fn extract_sender(resolver: &SelectorResolver, doc: &DomSnapshot, container: NodeId) -> String {
    let from_metadata = resolver
        .resolve_first_within(doc, container, SelectorTarget::SenderMetadata)
        .and_then(|node| doc.attribute(node, SENDER_METADATA_ATTRIBUTE))
        .and_then(parse_sender);
    if let Some(sender) = from_metadata {
        return sender;
    }

    resolver
        .resolve_first_within(doc, container, SelectorTarget::Sender)
        .map(|node| doc.text_content(node).trim().to_string())
        .unwrap_or_default()
}

/// Sender name out of a `[time, date] name: ` metadata string.
pub fn parse_sender(metadata: &str) -> Option<String> {
    let pattern = SENDER_PATTERN.as_ref()?;
    let name = pattern.captures(metadata)?.get(1)?.as_str().trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn is_outgoing(doc: &DomSnapshot, container: NodeId) -> bool {
    doc.has_class(container, OUTGOING_CLASS)
        || DELIVERY_INDICATORS
            .iter()
            .any(|selector| doc.query_first(container, selector).is_some())
}

/// `data-id` on the container, below it, or on the nearest ancestor.
fn message_id(doc: &DomSnapshot, container: NodeId) -> Option<String> {
    if let Some(id) = doc.attribute(container, MESSAGE_ID_ATTRIBUTE) {
        return Some(id.to_string());
    }
    ANY_MESSAGE_ID.iter().find_map(|selector| {
        doc.query_first(container, selector)
            .or_else(|| doc.closest(container, selector))
            .and_then(|node| doc.attribute(node, MESSAGE_ID_ATTRIBUTE))
            .map(str::to_string)
    })
}
