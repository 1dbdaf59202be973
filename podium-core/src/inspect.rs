//! Element dumps for inspection mode, used to keep the selector tables current when the chat
//! application changes its markup.

use podium_dom::{DomSnapshot, NodeId};
use podium_events::emit_element_inspected;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const TEXT_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    /// Upper case, as the browser reports it
    pub tag_name: String,
    pub id: String,
    pub class_list: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub data_attributes: BTreeMap<String, String>,
    pub text_content: String,
    pub xpath: String,
    pub css_selector: String,
}

/// `None` for text nodes and unknown ids.
pub fn element_info(doc: &DomSnapshot, node: NodeId) -> Option<ElementInfo> {
    let element = doc.node(node).filter(|node| node.is_element())?;
    let attributes = element.attributes().cloned().unwrap_or_default();
    let data_attributes = attributes
        .iter()
        .filter(|(name, _)| name.starts_with("data-"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    Some(ElementInfo {
        tag_name: element.tag().unwrap_or_default().to_uppercase(),
        id: element.attribute("id").unwrap_or_default().to_string(),
        class_list: element.classes().map(str::to_string).collect(),
        attributes,
        data_attributes,
        text_content: preview(&doc.text_content(node)),
        xpath: xpath(doc, node),
        css_selector: css_selector(doc, node),
    })
}

fn preview(text: &str) -> String {
    if text.chars().count() > TEXT_PREVIEW_CHARS {
        let mut cut: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// `//*[@id=".."]` when the element has an id, otherwise tag steps indexed among same-tag
/// siblings.
pub fn xpath(doc: &DomSnapshot, node: NodeId) -> String {
    if let Some(id) = doc.attribute(node, "id").filter(|id| !id.is_empty()) {
        return format!(r#"//*[@id="{id}"]"#);
    }
    let tag = doc
        .node(node)
        .and_then(|node| node.tag())
        .unwrap_or_default();
    let Some(parent) = doc.parent(node) else {
        return format!("/{tag}");
    };
    let index = doc
        .element_children(parent)
        .into_iter()
        .take_while(|sibling| *sibling != node)
        .filter(|sibling| doc.node(*sibling).and_then(|s| s.tag()) == Some(tag))
        .count()
        + 1;
    format!("{}/{tag}[{index}]", xpath(doc, parent))
}

/// `#id`, or the tag followed by every class.
pub fn css_selector(doc: &DomSnapshot, node: NodeId) -> String {
    let Some(element) = doc.node(node) else {
        return String::new();
    };
    if let Some(id) = element.attribute("id").filter(|id| !id.is_empty()) {
        return format!("#{id}");
    }
    let mut selector = element.tag().unwrap_or_default().to_string();
    for class in element.classes() {
        selector.push('.');
        selector.push_str(class);
    }
    selector
}

/// Dump `node` and publish it for the shell.
pub fn inspect(doc: &DomSnapshot, node: NodeId) -> Option<ElementInfo> {
    let info = element_info(doc, node)?;
    debug!(xpath = %info.xpath, "element inspected");
    match serde_json::to_value(&info) {
        Ok(value) => emit_element_inspected(value),
        Err(err) => warn!(error = %err, "could not serialize element info"),
    }
    Some(info)
}
