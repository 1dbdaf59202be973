//! Alert glyph detection.
//!
//! Two independent paths feed one id set: reaction controls whose label carries the glyph,
//! and inline emoji images whose alt text is the glyph. Only the reaction path may fall back
//! to a pseudo id, and pseudo ids are not stable: the same message yields a different id
//! once its text or timestamp changes.

use crate::config::PresentationConfig;
use crate::normalizer::MESSAGE_ID_ATTRIBUTE;
use crate::selectors::{compile, SelectorResolver, SelectorTarget};
use once_cell::sync::Lazy;
use podium_dom::{DomSnapshot, NodeId, Selector};
use std::collections::BTreeSet;
use tracing::debug;

pub const PSEUDO_ID_PREFIX: &str = "pseudo-";
const PSEUDO_SNIPPET_CHARS: usize = 20;
const REACTION_LABEL_ATTRIBUTE: &str = "aria-label";

static ANY_MESSAGE_ID: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["[data-id]"]));
static IMAGES_WITH_ALT: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["img[alt]"]));

/// Result of one scan. Produced fresh per batch and consumed once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertScan {
    /// Message ids (or pseudo ids) carrying the alert glyph
    pub ids: BTreeSet<String>,
    /// Reaction controls whose label contained the glyph
    pub reaction_hits: usize,
    /// Inline images whose alt text was the glyph
    pub glyph_hits: usize,
}

impl AlertScan {
    /// Whether a reaction carried the glyph. This is what starts the flasher.
    pub fn has_reaction_alert(&self) -> bool {
        self.reaction_hits > 0
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Scan the whole document for the configured alert glyph.
///
/// The reaction path always runs. The direct image path only runs when popup highlighting is
/// enabled, and it never synthesizes ids.
pub fn scan_for_alerts(
    resolver: &SelectorResolver,
    doc: &DomSnapshot,
    config: &PresentationConfig,
) -> AlertScan {
    let glyph = config.effective_alert_glyph();
    let mut scan = AlertScan::default();

    for reaction in resolver.resolve(doc, SelectorTarget::Reaction) {
        let label_has_glyph = doc
            .attribute(reaction, REACTION_LABEL_ATTRIBUTE)
            .is_some_and(|label| label.contains(glyph));
        if !label_has_glyph {
            continue;
        }
        scan.reaction_hits += 1;
        if let Some(id) = reaction_message_id(resolver, doc, reaction) {
            debug!(id = %id, "alert glyph found on reaction");
            scan.ids.insert(id);
        }
    }

    if config.popup_alerts_enabled {
        for image in IMAGES_WITH_ALT
            .iter()
            .flat_map(|selector| doc.query_document(selector))
        {
            if doc.attribute(image, "alt") != Some(glyph) {
                continue;
            }
            scan.glyph_hits += 1;
            if let Some(id) = glyph_message_id(resolver, doc, image) {
                debug!(id = %id, "alert glyph found inline");
                scan.ids.insert(id);
            }
        }
    }

    scan
}

/// Owning message of a reaction: the row first, then the reaction group's message.
fn reaction_message_id(resolver: &SelectorResolver, doc: &DomSnapshot, reaction: NodeId) -> Option<String> {
    if let Some(row) = resolver
        .closest(doc, reaction, SelectorTarget::MessageRow)
        .or_else(|| resolver.closest(doc, reaction, SelectorTarget::Container))
    {
        return Some(
            id_within(doc, row)
                .or_else(|| own_id(doc, row))
                .unwrap_or_else(|| pseudo_id(resolver, doc, row)),
        );
    }

    let group = resolver.closest(doc, reaction, SelectorTarget::ReactionGroup)?;
    let item = resolver
        .closest(doc, group, SelectorTarget::Container)
        .or_else(|| doc.parent_element(group))?;
    Some(
        id_within(doc, item)
            .or_else(|| own_id(doc, item))
            .or_else(|| nearest_ancestor_id(doc, item))
            .unwrap_or_else(|| pseudo_id(resolver, doc, item)),
    )
}

fn glyph_message_id(resolver: &SelectorResolver, doc: &DomSnapshot, image: NodeId) -> Option<String> {
    let row = resolver.closest(doc, image, SelectorTarget::MessageRow)?;
    id_within(doc, row)
}

fn own_id(doc: &DomSnapshot, node: NodeId) -> Option<String> {
    doc.attribute(node, MESSAGE_ID_ATTRIBUTE).map(str::to_string)
}

fn id_within(doc: &DomSnapshot, node: NodeId) -> Option<String> {
    ANY_MESSAGE_ID
        .iter()
        .find_map(|selector| doc.query_first(node, selector))
        .and_then(|found| own_id(doc, found))
}

fn nearest_ancestor_id(doc: &DomSnapshot, node: NodeId) -> Option<String> {
    ANY_MESSAGE_ID
        .iter()
        .find_map(|selector| doc.closest(node, selector))
        .and_then(|found| own_id(doc, found))
}

/// `pseudo-<first 20 chars of the trimmed text>-<timestamp text>`.
pub fn pseudo_id(resolver: &SelectorResolver, doc: &DomSnapshot, item: NodeId) -> String {
    let text = doc.text_content(item);
    let snippet: String = text.trim().chars().take(PSEUDO_SNIPPET_CHARS).collect();
    let timestamp = resolver
        .resolve_first_within(doc, item, SelectorTarget::Timestamp)
        .map(|node| doc.text_content(node))
        .unwrap_or_default();
    format!("{PSEUDO_ID_PREFIX}{snippet}-{timestamp}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_dom::ElementBuilder;

    fn reaction(label: &str) -> ElementBuilder {
        ElementBuilder::new("button").attr("aria-label", label)
    }

    fn row(children: Vec<ElementBuilder>) -> ElementBuilder {
        ElementBuilder::new("div").attr("role", "row").children(children)
    }

    fn message(id: Option<&str>, text: &str) -> ElementBuilder {
        let mut el = ElementBuilder::new("div").class("_amk4");
        if let Some(id) = id {
            el = el.attr("data-id", id);
        }
        el.child(ElementBuilder::new("span").text(text))
    }

    fn scan(doc: &DomSnapshot, popup: bool) -> AlertScan {
        let config = PresentationConfig {
            popup_alerts_enabled: popup,
            ..PresentationConfig::default()
        };
        scan_for_alerts(&SelectorResolver::default(), doc, &config)
    }

    #[test]
    fn reaction_label_with_glyph_yields_row_id() {
        let doc = DomSnapshot::from_raw(
            ElementBuilder::new("div")
                .child(row(vec![
                    message(Some("msg-1"), "fire"),
                    reaction("reaction 🚨, 1 person"),
                ]))
                .child(row(vec![message(Some("msg-2"), "calm"), reaction("reaction 👍")]))
                .build(),
        );
        let result = scan(&doc, false);
        assert!(result.has_reaction_alert());
        assert_eq!(result.ids, BTreeSet::from(["msg-1".to_string()]));
    }

    #[test]
    fn missing_id_falls_back_to_pseudo_id() {
        let doc = DomSnapshot::from_raw(
            row(vec![
                message(None, "  Evacuate the building now please  "),
                ElementBuilder::new("span").class("x1c4vz4f x2lah0s").text("9:15"),
                reaction("reaction 🚨"),
            ])
            .build(),
        );
        let result = scan(&doc, true);
        assert_eq!(
            result.ids.iter().next().map(String::as_str),
            Some("pseudo-Evacuate the buildin-9:15")
        );
    }

    #[test]
    fn reaction_group_resolves_to_ancestor_id() {
        let doc = DomSnapshot::from_raw(
            ElementBuilder::new("div")
                .attr("data-id", "outer-7")
                .child(
                    ElementBuilder::new("div")
                        .class("holder")
                        .child(
                            ElementBuilder::new("div")
                                .class("x78zum5 x1n2onr6")
                                .child(reaction("reaction 🚨")),
                        ),
                )
                .build(),
        );
        let result = scan(&doc, false);
        assert_eq!(result.ids, BTreeSet::from(["outer-7".to_string()]));
    }

    #[test]
    fn inline_glyph_requires_popup_and_stable_id() {
        let doc = DomSnapshot::from_raw(
            ElementBuilder::new("div")
                .child(row(vec![ElementBuilder::new("div")
                    .attr("data-id", "msg-9")
                    .child(ElementBuilder::new("img").class("emoji").attr("alt", "🚨"))]))
                .child(row(vec![ElementBuilder::new("div")
                    .child(ElementBuilder::new("img").class("emoji").attr("alt", "🚨"))]))
                .build(),
        );
        let off = scan(&doc, false);
        assert!(off.is_empty());
        assert_eq!(off.glyph_hits, 0);

        let on = scan(&doc, true);
        assert_eq!(on.glyph_hits, 2);
        assert!(!on.has_reaction_alert());
        assert_eq!(on.ids, BTreeSet::from(["msg-9".to_string()]));
    }

    #[test]
    fn custom_glyph_is_honoured() {
        let doc = DomSnapshot::from_raw(
            row(vec![message(Some("m"), "x"), reaction("reaction 🔥")]).build(),
        );
        let config = PresentationConfig {
            alert_glyph: "🔥".to_string(),
            ..PresentationConfig::default()
        };
        let result = scan_for_alerts(&SelectorResolver::default(), &doc, &config);
        assert_eq!(result.ids.len(), 1);
    }

    #[test]
    fn nothing_to_find_is_empty() {
        let doc = DomSnapshot::from_raw(row(vec![message(Some("m"), "quiet")]).build());
        assert_eq!(scan(&doc, true), AlertScan::default());
    }
}
