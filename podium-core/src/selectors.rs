//! Ordered fallback queries per semantic target.
//!
//! The chat application's markup changes without notice, so every target carries a list of
//! strategies from the most specific (current markup) down to generic fallbacks. Resolution
//! returns the matches of the first strategy that finds anything and never fails.

use podium_dom::{DomSnapshot, NodeId, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorTarget {
    /// One chat message bubble
    Container,
    Text,
    /// Element carrying the `[time, date] sender:` metadata attribute
    SenderMetadata,
    Sender,
    Timestamp,
    Reaction,
    /// Wrapper around the reaction controls of a message
    ReactionGroup,
    Emoji,
    MessageRow,
    ChatPanel,
    ChatHeader,
    ChatTitle,
    MessageList,
}

impl SelectorTarget {
    pub const ALL: [SelectorTarget; 13] = [
        SelectorTarget::Container,
        SelectorTarget::Text,
        SelectorTarget::SenderMetadata,
        SelectorTarget::Sender,
        SelectorTarget::Timestamp,
        SelectorTarget::Reaction,
        SelectorTarget::ReactionGroup,
        SelectorTarget::Emoji,
        SelectorTarget::MessageRow,
        SelectorTarget::ChatPanel,
        SelectorTarget::ChatHeader,
        SelectorTarget::ChatTitle,
        SelectorTarget::MessageList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorTarget::Container => "container",
            SelectorTarget::Text => "text",
            SelectorTarget::SenderMetadata => "sender_metadata",
            SelectorTarget::Sender => "sender",
            SelectorTarget::Timestamp => "timestamp",
            SelectorTarget::Reaction => "reaction",
            SelectorTarget::ReactionGroup => "reaction_group",
            SelectorTarget::Emoji => "emoji",
            SelectorTarget::MessageRow => "message_row",
            SelectorTarget::ChatPanel => "chat_panel",
            SelectorTarget::ChatHeader => "chat_header",
            SelectorTarget::ChatTitle => "chat_title",
            SelectorTarget::MessageList => "message_list",
        }
    }

    fn default_strategies(&self) -> &'static [&'static str] {
        match self {
            SelectorTarget::Container => &[
                "._amk4._amkd._amk5, ._amk4",
                r#"[data-testid="msg-container"]"#,
                r#".message, [role="row"]"#,
            ],
            SelectorTarget::Text => &[
                "._ao3e.selectable-text.copyable-text",
                "span._ao3e span",
                "span._ao3e",
                ".selectable-text.copyable-text",
                r#"[data-testid="balloon-text-content"]"#,
            ],
            SelectorTarget::SenderMetadata => &["[data-pre-plain-text]"],
            SelectorTarget::Sender => &[r#"[data-testid="msg-meta"] span"#, ".message-sender"],
            SelectorTarget::Timestamp => &[".x1c4vz4f.x2lah0s", r#"[data-testid="msg-meta"]"#],
            SelectorTarget::Reaction => &[
                r#"button[aria-label^="reaction"]"#,
                r#"[data-testid="msg-reaction"]"#,
                ".x78zum5.x1n2onr6.xbfrwjf.x8k05lb button.xd7y6wv",
            ],
            SelectorTarget::ReactionGroup => &[
                ".x78zum5.x1n2onr6.xbfrwjf.x8k05lb",
                ".x78zum5.x1n2onr6",
                ".xpvyfi4",
                r#"[class*="reaction"]"#,
            ],
            SelectorTarget::Emoji => &["img.emoji, .emoji"],
            SelectorTarget::MessageRow => &[r#"[role="row"]"#],
            SelectorTarget::ChatPanel => &[
                r#"[data-testid="conversation-panel-wrapper"]"#,
                ".two",
                r#"[data-testid="conversation-panel"]"#,
            ],
            SelectorTarget::ChatHeader => &["header", r#"[data-testid="conversation-header"]"#],
            SelectorTarget::ChatTitle => &[r#"[data-testid="conversation-info-header-chat-title"]"#],
            SelectorTarget::MessageList => &[
                r#"[data-testid="conversation-panel-messages"]"#,
                ".message-list",
                r#"[role="application"]"#,
            ],
        }
    }
}

impl fmt::Display for SelectorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectorTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        SelectorTarget::ALL
            .into_iter()
            .find(|target| target.as_str() == wanted)
            .ok_or_else(|| format!("unknown selector target '{s}'"))
    }
}

/// Compile selector sources, logging and skipping the ones that do not parse.
pub(crate) fn compile<S: AsRef<str>>(sources: &[S]) -> Vec<Selector> {
    sources
        .iter()
        .filter_map(|source| match Selector::parse(source.as_ref()) {
            Ok(selector) => Some(selector),
            Err(err) => {
                tracing::warn!(selector = source.as_ref(), error = %err, "skipping invalid selector");
                None
            }
        })
        .collect()
}

/// Configuration table: target -> ordered strategies.
#[derive(Debug, Clone)]
pub struct SelectorTable {
    strategies: HashMap<SelectorTarget, Vec<Selector>>,
}

impl SelectorTable {
    /// Strategies matching the chat application's current markup.
    pub fn builtin() -> Self {
        let strategies = SelectorTarget::ALL
            .into_iter()
            .map(|target| (target, compile(target.default_strategies())))
            .collect();
        Self { strategies }
    }

    /// Replace the strategies of the given targets. A target whose override list compiles to
    /// nothing keeps its previous strategies.
    pub fn with_overrides(mut self, overrides: &BTreeMap<SelectorTarget, Vec<String>>) -> Self {
        for (target, sources) in overrides {
            let compiled = compile(sources.as_slice());
            if compiled.is_empty() {
                tracing::warn!(target = %target, "override has no usable strategy, keeping builtin");
                continue;
            }
            tracing::debug!(target = %target, count = compiled.len(), "selector override applied");
            self.strategies.insert(*target, compiled);
        }
        self
    }

    pub fn strategies(&self, target: SelectorTarget) -> &[Selector] {
        self.strategies
            .get(&target)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolves semantic targets against a snapshot. Holds no element references between calls.
#[derive(Debug, Clone, Default)]
pub struct SelectorResolver {
    table: SelectorTable,
}

impl SelectorResolver {
    pub fn new(table: SelectorTable) -> Self {
        Self { table }
    }

    /// Whole-document resolution.
    pub fn resolve(&self, doc: &DomSnapshot, target: SelectorTarget) -> Vec<NodeId> {
        self.table
            .strategies(target)
            .iter()
            .map(|selector| doc.query_document(selector))
            .find(|matches| !matches.is_empty())
            .unwrap_or_default()
    }

    /// Resolution limited to the descendants of `scope`.
    pub fn resolve_within(
        &self,
        doc: &DomSnapshot,
        scope: NodeId,
        target: SelectorTarget,
    ) -> Vec<NodeId> {
        self.table
            .strategies(target)
            .iter()
            .map(|selector| doc.query_all(scope, selector))
            .find(|matches| !matches.is_empty())
            .unwrap_or_default()
    }

    /// First match of the first strategy that matches anything below `scope`.
    pub fn resolve_first_within(
        &self,
        doc: &DomSnapshot,
        scope: NodeId,
        target: SelectorTarget,
    ) -> Option<NodeId> {
        self.table
            .strategies(target)
            .iter()
            .find_map(|selector| doc.query_first(scope, selector))
    }

    /// `node` or its nearest ancestor matching the target, trying strategies in order.
    pub fn closest(
        &self,
        doc: &DomSnapshot,
        node: NodeId,
        target: SelectorTarget,
    ) -> Option<NodeId> {
        self.table
            .strategies(target)
            .iter()
            .find_map(|selector| doc.closest(node, selector))
    }

    /// Whether `node` itself matches any strategy of the target.
    pub fn matches(&self, doc: &DomSnapshot, node: NodeId, target: SelectorTarget) -> bool {
        self.table
            .strategies(target)
            .iter()
            .any(|selector| selector.matches(doc, node))
    }

    /// Whether any descendant of `node` matches any strategy of the target.
    pub fn contains_match(&self, doc: &DomSnapshot, node: NodeId, target: SelectorTarget) -> bool {
        self.table
            .strategies(target)
            .iter()
            .any(|selector| doc.query_first(node, selector).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_dom::ElementBuilder;

    fn message(class: &str, testid: Option<&str>, text: &str) -> ElementBuilder {
        let mut el = ElementBuilder::new("div").class(class);
        if let Some(testid) = testid {
            el = el.attr("data-testid", testid);
        }
        el.child(ElementBuilder::new("span").text(text))
    }

    #[test]
    fn builtin_table_compiles_every_strategy() {
        let table = SelectorTable::builtin();
        for target in SelectorTarget::ALL {
            assert_eq!(
                table.strategies(target).len(),
                target.default_strategies().len(),
                "{target}"
            );
        }
    }

    #[test]
    fn falls_through_to_second_strategy() {
        let doc = DomSnapshot::from_raw(
            ElementBuilder::new("div")
                .child(message("bubble", Some("msg-container"), "a"))
                .child(message("bubble", Some("msg-container"), "b"))
                .build(),
        );
        let resolver = SelectorResolver::default();
        let hits = resolver.resolve(&doc, SelectorTarget::Container);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn higher_priority_strategy_wins() {
        let doc = DomSnapshot::from_raw(
            ElementBuilder::new("div")
                .child(message("_amk4", None, "primary"))
                .child(message("other", Some("msg-container"), "secondary"))
                .child(message("message", None, "last resort"))
                .build(),
        );
        let resolver = SelectorResolver::default();
        let hits = resolver.resolve(&doc, SelectorTarget::Container);
        assert_eq!(hits.len(), 1);
        assert_eq!(doc.text_content(hits[0]), "primary");
    }

    #[test]
    fn all_strategies_missing_yields_empty() {
        let doc = DomSnapshot::from_raw(ElementBuilder::new("main").text("nothing").build());
        let resolver = SelectorResolver::default();
        assert!(resolver.resolve(&doc, SelectorTarget::Container).is_empty());
        assert!(resolver
            .resolve_first_within(&doc, doc.root_id(), SelectorTarget::Timestamp)
            .is_none());
    }

    #[test]
    fn overrides_replace_only_valid_lists() {
        let mut overrides = BTreeMap::new();
        overrides.insert(SelectorTarget::Container, vec![".bubble".to_string()]);
        overrides.insert(SelectorTarget::Text, vec!["[broken".to_string()]);
        let table = SelectorTable::builtin().with_overrides(&overrides);
        assert_eq!(table.strategies(SelectorTarget::Container).len(), 1);
        assert_eq!(table.strategies(SelectorTarget::Container)[0].as_str(), ".bubble");
        assert_eq!(table.strategies(SelectorTarget::Text).len(), 5);
    }

    #[test]
    fn targets_parse_from_cli_spelling() {
        assert_eq!(
            "message-list".parse::<SelectorTarget>(),
            Ok(SelectorTarget::MessageList)
        );
        assert!("bogus".parse::<SelectorTarget>().is_err());
    }
}
