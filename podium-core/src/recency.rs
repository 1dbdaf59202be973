use crate::normalizer::{normalize, MessageRecord};
use crate::selectors::SelectorResolver;
use podium_dom::{DomSnapshot, NodeId};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// The most recent messages of the previous extraction pass and their fingerprints.
///
/// Replaced wholesale on every [`RecencyWindow::update`]; the fingerprint set always mirrors
/// the stored records, system rows included.
#[derive(Debug, Default)]
pub struct RecencyWindow {
    items: Vec<MessageRecord>,
    seen: HashSet<String>,
}

/// Outcome of one pass over the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowUpdate {
    /// Oldest first, at most `capacity` long
    pub records: Vec<MessageRecord>,
    /// A fingerprint appeared that the previous pass did not have, or the window was empty
    pub changed: bool,
    pub previously_empty: bool,
}

impl WindowUpdate {
    /// Rendering is skipped when nothing new appeared and no alert forces a redraw.
    pub fn should_render(&self, alert_ids: &BTreeSet<String>) -> bool {
        self.changed || !alert_ids.is_empty()
    }
}

impl RecencyWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the last `capacity` containers of `messages` (document order) and replace the
    /// window with them.
    ///
    /// A container that fails to normalize is skipped; it never empties the window. An empty
    /// message list leaves an empty window and reports no change.
    pub fn update(
        &mut self,
        resolver: &SelectorResolver,
        doc: &DomSnapshot,
        messages: &[NodeId],
        capacity: usize,
    ) -> WindowUpdate {
        let previously_empty = self.seen.is_empty();
        let start = messages.len().saturating_sub(capacity.max(1));

        let records: Vec<MessageRecord> = messages[start..]
            .iter()
            .filter_map(|container| match normalize(resolver, doc, *container) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(container = %container, error = %err, "skipping message container");
                    None
                }
            })
            .collect();

        let fingerprints: HashSet<String> = records
            .iter()
            .map(|record| record.fingerprint.clone())
            .collect();
        let changed = !records.is_empty()
            && (previously_empty || !fingerprints.is_subset(&self.seen));

        debug!(
            count = records.len(),
            changed,
            previously_empty,
            "recency window updated"
        );

        self.items = records.clone();
        self.seen = fingerprints;

        WindowUpdate {
            records,
            changed,
            previously_empty,
        }
    }

    pub fn records(&self) -> &[MessageRecord] {
        &self.items
    }

    pub fn seen_fingerprints(&self) -> &HashSet<String> {
        &self.seen
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::SelectorTarget;
    use podium_dom::ElementBuilder;

    fn chat(texts: &[&str]) -> DomSnapshot {
        DomSnapshot::from_raw(
            ElementBuilder::new("div")
                .children(texts.iter().map(|text| {
                    ElementBuilder::new("div")
                        .class("_amk4")
                        .attr("data-id", text)
                        .child(ElementBuilder::new("span").class("_ao3e").text(text))
                }))
                .build(),
        )
    }

    fn pass(window: &mut RecencyWindow, doc: &DomSnapshot, capacity: usize) -> WindowUpdate {
        let resolver = SelectorResolver::default();
        let messages = resolver.resolve(doc, SelectorTarget::Container);
        window.update(&resolver, doc, &messages, capacity)
    }

    #[test]
    fn first_pass_is_always_a_change() {
        let mut window = RecencyWindow::new();
        let update = pass(&mut window, &chat(&["a"]), 5);
        assert!(update.previously_empty);
        assert!(update.changed);
        assert!(update.should_render(&BTreeSet::new()));
    }

    #[test]
    fn shrinking_to_a_subset_is_not_a_change_but_still_replaces() {
        let mut window = RecencyWindow::new();
        pass(&mut window, &chat(&["a", "b", "c"]), 5);
        let update = pass(&mut window, &chat(&["b", "c"]), 5);
        assert!(!update.changed);
        assert_eq!(window.records().len(), 2);
        assert_eq!(window.seen_fingerprints().len(), 2);
    }

    #[test]
    fn alert_ids_force_a_render() {
        let mut window = RecencyWindow::new();
        pass(&mut window, &chat(&["a"]), 5);
        let update = pass(&mut window, &chat(&["a"]), 5);
        assert!(!update.should_render(&BTreeSet::new()));
        assert!(update.should_render(&BTreeSet::from(["a".to_string()])));
    }

    #[test]
    fn empty_list_leaves_an_empty_window() {
        let mut window = RecencyWindow::new();
        pass(&mut window, &chat(&["a"]), 5);
        let update = pass(&mut window, &chat(&[]), 5);
        assert!(!update.changed);
        assert!(update.records.is_empty());
        assert!(window.is_empty());
    }

    #[test]
    fn broken_container_is_skipped() {
        let resolver = SelectorResolver::default();
        let doc = chat(&["a", "b"]);
        let mut messages = resolver.resolve(&doc, SelectorTarget::Container);
        messages.insert(1, NodeId(42));
        let mut window = RecencyWindow::new();
        let update = window.update(&resolver, &doc, &messages, 5);
        let texts: Vec<_> = update.records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn clear_resets_bookkeeping() {
        let mut window = RecencyWindow::new();
        pass(&mut window, &chat(&["a"]), 5);
        window.clear();
        assert!(window.seen_fingerprints().is_empty());
        assert!(pass(&mut window, &chat(&["a"]), 5).previously_empty);
    }
}
