use crate::selectors::{SelectorResolver, SelectorTarget};
use podium_dom::{DomMutation, DomSnapshot, NodeId};

/// Whether a mutation batch plausibly touched a message.
///
/// Relevant when any added element is or contains a message container, or when an attribute
/// or text change lands inside one. Text changes are reported against the text node, so the
/// lookup starts from its parent element.
pub fn is_relevant(resolver: &SelectorResolver, doc: &DomSnapshot, batch: &[DomMutation]) -> bool {
    batch
        .iter()
        .any(|mutation| mutation_is_relevant(resolver, doc, mutation))
}

fn mutation_is_relevant(resolver: &SelectorResolver, doc: &DomSnapshot, mutation: &DomMutation) -> bool {
    match mutation {
        DomMutation::ChildList { added, .. } => added
            .iter()
            .any(|node| adds_container(resolver, doc, *node)),
        DomMutation::Attributes { target, .. } | DomMutation::CharacterData { target } => {
            let element = if doc.is_element(*target) {
                Some(*target)
            } else {
                doc.parent_element(*target)
            };
            element.is_some_and(|element| {
                resolver
                    .closest(doc, element, SelectorTarget::Container)
                    .is_some()
            })
        }
    }
}

fn adds_container(resolver: &SelectorResolver, doc: &DomSnapshot, node: NodeId) -> bool {
    doc.is_element(node)
        && (resolver.matches(doc, node, SelectorTarget::Container)
            || resolver.contains_match(doc, node, SelectorTarget::Container))
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_dom::{diff_snapshots, ElementBuilder};

    fn list(children: Vec<ElementBuilder>) -> DomSnapshot {
        DomSnapshot::from_raw(
            ElementBuilder::new("div")
                .attr("data-testid", "conversation-panel-messages")
                .children(children)
                .build(),
        )
    }

    fn message(id: &str, text: &str) -> ElementBuilder {
        ElementBuilder::new("div")
            .attr("role", "row")
            .child(
                ElementBuilder::new("div")
                    .class("_amk4")
                    .attr("data-id", id)
                    .child(ElementBuilder::new("span").text(text)),
            )
    }

    #[test]
    fn added_row_wrapping_a_container_is_relevant() {
        let resolver = SelectorResolver::default();
        let old = list(vec![message("a", "one")]);
        let new = list(vec![message("a", "one"), message("b", "two")]);
        let batch = diff_snapshots(&old, &new);
        assert!(!batch.is_empty());
        assert!(is_relevant(&resolver, &new, &batch));
    }

    #[test]
    fn typing_indicator_is_not_relevant() {
        let resolver = SelectorResolver::default();
        let old = list(vec![message("a", "one")]);
        let new = list(vec![
            message("a", "one"),
            ElementBuilder::new("div").class("typing").text("typing..."),
        ]);
        let batch = diff_snapshots(&old, &new);
        assert!(!batch.is_empty());
        assert!(!is_relevant(&resolver, &new, &batch));
    }

    #[test]
    fn text_edit_inside_a_message_is_relevant() {
        let resolver = SelectorResolver::default();
        let old = list(vec![message("a", "one")]);
        let new = list(vec![message("a", "one (edited)")]);
        let batch = diff_snapshots(&old, &new);
        assert!(batch
            .iter()
            .any(|mutation| matches!(mutation, DomMutation::CharacterData { .. })));
        assert!(is_relevant(&resolver, &new, &batch));
    }

    #[test]
    fn attribute_change_outside_messages_is_ignored() {
        let resolver = SelectorResolver::default();
        let doc = list(vec![message("a", "one")]);
        let batch = vec![DomMutation::Attributes {
            target: doc.root_id(),
            attribute: "style".to_string(),
        }];
        assert!(!is_relevant(&resolver, &doc, &batch));
    }

    #[test]
    fn empty_batch_is_not_relevant() {
        let resolver = SelectorResolver::default();
        let doc = list(vec![]);
        assert!(!is_relevant(&resolver, &doc, &[]));
    }
}
