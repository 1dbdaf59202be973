use podium_dom::{diff_snapshots, DomMutation, DomSnapshot, Selector};

const BEFORE: &str = r#"
{
  "tag": "div",
  "attrs": { "data-testid": "conversation-panel-messages" },
  "children": [
    { "tag": "div", "attrs": { "role": "row" }, "children": [
      { "tag": "div", "attrs": { "class": "_amk4 _amkd", "data-id": "false_1@c.us_A" }, "children": [
        { "tag": "span", "attrs": { "class": "_ao3e selectable-text copyable-text" }, "children": ["Morning all"] }
      ]}
    ]}
  ]
}
"#;

const AFTER: &str = r#"
{
  "tag": "div",
  "attrs": { "data-testid": "conversation-panel-messages" },
  "children": [
    { "tag": "div", "attrs": { "role": "row" }, "children": [
      { "tag": "div", "attrs": { "class": "_amk4 _amkd", "data-id": "false_1@c.us_A" }, "children": [
        { "tag": "span", "attrs": { "class": "_ao3e selectable-text copyable-text" }, "children": ["Morning all"] },
        { "tag": "button", "attrs": { "aria-label": "reaction 🚨" } }
      ]}
    ]},
    { "tag": "div", "attrs": { "role": "row" }, "children": [
      { "tag": "div", "attrs": { "class": "_amk4 _amkd", "data-id": "true_1@c.us_B" }, "children": [
        { "tag": "span", "attrs": { "class": "_ao3e selectable-text copyable-text" }, "children": ["On my way"] }
      ]}
    ]}
  ]
}
"#;

#[test]
fn json_captures_diff_into_child_list_records() {
    let before = DomSnapshot::from_json(BEFORE).unwrap();
    let after = DomSnapshot::from_json(AFTER).unwrap();

    let batch = diff_snapshots(&before, &after);
    let added: Vec<_> = batch.iter().flat_map(|m| m.added_nodes().to_vec()).collect();
    assert_eq!(added.len(), 2, "reaction button and new row: {batch:?}");

    let button = Selector::parse("button[aria-label^=reaction]").unwrap();
    assert!(added.iter().any(|id| after.matches(*id, &button)));

    let container = Selector::parse("._amk4").unwrap();
    let new_row = added
        .iter()
        .copied()
        .find(|id| after.attribute(*id, "role") == Some("row"))
        .unwrap();
    assert_eq!(after.query_all(new_row, &container).len(), 1);
    assert!(batch
        .iter()
        .all(|m| matches!(m, DomMutation::ChildList { removed, .. } if removed.is_empty())));
}

#[test]
fn closest_includes_the_node_itself() {
    let doc = DomSnapshot::from_json(AFTER).unwrap();
    let container = Selector::parse("._amk4._amkd").unwrap();
    let rows = doc.query_document(&container);
    assert_eq!(rows.len(), 2);
    assert_eq!(doc.closest(rows[0], &container), Some(rows[0]));
    let text = doc.query_first(rows[1], &Selector::parse("span").unwrap()).unwrap();
    assert_eq!(doc.closest(text, &container), Some(rows[1]));
    assert_eq!(doc.text_content(rows[1]), "On my way");
}
