mod common;

use serde_json::{json, Value};

use tether::view::{Element, View, ViewContext};
use tether::widget::{attached_prop, serialize, TextBlock, WidgetNode};

use common::{built_tree, panel, Panel, Probe};

/// Renders a fixed element.
struct Fixed(Element);

impl View for Fixed {
    fn name(&self) -> &'static str {
        "Fixed"
    }

    fn build(&self, _cx: &mut ViewContext) -> anyhow::Result<Element> {
        Ok(self.0.clone())
    }
}

/// Null props are left out; set props use camelCase names.
#[tokio::test]
async fn test_null_props_are_omitted() {
    let (_tree, wire) = built_tree(Fixed(Probe::new("ok").into())).await;

    assert_eq!(wire.type_name, "Probe");
    assert_eq!(wire.props.get("label"), Some(&json!("ok")));
    assert!(!wire.props.contains_key("hint"));

    let mut with_hint = Probe::new("ok");
    with_hint.hint = Some("press me".to_string());
    let (_tree, wire) = built_tree(Fixed(with_hint.into())).await;
    assert_eq!(wire.props.get("hint"), Some(&json!("press me")));
}

/// Only events with a handler attached are advertised, in wire form.
#[tokio::test]
async fn test_only_attached_events_are_listed() {
    let mut probe = Probe::new("ok");
    probe.on_click = Some(tether::event::EventHandler::sync(|_| Ok(())));
    let (_tree, wire) = built_tree(Fixed(probe.into())).await;
    assert_eq!(wire.events, vec!["onClick".to_string()]);
}

/// An attached prop is one column aligned with the children.
#[tokio::test]
async fn test_attached_prop_aligns_with_children() {
    let first = WidgetNode::new(Probe::new("a")).attach_for::<Panel>("dock", "left");
    let element = panel(vec![
        first.into(),
        Probe::new("b").into(),
        Probe::new("c").into(),
    ]);
    let (_tree, wire) = built_tree(Fixed(element)).await;

    assert_eq!(wire.type_name, "Panel");
    assert_eq!(wire.children.len(), 3);
    assert_eq!(wire.props["dock"], json!(["left", null, null]));
}

#[test]
fn test_attached_prop_helper_reads_unresolved_children() {
    let node = WidgetNode::new(Panel::default()).with_children(vec![
        Element::from(Probe::new("a")),
        WidgetNode::new(Probe::new("b"))
            .attach_for::<Panel>("dock", "top")
            .into(),
        Element::text("leaf"),
    ]);
    assert_eq!(
        attached_prop(&node, "dock"),
        vec![Value::Null, json!("top"), Value::Null]
    );
}

/// Leaf content inside a widget is normalized into a TextBlock.
#[tokio::test]
async fn test_content_children_become_text_blocks() {
    let element = panel(vec![Element::text("hello"), Element::Content(json!(42))]);
    let (_tree, wire) = built_tree(Fixed(element)).await;

    let kinds: Vec<&str> = wire.children.iter().map(|c| c.type_name.as_str()).collect();
    assert_eq!(kinds, vec!["TextBlock", "TextBlock"]);
    assert_eq!(wire.children[0].props["content"], json!("hello"));
    assert_eq!(wire.children[1].props["content"], json!(42));
}

/// Serializing a node that never got an id fails.
#[test]
fn test_serialize_requires_assigned_id() {
    let node = WidgetNode::new(TextBlock::new("orphan"));
    assert!(serialize(&node).is_err());
}

/// Children with the same structure get distinct, stable ids.
#[tokio::test]
async fn test_sibling_ids_are_distinct() {
    let element = panel(vec![Probe::new("x").into(), Probe::new("x").into()]);
    let (_tree, first) = built_tree(Fixed(element.clone())).await;
    assert_ne!(first.children[0].id, first.children[1].id);
}

/// The wire format uses `type` and keeps every field.
#[tokio::test]
async fn test_wire_shape() {
    let (_tree, wire) = built_tree(Fixed(Probe::new("ok").into())).await;
    let value = serde_json::to_value(&wire).expect("serialize wire node");
    let object = value.as_object().expect("object");
    for field in ["id", "type", "children", "props", "events"] {
        assert!(object.contains_key(field), "missing {field}");
    }
    assert_eq!(value["type"], json!("Probe"));
}
