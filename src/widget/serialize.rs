use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::view::Element;

use super::id::WidgetId;
use super::node::WidgetNode;
use super::WidgetError;

/// Transport form of one widget node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    pub id: WidgetId,
    #[serde(rename = "type")]
    pub type_name: String,
    pub children: Vec<WireNode>,
    pub props: Map<String, Value>,
    pub events: Vec<String>,
}

impl WireNode {
    /// Depth-first search for a node by id.
    pub fn find(&self, id: &WidgetId) -> Option<&WireNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// First node of the given type, depth-first.
    pub fn find_type(&self, type_name: &str) -> Option<&WireNode> {
        if self.type_name == type_name {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_type(type_name))
    }
}

/// Serialize a fully resolved widget subtree.
///
/// Every child must already be a widget; views and leaf content are
/// resolved by the tree before this is called.
pub fn serialize(node: &WidgetNode) -> Result<WireNode, WidgetError> {
    let id = node.id()?.clone();

    let mut children = Vec::with_capacity(node.children().len());
    for (index, child) in node.children().iter().enumerate() {
        match child {
            Element::Widget(child) => children.push(serialize(child)?),
            other => {
                return Err(WidgetError::NonWidgetChild {
                    parent: node.type_name(),
                    index,
                    kind: other.kind(),
                })
            }
        }
    }

    let mut props = Map::new();
    node.body().write_props(node.children(), &mut props)?;

    Ok(WireNode {
        id,
        type_name: node.type_name().to_string(),
        children,
        props,
        events: node.body().active_events(),
    })
}

/// One attached prop of `parent`, aligned with its children.
///
/// Children without a value (including non-widget entries) yield `null`.
pub fn attached_prop(parent: &WidgetNode, name: &str) -> Vec<Value> {
    attached_column(parent.type_name(), name, parent.children())
}

pub(crate) fn attached_column(owner: &str, name: &str, children: &[Element]) -> Vec<Value> {
    children
        .iter()
        .map(|child| match child {
            Element::Widget(node) => node
                .attached_value(owner, name)
                .cloned()
                .unwrap_or(Value::Null),
            _ => Value::Null,
        })
        .collect()
}

/// `on_click`, `OnClick` and `on-click` all become `onClick`.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (index, segment) in name
        .split(['_', '-'])
        .filter(|segment| !segment.is_empty())
        .enumerate()
    {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}
