use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::widget::{Widget, WidgetNode};

use super::View;

/// One entry of a view's output or a widget's child list.
#[derive(Clone)]
pub enum Element {
    Widget(WidgetNode),
    View(ViewElement),
    /// Opaque leaf content, rendered as a `TextBlock`.
    Content(Value),
}

impl Element {
    pub fn view(view: impl View) -> Self {
        Element::View(ViewElement::new(view))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Element::Content(Value::String(text.into()))
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Element::Widget(node) => node.key(),
            Element::View(view) => view.key(),
            Element::Content(_) => None,
        }
    }

    pub fn as_widget(&self) -> Option<&WidgetNode> {
        match self {
            Element::Widget(node) => Some(node),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Widget(_) => "a widget",
            Element::View(_) => "a view",
            Element::Content(_) => "leaf content",
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Widget(node) => fmt::Debug::fmt(node, f),
            Element::View(view) => fmt::Debug::fmt(view, f),
            Element::Content(value) => f.debug_tuple("Content").field(value).finish(),
        }
    }
}

/// A view placed in the tree, optionally keyed among its siblings.
#[derive(Clone)]
pub struct ViewElement {
    view: Arc<dyn View>,
    key: Option<String>,
}

impl ViewElement {
    pub fn new(view: impl View) -> Self {
        Self::from_arc(Arc::new(view))
    }

    pub fn from_arc(view: Arc<dyn View>) -> Self {
        Self { view, key: None }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn name(&self) -> &'static str {
        self.view.name()
    }

    pub(crate) fn view(&self) -> &Arc<dyn View> {
        &self.view
    }
}

impl fmt::Debug for ViewElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewElement")
            .field("name", &self.name())
            .field("key", &self.key)
            .finish()
    }
}

impl From<WidgetNode> for Element {
    fn from(node: WidgetNode) -> Self {
        Element::Widget(node)
    }
}

impl<W: Widget> From<W> for Element {
    fn from(widget: W) -> Self {
        Element::Widget(WidgetNode::new(widget))
    }
}

impl From<ViewElement> for Element {
    fn from(view: ViewElement) -> Self {
        Element::View(view)
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Element::Content(value)
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::text(text)
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::text(text)
    }
}
