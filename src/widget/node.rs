use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::event::{BoundEvent, UploadHandler};
use crate::view::Element;

use super::attached::AttachedValues;
use super::id::{IdCell, WidgetId};
use super::schema::WidgetSchema;
use super::WidgetError;

/// A widget type with a declared schema.
///
/// Implementors are plain data structs holding their props and event
/// handlers; the schema tells the runtime which fields go on the wire.
pub trait Widget: Clone + Send + Sync + 'static {
    fn schema() -> &'static WidgetSchema<Self>;

    fn into_node(self) -> WidgetNode {
        WidgetNode::new(self)
    }
}

pub(crate) enum EventLookup {
    Unknown,
    Detached,
    Bound(BoundEvent),
}

pub(crate) enum UploadLookup {
    Unknown,
    Detached,
    Bound(UploadHandler),
}

/// Object-safe view of a widget body, implemented for every [`Widget`].
pub(crate) trait DynWidget: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn write_props(&self, children: &[Element], out: &mut Map<String, Value>)
        -> Result<(), WidgetError>;
    fn active_events(&self) -> Vec<String>;
    fn lookup_event(&self, name: &str) -> EventLookup;
    fn lookup_upload(&self, name: &str) -> UploadLookup;
    fn as_any(&self) -> &dyn Any;
}

impl<W: Widget> DynWidget for W {
    fn type_name(&self) -> &'static str {
        W::schema().type_name()
    }

    fn write_props(
        &self,
        children: &[Element],
        out: &mut Map<String, Value>,
    ) -> Result<(), WidgetError> {
        W::schema().write_props(self, children, out)
    }

    fn active_events(&self) -> Vec<String> {
        W::schema().active_events(self)
    }

    fn lookup_event(&self, name: &str) -> EventLookup {
        W::schema().lookup_event(self, name)
    }

    fn lookup_upload(&self, name: &str) -> UploadLookup {
        W::schema().lookup_upload(self, name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One immutable element of the render tree.
///
/// Cloning is cheap and shares the node. All `with_*` methods derive a new
/// node with a fresh, unassigned identity; the original is never touched.
#[derive(Clone)]
pub struct WidgetNode {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    id: IdCell,
    key: Option<String>,
    children: Vec<Element>,
    attached: AttachedValues,
    body: Arc<dyn DynWidget>,
}

impl WidgetNode {
    pub fn new<W: Widget>(widget: W) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id: IdCell::default(),
                key: None,
                children: Vec::new(),
                attached: AttachedValues::default(),
                body: Arc::new(widget),
            }),
        }
    }

    /// The node's identity. Fails if the tree has not assigned one yet.
    pub fn id(&self) -> Result<&WidgetId, WidgetError> {
        self.inner.id.get(self.type_name())
    }

    pub fn has_id(&self) -> bool {
        self.inner.id.is_assigned()
    }

    pub(crate) fn assign_id(&self, id: WidgetId) -> Result<(), WidgetError> {
        self.inner.id.assign(id, self.type_name())
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.body.type_name()
    }

    pub fn key(&self) -> Option<&str> {
        self.inner.key.as_deref()
    }

    pub fn children(&self) -> &[Element] {
        &self.inner.children
    }

    pub fn attached(&self) -> &AttachedValues {
        &self.inner.attached
    }

    pub fn attached_value(&self, owner: &str, name: &str) -> Option<&Value> {
        self.inner.attached.get(owner, name)
    }

    /// Borrow the widget body if it is a `W`.
    pub fn widget<W: Widget>(&self) -> Option<&W> {
        self.inner.body.as_any().downcast_ref::<W>()
    }

    pub fn with_key(&self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.derive(|parts| parts.key = Some(key))
    }

    pub fn with_children<I>(&self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        let children: Vec<Element> = children.into_iter().map(Into::into).collect();
        self.derive(|parts| parts.children = children)
    }

    pub fn with_child(&self, child: impl Into<Element>) -> Self {
        let child = child.into();
        self.derive(|parts| parts.children.push(child))
    }

    /// Copy of this node with the widget body modified by `f`.
    ///
    /// Returns `None` when the body is not a `W`.
    pub fn with_widget<W: Widget>(&self, f: impl FnOnce(&mut W)) -> Option<Self> {
        let mut widget = self.widget::<W>()?.clone();
        f(&mut widget);
        Some(self.derive(|parts| parts.body = Arc::new(widget)))
    }

    /// Copy of this node carrying an attached value for the parent type
    /// `owner`.
    pub fn attach(&self, owner: &str, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.derive(|parts| {
            parts.attached.insert(owner, name, value);
        })
    }

    /// [`attach`](Self::attach) keyed by the schema name of the parent type.
    pub fn attach_for<P: Widget>(&self, name: &str, value: impl Into<Value>) -> Self {
        self.attach(P::schema().type_name(), name, value)
    }

    pub(crate) fn body(&self) -> &dyn DynWidget {
        self.inner.body.as_ref()
    }

    fn derive(&self, f: impl FnOnce(&mut NodeParts)) -> Self {
        let mut parts = NodeParts {
            key: self.inner.key.clone(),
            children: self.inner.children.clone(),
            attached: self.inner.attached.clone(),
            body: self.inner.body.clone(),
        };
        f(&mut parts);
        Self {
            inner: Arc::new(NodeInner {
                id: IdCell::default(),
                key: parts.key,
                children: parts.children,
                attached: parts.attached,
                body: parts.body,
            }),
        }
    }
}

struct NodeParts {
    key: Option<String>,
    children: Vec<Element>,
    attached: AttachedValues,
    body: Arc<dyn DynWidget>,
}

impl<W: Widget> From<W> for WidgetNode {
    fn from(widget: W) -> Self {
        WidgetNode::new(widget)
    }
}

impl fmt::Debug for WidgetNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetNode")
            .field("type", &self.type_name())
            .field("id", &self.id().ok())
            .field("key", &self.inner.key)
            .field("children", &self.inner.children.len())
            .finish()
    }
}
