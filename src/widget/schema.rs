use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::event::{
    ArgDecoder, BoundEvent, EventHandler, EventShape, EventTuple, UploadHandler, ValueHandler,
};
use crate::view::Element;

use super::node::{EventLookup, UploadLookup};
use super::serialize::{attached_column, camel_case};
use super::WidgetError;

type PropReader<W> = Box<dyn Fn(&W) -> Result<Value, serde_json::Error> + Send + Sync>;
type EventReader<W> = Box<dyn Fn(&W) -> Option<BoundEvent> + Send + Sync>;
type UploadReader<W> = Box<dyn Fn(&W) -> Option<UploadHandler> + Send + Sync>;

enum PropKind<W> {
    Plain(PropReader<W>),
    /// Collected from the children's attached values.
    Attached,
}

struct PropField<W> {
    name: &'static str,
    wire_name: String,
    kind: PropKind<W>,
}

enum EventBinding<W> {
    Handler(EventReader<W>),
    Upload(UploadReader<W>),
}

struct EventField<W> {
    name: &'static str,
    wire_name: String,
    shape: EventShape,
    binding: EventBinding<W>,
}

impl<W> EventField<W> {
    fn matches(&self, name: &str) -> bool {
        self.name == name || self.wire_name == name
    }
}

/// Declared props and events of one widget type.
///
/// Built once per type, usually inside a `OnceLock` returned from
/// [`Widget::schema`](super::Widget::schema).
pub struct WidgetSchema<W> {
    type_name: &'static str,
    props: Vec<PropField<W>>,
    events: Vec<EventField<W>>,
}

impl<W: 'static> WidgetSchema<W> {
    pub fn builder(type_name: &'static str) -> SchemaBuilder<W> {
        SchemaBuilder {
            schema: WidgetSchema {
                type_name,
                props: Vec::new(),
                events: Vec::new(),
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Wire names of every declared prop, in declaration order.
    pub fn prop_names(&self) -> impl Iterator<Item = &str> {
        self.props.iter().map(|field| field.wire_name.as_str())
    }

    /// Argument shape of a declared event, by declared or wire name.
    pub fn event_shape(&self, name: &str) -> Option<EventShape> {
        self.find_event(name).map(|field| field.shape.clone())
    }

    pub(crate) fn write_props(
        &self,
        widget: &W,
        children: &[Element],
        out: &mut Map<String, Value>,
    ) -> Result<(), WidgetError> {
        for field in &self.props {
            let value = match &field.kind {
                PropKind::Plain(read) => read(widget).map_err(|source| WidgetError::Prop {
                    type_name: self.type_name,
                    prop: field.name,
                    source,
                })?,
                PropKind::Attached => {
                    Value::Array(attached_column(self.type_name, field.name, children))
                }
            };
            if !value.is_null() {
                out.insert(field.wire_name.clone(), value);
            }
        }
        Ok(())
    }

    pub(crate) fn active_events(&self, widget: &W) -> Vec<String> {
        self.events
            .iter()
            .filter(|field| match &field.binding {
                EventBinding::Handler(read) => read(widget).is_some(),
                EventBinding::Upload(read) => read(widget).is_some(),
            })
            .map(|field| field.wire_name.clone())
            .collect()
    }

    pub(crate) fn lookup_event(&self, widget: &W, name: &str) -> EventLookup {
        match self.find_event(name).map(|field| &field.binding) {
            Some(EventBinding::Handler(read)) => match read(widget) {
                Some(bound) => EventLookup::Bound(bound),
                None => EventLookup::Detached,
            },
            // Upload events only arrive through the upload path.
            Some(EventBinding::Upload(_)) | None => EventLookup::Unknown,
        }
    }

    pub(crate) fn lookup_upload(&self, widget: &W, name: &str) -> UploadLookup {
        match self.find_event(name).map(|field| &field.binding) {
            Some(EventBinding::Upload(read)) => match read(widget) {
                Some(handler) => UploadLookup::Bound(handler),
                None => UploadLookup::Detached,
            },
            Some(EventBinding::Handler(_)) | None => UploadLookup::Unknown,
        }
    }

    fn find_event(&self, name: &str) -> Option<&EventField<W>> {
        self.events.iter().find(|field| field.matches(name))
    }
}

impl<W> fmt::Debug for WidgetSchema<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetSchema")
            .field("type_name", &self.type_name)
            .field(
                "props",
                &self.props.iter().map(|p| p.name).collect::<Vec<_>>(),
            )
            .field(
                "events",
                &self.events.iter().map(|e| e.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Fluent construction of a [`WidgetSchema`].
///
/// ```ignore
/// fn schema() -> &'static WidgetSchema<Self> {
///     static SCHEMA: OnceLock<WidgetSchema<Button>> = OnceLock::new();
///     SCHEMA.get_or_init(|| {
///         WidgetSchema::builder("Button")
///             .prop("label", |b: &Button| &b.label)
///             .event("on_click", |b: &Button| b.on_click.as_ref())
///             .build()
///     })
/// }
/// ```
pub struct SchemaBuilder<W> {
    schema: WidgetSchema<W>,
}

impl<W: 'static> SchemaBuilder<W> {
    /// A plain prop read from the widget body.
    pub fn prop<V, F>(mut self, name: &'static str, read: F) -> Self
    where
        V: Serialize + ?Sized,
        F: for<'a> Fn(&'a W) -> &'a V + Send + Sync + 'static,
    {
        self.schema.props.push(PropField {
            name,
            wire_name: camel_case(name),
            kind: PropKind::Plain(Box::new(move |widget: &W| {
                serde_json::to_value(read(widget))
            })),
        });
        self
    }

    /// A prop whose values live on the children, keyed by this type.
    pub fn attached(mut self, name: &'static str) -> Self {
        self.schema.props.push(PropField {
            name,
            wire_name: camel_case(name),
            kind: PropKind::Attached,
        });
        self
    }

    /// A sender-only event. Arguments sent by the client are ignored.
    pub fn event<F>(self, name: &'static str, read: F) -> Self
    where
        F: for<'a> Fn(&'a W) -> Option<&'a EventHandler> + Send + Sync + 'static,
    {
        self.push_event(
            name,
            EventShape::SenderOnly,
            EventBinding::Handler(Box::new(move |widget: &W| {
                read(widget).cloned().map(BoundEvent::sender_only)
            })),
        )
    }

    /// An event carrying one value.
    pub fn value_event<T, F>(self, name: &'static str, read: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        F: for<'a> Fn(&'a W) -> Option<&'a ValueHandler<T>> + Send + Sync + 'static,
    {
        self.decoded_event(name, ArgDecoder::single(), read)
    }

    /// An event carrying a fixed-arity tuple.
    pub fn tuple_event<T, F>(self, name: &'static str, read: F) -> Self
    where
        T: EventTuple,
        F: for<'a> Fn(&'a W) -> Option<&'a ValueHandler<T>> + Send + Sync + 'static,
    {
        self.decoded_event(name, ArgDecoder::tuple(T::ARITY), read)
    }

    /// An event carrying one variant of an enumeration.
    ///
    /// `variants` lists the wire names in ordinal order.
    pub fn enum_event<T, F>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        read: F,
    ) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        F: for<'a> Fn(&'a W) -> Option<&'a ValueHandler<T>> + Send + Sync + 'static,
    {
        self.decoded_event(name, ArgDecoder::enumeration(variants), read)
    }

    /// An upload delegate, fed by a streamed request body.
    pub fn upload<F>(self, name: &'static str, read: F) -> Self
    where
        F: for<'a> Fn(&'a W) -> Option<&'a UploadHandler> + Send + Sync + 'static,
    {
        self.push_event(
            name,
            EventShape::Upload,
            EventBinding::Upload(Box::new(move |widget: &W| read(widget).cloned())),
        )
    }

    pub fn build(self) -> WidgetSchema<W> {
        self.schema
    }

    fn decoded_event<T, F>(self, name: &'static str, decoder: ArgDecoder<T>, read: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        F: for<'a> Fn(&'a W) -> Option<&'a ValueHandler<T>> + Send + Sync + 'static,
    {
        let shape = decoder.shape().clone();
        let decoder = Arc::new(decoder);
        self.push_event(
            name,
            shape,
            EventBinding::Handler(Box::new(move |widget: &W| {
                read(widget)
                    .cloned()
                    .map(|handler| BoundEvent::with_value(handler, decoder.clone()))
            })),
        )
    }

    fn push_event(mut self, name: &'static str, shape: EventShape, binding: EventBinding<W>) -> Self {
        self.schema.events.push(EventField {
            name,
            wire_name: camel_case(name),
            shape,
            binding,
        });
        self
    }
}
