use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::widget::{EventLookup, UploadLookup, WidgetNode};

use super::decode::{ArgDecoder, ArgError};
use super::envelope::{Event, EventHandler, HandlerFuture, ValueEvent, ValueHandler};
use super::upload::{ByteStream, FileMetadata};

/// Outcome of routing one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dispatch {
    Handled,
    NotHandled(NotHandled),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled)
    }

    pub fn reason(&self) -> Option<NotHandled> {
        match self {
            Dispatch::Handled => None,
            Dispatch::NotHandled(reason) => Some(*reason),
        }
    }
}

/// Why an event was not delivered. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotHandled {
    UnknownWidget,
    UnknownEvent,
    /// The event is declared but no handler is set.
    Detached,
    BadArguments,
}

impl NotHandled {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotHandled::UnknownWidget => "unknownWidget",
            NotHandled::UnknownEvent => "unknownEvent",
            NotHandled::Detached => "detached",
            NotHandled::BadArguments => "badArguments",
        }
    }
}

impl fmt::Display for NotHandled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BoundCall =
    Box<dyn FnOnce(WidgetNode, String, &[Value]) -> Result<HandlerFuture, ArgError> + Send>;

/// A handler already paired with the decoder for its argument shape.
pub(crate) struct BoundEvent {
    call: BoundCall,
}

impl BoundEvent {
    pub(crate) fn sender_only(handler: EventHandler) -> Self {
        Self {
            call: Box::new(
                move |sender: WidgetNode, name: String, _args: &[Value]| -> Result<HandlerFuture, ArgError> {
                    Ok(handler.call(Event { name, sender }))
                },
            ),
        }
    }

    pub(crate) fn with_value<T>(handler: ValueHandler<T>, decoder: Arc<ArgDecoder<T>>) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self {
            call: Box::new(
                move |sender: WidgetNode, name: String, args: &[Value]| -> Result<HandlerFuture, ArgError> {
                    let value = decoder.decode(args)?;
                    Ok(handler.call(ValueEvent {
                        name,
                        sender,
                        value,
                    }))
                },
            ),
        }
    }

    fn start(
        self,
        sender: WidgetNode,
        name: String,
        args: &[Value],
    ) -> Result<HandlerFuture, ArgError> {
        (self.call)(sender, name, args)
    }
}

/// Deliver `name` with `args` to the handler declared on `node`.
///
/// Lookup and argument problems are reported as [`Dispatch::NotHandled`];
/// an `Err` means the handler itself failed. The handler future is awaited
/// before `Handled` is returned.
pub async fn invoke(node: &WidgetNode, name: &str, args: &[Value]) -> anyhow::Result<Dispatch> {
    let bound = match node.body().lookup_event(name) {
        EventLookup::Bound(bound) => bound,
        EventLookup::Unknown => return Ok(not_handled(node, name, NotHandled::UnknownEvent)),
        EventLookup::Detached => return Ok(not_handled(node, name, NotHandled::Detached)),
    };

    let future = match bound.start(node.clone(), name.to_string(), args) {
        Ok(future) => future,
        Err(error) => {
            tracing::debug!(widget = node.type_name(), event = name, error = %error, "bad event arguments");
            return Ok(Dispatch::NotHandled(NotHandled::BadArguments));
        }
    };

    future.await?;
    tracing::debug!(widget = node.type_name(), event = name, "event handled");
    Ok(Dispatch::Handled)
}

/// Deliver a streamed upload to the upload delegate declared on `node`.
pub async fn invoke_upload(
    node: &WidgetNode,
    name: &str,
    meta: FileMetadata,
    stream: ByteStream,
    cancel: CancellationToken,
) -> anyhow::Result<Dispatch> {
    let handler = match node.body().lookup_upload(name) {
        UploadLookup::Bound(handler) => handler,
        UploadLookup::Unknown => return Ok(not_handled(node, name, NotHandled::UnknownEvent)),
        UploadLookup::Detached => return Ok(not_handled(node, name, NotHandled::Detached)),
    };

    tracing::debug!(widget = node.type_name(), event = name, file = %meta.name, "upload started");
    handler.call(meta, stream, cancel).await?;
    Ok(Dispatch::Handled)
}

fn not_handled(node: &WidgetNode, name: &str, reason: NotHandled) -> Dispatch {
    tracing::debug!(widget = node.type_name(), event = name, reason = %reason, "event not handled");
    Dispatch::NotHandled(reason)
}
