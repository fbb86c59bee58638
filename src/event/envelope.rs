use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_core::future::BoxFuture;

use crate::widget::WidgetNode;

/// Future returned by an event handler.
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Sender-only event.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub sender: WidgetNode,
}

/// Event carrying a value reconstructed from the client's arguments.
#[derive(Debug, Clone)]
pub struct ValueEvent<T> {
    pub name: String,
    pub sender: WidgetNode,
    pub value: T,
}

/// Handler of a sender-only event.
#[derive(Clone)]
pub struct EventHandler(Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>);

impl EventHandler {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        EventHandler(Arc::new(move |event: Event| {
            Box::pin(handler(event)) as HandlerFuture
        }))
    }

    /// Wrap a handler that finishes without awaiting anything.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(move |event| std::future::ready(handler(event)))
    }

    pub(crate) fn call(&self, event: Event) -> HandlerFuture {
        (self.0)(event)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler")
    }
}

/// Handler of an event with a typed value.
pub struct ValueHandler<T>(Arc<dyn Fn(ValueEvent<T>) -> HandlerFuture + Send + Sync>);

impl<T: Send + 'static> ValueHandler<T> {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(ValueEvent<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        ValueHandler(Arc::new(move |event: ValueEvent<T>| {
            Box::pin(handler(event)) as HandlerFuture
        }))
    }

    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(ValueEvent<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(move |event| std::future::ready(handler(event)))
    }

    pub(crate) fn call(&self, event: ValueEvent<T>) -> HandlerFuture {
        (self.0)(event)
    }
}

impl<T> Clone for ValueHandler<T> {
    fn clone(&self) -> Self {
        ValueHandler(self.0.clone())
    }
}

impl<T> fmt::Debug for ValueHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueHandler<{}>", std::any::type_name::<T>())
    }
}
