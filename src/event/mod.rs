//! Inbound event dispatch.
//!
//! The client names a widget, an event and a list of raw JSON arguments.
//! [`invoke`] looks the event up in the widget's schema, rebuilds a typed
//! payload with the decoder chosen when the schema was built, and awaits
//! the handler.

mod decode;
mod dispatch;
mod envelope;
mod lenient;
mod upload;

pub use decode::{ArgDecoder, ArgError, EventShape, EventTuple};
pub use dispatch::{invoke, invoke_upload, Dispatch, NotHandled};
pub use envelope::{Event, EventHandler, HandlerFuture, ValueEvent, ValueHandler};
pub use upload::{
    next_chunk, read_to_end, stream_from_chunks, ByteStream, FileMetadata, UploadHandler,
};

pub(crate) use dispatch::BoundEvent;
