//! Widget nodes, their identity, and the wire format they serialize to.
//!
//! Every widget type declares its props and events once, in a
//! [`WidgetSchema`]. Nothing outside the schema reaches the wire.

mod attached;
mod builtin;
mod id;
mod node;
mod schema;
mod serialize;

use thiserror::Error;

pub use attached::{AttachedKey, AttachedValues};
pub use builtin::{ErrorView, TextBlock};
pub use id::WidgetId;
pub use node::{Widget, WidgetNode};
pub use schema::{SchemaBuilder, WidgetSchema};
pub use serialize::{attached_prop, camel_case, serialize, WireNode};

pub(crate) use node::{EventLookup, UploadLookup};

/// Construction errors. These are programming errors and fatal to the
/// subtree being serialized.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("widget '{type_name}' was read before an id was assigned")]
    UnassignedId { type_name: &'static str },

    #[error("widget '{type_name}' already has an id, refusing '{rejected}'")]
    IdAlreadyAssigned {
        type_name: &'static str,
        rejected: String,
    },

    #[error("child {index} of '{parent}' is {kind}, not a widget")]
    NonWidgetChild {
        parent: &'static str,
        index: usize,
        kind: &'static str,
    },

    #[error("prop '{prop}' of '{type_name}' failed to serialize: {source}")]
    Prop {
        type_name: &'static str,
        prop: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
