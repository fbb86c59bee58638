use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WidgetError;

/// Transport identity of a widget node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(value: impl Into<String>) -> Self {
        WidgetId(value.into())
    }

    /// Root namespace for one session.
    pub fn root(session: &Uuid) -> Self {
        WidgetId(session.simple().to_string()[..12].to_string())
    }

    /// Deterministic id of the element found at `slot` under `parent`.
    ///
    /// The same parent, type name and slot always produce the same id, so a
    /// re-render without structural change keeps every identity.
    pub fn derive(parent: &WidgetId, type_name: &str, slot: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        parent.0.hash(&mut hasher);
        type_name.hash(&mut hasher);
        slot.hash(&mut hasher);
        WidgetId(format!("{:016x}", hasher.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WidgetId {
    fn from(value: &str) -> Self {
        WidgetId(value.to_string())
    }
}

/// Set-once identity slot of a node.
#[derive(Default)]
pub(crate) struct IdCell(OnceLock<WidgetId>);

impl IdCell {
    pub(crate) fn get(&self, type_name: &'static str) -> Result<&WidgetId, WidgetError> {
        self.0.get().ok_or(WidgetError::UnassignedId { type_name })
    }

    pub(crate) fn is_assigned(&self) -> bool {
        self.0.get().is_some()
    }

    pub(crate) fn assign(&self, id: WidgetId, type_name: &'static str) -> Result<(), WidgetError> {
        self.0
            .set(id)
            .map_err(|rejected| WidgetError::IdAlreadyAssigned {
                type_name,
                rejected: rejected.0,
            })
    }
}
