use std::collections::BTreeMap;

use serde_json::Value;

/// Key of an attached value: the parent widget type that owns the meaning,
/// and the prop name within that type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttachedKey {
    pub owner: String,
    pub name: String,
}

/// Values a parent stashes on a child without the child's type knowing.
///
/// Payloads are opaque; the only rule is one value per `(owner, name)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachedValues {
    entries: BTreeMap<AttachedKey, Value>,
}

impl AttachedValues {
    pub fn get(&self, owner: &str, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key.owner == owner && key.name == name)
            .map(|(_, value)| value)
    }

    /// Store a value, returning the one it replaced.
    pub fn insert(&mut self, owner: &str, name: &str, value: Value) -> Option<Value> {
        self.entries.insert(
            AttachedKey {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            value,
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttachedKey, &Value)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_replaces_same_key() {
        let mut values = AttachedValues::default();
        assert!(values.insert("Grid", "column", json!(1)).is_none());
        assert_eq!(values.insert("Grid", "column", json!(2)), Some(json!(1)));
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("Grid", "column"), Some(&json!(2)));
    }

    #[test]
    fn owners_do_not_collide() {
        let mut values = AttachedValues::default();
        values.insert("Grid", "column", json!(1));
        values.insert("Dock", "column", json!("left"));
        assert_eq!(values.get("Grid", "column"), Some(&json!(1)));
        assert_eq!(values.get("Dock", "column"), Some(&json!("left")));
        assert_eq!(values.get("Table", "column"), None);
    }
}
