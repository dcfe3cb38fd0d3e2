//! Entity persistence interface
//!
//! The narrow surface the moderation core needs from a host's entities:
//! attribute access, the dirty diff against the last synced state, and
//! visibility/timestamp conventions.

mod dynamic;

pub use dynamic::{DynamicModel, EventGetter};

use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute name -> current value
pub type Attributes = BTreeMap<String, Value>;

/// An entity whose attributes can be read, diffed and written back
pub trait Model: Send + Sync {
    /// Entity type name stored with each moderation (e.g. `posts`)
    fn morph_class(&self) -> &str;

    /// Primary key, `None` while the entity is not persisted
    fn key(&self) -> Option<String>;

    /// Current attribute values
    fn attributes(&self) -> &Attributes;

    /// Attribute values as last loaded from or saved to storage
    fn original(&self) -> &Attributes;

    fn set_attribute(&mut self, name: &str, value: Value);

    fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes().get(name)
    }

    /// Attributes whose current value differs from the original one
    fn dirty(&self) -> Attributes {
        let original = self.original();
        self.attributes()
            .iter()
            .filter(|(name, value)| original.get(name.as_str()) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    /// Attributes hidden from serialization
    fn hidden(&self) -> &[String] {
        &[]
    }

    /// Explicitly visible attributes; empty means "all"
    fn visible(&self) -> &[String] {
        &[]
    }

    fn created_at_column(&self) -> &str {
        "created_at"
    }

    fn updated_at_column(&self) -> &str {
        "updated_at"
    }

    /// Soft-delete marker column, `Some` only for soft-deleting entities
    fn deleted_at_column(&self) -> Option<&str> {
        None
    }
}

/// Render a key-like attribute value as the string stored in references
pub fn key_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_to_string() {
        assert_eq!(key_to_string(&json!(42)), Some("42".to_string()));
        assert_eq!(key_to_string(&json!("a-1")), Some("a-1".to_string()));
        assert_eq!(key_to_string(&json!(null)), None);
        assert_eq!(key_to_string(&json!([1])), None);
    }
}
