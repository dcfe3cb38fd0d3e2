//! Attribute modifiers
//!
//! Redactors irreversibly mask a value before it is recorded; encoders
//! transform it reversibly. A redacted attribute cannot be transitioned back.

use crate::error::{configuration_error, ModerationResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Irreversible value masking
pub trait AttributeRedactor: Send + Sync {
    fn name(&self) -> &str;

    fn redact(&self, value: &Value) -> Value;
}

/// Reversible value transformation
pub trait AttributeEncoder: Send + Sync {
    fn name(&self) -> &str;

    fn encode(&self, value: &Value) -> Value;

    fn decode(&self, value: &Value) -> Value;
}

#[derive(Clone)]
pub enum AttributeModifier {
    Redactor(Arc<dyn AttributeRedactor>),
    Encoder(Arc<dyn AttributeEncoder>),
}

impl AttributeModifier {
    pub fn redactor(redactor: impl AttributeRedactor + 'static) -> Self {
        AttributeModifier::Redactor(Arc::new(redactor))
    }

    pub fn encoder(encoder: impl AttributeEncoder + 'static) -> Self {
        AttributeModifier::Encoder(Arc::new(encoder))
    }

    pub fn name(&self) -> &str {
        match self {
            AttributeModifier::Redactor(r) => r.name(),
            AttributeModifier::Encoder(e) => e.name(),
        }
    }

    pub fn is_redactor(&self) -> bool {
        matches!(self, AttributeModifier::Redactor(_))
    }

    /// Transform a value before it is recorded
    pub fn modify(&self, value: &Value) -> Value {
        match self {
            AttributeModifier::Redactor(r) => r.redact(value),
            AttributeModifier::Encoder(e) => e.encode(value),
        }
    }
}

impl fmt::Debug for AttributeModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeModifier::Redactor(r) => write!(f, "Redactor({})", r.name()),
            AttributeModifier::Encoder(e) => write!(f, "Encoder({})", e.name()),
        }
    }
}

/// Text form of a scalar used by the masking redactors
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Number of characters left unmasked: a quarter, at least one for values longer than two
fn visible_len(total: usize) -> usize {
    if total <= 2 {
        0
    } else {
        total.div_ceil(4)
    }
}

/// Masks everything but the tail of the value
#[derive(Debug, Clone, Default)]
pub struct LeftRedactor;

impl AttributeRedactor for LeftRedactor {
    fn name(&self) -> &str {
        "left"
    }

    fn redact(&self, value: &Value) -> Value {
        let chars: Vec<char> = value_text(value).chars().collect();
        let keep = visible_len(chars.len());
        let masked = chars.len() - keep;

        let text: String = std::iter::repeat('#')
            .take(masked)
            .chain(chars[masked..].iter().copied())
            .collect();
        Value::String(text)
    }
}

/// Masks everything but the head of the value
#[derive(Debug, Clone, Default)]
pub struct RightRedactor;

impl AttributeRedactor for RightRedactor {
    fn name(&self) -> &str {
        "right"
    }

    fn redact(&self, value: &Value) -> Value {
        let chars: Vec<char> = value_text(value).chars().collect();
        let keep = visible_len(chars.len());

        let text: String = chars[..keep]
            .iter()
            .copied()
            .chain(std::iter::repeat('#').take(chars.len() - keep))
            .collect();
        Value::String(text)
    }
}

/// Replaces the value with its SHA-256 hex digest
#[derive(Debug, Clone, Default)]
pub struct HashRedactor;

impl AttributeRedactor for HashRedactor {
    fn name(&self) -> &str {
        "hash"
    }

    fn redact(&self, value: &Value) -> Value {
        let mut hasher = Sha256::new();
        hasher.update(value_text(value).as_bytes());
        Value::String(format!("{:x}", hasher.finalize()))
    }
}

/// Base64 of the value's JSON text; decoding restores the original type
#[derive(Debug, Clone, Default)]
pub struct Base64Encoder;

impl AttributeEncoder for Base64Encoder {
    fn name(&self) -> &str {
        "base64"
    }

    fn encode(&self, value: &Value) -> Value {
        Value::String(STANDARD.encode(value.to_string()))
    }

    fn decode(&self, value: &Value) -> Value {
        let Value::String(encoded) = value else {
            return value.clone();
        };

        STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_else(|| value.clone())
    }
}

/// Modifiers addressable by name from configuration
#[derive(Clone)]
pub struct ModifierRegistry {
    modifiers: HashMap<String, AttributeModifier>,
}

impl Default for ModifierRegistry {
    fn default() -> Self {
        let mut registry = Self {
            modifiers: HashMap::new(),
        };
        registry.register("left", AttributeModifier::redactor(LeftRedactor));
        registry.register("right", AttributeModifier::redactor(RightRedactor));
        registry.register("hash", AttributeModifier::redactor(HashRedactor));
        registry.register("base64", AttributeModifier::encoder(Base64Encoder));
        registry
    }
}

impl ModifierRegistry {
    pub fn register(&mut self, name: &str, modifier: AttributeModifier) {
        self.modifiers.insert(name.to_string(), modifier);
    }

    pub fn resolve(&self, name: &str) -> ModerationResult<AttributeModifier> {
        self.modifiers.get(name).cloned().ok_or_else(|| {
            configuration_error(format!("Invalid AttributeModifier implementation: {}", name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_left_and_right_masks() {
        assert_eq!(LeftRedactor.redact(&json!("12345678")), json!("######78"));
        assert_eq!(RightRedactor.redact(&json!("12345678")), json!("12######"));
        assert_eq!(LeftRedactor.redact(&json!("ab")), json!("##"));
        assert_eq!(RightRedactor.redact(&json!(12345)), json!("12###"));
    }

    #[test]
    fn test_hash_redactor_is_stable() {
        let first = HashRedactor.redact(&json!("secret"));
        assert_eq!(first, HashRedactor.redact(&json!("secret")));
        assert_eq!(first.as_str().map(str::len), Some(64));
        assert_ne!(first, HashRedactor.redact(&json!("other")));
        assert_eq!(
            first,
            json!("2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b")
        );
    }

    #[test]
    fn test_base64_restores_type() {
        for value in [json!("text"), json!(42), json!(true), json!(null)] {
            let encoded = Base64Encoder.encode(&value);
            assert!(encoded.is_string());
            assert_eq!(Base64Encoder.decode(&encoded), value);
        }
    }

    #[test]
    fn test_registry_resolves_builtins() {
        let registry = ModifierRegistry::default();

        assert!(registry.resolve("left").unwrap().is_redactor());
        assert!(!registry.resolve("base64").unwrap().is_redactor());

        let err = registry.resolve("rot13").unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid AttributeModifier implementation: rot13"
        );
    }
}
