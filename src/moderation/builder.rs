//! Moderation record construction
//!
//! Pure: combines the extracted attributes, the resolved request context and
//! the modifiers into a [`PendingModeration`].

use super::{
    AttributeModifier, ModerationStatus, NewModeration, NewModerationField, PendingModeration,
    ResolvedContext,
};
use crate::model::{Attributes, Model};
use serde_json::Value;
use std::collections::BTreeMap;

pub struct ModerationRecordBuilder<'a> {
    modifiers: &'a BTreeMap<String, AttributeModifier>,
}

impl<'a> ModerationRecordBuilder<'a> {
    pub fn new(modifiers: &'a BTreeMap<String, AttributeModifier>) -> Self {
        Self { modifiers }
    }

    /// One field per key of `old`, or of `new` when `old` is empty
    pub fn build<M: Model + ?Sized>(
        &self,
        event: &str,
        entity: &M,
        old: Attributes,
        new: Attributes,
        context: ResolvedContext,
    ) -> PendingModeration {
        let old = self.modify(old);
        let new = self.modify(new);

        let names: Vec<&String> = if old.is_empty() {
            new.keys().collect()
        } else {
            old.keys().collect()
        };

        let fields = names
            .into_iter()
            .map(|name| NewModerationField {
                name: name.clone(),
                old: old.get(name).cloned(),
                new: new.get(name).cloned(),
                status: ModerationStatus::Pending,
            })
            .collect();

        let (user_id, user_type) = match context.user {
            Some(principal) => (Some(principal.id), Some(principal.kind)),
            None => (None, None),
        };

        PendingModeration {
            moderation: NewModeration {
                user_id,
                user_type,
                entity_type: entity.morph_class().to_string(),
                entity_id: entity.key(),
                event: event.to_string(),
                status: ModerationStatus::Pending,
                url: context.url,
                ip_address: context.ip_address,
                user_agent: context.user_agent,
                moderated_by: None,
            },
            fields,
        }
    }

    fn modify(&self, attributes: Attributes) -> Attributes {
        attributes
            .into_iter()
            .map(|(name, value)| {
                let value = match self.modifiers.get(&name) {
                    Some(modifier) => modifier.modify(&value),
                    None => value,
                };
                (name, value)
            })
            .collect::<BTreeMap<String, Value>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DynamicModel;
    use crate::moderation::{
        AttributeEncoder, AttributeRedactor, Base64Encoder, HashRedactor, Principal,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn context() -> ResolvedContext {
        ResolvedContext {
            user: Some(Principal::new("7", "users")),
            url: "console".to_string(),
            ip_address: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_created_fields_have_no_old_side() {
        let post = DynamicModel::new("posts").with("id", 1);
        let modifiers = BTreeMap::new();

        let pending = ModerationRecordBuilder::new(&modifiers).build(
            "created",
            &post,
            Attributes::new(),
            attrs(&[("title", json!("A")), ("body", json!("x"))]),
            context(),
        );

        assert_eq!(pending.moderation.entity_type, "posts");
        assert_eq!(pending.moderation.entity_id.as_deref(), Some("1"));
        assert_eq!(pending.moderation.user_id.as_deref(), Some("7"));
        assert_eq!(pending.moderation.user_type.as_deref(), Some("users"));
        assert_eq!(pending.moderation.status, ModerationStatus::Pending);
        assert_eq!(pending.fields.len(), 2);
        assert!(pending.fields.iter().all(|f| f.old.is_none() && f.new.is_some()));
    }

    #[test]
    fn test_updated_null_old_value_is_kept() {
        let post = DynamicModel::new("posts").with("id", 1);
        let modifiers = BTreeMap::new();

        let pending = ModerationRecordBuilder::new(&modifiers).build(
            "updated",
            &post,
            attrs(&[("subtitle", Value::Null)]),
            attrs(&[("subtitle", json!("s"))]),
            context(),
        );

        assert_eq!(pending.fields[0].old, Some(Value::Null));
        assert_eq!(pending.fields[0].new, Some(json!("s")));
    }

    #[test]
    fn test_modifiers_apply_to_both_sides() {
        let post = DynamicModel::new("posts").with("id", 1);
        let modifiers = BTreeMap::from([
            ("email".to_string(), AttributeModifier::redactor(HashRedactor)),
            ("phone".to_string(), AttributeModifier::encoder(Base64Encoder)),
        ]);

        let pending = ModerationRecordBuilder::new(&modifiers).build(
            "updated",
            &post,
            attrs(&[("email", json!("a@b.c")), ("phone", json!("123"))]),
            attrs(&[("email", json!("d@e.f")), ("phone", json!("456"))]),
            context(),
        );
        let email = &pending.fields[0];
        let phone = &pending.fields[1];

        assert_eq!(email.old, Some(HashRedactor.redact(&json!("a@b.c"))));
        assert_ne!(email.old, email.new);
        assert_eq!(phone.new, Some(Base64Encoder.encode(&json!("456"))));
    }

    #[test]
    fn test_empty_sides_build_no_fields() {
        let post = DynamicModel::new("posts");
        let modifiers = BTreeMap::new();

        let pending = ModerationRecordBuilder::new(&modifiers).build(
            "retrieved",
            &post,
            Attributes::new(),
            Attributes::new(),
            ResolvedContext::default(),
        );

        assert!(pending.is_empty());
        assert_eq!(pending.moderation.entity_id, None);
        assert_eq!(pending.moderation.user_id, None);
    }
}
