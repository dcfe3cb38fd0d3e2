//! Attribute eligibility
//!
//! Decides which attributes of an entity may appear in a moderation.

use super::ModerationProfile;
use crate::model::Model;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct AttributeFilter {
    include: Vec<String>,
    exclusions: BTreeSet<String>,
}

impl AttributeFilter {
    pub fn new<M: Model + ?Sized>(entity: &M, profile: &ModerationProfile) -> Self {
        Self {
            include: profile.include.clone(),
            exclusions: Self::resolve_exclusions(entity, profile),
        }
    }

    /// Explicit excludes, strict-mode hidden/non-visible attributes, timestamp
    /// columns unless enabled, and every non-scalar attribute
    pub fn resolve_exclusions<M: Model + ?Sized>(
        entity: &M,
        profile: &ModerationProfile,
    ) -> BTreeSet<String> {
        let mut excluded: BTreeSet<String> = profile.exclude.iter().cloned().collect();

        if profile.strict {
            excluded.extend(entity.hidden().iter().cloned());

            let visible = entity.visible();
            if !visible.is_empty() {
                excluded.extend(
                    entity
                        .attributes()
                        .keys()
                        .filter(|name| !visible.contains(*name))
                        .cloned(),
                );
            }
        }

        if !profile.timestamps {
            excluded.insert(entity.created_at_column().to_string());
            excluded.insert(entity.updated_at_column().to_string());

            if let Some(column) = entity.deleted_at_column() {
                excluded.insert(column.to_string());
            }
        }

        excluded.extend(
            entity
                .attributes()
                .iter()
                .filter(|(_, value)| !is_scalar(value))
                .map(|(name, _)| name.clone()),
        );

        excluded
    }

    pub fn is_eligible(&self, attribute: &str) -> bool {
        if self.exclusions.contains(attribute) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|name| name == attribute)
    }

    pub fn exclusions(&self) -> &BTreeSet<String> {
        &self.exclusions
    }
}

/// Null, booleans, numbers and strings are scalar
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
