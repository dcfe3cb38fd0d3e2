//! Event attribute extraction
//!
//! Produces the `(old, new)` attribute maps for the entity's current event.

use super::{matcher, AttributeFilter, Moderatable, ModerationProfile};
use crate::error::{configuration_error, ModerationResult};
use crate::model::Attributes;
use serde_json::Value;
use tracing::debug;

pub const RETRIEVED_GETTER: &str = "getRetrievedEventAttributes";
pub const CREATED_GETTER: &str = "getCreatedEventAttributes";
pub const UPDATED_GETTER: &str = "getUpdatedEventAttributes";
pub const DELETED_GETTER: &str = "getDeletedEventAttributes";
pub const RESTORED_GETTER: &str = "getRestoredEventAttributes";

pub struct EventAttributeExtractor<'a> {
    profile: &'a ModerationProfile,
    filter: &'a AttributeFilter,
}

impl<'a> EventAttributeExtractor<'a> {
    pub fn new(profile: &'a ModerationProfile, filter: &'a AttributeFilter) -> Self {
        Self { profile, filter }
    }

    /// `(old, new)` for the entity's pending event
    pub fn extract(&self, entity: &dyn Moderatable) -> ModerationResult<(Attributes, Attributes)> {
        let event = entity
            .moderation_event()
            .ok_or_else(|| configuration_error("A valid moderation event has not been set"))?;

        let getter = matcher::resolve_getter(&self.profile.events, event).ok_or_else(|| {
            configuration_error(format!("Event \"{}\" is not moderatable", event))
        })?;
        debug!("Extracting \"{}\" attributes via {}", event, getter);

        match getter.as_str() {
            RETRIEVED_GETTER => Ok((Attributes::new(), Attributes::new())),
            CREATED_GETTER => Ok(self.created(entity)),
            UPDATED_GETTER => Ok(self.updated(entity)),
            DELETED_GETTER => Ok(self.deleted(entity)),
            RESTORED_GETTER => Ok(self.restored(entity)),
            custom => {
                let (old, new) = entity.custom_event_attributes(custom).ok_or_else(|| {
                    configuration_error(format!(
                        "Unable to handle \"{}\" event, {}() method missing",
                        event, custom
                    ))
                })?;
                Ok((self.retain_eligible(old), self.retain_eligible(new)))
            }
        }
    }

    pub fn created(&self, entity: &dyn Moderatable) -> (Attributes, Attributes) {
        (Attributes::new(), self.eligible_attributes(entity))
    }

    /// Dirty attributes only; a missing original value is recorded as null
    pub fn updated(&self, entity: &dyn Moderatable) -> (Attributes, Attributes) {
        let mut old = Attributes::new();
        let mut new = Attributes::new();

        for (name, value) in entity.dirty() {
            if !self.filter.is_eligible(&name) {
                continue;
            }
            old.insert(
                name.clone(),
                entity.original().get(&name).cloned().unwrap_or(Value::Null),
            );
            new.insert(name, value);
        }

        (old, new)
    }

    pub fn deleted(&self, entity: &dyn Moderatable) -> (Attributes, Attributes) {
        (self.eligible_attributes(entity), Attributes::new())
    }

    pub fn restored(&self, entity: &dyn Moderatable) -> (Attributes, Attributes) {
        (Attributes::new(), self.eligible_attributes(entity))
    }

    fn eligible_attributes(&self, entity: &dyn Moderatable) -> Attributes {
        self.retain_eligible(entity.attributes().clone())
    }

    fn retain_eligible(&self, mut attributes: Attributes) -> Attributes {
        attributes.retain(|name, _| self.filter.is_eligible(name));
        attributes
    }
}
