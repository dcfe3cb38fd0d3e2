//! Moderatable entity capability
//!
//! Entities opt into moderation by implementing [`Moderatable`]; per entity
//! options layer on top of the global and per-type configuration.

use super::{matcher::EventMatcher, modifiers::AttributeModifier, models::EntityRef};
use super::{AttributeEncoder, AttributeRedactor, Moderation};
use crate::error::ModerationResult;
use crate::model::{Attributes, Model};
use crate::moderator::Moderator;
use std::collections::BTreeMap;

/// Entity level moderation options; `None` falls back to configuration
#[derive(Debug, Clone, Default)]
pub struct ModerationOptions {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub events: Option<Vec<EventMatcher>>,
    pub strict: Option<bool>,
    pub timestamps: Option<bool>,
    pub threshold: Option<usize>,
    pub driver: Option<String>,
    pub modifiers: BTreeMap<String, AttributeModifier>,
}

impl ModerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn events<I, E>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EventMatcher>,
    {
        self.events = Some(events.into_iter().map(Into::into).collect());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn driver(mut self, driver: &str) -> Self {
        self.driver = Some(driver.to_string());
        self
    }

    pub fn redact(mut self, attribute: &str, redactor: impl AttributeRedactor + 'static) -> Self {
        self.modifiers
            .insert(attribute.to_string(), AttributeModifier::redactor(redactor));
        self
    }

    pub fn encode(mut self, attribute: &str, encoder: impl AttributeEncoder + 'static) -> Self {
        self.modifiers
            .insert(attribute.to_string(), AttributeModifier::encoder(encoder));
        self
    }
}

/// Per instance moderation state: the pending event plus the entity options
#[derive(Debug, Clone, Default)]
pub struct ModerationState {
    event: Option<String>,
    options: ModerationOptions,
}

impl ModerationState {
    pub fn new(options: ModerationOptions) -> Self {
        Self {
            event: None,
            options,
        }
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn set_event(&mut self, event: &str) {
        self.event = Some(event.to_string());
    }

    pub fn clear_event(&mut self) {
        self.event = None;
    }

    pub fn options(&self) -> &ModerationOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ModerationOptions {
        &mut self.options
    }
}

/// An entity whose changes are recorded as moderations
pub trait Moderatable: Model {
    fn moderation(&self) -> &ModerationState;

    fn moderation_mut(&mut self) -> &mut ModerationState;

    /// Attributes for a custom event getter, `None` when the getter does not exist
    fn custom_event_attributes(&self, _getter: &str) -> Option<(Attributes, Attributes)> {
        None
    }

    fn moderation_event(&self) -> Option<&str> {
        self.moderation().event()
    }

    fn set_moderation_event(&mut self, event: &str) {
        self.moderation_mut().set_event(event);
    }

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.morph_class(), self.key())
    }

    /// Apply one side of a stored moderation onto this entity (not persisted).
    ///
    /// Modifiers are resolved the way `moderator` recorded them, so per-type
    /// redactors block the transition as well.
    fn transition_to(
        &mut self,
        moderator: &Moderator,
        moderation: &Moderation,
        old: bool,
    ) -> ModerationResult<&mut Self>
    where
        Self: Sized,
    {
        moderator.transition(self, moderation, old)?;
        Ok(self)
    }
}
