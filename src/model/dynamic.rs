//! Map-backed moderatable entity
//!
//! For hosts without their own entity types, and for exercising the pipeline.

use super::{key_to_string, Attributes, Model};
use crate::moderation::{Moderatable, ModerationOptions, ModerationState};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// User-defined attribute getter for a custom event
pub type EventGetter = Arc<dyn Fn(&DynamicModel) -> (Attributes, Attributes) + Send + Sync>;

#[derive(Clone)]
pub struct DynamicModel {
    morph_class: String,
    key_name: String,
    attributes: Attributes,
    original: Attributes,
    hidden: Vec<String>,
    visible: Vec<String>,
    soft_deletes: bool,
    getters: BTreeMap<String, EventGetter>,
    moderation: ModerationState,
}

impl DynamicModel {
    pub fn new(morph_class: impl Into<String>) -> Self {
        Self {
            morph_class: morph_class.into(),
            key_name: "id".to_string(),
            attributes: Attributes::new(),
            original: Attributes::new(),
            hidden: Vec::new(),
            visible: Vec::new(),
            soft_deletes: false,
            getters: BTreeMap::new(),
            moderation: ModerationState::default(),
        }
    }

    /// Set an attribute, builder style
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_key_name(mut self, key_name: &str) -> Self {
        self.key_name = key_name.to_string();
        self
    }

    pub fn with_hidden<I, S>(mut self, hidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden = hidden.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_visible<I, S>(mut self, visible: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible = visible.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_soft_deletes(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    pub fn with_options(mut self, options: ModerationOptions) -> Self {
        self.moderation = ModerationState::new(options);
        self
    }

    /// Register the attribute getter a custom event resolves to
    pub fn with_event_getter<F>(mut self, getter: &str, f: F) -> Self
    where
        F: Fn(&DynamicModel) -> (Attributes, Attributes) + Send + Sync + 'static,
    {
        self.getters.insert(getter.to_string(), Arc::new(f));
        self
    }

    /// Mark the current attributes as persisted (after insert/update/load)
    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Same model with the current attributes marked persisted
    pub fn synced(mut self) -> Self {
        self.sync_original();
        self
    }
}

impl fmt::Debug for DynamicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicModel")
            .field("morph_class", &self.morph_class)
            .field("attributes", &self.attributes)
            .field("original", &self.original)
            .field("event", &self.moderation.event())
            .finish()
    }
}

impl Model for DynamicModel {
    fn morph_class(&self) -> &str {
        &self.morph_class
    }

    fn key(&self) -> Option<String> {
        self.attributes.get(&self.key_name).and_then(key_to_string)
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn original(&self) -> &Attributes {
        &self.original
    }

    fn set_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    fn hidden(&self) -> &[String] {
        &self.hidden
    }

    fn visible(&self) -> &[String] {
        &self.visible
    }

    fn deleted_at_column(&self) -> Option<&str> {
        self.soft_deletes.then_some("deleted_at")
    }
}

impl Moderatable for DynamicModel {
    fn moderation(&self) -> &ModerationState {
        &self.moderation
    }

    fn moderation_mut(&mut self) -> &mut ModerationState {
        &mut self.moderation
    }

    fn custom_event_attributes(&self, getter: &str) -> Option<(Attributes, Attributes)> {
        self.getters.get(getter).map(|f| f(self))
    }
}
