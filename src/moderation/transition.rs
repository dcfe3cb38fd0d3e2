//! Applying a stored moderation back onto its entity

use super::{AttributeModifier, Moderation};
use crate::error::{transition_error, ModerationError, ModerationResult};
use crate::model::Model;
use std::collections::BTreeMap;
use tracing::debug;

/// Write the `old` (or `new`) side of every field onto the entity without persisting.
///
/// Fails without touching the entity when the moderation belongs to another
/// entity, when a redactor is configured, or when a field names an attribute
/// the entity does not have.
pub fn apply<M: Model + ?Sized>(
    entity: &mut M,
    moderation: &Moderation,
    modifiers: &BTreeMap<String, AttributeModifier>,
    old: bool,
) -> ModerationResult<()> {
    if moderation.entity_type != entity.morph_class() {
        return Err(transition_error(format!(
            "Expected Moderatable type {}, got {} instead",
            entity.morph_class(),
            moderation.entity_type
        )));
    }

    let key = entity.key();
    if moderation.entity_id != key {
        return Err(transition_error(format!(
            "Expected Moderatable id {}, got {} instead",
            key.as_deref().unwrap_or("(none)"),
            moderation.entity_id.as_deref().unwrap_or("(none)")
        )));
    }

    if modifiers.values().any(AttributeModifier::is_redactor) {
        return Err(transition_error(
            "Cannot transition states when an AttributeRedactor is set",
        ));
    }

    let incompatibilities: Vec<String> = moderation
        .fields
        .iter()
        .filter(|field| !entity.attributes().contains_key(&field.name))
        .map(|field| field.name.clone())
        .collect();

    if !incompatibilities.is_empty() {
        return Err(ModerationError::Transition {
            message: format!(
                "Incompatibility between {} and moderation {}",
                moderation.target(),
                moderation.id
            ),
            incompatibilities,
        });
    }

    for field in &moderation.fields {
        let side = if old { &field.old } else { &field.new };
        let Some(value) = side else {
            continue;
        };

        let value = match modifiers.get(&field.name) {
            Some(AttributeModifier::Encoder(encoder)) => encoder.decode(value),
            _ => value.clone(),
        };
        entity.set_attribute(&field.name, value);
    }

    debug!(
        "Transitioned {} to the {} state of moderation {}",
        moderation.target(),
        if old { "old" } else { "new" },
        moderation.id
    );
    Ok(())
}
