//! Effective moderation settings for one entity
//!
//! Entity options win over `models.<type>` overrides, which win over the
//! global configuration.

use super::{AttributeModifier, EventMatcher, Moderatable, ModifierRegistry};
use crate::config::ModerationConfig;
use crate::error::ModerationResult;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ModerationProfile {
    pub enabled: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub events: Vec<EventMatcher>,
    pub strict: bool,
    pub timestamps: bool,
    pub threshold: usize,
    pub driver: String,
    /// Attribute -> modifier name, resolved lazily through the registry
    modifier_names: BTreeMap<String, String>,
    /// Attribute -> modifier supplied by the entity itself
    entity_modifiers: BTreeMap<String, AttributeModifier>,
}

impl ModerationProfile {
    pub fn resolve(config: &ModerationConfig, entity: &dyn Moderatable) -> Self {
        let options = entity.moderation().options();
        let overrides = config.overrides_for(entity.morph_class());

        macro_rules! layered {
            ($field:ident, $global:expr) => {
                options
                    .$field
                    .clone()
                    .or_else(|| overrides.and_then(|o| o.$field.clone()))
                    .unwrap_or_else(|| $global)
            };
        }

        Self {
            enabled: overrides.and_then(|o| o.enabled).unwrap_or(true),
            include: layered!(include, Vec::new()),
            exclude: layered!(exclude, Vec::new()),
            events: layered!(events, config.events.clone()),
            strict: layered!(strict, config.strict),
            timestamps: layered!(timestamps, config.timestamps),
            threshold: layered!(threshold, config.threshold),
            driver: layered!(driver, config.driver.clone()),
            modifier_names: overrides.map(|o| o.modifiers.clone()).unwrap_or_default(),
            entity_modifiers: options.modifiers.clone(),
        }
    }

    /// Attribute modifiers, entity supplied ones taking precedence over configured names
    pub fn modifiers(
        &self,
        registry: &ModifierRegistry,
    ) -> ModerationResult<BTreeMap<String, AttributeModifier>> {
        let mut modifiers = BTreeMap::new();
        for (attribute, name) in &self.modifier_names {
            modifiers.insert(attribute.clone(), registry.resolve(name)?);
        }
        modifiers.extend(
            self.entity_modifiers
                .iter()
                .map(|(attribute, modifier)| (attribute.clone(), modifier.clone())),
        );
        Ok(modifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelOverrides;
    use crate::model::DynamicModel;
    use crate::moderation::{LeftRedactor, ModerationOptions};

    fn config_with_post_overrides() -> ModerationConfig {
        let mut config = ModerationConfig {
            threshold: 10,
            strict: true,
            ..ModerationConfig::default()
        };
        config.models.insert(
            "posts".to_string(),
            ModelOverrides {
                threshold: Some(3),
                exclude: Some(vec!["secret".to_string()]),
                modifiers: BTreeMap::from([
                    ("email".to_string(), "hash".to_string()),
                    ("phone".to_string(), "base64".to_string()),
                ]),
                ..ModelOverrides::default()
            },
        );
        config
    }

    #[test]
    fn test_global_values_apply_without_overrides() {
        let config = config_with_post_overrides();
        let profile = ModerationProfile::resolve(&config, &DynamicModel::new("comments"));

        assert!(profile.enabled);
        assert_eq!(profile.threshold, 10);
        assert!(profile.strict);
        assert!(profile.exclude.is_empty());
        assert_eq!(profile.driver, "database");
        assert!(profile.modifiers(&ModifierRegistry::default()).unwrap().is_empty());
    }

    #[test]
    fn test_entity_options_beat_type_overrides() {
        let config = config_with_post_overrides();
        let post = DynamicModel::new("posts").with_options(
            ModerationOptions::new()
                .threshold(1)
                .driver("memory")
                .redact("phone", LeftRedactor),
        );
        let profile = ModerationProfile::resolve(&config, &post);

        assert_eq!(profile.threshold, 1);
        assert_eq!(profile.exclude, vec!["secret"]);
        assert_eq!(profile.driver, "memory");

        let modifiers = profile.modifiers(&ModifierRegistry::default()).unwrap();
        assert_eq!(modifiers["email"].name(), "hash");
        assert_eq!(modifiers["phone"].name(), "left");
    }

    #[test]
    fn test_unknown_modifier_name_is_configuration_error() {
        let mut config = ModerationConfig::default();
        config.models.insert(
            "posts".to_string(),
            ModelOverrides {
                modifiers: BTreeMap::from([("email".to_string(), "Nope".to_string())]),
                ..ModelOverrides::default()
            },
        );
        let profile = ModerationProfile::resolve(&config, &DynamicModel::new("posts"));

        let err = profile.modifiers(&ModifierRegistry::default()).unwrap_err();
        assert!(err.is_configuration());
    }
}
