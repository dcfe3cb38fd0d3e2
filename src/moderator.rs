//! Moderator - turns entity events into stored moderations
//!
//! `execute` runs the whole pipeline for one entity event, sequentially:
//! readiness, driver resolution, the vetoable `Moderating` event, record
//! building, persist, prune and the `Moderated` event.

use crate::config::ModerationConfig;
use crate::context::RequestContext;
use crate::drivers::{DatabaseDriver, DriverRegistry, ModerationDriver};
use crate::error::{configuration_error, ModerationResult};
use crate::moderation::{
    matcher, transition, AttributeFilter, AttributeModifier, EventAttributeExtractor,
    EventDispatcher, IpAddressResolver, Moderatable, Moderated, Moderating, Moderation,
    ModerationListener, ModerationProfile, ModerationRecordBuilder, ModifierRegistry,
    PendingModeration, ResolverRegistry, Resolvers, UrlResolver, UserAgentResolver, UserResolver,
};
use deadpool_postgres::Pool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Moderator construction: registries and listeners
pub struct ModeratorBuilder {
    config: ModerationConfig,
    drivers: DriverRegistry,
    resolvers: ResolverRegistry,
    modifiers: ModifierRegistry,
    dispatcher: EventDispatcher,
}

impl ModeratorBuilder {
    /// Register a named driver
    pub fn driver<F>(mut self, name: &str, factory: F) -> ModerationResult<Self>
    where
        F: Fn() -> Arc<dyn ModerationDriver> + Send + Sync + 'static,
    {
        self.drivers.register(name, factory)?;
        Ok(self)
    }

    /// Register the `database` table driver on `pool`
    pub fn database(self, pool: Pool) -> ModerationResult<Self> {
        let driver = DatabaseDriver::new(pool, &self.config);
        self.driver("database", move || Arc::new(driver.clone()))
    }

    pub fn user_resolver(mut self, name: &str, resolver: impl UserResolver + 'static) -> Self {
        self.resolvers.register_user(name, resolver);
        self
    }

    pub fn ip_address_resolver(
        mut self,
        name: &str,
        resolver: impl IpAddressResolver + 'static,
    ) -> Self {
        self.resolvers.register_ip_address(name, resolver);
        self
    }

    pub fn user_agent_resolver(
        mut self,
        name: &str,
        resolver: impl UserAgentResolver + 'static,
    ) -> Self {
        self.resolvers.register_user_agent(name, resolver);
        self
    }

    pub fn url_resolver(mut self, name: &str, resolver: impl UrlResolver + 'static) -> Self {
        self.resolvers.register_url(name, resolver);
        self
    }

    /// Make a modifier available to `models.<type>.modifiers` by name
    pub fn modifier(mut self, name: &str, modifier: AttributeModifier) -> Self {
        self.modifiers.register(name, modifier);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ModerationListener>) -> Self {
        self.dispatcher.listen(listener);
        self
    }

    /// Select the configured resolvers and finish
    pub fn build(self) -> ModerationResult<Moderator> {
        let resolvers = self.resolvers.select(&self.config.resolvers)?;

        if !self.drivers.contains(&self.config.driver) {
            warn!(
                "Default driver [{}] is not registered, entities must name their own driver",
                self.config.driver
            );
        }

        Ok(Moderator {
            config: self.config,
            drivers: self.drivers,
            resolved: RwLock::new(HashMap::new()),
            resolvers,
            modifiers: self.modifiers,
            dispatcher: self.dispatcher,
            disabled: RwLock::new(HashSet::new()),
        })
    }
}

pub struct Moderator {
    config: ModerationConfig,
    drivers: DriverRegistry,
    /// Driver instances by name, built once
    resolved: RwLock<HashMap<String, Arc<dyn ModerationDriver>>>,
    resolvers: Resolvers,
    modifiers: ModifierRegistry,
    dispatcher: EventDispatcher,
    /// Entity types with moderation switched off
    disabled: RwLock<HashSet<String>>,
}

impl Moderator {
    pub fn builder(config: ModerationConfig) -> ModeratorBuilder {
        let resolvers = ResolverRegistry::with_defaults(&config);
        ModeratorBuilder {
            config,
            drivers: DriverRegistry::new(),
            resolvers,
            modifiers: ModifierRegistry::default(),
            dispatcher: EventDispatcher::new(),
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Effective settings for an entity
    pub fn profile(&self, entity: &dyn Moderatable) -> ModerationProfile {
        ModerationProfile::resolve(&self.config, entity)
    }

    pub async fn disable_for(&self, entity_type: &str) {
        self.disabled.write().await.insert(entity_type.to_string());
        debug!("Moderation disabled for {}", entity_type);
    }

    pub async fn enable_for(&self, entity_type: &str) {
        self.disabled.write().await.remove(entity_type);
        debug!("Moderation enabled for {}", entity_type);
    }

    pub async fn is_enabled_for(&self, entity_type: &str) -> bool {
        !self.disabled.read().await.contains(entity_type)
    }

    /// Enabled globally and for the type, with a moderatable pending event.
    /// Outside a request the `console` setting decides.
    pub async fn is_ready(&self, entity: &dyn Moderatable, profile: &ModerationProfile) -> bool {
        if !self.config.enabled || !profile.enabled {
            return false;
        }
        if !self.config.console && !RequestContext::is_active() {
            return false;
        }
        if !self.is_enabled_for(entity.morph_class()).await {
            return false;
        }

        entity
            .moderation_event()
            .is_some_and(|event| matcher::resolve_getter(&profile.events, event).is_some())
    }

    /// Driver instance for `name`, created on first use
    pub async fn driver_for(&self, name: &str) -> ModerationResult<Arc<dyn ModerationDriver>> {
        if let Some(driver) = self.resolved.read().await.get(name) {
            return Ok(driver.clone());
        }

        let mut resolved = self.resolved.write().await;
        if let Some(driver) = resolved.get(name) {
            return Ok(driver.clone());
        }

        let driver = self.drivers.create(name)?;
        debug!("Resolved moderation driver [{}]", name);
        resolved.insert(name.to_string(), driver.clone());
        Ok(driver)
    }

    /// Build the moderation for the entity's pending event, without storing it
    pub fn to_moderate(
        &self,
        entity: &dyn Moderatable,
        profile: &ModerationProfile,
    ) -> ModerationResult<PendingModeration> {
        let event = entity
            .moderation_event()
            .ok_or_else(|| configuration_error("A valid moderation event has not been set"))?;

        let filter = AttributeFilter::new(entity, profile);
        let (old, new) = EventAttributeExtractor::new(profile, &filter).extract(entity)?;
        let modifiers = profile.modifiers(&self.modifiers)?;

        Ok(ModerationRecordBuilder::new(&modifiers).build(
            event,
            entity,
            old,
            new,
            self.resolvers.resolve(),
        ))
    }

    /// Record the entity's pending event; `None` when nothing was stored
    pub async fn execute(&self, entity: &dyn Moderatable) -> ModerationResult<Option<Moderation>> {
        let profile = self.profile(entity);
        if !self.is_ready(entity, &profile).await {
            debug!(
                "{} not ready for moderating ({:?})",
                entity.entity_ref(),
                entity.moderation_event()
            );
            return Ok(None);
        }

        let driver = self.driver_for(&profile.driver).await?;

        let proceed = self.dispatcher.moderating(&Moderating {
            entity,
            driver: driver.as_ref(),
        });
        if !proceed {
            return Ok(None);
        }

        let pending = self.to_moderate(entity, &profile)?;
        let target = pending.target();
        let moderation = driver.persist(pending).await?;

        if moderation.is_some() {
            driver.prune(&target, profile.threshold).await?;
        }

        self.dispatcher.moderated(&Moderated {
            entity,
            driver: driver.as_ref(),
            moderation: moderation.as_ref(),
        });

        Ok(moderation)
    }

    /// Apply one side of `moderation` onto the entity using every configured modifier
    pub fn transition(
        &self,
        entity: &mut dyn Moderatable,
        moderation: &Moderation,
        old: bool,
    ) -> ModerationResult<()> {
        let modifiers = self.profile(entity).modifiers(&self.modifiers)?;
        transition::apply(entity, moderation, &modifiers, old)
    }

    /// Stored moderations of the entity, newest first
    pub async fn history(&self, entity: &dyn Moderatable) -> ModerationResult<Vec<Moderation>> {
        let driver = self.driver_for(&self.profile(entity).driver).await?;
        driver.history(&entity.entity_ref()).await
    }

    /// Moderations of the entity still awaiting a decision, newest first
    pub async fn pending(&self, entity: &dyn Moderatable) -> ModerationResult<Vec<Moderation>> {
        let mut history = self.history(entity).await?;
        history.retain(Moderation::is_pending);
        Ok(history)
    }

    /// Whether the entity is "on moderation"
    pub async fn has_pending(&self, entity: &dyn Moderatable) -> ModerationResult<bool> {
        Ok(!self.pending(entity).await?.is_empty())
    }
}
