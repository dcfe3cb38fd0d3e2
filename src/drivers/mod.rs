//! Moderation drivers
//!
//! A driver stores built moderations atomically and prunes an entity's
//! history down to its retention threshold. Drivers are looked up by name in
//! a [`DriverRegistry`] populated at startup.

mod database;
mod memory;

pub use database::DatabaseDriver;
pub use memory::MemoryDriver;

use crate::error::{configuration_error, ModerationResult};
use crate::moderation::{EntityRef, Moderation, PendingModeration};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait ModerationDriver: Send + Sync {
    fn name(&self) -> &str;

    /// Store the moderation and its fields atomically.
    ///
    /// Returns `None` without writing when there are no fields, unless
    /// [`keeps_empty_moderations`](Self::keeps_empty_moderations) is true.
    async fn persist(&self, pending: PendingModeration) -> ModerationResult<Option<Moderation>>;

    /// Delete all but the newest `threshold` moderations of `target`; 0 keeps everything
    async fn prune(&self, target: &EntityRef, threshold: usize) -> ModerationResult<u64>;

    /// Moderations of `target`, newest first
    async fn history(&self, target: &EntityRef) -> ModerationResult<Vec<Moderation>>;

    async fn find(&self, id: Uuid) -> ModerationResult<Option<Moderation>>;

    /// Whether moderations without field deltas are stored
    fn keeps_empty_moderations(&self) -> bool {
        false
    }
}

/// Builds a driver instance on first use
pub type DriverFactory = Arc<dyn Fn() -> Arc<dyn ModerationDriver> + Send + Sync>;

/// Driver name -> factory
#[derive(Clone)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl Default for DriverRegistry {
    /// Registry with the `memory` driver
    fn default() -> Self {
        let mut factories: HashMap<String, DriverFactory> = HashMap::new();
        factories.insert(
            "memory".to_string(),
            Arc::new(|| Arc::new(MemoryDriver::new()) as Arc<dyn ModerationDriver>),
        );
        Self { factories }
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; names must be unique identifiers
    pub fn register<F>(&mut self, name: &str, factory: F) -> ModerationResult<()>
    where
        F: Fn() -> Arc<dyn ModerationDriver> + Send + Sync + 'static,
    {
        if name.trim().is_empty() {
            return Err(configuration_error("Driver name cannot be empty"));
        }
        if self.factories.contains_key(name) {
            return Err(configuration_error(format!(
                "Driver [{}] is already registered",
                name
            )));
        }

        self.factories.insert(name.to_string(), Arc::new(factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a fresh driver instance
    pub fn create(&self, name: &str) -> ModerationResult<Arc<dyn ModerationDriver>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| configuration_error(format!("Driver [{}] not supported", name)))
    }
}
