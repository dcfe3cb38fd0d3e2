//! In-memory driver
//!
//! Process-local store for batch jobs and tests.

use super::ModerationDriver;
use crate::error::ModerationResult;
use crate::moderation::{EntityRef, Moderation, PendingModeration};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Thread-safe moderation store, oldest first
#[derive(Clone, Default)]
pub struct MemoryDriver {
    moderations: Arc<RwLock<Vec<Moderation>>>,
    keep_empty: bool,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store moderations without fields too (context-only `retrieved` records)
    pub fn keeping_empty() -> Self {
        Self {
            keep_empty: true,
            ..Self::default()
        }
    }

    pub async fn len(&self) -> usize {
        self.moderations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.moderations.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<Moderation> {
        self.moderations.read().await.clone()
    }
}

fn belongs_to(moderation: &Moderation, target: &EntityRef) -> bool {
    target.entity_id.is_some()
        && moderation.entity_type == target.entity_type
        && moderation.entity_id == target.entity_id
}

#[async_trait]
impl ModerationDriver for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    async fn persist(&self, pending: PendingModeration) -> ModerationResult<Option<Moderation>> {
        if pending.is_empty() && !self.keeps_empty_moderations() {
            debug!("Skipping moderation of {} without fields", pending.target());
            return Ok(None);
        }

        let moderation = Moderation::from_pending(pending, Utc::now());
        self.moderations.write().await.push(moderation.clone());

        info!(
            "Stored {} moderation {} for {}",
            moderation.event,
            moderation.id,
            moderation.target()
        );
        Ok(Some(moderation))
    }

    async fn prune(&self, target: &EntityRef, threshold: usize) -> ModerationResult<u64> {
        if threshold == 0 {
            return Ok(0);
        }

        let mut moderations = self.moderations.write().await;
        let stale: HashSet<Uuid> = moderations
            .iter()
            .rev()
            .filter(|m| belongs_to(m, target))
            .skip(threshold)
            .map(|m| m.id)
            .collect();

        moderations.retain(|m| !stale.contains(&m.id));

        if !stale.is_empty() {
            info!("Pruned {} moderations of {}", stale.len(), target);
        }
        Ok(stale.len() as u64)
    }

    async fn history(&self, target: &EntityRef) -> ModerationResult<Vec<Moderation>> {
        let moderations = self.moderations.read().await;
        Ok(moderations
            .iter()
            .rev()
            .filter(|m| belongs_to(m, target))
            .cloned()
            .collect())
    }

    async fn find(&self, id: Uuid) -> ModerationResult<Option<Moderation>> {
        let moderations = self.moderations.read().await;
        Ok(moderations.iter().find(|m| m.id == id).cloned())
    }

    fn keeps_empty_moderations(&self) -> bool {
        self.keep_empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::{ModerationStatus, NewModeration, NewModerationField};
    use serde_json::json;

    fn pending(entity_id: &str, title: &str) -> PendingModeration {
        PendingModeration {
            moderation: NewModeration {
                user_id: None,
                user_type: None,
                entity_type: "posts".to_string(),
                entity_id: Some(entity_id.to_string()),
                event: "updated".to_string(),
                status: ModerationStatus::Pending,
                url: "console".to_string(),
                ip_address: None,
                user_agent: None,
                moderated_by: None,
            },
            fields: vec![NewModerationField {
                name: "title".to_string(),
                old: None,
                new: Some(json!(title)),
                status: ModerationStatus::Pending,
            }],
        }
    }

    fn post(id: &str) -> EntityRef {
        EntityRef::new("posts", Some(id.to_string()))
    }

    #[test]
    fn test_empty_moderation_is_not_stored() {
        let driver = MemoryDriver::new();
        let mut empty = pending("1", "A");
        empty.fields.clear();

        let stored = tokio_test::block_on(driver.persist(empty.clone())).unwrap();
        assert!(stored.is_none());
        assert!(tokio_test::block_on(driver.is_empty()));

        let keeping = MemoryDriver::keeping_empty();
        let stored = tokio_test::block_on(keeping.persist(empty)).unwrap();
        assert!(stored.unwrap().fields.is_empty());
    }

    #[tokio::test]
    async fn test_prune_keeps_newest() {
        let driver = MemoryDriver::new();
        for i in 0..5 {
            driver.persist(pending("1", &format!("v{}", i))).await.unwrap();
        }
        driver.persist(pending("2", "other")).await.unwrap();

        assert_eq!(driver.prune(&post("1"), 2).await.unwrap(), 3);

        let history = driver.history(&post("1")).await.unwrap();
        let titles: Vec<_> = history
            .iter()
            .map(|m| m.fields[0].new.clone().unwrap())
            .collect();
        assert_eq!(titles, vec![json!("v4"), json!("v3")]);
        assert_eq!(driver.history(&post("2")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_threshold_never_prunes() {
        let driver = MemoryDriver::new();
        for _ in 0..4 {
            driver.persist(pending("1", "A")).await.unwrap();
        }

        assert_eq!(driver.prune(&post("1"), 0).await.unwrap(), 0);
        assert_eq!(driver.len().await, 4);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let driver = MemoryDriver::new();
        let stored = driver.persist(pending("1", "A")).await.unwrap().unwrap();

        assert_eq!(driver.find(stored.id).await.unwrap(), Some(stored));
        assert_eq!(driver.find(Uuid::new_v4()).await.unwrap(), None);
    }
}
