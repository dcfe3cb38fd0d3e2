//! Lifecycle observer
//!
//! The callback a persistence layer invokes on entity lifecycle
//! notifications. Restores fire an `updated` notification of their own; the
//! per-operation [`LifecycleScope`] suppresses it.

use crate::error::ModerationResult;
use crate::moderation::{Moderatable, Moderation};
use crate::moderator::Moderator;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Retrieved,
    Created,
    Updated,
    Deleted,
    Restoring,
    Restored,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Retrieved => "retrieved",
            LifecycleEvent::Created => "created",
            LifecycleEvent::Updated => "updated",
            LifecycleEvent::Deleted => "deleted",
            LifecycleEvent::Restoring => "restoring",
            LifecycleEvent::Restored => "restored",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one in-flight entity operation
#[derive(Debug, Default)]
pub struct LifecycleScope {
    restoring: bool,
}

impl LifecycleScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }
}

#[derive(Clone)]
pub struct ModeratableObserver {
    moderator: Arc<Moderator>,
}

impl ModeratableObserver {
    pub fn new(moderator: Arc<Moderator>) -> Self {
        Self { moderator }
    }

    pub async fn handle(
        &self,
        event: LifecycleEvent,
        entity: &mut dyn Moderatable,
        scope: &mut LifecycleScope,
    ) -> ModerationResult<Option<Moderation>> {
        match event {
            LifecycleEvent::Restoring => {
                scope.restoring = true;
                Ok(None)
            }
            LifecycleEvent::Updated if scope.restoring => {
                debug!("Ignoring update of {} while restoring", entity.entity_ref());
                Ok(None)
            }
            LifecycleEvent::Restored => {
                let result = self.moderate(entity, event).await;
                scope.restoring = false;
                result
            }
            _ => self.moderate(entity, event).await,
        }
    }

    pub async fn retrieved(&self, entity: &mut dyn Moderatable) -> ModerationResult<Option<Moderation>> {
        self.handle(LifecycleEvent::Retrieved, entity, &mut LifecycleScope::new())
            .await
    }

    pub async fn created(&self, entity: &mut dyn Moderatable) -> ModerationResult<Option<Moderation>> {
        self.handle(LifecycleEvent::Created, entity, &mut LifecycleScope::new())
            .await
    }

    pub async fn updated(&self, entity: &mut dyn Moderatable) -> ModerationResult<Option<Moderation>> {
        self.handle(LifecycleEvent::Updated, entity, &mut LifecycleScope::new())
            .await
    }

    pub async fn deleted(&self, entity: &mut dyn Moderatable) -> ModerationResult<Option<Moderation>> {
        self.handle(LifecycleEvent::Deleted, entity, &mut LifecycleScope::new())
            .await
    }

    async fn moderate(
        &self,
        entity: &mut dyn Moderatable,
        event: LifecycleEvent,
    ) -> ModerationResult<Option<Moderation>> {
        entity.set_moderation_event(event.as_str());
        self.moderator.execute(entity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModerationConfig;
    use crate::model::{DynamicModel, Model};
    use serde_json::json;

    fn observer() -> ModeratableObserver {
        let moderator = Moderator::builder(ModerationConfig {
            driver: "memory".to_string(),
            console: true,
            ..ModerationConfig::default()
        })
        .build()
        .unwrap();
        ModeratableObserver::new(Arc::new(moderator))
    }

    fn post() -> DynamicModel {
        DynamicModel::new("posts")
            .with("id", 1)
            .with("title", "A")
            .with_soft_deletes()
    }

    #[tokio::test]
    async fn test_created_and_updated_are_recorded() {
        let observer = observer();
        let mut post = post();

        let created = observer.created(&mut post).await.unwrap().unwrap();
        assert_eq!(created.event, "created");
        post.sync_original();

        post.set_attribute("title", json!("B"));
        let updated = observer.updated(&mut post).await.unwrap().unwrap();
        assert_eq!(updated.event, "updated");
        assert_eq!(post.moderation_event(), Some("updated"));
    }

    #[tokio::test]
    async fn test_restore_suppresses_its_update() {
        let observer = observer();
        let mut post = post().with("deleted_at", "2024-01-01").synced();
        let mut scope = LifecycleScope::new();

        observer
            .handle(LifecycleEvent::Restoring, &mut post, &mut scope)
            .await
            .unwrap();
        assert!(scope.is_restoring());

        post.set_attribute("deleted_at", json!(null));
        let update = observer
            .handle(LifecycleEvent::Updated, &mut post, &mut scope)
            .await
            .unwrap();
        assert_eq!(update, None);

        let restored = observer
            .handle(LifecycleEvent::Restored, &mut post, &mut scope)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restored.event, "restored");
        assert!(restored.fields.iter().all(|f| f.old.is_none()));
        assert!(!scope.is_restoring());
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let observer = observer();
        let mut restoring = LifecycleScope::new();
        let mut other = LifecycleScope::new();
        let mut first = post().synced();
        let mut second = DynamicModel::new("posts").with("id", 2).with("title", "X").synced();

        observer
            .handle(LifecycleEvent::Restoring, &mut first, &mut restoring)
            .await
            .unwrap();

        second.set_attribute("title", json!("Y"));
        let update = observer
            .handle(LifecycleEvent::Updated, &mut second, &mut other)
            .await
            .unwrap();
        assert!(update.is_some());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(LifecycleEvent::Restoring.to_string(), "restoring");
        assert_eq!(LifecycleEvent::Deleted.as_str(), "deleted");
    }
}
