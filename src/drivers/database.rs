//! Relational table driver
//!
//! Stores moderations in PostgreSQL. A moderation and its fields are written
//! in a single transaction.

use super::ModerationDriver;
use crate::config::ModerationConfig;
use crate::db::{queries::Tables, schema};
use crate::error::ModerationResult;
use crate::moderation::{EntityRef, Moderation, ModerationField, ModerationStatus, PendingModeration};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use postgres_types::ToSql;
use std::collections::HashMap;
use tokio_postgres::Row;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct DatabaseDriver {
    pool: Pool,
    tables: Tables,
}

impl DatabaseDriver {
    pub fn new(pool: Pool, config: &ModerationConfig) -> Self {
        Self {
            pool,
            tables: schema::tables(config),
        }
    }

    fn moderation_from_row(&self, row: &Row) -> Moderation {
        let prefix = &self.tables.morph_prefix;
        Moderation {
            id: row.get("id"),
            user_id: row.get(format!("{}_id", prefix).as_str()),
            user_type: row.get(format!("{}_type", prefix).as_str()),
            entity_type: row.get("entity_type"),
            entity_id: row.get("entity_id"),
            event: row.get("event"),
            status: parse_status(row.get("status")),
            url: row.get("url"),
            ip_address: row.get("ip_address"),
            user_agent: row.get("user_agent"),
            moderated_by: row.get("moderated_by"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            fields: Vec::new(),
        }
    }

    /// Attach fields to already loaded moderations
    async fn with_fields(&self, mut moderations: Vec<Moderation>) -> ModerationResult<Vec<Moderation>> {
        if moderations.is_empty() {
            return Ok(moderations);
        }

        let ids: Vec<Uuid> = moderations.iter().map(|m| m.id).collect();
        let client = self.pool.get().await?;
        let rows = client
            .query(self.tables.select_fields().as_str(), &[&ids])
            .await?;

        let mut fields: HashMap<Uuid, Vec<ModerationField>> = HashMap::new();
        for row in rows {
            let field = ModerationField {
                id: row.get("id"),
                moderation_id: row.get("moderation_id"),
                name: row.get("name"),
                old: row.get("old"),
                new: row.get("new"),
                status: parse_status(row.get("status")),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            };
            fields.entry(field.moderation_id).or_default().push(field);
        }

        for moderation in &mut moderations {
            moderation.fields = fields.remove(&moderation.id).unwrap_or_default();
        }
        Ok(moderations)
    }
}

fn parse_status(value: &str) -> ModerationStatus {
    value.parse().unwrap_or_else(|e| {
        warn!("{}, treating as pending", e);
        ModerationStatus::Pending
    })
}

#[async_trait]
impl ModerationDriver for DatabaseDriver {
    fn name(&self) -> &str {
        "database"
    }

    async fn persist(&self, pending: PendingModeration) -> ModerationResult<Option<Moderation>> {
        if pending.is_empty() && !self.keeps_empty_moderations() {
            debug!("Skipping moderation of {} without fields", pending.target());
            return Ok(None);
        }

        let moderation = Moderation::from_pending(pending, Utc::now());
        let mut client = self.pool.get().await?;

        // Rollback is automatic when the transaction is dropped on an early return
        let transaction = client.transaction().await?;

        let status = moderation.status.as_str();
        let params: [&(dyn ToSql + Sync); 13] = [
            &moderation.id,
            &moderation.user_id,
            &moderation.user_type,
            &moderation.entity_type,
            &moderation.entity_id,
            &moderation.event,
            &status,
            &moderation.url,
            &moderation.ip_address,
            &moderation.user_agent,
            &moderation.moderated_by,
            &moderation.created_at,
            &moderation.updated_at,
        ];
        transaction
            .execute(self.tables.insert_moderation().as_str(), &params)
            .await?;

        let insert_field = transaction
            .prepare(self.tables.insert_field().as_str())
            .await?;
        for field in &moderation.fields {
            let status = field.status.as_str();
            let params: [&(dyn ToSql + Sync); 8] = [
                &field.id,
                &field.moderation_id,
                &field.name,
                &field.old,
                &field.new,
                &status,
                &field.created_at,
                &field.updated_at,
            ];
            transaction.execute(&insert_field, &params).await?;
        }

        transaction.commit().await?;

        info!(
            "Stored {} moderation {} for {} ({} fields)",
            moderation.event,
            moderation.id,
            moderation.target(),
            moderation.fields.len()
        );
        Ok(Some(moderation))
    }

    async fn prune(&self, target: &EntityRef, threshold: usize) -> ModerationResult<u64> {
        let Some(entity_id) = target.entity_id.as_deref() else {
            return Ok(0);
        };
        if threshold == 0 {
            return Ok(0);
        }

        let client = self.pool.get().await?;
        let pruned = client
            .execute(
                self.tables.prune().as_str(),
                &[&target.entity_type, &entity_id, &(threshold as i64)],
            )
            .await?;

        if pruned > 0 {
            info!("Pruned {} moderations of {}", pruned, target);
        }
        Ok(pruned)
    }

    async fn history(&self, target: &EntityRef) -> ModerationResult<Vec<Moderation>> {
        let Some(entity_id) = target.entity_id.as_deref() else {
            return Ok(Vec::new());
        };

        let client = self.pool.get().await?;
        let rows = client
            .query(
                self.tables.select_history().as_str(),
                &[&target.entity_type, &entity_id],
            )
            .await?;
        drop(client);

        let moderations = rows.iter().map(|row| self.moderation_from_row(row)).collect();
        self.with_fields(moderations).await
    }

    async fn find(&self, id: Uuid) -> ModerationResult<Option<Moderation>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(self.tables.select_by_id().as_str(), &[&id])
            .await?;
        drop(client);

        match row {
            Some(row) => {
                let moderation = self.moderation_from_row(&row);
                Ok(self.with_fields(vec![moderation]).await?.pop())
            }
            None => Ok(None),
        }
    }
}
