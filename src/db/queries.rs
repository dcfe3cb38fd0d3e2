//! SQL query builders
//!
//! Table and column names come from validated configuration (SQL identifiers),
//! values are always bound as parameters.

/// Names the table driver writes to
#[derive(Debug, Clone)]
pub struct Tables {
    pub moderations: String,
    pub fields: String,
    /// Prefix of the actor reference columns
    pub morph_prefix: String,
}

const MODERATION_COLUMNS: &str =
    "entity_type, entity_id, event, status, url, ip_address, user_agent, moderated_by, created_at, updated_at";

impl Tables {
    pub fn new(moderations: &str, fields: &str, morph_prefix: &str) -> Self {
        Self {
            moderations: moderations.to_string(),
            fields: fields.to_string(),
            morph_prefix: morph_prefix.to_string(),
        }
    }

    fn actor_columns(&self) -> String {
        format!("{p}_id, {p}_type", p = self.morph_prefix)
    }

    /// Insert one moderation: 13 parameters, id first
    pub fn insert_moderation(&self) -> String {
        format!(
            "INSERT INTO {} (id, {}, {}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            self.moderations,
            self.actor_columns(),
            MODERATION_COLUMNS
        )
    }

    /// Insert one field: 8 parameters
    pub fn insert_field(&self) -> String {
        format!(
            "INSERT INTO {} (id, moderation_id, name, old, new, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            self.fields
        )
    }

    /// Moderations of one entity ($1 type, $2 id), newest first.
    /// Ids are v7, so `id` breaks timestamp ties in insertion order.
    pub fn select_history(&self) -> String {
        format!(
            "SELECT id, {}, {} FROM {} WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY created_at DESC, id DESC",
            self.actor_columns(),
            MODERATION_COLUMNS,
            self.moderations
        )
    }

    pub fn select_by_id(&self) -> String {
        format!(
            "SELECT id, {}, {} FROM {} WHERE id = $1",
            self.actor_columns(),
            MODERATION_COLUMNS,
            self.moderations
        )
    }

    /// Fields of a set of moderations ($1 uuid[])
    pub fn select_fields(&self) -> String {
        format!(
            "SELECT id, moderation_id, name, old, new, status, created_at, updated_at \
             FROM {} WHERE moderation_id = ANY($1) ORDER BY name",
            self.fields
        )
    }

    /// Delete all but the newest $3 moderations of one entity; fields cascade
    pub fn prune(&self) -> String {
        format!(
            "DELETE FROM {t} WHERE id IN (\
             SELECT id FROM {t} WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY created_at DESC, id DESC OFFSET $3)",
            t = self.moderations
        )
    }

    /// Idempotent DDL for both tables
    pub fn create_statements(&self) -> Vec<String> {
        let p = &self.morph_prefix;
        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {t} (
                    id UUID PRIMARY KEY,
                    {p}_id VARCHAR(255),
                    {p}_type VARCHAR(255),
                    entity_type VARCHAR(255) NOT NULL,
                    entity_id VARCHAR(255),
                    event VARCHAR(255) NOT NULL,
                    status VARCHAR(20) NOT NULL DEFAULT 'pending',
                    url TEXT NOT NULL,
                    ip_address VARCHAR(45),
                    user_agent VARCHAR(1023),
                    moderated_by VARCHAR(255),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
                )",
                t = self.moderations,
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {f} (
                    id UUID PRIMARY KEY,
                    moderation_id UUID NOT NULL,
                    name VARCHAR(255) NOT NULL,
                    old JSONB,
                    new JSONB,
                    status VARCHAR(20) NOT NULL DEFAULT 'pending',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    FOREIGN KEY (moderation_id) REFERENCES {t}(id) ON DELETE CASCADE,
                    UNIQUE(moderation_id, name)
                )",
                f = self.fields,
                t = self.moderations,
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{t}_entity ON {t}(entity_type, entity_id, created_at)",
                t = self.moderations,
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{t}_{p}_id ON {t}({p}_id, {p}_type)",
                t = self.moderations,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_columns_use_prefix() {
        let tables = Tables::new("moderations", "moderation_fields", "author");
        let sql = tables.insert_moderation();

        assert!(sql.starts_with("INSERT INTO moderations (id, author_id, author_type, entity_type"));
        assert!(sql.contains("$13)"));
        assert!(!sql.contains("$14"));
    }

    #[test]
    fn test_prune_offsets_newest() {
        let sql = Tables::new("moderations", "moderation_fields", "user").prune();

        assert!(sql.starts_with("DELETE FROM moderations WHERE id IN (SELECT id FROM moderations"));
        assert!(sql.contains("ORDER BY created_at DESC, id DESC OFFSET $3"));
    }

    #[test]
    fn test_ddl_cascades_fields() {
        let statements = Tables::new("mods", "mod_fields", "user").create_statements();

        assert_eq!(statements.len(), 4);
        assert!(statements[0].contains("user_id VARCHAR(255)"));
        assert!(statements[1].contains("REFERENCES mods(id) ON DELETE CASCADE"));
        assert!(statements[2].contains("idx_mods_entity"));
    }
}
