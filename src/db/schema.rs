//! Moderation tables
//!
//! Creates the moderation and field tables if they don't exist.

use super::queries::Tables;
use crate::config::ModerationConfig;
use crate::error::ModerationResult;
use deadpool_postgres::Pool;
use tracing::info;

/// Tables named by the configuration
pub fn tables(config: &ModerationConfig) -> Tables {
    Tables::new(
        &config.drivers.database.table,
        &config.drivers.database.fields_table,
        &config.user.morph_prefix,
    )
}

/// Create the moderation tables and indexes in one transaction
pub async fn create_tables(pool: &Pool, config: &ModerationConfig) -> ModerationResult<()> {
    let tables = tables(config);
    let mut client = pool.get().await?;
    let transaction = client.transaction().await?;

    for statement in tables.create_statements() {
        transaction.execute(statement.as_str(), &[]).await?;
    }

    transaction.commit().await?;
    info!(
        "Moderation tables ready ({}, {})",
        tables.moderations, tables.fields
    );
    Ok(())
}
