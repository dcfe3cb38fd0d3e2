//! moderation-migrate
//!
//! Creates the moderation tables named in the configuration on the database
//! given by DATABASE_URL (or the DB_* variables).

use moderation_trail::{config::Settings, db};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = Settings::load()?;
    info!(
        "Configuration loaded (driver: {}, tables: {}, {})",
        settings.moderation.driver,
        settings.moderation.drivers.database.table,
        settings.moderation.drivers.database.fields_table
    );

    let pool = db::create_pool(&settings.database)?;
    db::verify(&pool).await?;
    info!(
        "Connected to {}:{}/{} (TLS: {})",
        settings.database.host,
        settings.database.port,
        settings.database.database,
        settings.database.require_tls
    );

    db::schema::create_tables(&pool, &settings.moderation).await?;
    info!("Migration complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,moderation_trail=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // LOG_FORMAT=json for log shippers
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}
