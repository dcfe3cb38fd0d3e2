//! Database connection management
//!
//! Connection pooling for the table driver.

pub mod queries;
pub mod schema;

use crate::config::{ConfigError, DatabaseConfig};
use crate::error::ModerationResult;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

/// Create a connection pool, with rustls when the configuration requires TLS
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, ConfigError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.pool = Some(deadpool_postgres::PoolConfig::new(config.max_pool_size));
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let pool = if config.require_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
        cfg.create_pool(Some(Runtime::Tokio1), tls)
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
    };

    pool.map_err(|e| ConfigError::InvalidValue(format!("Failed to create pool: {}", e)))
}

/// Check that a connection can be obtained and used
pub async fn verify(pool: &Pool) -> ModerationResult<()> {
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    info!("Database connection verified");
    Ok(())
}
