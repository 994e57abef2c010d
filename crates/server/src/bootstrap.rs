use thiserror::Error;
use tracing::info;

use staffdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use staffdesk_db::{connect_with_settings, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    Ok(Application { config, db_pool })
}

#[cfg(test)]
mod tests {
    use staffdesk_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_on_a_fresh_database() {
        let app = bootstrap(memory_options()).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN \
             ('requests', 'request_attachments', 'request_history', 'request_comments', 'notifications')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables to be available after bootstrap");
        assert_eq!(table_count, 5, "bootstrap should expose the baseline workflow tables");

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_on_unreachable_database() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite:///nonexistent-dir/staffdesk.db".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
    }
}
