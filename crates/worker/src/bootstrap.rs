use carmarket_core::config::AppConfig;
use carmarket_db::{connect_with_settings, migrations, DbPool};
use carmarket_engine::Sweeper;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub sweeper: Sweeper,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        environment = config.environment.as_str(),
        "starting worker bootstrap"
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

    let sweeper = Sweeper::from_config(db_pool.clone(), &config);
    Ok(Application { config, db_pool, sweeper })
}

#[cfg(test)]
mod tests {
    use carmarket_core::config::{AppConfig, Environment};
    use carmarket_core::sweep::SweepKind;

    use crate::bootstrap::{bootstrap_with_config, BootstrapError};

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config
    }

    #[tokio::test]
    async fn bootstrap_reports_unreachable_database_files() {
        let mut config = memory_config();
        config.database.url = "sqlite:///nonexistent-dir/carmarket.db".to_string();

        let result = bootstrap_with_config(config).await;

        assert!(matches!(result, Err(BootstrapError::DatabaseConnect(_))));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_the_sweeper() {
        let mut config = memory_config();
        config.environment = Environment::Production;

        let app = bootstrap_with_config(config)
            .await
            .expect("bootstrap should succeed against an in-memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('owner', 'listing', 'listing_revision', 'notification')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("lifecycle tables should exist after bootstrap");
        assert_eq!(table_count, 4);

        let report = app.sweeper.run(SweepKind::Expire).await.expect("expire sweep");
        assert!(!report.skipped);
        assert_eq!(report.affected, 0);
    }
}
