// =============================================================================
// DATABASE SERVICE - PostgreSQL pool and schema management
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{ConnectOptions, Executor, PgPool};
use tracing::{error, info, log::LevelFilter};

use crate::config::environment::EnvironmentVariables;

/// SQL creating the users table and its language index
const CREATE_USERS_TABLE: &str = include_str!("sql/schemas/users.sql");

/// Owns the PostgreSQL connection pool used by the user model.
/// The pool connects lazily, so building the service never touches the network.
#[derive(Clone, Debug)]
pub struct DatabaseService {
    pool: PgPool,
    /// Environment configuration
    config: Arc<EnvironmentVariables>,
}

impl DatabaseService {
    /// Creates a new DatabaseService with a lazily connecting pool
    pub fn new(config: Arc<EnvironmentVariables>) -> Self {
        let connect_options: PgConnectOptions = Self::create_connect_options(&config);

        let pool: PgPool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(0)
            .idle_timeout(std::time::Duration::from_secs(30))
            // No point waiting for a connection longer than the request may live
            .acquire_timeout(std::time::Duration::from_secs(config.default_timeout_seconds))
            .connect_lazy_with(connect_options);

        Self { pool, config }
    }

    /// Returns a handle to the shared pool
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Applies the users schema. Called once at application startup.
    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing DatabaseService for database '{}'...", self.config.db_name);

        self.execute_sql(CREATE_USERS_TABLE, "create users table")
            .await
            .context("Failed to initialize users schema")?;

        info!("DatabaseService initialized successfully");
        Ok(())
    }

    /// Gracefully shuts down the service by closing the pool.
    /// Designed to be called during application shutdown.
    pub async fn shutdown(&self) {
        info!("Initiating DatabaseService shutdown...");
        self.pool.close().await;
        info!("DatabaseService shutdown completed");
    }

    /// Execute a schema script with logging
    async fn execute_sql(&self, sql_content: &str, description: &str) -> Result<()> {
        info!("Executing schema operation: {}", description);

        self.pool
            .execute(sql_content)
            .await
            .inspect_err(|e| error!("Failed to execute {}: {}", description, e))
            .with_context(|| format!("Schema operation failed: {}", description))?;

        info!("Successfully executed: {}", description);
        Ok(())
    }

    /// Creates connection options with SSL and UTC timezone configuration
    fn create_connect_options(config: &EnvironmentVariables) -> PgConnectOptions {
        let options: PgConnectOptions = PgConnectOptions::new()
            .host(&config.db_host)
            .port(config.db_port)
            .username(&config.db_user)
            .password(&config.db_password)
            .database(&config.db_name)
            .options([("timezone", "UTC")])
            .log_statements(LevelFilter::Debug);

        // Production requires SSL, development only prefers it
        if config.is_development() {
            options.ssl_mode(PgSslMode::Prefer)
        } else {
            options.ssl_mode(PgSslMode::Require)
        }
    }
}
