// Application state shared by every handler

use std::sync::Arc;
use crate::config::environment::EnvironmentVariables;
use crate::database::{DatabaseService, PgUserModel, UserModel};

#[derive(Clone)]
pub struct AppState {
    pub environment: Arc<EnvironmentVariables>,
    pub users: Arc<dyn UserModel>,
}

impl AppState {
    /// Creates a state around an already built user collaborator
    pub fn new(environment: Arc<EnvironmentVariables>, users: Arc<dyn UserModel>) -> Self {
        Self { environment, users }
    }

    /// Builds the production state: environment from the process plus a
    /// PostgreSQL-backed user model. The returned service must be
    /// initialized and shut down by the caller.
    pub fn from_env() -> anyhow::Result<(Self, DatabaseService)> {
        let environment: Arc<EnvironmentVariables> =
            Arc::new(EnvironmentVariables::instance()?.clone());

        let database: DatabaseService = DatabaseService::new(environment.clone());
        let users: Arc<dyn UserModel> = Arc::new(PgUserModel::new(database.pool()));

        Ok((Self::new(environment, users), database))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}
