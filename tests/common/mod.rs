//! tests/common/mod.rs
//! Shared helpers: an in-memory user model and a way to spawn the app on an
//! ephemeral port.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{serve, Router};
use serde_json::Value;
use tokio::net::TcpListener as TokioTcpListener;

use users_api::config::{environment::EnvironmentVariables, state::AppState};
use users_api::core::server::create_app;
use users_api::database::UserModel;
use users_api::models::user::{NewUser, User, UserChanges, UserFilters, UserId};

/// User model keeping records in a map. With `failing` every call errors,
/// standing in for an unreachable database; with `delay` listing stalls.
#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<BTreeMap<UserId, User>>,
    failing: bool,
    delay: Option<Duration>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    /// Inserts a user directly, bypassing validation
    pub fn seed(&self, firstname: &str, email: &str, language: Option<&str>) -> User {
        let mut users = self.users.lock().unwrap();
        let id: UserId = users.keys().next_back().map_or(1, |last| last + 1);
        let user: User = User {
            id,
            firstname: firstname.to_string(),
            lastname: "Doe".to_string(),
            email: email.to_string(),
            city: Some("Paris".to_string()),
            language: language.map(str::to_string),
        };
        users.insert(id, user.clone());
        user
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            Err(anyhow!("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserModel for InMemoryUsers {
    async fn find_many(&self, filters: &UserFilters) -> Result<Vec<User>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .filter(|u| filters.language.is_none() || u.language == filters.language)
            .cloned()
            .collect())
    }

    async fn find_one(&self, id: UserId) -> Result<Option<User>> {
        self.check()?;
        Ok(self.get(id))
    }

    async fn create(&self, user: &NewUser) -> Result<User> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let id: UserId = users.keys().next_back().map_or(1, |last| last + 1);
        let created: User = User {
            id,
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            email: user.email.clone(),
            city: user.city.clone(),
            language: user.language.clone(),
        };
        users.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<()> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&id) {
            if let Some(firstname) = &changes.firstname {
                user.firstname = firstname.clone();
            }
            if let Some(lastname) = &changes.lastname {
                user.lastname = lastname.clone();
            }
            if let Some(email) = &changes.email {
                user.email = email.clone();
            }
            if let Some(city) = &changes.city {
                user.city = city.clone();
            }
            if let Some(language) = &changes.language {
                user.language = language.clone();
            }
        }
        Ok(())
    }

    async fn destroy(&self, id: UserId) -> Result<bool> {
        self.check()?;
        Ok(self.users.lock().unwrap().remove(&id).is_some())
    }
}

/// Spawns the app on a random unused port and returns its base URL.
pub fn spawn_app(users: Arc<dyn UserModel>) -> String {
    // * Defaults match the production configuration (2MB body limit, 3s timeout).
    spawn_app_with_env(users, EnvironmentVariables::default())
}

/// Same as `spawn_app` with explicit configuration (e.g. a shorter timeout).
pub fn spawn_app_with_env(users: Arc<dyn UserModel>, env: EnvironmentVariables) -> String {
    let app: Router = create_app(AppState::new(Arc::new(env), users));

    // * Bind an ephemeral port using std::net::TcpListener.
    let std_listener: std::net::TcpListener = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    std_listener.set_nonblocking(true).unwrap();

    // * Convert std::net::TcpListener to tokio::net::TcpListener.
    let tokio_listener: TokioTcpListener = TokioTcpListener::from_std(std_listener)
        .expect("Failed to convert to tokio listener");

    let addr: std::net::SocketAddr = tokio_listener.local_addr().unwrap();

    // * Spawn the server in a background task.
    tokio::spawn(async move {
        serve(tokio_listener, app)
            .await
            .expect("Server failed");
    });

    format!("http://{}", addr)
}

/// Reads a response as the JSON envelope
pub async fn envelope(resp: reqwest::Response) -> Value {
    let body: String = resp.text().await.unwrap();
    serde_json::from_str(&body).unwrap()
}
