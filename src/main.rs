// Start of file: src/main.rs

use axum::{Router, serve};
use tokio::net::TcpListener;

use users_api::config::state::AppState;
use users_api::core::{logging, server};
use users_api::database::DatabaseService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // set up logging
    logging::init_tracing();

    let (state, database): (AppState, DatabaseService) = AppState::from_env()?;

    // Create the users table before accepting traffic
    database.initialize().await?;

    let listener: TcpListener = server::setup_listener(&state.environment).await?;
    let app: Router = server::create_app(state);

    tracing::info!("Server listening on: {}", listener.local_addr()?);

    serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    // Gracefully close database connections
    database.shutdown().await;

    Ok(())
}

// End of file: src/main.rs
