//! Backend of a city scavenger hunt.
//!
//!
//!
//! # Flow
//! - Users submit destinations through the submission form (`/destination-data`)
//! - Before submitting, the frontend asks `/duplicates` whether the Google place is already known
//! - A player picks cities, difficulties, tags and a number of stops (`/generate-hunt`)
//! - The generated hunt is stored and its id is handed back to the frontend
//! - `/go-data` serves the hunt and records which stop the player is on
//! - Each guess goes through `/guess-data`, compared by named entities rather than raw text
//!
//!
//!
//! # Storage
//!
//! Everything lives in Redis as JSON blobs, see [`database`]. There is no relation between a hunt and
//! the destinations it was built from: a hunt copies what it needs (name, location, description,
//! one riddle) into its own items when it is generated.
//!
//!
//!
//! # Per-request state
//!
//! Nothing about a player lives in the server process. The current stop and the player's name are
//! part of the stored hunt, so any number of players (and server replicas) can run at once.
//!
//!
//!
//! # Setup
//!
//! Run against a local Redis.
//! ```sh
//! docker run -p 6379:6379 redis
//! RUST_LOG=info cargo run --bin hunt
//! ```
//!
//! Run without Redis.
//! ```sh
//! STORE=memory RUST_LOG=info cargo run --bin hunt
//! ```
//!
//! Load the sample destinations.
//! ```sh
//! cargo run --bin process -- data/destinations.json
//! ```
//!
//! Use the hosted entity API for guesses by placing the key in `/run/secrets/LANGUAGE_API_KEY`
//! or exporting `LANGUAGE_API_KEY`.
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod guess;
pub mod hunt;
pub mod language;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use error::AppError;
use routes::{
    cities_handler, destination_handler, duplicates_handler, generate_handler, get_hunt_handler,
    get_name_handler, guess_handler, health_handler, set_name_handler, update_index_handler,
};
use state::State;

pub fn router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/destination-data", post(destination_handler))
        .route("/duplicates", get(duplicates_handler))
        .route("/get-cities", get(cities_handler))
        .route("/generate-hunt", post(generate_handler))
        .route("/go-data", get(get_hunt_handler).post(update_index_handler))
        .route("/guess-data", get(guess_handler))
        .route("/name-data", get(get_name_handler).post(set_name_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);

    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
