mod auth;
mod config;
mod dtos;
mod error;
mod extract;
mod feed;
mod likes;
mod models;
mod state;
mod store;
mod tweet_controller;
mod user_controller;

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post, put},
    Router,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use config::Config;
use state::AppState;

async fn root() -> &'static str {
    "Hello, World!"
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(root))
        .route("/users", put(user_controller::upsert))
        .route(
            "/sessions",
            post(user_controller::login).delete(user_controller::logout),
        )
        .route("/tweets", post(tweet_controller::create))
        .route("/tweets/feed", get(tweet_controller::feed))
        .route("/tweets/:tweet_id/like", post(tweet_controller::toggle_like))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;
    let addr = SocketAddr::new(config.host, config.port);

    info!("Initializing state...");
    let state = AppState::new(config)?;
    let store = state.store.clone();

    info!("Listening on {addr}");
    axum::Server::bind(&addr)
        .serve(app(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.flush().await?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!("Failed to install signal handler: {err}");
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
