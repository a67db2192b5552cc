//! EBRTQ Content Backend
//!
//! Serves the community resource directory and events listing, and lets an
//! editor replace either document through a password-gated save that commits
//! to the site's GitHub repository.

mod api;
mod auth;
mod calendar;
mod config;
mod errors;
mod fetcher;
mod models;
mod store;
mod updater;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, StoreKind};
use fetcher::ContentFetcher;
use store::{ContentStore, GitHubRepo, GitHubStore, MemoryStore};
use updater::ContentUpdater;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub updater: ContentUpdater,
    pub fetcher: ContentFetcher,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EBRTQ Content Backend");
    tracing::info!(
        "Repository: {}/{}@{}",
        config.github_owner,
        config.github_repo,
        config.github_branch
    );
    tracing::info!("Mirror: {}", config.mirror_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_password.is_none() {
        tracing::warn!("No admin password configured (CONTENT_ADMIN_PASSWORD). Every save will be rejected!");
    }

    let bind_addr = config.bind_addr;
    let state = build_state(config)?;
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire the store, updater and fetcher described by `config`.
pub fn build_state(config: Config) -> Result<AppState, reqwest::Error> {
    let client = Client::builder()
        .timeout(config.upstream_timeout)
        .user_agent(concat!("ebrtq-backend/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let store: Option<Arc<dyn ContentStore>> = match config.store {
        StoreKind::GitHub => match &config.github_token {
            Some(token) => {
                let github: Arc<dyn ContentStore> = Arc::new(GitHubStore::new(
                    client.clone(),
                    GitHubRepo {
                        api_url: config.github_api_url.clone(),
                        owner: config.github_owner.clone(),
                        repo: config.github_repo.clone(),
                        branch: config.github_branch.clone(),
                    },
                    token.clone(),
                ));
                Some(github)
            }
            None => {
                tracing::warn!("No GitHub token configured (GITHUB_TOKEN). Saving is disabled!");
                None
            }
        },
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory content store; saves are lost on restart");
            let memory: Arc<dyn ContentStore> = Arc::new(MemoryStore::with_empty_documents(
                &config.resources_path,
                &config.events_path,
            ));
            Some(memory)
        }
    };

    let updater = ContentUpdater::new(
        store,
        config.admin_password.clone(),
        config.upstream_timeout,
    );
    let fetcher = ContentFetcher::new(
        client,
        config.site_origin.clone(),
        config.mirror_url.clone(),
    );

    Ok(AppState {
        config: Arc::new(config),
        updater,
        fetcher,
    })
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Saves
        .route(
            "/save-content",
            post(api::save_resources).fallback(api::method_not_allowed),
        )
        .route(
            "/save-events",
            post(api::save_events).fallback(api::method_not_allowed),
        )
        // Listings
        .route("/resources", get(api::list_resources))
        .route("/events", get(api::list_events))
        // Calendar export
        .route("/events/{id}/calendar.ics", get(api::event_ics))
        .route("/events/{id}/google-calendar", get(api::google_calendar_link))
        // Diagnostics
        .route("/test-env", get(api::test_env));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
