//! Tessera Server
//!
//! Production server for the registration and ticket lifecycle engine:
//! - Event catalog: create/list/update/transition/delete
//! - Participant registration and merchandise ordering
//! - Team formation and leader-only team registration
//! - Organizer approval of merchandise orders
//! - QR credential scanning and manual check-in
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TESSERA_API_PORT` | `8080` | HTTP API port |
//! | `TESSERA_METRICS_PORT` | `9090` | Metrics/health port |
//! | `TESSERA_MONGO_URL` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `TESSERA_MONGO_DB` | `tessera` | MongoDB database name |
//! | `TESSERA_AUTH_SECRET` | - | HS256 secret shared with the auth issuer (required) |
//! | `TESSERA_CREDENTIAL_SECRET` | - | HMAC key for ticket credentials (required) |
//! | `TESSERA_NOTIFY_WEBHOOK_URL` | - | Optional notification webhook target |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tessera_core::api::{
    events_router, orders_router, teams_router, tickets_router, ApiDoc, AppState, EventsState,
    OrdersState, TeamsState, TicketsState, TokenVerifier,
};
use tessera_core::repository::{
    ensure_indexes, EventRepository, TeamRepository, TicketRepository,
};
use tessera_core::service::{
    ApprovalService, CheckInService, CredentialSigner, EventCatalogService, Notifier,
    RegistrationService, TeamService,
};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("{} must be set", key))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Tessera Server");

    // Configuration from environment
    let api_port: u16 = env_or_parse("TESSERA_API_PORT", 8080);
    let metrics_port: u16 = env_or_parse("TESSERA_METRICS_PORT", 9090);
    let mongo_url = env_or("TESSERA_MONGO_URL", "mongodb://localhost:27017");
    let mongo_db = env_or("TESSERA_MONGO_DB", "tessera");
    let auth_secret = env_required("TESSERA_AUTH_SECRET")?;
    let credential_secret = env_required("TESSERA_CREDENTIAL_SECRET")?;
    let webhook_url = std::env::var("TESSERA_NOTIFY_WEBHOOK_URL").ok();

    // Connect to MongoDB
    info!("Connecting to MongoDB: {}/{}", mongo_url, mongo_db);
    let mongo_client = mongodb::Client::with_uri_str(&mongo_url).await?;
    let db = mongo_client.database(&mongo_db);

    // The unique/partial indexes carry the engine's uniqueness invariants
    ensure_indexes(&db).await?;
    info!("Indexes ensured");

    // Initialize repositories
    let event_repo = Arc::new(EventRepository::new(&db));
    let ticket_repo = Arc::new(TicketRepository::new(&db));
    let team_repo = Arc::new(TeamRepository::new(&db));
    info!("Repositories initialized");

    // Shared services
    let signer = Arc::new(CredentialSigner::new(&credential_secret));
    let notifier = Notifier::new(webhook_url);
    let verifier = Arc::new(TokenVerifier::new(&auth_secret));

    let catalog = Arc::new(EventCatalogService::new(
        event_repo.clone(),
        ticket_repo.clone(),
        notifier.clone(),
    ));
    let registration = Arc::new(RegistrationService::new(
        event_repo.clone(),
        ticket_repo.clone(),
        signer.clone(),
        notifier.clone(),
    ));
    let team_service = Arc::new(TeamService::new(
        team_repo,
        event_repo.clone(),
        ticket_repo.clone(),
        signer.clone(),
        notifier.clone(),
    ));
    let approval = Arc::new(ApprovalService::new(
        ticket_repo.clone(),
        event_repo.clone(),
        signer.clone(),
        notifier,
    ));
    let checkin = Arc::new(CheckInService::new(ticket_repo, event_repo, signer));
    info!("Services initialized");

    // Create AppState
    let app_state = AppState { verifier };

    // Build API states
    let events_state = EventsState {
        catalog,
        registration: registration.clone(),
        checkin: checkin.clone(),
    };
    let teams_state = TeamsState { team_service };
    let orders_state = OrdersState { approval };
    let tickets_state = TicketsState {
        registration,
        checkin,
    };

    // Build API router
    let app = Router::new()
        .nest("/events", events_router(events_state))
        .nest("/teams", teams_router(teams_state))
        .nest("/admin/merch-orders", orders_router(orders_state))
        .nest("/tickets", tickets_router(tickets_state))
        // OpenAPI / Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", ApiDoc::openapi()))
        // Auth middleware state
        .layer(axum::Extension(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start API server
    let api_addr = format!("0.0.0.0:{}", api_port);
    info!("API server listening on http://{}", api_addr);

    let api_listener = TcpListener::bind(&api_addr).await?;
    let api_task = tokio::spawn(async move {
        axum::serve(api_listener, app).await.unwrap();
    });

    // Start metrics server
    let metrics_addr = format!("0.0.0.0:{}", metrics_port);
    info!("Metrics server listening on http://{}/metrics", metrics_addr);

    let metrics_app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler));

    let metrics_listener = TcpListener::bind(&metrics_addr).await?;
    let metrics_task = tokio::spawn(async move {
        axum::serve(metrics_listener, metrics_app).await.unwrap();
    });

    info!("Tessera Server started");
    info!("Press Ctrl+C to shutdown");

    // Wait for shutdown
    shutdown_signal().await;
    info!("Shutdown signal received...");

    api_task.abort();
    metrics_task.abort();

    info!("Tessera Server shutdown complete");
    Ok(())
}

async fn metrics_handler() -> &'static str {
    "# HELP tessera_up Server is up\n# TYPE tessera_up gauge\ntessera_up 1\n"
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ready_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "READY"
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
