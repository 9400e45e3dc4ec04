use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use spark_api::middleware::{require_auth, verify_token};
use spark_api::{AppState, AppStateInner, auth, messages, swipes};
use spark_gateway::{Registry, connection};

#[derive(Clone)]
struct ServerState {
    app: AppState,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spark=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("SPARK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("SPARK_DB_PATH").unwrap_or_else(|_| "spark.db".into());
    let host = std::env::var("SPARK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SPARK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let email_domain =
        std::env::var("SPARK_EMAIL_DOMAIN").unwrap_or_else(|_| "campus.edu".into());

    // Init database
    let db = Arc::new(spark_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let registry = Registry::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        registry: registry.clone(),
        jwt_secret: jwt_secret.clone(),
        email_domain,
    });

    let state = ServerState {
        app: app_state.clone(),
    };

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/swipes", post(swipes::record_swipe))
        .route("/swipes/{target_id}", delete(swipes::undo_swipe))
        .route("/matches", get(swipes::get_matches))
        .route("/likes", get(swipes::get_liked_by))
        .route("/matches/{match_id}/messages", get(messages::get_messages))
        .route("/matches/{match_id}/messages", post(messages::send_message))
        .route("/matches/{match_id}/read", post(messages::mark_read))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("Spark server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct GatewayQuery {
    token: Option<String>,
}

/// WebSocket upgrade. The session token comes in the query string and is
/// validated before the upgrade completes — a missing or invalid token never
/// gets a live connection.
async fn ws_upgrade(
    State(state): State<ServerState>,
    Query(query): Query<GatewayQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let Some(token) = query.token else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let claims = match verify_token(&token, &state.app.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => {
            warn!("gateway upgrade rejected: invalid token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let registry = state.app.registry.clone();
    let db = state.app.db.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, registry, db, claims.sub))
        .into_response()
}
