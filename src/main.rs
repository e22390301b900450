use axum::{
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use armazem_api::database;
use armazem_api::handlers::protected::{admin, auth};
use armazem_api::middleware::{require_admin_middleware, session_auth_middleware};
use armazem_api::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = armazem_api::config::config();
    tracing::info!("Starting Armazém São Joaquim API in {:?} mode", config.environment);

    let state = match AppState::init() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("failed to initialize application state: {e}");
            std::process::exit(1);
        }
    };

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("ARMAZEM_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Armazém São Joaquim API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state.clone());

    public
        .merge(session_routes(state))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn session_routes(state: AppState) -> Router {
    // Admin routes: session middleware plus the reusable admin guard
    let admin_routes = Router::new()
        .route("/api/admin/status", get(admin::status_get))
        .route("/api/admin/profile", post(admin::profile_post))
        .route_layer(from_fn_with_state(state.clone(), require_admin_middleware));

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami_get))
        .merge(admin_routes)
        .route_layer(from_fn(session_auth_middleware))
        .with_state(state)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Armazém São Joaquim API",
            "version": version,
            "description": "Back-office authorization service (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "whoami": "/api/auth/whoami (session)",
                "admin_status": "/api/admin/status (session + admin)",
                "admin_profile": "/api/admin/profile (session + admin)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match database::health_check(&state.pool).await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
