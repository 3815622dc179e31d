pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::create_api_router;
use auth::{DEFAULT_FILTER_ORDER, PathPolicy, SecurityState, cors_layer, security_chain};
use axum::{Router, middleware};
use db::Database;
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Access token lifetime in seconds
    pub access_token_secs: u64,
    /// Refresh token lifetime in seconds, also the revocation entry TTL
    pub refresh_token_secs: u64,
    /// Header to read the client IP from (requires running behind a proxy)
    pub ip_header: Option<cli::ClientIpHeader>,
    pub rate_limit: RateLimitConfig,
    /// Paths reachable without an identity
    pub policy: PathPolicy,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(
        JwtConfig::new(&config.jwt_secret)
            .with_durations(config.access_token_secs, config.refresh_token_secs),
    );

    let security = SecurityState {
        db: config.db.clone(),
        jwt,
        secure_cookies: config.secure_cookies,
        policy: Arc::new(config.policy.clone()),
        rate_limit: Arc::new(config.rate_limit.clone()),
        ip_header: config.ip_header,
        filters: Arc::from(DEFAULT_FILTER_ORDER),
    };

    // CORS outermost so preflight requests never reach the security chain
    create_api_router(config.db.clone())
        .layer(middleware::from_fn_with_state(security, security_chain))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(config: &ServerConfig) {
    cleanup::run_cleanup(&config.db, &config.rate_limit).await;
    cleanup::spawn_cleanup_scheduler(config.db.clone(), config.rate_limit.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
