//! Portfolio CMS - bilingual content API, library for app logic and testing

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod routes;
pub mod services;
pub mod state;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::models::{
    AboutCard, Achievement, ContactInfo, HeroContent, PersonalInfo, Project, Skill, SkillCategory,
    SocialLink,
};
use crate::db::Database;
use crate::routes::{auth, content, dashboard, files, health, portfolio};
use crate::state::AppState;

/// CORS for the configured front-end origins.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(config.allowed_origins.clone())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .allow_credentials(true)
}

/// Request body cap: the upload limit plus base64 overhead for inline files.
fn body_limit(config: &AppConfig) -> usize {
    config.storage.max_upload_bytes / 3 * 4 + 64 * 1024
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();
    let limit = body_limit(&config);

    Router::new()
        .nest("/api/personal-info", content::routes::<PersonalInfo>())
        .nest("/api/hero", content::routes::<HeroContent>())
        .nest("/api/about-cards", content::routes::<AboutCard>())
        .nest("/api/skill-categories", content::routes::<SkillCategory>())
        .nest("/api/skills", content::routes::<Skill>())
        .nest("/api/projects", content::routes::<Project>())
        .nest("/api/achievements", content::routes::<Achievement>())
        .nest("/api/contact-info", content::routes::<ContactInfo>())
        .nest("/api/social-links", content::routes::<SocialLink>())
        .route("/api/files", get(files::list_files).post(files::create_file))
        .route("/api/files/upload", post(files::upload_file))
        .route(
            "/api/files/{id}",
            get(files::get_file).delete(files::delete_file),
        )
        .route("/api/portfolio", get(portfolio::get_portfolio))
        .route("/api/dashboard/overview", get(dashboard::overview))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify", post(auth::verify_session))
        .route("/health", get(health::health_ping))
        .route("/health/detailed", get(health::health_detailed))
        .route("/health/database", get(health::health_database))
        .nest_service("/storage/files", ServeDir::new(&config.storage.dir))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .fallback(routes::middleware::fallback)
        .layer(CatchPanicLayer::custom(routes::middleware::handle_panic))
        .layer(DefaultBodyLimit::max(limit))
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(middleware::from_fn(routes::middleware::normalize_errors))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(configure_cors(&config))
        .with_state(state)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Held until the server stops so buffered log lines are flushed.
    let _log_guards = logging::init(&config.log);

    let db = Database::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    db::run_migrations(db.pool())
        .await
        .context("Failed to run database migrations")?;
    db::ensure_admin(
        db.pool(),
        config.auth.admin_email.as_deref(),
        config.auth.admin_password_hash.as_deref(),
    )
    .await
    .context("Failed to bootstrap the admin account")?;

    let addr = config.socket_addr()?;
    tracing::info!(
        environment = config.environment.as_str(),
        storage = ?config.storage.dir,
        "Starting server on {}",
        addr
    );

    let app = create_app(AppState::new(db.clone(), config));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}
