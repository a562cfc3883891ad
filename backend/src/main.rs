use movie_admin::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, connects and migrates the database, then
/// serves the router until the process is stopped.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise a debug-level default for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "movie_admin=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");
    tracing::info!("Database migrations applied.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let state = AppState::new(repo, config);

    // 4. First administrator
    match &state.config.admin {
        Some(admin) => {
            let created = state
                .credentials
                .ensure_admin(&admin.email, &admin.password)
                .await
                .expect("FATAL: Failed to create the admin account from ADMIN_EMAIL.");
            if created {
                tracing::info!("Admin account created for {}", admin.email);
            }
        }
        None if state.config.env == Env::Production => {
            tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set; no admin account is provisioned.");
        }
        None => {}
    }

    // 5. Router, server
    let bind_addr = state.config.bind_addr.clone();
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
