//! Quill Server
//!
//! Blog REST API: users, roles and posts behind bearer token auth.
//!
//! ## Commands
//!
//! - `serve` (default): run the HTTP server
//! - `init-db`: create the database tables and exit
//! - `config-example`: print an example configuration file
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DATABASE_URL` | - (required) | Store connection string |
//! | `QUILL_HTTP_PORT` | `8080` | HTTP API port |
//! | `JWT_SECRET_KEY` | `super-secret` | HS256 signing secret |
//! | `QUILL_CONFIG` | - | Path to a TOML config file |
//! | `LOG_FORMAT` | `text` | `json` for structured logs |
//! | `RUST_LOG` | `info` | Log level |
//!
//! See `quill-config` for the full list of overrides.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use quill_config::{AppConfig, ConfigLoader, DatabaseConfig};
use quill_platform::{
    build_app, create_tables, AppState, Argon2Config, AuthConfig, AuthService, PasswordPolicy,
    PasswordService,
};

/// Quill blog server
#[derive(Parser, Debug)]
#[command(name = "quill-server")]
#[command(about = "Quill blog API server", version)]
struct Args {
    /// Config file (default: search QUILL_CONFIG, quill.toml, config.toml, ...)
    #[arg(long, short)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Create the database tables and exit
    InitDb,
    /// Print an example configuration file
    ConfigExample,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Serve);

    if command == Command::ConfigExample {
        print!("{}", AppConfig::example_toml());
        return Ok(());
    }

    quill_common::init_logging("quill-server");

    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("Failed to load configuration")?;

    let db = connect(&config.database).await?;

    match command {
        Command::InitDb => {
            create_tables(&db).await.context("Failed to create tables")?;
            info!("Initialized the database");
            Ok(())
        }
        _ => serve(config, db).await,
    }
}

async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(config.sqlx_logging);

    let db = Database::connect(options)
        .await
        .context("Failed to connect to the database")?;
    info!(backend = ?db.get_database_backend(), "Connected to database");
    Ok(db)
}

async fn serve(config: AppConfig, db: DatabaseConnection) -> Result<()> {
    info!("Starting Quill Server");

    if config.database.create_schema {
        create_tables(&db).await.context("Failed to create tables")?;
    }

    let auth_service = AuthService::new(AuthConfig {
        secret_key: config.auth.jwt_secret.clone(),
        issuer: config.auth.issuer.clone(),
        audience: config.auth.audience.clone(),
        access_token_expiry_secs: config.auth.access_token_expiry_secs,
    });
    let password_service = PasswordService::new(
        Argon2Config::default(),
        PasswordPolicy::with_min_length(config.auth.password_min_length),
    )?;

    let state = AppState::new(db.clone(), auth_service, password_service);

    let app = build_app(&state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http.cors_origins));

    let addr = config.http.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down...");
    if let Err(e) = db.close().await {
        warn!(error = %e, "Error closing database pool");
    }
    info!("Quill Server stopped");

    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
