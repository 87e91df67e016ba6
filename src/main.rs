use stack_service::core::{AppError, AppState, DeploymentProfile, LoggingContext, ServerConfig};
use stack_service::db::Db;
use stack_service::{api, bootstrap};
use std::sync::Arc;
use tracing::{error, info};

fn usage() -> &'static str {
    r#"Usage:
    cargo run -- server
    cargo run -- config

Env:
    APP_ENV (development | staging | production; default development)
    FLASK_ENV (legacy alias for APP_ENV)
    SERVER_ADDR (default 0.0.0.0:5000)
    LOG_LEVEL (overrides the profile's log level; any RUST_LOG style directive)

Env (development):
    LOCAL_DATABASE_URL (default mysql://stack_user:stack_password@db:3306/stack_db)

Env (staging/production, all required):
    db_username, db_password, db_host, db_port, db_name
    (DB_USERNAME, DB_PASSWORD, ... accepted as aliases)
"#
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "server".to_string());

    match cmd.as_str() {
        "server" => run_server().await?,
        "config" => {
            let profile = DeploymentProfile::from_env()?;
            println!("{}", serde_json::to_string_pretty(&profile.summary())?);
        }
        _ => {
            eprintln!("Unknown command: {}\n\n{}", cmd, usage());
            std::process::exit(2);
        }
    }

    Ok(())
}

async fn run_server() -> Result<(), AppError> {
    let logging = LoggingContext::init()?;

    let profile = DeploymentProfile::from_env().map_err(|e| {
        error!(error = %e, "cannot resolve deployment profile");
        e
    })?;
    logging.configure(&profile.log_level, profile.environment)?;

    let server = ServerConfig::from_env();
    let addr: std::net::SocketAddr = server
        .server_addr
        .parse()
        .map_err(|e| AppError::InvalidAddr(format!("{}: {e}", server.server_addr)))?;

    let db = Db::connect_lazy(&profile.database_uri)?;
    let state = AppState {
        profile: Arc::new(profile),
        db: Arc::new(db),
    };

    bootstrap::initialize_on_startup(&state).await;

    let app = api::router(state);
    info!(%addr, "listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Server(e.to_string()))?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
