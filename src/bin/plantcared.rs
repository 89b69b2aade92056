use std::path::Path;
use std::sync::Arc;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use plantcare::sql::PgDataStore;
use plantcare::{
    AppState, AuthService, DataStore, InMemoryDataStore, OverdueSweep, ServerConfig, SystemClock,
    create_router,
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "Path to a YAML configuration file")]
    config: Option<String>,
    #[arrrg(optional, "Host to bind the HTTP server")]
    host: Option<String>,
    #[arrrg(optional, "Port to bind the HTTP server")]
    port: Option<u16>,
    #[arrrg(optional, "PostgreSQL database URL")]
    database_url: Option<String>,
    #[arrrg(optional, "Secret used to sign session tokens")]
    jwt_secret: Option<String>,
    #[arrrg(optional, "Seconds between overdue sweeps")]
    sweep_interval_secs: Option<u64>,
    #[arrrg(optional, "Days a session token stays valid")]
    token_ttl_days: Option<u64>,
    #[arrrg(optional, "Log filter used when RUST_LOG is unset")]
    log_level: Option<String>,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

const HELP_TEXT: &str = r#"plantcared - plant care reminder service

USAGE:
    plantcared [OPTIONS]

OPTIONS:
    --config <PATH>              YAML configuration file
    --host <HOST>                Host to bind the HTTP server [default: 127.0.0.1]
    --port <PORT>                Port to bind the HTTP server [default: 5000]
    --database-url <URL>         PostgreSQL URL [env: DATABASE_URL; default: in-memory]
    --jwt-secret <SECRET>        Token signing secret [env: PLANTCARE_JWT_SECRET]
    --sweep-interval-secs <N>    Seconds between overdue sweeps [default: 60]
    --token-ttl-days <N>         Days a session token stays valid [default: 7]
    --log-level <FILTER>         Log filter when RUST_LOG is unset [default: info]
    --verbose                    Shorthand for --log-level debug

DESCRIPTION:
    Serves the plantcare JSON API under /api and periodically records
    overdue watering and fertilizing reminders.

    Settings are layered: defaults, then the config file, then environment
    variables, then flags.  The server shuts down gracefully on Ctrl+C.

API ENDPOINTS:
    GET    /                            Liveness banner
    POST   /api/register                Create an account
    POST   /api/login                   Exchange credentials for a token
    GET    /api/plants                  List your plants
    POST   /api/plants                  Add a plant
    GET    /api/plants/{id}             Get a plant
    PUT    /api/plants/{id}             Update a plant
    DELETE /api/plants/{id}             Remove a plant
    POST   /api/plants/{id}/water       Record a watering
    POST   /api/plants/{id}/fertilize   Record a fertilizing
    GET    /api/activities              Care history (?plantId=&type=)
    POST   /api/activities              Log an activity
    GET    /api/summary                 Dashboard counts"#;

fn build_config(args: Args) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(Path::new(path))?,
        None => ServerConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = args.database_url {
        config.database_url = Some(url);
    }
    if let Some(secret) = args.jwt_secret {
        config.jwt_secret = Some(secret);
    }
    if let Some(secs) = args.sweep_interval_secs {
        config.sweep_interval_secs = secs;
    }
    if let Some(days) = args.token_ttl_days {
        config.token_ttl_days = days;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    } else if args.verbose {
        config.log_level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

async fn open_store(
    config: &ServerConfig,
) -> Result<Arc<dyn DataStore>, Box<dyn std::error::Error>> {
    match &config.database_url {
        Some(url) => {
            let store = PgDataStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("connected to PostgreSQL and applied migrations");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no database configured; data will be lost on shutdown");
            Ok(Arc::new(InMemoryDataStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = Args::from_command_line("USAGE: plantcared [OPTIONS]");

    if !free.is_empty() && free[0] == "help" {
        println!("{}", HELP_TEXT);
        return Ok(());
    }

    let config = build_config(args)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    let store = open_store(&config).await?;
    let auth = Arc::new(AuthService::new(
        &config.signing_secret(),
        config.token_ttl(),
    ));
    let clock = Arc::new(SystemClock);

    let sweep = OverdueSweep::new(Arc::clone(&store), clock.clone()).spawn(config.sweep_interval());
    tracing::info!(
        every_secs = config.sweep_interval_secs,
        "overdue sweep scheduled"
    );

    let app = create_router(AppState::new(store, auth, clock));

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;
    tracing::info!(address = %addr, "plantcared listening");

    let shutdown_signal = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "server error");
                sweep.abort();
                std::process::exit(1);
            }
        }
        () = shutdown_signal => {
            tracing::info!("shutdown signal received, stopping");
        }
    }

    sweep.abort();
    tracing::info!("plantcared stopped");
    Ok(())
}
