use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::Query, routing::get, Extension, Json, Router};
use serde::Deserialize;

use quay_bootstrap::config::{AppConfig, CliArgs};
use quay_bootstrap::wait_for_shutdown;
use quay_kit::{HostBootstrap, ServiceRegistry};
use token_auth::{TokenInspector, TokenIssuer, TOKEN_INSPECTOR, TOKEN_ISSUER};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// Ensure unit manifests are linked and registered via inventory
#[allow(dead_code)]
fn _ensure_units_linked() {
    let _ = std::any::type_name::<token_auth::BearerTokens>();
}

/// Quay Server - capability-composed web host
#[derive(Parser)]
#[command(name = "quay-server")]
#[command(about = "Quay Server - capability-composed web host")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration, bootstrap once, and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    _ensure_units_linked();

    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Layered config: defaults -> YAML (if provided) -> env (QUAY__*) -> CLI
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

fn bootstrap(config: AppConfig) -> HostBootstrap {
    HostBootstrap::from_config(config)
        .routes(auth_routes())
        .on_initialize(|ctx| {
            // System unit; configured libraries load on top of it.
            ctx.import_source::<token_auth::BearerTokens>();
            Ok(())
        })
}

async fn run_server(config: AppConfig) -> Result<()> {
    let host = bootstrap(config).run()?;

    tracing::info!(
        units = host.imported_units().len(),
        services = host.services().len(),
        "Quay Server starting"
    );
    if !host.report().is_clean() {
        for failure in &host.report().errors {
            tracing::warn!(module = failure.type_name, "module failed during bootstrap");
        }
    }

    let addr = host.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, host.into_router())
        .with_graceful_shutdown(async {
            if let Err(error) = wait_for_shutdown().await {
                tracing::error!(%error, "signal handler failed");
            }
        })
        .await?;

    tracing::info!("Quay Server stopped");
    Ok(())
}

fn check_config(config: AppConfig) -> Result<()> {
    let host = bootstrap(config).run()?;
    println!(
        "Configuration OK: {} unit(s), {} service(s), {} error(s)",
        host.imported_units().len(),
        host.services().len(),
        host.report().errors.len()
    );
    Ok(())
}

#[derive(Deserialize)]
struct IssueParams {
    subject: String,
}

async fn issue_token(
    Extension(services): Extension<Arc<ServiceRegistry>>,
    Query(params): Query<IssueParams>,
) -> Json<serde_json::Value> {
    let token = services
        .resolve::<Arc<dyn TokenIssuer>>(TOKEN_ISSUER)
        .map(|issuer| issuer.issue(&params.subject));
    Json(serde_json::json!({ "token": token }))
}

#[derive(Deserialize)]
struct InspectParams {
    token: String,
}

async fn inspect_token(
    Extension(services): Extension<Arc<ServiceRegistry>>,
    Query(params): Query<InspectParams>,
) -> Json<serde_json::Value> {
    let claims = services
        .resolve::<Arc<dyn TokenInspector>>(TOKEN_INSPECTOR)
        .and_then(|inspector| inspector.inspect(&params.token));
    match claims {
        Some(claims) => Json(serde_json::json!({
            "valid": true,
            "subject": claims.subject,
            "expires_at": claims.expires_at.to_rfc3339(),
        })),
        None => Json(serde_json::json!({ "valid": false })),
    }
}

fn auth_routes() -> Router {
    Router::new()
        .route("/auth/token", get(issue_token))
        .route("/auth/inspect", get(inspect_token))
}
