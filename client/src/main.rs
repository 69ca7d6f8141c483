//! Dispatch Client - monitor and control an ambulance dispatch simulation
//!
//! Connects to the dispatch service over HTTP and offers:
//! - A line console (default)
//! - A terminal dashboard (`--dashboard`, requires the `dashboard` feature)

use anyhow::Result;
use clap::Parser;
use dispatch_core::{ClientConfig, ConfigInput, LifecycleController, Session};
use dispatch_env::{HttpBackend, TokioContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod app;
mod console;

use app::App;

/// Ambulance dispatch simulation client
#[derive(Parser, Debug)]
#[command(name = "dispatch-client")]
#[command(about = "Monitor and control an ambulance dispatch simulation", long_about = None)]
struct Args {
    /// Base URL of the dispatch service
    #[arg(short, long, default_value = "http://localhost:8080")]
    backend_url: String,

    /// Status poll interval in milliseconds
    #[arg(long, default_value = "2000")]
    poll_interval_ms: u64,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    /// Maximum number of locations drawn on the map
    #[arg(long, default_value = "20")]
    max_nodes: usize,

    /// Initial number of locations
    #[arg(long)]
    points: Option<String>,

    /// Initial number of hospitals
    #[arg(long)]
    hospitals: Option<String>,

    /// Initial number of ambulances
    #[arg(long)]
    ambulances: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Run the terminal dashboard instead of the console
    #[cfg(feature = "dashboard")]
    #[arg(long)]
    dashboard: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so console output stays readable
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ClientConfig::default()
        .with_backend_url(args.backend_url)
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms.max(1)))
        .with_request_timeout(Duration::from_millis(args.timeout_ms))
        .with_max_nodes(args.max_nodes);

    let backend = Arc::new(HttpBackend::new(config.backend_url.clone(), config.request_timeout)?);
    let controller = LifecycleController::new(
        TokioContext::shared(),
        backend,
        Session::shared(),
        config.poll_interval,
    );
    let input = ConfigInput {
        points: args.points,
        hospitals: args.hospitals,
        ambulances: args.ambulances,
    };
    let app = App::new(controller, input, &config);

    info!(
        session = %app.controller().session().id(),
        backend = %config.backend_url,
        poll_ms = config.poll_interval.as_millis() as u64,
        "dispatch client ready"
    );

    #[cfg(feature = "dashboard")]
    {
        if args.dashboard {
            return app::run_dashboard(app).await;
        }
    }

    app::run_console(app).await
}
