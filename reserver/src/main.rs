//! `salegate` command line entry point.

use anyhow::Context;
use clap::Parser;
use salegate_core::environment::SystemClock;
use salegate_kide::KideClient;
use salegate_reserver::{
    run_until_finished, Cli, Config, Outcome, ReserverEnvironment, ReserverReducer, ReserverState,
    ReserverStore,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; TOKEN may come from the real environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salegate_reserver=info,salegate_runtime=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::from_cli(cli).context("Invalid configuration")?;

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let client = KideClient::with_http_client(http, &config.token)
        .with_api_url(&config.api_url)
        .with_user_agent(&config.user_agent);

    let environment = ReserverEnvironment::new(Arc::new(SystemClock), Arc::new(client))
        .with_gate(config.time_gate())
        .with_timing(config.retry_timing());

    let store: ReserverStore = ReserverStore::new(
        ReserverState::new(&config.product_id, config.agent_state()),
        ReserverReducer::new(),
        environment,
    );

    let outcome = tokio::select! {
        outcome = run_until_finished(&store, None) => {
            outcome.context("Reservation engine stopped")?
        },
        _ = signal::ctrl_c() => {
            info!("Interrupted, no reservation made");
            return Ok(ExitCode::from(130));
        },
    };

    Ok(report(&outcome))
}

fn report(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Succeeded {
            variant_name,
            quantity,
        } => {
            info!("Success, reserved {quantity} ticket(s) of '{variant_name}'");
            ExitCode::SUCCESS
        },
        Outcome::Exhausted => {
            info!("No ticket this time");
            ExitCode::SUCCESS
        },
        Outcome::Fatal { reason } => {
            error!("{reason}");
            ExitCode::FAILURE
        },
    }
}
