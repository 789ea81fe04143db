//! EasyHttp Operator - runs simple HTTP applications from a single custom resource

use anyhow::Context as _;
use clap::Parser;
use kube::Client;

use easyhttp_common::telemetry::{init_telemetry, TelemetryConfig};
use easyhttp_common::FIELD_MANAGER;
use easyhttp_operator::config::{Cli, Commands, ControllerArgs};
use easyhttp_operator::controller_runner::build_controller;
use easyhttp_operator::startup::{crd_yaml, ensure_crd_installed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        println!("{}", crd_yaml()?);
        return Ok(());
    }

    let _telemetry = init_telemetry(TelemetryConfig::from_env(FIELD_MANAGER))
        .context("failed to initialize telemetry")?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.controller).await,
    }
}

async fn run_controller(args: ControllerArgs) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    if args.skip_crd_install {
        tracing::info!("skipping CRD installation");
    } else {
        ensure_crd_installed(&client).await?;
    }

    tracing::info!(
        namespace = ?args.namespace,
        retry_delay_secs = args.retry_delay_secs,
        "starting EasyHttp controller"
    );
    build_controller(client, &args).await;
    tracing::info!("controller shut down");

    Ok(())
}
