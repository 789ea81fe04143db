//! Command-line and environment configuration

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

/// EasyHttp operator - runs simple HTTP applications from a single custom resource
#[derive(Parser, Debug)]
#[command(name = "easyhttp-operator", version, about, long_about = None)]
pub struct Cli {
    /// Print the EasyHttp CRD manifest and exit
    #[arg(long)]
    pub crd: bool,

    /// Controller settings
    #[command(flatten)]
    pub controller: ControllerArgs,

    /// Mode to run in
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Operator modes
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the EasyHttp controller (default mode)
    Controller,
}

/// Settings for the controller mode
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ControllerArgs {
    /// Only watch EasyHttp resources in this namespace (default: all namespaces)
    #[arg(long, global = true, env = "EASYHTTP_WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Seconds to wait before retrying a failed reconciliation
    #[arg(
        long,
        global = true,
        env = "EASYHTTP_RETRY_DELAY_SECS",
        default_value_t = 15
    )]
    pub retry_delay_secs: u64,

    /// Do not server-side-apply the EasyHttp CRD on startup
    #[arg(long, global = true, env = "EASYHTTP_SKIP_CRD_INSTALL")]
    pub skip_crd_install: bool,
}

impl ControllerArgs {
    /// Requeue delay for retryable reconciliation failures
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
