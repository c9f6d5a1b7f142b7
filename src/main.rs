use crate::config::{Cli, Config};
use crate::privilege::SystemIdentity;
use crate::registry::RegistryClient;
use crate::state::RunResult;
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::fmt::time::ChronoLocal;

mod bearer_token;
mod config;
mod container_runtime;
mod controller;
mod image_reference;
mod privilege;
mod registry;
mod state;

#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = Config::from(Cli::parse());

    // stdout is reserved for the ids of stale containers
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_writer(io::stderr)
        .init();
    info!("Starting dockerchk {}", env!("CARGO_PKG_VERSION"));

    match run(&config).await {
        Ok(result) => ExitCode::from(result.exit_code(config.signal_updates_via_exit_code)),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> anyhow::Result<RunResult> {
    let runtime = container_runtime::connect()?;
    let http_client = registry::create_client(&config.registry)?;
    let registry = RegistryClient::new(http_client, config.registry.clone());

    let mut stdout = io::stdout().lock();
    controller::run(config, runtime, &SystemIdentity, &registry, &mut stdout).await
}
