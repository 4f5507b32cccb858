use std::sync::Arc;

use clap::Parser;

pub mod config;
use config::{AppConfig, Args, ConfigError, load_config};
pub mod metrics;
use metrics::{MetricSchema, NAMESPACE};
pub mod probe;
use probe::prelude::*;
use probe::report;
pub mod registry;
use registry::{Registry, RegistryError};
pub mod server;
use server::{AppState, ServerError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

fn build_registry(config: &AppConfig) -> Result<Registry, StartupError> {
    let client = config::app_config::setup_client()?;
    let resolver = config::app_config::setup_resolver(&config.dns_servers, config.timeout)?;
    let prober = Prober::new(client, resolver);

    let timeout = Some(config.timeout);
    let probe_sets = vec![
        ProbeSet::new(ProbeVariant::Http, config.hosts.clone(), timeout),
        ProbeSet::new(ProbeVariant::Dns, config.hosts.clone(), timeout),
    ];

    let registry = Registry::new(MetricSchema::new(NAMESPACE), prober, probe_sets)?;
    for desc in registry.describe()? {
        log::debug!("Exporting {} {:?}", desc.fq_name, desc.variable_labels);
    }
    Ok(registry)
}

async fn run(args: Args) -> Result<(), StartupError> {
    let config = load_config(args)?;
    let registry = build_registry(&config)?;

    let listener = server::bind(config.listen_address).await?;
    log::info!(
        "Listening on {}, metrics at {}",
        config.listen_address,
        config.telemetry_path
    );

    let state = Arc::new(AppState {
        registry,
        telemetry_path: config.telemetry_path,
    });
    server::serve(listener, state).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()).await {
        log::error!("{}", report(&e));
        std::process::exit(1);
    }
}
