use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zone_update::api::CredentialStore;
use zone_update::zone::DynUpdater;
use zone_update::{Config, SharedConfig, ZoneFileUpdater};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("zone-update".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let updater: DynUpdater = Arc::new(ZoneFileUpdater::new(&config));
    let credentials = Arc::new(CredentialStore::from_config(&config).await?);

    if config.test_mode {
        tracing::warn!("test mode: updates are written to the temp file only");
    }
    tracing::info!("updating zone file {}", config.zone_file.display());

    let mut hangup = signal::unix::signal(SignalKind::hangup())?;
    let reload_credentials = credentials.clone();
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            tracing::info!("received SIGHUP, reloading");
            match reload_credentials.reload().await {
                Ok(true) => tracing::info!("reloaded auth file"),
                Ok(false) => {}
                Err(err) => tracing::error!("failed to reload auth file: {err}"),
            }
        }
    });

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = zone_update::api::new(config.clone(), updater, credentials);
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zone_update=info,tower_http=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}
