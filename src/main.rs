use acme_delegate::{Config, DynAccountStore, SharedConfig, SqliteStore};
use anyhow::{anyhow, Context, Result};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("acme-delegate".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let store = store_init(&config)?;

    let dns_servers = acme_delegate::dns::new(config.clone(), store.clone()).await?;
    tracing::info!("DNS listening on UDP {}", dns_servers.udp_addr);
    tracing::info!("DNS listening on TCP {}", dns_servers.tcp_addr);
    let dns_handle = tokio::spawn(dns_servers.block_until_done());

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = acme_delegate::api::new(config.clone(), store);
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(dns_res) = dns_handle => {
            if let Err(err) = dns_res {
                return Err(err.into())
            }
        }
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
                .unwrap_or_else(|_| "acme_delegate=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)
                .with_context(|| format!("loading config from {config_file}"))?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}

// Refuses to start on a store whose schema can't be brought up to date.
fn store_init(config: &Config) -> Result<DynAccountStore> {
    let store = SqliteStore::open(&config.database_path, config.database_busy_timeout)
        .with_context(|| format!("opening database {}", config.database_path))?;
    tracing::info!("using database {}", config.database_path);
    Ok(Arc::new(store))
}
