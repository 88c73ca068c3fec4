mod cache;
mod catalog;
mod commands;
mod config;
mod logging;
mod query;
mod session;

#[cfg(test)]
mod testsupport;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

use crate::cache::{CacheLayer, NoopStorage};
use crate::catalog::{CachedCatalogClient, CatalogClient};

#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(about = "A terminal client for a movie catalog")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/reel/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Catalog API base URL
  #[arg(long)]
  api_url: Option<String>,

  /// Skip the response cache for this invocation
  #[arg(long)]
  no_cache: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override the API endpoint if specified on the command line
  let config = if let Some(url) = args.api_url {
    config::Config {
      api: config::ApiConfig { url },
      ..config
    }
  } else {
    config
  };

  let session = session::Session::load()?;

  if args.no_cache {
    let client = CatalogClient::new(&config, session.clone())?;
    let client = CachedCatalogClient::with_cache(client, CacheLayer::new(NoopStorage));
    commands::run(args.command, &client, &session, config.page_size).await
  } else {
    let client = CachedCatalogClient::new(&config, session.clone())?;
    commands::run(args.command, &client, &session, config.page_size).await
  }
}
