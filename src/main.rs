use std::sync::Arc;

use clap::Parser;

use quotebook::config::Config;
use quotebook::cooldown::RateLimiter;
use quotebook::daemon::{self, AppState};
use quotebook::error::Result;
use quotebook::store::QuoteStore;

#[derive(Parser, Debug)]
#[command(name = "quotebookd")]
#[command(about = "Quotebook daemon: quote store, voting, and JSON API")]
struct Cli {
    /// Optional JSON config file; defaults apply when omitted.
    #[arg(long, env = "QUOTEBOOK_CONFIG")]
    config: Option<String>,

    #[arg(long, env = "QUOTEBOOK_DB")]
    db: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long, env = "QUOTEBOOK_QUOTES_DIR")]
    quotes_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    quotebook::logging::init_tracing("quotebookd");
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::convention_defaults(),
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(quotes_dir) = cli.quotes_dir {
        config.quotes_dir = quotes_dir;
    }
    config.validate()?;

    let store = Arc::new(QuoteStore::new(&config.db_path).await?);
    store
        .ensure_seeded(&config.personalities, &config.quotes_dir)
        .await?;

    let limiter = Arc::new(RateLimiter::new(
        config.command_cooldown_secs,
        config.specific_cooldown_mins,
    ));

    let state = AppState {
        store,
        limiter,
        quotes_dir: config.quotes_dir.clone(),
    };
    daemon::run(&config.host, config.port, state).await
}
