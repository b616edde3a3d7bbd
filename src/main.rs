use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use brewpair::config;
use brewpair::db;
use brewpair::handlers::AppState;
use brewpair::server;
use brewpair::vision::{AnthropicClient, NameExtractor};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database.url.clone());

    // An unreachable store or a failed migration aborts startup outright.
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;
    info!(beers = db::count_beers(&pool).await?, "catalog ready");

    let vision: Arc<dyn NameExtractor> = Arc::new(AnthropicClient::new(&cfg.anthropic));
    let state = AppState { pool, vision };

    server::serve(&cfg.app.bind_addr, state).await
}
