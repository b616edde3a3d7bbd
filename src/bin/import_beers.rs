//! Load a `beers.json` dump (as produced by `fetch_beers`) into the catalog
//! database, creating brewers then beers.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

use brewpair::config;
use brewpair::db;
use brewpair::db::{Beer, Brewer};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Import fetched beer objects into the catalog database"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Beer objects to import
    #[arg(long, default_value = "beers.json")]
    input: PathBuf,
}

/// One beer object as returned by the catalog.beer API. `id` and `name` are
/// always present upstream; everything else may be missing.
#[derive(Debug, Deserialize)]
struct CatalogBeer {
    id: String,
    name: String,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    abv: Option<f64>,
    #[serde(default)]
    ibu: Option<i64>,
    #[serde(default)]
    bp_verified: Option<bool>,
    #[serde(default)]
    brewer_verified: Option<bool>,
    #[serde(default)]
    last_modified: Option<i64>,
    #[serde(default)]
    brewer: Option<CatalogBrewer>,
}

#[derive(Debug, Deserialize)]
struct CatalogBrewer {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    short_description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    bp_verified: Option<bool>,
    #[serde(default)]
    brewer_verified: Option<bool>,
    #[serde(default)]
    facebook_url: Option<String>,
    #[serde(default)]
    twitter_url: Option<String>,
    #[serde(default)]
    instagram_url: Option<String>,
    #[serde(default)]
    last_modified: Option<i64>,
}

fn beer_row(beer: &CatalogBeer) -> Beer {
    Beer {
        id: Some(beer.id.clone()),
        name: Some(beer.name.clone()),
        style: beer.style.clone(),
        description: beer.description.clone(),
        abv: beer.abv,
        ibu: beer.ibu,
        bp_verified: beer.bp_verified,
        brewer_verified: beer.brewer_verified,
        last_modified: beer.last_modified,
        brewer_id: beer.brewer.as_ref().and_then(|b| b.id.clone()),
    }
}

fn brewer_row(brewer: &CatalogBrewer) -> Brewer {
    Brewer {
        id: brewer.id.clone(),
        name: brewer.name.clone(),
        description: brewer.description.clone(),
        short_description: brewer.short_description.clone(),
        url: brewer.url.clone(),
        bp_verified: brewer.bp_verified,
        brewer_verified: brewer.brewer_verified,
        facebook_url: brewer.facebook_url.clone(),
        twitter_url: brewer.twitter_url.clone(),
        instagram_url: brewer.instagram_url.clone(),
        last_modified: brewer.last_modified,
    }
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

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let content = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let beers: Vec<CatalogBeer> =
        serde_json::from_str(&content).context("invalid beer objects file")?;
    let total = beers.len();
    info!(total, "starting data insertion");

    let mut inserted_brewers: HashSet<String> = HashSet::new();
    for (i, beer) in beers.iter().enumerate() {
        if let Some(brewer) = &beer.brewer {
            if let Some(brewer_id) = &brewer.id {
                if inserted_brewers.insert(brewer_id.clone()) {
                    db::upsert_brewer(&pool, &brewer_row(brewer)).await?;
                }
            }
        }
        db::upsert_beer(&pool, &beer_row(beer)).await?;

        let done = i + 1;
        if done % 100 == 0 || done == total {
            info!(processed = done, total, "import progress");
        }
    }

    info!(
        beers = db::count_beers(&pool).await?,
        brewers = inserted_brewers.len(),
        "all data inserted"
    );
    Ok(())
}
