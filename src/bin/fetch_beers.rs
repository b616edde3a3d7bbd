//! Bulk-fetch beer objects from the catalog.beer API into a JSON file,
//! ready for `import_beers`.

use anyhow::{Context, Result};
use clap::Parser;
use futures::{future, stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

const CATALOG_API_BASE: &str = "https://api.catalog.beer/beer/";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fetch beer objects from catalog.beer by id and save them as JSON"
)]
struct Args {
    /// File with one beer id per line
    #[arg(long, default_value = "cb_beer_ids.txt")]
    ids: PathBuf,

    /// Output file for the fetched beer objects
    #[arg(long, default_value = "beers.json")]
    out: PathBuf,

    /// Number of requests in flight at once
    #[arg(long, default_value = "10")]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let api_key = std::env::var("CB_API_KEY").context("CB_API_KEY must be set")?;
    let auth = format!("Basic {}:", api_key);

    let ids_content = tokio::fs::read_to_string(&args.ids)
        .await
        .with_context(|| format!("failed to read {}", args.ids.display()))?;
    let beer_ids: Vec<String> = ids_content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    let total = beer_ids.len();
    info!(total, "fetching beer details");

    let client = Client::new();
    let beers: Vec<Value> = stream::iter(beer_ids)
        .map(|id| {
            let client = &client;
            let auth = auth.as_str();
            async move { fetch_beer(client, auth, &id).await }
        })
        .buffer_unordered(args.concurrency.max(1))
        .enumerate()
        .filter_map(|(i, beer)| {
            let done = i + 1;
            if done % 10 == 0 || done == total {
                info!(fetched = done, total, "fetch progress");
            }
            future::ready(beer)
        })
        .collect()
        .await;

    let payload = serde_json::to_string_pretty(&beers)?;
    tokio::fs::write(&args.out, payload)
        .await
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    info!(
        retrieved = beers.len(),
        out = %args.out.display(),
        "beer objects saved"
    );
    Ok(())
}

async fn fetch_beer(client: &Client, auth: &str, beer_id: &str) -> Option<Value> {
    let url = format!("{}{}", CATALOG_API_BASE, beer_id);
    let res = match client
        .get(&url)
        .header("Accept", "application/json")
        .header("Authorization", auth)
        .send()
        .await
    {
        Ok(res) => res,
        Err(err) => {
            warn!(%err, beer_id, "error fetching beer");
            return None;
        }
    };
    if res.status() != StatusCode::OK {
        warn!(status = %res.status(), beer_id, "failed to fetch beer");
        return None;
    }
    match res.json::<Value>().await {
        Ok(beer) => Some(beer),
        Err(err) => {
            warn!(%err, beer_id, "invalid beer payload");
            None
        }
    }
}
