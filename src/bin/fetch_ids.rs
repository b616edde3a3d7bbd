//! List every beer id on the catalog.beer API into a text file, one id per
//! line, ready for `fetch_beers`.

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

const CATALOG_API_BASE: &str = "https://api.catalog.beer/beer/";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "List beer ids from catalog.beer and save them to a file"
)]
struct Args {
    /// Output file, one beer id per line
    #[arg(long, default_value = "cb_beer_ids.txt")]
    out: PathBuf,
}

/// One page of the paginated beer listing. `data` is absent on malformed
/// replies; the pagination fields default to a final page.
#[derive(Debug, Deserialize)]
struct BeerListPage {
    data: Option<Vec<BeerRef>>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BeerRef {
    id: String,
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

    let client = Client::new();
    let ids = fetch_all_ids(&client, &auth, CATALOG_API_BASE).await?;

    let payload: String = ids.iter().map(|id| format!("{id}\n")).collect();
    tokio::fs::write(&args.out, payload)
        .await
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    info!(retrieved = ids.len(), out = %args.out.display(), "beer ids saved");
    Ok(())
}

/// Walk the cursor-paginated listing until the API reports no more pages.
/// A non-200 reply or a page without `data` ends the walk; ids collected up
/// to that point are kept. A `has_more` page that carries no cursor is
/// treated as final rather than refetching the first page.
async fn fetch_all_ids(client: &Client, auth: &str, base: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let url = match &cursor {
            Some(cursor) => format!("{base}?cursor={cursor}"),
            None => base.to_string(),
        };
        let res = client
            .get(&url)
            .header("Accept", "application/json")
            .header("Authorization", auth)
            .send()
            .await?;
        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "error fetching beer ids: {}", body);
            break;
        }
        let page: BeerListPage = res.json().await?;
        let Some(beers) = page.data else {
            warn!("unexpected response format");
            break;
        };
        ids.extend(beers.into_iter().map(|beer| beer.id));

        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            _ => break,
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::Mutex;

    /// Serves one canned response per connection, in order, recording each
    /// request head. Returns the base URL and the recorded heads.
    async fn canned_api(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let heads = Arc::new(Mutex::new(Vec::new()));
        let recorded = heads.clone();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 1 << 14];
                let mut read_total = 0;
                loop {
                    let n = socket.read(&mut buf[read_total..]).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    read_total += n;
                    if buf[..read_total].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&buf[..read_total]).to_string();
                recorded.lock().await.push(head);
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });
        (format!("http://{}/", addr), heads)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn page(ids: &[&str], next_cursor: Option<&str>) -> String {
        let data: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({ "id": id }))
            .collect();
        let mut body = serde_json::json!({ "data": data, "has_more": next_cursor.is_some() });
        if let Some(cursor) = next_cursor {
            body["next_cursor"] = serde_json::json!(cursor);
        }
        body.to_string()
    }

    fn test_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn follows_the_cursor_until_the_final_page() {
        let (base, heads) = canned_api(vec![
            http_response("200 OK", &page(&["cb-1", "cb-2"], Some("abc"))),
            http_response("200 OK", &page(&["cb-3"], None)),
        ])
        .await;

        let ids = fetch_all_ids(&test_client(), "Basic test-key:", &base)
            .await
            .unwrap();
        assert_eq!(ids, vec!["cb-1", "cb-2", "cb-3"]);

        let heads = heads.lock().await;
        assert_eq!(heads.len(), 2);
        assert!(heads[0].starts_with("GET / "));
        assert!(heads[1].starts_with("GET /?cursor=abc "));
        assert!(heads[0]
            .to_ascii_lowercase()
            .contains("authorization: basic test-key:"));
    }

    #[tokio::test]
    async fn keeps_collected_ids_when_a_page_fails() {
        let (base, _heads) = canned_api(vec![
            http_response("200 OK", &page(&["cb-1"], Some("abc"))),
            http_response("500 Internal Server Error", "{}"),
        ])
        .await;

        let ids = fetch_all_ids(&test_client(), "Basic test-key:", &base)
            .await
            .unwrap();
        assert_eq!(ids, vec!["cb-1"]);
    }

    #[tokio::test]
    async fn stops_on_a_page_without_data() {
        let (base, _heads) = canned_api(vec![
            http_response("200 OK", &page(&["cb-1"], Some("abc"))),
            http_response("200 OK", r#"{"status":"error"}"#),
        ])
        .await;

        let ids = fetch_all_ids(&test_client(), "Basic test-key:", &base)
            .await
            .unwrap();
        assert_eq!(ids, vec!["cb-1"]);
    }

    #[tokio::test]
    async fn treats_a_missing_cursor_as_the_final_page() {
        let body = r#"{"data":[{"id":"cb-1"}],"has_more":true}"#;
        let (base, heads) = canned_api(vec![http_response("200 OK", body)]).await;

        let ids = fetch_all_ids(&test_client(), "Basic test-key:", &base)
            .await
            .unwrap();
        assert_eq!(ids, vec!["cb-1"]);
        assert_eq!(heads.lock().await.len(), 1);
    }
}
