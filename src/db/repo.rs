use super::model::{Beer, Brewer};
use anyhow::Result;
use sqlx::SqlitePool;
use tracing::instrument;

pub type Pool = SqlitePool;

/// Upper bound on rows returned by a text search.
pub const SEARCH_LIMIT: i64 = 10;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    // Pass through non-sqlite schemes
    if !url.starts_with("sqlite:") {
        return url.to_string();
    }

    // In-memory URLs like sqlite::memory: or sqlite::memory:?cache=shared
    if url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    // Strip prefix and optional //
    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    // Separate query string if any
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        // nothing to normalize
        return url.to_string();
    }

    // Expand leading ~/ to HOME
    let expanded_path = if let Some(rest) = path_part.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            format!("{}/{}", home.trim_end_matches('/'), rest)
        } else {
            path_part.to_string()
        }
    } else {
        path_part.to_string()
    };

    // Ensure parent directory exists if any
    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    // Rebuild URL, prefer sqlite:// form
    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Substring search across name/style/description, bounded at `limit`.
/// SQLite's LIKE is case-insensitive for ASCII, so "ipa" matches "IPA".
/// An empty term is a substring of every non-NULL value and matches any row
/// with at least one of the three columns present. Results come back in
/// storage order; no sort is applied.
#[instrument(skip_all)]
pub async fn search_beers(pool: &Pool, term: &str, limit: i64) -> Result<Vec<Beer>> {
    let beers = sqlx::query_as::<_, Beer>(
        "SELECT id, name, style, description, abv, ibu, \
                bp_verified, brewer_verified, last_modified, brewer_id \
         FROM beers \
         WHERE name LIKE '%' || ? || '%' \
            OR style LIKE '%' || ? || '%' \
            OR description LIKE '%' || ? || '%' \
         LIMIT ?",
    )
    .bind(term)
    .bind(term)
    .bind(term)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(beers)
}

/// First row matching `term` under the same rule as [`search_beers`], or
/// `None` when nothing matches. Query faults surface as `Err`, keeping a
/// miss distinguishable from a broken store.
#[instrument(skip_all)]
pub async fn find_beer(pool: &Pool, term: &str) -> Result<Option<Beer>> {
    let beer = sqlx::query_as::<_, Beer>(
        "SELECT id, name, style, description, abv, ibu, \
                bp_verified, brewer_verified, last_modified, brewer_id \
         FROM beers \
         WHERE name LIKE '%' || ? || '%' \
            OR style LIKE '%' || ? || '%' \
            OR description LIKE '%' || ? || '%' \
         LIMIT 1",
    )
    .bind(term)
    .bind(term)
    .bind(term)
    .fetch_optional(pool)
    .await?;
    Ok(beer)
}

/// Insert a beer row, silently keeping the existing row on duplicate `id`.
#[instrument(skip_all)]
pub async fn upsert_beer(pool: &Pool, beer: &Beer) -> Result<()> {
    sqlx::query(
        "INSERT INTO beers (id, name, style, description, abv, ibu, \
                bp_verified, brewer_verified, last_modified, brewer_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO NOTHING",
    )
    .bind(&beer.id)
    .bind(&beer.name)
    .bind(&beer.style)
    .bind(&beer.description)
    .bind(beer.abv)
    .bind(beer.ibu)
    .bind(beer.bp_verified)
    .bind(beer.brewer_verified)
    .bind(beer.last_modified)
    .bind(&beer.brewer_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert a brewer row, silently keeping the existing row on duplicate `id`.
#[instrument(skip_all)]
pub async fn upsert_brewer(pool: &Pool, brewer: &Brewer) -> Result<()> {
    sqlx::query(
        "INSERT INTO brewers (id, name, description, short_description, url, \
                bp_verified, brewer_verified, facebook_url, twitter_url, \
                instagram_url, last_modified) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO NOTHING",
    )
    .bind(&brewer.id)
    .bind(&brewer.name)
    .bind(&brewer.description)
    .bind(&brewer.short_description)
    .bind(&brewer.url)
    .bind(brewer.bp_verified)
    .bind(brewer.brewer_verified)
    .bind(&brewer.facebook_url)
    .bind(&brewer.twitter_url)
    .bind(&brewer.instagram_url)
    .bind(brewer.last_modified)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn count_beers(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM beers")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn beer(id: &str, name: Option<&str>, style: Option<&str>, description: Option<&str>) -> Beer {
        Beer {
            id: Some(id.to_string()),
            name: name.map(str::to_string),
            style: style.map(str::to_string),
            description: description.map(str::to_string),
            abv: None,
            ibu: None,
            bp_verified: None,
            brewer_verified: None,
            last_modified: None,
            brewer_id: None,
        }
    }

    async fn seed_sample(pool: &Pool) {
        let rows = [
            beer(
                "b-1",
                Some("Sierra Nevada Pale Ale"),
                Some("American Pale Ale"),
                Some("Pine and citrus hops"),
            ),
            beer(
                "b-2",
                Some("Torpedo"),
                Some("Extra IPA"),
                Some("Assertive and bold"),
            ),
            beer("b-3", Some("Oatmeal Stout"), Some("Stout"), None),
            beer("b-4", None, None, Some("Hidden crisp ipa in prose")),
            beer("b-5", None, None, None),
        ];
        for row in &rows {
            upsert_beer(pool, row).await.unwrap();
        }
    }

    #[tokio::test]
    async fn search_matches_any_of_three_columns_case_insensitively() {
        let pool = setup_pool().await;
        seed_sample(&pool).await;

        let hits = search_beers(&pool, "ipa", SEARCH_LIMIT).await.unwrap();
        let ids: Vec<_> = hits.iter().filter_map(|b| b.id.as_deref()).collect();
        // "Extra IPA" via style, "Hidden crisp ipa in prose" via description.
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"b-2"));
        assert!(ids.contains(&"b-4"));

        let hits = search_beers(&pool, "SIERRA", SEARCH_LIMIT).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_deref(), Some("b-1"));
    }

    #[tokio::test]
    async fn empty_term_matches_rows_with_any_text_column() {
        let pool = setup_pool().await;
        seed_sample(&pool).await;

        let hits = search_beers(&pool, "", SEARCH_LIMIT).await.unwrap();
        let ids: Vec<_> = hits.iter().filter_map(|b| b.id.as_deref()).collect();
        // b-5 has NULL in all three columns and can never match.
        assert_eq!(ids.len(), 4);
        assert!(!ids.contains(&"b-5"));
    }

    #[tokio::test]
    async fn search_is_bounded_by_limit() {
        let pool = setup_pool().await;
        for i in 0..15 {
            upsert_beer(
                &pool,
                &beer(&format!("b-{i}"), Some("Lager"), None, None),
            )
            .await
            .unwrap();
        }

        let hits = search_beers(&pool, "lager", SEARCH_LIMIT).await.unwrap();
        assert_eq!(hits.len(), 10);
    }

    #[tokio::test]
    async fn find_beer_returns_none_on_miss() {
        let pool = setup_pool().await;
        seed_sample(&pool).await;

        let hit = find_beer(&pool, "torpedo").await.unwrap();
        assert_eq!(hit.unwrap().id.as_deref(), Some("b-2"));

        let miss = find_beer(&pool, "zzznonexistentzzz").await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn find_beer_surfaces_store_faults_as_errors() {
        let pool = setup_pool().await;
        seed_sample(&pool).await;
        pool.close().await;

        assert!(find_beer(&pool, "torpedo").await.is_err());
    }

    #[tokio::test]
    async fn upsert_keeps_first_row_on_duplicate_id() {
        let pool = setup_pool().await;
        upsert_beer(&pool, &beer("b-1", Some("First"), None, None))
            .await
            .unwrap();
        upsert_beer(&pool, &beer("b-1", Some("Second"), None, None))
            .await
            .unwrap();

        assert_eq!(count_beers(&pool).await.unwrap(), 1);
        let hit = find_beer(&pool, "first").await.unwrap();
        assert_eq!(hit.unwrap().name.as_deref(), Some("First"));
    }

    #[tokio::test]
    async fn upsert_brewer_dedupes_by_id() {
        let pool = setup_pool().await;
        let brewer = Brewer {
            id: Some("br-1".into()),
            name: Some("Sierra Nevada Brewing Co.".into()),
            description: None,
            short_description: Some("Chico, CA".into()),
            url: None,
            bp_verified: Some(true),
            brewer_verified: None,
            facebook_url: None,
            twitter_url: None,
            instagram_url: None,
            last_modified: Some(1_546_300_800),
        };
        upsert_brewer(&pool, &brewer).await.unwrap();
        upsert_brewer(&pool, &brewer).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM brewers")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
