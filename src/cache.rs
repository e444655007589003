//! `CacheLayer` (spec §4.5): an opaque key-value store with two keying
//! schemes (tree key vs non-tree key), `GetWithMetadata`, and a
//! fire-and-forget `PutWithRetry`.
//!
//! Grounded on the teacher's `link_index` SQLite/`sqlx` pool setup (WAL
//! journal mode, bounded connection pool, idempotent `CREATE TABLE IF NOT
//! EXISTS` migration) and `content_saver::cache_check`'s gzip-compressed
//! cache-value idea, adapted from a `GzDecoder`-over-file check to a single
//! `flate2` round-trip over a SQLite BLOB column.

use std::time::Duration;

use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use xxhash_rust::xxh3::xxh3_64;

use crate::config::{FetchOptions, LinkExtractionOptions, LinksOptions, LinksOrder};
use crate::error::LinksError;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    written_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);
"#;

/// Side metadata returned alongside a cached value (spec §4.5 `GetWithMetadata`).
#[derive(Debug, Clone, Copy)]
pub struct CacheSideMetadata {
    pub written_at_unix: i64,
    pub expires_at_unix: i64,
}

pub struct CacheLayer {
    pool: SqlitePool,
}

impl CacheLayer {
    /// Opens (creating if missing) a SQLite-backed cache at `db_path`.
    ///
    /// # Errors
    /// Returns an error if the pool can't connect or the schema migration fails.
    pub async fn open(db_path: &std::path::Path) -> Result<Self, sqlx::Error> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new().max_connections(4).connect_with(options).await?;
        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// `GetWithMetadata(key) -> {value, sideMetadata}?` (spec §4.5).
    ///
    /// Cache read failures are logged and treated as a miss, never fatal
    /// (spec §7 "logged and ignored: cache read/write failures").
    pub async fn get_with_metadata<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Option<(T, CacheSideMetadata)> {
        let row: Option<(Vec<u8>, i64, i64)> = sqlx::query_as(
            "SELECT value, written_at, expires_at FROM cache_entries WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "cache read failed, proceeding without cache");
            None
        })?;

        let (compressed, written_at, expires_at) = row;

        let now = chrono::Utc::now().timestamp();
        if expires_at <= now {
            return None;
        }

        let value = decompress_json(&compressed).ok()?;
        Some((value, CacheSideMetadata { written_at_unix: written_at, expires_at_unix: expires_at }))
    }

    /// `PutWithRetry(key, value, {ttl, sideMetadata})` (spec §4.5).
    ///
    /// Fire-and-forget: spawns the write (with at-most-one jittered retry)
    /// and returns immediately. Failures are logged, never surfaced to the caller.
    pub fn put_with_retry<T: Serialize + Send + 'static>(&self, key: String, value: &T, ttl: Duration) {
        let Ok(compressed) = compress_json(value) else {
            tracing::warn!(key, "failed to serialize cache value, skipping write");
            return;
        };

        let pool = self.pool.clone();
        let ttl_secs = ttl.as_secs() as i64;

        tokio::spawn(async move {
            let now = chrono::Utc::now().timestamp();
            let expires_at = now + ttl_secs;

            for attempt in 0..2 {
                let result = sqlx::query(
                    "INSERT INTO cache_entries (key, value, written_at, expires_at) VALUES (?, ?, ?, ?)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, written_at = excluded.written_at, expires_at = excluded.expires_at",
                )
                .bind(&key)
                .bind(&compressed)
                .bind(now)
                .bind(expires_at)
                .execute(&pool)
                .await;

                match result {
                    Ok(_) => return,
                    Err(e) if attempt == 0 => {
                        let jitter_ms = rand::rng().random_range(50..=250);
                        tracing::debug!(key, error = %e, "cache write failed, retrying after jitter");
                        tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
                    }
                    Err(e) => {
                        tracing::warn!(key, error = %e, "cache write failed after retry, giving up");
                    }
                }
            }
        });
    }
}

fn compress_json<T: Serialize>(value: &T) -> std::io::Result<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let json = serde_json::to_vec(value)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    encoder.finish()
}

fn decompress_json<T: DeserializeOwned>(compressed: &[u8]) -> std::io::Result<T> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut decoder = GzDecoder::new(compressed);
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;
    serde_json::from_slice(&json).map_err(std::io::Error::from)
}

/// `Tree key = stable hash over normalize(rootURL) ++ shape-affecting options` (spec §4.5).
///
/// Content options that don't affect tree shape (`cleanedHtml`, `metadata`)
/// deliberately do not participate.
#[must_use]
pub fn tree_key(root_url: &str, options: &LinksOptions) -> String {
    let shape = ShapeKey {
        root_url,
        subdomain_as_root_url: options.subdomain_as_root_url(),
        is_platform_url: options.is_platform_url_flag(),
        folder_first: options.folder_first(),
        links_order: options.links_order(),
        include_extracted_links: options.extracted_links(),
        link_extraction_options: options.link_extraction_options(),
    };
    hash_key("tree", &shape)
}

/// `Non-tree key = stable hash over the entire normalized option set` (spec §4.5).
#[must_use]
pub fn non_tree_key(options: &LinksOptions) -> String {
    let all = NonTreeKey {
        url: options.url().as_str(),
        tree: options.tree(),
        extracted_links: options.extracted_links(),
        metadata: options.metadata(),
        cleaned_html: options.cleaned_html(),
        robots: options.robots(),
        sitemap_xml: options.sitemap_xml(),
        subdomain_as_root_url: options.subdomain_as_root_url(),
        is_platform_url: options.is_platform_url_flag(),
        folder_first: options.folder_first(),
        links_order: options.links_order(),
        link_extraction_options: options.link_extraction_options(),
        fetch_options: options.fetch_options(),
    };
    hash_key("non-tree", &all)
}

#[derive(serde::Serialize)]
struct ShapeKey<'a> {
    root_url: &'a str,
    subdomain_as_root_url: bool,
    is_platform_url: bool,
    folder_first: bool,
    links_order: LinksOrder,
    include_extracted_links: bool,
    link_extraction_options: LinkExtractionOptions,
}

#[derive(serde::Serialize)]
struct NonTreeKey<'a> {
    url: &'a str,
    tree: bool,
    extracted_links: bool,
    metadata: bool,
    cleaned_html: bool,
    robots: bool,
    sitemap_xml: bool,
    subdomain_as_root_url: bool,
    is_platform_url: bool,
    folder_first: bool,
    links_order: LinksOrder,
    link_extraction_options: LinkExtractionOptions,
    fetch_options: &'a FetchOptions,
}

fn hash_key<T: Serialize>(prefix: &str, value: &T) -> String {
    let canonical = serde_json::to_vec(value).unwrap_or_default();
    let digest = xxh3_64(&canonical);
    format!("{prefix}:{digest:016x}", digest = digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(url: &str) -> LinksOptions {
        crate::config::LinksOptionsBuilder::new().url(url).build().unwrap()
    }

    #[test]
    fn tree_key_is_stable_for_identical_shape_options() {
        let a = opts("https://h/a");
        let b = opts("https://h/b"); // different target, same shape-affecting fields
        assert_eq!(tree_key("https://h/", &a), tree_key("https://h/", &b));
    }

    #[test]
    fn tree_key_changes_with_links_order() {
        let mut a = opts("https://h/a");
        let b = a.clone();
        let _ = &b;
        let key_a = tree_key("https://h/", &a);
        a = crate::config::LinksOptionsBuilder::new()
            .url("https://h/a")
            .links_order(LinksOrder::Alphabetical)
            .build()
            .unwrap();
        let key_b = tree_key("https://h/", &a);
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn non_tree_key_differs_on_content_only_flags() {
        let a = opts("https://h/a");
        let b = crate::config::LinksOptionsBuilder::new().url("https://h/a").metadata(true).build().unwrap();
        assert_ne!(non_tree_key(&a), non_tree_key(&b));
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheLayer::open(&dir.path().join("cache.sqlite")).await.unwrap();

        #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
        struct Payload {
            value: String,
        }

        let payload = Payload { value: "hello".to_string() };
        cache.put_with_retry("k1".to_string(), &payload, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let result: Option<(Payload, CacheSideMetadata)> = cache.get_with_metadata("k1").await;
        assert_eq!(result.unwrap().0, payload);
    }
}
