//! Spreadsheet export client
//!
//! Fetches a sheet's CSV export over HTTP and parses it into a [`Grid`].
//! When a [`SheetCache`] is attached, fresh cached exports are used instead
//! of the network and successful fetches are written back.

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{Grid, SheetSource};
use crate::cache::{compute_key, SheetCache};

/// Export endpoint prefix for published spreadsheets
pub const DEFAULT_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";

/// Default bound on a single export request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header sent with export requests
pub const DEFAULT_USER_AGENT: &str = concat!("raidsheet/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur when fetching sheet data
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (connection, timeout, body read)
    #[error("Failed to fetch spreadsheet data: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Spreadsheet request to {url} returned HTTP {status}")]
    HttpStatus { status: u16, url: String },

    /// The export contained no rows
    #[error("Spreadsheet appears to be empty")]
    EmptySheet,

    /// The export was not valid CSV
    #[error("Error processing spreadsheet data: {0}")]
    ParseError(#[from] csv::Error),
}

impl FetchError {
    /// Whether retrying the same request later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RequestFailed(_) => true,
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            FetchError::EmptySheet | FetchError::ParseError(_) => false,
        }
    }
}

/// Client for fetching spreadsheet exports
#[derive(Debug)]
pub struct SheetClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Cache for fetched exports; `None` always fetches
    cache: Option<SheetCache>,
    /// Export URL prefix (allows override for testing)
    base_url: String,
}

impl SheetClient {
    /// Creates a client with the given request timeout and User-Agent
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            http_client,
            cache: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Attaches a cache to consult before and update after each fetch
    pub fn with_cache(mut self, cache: SheetCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Overrides the export URL prefix
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The export URL that will be requested for `source`
    pub fn export_url(&self, source: &SheetSource) -> String {
        source.export_url(&self.base_url)
    }

    /// Loads the sheet for `source`, from cache when fresh, and parses it
    ///
    /// # Behavior
    /// - A fresh cache entry that parses is returned without a network request
    /// - Otherwise the export is fetched, parsed, and only then stored
    /// - A failed cache write is logged and the fetched grid still returned
    pub async fn fetch_grid(&self, source: &SheetSource) -> Result<Grid, FetchError> {
        let url = self.export_url(source);
        let key = compute_key(&url);

        if let Some(grid) = self.load_cached(&key) {
            info!(url = %url, rows = grid.row_count(), "loaded data from cache");
            return Ok(grid);
        }

        info!(url = %url, "fetching fresh data");
        let content = self.fetch_from_network(&url).await?;
        let grid = parse_grid(&content)?;

        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.store_for(&key, &url, &content) {
                warn!(error = %e, "failed to save to cache");
            }
        }

        info!(
            rows = grid.row_count(),
            columns = grid.column_count(),
            "loaded data from spreadsheet"
        );
        Ok(grid)
    }

    /// Returns the cached grid for `key` if it is fresh and still parses
    fn load_cached(&self, key: &str) -> Option<Grid> {
        let content = self.cache.as_ref()?.load(key)?;
        match parse_grid(&content) {
            Ok(grid) => Some(grid),
            Err(e) => {
                debug!(key, error = %e, "ignoring unusable cached export");
                None
            }
        }
    }

    /// Fetches the export directly over HTTP
    async fn fetch_from_network(&self, url: &str) -> Result<String, FetchError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await?;
        debug!(bytes = text.len(), "received export");
        Ok(text)
    }
}

/// Parses an export, rejecting one with no rows
fn parse_grid(content: &str) -> Result<Grid, FetchError> {
    let grid = Grid::from_csv(content)?;
    if grid.is_empty() {
        return Err(FetchError::EmptySheet);
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, CacheError, CacheStore, DEFAULT_LIFETIME};
    use crate::data::TabSelector;
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CSV: &str = "Name,Role\nAlice,Tank\nBob,Healer\n";

    fn source() -> SheetSource {
        SheetSource::new("sheet123", TabSelector::Gid(0))
    }

    fn client_for(server: &MockServer) -> SheetClient {
        SheetClient::new(Duration::from_secs(5), DEFAULT_USER_AGENT)
            .unwrap()
            .with_base_url(server.uri())
    }

    async fn mount_csv(server: &MockServer, body: &str, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/sheet123/export"))
            .and(query_param("format", "csv"))
            .and(query_param("gid", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    /// Log output collected by a test subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Routes this thread's log events into a buffer until the guard drops
    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        (buffer, tracing::subscriber::set_default(subscriber))
    }

    /// A store whose writes always fail
    #[derive(Debug)]
    struct ReadOnlyStore;

    impl CacheStore for ReadOnlyStore {
        fn read(&self, _key: &str) -> Option<CacheEntry> {
            None
        }

        fn write(&self, key: &str, _entry: &CacheEntry) -> Result<(), CacheError> {
            Err(CacheError::InvalidKey(key.to_string()))
        }
    }

    #[test]
    fn test_is_retryable() {
        let status = |status| FetchError::HttpStatus {
            status,
            url: "u".into(),
        };
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!FetchError::EmptySheet.is_retryable());
    }

    #[test]
    fn test_export_url_uses_base() {
        let client = SheetClient::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT).unwrap();
        assert_eq!(
            client.export_url(&source()),
            "https://docs.google.com/spreadsheets/d/sheet123/export?format=csv&gid=0"
        );
    }

    #[tokio::test]
    async fn test_fetch_without_cache_parses_grid() {
        let server = MockServer::start().await;
        mount_csv(&server, CSV, 1).await;

        let grid = client_for(&server).fetch_grid(&source()).await.unwrap();

        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.cell("A2".parse().unwrap()), "Alice");
    }

    #[tokio::test]
    async fn test_uncached_client_fetches_every_time() {
        let server = MockServer::start().await;
        mount_csv(&server, CSV, 2).await;
        let client = client_for(&server);

        client.fetch_grid(&source()).await.unwrap();
        client.fetch_grid(&source()).await.unwrap();
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_network() {
        let server = MockServer::start().await;
        mount_csv(&server, CSV, 1).await;
        let temp_dir = TempDir::new().unwrap();
        let client = client_for(&server)
            .with_cache(SheetCache::with_dir(temp_dir.path(), DEFAULT_LIFETIME));

        let first = client.fetch_grid(&source()).await.unwrap();
        let second = client.fetch_grid(&source()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_prepopulated_cache_is_used() {
        let server = MockServer::start().await;
        mount_csv(&server, CSV, 0).await;
        let temp_dir = TempDir::new().unwrap();
        let cache = SheetCache::with_dir(temp_dir.path(), DEFAULT_LIFETIME);
        let client = client_for(&server);
        let url = client.export_url(&source());
        cache.store_for(&compute_key(&url), &url, "Cached\n").unwrap();

        let grid = client.with_cache(cache).fetch_grid(&source()).await.unwrap();

        assert_eq!(grid.cell("A1".parse().unwrap()), "Cached");
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let server = MockServer::start().await;
        mount_csv(&server, CSV, 2).await;
        let temp_dir = TempDir::new().unwrap();
        let client = client_for(&server)
            .with_cache(SheetCache::with_dir(temp_dir.path(), Duration::ZERO));

        client.fetch_grid(&source()).await.unwrap();
        client.fetch_grid(&source()).await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_not_fatal() {
        let server = MockServer::start().await;
        mount_csv(&server, CSV, 1).await;
        let client = client_for(&server)
            .with_cache(SheetCache::new(Box::new(ReadOnlyStore), DEFAULT_LIFETIME));
        let (logs, _guard) = capture_logs();

        let grid = client.fetch_grid(&source()).await.unwrap();
        assert_eq!(grid.row_count(), 3);

        let output = logs.contents();
        assert!(output.contains("WARN"), "expected a warning, got: {output}");
        assert!(output.contains("failed to save to cache"));
    }

    #[tokio::test]
    async fn test_successful_cache_write_logs_no_warning() {
        let server = MockServer::start().await;
        mount_csv(&server, CSV, 1).await;
        let temp_dir = TempDir::new().unwrap();
        let client = client_for(&server)
            .with_cache(SheetCache::with_dir(temp_dir.path(), DEFAULT_LIFETIME));
        let (logs, _guard) = capture_logs();

        client.fetch_grid(&source()).await.unwrap();

        assert!(!logs.contents().contains("WARN"));
    }

    #[tokio::test]
    async fn test_fetch_published_sheet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/e/2PACX-1vABC/pub"))
            .and(query_param("output", "csv"))
            .and(query_param("gid", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CSV))
            .expect(1)
            .mount(&server)
            .await;
        let source = SheetSource::published("2PACX-1vABC", TabSelector::Gid(3)).unwrap();

        let grid = client_for(&server).fetch_grid(&source).await.unwrap();
        assert_eq!(grid.cell("B3".parse().unwrap()), "Healer");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_grid(&source()).await.unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let temp_dir = TempDir::new().unwrap();
        let client = client_for(&server)
            .with_cache(SheetCache::with_dir(temp_dir.path(), DEFAULT_LIFETIME));

        assert!(client.fetch_grid(&source()).await.is_err());
        let key = compute_key(&client.export_url(&source()));
        assert!(!temp_dir.path().join(format!("{}.json", key)).exists());
    }

    #[tokio::test]
    async fn test_empty_export_is_an_error() {
        let server = MockServer::start().await;
        mount_csv(&server, "", 1).await;

        let temp_dir = TempDir::new().unwrap();
        let cache = SheetCache::with_dir(temp_dir.path(), DEFAULT_LIFETIME);
        let client = client_for(&server).with_cache(cache);

        let err = client.fetch_grid(&source()).await.unwrap_err();
        assert!(matches!(err, FetchError::EmptySheet));
        assert_eq!(std::fs::read_dir(temp_dir.path()).map(|d| d.count()).unwrap_or(0), 0);
    }

    #[tokio::test]
    async fn test_empty_cached_export_falls_back_to_network() {
        let server = MockServer::start().await;
        mount_csv(&server, CSV, 1).await;
        let temp_dir = TempDir::new().unwrap();
        let cache = SheetCache::with_dir(temp_dir.path(), DEFAULT_LIFETIME);
        let client = client_for(&server);
        let url = client.export_url(&source());
        cache.store_for(&compute_key(&url), &url, "").unwrap();

        let grid = client.with_cache(cache).fetch_grid(&source()).await.unwrap();
        assert_eq!(grid.row_count(), 3);
    }

    #[tokio::test]
    async fn test_connection_refused_is_retryable() {
        let client = SheetClient::new(Duration::from_secs(2), DEFAULT_USER_AGENT)
            .unwrap()
            .with_base_url("http://127.0.0.1:1");

        let err = client.fetch_grid(&source()).await.unwrap_err();
        assert!(matches!(err, FetchError::RequestFailed(_)));
        assert!(err.is_retryable());
    }
}
