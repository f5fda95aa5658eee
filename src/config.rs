use std::path::{Path, PathBuf};
use std::time::Duration;

/// Favicon service queried with the bookmark's `scheme://host` appended.
pub const DEFAULT_FAVICON_ENDPOINT: &str = "http://www.google.com/s2/favicons?domain_url=";

/// Settings for opening a [`Store`](crate::store::Store).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file, created if missing.
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    pub favicon_endpoint: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: Self::default_database_path(),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            favicon_endpoint: DEFAULT_FAVICON_ENDPOINT.to_owned(),
        }
    }
}

impl StoreConfig {
    /// Default settings with the database stored at `path`.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            database_path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn with_favicon_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.favicon_endpoint = endpoint.into();
        self
    }

    /// Resolves `{data_dir}/bkm/bkm.db`, or `./bkm.db` when the platform has
    /// no data directory.
    fn default_database_path() -> PathBuf {
        match dirs::data_dir() {
            Some(dir) => dir.join("bkm").join("bkm.db"),
            None => PathBuf::from("bkm.db"),
        }
    }
}
