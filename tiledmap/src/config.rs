//! Fetch pipeline configuration.
//!
//! Bundles the disk cache location and the network constants. The defaults
//! reproduce the behavior of the classic tile clients this engine models:
//! a two-day disk TTL and a 15 second request timeout.

use std::path::PathBuf;
use std::time::Duration;

/// Default time-to-live for disk-cached tiles.
pub const DEFAULT_DISK_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Default user-agent sent with tile requests.
pub const DEFAULT_USER_AGENT: &str = "Windows-RSS-Platform/1.0 (MSIE 7.0; Windows NT 5.1)";

/// Configuration for a [`FetchPipeline`](crate::fetch::FetchPipeline).
///
/// Each tile source gets its own subdirectory under `cache_dir`, named
/// after the source, so that providers never collide on disk.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Root directory for the disk tile cache.
    pub cache_dir: PathBuf,

    /// Age after which a disk-cached tile is considered stale and re-fetched.
    pub disk_ttl: Duration,

    /// Timeout applied to every tile HTTP request.
    pub http_timeout: Duration,

    /// User-agent string sent with every tile HTTP request.
    pub user_agent: String,
}

impl FetchConfig {
    /// Create a config rooted at the given cache directory with default
    /// TTL, timeout, and user-agent.
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            disk_ttl: DEFAULT_DISK_TTL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the disk TTL.
    pub fn with_disk_ttl(mut self, ttl: Duration) -> Self {
        self.disk_ttl = ttl;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the user-agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("tiledmap-cache"))
    }
}
