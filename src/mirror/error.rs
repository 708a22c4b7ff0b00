//! Fatal errors for the mirror engine.
//!
//! Remote failures are never represented here: they are reduced to a
//! [`ResultStatus`](super::ResultStatus) where they happen. A `MirrorError`
//! means the destination or the process itself is unusable and the whole run
//! has to stop.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a mirror run.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Local filesystem failure (create directory, open, stat, truncate).
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path the operation was applied to.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The configured proxy URL was rejected.
    #[error("invalid proxy URL {proxy}: {source}")]
    InvalidProxy {
        /// The proxy as given by the user.
        proxy: String,
        /// The underlying parse error.
        #[source]
        source: reqwest::Error,
    },

    /// A network worker task panicked or was aborted.
    #[error("network worker for {url} did not finish: {source}")]
    Worker {
        /// The URL the worker was processing.
        url: String,
        /// The join failure.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl MirrorError {
    /// Creates a filesystem error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a client construction error.
    pub fn client_build(source: reqwest::Error) -> Self {
        Self::ClientBuild { source }
    }

    /// Creates an invalid proxy error.
    pub fn invalid_proxy(proxy: impl Into<String>, source: reqwest::Error) -> Self {
        Self::InvalidProxy {
            proxy: proxy.into(),
            source,
        }
    }

    /// Creates a worker failure error.
    pub fn worker(url: impl Into<String>, source: tokio::task::JoinError) -> Self {
        Self::Worker {
            url: url.into(),
            source,
        }
    }
}

// No `From<std::io::Error>`: every variant carries the path or URL it happened at.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_contains_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = MirrorError::io("/srv/mirror/pub", source);
        let msg = error.to_string();
        assert!(msg.contains("/srv/mirror/pub"), "Expected path in: {msg}");
        assert!(msg.contains("denied"), "Expected cause in: {msg}");
    }

    async fn explode() {
        panic!("boom");
    }

    #[tokio::test]
    async fn test_worker_error_display_contains_url() {
        let handle = tokio::spawn(explode());
        let join_error = handle.await.unwrap_err();
        let error = MirrorError::worker("http://e.f/e/", join_error);
        assert!(error.to_string().contains("http://e.f/e/"));
    }
}
