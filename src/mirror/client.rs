//! HTTP client shared by every listing fetch and file transfer.
//!
//! The client is built once and cloned into each network worker; clones share
//! the connection pool. Every request carries the configured Basic credentials.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::RANGE;
use reqwest::{Client, Method, Proxy, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::MirrorError;
use crate::user_agent;

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings for [`MirrorClient::new`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Basic credentials sent with every request, if any.
    pub credentials: Option<Credentials>,
    /// Proxy URL applied to all schemes; system proxies are used when `None`.
    pub proxy: Option<String>,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Idle timeout between reads on an open connection.
    pub read_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            proxy: None,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

/// A fetched listing page.
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// Response status.
    pub status: StatusCode,
    /// Response body, decoded to text.
    pub body: String,
}

/// Authenticated HTTP client for mirror requests.
#[derive(Debug, Clone)]
pub struct MirrorClient {
    client: Client,
    credentials: Option<Arc<Credentials>>,
}

impl MirrorClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::InvalidProxy`] for an unusable proxy URL and
    /// [`MirrorError::ClientBuild`] if the TLS backend cannot be initialised.
    #[instrument(level = "debug", skip(config), fields(proxy = ?config.proxy))]
    pub fn new(config: &ClientConfig) -> Result<Self, MirrorError> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(user_agent::default_user_agent());

        if let Some(proxy) = &config.proxy {
            let resolved = Proxy::all(proxy.as_str())
                .map_err(|e| MirrorError::invalid_proxy(proxy.clone(), e))?;
            builder = builder.proxy(resolved);
        }

        let client = builder.build().map_err(MirrorError::client_build)?;
        debug!(
            authenticated = config.credentials.is_some(),
            "HTTP client ready"
        );

        Ok(Self {
            client,
            credentials: config.credentials.clone().map(Arc::new),
        })
    }

    /// Sends a `HEAD` request.
    ///
    /// # Errors
    ///
    /// Returns the transport error if no response was received.
    pub async fn head(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.request(Method::HEAD, url).send().await
    }

    /// Sends a `GET` request, asking for the bytes from `range_from` onward when given.
    ///
    /// # Errors
    ///
    /// Returns the transport error if no response was received.
    pub async fn get(&self, url: &str, range_from: Option<u64>) -> Result<Response, reqwest::Error> {
        let mut request = self.request(Method::GET, url);
        if let Some(offset) = range_from {
            request = request.header(RANGE, format!("bytes={offset}-"));
        }
        request.send().await
    }

    /// Fetches a listing page and reads its whole body.
    ///
    /// `query` is appended to the request URL only; it never becomes part of
    /// the base used to resolve links.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the request or the body read fails.
    pub async fn fetch_listing(
        &self,
        url: &str,
        query: Option<&str>,
    ) -> Result<ListingPage, reqwest::Error> {
        let request_url = match query {
            Some(query) if !query.is_empty() => format!("{url}?{query}"),
            _ => url.to_string(),
        };
        let response = self.get(&request_url, None).await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(ListingPage { status, body })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_timeouts() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(300));
        assert!(config.credentials.is_none());
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("alice", "s3cret");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"), "password leaked: {rendered}");
    }

    #[test]
    fn test_client_builds_with_valid_proxy() {
        let config = ClientConfig {
            proxy: Some("http://10.0.0.1:1234".to_string()),
            ..ClientConfig::default()
        };
        assert!(MirrorClient::new(&config).is_ok());
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let config = ClientConfig {
            proxy: Some("http://proxy.invalid:99999".to_string()),
            ..ClientConfig::default()
        };
        let result = MirrorClient::new(&config);
        assert!(matches!(result, Err(MirrorError::InvalidProxy { .. })));
    }
}
