//! HTTP transport for tile downloads.
//!
//! Fetch workers run on blocking threads, so the transport is the blocking
//! `reqwest` client. The trait seam exists so tests can drive the pipeline
//! without a network.

use std::time::Duration;

use bytes::Bytes;
use tracing::trace;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Blocking HTTP GET capability.
pub trait HttpClient: Send + Sync {
    /// Fetch the body at `url`. Non-2xx responses are errors.
    fn get(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// [`HttpClient`] backed by `reqwest::blocking`, configured with the
/// pipeline's timeout and user-agent.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Client with default settings and an explicit timeout, for callers
    /// without a full [`FetchConfig`].
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        Self::new(&FetchConfig::default().with_http_timeout(timeout))
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        trace!(url, "tile request");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .bytes()
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;

    use bytes::Bytes;
    use parking_lot::Mutex;

    use crate::error::FetchError;

    use super::HttpClient;

    /// Scripted [`HttpClient`] for pipeline tests. Unscripted URLs answer
    /// with a 404.
    #[derive(Default)]
    pub struct MockHttpClient {
        responses: Mutex<HashMap<String, Result<Bytes, u16>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, url: &str, body: impl Into<Bytes>) {
            self.responses
                .lock()
                .insert(url.to_string(), Ok(body.into()));
        }

        pub fn fail_with_status(&self, url: &str, status: u16) {
            self.responses.lock().insert(url.to_string(), Err(status));
        }

        /// URLs requested so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().clone()
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> Result<Bytes, FetchError> {
            self.requests.lock().push(url.to_string());
            match self.responses.lock().get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(FetchError::Status(*status)),
                None => Err(FetchError::Status(404)),
            }
        }
    }
}
