use super::retry::RetryPolicy;
use crate::error::Error;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::trace;

const USER_AGENT: &str = concat!("rt-archive/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
enum RequestError {
    Transport(reqwest::Error),
    Status(StatusCode),
    Decode(reqwest::Error),
}

impl RequestError {
    fn is_retryable(&self) -> bool {
        match self {
            RequestError::Transport(_) => true,
            RequestError::Status(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            RequestError::Decode(_) => false,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Transport(e) => write!(f, "request failed: {}", e),
            RequestError::Status(status) => write!(f, "unexpected status {}", status),
            RequestError::Decode(e) => write!(f, "malformed response body: {}", e),
        }
    }
}

/// Blocking JSON client shared by the paged sources.
pub struct JsonClient {
    client: Client,
    retry: RetryPolicy,
    source_name: String,
}

impl JsonClient {
    pub fn new(source_name: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::fetch(source_name, format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retry,
            source_name: source_name.to_string(),
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// GET `url` with `query`, retrying transient failures, and decode the body.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        trace!("GET {} {:?}", url, query);
        self.retry
            .run(
                || {
                    let response = self
                        .client
                        .get(url)
                        .query(query)
                        .send()
                        .map_err(RequestError::Transport)?;
                    let status = response.status();
                    if !status.is_success() {
                        return Err(RequestError::Status(status));
                    }
                    response.json::<T>().map_err(RequestError::Decode)
                },
                RequestError::is_retryable,
            )
            .map_err(|e| Error::fetch(&self.source_name, e.to_string()))
    }
}
