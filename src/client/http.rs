// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP transport for the Delta Sharing REST API.
//!
//! This module provides a low-level HTTP client with:
//! - Connection pooling
//! - Automatic retry with capped exponential backoff
//! - Bearer token authentication
//! - Configurable timeouts and cancellation
//!
//! Responses come back either as a header map (HEAD) or as the body split
//! into newline-delimited records.

use crate::auth::AuthProvider;
use crate::client::retry::{AttemptError, RetryPolicy};
use crate::error::{is_retryable_status, Error, Result};
use crate::profile::Profile;
use crate::types::sharing::{PageRequest, QueryTableRequest};
use bytes::Bytes;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Content type sent with every sharing server request.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Deadline for a whole request, including reading the body.
    pub request_timeout: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retry attempts (doubles each retry).
    pub retry_delay: Duration,
    /// Cap on the delay between retry attempts.
    pub max_retry_delay: Duration,
    /// Maximum number of idle connections per host.
    pub max_connections_per_host: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            max_retries: 5,
            retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(10),
            max_connections_per_host: 100,
            user_agent: format!("delta-sharing-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.retry_delay,
            max_delay: self.max_retry_delay.max(self.retry_delay),
        }
    }
}

/// HTTP client bound to one sharing server endpoint.
///
/// Paths passed to the request methods are relative to the profile endpoint
/// (e.g. `/shares`). Presigned data-file URLs go through [`download`], which
/// never sends the bearer token.
///
/// [`download`]: SharingHttpClient::download
#[derive(Debug)]
pub struct SharingHttpClient {
    client: Client,
    config: HttpClientConfig,
    base_url: String,
    auth_provider: Arc<dyn AuthProvider>,
}

impl SharingHttpClient {
    /// Creates a new HTTP client for `profile`'s endpoint.
    pub fn new(
        config: HttpClientConfig,
        profile: &Profile,
        auth_provider: Arc<dyn AuthProvider>,
    ) -> Result<Self> {
        profile.validate()?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                Error::invalid_argument(
                    "create_http_client",
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            config,
            base_url: profile.base_url().to_string(),
            auth_provider,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Endpoint all request paths are relative to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Simple GET without retry.
    pub async fn get(
        &self,
        op: &'static str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Bytes>> {
        let body = self
            .execute_body(op, path, RetryPolicy::none(), cancel, || {
                self.request(Method::GET, path)
            })
            .await?;
        Ok(split_records(body))
    }

    /// GET a list endpoint with pagination parameters; retried.
    pub async fn get_with_retry(
        &self,
        op: &'static str,
        path: &str,
        page: &PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Bytes>> {
        self.get_with_query(op, path, &page.query_pairs(), cancel)
            .await
    }

    /// GET with arbitrary query parameters; retried.
    pub async fn get_with_query(
        &self,
        op: &'static str,
        path: &str,
        query: &[(&'static str, String)],
        cancel: &CancellationToken,
    ) -> Result<Vec<Bytes>> {
        let body = self
            .execute_body(op, path, self.config.retry_policy(), cancel, || {
                self.request(Method::GET, path).map(|b| b.query(query))
            })
            .await?;
        Ok(split_records(body))
    }

    /// HEAD request; returns the response headers. Retried.
    pub async fn head(
        &self,
        op: &'static str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<HeaderMap> {
        self.config
            .retry_policy()
            .run(op, path, cancel, |attempt| async move {
                let response = self
                    .send(op, path, attempt, self.request(Method::HEAD, path))
                    .await?;
                Ok(response.headers().clone())
            })
            .await
    }

    /// POST a table query; retried.
    pub async fn post_query(
        &self,
        op: &'static str,
        path: &str,
        body: &QueryTableRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Bytes>> {
        let payload = serde_json::to_vec(body).map_err(|e| {
            Error::invalid_argument(op, format!("failed to encode query request: {}", e))
        })?;

        let body = self
            .execute_body(op, path, self.config.retry_policy(), cancel, || {
                self.request(Method::POST, path)
                    .map(|b| b.body(payload.clone()))
            })
            .await?;
        Ok(split_records(body))
    }

    /// Download a presigned data-file URL. No auth header is sent; the URL
    /// carries its own credentials. Retried.
    pub async fn download(
        &self,
        op: &'static str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        // Logs and errors name the object, never the signature.
        let display = url.split('?').next().unwrap_or(url);
        self.execute_body(op, display, self.config.retry_policy(), cancel, || {
            Ok(self.client.request(Method::GET, url))
        })
        .await
    }

    /// Builds an authenticated request for a path under the endpoint.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let auth_header = self.auth_provider.get_auth_header()?;
        Ok(self
            .client
            .request(method, self.url(path))
            .header(AUTHORIZATION, auth_header)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE))
    }

    /// Run a request under `policy`, reading the full body inside each attempt
    /// so a truncated body is retried like any other transport failure.
    async fn execute_body<B>(
        &self,
        op: &'static str,
        path: &str,
        policy: RetryPolicy,
        cancel: &CancellationToken,
        build: B,
    ) -> Result<Bytes>
    where
        B: Fn() -> Result<RequestBuilder>,
    {
        policy
            .run(op, path, cancel, |attempt| {
                let builder = build();
                async move {
                    let response = self.send(op, path, attempt, builder).await?;
                    response.bytes().await.map_err(|e| {
                        AttemptError::retryable(Error::Transport {
                            op,
                            path: path.to_string(),
                            source: e.without_url(),
                        })
                    })
                }
            })
            .await
    }

    /// One attempt: send, then turn a non-success status into an error.
    async fn send(
        &self,
        op: &'static str,
        path: &str,
        attempt: u32,
        builder: Result<RequestBuilder>,
    ) -> std::result::Result<Response, AttemptError> {
        let builder = builder.map_err(AttemptError::fatal)?;

        debug!(
            "{} {} (attempt {}/{})",
            op,
            path,
            attempt,
            self.config.max_retries + 1
        );

        let response = builder.send().await.map_err(|e| {
            let retryable = Self::is_retryable_error(&e);
            // reqwest prints the full URL, signature included; `path` already
            // names the request.
            AttemptError {
                error: Error::Transport {
                    op,
                    path: path.to_string(),
                    source: e.without_url(),
                },
                retryable,
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let status = status.as_u16();
        Err(AttemptError {
            error: Error::HttpStatus {
                op,
                path: path.to_string(),
                status,
                attempts: attempt,
                body,
            },
            retryable: is_retryable_status(status),
        })
    }

    /// A request error is retryable when no response was received.
    fn is_retryable_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
    }
}

/// Split a response body into newline-delimited records. A trailing `\r` is
/// stripped and blank lines are discarded.
pub fn split_records(body: Bytes) -> Vec<Bytes> {
    let mut records = Vec::new();
    let mut start = 0;
    while start < body.len() {
        let end = body[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| start + i)
            .unwrap_or(body.len());

        let mut line_end = end;
        if line_end > start && body[line_end - 1] == b'\r' {
            line_end -= 1;
        }
        let line = body.slice(start..line_end);
        if !line.iter().all(u8::is_ascii_whitespace) {
            records.push(line);
        }
        start = end + 1;
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerToken;

    fn test_client(endpoint: &str) -> SharingHttpClient {
        let profile = Profile::new(endpoint, "test-token");
        let auth = Arc::new(BearerToken::from_profile(&profile));
        SharingHttpClient::new(HttpClientConfig::default(), &profile, auth).unwrap()
    }

    #[test]
    fn test_http_client_config_default() {
        let config = HttpClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_connections_per_host, 100);
        assert!(config.user_agent.starts_with("delta-sharing-rs/"));

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_retry_policy_cap_never_below_base() {
        let config = HttpClientConfig {
            retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(config.retry_policy().max_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_split_records() {
        let body = Bytes::from_static(b"{\"a\":1}\n\n{\"b\":2}\r\n   \n{\"c\":3}");
        let records = split_records(body);
        assert_eq!(
            records,
            vec![
                Bytes::from_static(b"{\"a\":1}"),
                Bytes::from_static(b"{\"b\":2}"),
                Bytes::from_static(b"{\"c\":3}"),
            ]
        );

        assert!(split_records(Bytes::new()).is_empty());
        assert!(split_records(Bytes::from_static(b"\n\n")).is_empty());
        assert_eq!(split_records(Bytes::from_static(b"x\n")).len(), 1);
    }

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = test_client("https://sharing.example.com/delta-sharing/");
        assert_eq!(client.base_url(), "https://sharing.example.com/delta-sharing");
        assert_eq!(
            client.url("/shares"),
            "https://sharing.example.com/delta-sharing/shares"
        );
    }

    #[tokio::test]
    async fn test_download_error_omits_signature() {
        let client = SharingHttpClient::new(
            HttpClientConfig {
                max_retries: 1,
                retry_delay: Duration::from_millis(1),
                max_retry_delay: Duration::from_millis(1),
                ..Default::default()
            },
            &Profile::new("https://sharing.example.com/delta-sharing", "test-token"),
            Arc::new(BearerToken::new("test-token")),
        )
        .unwrap();

        // Nothing listens on port 1.
        let err = client
            .download(
                "download",
                "http://127.0.0.1:1/bucket/f.parquet?X-Amz-Signature=SECRET123",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Transport);
        let message = format!("{} {:?}", err, std::error::Error::source(&err));
        assert!(message.contains("127.0.0.1:1/bucket/f.parquet"), "{}", message);
        assert!(!message.contains("SECRET123"), "{}", message);
        assert!(!message.contains("X-Amz-Signature"), "{}", message);
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let profile = Profile::new("", "token");
        let auth = Arc::new(BearerToken::from_profile(&profile));
        assert!(SharingHttpClient::new(HttpClientConfig::default(), &profile, auth).is_err());
    }
}
