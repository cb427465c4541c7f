use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::debug;

use crate::config::ClientSettings;
use crate::error::ApiError;
use crate::github::issues::{GitHubIssue, IssueRequest, LockIssueOptions};
use crate::github::transport::{RetryMode, error_message, parse_retry_after, retry_delay};

/// A decoded entity together with the cache-validation token it was served with.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub etag: Option<String>,
}

/// The four GitHub Issues API operations the controller consumes.
///
/// Authentication, retries and rate limiting belong to the implementation;
/// callers only distinguish [`ApiError::NotFound`] from everything else.
#[async_trait]
pub trait IssuesApi: Send + Sync {
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> Result<Fetched<GitHubIssue>, ApiError>;

    /// Fetches one issue. When `etag` is given the implementation may answer
    /// from its cache if the remote reports the issue unchanged.
    async fn get_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        etag: Option<&str>,
    ) -> Result<Fetched<GitHubIssue>, ApiError>;

    async fn edit_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        request: &IssueRequest,
    ) -> Result<Fetched<GitHubIssue>, ApiError>;

    async fn lock_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        options: &LockIssueOptions,
    ) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
struct CachedIssue {
    etag: String,
    issue: GitHubIssue,
}

/// reqwest-backed [`IssuesApi`] for the GitHub REST API v3.
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
    cache: Mutex<HashMap<String, CachedIssue>>,
}

impl GitHubClient {
    pub fn new(settings: &ClientSettings, token: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&settings.user_agent).context("invalid user agent")?,
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&auth_header).context("invalid github authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_base: settings.api_base_url.trim_end_matches('/').to_string(),
            retry_max_attempts: settings.retry_max_attempts.max(1),
            retry_base_delay_ms: settings.retry_base_delay_ms.max(1),
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn issues_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}/issues", self.api_base)
    }

    fn issue_url(&self, owner: &str, repo: &str, number: u64) -> String {
        format!("{}/{number}", self.issues_url(owner, repo))
    }

    fn cached(&self, url: &str, etag: &str) -> Option<CachedIssue> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(url).filter(|entry| entry.etag == etag).cloned()
    }

    fn remember(&self, url: &str, fetched: &Fetched<GitHubIssue>) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        match &fetched.etag {
            Some(etag) => {
                cache.insert(
                    url.to_string(),
                    CachedIssue {
                        etag: etag.clone(),
                        issue: fetched.value.clone(),
                    },
                );
            }
            None => {
                cache.remove(url);
            }
        }
    }

    fn forget(&self, url: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.remove(url);
    }

    /// Sends a request, retrying the failures `mode` allows.
    ///
    /// Returns the response for any 2xx status and for `304 Not Modified`.
    async fn send<F>(
        &self,
        operation: &str,
        mode: RetryMode,
        mut request_builder: F,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match request_builder().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() || status == StatusCode::NOT_MODIFIED {
                        return Ok(response);
                    }
                    if status == StatusCode::NOT_FOUND {
                        return Err(ApiError::NotFound {
                            operation: operation.to_string(),
                        });
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && mode.allows_status(status.as_u16(), retry_after)
                    {
                        let delay = retry_delay(self.retry_base_delay_ms, attempt, retry_after);
                        debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            ?delay,
                            "retrying github request"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(ApiError::Status {
                        operation: operation.to_string(),
                        status: status.as_u16(),
                        message: error_message(&body),
                    });
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && mode.allows_transport_error(&error) {
                        let delay = retry_delay(self.retry_base_delay_ms, attempt, None);
                        debug!(operation, attempt, ?delay, %error, "retrying github request");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(ApiError::Transport {
                        operation: operation.to_string(),
                        source: error,
                    });
                }
            }
        }
    }

    async fn decode_issue(
        operation: &str,
        response: reqwest::Response,
    ) -> Result<Fetched<GitHubIssue>, ApiError> {
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let value = response
            .json::<GitHubIssue>()
            .await
            .map_err(|e| ApiError::Decode {
                operation: operation.to_string(),
                message: e.to_string(),
            })?;
        Ok(Fetched { value, etag })
    }
}

#[async_trait]
impl IssuesApi for GitHubClient {
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> Result<Fetched<GitHubIssue>, ApiError> {
        const OPERATION: &str = "create issue";
        let url = self.issues_url(owner, repo);
        let response = self
            .send(OPERATION, RetryMode::NonIdempotent, || {
                self.http.post(&url).json(request)
            })
            .await?;
        Self::decode_issue(OPERATION, response).await
    }

    async fn get_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        etag: Option<&str>,
    ) -> Result<Fetched<GitHubIssue>, ApiError> {
        const OPERATION: &str = "get issue";
        let url = self.issue_url(owner, repo, number);
        let response = self
            .send(OPERATION, RetryMode::Idempotent, || {
                let request = self.http.get(&url);
                match etag {
                    Some(tag) if !tag.is_empty() => request.header(header::IF_NONE_MATCH, tag),
                    _ => request,
                }
            })
            .await?;

        let response = if response.status() == StatusCode::NOT_MODIFIED {
            if let Some(cached) = etag.and_then(|tag| self.cached(&url, tag)) {
                debug!(%url, etag = %cached.etag, "issue not modified, serving cached copy");
                return Ok(Fetched {
                    value: cached.issue,
                    etag: Some(cached.etag),
                });
            }
            debug!(%url, "issue not modified but no cached copy, fetching unconditionally");
            self.send(OPERATION, RetryMode::Idempotent, || self.http.get(&url))
                .await?
        } else {
            response
        };

        let fetched = Self::decode_issue(OPERATION, response).await?;
        self.remember(&url, &fetched);
        Ok(fetched)
    }

    async fn edit_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        request: &IssueRequest,
    ) -> Result<Fetched<GitHubIssue>, ApiError> {
        const OPERATION: &str = "edit issue";
        let url = self.issue_url(owner, repo, number);
        self.forget(&url);
        let response = self
            .send(OPERATION, RetryMode::Idempotent, || {
                self.http.patch(&url).json(request)
            })
            .await?;
        Self::decode_issue(OPERATION, response).await
    }

    async fn lock_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        options: &LockIssueOptions,
    ) -> Result<(), ApiError> {
        let url = format!("{}/lock", self.issue_url(owner, repo, number));
        self.forget(&self.issue_url(owner, repo, number));
        self.send("lock issue", RetryMode::Idempotent, || {
            self.http.put(&url).json(options)
        })
            .await?;
        Ok(())
    }
}
