//! Synchronous HTTP transport.

use crate::error::{ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use workbench_types::WorkbenchConfig;

/// HTTP methods used against the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
    Head,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        })
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Fails with [`ClientError::Status`] unless the status is `expected`.
    pub fn expect_status(self, expected: u16, method: Method, path: &str) -> ClientResult<Self> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(ClientError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Issues one request and returns whatever the server answered.
///
/// Non-2xx statuses are not errors at this level; callers decide what an
/// acceptable status is.
pub trait HttpTransport {
    fn issue_request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<HttpResponse>;
}

/// [`HttpTransport`] over a blocking `reqwest` client with basic auth.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    host: String,
    username: String,
    password: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &WorkbenchConfig) -> ClientResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(!config.secure_ssl_only)
            .build()
            .map_err(|e| ClientError::Network(format!("http client: {e}")))?;
        Ok(Self {
            client,
            host: config.host.clone(),
            username: config.username.clone(),
            password: config.resolved_password(),
        })
    }

    /// Absolute URL for `path`. Absolute URLs pass through untouched.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.host)
        } else {
            format!("{}/{path}", self.host)
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn issue_request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<HttpResponse> {
        let url = self.url(path);
        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
            Method::Head => self.client.head(&url),
        };
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, self.password.as_deref());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request
            .send()
            .map_err(|e| ClientError::Network(format!("{method} {url} failed: {e}")))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| ClientError::Network(format!("read body from {url}: {e}")))?;
        debug!(%method, url = %url, status, "remote request");
        Ok(HttpResponse { status, body })
    }
}
