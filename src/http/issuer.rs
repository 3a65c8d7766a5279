use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};

use crate::args::parse_header;
use crate::error::{RequestFailure, ValidationError};
use crate::run::RunSpec;

/// A validated request template, built once per run and shared by all
/// virtual users.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) payload: Bytes,
}

impl PreparedRequest {
    /// Validates `spec` and builds the request template from it.
    ///
    /// # Errors
    ///
    /// Returns an error when the user count is zero, the URL is empty or not
    /// an absolute http(s) URL, the method is not a valid HTTP token, or a
    /// header entry is malformed.
    pub fn from_spec(spec: &RunSpec) -> Result<Self, ValidationError> {
        if spec.user_count < 1 {
            return Err(ValidationError::UserCountZero);
        }
        let raw_url = spec.target_url.trim();
        if raw_url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        let url = Url::parse(raw_url).map_err(|err| ValidationError::InvalidUrl {
            url: raw_url.to_owned(),
            source: err,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme {
                scheme: url.scheme().to_owned(),
            });
        }

        let method_name = spec.method.trim().to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|_invalid| {
            ValidationError::InvalidMethod {
                value: spec.method.clone(),
            }
        })?;

        let mut headers = HeaderMap::with_capacity(spec.headers.len());
        for entry in &spec.headers {
            let (name, value) = parse_header(entry)?;
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_invalid| ValidationError::InvalidHeaderName { name: name.clone() })?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_invalid| ValidationError::InvalidHeaderValue { name: name.clone() })?;
            headers.append(header_name, header_value);
        }

        Ok(Self {
            method,
            url,
            headers,
            payload: spec.payload.clone(),
        })
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Result of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success { status: u16, elapsed: Duration },
    Failure {
        failure: RequestFailure,
        elapsed: Duration,
    },
}

impl RequestOutcome {
    #[must_use]
    pub const fn failure(&self) -> Option<RequestFailure> {
        match self {
            RequestOutcome::Success { .. } => None,
            RequestOutcome::Failure { failure, .. } => Some(*failure),
        }
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            RequestOutcome::Success { elapsed, .. } | RequestOutcome::Failure { elapsed, .. } => {
                *elapsed
            }
        }
    }
}

/// Fires a single request. Implementations hold no per-run state.
#[async_trait]
pub trait RequestIssuer: Send + Sync {
    async fn issue(&self, request: &PreparedRequest) -> RequestOutcome;
}

/// [`RequestIssuer`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestIssuer {
    client: Client,
}

impl ReqwestIssuer {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RequestIssuer for ReqwestIssuer {
    async fn issue(&self, request: &PreparedRequest) -> RequestOutcome {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if !request.payload.is_empty() {
            builder = builder.body(request.payload.clone());
        }

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                return RequestOutcome::Failure {
                    failure: RequestFailure::from_reqwest(&err),
                    elapsed: started.elapsed(),
                };
            }
        };
        let status = response.status();
        // Drain the body so the connection goes back to the pool.
        if let Err(err) = response.bytes().await {
            return RequestOutcome::Failure {
                failure: RequestFailure::from_reqwest(&err),
                elapsed: started.elapsed(),
            };
        }
        let elapsed = started.elapsed();
        if status.is_success() {
            RequestOutcome::Success {
                status: status.as_u16(),
                elapsed,
            }
        } else {
            RequestOutcome::Failure {
                failure: RequestFailure::Status {
                    status: status.as_u16(),
                },
                elapsed,
            }
        }
    }
}
