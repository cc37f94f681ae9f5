//! HTTP client for the upstream employee API.
//!
//! [`UpstreamClient`] issues exactly one HTTP call per request and maps the
//! response status onto [`ApiError`]. It implements
//! `tower::Service<UpstreamRequest>` so it can be wrapped by the retry layer.

use crate::error::ApiError;
use crate::model::{DeleteByName, Employee, Envelope, NewEmployee};
use axum::http::StatusCode;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::task::{Context, Poll};
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;
use tower::Service;
use tracing::{debug, warn};

const RATE_LIMITED: &str = "Rate Limit Reached, try after some time";
const UPSTREAM_NOT_FOUND: &str = "Employee Not Found";
const UPSTREAM_BAD_REQUEST: &str = "Bad Request encountered from Server";
const UPSTREAM_UNAVAILABLE: &str = "Service Unavailable, try after some time";

/// One call against the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamRequest {
    List,
    Get(String),
    Create(NewEmployee),
    /// Upstream deletes by name, not by id.
    Delete(String),
}

/// Decoded upstream payload. `None` means the envelope carried no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamResponse {
    Employees(Option<Vec<Employee>>),
    Employee(Option<Employee>),
    Deleted { status: StatusCode, confirmed: bool },
}

/// Timeouts applied to every upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamTimeouts {
    /// Establishing the TCP/TLS connection.
    pub connect: Duration,
    /// Longest pause between two reads of the response.
    pub read: Duration,
    /// Sending the request body.
    pub write: Duration,
    /// Waiting for the response once the request is sent.
    pub response: Duration,
}

impl Default for UpstreamTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            read: Duration::from_secs(10),
            write: Duration::from_secs(10),
            response: Duration::from_secs(10),
        }
    }
}

/// Failure to construct an [`UpstreamClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("invalid upstream URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client for `{base_url}/employee`.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    pub fn new(
        base_url: impl Into<String>,
        timeouts: UpstreamTimeouts,
    ) -> Result<Self, ClientBuildError> {
        let raw = base_url.into();
        let invalid = |reason: String| ClientBuildError::InvalidUrl {
            url: raw.clone(),
            reason,
        };
        let mut base_url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
        base_url
            .path_segments_mut()
            .map_err(|()| invalid("URL cannot carry a path".to_string()))?
            .pop_if_empty();

        // reqwest has no separate write timeout, so writing and waiting for
        // the response share one overall deadline.
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .timeout(timeouts.write + timeouts.response)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base_url}/employee` followed by `segments`, each percent-encoded as
    /// exactly one path segment.
    fn employees_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("employee").extend(segments);
        }
        url
    }

    pub async fn list_employees(&self) -> Result<Option<Vec<Employee>>, ApiError> {
        let response = self
            .client
            .get(self.employees_url(&[]))
            .send()
            .await
            .map_err(transport_error)?;
        let envelope: Envelope<Vec<Employee>> = decode(check_status(response).await?).await?;
        Ok(envelope.data)
    }

    /// Fetches one employee. Ids that cannot name a single path segment
    /// (`""`, `"."`, `".."`) are reported as absent without a request.
    pub async fn get_employee(&self, id: &str) -> Result<Option<Employee>, ApiError> {
        if matches!(id, "" | "." | "..") {
            debug!(%id, "Id is not a valid path segment");
            return Ok(None);
        }
        let response = self
            .client
            .get(self.employees_url(&[id]))
            .send()
            .await
            .map_err(transport_error)?;
        let envelope: Envelope<Employee> = decode(check_status(response).await?).await?;
        Ok(envelope.data)
    }

    pub async fn create_employee(
        &self,
        employee: &NewEmployee,
    ) -> Result<Option<Employee>, ApiError> {
        let response = self
            .client
            .post(self.employees_url(&[]))
            .json(employee)
            .send()
            .await
            .map_err(transport_error)?;
        let envelope: Envelope<Employee> = decode(check_status(response).await?).await?;
        Ok(envelope.data)
    }

    /// Deletes by name. Returns the upstream status and whether `data`
    /// confirmed the deletion.
    pub async fn delete_employee(&self, name: &str) -> Result<(StatusCode, bool), ApiError> {
        let response = self
            .client
            .delete(self.employees_url(&[]))
            .json(&DeleteByName { name })
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let status = response.status();

        // An unreadable body is an unconfirmed deletion, not a transport failure.
        let confirmed = match response.json::<Envelope<serde_json::Value>>().await {
            Ok(envelope) => envelope.data.as_ref().is_some_and(is_truthy),
            Err(err) => {
                warn!(error = %err, "Undecodable upstream delete response");
                false
            }
        };
        Ok((status, confirmed))
    }
}

impl Service<UpstreamRequest> for UpstreamClient {
    type Response = UpstreamResponse;
    type Error = ApiError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: UpstreamRequest) -> Self::Future {
        let client = self.clone();

        Box::pin(async move {
            match request {
                UpstreamRequest::List => client
                    .list_employees()
                    .await
                    .map(UpstreamResponse::Employees),
                UpstreamRequest::Get(id) => client
                    .get_employee(&id)
                    .await
                    .map(UpstreamResponse::Employee),
                UpstreamRequest::Create(employee) => client
                    .create_employee(&employee)
                    .await
                    .map(UpstreamResponse::Employee),
                UpstreamRequest::Delete(name) => {
                    let (status, confirmed) = client.delete_employee(&name).await?;
                    Ok(UpstreamResponse::Deleted { status, confirmed })
                }
            }
        })
    }
}

/// Passes 2xx responses through and turns everything else into an error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify(status, &body))
}

/// Maps a non-2xx upstream status to an error. 429 and 503 are checked
/// before their 4xx/5xx families.
pub(crate) fn classify(status: StatusCode, body: &str) -> ApiError {
    let code = status.as_u16();

    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(status = code, "Upstream rate limit reached");
        ApiError::RateLimited(RATE_LIMITED.to_string())
    } else if status == StatusCode::NOT_FOUND {
        warn!(status = code, "Upstream client error");
        ApiError::NotFound(UPSTREAM_NOT_FOUND.to_string())
    } else if status.is_client_error() {
        warn!(status = code, "Upstream client error");
        ApiError::BadRequest(format!("{UPSTREAM_BAD_REQUEST}{body}"))
    } else if status == StatusCode::SERVICE_UNAVAILABLE {
        warn!(status = code, "Upstream unavailable");
        ApiError::Unavailable(UPSTREAM_UNAVAILABLE.to_string())
    } else if status.is_server_error() {
        warn!(status = code, "Upstream server error");
        ApiError::Internal(format!("Internal Server Error: {body}"))
    } else {
        warn!(status = code, "Unexpected upstream status");
        ApiError::Internal(format!("Unexpected upstream status {status}"))
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Envelope<T>, ApiError> {
    let body = response.bytes().await.map_err(transport_error)?;
    if body.iter().all(u8::is_ascii_whitespace) {
        debug!("Upstream response has no body");
        return Ok(Envelope {
            data: None,
            status: None,
        });
    }

    let envelope: Envelope<T> = serde_json::from_slice(&body).map_err(|err| {
        warn!(error = %err, "Undecodable upstream response");
        ApiError::Internal(format!("Failed to decode upstream response: {err}"))
    })?;
    debug!(
        status = ?envelope.status,
        has_data = envelope.data.is_some(),
        "Upstream response decoded"
    );
    Ok(envelope)
}

fn transport_error(err: reqwest::Error) -> ApiError {
    warn!(error = %err, timeout = err.is_timeout(), "Upstream request failed");
    ApiError::Internal(format!("Upstream request failed: {err}"))
}

/// Boolean `true`, or the string `"true"` in any case.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
