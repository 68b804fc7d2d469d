//! Thin reqwest wrapper: URL building, status handling and JSON decoding.

use std::time::Duration;

use pratica_core::accounting::RemoteCallError;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// Longest error body kept in `RemoteCallError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// One outbound request.
pub(crate) struct Request<'a, B: Serialize + ?Sized> {
    pub method: Method,
    pub segments: &'a [&'a str],
    pub query: &'a [(&'a str, &'a str)],
    pub body: Option<&'a B>,
}

impl<'a> Request<'a, ()> {
    pub(crate) fn get(segments: &'a [&'a str]) -> Self {
        Self {
            method: Method::GET,
            segments,
            query: &[],
            body: None,
        }
    }
}

impl<'a, B: Serialize + ?Sized> Request<'a, B> {
    pub(crate) fn with_body(method: Method, segments: &'a [&'a str], body: &'a B) -> Self {
        Self {
            method,
            segments,
            query: &[],
            body: Some(body),
        }
    }

    pub(crate) fn query(mut self, query: &'a [(&'a str, &'a str)]) -> Self {
        self.query = query;
        self
    }
}

/// HTTP transport bound to the back-office base URL.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: Client,
    base_url: Url,
}

impl Transport {
    pub(crate) fn new(base_url: &str, timeout: Duration) -> Result<Self, String> {
        let base_url =
            Url::parse(base_url).map_err(|e| format!("invalid accounting base_url: {e}"))?;
        if base_url.cannot_be_a_base() {
            return Err(format!("accounting base_url cannot be a base: {base_url}"));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to create HTTP client: {e}"))?;

        Ok(Self { client, base_url })
    }

    /// Base URL with `segments` appended as encoded path segments.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends a request and decodes a JSON response.
    ///
    /// `401` comes back as `RemoteCallError::Status` so the caller can refresh.
    pub(crate) async fn send<B, T>(
        &self,
        request: &Request<'_, B>,
        token: Option<&str>,
    ) -> Result<T, RemoteCallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(request.segments);
        debug!(method = %request.method, url = %url, "Calling accounting API");

        let mut builder = self.client.request(request.method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(request.query);
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        serde_json::from_slice(&bytes).map_err(|e| {
            error!(url = %url, error = %e, "Failed to decode accounting response");
            debug!(body = %String::from_utf8_lossy(&bytes), "Undecodable response body");
            RemoteCallError::Decode(e.to_string())
        })
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteCallError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    truncate(&mut body, MAX_ERROR_BODY);
    Err(RemoteCallError::Status {
        status: status.as_u16(),
        body,
    })
}

fn truncate(body: &mut String, max: usize) {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> RemoteCallError {
    if err.is_timeout() {
        RemoteCallError::Timeout
    } else if err.is_decode() {
        RemoteCallError::Decode(err.to_string())
    } else {
        RemoteCallError::Transport(err.to_string())
    }
}

/// Whether a failure means the bearer token was rejected.
pub(crate) fn is_unauthorized(err: &RemoteCallError) -> bool {
    matches!(err, RemoteCallError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED.as_u16())
}
