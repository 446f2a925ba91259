use crate::error::TransportError;
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use std::{borrow::Cow, time::Duration};

/// Http request that can be executed by a [`RestClient`].
///
/// Each internal gateway API defines the set of `RestRequest` implementations it accepts,
/// including any per-request headers (eg/ `Idempotency-Key`).
pub trait RestRequest {
    /// Expected response type if the request is successful.
    type Response: DeserializeOwned;

    /// Serialisable JSON body type - use `()` for no body.
    type Body: Serialize;

    /// Additional [`RestRequest`] path to the resource, relative to the client base Url.
    fn path(&self) -> Cow<'static, str>;

    /// Http [`reqwest::Method`] of this request.
    fn method() -> reqwest::Method;

    /// Optional JSON body.
    fn body(&self) -> Option<&Self::Body> {
        None
    }

    /// Per-request headers, eg/ an idempotency key.
    fn headers(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Maximum duration of a single request attempt before it is aborted.
    fn timeout() -> Duration {
        DEFAULT_HTTP_REQUEST_TIMEOUT
    }
}

/// Default per-attempt Http request timeout.
pub const DEFAULT_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal REST client for executing [`RestRequest`]s against an internal gateway.
///
/// Returns the raw response status and payload so callers own success/retry classification -
/// gateway contracts differ on which status codes are terminal.
#[derive(Debug)]
pub struct RestClient<'a> {
    /// HTTP [`reqwest::Client`] for executing [`reqwest::Request`]s.
    pub http_client: reqwest::Client,

    /// Base Url of the gateway being interacted with.
    pub base_url: Cow<'a, str>,
}

impl<'a> RestClient<'a> {
    /// Construct a new [`Self`] using the provided base Url.
    pub fn new<Url: Into<Cow<'a, str>>>(base_url: Url) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Execute the provided [`RestRequest`], returning the response status and payload.
    pub async fn execute<Request>(
        &self,
        request: &Request,
    ) -> Result<(reqwest::StatusCode, Bytes), TransportError>
    where
        Request: RestRequest,
    {
        let request = self.build(request)?;
        let response = self.http_client.execute(request).await?;

        let status = response.status();
        let payload = response.bytes().await?;

        Ok((status, payload))
    }

    /// Use the provided [`RestRequest`] to construct an Http [`reqwest::Request`].
    pub fn build<Request>(&self, request: &Request) -> Result<reqwest::Request, TransportError>
    where
        Request: RestRequest,
    {
        let url = format!("{}{}", self.base_url, request.path());

        let mut builder = self
            .http_client
            .request(Request::method(), url)
            .timeout(Request::timeout());

        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        for (key, value) in request.headers() {
            builder = builder.header(key, value);
        }

        builder.build().map_err(TransportError::from)
    }

    /// Deserialise a JSON response payload into the [`RestRequest::Response`] type.
    pub fn parse<Request>(payload: &Bytes) -> Result<Request::Response, TransportError>
    where
        Request: RestRequest,
    {
        serde_json::from_slice(payload).map_err(|error| TransportError::deserialise(error, payload))
    }
}
