//! The network layer.
//!
//! A [`Transport`] sends one fully built request and returns the status,
//! headers and the complete payload. Connection pooling, TLS and redirects are
//! its business; rate limiting and error classification happen above it.

use crate::body::{FormPart, MultipartForm, RequestBody};
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderMap, Method, StatusCode};
use url::Url;

/// A request ready to be sent.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute URL, query string included.
    pub url: Url,
    /// Headers to send.
    pub headers: HeaderMap,
    /// The body, if any.
    pub body: Option<RequestBody>,
}

/// A response whose payload has been read in full.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The payload.
    pub body: Bytes,
}

/// A failure below the HTTP layer.
#[derive(Debug, Clone)]
pub struct TransportError {
    /// Description of the failure.
    pub message: String,
    /// `true` if the transport gave up because of its own timeout.
    pub timed_out: bool,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Sends requests over the network.
///
/// Implement this trait to route calls through something other than
/// `reqwest`, for example a recording layer in tests.
pub trait Transport: Send + Sync {
    /// Sends `request` and reads the whole response payload.
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, std::result::Result<RawResponse, TransportError>>;
}

/// The default [`Transport`], backed by a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an existing `reqwest::Client`.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, std::result::Result<RawResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method, request.url)
                .headers(request.headers);

            builder = match request.body {
                None => builder,
                Some(RequestBody::Json(bytes)) => builder.body(bytes),
                Some(RequestBody::Text(text)) => builder.body(text),
                Some(RequestBody::Multipart(form)) => builder.multipart(to_reqwest_form(form)?),
            };

            let response = builder.send().await.map_err(TransportError::from)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(TransportError::from)?;

            Ok(RawResponse {
                status,
                headers,
                body,
            })
        })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

fn to_reqwest_form(
    form: MultipartForm,
) -> std::result::Result<reqwest::multipart::Form, TransportError> {
    let mut out = reqwest::multipart::Form::new();

    for (name, part) in form.parts() {
        let part = match part {
            FormPart::Text(value) => reqwest::multipart::Part::text(value.clone()),
            FormPart::File(attachment) => {
                let file = reqwest::multipart::Part::bytes(attachment.data.to_vec())
                    .file_name(attachment.file_name.clone());
                match &attachment.mime_type {
                    Some(mime) => file.mime_str(mime)?,
                    None => file,
                }
            }
        };
        out = out.part(name.clone(), part);
    }

    Ok(out)
}
