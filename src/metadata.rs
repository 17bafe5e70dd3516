//! Request metadata and per-call options.

use crate::body::RequestBody;
use crate::query::QueryParams;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::time::Duration;

/// Options that can be set on the client and overridden per call.
///
/// # Examples
///
/// ```
/// use canvas_api::RequestOptions;
/// use std::time::Duration;
///
/// let defaults = RequestOptions::new().timeout(Duration::from_secs(30));
/// let call = RequestOptions::new().timeout(Duration::from_secs(5));
///
/// assert_eq!(defaults.merge(&call).timeout, Some(Duration::from_secs(5)));
/// assert_eq!(defaults.merge(&RequestOptions::new()).timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Abort the call if it has not completed after this long, queueing time
    /// included.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Creates options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns `self` overridden by every option set in `call`.
    pub fn merge(&self, call: &RequestOptions) -> RequestOptions {
        RequestOptions {
            timeout: call.timeout.or(self.timeout),
        }
    }
}

/// Everything needed to make one logical call.
///
/// The client resolves `endpoint` against its base URL; an absolute URL (such
/// as a pagination cursor) is used as is.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The endpoint, relative to the base URL, or an absolute URL.
    pub endpoint: String,

    /// Additional headers for this call.
    pub headers: HeaderMap,

    /// Query parameters for this call.
    pub query: QueryParams,

    /// The body, if any.
    pub body: Option<RequestBody>,

    /// Per-call options, merged over the client defaults.
    pub options: RequestOptions,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and endpoint.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            query: QueryParams::new(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    /// Adds a header to the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the query parameters.
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the per-call options.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}
