//! Canvas API client.
//!
//! The [`Client`] type is the main entry point for making calls.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    body::{Attachment, MultipartForm, RequestBody},
    lazy::LazySeq,
    metadata::{RequestMetadata, RequestOptions},
    pagination,
    query::QueryParams,
    rate_limit::{RateLimiter, DEFAULT_INTERVAL},
    transport::{RawResponse, ReqwestTransport, Transport, TransportError, TransportRequest},
    Error, Response, Result,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Identifier sent as `User-Agent` unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("canvas-api-rs/", env!("CARGO_PKG_VERSION"));

/// Endpoint that receives SIS imports.
pub const SIS_IMPORT_ENDPOINT: &str = "accounts/1/sis_imports";

/// Multipart field that carries the SIS import file.
pub const SIS_ATTACHMENT_FIELD: &str = "attachment";

/// A client for the Canvas LMS REST API.
///
/// The client is cheap to clone and designed to be reused. By default every
/// client in the process sends its calls through the same [`RateLimiter`].
///
/// # Examples
///
/// ```no_run
/// use canvas_api::{Client, QueryParams, RequestBody};
/// use http::Method;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), canvas_api::Error> {
/// let client = Client::builder()
///     .base_url("https://canvas.example.com/api/v1")?
///     .token("secret")
///     .build()?;
///
/// // A single resource
/// let account = client.get("accounts/1", &QueryParams::new()).await?;
/// println!("Account: {:?}", account.json());
///
/// // Every element of a paginated list
/// let courses = client
///     .list_items("accounts/1/courses", &QueryParams::new().param("per_page", 100))
///     .to_array()
///     .await?;
/// println!("{} courses", courses.len());
///
/// // Anything but GET
/// let body = RequestBody::json(&json!({ "course": { "name": "Rust 101" } }))?;
/// client.request("accounts/1/courses", Method::POST, Some(body)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: Url,
    default_headers: HeaderMap,
    options: RequestOptions,
    rate_limiter: Option<RateLimiter>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The limiter this client sends its calls through, or `None` if
    /// throttling is disabled.
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.inner.rate_limiter.as_ref()
    }

    /// Makes one call.
    ///
    /// The endpoint is resolved against the base URL and the query string is
    /// appended. The call goes through the rate limiter, is aborted with
    /// [`Error::Timeout`] if the merged timeout elapses first, and fails with
    /// [`Error::Response`] on any status of 400 or above.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use canvas_api::{metadata::RequestMetadata, Client, QueryParams, RequestOptions};
    /// use http::Method;
    /// use std::time::Duration;
    ///
    /// # async fn example() -> Result<(), canvas_api::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://canvas.example.com/api/v1")?
    ///     .build()?;
    ///
    /// let metadata = RequestMetadata::new(Method::GET, "courses")
    ///     .with_query(QueryParams::new().list("include", ["term", "teachers"]))
    ///     .with_options(RequestOptions::new().timeout(Duration::from_secs(5)));
    ///
    /// let response = client.call(metadata).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call(&self, metadata: RequestMetadata) -> Result<Response> {
        let endpoint = metadata.endpoint.clone();
        let method = metadata.method.clone();

        let result = self.execute(metadata).await;

        if let Err(e) = &result {
            tracing::warn!(
                error = %e,
                method = %method,
                endpoint = %endpoint,
                "Request failed"
            );
        }

        result
    }

    async fn execute(&self, metadata: RequestMetadata) -> Result<Response> {
        let endpoint = metadata.endpoint.clone();
        let options = self.inner.options.merge(&metadata.options);
        let request = self.build_request(metadata)?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            "Executing HTTP request"
        );

        let start_time = Instant::now();
        let deadline = options
            .timeout
            .map(|timeout| (tokio::time::Instant::now() + timeout, timeout));

        let transport = self.inner.transport.clone();
        let call_endpoint = endpoint.clone();
        let send_once = move || {
            send(
                transport.clone(),
                request.clone(),
                call_endpoint.clone(),
                deadline,
            )
        };

        let queued = async {
            match &self.inner.rate_limiter {
                Some(limiter) => limiter
                    .enqueue(send_once)
                    .await
                    .map_err(|e| e.with_endpoint(&endpoint)),
                None => send_once().await,
            }
        };

        // Covers the time spent waiting in the queue, not only the call.
        let raw = match deadline {
            Some((at, timeout)) => tokio::time::timeout_at(at, queued)
                .await
                .map_err(|_| Error::Timeout {
                    endpoint: endpoint.clone(),
                    timeout,
                })??,
            None => queued.await?,
        };

        let response = Response::from_parts(raw.status, raw.headers, &raw.body);
        let latency = start_time.elapsed();

        tracing::info!(
            status = response.status.as_u16(),
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        if !response.is_success() {
            if response.status.is_client_error() {
                tracing::error!(
                    status = response.status.as_u16(),
                    endpoint = %endpoint,
                    "Client error (4xx)"
                );
            } else {
                tracing::warn!(
                    status = response.status.as_u16(),
                    endpoint = %endpoint,
                    "Server error (5xx)"
                );
            }

            return Err(Error::Response {
                endpoint,
                response: Box::new(response),
            });
        }

        Ok(response)
    }

    fn build_request(&self, metadata: RequestMetadata) -> Result<TransportRequest> {
        let mut url = self.inner.base_url.join(&metadata.endpoint)?;

        let encoded = metadata.query.encode();
        if !encoded.is_empty() {
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                _ => encoded,
            };
            url.set_query(Some(&query));
        }

        let mut headers = self.inner.default_headers.clone();
        if let Some(content_type) = metadata.body.as_ref().and_then(RequestBody::content_type) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        for (name, value) in &metadata.headers {
            headers.insert(name.clone(), value.clone());
        }

        Ok(TransportRequest {
            method: metadata.method,
            url,
            headers,
            body: metadata.body,
        })
    }

    /// Fetches a single resource with `GET`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use canvas_api::{Client, QueryParams};
    ///
    /// # async fn example() -> Result<(), canvas_api::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://canvas.example.com/api/v1")?
    ///     .token("secret")
    ///     .build()?;
    ///
    /// let course = client
    ///     .get("courses/1", &QueryParams::new().list("include", ["syllabus_body"]))
    ///     .await?;
    /// println!("{}", course.json().unwrap()["name"]);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, endpoint: impl Into<String>, query: &QueryParams) -> Result<Response> {
        self.get_with_options(endpoint, query, RequestOptions::default())
            .await
    }

    /// Like [`get`](Self::get), with per-call options.
    pub async fn get_with_options(
        &self,
        endpoint: impl Into<String>,
        query: &QueryParams,
        options: RequestOptions,
    ) -> Result<Response> {
        let metadata = RequestMetadata::new(Method::GET, endpoint)
            .with_query(query.clone())
            .with_options(options);
        self.call(metadata).await
    }

    /// Makes a call with any method except `GET`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GetNotAllowed`] for `GET`, without calling the
    /// server. Use [`get`](Self::get), [`list_pages`](Self::list_pages) or
    /// [`list_items`](Self::list_items) instead.
    pub async fn request(
        &self,
        endpoint: impl Into<String>,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<Response> {
        self.request_with_options(endpoint, method, body, RequestOptions::default())
            .await
    }

    /// Like [`request`](Self::request), with per-call options.
    pub async fn request_with_options(
        &self,
        endpoint: impl Into<String>,
        method: Method,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<Response> {
        if method == Method::GET {
            return Err(Error::GetNotAllowed);
        }

        let mut metadata = RequestMetadata::new(method, endpoint).with_options(options);
        metadata.body = body;
        self.call(metadata).await
    }

    /// Makes a non-`GET` call with `body` serialized as JSON.
    pub async fn request_json<B>(
        &self,
        endpoint: impl Into<String>,
        method: Method,
        body: &B,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let endpoint = endpoint.into();
        let body = RequestBody::json(body).map_err(|e| e.with_endpoint(&endpoint))?;
        self.request(endpoint, method, Some(body)).await
    }

    /// Makes a POST call with a JSON body.
    pub async fn post<B>(&self, endpoint: impl Into<String>, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.request_json(endpoint, Method::POST, body).await
    }

    /// Makes a PUT call with a JSON body.
    pub async fn put<B>(&self, endpoint: impl Into<String>, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.request_json(endpoint, Method::PUT, body).await
    }

    /// Makes a DELETE call without a body.
    pub async fn delete(&self, endpoint: impl Into<String>) -> Result<Response> {
        self.request(endpoint, Method::DELETE, None).await
    }

    /// Lazily fetches every page of a paginated endpoint.
    ///
    /// `query` is sent with the first call only; later pages are requested at
    /// the `rel="next"` URL of the previous page, exactly as given. Nothing is
    /// requested until the first page is pulled.
    pub fn list_pages(&self, endpoint: impl Into<String>, query: &QueryParams) -> LazySeq<Response> {
        self.list_pages_with_options(endpoint, query, RequestOptions::default())
    }

    /// Like [`list_pages`](Self::list_pages), with per-call options applied
    /// to every page.
    pub fn list_pages_with_options(
        &self,
        endpoint: impl Into<String>,
        query: &QueryParams,
        options: RequestOptions,
    ) -> LazySeq<Response> {
        pagination::pages(self.clone(), endpoint.into(), query.clone(), options)
    }

    /// Lazily fetches every element of a paginated endpoint, in page order.
    ///
    /// Fails with [`Error::Pagination`] when a page is not a JSON array.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use canvas_api::{Client, QueryParams};
    ///
    /// # async fn example() -> Result<(), canvas_api::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://canvas.example.com/api/v1")?
    ///     .token("secret")
    ///     .build()?;
    ///
    /// let mut courses = client.list_items("accounts/1/courses", &QueryParams::new());
    /// while let Some(course) = courses.next().await {
    ///     println!("{}", course?["name"]);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn list_items(&self, endpoint: impl Into<String>, query: &QueryParams) -> LazySeq<Value> {
        self.list_items_with_options(endpoint, query, RequestOptions::default())
    }

    /// Like [`list_items`](Self::list_items), with per-call options applied
    /// to every page.
    pub fn list_items_with_options(
        &self,
        endpoint: impl Into<String>,
        query: &QueryParams,
        options: RequestOptions,
    ) -> LazySeq<Value> {
        let endpoint = endpoint.into();
        let pages = self.list_pages_with_options(endpoint.clone(), query, options);
        pagination::items(pages, endpoint)
    }

    /// Uploads a SIS import file.
    ///
    /// The file is posted as the `attachment` field of a multipart form to
    /// `accounts/1/sis_imports`.
    pub async fn sis_import(&self, attachment: Attachment) -> Result<Response> {
        let form = MultipartForm::new().file(SIS_ATTACHMENT_FIELD, attachment);
        self.request(SIS_IMPORT_ENDPOINT, Method::POST, Some(form.into()))
            .await
    }
}

/// Sends one request, bounded by the call deadline.
async fn send(
    transport: Arc<dyn Transport>,
    request: TransportRequest,
    endpoint: String,
    deadline: Option<(tokio::time::Instant, Duration)>,
) -> Result<RawResponse> {
    let outcome = match deadline {
        Some((at, timeout)) => match tokio::time::timeout_at(at, transport.send(request)).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(Error::Timeout { endpoint, timeout }),
        },
        None => transport.send(request).await,
    };

    outcome.map_err(|e: TransportError| match deadline {
        Some((_, timeout)) if e.timed_out => Error::Timeout { endpoint, timeout },
        _ => Error::Request {
            endpoint,
            message: e.message,
        },
    })
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use canvas_api::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), canvas_api::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://canvas.example.com/api/v1")?
///     .token("secret")
///     .timeout(Duration::from_secs(30))
///     .rate_limit_interval(Duration::from_millis(500))
///     .default_header("Accept-Language", "sv")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    token: String,
    user_agent: String,
    default_headers: HeaderMap,
    options: RequestOptions,
    rate_limiter: Option<RateLimiter>,
    rate_limit_interval: Duration,
    throttling: bool,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            token: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: HeaderMap::new(),
            options: RequestOptions::default(),
            rate_limiter: None,
            rate_limit_interval: DEFAULT_INTERVAL,
            throttling: true,
            transport: None,
        }
    }

    /// Sets the base URL, for example `https://canvas.example.com/api/v1`.
    ///
    /// A trailing slash is added if missing, so relative endpoints such as
    /// `courses/1` resolve below it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();
        let url = if url.ends_with('/') {
            Url::parse(url)?
        } else {
            Url::parse(&format!("{url}/"))?
        };
        self.base_url = Some(url);
        Ok(self)
    }

    /// Sets the access token sent as `Authorization: Bearer <token>`.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Overrides the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a default header that will be included in all calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the default timeout. Per-call options take precedence.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Sets the window length used when this builder initializes the shared
    /// limiter. Ignored if the shared limiter already exists or an explicit
    /// limiter is given.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = interval;
        self
    }

    /// Sends calls through `limiter` instead of the shared one.
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Sends calls directly, without queueing or rate-limit retries.
    pub fn disable_throttling(mut self) -> Self {
        self.throttling = false;
        self
    }

    /// Replaces the `reqwest`-based transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided, if the token or user
    /// agent are not valid header values, or if the HTTP client cannot be
    /// created.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Configuration("Base URL is required".to_string()))?;

        let mut authorization = HeaderValue::try_from(format!("Bearer {}", self.token))
            .map_err(|e| Error::Configuration(format!("Invalid token: {}", e)))?;
        authorization.set_sensitive(true);
        let user_agent = HeaderValue::try_from(self.user_agent)
            .map_err(|e| Error::Configuration(format!("Invalid user agent: {}", e)))?;

        let mut default_headers = self.default_headers;
        default_headers.insert(AUTHORIZATION, authorization);
        default_headers.insert(USER_AGENT, user_agent);

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let http_client = reqwest::Client::builder().build().map_err(|e| {
                    Error::Configuration(format!("Failed to build HTTP client: {}", e))
                })?;
                Arc::new(ReqwestTransport::new(http_client))
            }
        };

        let rate_limiter = if self.throttling {
            Some(
                self.rate_limiter
                    .unwrap_or_else(|| RateLimiter::shared_with_interval(self.rate_limit_interval)),
            )
        } else {
            None
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                default_headers,
                options: self.options,
                rate_limiter,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
