//! Error types for Canvas API calls.
//!
//! Every failure a call can produce is one variant of [`Error`]. Variants that
//! involve a server response carry the normalized [`Response`], so callers can
//! read the status code and the parsed (or raw) body without a second fetch.

use crate::Response;
use http::StatusCode;
use std::time::Duration;

/// The main error type for Canvas API calls.
///
/// # Examples
///
/// ```no_run
/// use canvas_api::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://canvas.example.com/api/v1")?
///     .token("secret")
///     .build()?;
///
/// match client.get("accounts/1", &Default::default()).await {
///     Ok(response) => println!("Account: {:?}", response.json()),
///     Err(Error::Response { response, .. }) if response.status.as_u16() == 404 => {
///         eprintln!("No such account");
///     }
///     Err(Error::Timeout { timeout, .. }) => eprintln!("Gave up after {:?}", timeout),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The call could not be completed and no response exists.
    ///
    /// Raised for connection failures, DNS errors and request bodies that
    /// cannot be serialized.
    #[error("{}", request_message(endpoint, message))]
    Request {
        /// The endpoint or URL that was being called
        endpoint: String,
        /// Description of the underlying failure
        message: String,
    },

    /// The per-call deadline elapsed before the call completed.
    #[error("Request to {endpoint} timed out after {timeout:?}")]
    Timeout {
        /// The endpoint or URL that was being called
        endpoint: String,
        /// The configured timeout
        timeout: Duration,
    },

    /// The server answered with a non-success status code.
    #[error("{}", response_message(endpoint, response))]
    Response {
        /// The endpoint or URL that was called
        endpoint: String,
        /// The normalized response, including its body
        response: Box<Response>,
    },

    /// A page of a paginated endpoint did not contain a JSON array.
    ///
    /// Use `list_pages` or `get` for endpoints that return a single object.
    #[error(
        "{endpoint} did not respond with a list (status {}). Use `list_pages` or `get` instead",
        response.status.as_u16()
    )]
    Pagination {
        /// The endpoint or URL that produced the page
        endpoint: String,
        /// The offending page
        response: Box<Response>,
    },

    /// `Client::request` was called with `GET`.
    #[error("HTTP GET is not allowed in `request`. Use `get`, `list_pages` or `list_items` instead")]
    GetNotAllowed,

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided or resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

fn request_message(endpoint: &str, message: &str) -> String {
    if endpoint.is_empty() {
        format!("Request failed: {message}")
    } else {
        format!("Request to {endpoint} failed: {message}")
    }
}

fn response_message(endpoint: &str, response: &Response) -> String {
    if response.status == StatusCode::UNAUTHORIZED {
        format!("Unauthorized request to {endpoint} (status 401). Check that the access token is valid")
    } else {
        format!(
            "Request to {endpoint} failed with status {}",
            response.status.as_u16()
        )
    }
}

/// The kind of an [`Error`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Request`].
    Request,
    /// See [`Error::Timeout`].
    Timeout,
    /// See [`Error::Response`].
    Response,
    /// See [`Error::Pagination`].
    Pagination,
    /// Misuse of the API: [`Error::GetNotAllowed`], [`Error::Configuration`]
    /// or [`Error::InvalidUrl`].
    Usage,
}

impl Error {
    /// Returns the kind of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_api::{Error, ErrorKind};
    /// use std::time::Duration;
    ///
    /// let err = Error::Timeout {
    ///     endpoint: "courses".to_string(),
    ///     timeout: Duration::from_secs(1),
    /// };
    /// assert_eq!(err.kind(), ErrorKind::Timeout);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Request { .. } => ErrorKind::Request,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Response { .. } => ErrorKind::Response,
            Error::Pagination { .. } => ErrorKind::Pagination,
            Error::GetNotAllowed | Error::Configuration(_) | Error::InvalidUrl(_) => {
                ErrorKind::Usage
            }
        }
    }

    /// Returns the response attached to this error, if any.
    ///
    /// Only [`Error::Response`] and [`Error::Pagination`] carry one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Response { response, .. } | Error::Pagination { response, .. } => {
                Some(response)
            }
            _ => None,
        }
    }

    /// Returns the HTTP status code if this error has a response.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|r| r.status)
    }

    /// Fills in the endpoint of a [`Error::Request`] raised before it was known.
    pub(crate) fn with_endpoint(self, endpoint: &str) -> Self {
        match self {
            Error::Request {
                endpoint: unknown,
                message,
            } if unknown.is_empty() => Error::Request {
                endpoint: endpoint.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Returns the endpoint the failing call targeted, if known.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Error::Request { endpoint, .. }
            | Error::Timeout { endpoint, .. }
            | Error::Response { endpoint, .. }
            | Error::Pagination { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }
}

/// A specialized `Result` type for Canvas API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    fn response_with_status(status: u16) -> Box<Response> {
        Box::new(Response::from_parts(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            br#"{"errors":[{"message":"nope"}]}"#,
        ))
    }

    #[test]
    fn test_unauthorized_message_is_specialized() {
        let err = Error::Response {
            endpoint: "accounts/1".to_string(),
            response: response_with_status(401),
        };

        let message = err.to_string();
        assert!(message.contains("Unauthorized"), "got: {message}");
        assert!(message.contains("accounts/1"));
    }

    #[test]
    fn test_generic_response_message_interpolates_status() {
        let err = Error::Response {
            endpoint: "courses/1".to_string(),
            response: response_with_status(404),
        };

        assert_eq!(err.to_string(), "Request to courses/1 failed with status 404");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.kind(), ErrorKind::Response);
    }

    #[test]
    fn test_response_body_is_inspectable() {
        let err = Error::Response {
            endpoint: "courses/1".to_string(),
            response: response_with_status(400),
        };

        let json = err.response().and_then(|r| r.json()).unwrap();
        assert_eq!(json["errors"][0]["message"], "nope");
    }

    #[test]
    fn test_errors_without_response() {
        let err = Error::Request {
            endpoint: "courses".to_string(),
            message: "connection refused".to_string(),
        };

        assert_eq!(err.kind(), ErrorKind::Request);
        assert!(err.response().is_none());
        assert_eq!(err.endpoint(), Some("courses"));
        assert_eq!(Error::GetNotAllowed.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_with_endpoint_fills_unknown_endpoint() {
        let err = Error::Request {
            endpoint: String::new(),
            message: "Failed to serialize request body".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed: Failed to serialize request body");

        let err = err.with_endpoint("courses");
        assert_eq!(err.endpoint(), Some("courses"));
        assert_eq!(
            err.to_string(),
            "Request to courses failed: Failed to serialize request body"
        );
    }
}
