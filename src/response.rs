//! Normalized responses.
//!
//! Every call, successful or not, produces a [`Response`]: status code,
//! headers and a body that is either parsed JSON or the raw text, never both.

use http::{HeaderMap, StatusCode};
use serde::de::{self, DeserializeOwned};

/// The body of a [`Response`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The payload parsed as JSON.
    Json(serde_json::Value),
    /// The payload as received, because it was not valid JSON.
    Text(String),
    /// The server sent no payload.
    Empty,
}

/// A normalized response from the Canvas API.
///
/// # Examples
///
/// ```no_run
/// use canvas_api::Client;
///
/// # async fn example() -> Result<(), canvas_api::Error> {
/// let client = Client::builder()
///     .base_url("https://canvas.example.com/api/v1")?
///     .token("secret")
///     .build()?;
///
/// let response = client.get("accounts/1", &Default::default()).await?;
///
/// println!("Status: {}", response.status);
/// if let Some(account) = response.json() {
///     println!("Account name: {}", account["name"]);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers. Names are case-insensitive and repeated headers
    /// keep every value in order.
    pub headers: HeaderMap,

    /// The response body.
    pub body: ResponseBody,
}

impl Response {
    /// Builds a `Response` from a status, headers and the full payload.
    ///
    /// The payload is parsed as JSON when possible and kept as text otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// # use canvas_api::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// let ok = Response::from_parts(StatusCode::OK, HeaderMap::new(), br#"{"id": 1}"#);
    /// assert_eq!(ok.json().unwrap()["id"], 1);
    /// assert!(ok.text().is_none());
    ///
    /// let html = Response::from_parts(StatusCode::BAD_GATEWAY, HeaderMap::new(), b"<html>");
    /// assert!(html.json().is_none());
    /// assert_eq!(html.text(), Some("<html>"));
    /// ```
    pub fn from_parts(status: StatusCode, headers: HeaderMap, payload: &[u8]) -> Self {
        let body = if payload.is_empty() {
            ResponseBody::Empty
        } else {
            match serde_json::from_slice(payload) {
                Ok(value) => ResponseBody::Json(value),
                Err(_) => ResponseBody::Text(String::from_utf8_lossy(payload).into_owned()),
            }
        };

        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the parsed body, or `None` if the body was not JSON.
    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the raw body, or `None` if it was parsed as JSON.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Consumes the response and returns the parsed body, if any.
    pub fn into_json(self) -> Option<serde_json::Value> {
        match self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Decodes the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Fails if the body does not match `T`, or if it was not JSON at all.
    pub fn deserialize<T>(&self) -> serde_json::Result<T>
    where
        T: DeserializeOwned,
    {
        match &self.body {
            ResponseBody::Json(value) => T::deserialize(value),
            ResponseBody::Text(_) => Err(de::Error::custom("response body is not JSON")),
            ResponseBody::Empty => Err(de::Error::custom("response body is empty")),
        }
    }

    /// Returns `true` if the status is below 400.
    pub fn is_success(&self) -> bool {
        self.status.as_u16() < 400
    }

    /// Returns the first value of a header by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use canvas_api::Response;
    /// # use http::{HeaderMap, HeaderValue, StatusCode};
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// let response = Response::from_parts(StatusCode::OK, headers, b"[]");
    /// assert_eq!(response.header("Content-Type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns every value of a repeated header, in order.
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde::Deserialize;

    #[test]
    fn test_json_body_leaves_text_unset() {
        let response = Response::from_parts(StatusCode::OK, HeaderMap::new(), br#"{ "hello" : "world" }"#);

        assert_eq!(response.json(), Some(&serde_json::json!({ "hello": "world" })));
        assert_eq!(response.text(), None);
    }

    #[test]
    fn test_unparsable_body_leaves_json_unset() {
        let response =
            Response::from_parts(StatusCode::OK, HeaderMap::new(), b"This is not a { json");

        assert_eq!(response.json(), None);
        assert_eq!(response.text(), Some("This is not a { json"));
    }

    #[test]
    fn test_empty_body() {
        let response = Response::from_parts(StatusCode::NO_CONTENT, HeaderMap::new(), b"");

        assert_eq!(response.body, ResponseBody::Empty);
        assert_eq!(response.json(), None);
        assert_eq!(response.text(), None);
    }

    #[test]
    fn test_error_status_still_parses_body() {
        let response = Response::from_parts(
            StatusCode::FORBIDDEN,
            HeaderMap::new(),
            br#"{"message":"user not authorized"}"#,
        );

        assert!(!response.is_success());
        assert_eq!(response.json().unwrap()["message"], "user not authorized");
    }

    #[test]
    fn test_repeated_headers_keep_order() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));

        let response = Response::from_parts(StatusCode::OK, headers, b"");
        assert_eq!(response.header_all("set-cookie"), vec!["a=1", "b=2"]);
        assert_eq!(response.header("set-cookie"), Some("a=1"));
    }

    #[test]
    fn test_deserialize_into_type() {
        #[derive(Deserialize)]
        struct Course {
            id: u64,
            name: String,
        }

        let response = Response::from_parts(
            StatusCode::OK,
            HeaderMap::new(),
            br#"{"id": 7, "name": "Rust 101"}"#,
        );

        let course: Course = response.deserialize().unwrap();
        assert_eq!(course.id, 7);
        assert_eq!(course.name, "Rust 101");
    }

    #[test]
    fn test_deserialize_rejects_non_json_body() {
        let html = Response::from_parts(
            StatusCode::BAD_GATEWAY,
            HeaderMap::new(),
            b"<html>Bad Gateway</html>",
        );
        let err = html.deserialize::<Option<serde_json::Value>>().unwrap_err();
        assert!(err.to_string().contains("not JSON"), "got: {err}");

        let empty = Response::from_parts(StatusCode::NO_CONTENT, HeaderMap::new(), b"");
        assert!(empty.deserialize::<Option<u64>>().is_err());
    }
}
