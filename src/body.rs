//! Request bodies.
//!
//! A body is either JSON, plain text or a multipart form. Bodies are cheap to
//! clone because a rate-limited call may be sent more than once.

use crate::{Error, Result};
use bytes::Bytes;
use serde::Serialize;

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";
pub(crate) const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// The body of a request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// A serialized JSON document, sent as `application/json`.
    Json(Bytes),
    /// Raw text, sent as `text/plain; charset=utf-8`.
    Text(String),
    /// A multipart form. The transport sets the content type and boundary.
    Multipart(MultipartForm),
}

impl RequestBody {
    /// Serializes `value` as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if `value` cannot be serialized. No call is
    /// made in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use canvas_api::RequestBody;
    /// use serde_json::json;
    ///
    /// let body = RequestBody::json(&json!({ "course": { "name": "Rust 101" } })).unwrap();
    /// assert_eq!(body.content_type(), Some("application/json"));
    /// ```
    pub fn json<T>(value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_vec(value)
            .map(|bytes| RequestBody::Json(Bytes::from(bytes)))
            .map_err(|e| Error::Request {
                endpoint: String::new(),
                message: format!("Failed to serialize request body: {}", e),
            })
    }

    /// Creates a plain text body.
    pub fn text(text: impl Into<String>) -> Self {
        RequestBody::Text(text.into())
    }

    /// Returns the content type to send, or `None` when the transport decides
    /// it (multipart).
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Json(_) => Some(JSON_CONTENT_TYPE),
            RequestBody::Text(_) => Some(TEXT_CONTENT_TYPE),
            RequestBody::Multipart(_) => None,
        }
    }
}

impl From<MultipartForm> for RequestBody {
    fn from(form: MultipartForm) -> Self {
        RequestBody::Multipart(form)
    }
}

/// A file to upload in a multipart form.
///
/// Reading files from disk is left to the caller.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// The file name reported to the server.
    pub file_name: String,
    /// The MIME type of the content, if known.
    pub mime_type: Option<String>,
    /// The file content.
    pub data: Bytes,
}

impl Attachment {
    /// Creates an attachment from a file name and its content.
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            data: data.into(),
        }
    }

    /// Sets the MIME type of the attachment.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// One field of a [`MultipartForm`].
#[derive(Debug, Clone)]
pub enum FormPart {
    /// A text field.
    Text(String),
    /// A file field.
    File(Attachment),
}

/// A multipart form body.
///
/// # Examples
///
/// ```
/// use canvas_api::{Attachment, MultipartForm};
///
/// let form = MultipartForm::new()
///     .text("import_type", "instructure_csv")
///     .file("attachment", Attachment::new("users.csv", "user_id,login_id\n"));
///
/// assert_eq!(form.parts().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<(String, FormPart)>,
}

impl MultipartForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    /// Appends a file field.
    pub fn file(mut self, name: impl Into<String>, attachment: Attachment) -> Self {
        self.parts.push((name.into(), FormPart::File(attachment)));
        self
    }

    /// Returns the fields in insertion order.
    pub fn parts(&self) -> &[(String, FormPart)] {
        &self.parts
    }
}
