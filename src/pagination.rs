//! Following `Link: <...>; rel="next"` headers.
//!
//! Canvas paginates list endpoints with RFC 5988 `Link` headers. A page
//! sequence requests the first page with the caller's query parameters, then
//! follows each `next` URL verbatim until a page has none.

use crate::lazy::LazySeq;
use crate::metadata::{RequestMetadata, RequestOptions};
use crate::query::QueryParams;
use crate::response::{Response, ResponseBody};
use crate::{Client, Error, Result};
use futures::stream;
use http::header::LINK;
use http::{HeaderMap, Method};
use serde_json::Value;
use std::collections::VecDeque;

/// Returns the URL of the `rel="next"` entry of the `Link` headers, if any.
///
/// Other relations (`prev`, `first`, `last`, ...) are ignored. When the header
/// is repeated, the first value with a `next` entry wins. Bytes outside ASCII
/// are decoded lossily rather than skipped.
///
/// # Examples
///
/// ```
/// use canvas_api::pagination::next_url;
/// use http::{HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(
///     "link",
///     HeaderValue::from_static(
///         r#"<https://canvas.local/courses?page=1>; rel="first", <https://canvas.local/courses?page=3>; rel="next""#,
///     ),
/// );
///
/// assert_eq!(next_url(&headers).as_deref(), Some("https://canvas.local/courses?page=3"));
/// ```
pub fn next_url(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .find_map(|value| next_in_link_value(&String::from_utf8_lossy(value.as_bytes())))
}

fn next_in_link_value(value: &str) -> Option<String> {
    let entry = value
        .split(',')
        .find(|entry| entry.trim_end().ends_with(r#"rel="next""#))?;

    let start = entry.find('<')? + 1;
    let end = start + entry[start..].find('>')?;
    Some(entry[start..end].to_string())
}

enum Cursor {
    First {
        endpoint: String,
        query: QueryParams,
    },
    Next(String),
    Done,
}

/// Lazily requests every page of `endpoint`.
pub(crate) fn pages(
    client: Client,
    endpoint: String,
    query: QueryParams,
    options: RequestOptions,
) -> LazySeq<Response> {
    let start = Cursor::First { endpoint, query };

    LazySeq::new(stream::try_unfold(start, move |cursor| {
        fetch_page(client.clone(), cursor, options.clone())
    }))
}

async fn fetch_page(
    client: Client,
    cursor: Cursor,
    options: RequestOptions,
) -> Result<Option<(Response, Cursor)>> {
    let metadata = match cursor {
        Cursor::First { endpoint, query } => {
            RequestMetadata::new(Method::GET, endpoint).with_query(query)
        }
        // The cursor carries its own query string.
        Cursor::Next(url) => RequestMetadata::new(Method::GET, url),
        Cursor::Done => return Ok(None),
    };

    let page = client.call(metadata.with_options(options)).await?;

    let cursor = match next_url(&page.headers) {
        Some(url) => {
            tracing::debug!(next = %url, "Following next page");
            Cursor::Next(url)
        }
        None => Cursor::Done,
    };

    Ok(Some((page, cursor)))
}

type ItemState = (LazySeq<Response>, VecDeque<Value>);

/// Flattens a page sequence into its elements.
///
/// Fails with [`Error::Pagination`] on the first page whose body is not a
/// JSON array.
pub(crate) fn items(pages: LazySeq<Response>, endpoint: String) -> LazySeq<Value> {
    let state = (pages, VecDeque::new());

    LazySeq::new(stream::try_unfold(state, move |state| {
        next_item(state, endpoint.clone())
    }))
}

async fn next_item(
    (mut pages, mut buffered): ItemState,
    endpoint: String,
) -> Result<Option<(Value, ItemState)>> {
    loop {
        if let Some(item) = buffered.pop_front() {
            return Ok(Some((item, (pages, buffered))));
        }

        match pages.next().await {
            None => return Ok(None),
            Some(page) => buffered = page_items(page?, &endpoint)?,
        }
    }
}

fn page_items(page: Response, endpoint: &str) -> Result<VecDeque<Value>> {
    match page.body {
        ResponseBody::Json(Value::Array(items)) => Ok(items.into()),
        _ => {
            tracing::error!(
                endpoint = endpoint,
                status = page.status.as_u16(),
                "Paginated endpoint did not respond with a list"
            );
            Err(Error::Pagination {
                endpoint: endpoint.to_string(),
                response: Box::new(page),
            })
        }
    }
}
