//! Lazy, pull-based sequences of fallible items.
//!
//! [`LazySeq`] wraps any stream of `Result<T>` and adds `filter`, `map`,
//! `take` and `to_array`. Nothing is fetched until an element is pulled, and
//! combinators pull from upstream only as far as downstream asks.

use crate::Result;
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// A lazy, one-shot sequence of items.
///
/// `LazySeq` is also a [`Stream`], so it works with `futures` combinators.
///
/// # Examples
///
/// ```no_run
/// use canvas_api::{Client, QueryParams};
///
/// # async fn example() -> Result<(), canvas_api::Error> {
/// let client = Client::builder()
///     .base_url("https://canvas.example.com/api/v1")?
///     .build()?;
///
/// // Only the pages needed to find ten published courses are fetched.
/// let names = client
///     .list_items("accounts/1/courses", &QueryParams::new())
///     .filter(|course| course["workflow_state"] == "available")
///     .map(|course| course["name"].to_string())
///     .take(10)
///     .to_array()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct LazySeq<T> {
    inner: BoxStream<'static, Result<T>>,
}

impl<T> std::fmt::Debug for LazySeq<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazySeq").finish_non_exhaustive()
    }
}

impl<T> LazySeq<T>
where
    T: Send + 'static,
{
    /// Wraps a stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Builds a sequence from already available items.
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(items.into_iter().map(Ok)))
    }

    /// Pulls the next item. Returns `None` once the sequence is exhausted.
    pub async fn next(&mut self) -> Option<Result<T>> {
        self.inner.next().await
    }

    /// Drains the remaining items into a `Vec`.
    ///
    /// Items already pulled with [`next`](Self::next) are not included, and a
    /// second call only returns what the first one left. The first error
    /// stops the drain and is returned.
    pub async fn to_array(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.inner.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Keeps only the items for which `predicate` returns `true`.
    ///
    /// Errors are passed through.
    pub fn filter<P>(self, mut predicate: P) -> LazySeq<T>
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        LazySeq::new(
            self.inner
                .try_filter(move |item| future::ready(predicate(item))),
        )
    }

    /// Transforms every item with `transform`.
    pub fn map<U, F>(self, transform: F) -> LazySeq<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        LazySeq::new(self.inner.map_ok(transform))
    }

    /// Yields at most `n` items.
    ///
    /// With `n == 0` the upstream sequence is never pulled.
    pub fn take(self, n: usize) -> LazySeq<T> {
        LazySeq::new(self.inner.take(n))
    }
}

impl<T> Stream for LazySeq<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
