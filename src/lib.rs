//! # canvas-api - A client for the Canvas LMS REST API
//!
//! `canvas-api` takes care of the three chores every Canvas integration runs
//! into: staying under the API quota, walking paginated lists, and turning
//! responses and failures into something a program can inspect.
//!
//! ## Quick Start
//!
//! ```no_run
//! use canvas_api::{Client, QueryParams};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), canvas_api::Error> {
//!     let client = Client::builder()
//!         .base_url("https://canvas.example.com/api/v1")?
//!         .token("secret")
//!         .timeout(Duration::from_secs(30))
//!         .build()?;
//!
//!     // A single resource
//!     let account = client.get("accounts/1", &QueryParams::new()).await?;
//!     println!("Account: {}", account.json().unwrap()["name"]);
//!
//!     // Every student enrollment of a course, across all pages
//!     let students = client
//!         .list_items(
//!             "courses/1/enrollments",
//!             &QueryParams::new().list("type", ["StudentEnrollment"]),
//!         )
//!         .to_array()
//!         .await?;
//!     println!("{} students", students.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Rate limiting
//!
//! Calls are queued and sent one at a time through a [`RateLimiter`]. When
//! Canvas answers `403` with `Rate Limit Exceeded`, the call goes back to the
//! front of the queue and is retried once the current window is over. No
//! other failure is retried. All clients share one limiter unless configured
//! otherwise.
//!
//! ## Pagination
//!
//! [`Client::list_pages`] follows `Link: <...>; rel="next"` headers and yields
//! one [`Response`] per page; [`Client::list_items`] yields the elements of
//! every page. Both are lazy: pages are requested as items are pulled.
//!
//! ## Error Handling
//!
//! ```no_run
//! use canvas_api::{Client, Error, QueryParams};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://canvas.example.com/api/v1")?.build()?;
//! match client.list_items("accounts/1", &QueryParams::new()).to_array().await {
//!     Ok(items) => println!("{} items", items.len()),
//!     Err(Error::Pagination { response, .. }) => {
//!         // Not a list after all
//!         println!("Single object: {:?}", response.json());
//!     }
//!     Err(Error::Response { response, .. }) => {
//!         eprintln!("HTTP error {}: {:?}", response.status, response.json());
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod body;
mod client;
mod error;
pub mod lazy;
pub mod metadata;
pub mod pagination;
mod query;
pub mod rate_limit;
mod response;
pub mod transport;

pub use body::{Attachment, FormPart, MultipartForm, RequestBody};
pub use client::{Client, ClientBuilder};
pub use error::{Error, ErrorKind, Result};
pub use lazy::LazySeq;
pub use metadata::RequestOptions;
pub use query::{encode_query, QueryParams, QueryValue};
pub use rate_limit::RateLimiter;
pub use response::{Response, ResponseBody};
