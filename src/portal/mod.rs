//! Client for the property portal API.
//!
//! [`ApiClient`] handles a single request: cache lookup, retried network
//! call and cache store. [`PropertyPortal`] builds the caller-facing
//! operations on top of it and substitutes fallback data on failure.

mod cache;
mod client;
mod error;
pub mod fallback;
mod listings;
mod metrics;
mod retry;
mod transport;
mod types;

pub use cache::RequestKey;
pub use client::ApiClient;
pub use error::ClientError;
pub use listings::PropertyPortal;
pub use metrics::{Metrics, PerformanceStats};
pub use retry::{RequestAttempt, RetryPolicy};
pub use transport::{HttpMethod, HttpTransport, RequestOptions, Transport};
pub use types::{slugify, Listing, ListingDetail, Overview, DEFAULT_PROPERTY_IMAGE};
