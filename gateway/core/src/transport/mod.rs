//! Transport Client
//!
//! Issues HTTP requests against the campus backend and normalizes the
//! heterogeneous success/error payload shapes into a single typed result
//! or a single [`ApiError`](crate::error::ApiError).
//!
//! The [`Transport`] trait is the seam between the domain gateways and the
//! wire: production code uses [`HttpTransport`], tests script responses
//! through a mock implementation.

mod client;
mod extract;
mod request;

pub use client::{HttpTransport, Transport};
pub use extract::error_message;
pub use request::{ApiRequest, HttpMethod};
