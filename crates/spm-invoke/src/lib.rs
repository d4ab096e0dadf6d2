//! Client-side request plumbing for the SPM console.
//!
//! The backend is reachable only through an asynchronous "invoke a named
//! command" primitive. Everything here exists to keep that primitive cheap
//! and the UI responsive:
//!
//! - [`cache::RequestCache`] deduplicates concurrently-issued identical
//!   calls, serves repeated reads from a time-boxed cache, and supports
//!   invalidation by command-name prefix after mutations.
//! - [`filter::FilterChannel`] offloads keyword re-filtering of large row
//!   sets to a dedicated worker; only the most recently issued task's result
//!   is ever delivered.
//!
//! The cache never changes the set of outcomes a direct gateway call would
//! produce; it is purely a latency/cost optimization.

pub mod cache;
pub mod filter;
pub mod gateway;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::{RequestCache, RequestCacheStats};
pub use filter::{FilterChannel, KeywordMatch};
pub use gateway::{CommandGateway, GatewayError, HttpGateway};
