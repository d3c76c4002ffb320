//! Upstream documentation source implementations for docvault.
//!
//! Two implementations of [`DocSource`](docvault_core::source::DocSource):
//! - [`HttpDocSource`] — a documentation API over HTTP
//! - [`StaticDocSource`] — an in-process map for offline seeds and tests

pub mod http;
pub mod static_docs;

pub use http::HttpDocSource;
pub use static_docs::StaticDocSource;
