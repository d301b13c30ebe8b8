//! HTTP request handlers outside the auth flow.

pub mod http;

pub use http::*;
