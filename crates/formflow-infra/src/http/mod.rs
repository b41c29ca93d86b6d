//! HTTP transport for the form-version backend.

pub mod client;
mod error;

pub use client::HttpFormVersionApi;
