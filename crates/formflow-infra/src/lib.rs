//! Infrastructure layer for formflow.
//!
//! Contains the HTTP implementation of the `FormVersionApi` port defined in
//! `formflow-core`, plus configuration file and directory resolution.

pub mod config;
pub mod http;
