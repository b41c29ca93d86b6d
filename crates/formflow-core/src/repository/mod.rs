//! Persistence boundary (ports).
//!
//! The infrastructure layer (formflow-infra) implements these traits. The
//! core crate never depends on a specific transport.

pub mod form_version;

pub use form_version::FormVersionApi;
