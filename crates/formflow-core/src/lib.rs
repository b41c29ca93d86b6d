//! Draft state management and identity reconciliation for formflow.
//!
//! This crate defines the draft store and its reducers, the mapping layer
//! between the backend wire format and the editable draft, and the save
//! orchestration over the `FormVersionApi` port. It depends only on
//! `formflow-types` -- never on `formflow-infra` or any HTTP crate.

pub mod builder;
pub mod draft;
pub mod mapping;
pub mod repository;
pub mod service;
