//! Shared domain types for formflow.
//!
//! This crate contains the types used across the form builder: entity
//! identifiers, the editable draft tree (stages, sections, fields, rules,
//! transitions, actions), the backend wire format, and the error and
//! configuration types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod draft;
pub mod error;
pub mod form;
pub mod id;
pub mod wire;
