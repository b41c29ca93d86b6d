//! Use cases over the persistence boundary.
//!
//! Services orchestrate the draft store and the `FormVersionApi` port. They
//! depend on traits, never on a concrete transport.

pub mod save;

pub use save::{SaveOrchestrator, SaveReport};
