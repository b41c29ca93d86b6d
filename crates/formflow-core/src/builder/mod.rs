//! Building blocks for new draft entities.
//!
//! Temporary identifier allocation and the default-value catalogs consulted
//! when a stage, section, field, transition or action is created.

pub mod defaults;
pub mod ids;
