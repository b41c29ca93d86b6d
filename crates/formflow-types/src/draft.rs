//! The draft aggregate root.
//!
//! A [`Draft`] is the in-memory, possibly unsaved representation of a form
//! version being edited: the stage tree, the flat transition list, the
//! current selection and the save status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::form::{Field, Section, Stage, Transition};
use crate::id::EntityId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Backend form version this draft edits. `None` until a brand-new
    /// draft is saved for the first time.
    pub form_version_id: Option<i64>,
    pub stages: Vec<Stage>,
    pub transitions: Vec<Transition>,
    pub selection: Selection,
    pub status: DraftStatus,
}

/// Hierarchical focus: stage > section > field, plus an independent
/// transition selection. Changing an ancestor clears its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub stage_id: Option<EntityId>,
    pub section_id: Option<EntityId>,
    pub field_id: Option<EntityId>,
    pub transition_id: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftStatus {
    /// Content changed since the last successful save or load.
    pub dirty: bool,
    /// A save request is in flight.
    pub saving: bool,
    pub last_error: Option<ServiceError>,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Incremented on every content mutation.
    pub revision: u64,
}

impl Draft {
    /// An empty draft with no stages and no transitions.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty() && self.transitions.is_empty()
    }

    /// Content equality: stages, transitions and selection, ignoring status.
    pub fn content_eq(&self, other: &Draft) -> bool {
        self.form_version_id == other.form_version_id
            && self.stages == other.stages
            && self.transitions == other.transitions
            && self.selection == other.selection
    }

    // -- lookups -------------------------------------------------------------

    pub fn stage(&self, id: &EntityId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == *id)
    }

    pub fn stage_mut(&mut self, id: &EntityId) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|s| s.id == *id)
    }

    pub fn section(&self, stage_id: &EntityId, section_id: &EntityId) -> Option<&Section> {
        self.stage(stage_id)?.section(section_id)
    }

    pub fn field(
        &self,
        stage_id: &EntityId,
        section_id: &EntityId,
        field_id: &EntityId,
    ) -> Option<&Field> {
        self.section(stage_id, section_id)?.field(field_id)
    }

    pub fn transition(&self, id: &EntityId) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.id == *id)
    }

    pub fn transition_mut(&mut self, id: &EntityId) -> Option<&mut Transition> {
        self.transitions.iter_mut().find(|t| t.id == *id)
    }

    /// Find a section anywhere in the tree, regardless of owning stage.
    pub fn find_section(&self, section_id: &EntityId) -> Option<&Section> {
        self.stages.iter().find_map(|s| s.section(section_id))
    }

    /// Find a field anywhere in the tree.
    pub fn find_field(&self, field_id: &EntityId) -> Option<&Field> {
        self.stages
            .iter()
            .flat_map(|s| s.sections.iter())
            .find_map(|sec| sec.field(field_id))
    }

    // -- selectors -----------------------------------------------------------

    pub fn initial_stage(&self) -> Option<&Stage> {
        self.stages.iter().find(|s| s.is_initial)
    }

    pub fn selected_stage(&self) -> Option<&Stage> {
        self.stage(self.selection.stage_id.as_ref()?)
    }

    pub fn selected_section(&self) -> Option<&Section> {
        let section_id = self.selection.section_id.as_ref()?;
        match self.selected_stage() {
            Some(stage) => stage.section(section_id),
            None => self.find_section(section_id),
        }
    }

    pub fn selected_field(&self) -> Option<&Field> {
        let field_id = self.selection.field_id.as_ref()?;
        match self.selected_section() {
            Some(section) => section.field(field_id),
            None => self.find_field(field_id),
        }
    }

    pub fn selected_transition(&self) -> Option<&Transition> {
        self.transition(self.selection.transition_id.as_ref()?)
    }

    /// Transitions leaving the given stage.
    pub fn transitions_from(&self, stage_id: &EntityId) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| t.from_stage_id == *stage_id)
            .collect()
    }
}
