//! Shared handle to the draft being edited.
//!
//! `DraftStore` is constructed explicitly by whoever owns the editing session
//! and handed to the parts that need it. Cloning produces a shared view
//! (backed by `Arc<RwLock<...>>`). When the session ends the owner calls
//! [`DraftStore::dispose`]; nothing else resets it.
//!
//! Every reset (dispose or a reload from the server) starts a new session.
//! A save that completes or fails after its session ended is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use formflow_types::draft::{Draft, DraftStatus};
use formflow_types::error::{MappingError, ServiceError};
use formflow_types::form::{Field, Section, Stage, Transition};
use formflow_types::id::EntityId;
use formflow_types::wire::{FormVersion, SaveRequest};

use super::{DraftAction, Outcome, reduce};
use crate::builder::defaults::FieldTypeRegistry;
use crate::mapping::inbound::map_form_version_to_draft;
use crate::mapping::outbound::SaveOutcome;
use crate::mapping::reconcile::{apply_server_ids, server_id_map};

/// What the store remembers about a save between its start and its end.
#[derive(Debug, Clone)]
pub(crate) struct SaveTicket {
    /// The draft exactly as it was when the request was built.
    pub snapshot: Draft,
    session: u64,
}

/// Result of applying a successful save to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SaveApplied {
    pub adopted_ids: usize,
    /// The draft still holds unsaved edits.
    pub still_dirty: bool,
}

#[derive(Debug, Clone)]
pub struct DraftStore {
    inner: Arc<RwLock<Draft>>,
    registry: Arc<FieldTypeRegistry>,
    /// Only changed while the write lock is held.
    session: Arc<AtomicU64>,
}

impl DraftStore {
    /// An empty draft using the built-in field-type registry.
    pub fn create() -> Self {
        Self::with_registry(FieldTypeRegistry::builtin())
    }

    pub fn with_registry(registry: FieldTypeRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Draft::empty())),
            registry: Arc::new(registry),
            session: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A store holding the mapped form version (`None` for a new form).
    pub fn from_form_version(form_version: Option<&FormVersion>) -> Result<Self, MappingError> {
        let store = Self::create();
        store.replace_from_server(form_version)?;
        Ok(store)
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, Draft> {
        self.inner.read().expect("draft store lock poisoned")
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Draft> {
        self.inner.write().expect("draft store lock poisoned")
    }

    // -- mutation ------------------------------------------------------------

    pub fn dispatch(&self, action: DraftAction) -> Outcome {
        let mut draft = self.write_lock();
        reduce(&mut draft, action, &self.registry)
    }

    /// Apply actions in order under one lock acquisition.
    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = DraftAction>) -> Vec<Outcome> {
        let mut draft = self.write_lock();
        actions
            .into_iter()
            .map(|action| reduce(&mut draft, action, &self.registry))
            .collect()
    }

    /// Discard local edits and load the server's version.
    ///
    /// This is the only operation that throws away unsaved work. On a mapping
    /// error the current draft is left as it was.
    pub fn replace_from_server(&self, form_version: Option<&FormVersion>) -> Result<(), MappingError> {
        let mut fresh = map_form_version_to_draft(form_version)?;

        let mut draft = self.write_lock();
        let session = self.session.fetch_add(1, Ordering::SeqCst) + 1;
        fresh.status.revision = draft.status.revision + 1;
        *draft = fresh;
        debug!(form_version_id = ?draft.form_version_id, session, "Replaced draft from server");
        Ok(())
    }

    /// Reset to an empty draft at the end of an editing session.
    pub fn dispose(&self) {
        let mut draft = self.write_lock();
        self.session.fetch_add(1, Ordering::SeqCst);
        let revision = draft.status.revision + 1;
        *draft = Draft::empty();
        draft.status.revision = revision;
    }

    // -- reads ---------------------------------------------------------------

    /// A deep copy of the current draft.
    pub fn snapshot(&self) -> Draft {
        self.read_lock().clone()
    }

    /// Run `f` against the current draft without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&Draft) -> R) -> R {
        f(&*self.read_lock())
    }

    pub fn status(&self) -> DraftStatus {
        self.read_lock().status.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.read_lock().status.dirty
    }

    pub fn is_saving(&self) -> bool {
        self.read_lock().status.saving
    }

    pub fn form_version_id(&self) -> Option<i64> {
        self.read_lock().form_version_id
    }

    pub fn registry(&self) -> &FieldTypeRegistry {
        &self.registry
    }

    // -- selectors -----------------------------------------------------------

    pub fn selected_stage(&self) -> Option<Stage> {
        self.read(|d| d.selected_stage().cloned())
    }

    pub fn selected_section(&self) -> Option<Section> {
        self.read(|d| d.selected_section().cloned())
    }

    pub fn selected_field(&self) -> Option<Field> {
        self.read(|d| d.selected_field().cloned())
    }

    pub fn selected_transition(&self) -> Option<Transition> {
        self.read(|d| d.selected_transition().cloned())
    }

    pub fn initial_stage(&self) -> Option<Stage> {
        self.read(|d| d.initial_stage().cloned())
    }

    /// Sections of a stage sorted for display. Empty for an unknown stage.
    pub fn sections_in_display_order(&self, stage_id: &EntityId) -> Vec<Section> {
        self.read(|d| {
            d.stage(stage_id)
                .map(|stage| stage.sections_in_display_order().into_iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    // -- save lifecycle ------------------------------------------------------

    /// Mark a save as started and capture what is about to be sent.
    pub(crate) fn begin_save(&self) -> SaveTicket {
        let mut draft = self.write_lock();
        draft.status.saving = true;
        SaveTicket {
            snapshot: draft.clone(),
            session: self.session.load(Ordering::SeqCst),
        }
    }

    fn is_current(&self, ticket: &SaveTicket) -> bool {
        self.session.load(Ordering::SeqCst) == ticket.session
    }

    /// Apply a successful save: adopt server ids, record the save time and
    /// clear `dirty` when nothing is left unsaved.
    pub(crate) fn complete_save(
        &self,
        ticket: &SaveTicket,
        form_version_id: i64,
        outcome: &SaveOutcome,
        echoed: &SaveRequest,
        saved_at: DateTime<Utc>,
    ) -> SaveApplied {
        let ids = server_id_map(&ticket.snapshot, &outcome.sent_transitions, echoed);

        let mut draft = self.write_lock();
        if !self.is_current(ticket) {
            debug!(form_version_id, "Ignoring save that finished after its session ended");
            return SaveApplied {
                adopted_ids: 0,
                still_dirty: draft.status.dirty,
            };
        }
        let adopted_ids = apply_server_ids(&mut draft, &ids);

        draft.status.saving = false;
        draft.status.last_error = None;
        draft.status.last_saved_at = Some(saved_at);
        if draft.form_version_id.is_none() {
            draft.form_version_id = Some(form_version_id);
        }

        let unchanged = draft.status.revision == ticket.snapshot.status.revision;
        if unchanged && outcome.dropped.is_empty() {
            draft.status.dirty = false;
        }

        SaveApplied {
            adopted_ids,
            still_dirty: draft.status.dirty,
        }
    }

    /// Record a failed save. Content is never touched.
    pub(crate) fn fail_save(&self, ticket: &SaveTicket, error: ServiceError) {
        let mut draft = self.write_lock();
        if !self.is_current(ticket) {
            debug!(error = %error, "Ignoring save failure from an ended session");
            return;
        }
        draft.status.saving = false;
        draft.status.last_error = Some(error);
    }
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::create()
    }
}
