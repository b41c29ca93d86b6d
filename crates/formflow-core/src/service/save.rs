//! Save orchestration.
//!
//! `SaveOrchestrator` moves a draft across the persistence boundary: build
//! the request, send it, fold the response back into the store. A failed
//! save never touches draft content; the error is recorded in the draft
//! status and returned to the caller, who may retry.
//!
//! Saves are neither queued nor coalesced. Two concurrent saves each send
//! their own snapshot and race only on the status flags.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use formflow_types::config::TransitionPolicy;
use formflow_types::error::{ServiceError, UnsendableTransition};
use formflow_types::wire::{CreateVersionOptions, FormVersion, PublishedVersion};

use crate::draft::DraftStore;
use crate::mapping::outbound::build_save_request;
use crate::repository::FormVersionApi;

/// Summary of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub form_version_id: i64,
    pub saved_at: DateTime<Utc>,
    /// Temporary ids replaced by backend ids.
    pub adopted_ids: usize,
    /// Transitions left out of the request under the drop-and-warn policy.
    pub dropped: Vec<UnsendableTransition>,
    /// Edits made while the request was in flight, or dropped transitions,
    /// keep the draft dirty.
    pub still_dirty: bool,
}

/// Orchestrates load, save, version creation and publish for one draft.
///
/// Generic over `FormVersionApi` so the core never depends on a transport.
pub struct SaveOrchestrator<A: FormVersionApi> {
    api: A,
    store: DraftStore,
    policy: TransitionPolicy,
}

impl<A: FormVersionApi> SaveOrchestrator<A> {
    pub fn new(api: A, store: DraftStore, policy: TransitionPolicy) -> Self {
        Self { api, store, policy }
    }

    pub fn store(&self) -> &DraftStore {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Send the current draft to the backend.
    pub async fn save(&self, form_version_id: i64) -> Result<SaveReport, ServiceError> {
        let ticket = self.store.begin_save();

        let outcome = match build_save_request(&ticket.snapshot, self.policy) {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = ServiceError::from(e);
                warn!(form_version_id, error = %err, "Save request rejected before sending");
                self.store.fail_save(&ticket, err.clone());
                return Err(err);
            }
        };

        let echoed = match self
            .api
            .update_form_version(form_version_id, &outcome.request)
            .await
        {
            Ok(echoed) => echoed,
            Err(err) => {
                warn!(
                    form_version_id,
                    status_code = ?err.status_code,
                    error = %err,
                    "Saving form version failed"
                );
                self.store.fail_save(&ticket, err.clone());
                return Err(err);
            }
        };

        let saved_at = Utc::now();
        let applied = self
            .store
            .complete_save(&ticket, form_version_id, &outcome, &echoed, saved_at);

        info!(
            form_version_id,
            stages = outcome.request.stages.len(),
            transitions = outcome.request.stage_transitions.len(),
            dropped = outcome.dropped.len(),
            adopted_ids = applied.adopted_ids,
            still_dirty = applied.still_dirty,
            "Saved form version"
        );

        Ok(SaveReport {
            form_version_id,
            saved_at,
            adopted_ids: applied.adopted_ids,
            dropped: outcome.dropped,
            still_dirty: applied.still_dirty,
        })
    }

    /// Save, then save once more if the first pass held back transitions only
    /// because their stages had no backend ids yet.
    ///
    /// The second request carries the ids adopted from the first, so a draft
    /// built from scratch reaches the backend complete in one call.
    pub async fn save_settled(&self, form_version_id: i64) -> Result<SaveReport, ServiceError> {
        let first = self.save(form_version_id).await?;
        let pending = first.dropped.iter().filter(|d| d.reason.awaits_stage_ids()).count();
        if pending == 0 || first.adopted_ids == 0 {
            return Ok(first);
        }

        debug!(form_version_id, pending, "Saving again to send transitions between new stages");
        let second = self.save(form_version_id).await?;
        Ok(SaveReport {
            adopted_ids: first.adopted_ids + second.adopted_ids,
            ..second
        })
    }

    /// Fetch a form version and replace the draft with it.
    pub async fn load(&self, form_version_id: i64) -> Result<FormVersion, ServiceError> {
        let form_version = self.api.fetch_form_version(form_version_id).await?;
        self.store.replace_from_server(Some(&form_version))?;
        info!(
            form_version_id,
            stages = form_version.stages.len(),
            "Loaded form version"
        );
        Ok(form_version)
    }

    /// Create a new draft version of a form and start editing it.
    pub async fn create_version(
        &self,
        form_id: i64,
        copy_from_current: bool,
    ) -> Result<FormVersion, ServiceError> {
        let form_version = self
            .api
            .create_form_version(form_id, CreateVersionOptions { copy_from_current })
            .await?;
        self.store.replace_from_server(Some(&form_version))?;
        info!(
            form_id,
            form_version_id = form_version.id,
            version_number = form_version.version_number,
            copy_from_current,
            "Created form version"
        );
        Ok(form_version)
    }

    /// Publish a form version. Refused while the draft has unsaved edits.
    pub async fn publish(&self, form_version_id: i64) -> Result<PublishedVersion, ServiceError> {
        let status = self.store.status();
        if status.dirty || status.saving {
            return Err(ServiceError::validation(
                "the draft has unsaved changes; save before publishing",
                None,
            ));
        }

        let published = self.api.publish_form_version(form_version_id).await?;
        info!(
            form_version_id,
            version_number = published.version_number,
            status = %published.status,
            "Published form version"
        );
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    use formflow_types::error::UnsendableReason;
    use formflow_types::id::EntityId;
    use formflow_types::wire::{SaveRequest, VersionStatus};
    use serde_json::json;

    use super::*;
    use crate::draft::DraftAction;

    type Hook = Box<dyn FnOnce() + Send>;

    /// In-memory backend that assigns sequential ids to new entities.
    struct MockApi {
        next_id: AtomicI64,
        requests: Mutex<Vec<SaveRequest>>,
        fail_with: Mutex<Option<ServiceError>>,
        during_update: Mutex<Option<Hook>>,
        form_version: FormVersion,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                next_id: AtomicI64::new(1000),
                requests: Mutex::new(Vec::new()),
                fail_with: Mutex::new(None),
                during_update: Mutex::new(None),
                form_version: serde_json::from_value(json!({
                    "id": 9,
                    "form_id": 4,
                    "version_number": 2,
                    "stages": [
                        {"id": 1, "name": "Intake", "is_initial": true},
                        {"id": 2, "name": "Review"}
                    ],
                    "stage_transitions": [
                        {"id": 30, "from_stage_id": 1, "to_stage_id": 2, "label": "Submit"}
                    ]
                }))
                .unwrap(),
            }
        }

        fn failing(err: ServiceError) -> Self {
            let api = Self::new();
            *api.fail_with.lock().unwrap() = Some(err);
            api
        }

        fn assign(&self, slot: &mut Option<i64>) {
            if slot.is_none() {
                *slot = Some(self.next_id.fetch_add(1, Ordering::SeqCst));
            }
        }

        fn sent(&self) -> Vec<SaveRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl FormVersionApi for MockApi {
        async fn fetch_form_version(&self, _id: i64) -> Result<FormVersion, ServiceError> {
            Ok(self.form_version.clone())
        }

        async fn update_form_version(
            &self,
            _id: i64,
            request: &SaveRequest,
        ) -> Result<SaveRequest, ServiceError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(hook) = self.during_update.lock().unwrap().take() {
                hook();
            }
            if let Some(err) = self.fail_with.lock().unwrap().clone() {
                return Err(err);
            }

            let mut echoed = request.clone();
            for stage in &mut echoed.stages {
                self.assign(&mut stage.id);
                for section in &mut stage.sections {
                    self.assign(&mut section.id);
                    for field in &mut section.fields {
                        self.assign(&mut field.id);
                    }
                }
            }
            for transition in &mut echoed.stage_transitions {
                self.assign(&mut transition.id);
            }
            Ok(echoed)
        }

        async fn publish_form_version(&self, id: i64) -> Result<PublishedVersion, ServiceError> {
            Ok(PublishedVersion {
                id,
                status: VersionStatus::Published,
                published_at: Some(Utc::now()),
                version_number: 2,
            })
        }

        async fn create_form_version(
            &self,
            form_id: i64,
            options: CreateVersionOptions,
        ) -> Result<FormVersion, ServiceError> {
            let mut fv = self.form_version.clone();
            fv.id = 10;
            fv.form_id = form_id;
            fv.version_number = 3;
            if !options.copy_from_current {
                fv.stages.clear();
                fv.stage_transitions.clear();
            }
            Ok(fv)
        }
    }

    fn orchestrator(api: MockApi) -> SaveOrchestrator<MockApi> {
        SaveOrchestrator::new(api, DraftStore::create(), TransitionPolicy::DropAndWarn)
    }

    /// Empty draft -> stage A, stage B, transition A -> B.
    fn wire_two_new_stages(store: &DraftStore) -> (EntityId, EntityId, EntityId) {
        let a = store
            .dispatch(DraftAction::CreateStage { name: Some("A".into()) })
            .created_id()
            .unwrap();
        let b = store
            .dispatch(DraftAction::CreateStage { name: Some("B".into()) })
            .created_id()
            .unwrap();
        let t = store
            .dispatch(DraftAction::CreateTransition {
                from_stage_id: a,
                to_stage_id: Some(b),
            })
            .created_id()
            .unwrap();
        (a, b, t)
    }

    #[tokio::test]
    async fn test_new_stages_save_without_transitions() {
        let orch = orchestrator(MockApi::new());
        let (a, _, t) = wire_two_new_stages(orch.store());
        assert!(orch.store().read(|d| d.stage(&a).unwrap().is_initial));

        let report = orch.save(77).await.unwrap();

        let request = serde_json::to_value(&orch.api().sent()[0]).unwrap();
        assert_eq!(request["stage_transitions"], json!([]));
        assert_eq!(request["stages"].as_array().unwrap().len(), 2);
        assert!(request["stages"][0].get("id").is_none());
        assert!(request["stages"][1].get("id").is_none());
        assert_eq!(request["stages"][0]["name"], "A");

        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].transition_id, t);
        assert_eq!(report.dropped[0].reason, UnsendableReason::TemporarySource);
        assert_eq!(report.adopted_ids, 2);
        assert!(report.still_dirty);

        let draft = orch.store().snapshot();
        assert_eq!(draft.form_version_id, Some(77));
        assert_eq!(draft.stages[0].id, EntityId::Real(1000));
        assert_eq!(draft.selection.stage_id, Some(EntityId::Real(1000)));
        assert_eq!(draft.transitions[0].from_stage_id, EntityId::Real(1000));
        assert_eq!(draft.transitions[0].to_stage_id, Some(EntityId::Real(1001)));
        assert!(draft.status.dirty);
        assert!(!draft.status.saving);
        assert!(draft.status.last_saved_at.is_some());
    }

    #[tokio::test]
    async fn test_second_save_sends_transition_and_cleans() {
        let orch = orchestrator(MockApi::new());
        wire_two_new_stages(orch.store());

        orch.save(77).await.unwrap();
        let report = orch.save(77).await.unwrap();

        let second = &orch.api().sent()[1];
        assert_eq!(second.stages[0].id, Some(1000));
        assert_eq!(second.stage_transitions.len(), 1);
        assert_eq!(second.stage_transitions[0].from_stage_id, Some(1000));
        assert_eq!(second.stage_transitions[0].id, None);

        assert!(report.dropped.is_empty());
        assert!(!report.still_dirty);
        let draft = orch.store().snapshot();
        assert!(!draft.status.dirty);
        assert_eq!(draft.transitions[0].id, EntityId::Real(1002));
    }

    #[tokio::test]
    async fn test_network_failure_preserves_edits() {
        let orch = orchestrator(MockApi::failing(ServiceError::network("connection refused")));
        wire_two_new_stages(orch.store());
        let before = orch.store().snapshot();

        let err = orch.save(5).await.unwrap_err();
        assert!(err.is_network());

        let after = orch.store().snapshot();
        assert!(after.content_eq(&before));
        assert!(after.status.dirty);
        assert!(!after.status.saving);
        assert_eq!(after.status.last_error, Some(err));
        assert!(after.status.last_saved_at.is_none());
    }

    #[tokio::test]
    async fn test_http_failure_carries_status_and_details() {
        let details = json!({"stages": ["name is required"]});
        let orch = orchestrator(MockApi::failing(ServiceError::http(
            400,
            "validation failed",
            Some(details.clone()),
        )));
        wire_two_new_stages(orch.store());

        let err = orch.save(5).await.unwrap_err();
        assert_eq!(err.status_code, Some(400));
        assert_eq!(err.details, Some(details));
        assert!(!err.is_network());
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let orch = orchestrator(MockApi::failing(ServiceError::network("offline")));
        wire_two_new_stages(orch.store());
        assert!(orch.save(5).await.is_err());

        *orch.api().fail_with.lock().unwrap() = None;
        orch.save(5).await.unwrap();
        assert_eq!(orch.store().status().last_error, None);
    }

    #[tokio::test]
    async fn test_reject_policy_blocks_save() {
        let orch = SaveOrchestrator::new(MockApi::new(), DraftStore::create(), TransitionPolicy::Reject);
        wire_two_new_stages(orch.store());

        let err = orch.save(5).await.unwrap_err();
        assert_eq!(err.status_code, None);
        assert!(err.details.is_some());
        assert!(orch.api().sent().is_empty());

        let status = orch.store().status();
        assert!(status.dirty);
        assert!(!status.saving);
        assert_eq!(status.last_error, Some(err));
    }

    #[tokio::test]
    async fn test_edits_during_save_keep_draft_dirty() {
        let api = MockApi::new();
        let orch = orchestrator(api);
        orch.store().dispatch(DraftAction::CreateStage { name: Some("A".into()) });

        let store = orch.store().clone();
        *orch.api().during_update.lock().unwrap() = Some(Box::new(move || {
            store.dispatch(DraftAction::CreateStage { name: Some("Late".into()) });
        }));

        let report = orch.save(5).await.unwrap();
        assert!(report.still_dirty);
        assert_eq!(report.adopted_ids, 1);

        let draft = orch.store().snapshot();
        assert!(draft.status.dirty);
        assert_eq!(draft.stages[0].id, EntityId::Real(1000));
        assert!(draft.stages[1].id.is_temporary());
        assert_eq!(draft.stages[1].name, "Late");
    }

    #[tokio::test]
    async fn test_load_then_round_trip_save() {
        let orch = orchestrator(MockApi::new());
        let fv = orch.load(9).await.unwrap();
        assert!(!orch.store().is_dirty());

        orch.store().dispatch(DraftAction::UpdateTransition {
            transition_id: EntityId::Real(30),
            patch: crate::draft::TransitionPatch {
                label: Some("Send for review".into()),
                ..Default::default()
            },
        });
        orch.save(fv.id).await.unwrap();

        let sent = &orch.api().sent()[0];
        assert_eq!(sent.stages, fv.stages);
        assert_eq!(sent.stage_transitions[0].id, Some(30));
        assert_eq!(sent.stage_transitions[0].label, "Send for review");
        assert!(!orch.store().is_dirty());
    }

    #[tokio::test]
    async fn test_publish_requires_clean_draft() {
        let orch = orchestrator(MockApi::new());
        orch.load(9).await.unwrap();
        orch.store().dispatch(DraftAction::CreateStage { name: None });

        let err = orch.publish(9).await.unwrap_err();
        assert_eq!(err.status_code, None);

        orch.save(9).await.unwrap();
        let published = orch.publish(9).await.unwrap();
        assert_eq!(published.status, VersionStatus::Published);
    }

    #[tokio::test]
    async fn test_create_version_replaces_draft() {
        let orch = orchestrator(MockApi::new());
        orch.store().dispatch(DraftAction::CreateStage { name: None });

        let fv = orch.create_version(4, false).await.unwrap();
        assert_eq!(fv.version_number, 3);
        let draft = orch.store().snapshot();
        assert_eq!(draft.form_version_id, Some(10));
        assert!(draft.is_empty());
        assert!(!draft.status.dirty);

        orch.create_version(4, true).await.unwrap();
        assert_eq!(orch.store().snapshot().stages.len(), 2);
    }

    #[tokio::test]
    async fn test_save_settled_sends_transitions_between_new_stages() {
        let orch = orchestrator(MockApi::new());
        let (_, _, t) = wire_two_new_stages(orch.store());

        let report = orch.save_settled(77).await.unwrap();

        let sent = orch.api().sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].stage_transitions.is_empty());
        assert_eq!(sent[1].stage_transitions.len(), 1);
        assert!(report.dropped.is_empty());
        assert!(!report.still_dirty);
        assert_eq!(report.adopted_ids, 3);

        let draft = orch.store().snapshot();
        assert!(draft.transition(&t).is_none());
        assert_eq!(draft.transitions[0].id, EntityId::Real(1002));
    }

    #[tokio::test]
    async fn test_save_settled_sends_once_when_nothing_is_held_back() {
        let orch = orchestrator(MockApi::new());
        orch.load(9).await.unwrap();
        orch.store().dispatch(DraftAction::CreateStage { name: None });

        let report = orch.save_settled(9).await.unwrap();
        assert_eq!(orch.api().sent().len(), 1);
        assert_eq!(report.adopted_ids, 1);
        assert!(!report.still_dirty);
    }

    #[tokio::test]
    async fn test_deleting_a_connected_stage_can_still_be_published() {
        let orch = orchestrator(MockApi::new());
        orch.load(9).await.unwrap();
        orch.store().dispatch(DraftAction::DeleteStage {
            stage_id: EntityId::Real(2),
        });

        let report = orch.save(9).await.unwrap();
        assert!(report.dropped.is_empty());
        assert!(!report.still_dirty);

        let sent = &orch.api().sent()[0];
        assert_eq!(sent.stages.len(), 1);
        assert_eq!(sent.stage_transitions[0].id, Some(30));
        assert_eq!(sent.stage_transitions[0].to_stage_id, None);

        assert!(orch.publish(9).await.is_ok());
    }

    #[tokio::test]
    async fn test_save_finishing_after_dispose_does_not_touch_new_session() {
        let orch = orchestrator(MockApi::new());
        orch.store().dispatch(DraftAction::CreateStage { name: Some("A".into()) });

        let store = orch.store().clone();
        *orch.api().during_update.lock().unwrap() = Some(Box::new(move || store.dispose()));

        let report = orch.save(5).await.unwrap();
        assert_eq!(report.adopted_ids, 0);

        let draft = orch.store().snapshot();
        assert!(draft.is_empty());
        assert_eq!(draft.form_version_id, None);
        assert_eq!(draft.status.last_saved_at, None);
        assert!(!draft.status.saving);
        assert!(!draft.status.dirty);
    }
}
