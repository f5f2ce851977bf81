//! The reserve project lifecycle engine.
//!
//! Every state-changing operation runs in one unit of work: lock the row,
//! validate, perform artifact side effects, write, commit. Any error drops the
//! unit of work, which leaves the stored record untouched.

use std::sync::Arc;

use chrono::Utc;

use crate::analysis::{summarize, AnalysisFilter, BucketSummary};
use crate::error::CoreError;
use crate::objects::{ObjectRefTracker, ObjectStore};
use crate::pagination::{PageRequest, Paginated};
use crate::reserve::{
    ArtifactRefs, NewReserve, ReserveFilter, ReservePatch, ReserveProject, Transition,
    TransitionFlags,
};
use crate::store::{Actor, ReserveStore, ReserveTx, UserDirectory, WindowStore};
use crate::types::DbId;
use crate::window::{TimeWindow, WindowGate};

/// Owns the reserve project state machine and its side effects.
#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn ReserveStore>,
    objects: Arc<dyn ObjectStore>,
    users: Arc<dyn UserDirectory>,
    gate: WindowGate,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn ReserveStore>,
        objects: Arc<dyn ObjectStore>,
        users: Arc<dyn UserDirectory>,
        windows: Arc<dyn WindowStore>,
    ) -> Self {
        Self {
            store,
            objects,
            users,
            gate: WindowGate::new(windows),
        }
    }

    pub fn gate(&self) -> &WindowGate {
        &self.gate
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    fn tracker(&self) -> ObjectRefTracker<'_> {
        ObjectRefTracker::new(self.objects.as_ref())
    }

    /// Look up the caller's admin flag.
    pub async fn resolve_actor(&self, open_id: &str) -> Result<Actor, CoreError> {
        self.users
            .find(open_id)
            .await?
            .ok_or_else(|| CoreError::UnknownActor(open_id.to_string()))
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    /// Create a `Draft` record owned by `actor`.
    pub async fn create(&self, actor: &str, input: NewReserve) -> Result<ReserveProject, CoreError> {
        let input = input.validate()?;
        let (none, refs) = (ArtifactRefs::default(), input.artifact_refs());
        self.tracker().ensure_introduced_exist(&none, &refs).await?;

        let mut tx = self.store.begin().await?;
        ensure_unshared(tx.as_mut(), None, &none, &refs).await?;
        let record = tx.insert(&input, actor).await?;
        tx.commit().await?;

        tracing::info!(reserve_id = record.id, actor, "Reserve project created");
        Ok(record)
    }

    pub async fn get(&self, id: DbId) -> Result<ReserveProject, CoreError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| CoreError::reserve_not_found(id))
    }

    /// List records visible to `actor`: administrators see every record,
    /// everyone else only the records they created.
    pub async fn list(
        &self,
        actor: &str,
        filter: &ReserveFilter,
        page: PageRequest,
    ) -> Result<Paginated<ReserveProject>, CoreError> {
        let actor = self.resolve_actor(actor).await?;
        let (total, items) = self.store.list(filter, page, &actor.list_scope()).await?;
        Ok(Paginated::new(total, items, page))
    }

    /// Apply a partial update. Artifacts the record stops referencing are
    /// deleted before the new state is written.
    pub async fn update(
        &self,
        actor: &str,
        id: DbId,
        patch: ReservePatch,
    ) -> Result<ReserveProject, CoreError> {
        let patch = patch.validate()?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .lock(id)
            .await?
            .ok_or_else(|| CoreError::reserve_not_found(id))?;
        let next = patch.apply(&current, actor);

        let tracker = self.tracker();
        let (old_refs, new_refs) = (current.artifact_refs(), next.artifact_refs());
        tracker.ensure_introduced_exist(&old_refs, &new_refs).await?;
        ensure_unshared(tx.as_mut(), Some(id), &old_refs, &new_refs).await?;
        tracker.reconcile(&old_refs, &new_refs).await?;

        let saved = tx.save(&next).await?;
        tx.commit().await?;

        tracing::info!(reserve_id = id, actor, "Reserve project updated");
        Ok(saved)
    }

    /// Release the record's artifacts, then remove it.
    pub async fn delete(&self, actor: &str, id: DbId) -> Result<(), CoreError> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .lock(id)
            .await?
            .ok_or_else(|| CoreError::reserve_not_found(id))?;

        self.tracker().release_all(&current.artifact_refs()).await?;

        if !tx.remove(id).await? {
            return Err(CoreError::reserve_not_found(id));
        }
        tx.commit().await?;

        tracing::info!(reserve_id = id, actor, "Reserve project deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// `Draft -> EnteredDb`.
    pub async fn refer(&self, actor: &str, id: DbId) -> Result<ReserveProject, CoreError> {
        self.transition(actor, id, Transition::Refer, None).await
    }

    /// `EnteredDb -> EarlyPlan`, only while a window is open.
    pub async fn submission(
        &self,
        actor: &str,
        id: DbId,
        flags: TransitionFlags,
    ) -> Result<ReserveProject, CoreError> {
        self.transition(actor, id, Transition::Submission, Some(flags))
            .await
    }

    /// `EarlyPlan -> OutStorageInspect`, only while a window is open.
    pub async fn out_storage(
        &self,
        actor: &str,
        id: DbId,
        flags: TransitionFlags,
    ) -> Result<ReserveProject, CoreError> {
        self.transition(actor, id, Transition::OutStorage, Some(flags))
            .await
    }

    /// Apply `transition` to record `id`.
    ///
    /// Checks run in order: window gate (gated transitions only), existence,
    /// current status. `flags` of `None` keeps the stored flag values.
    pub async fn transition(
        &self,
        actor: &str,
        id: DbId,
        transition: Transition,
        flags: Option<TransitionFlags>,
    ) -> Result<ReserveProject, CoreError> {
        if transition.is_gated() && !self.gate.is_open(Utc::now()).await? {
            tracing::info!(
                reserve_id = id,
                transition = transition.name(),
                "Gated transition rejected outside window"
            );
            return Err(CoreError::WindowClosed);
        }

        let mut tx = self.store.begin().await?;
        let current = tx
            .lock(id)
            .await?
            .ok_or_else(|| CoreError::reserve_not_found(id))?;

        let target = transition.to_status();
        if !current.status.can_transition(target) {
            return Err(CoreError::InvalidTransition {
                id,
                from: current.status,
                to: target,
            });
        }

        let mut next = current.clone();
        next.status = target;
        next.updated_by = actor.to_string();
        if let Some(flags) = flags {
            next.is_case_finish = flags.is_case_finish;
            next.is_research = flags.is_research;
        }

        let saved = tx.save(&next).await?;
        tx.commit().await?;

        tracing::info!(
            reserve_id = id,
            actor,
            from = %current.status,
            to = %target,
            "Reserve project transitioned"
        );
        Ok(saved)
    }

    // -----------------------------------------------------------------------
    // Analytics and windows
    // -----------------------------------------------------------------------

    pub async fn data_analysis(
        &self,
        filter: &AnalysisFilter,
    ) -> Result<Vec<BucketSummary>, CoreError> {
        filter.validate()?;
        let rows = self.store.aggregate(filter).await?;
        Ok(summarize(rows))
    }

    pub async fn window_settings(&self) -> Result<Vec<TimeWindow>, CoreError> {
        self.gate.windows().await
    }

    pub async fn set_window_settings(
        &self,
        actor: &str,
        windows: &[TimeWindow],
    ) -> Result<Vec<TimeWindow>, CoreError> {
        let actor = self.resolve_actor(actor).await?;
        self.gate.set_windows(&actor, windows).await
    }
}

/// Reject references `new` introduces that another record already holds.
/// Each object belongs to at most one record.
async fn ensure_unshared(
    tx: &mut dyn ReserveTx,
    record_id: Option<DbId>,
    old: &ArtifactRefs,
    new: &ArtifactRefs,
) -> Result<(), CoreError> {
    for (slot, object_id) in new.introduced(old) {
        if let Some(owner) = tx.referencing(object_id, record_id).await? {
            return Err(CoreError::InvalidArgument(format!(
                "Field '{}' references object '{object_id}' already held by reserve project {owner}",
                slot.name()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::MemoryBackend;
    use crate::reserve::ReserveStatus;

    const OWNER: &str = "owner-openid";
    const ADMIN: &str = "admin-openid";

    async fn backend() -> MemoryBackend {
        let backend = MemoryBackend::default();
        backend.users.insert(OWNER, false).await;
        backend.users.insert(ADMIN, true).await;
        backend
    }

    fn new_reserve(name: &str) -> NewReserve {
        NewReserve {
            name: name.into(),
            level: "provincial".into(),
            project_type: "irrigation".into(),
            construct_subject: "county".into(),
            site_photo: None,
            upload_cad_id: None,
        }
    }

    async fn open_window(engine: &LifecycleEngine) {
        let now = Utc::now();
        engine
            .set_window_settings(
                ADMIN,
                &[TimeWindow {
                    start_at: now - Duration::hours(1),
                    end_at: now + Duration::hours(1),
                }],
            )
            .await
            .unwrap();
    }

    async fn close_window(engine: &LifecycleEngine) {
        let now = Utc::now();
        engine
            .set_window_settings(
                ADMIN,
                &[TimeWindow {
                    start_at: now - Duration::days(2),
                    end_at: now - Duration::days(1),
                }],
            )
            .await
            .unwrap();
    }

    // -- create / get ----------------------------------------------------------

    #[tokio::test]
    async fn create_starts_in_draft_owned_by_actor() {
        let engine = backend().await.engine();
        let record = engine.create(OWNER, new_reserve("Dam")).await.unwrap();

        assert_eq!(record.status, ReserveStatus::Draft);
        assert_eq!(record.created_by, OWNER);
        assert_eq!(record.updated_by, OWNER);
        assert!(!record.is_case_finish && !record.is_research);
        assert_eq!(engine.get(record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn create_rejects_unknown_artifact() {
        let backend = backend().await;
        let engine = backend.engine();
        let mut input = new_reserve("Dam");
        input.site_photo = Some("does-not-exist".into());

        let err = engine.create(OWNER, input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(backend.reserves.is_empty().await);
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let engine = backend().await.engine();
        let err = engine.get(404).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { id: 404, .. }));
    }

    // -- transitions -----------------------------------------------------------

    #[tokio::test]
    async fn full_lifecycle_moves_forward() {
        let engine = backend().await.engine();
        open_window(&engine).await;
        let id = engine.create(OWNER, new_reserve("Canal")).await.unwrap().id;

        let referred = engine.refer("clerk", id).await.unwrap();
        assert_eq!(referred.status, ReserveStatus::EnteredDb);
        assert_eq!(referred.updated_by, "clerk");

        let flags = TransitionFlags {
            is_case_finish: true,
            is_research: false,
        };
        let submitted = engine.submission("planner", id, flags).await.unwrap();
        assert_eq!(submitted.status, ReserveStatus::EarlyPlan);
        assert!(submitted.is_case_finish);
        assert!(!submitted.is_research);

        let flags = TransitionFlags {
            is_case_finish: true,
            is_research: true,
        };
        let inspected = engine.out_storage("inspector", id, flags).await.unwrap();
        assert_eq!(inspected.status, ReserveStatus::OutStorageInspect);
        assert!(inspected.is_research);
        assert_eq!(inspected.created_by, OWNER);
    }

    #[tokio::test]
    async fn submission_on_draft_is_invalid_and_leaves_status() {
        let engine = backend().await.engine();
        open_window(&engine).await;
        let id = engine.create(OWNER, new_reserve("Canal")).await.unwrap().id;

        let err = engine
            .submission(OWNER, id, TransitionFlags::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: ReserveStatus::Draft,
                to: ReserveStatus::EarlyPlan,
                ..
            }
        ));
        assert_eq!(engine.get(id).await.unwrap().status, ReserveStatus::Draft);
    }

    #[tokio::test]
    async fn refer_twice_is_rejected() {
        let engine = backend().await.engine();
        let id = engine.create(OWNER, new_reserve("Canal")).await.unwrap().id;
        engine.refer(OWNER, id).await.unwrap();

        let err = engine.refer(OWNER, id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(
            engine.get(id).await.unwrap().status,
            ReserveStatus::EnteredDb
        );
    }

    #[tokio::test]
    async fn refer_unknown_is_not_found() {
        let engine = backend().await.engine();
        let err = engine.refer(OWNER, 99).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn refer_is_not_gated() {
        let engine = backend().await.engine();
        close_window(&engine).await;
        let id = engine.create(OWNER, new_reserve("Canal")).await.unwrap().id;
        assert!(engine.refer(OWNER, id).await.is_ok());
    }

    #[tokio::test]
    async fn closed_window_rejects_gated_transitions_without_changes() {
        let engine = backend().await.engine();
        let id = engine.create(OWNER, new_reserve("Canal")).await.unwrap().id;
        engine.refer(OWNER, id).await.unwrap();
        let before = engine.get(id).await.unwrap();

        // No configuration at all.
        let err = engine
            .submission(OWNER, id, TransitionFlags::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::WindowClosed));

        // A configured window that does not cover now.
        close_window(&engine).await;
        let err = engine
            .submission(OWNER, id, TransitionFlags::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WindowClosed);
        assert_eq!(engine.get(id).await.unwrap(), before);

        open_window(&engine).await;
        let after = engine
            .submission(OWNER, id, TransitionFlags::default())
            .await
            .unwrap();
        assert_eq!(after.status, ReserveStatus::EarlyPlan);
    }

    #[tokio::test]
    async fn out_storage_is_gated() {
        let engine = backend().await.engine();
        open_window(&engine).await;
        let id = engine.create(OWNER, new_reserve("Canal")).await.unwrap().id;
        engine.refer(OWNER, id).await.unwrap();
        engine
            .submission(OWNER, id, TransitionFlags::default())
            .await
            .unwrap();

        close_window(&engine).await;
        let err = engine
            .out_storage(OWNER, id, TransitionFlags::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::WindowClosed));
        assert_eq!(
            engine.get(id).await.unwrap().status,
            ReserveStatus::EarlyPlan
        );
    }

    #[tokio::test]
    async fn terminal_record_cannot_advance() {
        let engine = backend().await.engine();
        open_window(&engine).await;
        let id = engine.create(OWNER, new_reserve("Canal")).await.unwrap().id;
        engine.refer(OWNER, id).await.unwrap();
        engine
            .submission(OWNER, id, TransitionFlags::default())
            .await
            .unwrap();
        engine
            .out_storage(OWNER, id, TransitionFlags::default())
            .await
            .unwrap();

        for result in [
            engine.refer(OWNER, id).await,
            engine
                .submission(OWNER, id, TransitionFlags::default())
                .await,
            engine
                .out_storage(OWNER, id, TransitionFlags::default())
                .await,
        ] {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidTransition);
        }
    }

    // -- update ----------------------------------------------------------------

    #[tokio::test]
    async fn replacing_cad_deletes_previous_object() {
        let backend = backend().await;
        let engine = backend.engine();
        let cad_a = backend.objects.seed("a.dwg").await;
        let cad_b = backend.objects.seed("b.dwg").await;

        let mut input = new_reserve("Bridge");
        input.upload_cad_id = Some(cad_a.clone());
        let id = engine.create(OWNER, input).await.unwrap().id;

        let patch = ReservePatch {
            upload_cad_id: Some(Some(cad_b.clone())),
            ..Default::default()
        };
        let updated = engine.update("editor", id, patch).await.unwrap();

        assert_eq!(updated.upload_cad_id.as_deref(), Some(cad_b.as_str()));
        assert_eq!(updated.updated_by, "editor");
        assert!(!backend.objects.exists(&cad_a).await.unwrap());
        assert!(backend.objects.exists(&cad_b).await.unwrap());
    }

    #[tokio::test]
    async fn moving_reference_between_slots_keeps_object() {
        let backend = backend().await;
        let engine = backend.engine();
        let plan = backend.objects.seed("plan.pdf").await;

        let mut input = new_reserve("Depot");
        input.site_photo = Some(plan.clone());
        let id = engine.create(OWNER, input).await.unwrap().id;

        let patch = ReservePatch {
            site_photo: Some(None),
            upload_cad_id: Some(Some(plan.clone())),
            ..Default::default()
        };
        let updated = engine.update(OWNER, id, patch).await.unwrap();

        assert_eq!(updated.site_photo, None);
        assert_eq!(updated.upload_cad_id.as_deref(), Some(plan.as_str()));
        assert!(backend.objects.exists(&plan).await.unwrap());
    }

    #[tokio::test]
    async fn clearing_one_of_two_slots_holding_same_object_keeps_it() {
        let backend = backend().await;
        let engine = backend.engine();
        let plan = backend.objects.seed("plan.pdf").await;

        let mut input = new_reserve("Depot");
        input.site_photo = Some(plan.clone());
        input.upload_cad_id = Some(plan.clone());
        let id = engine.create(OWNER, input).await.unwrap().id;

        let patch = ReservePatch {
            site_photo: Some(None),
            ..Default::default()
        };
        let updated = engine.update(OWNER, id, patch).await.unwrap();
        assert_eq!(updated.upload_cad_id.as_deref(), Some(plan.as_str()));
        assert!(backend.objects.exists(&plan).await.unwrap());

        engine.delete(OWNER, id).await.unwrap();
        assert!(!backend.objects.exists(&plan).await.unwrap());
    }

    #[tokio::test]
    async fn object_held_by_another_record_cannot_be_referenced() {
        let backend = backend().await;
        let engine = backend.engine();
        let photo = backend.objects.seed("site.jpg").await;

        let mut first = new_reserve("First");
        first.site_photo = Some(photo.clone());
        let first = engine.create(OWNER, first).await.unwrap();

        let mut second = new_reserve("Second");
        second.site_photo = Some(photo.clone());
        let err = engine.create(OWNER, second).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert_eq!(backend.reserves.len().await, 1);

        let other = engine.create(OWNER, new_reserve("Other")).await.unwrap();
        let patch = ReservePatch {
            upload_cad_id: Some(Some(photo.clone())),
            ..Default::default()
        };
        let err = engine.update(OWNER, other.id, patch).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert_eq!(engine.get(other.id).await.unwrap().upload_cad_id, None);

        engine.delete(OWNER, first.id).await.unwrap();
        assert!(!backend.objects.exists(&photo).await.unwrap());
    }

    #[tokio::test]
    async fn failed_object_delete_leaves_record_unchanged() {
        let backend = backend().await;
        let engine = backend.engine();
        let cad_a = backend.objects.seed("a.dwg").await;
        let cad_b = backend.objects.seed("b.dwg").await;

        let mut input = new_reserve("Bridge");
        input.upload_cad_id = Some(cad_a.clone());
        let before = engine.create(OWNER, input).await.unwrap();
        backend.objects.fail_deletes_of(&cad_a).await;

        let patch = ReservePatch {
            name: Some("Bridge II".into()),
            upload_cad_id: Some(Some(cad_b)),
            ..Default::default()
        };
        let err = engine.update("editor", before.id, patch).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ObjectStore);
        assert_eq!(engine.get(before.id).await.unwrap(), before);
        assert!(backend.objects.exists(&cad_a).await.unwrap());
    }

    #[tokio::test]
    async fn update_with_absent_slot_keeps_artifact() {
        let backend = backend().await;
        let engine = backend.engine();
        let photo = backend.objects.seed("site.jpg").await;

        let mut input = new_reserve("Tunnel");
        input.site_photo = Some(photo.clone());
        let id = engine.create(OWNER, input).await.unwrap().id;

        let patch = ReservePatch {
            level: Some("national".into()),
            ..Default::default()
        };
        let updated = engine.update(OWNER, id, patch).await.unwrap();
        assert_eq!(updated.level, "national");
        assert_eq!(updated.site_photo.as_deref(), Some(photo.as_str()));
        assert!(backend.objects.exists(&photo).await.unwrap());
    }

    #[tokio::test]
    async fn update_does_not_touch_status() {
        let engine = backend().await.engine();
        let id = engine.create(OWNER, new_reserve("Tunnel")).await.unwrap().id;
        engine.refer(OWNER, id).await.unwrap();

        let patch = ReservePatch {
            name: Some("Tunnel II".into()),
            ..Default::default()
        };
        let updated = engine.update(OWNER, id, patch).await.unwrap();
        assert_eq!(updated.status, ReserveStatus::EnteredDb);
    }

    #[tokio::test]
    async fn update_unknown_is_not_found() {
        let engine = backend().await.engine();
        let err = engine
            .update(OWNER, 5, ReservePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // -- delete ----------------------------------------------------------------

    #[tokio::test]
    async fn delete_releases_artifacts_then_row() {
        let backend = backend().await;
        let engine = backend.engine();
        let photo = backend.objects.seed("site.jpg").await;
        let cad = backend.objects.seed("plan.dwg").await;

        let mut input = new_reserve("Harbour");
        input.site_photo = Some(photo.clone());
        input.upload_cad_id = Some(cad.clone());
        let id = engine.create(OWNER, input).await.unwrap().id;

        engine.delete(OWNER, id).await.unwrap();
        assert!(backend.objects.is_empty().await);
        assert_eq!(engine.get(id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_tolerates_already_removed_artifact() {
        let backend = backend().await;
        let engine = backend.engine();
        let photo = backend.objects.seed("site.jpg").await;

        let mut input = new_reserve("Harbour");
        input.site_photo = Some(photo.clone());
        let id = engine.create(OWNER, input).await.unwrap().id;
        backend.objects.delete(&photo).await.unwrap();

        engine.delete(OWNER, id).await.unwrap();
        assert!(backend.reserves.is_empty().await);
    }

    #[tokio::test]
    async fn failed_artifact_release_keeps_record() {
        let backend = backend().await;
        let engine = backend.engine();
        let cad = backend.objects.seed("plan.dwg").await;

        let mut input = new_reserve("Harbour");
        input.upload_cad_id = Some(cad.clone());
        let before = engine.create(OWNER, input).await.unwrap();
        backend.objects.fail_deletes_of(&cad).await;

        let err = engine.delete(OWNER, before.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ObjectStore);
        assert_eq!(engine.get(before.id).await.unwrap(), before);
    }

    // -- list ------------------------------------------------------------------

    #[tokio::test]
    async fn listing_is_scoped_to_owner_unless_admin() {
        let backend = backend().await;
        backend.users.insert("other-openid", false).await;
        let engine = backend.engine();

        engine.create(OWNER, new_reserve("Mine")).await.unwrap();
        engine.create("other-openid", new_reserve("Theirs")).await.unwrap();

        let mine = engine
            .list(OWNER, &ReserveFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(mine.total, 1);
        assert!(mine.items.iter().all(|r| r.created_by == OWNER));

        let all = engine
            .list(ADMIN, &ReserveFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    async fn listing_requires_known_actor() {
        let engine = backend().await.engine();
        let err = engine
            .list("stranger", &ReserveFilter::default(), PageRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownActor);
    }

    #[tokio::test]
    async fn listing_applies_filter_and_page() {
        let engine = backend().await.engine();
        for name in ["North dam", "South dam", "East road"] {
            engine.create(OWNER, new_reserve(name)).await.unwrap();
        }

        let filter = ReserveFilter {
            name: Some("dam".into()),
            ..Default::default()
        };
        let page = engine
            .list(OWNER, &filter, PageRequest::new(Some(1), Some(0)))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "South dam");
    }

    // -- analysis and windows --------------------------------------------------

    #[tokio::test]
    async fn data_analysis_counts_by_status() {
        let engine = backend().await.engine();
        let first = engine.create(OWNER, new_reserve("A")).await.unwrap();
        engine.create(OWNER, new_reserve("B")).await.unwrap();
        engine.refer(OWNER, first.id).await.unwrap();

        let filter = AnalysisFilter::new(crate::analysis::GroupBy::ProjectType);
        let result = engine.data_analysis(&filter).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].bucket, "irrigation");
        assert_eq!(result[0].total, 2);
        assert_eq!(result[0].data.len(), 2);
    }

    #[tokio::test]
    async fn window_settings_require_admin() {
        let engine = backend().await.engine();
        let now = Utc::now();
        let window = TimeWindow {
            start_at: now,
            end_at: now + Duration::hours(1),
        };

        let err = engine
            .set_window_settings(OWNER, &[window])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        engine.set_window_settings(ADMIN, &[window]).await.unwrap();
        assert_eq!(engine.window_settings().await.unwrap(), vec![window]);
    }
}
