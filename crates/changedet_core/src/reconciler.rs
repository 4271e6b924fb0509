//! The pre-flush correction pass.
//!
//! For every tracked field of every live entity the current value is
//! compared with its snapshot in both representations:
//!
//! | stored values | application values | action |
//! |---|---|---|
//! | equal | any | put the snapshotted application value back |
//! | differ | differ | nothing, native dirty-checking sees it |
//! | differ | same | assign a value freshly decoded from the stored one |
//!
//! After that, the session's own dirty-checking reaches the right verdict:
//! no write for inert changes, a write for every change the database would
//! see.

use crate::classifier::FieldClassifier;
use crate::error::{CoreError, CoreResult};
use crate::metadata::EntityMetadata;
use crate::session::EntitySession;
use crate::snapshot::{SnapshotStore, ValueSnapshot};
use crate::stats::DetectorStats;
use changedet_codec::{AppValue, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// What reconciliation does with one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDecision {
    /// The database would hold the same value: restore the snapshotted
    /// application value.
    Unchanged,
    /// Both representations changed: leave it to native dirty-checking.
    NativeChange,
    /// Only the stored value changed: replace the application value so the
    /// change is seen.
    ForceUpdate,
}

/// Classifies a field against its snapshot.
#[must_use]
pub fn decide(snapshot: &ValueSnapshot, current: &AppValue, stored: &Value) -> FieldDecision {
    if *stored == snapshot.stored {
        FieldDecision::Unchanged
    } else if !current.same(&snapshot.application) {
        FieldDecision::NativeChange
    } else {
        FieldDecision::ForceUpdate
    }
}

/// Summary of one reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    /// Entities that had snapshots and were processed.
    pub entities: usize,
    /// Fields whose stored value was unchanged.
    pub unchanged: usize,
    /// Unchanged fields whose application value had to be put back.
    pub reverted: usize,
    /// Fields replaced to force an update.
    pub forced: usize,
    /// Fields left to native dirty-checking.
    pub native: usize,
}

/// Runs the correction pass over every live entity of `session`.
///
/// Snapshots of an entity are removed once all its fields are processed. If
/// a field fails, the error is returned and that entity keeps its
/// snapshots, so a retried flush starts from the same baseline.
pub(crate) fn reconcile<S>(
    session: &mut S,
    classifier: &FieldClassifier,
    store: &mut SnapshotStore,
    stats: &DetectorStats,
) -> CoreResult<ReconcileReport>
where
    S: EntitySession + ?Sized,
{
    let mut report = ReconcileReport::default();

    for (entity_type, tokens) in session.identity_map() {
        if classifier.is_not_concerned(&entity_type) {
            continue;
        }

        // fetched on the first entity of this type that has snapshots
        let mut metadata: Option<Arc<EntityMetadata>> = None;

        for token in tokens {
            let Some(snapshots) = store.fields(token) else {
                continue;
            };

            let meta = match &metadata {
                Some(meta) => Arc::clone(meta),
                None => {
                    let meta = session.metadata(&entity_type)?;
                    metadata = Some(Arc::clone(&meta));
                    meta
                }
            };

            for (field, snapshot) in snapshots {
                let mapping = meta
                    .mapping(field)
                    .ok_or_else(|| CoreError::unknown_field(&meta.name, field))?;
                let field_type = Arc::clone(session.field_types().get(&mapping.type_name)?);

                let current = session.field_value(token, field)?;
                let stored = field_type.to_database_value(&current)?;

                match decide(snapshot, &current, &stored) {
                    FieldDecision::Unchanged => {
                        let reverted = !current.same(&snapshot.application);
                        if reverted {
                            session.set_field_value(token, field, snapshot.application.clone())?;
                            report.reverted += 1;
                        }
                        report.unchanged += 1;
                        stats.record_unchanged(reverted);
                        trace!(%token, field = %field, reverted, "stored value unchanged");
                    }
                    FieldDecision::NativeChange => {
                        report.native += 1;
                        stats.record_native_change();
                        trace!(%token, field = %field, "change left to native detection");
                    }
                    FieldDecision::ForceUpdate => {
                        let fresh = field_type.to_application_value(&stored)?;
                        session.set_field_value(token, field, fresh)?;
                        report.forced += 1;
                        stats.record_forced_update();
                        trace!(%token, field = %field, ?stored, "forcing update");
                    }
                }
            }

            store.remove(token);
            report.entities += 1;
            stats.record_entity_reconciled();
        }
    }

    debug!(
        entities = report.entities,
        reverted = report.reverted,
        forced = report.forced,
        native = report.native,
        "reconciled tracked fields"
    );
    Ok(report)
}
