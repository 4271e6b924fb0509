//! Lifecycle entry points.

use crate::classifier::FieldClassifier;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::metadata::EntityMetadata;
use crate::reconciler::{self, ReconcileReport};
use crate::session::EntitySession;
use crate::snapshot::{SnapshotStore, ValueSnapshot};
use crate::stats::DetectorStats;
use crate::token::{EntityToken, SessionId};
use tracing::{debug, warn};

/// Corrects a session's dirty-checking for fields opted into database-value
/// comparison.
///
/// The host calls the four entry points at fixed points of its lifecycle:
///
/// - [`post_load`](Self::post_load) after an entity is materialized,
/// - [`pre_flush`](Self::pre_flush) before it computes change sets,
/// - [`post_flush`](Self::post_flush) after the writes succeed,
/// - [`on_clear`](Self::on_clear) when the session is reset.
///
/// A detector belongs to exactly one session. It binds to the first session
/// that calls it and rejects any other with
/// [`CoreError::SessionMismatch`].
#[derive(Debug, Default)]
pub struct ChangeDetector {
    config: Config,
    classifier: FieldClassifier,
    store: SnapshotStore,
    stats: DetectorStats,
    session: Option<SessionId>,
}

impl ChangeDetector {
    /// Creates a detector with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the statistics.
    #[must_use]
    pub fn stats(&self) -> &DetectorStats {
        &self.stats
    }

    /// Session this detector is bound to, if any call was made yet.
    #[must_use]
    pub fn bound_session(&self) -> Option<SessionId> {
        self.session
    }

    /// True if the entity currently has a baseline.
    #[must_use]
    pub fn is_tracking(&self, token: EntityToken) -> bool {
        self.store.contains(token)
    }

    /// Number of entities currently holding a baseline.
    #[must_use]
    pub fn tracked_entities(&self) -> usize {
        self.store.entity_count()
    }

    /// Number of entity types classified since the last clear.
    #[must_use]
    pub fn classified_types(&self) -> usize {
        self.classifier.len()
    }

    /// Records the baseline of a freshly loaded entity.
    pub fn post_load<S>(&mut self, session: &S, token: EntityToken) -> CoreResult<()>
    where
        S: EntitySession + ?Sized,
    {
        self.bind(session.session_id())?;

        let entity_type = session.entity_type(token)?;
        if self.classifier.is_not_concerned(&entity_type) {
            return Ok(());
        }
        let metadata = session.metadata(&entity_type)?;
        self.capture(session, token, &metadata)
    }

    /// Corrects tracked field values before the session computes its
    /// change sets.
    pub fn pre_flush<S>(&mut self, session: &mut S) -> CoreResult<ReconcileReport>
    where
        S: EntitySession + ?Sized,
    {
        self.bind(session.session_id())?;
        reconciler::reconcile(session, &self.classifier, &mut self.store, &self.stats)
    }

    /// Rebuilds baselines from the just-written state.
    ///
    /// Does nothing when [`Config::rebaseline_after_flush`] is off.
    pub fn post_flush<S>(&mut self, session: &S) -> CoreResult<()>
    where
        S: EntitySession + ?Sized,
    {
        self.bind(session.session_id())?;
        if !self.config.rebaseline_after_flush {
            return Ok(());
        }

        self.store.clear();
        for (entity_type, tokens) in session.identity_map() {
            if self.classifier.is_not_concerned(&entity_type) {
                continue;
            }
            let metadata = session.metadata(&entity_type)?;
            for token in tokens {
                self.capture(session, token, &metadata)?;
            }
        }
        Ok(())
    }

    /// Forgets all snapshots and classifications.
    pub fn on_clear(&mut self) {
        self.store.clear();
        self.classifier.clear();
        self.stats.record_clear();
        debug!("change detector cleared");
    }

    fn bind(&mut self, actual: SessionId) -> CoreResult<()> {
        match self.session {
            None => {
                self.session = Some(actual);
                Ok(())
            }
            Some(bound) if bound == actual => Ok(()),
            Some(bound) => {
                warn!(%bound, %actual, "change detector called from a foreign session");
                Err(CoreError::SessionMismatch { bound, actual })
            }
        }
    }

    fn capture<S>(
        &mut self,
        session: &S,
        token: EntityToken,
        metadata: &EntityMetadata,
    ) -> CoreResult<()>
    where
        S: EntitySession + ?Sized,
    {
        let Some(fields) = self.classifier.classify(metadata) else {
            return Ok(());
        };

        if let Some(max) = self.config.max_tracked_entities {
            if !self.store.contains(token) && self.store.entity_count() >= max {
                warn!(%token, max, "tracking bound reached, entity left to native detection");
                self.stats.record_capture_skipped();
                return Ok(());
            }
        }

        let types = session.field_types();
        let mut snapshots = Vec::with_capacity(fields.len());
        for field in fields.iter() {
            let mapping = metadata
                .mapping(field)
                .ok_or_else(|| CoreError::unknown_field(&metadata.name, field))?;
            let application = session.field_value(token, field)?;
            let stored = types
                .get(&mapping.type_name)?
                .to_database_value(&application)?;
            snapshots.push((field.clone(), ValueSnapshot { application, stored }));
        }

        self.store.record(token, snapshots);
        self.stats.record_capture(fields.len() as u64);
        debug!(%token, entity_type = %metadata.name, fields = fields.len(), "captured baseline");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FieldMapping;
    use changedet_codec::{AppValue, TypeRegistry, Value};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Minimal host: entities are field maps, no persistence.
    struct FakeSession {
        id: SessionId,
        types: TypeRegistry,
        metadata: HashMap<String, Arc<EntityMetadata>>,
        entities: Vec<(String, HashMap<String, AppValue>)>,
    }

    impl FakeSession {
        fn new() -> Self {
            let event = EntityMetadata::new("Event", "event")
                .field(FieldMapping::new("title", "string"))
                .field(FieldMapping::new("day", "date").detect_change_by_database_value());
            let tag = EntityMetadata::new("Tag", "tag").field(FieldMapping::new("label", "string"));
            Self {
                id: SessionId::new(),
                types: TypeRegistry::with_defaults(),
                metadata: HashMap::from([
                    ("Event".to_string(), Arc::new(event)),
                    ("Tag".to_string(), Arc::new(tag)),
                ]),
                entities: Vec::new(),
            }
        }

        fn add_event(&mut self, d: u32) -> EntityToken {
            let fields = HashMap::from([
                ("title".to_string(), AppValue::from("launch")),
                ("day".to_string(), AppValue::date(date(d))),
            ]);
            self.entities.push(("Event".into(), fields));
            EntityToken::new(self.entities.len() as u64 - 1)
        }

        fn add_tag(&mut self) -> EntityToken {
            let fields = HashMap::from([("label".to_string(), AppValue::from("x"))]);
            self.entities.push(("Tag".into(), fields));
            EntityToken::new(self.entities.len() as u64 - 1)
        }

        fn field(&self, token: EntityToken, field: &str) -> AppValue {
            self.entities[token.as_u64() as usize].1[field].clone()
        }
    }

    impl EntitySession for FakeSession {
        fn session_id(&self) -> SessionId {
            self.id
        }

        fn metadata(&self, entity_type: &str) -> CoreResult<Arc<EntityMetadata>> {
            self.metadata
                .get(entity_type)
                .cloned()
                .ok_or_else(|| CoreError::unknown_entity_type(entity_type))
        }

        fn field_types(&self) -> &TypeRegistry {
            &self.types
        }

        fn entity_type(&self, token: EntityToken) -> CoreResult<String> {
            self.entities
                .get(token.as_u64() as usize)
                .map(|(ty, _)| ty.clone())
                .ok_or(CoreError::entity_not_managed(token))
        }

        fn field_value(&self, token: EntityToken, field: &str) -> CoreResult<AppValue> {
            let (ty, fields) = self
                .entities
                .get(token.as_u64() as usize)
                .ok_or(CoreError::entity_not_managed(token))?;
            fields
                .get(field)
                .cloned()
                .ok_or_else(|| CoreError::unknown_field(ty, field))
        }

        fn set_field_value(
            &mut self,
            token: EntityToken,
            field: &str,
            value: AppValue,
        ) -> CoreResult<()> {
            let (_, fields) = self
                .entities
                .get_mut(token.as_u64() as usize)
                .ok_or(CoreError::entity_not_managed(token))?;
            fields.insert(field.to_string(), value);
            Ok(())
        }

        fn identity_map(&self) -> Vec<(String, Vec<EntityToken>)> {
            let mut map: Vec<(String, Vec<EntityToken>)> = Vec::new();
            for (i, (ty, _)) in self.entities.iter().enumerate() {
                let token = EntityToken::new(i as u64);
                match map.iter_mut().find(|(t, _)| t == ty) {
                    Some((_, tokens)) => tokens.push(token),
                    None => map.push((ty.clone(), vec![token])),
                }
            }
            map
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 1, d).unwrap()
    }

    #[test]
    fn load_captures_tracked_fields_only() {
        let mut session = FakeSession::new();
        let event = session.add_event(1);
        let tag = session.add_tag();
        let mut detector = ChangeDetector::default();

        detector.post_load(&session, event).unwrap();
        detector.post_load(&session, tag).unwrap();

        assert!(detector.is_tracking(event));
        assert!(!detector.is_tracking(tag));
        assert_eq!(detector.stats().fields_captured(), 1);
        assert_eq!(detector.classified_types(), 2);
    }

    #[test]
    fn capture_is_idempotent() {
        let mut session = FakeSession::new();
        let event = session.add_event(1);
        let mut detector = ChangeDetector::default();

        detector.post_load(&session, event).unwrap();
        detector.post_load(&session, event).unwrap();

        let snap = detector.store.get(event, "day").unwrap();
        assert_eq!(snap.stored, Value::from("2000-01-01"));
        assert!(snap.application.same(&session.field(event, "day")));
        assert_eq!(detector.tracked_entities(), 1);
    }

    #[test]
    fn equal_new_object_is_reverted() {
        let mut session = FakeSession::new();
        let event = session.add_event(1);
        let mut detector = ChangeDetector::default();
        detector.post_load(&session, event).unwrap();
        let original = session.field(event, "day");

        session
            .set_field_value(event, "day", AppValue::date(date(1)))
            .unwrap();
        let report = detector.pre_flush(&mut session).unwrap();

        assert_eq!(report.unchanged, 1);
        assert_eq!(report.reverted, 1);
        assert!(session.field(event, "day").same(&original));
    }

    #[test]
    fn in_place_mutation_is_replaced_by_fresh_value() {
        let mut session = FakeSession::new();
        let event = session.add_event(1);
        let mut detector = ChangeDetector::default();
        detector.post_load(&session, event).unwrap();
        let original = session.field(event, "day");

        original.as_date_time().unwrap().shift_days(1).unwrap();
        let report = detector.pre_flush(&mut session).unwrap();

        assert_eq!(report.forced, 1);
        let now = session.field(event, "day");
        assert!(!now.same(&original));
        assert_eq!(now.as_date_time().unwrap().date(), date(2));
    }

    #[test]
    fn real_change_is_left_alone() {
        let mut session = FakeSession::new();
        let event = session.add_event(1);
        let mut detector = ChangeDetector::default();
        detector.post_load(&session, event).unwrap();

        let replacement = AppValue::date(date(5));
        session
            .set_field_value(event, "day", replacement.clone())
            .unwrap();
        let report = detector.pre_flush(&mut session).unwrap();

        assert_eq!(report.native, 1);
        assert!(session.field(event, "day").same(&replacement));
    }

    #[test]
    fn snapshots_are_consumed_by_reconcile() {
        let mut session = FakeSession::new();
        let event = session.add_event(1);
        let mut detector = ChangeDetector::default();
        detector.post_load(&session, event).unwrap();

        let first = detector.pre_flush(&mut session).unwrap();
        assert_eq!(first.entities, 1);
        assert!(!detector.is_tracking(event));

        let second = detector.pre_flush(&mut session).unwrap();
        assert_eq!(second, ReconcileReport::default());
    }

    #[test]
    fn untracked_entity_is_skipped() {
        let mut session = FakeSession::new();
        let _never_loaded = session.add_event(1);
        let mut detector = ChangeDetector::default();

        let report = detector.pre_flush(&mut session).unwrap();
        assert_eq!(report.entities, 0);
    }

    #[test]
    fn post_flush_rebaselines_every_live_entity() {
        let mut session = FakeSession::new();
        let a = session.add_event(1);
        let b = session.add_event(2);
        let tag = session.add_tag();
        let mut detector = ChangeDetector::default();

        detector.post_flush(&session).unwrap();

        assert!(detector.is_tracking(a));
        assert!(detector.is_tracking(b));
        assert!(!detector.is_tracking(tag));
    }

    #[test]
    fn post_flush_can_be_disabled() {
        let mut session = FakeSession::new();
        let a = session.add_event(1);
        let mut detector = ChangeDetector::new(Config::new().rebaseline_after_flush(false));

        detector.post_flush(&session).unwrap();
        assert!(!detector.is_tracking(a));
    }

    #[test]
    fn clear_drops_snapshots_and_classification() {
        let mut session = FakeSession::new();
        let event = session.add_event(1);
        let mut detector = ChangeDetector::default();
        detector.post_load(&session, event).unwrap();

        detector.on_clear();

        assert_eq!(detector.tracked_entities(), 0);
        assert_eq!(detector.classified_types(), 0);
        assert_eq!(detector.stats().clears(), 1);
        let report = detector.pre_flush(&mut session).unwrap();
        assert_eq!(report.entities, 0);
    }

    #[test]
    fn foreign_session_is_rejected() {
        let mut first = FakeSession::new();
        let event = first.add_event(1);
        let mut second = FakeSession::new();
        second.add_event(1);
        let mut detector = ChangeDetector::default();

        detector.post_load(&first, event).unwrap();
        let err = detector.pre_flush(&mut second).unwrap_err();

        assert!(matches!(err, CoreError::SessionMismatch { .. }));
        assert!(detector.is_tracking(event));
        assert_eq!(detector.bound_session(), Some(first.session_id()));
    }

    #[test]
    fn tracking_bound_skips_new_entities() {
        let mut session = FakeSession::new();
        let a = session.add_event(1);
        let b = session.add_event(2);
        let mut detector = ChangeDetector::new(Config::new().max_tracked_entities(1));

        detector.post_load(&session, a).unwrap();
        detector.post_load(&session, b).unwrap();
        // re-capturing a tracked entity is still allowed
        detector.post_load(&session, a).unwrap();

        assert!(detector.is_tracking(a));
        assert!(!detector.is_tracking(b));
        assert_eq!(detector.stats().captures_skipped(), 1);
        assert_eq!(detector.stats().captures(), 2);
    }

    #[test]
    fn codec_failure_keeps_baseline() {
        let mut session = FakeSession::new();
        let event = session.add_event(1);
        let mut detector = ChangeDetector::default();
        detector.post_load(&session, event).unwrap();

        // a date column cannot hold an integer
        session
            .set_field_value(event, "day", AppValue::Integer(3))
            .unwrap();
        let err = detector.pre_flush(&mut session).unwrap_err();

        assert!(matches!(err, CoreError::Codec(_)));
        assert!(detector.is_tracking(event));
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let session = FakeSession::new();
        let mut detector = ChangeDetector::default();
        let err = detector.post_load(&session, EntityToken::new(42)).unwrap_err();
        assert!(matches!(err, CoreError::EntityNotManaged { .. }));
    }

    #[test]
    fn not_concerned_type_skips_metadata() {
        let mut session = FakeSession::new();
        let tag = session.add_tag();
        let mut detector = ChangeDetector::default();
        detector.post_load(&session, tag).unwrap();

        // metadata for the type is gone; the negative cache answers alone
        session.metadata.remove("Tag");
        detector.post_load(&session, tag).unwrap();
        detector.pre_flush(&mut session).unwrap();
        detector.post_flush(&session).unwrap();
    }
}
