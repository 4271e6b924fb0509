//! Detector statistics.
//!
//! Counters describing what the detector did over its lifetime, for
//! monitoring and for asserting behavior in tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! let detector = ChangeDetector::new(Config::default());
//! // ... load, flush ...
//! let stats = detector.stats().snapshot();
//! println!("forced updates: {}", stats.updates_forced);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Detector statistics.
///
/// Counters are atomic so they can be read through a shared reference while
/// the detector is held elsewhere. All values are monotonically increasing.
#[derive(Debug, Default)]
pub struct DetectorStats {
    // Capture counters
    /// Entities captured.
    captures: AtomicU64,
    /// Field snapshots taken.
    fields_captured: AtomicU64,
    /// Captures skipped because the tracking bound was reached.
    captures_skipped: AtomicU64,

    // Reconcile counters
    /// Entities reconciled.
    entities_reconciled: AtomicU64,
    /// Fields whose stored value was unchanged.
    fields_unchanged: AtomicU64,
    /// Fields reset to their snapshotted application value.
    fields_reverted: AtomicU64,
    /// Fields replaced with a freshly decoded value to force an update.
    updates_forced: AtomicU64,
    /// Fields left to native dirty-checking.
    native_changes: AtomicU64,

    // Lifecycle counters
    /// Session clears.
    clears: AtomicU64,
}

impl DetectorStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    pub(crate) fn record_capture(&self, fields: u64) {
        self.captures.fetch_add(1, Ordering::Relaxed);
        self.fields_captured.fetch_add(fields, Ordering::Relaxed);
    }

    pub(crate) fn record_capture_skipped(&self) {
        self.captures_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_entity_reconciled(&self) {
        self.entities_reconciled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unchanged(&self, reverted: bool) {
        self.fields_unchanged.fetch_add(1, Ordering::Relaxed);
        if reverted {
            self.fields_reverted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_forced_update(&self) {
        self.updates_forced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_native_change(&self) {
        self.native_changes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    // === Getter methods (public API) ===

    /// Returns the number of entities captured.
    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::Relaxed)
    }

    /// Returns the number of field snapshots taken.
    pub fn fields_captured(&self) -> u64 {
        self.fields_captured.load(Ordering::Relaxed)
    }

    /// Returns the number of captures skipped by the tracking bound.
    pub fn captures_skipped(&self) -> u64 {
        self.captures_skipped.load(Ordering::Relaxed)
    }

    /// Returns the number of entities reconciled.
    pub fn entities_reconciled(&self) -> u64 {
        self.entities_reconciled.load(Ordering::Relaxed)
    }

    /// Returns the number of fields found unchanged at the database level.
    pub fn fields_unchanged(&self) -> u64 {
        self.fields_unchanged.load(Ordering::Relaxed)
    }

    /// Returns the number of fields reset to their snapshotted value.
    ///
    /// Always at most [`fields_unchanged`](Self::fields_unchanged).
    pub fn fields_reverted(&self) -> u64 {
        self.fields_reverted.load(Ordering::Relaxed)
    }

    /// Returns the number of forced updates.
    pub fn updates_forced(&self) -> u64 {
        self.updates_forced.load(Ordering::Relaxed)
    }

    /// Returns the number of fields left to native dirty-checking.
    pub fn native_changes(&self) -> u64 {
        self.native_changes.load(Ordering::Relaxed)
    }

    /// Returns the number of session clears.
    pub fn clears(&self) -> u64 {
        self.clears.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            captures: self.captures(),
            fields_captured: self.fields_captured(),
            captures_skipped: self.captures_skipped(),
            entities_reconciled: self.entities_reconciled(),
            fields_unchanged: self.fields_unchanged(),
            fields_reverted: self.fields_reverted(),
            updates_forced: self.updates_forced(),
            native_changes: self.native_changes(),
            clears: self.clears(),
        }
    }
}

/// A point-in-time copy of [`DetectorStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Entities captured.
    pub captures: u64,
    /// Field snapshots taken.
    pub fields_captured: u64,
    /// Captures skipped by the tracking bound.
    pub captures_skipped: u64,
    /// Entities reconciled.
    pub entities_reconciled: u64,
    /// Fields unchanged at the database level.
    pub fields_unchanged: u64,
    /// Fields reset to their snapshotted value.
    pub fields_reverted: u64,
    /// Forced updates.
    pub updates_forced: u64,
    /// Fields left to native dirty-checking.
    pub native_changes: u64,
    /// Session clears.
    pub clears: u64,
}
