//! Detector configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`ChangeDetector`](crate::ChangeDetector).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Re-capture every tracked entity after a successful flush.
    ///
    /// When off, snapshots consumed by a flush are only rebuilt on the next
    /// load. An entity modified, flushed and modified again without a reload
    /// then falls back to native dirty-checking for the second change, and a
    /// newly persisted entity has no baseline at all.
    pub rebaseline_after_flush: bool,

    /// Upper bound on the number of entities holding snapshots.
    ///
    /// Capturing a new entity beyond the bound is skipped with a warning,
    /// leaving that entity to native dirty-checking. `None` is unbounded.
    pub max_tracked_entities: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rebaseline_after_flush: true,
            max_tracked_entities: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to re-capture snapshots after a flush.
    #[must_use]
    pub const fn rebaseline_after_flush(mut self, value: bool) -> Self {
        self.rebaseline_after_flush = value;
        self
    }

    /// Bounds the number of tracked entities.
    #[must_use]
    pub const fn max_tracked_entities(mut self, max: usize) -> Self {
        self.max_tracked_entities = Some(max);
        self
    }
}
