//! # changedet core
//!
//! Database-value change detection for entity sessions.
//!
//! An entity session decides what to write by comparing each field's
//! in-memory value with the value it saw at load time. For fields held as
//! mutable objects, or as values richer than their column, that comparison
//! is wrong in both directions: an object mutated in place looks unchanged,
//! and a new but equal object looks changed.
//!
//! [`ChangeDetector`] fixes this for fields opted in through
//! [`FieldOptions::detect_change_by_database_value`]. It keeps a baseline of
//! each such field in both representations and, just before the session
//! computes its change sets, adjusts field values so the session's own
//! comparison gives the answer the database would.
//!
//! This crate provides:
//! - The host interface ([`EntitySession`]) and metadata model
//! - Per-type field classification ([`FieldClassifier`])
//! - The baseline store ([`SnapshotStore`])
//! - The pre-flush correction pass ([`reconciler`])
//! - Lifecycle entry points ([`ChangeDetector`])

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod classifier;
mod config;
mod detector;
mod error;
mod metadata;
pub mod reconciler;
mod session;
mod snapshot;
mod stats;
mod token;

pub use classifier::FieldClassifier;
pub use config::Config;
pub use detector::ChangeDetector;
pub use error::{CoreError, CoreResult};
pub use metadata::{EntityMetadata, FieldMapping, FieldOptions, DETECT_CHANGE_OPTION};
pub use reconciler::{FieldDecision, ReconcileReport};
pub use session::EntitySession;
pub use snapshot::{SnapshotStore, ValueSnapshot};
pub use stats::{DetectorStats, StatsSnapshot};
pub use token::{EntityToken, SessionId};

pub use changedet_codec::{AppValue, DateTimeCell, FieldType, TypeRegistry, Value};
