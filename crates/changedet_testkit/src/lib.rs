//! # changedet testkit
//!
//! Reference host and test utilities for changedet.
//!
//! This crate provides:
//! - An in-memory database with a statement log ([`MemoryDatabase`])
//! - A minimal entity manager that runs the change detector on load,
//!   flush and clear ([`EntityManager`])
//! - Fixtures for the test entity and managers with or without a detector
//! - Property-based test generators using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use changedet_testkit::prelude::*;
//!
//! let mut em = entity_manager();
//! seed_test_entity(&mut em, 1, "2000-01-01").unwrap();
//!
//! let entity = em.find(TEST_ENTITY, 1).unwrap().unwrap();
//! em.date(entity, DATE_BY_VALUE).unwrap().shift_days(1);
//! em.reset_queries();
//! em.flush().unwrap();
//!
//! assert_eq!(em.queries().writes(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
mod error;
pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod manager;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::database::{MemoryDatabase, QueryLog, Statement};
    pub use crate::error::{HostError, HostResult};
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::init_tracing;
    pub use crate::manager::{EntityManager, UnitOfWork};
}

pub use database::{MemoryDatabase, QueryLog, Row, Statement};
pub use error::{HostError, HostResult};
pub use manager::{EntityManager, UnitOfWork};
