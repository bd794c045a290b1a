//! Core engine for fsynth.
//!
//! This module contains the subsystems that make a batch of filesystem
//! mutations behave transactionally:
//! - `checksum` for content digests used in drift detection
//! - `permissions` for the pre-mutation readability/writability probe
//! - `fs_util` for the shared filesystem primitives
//! - `operations` for the six reversible operation variants
//! - `queue` for the ordered operation queue
//! - `processor` for the execution models and rollback
//! - `results` for the structured batch outcome
//!

pub mod checksum;
pub mod fs_util;
pub mod operations;
pub mod permissions;
pub mod processor;
pub mod queue;
pub mod results;
