//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Prune: Evicts outdated and stale records from every store at configured intervals

mod prune;

pub use prune::spawn_prune_task;
