//! Ancillary context-window bookkeeping for the `waypoint` agent-orchestration
//! runtime.
//!
//! This crate is a caller-side convenience, not a Reactor dependency: the
//! Reactor's own turn loop has no context-window gate and reads a run's
//! full memory fork on every turn. Callers who want to budget a long-running
//! conversation against a model's context window reach for [`TokenCounter`]
//! to estimate usage and a [`ContextStrategy`] to compact a thread between
//! turns or runs.
//!
//! Grounded on the donor codebase's context-compaction crate: the
//! `ContextStrategy` trait and its `NoCompaction`/`SlidingWindow`
//! implementations, and the chars-per-token `TokenCounter` heuristic.

pub mod counter;
pub mod strategies;

pub use counter::TokenCounter;
pub use strategies::{ContextStrategy, NoCompaction, SlidingWindow};
