#![deny(missing_docs)]
//! # waypoint — umbrella crate
//!
//! A single import surface for the `waypoint` agent-orchestration runtime:
//! an Event Bus, a forkable short-term Memory, a Tool Registry with schema
//! derivation, a Tool Dispatcher, and the per-run Reactor that drives them.
//! Re-exports each component crate behind a feature flag, plus a `prelude`
//! for the common case of wiring all of them together.

#[cfg(feature = "core")]
pub use waypoint_bus;
#[cfg(feature = "context")]
pub use waypoint_context;
#[cfg(feature = "core")]
pub use waypoint_dispatch;
#[cfg(feature = "core")]
pub use waypoint_memory;
#[cfg(feature = "core")]
pub use waypoint_reactor;
#[cfg(feature = "core")]
pub use waypoint_tool;
#[cfg(feature = "core")]
pub use waypoint_types;

/// Happy-path imports for wiring up a run.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use waypoint_types::{
        Agent, AgentHandle, ChatCompletionRequest, ContextVariables, Event, EventBody, Hook,
        Provider, RunError, RunId, StaticAgent, StaticModel, ToolDefinition, ToolOutcome, TurnId,
    };

    #[cfg(feature = "core")]
    pub use waypoint_bus::{BusConfig, Subscription, Topic};

    #[cfg(feature = "core")]
    pub use waypoint_memory::{Checkpoint, Memory};

    #[cfg(feature = "core")]
    pub use waypoint_tool::{waypoint_tool, ToolCallResult, ToolDyn, ToolRegistry};

    #[cfg(feature = "core")]
    pub use waypoint_dispatch::{dispatch, DispatchInput, DispatchOutput};

    #[cfg(feature = "core")]
    pub use waypoint_reactor::{Reactor, RunCommand};

    #[cfg(feature = "context")]
    pub use waypoint_context::{ContextStrategy, NoCompaction, SlidingWindow, TokenCounter};
}
