//! The bounded pub/sub event bus (spec §4.1, component C1).
//!
//! A [`Bus`] interns [`Topic`]s by [`waypoint_types::RunId`]: identical ids
//! return the same topic instance, distinct ids return distinct ones.
//! Publishers hand an [`Event`](waypoint_types::Event) to [`Topic::publish`];
//! each active [`Subscription`] gets its own bounded queue drained by a
//! background worker that dispatches to a [`waypoint_types::Hook`] by event
//! variant. A slow subscriber that doesn't drain in time is evicted rather
//! than allowed to back up every other publisher.

pub mod bus;
pub mod config;
pub mod topic;
pub mod transport;

pub use bus::Bus;
pub use config::BusConfig;
pub use topic::{Subscription, SubscriptionId, SubscriptionState, Topic};
pub use transport::{EnvelopeStream, LoopbackTransport, RemoteTransport, SharedTransport};
