//! The topic registry (spec §4.1, §5): `Bus::topic` interns a [`Topic`] by
//! [`RunId`], handing out the same instance to every caller that asks for
//! the same id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use waypoint_types::RunId;

use crate::config::BusConfig;
use crate::topic::Topic;

/// A concurrent registry of [`Topic`]s keyed by [`RunId`].
///
/// `topic(id)` is idempotent under races: identical ids always return the
/// same topic instance, distinct ids return distinct instances, and when two
/// callers race to create the same id the first writer's topic wins — the
/// loser's `Topic::new` is simply dropped, never published.
pub struct Bus<R> {
    config: BusConfig,
    topics: Mutex<HashMap<RunId, Arc<Topic<R>>>>,
}

impl<R> Bus<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Build a bus whose interned topics all share `config`.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Return the topic for `id`, creating it on first use.
    ///
    /// The registry lock is held for the whole get-or-insert, so a race
    /// between two callers for the same `id` resolves under a single
    /// critical section: whichever caller's `lock()` returns first inserts
    /// the topic that every subsequent caller — including the other
    /// racer — receives.
    #[must_use]
    pub fn topic(&self, id: RunId) -> Arc<Topic<R>> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            topics
                .entry(id)
                .or_insert_with(|| Arc::new(Topic::new(self.config))),
        )
    }

    /// Number of topics currently interned. Exposed for tests and
    /// diagnostics; a topic with no remaining subscriptions is still
    /// counted here until the caller drops its `Bus` reference to it.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<R> Default for Bus<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn identical_ids_return_the_same_topic_instance() {
        let bus: Bus<()> = Bus::default();
        let id = RunId::new();

        let first = bus.topic(id);
        let second = bus.topic(id);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(bus.topic_count(), 1);
    }

    #[test]
    fn distinct_ids_return_distinct_topics() {
        let bus: Bus<()> = Bus::default();

        let a = bus.topic(RunId::new());
        let b = bus.topic(RunId::new());

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(bus.topic_count(), 2);
    }

    #[test]
    fn racing_lookups_for_the_same_id_converge_on_one_topic() {
        let bus: Arc<Bus<()>> = Arc::new(Bus::default());
        let id = RunId::new();
        let distinct = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let bus = Arc::clone(&bus);
                thread::spawn(move || bus.topic(id))
            })
            .collect();

        let topics: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winner = &topics[0];
        for topic in &topics {
            if !Arc::ptr_eq(winner, topic) {
                distinct.fetch_add(1, Ordering::SeqCst);
            }
        }

        assert_eq!(distinct.load(Ordering::SeqCst), 0);
        assert_eq!(bus.topic_count(), 1);
    }
}
