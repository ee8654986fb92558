//! The Event Bus itself (spec §4.1): `Topic`, `Subscription`, and the
//! `Publish` algorithm.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use waypoint_types::{Event, EventBody, ErrorContext, Hook};

use crate::config::BusConfig;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// A subscription's identity, stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// The three states a subscription moves through (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Receiving published events normally.
    Active,
    /// Unsubscribed by its owner; `Publish` skips it silently.
    Cancelled,
    /// Evicted by `Publish` after exceeding the slow-subscriber timeout.
    Closed,
}

struct SubscriptionInner<R> {
    id: SubscriptionId,
    state: Mutex<SubscriptionState>,
    sender: mpsc::Sender<Event<R>>,
}

/// A handle returned by [`Topic::subscribe`]. Dropping it does not
/// unsubscribe — call [`Topic::unsubscribe`] explicitly, matching spec
/// §4.1's explicit-`Unsubscribe` contract rather than RAII teardown.
#[derive(Clone)]
pub struct Subscription<R> {
    inner: Arc<SubscriptionInner<R>>,
}

impl<R> Subscription<R> {
    /// This subscription's stable identity.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.inner.id
    }
}

/// A single topic: a fan-out point from `Publish` to every active
/// [`Subscription`]'s hook-dispatch worker.
pub struct Topic<R> {
    config: BusConfig,
    subscriptions: Mutex<Vec<Arc<SubscriptionInner<R>>>>,
}

impl<R> Topic<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Build a topic with the given configuration.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Register a hook. Spawns the worker that drains this subscription's
    /// bounded queue and dispatches each event to `hook` by variant (spec
    /// §4.1's dispatch table). Returns a [`Subscription`] handle for later
    /// [`Topic::unsubscribe`].
    ///
    /// `Subscribe` with no hook is a synchronous error
    /// (`waypoint_types::HookValidation`) — enforced by requiring `hook`
    /// here rather than accepting `Option<Arc<dyn Hook<R>>>`.
    pub async fn subscribe(&self, hook: Arc<dyn Hook<R>>) -> Subscription<R>
    where
        R: Send,
    {
        let (sender, receiver) = mpsc::channel(self.config.queue_capacity);
        let id = SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed));
        let inner = Arc::new(SubscriptionInner {
            id,
            state: Mutex::new(SubscriptionState::Active),
            sender,
        });
        self.subscriptions.lock().await.push(Arc::clone(&inner));
        spawn_dispatch_worker(receiver, hook, id);
        Subscription { inner }
    }

    /// Remove a subscription. Idempotent (spec §4.1): calling this twice,
    /// or with a handle that was already evicted by `Publish`, is a no-op
    /// either way.
    pub async fn unsubscribe(&self, subscription: &Subscription<R>) {
        let mut state = subscription.inner.state.lock().await;
        *state = SubscriptionState::Cancelled;
    }

    /// The four-step `Publish` algorithm (spec §4.1):
    ///
    /// 1. If `cancellation` is already cancelled, stop publishing to any
    ///    remaining subscriber and return.
    /// 2. Skip subscribers that are `Cancelled` or `Closed`.
    /// 3. Attempt a non-blocking enqueue; if the queue has room, done.
    /// 4. Otherwise wait up to `slow_subscriber_timeout` for room; if it
    ///    elapses first, evict the subscriber (mark `Closed`) and move on.
    ///
    /// A full queue that is later drained within the timeout is not an
    /// error — only exceeding the timeout evicts.
    pub async fn publish(&self, event: Event<R>, cancellation: &CancellationToken) {
        let subscriptions = self.subscriptions.lock().await.clone();
        for subscription in subscriptions {
            if cancellation.is_cancelled() {
                debug!("publish cancelled before reaching all subscribers");
                return;
            }

            {
                let state = subscription.state.lock().await;
                if *state != SubscriptionState::Active {
                    continue;
                }
            }

            match subscription.sender.try_send(event.clone()) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    let mut state = subscription.state.lock().await;
                    *state = SubscriptionState::Closed;
                    continue;
                }
                Err(mpsc::error::TrySendError::Full(pending)) => {
                    let wait = tokio::time::timeout(
                        self.config.slow_subscriber_timeout,
                        subscription.sender.send(pending),
                    )
                    .await;
                    match wait {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) | Err(_) => {
                            warn!(
                                subscription = %subscription.id,
                                "evicting slow subscriber after timeout"
                            );
                            let mut state = subscription.state.lock().await;
                            *state = SubscriptionState::Closed;
                        }
                    }
                }
            }
        }
    }
}

fn spawn_dispatch_worker<R>(
    mut receiver: mpsc::Receiver<Event<R>>,
    hook: Arc<dyn Hook<R>>,
    id: SubscriptionId,
) where
    R: Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            dispatch_to_hook(&*hook, event).await;
        }
        debug!(subscription = %id, "dispatch worker exiting, queue closed");
    });
}

/// Route one event to the matching [`Hook`] method (spec §4.1's dispatch
/// table). `Delim` is suppressed — it never reaches a hook.
async fn dispatch_to_hook<R>(hook: &dyn Hook<R>, event: Event<R>) {
    if event.is_suppressed_from_hooks() {
        return;
    }
    match event.body {
        EventBody::Delim(_) => unreachable!("filtered above"),
        EventBody::ChunkAssistant(ref message) => hook.on_assistant_chunk(message).await,
        EventBody::ChunkToolCall(ref chunk) => hook.on_tool_call_chunk(chunk).await,
        EventBody::RequestUser(ref message) => hook.on_user_prompt(message).await,
        EventBody::RequestToolResponse(ref response) => {
            hook.on_tool_call_response(response).await
        }
        EventBody::ResponseAssistant(ref message) => hook.on_assistant_message(message).await,
        EventBody::ResponseToolCall(ref message) => hook.on_tool_call_message(message).await,
        EventBody::Result(ref result) => hook.on_result(result).await,
        EventBody::Error { ref error, .. } => {
            let context = ErrorContext {
                run_id: event.run_id,
                turn_id: event.turn_id,
                sender: event.sender.clone(),
                message: error.clone(),
            };
            hook.on_error(&context).await;
        }
    }
}
