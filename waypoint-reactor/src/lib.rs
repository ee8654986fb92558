//! The Reactor (spec §4.5, component C5): the per-run driver loop.
//!
//! Each run renders the active agent's instructions, opens a completion
//! stream, republishes chunks verbatim, commits provider checkpoints into a
//! per-turn memory fork, runs the Dispatcher (`waypoint_dispatch`) on a
//! completed tool-call batch, and decodes a completed assistant response
//! into the run's terminal `Result<T>` event.
//!
//! Grounded structurally on the donor codebase's `agent-loop::loop_impl::
//! AgentLoop` (the struct-plus-`run` shape) and `agent-loop::step::
//! StepIterator::run_stream` (spawning the driver as an independent task
//! that forwards stream events, decoupled from the caller) — generalized
//! here to the multi-agent hand-off and tagged-event-bus model this
//! runtime's Reactor owns instead of the donor's single-agent, in-process
//! `AgentResult` return value.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use waypoint_bus::{Bus, Subscription, Topic};
use waypoint_dispatch::{dispatch, DispatchInput};
use waypoint_memory::{Checkpoint, Memory};
use waypoint_tool::ToolRegistry;
use waypoint_types::{
    AgentHandle, ChatCompletionRequest, ContextVariables, DecodeError, Event, EventBody, Hook,
    Message, ProviderStreamEvent, RenderError, RunError, RunId, Sender, SetupError, TurnId,
};
use waypoint_types::Provider;

/// One run's setup parameters (spec §3: `RunCommand bundles { RunID, Agent,
/// Memory, Hook, ContextVariables, MaxTurns, UnmarshalResponse(bytes) → T }`).
///
/// `R` is the run's decoded result type, matching [`waypoint_types::Event`].
pub struct RunCommand<R> {
    run_id: RunId,
    agent: AgentHandle,
    memory: Memory,
    hook: Arc<dyn Hook<R>>,
    context_vars: ContextVariables,
    max_turns: u32,
    decode: DecodeFn<R>,
}

/// The caller-supplied decoder spec §6 calls `UnmarshalResponse(bytes) →
/// (T, error)`. Rust has no reflection to infer `T` from a generic
/// annotation the way the donor's own code-generation approach does, so the
/// decoder is supplied explicitly at construction time.
pub type DecodeFn<R> = Arc<dyn Fn(&str) -> Result<R, DecodeError> + Send + Sync>;

/// The turn-accounting default (spec §4.5 leaves this to the caller via
/// `WithMaxTurns`; 25 matches the donor codebase's own `default_max_turns`
/// convention — `neuron-turn::config::TurnConfig`).
pub const DEFAULT_MAX_TURNS: u32 = 25;

impl<R> RunCommand<R> {
    /// `NewRunCommand(agent, memory, hook) → command` (spec §6), plus the
    /// decoder the donor's code-generation would otherwise infer.
    #[must_use]
    pub fn new(agent: AgentHandle, memory: Memory, hook: Arc<dyn Hook<R>>, decode: DecodeFn<R>) -> Self {
        let run_id = memory.run_id();
        Self {
            run_id,
            agent,
            memory,
            hook,
            context_vars: ContextVariables::new(),
            max_turns: DEFAULT_MAX_TURNS,
            decode,
        }
    }

    /// `command.WithMaxTurns(n) → command`.
    #[must_use]
    pub fn with_max_turns(mut self, n: u32) -> Self {
        self.max_turns = n;
        self
    }

    /// `command.WithContextVariables(map) → command`.
    #[must_use]
    pub fn with_context_variables(mut self, vars: ContextVariables) -> Self {
        self.context_vars = vars;
        self
    }

    /// `command.UnmarshalResponse(bytes) → (T, error)`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the content doesn't decode to `R`.
    pub fn unmarshal_response(&self, content: &str) -> Result<R, DecodeError> {
        (self.decode)(content)
    }
}

/// The per-run driver (spec §4.5). Owns a provider and a tool registry;
/// [`Reactor::run`] drives any number of [`RunCommand`]s against them.
///
/// Grounded on the donor codebase's `AgentLoop<P: Provider, C:
/// ContextStrategy>` struct shape, minus the context-compaction strategy
/// (`waypoint-context` is an ambient concern here, not a Reactor input —
/// spec §9's design note on the agent/model/tool registries as "conveniences
/// for the surrounding harness").
pub struct Reactor<P> {
    provider: Arc<P>,
    registry: Arc<ToolRegistry>,
}

impl<P> Reactor<P>
where
    P: Provider<Checkpoint = Checkpoint> + Send + Sync + 'static,
{
    /// Build a Reactor over a provider and the tool registry its agents'
    /// tool calls resolve against.
    #[must_use]
    pub fn new(provider: Arc<P>, registry: Arc<ToolRegistry>) -> Self {
        Self { provider, registry }
    }

    /// `executor.Run(ctx, command) → error` (spec §6): obtains this run's
    /// topic from `bus` (spec §2: "The Reactor obtains a topic from the Bus
    /// (C1)"), subscribes the hook, and spawns the driver as an independent
    /// task — "a Reactor invocation returns after subscription setup; the
    /// driver runs until terminal or cancellation" (spec §5's scheduling
    /// model). Runtime failures never reach this return value; they surface
    /// as `Error` events on the topic instead (spec §6).
    ///
    /// `bus.topic(command.run_id)` is idempotent under races (spec §5): two
    /// runs sharing a `RunId` — or two callers racing to start the same one
    /// — observe the same topic instance.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] for setup failures. Rust's ownership model
    /// makes the nil-agent/memory/hook scenarios spec §7 names for this
    /// variant structurally unreachable through [`RunCommand::new`]'s
    /// required owned parameters, so no code path currently constructs one;
    /// the signature is kept for interface fidelity.
    pub async fn run<R>(
        &self,
        bus: &Bus<R>,
        command: RunCommand<R>,
        cancellation: CancellationToken,
    ) -> Result<(), SetupError>
    where
        R: Clone + Send + Sync + 'static,
    {
        let topic = bus.topic(command.run_id);
        let subscription = topic.subscribe(Arc::clone(&command.hook)).await;

        let provider = Arc::clone(&self.provider);
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            drive(provider, registry, topic, command, subscription, cancellation).await;
        });

        Ok(())
    }
}

/// The S2/S3 turn loop (spec §4.5), run as its own task. `root_memory` is
/// this run's working copy, forked once from the caller's `Memory` at setup
/// (spec §3's Lifecycle note — "the Reactor operates on a forked copy so it
/// can be retried or composed"); each turn additionally forks its own
/// `root_memory` so every turn gets the fresh `TurnID` spec §3 requires
/// ("a TurnID is stable for a memory fork; a new fork = new TurnID"),
/// joining back into `root_memory` once the turn concludes.
async fn drive<P, R>(
    provider: Arc<P>,
    registry: Arc<ToolRegistry>,
    topic: Arc<Topic<R>>,
    command: RunCommand<R>,
    subscription: Subscription<R>,
    cancellation: CancellationToken,
) where
    P: Provider<Checkpoint = Checkpoint> + 'static,
    R: Clone + Send + Sync + 'static,
{
    let run_id = command.run_id;
    let mut root_memory = command.memory.fork();
    let mut active_agent = Arc::clone(&command.agent);
    let mut context_vars = command.context_vars.clone();
    let mut turns: u32 = 0;

    'turn: while turns < command.max_turns {
        if cancellation.is_cancelled() {
            break 'turn;
        }
        turns += 1;

        let mut turn_memory = root_memory.fork();
        let turn_id = turn_memory.id();
        let sender: Sender = Some(active_agent.name().to_string());

        let instructions = match active_agent.render_instructions(&context_vars) {
            Ok(instructions) => instructions,
            Err(err) => {
                publish_render_error(&topic, &cancellation, run_id, turn_id, sender, err).await;
                root_memory.join(&turn_memory);
                break 'turn;
            }
        };

        let request = ChatCompletionRequest {
            run_id,
            instructions,
            thread: root_memory.messages(),
            tools: active_agent.tools().to_vec(),
            response_schema: None,
            model: active_agent.model().name().to_string(),
        };

        let mut stream = match provider.chat_completion(request).await {
            Ok(stream) => stream,
            Err(err) => {
                publish_run_error(
                    &topic,
                    &cancellation,
                    run_id,
                    turn_id,
                    sender,
                    &RunError::from(err),
                )
                .await;
                root_memory.join(&turn_memory);
                break 'turn;
            }
        };

        'consume: loop {
            if cancellation.is_cancelled() {
                root_memory.join(&turn_memory);
                break 'turn;
            }

            let Some(event) = futures::StreamExt::next(&mut stream).await else {
                root_memory.join(&turn_memory);
                if let Some(event) = late_decode(&command, &root_memory, run_id, turn_id, sender.clone()) {
                    topic.publish(event, &cancellation).await;
                }
                break 'turn;
            };

            match event {
                ProviderStreamEvent::Delim(delim) => {
                    let event = Event::new(run_id, turn_id, sender.clone(), EventBody::Delim(delim));
                    topic.publish(event, &cancellation).await;
                }
                ProviderStreamEvent::ChunkAssistant(chunk) => {
                    let event = Event::new(run_id, turn_id, sender.clone(), EventBody::ChunkAssistant(chunk));
                    topic.publish(event, &cancellation).await;
                }
                ProviderStreamEvent::ChunkToolCall(chunk) => {
                    let event = Event::new(run_id, turn_id, sender.clone(), EventBody::ChunkToolCall(chunk));
                    topic.publish(event, &cancellation).await;
                }
                ProviderStreamEvent::Error { error, wrapped } => {
                    let event = Event::new(run_id, turn_id, sender.clone(), EventBody::Error { error, wrapped });
                    topic.publish(event, &cancellation).await;
                    root_memory.join(&turn_memory);
                    break 'turn;
                }
                ProviderStreamEvent::ResponseToolCall { response, checkpoint } => {
                    checkpoint.merge_into(&mut turn_memory);
                    let event = Event::new(
                        run_id,
                        turn_id,
                        sender.clone(),
                        EventBody::ResponseToolCall(response.clone()),
                    );
                    topic.publish(event, &cancellation).await;

                    let outcome = dispatch(DispatchInput {
                        run_id,
                        agent: Arc::clone(&active_agent),
                        context_vars: context_vars.clone(),
                        memory: &mut turn_memory,
                        tool_calls: response.calls,
                        topic: &topic,
                        registry: &registry,
                        cancellation: &cancellation,
                    })
                    .await;

                    match outcome {
                        Ok(output) => {
                            context_vars = output.context_vars;
                            if let Some(next_agent) = output.next_agent {
                                active_agent = next_agent;
                            }
                            root_memory.join(&turn_memory);
                            break 'consume;
                        }
                        Err(err) => {
                            publish_run_error(&topic, &cancellation, run_id, turn_id, sender.clone(), &err).await;
                            root_memory.join(&turn_memory);
                            break 'turn;
                        }
                    }
                }
                ProviderStreamEvent::ResponseAssistant { response, checkpoint } => {
                    checkpoint.merge_into(&mut turn_memory);
                    let event = Event::new(
                        run_id,
                        turn_id,
                        sender.clone(),
                        EventBody::ResponseAssistant(response.clone()),
                    );
                    topic.publish(event, &cancellation).await;

                    if response.content.is_empty() {
                        continue 'consume;
                    }

                    match command.unmarshal_response(&response.content.as_text()) {
                        Ok(value) => {
                            let event = Event::new(run_id, turn_id, sender.clone(), EventBody::Result(value));
                            topic.publish(event, &cancellation).await;
                            root_memory.join(&turn_memory);
                            break 'turn;
                        }
                        Err(err) => {
                            publish_run_error(
                                &topic,
                                &cancellation,
                                run_id,
                                turn_id,
                                sender.clone(),
                                &RunError::from(err),
                            )
                            .await;
                            continue 'consume;
                        }
                    }
                }
            }
        }
    }

    topic.unsubscribe(&subscription).await;
}

/// Search `memory` for its most recent assistant message and decode it
/// (spec §9 design note (b): the stream-closed-without-`Response<Assistant>`
/// late-decode path). Returns `None` if no assistant message has ever been
/// appended, matching the "exits silently" half of that same design note.
fn late_decode<R>(
    command: &RunCommand<R>,
    memory: &Memory,
    run_id: RunId,
    turn_id: TurnId,
    sender: Sender,
) -> Option<Event<R>> {
    let last_assistant = memory.iter().rev().find_map(|stored| match &stored.payload {
        Message::Assistant(message) => Some(message.clone()),
        _ => None,
    })?;

    Some(match command.unmarshal_response(&last_assistant.content.as_text()) {
        Ok(value) => Event::new(run_id, turn_id, sender, EventBody::Result(value)),
        Err(err) => Event::new(
            run_id,
            turn_id,
            sender,
            EventBody::Error {
                error: err.to_string(),
                wrapped: None,
            },
        ),
    })
}

async fn publish_render_error<R>(
    topic: &Topic<R>,
    cancellation: &CancellationToken,
    run_id: RunId,
    turn_id: TurnId,
    sender: Sender,
    err: RenderError,
) where
    R: Clone + Send + Sync + 'static,
{
    publish_run_error(topic, cancellation, run_id, turn_id, sender, &RunError::Render(err)).await;
}

async fn publish_run_error<R>(
    topic: &Topic<R>,
    cancellation: &CancellationToken,
    run_id: RunId,
    turn_id: TurnId,
    sender: Sender,
    err: &RunError,
) where
    R: Clone + Send + Sync + 'static,
{
    if matches!(err, RunError::Cancelled) {
        return;
    }
    let event = Event::new(
        run_id,
        turn_id,
        sender,
        EventBody::Error {
            error: err.to_string(),
            wrapped: None,
        },
    );
    topic.publish(event, cancellation).await;
    if cancellation.is_cancelled() {
        warn!("cancellation observed while publishing an error event");
    }
}
