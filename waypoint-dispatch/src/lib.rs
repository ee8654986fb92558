//! The Tool Dispatcher (spec §4.4, component C4).
//!
//! Executes one turn's tool-call batch against a [`ToolRegistry`], applying
//! the partitioning rule (agent-transfer tools run first and short-circuit
//! the batch on the first success) and the six-step per-call algorithm,
//! appending each result to a memory fork and publishing it on the Bus.
//!
//! Grounded structurally on the donor codebase's `agent-loop::step`
//! tool-execution loop (sequential per-call execution, result fed back into
//! the message thread) — generalized here to the transfer/regular
//! partitioning this runtime's multi-agent hand-off model requires, which
//! the donor's single-agent loop has no analog for.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use waypoint_bus::Topic;
use waypoint_memory::Memory;
use waypoint_tool::{ToolCallResult, ToolDyn, ToolRegistry};
use waypoint_types::{
    AgentHandle, ContextVariables, Event, EventBody, RunError, RunId, Sender, ToolCallData,
    ToolError as RunToolError, ToolOutcome, ToolResponse, TurnId, UnknownTool,
};

/// Everything the Dispatcher needs for one tool-call batch (spec §4.4's
/// inputs: `{ RunID, Agent, ContextVars, MemoryFork, ToolCalls[], Topic }`).
pub struct DispatchInput<'a, R> {
    /// The run this batch belongs to.
    pub run_id: RunId,
    /// The currently active agent; gates which tool names may be called and
    /// supplies the `Sender` attributed to published events.
    pub agent: AgentHandle,
    /// The live context-variable map, consumed and returned updated.
    pub context_vars: ContextVariables,
    /// The Reactor's per-turn memory fork; each result is appended here.
    pub memory: &'a mut Memory,
    /// The batch of tool calls requested in this turn, in received order.
    pub tool_calls: Vec<ToolCallData>,
    /// Where each call's `Response` event is published.
    pub topic: &'a Topic<R>,
    /// Where tool names resolve to callables.
    pub registry: &'a ToolRegistry,
    /// Observed at the Dispatcher's suspension points (each tool
    /// invocation) per spec §5.
    pub cancellation: &'a CancellationToken,
}

/// The Dispatcher's output (spec §4.4: `(next_agent_or_null,
/// error_or_null)`) — the error half is the `Err` of [`dispatch`]'s
/// `Result` instead, since every caller needs to branch on it immediately.
pub struct DispatchOutput {
    /// Set if a transfer tool succeeded; becomes the Reactor's next active
    /// agent.
    pub next_agent: Option<AgentHandle>,
    /// The context-variable map after every call's merge has been applied.
    pub context_vars: ContextVariables,
}

/// Run one turn's tool-call batch to completion (spec §4.4).
///
/// Unknown-tool validation is deferred to the point each call is actually
/// dispatched rather than checked for the whole batch up front: a call
/// whose name doesn't resolve against the active agent's set or the
/// registry is carried into the regular partition as unresolved, and only
/// turns into an error once execution actually reaches it. A batch like
/// `[transfer_ok, unknown_tool]` never reaches `unknown_tool` at all — the
/// successful transfer short-circuits before the regular partition runs.
///
/// # Errors
///
/// Returns [`RunError::UnknownTool`] if a dispatched call names a tool
/// outside the active agent's set, or [`RunError::Tool`] if a call panics or
/// returns an error — either fails the whole batch, per the per-call
/// algorithm's step 3.
pub async fn dispatch<R>(input: DispatchInput<'_, R>) -> Result<DispatchOutput, RunError>
where
    R: Clone + Send + Sync + 'static,
{
    let DispatchInput {
        run_id,
        agent,
        mut context_vars,
        memory,
        tool_calls,
        topic,
        registry,
        cancellation,
    } = input;

    let turn_id = memory.id();
    let sender: Sender = Some(agent.name().to_string());

    let allowed: HashSet<&str> = agent.tools().iter().map(|t| t.name.as_str()).collect();

    let mut transfer_partition: Vec<(ToolCallData, Arc<dyn ToolDyn>)> = Vec::new();
    let mut regular_partition: Vec<(ToolCallData, Option<Arc<dyn ToolDyn>>)> = Vec::new();
    for call in tool_calls {
        let resolved = if allowed.contains(call.name.as_str()) {
            registry.get(&call.name)
        } else {
            None
        };
        match resolved {
            Some(tool) if tool.is_transfer_tool() => transfer_partition.push((call, tool)),
            Some(tool) => regular_partition.push((call, Some(tool))),
            None => regular_partition.push((call, None)),
        }
    }

    let mut next_agent = None;

    for (call, tool) in transfer_partition {
        if cancellation.is_cancelled() {
            break;
        }
        let result = invoke_one(&*tool, &call, &context_vars).await?;
        let transferred = apply_response(
            memory,
            topic,
            cancellation,
            run_id,
            turn_id,
            sender.clone(),
            &call,
            result,
            &mut context_vars,
        )
        .await;
        if transferred.is_some() {
            debug!(tool = %call.name, "transfer tool short-circuits the batch");
            next_agent = transferred;
            break;
        }
    }

    if next_agent.is_none() {
        for (call, tool) in regular_partition {
            if cancellation.is_cancelled() {
                break;
            }
            let Some(tool) = tool else {
                return Err(RunError::UnknownTool(UnknownTool(call.name)));
            };
            let result = invoke_one(&*tool, &call, &context_vars).await?;
            apply_response(
                memory,
                topic,
                cancellation,
                run_id,
                turn_id,
                sender.clone(),
                &call,
                result,
                &mut context_vars,
            )
            .await;
        }
    }

    Ok(DispatchOutput {
        next_agent,
        context_vars,
    })
}

/// Steps 2–3 of the per-call algorithm: bind (delegated to [`ToolDyn::call`],
/// which never fails to bind) and invoke, catching a panicking tool the same
/// way the per-call algorithm requires any invocation failure to fail the
/// batch rather than the whole run.
async fn invoke_one(
    tool: &dyn ToolDyn,
    call: &ToolCallData,
    ctx_vars: &ContextVariables,
) -> Result<ToolCallResult, RunError> {
    let future = tool.call(&call.arguments, ctx_vars);
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(RunError::Tool(RunToolError {
            tool: call.name.clone(),
            message: err.0,
        })),
        Err(panic) => Err(RunError::Tool(RunToolError {
            tool: call.name.clone(),
            message: panic_message(&panic),
        })),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked with a non-string payload".to_string()
    }
}

/// Steps 4–6 of the per-call algorithm: append the result to the memory
/// fork, merge returned context vars (callee's keys win on overlap), and
/// publish the `Response<ToolResponse>` event — spec §4.6 models this as
/// the `Request<ToolResponse>` wire variant, so that's what's published
/// here; §4.4's prose uses "Response" loosely for "the event carrying a
/// tool's result," not the `Response<T>` variant literally.
///
/// Returns the next agent if this call was a successful transfer.
#[allow(clippy::too_many_arguments)]
async fn apply_response<R>(
    memory: &mut Memory,
    topic: &Topic<R>,
    cancellation: &CancellationToken,
    run_id: RunId,
    turn_id: TurnId,
    sender: Sender,
    call: &ToolCallData,
    result: ToolCallResult,
    context_vars: &mut ContextVariables,
) -> Option<AgentHandle>
where
    R: Clone + Send + Sync + 'static,
{
    let (content, next_agent) = match &result.outcome {
        ToolOutcome::Value(value) => (value.clone(), None),
        ToolOutcome::Transfer(next) => (format!("transfer to agent {}", next.name()), Some(Arc::clone(next))),
    };

    let response = ToolResponse {
        tool_call_id: call.id.clone(),
        tool_name: call.name.clone(),
        content,
    };

    memory.append_tool_response(sender.clone(), response.clone());

    if let Some(returned_vars) = result.context_vars {
        context_vars.extend(returned_vars);
    }

    let event = Event::new(run_id, turn_id, sender, EventBody::RequestToolResponse(response));
    topic.publish(event, cancellation).await;
    if cancellation.is_cancelled() {
        warn!(tool = %call.name, "cancellation observed while publishing tool response");
    }

    next_agent
}
