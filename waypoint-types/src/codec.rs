//! The wire envelope (spec §4.6), used only by the remote bus backend.
//!
//! `"type"` discriminates the top-level variant; `chunk`/`request`/`response`
//! additionally carry a nested payload-type field. The round-trip law is
//! `decode(encode(e)) == e` for every variant, with `Meta` preserved verbatim
//! and errors round-tripping by message string.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::event::{Delim, Event, EventBody};
use crate::id::{RunId, TurnId};

/// Failure to encode or decode a wire envelope.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The envelope was missing a required field or had the wrong shape.
    #[error("malformed envelope: {0}")]
    Malformed(String),
    /// The `"type"` (or nested payload-type) discriminator was unrecognized.
    #[error("unknown event type: {0}")]
    UnknownType(String),
    /// The payload failed to (de)serialize as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn delim_str(d: Delim) -> &'static str {
    match d {
        Delim::Start => "start",
        Delim::End => "end",
        Delim::Empty => "empty",
    }
}

fn delim_from_str(s: &str) -> Result<Delim, CodecError> {
    match s {
        "start" => Ok(Delim::Start),
        "end" => Ok(Delim::End),
        "empty" => Ok(Delim::Empty),
        other => Err(CodecError::UnknownType(other.to_string())),
    }
}

/// Encode an event into its JSON wire envelope.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if `R` fails to serialize.
pub fn encode<R: Serialize>(event: &Event<R>) -> Result<Value, CodecError> {
    let mut envelope = json!({
        "run_id": event.run_id.as_uuid(),
        "turn_id": event.turn_id.as_uuid(),
        "sender": event.sender,
        "timestamp": event.timestamp,
        "meta": event.meta,
    });
    let obj = envelope.as_object_mut().expect("constructed as object");

    match &event.body {
        EventBody::Delim(d) => {
            obj.insert("type".to_string(), json!("delim"));
            obj.insert("delim".to_string(), json!(delim_str(*d)));
        }
        EventBody::ChunkAssistant(msg) => {
            obj.insert("type".to_string(), json!("chunk"));
            obj.insert("payload_type".to_string(), json!("assistant"));
            obj.insert("chunk".to_string(), serde_json::to_value(msg)?);
        }
        EventBody::ChunkToolCall(msg) => {
            obj.insert("type".to_string(), json!("chunk"));
            obj.insert("payload_type".to_string(), json!("tool_call"));
            obj.insert("chunk".to_string(), serde_json::to_value(msg)?);
        }
        EventBody::RequestUser(msg) => {
            obj.insert("type".to_string(), json!("request"));
            obj.insert("payload_type".to_string(), json!("user"));
            obj.insert("message".to_string(), serde_json::to_value(msg)?);
        }
        EventBody::RequestToolResponse(msg) => {
            obj.insert("type".to_string(), json!("request"));
            obj.insert("payload_type".to_string(), json!("tool_response"));
            obj.insert("message".to_string(), serde_json::to_value(msg)?);
        }
        EventBody::ResponseAssistant(msg) => {
            obj.insert("type".to_string(), json!("response"));
            obj.insert("payload_type".to_string(), json!("assistant"));
            obj.insert("response".to_string(), serde_json::to_value(msg)?);
        }
        EventBody::ResponseToolCall(msg) => {
            obj.insert("type".to_string(), json!("response"));
            obj.insert("payload_type".to_string(), json!("tool_call"));
            obj.insert("response".to_string(), serde_json::to_value(msg)?);
        }
        EventBody::Result(result) => {
            obj.insert("type".to_string(), json!("result"));
            obj.insert("result".to_string(), serde_json::to_value(result)?);
        }
        EventBody::Error { error, wrapped } => {
            obj.insert("type".to_string(), json!("error"));
            obj.insert("error".to_string(), json!(error));
            obj.insert("wrapped".to_string(), json!(wrapped));
        }
    }

    Ok(envelope)
}

/// Decode an event from its JSON wire envelope.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] or [`CodecError::UnknownType`] if the
/// envelope's shape doesn't match spec §4.6, or [`CodecError::Json`] if `R`
/// fails to deserialize.
pub fn decode<R: DeserializeOwned>(value: &Value) -> Result<Event<R>, CodecError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CodecError::Malformed("envelope is not a JSON object".to_string()))?;

    let field = |name: &str| obj.get(name).ok_or_else(|| CodecError::Malformed(format!("missing field '{name}'")));

    let run_id: RunId = serde_json::from_value::<uuid::Uuid>(field("run_id")?.clone())?.into();
    let turn_id: TurnId = serde_json::from_value::<uuid::Uuid>(field("turn_id")?.clone())?.into();
    let sender = serde_json::from_value(field("sender")?.clone())?;
    let timestamp = serde_json::from_value(field("timestamp")?.clone())?;
    let meta = serde_json::from_value(field("meta")?.clone())?;

    let ty = field("type")?
        .as_str()
        .ok_or_else(|| CodecError::Malformed("'type' must be a string".to_string()))?;

    let body = match ty {
        "delim" => {
            let d = field("delim")?
                .as_str()
                .ok_or_else(|| CodecError::Malformed("'delim' must be a string".to_string()))?;
            EventBody::Delim(delim_from_str(d)?)
        }
        "chunk" => {
            let payload_type = field("payload_type")?
                .as_str()
                .ok_or_else(|| CodecError::Malformed("'payload_type' must be a string".to_string()))?;
            let chunk = field("chunk")?.clone();
            match payload_type {
                "assistant" => EventBody::ChunkAssistant(serde_json::from_value(chunk)?),
                "tool_call" => EventBody::ChunkToolCall(serde_json::from_value(chunk)?),
                other => return Err(CodecError::UnknownType(other.to_string())),
            }
        }
        "request" => {
            let payload_type = field("payload_type")?
                .as_str()
                .ok_or_else(|| CodecError::Malformed("'payload_type' must be a string".to_string()))?;
            let message = field("message")?.clone();
            match payload_type {
                "user" => EventBody::RequestUser(serde_json::from_value(message)?),
                "tool_response" => EventBody::RequestToolResponse(serde_json::from_value(message)?),
                other => return Err(CodecError::UnknownType(other.to_string())),
            }
        }
        "response" => {
            let payload_type = field("payload_type")?
                .as_str()
                .ok_or_else(|| CodecError::Malformed("'payload_type' must be a string".to_string()))?;
            let response = field("response")?.clone();
            match payload_type {
                "assistant" => EventBody::ResponseAssistant(serde_json::from_value(response)?),
                "tool_call" => EventBody::ResponseToolCall(serde_json::from_value(response)?),
                other => return Err(CodecError::UnknownType(other.to_string())),
            }
        }
        "result" => EventBody::Result(serde_json::from_value(field("result")?.clone())?),
        "error" => EventBody::Error {
            error: field("error")?
                .as_str()
                .ok_or_else(|| CodecError::Malformed("'error' must be a string".to_string()))?
                .to_string(),
            wrapped: serde_json::from_value(field("wrapped")?.clone())?,
        },
        other => return Err(CodecError::UnknownType(other.to_string())),
    };

    Ok(Event {
        run_id,
        turn_id,
        sender,
        timestamp,
        meta,
        body,
    })
}
