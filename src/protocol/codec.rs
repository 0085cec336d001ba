//! Envelope codec
//!
//! Encoding and decoding of [`Request`] envelopes.
//!
//! ## Wire Format
//!
//! ```text
//! { "command": "SIGN_IN", "param": { "Mail": "a@b.com", "Pwd": "x", "SendDomainList": true } }
//! ```
//!
//! The fields expected under `param` are those the catalog declares for the
//! command. Both directions check them against the catalog:
//! - encode: every declared field present and well typed, or `MalformedRequest`
//! - decode: command known (`UnknownCommand`), every declared field present
//!   and well typed (`MalformedPayload`); undeclared fields are ignored

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Annonce, ErrorLogMessage, FieldKind, ProtocolCommand, Request, UdpCoordinate};
use crate::error::{AgoraError, Result};

/// Envelope key holding the command name
pub const COMMAND_KEY: &str = "command";

/// Envelope key holding the parameter object
pub const PARAM_KEY: &str = "param";

// =============================================================================
// Encoding
// =============================================================================

/// Encode a request to its JSON envelope
pub fn encode(request: &Request) -> Result<Vec<u8>> {
    let command = request.command();
    let malformed = |reason: String| AgoraError::MalformedRequest { command, reason };

    let params = match request.to_params() {
        Ok(Value::Object(params)) => params,
        Ok(other) => {
            return Err(malformed(format!(
                "parameters serialized as {}",
                describe(&other)
            )))
        }
        Err(e) => return Err(malformed(e.to_string())),
    };
    check_fields(command, &params).map_err(malformed)?;

    let mut envelope = Map::with_capacity(2);
    envelope.insert(COMMAND_KEY.to_string(), Value::String(command.name().to_string()));
    envelope.insert(PARAM_KEY.to_string(), Value::Object(params));

    Ok(serde_json::to_vec(&Value::Object(envelope))?)
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a request from its JSON envelope
pub fn decode(bytes: &[u8]) -> Result<Request> {
    let envelope: Value = serde_json::from_slice(bytes).map_err(|e| AgoraError::MalformedPayload {
        command: None,
        reason: format!("invalid JSON: {}", e),
    })?;

    let mut envelope = match envelope {
        Value::Object(envelope) => envelope,
        other => {
            return Err(AgoraError::MalformedPayload {
                command: None,
                reason: format!("envelope is {}, expected an object", describe(&other)),
            })
        }
    };

    // Discriminator first: nothing else can be interpreted without it
    let command = match envelope.get(COMMAND_KEY) {
        Some(Value::String(name)) => ProtocolCommand::from_name(name)
            .ok_or_else(|| AgoraError::UnknownCommand(name.clone()))?,
        Some(other) => {
            return Err(AgoraError::MalformedPayload {
                command: None,
                reason: format!("command is {}, expected a string", describe(other)),
            })
        }
        None => {
            return Err(AgoraError::MalformedPayload {
                command: None,
                reason: "missing command".to_string(),
            })
        }
    };

    let mut params = match envelope.remove(PARAM_KEY) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(params)) => params,
        Some(other) => {
            return Err(AgoraError::malformed(
                command,
                format!("param is {}, expected an object", describe(&other)),
            ))
        }
    };
    check_fields(command, &params).map_err(|reason| AgoraError::malformed(command, reason))?;

    // Keep only what the command declares
    let declared: Map<String, Value> = command
        .fields()
        .iter()
        .filter_map(|field| params.remove(field.name).map(|value| (field.name.to_string(), value)))
        .collect();

    Request::from_params(command, Value::Object(declared))
        .map_err(|e| AgoraError::malformed(command, e.to_string()))
}

// =============================================================================
// Schema Checks
// =============================================================================

/// Check `params` carries every field `command` declares, well typed
fn check_fields(command: ProtocolCommand, params: &Map<String, Value>) -> std::result::Result<(), String> {
    for field in command.fields() {
        let value = params
            .get(field.name)
            .ok_or_else(|| format!("missing field {}", field.name))?;
        check_kind(field.kind, value).map_err(|why| format!("field {}: {}", field.name, why))?;
    }
    Ok(())
}

fn check_kind(kind: FieldKind, value: &Value) -> std::result::Result<(), String> {
    match kind {
        FieldKind::Text => expect(value.is_string(), "a string", value),
        FieldKind::Integer => expect(value.is_i64(), "an integer", value),
        FieldKind::Boolean => expect(value.is_boolean(), "a boolean", value),
        FieldKind::Bytes => {
            let text = value
                .as_str()
                .ok_or_else(|| format!("expected a base64 string, got {}", describe(value)))?;
            STANDARD
                .decode(text.as_bytes())
                .map(|_| ())
                .map_err(|e| format!("invalid base64: {}", e))
        }
        FieldKind::Port => match value.as_u64() {
            Some(port) if port <= u64::from(u16::MAX) => Ok(()),
            Some(port) => Err(format!("port {} out of range 0..=65535", port)),
            None => Err(format!("expected a port number, got {}", describe(value))),
        },
        FieldKind::Domains => {
            let elements = as_array(value)?;
            for (index, element) in elements.iter().enumerate() {
                if !element.is_string() {
                    return Err(format!(
                        "element {}: expected a domain name, got {}",
                        index,
                        describe(element)
                    ));
                }
            }
            Ok(())
        }
        FieldKind::Annonces => {
            let elements = as_array(value)?;
            for (index, element) in elements.iter().enumerate() {
                Annonce::deserialize(element).map_err(|e| format!("element {}: {}", index, e))?;
            }
            Ok(())
        }
        FieldKind::Coordinate => UdpCoordinate::deserialize(value)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        FieldKind::Error => {
            let text = value
                .as_str()
                .ok_or_else(|| format!("expected an error message, got {}", describe(value)))?;
            match ErrorLogMessage::from_message(text) {
                Some(_) => Ok(()),
                None => Err(format!("unknown error message {:?}", text)),
            }
        }
    }
}

fn expect(ok: bool, expected: &str, value: &Value) -> std::result::Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(format!("expected {}, got {}", expected, describe(value)))
    }
}

fn as_array(value: &Value) -> std::result::Result<&Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("expected an array, got {}", describe(value)))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
