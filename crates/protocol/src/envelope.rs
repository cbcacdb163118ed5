//! Read-only classification of protocol payloads.
//!
//! The bridge never rewrites payloads. [`Envelope::peek`] only extracts the
//! `id` and `method` fields so that tracing output can say what crossed the
//! seam without logging whole messages.

use serde::Deserialize;
use serde_json::Value;

/// Shape of a protocol payload, as far as diagnostics care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
	/// Inbound request from a client (`id` and `method`).
	Command { id: i64, method: String },
	/// Reply to a command (`id`, no `method`).
	Response { id: i64, is_error: bool },
	/// Engine-initiated event (`method`, no `id`).
	Notification { method: String },
	/// Anything else, including text that is not JSON.
	Unknown,
}

#[derive(Deserialize)]
struct Fields {
	#[serde(default)]
	id: Option<i64>,
	#[serde(default)]
	method: Option<String>,
	#[serde(default)]
	error: Option<Value>,
}

impl Envelope {
	/// Classifies a payload. Never fails.
	pub fn peek(payload: &str) -> Self {
		let Ok(fields) = serde_json::from_str::<Fields>(payload) else {
			return Envelope::Unknown;
		};

		match (fields.id, fields.method) {
			(Some(id), Some(method)) => Envelope::Command { id, method },
			(Some(id), None) => Envelope::Response {
				id,
				is_error: fields.error.is_some(),
			},
			(None, Some(method)) => Envelope::Notification { method },
			(None, None) => Envelope::Unknown,
		}
	}

	/// Short label used as a tracing field.
	pub fn kind(&self) -> &'static str {
		match self {
			Envelope::Command { .. } => "command",
			Envelope::Response { .. } => "response",
			Envelope::Notification { .. } => "notification",
			Envelope::Unknown => "unknown",
		}
	}

	pub fn id(&self) -> Option<i64> {
		match self {
			Envelope::Command { id, .. } | Envelope::Response { id, .. } => Some(*id),
			_ => None,
		}
	}

	pub fn method(&self) -> Option<&str> {
		match self {
			Envelope::Command { method, .. } | Envelope::Notification { method } => Some(method),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_peek_command() {
		let envelope = Envelope::peek(r#"{"id":7,"method":"Debugger.enable","params":{}}"#);
		assert_eq!(
			envelope,
			Envelope::Command {
				id: 7,
				method: "Debugger.enable".to_string()
			}
		);
		assert_eq!(envelope.kind(), "command");
	}

	#[test]
	fn test_peek_response_with_error() {
		let envelope = Envelope::peek(r#"{"id":1,"error":{"code":-32601,"message":"nope"}}"#);
		assert_eq!(envelope, Envelope::Response { id: 1, is_error: true });
		assert_eq!(envelope.id(), Some(1));
		assert_eq!(envelope.method(), None);
	}

	#[test]
	fn test_peek_notification() {
		let envelope = Envelope::peek(r#"{"method":"Debugger.paused","params":{"reason":"other"}}"#);
		assert_eq!(envelope.method(), Some("Debugger.paused"));
		assert_eq!(envelope.kind(), "notification");
	}

	#[test]
	fn test_peek_non_json_is_unknown() {
		assert_eq!(Envelope::peek("not json"), Envelope::Unknown);
		assert_eq!(Envelope::peek("[1,2,3]"), Envelope::Unknown);
		assert_eq!(Envelope::peek("{}"), Envelope::Unknown);
	}
}
