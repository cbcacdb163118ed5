//! Error types for the inspector runtime.

use thiserror::Error;

use crate::connection::ConnectionId;
use crate::script::ScriptError;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the inspector runtime.
#[derive(Debug, Error)]
pub enum Error {
	/// No live bridge is registered under this id. Raised for a second
	/// disconnect of the same id.
	#[error("Unknown connection: {0}")]
	UnknownConnection(ConnectionId),

	/// A script callback raised.
	#[error(transparent)]
	Script(#[from] ScriptError),

	/// Listener or transport I/O failed inside the agent.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Returns true if the error refers to a bridge that no longer exists.
	pub fn is_disconnected(&self) -> bool {
		matches!(self, Error::UnknownConnection(_))
	}

	/// Returns the script error if a callback raised.
	pub fn script_error(&self) -> Option<&ScriptError> {
		match self {
			Error::Script(err) => Some(err),
			_ => None,
		}
	}
}
