use std::path::PathBuf;

use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid config file {path}: {source}")]
	Config {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("failed to read scenario {path}: {source}")]
	ScenarioRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid scenario {path}: {source}")]
	ScenarioParse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("step {step}: {message}")]
	Step { step: usize, message: String },

	#[error(transparent)]
	Runtime(#[from] insp_runtime::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, details) = match self {
			CliError::Config { path, .. } => (
				ErrorCode::ConfigError,
				Some(serde_json::json!({ "path": path })),
			),
			CliError::ScenarioRead { path, .. } => (
				ErrorCode::IoError,
				Some(serde_json::json!({ "path": path })),
			),
			CliError::ScenarioParse { path, .. } => (
				ErrorCode::InvalidInput,
				Some(serde_json::json!({ "path": path })),
			),
			CliError::Step { step, .. } => (
				ErrorCode::ScenarioFailed,
				Some(serde_json::json!({ "step": step })),
			),
			CliError::Runtime(err) if err.is_disconnected() => (ErrorCode::SessionError, None),
			CliError::Runtime(err) => match err.script_error() {
				Some(script) => (
					ErrorCode::ScriptError,
					Some(serde_json::to_value(script).unwrap_or_default()),
				),
				None => (ErrorCode::InternalError, None),
			},
			CliError::Io(_) => (ErrorCode::IoError, None),
			CliError::Json(_) | CliError::Anyhow(_) => (ErrorCode::InternalError, None),
		};

		CommandError {
			code,
			message: self.to_string(),
			details,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn step_error_carries_step_index() {
		let err = CliError::Step {
			step: 3,
			message: "unknown connection \"main\"".into(),
		};
		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::ScenarioFailed);
		assert_eq!(cmd.message, "step 3: unknown connection \"main\"");
		assert_eq!(cmd.details, Some(serde_json::json!({ "step": 3 })));
	}

	#[test]
	fn rejected_disconnect_maps_to_session_error() {
		let id = insp_runtime::ConnectionId::next();
		let err = CliError::from(insp_runtime::Error::UnknownConnection(id));
		assert_eq!(err.to_command_error().code, ErrorCode::SessionError);
	}
}
