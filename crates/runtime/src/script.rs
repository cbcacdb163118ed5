//! Script-side values and callable functions.
//!
//! Values crossing into the scripting layer are plain [`serde_json::Value`]s.
//! A [`ScriptFunction`] is whatever the embedding registered as callable;
//! invoking it either returns a value or raises a [`ScriptError`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error raised by script code.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct ScriptError {
	/// Error type name (e.g., "TypeError", "Error").
	pub name: String,
	/// Human-readable error message.
	pub message: String,
	/// Script stack trace, if available.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

impl ScriptError {
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			message: message.into(),
			stack: None,
		}
	}

	pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}
}

type FunctionImpl = dyn Fn(&[Value]) -> Result<Value, ScriptError> + Send + Sync;

/// A callable script function.
#[derive(Clone)]
pub struct ScriptFunction {
	name: Arc<str>,
	inner: Arc<FunctionImpl>,
}

impl ScriptFunction {
	pub fn new<F>(name: impl AsRef<str>, f: F) -> Self
	where
		F: Fn(&[Value]) -> Result<Value, ScriptError> + Send + Sync + 'static,
	{
		Self {
			name: Arc::from(name.as_ref()),
			inner: Arc::new(f),
		}
	}

	/// Function that ignores its arguments and returns `undefined` (`null`).
	pub fn noop(name: impl AsRef<str>) -> Self {
		Self::new(name, |_| Ok(Value::Null))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn call(&self, args: &[Value]) -> Result<Value, ScriptError> {
		(self.inner)(args)
	}

	/// True if both values refer to the same underlying function.
	pub fn ptr_eq(&self, other: &ScriptFunction) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl fmt::Debug for ScriptFunction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScriptFunction")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

/// What happened to a script-visible callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
	/// The callback ran and returned normally.
	Delivered,
	/// The callback raised. The error has been handed to the uncaught-error
	/// pipeline of the owning context.
	CallbackFailed(ScriptError),
	/// No live receiver; nothing was invoked.
	Dropped,
}

impl CallbackOutcome {
	pub fn is_delivered(&self) -> bool {
		matches!(self, CallbackOutcome::Delivered)
	}

	pub fn is_dropped(&self) -> bool {
		matches!(self, CallbackOutcome::Dropped)
	}

	pub fn error(&self) -> Option<&ScriptError> {
		match self {
			CallbackOutcome::CallbackFailed(err) => Some(err),
			_ => None,
		}
	}
}
