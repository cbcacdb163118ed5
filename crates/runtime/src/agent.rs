//! Seams to the native inspector engine.
//!
//! The bridge never talks to an engine directly. It talks to an [`Agent`],
//! which opens [`InspectorSession`]s and receives async-task notifications.
//! Sessions push outbound messages through the [`SessionDelegate`] they were
//! opened with.
//!
//! # Threading
//!
//! Engines may produce messages on an I/O thread, but the agent is
//! responsible for marshaling them onto the scripting thread before calling
//! [`SessionDelegate::send_message_to_frontend`]. The bridge does not
//! re-check which thread it is on.

use insp_protocol::{StringView, TaskHandle};
use serde::{Deserialize, Serialize};

use crate::async_hooks::AsyncHookHandle;
use crate::error::Result;
use crate::script::CallbackOutcome;

/// Receives outbound protocol messages from a native session.
pub trait SessionDelegate: Send + Sync {
	/// Called once per message, in the order the session produced them.
	///
	/// The outcome is informational; engines are free to ignore it.
	fn send_message_to_frontend(&self, message: StringView<'_>) -> CallbackOutcome;
}

/// One live debugging connection on the engine side.
///
/// Dropping the session closes it. Implementations must detach cleanly
/// without calling back into the bridge.
pub trait InspectorSession: Send {
	/// Accepts one inbound protocol message.
	fn dispatch(&mut self, message: StringView<'_>);
}

/// Host and port the agent listens on for remote debuggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPort {
	pub host: String,
	pub port: u16,
}

impl HostPort {
	pub const DEFAULT_HOST: &'static str = "127.0.0.1";
	pub const DEFAULT_PORT: u16 = 9229;

	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			port,
		}
	}
}

impl Default for HostPort {
	fn default() -> Self {
		Self::new(Self::DEFAULT_HOST, Self::DEFAULT_PORT)
	}
}

impl std::fmt::Display for HostPort {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.host, self.port)
	}
}

/// Engine-wide inspector agent.
pub trait Agent: Send + Sync {
	/// Opens a native session that reports to `delegate`.
	///
	/// `is_remote` tells the engine whether the session belongs to a network
	/// client. In-process bindings always pass `false`.
	fn connect(
		&self,
		delegate: Box<dyn SessionDelegate>,
		is_remote: bool,
	) -> Box<dyn InspectorSession>;

	/// A new (or recurring) async task exists and has not started.
	fn async_task_scheduled(&self, name: StringView<'_>, task: TaskHandle, recurring: bool);

	fn async_task_started(&self, task: TaskHandle);

	fn async_task_finished(&self, task: TaskHandle);

	fn async_task_canceled(&self, task: TaskHandle);

	/// Hands the engine a handle to the context's enable/disable pair.
	///
	/// The engine triggers the pair whenever it starts or stops needing
	/// async-context instrumentation. Re-registration replaces the pair
	/// behind the handle.
	fn register_async_hook(&self, hooks: AsyncHookHandle);

	/// True if the inspector is running (listener started or a session may attach).
	fn is_active(&self) -> bool;

	fn host_port(&self) -> HostPort;

	fn set_host_port(&self, host_port: HostPort);

	/// Starts the listener used by remote debuggers.
	fn start_io_thread(&self) -> Result<()>;

	/// Blocks until a remote debugger attaches.
	fn wait_for_connect(&self);

	/// WebSocket URL remote debuggers should use, if listening.
	fn ws_url(&self) -> Option<String>;

	/// Break on the next executed statement.
	fn pause_on_next_javascript_statement(&self, reason: &str);
}
