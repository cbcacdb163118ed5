//! The inspector binding as script code sees it.
//!
//! [`InspectorBinding`] is the object an embedding installs into a scripting
//! realm. It hands out [`ConnectionId`]s instead of bridge references, so a
//! disconnected bridge can never be reached again:
//!
//! - `dispatch` on a disconnected id does nothing
//! - `disconnect` on a disconnected id is rejected with
//!   [`Error::UnknownConnection`]; the session is never closed twice
//!
//! Preconditions the scripting layer checks (argument types, callability)
//! are assumed to hold by the time a call reaches this type.
//!
//! [`Error::UnknownConnection`]: crate::Error::UnknownConnection

use std::sync::Arc;

use serde_json::Value;

use crate::agent::HostPort;
use crate::connection::{Connection, ConnectionId, ConnectionStore};
use crate::console;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::script::{CallbackOutcome, ScriptError, ScriptFunction};
use crate::task::AsyncTaskRelay;

/// Pause reason used by [`InspectorBinding::call_and_pause_on_start`].
pub const BREAK_ON_START: &str = "Break on start";

/// Script-facing entry point for sessions, async tasks, and hooks.
pub struct InspectorBinding {
	context: Arc<ExecutionContext>,
	connections: ConnectionStore,
}

impl InspectorBinding {
	pub fn new(context: Arc<ExecutionContext>) -> Self {
		Self {
			context,
			connections: ConnectionStore::new(),
		}
	}

	pub fn context(&self) -> &Arc<ExecutionContext> {
		&self.context
	}

	/// Opens a bridge whose outbound messages go to `callback`.
	pub fn connect(&self, callback: ScriptFunction) -> ConnectionId {
		let connection = Connection::open(Arc::clone(&self.context), callback);
		self.connections.insert(connection)
	}

	/// Sends one protocol message on the bridge `id`. No-op for dead ids.
	pub fn dispatch(&self, id: ConnectionId, payload: &str) {
		match self.connections.try_get(id) {
			Some(connection) => connection.dispatch(payload),
			None => tracing::trace!(connection = %id, "Dispatch on unknown connection ignored"),
		}
	}

	/// Tears the bridge `id` down and invalidates the id.
	pub fn disconnect(&self, id: ConnectionId) -> Result<()> {
		self.connections.remove(id)
	}

	pub fn is_connected(&self, id: ConnectionId) -> bool {
		self.connections.contains(id)
	}

	pub fn connection_count(&self) -> usize {
		self.connections.len()
	}

	fn relay(&self) -> AsyncTaskRelay<'_> {
		AsyncTaskRelay::new(self.context.agent().as_ref())
	}

	pub fn async_task_scheduled(&self, name: &str, task_id: i64, recurring: bool) {
		self.relay().scheduled(name, task_id, recurring);
	}

	pub fn async_task_started(&self, task_id: i64) {
		self.relay().started(task_id);
	}

	pub fn async_task_finished(&self, task_id: i64) {
		self.relay().finished(task_id);
	}

	pub fn async_task_canceled(&self, task_id: i64) {
		self.relay().canceled(task_id);
	}

	pub fn register_async_hook(&self, enable: ScriptFunction, disable: ScriptFunction) {
		self.context.register_async_hook(enable, disable);
	}

	pub fn is_enabled(&self) -> bool {
		self.context.agent().is_active()
	}

	/// Starts the remote-debugger listener, optionally on a new port and host.
	pub fn open(&self, port: Option<u16>, host: Option<&str>) -> Result<()> {
		let agent = self.context.agent();
		let current = agent.host_port();
		let host_port = HostPort {
			host: host.map(str::to_string).unwrap_or(current.host),
			port: port.unwrap_or(current.port),
		};
		tracing::info!(%host_port, "Starting inspector listener");
		agent.set_host_port(host_port);
		agent.start_io_thread()
	}

	/// WebSocket URL for remote debuggers, if the listener is running.
	pub fn url(&self) -> Option<String> {
		self.context.agent().ws_url().filter(|url| !url.is_empty())
	}

	/// Blocks until a remote debugger attaches. Returns whether the inspector is active.
	pub fn wait_for_debugger(&self) -> bool {
		let agent = self.context.agent();
		if agent.is_active() {
			agent.wait_for_connect();
		}
		agent.is_active()
	}

	pub fn set_console_extension_installer(&self, installer: ScriptFunction) {
		self.context.set_console_extension_installer(installer);
	}

	/// See [`console::console_call`].
	pub fn console_call(
		&self,
		inspector_method: &ScriptFunction,
		host_method: &ScriptFunction,
		args: &[Value],
	) -> CallbackOutcome {
		console::console_call(&self.context, inspector_method, host_method, args)
	}

	/// Arms a pause on the next statement, then calls `function`.
	pub fn call_and_pause_on_start(
		&self,
		function: &ScriptFunction,
		args: &[Value],
	) -> std::result::Result<Value, ScriptError> {
		self.context
			.agent()
			.pause_on_next_javascript_statement(BREAK_ON_START);
		self.context.call_function(function, args)
	}

	/// Disconnects every bridge and clears per-context registrations.
	pub fn teardown(&self) {
		self.connections.clear();
		self.context.teardown();
	}
}

impl std::fmt::Debug for InspectorBinding {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InspectorBinding")
			.field("context", &self.context)
			.field("connections", &self.connections.len())
			.finish()
	}
}
