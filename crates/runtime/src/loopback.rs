//! In-process [`Agent`] that records everything it is told.
//!
//! The loopback agent stands in for a native inspector engine. It opens
//! [`LoopbackSession`]s that record inbound messages, lets callers push
//! outbound messages through a session's delegate, and keeps a log of async
//! task notifications. Tests and `insp replay` drive bridges against it.
//!
//! Outbound messages can come from two places:
//!
//! - [`LoopbackAgent::push_to_frontend`], called on the scripting thread
//! - [`LoopbackAgent::frontend_sender`], usable from any thread; queued
//!   messages are delivered in FIFO order by [`LoopbackAgent::pump`], which
//!   runs on the scripting thread

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use insp_protocol::{Envelope, ProtocolString, StringView, TaskHandle};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::agent::{Agent, HostPort, InspectorSession, SessionDelegate};
use crate::async_hooks::AsyncHookHandle;
use crate::error::Result;
use crate::script::CallbackOutcome;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Engine-side id of a loopback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
	fn next() -> Self {
		Self(NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst))
	}

	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "session#{}", self.0)
	}
}

/// One async task notification received by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TaskEvent {
	Scheduled {
		name: String,
		handle: TaskHandle,
		recurring: bool,
	},
	Started {
		handle: TaskHandle,
	},
	Finished {
		handle: TaskHandle,
	},
	Canceled {
		handle: TaskHandle,
	},
}

impl TaskEvent {
	pub fn handle(&self) -> TaskHandle {
		match self {
			TaskEvent::Scheduled { handle, .. }
			| TaskEvent::Started { handle }
			| TaskEvent::Finished { handle }
			| TaskEvent::Canceled { handle } => *handle,
		}
	}
}

/// Outbound message queued from another thread.
#[derive(Debug, Clone)]
pub struct FrontendMessage {
	pub session: SessionId,
	pub payload: String,
}

/// Produces an inline reply for an inbound message, if any.
pub type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Default)]
struct AgentState {
	delegates: HashMap<SessionId, Arc<dyn SessionDelegate>>,
	inbound: HashMap<SessionId, Vec<String>>,
	remote: HashMap<SessionId, bool>,
	opened: Vec<SessionId>,
	closed: Vec<SessionId>,
	task_events: Vec<TaskEvent>,
	host_port: HostPort,
	io_started: bool,
	wait_calls: usize,
	pause_reasons: Vec<String>,
	async_hooks: Option<AsyncHookHandle>,
	async_tracking: bool,
}

/// Recording agent backed by in-memory sessions.
pub struct LoopbackAgent {
	state: Arc<Mutex<AgentState>>,
	responder: Option<Responder>,
	target_id: String,
	frontend_tx: mpsc::UnboundedSender<FrontendMessage>,
	frontend_rx: Mutex<mpsc::UnboundedReceiver<FrontendMessage>>,
}

impl Default for LoopbackAgent {
	fn default() -> Self {
		Self::new()
	}
}

impl LoopbackAgent {
	pub fn new() -> Self {
		let (frontend_tx, frontend_rx) = mpsc::unbounded_channel();
		Self {
			state: Arc::new(Mutex::new(AgentState::default())),
			responder: None,
			target_id: format!("loopback-{}", std::process::id()),
			frontend_tx,
			frontend_rx: Mutex::new(frontend_rx),
		}
	}

	/// Sessions opened after this call answer inbound messages inline,
	/// from inside `dispatch`.
	pub fn with_responder<F>(mut self, responder: F) -> Self
	where
		F: Fn(&str) -> Option<String> + Send + Sync + 'static,
	{
		self.responder = Some(Arc::new(responder));
		self
	}

	/// Answers every command with an empty result: `{"id":N,"result":{}}`.
	pub fn with_ack_responder(self) -> Self {
		self.with_responder(|message| match Envelope::peek(message) {
			Envelope::Command { id, .. } => Some(serde_json::json!({ "id": id, "result": {} }).to_string()),
			_ => None,
		})
	}

	pub fn with_host_port(self, host_port: HostPort) -> Self {
		self.state.lock().host_port = host_port;
		self
	}

	/// Delivers `payload` through the session's delegate on the calling thread.
	///
	/// Returns `None` if the session is closed or unknown.
	pub fn push_to_frontend(&self, session: SessionId, payload: &str) -> Option<CallbackOutcome> {
		let delegate = self.state.lock().delegates.get(&session).cloned()?;
		let message = ProtocolString::new(payload);
		Some(delegate.send_message_to_frontend(message.as_view()))
	}

	/// Sender for producing outbound messages off the scripting thread.
	pub fn frontend_sender(&self) -> mpsc::UnboundedSender<FrontendMessage> {
		self.frontend_tx.clone()
	}

	/// Delivers every queued outbound message, in order. Returns how many
	/// reached a live session.
	pub fn pump(&self) -> usize {
		let mut delivered = 0;
		loop {
			// Released before delivery: callbacks may push more messages.
			let next = self.frontend_rx.lock().try_recv();
			let Ok(message) = next else {
				return delivered;
			};
			match self.push_to_frontend(message.session, &message.payload) {
				Some(_) => delivered += 1,
				None => {
					tracing::debug!(session = %message.session, "Queued message for closed session dropped");
				}
			}
		}
	}

	/// Turns async stack tracking on or off, triggering the registered hooks.
	///
	/// Returns `Dropped` if no hooks are registered or nothing changed.
	pub fn set_async_stack_tracking(&self, enabled: bool) -> CallbackOutcome {
		let hooks = {
			let mut state = self.state.lock();
			if state.async_tracking == enabled {
				return CallbackOutcome::Dropped;
			}
			state.async_tracking = enabled;
			state.async_hooks.clone()
		};

		match hooks {
			Some(hooks) if enabled => hooks.enable(),
			Some(hooks) => hooks.disable(),
			None => CallbackOutcome::Dropped,
		}
	}

	/// Most recently opened session.
	pub fn last_session(&self) -> Option<SessionId> {
		self.state.lock().opened.last().copied()
	}

	/// Sessions that are currently open.
	pub fn live_sessions(&self) -> Vec<SessionId> {
		let state = self.state.lock();
		state
			.opened
			.iter()
			.filter(|id| state.delegates.contains_key(id))
			.copied()
			.collect()
	}

	/// Sessions closed so far, in close order. A session appears once per close.
	pub fn closed_sessions(&self) -> Vec<SessionId> {
		self.state.lock().closed.clone()
	}

	/// Inbound messages a session received, in dispatch order.
	pub fn inbound(&self, session: SessionId) -> Vec<String> {
		self.state
			.lock()
			.inbound
			.get(&session)
			.cloned()
			.unwrap_or_default()
	}

	pub fn is_remote(&self, session: SessionId) -> Option<bool> {
		self.state.lock().remote.get(&session).copied()
	}

	pub fn task_events(&self) -> Vec<TaskEvent> {
		self.state.lock().task_events.clone()
	}

	pub fn pause_reasons(&self) -> Vec<String> {
		self.state.lock().pause_reasons.clone()
	}

	pub fn wait_calls(&self) -> usize {
		self.state.lock().wait_calls
	}

	pub fn async_hooks(&self) -> Option<AsyncHookHandle> {
		self.state.lock().async_hooks.clone()
	}

	fn record_task(&self, event: TaskEvent) {
		self.state.lock().task_events.push(event);
	}
}

impl Agent for LoopbackAgent {
	fn connect(
		&self,
		delegate: Box<dyn SessionDelegate>,
		is_remote: bool,
	) -> Box<dyn InspectorSession> {
		let id = SessionId::next();
		let delegate: Arc<dyn SessionDelegate> = Arc::from(delegate);
		{
			let mut state = self.state.lock();
			state.delegates.insert(id, Arc::clone(&delegate));
			state.inbound.insert(id, Vec::new());
			state.remote.insert(id, is_remote);
			state.opened.push(id);
		}
		tracing::debug!(session = %id, is_remote, "Loopback session opened");

		Box::new(LoopbackSession {
			id,
			state: Arc::clone(&self.state),
			delegate,
			responder: self.responder.clone(),
		})
	}

	fn async_task_scheduled(&self, name: StringView<'_>, task: TaskHandle, recurring: bool) {
		self.record_task(TaskEvent::Scheduled {
			name: name.to_string_lossy(),
			handle: task,
			recurring,
		});
	}

	fn async_task_started(&self, task: TaskHandle) {
		self.record_task(TaskEvent::Started { handle: task });
	}

	fn async_task_finished(&self, task: TaskHandle) {
		self.record_task(TaskEvent::Finished { handle: task });
	}

	fn async_task_canceled(&self, task: TaskHandle) {
		self.record_task(TaskEvent::Canceled { handle: task });
	}

	fn register_async_hook(&self, hooks: AsyncHookHandle) {
		self.state.lock().async_hooks = Some(hooks);
	}

	fn is_active(&self) -> bool {
		let state = self.state.lock();
		state.io_started || !state.delegates.is_empty()
	}

	fn host_port(&self) -> HostPort {
		self.state.lock().host_port.clone()
	}

	fn set_host_port(&self, host_port: HostPort) {
		self.state.lock().host_port = host_port;
	}

	fn start_io_thread(&self) -> Result<()> {
		let mut state = self.state.lock();
		if !state.io_started {
			state.io_started = true;
			tracing::info!(host_port = %state.host_port, "Loopback listener started");
		}
		Ok(())
	}

	fn wait_for_connect(&self) {
		// No remote clients exist in loopback mode.
		self.state.lock().wait_calls += 1;
	}

	fn ws_url(&self) -> Option<String> {
		let state = self.state.lock();
		state.io_started.then(|| {
			format!(
				"ws://{}:{}/{}",
				state.host_port.host, state.host_port.port, self.target_id
			)
		})
	}

	fn pause_on_next_javascript_statement(&self, reason: &str) {
		self.state.lock().pause_reasons.push(reason.to_string());
	}
}

/// Session opened by [`LoopbackAgent`].
pub struct LoopbackSession {
	id: SessionId,
	state: Arc<Mutex<AgentState>>,
	delegate: Arc<dyn SessionDelegate>,
	responder: Option<Responder>,
}

impl LoopbackSession {
	pub fn id(&self) -> SessionId {
		self.id
	}
}

impl InspectorSession for LoopbackSession {
	fn dispatch(&mut self, message: StringView<'_>) {
		let text = message.to_string_lossy();
		if let Some(inbound) = self.state.lock().inbound.get_mut(&self.id) {
			inbound.push(text.clone());
		}

		if let Some(reply) = self.responder.as_ref().and_then(|respond| respond(&text)) {
			let reply = ProtocolString::new(&reply);
			self.delegate.send_message_to_frontend(reply.as_view());
		}
	}
}

impl Drop for LoopbackSession {
	fn drop(&mut self) {
		let mut state = self.state.lock();
		state.delegates.remove(&self.id);
		state.closed.push(self.id);
		tracing::debug!(session = %self.id, "Loopback session closed");
	}
}
