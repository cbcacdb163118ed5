//! Session bridge between script code and a native inspector session.
//!
//! A [`Connection`] owns exactly one [`InspectorSession`]. Script code sends
//! protocol commands with [`Connection::dispatch`]; the session answers
//! through a [`BindingSessionDelegate`] that forwards every outbound message
//! to the callback the connection was opened with.
//!
//! # Lifecycle
//!
//! ```text
//! open ──► Connected ──disconnect──► Disconnected (terminal)
//! ```
//!
//! - `dispatch` after disconnect is a silent no-op
//! - outbound messages after disconnect are dropped, never delivered
//! - the session is closed exactly once, when the bridge lets go of it
//!
//! # Re-entrancy
//!
//! Engines commonly answer a command synchronously from inside `dispatch`,
//! so the callback may run while a dispatch is still on the stack. Script code
//! is free to dispatch again or disconnect from there:
//!
//! - a nested dispatch is queued and applied once the outer one returns, so
//!   the session still sees commands in issue order
//! - a nested disconnect takes effect immediately for delivery, and the
//!   session is closed as soon as the outer dispatch returns

mod delegate;
mod store;

#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use insp_protocol::{Envelope, ProtocolString};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::InspectorSession;
use crate::context::ExecutionContext;
use crate::script::{CallbackOutcome, ScriptFunction};

pub use delegate::BindingSessionDelegate;
pub use store::ConnectionStore;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle naming a bridge on the script side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
	/// Returns a new process-unique id.
	pub fn next() -> Self {
		Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::SeqCst))
	}

	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ConnectionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "connection#{}", self.0)
	}
}

/// Bridge state. The only transition is `Connected -> Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
	Connected,
	Disconnected,
}

/// The part of a bridge its delegate may reach.
///
/// The delegate only ever holds a `Weak` to this, so it never extends the
/// bridge's lifetime.
pub(crate) struct ConnectionCore {
	id: ConnectionId,
	context: Arc<ExecutionContext>,
	callback: ScriptFunction,
	connected: AtomicBool,
}

impl ConnectionCore {
	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	/// Returns true if this call performed the transition.
	fn mark_disconnected(&self) -> bool {
		self.connected.swap(false, Ordering::SeqCst)
	}

	/// Delivers one outbound message to the script callback.
	pub(crate) fn on_message(&self, payload: String) -> CallbackOutcome {
		if !self.is_connected() {
			tracing::trace!(connection = %self.id, "Outbound message after disconnect dropped");
			return CallbackOutcome::Dropped;
		}

		let envelope = Envelope::peek(&payload);
		tracing::trace!(
			connection = %self.id,
			kind = envelope.kind(),
			id = ?envelope.id(),
			method = ?envelope.method(),
			"Delivering message to script"
		);

		self.context
			.make_callback(&self.callback, &[Value::String(payload)])
	}
}

struct SessionSlot {
	session: Option<Box<dyn InspectorSession>>,
	dispatching: bool,
	pending: VecDeque<ProtocolString>,
}

/// Script-facing bridge owning one native inspector session.
pub struct Connection {
	core: Arc<ConnectionCore>,
	slot: Mutex<SessionSlot>,
}

impl Connection {
	/// Opens a local (non-remote) session through the context's agent.
	///
	/// `callback` receives every outbound protocol message as its only argument.
	pub fn open(context: Arc<ExecutionContext>, callback: ScriptFunction) -> Self {
		let id = ConnectionId::next();
		let core = Arc::new(ConnectionCore {
			id,
			context: Arc::clone(&context),
			callback,
			connected: AtomicBool::new(true),
		});

		let delegate = BindingSessionDelegate::new(&context, &core);
		let session = context.agent().connect(Box::new(delegate), false);

		tracing::debug!(connection = %id, "Opened inspector session");

		Self {
			core,
			slot: Mutex::new(SessionSlot {
				session: Some(session),
				dispatching: false,
				pending: VecDeque::new(),
			}),
		}
	}

	pub fn id(&self) -> ConnectionId {
		self.core.id
	}

	pub fn state(&self) -> ConnectionState {
		if self.core.is_connected() {
			ConnectionState::Connected
		} else {
			ConnectionState::Disconnected
		}
	}

	pub fn is_connected(&self) -> bool {
		self.core.is_connected()
	}

	pub fn context(&self) -> &Arc<ExecutionContext> {
		&self.core.context
	}

	/// Sends one protocol message into the session, verbatim.
	///
	/// No-op once disconnected.
	pub fn dispatch(&self, payload: &str) {
		if !self.core.is_connected() {
			tracing::trace!(connection = %self.core.id, "Dispatch after disconnect ignored");
			return;
		}

		let envelope = Envelope::peek(payload);
		tracing::debug!(
			connection = %self.core.id,
			kind = envelope.kind(),
			id = ?envelope.id(),
			method = ?envelope.method(),
			"Dispatching message to session"
		);

		let mut message = ProtocolString::new(payload);

		let mut session = {
			let mut slot = self.slot.lock();
			if slot.dispatching {
				slot.pending.push_back(message);
				return;
			}
			let Some(session) = slot.session.take() else {
				return;
			};
			slot.dispatching = true;
			session
		};

		loop {
			session.dispatch(message.as_view());

			let mut slot = self.slot.lock();
			if !self.core.is_connected() {
				slot.dispatching = false;
				slot.pending.clear();
				drop(slot);
				drop(session);
				tracing::debug!(connection = %self.core.id, "Closed session after in-flight dispatch");
				return;
			}

			match slot.pending.pop_front() {
				Some(queued) => message = queued,
				None => {
					slot.dispatching = false;
					slot.session = Some(session);
					return;
				}
			}
		}
	}

	/// Tears the bridge down: no further delivery, session closed.
	pub fn disconnect(self) {
		self.close();
	}

	/// Idempotent teardown shared by [`disconnect`](Self::disconnect), the
	/// connection store, and `Drop`.
	pub(crate) fn close(&self) {
		if !self.core.mark_disconnected() {
			return;
		}

		let session = {
			let mut slot = self.slot.lock();
			slot.pending.clear();
			if slot.dispatching {
				None
			} else {
				slot.session.take()
			}
		};

		match session {
			Some(session) => {
				drop(session);
				tracing::debug!(connection = %self.core.id, "Disconnected and closed session");
			}
			None => {
				tracing::debug!(
					connection = %self.core.id,
					"Disconnected during dispatch, session closes when it returns"
				);
			}
		}
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		self.close();
	}
}

impl fmt::Debug for Connection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Connection")
			.field("id", &self.core.id)
			.field("state", &self.state())
			.field("callback", &self.core.callback.name())
			.finish()
	}
}
