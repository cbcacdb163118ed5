//! Delegate handed to the agent when a bridge opens its session.

use std::sync::{Arc, Weak};

use insp_protocol::StringView;

use super::ConnectionCore;
use crate::agent::SessionDelegate;
use crate::context::ExecutionContext;
use crate::script::CallbackOutcome;

/// Forwards outbound session messages to the owning bridge's callback.
///
/// Holds non-owning references only. The session (and with it the delegate)
/// is dropped no later than the bridge, so the references normally upgrade;
/// if they do not, the message is dropped.
pub struct BindingSessionDelegate {
	context: Weak<ExecutionContext>,
	connection: Weak<ConnectionCore>,
}

impl BindingSessionDelegate {
	pub(crate) fn new(context: &Arc<ExecutionContext>, connection: &Arc<ConnectionCore>) -> Self {
		Self {
			context: Arc::downgrade(context),
			connection: Arc::downgrade(connection),
		}
	}
}

impl SessionDelegate for BindingSessionDelegate {
	fn send_message_to_frontend(&self, message: StringView<'_>) -> CallbackOutcome {
		let (Some(context), Some(connection)) = (self.context.upgrade(), self.connection.upgrade())
		else {
			tracing::trace!("Outbound message dropped, bridge is gone");
			return CallbackOutcome::Dropped;
		};

		let _scope = context.enter();
		connection.on_message(message.to_string_lossy())
	}
}
