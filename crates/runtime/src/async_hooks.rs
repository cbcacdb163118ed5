//! Async-hook registration.
//!
//! The engine decides when async-context instrumentation is needed. Script
//! code only supplies the pair of functions to call. The slot holds at most
//! one pair; registering again overwrites it.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::context::ExecutionContext;
use crate::script::{CallbackOutcome, ScriptFunction};

/// Enable/disable callbacks supplied by script code.
#[derive(Debug, Clone)]
pub struct AsyncHookPair {
	pub enable: ScriptFunction,
	pub disable: ScriptFunction,
}

/// Single-slot storage for the current [`AsyncHookPair`].
#[derive(Debug, Default)]
pub struct AsyncHookSlot {
	pair: Mutex<Option<AsyncHookPair>>,
}

impl AsyncHookSlot {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `pair`, replacing any previous registration.
	pub fn register(&self, pair: AsyncHookPair) {
		let replaced = self.pair.lock().replace(pair).is_some();
		tracing::debug!(replaced, "Registered async hook pair");
	}

	pub fn is_registered(&self) -> bool {
		self.pair.lock().is_some()
	}

	pub fn current(&self) -> Option<AsyncHookPair> {
		self.pair.lock().clone()
	}

	pub fn clear(&self) {
		self.pair.lock().take();
	}

	/// Invokes the registered enable callback in `context`.
	pub fn enable(&self, context: &ExecutionContext) -> CallbackOutcome {
		self.invoke(context, |pair| &pair.enable)
	}

	/// Invokes the registered disable callback in `context`.
	pub fn disable(&self, context: &ExecutionContext) -> CallbackOutcome {
		self.invoke(context, |pair| &pair.disable)
	}

	fn invoke(
		&self,
		context: &ExecutionContext,
		select: impl Fn(&AsyncHookPair) -> &ScriptFunction,
	) -> CallbackOutcome {
		// Clone out so the lock is not held while script code runs.
		let Some(function) = self.pair.lock().as_ref().map(|pair| select(pair).clone()) else {
			tracing::trace!("No async hook registered");
			return CallbackOutcome::Dropped;
		};
		context.make_callback(&function, &[])
	}
}

/// What the engine holds to trigger the hooks of one context.
#[derive(Debug, Clone)]
pub struct AsyncHookHandle {
	context: Weak<ExecutionContext>,
	slot: Arc<AsyncHookSlot>,
}

impl AsyncHookHandle {
	pub(crate) fn new(context: Weak<ExecutionContext>, slot: Arc<AsyncHookSlot>) -> Self {
		Self { context, slot }
	}

	pub fn is_registered(&self) -> bool {
		self.slot.is_registered()
	}

	/// Engine now needs async-context instrumentation.
	pub fn enable(&self) -> CallbackOutcome {
		match self.context.upgrade() {
			Some(context) => self.slot.enable(&context),
			None => CallbackOutcome::Dropped,
		}
	}

	/// Engine no longer needs async-context instrumentation.
	pub fn disable(&self) -> CallbackOutcome {
		match self.context.upgrade() {
			Some(context) => self.slot.disable(&context),
			None => CallbackOutcome::Dropped,
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use parking_lot::Mutex;
	use serde_json::Value;

	use crate::context::ExecutionContext;
	use crate::loopback::LoopbackAgent;
	use crate::script::{CallbackOutcome, ScriptFunction};

	fn tagged(calls: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> ScriptFunction {
		let calls = Arc::clone(calls);
		ScriptFunction::new(tag, move |_| {
			calls.lock().push(tag);
			Ok(Value::Null)
		})
	}

	#[test]
	fn reregistration_replaces_pair() {
		let agent = Arc::new(LoopbackAgent::new());
		let context = ExecutionContext::new(agent.clone());
		let calls = Arc::new(Mutex::new(Vec::new()));

		context.register_async_hook(tagged(&calls, "e1"), tagged(&calls, "d1"));
		context.register_async_hook(tagged(&calls, "e2"), tagged(&calls, "d2"));

		assert_eq!(agent.set_async_stack_tracking(true), CallbackOutcome::Delivered);
		assert_eq!(agent.set_async_stack_tracking(false), CallbackOutcome::Delivered);
		assert_eq!(*calls.lock(), vec!["e2", "d2"]);
	}

	#[test]
	fn hooks_are_not_invoked_at_registration() {
		let agent = Arc::new(LoopbackAgent::new());
		let context = ExecutionContext::new(agent.clone());
		let calls = Arc::new(Mutex::new(Vec::new()));

		context.register_async_hook(tagged(&calls, "enable"), tagged(&calls, "disable"));

		assert!(calls.lock().is_empty());
		assert!(agent.async_hooks().is_some_and(|h| h.is_registered()));
	}

	#[test]
	fn unchanged_tracking_state_triggers_nothing() {
		let agent = Arc::new(LoopbackAgent::new());
		let context = ExecutionContext::new(agent.clone());
		let calls = Arc::new(Mutex::new(Vec::new()));
		context.register_async_hook(tagged(&calls, "enable"), tagged(&calls, "disable"));

		assert_eq!(agent.set_async_stack_tracking(false), CallbackOutcome::Dropped);
		agent.set_async_stack_tracking(true);
		assert_eq!(agent.set_async_stack_tracking(true), CallbackOutcome::Dropped);
		assert_eq!(*calls.lock(), vec!["enable"]);
	}

	#[test]
	fn empty_slot_drops_invocation() {
		let agent = Arc::new(LoopbackAgent::new());
		let context = ExecutionContext::new(agent);
		let slot = context.async_hooks();

		assert!(!slot.is_registered());
		assert_eq!(slot.enable(&context), CallbackOutcome::Dropped);
	}

	#[test]
	fn handle_outliving_context_drops_invocation() {
		let agent = Arc::new(LoopbackAgent::new());
		let context = ExecutionContext::new(agent.clone());
		let calls = Arc::new(Mutex::new(Vec::new()));
		context.register_async_hook(tagged(&calls, "enable"), tagged(&calls, "disable"));
		drop(context);

		assert_eq!(agent.set_async_stack_tracking(true), CallbackOutcome::Dropped);
		assert!(calls.lock().is_empty());
	}
}
