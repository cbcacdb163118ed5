//! Per-context state shared by every binding operation.
//!
//! An [`ExecutionContext`] stands for one scripting realm. Script-visible
//! callbacks only run inside a [`ContextScope`], and failures they raise are
//! routed to the context's uncaught-error pipeline instead of back to the
//! engine that triggered them.
//!
//! Per-realm registrations (the async-hook pair, the console extension
//! installer, the console re-entrancy flag) live here rather than in globals.
//! They start empty with the context and are cleared by
//! [`ExecutionContext::teardown`].

use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::agent::Agent;
use crate::async_hooks::{AsyncHookHandle, AsyncHookPair, AsyncHookSlot};
use crate::script::{CallbackOutcome, ScriptError, ScriptFunction};

/// Buffered uncaught errors per subscriber before lagging.
const UNCAUGHT_CAPACITY: usize = 64;

/// The scripting realm callbacks are attributed to.
pub struct ExecutionContext {
	this: Weak<ExecutionContext>,
	agent: Arc<dyn Agent>,
	scope_depth: AtomicUsize,
	uncaught_tx: broadcast::Sender<ScriptError>,
	async_hooks: Arc<AsyncHookSlot>,
	console_extension_installer: Mutex<Option<ScriptFunction>>,
	in_inspector_console_call: AtomicBool,
}

/// RAII guard marking the context as entered.
pub struct ContextScope<'a> {
	context: &'a ExecutionContext,
}

impl Drop for ContextScope<'_> {
	fn drop(&mut self) {
		self.context.scope_depth.fetch_sub(1, Ordering::SeqCst);
	}
}

impl ExecutionContext {
	pub fn new(agent: Arc<dyn Agent>) -> Arc<Self> {
		let (uncaught_tx, _) = broadcast::channel(UNCAUGHT_CAPACITY);
		Arc::new_cyclic(|this| Self {
			this: this.clone(),
			agent,
			scope_depth: AtomicUsize::new(0),
			uncaught_tx,
			async_hooks: Arc::new(AsyncHookSlot::new()),
			console_extension_installer: Mutex::new(None),
			in_inspector_console_call: AtomicBool::new(false),
		})
	}

	pub fn agent(&self) -> &Arc<dyn Agent> {
		&self.agent
	}

	/// Enters the context until the returned guard is dropped. Nests.
	pub fn enter(&self) -> ContextScope<'_> {
		self.scope_depth.fetch_add(1, Ordering::SeqCst);
		ContextScope { context: self }
	}

	pub fn is_entered(&self) -> bool {
		self.scope_depth.load(Ordering::SeqCst) > 0
	}

	/// Calls `function` inside the context. A raised error is reported as
	/// uncaught and returned as [`CallbackOutcome::CallbackFailed`].
	pub fn make_callback(&self, function: &ScriptFunction, args: &[Value]) -> CallbackOutcome {
		match self.call_function(function, args) {
			Ok(_) => CallbackOutcome::Delivered,
			Err(err) => {
				self.report_uncaught(err.clone());
				CallbackOutcome::CallbackFailed(err)
			}
		}
	}

	/// Calls `function` inside the context and hands the result back to the caller.
	pub fn call_function(
		&self,
		function: &ScriptFunction,
		args: &[Value],
	) -> Result<Value, ScriptError> {
		let _scope = self.enter();
		function.call(args)
	}

	/// Sends an error to the top-level uncaught-error pipeline.
	pub fn report_uncaught(&self, error: ScriptError) {
		tracing::error!(name = %error.name, message = %error.message, "Uncaught script error");
		// No subscribers is fine: the error has been logged.
		let _ = self.uncaught_tx.send(error);
	}

	/// Subscribes to errors reported via [`report_uncaught`](Self::report_uncaught).
	pub fn uncaught_errors(&self) -> broadcast::Receiver<ScriptError> {
		self.uncaught_tx.subscribe()
	}

	pub fn async_hooks(&self) -> &Arc<AsyncHookSlot> {
		&self.async_hooks
	}

	/// Stores the enable/disable pair, replacing any previous one, and hands
	/// the agent a handle to trigger it.
	pub fn register_async_hook(&self, enable: ScriptFunction, disable: ScriptFunction) {
		self.async_hooks.register(AsyncHookPair { enable, disable });
		self.agent.register_async_hook(AsyncHookHandle::new(
			self.this.clone(),
			Arc::clone(&self.async_hooks),
		));
	}

	pub fn set_console_extension_installer(&self, installer: ScriptFunction) {
		*self.console_extension_installer.lock() = Some(installer);
	}

	pub fn console_extension_installer(&self) -> Option<ScriptFunction> {
		self.console_extension_installer.lock().clone()
	}

	pub fn is_in_inspector_console_call(&self) -> bool {
		self.in_inspector_console_call.load(Ordering::SeqCst)
	}

	pub(crate) fn set_in_inspector_console_call(&self, value: bool) {
		self.in_inspector_console_call.store(value, Ordering::SeqCst);
	}

	/// Clears per-context registrations at the end of the context's life.
	pub fn teardown(&self) {
		self.async_hooks.clear();
		self.console_extension_installer.lock().take();
		self.in_inspector_console_call.store(false, Ordering::SeqCst);
		tracing::debug!("Execution context torn down");
	}
}

impl fmt::Debug for ExecutionContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ExecutionContext")
			.field("entered", &self.is_entered())
			.field("async_hooks", &self.async_hooks.is_registered())
			.field("in_inspector_console_call", &self.is_in_inspector_console_call())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::loopback::LoopbackAgent;

	fn context() -> Arc<ExecutionContext> {
		ExecutionContext::new(Arc::new(LoopbackAgent::new()))
	}

	#[test]
	fn scopes_nest() {
		let context = context();
		{
			let _outer = context.enter();
			{
				let _inner = context.enter();
				assert!(context.is_entered());
			}
			assert!(context.is_entered());
		}
		assert!(!context.is_entered());
	}

	#[test]
	fn call_function_returns_value_without_reporting() {
		let context = context();
		let mut uncaught = context.uncaught_errors();
		let double = ScriptFunction::new("double", |args| {
			Ok(Value::from(args[0].as_i64().unwrap_or_default() * 2))
		});

		let value = context.call_function(&double, &[Value::from(21)]).unwrap();

		assert_eq!(value, Value::from(42));
		assert!(uncaught.try_recv().is_err());
	}

	#[test]
	fn make_callback_reports_failures() {
		let context = context();
		let mut uncaught = context.uncaught_errors();
		let failing = ScriptFunction::new("failing", |_| {
			Err(ScriptError::new("RangeError", "out of range").with_stack("at failing"))
		});

		let outcome = context.make_callback(&failing, &[]);

		assert_eq!(outcome.error().map(|e| e.name.as_str()), Some("RangeError"));
		let reported = uncaught.try_recv().unwrap();
		assert_eq!(reported.stack.as_deref(), Some("at failing"));
	}

	#[test]
	fn teardown_clears_registrations() {
		let context = context();
		context.register_async_hook(ScriptFunction::noop("enable"), ScriptFunction::noop("disable"));
		context.set_console_extension_installer(ScriptFunction::noop("install"));
		context.set_in_inspector_console_call(true);

		context.teardown();

		assert!(!context.async_hooks().is_registered());
		assert!(context.console_extension_installer().is_none());
		assert!(!context.is_in_inspector_console_call());
	}
}
