//! Console call forwarding.
//!
//! Each console method is wrapped so that, while the inspector is active, the
//! inspector's own console implementation sees the call first. The host's
//! console always runs afterwards. Console calls made from inside the
//! inspector's console method skip the inspector to avoid recursion.

use serde_json::Value;

use crate::context::ExecutionContext;
use crate::script::{CallbackOutcome, ScriptFunction};

struct InConsoleCall<'a> {
	context: &'a ExecutionContext,
}

impl<'a> InConsoleCall<'a> {
	fn enter(context: &'a ExecutionContext) -> Self {
		context.set_in_inspector_console_call(true);
		Self { context }
	}
}

impl Drop for InConsoleCall<'_> {
	fn drop(&mut self) {
		self.context.set_in_inspector_console_call(false);
	}
}

/// Forwards one console call to the inspector (when active) and then to the host.
///
/// If the inspector method raises, the error is reported and the host method
/// is skipped.
pub fn console_call(
	context: &ExecutionContext,
	inspector_method: &ScriptFunction,
	host_method: &ScriptFunction,
	args: &[Value],
) -> CallbackOutcome {
	if context.agent().is_active() && !context.is_in_inspector_console_call() {
		let result = {
			let _guard = InConsoleCall::enter(context);
			context.call_function(inspector_method, args)
		};
		if let Err(err) = result {
			context.report_uncaught(err.clone());
			return CallbackOutcome::CallbackFailed(err);
		}
	}

	context.make_callback(host_method, args)
}
