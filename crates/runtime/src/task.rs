//! Async task relay.
//!
//! Script code reports the lifecycle of its asynchronous operations by
//! numeric id. The relay encodes each id as a [`TaskHandle`] and forwards the
//! notification to the agent. It keeps no state and checks no ordering;
//! `scheduled` before `started`/`finished`/`canceled` is the caller's job.

use insp_protocol::{ProtocolString, TaskHandle};

use crate::agent::Agent;

/// Stateless translator from script task ids to agent notifications.
#[derive(Clone, Copy)]
pub struct AsyncTaskRelay<'a> {
	agent: &'a dyn Agent,
}

impl<'a> AsyncTaskRelay<'a> {
	pub fn new(agent: &'a dyn Agent) -> Self {
		Self { agent }
	}

	/// A task named `name` now exists and has not started yet.
	pub fn scheduled(&self, name: &str, task_id: i64, recurring: bool) {
		let handle = TaskHandle::encode(task_id);
		tracing::trace!(task_id, %handle, name, recurring, "async task scheduled");
		let name = ProtocolString::new(name);
		self.agent
			.async_task_scheduled(name.as_view(), handle, recurring);
	}

	pub fn started(&self, task_id: i64) {
		let handle = TaskHandle::encode(task_id);
		tracing::trace!(task_id, %handle, "async task started");
		self.agent.async_task_started(handle);
	}

	pub fn finished(&self, task_id: i64) {
		let handle = TaskHandle::encode(task_id);
		tracing::trace!(task_id, %handle, "async task finished");
		self.agent.async_task_finished(handle);
	}

	pub fn canceled(&self, task_id: i64) {
		let handle = TaskHandle::encode(task_id);
		tracing::trace!(task_id, %handle, "async task canceled");
		self.agent.async_task_canceled(handle);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::loopback::{LoopbackAgent, TaskEvent};

	#[test]
	fn lifecycle_uses_shifted_handle() {
		let agent = LoopbackAgent::new();
		let relay = AsyncTaskRelay::new(&agent);

		relay.scheduled("timer", 42, false);
		relay.started(42);
		relay.finished(42);

		let handle = TaskHandle::encode(42);
		assert_eq!(handle.as_raw(), 84);
		assert_eq!(
			agent.task_events(),
			vec![
				TaskEvent::Scheduled {
					name: "timer".to_string(),
					handle,
					recurring: false,
				},
				TaskEvent::Started { handle },
				TaskEvent::Finished { handle },
			]
		);
	}

	#[test]
	fn relay_does_not_validate_ordering() {
		let agent = LoopbackAgent::new();
		let relay = AsyncTaskRelay::new(&agent);

		relay.canceled(7);
		relay.started(7);
		relay.scheduled("interval", 7, true);

		let events = agent.task_events();
		assert_eq!(events.len(), 3);
		assert!(events.iter().all(|e| e.handle().as_raw() == 14));
		assert!(matches!(events[0], TaskEvent::Canceled { .. }));
	}

	#[test]
	fn negative_and_zero_ids_pass_through() {
		let agent = LoopbackAgent::new();
		let relay = AsyncTaskRelay::new(&agent);

		relay.started(0);
		relay.started(-3);

		let raw: Vec<i64> = agent.task_events().iter().map(|e| e.handle().as_raw()).collect();
		assert_eq!(raw, vec![0, -6]);
	}

	#[test]
	fn scheduled_name_keeps_non_ascii() {
		let agent = LoopbackAgent::new();
		AsyncTaskRelay::new(&agent).scheduled("Promise.then ⏱", 1, false);

		match &agent.task_events()[0] {
			TaskEvent::Scheduled { name, .. } => assert_eq!(name, "Promise.then ⏱"),
			other => panic!("unexpected event {other:?}"),
		}
	}
}
