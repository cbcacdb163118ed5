//! `insp replay`: drive a bridge scenario against the loopback agent.
//!
//! A scenario is a JSON file:
//!
//! ```json
//! {
//!   "ackCommands": true,
//!   "steps": [
//!     { "op": "connect", "connection": "main" },
//!     { "op": "dispatch", "connection": "main", "message": "{\"id\":1,\"method\":\"Debugger.enable\"}" },
//!     { "op": "push", "connection": "main", "message": "{\"method\":\"Debugger.paused\"}" },
//!     { "op": "scheduled", "name": "timer", "taskId": 42 },
//!     { "op": "disconnect", "connection": "main" }
//!   ]
//! }
//! ```
//!
//! Connection labels are scenario-local names; the binding only ever sees the
//! [`ConnectionId`] each `connect` returns. Labels stay known after
//! `disconnect`, so a second `disconnect` reaches the binding and is recorded
//! as rejected.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use insp_runtime::{
	Agent, BREAK_ON_START, CallbackOutcome, ConnectionId, ExecutionContext, FrontendMessage,
	InspectorBinding, LoopbackAgent, ScriptError, ScriptFunction, SessionId, TaskEvent,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::TryRecvError;

use crate::config::EffectiveConfig;
use crate::error::{CliError, Result};
use crate::output::{DiagnosticLevel, OutputFormat, ResultBuilder, print_result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
	/// Answer every dispatched command with `{"id":N,"result":{}}`.
	#[serde(default)]
	pub ack_commands: bool,
	pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
	Connect {
		connection: String,
		/// Make the callback raise on every message.
		#[serde(default)]
		throws: bool,
	},
	Dispatch {
		connection: String,
		message: String,
	},
	/// Engine-to-frontend message. `queued` sends it from another task; it
	/// is delivered at the next `pump`.
	Push {
		connection: String,
		message: String,
		#[serde(default)]
		queued: bool,
	},
	Pump,
	Disconnect {
		connection: String,
	},
	#[serde(rename_all = "camelCase")]
	Scheduled {
		name: String,
		task_id: i64,
		#[serde(default)]
		recurring: bool,
	},
	#[serde(rename_all = "camelCase")]
	Started { task_id: i64 },
	#[serde(rename_all = "camelCase")]
	Finished { task_id: i64 },
	#[serde(rename_all = "camelCase")]
	Canceled { task_id: i64 },
	RegisterAsyncHook {
		tag: String,
	},
	AsyncTracking {
		enabled: bool,
	},
	Open {
		#[serde(default)]
		port: Option<u16>,
		#[serde(default)]
		host: Option<String>,
	},
}

impl Step {
	fn op(&self) -> &'static str {
		match self {
			Step::Connect { .. } => "connect",
			Step::Dispatch { .. } => "dispatch",
			Step::Push { .. } => "push",
			Step::Pump => "pump",
			Step::Disconnect { .. } => "disconnect",
			Step::Scheduled { .. } => "scheduled",
			Step::Started { .. } => "started",
			Step::Finished { .. } => "finished",
			Step::Canceled { .. } => "canceled",
			Step::RegisterAsyncHook { .. } => "registerAsyncHook",
			Step::AsyncTracking { .. } => "asyncTracking",
			Step::Open { .. } => "open",
		}
	}
}

/// One message delivered to a script callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
	pub connection: String,
	pub payload: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
	pub step: usize,
	pub op: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub outcome: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayData {
	pub steps: Vec<StepRecord>,
	pub deliveries: Vec<Delivery>,
	pub inbound: BTreeMap<String, Vec<String>>,
	pub task_events: Vec<TaskEvent>,
	pub hook_calls: Vec<String>,
	pub uncaught: Vec<ScriptError>,
	pub pause_reasons: Vec<String>,
	pub closed_sessions: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

pub async fn execute(path: &Path, config: &EffectiveConfig, format: OutputFormat) -> Result<()> {
	let scenario = load_scenario(path)?;
	let data = run_scenario(&scenario, config).await?;

	let mut builder = ResultBuilder::new("replay");
	if !data.uncaught.is_empty() {
		builder = builder.diagnostic(
			DiagnosticLevel::Warning,
			format!("{} callback error(s) reached the uncaught handler", data.uncaught.len()),
		);
	}
	print_result(&builder.data(data).build(), format);
	Ok(())
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
	let content = std::fs::read_to_string(path).map_err(|source| CliError::ScenarioRead {
		path: path.to_path_buf(),
		source,
	})?;
	serde_json::from_str(&content).map_err(|source| CliError::ScenarioParse {
		path: path.to_path_buf(),
		source,
	})
}

/// Runs every step in order and collects what the loopback agent observed.
pub async fn run_scenario(scenario: &Scenario, config: &EffectiveConfig) -> Result<ReplayData> {
	let mut agent = LoopbackAgent::new().with_host_port(config.options.host_port.clone());
	if scenario.ack_commands {
		agent = agent.with_ack_responder();
	}
	let agent = Arc::new(agent);
	let context = ExecutionContext::new(agent.clone());
	let mut uncaught_rx = context.uncaught_errors();
	let binding = InspectorBinding::new(context);

	if config.options.pause_on_start {
		agent.pause_on_next_javascript_statement(BREAK_ON_START);
	}
	if config.options.wait_for_debugger {
		binding.open(None, None)?;
		binding.wait_for_debugger();
	}

	let mut runner = Runner {
		agent: Arc::clone(&agent),
		binding,
		connections: HashMap::new(),
		deliveries: Arc::new(Mutex::new(Vec::new())),
		hook_calls: Arc::new(Mutex::new(Vec::new())),
		records: Vec::with_capacity(scenario.steps.len()),
	};

	for (index, step) in scenario.steps.iter().enumerate() {
		let step_no = index + 1;
		tracing::debug!(step = step_no, op = step.op(), "Applying scenario step");
		let outcome = runner.apply(step_no, step).await?;
		runner.records.push(StepRecord {
			step: step_no,
			op: step.op(),
			outcome,
		});
	}

	let mut uncaught = Vec::new();
	loop {
		match uncaught_rx.try_recv() {
			Ok(err) => uncaught.push(err),
			Err(TryRecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Uncaught error backlog overflowed");
			}
			Err(_) => break,
		}
	}

	let inbound = runner
		.connections
		.iter()
		.map(|(label, bound)| (label.clone(), agent.inbound(bound.session)))
		.collect();

	let data = ReplayData {
		steps: std::mem::take(&mut runner.records),
		deliveries: runner.deliveries.lock().clone(),
		inbound,
		task_events: agent.task_events(),
		hook_calls: runner.hook_calls.lock().clone(),
		uncaught,
		pause_reasons: agent.pause_reasons(),
		closed_sessions: agent.closed_sessions().len(),
		url: runner.binding.url(),
	};

	runner.binding.teardown();
	Ok(data)
}

struct Bound {
	id: ConnectionId,
	session: SessionId,
}

struct Runner {
	agent: Arc<LoopbackAgent>,
	binding: InspectorBinding,
	connections: HashMap<String, Bound>,
	deliveries: Arc<Mutex<Vec<Delivery>>>,
	hook_calls: Arc<Mutex<Vec<String>>>,
	records: Vec<StepRecord>,
}

impl Runner {
	async fn apply(&mut self, step_no: usize, step: &Step) -> Result<Option<String>> {
		let outcome = match step {
			Step::Connect { connection, throws } => {
				if self.connections.contains_key(connection) {
					return Err(step_error(step_no, format!("connection {connection:?} already exists")));
				}
				let callback = self.callback(connection, *throws);
				let id = self.binding.connect(callback);
				let session = self
					.agent
					.last_session()
					.ok_or_else(|| step_error(step_no, "agent opened no session"))?;
				self.connections
					.insert(connection.clone(), Bound { id, session });
				Some(id.to_string())
			}
			Step::Dispatch {
				connection,
				message,
			} => {
				let bound = self.bound(step_no, connection)?;
				self.binding.dispatch(bound.id, message);
				None
			}
			Step::Push {
				connection,
				message,
				queued: false,
			} => {
				let bound = self.bound(step_no, connection)?;
				let outcome = self.agent.push_to_frontend(bound.session, message);
				Some(describe(outcome.as_ref()))
			}
			Step::Push {
				connection,
				message,
				queued: true,
			} => {
				let session = self.bound(step_no, connection)?.session;
				let tx = self.agent.frontend_sender();
				let message = FrontendMessage {
					session,
					payload: message.clone(),
				};
				tokio::spawn(async move { tx.send(message).is_ok() })
					.await
					.map_err(anyhow::Error::from)?
					.then_some("queued".to_string())
			}
			Step::Pump => Some(format!("delivered {}", self.agent.pump())),
			Step::Disconnect { connection } => {
				let id = self.bound(step_no, connection)?.id;
				match self.binding.disconnect(id) {
					Ok(()) => Some("disconnected".to_string()),
					Err(err) if err.is_disconnected() => Some(format!("rejected: {err}")),
					Err(err) => return Err(err.into()),
				}
			}
			Step::Scheduled {
				name,
				task_id,
				recurring,
			} => {
				self.binding.async_task_scheduled(name, *task_id, *recurring);
				None
			}
			Step::Started { task_id } => {
				self.binding.async_task_started(*task_id);
				None
			}
			Step::Finished { task_id } => {
				self.binding.async_task_finished(*task_id);
				None
			}
			Step::Canceled { task_id } => {
				self.binding.async_task_canceled(*task_id);
				None
			}
			Step::RegisterAsyncHook { tag } => {
				let enable = self.hook(format!("{tag}:enable"));
				let disable = self.hook(format!("{tag}:disable"));
				self.binding.register_async_hook(enable, disable);
				None
			}
			Step::AsyncTracking { enabled } => {
				let outcome = self.agent.set_async_stack_tracking(*enabled);
				Some(describe(Some(&outcome)))
			}
			Step::Open { port, host } => {
				self.binding.open(*port, host.as_deref())?;
				self.binding.url()
			}
		};
		Ok(outcome)
	}

	fn bound(&self, step_no: usize, label: &str) -> Result<&Bound> {
		self.connections
			.get(label)
			.ok_or_else(|| step_error(step_no, format!("unknown connection {label:?}")))
	}

	fn callback(&self, label: &str, throws: bool) -> ScriptFunction {
		let deliveries = Arc::clone(&self.deliveries);
		let label = label.to_string();
		ScriptFunction::new(format!("{label}.onMessage"), move |args| {
			let payload = args
				.first()
				.and_then(Value::as_str)
				.unwrap_or_default()
				.to_string();
			deliveries.lock().push(Delivery {
				connection: label.clone(),
				payload,
			});
			if throws {
				return Err(ScriptError::new("Error", format!("{label} callback threw")));
			}
			Ok(Value::Null)
		})
	}

	fn hook(&self, name: String) -> ScriptFunction {
		let calls = Arc::clone(&self.hook_calls);
		ScriptFunction::new(name.clone(), move |_| {
			calls.lock().push(name.clone());
			Ok(Value::Null)
		})
	}
}

fn describe(outcome: Option<&CallbackOutcome>) -> String {
	match outcome {
		None => "sessionClosed".to_string(),
		Some(CallbackOutcome::Delivered) => "delivered".to_string(),
		Some(CallbackOutcome::Dropped) => "dropped".to_string(),
		Some(CallbackOutcome::CallbackFailed(err)) => format!("callbackFailed: {err}"),
	}
}

fn step_error(step: usize, message: impl Into<String>) -> CliError {
	CliError::Step {
		step,
		message: message.into(),
	}
}
