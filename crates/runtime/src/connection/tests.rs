use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::*;
use crate::loopback::LoopbackAgent;
use crate::script::ScriptError;

type Received = Arc<Mutex<Vec<String>>>;

fn recording_callback() -> (ScriptFunction, Received) {
	let received: Received = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&received);
	let callback = ScriptFunction::new("onMessage", move |args| {
		assert_eq!(args.len(), 1, "callback takes exactly one argument");
		sink.lock().push(args[0].as_str().unwrap_or_default().to_string());
		Ok(Value::Null)
	});
	(callback, received)
}

fn setup(agent: LoopbackAgent) -> (Arc<LoopbackAgent>, Arc<ExecutionContext>) {
	let agent = Arc::new(agent);
	let context = ExecutionContext::new(agent.clone());
	(agent, context)
}

#[test]
fn test_open_creates_local_session() {
	let (agent, context) = setup(LoopbackAgent::new());
	let (callback, _) = recording_callback();

	let connection = Connection::open(context, callback);
	let session = agent.last_session().unwrap();

	assert_eq!(connection.state(), ConnectionState::Connected);
	assert_eq!(agent.is_remote(session), Some(false));
	assert_eq!(agent.live_sessions(), vec![session]);
}

#[test]
fn test_messages_delivered_once_in_order() {
	let (agent, context) = setup(LoopbackAgent::new());
	let (callback, received) = recording_callback();
	let _connection = Connection::open(context, callback);
	let session = agent.last_session().unwrap();

	for payload in ["a", "b", "c"] {
		let outcome = agent.push_to_frontend(session, payload).unwrap();
		assert_eq!(outcome, CallbackOutcome::Delivered);
	}

	assert_eq!(*received.lock(), vec!["a", "b", "c"]);
}

#[test]
fn test_dispatch_forwards_payload_verbatim() {
	let (agent, context) = setup(LoopbackAgent::new());
	let (callback, _) = recording_callback();
	let connection = Connection::open(context, callback);
	let session = agent.last_session().unwrap();

	let first = r#"{"id":1,"method":"Runtime.evaluate","params":{"expression":"'ü'"}}"#;
	let second = "not even json";
	connection.dispatch(first);
	connection.dispatch(second);

	assert_eq!(agent.inbound(session), vec![first, second]);
}

#[test]
fn test_dispatch_after_close_is_noop() {
	let (agent, context) = setup(LoopbackAgent::new());
	let (callback, _) = recording_callback();
	let connection = Connection::open(context, callback);
	let session = agent.last_session().unwrap();

	connection.dispatch(r#"{"id":1,"method":"Debugger.enable"}"#);
	connection.close();
	connection.dispatch(r#"{"id":2,"method":"Debugger.disable"}"#);

	assert_eq!(connection.state(), ConnectionState::Disconnected);
	assert_eq!(agent.inbound(session).len(), 1);
	assert_eq!(agent.closed_sessions(), vec![session]);
}

#[test]
fn test_disconnect_closes_session_once() {
	let (agent, context) = setup(LoopbackAgent::new());
	let (callback, received) = recording_callback();
	let connection = Connection::open(context, callback);
	let session = agent.last_session().unwrap();

	connection.disconnect();

	assert_eq!(agent.closed_sessions(), vec![session]);
	assert!(agent.live_sessions().is_empty());
	assert!(agent.push_to_frontend(session, "late").is_none());
	assert!(received.lock().is_empty());
}

#[test]
fn test_close_is_idempotent() {
	let (agent, context) = setup(LoopbackAgent::new());
	let (callback, _) = recording_callback();
	let connection = Connection::open(context, callback);

	connection.close();
	connection.close();
	drop(connection);

	assert_eq!(agent.closed_sessions().len(), 1);
}

#[test]
fn test_callback_failure_reaches_uncaught_pipeline() {
	let (agent, context) = setup(LoopbackAgent::new());
	let mut uncaught = context.uncaught_errors();
	let callback = ScriptFunction::new("onMessage", |_| {
		Err(ScriptError::new("TypeError", "handler exploded"))
	});
	let _connection = Connection::open(context, callback);
	let session = agent.last_session().unwrap();

	let outcome = agent.push_to_frontend(session, r#"{"method":"Debugger.paused"}"#).unwrap();

	let err = outcome.error().unwrap();
	assert_eq!(err.name, "TypeError");
	let reported = uncaught.try_recv().unwrap();
	assert_eq!(reported.message, "handler exploded");
}

#[test]
fn test_callback_runs_inside_context() {
	let (agent, context) = setup(LoopbackAgent::new());
	let observed = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&observed);
	let ctx = Arc::downgrade(&context);
	let callback = ScriptFunction::new("onMessage", move |_| {
		let entered = ctx.upgrade().map(|c| c.is_entered()).unwrap_or(false);
		sink.lock().push(entered);
		Ok(Value::Null)
	});
	let _connection = Connection::open(Arc::clone(&context), callback);
	let session = agent.last_session().unwrap();

	assert!(!context.is_entered());
	agent.push_to_frontend(session, "{}").unwrap();

	assert_eq!(*observed.lock(), vec![true]);
	assert!(!context.is_entered());
}

#[test]
fn test_reentrant_dispatch_keeps_issue_order() {
	let (agent, context) = setup(LoopbackAgent::new().with_ack_responder());
	let handle: Arc<Mutex<Option<Arc<Connection>>>> = Arc::new(Mutex::new(None));
	let received: Received = Arc::new(Mutex::new(Vec::new()));

	let sink = Arc::clone(&received);
	let target = Arc::clone(&handle);
	let callback = ScriptFunction::new("onMessage", move |args| {
		let payload = args[0].as_str().unwrap_or_default().to_string();
		let is_first = payload.contains(r#""id":1"#);
		sink.lock().push(payload);
		if is_first {
			let connection = target.lock().clone();
			if let Some(connection) = connection {
				connection.dispatch(r#"{"id":2,"method":"Debugger.resume"}"#);
			}
		}
		Ok(Value::Null)
	});

	let connection = Arc::new(Connection::open(context, callback));
	*handle.lock() = Some(Arc::clone(&connection));
	let session = agent.last_session().unwrap();

	connection.dispatch(r#"{"id":1,"method":"Debugger.enable"}"#);

	assert_eq!(
		agent.inbound(session),
		vec![
			r#"{"id":1,"method":"Debugger.enable"}"#,
			r#"{"id":2,"method":"Debugger.resume"}"#,
		]
	);
	assert_eq!(
		*received.lock(),
		vec![r#"{"id":1,"result":{}}"#, r#"{"id":2,"result":{}}"#]
	);

	handle.lock().take();
}

#[test]
fn test_close_from_callback_defers_session_close() {
	let (agent, context) = setup(LoopbackAgent::new().with_ack_responder());
	let handle: Arc<Mutex<Option<Arc<Connection>>>> = Arc::new(Mutex::new(None));
	let closed_during_callback = Arc::new(Mutex::new(None));

	let target = Arc::clone(&handle);
	let probe = Arc::clone(&closed_during_callback);
	let agent_probe = Arc::clone(&agent);
	let callback = ScriptFunction::new("onMessage", move |_| {
		let connection = target.lock().clone();
		if let Some(connection) = connection {
			connection.close();
			*probe.lock() = Some(agent_probe.closed_sessions().len());
		}
		Ok(Value::Null)
	});

	let connection = Arc::new(Connection::open(context, callback));
	*handle.lock() = Some(Arc::clone(&connection));
	let session = agent.last_session().unwrap();

	connection.dispatch(r#"{"id":1,"method":"Runtime.enable"}"#);

	// Still on the stack of dispatch when the callback ran.
	assert_eq!(*closed_during_callback.lock(), Some(0));
	assert_eq!(agent.closed_sessions(), vec![session]);
	assert_eq!(connection.state(), ConnectionState::Disconnected);

	connection.dispatch(r#"{"id":2,"method":"Runtime.disable"}"#);
	assert_eq!(agent.inbound(session).len(), 1);

	handle.lock().take();
}

#[test]
fn test_connection_ids_are_unique() {
	let a = ConnectionId::next();
	let b = ConnectionId::next();
	assert_ne!(a, b);
	assert!(a.to_string().starts_with("connection#"));
}
