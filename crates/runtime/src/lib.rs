//! Inspector runtime - session bridge, async task relay, async-hook registration
//!
//! This crate connects script code running in an embedding to a native
//! inspector engine:
//!
//! - **Session bridge**: [`Connection`] owns one native session, forwards
//!   script commands into it, and delivers engine messages to a script callback
//! - **Async task relay**: [`AsyncTaskRelay`] turns script task ids into
//!   even-valued [`TaskHandle`]s for the engine's async stack tracking
//! - **Async hooks**: [`AsyncHookSlot`] stores the enable/disable pair the
//!   engine triggers when it needs async-context instrumentation
//! - **Binding**: [`InspectorBinding`] is the handle-based surface script code calls
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │   script code     │  callbacks, payload strings, task ids
//! └─────────┬─────────┘
//!           │ InspectorBinding (ConnectionId handles)
//! ┌─────────▼─────────┐
//! │   insp-runtime    │  This crate
//! │  ┌─────────────┐  │
//! │  │ Connection  │  │  bridge + delegate
//! │  └─────────────┘  │
//! │  ┌─────────────┐  │
//! │  │ TaskRelay   │  │  id -> handle
//! │  └─────────────┘  │
//! └─────────┬─────────┘
//!           │ Agent / InspectorSession / SessionDelegate
//! ┌─────────▼─────────┐
//! │  inspector engine │  native, or LoopbackAgent
//! └───────────────────┘
//! ```
//!
//! # Decoupling via Agent
//!
//! The runtime never names a concrete engine. Everything engine-side goes
//! through the [`Agent`] trait, so the same bridge runs against a native
//! engine binding or the in-process [`LoopbackAgent`].
//!
//! [`TaskHandle`]: insp_protocol::TaskHandle

pub mod agent;
pub mod async_hooks;
pub mod binding;
pub mod connection;
pub mod console;
pub mod context;
pub mod error;
pub mod loopback;
pub mod options;
pub mod script;
pub mod task;

// Re-export key types at crate root
pub use agent::{Agent, HostPort, InspectorSession, SessionDelegate};
pub use async_hooks::{AsyncHookHandle, AsyncHookPair, AsyncHookSlot};
pub use binding::{BREAK_ON_START, InspectorBinding};
pub use connection::{
	BindingSessionDelegate, Connection, ConnectionId, ConnectionState, ConnectionStore,
};
pub use context::{ContextScope, ExecutionContext};
pub use error::{Error, Result};
pub use insp_protocol::{Envelope, ProtocolString, StringView, TaskHandle};
pub use loopback::{FrontendMessage, LoopbackAgent, LoopbackSession, SessionId, TaskEvent};
pub use options::InspectorOptions;
pub use script::{CallbackOutcome, ScriptError, ScriptFunction};
pub use task::AsyncTaskRelay;
