//! Registry of live bridges by [`ConnectionId`].
//!
//! Script code only ever holds a [`ConnectionId`]. Removing an id invalidates
//! the handle for good: later lookups miss, and the bridge is torn down as soon
//! as the last in-flight borrower lets go of it.
//!
//! Uses [`DashMap`] so lookups never hold a lock while script callbacks run;
//! [`ConnectionStore::try_get`] hands out a clone of the `Arc` and releases
//! the shard before returning.

use std::sync::Arc;

use dashmap::DashMap;

use super::{Connection, ConnectionId};
use crate::error::{Error, Result};

/// Thread-safe registry of bridges by id.
pub struct ConnectionStore {
	connections: DashMap<ConnectionId, Arc<Connection>>,
}

impl Default for ConnectionStore {
	fn default() -> Self {
		Self::new()
	}
}

impl ConnectionStore {
	pub fn new() -> Self {
		Self {
			connections: DashMap::new(),
		}
	}

	/// Registers a bridge and returns its id.
	pub fn insert(&self, connection: Connection) -> ConnectionId {
		let id = connection.id();
		self.connections.insert(id, Arc::new(connection));
		id
	}

	/// Synchronous lookup.
	pub fn try_get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
		self.connections.get(&id).map(|r| Arc::clone(r.value()))
	}

	/// Removes the bridge and tears it down.
	///
	/// Fails with [`Error::UnknownConnection`] if the id is not live, which
	/// includes a second removal of the same id.
	pub fn remove(&self, id: ConnectionId) -> Result<()> {
		let (_, connection) = self
			.connections
			.remove(&id)
			.ok_or(Error::UnknownConnection(id))?;
		connection.close();
		Ok(())
	}

	pub fn contains(&self, id: ConnectionId) -> bool {
		self.connections.contains_key(&id)
	}

	pub fn len(&self) -> usize {
		self.connections.len()
	}

	pub fn is_empty(&self) -> bool {
		self.connections.is_empty()
	}

	/// Tears down every registered bridge.
	pub fn clear(&self) {
		let ids: Vec<ConnectionId> = self.connections.iter().map(|r| *r.key()).collect();
		for id in ids {
			// Concurrent removal may have won; nothing left to do then.
			let _ = self.remove(id);
		}
	}
}
