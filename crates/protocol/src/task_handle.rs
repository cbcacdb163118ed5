//! Task handle codec.
//!
//! The engine's async-stack tracking keys tasks by pointer-like values and
//! assumes real pointers are word aligned. Script-side task ids are shifted
//! left by one so every handle is even and cannot be mistaken for anything
//! the engine allocated itself.
//!
//! Ids whose shifted value does not fit the native pointer width are outside
//! the contract. The shift wraps; nothing is validated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, even-valued encoding of a script task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(i64);

impl TaskHandle {
	/// Encodes a task id as `task_id << 1`.
	pub const fn encode(task_id: i64) -> Self {
		Self(task_id.wrapping_shl(1))
	}

	pub const fn as_raw(self) -> i64 {
		self.0
	}

	/// The handle as the engine sees it: a pointer-sized integer.
	///
	/// Truncates on targets narrower than 64 bits.
	pub const fn as_ptr_bits(self) -> usize {
		self.0 as usize
	}

	pub const fn is_even(self) -> bool {
		self.0 & 1 == 0
	}
}

impl From<TaskHandle> for i64 {
	fn from(handle: TaskHandle) -> Self {
		handle.0
	}
}

impl fmt::Display for TaskHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}
