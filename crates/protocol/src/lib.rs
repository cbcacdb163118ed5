//! Message-format glue for inspector sessions.
//!
//! The inspector engine speaks an opaque JSON-RPC-like protocol over
//! wide-character strings, while the scripting layer works with native
//! strings. This crate holds the small set of types that sit on that seam:
//!
//! - [`StringView`] / [`ProtocolString`]: engine-side text, borrowed and owned
//! - [`Envelope`]: read-only classification of a payload for diagnostics
//! - [`TaskHandle`]: the even-valued encoding of async task identifiers
//!
//! Nothing here interprets protocol schemas. Payloads cross the seam verbatim.

pub mod envelope;
pub mod string_view;
pub mod task_handle;

pub use envelope::Envelope;
pub use string_view::{ProtocolString, StringView};
pub use task_handle::TaskHandle;
