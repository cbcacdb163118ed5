//! Engine-side string representations.
//!
//! The inspector engine hands out text as a borrowed view that is either
//! one-byte (Latin-1) or two-byte (UTF-16) encoded. Outbound script payloads
//! are converted into an owned UTF-16 [`ProtocolString`] before dispatch.

use std::fmt;

/// Borrowed view over engine-owned text.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StringView<'a> {
	/// One byte per character, Latin-1.
	Latin1(&'a [u8]),
	/// UTF-16 code units. May contain unpaired surrogates.
	Utf16(&'a [u16]),
}

impl<'a> StringView<'a> {
	/// Number of code units in the view.
	pub fn len(&self) -> usize {
		match self {
			StringView::Latin1(bytes) => bytes.len(),
			StringView::Utf16(units) => units.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_8bit(&self) -> bool {
		matches!(self, StringView::Latin1(_))
	}

	/// Converts the view into a native string.
	///
	/// Unpaired surrogates are replaced with U+FFFD.
	pub fn to_string_lossy(&self) -> String {
		match self {
			StringView::Latin1(bytes) => bytes.iter().map(|&b| char::from(b)).collect(),
			StringView::Utf16(units) => String::from_utf16_lossy(units),
		}
	}
}

impl fmt::Debug for StringView<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = if self.is_8bit() { "Latin1" } else { "Utf16" };
		f.debug_tuple(kind).field(&self.to_string_lossy()).finish()
	}
}

/// Owned UTF-16 buffer handed to the engine's inbound entry point.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ProtocolString {
	units: Vec<u16>,
}

impl ProtocolString {
	pub fn new(text: &str) -> Self {
		Self {
			units: text.encode_utf16().collect(),
		}
	}

	/// Wraps raw code units without validation.
	pub fn from_units(units: Vec<u16>) -> Self {
		Self { units }
	}

	pub fn as_view(&self) -> StringView<'_> {
		StringView::Utf16(&self.units)
	}

	pub fn units(&self) -> &[u16] {
		&self.units
	}

	pub fn len(&self) -> usize {
		self.units.len()
	}

	pub fn is_empty(&self) -> bool {
		self.units.is_empty()
	}
}

impl From<&str> for ProtocolString {
	fn from(text: &str) -> Self {
		Self::new(text)
	}
}

impl From<String> for ProtocolString {
	fn from(text: String) -> Self {
		Self::new(&text)
	}
}

impl fmt::Debug for ProtocolString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ProtocolString")
			.field(&String::from_utf16_lossy(&self.units))
			.finish()
	}
}

impl fmt::Display for ProtocolString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&String::from_utf16_lossy(&self.units))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_protocol_string_preserves_non_ascii() {
		let payload = r#"{"method":"Runtime.evaluate","params":{"expression":"'héllo 🦀'"}}"#;
		let owned = ProtocolString::new(payload);

		assert_eq!(owned.len(), payload.encode_utf16().count());
		assert_eq!(owned.as_view().to_string_lossy(), payload);
	}

	#[test]
	fn test_latin1_view_decodes_high_bytes() {
		let bytes = [b'c', b'a', b'f', 0xE9];
		let view = StringView::Latin1(&bytes);

		assert!(view.is_8bit());
		assert_eq!(view.len(), 4);
		assert_eq!(view.to_string_lossy(), "café");
	}

	#[test]
	fn test_unpaired_surrogate_is_replaced() {
		let units = [0x0061, 0xD800, 0x0062];
		let view = StringView::Utf16(&units);

		assert_eq!(view.to_string_lossy(), "a\u{FFFD}b");
	}

	#[test]
	fn test_empty_view() {
		let owned = ProtocolString::default();
		assert!(owned.is_empty());
		assert!(owned.as_view().is_empty());
		assert_eq!(owned.as_view().to_string_lossy(), "");
	}
}
