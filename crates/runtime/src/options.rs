//! Inspector startup options.

use serde::{Deserialize, Serialize};

use crate::agent::HostPort;

/// Options an embedding applies to its agent before script code runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectorOptions {
	/// Where remote debuggers connect.
	pub host_port: HostPort,
	/// Block startup until a remote debugger attaches.
	pub wait_for_debugger: bool,
	/// Break on the first statement of the entry script.
	pub pause_on_start: bool,
}

impl Default for InspectorOptions {
	fn default() -> Self {
		Self {
			host_port: HostPort::default(),
			wait_for_debugger: false,
			pause_on_start: false,
		}
	}
}

impl InspectorOptions {
	/// Overlays `other` on top of `self`. Fields in `other` that still hold
	/// their default value do not override.
	pub fn merge(&mut self, other: &InspectorOptions) {
		let defaults = HostPort::default();
		if other.host_port.host != defaults.host {
			self.host_port.host = other.host_port.host.clone();
		}
		if other.host_port.port != defaults.port {
			self.host_port.port = other.host_port.port;
		}
		self.wait_for_debugger |= other.wait_for_debugger;
		self.pause_on_start |= other.pause_on_start;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_from_empty_json() {
		let options: InspectorOptions = serde_json::from_str("{}").unwrap();
		assert_eq!(options, InspectorOptions::default());
		assert_eq!(options.host_port.to_string(), "127.0.0.1:9229");
	}

	#[test]
	fn test_camel_case_fields() {
		let options: InspectorOptions = serde_json::from_str(
			r#"{"hostPort":{"host":"0.0.0.0","port":9339},"waitForDebugger":true}"#,
		)
		.unwrap();
		assert_eq!(options.host_port, HostPort::new("0.0.0.0", 9339));
		assert!(options.wait_for_debugger);
		assert!(!options.pause_on_start);
	}

	#[test]
	fn test_merge_keeps_base_when_overlay_is_default() {
		let mut base = InspectorOptions {
			host_port: HostPort::new("10.0.0.2", 9400),
			..Default::default()
		};
		base.merge(&InspectorOptions::default());
		assert_eq!(base.host_port, HostPort::new("10.0.0.2", 9400));

		base.merge(&InspectorOptions {
			host_port: HostPort::new("127.0.0.1", 9500),
			pause_on_start: true,
			..Default::default()
		});
		assert_eq!(base.host_port, HostPort::new("10.0.0.2", 9500));
		assert!(base.pause_on_start);
	}
}
