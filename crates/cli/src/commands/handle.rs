use insp_protocol::TaskHandle;
use serde::Serialize;

use crate::error::Result;
use crate::output::{DiagnosticLevel, OutputFormat, ResultBuilder, print_result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleEntry {
	pub task_id: i64,
	pub handle: TaskHandle,
	pub hex: String,
}

pub fn execute(ids: &[i64], format: OutputFormat) -> Result<()> {
	let entries: Vec<HandleEntry> = ids
		.iter()
		.map(|&task_id| {
			let handle = TaskHandle::encode(task_id);
			HandleEntry {
				task_id,
				handle,
				hex: handle.to_string(),
			}
		})
		.collect();

	let mut builder = ResultBuilder::new("handle");
	for entry in &entries {
		if entry.handle.as_raw() >> 1 != entry.task_id {
			builder = builder.diagnostic(
				DiagnosticLevel::Warning,
				format!("task id {} does not fit in 63 bits; handle wrapped", entry.task_id),
			);
		}
	}

	print_result(&builder.data(entries).build(), format);
	Ok(())
}
