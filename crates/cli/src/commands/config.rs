use crate::config::EffectiveConfig;
use crate::error::Result;
use crate::output::{DiagnosticLevel, OutputFormat, ResultBuilder, print_result};

pub fn execute(config: EffectiveConfig, format: OutputFormat) -> Result<()> {
	let mut builder = ResultBuilder::new("config");
	if config.sources.is_empty() {
		builder = builder.diagnostic(DiagnosticLevel::Info, "no config files found; using defaults");
	}
	print_result(&builder.data(config).build(), format);
	Ok(())
}
