mod config;
mod handle;
pub mod replay;

use crate::cli::{Cli, Commands};
use crate::config::{ConfigPaths, EffectiveConfig};
use crate::error::Result;
use crate::output::OutputFormat;

pub async fn dispatch(cli: Cli, format: OutputFormat) -> Result<()> {
	let overrides = cli.overrides();

	match cli.command {
		Commands::Handle { ids } => handle::execute(&ids, format),
		Commands::Replay { file } => {
			let config = load_config(cli.config, &overrides)?;
			replay::execute(&file, &config, format).await
		}
		Commands::Config => {
			let config = load_config(cli.config, &overrides)?;
			config::execute(config, format)
		}
	}
}

fn load_config(
	explicit: Option<std::path::PathBuf>,
	overrides: &crate::config::Overrides,
) -> Result<EffectiveConfig> {
	let cwd = std::env::current_dir()?;
	EffectiveConfig::load(&ConfigPaths::new(&cwd, explicit), overrides)
}
