use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Overrides;
use crate::output::OutputFormat;
use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "insp")]
#[command(about = "Inspector bridge driver - task handles, scenario replay, configuration")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: toon (default), json, ndjson, or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "toon")]
	pub format: OutputFormat,

	/// Extra config file, merged after the global and project files
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Inspector host (overrides config)
	#[arg(long, global = true, value_name = "HOST")]
	pub host: Option<String>,

	/// Inspector port (overrides config)
	#[arg(long, global = true, value_name = "PORT")]
	pub port: Option<u16>,

	#[command(subcommand)]
	pub command: Commands,
}

impl Cli {
	pub fn overrides(&self) -> Overrides {
		Overrides {
			host: self.host.clone(),
			port: self.port,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Print the engine task handle for each script task id
	Handle {
		/// Task ids (negative ids are accepted)
		#[arg(required = true, allow_negative_numbers = true)]
		ids: Vec<i64>,
	},

	/// Run a JSON bridge scenario against the loopback agent
	Replay {
		/// Scenario file
		file: PathBuf,
	},

	/// Print the effective inspector configuration
	Config,
}
