//! Effective inspector configuration.
//!
//! Layers, lowest to highest precedence:
//!
//! 1. built-in [`InspectorOptions::default`]
//! 2. global `$XDG_CONFIG_HOME/insp/config.json`
//! 3. project `.insp/config.json` (current directory)
//! 4. an explicit `--config FILE`
//! 5. `--host` / `--port` flags

use std::fs;
use std::path::{Path, PathBuf};

use insp_runtime::InspectorOptions;
use serde::Serialize;

use crate::error::{CliError, Result};

/// Candidate config files, in merge order.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
	pub global: PathBuf,
	pub project: PathBuf,
	pub explicit: Option<PathBuf>,
}

impl ConfigPaths {
	pub fn new(project_root: &Path, explicit: Option<PathBuf>) -> Self {
		let config_home = std::env::var_os("XDG_CONFIG_HOME")
			.map(PathBuf::from)
			.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
			.unwrap_or_else(|| PathBuf::from("."));

		Self {
			global: config_home.join("insp").join("config.json"),
			project: project_root.join(".insp").join("config.json"),
			explicit,
		}
	}

}

/// Command-line overrides applied on top of file config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub host: Option<String>,
	pub port: Option<u16>,
}

/// Merged options plus the files they came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
	pub options: InspectorOptions,
	pub sources: Vec<PathBuf>,
}

impl EffectiveConfig {
	pub fn load(paths: &ConfigPaths, overrides: &Overrides) -> Result<Self> {
		let mut options = InspectorOptions::default();
		let mut sources = Vec::new();

		for path in [&paths.global, &paths.project] {
			if let Some(layer) = load_json(path)? {
				tracing::debug!(path = %path.display(), "Loaded config layer");
				options.merge(&layer);
				sources.push(path.clone());
			}
		}

		// An explicit file must exist.
		if let Some(ref path) = paths.explicit {
			let layer = load_json(path)?.ok_or_else(|| {
				std::io::Error::new(
					std::io::ErrorKind::NotFound,
					format!("config file not found: {}", path.display()),
				)
			})?;
			options.merge(&layer);
			sources.push(path.clone());
		}

		if let Some(ref host) = overrides.host {
			options.host_port.host = host.clone();
		}
		if let Some(port) = overrides.port {
			options.host_port.port = port;
		}

		Ok(Self { options, sources })
	}
}

/// Missing files are skipped; unreadable JSON is an error.
fn load_json(path: &Path) -> Result<Option<InspectorOptions>> {
	let content = match fs::read_to_string(path) {
		Ok(content) => content,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(err) => return Err(err.into()),
	};
	serde_json::from_str(&content)
		.map(Some)
		.map_err(|source| CliError::Config {
			path: path.to_path_buf(),
			source,
		})
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn paths_in(tmp: &TempDir) -> ConfigPaths {
		ConfigPaths {
			global: tmp.path().join("global/insp/config.json"),
			project: tmp.path().join("project/.insp/config.json"),
			explicit: None,
		}
	}

	fn write(path: &Path, content: &str) {
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(path, content).unwrap();
	}

	#[test]
	fn test_project_path_under_root() {
		let paths = ConfigPaths::new(Path::new("/work/app"), None);
		assert_eq!(paths.project, PathBuf::from("/work/app/.insp/config.json"));
		assert!(paths.global.ends_with("insp/config.json"));
	}

	#[test]
	fn test_no_files_gives_defaults() {
		let tmp = TempDir::new().unwrap();
		let config = EffectiveConfig::load(&paths_in(&tmp), &Overrides::default()).unwrap();

		assert_eq!(config.options, InspectorOptions::default());
		assert!(config.sources.is_empty());
	}

	#[test]
	fn test_project_overrides_global() {
		let tmp = TempDir::new().unwrap();
		let paths = paths_in(&tmp);
		write(
			&paths.global,
			r#"{"hostPort":{"host":"0.0.0.0","port":9300},"pauseOnStart":true}"#,
		);
		write(&paths.project, r#"{"hostPort":{"host":"127.0.0.1","port":9400}}"#);

		let config = EffectiveConfig::load(&paths, &Overrides::default()).unwrap();

		assert_eq!(config.options.host_port.host, "0.0.0.0");
		assert_eq!(config.options.host_port.port, 9400);
		assert!(config.options.pause_on_start);
		assert_eq!(config.sources, vec![paths.global.clone(), paths.project.clone()]);
	}

	#[test]
	fn test_flags_win() {
		let tmp = TempDir::new().unwrap();
		let paths = paths_in(&tmp);
		write(&paths.project, r#"{"hostPort":{"host":"10.0.0.1","port":9400}}"#);

		let overrides = Overrides {
			host: Some("localhost".into()),
			port: Some(9500),
		};
		let config = EffectiveConfig::load(&paths, &overrides).unwrap();

		assert_eq!(config.options.host_port.to_string(), "localhost:9500");
	}

	#[test]
	fn test_missing_explicit_file_is_an_error() {
		let tmp = TempDir::new().unwrap();
		let mut paths = paths_in(&tmp);
		paths.explicit = Some(tmp.path().join("absent.json"));

		let err = EffectiveConfig::load(&paths, &Overrides::default()).unwrap_err();
		assert!(matches!(err, CliError::Io(_)));
	}

	#[test]
	fn test_invalid_json_is_reported() {
		let tmp = TempDir::new().unwrap();
		let mut paths = paths_in(&tmp);
		let explicit = tmp.path().join("broken.json");
		write(&explicit, "{ not json");
		paths.explicit = Some(explicit.clone());

		let err = EffectiveConfig::load(&paths, &Overrides::default()).unwrap_err();

		match err {
			CliError::Config { path, .. } => assert_eq!(path, explicit),
			other => panic!("expected config error, got {other:?}"),
		}
	}
}
