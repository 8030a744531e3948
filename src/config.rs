use crate::domain::{LocalVersion, DEFAULT_LOCAL, DEFAULT_SPEC, DEFAULT_VERSION_PATTERN};
use crate::error::Result;
use crate::integration::{Fallback, VersionRequest};
use crate::scm::ProbeOptions;
use crate::version_file::DEFAULT_TEMPLATE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the current and user config directories
pub const CONFIG_FILE: &str = "scmver.toml";

/// Represents the complete configuration for scmver.
///
/// Contains the bump spec, local version template, tag pattern, the
/// generated file settings and per-backend probe options.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_spec")]
    pub spec: String,

    #[serde(default = "default_local")]
    pub local: String,

    /// Tag → version regex with a `version` group
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default)]
    pub write_to: Option<PathBuf>,

    /// Literal version or `FILE[:ATTR]` used when no repository is found
    #[serde(default)]
    pub fallback: Option<String>,

    /// Marker switches; `false` disables the backend registered under it
    #[serde(default)]
    pub markers: BTreeMap<String, bool>,

    /// Backend options such as `"git.tag"` or `"subversion.trunk"`
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

fn default_spec() -> String {
    DEFAULT_SPEC.to_string()
}

fn default_local() -> String {
    DEFAULT_LOCAL.to_string()
}

fn default_version() -> String {
    DEFAULT_VERSION_PATTERN.to_string()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            spec: default_spec(),
            local: default_local(),
            version: default_version(),
            template: default_template(),
            write_to: None,
            fallback: None,
            markers: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Probe options built from the `markers` and `options` tables.
    pub fn probe_options(&self) -> ProbeOptions {
        let mut options = ProbeOptions::new();
        for (marker, enabled) in &self.markers {
            options.set_marker(marker.as_str(), *enabled);
        }
        for (key, value) in &self.options {
            options.set(key.as_str(), value.as_str());
        }
        options
    }

    /// Request for [crate::integration::get_version] carrying every
    /// configured value.
    pub fn version_request(&self) -> VersionRequest {
        VersionRequest {
            spec: self.spec.clone(),
            local: LocalVersion::template(self.local.as_str()),
            version_pattern: Some(self.version.clone()),
            template: self.template.clone(),
            write_to: self.write_to.clone(),
            fallback: self.fallback.as_deref().map(Fallback::parse),
            options: self.probe_options(),
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `scmver.toml` in current directory
/// 3. `scmver.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let path = if let Some(path) = config_path {
        PathBuf::from(path)
    } else if Path::new(CONFIG_FILE).exists() {
        PathBuf::from(CONFIG_FILE)
    } else if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            path
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    debug!(path = %path.display(), "loading configuration");
    let config_str = fs::read_to_string(&path)?;
    let config: Config = toml::from_str(&config_str)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("spec = \"minor.dev\"\n").unwrap();
        assert_eq!(config.spec, "minor.dev");
        assert_eq!(config.local, DEFAULT_LOCAL);
        assert_eq!(config.template, DEFAULT_TEMPLATE);
        assert!(config.write_to.is_none());
    }

    #[test]
    fn test_probe_options() {
        let config: Config = toml::from_str(
            r#"
[markers]
".hg_archival.txt" = false

[options]
"git.tag" = "v*"
"subversion.trunk" = "main"
"#,
        )
        .unwrap();

        let options = config.probe_options();
        assert!(!options.is_enabled(".hg_archival.txt"));
        assert!(options.is_enabled(".git"));
        assert_eq!(options.get("git.tag"), Some("v*"));
        assert_eq!(options.get("subversion.trunk"), Some("main"));
    }

    #[test]
    fn test_version_request() {
        let config: Config = toml::from_str(
            r#"
write_to = "spam/version.py"
fallback = "1.0"
"#,
        )
        .unwrap();

        let request = config.version_request();
        assert_eq!(request.spec, DEFAULT_SPEC);
        assert_eq!(request.write_to, Some(PathBuf::from("spam/version.py")));
        assert_eq!(request.fallback, Some(Fallback::Version("1.0".to_string())));
        assert_eq!(request.version_pattern.as_deref(), Some(DEFAULT_VERSION_PATTERN));
    }
}
