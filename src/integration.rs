//! Single entry point for build tools: resolve, compute, write.

use crate::domain::{next_version, version_pattern, LocalVersion, Version, DEFAULT_SPEC};
use crate::error::Result;
use crate::scm::{resolve, ProbeOptions, Registry};
use crate::version_file::{load_attribute, write_version_file, DEFAULT_TEMPLATE};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Version used when no working copy is found
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    /// A literal version
    Version(String),
    /// A `FILE[:ATTR]` spec read with [load_attribute], relative to `base`
    /// or to the project root
    Load { spec: String, base: Option<PathBuf> },
}

impl Fallback {
    /// Text that parses as a version is taken literally, anything else is a
    /// load spec.
    pub fn parse(text: &str) -> Self {
        match Version::parse(text) {
            Ok(_) => Fallback::Version(text.trim().to_string()),
            Err(_) => Fallback::Load {
                spec: text.trim().to_string(),
                base: None,
            },
        }
    }

    fn value(&self, root: &Path) -> Result<String> {
        match self {
            Fallback::Version(version) => Ok(version.clone()),
            Fallback::Load { spec, base } => load_attribute(spec, base.as_deref().unwrap_or(root)),
        }
    }
}

/// Everything [get_version] needs besides the project root
#[derive(Debug, Clone)]
pub struct VersionRequest {
    pub spec: String,
    pub local: LocalVersion,
    /// Tag → version regex with a `version` group
    pub version_pattern: Option<String>,
    /// Template for `write_to`
    pub template: String,
    /// Version file to generate, relative to the project root
    pub write_to: Option<PathBuf>,
    pub fallback: Option<Fallback>,
    pub options: ProbeOptions,
}

impl Default for VersionRequest {
    fn default() -> Self {
        VersionRequest {
            spec: DEFAULT_SPEC.to_string(),
            local: LocalVersion::default(),
            version_pattern: None,
            template: DEFAULT_TEMPLATE.to_string(),
            write_to: None,
            fallback: None,
            options: ProbeOptions::new(),
        }
    }
}

/// Computes the version of the project at `root`.
///
/// Returns `Ok(None)` when no working copy is found and no fallback is
/// configured. The version file is only written for a resolved working
/// copy.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn get_version(
    root: &Path,
    request: &VersionRequest,
    registry: &Registry,
) -> Result<Option<String>> {
    let pattern = request
        .version_pattern
        .as_deref()
        .map(version_pattern)
        .transpose()?;

    let state = match resolve(root, &request.options, registry)? {
        Some(state) => state,
        None => {
            return match &request.fallback {
                Some(fallback) => {
                    let version = fallback.value(root)?;
                    warn!(%version, "no repository found, using fallback version");
                    Ok(Some(version))
                }
                None => {
                    warn!("no repository found");
                    Ok(None)
                }
            }
        }
    };

    let version = next_version(&state, &request.spec, &request.local, pattern.as_ref())?;
    if let Some(path) = &request.write_to {
        write_version_file(&root.join(path), &request.template, &version, &state)?;
    }
    info!(%version, "computed version");
    Ok(Some(version))
}
