//! Subcommand workflows
//!
//! Each workflow merges the configuration with the command-line arguments,
//! calls into the library and returns what the binary prints. Nothing here
//! writes to stdout, so the workflows can be called programmatically.

use std::env;
use std::path::{Path, PathBuf};

use crate::cli::{GenerateArgs, LoadArgs, NextArgs, ProbeArgs, StatArgs, VersionArgs};
use crate::config::Config;
use crate::domain::{LocalVersion, RepositoryState};
use crate::error::Result;
use crate::integration::{get_version, VersionRequest};
use crate::scm::{resolve, ProbeOptions, Registry};
use crate::template::decode_escapes;
use crate::version_file::load_attribute;

/// Probe options from the configuration, overridden by the arguments
pub fn probe_options(config: &Config, args: &ProbeArgs) -> ProbeOptions {
    let mut options = config.probe_options();
    for (key, value) in &args.options {
        options.set(key.as_str(), value.as_str());
    }
    for marker in &args.disable {
        options.set_marker(marker.as_str(), false);
    }
    options
}

fn version_request(config: &Config, probe: &ProbeArgs, version: &VersionArgs) -> VersionRequest {
    let mut request = config.version_request();
    request.options = probe_options(config, probe);
    request.write_to = None;
    if let Some(spec) = &version.spec {
        request.spec = spec.clone();
    }
    if let Some(local) = &version.local {
        request.local = LocalVersion::template(local.as_str());
    }
    if let Some(regex) = &version.regex {
        request.version_pattern = Some(regex.clone());
    }
    request
}

/// `stat`: the repository state, `None` outside a working copy
pub fn run_stat(
    args: &StatArgs,
    config: &Config,
    registry: &Registry,
) -> Result<Option<RepositoryState>> {
    resolve(&args.probe.path, &probe_options(config, &args.probe), registry)
}

/// `next`: the version to publish, or the configured fallback
pub fn run_next(args: &NextArgs, config: &Config, registry: &Registry) -> Result<Option<String>> {
    let request = version_request(config, &args.probe, &args.version);
    get_version(&args.probe.path, &request, registry)
}

/// `generate`: writes the version file and returns the version written.
///
/// The file is left untouched when no working copy is found.
pub fn run_generate(
    args: &GenerateArgs,
    config: &Config,
    registry: &Registry,
) -> Result<Option<String>> {
    let mut request = version_request(config, &args.probe, &args.version);
    request.fallback = None;
    request.write_to = Some(absolute(&args.file)?);
    if let Some(template) = &args.template {
        request.template = decode_escapes(template);
    }
    get_version(&args.probe.path, &request, registry)
}

/// `load`: a value read from a generated file
pub fn run_load(args: &LoadArgs) -> Result<String> {
    load_attribute(&args.spec, &args.path)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}
