//! Next version computation from a repository state.

use crate::domain::state::RepositoryState;
use crate::domain::version::Version;
use crate::error::{Result, ScmverError};
use crate::template::{self, Value};
use chrono::{Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Default bump specifier applied when the working copy is past its tag
pub const DEFAULT_SPEC: &str = "post";

/// Default local label template (only rendered for dirty working copies)
pub const DEFAULT_LOCAL: &str = "{local:%Y-%m-%d}";

/// Default pattern extracting the version from a tag
pub const DEFAULT_VERSION_PATTERN: &str = r"(?P<version>v?\d+.*)\z";

static DEFAULT_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_VERSION_PATTERN).unwrap());

/// Source of the local version label
#[derive(Clone)]
pub enum LocalVersion {
    /// `{placeholder}` template rendered when the working copy is dirty
    Template(String),
    /// Callback invoked for every state, dirty or not
    Function(Arc<dyn Fn(&RepositoryState) -> Option<String> + Send + Sync>),
}

impl LocalVersion {
    pub fn template(template: impl Into<String>) -> Self {
        LocalVersion::Template(template.into())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&RepositoryState) -> Option<String> + Send + Sync + 'static,
    {
        LocalVersion::Function(Arc::new(f))
    }

    fn label(&self, state: &RepositoryState) -> Result<Option<String>> {
        match self {
            LocalVersion::Function(f) => Ok(f(state)),
            LocalVersion::Template(_) if !state.dirty => Ok(None),
            LocalVersion::Template(t) => render_local(t, state).map(Some),
        }
    }
}

impl Default for LocalVersion {
    fn default() -> Self {
        LocalVersion::template(DEFAULT_LOCAL)
    }
}

impl fmt::Debug for LocalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalVersion::Template(t) => f.debug_tuple("Template").field(t).finish(),
            LocalVersion::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Compiles a tag pattern, requiring a `version` capture group
pub fn version_pattern(pattern: &str) -> Result<Regex> {
    let re = Regex::new(pattern)?;
    if !re.capture_names().flatten().any(|name| name == "version") {
        return Err(ScmverError::version(
            "regex does not have the version group",
        ));
    }
    Ok(re)
}

/// Computes the version to publish for `state`.
///
/// The version is taken from the `version` group of `pattern` searched in
/// the tag (the default accepts `v1.0`, `spam-1.0`, ...). When the working
/// copy is past the tag, `spec` is applied with the distance as value.
pub fn next_version(
    state: &RepositoryState,
    spec: &str,
    local: &LocalVersion,
    pattern: Option<&Regex>,
) -> Result<String> {
    let re = pattern.unwrap_or(&DEFAULT_VERSION_RE);
    let raw = re
        .captures(&state.tag)
        .and_then(|caps| caps.name("version"))
        .ok_or_else(|| ScmverError::version("cannot parse version from SCM tag"))?;

    let mut version = Version::parse(raw.as_str())?;
    if state.distance > 0 {
        let distance = i64::try_from(state.distance).unwrap_or(i64::MAX);
        version.update(spec, distance)?;
    }

    match local.label(state)? {
        Some(label) if !label.is_empty() => Ok(format!("{}+{}", version, label)),
        _ => Ok(version.to_string()),
    }
}

fn render_local(template: &str, state: &RepositoryState) -> Result<String> {
    template::render(
        template,
        &[
            ("distance", state.distance.into()),
            ("revision", state.revision.as_deref().into()),
            ("branch", state.branch.as_deref().into()),
            ("utc", Value::Time(Utc::now().naive_utc())),
            ("local", Value::Time(Local::now().naive_local())),
        ],
    )
}
