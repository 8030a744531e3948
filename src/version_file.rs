//! Generated version files and reading values back out of them.

use crate::domain::RepositoryState;
use crate::error::{Result, ScmverError};
use crate::template;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_TEMPLATE: &str = "# file generated by scmver; DO NOT EDIT.\n\nversion = '{version}'\n";

/// Attribute read by [load_attribute] when the spec names none
pub const DEFAULT_ATTRIBUTE: &str = "version";

/// Renders `template` with `{version}`, `{tag}`, `{distance}`, `{revision}`,
/// `{branch}` and `{dirty}`.
pub fn render_version_file(
    template: &str,
    version: &str,
    state: &RepositoryState,
) -> Result<String> {
    template::render(
        template,
        &[
            ("version", version.into()),
            ("tag", state.tag.as_str().into()),
            ("distance", state.distance.into()),
            ("revision", state.revision.as_deref().into()),
            ("branch", state.branch.as_deref().into()),
            ("dirty", state.dirty.into()),
        ],
    )
}

/// Renders `template` and writes it to `path`, creating parent directories.
///
/// Nothing is written when rendering fails.
pub fn write_version_file(
    path: &Path,
    template: &str,
    version: &str,
    state: &RepositoryState,
) -> Result<()> {
    let content = render_version_file(template, version, state)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    debug!(path = %path.display(), version, "wrote version file");
    Ok(())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Splits `FILE[:ATTR]`. A colon followed by something other than an
/// identifier belongs to the file name (`C:\version.py`).
fn split_spec(spec: &str) -> (&str, &str) {
    match spec.rsplit_once(':') {
        Some((target, attr)) if !target.is_empty() && is_identifier(attr) => (target, attr),
        _ => (spec, DEFAULT_ATTRIBUTE),
    }
}

fn candidates(target: &str, base: &Path) -> Vec<PathBuf> {
    let module = target.replace('.', "/");
    vec![
        base.join(target),
        base.join(format!("{}.py", module)),
        base.join(&module).join("__init__.py"),
    ]
}

/// Reads `ATTR = 'value'` from the file named by `spec`.
///
/// `spec` is `FILE[:ATTR]` with `ATTR` defaulting to `version`. `FILE` is
/// either a path relative to `base` or a dotted module name (`pkg.mod`
/// resolves to `pkg/mod.py` or `pkg/mod/__init__.py`).
pub fn load_attribute(spec: &str, base: &Path) -> Result<String> {
    let (target, attr) = split_spec(spec.trim());
    let path = candidates(target, base)
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| {
            ScmverError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("cannot find '{}' in {}", target, base.display()),
            ))
        })?;
    debug!(path = %path.display(), attr, "loading attribute");

    let content = fs::read_to_string(&path)?;
    let re = Regex::new(&format!(
        r#"(?m)^\s*{}\s*=\s*(?:'([^'\n]*)'|"([^"\n]*)")"#,
        regex::escape(attr)
    ))?;
    re.captures(&content)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            ScmverError::version(format!(
                "'{}' has no attribute '{}'",
                path.display(),
                attr
            ))
        })
}
