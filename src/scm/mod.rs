//! Source-control backends and repository-state resolution
//!
//! This module provides a trait-based abstraction over the supported
//! source-control systems. Each system is a [Backend] registered under one
//! or more marker names (`.git`, `.hg_archival.txt`, `_darcs`, ...). The
//! [resolve] function walks from a directory up to the filesystem root and
//! asks the registered backends, in order, whether the directory is one of
//! their working copies.
//!
//! # Overview
//!
//! - [git::GitBackend], [mercurial::MercurialBackend],
//!   [subversion::SubversionBackend], [bazaar::BazaarBackend],
//!   [darcs::DarcsBackend], [fossil::FossilBackend]: built-in backends
//! - [Registry]: ordered marker → backend table, open to third-party backends
//! - [runner::Runner]: how backends invoke their tools; [mock::MockRunner]
//!   scripts tool output in tests
//!
//! # Usage
//!
//! ```rust,no_run
//! # use scmver::scm::{resolve, ProbeOptions, Registry};
//! # fn example() -> scmver::Result<()> {
//! let registry = Registry::builtin();
//! if let Some(state) = resolve(".".as_ref(), &ProbeOptions::new(), &registry)? {
//!     println!("{} +{}", state.tag, state.distance);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bazaar;
pub mod darcs;
pub mod fossil;
pub mod git;
pub mod mercurial;
pub mod mock;
pub mod runner;
pub mod subversion;

pub use mock::MockRunner;
pub use runner::{Runner, SystemRunner, Tool, ToolOutput, ToolVersion, VersionPart};

use crate::domain::RepositoryState;
use crate::error::{Result, ScmverError};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A source-control system able to describe its working copies
///
/// All implementors must be `Send + Sync` so a [Registry] can be shared.
pub trait Backend: Send + Sync {
    /// Short backend name, also the namespace of its options (`git.tag`)
    fn name(&self) -> &'static str;

    /// Describes the working copy rooted at `root`.
    ///
    /// `marker` is the registry entry that matched, so a backend registered
    /// under several markers can tell them apart. Returns `Ok(None)` when
    /// `root` turns out not to be a working copy of this backend.
    fn probe(
        &self,
        root: &Path,
        marker: &str,
        options: &ProbeOptions,
    ) -> Result<Option<RepositoryState>>;

    /// Version of the backend's tool; empty when the banner is not understood
    fn tool_version(&self) -> Result<ToolVersion>;
}

/// Options passed to every probe
///
/// Markers can be switched off, and backend settings are stored under
/// namespaced keys such as `git.tag` or `subversion.trunk`.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    disabled: BTreeSet<String>,
    settings: BTreeMap<String, String>,
}

impl ProbeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables a marker
    pub fn set_marker(&mut self, marker: impl Into<String>, enabled: bool) {
        let marker = marker.into();
        if enabled {
            self.disabled.remove(&marker);
        } else {
            self.disabled.insert(marker);
        }
    }

    /// Builder form of [ProbeOptions::set_marker] disabling `marker`
    pub fn disable(mut self, marker: impl Into<String>) -> Self {
        self.set_marker(marker, false);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.settings.insert(key.into(), value.into());
    }

    /// Builder form of [ProbeOptions::set]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    pub fn is_enabled(&self, marker: &str) -> bool {
        !self.disabled.contains(marker)
    }

    /// Compiles the `<backend>.tag` filter, anchored at the start of the tag
    pub fn tag_filter(&self, backend: &str) -> Result<Option<Regex>> {
        match self.get(&format!("{}.tag", backend)) {
            Some(pattern) => Ok(Some(Regex::new(&format!("^(?:{})", pattern))?)),
            None => Ok(None),
        }
    }
}

/// Ordered table of marker names and the backends handling them
#[derive(Clone, Default)]
pub struct Registry {
    entries: Vec<(String, Arc<dyn Backend>)>,
}

impl Registry {
    /// A registry without any backend
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in backends invoking the real tools
    pub fn builtin() -> Self {
        Self::with_runner(Arc::new(SystemRunner))
    }

    /// Built-in backends invoking their tools through `runner`
    pub fn with_runner(runner: Arc<dyn Runner>) -> Self {
        let mercurial: Arc<dyn Backend> =
            Arc::new(mercurial::MercurialBackend::new(runner.clone()));
        let fossil: Arc<dyn Backend> = Arc::new(fossil::FossilBackend::new(runner.clone()));

        let mut registry = Self::empty();
        registry.register(git::MARKER, Arc::new(git::GitBackend::new(runner.clone())));
        registry.register(mercurial::MARKER, mercurial.clone());
        registry.register(mercurial::ARCHIVE_MARKER, mercurial);
        registry.register(
            subversion::MARKER,
            Arc::new(subversion::SubversionBackend::new(runner.clone())),
        );
        registry.register(
            bazaar::MARKER,
            Arc::new(bazaar::BazaarBackend::new(runner.clone())),
        );
        registry.register(darcs::MARKER, Arc::new(darcs::DarcsBackend::new(runner)));
        registry.register(fossil::MARKER, fossil.clone());
        registry.register(fossil::LEGACY_MARKER, fossil);
        registry
    }

    /// Registers `backend` for `marker`.
    ///
    /// An existing entry for the same marker is replaced in place and keeps
    /// its priority; a new marker is tried after all existing ones.
    pub fn register(&mut self, marker: impl Into<String>, backend: Arc<dyn Backend>) {
        let marker = marker.into();
        match self.entries.iter_mut().find(|(m, _)| *m == marker) {
            Some(entry) => entry.1 = backend,
            None => self.entries.push((marker, backend)),
        }
    }

    /// Removes the entry for `marker`
    pub fn unregister(&mut self, marker: &str) -> Option<Arc<dyn Backend>> {
        let index = self.entries.iter().position(|(m, _)| m == marker)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, marker: &str) -> Option<&Arc<dyn Backend>> {
        self.entries
            .iter()
            .find(|(m, _)| m == marker)
            .map(|(_, backend)| backend)
    }

    /// Markers in priority order
    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(m, _)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Finds the working copy containing `start` and describes it.
///
/// Directories are visited from `start` up to the filesystem root. At each
/// one, enabled markers are checked in registry order and the first probe
/// returning a state wins. `Ok(None)` means no working copy was found.
#[instrument(skip_all, fields(start = %start.display()))]
pub fn resolve(
    start: &Path,
    options: &ProbeOptions,
    registry: &Registry,
) -> Result<Option<RepositoryState>> {
    let start = absolute(start)?;

    for dir in start.ancestors() {
        for (marker, backend) in &registry.entries {
            if !options.is_enabled(marker) || !dir.join(marker).exists() {
                continue;
            }
            debug!(dir = %dir.display(), marker = %marker, backend = backend.name(), "probing");
            if let Some(state) = backend.probe(dir, marker, options)? {
                info!(
                    backend = backend.name(),
                    tag = %state.tag,
                    distance = state.distance,
                    dirty = state.dirty,
                    "resolved repository state"
                );
                return Ok(Some(state));
            }
        }
    }

    debug!("no repository found");
    Ok(None)
}

/// Whether two paths name the same directory
pub(crate) fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Parses a count printed by `tool`
pub(crate) fn parse_count(tool: &Tool, text: &str) -> Result<u64> {
    text.trim()
        .parse()
        .map_err(|_| ScmverError::unexpected(tool.name, text.trim()))
}

/// Parses `key: value` lines; later keys override earlier ones
pub(crate) fn parse_fields(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Lexically absolute form of `path`, with `.` and `..` folded
fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
