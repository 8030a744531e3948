//! Fossil checkouts.
//!
//! Fossil tags every check-in with its branch name, so only check-ins
//! carrying more than one tag in the timeline are looked at, and the branch
//! tags themselves are never reported as version tags.

use crate::domain::RepositoryState;
use crate::error::Result;
use crate::scm::runner::{Runner, Tool, ToolVersion};
use crate::scm::{Backend, ProbeOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const MARKER: &str = ".fslckout";
pub const LEGACY_MARKER: &str = "_FOSSIL_";

pub const TAG_OPTION: &str = "fossil.tag";

pub const TOOL: Tool = Tool {
    name: "fossil",
    commands: &["fossil"],
    prefix: &[],
    passthrough: &[
        "FOSSIL_HOME",
        "FOSSIL_USER",
        "SQLITE_TMPDIR",
        "USER",
        "LOGNAME",
        "USERNAME",
        "LOCALAPPDATA",
        "APPDATA",
        "HOMEDRIVE",
        "HOMEPATH",
        "TMP",
        "TEMP",
        "USERPROFILE",
    ],
    env: &[],
};

/// Upper bound of timeline entries; `-n 0` is not understood by old releases
const TIMELINE_LIMIT: &str = "32767";

static TIMELINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \A
        \d{2}:\d{2}:\d{2}
        \s+
        \[ (?P<check_in>[0-9a-z]+) \]
        \s+
        .+
        \(
            user: \s+ (?P<user>.+?)
            (?: \s+ tags: \s+ (?P<tags>.+) )?
        \)
        \z",
    )
    .unwrap()
});

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \A
        This \s+ is \s+ fossil \s+ version \s+
        (?: (?P<release>[0-9]+(?:\.[0-9]+)+) \s+ )?
        \[ (?P<check_in>[0-9a-z]{10}) \]
        \s+
        \d{4}-\d{2}-\d{2} \s+ \d{2}:\d{2}:\d{2} \s+ UTC
        \z",
    )
    .unwrap()
});

/// Output of `fossil status`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    /// `key:` lines
    pub info: BTreeMap<String, String>,
    /// Changed files keyed by change kind (`EDITED`, `ADDED`, ...)
    pub changes: BTreeMap<String, Vec<String>>,
}

impl Status {
    pub fn parse(text: &str) -> Self {
        let mut status = Status::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let rest = rest.trim().to_string();
            match head.strip_suffix(':') {
                Some(key) => {
                    status.info.insert(key.to_string(), rest);
                }
                None => status
                    .changes
                    .entry(head.to_string())
                    .or_default()
                    .push(rest),
            }
        }
        status
    }
}

/// A timeline line: check-in hash and its comma-separated tags
fn parse_timeline(line: &str) -> Option<(&str, Option<&str>)> {
    let caps = TIMELINE_RE.captures(line)?;
    let check_in = caps.name("check_in")?.as_str();
    Some((check_in, caps.name("tags").map(|m| m.as_str())))
}

/// Backend driving the `fossil` command
pub struct FossilBackend {
    runner: Arc<dyn Runner>,
}

impl FossilBackend {
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        FossilBackend { runner }
    }

    fn fossil(&self, root: &Path, args: &[&str]) -> Result<String> {
        self.runner.output(&TOOL, args, Some(root))
    }

    /// Current branch, looking at closed branches as well
    fn branch(&self, root: &Path) -> Result<Option<String>> {
        for args in [&["branch", "list"][..], &["branch", "list", "-c"][..]] {
            let out = self.fossil(root, args)?;
            if let Some(name) = out.lines().find_map(|l| l.strip_prefix("* ")) {
                return Ok(Some(name.trim().to_string()));
            }
        }
        Ok(None)
    }
}

impl Backend for FossilBackend {
    fn name(&self) -> &'static str {
        "fossil"
    }

    fn probe(
        &self,
        root: &Path,
        _marker: &str,
        options: &ProbeOptions,
    ) -> Result<Option<RepositoryState>> {
        let out = self.runner.run(&TOOL, &["status"], Some(root))?;
        let status = Status::parse(&out.stdout);
        if !out.is_success() || status.info.is_empty() {
            debug!(root = %root.display(), "not a fossil checkout");
            return Ok(None);
        }

        let revision = status
            .info
            .get("checkout")
            .and_then(|c| c.split_whitespace().next())
            .map(str::to_string);
        let dirty = !status.changes.is_empty();
        let branch = self.branch(root)?;

        let filter = options.tag_filter(self.name())?;
        let timeline = self.fossil(
            root,
            &[
                "timeline", "parents", "current", "-n", TIMELINE_LIMIT, "-t", "ci", "-W", "0",
            ],
        )?;

        let mut distance = 0;
        for line in timeline.lines() {
            let Some((check_in, tags)) = parse_timeline(line) else {
                continue;
            };
            if tags.map_or(0, |t| t.split(',').count()) > 1 {
                let listed = self.fossil(root, &["tag", "list", check_in])?;
                let found = listed.lines().map(str::trim).find(|tag| {
                    !tag.is_empty()
                        && Some(*tag) != branch.as_deref()
                        && !tag.starts_with("branch=")
                        && filter.as_ref().map_or(true, |re| re.is_match(tag))
                });
                if let Some(tag) = found {
                    return Ok(Some(RepositoryState {
                        tag: tag.to_string(),
                        distance,
                        revision,
                        dirty,
                        branch,
                    }));
                }
            }
            distance += 1;
        }

        Ok(Some(RepositoryState {
            distance,
            revision,
            dirty,
            branch,
            ..Default::default()
        }))
    }

    fn tool_version(&self) -> Result<ToolVersion> {
        let out = self.runner.output(&TOOL, &["version"], None)?;
        Ok(VERSION_RE
            .captures(out.trim())
            .and_then(|caps| caps.name("release"))
            .map(|m| ToolVersion::from_release(m.as_str()))
            .unwrap_or_default())
    }
}
