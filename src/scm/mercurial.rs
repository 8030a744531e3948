//! Mercurial working copies and `hg archive` exports.
//!
//! The `mercurial.tag` filter is a regular expression. In a working copy it
//! is evaluated by Mercurial itself through `latesttag('re:...')`; in an
//! archive it is matched against the `latesttag` entries of
//! `.hg_archival.txt`, and a miss is an error because the history needed to
//! look further back is not available.

use crate::domain::{RepositoryState, DEFAULT_TAG};
use crate::error::{Result, ScmverError};
use crate::scm::runner::{Runner, Tool, ToolVersion};
use crate::scm::{parse_count, Backend, ProbeOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub const MARKER: &str = ".hg";
pub const ARCHIVE_MARKER: &str = ".hg_archival.txt";

/// Option key of the tag regex
pub const TAG_OPTION: &str = "mercurial.tag";

pub const TOOL: Tool = Tool {
    name: "mercurial",
    commands: &["hg"],
    prefix: &[],
    passthrough: &[],
    env: &[("HGRCPATH", "")],
};

const NULL_TAG: &str = "null";

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(version (?P<release>[0-9]+(?:\.[0-9]+)+(?:rc[0-9]*)?)").unwrap()
});

/// Template printing the node, then `tag<TAB>changes<TAB>` per latest tag
pub fn log_template(filter: Option<&str>) -> String {
    let pattern = filter.map(|f| format!("'re:{}'", f)).unwrap_or_default();
    format!(
        "{{node}}\t{{latesttag({}) % '{{tag}}\t{{changes}}\t'}}",
        pattern
    )
}

/// Contents of `.hg_archival.txt`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archival {
    pub node: Option<String>,
    pub branch: Option<String>,
    /// Tags of the archived revision itself
    pub tags: Vec<String>,
    /// Latest tags before the archived revision, in file order
    pub latest_tags: Vec<String>,
    pub latest_tag_distance: Option<String>,
    pub changes_since_latest_tag: Option<String>,
}

impl Archival {
    pub fn parse(text: &str) -> Self {
        let mut archival = Archival::default();
        for (key, value) in text.lines().filter_map(|l| l.split_once(':')) {
            let value = value.trim().to_string();
            match key.trim() {
                "node" => archival.node = Some(value),
                "branch" => archival.branch = Some(value),
                "tag" => archival.tags.push(value),
                "latesttag" => archival.latest_tags.push(value),
                "latesttagdistance" => archival.latest_tag_distance = Some(value),
                "changessincelatesttag" => archival.changes_since_latest_tag = Some(value),
                _ => {}
            }
        }
        archival
    }

    /// Picks the tag and distance, honoring `filter`
    fn latest(&self, filter: Option<&Regex>, pattern: &str) -> Result<(String, u64)> {
        let (candidates, distance) = if self.tags.is_empty() {
            let distance = match self
                .changes_since_latest_tag
                .as_deref()
                .or(self.latest_tag_distance.as_deref())
            {
                Some(text) => parse_count(&TOOL, text)?,
                None => 0,
            };
            (&self.latest_tags, distance)
        } else {
            (&self.tags, 0)
        };

        let tag = match filter {
            Some(re) => candidates
                .iter()
                .find(|tag| tag.as_str() != NULL_TAG && re.is_match(tag))
                .ok_or_else(|| ScmverError::TagNotFound(pattern.to_string()))?
                .clone(),
            None => candidates
                .first()
                .cloned()
                .unwrap_or_else(|| NULL_TAG.to_string()),
        };
        Ok((tag_of(tag), distance))
    }
}

fn tag_of(tag: String) -> String {
    if tag == NULL_TAG {
        DEFAULT_TAG.to_string()
    } else {
        tag
    }
}

/// Backend driving the `hg` command
pub struct MercurialBackend {
    runner: Arc<dyn Runner>,
}

impl MercurialBackend {
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        MercurialBackend { runner }
    }

    fn hg(&self, root: &Path, args: &[&str]) -> Result<String> {
        self.runner.output(&TOOL, args, Some(root))
    }

    fn probe_working_copy(
        &self,
        root: &Path,
        options: &ProbeOptions,
    ) -> Result<Option<RepositoryState>> {
        let id = self.hg(root, &["id", "-ib"])?;
        let (hash, branch) = match id.split_whitespace().collect::<Vec<_>>()[..] {
            [hash, branch] => (hash.to_string(), branch.to_string()),
            _ => {
                debug!(output = %id.trim(), "unrecognized hg id output");
                return Ok(None);
            }
        };
        let dirty = hash.ends_with('+');
        let null = hash.trim_end_matches('+').chars().all(|c| c == '0');
        if null {
            return Ok(Some(RepositoryState::unborn(dirty, Some(branch))));
        }

        let template = log_template(options.get(TAG_OPTION));
        let out = self.hg(root, &["log", "-r", ".", "-T", &template])?;
        let fields: Vec<&str> = out.split('\t').collect();
        match fields[..] {
            [node, tag, changes, ..] => Ok(Some(RepositoryState {
                tag: tag_of(tag.to_string()),
                distance: parse_count(&TOOL, changes)?,
                revision: Some(node.to_string()),
                dirty,
                branch: Some(branch),
            })),
            _ => Err(ScmverError::unexpected(TOOL.name, out.trim())),
        }
    }

    fn probe_archive(
        &self,
        root: &Path,
        options: &ProbeOptions,
    ) -> Result<Option<RepositoryState>> {
        let path = root.join(ARCHIVE_MARKER);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read archive metadata");
                return Ok(None);
            }
        };

        let archival = Archival::parse(&text);
        let filter = options.tag_filter(self.name())?;
        let pattern = options.get(TAG_OPTION).unwrap_or_default();
        let (tag, distance) = archival.latest(filter.as_ref(), pattern)?;
        Ok(Some(RepositoryState {
            tag,
            distance,
            revision: archival.node,
            dirty: false,
            branch: archival.branch,
        }))
    }
}

impl Backend for MercurialBackend {
    fn name(&self) -> &'static str {
        "mercurial"
    }

    fn probe(
        &self,
        root: &Path,
        marker: &str,
        options: &ProbeOptions,
    ) -> Result<Option<RepositoryState>> {
        match marker {
            MARKER => self.probe_working_copy(root, options),
            ARCHIVE_MARKER => self.probe_archive(root, options),
            _ => Ok(None),
        }
    }

    fn tool_version(&self) -> Result<ToolVersion> {
        let out = self.runner.output(&TOOL, &["--version"], None)?;
        Ok(VERSION_RE
            .captures(&out)
            .map(|caps| ToolVersion::from_release(&caps["release"]))
            .unwrap_or_default())
    }
}
