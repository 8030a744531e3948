//! Subversion working copies.
//!
//! Tags and branches are found through the repository layout, by default
//! `/trunk`, `/branches/<name>` and `/tags/<name>`. The layout can be
//! changed with the `subversion.trunk`, `subversion.branches` and
//! `subversion.tags` options. `subversion.tag` is a regex filter.

use crate::domain::RepositoryState;
use crate::error::Result;
use crate::scm::runner::{Runner, Tool, ToolVersion};
use crate::scm::{parse_count, parse_fields, same_dir, Backend, ProbeOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const MARKER: &str = ".svn";

pub const TAG_OPTION: &str = "subversion.tag";
pub const TRUNK_OPTION: &str = "subversion.trunk";
pub const BRANCHES_OPTION: &str = "subversion.branches";
pub const TAGS_OPTION: &str = "subversion.tags";

pub const TOOL: Tool = Tool {
    name: "subversion",
    commands: &["svn"],
    prefix: &["--non-interactive"],
    passthrough: &[],
    env: &[],
};

/// `wc-status` item/props values counted as local modifications
const MODIFIED: &[&str] = &[
    "added",
    "conflicted",
    "deleted",
    "incomplete",
    "missing",
    "modified",
    "obstructed",
    "replaced",
];

/// Log entries fetched per `svn log` call while looking for a tag
const LOG_BATCH: &str = "10";

static WC_STATUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<wc-status\b([^>]*)>").unwrap());
static LOGENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<logentry\b[^>]*?\brevision="([0-9]+)"[^>]*>(.*?)</logentry>"#).unwrap()
});
static PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<path\b([^>]*)>([^<]*)</path>").unwrap());
static ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\b([a-z-]+)="([^"]*)""#).unwrap());
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A(?P<release>[0-9]+(?:\.[0-9]+)+)").unwrap());

fn attributes(text: &str) -> BTreeMap<&str, &str> {
    ATTR_RE
        .captures_iter(text)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect()
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Whether `svn status --xml` reports any change to versioned content
pub fn is_modified(status_xml: &str) -> bool {
    WC_STATUS_RE.captures_iter(status_xml).any(|caps| {
        let attrs = attributes(caps.get(1).map_or("", |m| m.as_str()));
        ["item", "props"]
            .iter()
            .filter_map(|key| attrs.get(key))
            .any(|value| MODIFIED.contains(value))
    })
}

/// A `<logentry>` of `svn log --xml -v`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub revision: u64,
    /// Changed directories
    pub dirs: Vec<String>,
}

/// Parses the entries of `svn log --xml`, newest first as printed
pub fn parse_log(xml: &str) -> Vec<LogEntry> {
    LOGENTRY_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let revision = caps[1].parse().ok()?;
            let dirs = PATH_RE
                .captures_iter(&caps[2])
                .filter(|p| attributes(&p[1]).get("kind") == Some(&"dir"))
                .map(|p| unescape(p[2].trim()))
                .collect();
            Some(LogEntry { revision, dirs })
        })
        .collect()
}

/// Layout path (`tags`, `/my/tags/`) as `/my/tags/`
fn layout_path(value: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in value.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", parts.join("/"))
    }
}

/// Repository layout resolved from options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub trunk: String,
    pub branches: String,
    pub tags: String,
}

impl Layout {
    pub fn from_options(options: &ProbeOptions) -> Self {
        let path = |key: &str, default: &'static str| layout_path(options.get(key).unwrap_or(default));
        Layout {
            trunk: path(TRUNK_OPTION, "trunk"),
            branches: path(BRANCHES_OPTION, "branches"),
            tags: path(TAGS_OPTION, "tags"),
        }
    }

    /// Branch name of `url` below `repository_root`
    pub fn branch_of(&self, repository_root: &str, url: &str) -> Option<String> {
        let trunk = format!("{}{}", repository_root, self.trunk);
        if url == &trunk[..trunk.len() - 1] || url.starts_with(&trunk) {
            return Some("trunk".to_string());
        }
        let branches = format!("{}{}", repository_root, self.branches);
        url.strip_prefix(&branches)
            .and_then(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Backend driving the `svn` command
pub struct SubversionBackend {
    runner: Arc<dyn Runner>,
}

impl SubversionBackend {
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        SubversionBackend { runner }
    }

    fn info(&self, dir: &Path) -> Result<BTreeMap<String, String>> {
        let out = self.runner.run(&TOOL, &["info"], Some(dir))?;
        if out.is_success() {
            Ok(parse_fields(&out.stdout))
        } else {
            Ok(BTreeMap::new())
        }
    }

    /// Whether `root` is the top of a working copy rather than a nested directory
    fn is_wc_root(&self, root: &Path, info: &BTreeMap<String, String>) -> Result<bool> {
        if let Some(wc_root) = info.get("Working Copy Root Path") {
            return Ok(same_dir(Path::new(wc_root), root));
        }
        if info.is_empty() {
            return Ok(false);
        }
        let parent = match root.parent() {
            Some(parent) if parent.join(MARKER).is_dir() => parent,
            _ => return Ok(true),
        };
        let parent_info = self.info(parent)?;
        Ok(parent_info.get("Repository UUID") != info.get("Repository UUID"))
    }

    fn distance_of(&self, root: &Path, info: &BTreeMap<String, String>, rev: u64) -> Result<u64> {
        let current = info.get("Revision").map_or("BASE", String::as_str);
        let range = format!("{}:{}", current, rev);
        let out = self
            .runner
            .output(&TOOL, &["log", "-r", &range, "--xml"], Some(root))?;
        Ok(parse_log(&out)
            .iter()
            .filter(|entry| entry.revision != rev)
            .count() as u64)
    }

    /// Walks the tags directory history from `revision` down to 1
    fn find_tag(
        &self,
        root: &Path,
        url: &str,
        tags: &str,
        revision: u64,
        filter: Option<&Regex>,
    ) -> Result<Option<(String, u64)>> {
        let mut r = revision;
        while r > 0 {
            let range = format!("{}:0", r);
            let out = self.runner.run(
                &TOOL,
                &["log", "-r", &range, "-v", "--xml", "-l", LOG_BATCH, url],
                Some(root),
            )?;
            if !out.is_success() {
                debug!(url, stderr = %out.stderr.trim(), "cannot read tags history");
                return Ok(None);
            }
            for entry in parse_log(&out.stdout) {
                r = entry.revision;
                for dir in &entry.dirs {
                    let Some(rest) = dir.strip_prefix(tags) else {
                        continue;
                    };
                    let tag = rest.split('/').next().unwrap_or_default();
                    if tag.is_empty() {
                        continue;
                    }
                    if filter.map_or(true, |re| re.is_match(tag)) {
                        return Ok(Some((tag.to_string(), r)));
                    }
                }
            }
            r -= 1;
        }
        Ok(None)
    }
}

impl Backend for SubversionBackend {
    fn name(&self) -> &'static str {
        "subversion"
    }

    fn probe(
        &self,
        root: &Path,
        _marker: &str,
        options: &ProbeOptions,
    ) -> Result<Option<RepositoryState>> {
        let info = self.info(root)?;
        if !self.is_wc_root(root, &info)? {
            debug!(root = %root.display(), "not a subversion working copy root");
            return Ok(None);
        }

        let revision = match info.get("Revision") {
            Some(rev) => parse_count(&TOOL, rev)?,
            None => 0,
        };
        let layout = Layout::from_options(options);
        let repository_root = info
            .get("Repository Root")
            .map(String::as_str)
            .unwrap_or_default();
        let branch = info
            .get("URL")
            .and_then(|url| layout.branch_of(repository_root, url));

        let status = self.runner.output(&TOOL, &["status", "--xml"], Some(root))?;
        let dirty = is_modified(&status);

        let filter = options.tag_filter(self.name())?;
        let url = format!("{}{}", repository_root, layout.tags);
        let state = match self.find_tag(root, &url, &layout.tags, revision, filter.as_ref())? {
            Some((tag, tagged_at)) => RepositoryState {
                tag,
                distance: self.distance_of(root, &info, tagged_at)?,
                revision: Some(revision.to_string()),
                dirty,
                branch,
            },
            None => RepositoryState {
                distance: self.distance_of(root, &info, 0)?,
                revision: Some(revision.to_string()),
                dirty,
                branch,
                ..Default::default()
            },
        };
        Ok(Some(state))
    }

    fn tool_version(&self) -> Result<ToolVersion> {
        let out = self
            .runner
            .output(&TOOL, &["--version", "--quiet"], None)?;
        Ok(VERSION_RE
            .captures(out.trim())
            .map(|caps| ToolVersion::from_release(&caps["release"]))
            .unwrap_or_default())
    }
}
