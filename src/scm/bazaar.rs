//! Bazaar and Breezy branches.
//!
//! `brz` is preferred over `bzr` when both are installed.

use crate::domain::RepositoryState;
use crate::error::Result;
use crate::scm::runner::{Runner, Tool, ToolVersion};
use crate::scm::{parse_count, parse_fields, Backend, ProbeOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const MARKER: &str = ".bzr";

pub const TAG_OPTION: &str = "bazaar.tag";

pub const TOOL: Tool = Tool {
    name: "bazaar",
    commands: &["brz", "bzr"],
    prefix: &[],
    passthrough: &["BRZ_HOME", "BZR_HOME"],
    env: &[],
};

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((?:bzr|brz)\) (?P<release>[0-9]+(?:\.[0-9]+)+(?:(?:a|b|rc|dev)[0-9]*)?)")
        .unwrap()
});

/// Tags on mainline revisions, newest revision first.
///
/// Tags on merged (dotted) or missing (`?`) revisions are skipped. Tags
/// sharing a revision keep the order `tags` printed them in.
pub fn parse_tags(text: &str) -> Vec<(String, u64)> {
    let mut tags: Vec<(String, u64)> = text
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let revno = fields.last()?.parse().ok()?;
            Some((name.to_string(), revno))
        })
        .collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1));
    tags
}

/// Backend driving the `brz` or `bzr` command
pub struct BazaarBackend {
    runner: Arc<dyn Runner>,
}

impl BazaarBackend {
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        BazaarBackend { runner }
    }

    fn bzr(&self, root: &Path, args: &[&str]) -> Result<String> {
        self.runner.output(&TOOL, args, Some(root))
    }

    /// Revisions after `revno`, or all revisions when `revno` is `None`
    fn distance_of(&self, root: &Path, revno: Option<u64>) -> Result<u64> {
        let (range, offset) = match revno {
            Some(revno) => (format!("{}..", revno), 1),
            None => ("1..".to_string(), 0),
        };
        let out = self.bzr(root, &["log", "-r", &range, "-n", "0", "--line"])?;
        Ok((out.lines().count() as u64).saturating_sub(offset))
    }
}

impl Backend for BazaarBackend {
    fn name(&self) -> &'static str {
        "bazaar"
    }

    fn probe(
        &self,
        root: &Path,
        _marker: &str,
        options: &ProbeOptions,
    ) -> Result<Option<RepositoryState>> {
        let out = self
            .runner
            .run(&TOOL, &["version-info", "--check-clean"], Some(root))?;
        let info = parse_fields(&out.stdout);
        if !out.is_success() || info.is_empty() {
            debug!(root = %root.display(), "not a bazaar branch");
            return Ok(None);
        }

        let dirty = info.get("clean").map(String::as_str) == Some("False");
        let branch = info.get("branch-nick").cloned();
        let revno = match info.get("revno") {
            Some(revno) => parse_count(&TOOL, revno)?,
            None => 0,
        };
        if revno == 0 {
            return Ok(Some(RepositoryState::unborn(dirty, branch)));
        }

        let filter = options.tag_filter(self.name())?;
        let tag = parse_tags(&self.bzr(root, &["tags"])?)
            .into_iter()
            .filter(|(_, tagged)| *tagged <= revno)
            .find(|(name, _)| filter.as_ref().map_or(true, |re| re.is_match(name)));

        let state = match tag {
            Some((tag, tagged)) => RepositoryState {
                tag,
                distance: self.distance_of(root, Some(tagged))?,
                revision: Some(revno.to_string()),
                dirty,
                branch,
            },
            None => RepositoryState {
                distance: self.distance_of(root, None)?,
                revision: Some(revno.to_string()),
                dirty,
                branch,
                ..Default::default()
            },
        };
        Ok(Some(state))
    }

    fn tool_version(&self) -> Result<ToolVersion> {
        let out = self.runner.output(&TOOL, &["--version"], None)?;
        Ok(VERSION_RE
            .captures(&out)
            .map(|caps| ToolVersion::from_release(&caps["release"]))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scm::mock::MockRunner;

    fn version_info(revno: u64, clean: bool) -> String {
        format!(
            "revision-id: user@example.com-20190210-abc\ndate: 2019-02-10 12:00:00 +0000\nbuild-date: 2019-02-10 12:00:00 +0000\nrevno: {}\nbranch-nick: trunk\nclean: {}\n",
            revno,
            if clean { "True" } else { "False" }
        )
    }

    fn lines(n: usize) -> String {
        (0..n).map(|i| format!("{}: user 2019-02-10 commit\n", i)).collect()
    }

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags("v0.9     2\nv1.0     4\nmerged   3.1.1\nghost    ?\nspam     4\n");
        assert_eq!(
            tags,
            vec![
                ("v1.0".to_string(), 4),
                ("spam".to_string(), 4),
                ("v0.9".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_probe_tagged() {
        let runner = MockRunner::new()
            .on(&["version-info", "--check-clean"], &version_info(5, true))
            .on(&["tags"], "v0.9     2\nv1.0     4\nv2.0     6\n")
            .on(&["log", "-r", "4..", "-n", "0", "--line"], &lines(2));
        let bzr = BazaarBackend::new(Arc::new(runner));

        let state = bzr
            .probe(Path::new("."), MARKER, &ProbeOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(state.tag, "v1.0");
        assert_eq!(state.distance, 1);
        assert_eq!(state.revision.as_deref(), Some("5"));
        assert!(!state.dirty);
        assert_eq!(state.branch.as_deref(), Some("trunk"));
    }

    #[test]
    fn test_probe_at_tag() {
        let runner = MockRunner::new()
            .on(&["version-info", "--check-clean"], &version_info(4, false))
            .on(&["tags"], "v1.0     4\n")
            .on(&["log", "-r", "4..", "-n", "0", "--line"], &lines(1));
        let bzr = BazaarBackend::new(Arc::new(runner));

        let state = bzr
            .probe(Path::new("."), MARKER, &ProbeOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(state.distance, 0);
        assert!(state.dirty);
    }

    #[test]
    fn test_probe_filter_miss_falls_back() {
        let runner = MockRunner::new()
            .on(&["version-info", "--check-clean"], &version_info(3, true))
            .on(&["tags"], "v1.0     2\n")
            .on(&["log", "-r", "1..", "-n", "0", "--line"], &lines(3));
        let bzr = BazaarBackend::new(Arc::new(runner));

        let options = ProbeOptions::new().with(TAG_OPTION, "spam");
        let state = bzr.probe(Path::new("."), MARKER, &options).unwrap().unwrap();
        assert_eq!(state.tag, "0.0");
        assert_eq!(state.distance, 3);
    }

    #[test]
    fn test_probe_empty_branch() {
        let runner =
            MockRunner::new().on(&["version-info", "--check-clean"], &version_info(0, true));
        let bzr = BazaarBackend::new(Arc::new(runner));

        let state = bzr
            .probe(Path::new("."), MARKER, &ProbeOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(state, RepositoryState::unborn(false, Some("trunk".to_string())));
    }

    #[test]
    fn test_probe_not_a_branch() {
        let runner = MockRunner::new().on_failure(
            &["version-info", "--check-clean"],
            3,
            "brz: ERROR: Not a branch",
        );
        let bzr = BazaarBackend::new(Arc::new(runner));
        assert!(bzr
            .probe(Path::new("."), MARKER, &ProbeOptions::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_tool_version() {
        let runner = MockRunner::new().on(&["--version"], "Breezy (brz) 3.2.2\n  Python interpreter: /usr/bin/python3\n");
        let bzr = BazaarBackend::new(Arc::new(runner));
        assert_eq!(bzr.tool_version().unwrap(), ToolVersion::from_release("3.2.2"));
    }
}
