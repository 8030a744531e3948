//! Darcs repositories.

use crate::domain::RepositoryState;
use crate::error::Result;
use crate::scm::runner::{Runner, Tool, ToolVersion};
use crate::scm::{parse_count, parse_fields, Backend, ProbeOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const MARKER: &str = "_darcs";

pub const TAG_OPTION: &str = "darcs.tag";

pub const TOOL: Tool = Tool {
    name: "darcs",
    commands: &["darcs"],
    prefix: &[],
    passthrough: &["DARCS_TESTING_PREFS_DIR", "DARCS_TMPDIR", "APPDATA", "TMP", "TEMP"],
    env: &[],
};

const NO_CHANGES: &str = "No changes!";

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A(?P<release>[0-9]+(?:\.[0-9]+)+)\s+\(release\)\z").unwrap());

/// Backend driving the `darcs` command
pub struct DarcsBackend {
    runner: Arc<dyn Runner>,
}

impl DarcsBackend {
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        DarcsBackend { runner }
    }

    fn darcs(&self, root: &Path, args: &[&str]) -> Result<String> {
        self.runner.output(&TOOL, args, Some(root))
    }
}

impl Backend for DarcsBackend {
    fn name(&self) -> &'static str {
        "darcs"
    }

    fn probe(
        &self,
        root: &Path,
        _marker: &str,
        options: &ProbeOptions,
    ) -> Result<Option<RepositoryState>> {
        let out = self.runner.run(&TOOL, &["show", "repo"], Some(root))?;
        let info = parse_fields(&out.stdout.replace('\r', ""));
        if !out.is_success() || info.is_empty() {
            debug!(root = %root.display(), "not a darcs repository");
            return Ok(None);
        }

        // whatsnew exits non-zero when there is nothing to report
        let whatsnew = self.runner.run(&TOOL, &["whatsnew"], Some(root))?;
        let dirty = whatsnew.stdout.trim() != NO_CHANGES;
        let branch = info
            .get("Root")
            .and_then(|r| Path::new(r).file_name())
            .map(|name| name.to_string_lossy().into_owned());
        let patches = match info.get("Num Patches") {
            Some(n) => parse_count(&TOOL, n)?,
            None => 0,
        };
        if patches == 0 {
            return Ok(Some(RepositoryState::unborn(dirty, branch)));
        }

        let revision = info.get("Weak Hash").cloned();
        let filter = options.tag_filter(self.name())?;
        let tags = self.darcs(root, &["show", "tags"])?;
        let tag = tags
            .lines()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .find(|tag| filter.as_ref().map_or(true, |re| re.is_match(tag)));

        let state = match tag {
            Some(tag) => {
                let count = self.darcs(root, &["log", "--from-tag", tag, "--count"])?;
                RepositoryState {
                    tag: tag.to_string(),
                    distance: parse_count(&TOOL, &count)?.saturating_sub(1),
                    revision,
                    dirty,
                    branch,
                }
            }
            None => RepositoryState {
                distance: patches,
                revision,
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
            .captures(out.trim())
            .map(|caps| ToolVersion::from_release(&caps["release"]))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scm::mock::MockRunner;

    fn show_repo(patches: u64) -> String {
        format!(
            "          Type: darcs\r\n        Format: hashed, darcs-2\r\n          Root: /home/user/spam\r\n      Pristine: HashedPristine\r\n         Cache: thisrepo:/home/user/spam\r\n   Num Patches: {}\r\n     Weak Hash: 5cb6cf4cd0c5e1ddca0c6a5b0e3d7a3bd1ddd6e3\r\n",
            patches
        )
    }

    #[test]
    fn test_probe_tagged() {
        let runner = MockRunner::new()
            .on(&["show", "repo"], &show_repo(3))
            .respond(
                &["whatsnew"],
                crate::scm::ToolOutput {
                    stdout: "No changes!\n".to_string(),
                    stderr: String::new(),
                    code: Some(1),
                },
            )
            .on(&["show", "tags"], "v1.0\nv0.1\n")
            .on(&["log", "--from-tag", "v1.0", "--count"], "2\n");
        let darcs = DarcsBackend::new(Arc::new(runner));

        let state = darcs
            .probe(Path::new("."), MARKER, &ProbeOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(state.tag, "v1.0");
        assert_eq!(state.distance, 1);
        assert_eq!(
            state.revision.as_deref(),
            Some("5cb6cf4cd0c5e1ddca0c6a5b0e3d7a3bd1ddd6e3")
        );
        assert!(!state.dirty);
        assert_eq!(state.branch.as_deref(), Some("spam"));
    }

    #[test]
    fn test_probe_filter_miss_counts_patches() {
        let runner = MockRunner::new()
            .on(&["show", "repo"], &show_repo(3))
            .on(&["whatsnew"], "M ./README 1\n")
            .on(&["show", "tags"], "v1.0\n");
        let darcs = DarcsBackend::new(Arc::new(runner));

        let options = ProbeOptions::new().with(TAG_OPTION, "spam-");
        let state = darcs.probe(Path::new("."), MARKER, &options).unwrap().unwrap();
        assert_eq!(state.tag, "0.0");
        assert_eq!(state.distance, 3);
        assert!(state.dirty);
    }

    #[test]
    fn test_probe_without_patches() {
        let runner = MockRunner::new()
            .on(&["show", "repo"], &show_repo(0))
            .on(&["whatsnew"], "No changes!\n");
        let darcs = DarcsBackend::new(Arc::new(runner));

        let state = darcs
            .probe(Path::new("."), MARKER, &ProbeOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(state, RepositoryState::unborn(false, Some("spam".to_string())));
    }

    #[test]
    fn test_tool_version() {
        let darcs = DarcsBackend::new(Arc::new(
            MockRunner::new().on(&["--version"], "2.16.4 (release)\n"),
        ));
        assert_eq!(darcs.tool_version().unwrap(), ToolVersion::from_release("2.16.4"));

        let darcs = DarcsBackend::new(Arc::new(
            MockRunner::new().on(&["--version"], "2.17.0 (+ 12 patches)\n"),
        ));
        assert!(darcs.tool_version().unwrap().is_unknown());
    }
}
