//! Git working copies.
//!
//! The tag filter `git.tag` is a glob handed to `git describe --match`.

use crate::domain::RepositoryState;
use crate::error::{Result, ScmverError};
use crate::scm::runner::{Runner, Tool, ToolVersion};
use crate::scm::{parse_count, same_dir, Backend, ProbeOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const MARKER: &str = ".git";

/// Option key of the `describe --match` glob
pub const TAG_OPTION: &str = "git.tag";

pub const TOOL: Tool = Tool {
    name: "git",
    commands: &["git"],
    prefix: &[],
    passthrough: &[],
    env: &[],
};

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\Agit version (?P<release>[0-9]+(?:\.[0-9]+)+(?:[.-]?rc[0-9]+)?)").unwrap()
});

/// Result of `git describe --long --always`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Describe {
    Tagged {
        tag: String,
        distance: u64,
        revision: String,
        dirty: bool,
    },
    Untagged {
        revision: String,
        dirty: bool,
    },
}

impl Describe {
    /// Parses `TAG-N-gHASH[+]` or a bare `HASH[+]`
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (text, dirty) = match text.strip_suffix('+') {
            Some(rest) => (rest, true),
            None => (text, false),
        };

        let mut parts = text.rsplitn(3, '-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(hash), Some(distance), Some(tag)) => Ok(Describe::Tagged {
                tag: tag.to_string(),
                distance: parse_count(&TOOL, distance)?,
                revision: hash.strip_prefix('g').unwrap_or(hash).to_string(),
                dirty,
            }),
            (Some(hash), None, None) if !hash.is_empty() => Ok(Describe::Untagged {
                revision: hash.to_string(),
                dirty,
            }),
            _ => Err(ScmverError::unexpected(TOOL.name, text)),
        }
    }
}

/// Backend driving the `git` command
pub struct GitBackend {
    runner: Arc<dyn Runner>,
}

impl GitBackend {
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        GitBackend { runner }
    }

    fn git(&self, root: &Path, args: &[&str]) -> Result<String> {
        self.runner.output(&TOOL, args, Some(root))
    }

    fn is_toplevel(&self, root: &Path) -> Result<bool> {
        let out = self
            .runner
            .run(&TOOL, &["rev-parse", "--show-toplevel"], Some(root))?;
        Ok(out.is_success() && same_dir(Path::new(out.stdout.trim()), root))
    }

    /// Current branch; `None` when HEAD is detached
    fn branch(&self, root: &Path) -> Result<Option<String>> {
        let out = self
            .runner
            .run(&TOOL, &["symbolic-ref", "--short", "-q", "HEAD"], Some(root))?;
        let name = out.stdout.trim();
        Ok((out.is_success() && !name.is_empty()).then(|| name.to_string()))
    }

    fn has_commits(&self, root: &Path) -> Result<bool> {
        let out = self
            .runner
            .run(&TOOL, &["rev-parse", "--verify", "-q", "HEAD"], Some(root))?;
        Ok(out.is_success())
    }
}

impl Backend for GitBackend {
    fn name(&self) -> &'static str {
        "git"
    }

    fn probe(
        &self,
        root: &Path,
        _marker: &str,
        options: &ProbeOptions,
    ) -> Result<Option<RepositoryState>> {
        if !self.is_toplevel(root)? {
            debug!(root = %root.display(), "not a git work tree root");
            return Ok(None);
        }

        let branch = self.branch(root)?;
        if !self.has_commits(root)? {
            let status = self.git(root, &["status", "--porcelain", "--untracked-files=no"])?;
            return Ok(Some(RepositoryState::unborn(
                !status.trim().is_empty(),
                branch,
            )));
        }

        let mut args = vec!["describe", "--dirty=+", "--tags", "--long", "--always"];
        if let Some(pattern) = options.get(TAG_OPTION) {
            args.extend(["--match", pattern]);
        }

        let state = match Describe::parse(&self.git(root, &args)?)? {
            Describe::Tagged {
                tag,
                distance,
                revision,
                dirty,
            } => RepositoryState {
                tag,
                distance,
                revision: Some(revision),
                dirty,
                branch,
            },
            Describe::Untagged { revision, dirty } => {
                let commits = self.git(root, &["rev-list", "HEAD", "--"])?;
                RepositoryState {
                    distance: commits.lines().count() as u64,
                    revision: Some(revision),
                    dirty,
                    branch,
                    ..Default::default()
                }
            }
        };
        Ok(Some(state))
    }

    fn tool_version(&self) -> Result<ToolVersion> {
        let out = self.runner.output(&TOOL, &["--version"], None)?;
        Ok(VERSION_RE
            .captures(out.trim())
            .map(|caps| ToolVersion::from_release(&caps["release"].replace('-', ".")))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scm::mock::MockRunner;
    use crate::scm::VersionPart;
    use tempfile::TempDir;

    fn backend(runner: MockRunner) -> (GitBackend, Arc<MockRunner>) {
        let runner = Arc::new(runner);
        (GitBackend::new(runner.clone()), runner)
    }

    fn work_tree(dir: &TempDir, runner: MockRunner) -> MockRunner {
        runner
            .on(
                &["rev-parse", "--show-toplevel"],
                &format!("{}\n", dir.path().display()),
            )
            .on(&["symbolic-ref", "--short", "-q", "HEAD"], "master\n")
    }

    #[test]
    fn test_describe_tagged() {
        assert_eq!(
            Describe::parse("spam-v1.0-3-g4d6b1d1+\n").unwrap(),
            Describe::Tagged {
                tag: "spam-v1.0".to_string(),
                distance: 3,
                revision: "4d6b1d1".to_string(),
                dirty: true,
            }
        );
    }

    #[test]
    fn test_describe_untagged() {
        assert_eq!(
            Describe::parse("4d6b1d1").unwrap(),
            Describe::Untagged {
                revision: "4d6b1d1".to_string(),
                dirty: false,
            }
        );
    }

    #[test]
    fn test_describe_garbage() {
        assert!(Describe::parse("").is_err());
        assert!(Describe::parse("v1.0-x-g4d6b1d1").is_err());
    }

    #[test]
    fn test_probe_tagged() {
        let dir = TempDir::new().unwrap();
        let runner = work_tree(&dir, MockRunner::new())
            .on(&["rev-parse", "--verify", "-q", "HEAD"], "4d6b1d1\n")
            .on(
                &["describe", "--dirty=+", "--tags", "--long", "--always"],
                "v1.0-0-g4d6b1d1\n",
            );
        let (git, _) = backend(runner);

        let state = git
            .probe(dir.path(), MARKER, &ProbeOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(state.tag, "v1.0");
        assert_eq!(state.distance, 0);
        assert_eq!(state.revision.as_deref(), Some("4d6b1d1"));
        assert!(!state.dirty);
        assert_eq!(state.branch.as_deref(), Some("master"));
    }

    #[test]
    fn test_probe_passes_match_glob() {
        let dir = TempDir::new().unwrap();
        let runner = work_tree(&dir, MockRunner::new())
            .on(&["rev-parse", "--verify", "-q", "HEAD"], "4d6b1d1\n")
            .on(
                &[
                    "describe", "--dirty=+", "--tags", "--long", "--always", "--match", "spam-*",
                ],
                "spam-1.0-2-g4d6b1d1\n",
            );
        let (git, _) = backend(runner);

        let options = ProbeOptions::new().with(TAG_OPTION, "spam-*");
        let state = git.probe(dir.path(), MARKER, &options).unwrap().unwrap();
        assert_eq!(state.tag, "spam-1.0");
        assert_eq!(state.distance, 2);
    }

    #[test]
    fn test_probe_untagged_counts_commits() {
        let dir = TempDir::new().unwrap();
        let runner = work_tree(&dir, MockRunner::new())
            .on(&["rev-parse", "--verify", "-q", "HEAD"], "4d6b1d1\n")
            .on(
                &["describe", "--dirty=+", "--tags", "--long", "--always"],
                "4d6b1d1+\n",
            )
            .on(&["rev-list", "HEAD", "--"], "4d6b1d1\n1a2b3c4\n");
        let (git, _) = backend(runner);

        let state = git
            .probe(dir.path(), MARKER, &ProbeOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(state.tag, "0.0");
        assert_eq!(state.distance, 2);
        assert!(state.dirty);
    }

    #[test]
    fn test_probe_unborn() {
        let dir = TempDir::new().unwrap();
        let runner = work_tree(&dir, MockRunner::new())
            .on_failure(&["rev-parse", "--verify", "-q", "HEAD"], 1, "")
            .on(&["status", "--porcelain", "--untracked-files=no"], "A  README\n");
        let (git, runner) = backend(runner);

        let state = git
            .probe(dir.path(), MARKER, &ProbeOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(state, RepositoryState::unborn(true, Some("master".to_string())));
        assert!(!runner.was_called(&["describe"]));
    }

    #[test]
    fn test_probe_detached_head() {
        let dir = TempDir::new().unwrap();
        let runner = MockRunner::new()
            .on(
                &["rev-parse", "--show-toplevel"],
                &format!("{}\n", dir.path().display()),
            )
            .on_failure(&["symbolic-ref", "--short", "-q", "HEAD"], 1, "")
            .on(&["rev-parse", "--verify", "-q", "HEAD"], "4d6b1d1\n")
            .on(
                &["describe", "--dirty=+", "--tags", "--long", "--always"],
                "v1.0-1-g4d6b1d1\n",
            );
        let (git, _) = backend(runner);

        let state = git
            .probe(dir.path(), MARKER, &ProbeOptions::new())
            .unwrap()
            .unwrap();
        assert!(state.branch.is_none());
        assert_eq!(state.distance, 1);
    }

    #[test]
    fn test_probe_not_toplevel() {
        let dir = TempDir::new().unwrap();
        let runner =
            MockRunner::new().on_failure(&["rev-parse", "--show-toplevel"], 128, "fatal");
        let (git, runner) = backend(runner);

        assert!(git
            .probe(dir.path(), MARKER, &ProbeOptions::new())
            .unwrap()
            .is_none());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_tool_version() {
        let (git, _) = backend(MockRunner::new().on(&["--version"], "git version 2.39.2\n"));
        assert_eq!(
            git.tool_version().unwrap(),
            ToolVersion(vec![
                VersionPart::Number(2),
                VersionPart::Number(39),
                VersionPart::Number(2)
            ])
        );

        let (git, _) = backend(MockRunner::new().on(&["--version"], "hub version 2.14\n"));
        assert!(git.tool_version().unwrap().is_unknown());
    }
}
