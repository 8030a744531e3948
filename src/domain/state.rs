use std::fmt;

/// Tag used when no tag is reachable from the working copy
pub const DEFAULT_TAG: &str = "0.0";

/// Snapshot of a working copy as reported by a backend probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryState {
    pub tag: String,
    /// Commits since `tag` (or since the root when there is no tag)
    pub distance: u64,
    pub revision: Option<String>,
    /// Tracked changes not yet committed
    pub dirty: bool,
    pub branch: Option<String>,
}

impl Default for RepositoryState {
    fn default() -> Self {
        RepositoryState {
            tag: DEFAULT_TAG.to_string(),
            distance: 0,
            revision: None,
            dirty: false,
            branch: None,
        }
    }
}

impl RepositoryState {
    /// State of an empty repository with no commits
    pub fn unborn(dirty: bool, branch: Option<String>) -> Self {
        RepositoryState {
            dirty,
            branch,
            ..Default::default()
        }
    }

    /// Whether a real tag (not the `0.0` placeholder) was found
    pub fn has_tag(&self) -> bool {
        self.tag != DEFAULT_TAG
    }
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        if self.distance > 0 {
            write!(f, "+{}", self.distance)?;
        }
        if let Some(rev) = &self.revision {
            write!(f, " ({})", rev)?;
        }
        if self.dirty {
            write!(f, " dirty")?;
        }
        Ok(())
    }
}
