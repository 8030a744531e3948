//! Domain logic - version identifiers and repository states, independent of any SCM tool

pub mod next;
pub mod segment;
pub mod state;
pub mod version;

pub use next::{
    next_version, version_pattern, LocalVersion, DEFAULT_LOCAL, DEFAULT_SPEC, DEFAULT_VERSION_PATTERN,
};
pub use segment::{Segment, SegmentNumber};
pub use state::{RepositoryState, DEFAULT_TAG};
pub use version::{BumpSpec, ReleasePart, Version};
