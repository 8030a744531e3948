pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod integration;
pub mod scm;
pub mod template;
pub mod ui;
pub mod version_file;

pub use domain::{next_version, LocalVersion, RepositoryState, Version};
pub use error::{Result, ScmverError};
pub use integration::{get_version, Fallback, VersionRequest};
pub use scm::{resolve, Backend, ProbeOptions, Registry};
