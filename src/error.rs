use thiserror::Error;

/// Unified error type for scmver operations
#[derive(Error, Debug)]
pub enum ScmverError {
    #[error("invalid version: {0}")]
    Parse(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("command not found: {0}")]
    ToolNotFound(String),

    #[error("{tool} exited with status {code}: {stderr}")]
    Tool {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("unexpected output from {tool}: {output}")]
    UnexpectedOutput { tool: String, output: String },

    #[error("no such tag: {0}")]
    TagNotFound(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in scmver
pub type Result<T> = std::result::Result<T, ScmverError>;

impl ScmverError {
    /// Create a parse error for the offending version text
    pub fn parse(text: impl Into<String>) -> Self {
        ScmverError::Parse(text.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ScmverError::Version(msg.into())
    }

    /// Create a template error with context
    pub fn template(msg: impl Into<String>) -> Self {
        ScmverError::Template(msg.into())
    }

    /// Create a tool invocation error
    pub fn tool(tool: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        ScmverError::Tool {
            tool: tool.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Create an error for tool output that cannot be interpreted
    pub fn unexpected(tool: impl Into<String>, output: impl Into<String>) -> Self {
        ScmverError::UnexpectedOutput {
            tool: tool.into(),
            output: output.into(),
        }
    }

    /// Whether the error stems from bad user input rather than the environment.
    ///
    /// The CLI maps these to exit status 2.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ScmverError::Parse(_)
                | ScmverError::Version(_)
                | ScmverError::Pattern(_)
                | ScmverError::Template(_)
        )
    }
}
