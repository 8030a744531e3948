use crate::error::{Result, ScmverError};
use crate::scm::runner::{Runner, Tool, ToolOutput};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Mock runner for testing backends without the actual tools installed
///
/// Output is scripted per argument list. Invocations that were not scripted
/// fail with a tool error so a test notices unexpected commands.
#[derive(Default)]
pub struct MockRunner {
    outputs: HashMap<Vec<String>, ToolOutput>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockRunner {
    /// Create a new runner with nothing scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful invocation
    pub fn on(self, args: &[&str], stdout: &str) -> Self {
        self.respond(args, ToolOutput::success(stdout))
    }

    /// Script a failing invocation
    pub fn on_failure(self, args: &[&str], code: i32, stderr: &str) -> Self {
        self.respond(args, ToolOutput::failure(code, stderr))
    }

    /// Script an arbitrary output
    pub fn respond(mut self, args: &[&str], output: ToolOutput) -> Self {
        self.outputs.insert(key(args), output);
        self
    }

    /// Argument lists received so far, in order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Whether an invocation starting with `args` was received
    pub fn was_called(&self, args: &[&str]) -> bool {
        self.calls()
            .iter()
            .any(|call| call.len() >= args.len() && call.iter().zip(args).all(|(a, b)| a == b))
    }
}

impl Runner for MockRunner {
    fn run(&self, tool: &Tool, args: &[&str], _cwd: Option<&Path>) -> Result<ToolOutput> {
        let args = key(args);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(args.clone());
        }
        self.outputs.get(&args).cloned().ok_or_else(|| {
            ScmverError::tool(
                tool.name,
                127,
                format!("unexpected invocation: {}", args.join(" ")),
            )
        })
    }
}

fn key(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}
