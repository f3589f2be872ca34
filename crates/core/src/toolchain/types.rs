//! Types for the toolchain module.

use std::time::Duration;

/// A completed, successful tool invocation.
#[derive(Debug, Clone)]
pub struct ToolRun {
    /// Short tool name (`pdflatex`, `pdftk`, `gs`).
    pub tool: &'static str,
    /// Arguments the tool was invoked with.
    pub args: Vec<String>,
    /// Tail of the combined stdout/stderr.
    pub output: String,
    pub elapsed: Duration,
}
