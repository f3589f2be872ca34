//! Mock toolchain for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::toolchain::{ToolRun, Toolchain, ToolchainError};

/// The four toolchain operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockStep {
    Typeset,
    DumpMetadata,
    Optimize,
    RestoreMetadata,
}

impl MockStep {
    fn tool(&self) -> &'static str {
        match self {
            Self::Typeset => "pdflatex",
            Self::DumpMetadata | Self::RestoreMetadata => "pdftk",
            Self::Optimize => "gs",
        }
    }
}

/// How a mocked invocation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Non-zero exit status.
    Exit(i32),
    Timeout,
    /// Killed by a signal.
    Interrupted,
    NotFound,
}

impl MockFailure {
    fn into_error(self, tool: &'static str, timeout: Duration) -> ToolchainError {
        match self {
            Self::Exit(code) => ToolchainError::Failed {
                tool,
                code,
                output: format!("{} failed (mock)", tool),
            },
            Self::Timeout => ToolchainError::Timeout {
                tool,
                secs: timeout.as_secs(),
            },
            Self::Interrupted => ToolchainError::Interrupted { tool },
            Self::NotFound => ToolchainError::NotFound {
                tool,
                path: PathBuf::from(tool),
            },
        }
    }
}

/// Decrements the active counter even if the typesetting future is dropped.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the Toolchain trait.
///
/// Provides controllable behavior for testing:
/// - Writes small fake PDFs under the same names the real tools use
/// - Records every invoked step in order
/// - Fails chosen steps, or a chosen typesetting pass
/// - Skips writing a step's output while still reporting success
/// - Delays typesetting and tracks how many passes overlap
///
/// The typeset output embeds the source text, so tests can check what was
/// materialized.
#[derive(Debug, Clone)]
pub struct MockToolchain {
    steps: Arc<RwLock<Vec<MockStep>>>,
    failures: Arc<RwLock<HashMap<MockStep, MockFailure>>>,
    typeset_failures: Arc<RwLock<HashMap<u32, MockFailure>>>,
    missing_output: Arc<RwLock<HashSet<MockStep>>>,
    passes: Arc<RwLock<HashMap<PathBuf, u32>>>,
    typeset_delay: Arc<RwLock<Duration>>,
    validate_error: Arc<RwLock<Option<MockFailure>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolchain {
    /// Create a new mock toolchain where every step succeeds immediately.
    pub fn new() -> Self {
        Self {
            steps: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            typeset_failures: Arc::new(RwLock::new(HashMap::new())),
            missing_output: Arc::new(RwLock::new(HashSet::new())),
            passes: Arc::new(RwLock::new(HashMap::new())),
            typeset_delay: Arc::new(RwLock::new(Duration::ZERO)),
            validate_error: Arc::new(RwLock::new(None)),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Steps invoked so far, in order.
    pub async fn steps(&self) -> Vec<MockStep> {
        self.steps.read().await.clone()
    }

    /// Make every invocation of `step` fail.
    pub async fn set_failure(&self, step: MockStep, failure: MockFailure) {
        self.failures.write().await.insert(step, failure);
    }

    /// Make the given typesetting pass (1-based, per source file) fail.
    pub async fn set_typeset_failure_on_pass(&self, pass: u32, failure: MockFailure) {
        self.typeset_failures.write().await.insert(pass, failure);
    }

    /// Let `step` succeed without writing its output file.
    pub async fn set_missing_output(&self, step: MockStep) {
        self.missing_output.write().await.insert(step);
    }

    /// Make `validate` fail.
    pub async fn set_validate_error(&self, failure: MockFailure) {
        *self.validate_error.write().await = Some(failure);
    }

    /// Time each typesetting pass takes.
    pub async fn set_typeset_delay(&self, delay: Duration) {
        *self.typeset_delay.write().await = delay;
    }

    /// Remove every configured failure.
    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
        self.typeset_failures.write().await.clear();
        self.missing_output.write().await.clear();
    }

    /// Highest number of typesetting passes that ran at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn begin(&self, step: MockStep) -> Option<MockFailure> {
        self.steps.write().await.push(step);
        self.failures.read().await.get(&step).copied()
    }

    async fn writes_output(&self, step: MockStep) -> bool {
        !self.missing_output.read().await.contains(&step)
    }

    fn run(tool: &'static str, args: Vec<String>, elapsed: Duration) -> ToolRun {
        ToolRun {
            tool,
            args,
            output: String::new(),
            elapsed,
        }
    }

    async fn read_input(tool: &'static str, path: &Path) -> Result<Vec<u8>, ToolchainError> {
        tokio::fs::read(path)
            .await
            .map_err(|e| ToolchainError::Failed {
                tool,
                code: 1,
                output: format!("cannot read {}: {}", path.display(), e),
            })
    }

    async fn write_output(
        tool: &'static str,
        path: &Path,
        contents: Vec<u8>,
    ) -> Result<(), ToolchainError> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|source| ToolchainError::Io { tool, source })
    }
}

#[async_trait]
impl Toolchain for MockToolchain {
    fn name(&self) -> &str {
        "mock"
    }

    async fn typeset(&self, source: &Path, timeout: Duration) -> Result<ToolRun, ToolchainError> {
        let step = MockStep::Typeset;
        let failure = self.begin(step).await;
        let pass = {
            let mut passes = self.passes.write().await;
            let count = passes.entry(source.to_path_buf()).or_insert(0);
            *count += 1;
            *count
        };

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(self.active.clone());

        let delay = *self.typeset_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let pass_failure = self.typeset_failures.read().await.get(&pass).copied();
        if let Some(failure) = pass_failure.or(failure) {
            return Err(failure.into_error(step.tool(), timeout));
        }

        if self.writes_output(step).await {
            let text = Self::read_input(step.tool(), source).await?;
            let mut pdf = b"%PDF-1.4\n% mock typeset\n".to_vec();
            pdf.extend_from_slice(&text);
            Self::write_output(step.tool(), &source.with_extension("pdf"), pdf).await?;
        }

        Ok(Self::run(
            step.tool(),
            vec![source.display().to_string()],
            delay,
        ))
    }

    async fn dump_metadata(
        &self,
        workdir: &Path,
        input: &str,
        metadata_file: &str,
        timeout: Duration,
    ) -> Result<ToolRun, ToolchainError> {
        let step = MockStep::DumpMetadata;
        if let Some(failure) = self.begin(step).await {
            return Err(failure.into_error(step.tool(), timeout));
        }
        Self::read_input(step.tool(), &workdir.join(input)).await?;
        if self.writes_output(step).await {
            let metadata = b"InfoBegin\nInfoKey: Producer\nInfoValue: mock\n".to_vec();
            Self::write_output(step.tool(), &workdir.join(metadata_file), metadata).await?;
        }
        Ok(Self::run(
            step.tool(),
            vec![input.to_string(), metadata_file.to_string()],
            Duration::ZERO,
        ))
    }

    async fn optimize(
        &self,
        workdir: &Path,
        input: &str,
        output: &str,
        timeout: Duration,
    ) -> Result<ToolRun, ToolchainError> {
        let step = MockStep::Optimize;
        if let Some(failure) = self.begin(step).await {
            return Err(failure.into_error(step.tool(), timeout));
        }
        let raw = Self::read_input(step.tool(), &workdir.join(input)).await?;
        if self.writes_output(step).await {
            let mut optimized = b"% optimized\n".to_vec();
            optimized.extend_from_slice(&raw);
            Self::write_output(step.tool(), &workdir.join(output), optimized).await?;
        }
        Ok(Self::run(
            step.tool(),
            vec![input.to_string(), output.to_string()],
            Duration::ZERO,
        ))
    }

    async fn restore_metadata(
        &self,
        workdir: &Path,
        input: &str,
        metadata_file: &str,
        output: &str,
        timeout: Duration,
    ) -> Result<ToolRun, ToolchainError> {
        let step = MockStep::RestoreMetadata;
        if let Some(failure) = self.begin(step).await {
            return Err(failure.into_error(step.tool(), timeout));
        }
        let mut patched = Self::read_input(step.tool(), &workdir.join(input)).await?;
        Self::read_input(step.tool(), &workdir.join(metadata_file)).await?;
        if self.writes_output(step).await {
            patched.extend_from_slice(b"\n% metadata restored\n");
            Self::write_output(step.tool(), &workdir.join(output), patched).await?;
        }
        Ok(Self::run(
            step.tool(),
            vec![input.to_string(), metadata_file.to_string(), output.to_string()],
            Duration::ZERO,
        ))
    }

    async fn validate(&self) -> Result<(), ToolchainError> {
        match *self.validate_error.read().await {
            Some(failure) => Err(failure.into_error("pdflatex", Duration::ZERO)),
            None => Ok(()),
        }
    }
}
