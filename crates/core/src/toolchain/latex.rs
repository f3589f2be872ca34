//! pdflatex / pdftk / ghostscript toolchain.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::ToolchainConfig;
use super::error::ToolchainError;
use super::traits::Toolchain;
use super::types::ToolRun;

/// How much process output is kept for diagnostics.
const OUTPUT_TAIL_BYTES: usize = 4096;

/// Bound for the `--version` checks run by `validate`.
const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Toolchain backed by the TeX Live / pdftk / ghostscript binaries.
pub struct LatexToolchain {
    config: ToolchainConfig,
}

impl LatexToolchain {
    /// Creates a new toolchain with the given configuration.
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    /// Creates a toolchain that resolves every binary from `PATH`.
    pub fn with_defaults() -> Self {
        Self::new(ToolchainConfig::default())
    }

    /// Builds pdflatex arguments: batch mode, explicit output directory, shell escape.
    fn build_typeset_args(&self, source: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            source.to_string_lossy().to_string(),
            "--interaction=nonstopmode".to_string(),
            format!("--output-directory={}", output_dir.to_string_lossy()),
            "--shell-escape".to_string(),
        ]
    }

    /// Builds pdftk arguments for dumping document metadata.
    fn build_dump_args(&self, input: &str, metadata_file: &str) -> Vec<String> {
        vec![
            input.to_string(),
            "dump_data_utf8".to_string(),
            "output".to_string(),
            metadata_file.to_string(),
        ]
    }

    /// Builds ghostscript arguments for a PDF 1.4 rewrite.
    fn build_optimize_args(&self, input: &str, output: &str) -> Vec<String> {
        vec![
            "-sDEVICE=pdfwrite".to_string(),
            "-dProcessDSCComments=false".to_string(),
            "-dCompatibilityLevel=1.4".to_string(),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-dBATCH".to_string(),
            format!("-sOutputFile={}", output),
            input.to_string(),
        ]
    }

    /// Builds pdftk arguments for applying a metadata dump.
    fn build_restore_args(&self, input: &str, metadata_file: &str, output: &str) -> Vec<String> {
        vec![
            input.to_string(),
            "update_info_utf8".to_string(),
            metadata_file.to_string(),
            "output".to_string(),
            output.to_string(),
        ]
    }

    /// Runs a tool to completion inside `workdir`, killing it once `limit` elapses.
    async fn run(
        &self,
        tool: &'static str,
        program: &Path,
        args: Vec<String>,
        workdir: &Path,
        limit: Duration,
    ) -> Result<ToolRun, ToolchainError> {
        debug!("Running {} {:?} in {}", tool, args, workdir.display());
        let start = Instant::now();

        let mut command = Command::new(program);
        command
            .args(&args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The tool leads its own group so its shell-escape subprocesses can be killed with it.
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| spawn_error(tool, program, e))?;
        let group = ProcessGroupGuard::new(child.id());

        // On timeout or cancellation the guard kills the whole group.
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(result) => {
                group.disarm();
                result.map_err(|source| ToolchainError::Io { tool, source })?
            }
            Err(_) => {
                warn!("{} exceeded {:?} in {}, killed", tool, limit, workdir.display());
                return Err(ToolchainError::Timeout {
                    tool,
                    secs: limit.as_secs(),
                });
            }
        };

        let combined = output_tail(&output.stdout, &output.stderr);
        if output.status.success() {
            return Ok(ToolRun {
                tool,
                args,
                output: combined,
                elapsed: start.elapsed(),
            });
        }

        match output.status.code() {
            Some(code) => Err(ToolchainError::Failed {
                tool,
                code,
                output: combined,
            }),
            None => Err(ToolchainError::Interrupted { tool }),
        }
    }

    async fn check_version(
        &self,
        tool: &'static str,
        program: &Path,
        flag: &str,
    ) -> Result<(), ToolchainError> {
        let check = Command::new(program)
            .arg(flag)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match timeout(VALIDATE_TIMEOUT, check).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(spawn_error(tool, program, e)),
            Err(_) => Err(ToolchainError::Timeout {
                tool,
                secs: VALIDATE_TIMEOUT.as_secs(),
            }),
        }
    }
}

/// Kills a tool's process group on drop unless the tool exited on its own.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) takes no pointers; a negative pid signals every process in the group.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!("Process group {} already gone", pgid);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

fn spawn_error(tool: &'static str, program: &Path, e: std::io::Error) -> ToolchainError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ToolchainError::NotFound {
            tool,
            path: program.to_path_buf(),
        }
    } else {
        ToolchainError::Io { tool, source: e }
    }
}

/// Combined stdout/stderr, truncated from the front.
fn output_tail(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(stderr));
    if text.len() <= OUTPUT_TAIL_BYTES {
        return text;
    }
    let mut start = text.len() - OUTPUT_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text.split_off(start)
}

#[async_trait]
impl Toolchain for LatexToolchain {
    fn name(&self) -> &str {
        "latex"
    }

    async fn typeset(&self, source: &Path, limit: Duration) -> Result<ToolRun, ToolchainError> {
        let source: PathBuf = std::path::absolute(source).map_err(|source| ToolchainError::Io {
            tool: "pdflatex",
            source,
        })?;
        let workdir = source.parent().unwrap_or(Path::new("/")).to_path_buf();
        let args = self.build_typeset_args(&source, &workdir);
        self.run("pdflatex", &self.config.pdflatex, args, &workdir, limit)
            .await
    }

    async fn dump_metadata(
        &self,
        workdir: &Path,
        input: &str,
        metadata_file: &str,
        limit: Duration,
    ) -> Result<ToolRun, ToolchainError> {
        let args = self.build_dump_args(input, metadata_file);
        self.run("pdftk", &self.config.pdftk, args, workdir, limit)
            .await
    }

    async fn optimize(
        &self,
        workdir: &Path,
        input: &str,
        output: &str,
        limit: Duration,
    ) -> Result<ToolRun, ToolchainError> {
        let args = self.build_optimize_args(input, output);
        self.run("gs", &self.config.ghostscript, args, workdir, limit)
            .await
    }

    async fn restore_metadata(
        &self,
        workdir: &Path,
        input: &str,
        metadata_file: &str,
        output: &str,
        limit: Duration,
    ) -> Result<ToolRun, ToolchainError> {
        let args = self.build_restore_args(input, metadata_file, output);
        self.run("pdftk", &self.config.pdftk, args, workdir, limit)
            .await
    }

    async fn validate(&self) -> Result<(), ToolchainError> {
        self.check_version("pdflatex", &self.config.pdflatex, "-version")
            .await?;
        self.check_version("pdftk", &self.config.pdftk, "--version")
            .await?;
        self.check_version("gs", &self.config.ghostscript, "--version")
            .await?;
        Ok(())
    }
}
