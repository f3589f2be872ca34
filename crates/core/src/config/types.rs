use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Filesystem locations: the workspace root and the external tool binaries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root under which every request workspace is created.
    #[serde(default = "default_temporal")]
    pub temporal: PathBuf,
    /// Typesetting engine binary.
    #[serde(default = "default_pdflatex")]
    pub pdflatex: PathBuf,
    /// Metadata dump/restore tool binary.
    #[serde(default = "default_pdftk")]
    pub pdftk: PathBuf,
    /// Optimizer binary.
    #[serde(default = "default_ghostscript")]
    pub ghostscript: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            temporal: default_temporal(),
            pdflatex: default_pdflatex(),
            pdftk: default_pdftk(),
            ghostscript: default_ghostscript(),
        }
    }
}

fn default_temporal() -> PathBuf {
    std::env::temp_dir().join("pdfsmith")
}

fn default_pdflatex() -> PathBuf {
    PathBuf::from("pdflatex")
}

fn default_pdftk() -> PathBuf {
    PathBuf::from("pdftk")
}

fn default_ghostscript() -> PathBuf {
    PathBuf::from("gs")
}

/// Generation pipeline and admission settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Timeout for a single typesetting pass in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of pipelines running at once.
    #[serde(default = "default_admission_capacity")]
    pub admission_capacity: usize,
    /// Typesetting passes per request (cross references need the previous aux output).
    #[serde(default = "default_typeset_passes")]
    pub typeset_passes: u32,
    /// Whether boundary submissions run the optimize/metadata sub-pipeline.
    #[serde(default = "default_optimize")]
    pub optimize: bool,
    /// Timeout for metadata dump, optimization and metadata restore in seconds.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    /// Report the `patched-` artifact name even when metadata restore failed.
    #[serde(default)]
    pub legacy_restore_naming: bool,
    /// Maximum total uncompressed bytes extracted from one archive.
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            admission_capacity: default_admission_capacity(),
            typeset_passes: default_typeset_passes(),
            optimize: default_optimize(),
            tool_timeout_secs: default_tool_timeout(),
            legacy_restore_naming: false,
            max_archive_bytes: default_max_archive_bytes(),
        }
    }
}

impl GenerationConfig {
    /// Longest a single pipeline run can take before every stage times out.
    ///
    /// `None` when the sum does not fit in a `u64`.
    pub fn worst_case_secs(&self) -> Option<u64> {
        let typesetting = u64::from(self.typeset_passes).checked_mul(self.timeout_secs)?;
        let auxiliary = self.tool_timeout_secs.checked_mul(3)?;
        typesetting.checked_add(auxiliary)
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_admission_capacity() -> usize {
    6
}

fn default_typeset_passes() -> u32 {
    2
}

fn default_optimize() -> bool {
    true
}

fn default_tool_timeout() -> u64 {
    120
}

fn default_max_archive_bytes() -> u64 {
    100 * 1024 * 1024
}

/// Remote media fetching limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// Markers fetched per template; later markers count as failed fetches.
    #[serde(default = "default_max_fetches")]
    pub max_fetches: usize,
    /// Size cap for a single resource in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// HTTP timeout for a single resource in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_fetches: default_max_fetches(),
            max_bytes: default_max_bytes(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_max_fetches() -> usize {
    32
}

fn default_max_bytes() -> u64 {
    25 * 1024 * 1024
}

fn default_fetch_timeout() -> u64 {
    30
}

/// Periodic workspace sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
    /// Workspaces older than this are deleted.
    #[serde(default = "default_cleanup_max_age")]
    pub max_age_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_cleanup_enabled(),
            interval_secs: default_cleanup_interval(),
            max_age_secs: default_cleanup_max_age(),
        }
    }
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_cleanup_interval() -> u64 {
    300
}

fn default_cleanup_max_age() -> u64 {
    3600
}

/// Sanitized config for API responses (tool locations reduced to file names)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub paths: SanitizedPathsConfig,
    pub generation: GenerationConfig,
    pub media: MediaConfig,
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPathsConfig {
    pub temporal_configured: bool,
    pub pdflatex: String,
    pub pdftk: String,
    pub ghostscript: String,
}

fn tool_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            paths: SanitizedPathsConfig {
                temporal_configured: !config.paths.temporal.as_os_str().is_empty(),
                pdflatex: tool_name(&config.paths.pdflatex),
                pdftk: tool_name(&config.paths.pdftk),
                ghostscript: tool_name(&config.paths.ghostscript),
            },
            generation: config.generation.clone(),
            media: config.media.clone(),
            cleanup: config.cleanup.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[paths]
temporal = "/srv/pdfsmith/tmp"
pdflatex = "/opt/texlive/bin/pdflatex"

[generation]
timeout_secs = 30
admission_capacity = 2
typeset_passes = 3
optimize = false

[media]
max_fetches = 4
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.paths.temporal, PathBuf::from("/srv/pdfsmith/tmp"));
        assert_eq!(config.paths.pdftk, PathBuf::from("pdftk"));
        assert_eq!(config.generation.timeout_secs, 30);
        assert_eq!(config.generation.admission_capacity, 2);
        assert_eq!(config.generation.typeset_passes, 3);
        assert!(!config.generation.optimize);
        assert_eq!(config.media.max_fetches, 4);
        assert_eq!(config.media.max_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.paths.ghostscript, PathBuf::from("gs"));
        assert_eq!(config.generation.admission_capacity, 6);
        assert_eq!(config.generation.typeset_passes, 2);
        assert!(config.generation.optimize);
        assert!(!config.generation.legacy_restore_naming);
        assert!(config.cleanup.enabled);
        assert_eq!(config.cleanup.max_age_secs, 3600);
    }

    #[test]
    fn test_worst_case_secs() {
        let generation = GenerationConfig {
            timeout_secs: 60,
            typeset_passes: 2,
            tool_timeout_secs: 10,
            ..Default::default()
        };
        assert_eq!(generation.worst_case_secs(), Some(150));
    }

    #[test]
    fn test_worst_case_secs_overflow() {
        let generation = GenerationConfig {
            timeout_secs: u64::MAX / 2,
            typeset_passes: 2,
            tool_timeout_secs: 10,
            ..Default::default()
        };
        assert_eq!(generation.worst_case_secs(), None);

        let generation = GenerationConfig {
            tool_timeout_secs: u64::MAX / 2,
            ..Default::default()
        };
        assert_eq!(generation.worst_case_secs(), None);
    }

    #[test]
    fn test_sanitized_config_hides_tool_directories() {
        let mut config = Config::default();
        config.paths.pdflatex = PathBuf::from("/opt/texlive/2024/bin/x86_64-linux/pdflatex");

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.paths.pdflatex, "pdflatex");
        assert_eq!(sanitized.paths.ghostscript, "gs");
        assert!(sanitized.paths.temporal_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("/opt/texlive"));
    }
}
