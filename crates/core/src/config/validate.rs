use super::{types::Config, ConfigError};

/// Longest accepted workspace age before sweeping (ten years).
pub const MAX_SWEEP_AGE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Admission capacity and timeouts are positive
/// - Typesetting runs two or three passes
/// - The worst-case pipeline duration is representable
/// - Workspaces outlive the slowest possible pipeline before being swept
/// - The sweep age stays within `MAX_SWEEP_AGE_SECS`
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let generation = &config.generation;
    if generation.admission_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "generation.admission_capacity must be at least 1".to_string(),
        ));
    }
    if !(2..=3).contains(&generation.typeset_passes) {
        return Err(ConfigError::ValidationError(format!(
            "generation.typeset_passes must be 2 or 3, got {}",
            generation.typeset_passes
        )));
    }
    if generation.timeout_secs == 0 || generation.tool_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "generation timeouts must be at least 1 second".to_string(),
        ));
    }

    if config.media.max_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "media.max_bytes must be at least 1".to_string(),
        ));
    }

    let worst_case = generation.worst_case_secs().ok_or_else(|| {
        ConfigError::ValidationError(
            "generation timeouts are too large: the longest pipeline run overflows".to_string(),
        )
    })?;

    if config.cleanup.enabled {
        if config.cleanup.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cleanup.interval_secs must be at least 1".to_string(),
            ));
        }
        if config.cleanup.max_age_secs > MAX_SWEEP_AGE_SECS {
            return Err(ConfigError::ValidationError(format!(
                "cleanup.max_age_secs ({}) must not exceed {}; disable cleanup to keep workspaces forever",
                config.cleanup.max_age_secs, MAX_SWEEP_AGE_SECS
            )));
        }
        if config.cleanup.max_age_secs <= worst_case {
            return Err(ConfigError::ValidationError(format!(
                "cleanup.max_age_secs ({}) must exceed the longest pipeline run ({}s)",
                config.cleanup.max_age_secs, worst_case
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CleanupConfig, GenerationConfig, ServerConfig};

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_capacity_fails() {
        let config = Config {
            generation: GenerationConfig {
                admission_capacity: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_pass_count_range() {
        for (passes, ok) in [(1, false), (2, true), (3, true), (4, false)] {
            let config = Config {
                generation: GenerationConfig {
                    typeset_passes: passes,
                    ..Default::default()
                },
                ..Default::default()
            };
            assert_eq!(validate_config(&config).is_ok(), ok, "passes = {}", passes);
        }
    }

    #[test]
    fn test_validate_sweep_age_must_exceed_pipeline() {
        let config = Config {
            generation: GenerationConfig {
                timeout_secs: 60,
                typeset_passes: 2,
                tool_timeout_secs: 60,
                ..Default::default()
            },
            cleanup: CleanupConfig {
                enabled: true,
                interval_secs: 10,
                max_age_secs: 300,
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_age_secs"));
    }

    #[test]
    fn test_validate_sweep_age_ignored_when_disabled() {
        let config = Config {
            cleanup: CleanupConfig {
                enabled: false,
                interval_secs: 0,
                max_age_secs: 1,
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_sweep_age_upper_bound() {
        for max_age_secs in [u64::MAX, 100_000_000_000_000_000, MAX_SWEEP_AGE_SECS + 1] {
            let config = Config {
                cleanup: CleanupConfig {
                    max_age_secs,
                    ..Default::default()
                },
                ..Default::default()
            };
            let err = validate_config(&config).unwrap_err();
            assert!(err.to_string().contains("max_age_secs"), "{}", max_age_secs);
        }

        let config = Config {
            cleanup: CleanupConfig {
                max_age_secs: MAX_SWEEP_AGE_SECS,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_overflowing_timeouts_fail() {
        let config = Config {
            generation: GenerationConfig {
                timeout_secs: u64::MAX / 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("overflows"));

        let config = Config {
            generation: GenerationConfig {
                tool_timeout_secs: u64::MAX / 2,
                ..Default::default()
            },
            cleanup: CleanupConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
