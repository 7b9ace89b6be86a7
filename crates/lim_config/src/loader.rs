//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::LinkerConfig;
use std::path::Path;

/// File name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "lim.toml";

/// Loads `<dir>/lim.toml`, or the defaults when the file does not exist.
pub fn load_config(dir: &Path) -> Result<LinkerConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(LinkerConfig::default());
    }
    load_config_file(&config_path)
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<LinkerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<LinkerConfig, ConfigError> {
    let config: LinkerConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &LinkerConfig) -> Result<(), ConfigError> {
    let check = |ok: bool, key: &'static str, reason: &'static str| {
        if ok {
            Ok(())
        } else {
            Err(ConfigError::Invalid { key, reason })
        }
    };

    check(
        config.treecut.rule_threshold > 0,
        "treecut.rule_threshold",
        "must be at least 1",
    )?;

    let placement = &config.placement;
    check(
        !placement.aspect_ratios.is_empty() && placement.aspect_ratios.iter().all(|r| *r > 0.0),
        "placement.aspect_ratios",
        "needs at least one positive ratio",
    )?;
    check(
        !placement.batch_sizes.is_empty() && !placement.batch_sizes.contains(&0),
        "placement.batch_sizes",
        "needs at least one size and no zeros",
    )?;
    check(
        placement.area_reuse_tolerance >= 0.0,
        "placement.area_reuse_tolerance",
        "must not be negative",
    )?;
    check(
        placement.time_limit_secs > 0,
        "placement.time_limit_secs",
        "must be at least 1",
    )?;
    check(
        placement.buffer_distance > 0.0,
        "placement.buffer_distance",
        "must be positive",
    )?;

    let tour = &config.tour;
    check(
        tour.alpha > 0.0 && tour.alpha < 1.0,
        "tour.alpha",
        "must lie strictly between 0 and 1",
    )?;
    check(
        tour.initial_temperature > 0.0,
        "tour.initial_temperature",
        "must be positive",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, SolverKind};

    #[test]
    fn empty_file_is_default() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, LinkerConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[graph]
allow_unmatched = true
trim_optional = false

[treecut]
rule_threshold = 100
use_placement = false

[placement]
aspect_ratios = [1.0, 4.0]
area_reuse_tolerance = 0.05
batch_sizes = [2, 4]
solver = "cbc"
time_limit_secs = 10

[[placement.rules]]
group = "dram_user"
anchor = "dram"
side = "left"

[tour]
seed = 7
max_evaluations = 1000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(config.graph.allow_unmatched);
        assert!(!config.graph.trim_optional);
        assert_eq!(config.treecut.rule_threshold, 100);
        assert_eq!(config.placement.aspect_ratios, vec![1.0, 4.0]);
        assert_eq!(config.placement.solver, SolverKind::Cbc);
        assert_eq!(config.placement.rules.len(), 1);
        assert_eq!(config.placement.rules[0].side, Side::Left);
        assert_eq!(config.tour.seed, 7);
        // Unspecified keys keep their defaults.
        assert_eq!(config.tour.alpha, 0.99995);
        assert_eq!(config.placement.parent_child_weight, 100.0);
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax(_)));
    }

    #[test]
    fn unknown_key_errors() {
        let err = load_config_from_str("[treecut]\nthreshold = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax(_)));
    }

    #[test]
    fn zero_threshold_rejected() {
        let err = load_config_from_str("[treecut]\nrule_threshold = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "treecut.rule_threshold",
                ..
            }
        ));
    }

    #[test]
    fn alpha_out_of_range_rejected() {
        let err = load_config_from_str("[tour]\nalpha = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "tour.alpha", .. }));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let err = load_config_from_str("[placement]\nbatch_sizes = [1, 0]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn zero_time_limit_rejected() {
        let err = load_config_from_str("[placement]\ntime_limit_secs = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "placement.time_limit_secs",
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config, LinkerConfig::default());
    }

    #[test]
    fn reads_file_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[tour]\nseed = 11\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.tour.seed, 11);
    }

    #[test]
    fn io_error_for_missing_explicit_file() {
        let err = load_config_file(Path::new("/nonexistent/lim.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
