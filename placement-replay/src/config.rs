//! Engine configuration loading.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, command-line
//! flags and their environment variables.

use std::path::Path;

use placement_core::EngineConfig;

use crate::{ReplayError, ReplayResult};

/// Per-field overrides taken from the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOverrides {
    /// Overrides `max_objects`.
    pub max_objects: Option<usize>,
    /// Overrides `min_scale`.
    pub min_scale: Option<f32>,
    /// Overrides `max_scale`.
    pub max_scale: Option<f32>,
    /// Overrides `pan_sensitivity`.
    pub pan_sensitivity: Option<f32>,
    /// Overrides `vertical_normal_threshold`.
    pub vertical_normal_threshold: Option<f32>,
}

impl EngineOverrides {
    /// Apply every present override on top of `config`.
    #[must_use]
    pub fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(max_objects) = self.max_objects {
            config.max_objects = max_objects;
        }
        if let Some(min_scale) = self.min_scale {
            config.min_scale = min_scale;
        }
        if let Some(max_scale) = self.max_scale {
            config.max_scale = max_scale;
        }
        if let Some(sensitivity) = self.pan_sensitivity {
            config.pan_sensitivity = sensitivity;
        }
        if let Some(threshold) = self.vertical_normal_threshold {
            config.vertical_normal_threshold = threshold;
        }
        config
    }
}

/// Parse an engine configuration from TOML text. Missing fields keep their
/// defaults.
///
/// # Errors
///
/// Returns [`ReplayError::Config`] if the text is not valid TOML for
/// [`EngineConfig`].
pub fn parse_engine_config(text: &str) -> ReplayResult<EngineConfig> {
    Ok(toml::from_str(text)?)
}

/// Build the engine configuration for a replay.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the merged
/// configuration fails validation.
pub fn load_engine_config(
    path: Option<&Path>,
    overrides: &EngineOverrides,
) -> ReplayResult<EngineConfig> {
    let base = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::debug!("Loaded engine config from {}", path.display());
            parse_engine_config(&text)?
        }
        None => EngineConfig::default(),
    };

    let config = overrides.apply(base);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = parse_engine_config("max_objects = 4\nmax_scale = 2.5\n").expect("parses");
        assert_eq!(config.max_objects, 4);
        assert!((config.max_scale - 2.5).abs() < f32::EPSILON);
        assert!((config.min_scale - EngineConfig::default().min_scale).abs() < f32::EPSILON);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = parse_engine_config("max_objects = \"many\"");
        assert!(matches!(result, Err(ReplayError::Config(_))));
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let overrides = EngineOverrides {
            max_objects: Some(3),
            pan_sensitivity: Some(0.02),
            ..EngineOverrides::default()
        };
        let config = overrides.apply(EngineConfig::default().with_max_objects(7));
        assert_eq!(config.max_objects, 3);
        assert!((config.pan_sensitivity - 0.02).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_merge_is_rejected() {
        let overrides = EngineOverrides {
            max_objects: Some(0),
            ..EngineOverrides::default()
        };
        let result = load_engine_config(None, &overrides);
        assert!(matches!(result, Err(ReplayError::Placement(_))));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let result = load_engine_config(
            Some(Path::new("/nonexistent/placement.toml")),
            &EngineOverrides::default(),
        );
        match result {
            Err(ReplayError::Io { path, .. }) => {
                assert!(path.ends_with("placement.toml"));
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
