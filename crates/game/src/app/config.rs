use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::{LoopConfig, PursuitConfig, TileSize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const CONFIG_ENV_VAR: &str = "FARMCORE_CONFIG";
pub(crate) const MAX_TICKS_ENV_VAR: &str = "FARMCORE_MAX_TICKS";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {origin}{}: {source}", at_path(.json_path))]
    Parse {
        origin: String,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {path}: {message}")]
    Invalid { path: &'static str, message: String },
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidMaxTicks { var: &'static str, value: String },
}

fn at_path(json_path: &str) -> String {
    if json_path.is_empty() || json_path == "." {
        String::new()
    } else {
        format!(" at {json_path}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    #[serde(rename = "loop")]
    pub(crate) loop_settings: LoopSettings,
    pub(crate) map: MapSettings,
    pub(crate) player: PlayerSettings,
    pub(crate) slime: SlimeSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LoopSettings {
    pub(crate) target_tps: u32,
    pub(crate) max_ticks: Option<u64>,
    pub(crate) realtime: bool,
    pub(crate) metrics_log_interval_ms: u64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            target_tps: 30,
            max_ticks: None,
            realtime: true,
            metrics_log_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MapSettings {
    pub(crate) tile_width: f32,
    pub(crate) tile_height: f32,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            tile_width: 16.0,
            tile_height: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlayerSettings {
    pub(crate) move_speed: f32,
    pub(crate) radius: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            move_speed: 48.0,
            radius: 6.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SlimeSettings {
    pub(crate) move_speed: f32,
    pub(crate) radius: f32,
    pub(crate) pursuit: PursuitConfig,
}

impl Default for SlimeSettings {
    fn default() -> Self {
        Self {
            move_speed: 30.0,
            radius: 5.0,
            pursuit: PursuitConfig::default(),
        }
    }
}

impl GameConfig {
    pub(crate) fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            target_tps: self.loop_settings.target_tps,
            max_ticks: self.loop_settings.max_ticks,
            realtime: self.loop_settings.realtime,
            metrics_log_interval: Duration::from_millis(self.loop_settings.metrics_log_interval_ms),
            ..LoopConfig::default()
        }
    }

    pub(crate) fn tile_size(&self) -> TileSize {
        TileSize {
            width: self.map.tile_width,
            height: self.map.tile_height,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_settings.target_tps == 0 {
            return Err(ConfigError::Invalid {
                path: "loop.target_tps",
                message: "must be at least 1".to_string(),
            });
        }
        let positive = |value: f32| value.is_finite() && value > 0.0;
        if !positive(self.map.tile_width) || !positive(self.map.tile_height) {
            return Err(ConfigError::Invalid {
                path: "map",
                message: format!(
                    "tile size must be finite and positive, got {}x{}",
                    self.map.tile_width, self.map.tile_height
                ),
            });
        }
        if !positive(self.player.radius) {
            return Err(ConfigError::Invalid {
                path: "player.radius",
                message: format!("must be positive, got {}", self.player.radius),
            });
        }
        if !positive(self.slime.radius) {
            return Err(ConfigError::Invalid {
                path: "slime.radius",
                message: format!("must be positive, got {}", self.slime.radius),
            });
        }
        validate_pursuit(&self.slime.pursuit)
    }
}

fn validate_pursuit(pursuit: &PursuitConfig) -> Result<(), ConfigError> {
    let non_negative = [
        ("slime.pursuit.vision_radius", pursuit.vision_radius),
        ("slime.pursuit.attack_range", pursuit.attack_range),
        (
            "slime.pursuit.attack_cooldown_seconds",
            pursuit.attack_cooldown_seconds,
        ),
        ("slime.pursuit.forget_after_seconds", pursuit.forget_after_seconds),
        (
            "slime.pursuit.recalculate_interval_seconds",
            pursuit.recalculate_interval_seconds,
        ),
        ("slime.pursuit.arrival_threshold", pursuit.arrival_threshold),
        ("slime.pursuit.corner_smoothing", pursuit.corner_smoothing),
    ];
    for (path, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Invalid {
                path,
                message: format!("must be finite and non-negative, got {value}"),
            });
        }
    }
    let min_smoothing = pursuit.min_smoothing_distance;
    if !min_smoothing.is_finite() || min_smoothing <= 0.0 {
        return Err(ConfigError::Invalid {
            path: "slime.pursuit.min_smoothing_distance",
            message: format!("must be positive, got {min_smoothing}"),
        });
    }
    Ok(())
}

pub(crate) fn parse_config_json(raw: &str, origin: &str) -> Result<GameConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config = serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer).map_err(
        |error| {
            let json_path = error.path().to_string();
            ConfigError::Parse {
                origin: origin.to_string(),
                json_path,
                source: error.into_inner(),
            }
        },
    )?;
    config.validate()?;
    Ok(config)
}

pub(crate) fn load_config_file(path: &Path) -> Result<GameConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_json(&raw, &path.display().to_string())
}

/// Defaults unless `FARMCORE_CONFIG` names a file. `FARMCORE_MAX_TICKS`
/// overrides the loop's tick limit either way.
pub(crate) fn resolve_config() -> Result<GameConfig, ConfigError> {
    let mut config = match read_env(CONFIG_ENV_VAR)? {
        Some(path) => load_config_file(Path::new(&path))?,
        None => GameConfig::default(),
    };
    if let Some(raw) = read_env(MAX_TICKS_ENV_VAR)? {
        config.loop_settings.max_ticks = Some(parse_max_ticks(&raw)?);
    }
    Ok(config)
}

fn read_env(var: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(ConfigError::EnvVar { var, source }),
    }
}

fn parse_max_ticks(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidMaxTicks {
            var: MAX_TICKS_ENV_VAR,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = parse_config_json("{}", "inline").expect("config");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn nested_fields_override_defaults() {
        let raw = r#"{
            "loop": { "max_ticks": 90, "realtime": false },
            "slime": { "pursuit": { "vision_radius": 48.0 } }
        }"#;
        let config = parse_config_json(raw, "inline").expect("config");

        assert_eq!(config.loop_settings.max_ticks, Some(90));
        assert!(!config.loop_settings.realtime);
        assert_eq!(config.loop_settings.target_tps, 30);
        assert_eq!(config.slime.pursuit.vision_radius, 48.0);
        assert_eq!(
            config.slime.pursuit.attack_range,
            PursuitConfig::default().attack_range
        );
    }

    #[test]
    fn type_errors_report_json_path() {
        let raw = r#"{ "player": { "move_speed": "fast" } }"#;
        let err = parse_config_json(raw, "inline").expect_err("should fail");

        match &err {
            ConfigError::Parse { json_path, .. } => assert_eq!(json_path, "player.move_speed"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("at player.move_speed"), "{err}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = r#"{ "map": { "tile_width": 16.0, "tile_depth": 3.0 } }"#;
        let err = parse_config_json(raw, "inline").expect_err("should fail");
        assert!(err.to_string().contains("tile_depth"), "{err}");
    }

    #[test]
    fn zero_tick_rate_fails_validation() {
        let raw = r#"{ "loop": { "target_tps": 0 } }"#;
        let err = parse_config_json(raw, "inline").expect_err("should fail");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                path: "loop.target_tps",
                ..
            }
        ));
    }

    #[test]
    fn misspelled_pursuit_field_is_rejected() {
        let raw = r#"{ "slime": { "pursuit": { "vison_radius": 10.0 } } }"#;
        let err = parse_config_json(raw, "inline").expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("vison_radius"), "{err}");
    }

    #[test]
    fn negative_pursuit_timers_fail_validation() {
        let raw = r#"{ "slime": { "pursuit": { "forget_after_seconds": -5.0 } } }"#;
        let err = parse_config_json(raw, "inline").expect_err("should fail");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                path: "slime.pursuit.forget_after_seconds",
                ..
            }
        ));

        let raw = r#"{ "slime": { "pursuit": { "recalculate_interval_seconds": -1.0 } } }"#;
        let err = parse_config_json(raw, "inline").expect_err("should fail");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                path: "slime.pursuit.recalculate_interval_seconds",
                ..
            }
        ));
    }

    #[test]
    fn min_smoothing_distance_must_be_positive() {
        let raw = r#"{ "slime": { "pursuit": { "min_smoothing_distance": 0.0 } } }"#;
        let err = parse_config_json(raw, "inline").expect_err("should fail");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                path: "slime.pursuit.min_smoothing_distance",
                ..
            }
        ));
    }

    #[test]
    fn config_file_round_trips_through_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "map": {{ "tile_width": 32.0, "tile_height": 32.0 }} }}"#)
            .expect("write config");

        let config = load_config_file(file.path()).expect("config");
        assert_eq!(config.tile_size().width, 32.0);
        assert_eq!(config.loop_config().target_tps, 30);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_config_file(&dir.path().join("absent.json")).expect_err("should fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn max_ticks_override_must_be_numeric() {
        assert_eq!(parse_max_ticks(" 300 ").expect("ticks"), 300);
        assert!(matches!(
            parse_max_ticks("forever"),
            Err(ConfigError::InvalidMaxTicks { .. })
        ));
    }
}
