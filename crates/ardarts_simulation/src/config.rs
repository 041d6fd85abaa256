//! Конфигурация игры (TOML, загружается один раз при старте)
//!
//! Все секции опциональны - отсутствующие поля берутся из Default.
//! Detection samples НЕ валидируются здесь (и нигде): только параметры конфига.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::placement::TrackingMode;

/// Ошибки загрузки конфига
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Resource, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub acquisition: AcquisitionConfig,
    pub placement: PlacementConfig,
    pub dart: DartConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Минимальный размер плоскости (x, y) для latch "target found"
    pub plane_max_size: [f32; 2],
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            plane_max_size: [1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Стартовый режим (применяется PlacementCoordinator::start)
    pub mode: TrackingMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DartConfig {
    pub origin: [f32; 3],
    /// Euler углы в градусах
    pub direction: [f32; 3],
    pub force: f32,
    /// Секунды от попадания до self-destroy (0 = не исчезает сам)
    pub despawn_cooldown: f32,
    pub collider_radius: f32,
    pub mass: f32,
    /// Нормаль плоскости мишени (debug projection)
    pub target_facing: [f32; 3],
    /// Offset наконечника в local space (None = origin дротика)
    pub tip_offset: Option<[f32; 3]>,
}

impl Default for DartConfig {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            direction: [0.0, 0.0, 0.0],
            force: 5.0,
            despawn_cooldown: 2.0,
            collider_radius: 0.02,
            mass: 0.05,
            target_facing: [0.0, 0.0, -1.0],
            tip_offset: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub fixed_hz: f64,
    pub seed: u64,
    pub log_level: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_hz: 60.0,
            seed: 42,
            log_level: "info".to_string(),
        }
    }
}

impl GameConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.simulation.fixed_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "simulation.fixed_hz must be > 0, got {}",
                self.simulation.fixed_hz
            )));
        }
        if !(self.dart.despawn_cooldown >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "dart.despawn_cooldown must be >= 0, got {}",
                self.dart.despawn_cooldown
            )));
        }
        if !(self.dart.collider_radius > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "dart.collider_radius must be > 0, got {}",
                self.dart.collider_radius
            )));
        }
        if !(self.dart.mass > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "dart.mass must be > 0, got {}",
                self.dart.mass
            )));
        }
        if crate::logger::LogLevel::parse(&self.simulation.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown simulation.log_level '{}'",
                self.simulation.log_level
            )));
        }
        Ok(())
    }

    pub fn plane_max_size(&self) -> Vec2 {
        Vec2::from_array(self.acquisition.plane_max_size)
    }
}
