//! Shared ячейки сцены (dependency injection вместо глобальных ссылок)
//!
//! Один `ArCells` resource на сессию. Компоненты получают clone нужных handle'ов
//! в конструкторе, статического доступа нет.
//! У каждой ячейки один writer (конвенция, см. комментарии к полям).

use bevy::prelude::*;

use crate::config::GameConfig;
use crate::observable::ObservableValue;
use crate::placement::TrackingMode;

#[derive(Resource, Clone, Debug)]
pub struct ArCells {
    /// Writer: TargetAcquisition (latch false → true)
    pub found_target: ObservableValue<bool>,
    /// Writer: TargetAcquisition (до записи found_target)
    pub center_pos: ObservableValue<Vec3>,
    /// Writer: config / host
    pub plane_max_size: ObservableValue<Vec2>,

    /// Writer: host UI (выбор стратегии)
    pub tracking_mode: ObservableValue<TrackingMode>,
    /// Writer: PlacementCoordinator
    pub image_tracking_enabled: ObservableValue<bool>,
    /// Writer: PlacementCoordinator
    pub plane_tracking_enabled: ObservableValue<bool>,

    /// Writer: launcher (host). Читаются при spawn дротика.
    pub dart_origin: ObservableValue<Vec3>,
    /// Euler градусы
    pub dart_direction: ObservableValue<Vec3>,
    pub dart_force: ObservableValue<f32>,
    pub despawn_cooldown: ObservableValue<f32>,

    /// Writer: publish_target_poses
    pub target_position: ObservableValue<Vec3>,
    /// Writer: publish_target_poses (Euler градусы)
    pub target_rotation: ObservableValue<Vec3>,
    /// Writer: config / host
    pub target_facing: ObservableValue<Vec3>,
}

impl ArCells {
    pub fn from_config(config: &GameConfig) -> Self {
        let mode = config.placement.mode;

        Self {
            found_target: ObservableValue::new(false),
            center_pos: ObservableValue::new(Vec3::ZERO),
            plane_max_size: ObservableValue::new(config.plane_max_size()),
            tracking_mode: ObservableValue::new(mode),
            image_tracking_enabled: ObservableValue::new(mode == TrackingMode::ImageTracking),
            plane_tracking_enabled: ObservableValue::new(mode == TrackingMode::PlaneTracking),
            dart_origin: ObservableValue::new(Vec3::from_array(config.dart.origin)),
            dart_direction: ObservableValue::new(Vec3::from_array(config.dart.direction)),
            dart_force: ObservableValue::new(config.dart.force),
            despawn_cooldown: ObservableValue::new(config.dart.despawn_cooldown),
            target_position: ObservableValue::new(Vec3::ZERO),
            target_rotation: ObservableValue::new(Vec3::ZERO),
            target_facing: ObservableValue::new(Vec3::from_array(config.dart.target_facing)),
        }
    }
}

impl Default for ArCells {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}
