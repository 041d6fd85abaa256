//! Placement mode coordinator
//!
//! Переключает две взаимоисключающие стратегии поиска мишени:
//! - ImageTracking: image detector ON, plane detector OFF
//! - PlaneTracking: plane detector ON, image detector OFF
//! - Unselected: ничего не трогаем (явный fallthrough, не ошибка)
//!
//! После `found_target == true` plane detector выключается, image detector не трогаем.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cells::ArCells;
use crate::observable::ObservableValue;
use crate::subscription::{Hooks, Lifecycle, SubscriptionScope};

/// Выбранная стратегия размещения мишени
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    ImageTracking,
    #[default]
    PlaneTracking,
    Unselected,
}

/// Переключить detector'ы под режим. `false` если режим не распознан (no-op).
pub fn switch_detectors(
    mode: TrackingMode,
    image_enabled: &ObservableValue<bool>,
    plane_enabled: &ObservableValue<bool>,
) -> bool {
    match mode {
        TrackingMode::ImageTracking => {
            image_enabled.set(true);
            plane_enabled.set(false);
            true
        }
        TrackingMode::PlaneTracking => {
            image_enabled.set(false);
            plane_enabled.set(true);
            true
        }
        TrackingMode::Unselected => false,
    }
}

#[derive(Clone)]
pub struct PlacementCoordinator {
    tracking_mode: ObservableValue<TrackingMode>,
    found_target: ObservableValue<bool>,
    image_enabled: ObservableValue<bool>,
    plane_enabled: ObservableValue<bool>,
}

impl PlacementCoordinator {
    pub fn new(cells: &ArCells) -> Self {
        Self {
            tracking_mode: cells.tracking_mode.clone(),
            found_target: cells.found_target.clone(),
            image_enabled: cells.image_tracking_enabled.clone(),
            plane_enabled: cells.plane_tracking_enabled.clone(),
        }
    }

    /// Применить текущий режим один раз (при старте сцены)
    pub fn start(&self) -> bool {
        switch_detectors(self.tracking_mode.get(), &self.image_enabled, &self.plane_enabled)
    }
}

impl Hooks for PlacementCoordinator {
    fn hook_events(&self, scope: &mut SubscriptionScope) {
        let image = self.image_enabled.clone();
        let plane = self.plane_enabled.clone();
        scope.watch(&self.tracking_mode, move |mode| {
            if switch_detectors(*mode, &image, &plane) {
                crate::log_info(&format!("Tracking mode switched to {:?}", mode));
            } else {
                crate::log(&format!("Tracking mode {:?}: detectors unchanged", mode));
            }
        });

        let plane = self.plane_enabled.clone();
        scope.watch(&self.found_target, move |found| {
            if *found {
                plane.set(false);
                crate::log_info("Target found → plane detection disabled");
            }
        });
    }
}

/// ECS обёртка: coordinator + его подписки
#[derive(Component)]
pub struct PlacementManager {
    coordinator: PlacementCoordinator,
    lifecycle: Lifecycle,
}

impl PlacementManager {
    pub fn new(cells: &ArCells) -> Self {
        let coordinator = PlacementCoordinator::new(cells);
        let mut lifecycle = Lifecycle::default();
        lifecycle.activate(&coordinator);
        Self {
            coordinator,
            lifecycle,
        }
    }

    pub fn coordinator(&self) -> &PlacementCoordinator {
        &self.coordinator
    }

    pub fn activate(&mut self) -> bool {
        self.lifecycle.activate(&self.coordinator)
    }

    pub fn deactivate(&mut self) -> bool {
        self.lifecycle.deactivate()
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }
}

/// Startup system: spawn coordinator + применить стартовый режим
pub fn setup_placement(mut commands: Commands, cells: Res<ArCells>) {
    let manager = PlacementManager::new(&cells);
    manager.coordinator().start();
    commands.spawn(manager);

    crate::log_info(&format!(
        "Placement started: mode={:?} image={} plane={}",
        cells.tracking_mode.get(),
        cells.image_tracking_enabled.get(),
        cells.plane_tracking_enabled.get()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(cells: &ArCells) -> (bool, bool) {
        (
            cells.image_tracking_enabled.get(),
            cells.plane_tracking_enabled.get(),
        )
    }

    #[test]
    fn test_exclusive_activation() {
        let cells = ArCells::default();
        let manager = PlacementManager::new(&cells);
        assert!(manager.is_active());

        cells.tracking_mode.set(TrackingMode::ImageTracking);
        assert_eq!(enabled(&cells), (true, false));

        cells.tracking_mode.set(TrackingMode::PlaneTracking);
        assert_eq!(enabled(&cells), (false, true));
    }

    #[test]
    fn test_unselected_keeps_state() {
        let cells = ArCells::default();
        let _manager = PlacementManager::new(&cells);

        cells.tracking_mode.set(TrackingMode::ImageTracking);
        cells.tracking_mode.set(TrackingMode::Unselected);
        assert_eq!(enabled(&cells), (true, false));

    }

    #[test]
    fn test_unselected_does_not_repair_flags() {
        let cells = ArCells::default();
        let _manager = PlacementManager::new(&cells);
        cells.image_tracking_enabled.set(true);
        cells.plane_tracking_enabled.set(true);

        cells.tracking_mode.set(TrackingMode::Unselected);
        assert_eq!(enabled(&cells), (true, true));
    }

    #[test]
    fn test_start_applies_current_mode() {
        let cells = ArCells::default();
        cells.image_tracking_enabled.set(true);
        cells.plane_tracking_enabled.set(true);

        let manager = PlacementManager::new(&cells);
        assert!(manager.coordinator().start());
        assert_eq!(enabled(&cells), (false, true));
    }

    #[test]
    fn test_found_disables_plane_only() {
        let cells = ArCells::default();
        let _manager = PlacementManager::new(&cells);
        cells.image_tracking_enabled.set(true);

        cells.found_target.set(true);
        assert_eq!(enabled(&cells), (true, false));
    }

    #[test]
    fn test_deactivated_manager_ignores_changes() {
        let cells = ArCells::default();
        let mut manager = PlacementManager::new(&cells);
        assert!(manager.deactivate());

        cells.tracking_mode.set(TrackingMode::ImageTracking);
        assert_eq!(enabled(&cells), (false, true));

        assert!(manager.activate());
        cells.tracking_mode.set(TrackingMode::PlaneTracking);
        cells.tracking_mode.set(TrackingMode::ImageTracking);
        assert_eq!(enabled(&cells), (true, false));
    }
}
