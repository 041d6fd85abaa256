//! Target acquisition - latch "мишень найдена" по размеру плоскости
//!
//! State machine: Searching → Found (terminal).
//! Переход: `size.x >= threshold.x && size.y >= threshold.y`.
//! Порядок записи: сначала `center_pos`, потом `found_target`
//! (подписчики `found_target` уже видят актуальную позицию).
//!
//! Samples не фильтруются: NaN просто даёт `false` в сравнении.
//!
//! ECS:
//! - `SurfaceSample` пишет внешний detection source (раз в тик)
//! - `poll_surface_detectors` (FixedUpdate) вызывает `evaluate`
//! - `despawn_found_detectors` убирает detector'ы в состоянии Found

use std::sync::Arc;

use bevy::prelude::*;
use parking_lot::Mutex;

use crate::cells::ArCells;
use crate::observable::ObservableValue;
use crate::subscription::{Hooks, Lifecycle, SubscriptionScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum AcquisitionState {
    #[default]
    Searching,
    Found,
}

/// Текущий sample от detection source
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Reflect)]
#[reflect(Component)]
pub struct SurfaceSample {
    /// Размер плоскости (2D extent)
    pub size: Vec2,
    /// Центр плоскости в world space
    pub center: Vec3,
}

impl SurfaceSample {
    pub fn new(size: Vec2, center: Vec3) -> Self {
        Self { size, center }
    }
}

pub fn meets_threshold(size: Vec2, threshold: Vec2) -> bool {
    size.x >= threshold.x && size.y >= threshold.y
}

pub struct TargetAcquisition {
    max_size: ObservableValue<Vec2>,
    center_pos: ObservableValue<Vec3>,
    found_target: ObservableValue<bool>,
    state: Arc<Mutex<AcquisitionState>>,
}

impl TargetAcquisition {
    /// Detector, созданный после latch, сразу Found (не перезапишет center_pos)
    pub fn new(cells: &ArCells) -> Self {
        let state = if cells.found_target.get() {
            AcquisitionState::Found
        } else {
            AcquisitionState::Searching
        };

        Self {
            max_size: cells.plane_max_size.clone(),
            center_pos: cells.center_pos.clone(),
            found_target: cells.found_target.clone(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> AcquisitionState {
        *self.state.lock()
    }

    /// Один тик: проверить sample, при необходимости latch'нуть Found
    pub fn evaluate(&self, sample: &SurfaceSample) -> AcquisitionState {
        if self.state() == AcquisitionState::Found {
            return AcquisitionState::Found;
        }

        let threshold = self.max_size.get();
        if !meets_threshold(sample.size, threshold) {
            return AcquisitionState::Searching;
        }

        *self.state.lock() = AcquisitionState::Found;
        self.center_pos.set(sample.center);
        self.found_target.set(true);

        crate::log_info(&format!(
            "🎯 Target surface found: size={:?} threshold={:?} center={:?}",
            sample.size, threshold, sample.center
        ));

        AcquisitionState::Found
    }
}

impl Hooks for TargetAcquisition {
    fn hook_events(&self, scope: &mut SubscriptionScope) {
        // Любой detector (включая соседний) нашёл мишень → этот уходит в Found
        let state = Arc::clone(&self.state);
        scope.watch(&self.found_target, move |found| {
            if *found {
                *state.lock() = AcquisitionState::Found;
            }
        });
    }
}

/// Surface detector entity (одна на обнаруженную плоскость)
#[derive(Component)]
pub struct SurfaceDetector {
    acquisition: TargetAcquisition,
    lifecycle: Lifecycle,
}

impl SurfaceDetector {
    pub fn new(cells: &ArCells) -> Self {
        let acquisition = TargetAcquisition::new(cells);
        let mut lifecycle = Lifecycle::default();
        lifecycle.activate(&acquisition);
        Self {
            acquisition,
            lifecycle,
        }
    }

    pub fn acquisition(&self) -> &TargetAcquisition {
        &self.acquisition
    }

    pub fn state(&self) -> AcquisitionState {
        self.acquisition.state()
    }

    pub fn deactivate(&mut self) -> bool {
        self.lifecycle.deactivate()
    }
}

/// System: per-tick polling detector'ов (только пока plane detection включен)
pub fn poll_surface_detectors(
    cells: Res<ArCells>,
    detectors: Query<(&SurfaceDetector, &SurfaceSample)>,
) {
    if !cells.plane_tracking_enabled.get() {
        return;
    }

    for (detector, sample) in detectors.iter() {
        detector.acquisition.evaluate(sample);
    }
}

/// System: удалить detector'ы, которые latch'нулись в Found
pub fn despawn_found_detectors(
    mut commands: Commands,
    mut detectors: Query<(Entity, &mut SurfaceDetector)>,
) {
    for (entity, mut detector) in detectors.iter_mut() {
        if detector.state() != AcquisitionState::Found {
            continue;
        }

        detector.deactivate();
        commands.entity(entity).despawn();

        crate::log(&format!("Surface detector {:?} retired", entity));
    }
}
