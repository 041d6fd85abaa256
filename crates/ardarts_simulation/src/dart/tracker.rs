//! DartTracker - чистая state machine дротика (без ECS)
//!
//! Phases: InFlight → Stuck { despawn_timer } → Destroyed
//!
//! Rigid attachment через delta accumulation:
//! - InFlight: изменения позы мишени только обновляют last-known (дротик не двигается)
//! - Stuck: delta = new - last_known применяется к дротику, затем last_known = new
//!
//! Каждая delta применяется ровно один раз → суммарное смещение = p_n - p_0
//! независимо от количества/частоты уведомлений.

use bevy::prelude::*;

use crate::pose::{self, TargetPose, DART_FORWARD};

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum DartPhase {
    InFlight,
    Stuck {
        /// Секунды до self-destroy (≤ 0 при старте = не исчезает сам)
        despawn_timer: f32,
    },
    Destroyed,
}

#[derive(Debug, Clone)]
pub struct DartTracker {
    position: Vec3,
    rotation: Quat,
    launch_force: f32,
    despawn_cooldown: f32,
    tip_offset: Option<Vec3>,
    phase: DartPhase,
    last_target_position: Vec3,
    /// Euler градусы
    last_target_eulers: Vec3,
}

impl DartTracker {
    /// Launch: поза = origin, ориентация = direction (Euler градусы).
    /// Impulse берётся через `launch_impulse()`.
    pub fn launch(origin: Vec3, direction: Vec3, force: f32, despawn_cooldown: f32) -> Self {
        Self {
            position: origin,
            rotation: pose::eulers_to_quat(direction),
            launch_force: force,
            despawn_cooldown,
            tip_offset: None,
            phase: DartPhase::InFlight,
            last_target_position: Vec3::ZERO,
            last_target_eulers: Vec3::ZERO,
        }
    }

    pub fn with_tip_offset(mut self, offset: Vec3) -> Self {
        self.tip_offset = Some(offset);
        self
    }

    /// Мгновенный impulse вдоль forward оси, масштаб = force
    pub fn launch_impulse(&self) -> Vec3 {
        self.forward() * self.launch_force
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * DART_FORWARD
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn phase(&self) -> DartPhase {
        self.phase
    }

    pub fn is_hit(&self) -> bool {
        matches!(self.phase, DartPhase::Stuck { .. })
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase == DartPhase::Destroyed
    }

    pub fn last_target_pose(&self) -> TargetPose {
        TargetPose::new(self.last_target_position, self.last_target_eulers)
    }

    /// Позиция наконечника (если задан), иначе origin дротика
    pub fn dart_position(&self) -> Vec3 {
        match self.tip_offset {
            Some(offset) => self.position + self.rotation * offset,
            None => self.position,
        }
    }

    /// Debug: проекция дротика на плоскость мишени
    pub fn projection_on_target_plane(&self, facing: Vec3) -> Vec3 {
        pose::project_on_plane(self.position, facing)
    }

    /// Physics двигает дротик в полёте - зеркалим позу (только InFlight)
    pub fn sync_physics_pose(&mut self, position: Vec3, rotation: Quat) {
        if self.phase == DartPhase::InFlight {
            self.position = position;
            self.rotation = rotation;
        }
    }

    /// Первое попадание: Stuck + snapshot позы мишени.
    /// `false` для всех последующих (идемпотентно).
    pub fn on_collision(&mut self, target: TargetPose) -> bool {
        if self.phase != DartPhase::InFlight {
            return false;
        }

        self.phase = DartPhase::Stuck {
            despawn_timer: self.despawn_cooldown,
        };
        self.last_target_position = target.position;
        self.last_target_eulers = target.eulers;
        true
    }

    pub fn on_target_position_changed(&mut self, target_position: Vec3) {
        match self.phase {
            DartPhase::InFlight => {
                self.last_target_position = target_position;
            }
            DartPhase::Stuck { .. } => {
                self.position += target_position - self.last_target_position;
                self.last_target_position = target_position;
            }
            DartPhase::Destroyed => {}
        }
    }

    /// Аддитивная delta на Euler углах (не Quat композиция)
    pub fn on_target_rotation_changed(&mut self, target_eulers: Vec3) {
        match self.phase {
            DartPhase::InFlight => {
                self.last_target_eulers = target_eulers;
            }
            DartPhase::Stuck { .. } => {
                let delta = target_eulers - self.last_target_eulers;
                self.rotation = pose::add_euler_delta(self.rotation, delta);
                self.last_target_eulers = target_eulers;
            }
            DartPhase::Destroyed => {}
        }
    }

    /// Despawn cooldown. `true` ровно в тот тик, когда таймер пересёк 0.
    pub fn tick(&mut self, delta_secs: f32) -> bool {
        let DartPhase::Stuck { despawn_timer } = self.phase else {
            return false;
        };
        if despawn_timer <= 0.0 {
            return false;
        }

        let remaining = despawn_timer - delta_secs;
        if remaining <= 0.0 {
            self.phase = DartPhase::Destroyed;
            return true;
        }

        self.phase = DartPhase::Stuck {
            despawn_timer: remaining,
        };
        false
    }

    /// Внешний destroyer: безусловный terminal переход. `false` если уже Destroyed.
    pub fn destroy(&mut self) -> bool {
        if self.phase == DartPhase::Destroyed {
            return false;
        }
        self.phase = DartPhase::Destroyed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launched() -> DartTracker {
        DartTracker::launch(Vec3::ZERO, Vec3::ZERO, 5.0, 2.0)
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_launch_impulse_along_forward() {
        let tracker = launched();
        assert!(approx(tracker.launch_impulse(), Vec3::new(0.0, 0.0, 5.0)));
        assert_eq!(tracker.phase(), DartPhase::InFlight);
    }

    #[test]
    fn test_pre_attachment_pass_through() {
        let mut tracker = DartTracker::launch(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 30.0, 0.0), 5.0, 2.0);
        let rotation = tracker.rotation();

        tracker.on_target_position_changed(Vec3::new(10.0, 0.0, 0.0));
        tracker.on_target_rotation_changed(Vec3::new(0.0, 90.0, 0.0));

        assert_eq!(tracker.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(tracker.rotation(), rotation);
        assert_eq!(
            tracker.last_target_pose(),
            TargetPose::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0))
        );
    }

    #[test]
    fn test_collision_is_idempotent() {
        let mut tracker = launched();
        let first = TargetPose::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO);
        let second = TargetPose::new(Vec3::new(5.0, 5.0, 5.0), Vec3::ONE);

        assert!(tracker.on_collision(first));
        assert!(!tracker.on_collision(second));
        assert_eq!(tracker.last_target_pose(), first);
        assert_eq!(tracker.phase(), DartPhase::Stuck { despawn_timer: 2.0 });
    }

    #[test]
    fn test_delta_tracking_exactness() {
        let p0 = Vec3::new(0.0, 0.0, 4.0);
        let pn = Vec3::new(1.5, -0.5, 6.0);

        // Много мелких шагов
        let mut fine = launched();
        fine.sync_physics_pose(Vec3::new(0.0, 0.0, 3.9), Quat::IDENTITY);
        fine.on_collision(TargetPose::new(p0, Vec3::ZERO));
        for step in 1..=50 {
            let t = step as f32 / 50.0;
            fine.on_target_position_changed(p0.lerp(pn, t));
        }

        // Один шаг
        let mut coarse = launched();
        coarse.sync_physics_pose(Vec3::new(0.0, 0.0, 3.9), Quat::IDENTITY);
        coarse.on_collision(TargetPose::new(p0, Vec3::ZERO));
        coarse.on_target_position_changed(pn);

        let expected = Vec3::new(0.0, 0.0, 3.9) + (pn - p0);
        assert!(approx(fine.position(), expected), "fine = {:?}", fine.position());
        assert!(approx(coarse.position(), expected), "coarse = {:?}", coarse.position());
    }

    #[test]
    fn test_pre_hit_updates_do_not_leak_into_delta() {
        let mut tracker = launched();
        tracker.on_target_position_changed(Vec3::new(100.0, 0.0, 0.0));
        tracker.on_collision(TargetPose::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO));
        tracker.on_target_position_changed(Vec3::new(0.0, 1.0, 4.0));

        assert!(approx(tracker.position(), Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_rotation_delta_follows_target_yaw() {
        let mut tracker = launched();
        tracker.on_collision(TargetPose::new(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0)));

        tracker.on_target_rotation_changed(Vec3::new(0.0, 25.0, 0.0));
        tracker.on_target_rotation_changed(Vec3::new(0.0, 40.0, 0.0));

        let eulers = pose::quat_to_eulers(tracker.rotation());
        assert!((eulers.y - 30.0).abs() < 1e-3, "eulers = {:?}", eulers);
        assert_eq!(tracker.last_target_pose().eulers, Vec3::new(0.0, 40.0, 0.0));
    }

    #[test]
    fn test_despawn_after_cooldown() {
        let mut tracker = launched();
        tracker.on_collision(TargetPose::default());

        let mut elapsed = 0.0;
        while elapsed < 1.9 - 1e-4 {
            assert!(!tracker.tick(0.1));
            elapsed += 0.1;
        }
        assert!(!tracker.is_destroyed());

        assert!(tracker.tick(0.2));
        assert!(!tracker.tick(0.1));
        assert!(tracker.is_destroyed());
    }

    #[test]
    fn test_no_despawn_without_hit() {
        let mut tracker = launched();
        for _ in 0..100 {
            assert!(!tracker.tick(0.5));
        }
        assert_eq!(tracker.phase(), DartPhase::InFlight);
    }

    #[test]
    fn test_zero_cooldown_never_self_destroys() {
        let mut tracker = DartTracker::launch(Vec3::ZERO, Vec3::ZERO, 5.0, 0.0);
        tracker.on_collision(TargetPose::default());

        assert!(!tracker.tick(10.0));
        assert!(tracker.is_hit());
    }

    #[test]
    fn test_destroy_is_unconditional_and_terminal() {
        let mut tracker = launched();
        assert!(tracker.destroy());
        assert!(!tracker.destroy());

        // После Destroyed ничего не двигает дротик
        assert!(!tracker.on_collision(TargetPose::default()));
        tracker.on_target_position_changed(Vec3::ONE);
        assert_eq!(tracker.position(), Vec3::ZERO);
    }

    #[test]
    fn test_physics_sync_ignored_after_hit() {
        let mut tracker = launched();
        tracker.sync_physics_pose(Vec3::new(0.0, 0.0, 1.0), Quat::IDENTITY);
        tracker.on_collision(TargetPose::default());
        tracker.sync_physics_pose(Vec3::new(9.0, 9.0, 9.0), Quat::IDENTITY);

        assert_eq!(tracker.position(), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_tip_offset() {
        let tracker = DartTracker::launch(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0), 1.0, 1.0)
            .with_tip_offset(Vec3::new(0.0, 0.0, 0.1));

        assert!(approx(tracker.dart_position(), Vec3::new(1.1, 0.0, 0.0)));
    }
}
