//! Pose helpers: Euler углы (градусы) ↔ Quat
//!
//! Конвенция: `Vec3(pitch, yaw, roll)` = (x, y, z) в градусах,
//! порядок применения YXZ (yaw, затем pitch, затем roll).
//! Forward ось дротика = +Z.

use bevy::math::EulerRot;
use bevy::prelude::*;

pub const DART_FORWARD: Vec3 = Vec3::Z;

pub fn eulers_to_quat(eulers: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        eulers.y.to_radians(),
        eulers.x.to_radians(),
        eulers.z.to_radians(),
    )
}

pub fn quat_to_eulers(rotation: Quat) -> Vec3 {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

/// Прибавить delta к Euler представлению rotation (аддитивно, не композиция Quat)
pub fn add_euler_delta(rotation: Quat, delta: Vec3) -> Quat {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    Quat::from_euler(
        EulerRot::YXZ,
        yaw + delta.y.to_radians(),
        pitch + delta.x.to_radians(),
        roll + delta.z.to_radians(),
    )
}

/// Проекция точки на плоскость через origin с нормалью `normal`.
/// Вырожденная нормаль → точка без изменений.
pub fn project_on_plane(point: Vec3, normal: Vec3) -> Vec3 {
    let length_squared = normal.length_squared();
    if length_squared < f32::EPSILON {
        return point;
    }
    point - normal * (point.dot(normal) / length_squared)
}

/// Snapshot позы мишени (как её видит трекер)
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct TargetPose {
    pub position: Vec3,
    /// Euler градусы
    pub eulers: Vec3,
}

impl TargetPose {
    pub fn new(position: Vec3, eulers: Vec3) -> Self {
        Self { position, eulers }
    }

    /// Мировая поза (с учётом родителей)
    pub fn from_global(global: &GlobalTransform) -> Self {
        let (_, rotation, translation) = global.to_scale_rotation_translation();
        Self {
            position: translation,
            eulers: quat_to_eulers(rotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euler_roundtrip_single_axis() {
        let eulers = Vec3::new(0.0, 45.0, 0.0);
        let back = quat_to_eulers(eulers_to_quat(eulers));
        assert!((back - eulers).length() < 1e-3, "back = {:?}", back);
    }

    #[test]
    fn test_zero_direction_faces_forward() {
        let forward = eulers_to_quat(Vec3::ZERO) * DART_FORWARD;
        assert!((forward - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_yaw_turns_forward_towards_x() {
        let forward = eulers_to_quat(Vec3::new(0.0, 90.0, 0.0)) * DART_FORWARD;
        assert!((forward - Vec3::X).length() < 1e-5, "forward = {:?}", forward);
    }

    #[test]
    fn test_add_euler_delta() {
        let rotation = eulers_to_quat(Vec3::new(0.0, 10.0, 0.0));
        let rotated = add_euler_delta(rotation, Vec3::new(0.0, 20.0, 0.0));
        let eulers = quat_to_eulers(rotated);
        assert!((eulers.y - 30.0).abs() < 1e-3, "eulers = {:?}", eulers);
    }

    #[test]
    fn test_project_on_plane() {
        let projected = project_on_plane(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, -2.0));
        assert!((projected - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);

        let untouched = project_on_plane(Vec3::ONE, Vec3::ZERO);
        assert_eq!(untouched, Vec3::ONE);
    }

    #[test]
    fn test_pose_from_parented_global() {
        let anchor = Transform::from_xyz(1.0, 0.0, 0.0).with_rotation(eulers_to_quat(Vec3::new(0.0, 90.0, 0.0)));
        let local = Transform::from_xyz(0.0, 0.0, 2.0);
        let global = GlobalTransform::from(anchor).mul_transform(local);

        let pose = TargetPose::from_global(&global);
        assert!((pose.position - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5, "pose = {:?}", pose);
        assert!((pose.eulers.y - 90.0).abs() < 1e-3, "pose = {:?}", pose);
    }
}
