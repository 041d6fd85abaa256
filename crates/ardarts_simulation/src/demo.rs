//! Scripted headless session (без AR runtime и без rapier pipeline)
//!
//! Stand-in'ы внешних подсистем:
//! - растущая плоскость вместо surface detector'а
//! - покачивание мишени (DeterministicRng) вместо анимации
//! - простая интеграция импульса/гравитации вместо rigid body physics
//! - contact по пересечению плоскости мишени вместо collision detection
//!
//! Всё остальное - реальные системы ArDartsPlugin.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use bevy_rapier3d::rapier::geometry::CollisionEventFlags;
use rand::Rng;

use crate::acquisition::{self, SurfaceDetector, SurfaceSample};
use crate::cells::ArCells;
use crate::config::GameConfig;
use crate::dart::{dart_eulers, dart_tip, Dart, DartPhase, DartSettings, LaunchDart};
use crate::target::{self, DartTarget, TargetPoseSource};
use crate::{create_headless_app, world_snapshot, DeterministicRng};

/// Скорость роста демо-плоскости (м/с по x, y)
const PLANE_GROWTH: Vec2 = Vec2::new(0.6, 0.5);
const GRAVITY: f32 = -9.81;

#[derive(Resource, Debug, Clone, Copy)]
pub struct DemoScene {
    pub target: Entity,
    pub board: Entity,
    pub detector: Entity,
}

/// Marker: мишень, которая покачивается после обнаружения
#[derive(Component, Debug, Clone, Copy)]
pub struct DemoSway {
    /// Максимальный сдвиг за тик (метры)
    pub max_step: f32,
    /// Максимальный поворот за тик (градусы yaw)
    pub max_yaw_step: f32,
}

impl Default for DemoSway {
    fn default() -> Self {
        Self {
            max_step: 0.01,
            max_yaw_step: 1.0,
        }
    }
}

/// Итог демо-сессии
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DemoReport {
    pub found_tick: Option<usize>,
    pub center_pos: Vec3,
    pub launch_tick: Option<usize>,
    pub hit_tick: Option<usize>,
    pub despawn_tick: Option<usize>,
    /// Смещение дротик − мишень в момент попадания
    pub offset_at_hit: Option<Vec3>,
    /// Точка слежения (наконечник) в момент попадания
    pub tip_at_hit: Option<Vec3>,
    pub eulers_at_hit: Option<Vec3>,
    /// Максимальный уход смещения от offset_at_hit, пока дротик воткнут
    pub max_offset_drift: f32,
    pub target_hits: u32,
    /// Transform всех entity в конце сессии (для сравнения детерминизма)
    pub transforms: Vec<u8>,
}

pub struct DemoPlugin;

impl Plugin for DemoPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (
                grow_demo_plane.before(acquisition::poll_surface_detectors),
                (integrate_demo_flight, detect_demo_contacts).chain(),
            ),
        )
        .add_systems(Update, sway_demo_target.before(target::publish_target_poses));
    }
}

/// Spawn: plane detector + мишень (root) + доска-collider (child)
pub fn spawn_demo_scene(world: &mut World) -> DemoScene {
    let cells = world.resource::<ArCells>().clone();
    let target_origin = Vec3::new(0.0, 0.0, 3.0);

    let detector = world
        .spawn((
            SurfaceDetector::new(&cells),
            SurfaceSample::new(Vec2::ZERO, target_origin),
        ))
        .id();

    let target = world
        .spawn((
            DartTarget::new(1),
            TargetPoseSource,
            DemoSway::default(),
            Transform::from_translation(target_origin),
        ))
        .id();

    let board = world
        .spawn((
            Collider::cuboid(0.5, 0.5, 0.02),
            Transform::default(),
            ChildOf(target),
        ))
        .id();

    let scene = DemoScene {
        target,
        board,
        detector,
    };
    world.insert_resource(scene);
    scene
}

/// System: плоскость растёт, пока её не "найдут"
pub fn grow_demo_plane(time: Res<Time>, mut samples: Query<&mut SurfaceSample>) {
    let delta = time.delta_secs();
    for mut sample in samples.iter_mut() {
        sample.size += PLANE_GROWTH * delta;
    }
}

/// System: мишень покачивается (только после обнаружения)
pub fn sway_demo_target(
    cells: Res<ArCells>,
    mut rng: ResMut<DeterministicRng>,
    mut targets: Query<(&DemoSway, &mut Transform)>,
) {
    if !cells.found_target.get() {
        return;
    }

    for (sway, mut transform) in targets.iter_mut() {
        let step = Vec3::new(
            rng.rng.gen_range(-sway.max_step..=sway.max_step),
            rng.rng.gen_range(-sway.max_step..=sway.max_step),
            0.0,
        );
        let yaw = rng.rng.gen_range(-sway.max_yaw_step..=sway.max_yaw_step);

        transform.translation += step;
        transform.rotate_y(yaw.to_radians());
    }
}

/// System: импульс + гравитация для незамороженных дротиков
pub fn integrate_demo_flight(
    time: Res<Time>,
    settings: Res<DartSettings>,
    mut darts: Query<
        (
            &mut Transform,
            &mut Velocity,
            &mut ExternalImpulse,
            &GravityScale,
            &LockedAxes,
        ),
        With<Dart>,
    >,
) {
    let delta = time.delta_secs();

    for (mut transform, mut velocity, mut impulse, gravity, locked) in darts.iter_mut() {
        if *locked == LockedAxes::all() {
            continue;
        }

        velocity.linvel += impulse.impulse / settings.mass;
        impulse.impulse = Vec3::ZERO;
        velocity.linvel.y += GRAVITY * gravity.0 * delta;
        transform.translation += velocity.linvel * delta;
    }
}

/// System: дротик пересёк плоскость доски → CollisionEvent::Started
pub fn detect_demo_contacts(
    scene: Option<Res<DemoScene>>,
    targets: Query<&Transform, (With<DartTarget>, Without<Dart>)>,
    mut darts: Query<(Entity, &Dart, &mut Transform), Without<DartTarget>>,
    mut collisions: EventWriter<CollisionEvent>,
) {
    let Some(scene) = scene else {
        return;
    };
    let Ok(target_transform) = targets.get(scene.target) else {
        return;
    };
    let board_z = target_transform.translation.z;

    for (entity, dart, mut transform) in darts.iter_mut() {
        if dart.phase() != DartPhase::InFlight || transform.translation.z < board_z {
            continue;
        }

        // Наконечник останавливается на поверхности доски
        transform.translation.z = board_z;
        collisions.write(CollisionEvent::Started(
            entity,
            scene.board,
            CollisionEventFlags::empty(),
        ));
    }
}

/// Полная демо-сессия: поиск плоскости → бросок → попадание → слежение → despawn
pub fn run_demo_session(config: GameConfig, ticks: usize) -> DemoReport {
    let mut app = create_headless_app(config);
    app.add_plugins(DemoPlugin);
    let scene = spawn_demo_scene(app.world_mut());

    let mut report = DemoReport::default();

    for tick in 0..ticks {
        app.update();

        let cells = app.world().resource::<ArCells>().clone();

        if report.found_tick.is_none() && cells.found_target.get() {
            report.found_tick = Some(tick);
            report.center_pos = cells.center_pos.get();

            // Бросаем с 2.5м перед найденным центром
            cells.dart_origin.set(report.center_pos - Vec3::new(0.0, 0.0, 2.5));
            cells.dart_direction.set(Vec3::ZERO);
            app.world_mut().send_event(LaunchDart);
            report.launch_tick = Some(tick);
            continue;
        }

        let Some(target_translation) = app
            .world()
            .get::<Transform>(scene.target)
            .map(|transform| transform.translation)
        else {
            continue;
        };

        let mut darts = app.world_mut().query::<(&Dart, &Transform)>();
        let dart_state = darts
            .iter(app.world())
            .next()
            .map(|(dart, transform)| {
                (
                    dart.is_hit(),
                    transform.translation,
                    dart_tip(dart),
                    dart_eulers(dart),
                )
            });

        match dart_state {
            Some((true, dart_translation, tip, eulers)) => {
                let offset = dart_translation - target_translation;
                match report.offset_at_hit {
                    None => {
                        report.hit_tick = Some(tick);
                        report.offset_at_hit = Some(offset);
                        report.tip_at_hit = Some(tip);
                        report.eulers_at_hit = Some(eulers);
                    }
                    Some(initial) => {
                        report.max_offset_drift = report.max_offset_drift.max((offset - initial).length());
                    }
                }
            }
            Some((false, ..)) => {}
            None => {
                if report.hit_tick.is_some() && report.despawn_tick.is_none() {
                    report.despawn_tick = Some(tick);
                }
            }
        }
    }

    report.target_hits = app
        .world()
        .get::<DartTarget>(scene.target)
        .map_or(0, |target| target.hits);
    report.transforms = world_snapshot::<Transform>(app.world_mut());

    report
}
