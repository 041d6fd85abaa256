//! Dart (дротик): launch, попадание, rigid attachment к движущейся мишени
//!
//! Architecture:
//! - `DartTracker` (tracker.rs) - чистая state machine, владеет позой после попадания
//! - `Dart` компонент = shared tracker + подписки на pose stream мишени
//! - Physics (rapier) двигает дротик только в полёте; после попадания тело
//!   заморожено, Transform пишет только tracker (без re-parenting)
//!
//! Порядок систем (Update, chain):
//! 1. publish_target_poses - ячейки мишени → handlers → tracker delta
//! 2. launch_darts - LaunchDart → spawn
//! 3. detect_dart_hits - CollisionEvent::Started → Stuck + freeze
//! 4. record_dart_hits - target notification
//! 5. handle_destroyer_hits - внешний destroyer
//! 6. sync_dart_transforms - tracker ↔ Transform
//!
//! FixedUpdate: tick_dart_despawn (despawn cooldown)

pub mod tracker;

use std::sync::Arc;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use parking_lot::Mutex;

use crate::cells::ArCells;
use crate::config::GameConfig;
use crate::observable::ObservableValue;
use crate::pose::{self, TargetPose};
use crate::subscription::{Hooks, Lifecycle, SubscriptionScope};
use crate::target::{find_target_in_hierarchy, DartTarget, TargetId, TrackedTarget};

pub use tracker::{DartPhase, DartTracker};

pub type SharedTracker = Arc<Mutex<DartTracker>>;

/// Физические параметры дротика (из config)
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct DartSettings {
    pub collider_radius: f32,
    pub mass: f32,
    pub tip_offset: Option<Vec3>,
}

impl Default for DartSettings {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

impl DartSettings {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            collider_radius: config.dart.collider_radius,
            mass: config.dart.mass,
            tip_offset: config.dart.tip_offset.map(Vec3::from_array),
        }
    }
}

/// Event: запрос на запуск дротика (origin/direction/force из ArCells)
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct LaunchDart;

/// Event: дротик воткнулся в мишень (→ target notification)
#[derive(Event, Debug, Clone, Copy)]
pub struct DartStuck {
    pub dart: Entity,
    pub target: Entity,
    pub target_id: TargetId,
}

/// Event: внешний destroyer задел entity (немедленное уничтожение дротика)
#[derive(Event, Debug, Clone, Copy)]
pub struct DestroyerHit {
    pub entity: Entity,
}

/// Подписки дротика на pose stream мишени
struct DartLink {
    tracker: SharedTracker,
    target_position: ObservableValue<Vec3>,
    target_rotation: ObservableValue<Vec3>,
}

impl Hooks for DartLink {
    fn hook_events(&self, scope: &mut SubscriptionScope) {
        let tracker = Arc::clone(&self.tracker);
        scope.watch(&self.target_position, move |position| {
            tracker.lock().on_target_position_changed(*position);
        });

        let tracker = Arc::clone(&self.tracker);
        scope.watch(&self.target_rotation, move |eulers| {
            tracker.lock().on_target_rotation_changed(*eulers);
        });
    }
}

/// Дротик
///
/// Drop компонента (despawn) снимает подписки автоматически.
#[derive(Component)]
pub struct Dart {
    link: DartLink,
    lifecycle: Lifecycle,
}

impl Dart {
    pub fn new(tracker: DartTracker, cells: &ArCells) -> Self {
        let link = DartLink {
            tracker: Arc::new(Mutex::new(tracker)),
            target_position: cells.target_position.clone(),
            target_rotation: cells.target_rotation.clone(),
        };
        let mut lifecycle = Lifecycle::default();
        lifecycle.activate(&link);
        Self { link, lifecycle }
    }

    pub fn tracker(&self) -> &SharedTracker {
        &self.link.tracker
    }

    pub fn phase(&self) -> DartPhase {
        self.link.tracker.lock().phase()
    }

    pub fn is_hit(&self) -> bool {
        self.link.tracker.lock().is_hit()
    }

    pub fn activate(&mut self) -> bool {
        self.lifecycle.activate(&self.link)
    }

    pub fn deactivate(&mut self) -> bool {
        self.lifecycle.deactivate()
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }
}

/// Spawn дротика: поза/импульс из ArCells, rigid body с collision events
pub fn spawn_dart(commands: &mut Commands, cells: &ArCells, settings: &DartSettings) -> Entity {
    let origin = cells.dart_origin.get();
    let direction = cells.dart_direction.get();
    let force = cells.dart_force.get();

    let mut tracker = DartTracker::launch(origin, direction, force, cells.despawn_cooldown.get());
    if let Some(offset) = settings.tip_offset {
        tracker = tracker.with_tip_offset(offset);
    }
    let transform = Transform::from_translation(tracker.position()).with_rotation(tracker.rotation());
    let impulse = tracker.launch_impulse();

    let entity = commands
        .spawn((
            Dart::new(tracker, cells),
            transform,
            RigidBody::Dynamic,
            Collider::ball(settings.collider_radius),
            ColliderMassProperties::Mass(settings.mass),
            Velocity::zero(),
            ExternalImpulse {
                impulse,
                torque_impulse: Vec3::ZERO,
            },
            GravityScale(1.0),
            LockedAxes::empty(),
            ActiveEvents::COLLISION_EVENTS,
        ))
        .id();

    crate::log_info(&format!(
        "🎯 Dart {:?} launched: origin={:?} direction={:?} force={} impulse={:?}",
        entity, origin, direction, force, impulse
    ));

    entity
}

/// System: LaunchDart → spawn
pub fn launch_darts(
    mut commands: Commands,
    mut launch_events: EventReader<LaunchDart>,
    cells: Res<ArCells>,
    settings: Res<DartSettings>,
) {
    for _ in launch_events.read() {
        spawn_dart(&mut commands, &cells, &settings);
    }
}

/// System: первое попадание в мишень → Stuck, заморозка физики, DartStuck
///
/// Collision с не-мишенью игнорируется (дротик летит/падает дальше).
/// Мишень засчитывается только если её поза сейчас в ячейках (`TrackedTarget`):
/// snapshot берётся из тех же ячеек, что потом дают delta.
pub fn detect_dart_hits(
    mut collisions: EventReader<CollisionEvent>,
    cells: Res<ArCells>,
    tracked: Res<TrackedTarget>,
    mut darts: Query<(
        &Dart,
        &Transform,
        &mut Velocity,
        &mut GravityScale,
        &mut LockedAxes,
    )>,
    targets: Query<&DartTarget>,
    parents: Query<&ChildOf>,
    mut stuck_events: EventWriter<DartStuck>,
) {
    for event in collisions.read() {
        let CollisionEvent::Started(first, second, _) = *event else {
            continue;
        };

        for (dart_entity, body) in [(first, second), (second, first)] {
            let Ok((dart, transform, mut velocity, mut gravity, mut locked)) = darts.get_mut(dart_entity)
            else {
                continue;
            };
            let Some((target_entity, target_id)) = find_target_in_hierarchy(body, &targets, &parents) else {
                continue;
            };
            if tracked.entity != Some(target_entity) {
                crate::log_warning(&format!(
                    "Dart {:?} touched target {:?} ({:?}) without pose stream, ignored",
                    dart_entity, target_entity, target_id
                ));
                continue;
            }

            let target_pose = TargetPose::new(cells.target_position.get(), cells.target_rotation.get());
            {
                let mut tracker = dart.tracker().lock();
                // Фиксируем позу в момент удара (physics мог сдвинуть с прошлого sync)
                tracker.sync_physics_pose(transform.translation, transform.rotation);
                if !tracker.on_collision(target_pose) {
                    continue;
                }
            }

            *velocity = Velocity::zero();
            gravity.0 = 0.0;
            *locked = LockedAxes::all();

            stuck_events.write(DartStuck {
                dart: dart_entity,
                target: target_entity,
                target_id,
            });

            crate::log_info(&format!(
                "💥 Dart {:?} stuck in target {:?} ({:?}) at {:?}",
                dart_entity, target_entity, target_id, transform.translation
            ));
        }
    }
}

/// System: внешний destroyer → немедленный despawn (в любом состоянии)
pub fn handle_destroyer_hits(
    mut commands: Commands,
    mut destroyer_events: EventReader<DestroyerHit>,
    mut darts: Query<&mut Dart>,
) {
    for event in destroyer_events.read() {
        let Ok(mut dart) = darts.get_mut(event.entity) else {
            continue;
        };

        if !dart.tracker().lock().destroy() {
            continue; // Уже уничтожен в этом кадре
        }
        dart.deactivate();
        commands.entity(event.entity).despawn();

        crate::log_info(&format!("🗑️ Dart {:?} destroyed by destroyer", event.entity));
    }
}

/// System: InFlight - physics → tracker; Stuck - tracker → Transform
pub fn sync_dart_transforms(mut darts: Query<(&Dart, &mut Transform)>) {
    for (dart, mut transform) in darts.iter_mut() {
        let mut tracker = dart.tracker().lock();
        match tracker.phase() {
            DartPhase::InFlight => {
                tracker.sync_physics_pose(transform.translation, transform.rotation);
            }
            DartPhase::Stuck { .. } => {
                if transform.translation != tracker.position() {
                    transform.translation = tracker.position();
                }
                if transform.rotation != tracker.rotation() {
                    transform.rotation = tracker.rotation();
                }
            }
            DartPhase::Destroyed => {}
        }
    }
}

/// System: despawn cooldown после попадания
pub fn tick_dart_despawn(
    mut commands: Commands,
    time: Res<Time>,
    mut darts: Query<(Entity, &mut Dart)>,
) {
    let delta = time.delta_secs();

    for (entity, mut dart) in darts.iter_mut() {
        if !dart.tracker().lock().tick(delta) {
            continue;
        }

        dart.deactivate();
        commands.entity(entity).despawn();

        crate::log_info(&format!("Dart {:?} despawned after cooldown", entity));
    }
}

/// Debug: проекция дротика на плоскость мишени (нормаль = target_facing)
pub fn dart_projection(dart: &Dart, cells: &ArCells) -> Vec3 {
    dart.tracker()
        .lock()
        .projection_on_target_plane(cells.target_facing.get())
}

/// Euler градусы текущей ориентации дротика
pub fn dart_eulers(dart: &Dart) -> Vec3 {
    pose::quat_to_eulers(dart.tracker().lock().rotation())
}

/// Точка слежения: наконечник (если задан tip_offset) или origin
pub fn dart_tip(dart: &Dart) -> Vec3 {
    dart.tracker().lock().dart_position()
}
