//! ARDarts Simulation Core
//!
//! ECS-симуляция AR мини-игры на Bevy 0.16: найти мишень (плоскость / картинка),
//! бросить дротик, дротик втыкается и следует за движущейся мишенью.
//!
//! Архитектура:
//! - observable/subscription - shared ячейки + lifecycle подписок (dataflow между компонентами)
//! - acquisition/placement - latch "мишень найдена" + переключение detection стратегий
//! - dart/target - rigid attachment дротика через delta accumulation
//!
//! Detection, rendering, rigid body integration - внешние (host / rapier).

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_rapier3d::prelude::CollisionEvent;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub mod acquisition;
pub mod cells;
pub mod config;
pub mod dart;
pub mod demo;
pub mod logger;
pub mod observable;
pub mod placement;
pub mod pose;
pub mod subscription;
pub mod target;

// Re-export основных типов
pub use acquisition::{AcquisitionState, SurfaceDetector, SurfaceSample, TargetAcquisition};
pub use cells::ArCells;
pub use config::{ConfigError, GameConfig};
pub use dart::{
    spawn_dart, Dart, DartPhase, DartSettings, DartStuck, DartTracker, DestroyerHit, LaunchDart,
};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel,
    LogPrinter,
};
pub use observable::{ObservableValue, SubscriptionId};
pub use placement::{PlacementCoordinator, PlacementManager, TrackingMode};
pub use pose::TargetPose;
pub use subscription::{Hooks, Lifecycle, Subscription, SubscriptionScope};
pub use target::{DartTarget, TargetId, TargetPoseSource, TrackedTarget};

/// Главный plugin симуляции
///
/// Порядок:
/// - Startup: setup_placement (coordinator + стартовый режим)
/// - Update (chain): pose stream → launch → hits → target notify → destroyer → transform sync
/// - FixedUpdate (chain): surface polling → retire detectors → despawn cooldown
#[derive(Default)]
pub struct ArDartsPlugin {
    pub config: GameConfig,
}

impl Plugin for ArDartsPlugin {
    fn build(&self, app: &mut App) {
        if let Some(level) = LogLevel::parse(&self.config.simulation.log_level) {
            set_log_level(level);
        }

        app.insert_resource(Time::<Fixed>::from_hz(self.config.simulation.fixed_hz))
            .insert_resource(ArCells::from_config(&self.config))
            .insert_resource(DartSettings::from_config(&self.config))
            .insert_resource(self.config.clone())
            .init_resource::<TrackedTarget>();

        // CollisionEvent регистрируем сами: rapier plugin добавляет host
        app.add_event::<CollisionEvent>()
            .add_event::<LaunchDart>()
            .add_event::<DartStuck>()
            .add_event::<DestroyerHit>();

        app.add_systems(Startup, placement::setup_placement)
            .add_systems(
                Update,
                (
                    target::publish_target_poses,
                    dart::launch_darts,
                    dart::detect_dart_hits,
                    target::record_dart_hits,
                    dart::handle_destroyer_hits,
                    dart::sync_dart_transforms,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    acquisition::poll_surface_detectors,
                    acquisition::despawn_found_detectors,
                    dart::tick_dart_despawn,
                )
                    .chain(),
            );
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время двигается вручную: один `app.update()` = один fixed tick.
pub fn create_headless_app(config: GameConfig) -> App {
    init_logger();

    let fixed_hz = config.simulation.fixed_hz;
    let seed = config.simulation.seed;

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / fixed_hz,
        )))
        .insert_resource(DeterministicRng::new(seed))
        .add_plugins(ArDartsPlugin { config });

    app
}

/// Snapshot компонентов для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
