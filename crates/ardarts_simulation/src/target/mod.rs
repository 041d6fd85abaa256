//! Мишень: identity, pose stream, поиск по иерархии
//!
//! - `DartTarget` висит на root entity мишени, collider может быть дочерним
//! - `find_target_identity` ищет DartTarget на body и вверх по `ChildOf`
//! - `publish_target_poses` пишет мировую позу `TargetPoseSource` в shared ячейки
//!   (equality-gated: уведомления только при реальном движении)
//! - `TrackedTarget` - чья поза сейчас в ячейках; только в неё дротик втыкается

use bevy::prelude::*;
use bevy::transform::helper::TransformHelper;

use crate::cells::ArCells;
use crate::dart::DartStuck;
use crate::pose::TargetPose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub struct TargetId(pub u32);

/// Мишень, в которую может воткнуться дротик
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct DartTarget {
    pub id: TargetId,
    /// Сколько дротиков воткнулось (target notification)
    pub hits: u32,
}

impl DartTarget {
    pub fn new(id: u32) -> Self {
        Self {
            id: TargetId(id),
            hits: 0,
        }
    }
}

/// Marker: поза этой entity публикуется в `target_position` / `target_rotation`
///
/// Single writer: при нескольких публикуется entity с наименьшим id.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct TargetPoseSource;

/// Entity, чья поза опубликована в `target_position` / `target_rotation`
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackedTarget {
    pub entity: Option<Entity>,
}

/// Ищет target identity на `body` или его предках.
///
/// `target_of(e)` - identity если e сама мишень, `parent_of(e)` - родитель в иерархии.
pub fn find_target_identity(
    body: Entity,
    target_of: impl Fn(Entity) -> Option<TargetId>,
    parent_of: impl Fn(Entity) -> Option<Entity>,
) -> Option<(Entity, TargetId)> {
    let mut current = body;
    loop {
        if let Some(id) = target_of(current) {
            return Some((current, id));
        }
        current = parent_of(current)?;
    }
}

/// ECS вариант: DartTarget компонент + ChildOf иерархия
pub fn find_target_in_hierarchy(
    body: Entity,
    targets: &Query<&DartTarget>,
    parents: &Query<&ChildOf>,
) -> Option<(Entity, TargetId)> {
    find_target_identity(
        body,
        |entity| targets.get(entity).ok().map(|target| target.id),
        |entity| parents.get(entity).ok().map(ChildOf::parent),
    )
}

/// System: публикация мировой позы мишени в ячейки (раз в кадр)
///
/// GlobalTransform считается через `TransformHelper` по текущим Transform'ам
/// предков, без ожидания propagation в PostUpdate.
pub fn publish_target_poses(
    cells: Res<ArCells>,
    mut tracked: ResMut<TrackedTarget>,
    sources: Query<Entity, With<TargetPoseSource>>,
    transforms: TransformHelper,
) {
    let Some(source) = sources.iter().min() else {
        tracked.entity = None;
        return;
    };

    let global = match transforms.compute_global_transform(source) {
        Ok(global) => global,
        Err(err) => {
            crate::log_warning(&format!("Target {:?} pose unavailable: {}", source, err));
            tracked.entity = None;
            return;
        }
    };

    if tracked.entity != Some(source) {
        crate::log_info(&format!("Tracking target pose of {:?}", source));
        tracked.entity = Some(source);
    }

    let pose = TargetPose::from_global(&global);
    cells.target_position.set(pose.position);
    cells.target_rotation.set(pose.eulers);
}

/// System: target реагирует на воткнувшийся дротик
pub fn record_dart_hits(mut stuck_events: EventReader<DartStuck>, mut targets: Query<&mut DartTarget>) {
    for event in stuck_events.read() {
        if let Ok(mut target) = targets.get_mut(event.target) {
            target.hits += 1;
            crate::log(&format!(
                "Target {:?} hit by dart {:?} (total hits: {})",
                target.id, event.dart, target.hits
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_identity_on_body_itself() {
        let body = Entity::from_raw(1);
        let found = find_target_identity(
            body,
            |e| (e == body).then_some(TargetId(7)),
            |_| None,
        );
        assert_eq!(found, Some((body, TargetId(7))));
    }

    #[test]
    fn test_identity_on_ancestor() {
        let root = Entity::from_raw(1);
        let board = Entity::from_raw(2);
        let collider = Entity::from_raw(3);
        let parents: HashMap<Entity, Entity> = [(collider, board), (board, root)].into_iter().collect();

        let found = find_target_identity(
            collider,
            |e| (e == root).then_some(TargetId(3)),
            |e| parents.get(&e).copied(),
        );
        assert_eq!(found, Some((root, TargetId(3))));
    }

    #[test]
    fn test_no_identity_is_none() {
        let wall = Entity::from_raw(5);
        let parent = Entity::from_raw(6);

        let found = find_target_identity(
            wall,
            |_| None,
            |e| (e == wall).then_some(parent),
        );
        assert_eq!(found, None);
    }
}
