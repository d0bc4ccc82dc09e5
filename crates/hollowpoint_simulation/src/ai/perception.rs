//! Perception: обнаружение и валидация цели через physics запросы
//!
//! Обнаружение — overlap сферой по маске акторов с подтверждающим raycast'ом.
//! Валидация уже известной цели — три независимых raycast'а: дистанция
//! обнаружения, дистанция атаки, line of sight по всем слоям.

use bevy::prelude::*;

use crate::collaborators::{LayerMask, PhysicsQuery};

/// Прицельная точка на цели относительно её ног (центр капсулы)
pub const TARGET_CHEST_OFFSET: Vec3 = Vec3::new(0.0, 0.9, 0.0);

#[derive(Component, Debug, Clone, Copy)]
pub struct PerceptionConfig {
    /// Радиус обнаружения новых целей
    pub detection_range: f32,
    /// Дистанция, с которой открывается огонь
    pub attack_range: f32,
    /// Маска слоёв потенциальных целей
    pub mask: LayerMask,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            detection_range: 20.0,
            attack_range: 15.0,
            mask: LayerMask::ACTORS,
        }
    }
}

/// Текущая захваченная цель врага
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct TargetHandle {
    pub target: Option<Entity>,
}

/// Результат валидации известной цели
#[derive(Debug, Clone, Copy)]
pub struct PerceptionResult {
    /// Цель в радиусе обнаружения (ray по маске целей)
    pub in_detection_range: bool,
    /// Цель в радиусе атаки (ray по маске целей)
    pub in_attack_range: bool,
    /// Линия видимости чистая (ray по всем слоям, первое попадание — цель)
    pub can_see: bool,
    /// Точка прицеливания на цели
    pub aim_point: Vec3,
}

/// Поиск новой цели: первый не-свой кандидат из overlap, подтверждённый
/// raycast'ом. Если луч до кандидата перекрыт — цели нет в этот тик.
pub fn acquire_target(
    physics: &dyn PhysicsQuery,
    origin: Vec3,
    range: f32,
    mask: LayerMask,
    exclude: Entity,
) -> Option<(Entity, Vec3)> {
    let candidate = physics
        .overlap_sphere(origin, range, mask)
        .into_iter()
        .find(|c| c.entity != exclude)?;

    let hit = physics.raycast(origin, candidate.center - origin, range, LayerMask::ALL)?;
    if hit.entity == candidate.entity {
        Some((candidate.entity, hit.point))
    } else {
        None
    }
}

/// Валидация известной цели тремя независимыми лучами
pub fn validate_target(
    physics: &dyn PhysicsQuery,
    origin: Vec3,
    target: Entity,
    target_pos: Vec3,
    config: &PerceptionConfig,
) -> PerceptionResult {
    let direction = target_pos - origin;

    let detection = physics.raycast(origin, direction, config.detection_range, config.mask);
    let in_detection_range = detection.map_or(false, |hit| hit.entity == target);

    let attack = physics.raycast(origin, direction, config.attack_range, config.mask);
    let in_attack_range = attack.map_or(false, |hit| hit.entity == target);

    let sight = physics.raycast(origin, direction, config.detection_range, LayerMask::ALL);
    let can_see = sight.map_or(false, |hit| hit.entity == target);

    let aim_point = detection
        .filter(|hit| hit.entity == target)
        .map(|hit| hit.point)
        .unwrap_or(target_pos);

    PerceptionResult {
        in_detection_range,
        in_attack_range,
        can_see,
        aim_point,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::stubs::StaticWorld;

    #[test]
    fn test_acquire_finds_visible_actor() {
        let world = StaticWorld::new();
        let me = Entity::from_raw(1);
        let other = Entity::from_raw(2);
        world.upsert_collider(me, Vec3::ZERO, 0.5, LayerMask::ACTORS);
        world.upsert_collider(other, Vec3::new(8.0, 0.0, 0.0), 0.5, LayerMask::ACTORS);

        let (found, point) =
            acquire_target(world.as_ref(), Vec3::ZERO, 20.0, LayerMask::ACTORS, me).unwrap();
        assert_eq!(found, other);
        assert!((point.x - 7.5).abs() < 1e-4);
    }

    #[test]
    fn test_acquire_blocked_by_obstacle() {
        let world = StaticWorld::new();
        let me = Entity::from_raw(1);
        let other = Entity::from_raw(2);
        world.upsert_collider(other, Vec3::new(8.0, 0.0, 0.0), 0.5, LayerMask::ACTORS);
        world.upsert_collider(
            Entity::from_raw(3),
            Vec3::new(4.0, 0.0, 0.0),
            1.0,
            LayerMask::OBSTACLES,
        );

        assert!(acquire_target(world.as_ref(), Vec3::ZERO, 20.0, LayerMask::ACTORS, me).is_none());
    }

    #[test]
    fn test_acquire_ignores_out_of_range() {
        let world = StaticWorld::new();
        let me = Entity::from_raw(1);
        world.upsert_collider(
            Entity::from_raw(2),
            Vec3::new(50.0, 0.0, 0.0),
            0.5,
            LayerMask::ACTORS,
        );

        assert!(acquire_target(world.as_ref(), Vec3::ZERO, 20.0, LayerMask::ACTORS, me).is_none());
    }

    #[test]
    fn test_validate_ranges_and_sight() {
        let world = StaticWorld::new();
        let target = Entity::from_raw(2);
        let config = PerceptionConfig::default();

        // В радиусе обнаружения, но дальше радиуса атаки
        let far = Vec3::new(18.0, 0.0, 0.0);
        world.upsert_collider(target, far, 0.5, LayerMask::ACTORS);
        let result = validate_target(world.as_ref(), Vec3::ZERO, target, far, &config);
        assert!(result.in_detection_range);
        assert!(!result.in_attack_range);
        assert!(result.can_see);

        // В радиусе атаки
        let near = Vec3::new(10.0, 0.0, 0.0);
        world.upsert_collider(target, near, 0.5, LayerMask::ACTORS);
        let result = validate_target(world.as_ref(), Vec3::ZERO, target, near, &config);
        assert!(result.in_attack_range);
        assert!(result.can_see);
    }

    #[test]
    fn test_validate_obstacle_blocks_sight_but_not_range() {
        let world = StaticWorld::new();
        let target = Entity::from_raw(2);
        let config = PerceptionConfig::default();

        let pos = Vec3::new(10.0, 0.0, 0.0);
        world.upsert_collider(target, pos, 0.5, LayerMask::ACTORS);
        world.upsert_collider(
            Entity::from_raw(3),
            Vec3::new(5.0, 0.0, 0.0),
            1.0,
            LayerMask::OBSTACLES,
        );

        let result = validate_target(world.as_ref(), Vec3::ZERO, target, pos, &config);
        // Лучи по маске акторов проходят сквозь препятствие
        assert!(result.in_detection_range);
        assert!(result.in_attack_range);
        // Line of sight по всем слоям перекрыта
        assert!(!result.can_see);
    }
}
