//! Контракты внешних коллабораторов
//!
//! HYBRID ARCHITECTURE: ECS — strategic layer (game state, AI, combat rules),
//! движок — tactical layer (rendering, pathfinding, collision, audio).
//! Ядро зависит только от этих trait'ов; движок внедряет реализации при
//! спавне актора (никакого runtime lookup по типу компонента).
//!
//! Per-actor handles — компоненты с `Box<dyn Trait>`,
//! process-wide сервисы (physics queries, projectile factory) — ресурсы с `Arc`.

use bevy::prelude::*;
use std::sync::Arc;

pub mod stubs;

/// Битовая маска слоёв для physics запросов
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    /// Живые акторы (capsule коллайдеры)
    pub const ACTORS: LayerMask = LayerMask(1 << 0);
    /// Статичная геометрия (стены, препятствия)
    pub const OBSTACLES: LayerMask = LayerMask(1 << 1);
    /// Невидимые trigger volumes (не блокируют линию видимости)
    pub const TRIGGERS: LayerMask = LayerMask(1 << 2);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = LayerMask;
    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

/// Коллайдер, найденный overlap запросом
#[derive(Debug, Clone, Copy)]
pub struct ColliderRef {
    pub entity: Entity,
    pub center: Vec3,
}

/// Первое попадание луча
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub entity: Entity,
    pub point: Vec3,
}

/// Флаги коллизии после move (подмножество CharacterController flags)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionFlags {
    pub sides: bool,
    pub above: bool,
    pub below: bool,
}

/// Navigation agent сервис (pathfinding живёт в движке)
///
/// Контракт повторяет NavMeshAgent-подобный API: ядро пишет destination,
/// читает path state/velocity. `sample_point` — проекция точки на navmesh.
pub trait NavigationAgent: Send + Sync {
    fn set_destination(&mut self, point: Vec3);
    fn path_pending(&self) -> bool;
    fn remaining_distance(&self) -> f32;
    fn stopping_distance(&self) -> f32;
    fn has_path(&self) -> bool;
    fn velocity(&self) -> Vec3;
    fn stop(&mut self);
    fn reset_path(&mut self);
    fn set_enabled(&mut self, enabled: bool);
    fn enabled(&self) -> bool;
    /// Проекция точки на навигируемую поверхность в радиусе поиска
    fn sample_point(&self, center: Vec3, radius: f32) -> Option<Vec3>;
    /// Синхронизация позиции агента с актором (вызывается ядром каждый тик)
    fn sync_position(&mut self, position: Vec3);
}

/// Kinematic capsule movement сервис (collision-aware движение без rigid body)
pub trait CapsuleBody: Send + Sync {
    fn move_by(&mut self, delta: Vec3) -> CollisionFlags;
    fn is_grounded(&self) -> bool;
    fn position(&self) -> Vec3;
    fn set_collision_enabled(&mut self, enabled: bool);
}

/// Spatial queries (overlap + raycast)
pub trait PhysicsQuery: Send + Sync {
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<ColliderRef>;
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;
}

/// Animation state driver (именованные параметры, как в Animator)
pub trait AnimationDriver: Send + Sync {
    fn set_bool(&mut self, param: &str, value: bool);
    fn set_float(&mut self, param: &str, value: f32);
    fn trigger(&mut self, param: &str);
}

/// Фабрика снарядов (fire-and-forget, lifecycle снаряда — в движке)
pub trait ProjectileFactory: Send + Sync {
    fn spawn(&self, origin: Vec3, direction: Vec3, owner: Entity);
}

/// Проигрывание one-shot звуков
pub trait AudioPlayer: Send + Sync {
    fn play_one_shot(&mut self, clip: &str);
}

/// Параметры animation driver'а, которые выставляет ядро
pub mod anim {
    pub const WALKING: &str = "Walking";
    pub const JUMPING: &str = "Jumping";
    pub const DEATH: &str = "Death";
    pub const RELOADING: &str = "Reloading";
    pub const RELOAD_SPEED: &str = "ReloadSpeed";
    pub const DIR_X: &str = "Dirx";
    pub const DIR_Y: &str = "Diry";
    pub const ATTACK: &str = "Attack";
}

// === Per-actor handles (внедряются при спавне) ===

#[derive(Component)]
pub struct NavHandle(pub Box<dyn NavigationAgent>);

#[derive(Component)]
pub struct BodyHandle(pub Box<dyn CapsuleBody>);

#[derive(Component)]
pub struct AnimatorHandle(pub Box<dyn AnimationDriver>);

#[derive(Component)]
pub struct AudioHandle(pub Box<dyn AudioPlayer>);

// === Process-wide сервисы ===

#[derive(Resource, Clone)]
pub struct PhysicsWorld(pub Arc<dyn PhysicsQuery>);

#[derive(Resource, Clone)]
pub struct ProjectileSpawner(pub Arc<dyn ProjectileFactory>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask_intersects() {
        assert!(LayerMask::ACTORS.intersects(LayerMask::ALL));
        assert!(!LayerMask::ACTORS.intersects(LayerMask::OBSTACLES));
        assert!((LayerMask::ACTORS | LayerMask::OBSTACLES).intersects(LayerMask::OBSTACLES));
        assert!(!LayerMask::NONE.intersects(LayerMask::ALL));
    }
}
