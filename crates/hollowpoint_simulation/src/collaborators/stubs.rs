//! Headless реализации коллабораторов
//!
//! Для бинарника и интеграционных тестов: плоская земля, прямолинейный
//! nav agent, аналитический sphere-мир для overlap/raycast, recording
//! doubles для animator/audio/projectiles. В связке с движком все эти
//! роли исполняет он.

use bevy::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{
    AnimationDriver, AudioPlayer, CapsuleBody, ColliderRef, CollisionFlags, LayerMask,
    NavigationAgent, PhysicsQuery, PhysicsWorld, ProjectileFactory, ProjectileSpawner, RayHit,
};
use crate::combat::{ProjectileHit, WeaponFired};
use crate::components::{Actor, Health};

/// Радиус capsule коллайдера актора (синхронизация в StaticWorld)
pub const ACTOR_COLLIDER_RADIUS: f32 = 0.5;
/// Центр capsule относительно ног актора
pub const ACTOR_COLLIDER_CENTER: Vec3 = Vec3::new(0.0, 0.9, 0.0);

// ============================================================================
// FlatGround — kinematic capsule над плоскостью y = ground_y
// ============================================================================

#[derive(Debug, Clone)]
pub struct FlatGround {
    position: Vec3,
    ground_y: f32,
    collision_enabled: bool,
}

impl FlatGround {
    pub fn new(position: Vec3, ground_y: f32) -> Self {
        Self {
            position,
            ground_y,
            collision_enabled: true,
        }
    }
}

impl CapsuleBody for FlatGround {
    fn move_by(&mut self, delta: Vec3) -> CollisionFlags {
        let mut flags = CollisionFlags::default();
        self.position += delta;
        if self.collision_enabled && self.position.y <= self.ground_y {
            self.position.y = self.ground_y;
            flags.below = true;
        }
        flags
    }

    fn is_grounded(&self) -> bool {
        self.position.y <= self.ground_y + 1e-3
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_collision_enabled(&mut self, enabled: bool) {
        self.collision_enabled = enabled;
    }
}

// ============================================================================
// DirectNav — прямолинейный nav agent (navmesh = вся плоскость y=0)
// ============================================================================

#[derive(Debug, Clone)]
pub struct DirectNav {
    enabled: bool,
    position: Vec3,
    destination: Option<Vec3>,
    speed: f32,
    stopping_distance: f32,
}

impl DirectNav {
    pub fn new(speed: f32, stopping_distance: f32) -> Self {
        Self {
            enabled: false,
            position: Vec3::ZERO,
            destination: None,
            speed,
            stopping_distance,
        }
    }

    fn to_destination(&self) -> Vec3 {
        let Some(dest) = self.destination else {
            return Vec3::ZERO;
        };
        // Навигация в горизонтальной плоскости
        let mut to = dest - self.position;
        to.y = 0.0;
        to
    }
}

impl NavigationAgent for DirectNav {
    fn set_destination(&mut self, point: Vec3) {
        if self.enabled {
            self.destination = Some(point);
        }
    }

    fn path_pending(&self) -> bool {
        false
    }

    fn remaining_distance(&self) -> f32 {
        self.to_destination().length()
    }

    fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }

    fn has_path(&self) -> bool {
        self.destination.is_some()
    }

    fn velocity(&self) -> Vec3 {
        if !self.enabled {
            return Vec3::ZERO;
        }
        let to = self.to_destination();
        if to.length() <= self.stopping_distance {
            return Vec3::ZERO;
        }
        to.normalize_or_zero() * self.speed
    }

    fn stop(&mut self) {
        self.destination = None;
    }

    fn reset_path(&mut self) {
        self.destination = None;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.destination = None;
        }
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn sample_point(&self, center: Vec3, _radius: f32) -> Option<Vec3> {
        Some(Vec3::new(center.x, 0.0, center.z))
    }

    fn sync_position(&mut self, position: Vec3) {
        self.position = position;
    }
}

// ============================================================================
// StaticWorld — аналитический sphere-мир для overlap/raycast
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct SphereCollider {
    entity: Entity,
    center: Vec3,
    radius: f32,
    mask: LayerMask,
}

/// Physics-query сервис из сфер (акторы + сферические препятствия).
/// Тестовый харнесс держит `Arc<StaticWorld>` и двигает коллайдеры сам
/// (`sync_actor_colliders`), ядро видит только `PhysicsQuery`.
#[derive(Default)]
pub struct StaticWorld {
    colliders: Mutex<Vec<SphereCollider>>,
}

impl StaticWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn upsert_collider(&self, entity: Entity, center: Vec3, radius: f32, mask: LayerMask) {
        let mut colliders = self.colliders.lock().unwrap();
        if let Some(existing) = colliders.iter_mut().find(|c| c.entity == entity) {
            existing.center = center;
            existing.radius = radius;
            existing.mask = mask;
        } else {
            colliders.push(SphereCollider {
                entity,
                center,
                radius,
                mask,
            });
        }
    }

    pub fn remove_collider(&self, entity: Entity) {
        self.colliders.lock().unwrap().retain(|c| c.entity != entity);
    }

    /// Пересечение луча со сферой; сферы, содержащие origin, не репортятся
    /// (луч изнутри собственного коллайдера не должен попадать в себя)
    fn ray_sphere(origin: Vec3, direction: Vec3, sphere: &SphereCollider) -> Option<f32> {
        let to_center = sphere.center - origin;
        if to_center.length() <= sphere.radius {
            return None;
        }
        let projection = to_center.dot(direction);
        if projection < 0.0 {
            return None;
        }
        let closest_sq = to_center.length_squared() - projection * projection;
        let radius_sq = sphere.radius * sphere.radius;
        if closest_sq > radius_sq {
            return None;
        }
        Some(projection - (radius_sq - closest_sq).sqrt())
    }
}

impl PhysicsQuery for StaticWorld {
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<ColliderRef> {
        self.colliders
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.mask.intersects(mask))
            .filter(|c| c.center.distance(center) <= radius + c.radius)
            .map(|c| ColliderRef {
                entity: c.entity,
                center: c.center,
            })
            .collect()
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        let colliders = self.colliders.lock().unwrap();
        let mut nearest: Option<(f32, Entity)> = None;
        for collider in colliders.iter().filter(|c| c.mask.intersects(mask)) {
            if let Some(t) = Self::ray_sphere(origin, direction, collider) {
                if t <= max_distance && nearest.map_or(true, |(best, _)| t < best) {
                    nearest = Some((t, collider.entity));
                }
            }
        }
        nearest.map(|(t, entity)| RayHit {
            entity,
            point: origin + direction * t,
        })
    }
}

/// Handle на конкретный StaticWorld для харнесс-систем
/// (ядро использует только `PhysicsWorld`)
#[derive(Resource, Clone)]
pub struct StubWorld(pub Arc<StaticWorld>);

/// Харнесс-система: коллайдеры живых акторов следуют за Transform.
/// Мёртвые и удалённые акторы убираются из мира (collision отключён).
pub fn sync_actor_colliders(
    stub: Res<StubWorld>,
    actors: Query<(Entity, &Transform, &Health), With<Actor>>,
) {
    for (entity, transform, health) in actors.iter() {
        if health.is_alive() {
            stub.0.upsert_collider(
                entity,
                transform.translation + ACTOR_COLLIDER_CENTER,
                ACTOR_COLLIDER_RADIUS,
                LayerMask::ACTORS,
            );
        } else {
            stub.0.remove_collider(entity);
        }
    }
}

/// Харнесс-система: hitscan резолюция выстрелов.
/// В связке с движком снаряды летят и коллизии репортит он; headless
/// превращаем WeaponFired сразу в ProjectileHit первым попаданием луча.
pub fn resolve_hitscan_shots(
    mut fired: EventReader<WeaponFired>,
    physics: Res<PhysicsWorld>,
    mut hits: EventWriter<ProjectileHit>,
) {
    for shot in fired.read() {
        let Some(hit) = physics
            .0
            .raycast(shot.origin, shot.direction, 1000.0, LayerMask::ALL)
        else {
            continue;
        };
        if hit.entity == shot.shooter {
            continue;
        }
        hits.write(ProjectileHit {
            shooter: shot.shooter,
            target: hit.entity,
            damage: shot.damage,
        });
    }
}

/// Headless харнесс: sphere-мир + hitscan поверх ядра симуляции.
/// Коллайдеры синхронизируются до grounding'а, hitscan резолвится между
/// огнём и применением урона (в том же тике).
pub struct HeadlessStubsPlugin;

impl Plugin for HeadlessStubsPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<StubWorld>() {
            let world = StaticWorld::new();
            app.insert_resource(StubWorld(world.clone()));
            app.insert_resource(PhysicsWorld(world));
        }
        if !app.world().contains_resource::<ProjectileSpawner>() {
            app.insert_resource(ProjectileSpawner(Arc::new(CollectingProjectiles::new())));
        }
        app.add_systems(
            FixedUpdate,
            (
                sync_actor_colliders.before(crate::movement::resolve_grounding),
                resolve_hitscan_shots
                    .after(crate::combat::resolve_fire_intents)
                    .before(crate::combat::apply_projectile_hits),
            ),
        );
    }
}

// ============================================================================
// Recording doubles (animator, audio, projectiles)
// ============================================================================

#[derive(Debug, Default)]
pub struct AnimatorLog {
    pub bools: HashMap<String, bool>,
    pub floats: HashMap<String, f32>,
    pub triggers: Vec<String>,
}

/// Animation driver, запоминающий выставленные параметры (для ассертов)
#[derive(Clone, Default)]
pub struct RecordingAnimator {
    log: Arc<Mutex<AnimatorLog>>,
}

impl RecordingAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_bool(&self, param: &str) -> Option<bool> {
        self.log.lock().unwrap().bools.get(param).copied()
    }

    pub fn get_float(&self, param: &str) -> Option<f32> {
        self.log.lock().unwrap().floats.get(param).copied()
    }

    pub fn trigger_count(&self, param: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .triggers
            .iter()
            .filter(|t| *t == param)
            .count()
    }
}

impl AnimationDriver for RecordingAnimator {
    fn set_bool(&mut self, param: &str, value: bool) {
        self.log.lock().unwrap().bools.insert(param.to_string(), value);
    }

    fn set_float(&mut self, param: &str, value: f32) {
        self.log.lock().unwrap().floats.insert(param.to_string(), value);
    }

    fn trigger(&mut self, param: &str) {
        self.log.lock().unwrap().triggers.push(param.to_string());
    }
}

/// Audio player, считающий one-shot'ы по clip id
#[derive(Clone, Default)]
pub struct RecordingAudio {
    clips: Arc<Mutex<Vec<String>>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play_count(&self, clip: &str) -> usize {
        self.clips.lock().unwrap().iter().filter(|c| *c == clip).count()
    }

    pub fn total(&self) -> usize {
        self.clips.lock().unwrap().len()
    }
}

impl AudioPlayer for RecordingAudio {
    fn play_one_shot(&mut self, clip: &str) {
        self.clips.lock().unwrap().push(clip.to_string());
    }
}

/// No-op animator/audio для массовых спавнов
pub struct NullAnimator;

impl AnimationDriver for NullAnimator {
    fn set_bool(&mut self, _param: &str, _value: bool) {}
    fn set_float(&mut self, _param: &str, _value: f32) {}
    fn trigger(&mut self, _param: &str) {}
}

pub struct NullAudio;

impl AudioPlayer for NullAudio {
    fn play_one_shot(&mut self, _clip: &str) {}
}

#[derive(Debug, Clone, Copy)]
pub struct ShotRecord {
    pub origin: Vec3,
    pub direction: Vec3,
    pub owner: Entity,
}

/// Projectile factory, складывающая выстрелы в список
#[derive(Clone, Default)]
pub struct CollectingProjectiles {
    shots: Arc<Mutex<Vec<ShotRecord>>>,
}

impl CollectingProjectiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shots(&self) -> Vec<ShotRecord> {
        self.shots.lock().unwrap().clone()
    }
}

impl ProjectileFactory for CollectingProjectiles {
    fn spawn(&self, origin: Vec3, direction: Vec3, owner: Entity) {
        self.shots.lock().unwrap().push(ShotRecord {
            origin,
            direction,
            owner,
        });
    }
}
