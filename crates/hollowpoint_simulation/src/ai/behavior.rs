//! Behavior FSM врага: Roam → Engage → (Dead)
//!
//! Roam — случайные точки в диске вокруг текущей позиции + попытка захвата
//! цели каждый тик. Engage — преследование, доворот корпуса, стрельба в
//! радиусе атаки; потеря line of sight копит lost_timer, видимость сбрасывает
//! его в ноль. Dead выставляется обработчиком смерти и ведёт только к despawn.

use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;

use crate::ai::perception::{
    acquire_target, validate_target, PerceptionConfig, TargetHandle, TARGET_CHEST_OFFSET,
};
use crate::collaborators::{NavHandle, PhysicsWorld};
use crate::combat::FireIntent;
use crate::components::{Actor, Health, Muzzle};
use crate::logger::log;
use crate::movement::GroundingState;
use crate::DeterministicRng;

/// Состояние behavior FSM
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub enum BehaviorState {
    /// Патрулирование случайными точками
    Roam,
    /// Преследование и обстрел цели
    Engage { lost_timer: f32 },
    /// Труп, ждёт despawn
    Dead { despawn_timer: f32 },
}

impl Default for BehaviorState {
    fn default() -> Self {
        BehaviorState::Roam
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct BehaviorConfig {
    /// Радиус диска для случайных точек патрулирования
    pub roam_radius: f32,
    /// Сколько секунд без line of sight до потери цели
    pub known_target_timeout: f32,
    /// Задержка despawn после смерти
    pub despawn_delay: f32,
    /// Скорость доворота корпуса к цели (slerp factor в секунду)
    pub turn_speed: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            roam_radius: 20.0,
            known_target_timeout: 3.0,
            despawn_delay: 2.0,
            turn_speed: 5.0,
        }
    }
}

/// Фаза 2: behavior FSM всех врагов
#[allow(clippy::type_complexity)]
pub fn behavior_tick(
    time: Res<Time<Fixed>>,
    physics: Res<PhysicsWorld>,
    mut rng: ResMut<DeterministicRng>,
    mut fire_intents: EventWriter<FireIntent>,
    mut enemies: Query<(
        Entity,
        &mut BehaviorState,
        &BehaviorConfig,
        &PerceptionConfig,
        &mut TargetHandle,
        &Health,
        &GroundingState,
        &mut NavHandle,
        &mut Transform,
        &Muzzle,
    )>,
    targets: Query<(&Transform, &Health), (With<Actor>, Without<BehaviorState>)>,
) {
    let dt = time.delta_secs();

    for (
        entity,
        mut state,
        config,
        perception,
        mut handle,
        health,
        grounding,
        mut nav,
        mut transform,
        muzzle,
    ) in enemies.iter_mut()
    {
        // До приземления и после смерти FSM не тикает
        if !grounding.is_grounded() || !health.is_alive() {
            continue;
        }

        match *state {
            BehaviorState::Roam => {
                let origin = muzzle.world_origin(&transform);
                if let Some((candidate, _)) = acquire_target(
                    physics.0.as_ref(),
                    origin,
                    perception.detection_range,
                    perception.mask,
                    entity,
                ) {
                    let valid = targets
                        .get(candidate)
                        .map_or(false, |(_, target_health)| target_health.is_alive());
                    if valid {
                        handle.target = Some(candidate);
                        *state = BehaviorState::Engage { lost_timer: 0.0 };
                        log(&format!("🎯 Enemy {:?} acquired target {:?}", entity, candidate));
                        continue;
                    }
                }

                // Новая точка патруля только когда текущий путь пройден
                let idle = !nav.0.path_pending()
                    && (!nav.0.has_path()
                        || nav.0.remaining_distance() <= nav.0.stopping_distance())
                    && nav.0.velocity().length_squared() < 1e-4;
                if idle {
                    // Равномерная точка в диске: r = R * sqrt(u)
                    let radius = config.roam_radius * rng.rng.gen::<f32>().sqrt();
                    let angle = rng.rng.gen::<f32>() * TAU;
                    let offset = Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);
                    if let Some(point) = nav.0.sample_point(transform.translation + offset, 2.0) {
                        nav.0.set_destination(point);
                    }
                }
            }
            BehaviorState::Engage { lost_timer } => {
                let Some(target) = handle.target else {
                    *state = BehaviorState::Roam;
                    continue;
                };

                let target_pos = match targets.get(target) {
                    Ok((target_transform, target_health)) if target_health.is_alive() => {
                        target_transform.translation
                    }
                    // Цель мертва или удалена — сразу обратно в Roam
                    _ => {
                        handle.target = None;
                        nav.0.stop();
                        *state = BehaviorState::Roam;
                        log(&format!("💤 Enemy {:?} lost dead target", entity));
                        continue;
                    }
                };

                nav.0.set_destination(target_pos);

                let origin = muzzle.world_origin(&transform);
                let chest = target_pos + TARGET_CHEST_OFFSET;
                let result =
                    validate_target(physics.0.as_ref(), origin, target, chest, perception);

                // Видимость сбрасывает таймер в ноль, невидимость копит
                let lost_timer = if result.can_see { 0.0 } else { lost_timer + dt };
                if lost_timer >= config.known_target_timeout {
                    handle.target = None;
                    nav.0.stop();
                    *state = BehaviorState::Roam;
                    log(&format!("💤 Enemy {:?} lost sight of target", entity));
                    continue;
                }

                // Доворот корпуса в горизонтальной плоскости
                let mut to_target = target_pos - transform.translation;
                to_target.y = 0.0;
                if to_target != Vec3::ZERO {
                    let desired = Quat::from_rotation_arc(Vec3::NEG_Z, to_target.normalize());
                    let factor = (config.turn_speed * dt).min(1.0);
                    transform.rotation = transform.rotation.slerp(desired, factor);
                }

                if result.in_attack_range && result.can_see {
                    fire_intents.write(FireIntent {
                        shooter: entity,
                        aim_point: result.aim_point,
                        spread_override: None,
                    });
                }

                *state = BehaviorState::Engage { lost_timer };
            }
            // Despawn таймер тикает в combat::damage
            BehaviorState::Dead { .. } => {}
        }
    }
}
