//! Применение урона/лечения и обработка смерти
//!
//! События о фактических изменениях здоровья несут реальную дельту после
//! clamp; нулевые изменения событий не порождают. EntityDied стреляет ровно
//! один раз на актора (settle_death).

use bevy::prelude::*;

use crate::ai::behavior::{BehaviorConfig, BehaviorState};
use crate::collaborators::{anim, AnimatorHandle, BodyHandle, NavHandle};
use crate::components::Health;
use crate::logger::{log, log_info, log_warning};

/// Снаряд попал в актора (репортит движок или headless hitscan)
#[derive(Event, Debug, Clone, Copy)]
pub struct ProjectileHit {
    pub shooter: Entity,
    pub target: Entity,
    pub damage: f32,
}

/// Фактически нанесённый урон (после clamp и invincible)
#[derive(Event, Debug, Clone, Copy)]
pub struct DamageDealt {
    pub attacker: Option<Entity>,
    pub target: Entity,
    pub damage: f32,
    pub target_died: bool,
}

/// Фактически восстановленное здоровье
#[derive(Event, Debug, Clone, Copy)]
pub struct Healed {
    pub entity: Entity,
    pub amount: f32,
}

/// Актор умер (ровно один раз)
#[derive(Event, Debug, Clone, Copy)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Мгновенная смерть (kill zones, дебаг)
#[derive(Event, Debug, Clone, Copy)]
pub struct KillIntent {
    pub entity: Entity,
}

/// Запрос лечения
#[derive(Event, Debug, Clone, Copy)]
pub struct HealIntent {
    pub entity: Entity,
    pub amount: f32,
}

/// Фаза урона: попадания снарядов → здоровье → события
pub fn apply_projectile_hits(
    mut hits: EventReader<ProjectileHit>,
    mut targets: Query<&mut Health>,
    mut dealt: EventWriter<DamageDealt>,
    mut died: EventWriter<EntityDied>,
) {
    for hit in hits.read() {
        // Самострел не засчитывается
        if hit.target == hit.shooter {
            continue;
        }
        let Ok(mut health) = targets.get_mut(hit.target) else {
            log_warning(&format!(
                "ProjectileHit on missing target {:?}, ignored",
                hit.target
            ));
            continue;
        };
        if !health.is_alive() {
            continue;
        }

        let delta = health.damage(hit.damage);
        let target_died = health.settle_death();
        if delta > 0.0 {
            dealt.write(DamageDealt {
                attacker: Some(hit.shooter),
                target: hit.target,
                damage: delta,
                target_died,
            });
            log(&format!(
                "💥 {:?} hit {:?} for {:.1} ({:.1}/{:.1})",
                hit.shooter, hit.target, delta, health.current, health.max
            ));
        }
        if target_died {
            died.write(EntityDied {
                entity: hit.target,
                killer: Some(hit.shooter),
            });
        }
    }
}

pub fn apply_kill_intents(
    mut intents: EventReader<KillIntent>,
    mut targets: Query<&mut Health>,
    mut dealt: EventWriter<DamageDealt>,
    mut died: EventWriter<EntityDied>,
) {
    for intent in intents.read() {
        let Ok(mut health) = targets.get_mut(intent.entity) else {
            continue;
        };
        if !health.is_alive() {
            continue;
        }
        // kill игнорирует invincible; дельта — всегда максимум
        let delta = health.kill();
        let target_died = health.settle_death();
        dealt.write(DamageDealt {
            attacker: None,
            target: intent.entity,
            damage: delta,
            target_died,
        });
        if target_died {
            died.write(EntityDied {
                entity: intent.entity,
                killer: None,
            });
        }
    }
}

pub fn apply_heal_intents(
    mut intents: EventReader<HealIntent>,
    mut targets: Query<&mut Health>,
    mut healed: EventWriter<Healed>,
) {
    for intent in intents.read() {
        let Ok(mut health) = targets.get_mut(intent.entity) else {
            continue;
        };
        if !health.is_alive() {
            continue;
        }
        let delta = health.heal(intent.amount);
        if delta > 0.0 {
            healed.write(Healed {
                entity: intent.entity,
                amount: delta,
            });
        }
    }
}

/// Реакция на смерть: выключить навигацию и коллизию, death-анимация,
/// врагам — таймер despawn
#[allow(clippy::type_complexity)]
pub fn handle_death(
    mut died: EventReader<EntityDied>,
    mut actors: Query<(
        Option<&mut NavHandle>,
        Option<&mut BodyHandle>,
        Option<&mut AnimatorHandle>,
        Option<&mut BehaviorState>,
        Option<&BehaviorConfig>,
    )>,
) {
    for event in died.read() {
        log_info(&format!(
            "💀 Entity {:?} died (killer: {:?})",
            event.entity, event.killer
        ));
        let Ok((nav, body, animator, state, config)) = actors.get_mut(event.entity) else {
            continue;
        };
        if let Some(mut nav) = nav {
            nav.0.stop();
            nav.0.set_enabled(false);
        }
        if let Some(mut body) = body {
            body.0.set_collision_enabled(false);
        }
        if let Some(mut animator) = animator {
            animator.0.set_bool(anim::DEATH, true);
        }
        if let Some(mut state) = state {
            let delay = config.map_or(BehaviorConfig::default().despawn_delay, |c| {
                c.despawn_delay
            });
            *state = BehaviorState::Dead {
                despawn_timer: delay,
            };
        }
    }
}

/// Despawn трупов по таймеру
pub fn tick_despawn(
    time: Res<Time<Fixed>>,
    mut commands: Commands,
    mut corpses: Query<(Entity, &mut BehaviorState)>,
) {
    let dt = time.delta_secs();
    for (entity, mut state) in corpses.iter_mut() {
        let BehaviorState::Dead { despawn_timer } = *state else {
            continue;
        };
        let remaining = despawn_timer - dt;
        if remaining <= 0.0 {
            log(&format!("🧹 Despawning corpse {:?}", entity));
            commands.entity(entity).despawn();
        } else {
            *state = BehaviorState::Dead {
                despawn_timer: remaining,
            };
        }
    }
}
