//! Директор огня: превращает input игрока и намерения AI в выстрелы
//!
//! Огонь разрешён только при SwitchState::Up. Каждый выстрел списывает
//! патрон, спавнит bullets_per_shot снарядов с разбросом и рассылает
//! WeaponFired (headless харнесс резолвит их hitscan'ом).

use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::collaborators::{anim, AnimatorHandle, AudioHandle, ProjectileSpawner};
use crate::combat::ammo::{spread_direction, WeaponSpec};
use crate::combat::switching::{SwitchState, WeaponSlots};
use crate::components::{AimTarget, BulletSpreadOverride, FireInput, Health, Muzzle, Player};
use crate::DeterministicRng;

/// Намерение выстрелить (AI или скрипты)
#[derive(Event, Debug, Clone, Copy)]
pub struct FireIntent {
    pub shooter: Entity,
    pub aim_point: Vec3,
    pub spread_override: Option<f32>,
}

/// Состоявшийся выстрел (по одному на снаряд)
#[derive(Event, Debug, Clone, Copy)]
pub struct WeaponFired {
    pub shooter: Entity,
    pub origin: Vec3,
    pub direction: Vec3,
    pub damage: f32,
}

#[allow(clippy::too_many_arguments)]
fn execute_shot(
    shooter: Entity,
    origin: Vec3,
    aim_point: Vec3,
    spec: &WeaponSpec,
    spread_override: Option<f32>,
    rng: &mut ChaCha8Rng,
    projectiles: &ProjectileSpawner,
    fired: &mut EventWriter<WeaponFired>,
    animator: Option<&mut AnimatorHandle>,
    audio: Option<&mut AudioHandle>,
) {
    let base_direction = (aim_point - origin).normalize_or_zero();
    if base_direction == Vec3::ZERO {
        return;
    }

    for _ in 0..spec.bullets_per_shot {
        let direction = spread_direction(
            base_direction,
            spec.bullet_spread_angle,
            spread_override,
            rng,
        );
        projectiles.0.spawn(origin, direction, shooter);
        fired.write(WeaponFired {
            shooter,
            origin,
            direction,
            damage: spec.damage,
        });
    }

    if let Some(animator) = animator {
        animator.0.trigger(anim::ATTACK);
    }
    if let (Some(audio), Some(clip)) = (audio, &spec.shoot_sound) {
        audio.0.play_one_shot(clip);
    }
}

/// Фаза огня игрока: кнопка → try_fire активного оружия → снаряды
#[allow(clippy::type_complexity)]
pub fn resolve_player_fire(
    time: Res<Time<Fixed>>,
    mut rng: ResMut<DeterministicRng>,
    projectiles: Res<ProjectileSpawner>,
    mut fired: EventWriter<WeaponFired>,
    mut players: Query<
        (
            Entity,
            &Health,
            &FireInput,
            &AimTarget,
            &Transform,
            &Muzzle,
            &mut WeaponSlots,
            Option<&BulletSpreadOverride>,
            Option<&mut AnimatorHandle>,
            Option<&mut AudioHandle>,
        ),
        With<Player>,
    >,
) {
    let now = time.elapsed_secs();

    for (entity, health, input, aim, transform, muzzle, mut slots, spread, animator, audio) in
        players.iter_mut()
    {
        if !health.is_alive() || slots.switch_state != SwitchState::Up {
            continue;
        }
        let Some(weapon) = slots.active_weapon_mut() else {
            continue;
        };
        if !weapon
            .ammo
            .handle_fire_input(&weapon.spec, input.down(), input.held, now)
        {
            continue;
        }
        let spec = weapon.spec.clone();
        execute_shot(
            entity,
            muzzle.world_origin(transform),
            aim.point,
            &spec,
            spread.map(|s| s.0),
            &mut rng.rng,
            &projectiles,
            &mut fired,
            animator.map(Mut::into_inner),
            audio.map(Mut::into_inner),
        );
    }
}

/// Фаза огня AI: FireIntent → try_fire оружия стрелка → снаряды
#[allow(clippy::type_complexity)]
pub fn resolve_fire_intents(
    time: Res<Time<Fixed>>,
    mut rng: ResMut<DeterministicRng>,
    projectiles: Res<ProjectileSpawner>,
    mut intents: EventReader<FireIntent>,
    mut fired: EventWriter<WeaponFired>,
    mut shooters: Query<(
        &Transform,
        &Muzzle,
        &mut WeaponSlots,
        Option<&mut AnimatorHandle>,
        Option<&mut AudioHandle>,
    )>,
) {
    let now = time.elapsed_secs();

    for intent in intents.read() {
        let Ok((transform, muzzle, mut slots, animator, audio)) =
            shooters.get_mut(intent.shooter)
        else {
            continue;
        };
        if slots.switch_state != SwitchState::Up {
            continue;
        }
        let Some(weapon) = slots.active_weapon_mut() else {
            continue;
        };
        if !weapon.ammo.try_fire(&weapon.spec, now) {
            continue;
        }
        let spec = weapon.spec.clone();
        execute_shot(
            intent.shooter,
            muzzle.world_origin(transform),
            intent.aim_point,
            &spec,
            intent.spread_override,
            &mut rng.rng,
            &projectiles,
            &mut fired,
            animator.map(Mut::into_inner),
            audio.map(Mut::into_inner),
        );
    }
}

/// Защёлка фронта кнопки огня; последняя фаза тика
pub fn latch_fire_input(mut inputs: Query<&mut FireInput>) {
    for mut input in inputs.iter_mut() {
        input.was_held = input.held;
    }
}
