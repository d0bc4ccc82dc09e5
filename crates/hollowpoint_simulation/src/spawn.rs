//! Спавн акторов с внедрением коллабораторов
//!
//! Коллабораторы передаются при спавне (движок — свои реализации, headless —
//! stubs). Актор спавнится в воздухе над точкой спавна и приземляется через
//! grounding фазу.

use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::ai::{BehaviorConfig, BehaviorState, PerceptionConfig, TargetHandle};
use crate::collaborators::{
    anim, AnimationDriver, AnimatorHandle, AudioHandle, AudioPlayer, BodyHandle, CapsuleBody,
    NavHandle, NavigationAgent,
};
use crate::combat::{
    EntityDied, SwitchTransition, WeaponSlots, WeaponSpec, WEAPON_SLOT_COUNT,
};
use crate::components::{Actor, AimTarget, FireInput, Health, Muzzle, Player};
use crate::logger::{log, log_info};
use crate::movement::{GroundingConfig, GroundingState};

/// Набор движковых сервисов одного актора
pub struct ActorCollaborators {
    pub nav: Box<dyn NavigationAgent>,
    pub body: Box<dyn CapsuleBody>,
    pub animator: Box<dyn AnimationDriver>,
    pub audio: Box<dyn AudioPlayer>,
}

fn equip_slots(
    weapons: Vec<WeaponSpec>,
    switch_delay: f32,
    audio: &mut dyn AudioPlayer,
    now: f32,
) -> WeaponSlots {
    let mut slots = WeaponSlots::new(WEAPON_SLOT_COUNT, switch_delay);
    for spec in weapons {
        slots.add_weapon(spec);
    }
    // Сразу поднимаем первое оружие
    for transition in slots.request_switch(true, now) {
        if let SwitchTransition::Activated { slot } = transition {
            if let Some(clip) = slots
                .weapon_at(slot)
                .and_then(|w| w.spec.equip_sound.as_deref())
            {
                audio.play_one_shot(clip);
            }
        }
    }
    slots
}

/// Спавн врага: полный AI стек + оружие
pub fn spawn_enemy(
    commands: &mut Commands,
    position: Vec3,
    mut collab: ActorCollaborators,
    weapons: Vec<WeaponSpec>,
    now: f32,
) -> Entity {
    let slots = equip_slots(weapons, 0.5, collab.audio.as_mut(), now);
    // Актор начинает в воздухе; флаг снимет приземление
    collab.animator.set_bool(anim::JUMPING, true);

    let entity = commands
        .spawn((
            Actor,
            Health::new(100.0),
            Transform::from_translation(position),
            GroundingState::default(),
            GroundingConfig::default(),
            PerceptionConfig::default(),
            TargetHandle::default(),
            BehaviorState::default(),
            BehaviorConfig::default(),
            Muzzle::default(),
            slots,
            NavHandle(collab.nav),
            BodyHandle(collab.body),
            AnimatorHandle(collab.animator),
            AudioHandle(collab.audio),
        ))
        .id();

    log(&format!("👾 Spawned enemy {:?} at {:.2}", entity, position));
    entity
}

/// Спавн игрока: input/aim вместо AI
pub fn spawn_player(
    commands: &mut Commands,
    position: Vec3,
    mut collab: ActorCollaborators,
    weapons: Vec<WeaponSpec>,
    now: f32,
) -> Entity {
    let slots = equip_slots(weapons, 1.0, collab.audio.as_mut(), now);
    collab.animator.set_bool(anim::JUMPING, true);

    let entity = commands
        .spawn((
            Actor,
            Player,
            Health::new(100.0),
            Transform::from_translation(position),
            GroundingState::default(),
            GroundingConfig::default(),
            FireInput::default(),
            AimTarget::default(),
            Muzzle::default(),
            slots,
            NavHandle(collab.nav),
            BodyHandle(collab.body),
            AnimatorHandle(collab.animator),
            AudioHandle(collab.audio),
        ))
        .id();

    log(&format!("🧍 Spawned player {:?} at {:.2}", entity, position));
    entity
}

/// Зона спавна врагов (горизонтальный прямоугольник + высота сброса)
#[derive(Resource, Debug, Clone, Copy)]
pub struct SpawnVolume {
    pub origin: Vec3,
    pub half_extents: Vec2,
    pub drop_height: f32,
}

impl SpawnVolume {
    pub fn random_point(&self, rng: &mut ChaCha8Rng) -> Vec3 {
        use rand::Rng;
        let x = self.origin.x + (rng.gen::<f32>() * 2.0 - 1.0) * self.half_extents.x;
        let z = self.origin.z + (rng.gen::<f32>() * 2.0 - 1.0) * self.half_extents.y;
        Vec3::new(x, self.origin.y + self.drop_height, z)
    }
}

/// Запрос на респавн врага; сборку актора выполняет движок
/// (коллабораторы создаются на его стороне)
#[derive(Event, Debug, Clone, Copy)]
pub struct RespawnRequested {
    pub position: Vec3,
}

/// Смерть врага при активной зоне спавна порождает запрос на замену
pub fn request_enemy_respawn(
    mut died: EventReader<EntityDied>,
    enemies: Query<(), With<BehaviorState>>,
    volume: Option<Res<SpawnVolume>>,
    mut rng: ResMut<crate::DeterministicRng>,
    mut requests: EventWriter<RespawnRequested>,
) {
    let Some(volume) = volume else {
        return;
    };
    for event in died.read() {
        if enemies.get(event.entity).is_ok() {
            let position = volume.random_point(&mut rng.rng);
            requests.write(RespawnRequested { position });
            log(&format!("♻️ Respawn requested at {:.2}", position));
        }
    }
}

/// Game over лог при смерти игрока
pub fn watch_player_death(
    mut died: EventReader<EntityDied>,
    players: Query<(), With<Player>>,
) {
    for event in died.read() {
        if players.get(event.entity).is_ok() {
            log_info("☠️ Player died, game over");
        }
    }
}
