//! HOLLOWPOINT Simulation Core
//!
//! Headless геймплейное ядро FPS-прототипа на Bevy ECS: поведение врагов,
//! perception, здоровье, оружие (патроны/перезарядка/переключение), спавн.
//! Рендер, pathfinding, коллизии и звук живут в движке и внедряются через
//! trait'ы из `collaborators`; ядро детерминировано тикается в FixedUpdate.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

pub mod ai;
pub mod collaborators;
pub mod combat;
pub mod components;
pub mod logger;
pub mod movement;
pub mod spawn;

pub use ai::*;
pub use collaborators::{
    AnimatorHandle, AudioHandle, BodyHandle, LayerMask, NavHandle, PhysicsWorld,
    ProjectileSpawner,
};
pub use combat::*;
pub use components::*;
pub use movement::*;
pub use spawn::*;

/// Длительность одного тика симуляции (~60 Hz)
pub const SIM_TICK: Duration = Duration::from_micros(16_666);

/// Единый детерминированный RNG симуляции (roam точки, разброс, спавн)
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

/// Контекст уровня (entity игрока для HUD/дебага)
#[derive(Resource, Debug, Clone, Copy)]
pub struct SimContext {
    pub player: Entity,
}

/// Ядро симуляции: все системы одной chain'нутой цепочкой в FixedUpdate.
/// Жёсткий порядок фаз: grounding → AI → огонь → патроны → переключение →
/// урон → смерть → перемещение → анимация → защёлка input.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }
        app.insert_resource(Time::<Fixed>::from_duration(SIM_TICK));

        app.add_event::<GroundedEvent>()
            .add_event::<FireIntent>()
            .add_event::<WeaponFired>()
            .add_event::<ProjectileHit>()
            .add_event::<DamageDealt>()
            .add_event::<Healed>()
            .add_event::<EntityDied>()
            .add_event::<KillIntent>()
            .add_event::<HealIntent>()
            .add_event::<ReloadIntent>()
            .add_event::<SwitchWeaponIntent>()
            .add_event::<WeaponSwitched>()
            .add_event::<RespawnRequested>();

        app.add_systems(
            FixedUpdate,
            (
                // Фаза 1: приземление
                resolve_grounding,
                // Фаза 2: behavior FSM (perception + намерения огня)
                behavior_tick,
                // Фаза 3: огонь (игрок, затем AI)
                resolve_player_fire,
                resolve_fire_intents,
                // Фаза 4: патроны и перезарядка
                apply_reload_intents,
                update_weapon_ammo,
                // Фаза 5: переключение оружия (строго после огня)
                process_switch_intents,
                advance_weapon_switch,
                // Фаза 6: урон и смерть
                apply_projectile_hits,
                apply_kill_intents,
                apply_heal_intents,
                handle_death,
                watch_player_death,
                request_enemy_respawn,
                tick_despawn,
                // Фаза 7: перемещение и анимация
                integrate_nav_velocity,
                sync_walk_animation,
                sync_landing_animation,
                // Фаза 8: защёлка фронта кнопки огня
                latch_fire_input,
            )
                .chain(),
        );
    }
}

/// Headless приложение с ручным тиком: один `app.update()` = ровно один
/// FixedUpdate тик (ManualDuration равен периоду Fixed)
pub fn create_headless_app(seed: u64) -> App {
    logger::init_logger();

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(SIM_TICK))
        .insert_resource(DeterministicRng::new(seed))
        .add_plugins(SimulationPlugin);
    app
}

/// Байтовый снапшот состояния мира для сравнения прогонов.
/// Сортировка по entity index даёт стабильный порядок.
pub fn world_snapshot(world: &mut World) -> Vec<u8> {
    let mut entries: Vec<(u32, Vec3, f32, String)> = world
        .query::<(Entity, &Transform, &Health, Option<&BehaviorState>)>()
        .iter(world)
        .map(|(entity, transform, health, state)| {
            (
                entity.index(),
                transform.translation,
                health.current,
                format!("{:?}", state),
            )
        })
        .collect();
    entries.sort_by_key(|(index, ..)| *index);

    let mut bytes = Vec::new();
    for (index, position, health, state) in entries {
        bytes.extend_from_slice(&index.to_le_bytes());
        for value in [position.x, position.y, position.z, health] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(state.as_bytes());
    }
    bytes
}
