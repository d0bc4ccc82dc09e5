//! Интеграционные тесты полного боевого цикла на headless стеке:
//! падение → приземление → патруль → захват цели → огонь → урон → смерть.

use bevy::ecs::system::SystemState;
use bevy::prelude::*;

use hollowpoint_simulation::collaborators::anim;
use hollowpoint_simulation::collaborators::stubs::{
    DirectNav, FlatGround, HeadlessStubsPlugin, NullAudio, RecordingAnimator, StubWorld,
};
use hollowpoint_simulation::*;

fn test_app(seed: u64) -> App {
    let mut app = create_headless_app(seed);
    app.add_plugins(HeadlessStubsPlugin);
    app
}

fn collaborators(position: Vec3, stopping_distance: f32) -> ActorCollaborators {
    ActorCollaborators {
        nav: Box::new(DirectNav::new(3.5, stopping_distance)),
        body: Box::new(FlatGround::new(position, 0.0)),
        animator: Box::new(RecordingAnimator::new()),
        audio: Box::new(NullAudio),
    }
}

fn spawn_enemy_at(app: &mut App, position: Vec3, weapons: Vec<WeaponSpec>) -> Entity {
    let world = app.world_mut();
    let mut state = SystemState::<Commands>::new(world);
    let mut commands = state.get_mut(world);
    let entity = spawn_enemy(&mut commands, position, collaborators(position, 6.0), weapons, 0.0);
    state.apply(world);
    entity
}

fn spawn_player_at(app: &mut App, position: Vec3, weapons: Vec<WeaponSpec>) -> Entity {
    let world = app.world_mut();
    let mut state = SystemState::<Commands>::new(world);
    let mut commands = state.get_mut(world);
    let entity =
        spawn_player(&mut commands, position, collaborators(position, 1.0), weapons, 0.0);
    state.apply(world);
    entity
}

fn tick(app: &mut App, count: usize) {
    for _ in 0..count {
        app.update();
    }
}

#[test]
fn test_enemy_falls_and_lands() {
    let mut app = test_app(1);
    let enemy = spawn_enemy_at(&mut app, Vec3::new(0.0, 5.0, 0.0), vec![]);

    // Сразу после спавна — падение
    assert!(!app
        .world()
        .get::<GroundingState>(enemy)
        .unwrap()
        .is_grounded());

    // Падение с 5м под удвоенной гравитацией занимает меньше секунды
    tick(&mut app, 120);

    let state = app.world().get::<GroundingState>(enemy).unwrap();
    assert!(state.is_grounded());
    let transform = app.world().get::<Transform>(enemy).unwrap();
    assert!(transform.translation.y.abs() < 0.01);
}

#[test]
fn test_grounded_enemy_starts_roaming() {
    let mut app = test_app(3);
    let enemy = spawn_enemy_at(&mut app, Vec3::new(0.0, 2.0, 0.0), vec![]);

    // Даём время приземлиться и выбрать точку патруля
    let mut max_displacement = 0.0_f32;
    for _ in 0..600 {
        app.update();
        let translation = app.world().get::<Transform>(enemy).unwrap().translation;
        max_displacement = max_displacement.max(Vec2::new(translation.x, translation.z).length());
    }

    assert_eq!(
        *app.world().get::<BehaviorState>(enemy).unwrap(),
        BehaviorState::Roam
    );
    assert!(
        max_displacement > 0.5,
        "enemy never left spawn point: {}",
        max_displacement
    );
}

#[test]
fn test_enemy_engages_and_kills_player() {
    let mut app = test_app(7);
    let player = spawn_player_at(&mut app, Vec3::new(0.0, 2.0, 0.0), vec![]);
    let enemy = spawn_enemy_at(
        &mut app,
        Vec3::new(10.0, 3.0, 0.0),
        vec![WeaponSpec::enemy_blaster()],
    );

    // Захват цели происходит вскоре после приземления
    tick(&mut app, 300);
    assert!(matches!(
        app.world().get::<BehaviorState>(enemy).unwrap(),
        BehaviorState::Engage { .. }
    ));
    assert_eq!(
        app.world().get::<TargetHandle>(enemy).unwrap().target,
        Some(player)
    );

    // Бластер: 8 урона каждые 0.5с — 100 hp кончатся за ~7с
    tick(&mut app, 1500);

    let health = app.world().get::<Health>(player).unwrap();
    assert!(!health.is_alive(), "player survived: {:.1}", health.current);
    assert_eq!(health.current, 0.0);

    // Потеряв мёртвую цель, враг возвращается в патруль
    tick(&mut app, 10);
    assert_eq!(
        *app.world().get::<BehaviorState>(enemy).unwrap(),
        BehaviorState::Roam
    );
    assert_eq!(app.world().get::<TargetHandle>(enemy).unwrap().target, None);
}

#[test]
fn test_blocked_sight_times_out_back_to_roam() {
    let mut app = test_app(31);
    let player = spawn_player_at(&mut app, Vec3::new(0.0, 2.0, 0.0), vec![]);
    let enemy = spawn_enemy_at(
        &mut app,
        Vec3::new(10.0, 3.0, 0.0),
        vec![WeaponSpec::enemy_blaster()],
    );

    tick(&mut app, 300);
    assert!(matches!(
        app.world().get::<BehaviorState>(enemy).unwrap(),
        BehaviorState::Engage { .. }
    ));

    // Стена между врагом и игроком: лучи дистанций (маска акторов) проходят,
    // line of sight перекрыта
    let occluder = app.world_mut().spawn_empty().id();
    let stub = app.world().resource::<StubWorld>().0.clone();
    stub.upsert_collider(
        occluder,
        Vec3::new(3.0, 1.2, 0.0),
        2.5,
        LayerMask::OBSTACLES,
    );

    // Таймер потери цели 3.0с (180 тиков): до истечения враг держит цель
    tick(&mut app, 170);
    assert!(matches!(
        app.world().get::<BehaviorState>(enemy).unwrap(),
        BehaviorState::Engage { .. }
    ));
    assert_eq!(
        app.world().get::<TargetHandle>(enemy).unwrap().target,
        Some(player)
    );
    // Вслепую враг не стреляет
    assert!(app.world().get::<Health>(player).unwrap().is_alive());

    // Сразу после таймаута — Roam с очищенным handle
    tick(&mut app, 20);
    assert_eq!(
        *app.world().get::<BehaviorState>(enemy).unwrap(),
        BehaviorState::Roam
    );
    assert_eq!(app.world().get::<TargetHandle>(enemy).unwrap().target, None);
}

#[test]
fn test_landing_clears_airborne_flag() {
    let mut app = test_app(41);
    let animator = RecordingAnimator::new();
    let position = Vec3::new(0.0, 4.0, 0.0);
    let collab = ActorCollaborators {
        nav: Box::new(DirectNav::new(3.5, 2.0)),
        body: Box::new(FlatGround::new(position, 0.0)),
        animator: Box::new(animator.clone()),
        audio: Box::new(NullAudio),
    };

    let world = app.world_mut();
    let mut state = SystemState::<Commands>::new(world);
    let mut commands = state.get_mut(world);
    spawn_enemy(&mut commands, position, collab, vec![], 0.0);
    state.apply(world);

    // В воздухе с момента спавна
    assert_eq!(animator.get_bool(anim::JUMPING), Some(true));

    tick(&mut app, 120);
    assert_eq!(animator.get_bool(anim::JUMPING), Some(false));
}

#[test]
fn test_kill_intent_despawns_corpse() {
    let mut app = test_app(11);
    let enemy = spawn_enemy_at(
        &mut app,
        Vec3::new(0.0, 2.0, 0.0),
        vec![WeaponSpec::enemy_blaster()],
    );
    tick(&mut app, 120);

    // Подранок: kill всё равно репортит полный максимум как урон
    app.world_mut()
        .get_mut::<Health>(enemy)
        .unwrap()
        .damage(25.0);
    app.world_mut().send_event(KillIntent { entity: enemy });
    tick(&mut app, 1);

    let dealt: Vec<f32> = app
        .world()
        .resource::<Events<DamageDealt>>()
        .iter_current_update_events()
        .map(|d| d.damage)
        .collect();
    assert_eq!(dealt, vec![100.0]);

    let health = app.world().get::<Health>(enemy).unwrap();
    assert!(!health.is_alive());
    assert!(matches!(
        app.world().get::<BehaviorState>(enemy).unwrap(),
        BehaviorState::Dead { .. }
    ));

    // Повторный KillIntent по трупу — no-op
    app.world_mut().send_event(KillIntent { entity: enemy });
    tick(&mut app, 1);

    // Despawn через 2 секунды
    tick(&mut app, 130);
    assert!(app.world().get_entity(enemy).is_err());
}

#[test]
fn test_heal_clamps_and_skips_dead() {
    let mut app = test_app(13);
    let player = spawn_player_at(&mut app, Vec3::new(0.0, 2.0, 0.0), vec![]);
    tick(&mut app, 60);

    app.world_mut()
        .get_mut::<Health>(player)
        .unwrap()
        .damage(30.0);
    app.world_mut().send_event(HealIntent {
        entity: player,
        amount: 100.0,
    });
    tick(&mut app, 1);
    assert_eq!(app.world().get::<Health>(player).unwrap().current, 100.0);

    app.world_mut().send_event(KillIntent { entity: player });
    tick(&mut app, 1);
    app.world_mut().send_event(HealIntent {
        entity: player,
        amount: 50.0,
    });
    tick(&mut app, 1);
    // Лечение трупа не воскрешает
    let health = app.world().get::<Health>(player).unwrap();
    assert_eq!(health.current, 0.0);
    assert!(!health.is_alive());
}

#[test]
fn test_player_fire_consumes_ammo_and_reloads() {
    let mut app = test_app(17);
    let player = spawn_player_at(
        &mut app,
        Vec3::new(0.0, 2.0, 0.0),
        vec![WeaponSpec::pistol()],
    );

    // Приземление + подъём оружия (switch_delay игрока 1.0с)
    tick(&mut app, 120);
    assert_eq!(
        app.world().get::<WeaponSlots>(player).unwrap().switch_state,
        SwitchState::Up
    );

    // Одиночный клик
    app.world_mut().get_mut::<FireInput>(player).unwrap().held = true;
    tick(&mut app, 1);
    app.world_mut().get_mut::<FireInput>(player).unwrap().held = false;
    // Пауза больше delay_between_shots пистолета (0.3с)
    tick(&mut app, 30);

    let slots = app.world().get::<WeaponSlots>(player).unwrap();
    let weapon = slots.active_weapon().unwrap();
    assert_eq!(weapon.ammo.current_ammo, 11.0);

    // Manual: удержание не даёт очередь
    app.world_mut().get_mut::<FireInput>(player).unwrap().held = true;
    tick(&mut app, 60);
    let slots = app.world().get::<WeaponSlots>(player).unwrap();
    assert_eq!(slots.active_weapon().unwrap().ammo.current_ammo, 10.0);
    app.world_mut().get_mut::<FireInput>(player).unwrap().held = false;

    // Ручная перезарядка: оружие снято с боя, потом магазин полон
    app.world_mut().send_event(ReloadIntent { entity: player });
    tick(&mut app, 2);
    let slots = app.world().get::<WeaponSlots>(player).unwrap();
    assert!(slots.active_weapon().unwrap().ammo.is_reloading());

    tick(&mut app, 90); // 1.2с перезарядки пистолета
    let slots = app.world().get::<WeaponSlots>(player).unwrap();
    let weapon = slots.active_weapon().unwrap();
    assert!(!weapon.ammo.is_reloading());
    assert_eq!(weapon.ammo.current_ammo, 12.0);
}

#[test]
fn test_weapon_switch_blocks_fire_until_raised() {
    let mut app = test_app(19);
    let player = spawn_player_at(
        &mut app,
        Vec3::new(0.0, 2.0, 0.0),
        vec![WeaponSpec::pistol(), WeaponSpec::rifle()],
    );
    tick(&mut app, 120);

    app.world_mut().send_event(SwitchWeaponIntent {
        entity: player,
        ascending: true,
    });
    tick(&mut app, 1);
    assert_eq!(
        app.world().get::<WeaponSlots>(player).unwrap().switch_state,
        SwitchState::PutDownPrevious
    );

    // Пока оружие в пути, нажатия не тратят патроны
    app.world_mut().get_mut::<FireInput>(player).unwrap().held = true;
    tick(&mut app, 30);
    app.world_mut().get_mut::<FireInput>(player).unwrap().held = false;

    // Полный цикл: опустить (1с) + поднять (1с)
    tick(&mut app, 120);
    let slots = app.world().get::<WeaponSlots>(player).unwrap();
    assert_eq!(slots.switch_state, SwitchState::Up);
    assert_eq!(slots.active_index(), Some(1));
    assert_eq!(slots.active_weapon().unwrap().spec.name, "Rifle");
    assert_eq!(
        slots.active_weapon().unwrap().ammo.current_ammo,
        WeaponSpec::rifle().max_ammo
    );
}

#[test]
fn test_enemy_death_requests_respawn_in_volume() {
    let mut app = test_app(29);
    app.insert_resource(SpawnVolume {
        origin: Vec3::new(20.0, 0.0, 20.0),
        half_extents: Vec2::new(5.0, 5.0),
        drop_height: 3.0,
    });
    let enemy = spawn_enemy_at(
        &mut app,
        Vec3::new(0.0, 2.0, 0.0),
        vec![WeaponSpec::enemy_blaster()],
    );
    tick(&mut app, 120);

    app.world_mut().send_event(KillIntent { entity: enemy });
    tick(&mut app, 1);

    let requests = app.world().resource::<Events<RespawnRequested>>();
    let positions: Vec<Vec3> = requests
        .iter_current_update_events()
        .map(|r| r.position)
        .collect();
    assert_eq!(positions.len(), 1);
    assert!((positions[0].x - 20.0).abs() <= 5.0);
    assert!((positions[0].z - 20.0).abs() <= 5.0);
    assert_eq!(positions[0].y, 3.0);
}

#[test]
fn test_health_and_ammo_invariants_hold_every_tick() {
    let mut app = test_app(23);
    spawn_player_at(&mut app, Vec3::new(0.0, 2.0, 0.0), vec![WeaponSpec::pistol()]);
    spawn_enemy_at(
        &mut app,
        Vec3::new(12.0, 3.0, 3.0),
        vec![WeaponSpec::enemy_blaster()],
    );
    spawn_enemy_at(
        &mut app,
        Vec3::new(-9.0, 3.0, -4.0),
        vec![WeaponSpec::enemy_blaster()],
    );

    for _ in 0..2000 {
        app.update();

        let world = app.world_mut();
        let mut healths = world.query::<&Health>();
        for health in healths.iter(world) {
            assert!(health.current >= 0.0);
            assert!(health.current <= health.max);
        }
        let mut slots_query = world.query::<&WeaponSlots>();
        for slots in slots_query.iter(world) {
            if let Some(weapon) = slots.active_weapon() {
                assert!(weapon.ammo.current_ammo >= 0.0);
                assert!(weapon.ammo.current_ammo <= weapon.spec.max_ammo);
                let ratio = weapon.ammo.ammo_ratio(&weapon.spec);
                assert!((0.0..=1.0).contains(&ratio));
            }
        }
    }
}
