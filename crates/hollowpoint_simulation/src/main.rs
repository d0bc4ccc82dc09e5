//! Headless демо ядра симуляции
//!
//! Игрок + три врага на плоской земле со stub коллабораторами: враги падают,
//! приземляются, патрулируют, находят игрока и открывают огонь; игрок
//! отстреливается по ближайшему врагу. Прогресс печатается каждые ~1.7с
//! симуляционного времени.

use bevy::prelude::*;

use hollowpoint_simulation::collaborators::stubs::{
    DirectNav, FlatGround, HeadlessStubsPlugin, NullAnimator, NullAudio,
};
use hollowpoint_simulation::logger::{log_info, set_log_level, LogLevel};
use hollowpoint_simulation::*;

fn stub_collaborators(position: Vec3, stopping_distance: f32) -> ActorCollaborators {
    ActorCollaborators {
        nav: Box::new(DirectNav::new(3.5, stopping_distance)),
        body: Box::new(FlatGround::new(position, 0.0)),
        animator: Box::new(NullAnimator),
        audio: Box::new(NullAudio),
    }
}

fn setup(mut commands: Commands) {
    let player_pos = Vec3::new(0.0, 2.0, 0.0);
    let player = spawn_player(
        &mut commands,
        player_pos,
        stub_collaborators(player_pos, 1.0),
        vec![WeaponSpec::pistol(), WeaponSpec::rifle()],
        0.0,
    );
    commands.insert_resource(SimContext { player });

    for position in [
        Vec3::new(10.0, 3.0, 0.0),
        Vec3::new(-8.0, 3.0, 6.0),
        Vec3::new(4.0, 3.0, -12.0),
    ] {
        spawn_enemy(
            &mut commands,
            position,
            stub_collaborators(position, 6.0),
            vec![WeaponSpec::enemy_blaster()],
            0.0,
        );
    }
}

/// Примитивный «игрок»: целится в ближайшего живого врага и кликает
/// по кнопке огня через тик
fn drive_player(world: &mut World, tick: u32) {
    let Some(context) = world.get_resource::<SimContext>().copied() else {
        return;
    };
    let Some(player_pos) = world
        .get::<Transform>(context.player)
        .map(|t| t.translation)
    else {
        return;
    };

    let mut nearest: Option<Vec3> = None;
    let mut best = f32::INFINITY;
    let mut enemies = world.query_filtered::<(&Transform, &Health), With<BehaviorState>>();
    for (transform, health) in enemies.iter(world) {
        if !health.is_alive() {
            continue;
        }
        let distance = transform.translation.distance_squared(player_pos);
        if distance < best {
            best = distance;
            nearest = Some(transform.translation + TARGET_CHEST_OFFSET);
        }
    }

    if let Some(point) = nearest {
        if let Some(mut aim) = world.get_mut::<AimTarget>(context.player) {
            aim.point = point;
        }
    }
    if let Some(mut input) = world.get_mut::<FireInput>(context.player) {
        input.held = nearest.is_some() && tick % 2 == 0;
    }
}

fn report(world: &mut World, tick: u32) {
    let context = world.get_resource::<SimContext>().copied();
    let player_hp = context
        .and_then(|c| world.get::<Health>(c.player))
        .map(|h| h.current)
        .unwrap_or(0.0);

    let mut enemies = world.query_filtered::<&Health, With<BehaviorState>>();
    let total = enemies.iter(world).count();
    let alive = enemies.iter(world).filter(|h| h.is_alive()).count();

    log_info(&format!(
        "⏱️ tick {}: player hp {:.1}, enemies {}/{} alive",
        tick, player_hp, alive, total
    ));
}

fn main() {
    set_log_level(LogLevel::Debug);

    let mut app = create_headless_app(42);
    app.add_plugins(HeadlessStubsPlugin);
    app.add_systems(Startup, setup);

    log_info("🎮 HOLLOWPOINT simulation core — headless demo");

    for tick in 0..900 {
        drive_player(app.world_mut(), tick);
        app.update();
        if tick % 100 == 0 {
            report(app.world_mut(), tick);
        }
    }
    report(app.world_mut(), 900);
    log_info("🏁 Demo finished");
}
