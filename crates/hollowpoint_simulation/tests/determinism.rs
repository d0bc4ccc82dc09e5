//! Детерминизм: одинаковый seed даёт побайтно одинаковое состояние мира,
//! разный seed — разное (roam точки и разброс зависят от RNG).

use bevy::ecs::system::SystemState;
use bevy::prelude::*;

use hollowpoint_simulation::collaborators::stubs::{
    DirectNav, FlatGround, HeadlessStubsPlugin, NullAnimator, NullAudio,
};
use hollowpoint_simulation::*;

fn collaborators(position: Vec3) -> ActorCollaborators {
    ActorCollaborators {
        nav: Box::new(DirectNav::new(3.5, 2.0)),
        body: Box::new(FlatGround::new(position, 0.0)),
        animator: Box::new(NullAnimator),
        audio: Box::new(NullAudio),
    }
}

/// Сценарий: пассивный игрок и два врага, 900 тиков (~15с)
fn run_scenario(seed: u64, ticks: usize) -> Vec<u8> {
    let mut app = create_headless_app(seed);
    app.add_plugins(HeadlessStubsPlugin);

    {
        let world = app.world_mut();
        let mut state = SystemState::<Commands>::new(world);
        let mut commands = state.get_mut(world);
        spawn_player(
            &mut commands,
            Vec3::new(0.0, 2.0, 0.0),
            collaborators(Vec3::new(0.0, 2.0, 0.0)),
            vec![WeaponSpec::pistol()],
            0.0,
        );
        for position in [Vec3::new(11.0, 3.0, 2.0), Vec3::new(-7.0, 3.0, -9.0)] {
            spawn_enemy(
                &mut commands,
                position,
                collaborators(position),
                vec![WeaponSpec::enemy_blaster()],
                0.0,
            );
        }
        state.apply(world);
    }

    for _ in 0..ticks {
        app.update();
    }
    world_snapshot(app.world_mut())
}

#[test]
fn test_same_seed_same_world() {
    let first = run_scenario(42, 900);
    let second = run_scenario(42, 900);
    assert_eq!(first, second);
}

#[test]
fn test_same_seed_longer_run_stays_deterministic() {
    let first = run_scenario(1337, 2400);
    let second = run_scenario(1337, 2400);
    assert_eq!(first, second);
}

#[test]
fn test_different_seed_diverges() {
    let first = run_scenario(1, 900);
    let second = run_scenario(2, 900);
    assert_ne!(first, second);
}
