//! Grounding и перемещение акторов
//!
//! Актор спавнится в воздухе (Falling) и падает под удвоенной гравитацией,
//! пока capsule не коснётся земли. Переход Falling → Grounded односторонний:
//! после приземления включается nav agent и актор больше не «взлетает»,
//! прижим к земле держит постоянная stick-сила.

use bevy::prelude::*;

use crate::collaborators::{anim, AnimatorHandle, BodyHandle, NavHandle};
use crate::logger::log;

pub const GRAVITY: f32 = -9.81;

/// Фаза приземления актора
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub enum GroundingState {
    /// Падение с накоплением вертикальной скорости
    Falling { vertical_velocity: f32 },
    /// На земле, nav agent активен
    Grounded,
}

impl Default for GroundingState {
    fn default() -> Self {
        GroundingState::Falling {
            vertical_velocity: 0.0,
        }
    }
}

impl GroundingState {
    pub fn is_grounded(&self) -> bool {
        matches!(self, GroundingState::Grounded)
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct GroundingConfig {
    /// Множитель гравитации в фазе падения
    pub gravity_multiplier: f32,
    /// Постоянный прижим к земле после приземления
    pub stick_to_ground_force: f32,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            gravity_multiplier: 2.0,
            stick_to_ground_force: 10.0,
        }
    }
}

/// Актор впервые коснулся земли
#[derive(Event, Debug, Clone, Copy)]
pub struct GroundedEvent {
    pub entity: Entity,
}

/// Фаза 1: гравитация, приземление, прижим к земле
pub fn resolve_grounding(
    time: Res<Time<Fixed>>,
    mut actors: Query<(
        Entity,
        &mut GroundingState,
        &GroundingConfig,
        &mut BodyHandle,
        &mut NavHandle,
        &mut Transform,
    )>,
    mut grounded_events: EventWriter<GroundedEvent>,
) {
    let dt = time.delta_secs();

    for (entity, mut state, config, mut body, mut nav, mut transform) in actors.iter_mut() {
        match *state {
            GroundingState::Falling { vertical_velocity } => {
                let velocity = vertical_velocity + GRAVITY * config.gravity_multiplier * dt;
                let flags = body.0.move_by(Vec3::Y * velocity * dt);
                transform.translation = body.0.position();

                if flags.below || body.0.is_grounded() {
                    *state = GroundingState::Grounded;
                    nav.0.sync_position(transform.translation);
                    nav.0.set_enabled(true);
                    grounded_events.write(GroundedEvent { entity });
                    log(&format!(
                        "🛬 Actor {:?} grounded at {:.2}",
                        entity, transform.translation
                    ));
                } else {
                    *state = GroundingState::Falling {
                        vertical_velocity: velocity,
                    };
                }
            }
            GroundingState::Grounded => {
                body.0
                    .move_by(Vec3::NEG_Y * config.stick_to_ground_force * dt);
                transform.translation = body.0.position();
            }
        }
    }
}

/// Фаза перемещения: скорость nav agent'а двигает capsule
pub fn integrate_nav_velocity(
    time: Res<Time<Fixed>>,
    mut actors: Query<(
        &GroundingState,
        &mut NavHandle,
        &mut BodyHandle,
        &mut Transform,
    )>,
) {
    let dt = time.delta_secs();

    for (state, mut nav, mut body, mut transform) in actors.iter_mut() {
        if !state.is_grounded() || !nav.0.enabled() {
            continue;
        }
        nav.0.sync_position(transform.translation);
        let velocity = nav.0.velocity();
        if velocity == Vec3::ZERO {
            continue;
        }
        body.0.move_by(velocity * dt);
        transform.translation = body.0.position();
    }
}

/// Сброс airborne флага при первом касании земли
/// (устанавливается при спавне, актор начинает в воздухе)
pub fn sync_landing_animation(
    mut grounded: EventReader<GroundedEvent>,
    mut actors: Query<&mut AnimatorHandle>,
) {
    for event in grounded.read() {
        if let Ok(mut animator) = actors.get_mut(event.entity) {
            animator.0.set_bool(anim::JUMPING, false);
        }
    }
}

/// Walking flag + направление движения в локальных осях актора
pub fn sync_walk_animation(
    mut actors: Query<(&NavHandle, &Transform, &mut AnimatorHandle)>,
) {
    for (nav, transform, mut animator) in actors.iter_mut() {
        let velocity = nav.0.velocity();
        let walking = velocity.length_squared() > 0.01;
        animator.0.set_bool(anim::WALKING, walking);

        // Направление в локальном пространстве (вперёд = -Z)
        let local = transform.rotation.inverse() * velocity;
        animator.0.set_float(anim::DIR_X, local.x);
        animator.0.set_float(anim::DIR_Y, -local.z);
    }
}
