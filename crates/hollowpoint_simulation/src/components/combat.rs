//! Боевые input/aim компоненты игрока

use bevy::prelude::*;

/// Состояние кнопки огня. `was_held` защёлкивается в конце тика,
/// чтобы `down()` видел фронт нажатия ровно один тик.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct FireInput {
    pub held: bool,
    pub was_held: bool,
}

impl FireInput {
    /// Кнопка нажата в этот тик
    pub fn down(&self) -> bool {
        self.held && !self.was_held
    }

    /// Кнопка отпущена в этот тик
    pub fn released(&self) -> bool {
        !self.held && self.was_held
    }
}

/// Точка прицеливания игрока (движок пишет её из камеры)
#[derive(Component, Debug, Clone, Copy)]
pub struct AimTarget {
    pub point: Vec3,
}

impl Default for AimTarget {
    fn default() -> Self {
        Self {
            point: Vec3::NEG_Z * 100.0,
        }
    }
}

/// Точка вылета снарядов относительно актора
#[derive(Component, Debug, Clone, Copy)]
pub struct Muzzle {
    pub offset: Vec3,
}

impl Default for Muzzle {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 1.5, 0.0),
        }
    }
}

impl Muzzle {
    pub fn world_origin(&self, transform: &Transform) -> Vec3 {
        transform.translation + self.offset
    }
}

/// Внешний override разброса (напр. разброс от бега) — применяется
/// только если больше собственного разброса оружия
#[derive(Component, Debug, Clone, Copy)]
pub struct BulletSpreadOverride(pub f32);
