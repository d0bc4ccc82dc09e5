//! Боевая подсистема: патроны/перезарядка, слоты оружия, урон, директор огня

pub mod ammo;
pub mod damage;
pub mod director;
pub mod switching;

pub use ammo::*;
pub use damage::*;
pub use director::*;
pub use switching::*;
