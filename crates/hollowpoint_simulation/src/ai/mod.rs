//! AI врагов: perception (overlap + raycast видимость) и behavior FSM

pub mod behavior;
pub mod perception;

pub use behavior::*;
pub use perception::*;
