pub mod arena;
pub mod collision;
pub mod combat;
pub mod movement;
pub mod projectile;
