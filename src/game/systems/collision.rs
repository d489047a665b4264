//! Geometric collision tests
//!
//! Every entity is treated as a circle: players, bullets and power-ups use
//! their configured radius, blocks use their half extent. Tests compare
//! squared distances so no square roots are taken. Nothing here mutates
//! entities or makes lifecycle decisions.

use crate::game::state::{Block, Bullet, Player, PowerUp};
use crate::util::vec2::Vec2;

/// Extra separation added to a pushback so rounding cannot leave a
/// residual overlap
pub const SEPARATION_EPSILON: f32 = 0.01;

/// Shape data for circle-circle tests
pub trait Collider {
    fn center(&self) -> Vec2;
    fn collision_radius(&self) -> f32;
}

impl Collider for Player {
    fn center(&self) -> Vec2 {
        self.position
    }
    fn collision_radius(&self) -> f32 {
        self.radius
    }
}

impl Collider for Bullet {
    fn center(&self) -> Vec2 {
        self.position
    }
    fn collision_radius(&self) -> f32 {
        self.radius
    }
}

impl Collider for PowerUp {
    fn center(&self) -> Vec2 {
        self.position
    }
    fn collision_radius(&self) -> f32 {
        self.radius
    }
}

impl Collider for Block {
    fn center(&self) -> Vec2 {
        self.position
    }
    fn collision_radius(&self) -> f32 {
        self.half_extent()
    }
}

/// Circle overlap on raw geometry; touching circles do not overlap
#[inline]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_sq_to(b) < reach * reach
}

/// Whether two colliders overlap
#[inline]
pub fn hits<A, B>(a: &A, b: &B) -> bool
where
    A: Collider + ?Sized,
    B: Collider + ?Sized,
{
    circles_overlap(a.center(), a.collision_radius(), b.center(), b.collision_radius())
}

/// Minimal translation that moves `player` out of `block`
///
/// Pushes along the axis of least penetration, away from the block center
/// (toward +x when the centers coincide). Returns `None` when they do not
/// overlap.
pub fn pushback(player: &Player, block: &Block) -> Option<Vec2> {
    pushback_axes(player, block).map(|[least, _]| least)
}

/// Both single-axis translations that separate `player` from `block`,
/// least penetration first
///
/// The second entry is the fallback when the first would cross a wall.
pub fn pushback_axes(player: &Player, block: &Block) -> Option<[Vec2; 2]> {
    if !hits(player, block) {
        return None;
    }

    let reach = player.collision_radius() + block.collision_radius();
    let delta = player.position - block.position;
    let penetration_x = reach - delta.x.abs();
    let penetration_z = reach - delta.z.abs();

    let sign = |d: f32| if d < 0.0 { -1.0 } else { 1.0 };
    let along_x = Vec2::new(sign(delta.x) * (penetration_x + SEPARATION_EPSILON), 0.0);
    let along_z = Vec2::new(0.0, sign(delta.z) * (penetration_z + SEPARATION_EPSILON));

    if penetration_x <= penetration_z {
        Some([along_x, along_z])
    } else {
        Some([along_z, along_x])
    }
}
