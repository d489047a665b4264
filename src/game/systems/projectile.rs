//! Bullet firing and flight
//!
//! `fire` is the rate-limited shoot action used by both the explicit shoot
//! command and `wants_shoot` input. `update` integrates bullets and removes
//! the ones that expired or left the arena.

use crate::game::constants::bullet::MUZZLE_GAP;
use crate::game::state::{EntityId, Millis, Player, PlayerId};
use crate::game::world::{ShotBullets, World};
use crate::util::vec2::Vec2;

/// Whether a player may fire at `now` under the per-player cooldown
#[inline]
pub fn can_fire(player: &Player, now: Millis, cooldown_ms: Millis) -> bool {
    match player.last_shot_time {
        Some(last) => now.saturating_sub(last) >= cooldown_ms,
        None => true,
    }
}

/// Spawn point just outside the player's hull along the aim heading
#[inline]
pub fn muzzle_position(player: &Player, angle: f32, bullet_radius: f32) -> Vec2 {
    player.position + Vec2::from_heading(angle) * (player.radius + bullet_radius + MUZZLE_GAP)
}

/// Fire from a player's turret
///
/// Empty when the player is missing, dead, or still cooling down. An active
/// triple-shot window fans three bullets; an expired window is cleared.
pub fn fire(world: &mut World, player_id: PlayerId, now: Millis) -> ShotBullets {
    let cooldown = world.config().shot_cooldown_ms;
    let bullet_radius = world.config().bullet_radius;
    let arena = world.arena.clone();

    let (origin, angle, triple) = match world.get_player_mut(player_id) {
        Some(player) if player.alive && can_fire(player, now, cooldown) => {
            let angle = player.input.angle;
            player.turret_angle = angle;
            // A player hugging the wall must not fire from outside the arena
            let origin = arena.clamp_inside(muzzle_position(player, angle, bullet_radius), 0.0);
            (origin, angle, player.triple_shot_active(now))
        }
        _ => return ShotBullets::new(),
    };

    let bullets = world.add_bullet(player_id, origin.x, origin.z, angle, triple, now);
    if !bullets.is_empty() {
        if let Some(player) = world.get_player_mut(player_id) {
            player.last_shot_time = Some(now);
        }
    }
    bullets
}

/// Advance bullets by `dt` seconds and drop expired or out-of-bounds ones
///
/// Removal happens after the full pass. Returns the number removed.
pub fn update(world: &mut World, dt: f32, now: Millis) -> usize {
    let lifetime = world.config().bullet_lifetime_ms;
    let arena = world.arena.clone();

    let mut expired: Vec<EntityId> = Vec::new();
    for bullet in world.bullets.values_mut() {
        bullet.position += bullet.velocity * dt;
        if bullet.is_expired(now, lifetime) || !arena.contains(bullet.position) {
            expired.push(bullet.id);
        }
    }

    for id in &expired {
        world.remove_bullet(*id);
    }
    expired.len()
}
