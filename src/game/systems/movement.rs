use crate::game::constants::power_up::SPEED_BOOST_MULTIPLIER;
use crate::game::state::{Arena, Millis, Player};
use crate::game::world::World;

/// Move every living player from its buffered input
///
/// Dead players are skipped entirely. Returns how many players moved.
pub fn update(world: &mut World, dt: f32, now: Millis) -> usize {
    let arena = world.arena.clone();
    let speed = world.config().player_speed;
    let margin = world.config().wall_margin;

    world
        .players
        .values_mut()
        .filter(|p| p.alive)
        .map(|player| move_player(player, &arena, speed, margin, dt, now))
        .filter(|&moved| moved)
        .count()
}

/// Integrate one player and clamp it inside the arena wall margin
///
/// Turret angle always follows the aim angle; body angle only changes while
/// moving, so an idle hull keeps its last facing.
pub fn move_player(
    player: &mut Player,
    arena: &Arena,
    base_speed: f32,
    margin: f32,
    dt: f32,
    now: Millis,
) -> bool {
    player.turret_angle = player.input.angle;

    let direction = player.input.movement_direction();
    if direction.is_zero(f32::EPSILON) {
        // Still clear an expired boost
        player.speed_boost_active(now);
        return false;
    }

    let speed = if player.speed_boost_active(now) {
        base_speed * SPEED_BOOST_MULTIPLIER
    } else {
        base_speed
    };

    player.position += direction * (speed * dt);
    player.position = arena.clamp_inside(player.position, margin);
    player.body_angle = direction.heading();
    true
}
