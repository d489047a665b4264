//! Collision phase of a tick
//!
//! Each sub-phase rebuilds the spatial index over the entity kind it tests
//! against, collects its removals, and applies them after the pass. Bullets,
//! players and candidates are visited in ascending id order so a replay with
//! the same seed and inputs resolves identically.

use hashbrown::HashSet;
use tracing::debug;

use crate::game::events::{EventQueue, SimEvent};
use crate::game::spatial::{SpatialEntityId, SpatialEntry};
use crate::game::state::{Arena, Block, EntityId, Millis, Player, PlayerId};
use crate::game::systems::collision::{circles_overlap, hits, pushback_axes};
use crate::util::vec2::Vec2;
use crate::game::world::World;

/// Per-tick collision counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionReport {
    pub player_hits: usize,
    pub kills: usize,
    pub block_hits: usize,
    pub blocks_destroyed: usize,
    pub power_ups_collected: usize,
    pub pushbacks: usize,
}

/// Run all four sub-phases in order
pub fn resolve(world: &mut World, now: Millis, events: &mut EventQueue) -> CollisionReport {
    let mut report = CollisionReport::default();
    let mut scratch: Vec<SpatialEntry> = Vec::new();

    bullets_vs_players(world, now, events, &mut scratch, &mut report);
    bullets_vs_blocks(world, events, &mut scratch, &mut report);
    players_vs_power_ups(world, now, events, &mut scratch, &mut report);
    players_vs_blocks(world, &mut report);

    if report != CollisionReport::default() {
        debug!("Collisions: {:?}", report);
    }
    report
}

fn sorted_bullet_ids(world: &World) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = world.bullets.keys().copied().collect();
    ids.sort_unstable();
    ids
}

/// Player ids from a query result, ascending
fn player_candidates(entries: &[SpatialEntry]) -> Vec<PlayerId> {
    let mut ids: Vec<PlayerId> = entries
        .iter()
        .filter_map(|e| match e.id {
            SpatialEntityId::Player(id) => Some(id),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids
}

/// Entity ids from a query result, ascending
fn entity_candidates(entries: &[SpatialEntry]) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = entries
        .iter()
        .filter_map(|e| match e.id {
            SpatialEntityId::Block(id) | SpatialEntityId::PowerUp(id) => Some(id),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids
}

/// Bullets damage the first living, vulnerable non-owner they overlap
fn bullets_vs_players(
    world: &mut World,
    now: Millis,
    events: &mut EventQueue,
    scratch: &mut Vec<SpatialEntry>,
    report: &mut CollisionReport,
) {
    world.index_alive_players();
    let reach_pad = world.config().player_radius;
    let kill_score = world.config().kill_score;
    let mut consumed: Vec<EntityId> = Vec::new();

    for bullet_id in sorted_bullet_ids(world) {
        let Some(bullet) = world.bullets.get(&bullet_id).cloned() else {
            continue;
        };
        world.spatial.query_into(
            bullet.position.x,
            bullet.position.z,
            bullet.radius + reach_pad,
            scratch,
        );

        for target_id in player_candidates(scratch) {
            if target_id == bullet.owner_id {
                continue;
            }
            let Some(target) = world.get_player_mut(target_id) else {
                continue;
            };
            if !target.alive || target.is_invulnerable(now) || !hits(&bullet, &*target) {
                continue;
            }

            let died = target.take_damage(bullet.damage);
            consumed.push(bullet_id);
            report.player_hits += 1;

            if died {
                report.kills += 1;
                if let Some(shooter) = world.get_player_mut(bullet.owner_id) {
                    shooter.kills += 1;
                    shooter.score += kill_score;
                }
                events.push(SimEvent::PlayerDeath {
                    target_id,
                    shooter_id: bullet.owner_id,
                });
            } else {
                events.push(SimEvent::PlayerHit {
                    target_id,
                    shooter_id: bullet.owner_id,
                    damage: bullet.damage,
                });
            }
            break;
        }
    }

    for id in consumed {
        world.remove_bullet(id);
    }
}

/// Bullets stop at the first block they overlap; destructible blocks take
/// the damage
fn bullets_vs_blocks(
    world: &mut World,
    events: &mut EventQueue,
    scratch: &mut Vec<SpatialEntry>,
    report: &mut CollisionReport,
) {
    if world.blocks.is_empty() || world.bullets.is_empty() {
        return;
    }
    world.index_blocks();
    let reach_pad = world.config().spawn.block_size * 0.5;
    let mut consumed: Vec<EntityId> = Vec::new();
    let mut destroyed: HashSet<EntityId> = HashSet::new();

    for bullet_id in sorted_bullet_ids(world) {
        let Some(bullet) = world.bullets.get(&bullet_id).cloned() else {
            continue;
        };
        world.spatial.query_into(
            bullet.position.x,
            bullet.position.z,
            bullet.radius + reach_pad,
            scratch,
        );

        for block_id in entity_candidates(scratch) {
            if destroyed.contains(&block_id) {
                continue;
            }
            let Some(block) = world.blocks.get_mut(&block_id) else {
                continue;
            };
            if !hits(&bullet, &*block) {
                continue;
            }

            consumed.push(bullet_id);
            report.block_hits += 1;
            if block.take_damage(bullet.damage) {
                destroyed.insert(block_id);
                events.push(SimEvent::BlockDestroyed { block_id });
            }
            break;
        }
    }

    for id in consumed {
        world.remove_bullet(id);
    }
    let mut destroyed: Vec<EntityId> = destroyed.into_iter().collect();
    destroyed.sort_unstable();
    for id in destroyed {
        world.remove_block(id);
        report.blocks_destroyed += 1;
    }
}

/// Living players collect every power-up they overlap
fn players_vs_power_ups(
    world: &mut World,
    now: Millis,
    events: &mut EventQueue,
    scratch: &mut Vec<SpatialEntry>,
    report: &mut CollisionReport,
) {
    if world.power_ups.is_empty() {
        return;
    }
    world.index_power_ups();
    let reach_pad = world.config().spawn.power_up_radius;
    let mut collected: HashSet<EntityId> = HashSet::new();

    for player_id in world.sorted_player_ids() {
        let Some(player) = world.players.get(&player_id) else {
            continue;
        };
        if !player.alive {
            continue;
        }
        world.spatial.query_into(
            player.position.x,
            player.position.z,
            player.radius + reach_pad,
            scratch,
        );

        for power_up_id in entity_candidates(scratch) {
            if collected.contains(&power_up_id) {
                continue;
            }
            let (Some(power_up), Some(player)) =
                (world.power_ups.get(&power_up_id), world.players.get_mut(&player_id))
            else {
                continue;
            };
            if !hits(&*player, power_up) {
                continue;
            }

            player.apply_power_up(power_up.kind, now);
            collected.insert(power_up_id);
            report.power_ups_collected += 1;
            events.push(SimEvent::PowerUpCollected {
                player_id,
                kind: power_up.kind,
            });
        }
    }

    for id in collected {
        world.remove_power_up(id);
    }
}

/// Push every living player out of every block it overlaps
///
/// Exhaustive over all pairs rather than index-filtered. The result is
/// clamped to the wall margin so a block against the wall cannot push a
/// player out of the arena.
fn players_vs_blocks(world: &mut World, report: &mut CollisionReport) {
    if world.blocks.is_empty() {
        return;
    }
    let arena = world.arena.clone();
    let margin = world.config().wall_margin;
    let mut block_ids: Vec<EntityId> = world.blocks.keys().copied().collect();
    block_ids.sort_unstable();

    for player_id in world.sorted_player_ids() {
        let Some(player) = world.players.get_mut(&player_id) else {
            continue;
        };
        if !player.alive {
            continue;
        }
        for block_id in &block_ids {
            let Some(block) = world.blocks.get(block_id) else {
                continue;
            };
            if let Some(axes) = pushback_axes(player, block) {
                player.position = settle_inside(player, block, axes, &arena, margin);
                report.pushbacks += 1;
            }
        }
    }
}

/// First clamped pushback that clears the block, else the clamped least one
fn settle_inside(
    player: &Player,
    block: &Block,
    axes: [Vec2; 2],
    arena: &Arena,
    margin: f32,
) -> Vec2 {
    let start = player.position;
    axes.iter()
        .map(|push| arena.clamp_inside(start + *push, margin))
        .find(|candidate| {
            !circles_overlap(*candidate, player.radius, block.position, block.half_extent())
        })
        .unwrap_or_else(|| arena.clamp_inside(start + axes[0], margin))
}
