//! Read-only copies of world state for the transport layer
//!
//! Snapshots own their data; nothing in them borrows from the world. Every
//! list is sorted by id so two snapshots of the same state compare equal.

use serde::{Deserialize, Serialize};

use crate::game::state::{Block, Bullet, EntityId, Millis, Player, PlayerId, PowerUp, PowerUpKind};
use crate::game::world::World;
use crate::util::vec2::Vec2;

/// Full world state at the end of a tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub arena_size: f32,
    pub players: Vec<PlayerSnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub blocks: Vec<BlockSnapshot>,
    pub power_ups: Vec<PowerUpSnapshot>,
    /// Total players in the world (before any area filtering)
    #[serde(default)]
    pub total_players: u32,
    #[serde(default)]
    pub total_alive: u32,
}

impl WorldSnapshot {
    pub fn from_world(world: &World, tick: u64, now: Millis) -> Self {
        let mut players: Vec<PlayerSnapshot> = world
            .players
            .values()
            .map(|p| PlayerSnapshot::from_player(p, now))
            .collect();
        players.sort_unstable_by_key(|p| p.id);

        let mut bullets: Vec<BulletSnapshot> =
            world.bullets.values().map(BulletSnapshot::from_bullet).collect();
        bullets.sort_unstable_by_key(|b| b.id);

        let mut blocks: Vec<BlockSnapshot> =
            world.blocks.values().map(BlockSnapshot::from_block).collect();
        blocks.sort_unstable_by_key(|b| b.id);

        let mut power_ups: Vec<PowerUpSnapshot> = world
            .power_ups
            .values()
            .map(PowerUpSnapshot::from_power_up)
            .collect();
        power_ups.sort_unstable_by_key(|p| p.id);

        Self {
            tick,
            arena_size: world.arena.size,
            total_players: players.len() as u32,
            total_alive: world.alive_count() as u32,
            players,
            bullets,
            blocks,
            power_ups,
        }
    }

    /// Copy restricted to entities within `radius` of `center`
    ///
    /// The observer is always kept, even when dead or outside the radius.
    /// Totals still describe the whole world.
    pub fn filtered_near(&self, observer: Option<PlayerId>, center: Vec2, radius: f32) -> Self {
        let radius_sq = radius * radius;
        let near = |position: Vec2| position.distance_sq_to(center) <= radius_sq;

        Self {
            tick: self.tick,
            arena_size: self.arena_size,
            players: self
                .players
                .iter()
                .filter(|p| Some(p.id) == observer || near(p.position))
                .cloned()
                .collect(),
            bullets: self.bullets.iter().filter(|b| near(b.position)).cloned().collect(),
            blocks: self.blocks.iter().filter(|b| near(b.position)).cloned().collect(),
            power_ups: self.power_ups.iter().filter(|p| near(p.position)).cloned().collect(),
            total_players: self.total_players,
            total_alive: self.total_alive,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn entity_count(&self) -> usize {
        self.players.len() + self.bullets.len() + self.blocks.len() + self.power_ups.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub position: Vec2,
    pub body_angle: f32,
    pub turret_angle: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub alive: bool,
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,
    pub invulnerable: bool,
}

impl PlayerSnapshot {
    pub fn from_player(player: &Player, now: Millis) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            position: player.position,
            body_angle: player.body_angle,
            turret_angle: player.turret_angle,
            hp: player.hp,
            max_hp: player.max_hp,
            alive: player.alive,
            score: player.score,
            kills: player.kills,
            deaths: player.deaths,
            invulnerable: player.is_invulnerable(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub id: EntityId,
    pub owner_id: PlayerId,
    pub position: Vec2,
}

impl BulletSnapshot {
    pub fn from_bullet(bullet: &Bullet) -> Self {
        Self {
            id: bullet.id,
            owner_id: bullet.owner_id,
            position: bullet.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub hp: i32,
    pub destructible: bool,
}

impl BlockSnapshot {
    pub fn from_block(block: &Block) -> Self {
        Self {
            id: block.id,
            position: block.position,
            hp: block.hp,
            destructible: block.destructible,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpSnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub kind: PowerUpKind,
}

impl PowerUpSnapshot {
    pub fn from_power_up(power_up: &PowerUp) -> Self {
        Self {
            id: power_up.id,
            position: power_up.position,
            kind: power_up.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use uuid::Uuid;

    fn test_world() -> (World, PlayerId, PlayerId) {
        let mut config = SimulationConfig::default();
        config.seed = Some(5);
        config.spawn.initial_blocks = 0;
        let mut world = World::new(config);
        let near = Uuid::new_v4();
        let far = Uuid::new_v4();
        world.add_player(near, "Near".to_string(), 0).unwrap();
        world.add_player(far, "Far".to_string(), 0).unwrap();
        world.get_player_mut(near).unwrap().position = Vec2::new(10.0, 10.0);
        world.get_player_mut(far).unwrap().position = Vec2::new(800.0, 800.0);
        world.insert_block(Vec2::new(50.0, 0.0), true);
        world.insert_block(Vec2::new(-700.0, 0.0), false);
        world.insert_power_up(Vec2::new(0.0, 90.0), PowerUpKind::Speed, 0);
        world.add_bullet(near, 0.0, 0.0, 0.0, false, 0);
        (world, near, far)
    }

    #[test]
    fn test_snapshot_copies_everything_sorted() {
        let (world, near, _) = test_world();
        let snapshot = WorldSnapshot::from_world(&world, 42, 1_000);

        assert_eq!(snapshot.tick, 42);
        assert_eq!(snapshot.arena_size, world.arena.size);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.bullets.len(), 1);
        assert_eq!(snapshot.blocks.len(), 2);
        assert_eq!(snapshot.power_ups.len(), 1);
        assert_eq!(snapshot.total_alive, 2);
        assert!(snapshot.players.windows(2).all(|w| w[0].id < w[1].id));
        assert!(snapshot.blocks.windows(2).all(|w| w[0].id < w[1].id));
        assert!(snapshot.player(near).unwrap().invulnerable);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let (mut world, near, _) = test_world();
        let snapshot = WorldSnapshot::from_world(&world, 1, 0);
        world.get_player_mut(near).unwrap().hp = 1;
        world.blocks.clear();

        assert_eq!(snapshot.player(near).unwrap().hp, 100);
        assert_eq!(snapshot.blocks.len(), 2);
    }

    #[test]
    fn test_filtered_near_keeps_observer() {
        let (world, near, far) = test_world();
        let snapshot = WorldSnapshot::from_world(&world, 1, 0);

        let view = snapshot.filtered_near(Some(far), Vec2::ZERO, 100.0);
        assert_eq!(view.players.len(), 2);
        assert_eq!(view.blocks.len(), 1);
        assert_eq!(view.power_ups.len(), 1);
        assert_eq!(view.bullets.len(), 1);
        assert_eq!(view.total_players, 2);

        let view = snapshot.filtered_near(None, Vec2::ZERO, 100.0);
        assert_eq!(view.players.len(), 1);
        assert_eq!(view.players[0].id, near);
    }

    #[test]
    fn test_snapshot_bincode() {
        let (world, _, _) = test_world();
        let snapshot = WorldSnapshot::from_world(&world, 9, 0);
        let config = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&snapshot, config).unwrap();
        let (decoded, _): (WorldSnapshot, usize) =
            bincode::serde::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(decoded, snapshot);
    }
}
