//! World: the single owner of every live entity
//!
//! Holds players, bullets, blocks and power-ups keyed by id, the arena, and
//! the spatial index the simulation rebuilds each tick. Lookups and removals
//! by a missing id are no-ops; a disconnect racing a tick is expected.

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::game::constants::bullet::TRIPLE_SHOT_SPREAD;
use crate::game::spatial::SpatialIndex;
use crate::game::state::{
    Arena, Block, Bullet, EntityId, Millis, Player, PlayerId, PowerUp, PowerUpKind,
};
use crate::game::systems::collision::circles_overlap;
use crate::util::vec2::Vec2;

/// Attempts to find a spawn point clear of blocks and players before
/// accepting an overlapping one
const MAX_SPAWN_ATTEMPTS: u32 = 30;

/// Bullets created by one shot (one, or three for a triple shot)
pub type ShotBullets = SmallVec<[Bullet; 3]>;

/// Player admission errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Server full ({0} players)")]
    ServerFull(usize),
    #[error("Player already joined")]
    AlreadyJoined,
}

/// Entities introduced by one `update_spawns` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnReport {
    pub blocks: usize,
    pub power_ups: usize,
}

/// Canonical world state
pub struct World {
    config: SimulationConfig,
    pub arena: Arena,
    pub players: HashMap<PlayerId, Player>,
    pub bullets: HashMap<EntityId, Bullet>,
    pub blocks: HashMap<EntityId, Block>,
    pub power_ups: HashMap<EntityId, PowerUp>,
    /// Rebuilt per collision sub-phase; contents are only valid right after
    /// a rebuild
    pub spatial: SpatialIndex,
    next_entity_id: EntityId,
    rng: StdRng,
    last_block_spawn: Millis,
    last_power_up_spawn: Millis,
}

impl World {
    /// Create a world with its clock at 0 and the initial blocks placed
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let arena = Arena::new(config.arena.initial_size, config.arena.interval_ms);
        let spatial = SpatialIndex::new(config.cell_size);
        let initial_blocks = config.spawn.initial_blocks.min(config.spawn.max_blocks);

        let mut world = Self {
            config,
            arena,
            players: HashMap::new(),
            bullets: HashMap::new(),
            blocks: HashMap::new(),
            power_ups: HashMap::new(),
            spatial,
            next_entity_id: 1,
            rng,
            last_block_spawn: 0,
            last_power_up_spawn: 0,
        };
        for _ in 0..initial_blocks {
            world.spawn_block();
        }
        world
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Restart schedule timers relative to `now`
    pub fn reset_clock(&mut self, now: Millis) {
        self.arena.next_resize_at = now + self.config.arena.interval_ms;
        self.last_block_spawn = now;
        self.last_power_up_spawn = now;
    }

    /// Generate a new unique entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    // ========================================================================
    // Players
    // ========================================================================

    /// Admit a player at a spawn position with the invulnerability window open
    pub fn add_player(&mut self, id: PlayerId, name: String, now: Millis) -> Result<Vec2, JoinError> {
        if self.players.contains_key(&id) {
            return Err(JoinError::AlreadyJoined);
        }
        if self.players.len() >= self.config.spawn.max_players {
            return Err(JoinError::ServerFull(self.players.len()));
        }

        let mut player = Player::new(id, name, self.config.player_max_hp, self.config.player_radius);
        player.position = self.safe_spawn_position(self.config.player_radius);
        player.invulnerable_until = now + self.config.respawn_invulnerability_ms;
        let position = player.position;
        self.players.insert(id, player);
        Ok(position)
    }

    /// Remove a player (disconnect). Their bullets stay in flight.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.alive)
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    /// Player ids in ascending order, for deterministic iteration
    pub fn sorted_player_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.players.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    // ========================================================================
    // Bullets
    // ========================================================================

    /// Spawn the bullets of one shot
    ///
    /// A triple shot fans three bullets at -15°, 0° and +15° around `angle`.
    /// Returns copies of the created bullets; empty when the owner is missing
    /// or dead, truncated when the live bullet cap is reached.
    pub fn add_bullet(
        &mut self,
        owner_id: PlayerId,
        x: f32,
        z: f32,
        angle: f32,
        is_triple_shot: bool,
        now: Millis,
    ) -> ShotBullets {
        let mut created = ShotBullets::new();
        match self.players.get(&owner_id) {
            Some(owner) if owner.alive => {}
            _ => return created,
        }

        let offsets: &[f32] = if is_triple_shot {
            &[-TRIPLE_SHOT_SPREAD, 0.0, TRIPLE_SHOT_SPREAD]
        } else {
            &[0.0]
        };

        for &offset in offsets {
            if self.bullets.len() >= self.config.spawn.max_bullets {
                debug!("Bullet cap {} reached, dropping shot", self.config.spawn.max_bullets);
                break;
            }
            let id = self.next_entity_id();
            let bullet = Bullet {
                id,
                owner_id,
                position: Vec2::new(x, z),
                velocity: Vec2::from_heading(angle + offset) * self.config.bullet_speed,
                damage: self.config.bullet_damage,
                radius: self.config.bullet_radius,
                created_at: now,
            };
            self.bullets.insert(id, bullet.clone());
            created.push(bullet);
        }
        created
    }

    /// Idempotent; removing a missing id is a no-op
    pub fn remove_bullet(&mut self, id: EntityId) -> Option<Bullet> {
        self.bullets.remove(&id)
    }

    // ========================================================================
    // Blocks and power-ups
    // ========================================================================

    /// Place a block at a free random position, ignoring the live cap
    pub fn spawn_block(&mut self) -> EntityId {
        let size = self.config.spawn.block_size;
        let destructible = self.rng.gen_bool(self.config.spawn.destructible_ratio.clamp(0.0, 1.0));
        let position = self.safe_spawn_position(size * 0.5);
        self.insert_block(position, destructible)
    }

    /// Insert a block at an explicit position
    pub fn insert_block(&mut self, position: Vec2, destructible: bool) -> EntityId {
        let id = self.next_entity_id();
        self.blocks.insert(
            id,
            Block {
                id,
                position,
                hp: self.config.spawn.block_hp,
                destructible,
                size: self.config.spawn.block_size,
            },
        );
        id
    }

    /// Idempotent; removing a missing id is a no-op
    pub fn remove_block(&mut self, id: EntityId) -> Option<Block> {
        self.blocks.remove(&id)
    }

    /// Place a power-up of a random kind at a free random position
    pub fn spawn_power_up(&mut self, now: Millis) -> EntityId {
        let kind = PowerUpKind::ALL[self.rng.gen_range(0..PowerUpKind::ALL.len())];
        let position = self.safe_spawn_position(self.config.spawn.power_up_radius);
        self.insert_power_up(position, kind, now)
    }

    /// Insert a power-up at an explicit position
    pub fn insert_power_up(&mut self, position: Vec2, kind: PowerUpKind, now: Millis) -> EntityId {
        let id = self.next_entity_id();
        self.power_ups.insert(
            id,
            PowerUp {
                id,
                position,
                kind,
                radius: self.config.spawn.power_up_radius,
                created_at: now,
            },
        );
        id
    }

    /// Idempotent; removing a missing id is a no-op
    pub fn remove_power_up(&mut self, id: EntityId) -> Option<PowerUp> {
        self.power_ups.remove(&id)
    }

    // ========================================================================
    // Spawn positions
    // ========================================================================

    /// Uniform-random position inside the arena minus the wall margin
    pub fn random_spawn_position(&mut self) -> Vec2 {
        let limit = self.arena.half_size() - self.config.wall_margin;
        if !(limit > 0.0) {
            return Vec2::ZERO;
        }
        Vec2::new(
            self.rng.gen_range(-limit..=limit),
            self.rng.gen_range(-limit..=limit),
        )
    }

    /// Random spawn position that avoids blocks and living players when it can
    fn safe_spawn_position(&mut self, radius: f32) -> Vec2 {
        let mut candidate = self.random_spawn_position();
        for _ in 0..MAX_SPAWN_ATTEMPTS {
            if self.is_clear(candidate, radius) {
                return candidate;
            }
            candidate = self.random_spawn_position();
        }
        candidate
    }

    fn is_clear(&self, position: Vec2, radius: f32) -> bool {
        let blocked_by_block = self
            .blocks
            .values()
            .any(|b| circles_overlap(position, radius, b.position, b.half_extent()));
        let blocked_by_player = self
            .alive_players()
            .any(|p| circles_overlap(position, radius, p.position, p.radius));
        !blocked_by_block && !blocked_by_player
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Introduce blocks and power-ups on their spawn intervals, under the
    /// per-kind live caps
    pub fn update_spawns(&mut self, now: Millis) -> SpawnReport {
        let mut report = SpawnReport::default();
        let spawn = &self.config.spawn;
        let (block_interval, power_up_interval) = (spawn.block_interval_ms, spawn.power_up_interval_ms);
        let (max_blocks, max_power_ups) = (spawn.max_blocks, spawn.max_power_ups);

        if now.saturating_sub(self.last_block_spawn) >= block_interval {
            self.last_block_spawn = now;
            if self.blocks.len() < max_blocks {
                self.spawn_block();
                report.blocks += 1;
            }
        }

        if now.saturating_sub(self.last_power_up_spawn) >= power_up_interval {
            self.last_power_up_spawn = now;
            if self.power_ups.len() < max_power_ups {
                self.spawn_power_up(now);
                report.power_ups += 1;
            }
        }

        report
    }

    /// Advance the arena resize schedule
    ///
    /// Returns true when the size changed. After a resize, living players are
    /// pulled inside the new bounds and blocks or power-ups left outside are
    /// removed.
    pub fn update_arena_size(&mut self, now: Millis) -> bool {
        let schedule = &self.config.arena;
        if now < self.arena.next_resize_at || schedule.step == 0.0 {
            return false;
        }
        self.arena.next_resize_at = now + schedule.interval_ms;

        let (min, max) = (schedule.min_size, schedule.max_size);
        let mut target = (self.arena.size + schedule.step * self.arena.direction).clamp(min, max);

        if schedule.oscillate && target == self.arena.size {
            // Sitting on a bound: turn around
            self.arena.direction = -self.arena.direction;
            target = (self.arena.size + schedule.step * self.arena.direction).clamp(min, max);
        }
        if target == self.arena.size {
            return false;
        }

        let old_size = self.arena.size;
        self.arena.size = target;
        self.enforce_bounds();
        info!("Arena resized {:.0} -> {:.0}", old_size, target);
        true
    }

    /// Pull players inside the arena and cull static entities outside it
    fn enforce_bounds(&mut self) {
        let arena = self.arena.clone();
        let margin = self.config.wall_margin;
        for player in self.players.values_mut().filter(|p| p.alive) {
            player.position = arena.clamp_inside(player.position, margin);
        }
        self.blocks.retain(|_, b| arena.contains(b.position));
        self.power_ups.retain(|_, p| arena.contains(p.position));
        self.bullets.retain(|_, b| arena.contains(b.position));
    }

    /// Rebuild the spatial index over living players
    pub fn index_alive_players(&mut self) {
        self.spatial.rebuild(self.players.values().filter(|p| p.alive));
    }

    /// Rebuild the spatial index over blocks
    pub fn index_blocks(&mut self) {
        self.spatial.rebuild(self.blocks.values());
    }

    /// Rebuild the spatial index over power-ups
    pub fn index_power_ups(&mut self) {
        self.spatial.rebuild(self.power_ups.values());
    }

    /// Total live entities of every kind
    pub fn entity_count(&self) -> usize {
        self.players.len() + self.bullets.len() + self.blocks.len() + self.power_ups.len()
    }
}
