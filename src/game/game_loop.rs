//! One discrete simulation step
//!
//! `Simulation` owns the world, the command buffer and the event queue.
//! `tick(now)` runs the phases strictly in order: commands, movement, bullet
//! flight, power-up expiry, input-driven shooting, the collision phase, then
//! spawns and the arena schedule.

use tracing::{debug, warn};

use crate::config::SimulationConfig;
use crate::game::constants::timing::MS_PER_SECOND;
use crate::game::events::{EventQueue, SimEvent};
use crate::game::input_buffer::{Command, CommandBuffer, CommandSender};
use crate::game::snapshot::WorldSnapshot;
use crate::game::state::{Millis, PlayerId, PlayerInput};
use crate::game::systems::{arena, combat, movement, projectile};
use crate::game::world::{JoinError, ShotBullets, SpawnReport, World};
use crate::util::vec2::Vec2;

/// Counters for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickStats {
    pub tick: u64,
    pub dt: f32,
    pub commands: usize,
    pub players_alive: usize,
    pub bullets: usize,
    pub blocks: usize,
    pub power_ups: usize,
    pub bullets_fired: usize,
    pub bullets_expired: usize,
    pub power_ups_expired: usize,
    pub collisions: combat::CollisionReport,
    pub spawned: SpawnReport,
    pub arena_resized: bool,
}

pub struct Simulation {
    world: World,
    commands: CommandBuffer,
    events: EventQueue,
    tick: u64,
    last_tick: Option<Millis>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            world: World::new(config),
            commands: CommandBuffer::default(),
            events: EventQueue::new(),
            tick: 0,
            last_tick: None,
        }
    }

    /// Anchor the clock at `now`; the next tick integrates nothing
    ///
    /// Spawn and resize timers restart relative to `now`.
    pub fn start_clock(&mut self, now: Millis) {
        self.last_tick = Some(now);
        self.world.reset_clock(now);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Handle for transport tasks to submit commands
    pub fn command_sender(&self) -> CommandSender {
        self.commands.sender()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Admit a player immediately
    pub fn join(&mut self, player_id: PlayerId, name: String, now: Millis) -> Result<Vec2, JoinError> {
        match self.world.add_player(player_id, name, now) {
            Ok(position) => {
                debug!("Player {} joined at ({:.0}, {:.0})", player_id, position.x, position.z);
                Ok(position)
            }
            Err(e) => {
                warn!("Join rejected for {}: {}", player_id, e);
                Err(e)
            }
        }
    }

    /// Replace a player's input intent; missing players are ignored
    ///
    /// Call between ticks (the host does so via `apply_commands`).
    pub fn set_input(&mut self, player_id: PlayerId, input: PlayerInput) {
        if let Some(player) = self.world.get_player_mut(player_id) {
            player.input = input;
        }
    }

    /// Remove a player; their bullets stay in flight
    pub fn leave(&mut self, player_id: PlayerId) {
        if self.world.remove_player(player_id).is_some() {
            debug!("Player {} left", player_id);
        }
    }

    /// Apply every buffered command in submission order
    pub fn apply_commands(&mut self, now: Millis) -> usize {
        let commands = self.commands.drain();
        let count = commands.len();
        for command in commands {
            match command {
                Command::Join { player_id, name } => {
                    let _ = self.join(player_id, name, now);
                }
                Command::Input { player_id, input } => self.set_input(player_id, input),
                Command::Leave { player_id } => self.leave(player_id),
                Command::Shoot { player_id } => {
                    self.shoot(player_id, now);
                }
                Command::Respawn { player_id } => {
                    self.respawn(player_id, now);
                }
            }
        }
        count
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Fire for a player, rate-limited to one shot per cooldown
    ///
    /// Empty when the player is missing, dead, or cooling down.
    pub fn shoot(&mut self, player_id: PlayerId, now: Millis) -> ShotBullets {
        projectile::fire(&mut self.world, player_id, now)
    }

    /// Bring a dead player back at a fresh spawn position
    ///
    /// Resets hp, score and buffs and opens the invulnerability window.
    /// Kill and death counters persist. Returns false for a missing or living
    /// player.
    pub fn respawn(&mut self, player_id: PlayerId, now: Millis) -> bool {
        match self.world.get_player(player_id) {
            Some(player) if !player.alive => {}
            _ => return false,
        }

        let position = self.world.random_spawn_position();
        let invulnerability = self.world.config().respawn_invulnerability_ms;
        let Some(player) = self.world.get_player_mut(player_id) else {
            return false;
        };
        player.position = position;
        player.hp = player.max_hp;
        player.alive = true;
        player.score = 0;
        player.speed_boost_until = None;
        player.triple_shot_until = None;
        player.last_shot_time = None;
        player.invulnerable_until = now + invulnerability;

        debug!("Player {} respawned at ({:.0}, {:.0})", player_id, position.x, position.z);
        self.events.push(SimEvent::PlayerRespawned { player_id });
        true
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the world to `now`
    pub fn tick(&mut self, now: Millis) -> TickStats {
        self.tick += 1;
        let mut stats = TickStats {
            tick: self.tick,
            ..Default::default()
        };

        // 1. Delta time; the first tick and a clock going backwards integrate nothing
        let dt = match self.last_tick {
            Some(last) => now.saturating_sub(last) as f32 / MS_PER_SECOND,
            None => 0.0,
        };
        self.last_tick = Some(now);
        stats.dt = dt;

        stats.commands = self.apply_commands(now);

        // 2. Movement
        movement::update(&mut self.world, dt, now);

        // 3. Bullet flight
        stats.bullets_expired = projectile::update(&mut self.world, dt, now);

        // 4. Power-up expiry
        stats.power_ups_expired = arena::expire_power_ups(&mut self.world, now);

        // Held fire button
        for player_id in self.world.sorted_player_ids() {
            let wants_shoot = self
                .world
                .get_player(player_id)
                .is_some_and(|p| p.alive && p.input.wants_shoot);
            if wants_shoot {
                stats.bullets_fired += self.shoot(player_id, now).len();
            }
        }

        // 5. Collisions
        stats.collisions = combat::resolve(&mut self.world, now, &mut self.events);

        // 6. Lifecycle
        let lifecycle = arena::update(&mut self.world, now, &mut self.events);
        stats.spawned = lifecycle.spawned;
        stats.arena_resized = lifecycle.resized;

        stats.players_alive = self.world.alive_count();
        stats.bullets = self.world.bullets.len();
        stats.blocks = self.world.blocks.len();
        stats.power_ups = self.world.power_ups.len();

        self.debug_check_invariants(now);
        stats
    }

    fn debug_check_invariants(&self, now: Millis) {
        if cfg!(debug_assertions) {
            let lifetime = self.world.config().bullet_lifetime_ms;
            for bullet in self.world.bullets.values() {
                debug_assert!(!bullet.is_expired(now, lifetime), "expired bullet survived tick");
                debug_assert!(self.world.arena.contains(bullet.position), "bullet outside arena");
            }
            for player in self.world.players.values() {
                debug_assert!((0..=player.max_hp).contains(&player.hp), "hp out of range");
                debug_assert!(player.alive == (player.hp > 0), "alive flag disagrees with hp");
            }
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Take the events raised since the last drain, in order
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    /// Copy-out snapshot of the whole world
    pub fn snapshot(&self, now: Millis) -> WorldSnapshot {
        WorldSnapshot::from_world(&self.world, self.tick, now)
    }

    /// Snapshot limited to `radius` around an observer, who is always included
    ///
    /// Falls back to the arena center for an unknown observer.
    pub fn snapshot_near(&self, observer: PlayerId, radius: f32, now: Millis) -> WorldSnapshot {
        let center = self
            .world
            .get_player(observer)
            .map(|p| p.position)
            .unwrap_or(Vec2::ZERO);
        self.snapshot(now).filtered_near(Some(observer), center, radius)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}
