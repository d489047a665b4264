/// Simulation timing constants
pub mod timing {
    /// Default server tick rate in Hz
    pub const TICK_RATE: u32 = 20;
    /// Milliseconds per second, for converting timestamp deltas to seconds
    pub const MS_PER_SECOND: f32 = 1000.0;
    /// Interval between periodic stats log lines (seconds)
    pub const STATS_LOG_INTERVAL_SECS: u64 = 30;
}

/// Player constants
pub mod player {
    /// Default maximum health
    pub const MAX_HP: i32 = 100;
    /// Default base movement speed (world units/second)
    pub const SPEED: f32 = 200.0;
    /// Collision radius
    pub const RADIUS: f32 = 20.0;
    /// Distance kept between a player's center and the arena wall
    pub const WALL_MARGIN: f32 = 20.0;
    /// Score awarded to the shooter for a kill
    pub const KILL_SCORE: u32 = 100;
    /// Invulnerability window after spawning or respawning (ms)
    pub const RESPAWN_INVULNERABILITY_MS: u64 = 3_000;
}

/// Bullet and shooting constants
pub mod bullet {
    /// Muzzle speed (world units/second)
    pub const SPEED: f32 = 600.0;
    /// Damage per hit
    pub const DAMAGE: i32 = 34;
    /// Collision radius
    pub const RADIUS: f32 = 5.0;
    /// Bullets older than this are removed (ms)
    pub const LIFETIME_MS: u64 = 2_000;
    /// Minimum time between two shots from the same player (ms)
    pub const SHOT_COOLDOWN_MS: u64 = 200;
    /// Angular offset of the side bullets of a triple shot (radians, 15°)
    pub const TRIPLE_SHOT_SPREAD: f32 = std::f32::consts::PI / 12.0;
    /// Extra distance between the player's edge and a fresh bullet
    pub const MUZZLE_GAP: f32 = 2.0;
}

/// Block (obstacle) constants
pub mod block {
    /// Side length of the square block
    pub const SIZE: f32 = 40.0;
    /// Starting health of a destructible block
    pub const HP: i32 = 100;
    /// Fraction of spawned blocks that can be destroyed
    pub const DESTRUCTIBLE_RATIO: f64 = 0.8;
}

/// Power-up constants
pub mod power_up {
    /// Pickup radius
    pub const RADIUS: f32 = 15.0;
    /// Uncollected power-ups expire after this long (ms)
    pub const LIFETIME_MS: u64 = 30_000;
    /// Triple-shot window granted on pickup (ms)
    pub const TRIPLE_SHOT_DURATION_MS: u64 = 10_000;
    /// Speed boost window granted on pickup (ms)
    pub const SPEED_BOOST_DURATION_MS: u64 = 8_000;
    /// Movement speed multiplier while boosted
    pub const SPEED_BOOST_MULTIPLIER: f32 = 1.5;
    /// Health restored by a heal pickup (capped at max hp)
    pub const HEAL_AMOUNT: i32 = 50;
}

/// Arena schedule constants
pub mod arena {
    /// Starting side length of the square arena
    pub const INITIAL_SIZE: f32 = 2_000.0;
    /// Smallest side length the schedule shrinks to
    pub const MIN_SIZE: f32 = 800.0;
    /// Largest side length the schedule grows to
    pub const MAX_SIZE: f32 = 2_000.0;
    /// Size change per schedule step (negative = shrink first)
    pub const STEP: f32 = -100.0;
    /// Time between schedule steps (ms)
    pub const INTERVAL_MS: u64 = 30_000;
}

/// Spawn policy constants
pub mod spawn {
    /// Blocks placed when the world is created
    pub const INITIAL_BLOCKS: usize = 20;
    /// Time between block spawn attempts (ms)
    pub const BLOCK_INTERVAL_MS: u64 = 5_000;
    /// Time between power-up spawn attempts (ms)
    pub const POWER_UP_INTERVAL_MS: u64 = 7_000;
    /// Live entity caps per kind
    pub const MAX_BLOCKS: usize = 40;
    pub const MAX_POWER_UPS: usize = 8;
    pub const MAX_BULLETS: usize = 512;
    pub const MAX_PLAYERS: usize = 64;
}

/// Spatial index constants
pub mod spatial {
    /// Default grid cell size (world units)
    /// Several times the largest interaction radius (player + bullet = 25)
    pub const CELL_SIZE: f32 = 100.0;
}

/// Command buffer constants
pub mod commands {
    /// Default bounded capacity of the command channel
    /// (64 players * ~15 commands between ticks)
    pub const BUFFER_CAPACITY: usize = 1024;
}
