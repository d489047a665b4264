use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::game::constants::{arena, block, bullet, player, power_up, spatial, spawn, timing};

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tick_rate must be between 1 and 1000 Hz, got {0}")]
    TickRate(u32),
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("arena sizes must satisfy min <= initial <= max (min={min}, initial={initial}, max={max})")]
    ArenaBounds { min: f32, initial: f32, max: f32 },
    #[error("wall_margin ({margin}) leaves no room inside the smallest arena ({min_size})")]
    MarginTooLarge { margin: f32, min_size: f32 },
    #[error("destructible_ratio must be within 0.0..=1.0, got {0}")]
    DestructibleRatio(f64),
}

/// Time-based arena resize schedule
///
/// Every `interval_ms` the arena side length changes by `step`, clamped to
/// `[min_size, max_size]`. With `oscillate` the direction reverses at a
/// bound, otherwise the arena stays there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaScheduleConfig {
    pub initial_size: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub step: f32,
    pub interval_ms: u64,
    pub oscillate: bool,
}

impl Default for ArenaScheduleConfig {
    fn default() -> Self {
        Self {
            initial_size: arena::INITIAL_SIZE,
            min_size: arena::MIN_SIZE,
            max_size: arena::MAX_SIZE,
            step: arena::STEP,
            interval_ms: arena::INTERVAL_MS,
            oscillate: true,
        }
    }
}

/// Block and power-up spawn policy plus live-count caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub initial_blocks: usize,
    pub block_interval_ms: u64,
    pub power_up_interval_ms: u64,
    pub max_blocks: usize,
    pub max_power_ups: usize,
    pub max_bullets: usize,
    pub max_players: usize,
    pub block_hp: i32,
    pub block_size: f32,
    pub power_up_radius: f32,
    pub destructible_ratio: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            initial_blocks: spawn::INITIAL_BLOCKS,
            block_interval_ms: spawn::BLOCK_INTERVAL_MS,
            power_up_interval_ms: spawn::POWER_UP_INTERVAL_MS,
            max_blocks: spawn::MAX_BLOCKS,
            max_power_ups: spawn::MAX_POWER_UPS,
            max_bullets: spawn::MAX_BULLETS,
            max_players: spawn::MAX_PLAYERS,
            block_hp: block::HP,
            block_size: block::SIZE,
            power_up_radius: power_up::RADIUS,
            destructible_ratio: block::DESTRUCTIBLE_RATIO,
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Ticks per second
    pub tick_rate: u32,
    pub player_max_hp: i32,
    /// Base movement speed (world units/second)
    pub player_speed: f32,
    pub player_radius: f32,
    /// Minimum distance between a player's center and the arena wall
    pub wall_margin: f32,
    pub bullet_speed: f32,
    pub bullet_damage: i32,
    pub bullet_radius: f32,
    pub bullet_lifetime_ms: u64,
    pub shot_cooldown_ms: u64,
    pub respawn_invulnerability_ms: u64,
    pub kill_score: u32,
    /// Spatial index cell size (world units)
    pub cell_size: f32,
    pub arena: ArenaScheduleConfig,
    pub spawn: SpawnConfig,
    /// Seed for the world RNG; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: timing::TICK_RATE,
            player_max_hp: player::MAX_HP,
            player_speed: player::SPEED,
            player_radius: player::RADIUS,
            wall_margin: player::WALL_MARGIN,
            bullet_speed: bullet::SPEED,
            bullet_damage: bullet::DAMAGE,
            bullet_radius: bullet::RADIUS,
            bullet_lifetime_ms: bullet::LIFETIME_MS,
            shot_cooldown_ms: bullet::SHOT_COOLDOWN_MS,
            respawn_invulnerability_ms: player::RESPAWN_INVULNERABILITY_MS,
            kill_score: player::KILL_SCORE,
            cell_size: spatial::CELL_SIZE,
            arena: ArenaScheduleConfig::default(),
            spawn: SpawnConfig::default(),
            seed: None,
        }
    }
}

/// Parse an environment variable, keeping `current` when absent or invalid
fn env_or<T>(name: &str, current: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr,
{
    let Ok(raw) = std::env::var(name) else {
        return current;
    };
    match raw.parse::<T>() {
        Ok(parsed) if valid(&parsed) => parsed,
        Ok(_) => {
            tracing::warn!("{} value '{}' out of range, using default", name, raw);
            current
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            current
        }
    }
}

impl SimulationConfig {
    /// Tick interval in milliseconds (1000 / tick_rate)
    pub fn tick_interval_ms(&self) -> u64 {
        (1000 / self.tick_rate.max(1)) as u64
    }

    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        config.tick_rate = env_or("TICK_RATE", config.tick_rate, |v| (1..=1000).contains(v));
        config.player_max_hp = env_or("PLAYER_MAX_HP", config.player_max_hp, |v| *v > 0);
        config.player_speed = env_or("PLAYER_SPEED", config.player_speed, |v| *v > 0.0);
        config.bullet_lifetime_ms =
            env_or("BULLET_LIFETIME_MS", config.bullet_lifetime_ms, |v| *v > 0);
        config.respawn_invulnerability_ms = env_or(
            "RESPAWN_INVULNERABILITY_MS",
            config.respawn_invulnerability_ms,
            |_| true,
        );
        config.cell_size = env_or("CELL_SIZE", config.cell_size, |v| *v > 0.0);

        config.arena.initial_size =
            env_or("ARENA_SIZE", config.arena.initial_size, |v| *v > 0.0);
        config.arena.max_size = config.arena.max_size.max(config.arena.initial_size);
        config.arena.min_size = env_or("ARENA_MIN_SIZE", config.arena.min_size, |v| *v > 0.0);
        config.arena.step = env_or("ARENA_STEP", config.arena.step, |v: &f32| v.is_finite());
        config.arena.interval_ms =
            env_or("ARENA_INTERVAL_MS", config.arena.interval_ms, |v| *v > 0);

        config.spawn.max_blocks = env_or("MAX_BLOCKS", config.spawn.max_blocks, |_| true);
        config.spawn.max_power_ups =
            env_or("MAX_POWER_UPS", config.spawn.max_power_ups, |_| true);
        config.spawn.max_bullets = env_or("MAX_BULLETS", config.spawn.max_bullets, |_| true);
        config.spawn.max_players = env_or("MAX_PLAYERS", config.spawn.max_players, |v| *v > 0);

        if let Ok(seed) = std::env::var("WORLD_SEED") {
            match seed.parse::<u64>() {
                Ok(parsed) => config.seed = Some(parsed),
                Err(_) => tracing::warn!("Invalid WORLD_SEED '{}', seeding from entropy", seed),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(ConfigError::TickRate(self.tick_rate));
        }

        let positive: [(&'static str, f64); 9] = [
            ("player_max_hp", self.player_max_hp as f64),
            ("player_speed", self.player_speed as f64),
            ("player_radius", self.player_radius as f64),
            ("bullet_speed", self.bullet_speed as f64),
            ("bullet_radius", self.bullet_radius as f64),
            ("bullet_lifetime_ms", self.bullet_lifetime_ms as f64),
            ("cell_size", self.cell_size as f64),
            ("arena.interval_ms", self.arena.interval_ms as f64),
            ("spawn.block_size", self.spawn.block_size as f64),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.spawn.max_players == 0 {
            return Err(ConfigError::NotPositive {
                field: "spawn.max_players",
                value: 0.0,
            });
        }

        let arena = &self.arena;
        if !(arena.min_size > 0.0
            && arena.min_size <= arena.initial_size
            && arena.initial_size <= arena.max_size)
        {
            return Err(ConfigError::ArenaBounds {
                min: arena.min_size,
                initial: arena.initial_size,
                max: arena.max_size,
            });
        }
        if self.wall_margin < 0.0 || self.wall_margin * 2.0 >= arena.min_size {
            return Err(ConfigError::MarginTooLarge {
                margin: self.wall_margin,
                min_size: arena.min_size,
            });
        }
        if !(0.0..=1.0).contains(&self.spawn.destructible_ratio) {
            return Err(ConfigError::DestructibleRatio(self.spawn.destructible_ratio));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.tick_rate, 20);
        assert_eq!(config.tick_interval_ms(), 50);
        assert_eq!(config.player_max_hp, 100);
        assert_eq!(config.cell_size, 100.0);
        assert_eq!(config.bullet_damage, 34);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = SimulationConfig::load_or_default();
        assert!(config.tick_rate > 0);
    }

    #[test]
    fn test_validate_rejects_zero_tick_rate() {
        let config = SimulationConfig {
            tick_rate: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TickRate(0)));
    }

    #[test]
    fn test_validate_rejects_inverted_arena_bounds() {
        let mut config = SimulationConfig::default();
        config.arena.min_size = 3000.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ArenaBounds { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_cell_size() {
        let config = SimulationConfig {
            cell_size: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "cell_size", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_oversized_margin() {
        let mut config = SimulationConfig::default();
        config.wall_margin = config.arena.min_size;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MarginTooLarge { .. })
        ));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::TickRate(0);
        assert!(err.to_string().contains("tick_rate"));
    }

    #[test]
    fn test_serde_json_round_trip() {
        let config = SimulationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
