//! Entity definitions and arena state
//!
//! Players, bullets, blocks and power-ups, plus the square arena they live in.
//! All timestamps are absolute milliseconds on the simulation clock.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::power_up;
use crate::game::spatial::{Spatial, SpatialEntityId};
use crate::util::vec2::Vec2;

/// Unique player identifier
pub type PlayerId = Uuid;

/// Entity identifier for non-player entities (never reused)
pub type EntityId = u64;

/// Absolute simulation time in milliseconds
pub type Millis = u64;

/// Movement and aim intent for one player, replaced by each input update
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Turret aim heading (radians, 0 = -z)
    pub angle: f32,
    pub wants_shoot: bool,
}

impl PlayerInput {
    /// Unit movement direction from the directional flags
    ///
    /// Opposite flags cancel; diagonals are normalized to unit length.
    pub fn movement_direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.up {
            dir += Vec2::UP;
        }
        if self.down {
            dir += Vec2::DOWN;
        }
        if self.left {
            dir += Vec2::LEFT;
        }
        if self.right {
            dir += Vec2::RIGHT;
        }
        dir.normalize()
    }
}

/// Player state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    // === HOT FIELDS (movement + collision every tick) ===
    pub position: Vec2,
    pub alive: bool,
    pub hp: i32,
    pub radius: f32,
    pub input: PlayerInput,
    /// Hull facing (radians); kept while idle
    pub body_angle: f32,
    /// Turret facing (radians), follows the aim angle
    pub turret_angle: f32,

    // === TIMERS (absolute ms) ===
    pub invulnerable_until: Millis,
    pub speed_boost_until: Option<Millis>,
    pub triple_shot_until: Option<Millis>,
    pub last_shot_time: Option<Millis>,

    // === SCORING ===
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,

    // === COLD FIELDS ===
    pub max_hp: i32,
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: PlayerId, name: String, max_hp: i32, radius: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            alive: true,
            hp: max_hp,
            radius,
            input: PlayerInput::default(),
            body_angle: 0.0,
            turret_angle: 0.0,
            invulnerable_until: 0,
            speed_boost_until: None,
            triple_shot_until: None,
            last_shot_time: None,
            score: 0,
            kills: 0,
            deaths: 0,
            max_hp,
            id,
            name,
        }
    }

    /// Excluded from bullet damage until `invulnerable_until`
    #[inline]
    pub fn is_invulnerable(&self, now: Millis) -> bool {
        now < self.invulnerable_until
    }

    /// Active speed boost; an expired boost is cleared
    pub fn speed_boost_active(&mut self, now: Millis) -> bool {
        match self.speed_boost_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.speed_boost_until = None;
                false
            }
            None => false,
        }
    }

    /// Active triple-shot window; an expired window is cleared
    pub fn triple_shot_active(&mut self, now: Millis) -> bool {
        match self.triple_shot_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.triple_shot_until = None;
                false
            }
            None => false,
        }
    }

    /// Apply damage, clamping hp at 0
    ///
    /// Returns true only on the hit that moves a living player to 0 hp.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        if !self.alive {
            return false;
        }
        self.hp = (self.hp - damage.max(0)).max(0);
        if self.hp == 0 {
            self.alive = false;
            self.deaths += 1;
            true
        } else {
            false
        }
    }

    /// Restore health up to max hp
    pub fn heal(&mut self, amount: i32) {
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
    }

    /// Grant a power-up effect
    pub fn apply_power_up(&mut self, kind: PowerUpKind, now: Millis) {
        match kind {
            PowerUpKind::TripleShot => {
                self.triple_shot_until = Some(now + power_up::TRIPLE_SHOT_DURATION_MS);
            }
            PowerUpKind::Speed => {
                self.speed_boost_until = Some(now + power_up::SPEED_BOOST_DURATION_MS);
            }
            PowerUpKind::Heal => self.heal(power_up::HEAL_AMOUNT),
        }
    }
}

impl Spatial for Player {
    fn spatial_id(&self) -> SpatialEntityId {
        SpatialEntityId::Player(self.id)
    }
    fn position(&self) -> Vec2 {
        self.position
    }
}

/// Bullet fired by a player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub id: EntityId,
    pub owner_id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub damage: i32,
    pub radius: f32,
    pub created_at: Millis,
}

impl Bullet {
    #[inline]
    pub fn age(&self, now: Millis) -> Millis {
        now.saturating_sub(self.created_at)
    }

    #[inline]
    pub fn is_expired(&self, now: Millis, lifetime_ms: Millis) -> bool {
        self.age(now) > lifetime_ms
    }
}

impl Spatial for Bullet {
    fn spatial_id(&self) -> SpatialEntityId {
        SpatialEntityId::Bullet(self.id)
    }
    fn position(&self) -> Vec2 {
        self.position
    }
}

/// Square obstacle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: EntityId,
    pub position: Vec2,
    pub hp: i32,
    pub destructible: bool,
    /// Side length
    pub size: f32,
}

impl Block {
    #[inline]
    pub fn half_extent(&self) -> f32 {
        self.size * 0.5
    }

    /// Apply bullet damage; returns true when this hit destroys the block
    pub fn take_damage(&mut self, damage: i32) -> bool {
        if !self.destructible || self.hp <= 0 {
            return false;
        }
        self.hp = (self.hp - damage.max(0)).max(0);
        self.hp == 0
    }
}

impl Spatial for Block {
    fn spatial_id(&self) -> SpatialEntityId {
        SpatialEntityId::Block(self.id)
    }
    fn position(&self) -> Vec2 {
        self.position
    }
}

/// Power-up categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PowerUpKind {
    TripleShot,
    Speed,
    Heal,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::TripleShot,
        PowerUpKind::Speed,
        PowerUpKind::Heal,
    ];
}

/// Collectible power-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: EntityId,
    pub position: Vec2,
    pub kind: PowerUpKind,
    pub radius: f32,
    pub created_at: Millis,
}

impl PowerUp {
    #[inline]
    pub fn is_expired(&self, now: Millis) -> bool {
        now.saturating_sub(self.created_at) > power_up::LIFETIME_MS
    }
}

impl Spatial for PowerUp {
    fn spatial_id(&self) -> SpatialEntityId {
        SpatialEntityId::PowerUp(self.id)
    }
    fn position(&self) -> Vec2 {
        self.position
    }
}

/// Square arena centered at the origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    /// Side length; bounds are `[-size/2, size/2]` on both axes
    pub size: f32,
    /// +1.0 or -1.0, multiplied into the schedule step
    pub direction: f32,
    /// Next time the resize schedule runs
    pub next_resize_at: Millis,
}

impl Arena {
    pub fn new(size: f32, next_resize_at: Millis) -> Self {
        Self {
            size,
            direction: 1.0,
            next_resize_at,
        }
    }

    #[inline]
    pub fn half_size(&self) -> f32 {
        self.size * 0.5
    }

    /// Inside the bounds (edges included)
    #[inline]
    pub fn contains(&self, position: Vec2) -> bool {
        let half = self.half_size();
        position.x.abs() <= half && position.z.abs() <= half
    }

    /// Clamp a position to the bounds shrunk by `margin`
    ///
    /// A margin larger than the half size collapses to the origin.
    pub fn clamp_inside(&self, position: Vec2, margin: f32) -> Vec2 {
        let limit = (self.half_size() - margin).max(0.0);
        position.clamp_components(-limit, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_player() -> Player {
        Player::new(Uuid::new_v4(), "Test".to_string(), 100, 20.0)
    }

    #[test]
    fn test_player_new() {
        let player = test_player();
        assert!(player.alive);
        assert_eq!(player.hp, 100);
        assert_eq!(player.max_hp, 100);
        assert_eq!(player.score, 0);
        assert!(player.last_shot_time.is_none());
    }

    #[test]
    fn test_movement_direction_normalizes_diagonals() {
        let input = PlayerInput {
            up: true,
            right: true,
            ..Default::default()
        };
        let dir = input.movement_direction();
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert!(dir.x > 0.0 && dir.z < 0.0);
    }

    #[test]
    fn test_movement_direction_opposites_cancel() {
        let input = PlayerInput {
            up: true,
            down: true,
            ..Default::default()
        };
        assert_eq!(input.movement_direction(), Vec2::ZERO);
    }

    #[test]
    fn test_take_damage_clamps_and_dies_once() {
        let mut player = test_player();
        player.hp = 50;
        assert!(player.take_damage(60));
        assert_eq!(player.hp, 0);
        assert!(!player.alive);
        assert_eq!(player.deaths, 1);

        // Already dead: no second death
        assert!(!player.take_damage(60));
        assert_eq!(player.deaths, 1);
        assert_eq!(player.hp, 0);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut player = test_player();
        player.hp = 80;
        player.heal(50);
        assert_eq!(player.hp, 100);
    }

    #[test]
    fn test_power_up_windows() {
        let mut player = test_player();
        player.apply_power_up(PowerUpKind::TripleShot, 1_000);
        player.apply_power_up(PowerUpKind::Speed, 1_000);
        assert_eq!(player.triple_shot_until, Some(11_000));
        assert_eq!(player.speed_boost_until, Some(9_000));

        assert!(player.triple_shot_active(10_999));
        assert!(!player.triple_shot_active(11_000));
        assert!(player.triple_shot_until.is_none());

        assert!(player.speed_boost_active(8_999));
        assert!(!player.speed_boost_active(9_001));
        assert!(player.speed_boost_until.is_none());
    }

    #[test]
    fn test_invulnerability_window() {
        let mut player = test_player();
        player.invulnerable_until = 3_000;
        assert!(player.is_invulnerable(2_999));
        assert!(!player.is_invulnerable(3_000));
    }

    #[test]
    fn test_bullet_expiry() {
        let bullet = Bullet {
            id: 1,
            owner_id: Uuid::new_v4(),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            damage: 34,
            radius: 5.0,
            created_at: 1_000,
        };
        assert!(!bullet.is_expired(3_000, 2_000));
        assert!(bullet.is_expired(3_001, 2_000));
        // Clock earlier than creation never underflows
        assert_eq!(bullet.age(500), 0);
    }

    #[test]
    fn test_indestructible_block_ignores_damage() {
        let mut block = Block {
            id: 1,
            position: Vec2::ZERO,
            hp: 100,
            destructible: false,
            size: 40.0,
        };
        assert!(!block.take_damage(500));
        assert_eq!(block.hp, 100);

        block.destructible = true;
        assert!(!block.take_damage(34));
        assert_eq!(block.hp, 66);
        assert!(block.take_damage(100));
        assert_eq!(block.hp, 0);
        assert!(!block.take_damage(1));
    }

    #[test]
    fn test_power_up_expiry() {
        let power_up = PowerUp {
            id: 1,
            position: Vec2::ZERO,
            kind: PowerUpKind::Heal,
            radius: 15.0,
            created_at: 0,
        };
        assert!(!power_up.is_expired(30_000));
        assert!(power_up.is_expired(30_001));
    }

    #[test]
    fn test_arena_bounds() {
        let arena = Arena::new(200.0, 0);
        assert_eq!(arena.half_size(), 100.0);
        assert!(arena.contains(Vec2::new(100.0, -100.0)));
        assert!(!arena.contains(Vec2::new(100.1, 0.0)));
        assert_eq!(
            arena.clamp_inside(Vec2::new(500.0, -500.0), 20.0),
            Vec2::new(80.0, -80.0)
        );
        assert_eq!(arena.clamp_inside(Vec2::new(5.0, 5.0), 150.0), Vec2::ZERO);
    }
}
