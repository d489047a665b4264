//! Domain events raised during a tick
//!
//! The simulation pushes events in the order they happen; the host drains
//! them after each tick and hands them to whoever broadcasts.

use serde::{Deserialize, Serialize};

use crate::game::state::{EntityId, PlayerId, PowerUpKind};

/// Simulation events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    /// Non-lethal bullet hit
    PlayerHit {
        target_id: PlayerId,
        shooter_id: PlayerId,
        damage: i32,
    },
    /// Lethal bullet hit (no `PlayerHit` is raised for the same bullet)
    PlayerDeath {
        target_id: PlayerId,
        shooter_id: PlayerId,
    },
    PowerUpCollected {
        player_id: PlayerId,
        kind: PowerUpKind,
    },
    BlockDestroyed {
        block_id: EntityId,
    },
    ArenaResize {
        new_size: f32,
    },
    PlayerRespawned {
        player_id: PlayerId,
    },
}

/// Ordered event queue, drained once per tick
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<SimEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    /// Take every queued event, oldest first
    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}
