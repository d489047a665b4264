//! Entity lifecycle: power-up expiry, periodic spawns and the arena resize
//! schedule.

use crate::game::events::{EventQueue, SimEvent};
use crate::game::state::{EntityId, Millis};
use crate::game::world::{SpawnReport, World};

/// What the lifecycle phase changed this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleReport {
    pub spawned: SpawnReport,
    pub resized: bool,
}

/// Remove power-ups past their lifetime; returns how many were removed
pub fn expire_power_ups(world: &mut World, now: Millis) -> usize {
    let expired: Vec<EntityId> = world
        .power_ups
        .values()
        .filter(|p| p.is_expired(now))
        .map(|p| p.id)
        .collect();

    for id in &expired {
        world.remove_power_up(*id);
    }
    expired.len()
}

/// Run spawns, then the resize schedule, raising `ArenaResize` on change
pub fn update(world: &mut World, now: Millis, events: &mut EventQueue) -> LifecycleReport {
    let spawned = world.update_spawns(now);
    let resized = world.update_arena_size(now);
    if resized {
        events.push(SimEvent::ArenaResize {
            new_size: world.arena.size,
        });
    }
    LifecycleReport { spawned, resized }
}
