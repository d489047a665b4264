//! Arena Battle Server Library
//!
//! Server-authoritative simulation core for a real-time arena shooter: a
//! fixed-rate tick over an owned world, spatially indexed collision
//! resolution, and copy-out snapshots plus an ordered event stream for the
//! transport layer.

pub mod config;
pub mod game;
pub mod util;

pub use config::{ConfigError, SimulationConfig};
pub use game::events::SimEvent;
pub use game::game_loop::{Simulation, TickStats};
pub use game::scheduler::{GameLoopHost, LoopState};
pub use game::snapshot::WorldSnapshot;
