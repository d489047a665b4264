pub mod constants;
pub mod events;
pub mod game_loop;
pub mod input_buffer;
pub mod performance;
pub mod scheduler;
pub mod snapshot;
pub mod spatial;
pub mod state;
pub mod systems;
pub mod world;
