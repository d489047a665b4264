//! Lock-free command buffer between the transport layer and the simulation
//!
//! Connection handlers push commands from any thread through a
//! crossbeam-channel; the tick drains them all before movement, so every
//! input lands on a tick boundary and never mid-tick.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::game::constants::commands::BUFFER_CAPACITY;
use crate::game::state::{PlayerId, PlayerInput};

/// Requests from the transport layer, applied at the start of the next tick
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join { player_id: PlayerId, name: String },
    Input { player_id: PlayerId, input: PlayerInput },
    Leave { player_id: PlayerId },
    Shoot { player_id: PlayerId },
    Respawn { player_id: PlayerId },
}

impl Command {
    pub fn player_id(&self) -> PlayerId {
        match self {
            Command::Join { player_id, .. }
            | Command::Input { player_id, .. }
            | Command::Leave { player_id }
            | Command::Shoot { player_id }
            | Command::Respawn { player_id } => *player_id,
        }
    }
}

/// Command buffer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Buffer is full (backpressure)
    #[error("command buffer full")]
    Full,
    /// Channel disconnected (simulation dropped)
    #[error("command buffer disconnected")]
    Disconnected,
}

/// Bounded MPSC buffer drained once per tick
pub struct CommandBuffer {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
    capacity: usize,
}

impl CommandBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Create a new sender handle for a connection
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            sender: self.sender.clone(),
        }
    }

    /// Submit a command (non-blocking)
    #[inline]
    pub fn try_submit(&self, command: Command) -> Result<(), CommandError> {
        send(&self.sender, command)
    }

    /// Drain all pending commands in submission order
    pub fn drain(&self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new(BUFFER_CAPACITY)
    }
}

/// Clonable sender handle for connection handlers
#[derive(Clone)]
pub struct CommandSender {
    sender: Sender<Command>,
}

impl CommandSender {
    #[inline]
    pub fn try_send(&self, command: Command) -> Result<(), CommandError> {
        send(&self.sender, command)
    }

    pub fn join(&self, player_id: PlayerId, name: impl Into<String>) -> Result<(), CommandError> {
        self.try_send(Command::Join {
            player_id,
            name: name.into(),
        })
    }

    pub fn input(&self, player_id: PlayerId, input: PlayerInput) -> Result<(), CommandError> {
        self.try_send(Command::Input { player_id, input })
    }

    pub fn leave(&self, player_id: PlayerId) -> Result<(), CommandError> {
        self.try_send(Command::Leave { player_id })
    }

    pub fn shoot(&self, player_id: PlayerId) -> Result<(), CommandError> {
        self.try_send(Command::Shoot { player_id })
    }

    pub fn respawn(&self, player_id: PlayerId) -> Result<(), CommandError> {
        self.try_send(Command::Respawn { player_id })
    }
}

fn send(sender: &Sender<Command>, command: Command) -> Result<(), CommandError> {
    sender.try_send(command).map_err(|e| match e {
        TrySendError::Full(_) => CommandError::Full,
        TrySendError::Disconnected(_) => CommandError::Disconnected,
    })
}
