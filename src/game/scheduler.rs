//! Fixed-rate host for the simulation
//!
//! A single tokio task drives `Simulation::tick` on a wall-clock interval, so
//! ticks never overlap. After every tick the host swaps a fresh snapshot into
//! a shared slot and forwards drained events to the transport channel. A
//! panicking tick is caught and logged; the next scheduled tick still runs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, SimulationConfig};
use crate::game::constants::timing::STATS_LOG_INTERVAL_SECS;
use crate::game::events::SimEvent;
use crate::game::game_loop::Simulation;
use crate::game::input_buffer::CommandSender;
use crate::game::performance::TickMonitor;
use crate::game::snapshot::WorldSnapshot;

/// Events buffered for the transport before new ones are dropped
const EVENT_CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no tokio runtime available to drive the game loop")]
    NoRuntime,
    #[error("invalid simulation configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// State shared between the host handle and the loop task
struct Shared {
    snapshot: RwLock<Arc<WorldSnapshot>>,
    ticks: AtomicU64,
    faults: AtomicU64,
    dropped_events: AtomicU64,
}

pub struct GameLoopHost {
    simulation: Arc<Mutex<Simulation>>,
    shared: Arc<Shared>,
    commands: CommandSender,
    events_tx: Sender<SimEvent>,
    events_rx: Receiver<SimEvent>,
    tick_rate: u32,
    tick_interval: Duration,
    epoch: Instant,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl GameLoopHost {
    pub fn new(config: SimulationConfig) -> Self {
        let tick_rate = config.tick_rate.max(1);
        let tick_interval = Duration::from_millis(config.tick_interval_ms().max(1));
        let simulation = Simulation::new(config);
        let commands = simulation.command_sender();
        let snapshot = Arc::new(simulation.snapshot(0));
        let (events_tx, events_rx) = bounded(EVENT_CHANNEL_CAPACITY);

        Self {
            simulation: Arc::new(Mutex::new(simulation)),
            shared: Arc::new(Shared {
                snapshot: RwLock::new(snapshot),
                ticks: AtomicU64::new(0),
                faults: AtomicU64::new(0),
                dropped_events: AtomicU64::new(0),
            }),
            commands,
            events_tx,
            events_rx,
            tick_rate,
            tick_interval,
            epoch: Instant::now(),
            stop_tx: None,
            task: None,
        }
    }

    pub fn state(&self) -> LoopState {
        match &self.task {
            Some(task) if !task.is_finished() => LoopState::Running,
            _ => LoopState::Stopped,
        }
    }

    /// Begin ticking; a no-op returning `Ok(false)` when already running
    ///
    /// Fails without spawning anything when the configuration is invalid or
    /// no tokio runtime is current.
    pub fn start(&mut self) -> Result<bool, HostError> {
        if self.state() == LoopState::Running {
            return Ok(false);
        }
        self.simulation.lock().world().config().validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| HostError::NoRuntime)?;

        let now = self.now();
        self.simulation.lock().start_clock(now);

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = runtime.spawn(run_loop(LoopContext {
            simulation: self.simulation.clone(),
            shared: self.shared.clone(),
            events_tx: self.events_tx.clone(),
            tick_rate: self.tick_rate,
            tick_interval: self.tick_interval,
            epoch: self.epoch,
            stop_rx,
        }));

        self.stop_tx = Some(stop_tx);
        self.task = Some(task);
        Ok(true)
    }

    /// Prevent further ticks; a tick already running finishes first
    ///
    /// Returns false when the loop was not running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.state() == LoopState::Running;
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        self.task = None;
        was_running
    }

    /// Stop and wait for the loop task to exit
    pub async fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Game loop task ended abnormally: {}", e);
            }
        }
    }

    /// Milliseconds since this host was created
    pub fn now(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn command_sender(&self) -> CommandSender {
        self.commands.clone()
    }

    /// Receiver for events raised by ticks, in order
    pub fn events(&self) -> Receiver<SimEvent> {
        self.events_rx.clone()
    }

    /// Most recently published snapshot
    pub fn latest_snapshot(&self) -> Arc<WorldSnapshot> {
        self.shared.snapshot.read().clone()
    }

    /// Direct access to the simulation; holding the lock delays the next tick
    pub fn simulation(&self) -> Arc<Mutex<Simulation>> {
        self.simulation.clone()
    }

    pub fn tick_count(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    /// Ticks that panicked and were skipped
    pub fn fault_count(&self) -> u64 {
        self.shared.faults.load(Ordering::Relaxed)
    }

    pub fn dropped_event_count(&self) -> u64 {
        self.shared.dropped_events.load(Ordering::Relaxed)
    }
}

impl Drop for GameLoopHost {
    fn drop(&mut self) {
        self.stop();
    }
}

struct LoopContext {
    simulation: Arc<Mutex<Simulation>>,
    shared: Arc<Shared>,
    events_tx: Sender<SimEvent>,
    tick_rate: u32,
    tick_interval: Duration,
    epoch: Instant,
    stop_rx: watch::Receiver<bool>,
}

async fn run_loop(mut ctx: LoopContext) {
    let mut ticker = interval(ctx.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut monitor = TickMonitor::new(ctx.tick_rate);
    let stats_every = ctx.tick_rate as u64 * STATS_LOG_INTERVAL_SECS;
    let mut local_ticks: u64 = 0;

    info!("Game loop started at {} Hz", ctx.tick_rate);

    loop {
        tokio::select! {
            biased;
            changed = ctx.stop_rx.changed() => {
                if changed.is_err() || *ctx.stop_rx.borrow() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let now = ctx.epoch.elapsed().as_millis() as u64;
        monitor.tick_start();

        let outcome = {
            let mut simulation = ctx.simulation.lock();
            panic::catch_unwind(AssertUnwindSafe(|| {
                let stats = simulation.tick(now);
                let events = simulation.drain_events();
                let snapshot = simulation.snapshot(now);
                (stats, events, snapshot)
            }))
        };

        local_ticks += 1;
        ctx.shared.ticks.fetch_add(1, Ordering::Relaxed);

        match outcome {
            Ok((stats, events, snapshot)) => {
                monitor.tick_end(snapshot.entity_count());
                *ctx.shared.snapshot.write() = Arc::new(snapshot);
                forward_events(&ctx.events_tx, &ctx.shared, events);
                if stats.arena_resized {
                    debug!("Tick {} resized the arena", stats.tick);
                }
            }
            Err(payload) => {
                monitor.tick_end(0);
                let faults = ctx.shared.faults.fetch_add(1, Ordering::Relaxed) + 1;
                error!(
                    "Game tick panicked ({} total), skipping: {}",
                    faults,
                    panic_message(payload.as_ref())
                );
            }
        }

        if stats_every > 0 && local_ticks % stats_every == 0 {
            let snapshot = ctx.shared.snapshot.read().clone();
            info!(
                "Game: tick {}, {}/{} players alive, {} bullets, {} blocks, {} power-ups, arena {:.0} | Perf: {}",
                snapshot.tick,
                snapshot.total_alive,
                snapshot.total_players,
                snapshot.bullets.len(),
                snapshot.blocks.len(),
                snapshot.power_ups.len(),
                snapshot.arena_size,
                monitor.status_message()
            );
        }
    }

    info!("Game loop stopped after {} ticks", local_ticks);
}

fn forward_events(tx: &Sender<SimEvent>, shared: &Shared, events: Vec<SimEvent>) {
    for event in events {
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = shared.dropped_events.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    warn!("Event channel full, {} events dropped so far", dropped);
                }
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
