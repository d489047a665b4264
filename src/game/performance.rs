//! Tick timing against the per-tick budget
//!
//! Records tick durations over a rolling window and classifies how much of
//! the budget the simulation uses. An overrun is observed and logged, never
//! treated as a fault.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::warn;

/// Rolling window length (~6 seconds at 20 Hz)
const MAX_SAMPLES: usize = 120;

/// Samples needed before the status moves off its initial value
const MIN_SAMPLES: usize = 10;

/// Budget usage classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Under 30% of budget
    Excellent,
    /// Under 70% of budget
    Good,
    /// Under 90% of budget
    Warning,
    /// Under 100% of budget
    Critical,
    /// Average tick exceeds the budget
    Overrun,
}

impl TickStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, TickStatus::Excellent | TickStatus::Good)
    }
}

/// Performance monitor that tracks tick durations
pub struct TickMonitor {
    tick_durations: VecDeque<Duration>,
    budget: Duration,
    status: TickStatus,
    tick_start: Option<Instant>,
    overruns: u64,
    last_entity_count: usize,
}

impl TickMonitor {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_durations: VecDeque::with_capacity(MAX_SAMPLES),
            budget: Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64),
            status: TickStatus::Excellent,
            tick_start: None,
            overruns: 0,
            last_entity_count: 0,
        }
    }

    /// Start timing a tick
    pub fn tick_start(&mut self) {
        self.tick_start = Some(Instant::now());
    }

    /// End timing a tick and record the duration
    pub fn tick_end(&mut self, entity_count: usize) {
        if let Some(start) = self.tick_start.take() {
            self.record_tick(start.elapsed());
            self.last_entity_count = entity_count;
        }
    }

    fn record_tick(&mut self, duration: Duration) {
        if duration > self.budget {
            self.overruns += 1;
            warn!(
                "Tick overran budget: {:.2}ms > {:.2}ms ({} overruns)",
                duration.as_secs_f64() * 1000.0,
                self.budget.as_secs_f64() * 1000.0,
                self.overruns
            );
        }

        self.tick_durations.push_back(duration);
        while self.tick_durations.len() > MAX_SAMPLES {
            self.tick_durations.pop_front();
        }
        self.update_status();
    }

    fn update_status(&mut self) {
        if self.tick_durations.len() < MIN_SAMPLES {
            return;
        }

        let ratio = self.budget_usage_percent() / 100.0;
        self.status = if ratio < 0.3 {
            TickStatus::Excellent
        } else if ratio < 0.7 {
            TickStatus::Good
        } else if ratio < 0.9 {
            TickStatus::Warning
        } else if ratio <= 1.0 {
            TickStatus::Critical
        } else {
            TickStatus::Overrun
        };
    }

    pub fn average_tick_duration(&self) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.tick_durations.iter().sum();
        sum / self.tick_durations.len() as u32
    }

    /// 95th percentile tick duration
    pub fn p95_tick_duration(&self) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<_> = self.tick_durations.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted.get(idx.min(sorted.len() - 1)).copied().unwrap_or(Duration::ZERO)
    }

    pub fn status(&self) -> TickStatus {
        self.status
    }

    /// Budget usage as percentage (0-100+)
    pub fn budget_usage_percent(&self) -> f32 {
        (self.average_tick_duration().as_secs_f64() / self.budget.as_secs_f64() * 100.0) as f32
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Ticks that individually exceeded the budget
    pub fn overrun_count(&self) -> u64 {
        self.overruns
    }

    pub fn last_entity_count(&self) -> usize {
        self.last_entity_count
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget, p95 {:.2}ms, {} entities, {} overruns",
            self.status,
            self.budget_usage_percent(),
            self.p95_tick_duration().as_secs_f64() * 1000.0,
            self.last_entity_count,
            self.overruns
        )
    }
}

impl Default for TickMonitor {
    fn default() -> Self {
        Self::new(crate::game::constants::timing::TICK_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(monitor: &mut TickMonitor, duration: Duration) {
        for _ in 0..20 {
            monitor.record_tick(duration);
        }
    }

    #[test]
    fn test_monitor_new() {
        let monitor = TickMonitor::new(20);
        assert_eq!(monitor.status(), TickStatus::Excellent);
        assert_eq!(monitor.budget(), Duration::from_millis(50));
        assert_eq!(monitor.average_tick_duration(), Duration::ZERO);
    }

    #[test]
    fn test_status_classes() {
        // Budget at 20 Hz is 50ms
        let cases = [
            (5, TickStatus::Excellent),
            (25, TickStatus::Good),
            (40, TickStatus::Warning),
            (48, TickStatus::Critical),
            (80, TickStatus::Overrun),
        ];
        for (ms, expected) in cases {
            let mut monitor = TickMonitor::new(20);
            fill(&mut monitor, Duration::from_millis(ms));
            assert_eq!(monitor.status(), expected, "{}ms", ms);
        }
    }

    #[test]
    fn test_status_needs_samples() {
        let mut monitor = TickMonitor::new(20);
        for _ in 0..5 {
            monitor.record_tick(Duration::from_millis(80));
        }
        assert_eq!(monitor.status(), TickStatus::Excellent);
        assert_eq!(monitor.overrun_count(), 5);
    }

    #[test]
    fn test_overruns_counted() {
        let mut monitor = TickMonitor::new(20);
        monitor.record_tick(Duration::from_millis(10));
        monitor.record_tick(Duration::from_millis(51));
        monitor.record_tick(Duration::from_millis(50));
        assert_eq!(monitor.overrun_count(), 1);
    }

    #[test]
    fn test_rolling_window() {
        let mut monitor = TickMonitor::new(20);
        for _ in 0..MAX_SAMPLES {
            monitor.record_tick(Duration::from_millis(80));
        }
        for _ in 0..MAX_SAMPLES {
            monitor.record_tick(Duration::from_millis(1));
        }
        assert_eq!(monitor.tick_durations.len(), MAX_SAMPLES);
        assert_eq!(monitor.status(), TickStatus::Excellent);
        assert_eq!(monitor.p95_tick_duration(), Duration::from_millis(1));
    }

    #[test]
    fn test_tick_timing() {
        let mut monitor = TickMonitor::new(20);
        monitor.tick_start();
        std::thread::sleep(Duration::from_millis(1));
        monitor.tick_end(10);

        assert_eq!(monitor.tick_durations.len(), 1);
        assert!(monitor.average_tick_duration() >= Duration::from_millis(1));
        assert_eq!(monitor.last_entity_count(), 10);
    }
}
