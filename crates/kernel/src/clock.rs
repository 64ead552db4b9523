use std::time::{Duration, Instant};

/// Rolling window of recent tick durations.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    history: Vec<Duration>,
    index: usize,
    filled: bool,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: vec![Duration::ZERO; capacity.max(1)],
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.history.len();
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn window(&self) -> &[Duration] {
        &self.history[..self.count()]
    }

    pub fn average(&self) -> Duration {
        let window = self.window();
        if window.is_empty() {
            return Duration::ZERO;
        }
        window.iter().sum::<Duration>() / window.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.window().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.window().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    pub fn count(&self) -> usize {
        if self.filled {
            self.history.len()
        } else {
            self.index
        }
    }
}

/// Fixed-rate pacing for the run loop.
///
/// Each tick gets `1 / tick_rate` seconds. A tick that finishes early sleeps
/// the remainder; a late tick is counted as an overrun and the next one
/// starts immediately. Missed ticks are never replayed.
#[derive(Debug, Clone)]
pub struct FixedStep {
    period: Duration,
    timer: FrameTimer,
    overruns: u64,
}

impl FixedStep {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1))),
            timer: FrameTimer::new(120),
            overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Simulated seconds per tick.
    pub fn dt(&self) -> f64 {
        self.period.as_secs_f64()
    }

    /// Time left in a tick that has run for `elapsed`, or `None` on overrun.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.period.checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    /// Record the tick that began at `started` and sleep out its period.
    /// Returns the time slept.
    pub fn finish_tick(&mut self, started: Instant) -> Duration {
        let elapsed = started.elapsed();
        self.timer.record(elapsed);
        match self.remaining(elapsed) {
            Some(rest) => {
                std::thread::sleep(rest);
                rest
            }
            None => {
                self.overruns += 1;
                tracing::trace!(?elapsed, period = ?self.period, "tick overran its period");
                Duration::ZERO
            }
        }
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}
