//! Countdown timer state machine.
//!
//! Driven by externally supplied one-second ticks; the timer never reads a
//! clock. `Idle -> Running -> Expired -> Idle`, where the last step happens
//! when the caller acknowledges the expiry or starts a new countdown.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Expired,
}

/// What a tick did to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEvent {
    /// One second elapsed; `remaining` seconds are left.
    Tick { remaining: u64 },
    /// The countdown reached zero. Emitted once per run.
    Expired,
}

/// A one-per-session countdown.
#[derive(Debug, Clone, Default)]
pub struct CountdownTimer {
    remaining: u64,
    phase: TimerPhase,
    last_duration: Option<Duration>,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Whole seconds left in the current run.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Duration of the most recent `start`, remembered across stops.
    pub fn last_duration(&self) -> Option<Duration> {
        self.last_duration
    }

    /// `MM:SS` label for the remaining time.
    pub fn label(&self) -> String {
        format_remaining(self.remaining)
    }

    /// Start (or restart) a countdown from any phase.
    pub fn start(&mut self, duration: Duration) {
        self.remaining = duration.as_secs();
        self.phase = TimerPhase::Running;
        self.last_duration = Some(duration);
        tracing::debug!(secs = self.remaining, "timer started");
    }

    /// Stop and reset. Returns false if the timer was already idle.
    pub fn stop(&mut self) -> bool {
        let was_active = self.phase != TimerPhase::Idle;
        self.phase = TimerPhase::Idle;
        self.remaining = 0;
        if was_active {
            tracing::debug!("timer stopped");
        }
        was_active
    }

    /// Start again with the last used duration.
    ///
    /// No-op (returns false) while running or if nothing was ever started.
    pub fn restart_last(&mut self) -> bool {
        match (self.phase, self.last_duration) {
            (TimerPhase::Running, _) | (_, None) => false,
            (_, Some(duration)) => {
                self.start(duration);
                true
            }
        }
    }

    /// Acknowledge a delivered expiry, returning the timer to idle.
    pub fn acknowledge(&mut self) -> bool {
        if self.phase != TimerPhase::Expired {
            return false;
        }
        self.phase = TimerPhase::Idle;
        true
    }

    /// Advance by one second.
    ///
    /// Ticks are ignored while idle, and dropped while an expiry is awaiting
    /// acknowledgement, so at most one `Expired` is ever outstanding.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        match self.phase {
            TimerPhase::Idle => None,
            TimerPhase::Expired => {
                tracing::trace!("tick dropped while expiry is unacknowledged");
                None
            }
            TimerPhase::Running => {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    self.phase = TimerPhase::Expired;
                    tracing::debug!("timer expired");
                    Some(TimerEvent::Expired)
                } else {
                    Some(TimerEvent::Tick {
                        remaining: self.remaining,
                    })
                }
            }
        }
    }
}

/// Format whole seconds as zero-padded `MM:SS`. Minutes do not wrap at 60.
pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Parse a user-typed minute count into a duration.
///
/// Accepts a positive integer, surrounding whitespace allowed. Anything else
/// is a rejection, not an error: the caller asks again.
pub fn parse_custom_minutes(input: &str) -> Option<Duration> {
    let minutes: u64 = input.trim().parse().ok()?;
    if minutes == 0 {
        return None;
    }
    minutes.checked_mul(60).map(Duration::from_secs)
}
