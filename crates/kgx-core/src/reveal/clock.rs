use std::future;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use super::RevealEngine;

/// Tokio-backed ticker for one [`RevealEngine`].
///
/// Call [`TickClock::sync`] after every engine mutation; it (re)arms the
/// interval when the engine's tick generation changes and drops it when the
/// engine stops ticking. [`TickClock::tick`] never resolves while disarmed,
/// so it can sit in a `select!` next to other event sources.
#[derive(Debug)]
pub struct TickClock {
    period: Duration,
    interval: Option<Interval>,
    generation: Option<u64>,
}

impl TickClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
            generation: None,
        }
    }

    pub fn for_engine(engine: &RevealEngine) -> Self {
        Self::new(engine.config().tick_period())
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Brings the timer in line with the engine's ticker state.
    pub fn sync(&mut self, engine: &RevealEngine) {
        if !engine.is_ticking() {
            self.disarm();
            return;
        }
        let generation = engine.tick_generation();
        if self.interval.is_none() || self.generation != Some(generation) {
            let mut interval = interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.interval = Some(interval);
            self.generation = Some(generation);
        }
    }

    /// Drops the live timer.
    pub fn disarm(&mut self) {
        self.interval = None;
        self.generation = None;
    }

    /// Waits for the next tick; pending forever while disarmed.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }
}
