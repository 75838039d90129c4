//! Countdown engine: one virtual timer per key, driven by an injected clock.
//!
//! Remaining time is always recomputed from the stored deadline, never by
//! counting ticks, so a suspended process or a slow caller cannot drift.

use std::collections::BTreeMap;
use std::time::Duration;

use super::models::{CountdownEvent, CountdownKey, CountdownState};
use super::store::CountdownStore;
use crate::models::settings::DEFAULT_TICK_INTERVAL_MS;
use crate::utils::clock::Clock;

#[derive(Debug, Clone, Copy)]
struct ActiveTimer {
    deadline_ms: i64,
    remaining_ms: i64,
    next_tick_at: i64,
}

#[derive(Debug, Clone, Copy)]
enum TimerSlot {
    Running(ActiveTimer),
    Expired,
}

pub struct CountdownEngine<S, C> {
    store: S,
    clock: C,
    tick_interval_ms: i64,
    timers: BTreeMap<CountdownKey, TimerSlot>,
}

impl<S: CountdownStore, C: Clock> CountdownEngine<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_tick_interval(store, clock, Duration::from_millis(DEFAULT_TICK_INTERVAL_MS))
    }

    pub fn with_tick_interval(store: S, clock: C, tick_interval: Duration) -> Self {
        let tick_interval_ms = i64::try_from(tick_interval.as_millis())
            .unwrap_or(i64::MAX)
            .max(1);

        Self {
            store,
            clock,
            tick_interval_ms,
            timers: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Starts (or restarts) the countdown for `key`, `duration_ms` from now.
    /// Any timer already running for the key is cancelled first.
    ///
    /// Returns the persisted deadline.
    pub fn start(&mut self, key: &CountdownKey, duration_ms: u64) -> i64 {
        if self.timers.remove(key).is_some() {
            log::debug!("Replacing existing countdown for {}", key);
        }

        let now = self.clock.now_ms();
        let duration_ms = i64::try_from(duration_ms).unwrap_or(i64::MAX);
        let deadline_ms = now.saturating_add(duration_ms);
        self.store.set_deadline(key, deadline_ms);

        // A zero-length countdown is due at once, so the next tick reports
        // the expiry like any other.
        let next_tick_at = if duration_ms == 0 {
            now
        } else {
            now.saturating_add(self.tick_interval_ms)
        };
        self.timers.insert(
            key.clone(),
            TimerSlot::Running(ActiveTimer {
                deadline_ms,
                remaining_ms: duration_ms,
                next_tick_at,
            }),
        );
        log::info!("Countdown {} started, {} ms left", key, duration_ms);
        deadline_ms
    }

    /// Picks up a countdown persisted by an earlier run.
    ///
    /// Returns `Tick` when the deadline is still ahead, `Expired` (once) when
    /// it has already passed, and `None` when nothing is stored for the key.
    /// A key that is already ticking is left alone.
    pub fn resume(&mut self, key: &CountdownKey) -> Option<CountdownEvent> {
        match self.timers.get(key) {
            Some(TimerSlot::Running(timer)) => {
                return Some(CountdownEvent::Tick {
                    key: key.clone(),
                    remaining_ms: timer.remaining_ms,
                });
            }
            Some(TimerSlot::Expired) => return None,
            None => {}
        }

        let deadline_ms = self.store.get_deadline(key)?;
        let now = self.clock.now_ms();
        let remaining_ms = deadline_ms - now;

        if remaining_ms <= 0 {
            log::info!("Countdown {} expired while inactive", key);
            self.store.clear_deadline(key);
            self.timers.insert(key.clone(), TimerSlot::Expired);
            return Some(CountdownEvent::Expired { key: key.clone() });
        }

        log::info!("Countdown {} resumed, {} ms left", key, remaining_ms);
        self.timers.insert(
            key.clone(),
            TimerSlot::Running(ActiveTimer {
                deadline_ms,
                remaining_ms,
                next_tick_at: now.saturating_add(self.tick_interval_ms),
            }),
        );
        Some(CountdownEvent::Tick {
            key: key.clone(),
            remaining_ms,
        })
    }

    /// Advances every due timer to the current clock reading.
    ///
    /// A timer whose deadline has passed yields a single `Expired` event, has
    /// its persisted entry cleared and never ticks again.
    pub fn tick(&mut self) -> Vec<CountdownEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        let mut cancelled = Vec::new();

        for (key, slot) in self.timers.iter_mut() {
            let TimerSlot::Running(timer) = slot else {
                continue;
            };
            if now < timer.next_tick_at {
                continue;
            }

            let Some(deadline_ms) = self.store.get_deadline(key) else {
                cancelled.push(key.clone());
                continue;
            };
            timer.deadline_ms = deadline_ms;

            let remaining_ms = deadline_ms - now;
            if remaining_ms <= 0 {
                timer.remaining_ms = 0;
                events.push(CountdownEvent::Tick {
                    key: key.clone(),
                    remaining_ms: 0,
                });
                self.store.clear_deadline(key);
                *slot = TimerSlot::Expired;
                log::info!("Countdown {} expired", key);
                events.push(CountdownEvent::Expired { key: key.clone() });
                continue;
            }

            timer.remaining_ms = remaining_ms;
            timer.next_tick_at = next_tick_after(timer.next_tick_at, now, self.tick_interval_ms);
            events.push(CountdownEvent::Tick {
                key: key.clone(),
                remaining_ms,
            });
        }

        for key in cancelled {
            log::info!("Countdown {} cancelled: deadline no longer stored", key);
            self.timers.remove(&key);
            events.push(CountdownEvent::Cancelled { key });
        }

        events
    }

    /// Cancels the timer and clears the persisted deadline. Idempotent.
    pub fn stop(&mut self, key: &CountdownKey) {
        if self.timers.remove(key).is_some() {
            log::debug!("Countdown {} stopped", key);
        }
        self.store.clear_deadline(key);
    }

    /// Stops every tracked countdown, clearing their persisted deadlines.
    pub fn stop_all(&mut self) {
        let keys: Vec<_> = self.timers.keys().cloned().collect();
        for key in keys {
            self.stop(&key);
        }
    }

    /// Drops all timers but keeps persisted deadlines, so a later `resume`
    /// picks them up again. Used when the owning view goes away.
    pub fn cancel_all(&mut self) {
        if !self.timers.is_empty() {
            log::debug!("Cancelling {} countdown timer(s)", self.timers.len());
        }
        self.timers.clear();
    }

    pub fn state(&self, key: &CountdownKey) -> CountdownState {
        match self.timers.get(key) {
            Some(TimerSlot::Running(timer)) => CountdownState::Running {
                remaining_ms: timer.remaining_ms,
            },
            Some(TimerSlot::Expired) => CountdownState::Expired,
            None => CountdownState::Idle,
        }
    }

    /// Live remaining time for a running key, floored at zero.
    pub fn remaining_ms(&self, key: &CountdownKey) -> Option<i64> {
        match self.timers.get(key) {
            Some(TimerSlot::Running(timer)) => {
                Some((timer.deadline_ms - self.clock.now_ms()).max(0))
            }
            Some(TimerSlot::Expired) => Some(0),
            None => None,
        }
    }

    pub fn is_running(&self, key: &CountdownKey) -> bool {
        matches!(self.timers.get(key), Some(TimerSlot::Running(_)))
    }

    pub fn running_keys(&self) -> Vec<CountdownKey> {
        self.timers
            .iter()
            .filter(|(_, slot)| matches!(slot, TimerSlot::Running(_)))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Every key with a timer slot, running or expired.
    pub fn tracked_keys(&self) -> Vec<CountdownKey> {
        self.timers.keys().cloned().collect()
    }

    /// Time until the earliest due tick, or `None` when nothing is running.
    pub fn next_tick_in(&self) -> Option<Duration> {
        let now = self.clock.now_ms();
        self.timers
            .values()
            .filter_map(|slot| match slot {
                TimerSlot::Running(timer) => Some(timer.next_tick_at),
                TimerSlot::Expired => None,
            })
            .min()
            .map(|next| Duration::from_millis(u64::try_from(next - now).unwrap_or(0)))
    }
}

fn next_tick_after(previous: i64, now: i64, interval: i64) -> i64 {
    let next = previous.saturating_add(interval);
    if next > now {
        next
    } else {
        now.saturating_add(interval)
    }
}
