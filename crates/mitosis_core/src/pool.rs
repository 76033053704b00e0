//! Fair food bank shared by every cell of a run.
//!
//! Acquirers are served strictly in arrival order. Once anyone is queued, a newcomer
//! joins the back of the queue even when units show up, so a waiting cell can never be
//! overtaken by later arrivals. Units released by [`FoodPool::add_food`] are handed to
//! queued waiters first and only the remainder is banked.

use crate::config::FoodConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;

/// Running totals of every unit that entered or left the pool.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolLedger {
    pub initial: u64,
    pub added: u64,
    /// Units handed to successful acquisitions.
    pub consumed: u64,
    /// Units thrown away by [`FoodPool::clear`].
    pub discarded: u64,
}

impl PoolLedger {
    /// What the pool must hold when nothing is in flight.
    #[must_use]
    pub fn expected_available(&self) -> u64 {
        (self.initial + self.added).saturating_sub(self.consumed + self.discarded)
    }
}

struct Waiter {
    ticket: u64,
    grant: oneshot::Sender<()>,
}

struct PoolState {
    available: u64,
    queue: VecDeque<Waiter>,
    next_ticket: u64,
    /// Bumped by every clear; grants from an older epoch are never banked again.
    epoch: u64,
    ledger: PoolLedger,
}

impl PoolState {
    // Invariant: the queue is non-empty only while `available == 0`.
    fn distribute(&mut self, mut amount: u64) {
        while amount > 0 {
            match self.queue.pop_front() {
                Some(waiter) => {
                    // A closed receiver means the waiter already gave up.
                    if waiter.grant.send(()).is_ok() {
                        self.ledger.consumed += 1;
                        amount -= 1;
                    }
                }
                None => {
                    self.available += amount;
                    amount = 0;
                }
            }
        }
    }

    fn withdraw(&mut self, ticket: u64) -> bool {
        match self.queue.iter().position(|w| w.ticket == ticket) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }
}

pub struct FoodPool {
    state: Mutex<PoolState>,
    rng: Mutex<ChaCha8Rng>,
    scavenge: RangeInclusive<u64>,
}

impl FoodPool {
    /// A pool with `initial` units and an entropy-seeded scavenging RNG.
    #[must_use]
    pub fn new(initial: u64) -> Self {
        Self::with_rng(initial, ChaCha8Rng::from_entropy(), 1..=5)
    }

    /// A pool whose scavenging drops are reproducible.
    #[must_use]
    pub fn with_seed(initial: u64, seed: u64) -> Self {
        Self::with_rng(initial, ChaCha8Rng::seed_from_u64(seed), 1..=5)
    }

    #[must_use]
    pub fn from_config(config: &FoodConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(
            config.initial_food,
            rng,
            config.scavenge_min..=config.scavenge_max,
        )
    }

    fn with_rng(initial: u64, rng: ChaCha8Rng, scavenge: RangeInclusive<u64>) -> Self {
        Self {
            state: Mutex::new(PoolState {
                available: initial,
                queue: VecDeque::new(),
                next_ticket: 0,
                epoch: 0,
                ledger: PoolLedger {
                    initial,
                    ..PoolLedger::default()
                },
            }),
            rng: Mutex::new(rng),
            scavenge,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Waits up to `timeout` for one unit.
    ///
    /// Returns `false` on timeout, or when [`FoodPool::clear`] dropped the request, with
    /// no effect on the count. Dropping the returned future before it resolves withdraws
    /// the request; a unit granted in the meantime goes to the next waiter.
    pub async fn try_acquire(&self, timeout: Duration) -> bool {
        let (ticket, epoch, grant) = {
            let mut state = self.lock();
            if state.available > 0 && state.queue.is_empty() {
                state.available -= 1;
                state.ledger.consumed += 1;
                return true;
            }
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            let (tx, rx) = oneshot::channel();
            state.queue.push_back(Waiter { ticket, grant: tx });
            (ticket, state.epoch, rx)
        };

        let mut pending = PendingAcquire {
            pool: self,
            ticket,
            epoch,
            grant,
            settled: false,
        };
        let acquired = match tokio::time::timeout(timeout, &mut pending.grant).await {
            Ok(granted) => granted.is_ok(),
            Err(_) => pending.give_up(),
        };
        pending.settled = true;
        acquired
    }

    /// Adds `amount` units, serving queued acquirers first. Returns the banked count.
    pub fn add_food(&self, amount: u64) -> u64 {
        let mut state = self.lock();
        state.ledger.added += amount;
        state.distribute(amount);
        tracing::debug!(amount, available = state.available, "Food added");
        state.available
    }

    /// Drops the remains of a dead cell: a pseudo-random amount from the scavenge range.
    pub fn add_food_from_dead_cell(&self) -> u64 {
        let amount = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.gen_range(self.scavenge.clone())
        };
        self.add_food(amount);
        amount
    }

    /// Zeroes the count and fails every queued acquisition.
    pub fn clear(&self) {
        let mut state = self.lock();
        let discarded = state.available;
        state.ledger.discarded += discarded;
        state.available = 0;
        state.epoch += 1;
        let dropped = state.queue.len();
        state.queue.clear();
        tracing::debug!(discarded, dropped_waiters = dropped, "Food pool cleared");
    }

    #[must_use]
    pub fn available(&self) -> u64 {
        self.lock().available
    }

    /// Acquirers currently queued.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.lock().queue.len()
    }

    #[must_use]
    pub fn ledger(&self) -> PoolLedger {
        self.lock().ledger
    }
}

impl std::fmt::Debug for FoodPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FoodPool")
            .field("available", &state.available)
            .field("waiting", &state.queue.len())
            .field("ledger", &state.ledger)
            .finish()
    }
}

/// A queued acquisition. Settles the ticket however the wait ends.
struct PendingAcquire<'a> {
    pool: &'a FoodPool,
    ticket: u64,
    epoch: u64,
    grant: oneshot::Receiver<()>,
    settled: bool,
}

impl PendingAcquire<'_> {
    /// Timeout path. A grant that raced with the timer still counts as a meal.
    fn give_up(&mut self) -> bool {
        let mut state = self.pool.lock();
        if state.withdraw(self.ticket) {
            return false;
        }
        self.grant.try_recv().is_ok()
    }
}

impl Drop for PendingAcquire<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.pool.lock();
        if state.withdraw(self.ticket) {
            return;
        }
        if self.grant.try_recv().is_ok() {
            // Granted but nobody is left to eat it.
            state.ledger.consumed -= 1;
            if state.epoch == self.epoch {
                state.distribute(1);
            } else {
                state.ledger.discarded += 1;
            }
        }
    }
}
