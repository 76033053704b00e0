//! Cell entity and its lifecycle loop.
//!
//! A cell is hungry at birth, eats one unit from the pool, stays full for a while, and
//! once it has eaten enough meals runs the reproduction protocol of its [`Variant`].
//! Every suspension point of the loop (pause checkpoint, scaled delay, food wait) also
//! listens for the stop signal, so a stopped cell's task ends at its next await.

use crate::manager::PopulationManager;
use crate::reproduction;
use mitosis_data::{CellId, CellView, DeathCause, LifeEvent, Variant};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// A suspension point ended because the cell was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

pub(crate) type Step<T = ()> = std::result::Result<T, Interrupted>;

#[derive(Debug, Clone, Copy)]
struct Vitals {
    hungry: bool,
    wants_to_reproduce: bool,
    meals_eaten: u32,
    death_cause: Option<DeathCause>,
}

#[derive(Debug)]
pub struct Cell {
    id: CellId,
    variant: Variant,
    /// Flips to false exactly once. Doubles as the stop signal.
    alive: watch::Sender<bool>,
    vitals: Mutex<Vitals>,
}

impl Cell {
    #[must_use]
    pub fn new(id: CellId, variant: Variant) -> Self {
        let (alive, _) = watch::channel(true);
        Self {
            id,
            variant,
            alive,
            vitals: Mutex::new(Vitals {
                hungry: true,
                wants_to_reproduce: false,
                meals_eaten: 0,
                death_cause: None,
            }),
        }
    }

    fn vitals(&self) -> MutexGuard<'_, Vitals> {
        self.vitals.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[must_use]
    pub fn id(&self) -> CellId {
        self.id
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        *self.alive.borrow()
    }

    #[must_use]
    pub fn is_hungry(&self) -> bool {
        self.vitals().hungry
    }

    #[must_use]
    pub fn wants_to_reproduce(&self) -> bool {
        self.vitals().wants_to_reproduce
    }

    #[must_use]
    pub fn meals_eaten(&self) -> u32 {
        self.vitals().meals_eaten
    }

    #[must_use]
    pub fn death_cause(&self) -> Option<DeathCause> {
        self.vitals().death_cause
    }

    #[must_use]
    pub fn view(&self) -> CellView {
        let vitals = *self.vitals();
        CellView {
            id: self.id,
            variant: self.variant,
            alive: self.is_alive(),
            hungry: vitals.hungry,
            wants_to_reproduce: vitals.wants_to_reproduce,
            meals_eaten: vitals.meals_eaten,
            death_cause: vitals.death_cause,
        }
    }

    /// Kills the cell. Returns `true` only for the call that actually ended its life.
    pub(crate) fn die(&self, cause: DeathCause) -> bool {
        let mut vitals = self.vitals();
        let died = self.alive.send_if_modified(|alive| std::mem::replace(alive, false));
        if died {
            vitals.death_cause = Some(cause);
        }
        died
    }

    /// Resolves once the cell is dead, immediately if it already is.
    pub(crate) async fn stopped(&self) {
        let mut rx = self.alive.subscribe();
        let _ = rx.wait_for(|alive| !*alive).await;
    }

    fn record_meal(&self) -> u32 {
        let mut vitals = self.vitals();
        vitals.meals_eaten += 1;
        vitals.hungry = false;
        vitals.meals_eaten
    }

    fn become_hungry(&self) {
        self.vitals().hungry = true;
    }

    /// Raises the reproduction flag unless it is already up.
    fn begin_reproduction(&self, threshold: u32) -> bool {
        let mut vitals = self.vitals();
        if vitals.wants_to_reproduce || vitals.meals_eaten < threshold {
            return false;
        }
        vitals.wants_to_reproduce = true;
        true
    }

    /// Back to square one after a completed or abandoned reproduction attempt.
    pub(crate) fn reset_after_reproduction(&self) {
        let mut vitals = self.vitals();
        vitals.meals_eaten = 0;
        vitals.wants_to_reproduce = false;
        vitals.hungry = true;
    }

    #[cfg(test)]
    pub(crate) fn vitals_for_test(&self, meals_eaten: u32, wants_to_reproduce: bool) {
        let mut vitals = self.vitals();
        vitals.meals_eaten = meals_eaten;
        vitals.wants_to_reproduce = wants_to_reproduce;
    }

    /// Task body: runs the loop until the cell dies.
    pub(crate) async fn live(self: Arc<Self>, manager: PopulationManager) {
        tracing::debug!(cell = self.id, variant = %self.variant, "Cell started");
        if self.cycle(&manager).await.is_err() {
            tracing::trace!(cell = self.id, "Cell interrupted at a suspension point");
        }
        tracing::debug!(cell = self.id, cause = ?self.death_cause(), "Cell finished");
    }

    async fn cycle(&self, manager: &PopulationManager) -> Step {
        let timing = manager.timing().clone();
        while self.is_alive() {
            manager.pause_point(self).await?;

            if self.is_hungry() {
                if !self.eat(manager).await? {
                    manager.starve(self);
                    break;
                }
            } else {
                manager.delay(self, timing.full_ms).await?;
                self.become_hungry();
            }

            manager.pause_point(self).await?;

            if self.is_alive() && self.begin_reproduction(timing.meals_to_reproduce) {
                reproduction::attempt(self, manager).await?;
                if !self.is_alive() {
                    break;
                }
            }

            manager.delay(self, timing.tick_ms).await?;
        }
        Ok(())
    }

    async fn eat(&self, manager: &PopulationManager) -> Step<bool> {
        let pool = manager.pool();
        let timeout = manager.timing().starve_timeout();
        let ate = tokio::select! {
            biased;
            _ = self.stopped() => return Err(Interrupted),
            ate = pool.try_acquire(timeout) => ate,
        };
        if ate {
            let meals = self.record_meal();
            let food_left = pool.available();
            tracing::debug!(cell = self.id, meals, food_left, "Cell ate");
            manager.emit(LifeEvent::Ate {
                id: self.id,
                meals,
                food_left,
            });
        }
        Ok(ate)
    }
}
