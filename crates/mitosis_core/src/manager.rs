//! Population arena, pause barrier, time scale and reproduction mediation.
//!
//! [`PopulationManager`] is a cheap handle: clones share one population. Each cell task
//! holds a clone so it can call back for delays, pause checks and reproduction.
//!
//! Lock order is `mating` before `cells`. Liveness checks that decide whether offspring
//! may be born run under the `cells` write lock, the same lock [`PopulationManager::kill_all`]
//! holds while stopping everyone, so no offspring can slip into a reset population.

use crate::cell::{Cell, Interrupted, Step};
use crate::config::{SimConfig, TimingConfig};
use crate::pool::FoodPool;
use atomic_float::AtomicF64;
use mitosis_data::{CellId, CellView, DeathCause, LifeEvent, Speed, Variant, VariantCounts};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

const FIRST_ID: CellId = 1;
const DEFAULT_EVENT_CAPACITY: usize = 1024;

struct Shared {
    pool: Arc<FoodPool>,
    timing: TimingConfig,
    cells: RwLock<Vec<Arc<Cell>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicU64,
    time_scale: AtomicF64,
    paused: watch::Sender<bool>,
    divisions: AtomicU64,
    reproductions: AtomicU64,
    mating: Mutex<()>,
    events: broadcast::Sender<LifeEvent>,
}

/// One committed reproduction. Figures are sampled under the arena lock of the commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Litter {
    pub offspring: Vec<CellId>,
    /// Living cells right after the commit, a retired parent excluded.
    pub alive: usize,
    /// Divisions or reproductions so far, this one included.
    pub count: u64,
    pub food: u64,
}

#[derive(Clone)]
pub struct PopulationManager {
    shared: Arc<Shared>,
}

impl PopulationManager {
    #[must_use]
    pub fn new(pool: Arc<FoodPool>, timing: TimingConfig) -> Self {
        Self::with_event_capacity(pool, timing, DEFAULT_EVENT_CAPACITY)
    }

    #[must_use]
    pub fn from_config(pool: Arc<FoodPool>, config: &SimConfig) -> Self {
        Self::with_event_capacity(pool, config.timing.clone(), config.event_capacity)
    }

    #[must_use]
    pub fn with_event_capacity(
        pool: Arc<FoodPool>,
        timing: TimingConfig,
        event_capacity: usize,
    ) -> Self {
        let (paused, _) = watch::channel(false);
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                pool,
                timing,
                cells: RwLock::new(Vec::new()),
                tasks: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(FIRST_ID),
                time_scale: AtomicF64::new(Speed::Normal.multiplier()),
                paused,
                divisions: AtomicU64::new(0),
                reproductions: AtomicU64::new(0),
                mating: Mutex::new(()),
                events,
            }),
        }
    }

    fn read_cells(&self) -> RwLockReadGuard<'_, Vec<Arc<Cell>>> {
        self.shared.cells.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cells(&self) -> RwLockWriteGuard<'_, Vec<Arc<Cell>>> {
        self.shared.cells.write().unwrap_or_else(|e| e.into_inner())
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.shared.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<FoodPool> {
        &self.shared.pool
    }

    #[must_use]
    pub fn timing(&self) -> &TimingConfig {
        &self.shared.timing
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifeEvent> {
        self.shared.events.subscribe()
    }

    pub(crate) fn emit(&self, event: LifeEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }

    // ---------------------------------------------------------------------
    // Population
    // ---------------------------------------------------------------------

    fn allocate_id(&self) -> CellId {
        self.shared.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next cell will receive.
    #[must_use]
    pub fn next_id(&self) -> CellId {
        self.shared.next_id.load(Ordering::SeqCst)
    }

    /// Builds a cell with a fresh id. It does nothing until passed to [`Self::add_cell`].
    #[must_use]
    pub fn new_cell(&self, variant: Variant) -> Arc<Cell> {
        Arc::new(Cell::new(self.allocate_id(), variant))
    }

    /// Registers the cell and starts its task. Must be called within a tokio runtime.
    pub fn add_cell(&self, cell: Arc<Cell>) {
        self.write_cells().push(Arc::clone(&cell));
        self.launch(cell, Vec::new());
    }

    pub fn spawn_cell(&self, variant: Variant) -> CellId {
        let cell = self.new_cell(variant);
        let id = cell.id();
        self.add_cell(cell);
        id
    }

    fn launch(&self, cell: Arc<Cell>, parents: Vec<CellId>) {
        self.emit(LifeEvent::Born {
            id: cell.id(),
            variant: cell.variant(),
            parents,
        });
        let handle = tokio::spawn(cell.live(self.clone()));
        let mut tasks = self.tasks();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Stable copy of the arena. Later appends and resets do not affect it.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Cell>> {
        self.read_cells().clone()
    }

    #[must_use]
    pub fn cell(&self, id: CellId) -> Option<Arc<Cell>> {
        self.read_cells().iter().find(|c| c.id() == id).cloned()
    }

    /// Views of every registered cell, dead ones included.
    #[must_use]
    pub fn cell_views(&self) -> Vec<CellView> {
        self.snapshot().iter().map(|c| c.view()).collect()
    }

    /// Registered cells, dead ones included.
    #[must_use]
    pub fn population_len(&self) -> usize {
        self.read_cells().len()
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.snapshot().iter().filter(|c| c.is_alive()).count()
    }

    #[must_use]
    pub fn alive_by_variant(&self) -> VariantCounts {
        let mut counts = VariantCounts::default();
        for cell in self.snapshot().iter().filter(|c| c.is_alive()) {
            counts.record(cell.variant());
        }
        counts
    }

    #[must_use]
    pub fn divisions(&self) -> u64 {
        self.shared.divisions.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn reproductions(&self) -> u64 {
        self.shared.reproductions.load(Ordering::SeqCst)
    }

    // ---------------------------------------------------------------------
    // Pause barrier and time scale
    // ---------------------------------------------------------------------

    pub fn set_paused(&self, paused: bool) {
        let was = self.shared.paused.send_replace(paused);
        if was != paused {
            tracing::info!(paused, "Pause flag changed");
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.shared.paused.borrow()
    }

    /// Blocks while the pause flag is set. Every waiter is released together when it clears.
    pub async fn checkpoint(&self) {
        let mut rx = self.shared.paused.subscribe();
        let _ = rx.wait_for(|paused| !*paused).await;
    }

    /// Applies a speed label: `fast` → 0.2, `slow` → 2.0, anything else → 1.0.
    pub fn set_speed(&self, label: &str) -> Speed {
        let speed = Speed::from_label(label);
        self.shared
            .time_scale
            .store(speed.multiplier(), Ordering::SeqCst);
        tracing::info!(?speed, "Time scale changed");
        speed
    }

    #[must_use]
    pub fn speed(&self) -> Speed {
        Speed::from_multiplier(self.time_scale())
    }

    #[must_use]
    pub fn time_scale(&self) -> f64 {
        self.shared.time_scale.load(Ordering::SeqCst)
    }

    /// `base_ms` under the current time scale, never below the configured floor.
    #[must_use]
    pub fn scaled(&self, base_ms: u64) -> Duration {
        let scaled = (base_ms as f64 * self.time_scale()) as u64;
        Duration::from_millis(scaled.max(self.shared.timing.min_delay_ms))
    }

    pub(crate) async fn pause_point(&self, cell: &Cell) -> Step {
        tokio::select! {
            biased;
            _ = cell.stopped() => Err(Interrupted),
            _ = self.checkpoint() => Ok(()),
        }
    }

    pub(crate) async fn delay(&self, cell: &Cell, base_ms: u64) -> Step {
        let duration = self.scaled(base_ms);
        tokio::select! {
            biased;
            _ = cell.stopped() => Err(Interrupted),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    // ---------------------------------------------------------------------
    // Life and death
    // ---------------------------------------------------------------------

    /// Kills `cell` and drops its remains when the cause leaves any.
    ///
    /// Returns the units dropped, or `None` when the cell was already dead.
    fn retire(&self, cell: &Cell, cause: DeathCause) -> Option<u64> {
        if !cell.die(cause) {
            return None;
        }
        if cause.drops_food() {
            Some(self.shared.pool.add_food_from_dead_cell())
        } else {
            Some(0)
        }
    }

    pub(crate) fn starve(&self, cell: &Cell) {
        // Read lock: a concurrent reset either precedes the death or sees the drop.
        let _cells = self.read_cells();
        if let Some(dropped) = self.retire(cell, DeathCause::Starvation) {
            tracing::info!(cell = cell.id(), dropped, "Cell starved");
            self.emit(LifeEvent::Starved {
                id: cell.id(),
                dropped,
            });
        }
    }

    fn stop_cell(&self, cell: &Cell) -> bool {
        let Some(dropped) = self.retire(cell, DeathCause::Stopped) else {
            return false;
        };
        self.emit(LifeEvent::Stopped {
            id: cell.id(),
            dropped,
        });
        true
    }

    /// First other living sexual cell that wants to reproduce, in arena order.
    #[must_use]
    pub fn find_mating_partner(&self, requester: &Cell) -> Option<Arc<Cell>> {
        self.snapshot().into_iter().find(|c| {
            c.variant() == Variant::Sexual
                && c.id() != requester.id()
                && c.is_alive()
                && c.wants_to_reproduce()
        })
    }

    /// Spawns the offspring of `parent` (and `partner`) and bumps the matching counter.
    ///
    /// An asexual parent without partner yields two asexual offspring and one division,
    /// and retires in the same commit. Two sexual parents yield one sexual offspring and
    /// one reproduction. Any other combination, or a dead parent, yields `None`.
    pub fn reproduce(&self, parent: &Cell, partner: Option<&Cell>) -> Option<Litter> {
        let (variant, litter, counter) = match (parent.variant(), partner) {
            (Variant::Asexual, None) => (Variant::Asexual, 2, &self.shared.divisions),
            (Variant::Sexual, Some(p)) if p.variant() == Variant::Sexual => {
                (Variant::Sexual, 1, &self.shared.reproductions)
            }
            _ => {
                tracing::warn!(
                    parent = parent.id(),
                    partner = ?partner.map(Cell::id),
                    "Unsupported parent combination"
                );
                return None;
            }
        };
        let parents: Vec<CellId> = std::iter::once(parent.id())
            .chain(partner.map(Cell::id))
            .collect();

        let (children, litter) = {
            let mut cells = self.write_cells();
            if !parent.is_alive() || partner.is_some_and(|p| !p.is_alive()) {
                return None;
            }
            let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let children: Vec<Arc<Cell>> = (0..litter)
                .map(|_| Arc::new(Cell::new(self.allocate_id(), variant)))
                .collect();
            cells.extend(children.iter().cloned());
            if partner.is_none() {
                self.retire(parent, DeathCause::Division);
            }
            let litter = Litter {
                offspring: children.iter().map(|c| c.id()).collect(),
                alive: cells.iter().filter(|c| c.is_alive()).count(),
                count,
                food: self.shared.pool.available(),
            };
            (children, litter)
        };

        for child in children {
            self.launch(child, parents.clone());
        }
        Some(litter)
    }

    /// Commits a sexual rendezvous inside the population-wide mating section.
    ///
    /// Both cells are re-validated inside the section, so a cell can be consumed by at
    /// most one rendezvous per reproduction flag. On success both parents are reset and
    /// the offspring id is returned.
    pub fn consummate(&self, requester: &Cell, partner: &Cell) -> Option<CellId> {
        let _section = self
            .shared
            .mating
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let willing = |c: &Cell| c.is_alive() && c.wants_to_reproduce();
        if !willing(requester) || !willing(partner) {
            return None;
        }

        let litter = self.reproduce(requester, Some(partner))?;
        let offspring = litter.offspring.first().copied()?;
        requester.reset_after_reproduction();
        partner.reset_after_reproduction();

        let Litter {
            alive,
            count: reproductions,
            food,
            ..
        } = litter;
        tracing::info!(
            parents = ?[requester.id(), partner.id()],
            offspring,
            alive,
            reproductions,
            "Cells reproduced"
        );
        self.emit(LifeEvent::Reproduced {
            parents: [requester.id(), partner.id()],
            offspring,
            alive,
            reproductions,
            food,
        });
        Some(offspring)
    }

    // ---------------------------------------------------------------------
    // Reset
    // ---------------------------------------------------------------------

    /// Stops every cell, empties the pool and the arena, restarts ids at 1 and zeroes
    /// both counters.
    pub fn kill_all(&self) {
        let stopped = {
            let mut cells = self.write_cells();
            let stopped = cells.iter().filter(|c| self.stop_cell(c)).count();
            cells.clear();
            self.shared.pool.clear();
            self.shared.next_id.store(FIRST_ID, Ordering::SeqCst);
            self.shared.divisions.store(0, Ordering::SeqCst);
            self.shared.reproductions.store(0, Ordering::SeqCst);
            stopped
        };
        tracing::info!(stopped, "Population reset");
        self.emit(LifeEvent::Reset { stopped });
    }

    /// [`Self::kill_all`], then aborts every task still winding down.
    pub fn stop_all(&self) {
        self.kill_all();
        for task in self.tasks().drain(..) {
            task.abort();
        }
    }

    /// [`Self::kill_all`], then waits for every task to finish.
    pub async fn shutdown(&self) {
        self.kill_all();
        let tasks: Vec<JoinHandle<()>> = self.tasks().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("Cell task panicked: {e}");
                }
            }
        }
    }
}

impl std::fmt::Debug for PopulationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopulationManager")
            .field("population", &self.population_len())
            .field("next_id", &self.next_id())
            .field("paused", &self.is_paused())
            .field("speed", &self.speed())
            .field("divisions", &self.divisions())
            .field("reproductions", &self.reproductions())
            .finish()
    }
}
