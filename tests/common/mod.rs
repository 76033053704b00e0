pub mod macros;

use mitosis_core::{FoodPool, PopulationManager, SimConfig, TimingConfig};
use mitosis_data::{LifeEvent, Variant};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[allow(dead_code)]
pub struct RunBuilder {
    config: SimConfig,
    cells: Vec<Variant>,
    seed: u64,
}

#[allow(dead_code)]
impl RunBuilder {
    pub fn new() -> Self {
        let mut config = SimConfig::default();
        config.food.initial_food = 0;
        Self {
            config,
            cells: Vec::new(),
            seed: 7,
        }
    }

    pub fn with_food(mut self, amount: u64) -> Self {
        self.config.food.initial_food = amount;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_timing<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut TimingConfig),
    {
        modifier(&mut self.config.timing);
        self
    }

    pub fn with_cells(mut self, variant: Variant, count: usize) -> Self {
        self.cells.extend(std::iter::repeat(variant).take(count));
        self
    }

    /// Manager and pool without any cell started.
    pub fn build_idle(&self) -> (PopulationManager, Arc<FoodPool>) {
        let pool = Arc::new(FoodPool::with_seed(
            self.config.food.initial_food,
            self.seed,
        ));
        let manager = PopulationManager::from_config(Arc::clone(&pool), &self.config);
        (manager, pool)
    }

    /// Subscribes before spawning so no `Born` event is missed.
    pub fn start(self) -> Run {
        let (manager, pool) = self.build_idle();
        let events = manager.subscribe();
        for variant in &self.cells {
            manager.spawn_cell(*variant);
        }
        Run {
            manager,
            pool,
            events,
        }
    }
}

pub struct Run {
    pub manager: PopulationManager,
    pub pool: Arc<FoodPool>,
    pub events: broadcast::Receiver<LifeEvent>,
}

#[allow(dead_code)]
impl Run {
    /// Next event matching `pred`, collecting everything seen on the way.
    ///
    /// Panics after `limit` of (virtual or real) time.
    pub async fn wait_for<F>(&mut self, limit: Duration, pred: F) -> (LifeEvent, Vec<LifeEvent>)
    where
        F: Fn(&LifeEvent) -> bool,
    {
        let mut seen = Vec::new();
        let search = async {
            loop {
                match self.events.recv().await {
                    Ok(event) if pred(&event) => return event,
                    Ok(event) => seen.push(event),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => {
                        panic!("event stream closed")
                    }
                }
            }
        };
        let event = tokio::time::timeout(limit, search)
            .await
            .expect("expected event did not arrive in time");
        (event, seen)
    }

    /// Everything already broadcast, skipping over any lag.
    pub fn drain(&mut self) -> Vec<LifeEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return events,
            }
        }
    }
}

/// Millisecond-scale timing for tests running on the real clock.
#[allow(dead_code)]
pub fn quick_timing(timing: &mut TimingConfig) {
    timing.tick_ms = 2;
    timing.full_ms = 10;
    timing.starve_timeout_ms = 30;
    timing.division_delay_ms = 5;
    timing.mating_delay_ms = 5;
    timing.min_delay_ms = 1;
}
