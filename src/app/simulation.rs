//! Control and reporting surface over one simulation run.
//!
//! Mirrors the operations a front end needs: start/resume, pause toggle, add cell, add
//! food, speed, reset, kill-all, status and summary. Operations that need a run return
//! [`SimError::NotStarted`] when there is none; reset and kill-all are no-ops instead.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use mitosis_core::{FoodPool, PopulationManager, Result, SimConfig, SimError};
use mitosis_data::{CellId, RunRecord, Speed, StatusSnapshot, Variant};
use mitosis_observer::{HeuristicSummarizer, RunHistory, Summarizer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartOutcome {
    Started,
    Resumed,
}

/// Answer of [`Simulation::summary`]. Figures come from the newest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub analysis: String,
    pub total_cells: usize,
    /// Sexual reproductions.
    pub generations: u64,
    pub divisions: u64,
    pub alive: usize,
}

struct Run {
    pool: Arc<FoodPool>,
    manager: PopulationManager,
    running: bool,
    paused: bool,
    record: RunRecord,
    started: Instant,
    total_created: usize,
    /// Set by kill-all; the record keeps the survivors counted just before.
    finished: bool,
}

impl Run {
    fn refresh_record(&mut self) -> RunRecord {
        if self.finished {
            return self.record.clone();
        }
        let alive = self.manager.alive_by_variant();
        self.record.duration_secs = self.started.elapsed().as_secs();
        self.record.total_cells = self.total_created;
        self.record.alive_asexual = alive.asexual;
        self.record.alive_sexual = alive.sexual;
        self.record.reproductions = self.manager.reproductions();
        self.record.divisions = self.manager.divisions();
        self.record.clone()
    }
}

pub struct Simulation {
    config: SimConfig,
    run: Option<Run>,
    history: RunHistory,
    summarizer: Box<dyn Summarizer>,
    status_tick: u64,
}

impl Simulation {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let history = RunHistory::new(config.summary.history_size);
        Self {
            config,
            run: None,
            history,
            summarizer: Box::new(HeuristicSummarizer),
            status_tick: 0,
        }
    }

    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The live manager, for callers that want events or finer control.
    #[must_use]
    pub fn manager(&self) -> Option<&PopulationManager> {
        self.run.as_ref().map(|run| &run.manager)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.running)
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.paused)
    }

    fn run_mut(&mut self) -> Result<&mut Run> {
        self.run.as_mut().ok_or(SimError::NotStarted)
    }

    /// Resumes a paused run, or replaces any existing run with a fresh one.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&mut self, initial_food: Option<u64>) -> StartOutcome {
        if let Some(run) = self.run.as_mut().filter(|run| run.paused) {
            run.paused = false;
            run.running = true;
            run.manager.set_paused(false);
            tracing::info!("Simulation resumed");
            return StartOutcome::Resumed;
        }

        if let Some(previous) = self.run.take() {
            previous.manager.stop_all();
        }

        let mut food = self.config.food.clone();
        if let Some(amount) = initial_food {
            food.initial_food = amount;
        }
        let pool = Arc::new(FoodPool::from_config(&food));
        let manager = PopulationManager::from_config(Arc::clone(&pool), &self.config);

        let population = &self.config.population;
        let seeds = std::iter::repeat(Variant::Asexual)
            .take(population.initial_asexual)
            .chain(std::iter::repeat(Variant::Sexual).take(population.initial_sexual));
        let mut total_created = 0;
        for variant in seeds {
            manager.spawn_cell(variant);
            total_created += 1;
        }

        tracing::info!(
            initial_food = food.initial_food,
            cells = total_created,
            "Simulation started"
        );
        self.status_tick = 0;
        self.run = Some(Run {
            pool,
            manager,
            running: true,
            paused: false,
            record: RunRecord::new(Utc::now()),
            started: Instant::now(),
            total_created,
            finished: false,
        });
        StartOutcome::Started
    }

    /// Flips the pause flag. Pausing also records the run's statistics.
    pub fn toggle_pause(&mut self) -> Result<bool> {
        let run = self.run_mut()?;
        run.paused = !run.paused;
        run.manager.set_paused(run.paused);
        let paused = run.paused;
        if paused {
            self.record_run();
        }
        Ok(paused)
    }

    pub fn add_cell(&mut self, variant: Variant) -> Result<CellId> {
        let run = self.run_mut()?;
        let id = run.manager.spawn_cell(variant);
        run.total_created += 1;
        run.finished = false;
        Ok(id)
    }

    /// Adds `amount` units, by default `max(5, alive + 5)`. Returns the amount added.
    pub fn add_food(&mut self, amount: Option<u64>) -> Result<u64> {
        let run = self.run_mut()?;
        let amount =
            amount.unwrap_or_else(|| (run.manager.alive_count() as u64 + 5).max(5));
        run.pool.add_food(amount);
        Ok(amount)
    }

    pub fn set_speed(&mut self, label: &str) -> Result<Speed> {
        Ok(self.run_mut()?.manager.set_speed(label))
    }

    /// Stops everything and forgets the run. The history survives.
    pub fn reset(&mut self) {
        if let Some(run) = self.run.take() {
            run.manager.stop_all();
            tracing::info!("Simulation reset");
        }
    }

    /// Kills the whole population of the current run and records its statistics.
    pub fn kill_all(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        // Read the survivors before they are gone.
        let record = run.refresh_record();
        run.manager.kill_all();
        run.finished = true;
        run.running = false;
        self.history.upsert(record);
        tracing::info!("Population killed");
    }

    fn record_run(&mut self) {
        if let Some(run) = self.run.as_mut() {
            let record = run.refresh_record();
            self.history.upsert(record);
        }
    }

    /// Point-in-time report. Advances the status tick while running and not paused.
    pub fn status(&mut self) -> StatusSnapshot {
        let Some(run) = self.run.as_ref() else {
            return StatusSnapshot::idle();
        };
        if !run.paused {
            self.status_tick += 1;
        }
        let cells: Vec<_> = run
            .manager
            .cell_views()
            .into_iter()
            .filter(|cell| cell.alive)
            .collect();
        StatusSnapshot {
            running: run.running,
            paused: run.paused,
            alive_count: cells.len(),
            cells,
            available_food: run.pool.available(),
            divisions: run.manager.divisions(),
            reproductions: run.manager.reproductions(),
            speed: run.manager.speed(),
            tick: self.status_tick,
        }
    }

    /// Digest of the latest `last_n` runs. Never fails: service errors become text.
    pub async fn summary(&mut self, last_n: usize) -> SummaryReport {
        self.record_run();
        let records = self.history.latest(last_n.max(1));
        let Some(latest) = records.first() else {
            return SummaryReport {
                analysis: "No data available. Run a simulation first.".to_string(),
                total_cells: 0,
                generations: 0,
                divisions: 0,
                alive: 0,
            };
        };

        let analysis = match self.summarizer.summarize(&records).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Summary service failed: {e}");
                format!("AI SERVICE ERROR: {e}")
            }
        };
        SummaryReport {
            analysis,
            total_cells: latest.total_cells,
            generations: latest.reproductions,
            divisions: latest.divisions,
            alive: latest.survivors(),
        }
    }

    /// Recorded runs, newest first.
    #[must_use]
    pub fn history(&self, n: usize) -> Vec<RunRecord> {
        self.history.latest(n)
    }

    /// Waits for every cell task of the current run to finish after killing it.
    pub async fn shutdown(&mut self) {
        if let Some(run) = self.run.as_mut() {
            let record = run.refresh_record();
            self.history.upsert(record);
            run.manager.shutdown().await;
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.manager.stop_all();
        }
    }
}
