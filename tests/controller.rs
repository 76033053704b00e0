use async_trait::async_trait;
use mitosis_core::{SimConfig, SimError};
use mitosis_data::{RunRecord, Speed, Variant};
use mitosis_lib::app::{Simulation, StartOutcome};
use mitosis_observer::{Summarizer, SummaryError};
use std::time::Duration;

struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _records: &[RunRecord]) -> Result<String, SummaryError> {
        Err(SummaryError::Service("model not loaded".to_string()))
    }
}

struct CountingSummarizer;

#[async_trait]
impl Summarizer for CountingSummarizer {
    async fn summarize(&self, records: &[RunRecord]) -> Result<String, SummaryError> {
        Ok(format!("{} runs", records.len()))
    }
}

fn seeded_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.food.seed = Some(11);
    config
}

#[tokio::test(start_paused = true)]
async fn test_operations_need_a_run() {
    let mut sim = Simulation::new(seeded_config());
    assert!(matches!(sim.toggle_pause(), Err(SimError::NotStarted)));
    assert!(matches!(sim.add_cell(Variant::Sexual), Err(SimError::NotStarted)));
    assert!(matches!(sim.add_food(None), Err(SimError::NotStarted)));
    assert!(matches!(sim.set_speed("fast"), Err(SimError::NotStarted)));

    // No-ops when idle.
    sim.reset();
    sim.kill_all();
    let status = sim.status();
    assert!(!status.running);
    assert_eq!(status.alive_count, 0);
    assert_eq!(status.tick, 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_seeds_population_and_food() {
    let mut sim = Simulation::new(seeded_config());
    assert_eq!(sim.start(Some(30)), StartOutcome::Started);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let status = sim.status();
    assert!(status.running);
    assert!(!status.paused);
    assert_eq!(status.alive_count, 4);
    assert_eq!(status.available_food, 26);
    assert_eq!(status.speed, Speed::Normal);
    let sexual = status
        .cells
        .iter()
        .filter(|c| c.variant == Variant::Sexual)
        .count();
    assert_eq!(sexual, 2);
}

#[tokio::test(start_paused = true)]
async fn test_pause_then_start_resumes_same_run() {
    let mut sim = Simulation::new(seeded_config());
    sim.start(None);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(sim.toggle_pause().unwrap());
    assert!(sim.is_paused());
    assert_eq!(sim.history(10).len(), 1, "pausing records the run");
    let first_id = sim.history(1)[0].id;

    assert_eq!(sim.start(Some(999)), StartOutcome::Resumed);
    assert!(!sim.is_paused());
    let status = sim.status();
    assert_eq!(status.available_food, 16, "resume keeps the pool");

    // A second start on a running run begins a fresh one.
    assert_eq!(sim.start(Some(3)), StartOutcome::Started);
    sim.toggle_pause().unwrap();
    let history = sim.history(10);
    assert_eq!(history.len(), 2);
    assert_ne!(history[0].id, first_id);
}

#[tokio::test(start_paused = true)]
async fn test_status_tick_advances_only_while_running() {
    let mut sim = Simulation::new(seeded_config());
    sim.start(None);
    assert_eq!(sim.status().tick, 1);
    assert_eq!(sim.status().tick, 2);

    sim.toggle_pause().unwrap();
    assert_eq!(sim.status().tick, 2);
    assert!(sim.status().paused);

    sim.toggle_pause().unwrap();
    assert_eq!(sim.status().tick, 3);
}

#[tokio::test(start_paused = true)]
async fn test_add_food_default_and_explicit() {
    let mut sim = Simulation::new(seeded_config());
    sim.start(Some(0));
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Four hungry cells are queued; the default amount is alive + 5.
    assert_eq!(sim.add_food(None).unwrap(), 9);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(sim.status().available_food, 5);

    assert_eq!(sim.add_food(Some(2)).unwrap(), 2);
    assert_eq!(sim.status().available_food, 7);
}

#[tokio::test(start_paused = true)]
async fn test_add_cell_and_speed() {
    let mut sim = Simulation::new(seeded_config());
    sim.start(None);
    let id = sim.add_cell(Variant::Sexual).unwrap();
    assert_eq!(id, 5);
    assert_eq!(sim.set_speed("FAST").unwrap(), Speed::Fast);
    assert_eq!(sim.set_speed("warp").unwrap(), Speed::Normal);

    let status = sim.status();
    assert_eq!(status.alive_count, 5);
    assert_eq!(status.speed, Speed::Normal);
}

#[tokio::test(start_paused = true)]
async fn test_kill_all_records_survivors() {
    let mut sim = Simulation::new(seeded_config());
    sim.start(None);
    sim.add_cell(Variant::Asexual).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    sim.kill_all();
    let status = sim.status();
    assert_eq!(status.alive_count, 0);
    assert_eq!(status.available_food, 0);

    let record = &sim.history(1)[0];
    assert_eq!(record.total_cells, 5);
    assert_eq!(record.alive_asexual, 3);
    assert_eq!(record.alive_sexual, 2);

    // A later summary keeps the numbers taken before the kill.
    let report = sim.summary(1).await;
    assert_eq!(report.alive, 5);
    assert_eq!(report.total_cells, 5);
}

#[tokio::test(start_paused = true)]
async fn test_reset_forgets_run_but_keeps_history() {
    let mut sim = Simulation::new(seeded_config());
    sim.start(None);
    sim.toggle_pause().unwrap();
    sim.reset();

    assert!(sim.manager().is_none());
    assert!(!sim.is_running());
    assert!(matches!(sim.add_food(None), Err(SimError::NotStarted)));
    assert_eq!(sim.history(10).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_summary_without_history() {
    let mut sim = Simulation::new(seeded_config());
    let report = sim.summary(5).await;
    assert_eq!(report.analysis, "No data available. Run a simulation first.");
    assert_eq!(report.alive, 0);
}

#[tokio::test(start_paused = true)]
async fn test_summary_degrades_on_service_error() {
    let mut sim =
        Simulation::new(seeded_config()).with_summarizer(Box::new(FailingSummarizer));
    sim.start(None);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let report = sim.summary(3).await;
    assert!(report.analysis.starts_with("AI SERVICE ERROR: "));
    assert!(report.analysis.contains("model not loaded"));
    assert_eq!(report.alive, 4);
    assert_eq!(report.total_cells, 4);
}

#[tokio::test(start_paused = true)]
async fn test_summary_passes_latest_runs() {
    let mut sim =
        Simulation::new(seeded_config()).with_summarizer(Box::new(CountingSummarizer));
    for _ in 0..3 {
        sim.start(None);
        sim.kill_all();
    }
    assert_eq!(sim.summary(2).await.analysis, "2 runs");
    assert_eq!(sim.summary(10).await.analysis, "3 runs");
}
