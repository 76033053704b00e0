use super::cell::CellView;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global time-scale setting. Every scaled delay is multiplied by [`Speed::multiplier`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speed {
    Fast,
    #[default]
    Normal,
    Slow,
}

impl Speed {
    /// `fast` and `slow` select their scale; any other label means normal speed.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "fast" => Self::Fast,
            "slow" => Self::Slow,
            _ => Self::Normal,
        }
    }

    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Fast => 0.2,
            Self::Normal => 1.0,
            Self::Slow => 2.0,
        }
    }

    /// Maps a stored multiplier back onto the closest label.
    #[must_use]
    pub fn from_multiplier(multiplier: f64) -> Self {
        if multiplier < 0.6 {
            Self::Fast
        } else if multiplier > 1.5 {
            Self::Slow
        } else {
            Self::Normal
        }
    }
}

/// Point-in-time read of a run for the reporting layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct StatusSnapshot {
    pub running: bool,
    pub paused: bool,
    /// Living cells only.
    pub cells: Vec<CellView>,
    pub available_food: u64,
    pub alive_count: usize,
    pub divisions: u64,
    pub reproductions: u64,
    pub speed: Speed,
    /// Advances on every status read of a running, unpaused simulation.
    pub tick: u64,
}

impl StatusSnapshot {
    /// The report for a controller with no run.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Aggregate statistics of one run, refreshed on pause, kill and summary requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    /// Every cell placed by the controller; offspring are not included.
    pub total_cells: usize,
    pub alive_asexual: usize,
    pub alive_sexual: usize,
    pub reproductions: u64,
    pub divisions: u64,
}

impl RunRecord {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            duration_secs: 0,
            total_cells: 0,
            alive_asexual: 0,
            alive_sexual: 0,
            reproductions: 0,
            divisions: 0,
        }
    }

    #[must_use]
    pub fn survivors(&self) -> usize {
        self.alive_asexual + self.alive_sexual
    }
}
