use super::cell::{CellId, Variant};
use serde::{Deserialize, Serialize};

/// Lifecycle notifications broadcast by the population manager.
///
/// Counts carried by `Divided` and `Reproduced` are sampled under the arena lock of the
/// commit, before the offspring tasks are started.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LifeEvent {
    Born {
        id: CellId,
        variant: Variant,
        parents: Vec<CellId>,
    },
    Ate {
        id: CellId,
        meals: u32,
        food_left: u64,
    },
    Starved {
        id: CellId,
        dropped: u64,
    },
    Divided {
        parent: CellId,
        offspring: Vec<CellId>,
        alive: usize,
        divisions: u64,
        food: u64,
    },
    Reproduced {
        parents: [CellId; 2],
        offspring: CellId,
        alive: usize,
        reproductions: u64,
        food: u64,
    },
    MatingAbandoned {
        id: CellId,
        attempts: u32,
    },
    Stopped {
        id: CellId,
        dropped: u64,
    },
    Reset {
        stopped: usize,
    },
}
