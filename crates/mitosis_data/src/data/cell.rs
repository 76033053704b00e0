use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a cell within one run. Allocation starts at 1 and restarts after a reset.
pub type CellId = u64;

/// Reproduction strategy a cell is born with.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    /// Divides into two offspring and dies.
    #[default]
    Asexual,
    /// Finds a partner; both parents survive a single offspring.
    Sexual,
}

impl Variant {
    /// Parses a control-surface label. Only `sexual` (any case) selects the sexual
    /// strategy, every other label falls back to asexual.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("sexual") {
            Self::Sexual
        } else {
            Self::Asexual
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Asexual => "Asexual",
            Self::Sexual => "Sexual",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a cell stopped living.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeathCause {
    /// The timed food acquisition ran out.
    Starvation,
    /// Stop signal from the population manager, or the task was interrupted.
    Stopped,
    /// Asexual parent retiring after producing its two offspring.
    Division,
}

impl DeathCause {
    /// Whether the corpse leaves scavenged food behind.
    #[must_use]
    pub fn drops_food(self) -> bool {
        !matches!(self, Self::Division)
    }
}

/// Read-only view of a cell at one instant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CellView {
    pub id: CellId,
    pub variant: Variant,
    pub alive: bool,
    pub hungry: bool,
    pub wants_to_reproduce: bool,
    pub meals_eaten: u32,
    pub death_cause: Option<DeathCause>,
}

/// Alive cells split by strategy.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantCounts {
    pub asexual: usize,
    pub sexual: usize,
}

impl VariantCounts {
    pub fn record(&mut self, variant: Variant) {
        match variant {
            Variant::Asexual => self.asexual += 1,
            Variant::Sexual => self.sexual += 1,
        }
    }
}
