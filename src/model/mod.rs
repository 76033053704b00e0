pub use mitosis_core::{Cell, FoodPool, PopulationManager};
pub use mitosis_data::{CellId, CellView, DeathCause, LifeEvent, Variant};

pub mod config {
    pub use mitosis_core::config::*;
}
pub mod history {
    pub use mitosis_data::{RunRecord, StatusSnapshot};
    pub use mitosis_observer::RunHistory;
}
pub mod summary {
    pub use mitosis_observer::{
        clean_response, HeuristicSummarizer, LmStudioSummarizer, Summarizer, SummaryError,
    };
}
