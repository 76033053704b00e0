//! Plain data types shared by the engine, the summary service and the controller.

pub mod data;

pub use data::cell::{CellId, CellView, DeathCause, Variant, VariantCounts};
pub use data::event::LifeEvent;
pub use data::run::{RunRecord, Speed, StatusSnapshot};
