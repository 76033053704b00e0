pub mod shutdown;
pub mod simulation;

pub use shutdown::{ShutdownManager, INTERRUPTED_EXIT_CODE};
pub use simulation::{Simulation, StartOutcome, SummaryReport};
