//! # Mitosis Core
//!
//! The concurrency engine behind the Mitosis cell simulator.
//!
//! A run is made of:
//! - a [`FoodPool`]: fair, countable food bank with timed acquisition
//! - one lightweight task per [`Cell`], each driving its own hunger/reproduction loop
//! - a [`PopulationManager`]: the arena of cells, pause barrier, time scale, id allocator
//!   and aggregate counters, mediating partner lookup and offspring spawning
//!
//! ## Example
//!
//! ```no_run
//! use mitosis_core::{FoodPool, PopulationManager, TimingConfig};
//! use mitosis_data::Variant;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let pool = Arc::new(FoodPool::new(20));
//! let manager = PopulationManager::new(pool, TimingConfig::default());
//! manager.spawn_cell(Variant::Asexual);
//! manager.spawn_cell(Variant::Sexual);
//!
//! manager.set_speed("fast");
//! tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//! println!("alive: {}", manager.alive_count());
//! manager.stop_all();
//! # }
//! ```

/// Cell entity and its lifecycle loop
pub mod cell;
/// Configuration management for simulation parameters
pub mod config;
/// Error types for fallible surfaces
pub mod error;
/// Structured logging setup
pub mod logging;
/// Population arena, pause barrier, time scale and reproduction mediation
pub mod manager;
/// Fair food bank
pub mod pool;
/// Asexual division and sexual rendezvous protocols
pub mod reproduction;

pub use cell::Cell;
pub use config::{FoodConfig, PopulationConfig, SimConfig, SummaryConfig, TimingConfig};
pub use error::{Result, SimError};
pub use logging::init_logging;
pub use manager::{Litter, PopulationManager};
pub use pool::{FoodPool, PoolLedger};
