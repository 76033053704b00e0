//! Mitosis: a concurrent population of cells competing for a shared food pool.
//!
//! The engine lives in `mitosis_core`; this crate wires it into a controller
//! ([`app::Simulation`]) and the `mitosis` command-line runner.

pub mod app;
pub mod model;
