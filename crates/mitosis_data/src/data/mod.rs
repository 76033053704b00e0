//! Core data structures for the Mitosis simulation.

pub mod cell;
pub mod event;
pub mod run;
