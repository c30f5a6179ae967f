//! Core data structures for the cellfield simulation.

pub mod agent;
pub mod phenotype;
pub mod volume;
