//! Agent-based tissue simulation on a diffusing multi-substrate field.
//!
//! The numerical kernels live in `cellfield_core`; this crate owns the
//! [`model::world::World`] driver that wires them into the canonical step
//! order and sub-cycles the agent processes.

pub mod model;
