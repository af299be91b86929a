//! Solvers for multi-phase optimal control problems.
//!
//! A problem described with [`vela_core`] types is solved in three steps:
//!
//! - [`transcription`] turns it into a nonlinear program by LGL
//!   pseudospectral collocation
//! - [`nlp`] solves that program
//! - [`orchestrator`] drives both, tracks the solve lifecycle and extracts
//!   per-phase trajectories, costates and Hamiltonians
//!
//! [`export`] writes a solution as plain-text tables.

pub mod collocation;
pub mod export;
pub mod nlp;
pub mod orchestrator;
pub mod transcription;

mod fd;
