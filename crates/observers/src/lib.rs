//! Reusable observers for Vela solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work with any solver whose events and actions implement them.
//!
//! # Modules
//!
//! - [`traits`] — Capability traits for cross-solver observers
//!   ([`HasObjective`], [`HasInfeasibility`], [`CanStopEarly`])
//! - [`History`] — records the convergence history of a solve
//! - [`StopWhenFeasible`] — stops a solve once its iterate is feasible
//!
//! [`Observer`]: vela_core::Observer
//! [`HasObjective`]: traits::HasObjective
//! [`HasInfeasibility`]: traits::HasInfeasibility
//! [`CanStopEarly`]: traits::CanStopEarly

mod feasible;
mod history;
pub mod traits;

pub use feasible::StopWhenFeasible;
pub use history::{History, Record};
