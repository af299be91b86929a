//! Core types for the Vela optimal control toolkit.
//!
//! This crate defines what a problem author writes and what solvers consume:
//!
//! - [`Phase`] and [`Problem`] — validated descriptors of a multi-phase
//!   optimal control problem (dimensions, mesh request, bounds, guess)
//! - [`Callbacks`] — the dynamics, cost, event and linkage functions
//! - [`NlpProblem`] — the boundary between a transcription and an NLP engine
//! - [`Observer`] — receives solver events and optionally returns control
//!   actions

mod bounds;
mod callbacks;
mod error;
mod nlp;
mod observer;
mod phase;
mod problem;

pub use bounds::{Bounds, Interval};
pub use callbacks::{Boundary, Callbacks, Dae, NodePoint};
pub use error::{BoundsError, DescriptorError, Field};
pub use nlp::NlpProblem;
pub use observer::Observer;
pub use phase::{Dimensions, Guess, Phase, linspace};
pub use problem::Problem;
