//! Engines for nonlinear programs posed through [`NlpProblem`].
//!
//! # Engines
//!
//! - [`interior_point`] — primal-dual barrier method with a filter line
//!   search and dense KKT factorization
//!
//! [`NlpProblem`]: vela_core::NlpProblem

pub mod interior_point;
