//! Legendre–Gauss–Lobatto collocation.
//!
//! A phase is normalized to `σ ∈ [0, 1]` and split into mesh segments. Each
//! segment carries its own LGL rule on `τ ∈ [-1, 1]`; node `a` of segment `s`
//! out of `S` sits at `σ = (s + (τ_a + 1) / 2) / S`.

mod lgl;
mod mesh;

pub use lgl::Lgl;
pub use mesh::{Mesh, Segment};
