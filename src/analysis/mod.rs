//! Static checks over the formula reference graph.
pub mod cycles;

pub use cycles::{DependencyCycle, DependencyGraphChecker};
