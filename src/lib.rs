// Core of the indicator engine: evaluates `$<id>` formulas over a location
// hierarchy and discrete periods, and checks the reference graph for cycles.
//
// Storage, location traversal and the formula grammar are collaborators
// supplied by the caller through the traits in `store` and `compute::formula`.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod store;
pub mod value;

#[cfg(test)]
mod test_support;

pub use config::EngineConfig;
pub use engine::{Collaborators, ExpressionEngine};
pub use error::{ConfigError, EngineError, EngineResult, FormulaError, StoreError, ValueError};
pub use value::{Status, StatusValuePair, Value, ValueType};
