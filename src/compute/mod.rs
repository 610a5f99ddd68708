//! Evaluation of expressions against stored values.
pub mod aggregate;
pub mod cache;
pub mod evaluator;
pub mod formula;
pub mod partial;

pub use aggregate::{CalculationPartialValue, CalculationValue};
pub use cache::ValueCache;
pub use evaluator::{NormalizedDataElementValue, ValueEvaluator, EXPRESSION_LOG};
pub use formula::FormulaEvaluator;
pub use partial::PartialValueAggregator;
