use crate::error::FormulaError;
use crate::value::{Value, ValueType};
use std::collections::HashMap;

/// The external formula language. The engine hands it the expression text
/// untouched; `values` and `types` are keyed by the referenced entity's id
/// without the leading `$`.
pub trait FormulaEvaluator: Send + Sync {
    fn evaluate(
        &self,
        expression: &str,
        expected: &ValueType,
        values: &HashMap<String, Value>,
        types: &HashMap<String, ValueType>,
    ) -> Result<Value, FormulaError>;

    /// Succeeds silently when `expression` is well formed for the given
    /// placeholder literals (keyed by token, `$` included).
    fn check_syntax(
        &self,
        expression: &str,
        placeholders: &HashMap<String, String>,
    ) -> Result<(), FormulaError>;
}
