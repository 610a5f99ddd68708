use super::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an evaluation outcome, kept apart from the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Valid,
    /// No formula is defined for the evaluated point.
    MissingExpression,
    /// A referenced token does not resolve to an entity of the required kind.
    MissingDataElement,
    /// The formula evaluator rejected the fully resolved inputs.
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Valid => "VALID",
            Status::MissingExpression => "MISSING_EXPRESSION",
            Status::MissingDataElement => "MISSING_DATA_ELEMENT",
            Status::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Result of evaluating one expression at one point.
///
/// Fields are private so the pair can only be built through the constructors:
/// any status other than `Valid` always carries the NULL instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusValuePair {
    status: Status,
    value: Value,
}

impl StatusValuePair {
    pub fn valid(value: Value) -> Self {
        Self { status: Status::Valid, value }
    }

    pub fn missing_expression() -> Self {
        Self::without_value(Status::MissingExpression)
    }

    pub fn missing_data_element() -> Self {
        Self::without_value(Status::MissingDataElement)
    }

    pub fn error() -> Self {
        Self::without_value(Status::Error)
    }

    fn without_value(status: Status) -> Self {
        Self { status, value: Value::null() }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_valid(&self) -> bool {
        self.status == Status::Valid
    }

    pub fn into_parts(self) -> (Status, Value) {
        (self.status, self.value)
    }
}

impl fmt::Display for StatusValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusValuePair [status={}, value={}]", self.status, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_valid_statuses_carry_null() {
        for pair in [
            StatusValuePair::missing_expression(),
            StatusValuePair::missing_data_element(),
            StatusValuePair::error(),
        ] {
            assert!(!pair.is_valid());
            assert!(pair.value().is_null());
        }
    }

    #[test]
    fn status_serializes_in_upper_snake_case() {
        let text = serde_json::to_string(&Status::MissingDataElement).unwrap();
        assert_eq!(text, "\"MISSING_DATA_ELEMENT\"");
        assert_eq!(Status::MissingDataElement.to_string(), "MISSING_DATA_ELEMENT");
    }
}
