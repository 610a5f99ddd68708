//! Declared result types of data entities.
use super::Value;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Bool,
    String,
    Text,
    Date,
    /// Option codes are stored as strings; `code` names the option list.
    Enum { code: String },
    List { element: Box<ValueType> },
    Map { fields: IndexMap<String, ValueType> },
}

impl ValueType {
    pub fn list_of(element: ValueType) -> Self {
        ValueType::List { element: Box::new(element) }
    }

    /// A well-formed stand-in value of this type, used to check formula
    /// syntax without touching stored data.
    pub fn placeholder_value(&self) -> Value {
        match self {
            ValueType::Number => Value::from_number(0.0),
            ValueType::Bool => Value::from_bool(false),
            ValueType::String | ValueType::Text | ValueType::Enum { .. } => Value::from_string(""),
            ValueType::Date => Value::from_date(NaiveDate::default()),
            ValueType::List { element } => Value::from_list([element.placeholder_value()]),
            ValueType::Map { fields } => Value::from_map(
                fields.iter().map(|(name, field)| (name.clone(), field.placeholder_value())),
            ),
        }
    }

    /// The placeholder payload rendered as a compact JSON literal.
    pub fn placeholder_literal(&self) -> String {
        self.placeholder_value().payload().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ValueType::Number, "0.0")]
    #[case(ValueType::Bool, "false")]
    #[case(ValueType::Text, "\"\"")]
    #[case(ValueType::Date, "\"1970-01-01\"")]
    #[case(ValueType::Enum { code: "gender".into() }, "\"\"")]
    #[case(ValueType::list_of(ValueType::Number), "[{\"value\":0.0}]")]
    fn placeholder_literals(#[case] ty: ValueType, #[case] expected: &str) {
        assert_eq!(ty.placeholder_literal(), expected);
    }

    #[test]
    fn map_placeholder_keeps_field_order() {
        let mut fields = IndexMap::new();
        fields.insert("b".to_string(), ValueType::Number);
        fields.insert("a".to_string(), ValueType::Bool);
        let placeholder = ValueType::Map { fields }.placeholder_value();
        let map = placeholder.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(map["b"].as_number(), Some(0.0));
    }

    #[test]
    fn types_deserialize_from_tagged_json() {
        let ty: ValueType =
            serde_json::from_str(r#"{"kind":"list","element":{"kind":"number"}}"#).unwrap();
        assert_eq!(ty, ValueType::list_of(ValueType::Number));
    }
}
