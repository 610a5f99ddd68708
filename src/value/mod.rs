//! The immutable value representation every computed result flows through.
//!
//! A `Value` is backed by one JSON document of the shape `{"value": <payload>}`.
//! Other top-level keys are attributes. Composite payloads nest full documents:
//! a list is an array of documents, a map is an array of
//! `{"map_key": <string>, "map_value": <document>}` pairs so that key order and
//! arbitrary string keys survive serialization.
pub mod status;
pub mod types;

pub use status::{Status, StatusValuePair};
pub use types::ValueType;

use crate::error::ValueError;
use chrono::NaiveDate;
use indexmap::IndexMap;
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value as Json};
use std::fmt;
use std::sync::Arc;

pub const VALUE_KEY: &str = "value";
pub const MAP_KEY: &str = "map_key";
pub const MAP_VALUE: &str = "map_value";
const RESERVED_KEYS: [&str; 3] = [VALUE_KEY, MAP_KEY, MAP_VALUE];

/// Canonical, locale-independent date format used for encoding and decoding.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static NULL_INSTANCE: Lazy<Value> = Lazy::new(|| Value::from_payload(Json::Null));

/// Cheap to clone: clones share the document and the decoded views.
#[derive(Clone)]
pub struct Value {
    inner: Arc<Inner>,
}

struct Inner {
    raw: Box<str>,
    document: Json,
    views: Views,
}

/// Typed views decoded on first access. A failed decode is cached as `None`.
#[derive(Default)]
struct Views {
    number: OnceCell<Option<f64>>,
    boolean: OnceCell<Option<bool>>,
    date: OnceCell<Option<NaiveDate>>,
    list: OnceCell<Option<Vec<Value>>>,
    map: OnceCell<Option<IndexMap<String, Value>>>,
}

impl Value {
    /// The explicit "no value" instance.
    pub fn null() -> Self {
        NULL_INSTANCE.clone()
    }

    /// Parses a serialized value document. The backing text is re-encoded,
    /// so `{"value":3}` reads back as `{"value":3.0}`.
    pub fn parse(raw: &str) -> Result<Self, ValueError> {
        let document: Json =
            serde_json::from_str(raw).map_err(|e| ValueError::Malformed(e.to_string()))?;
        Self::from_json(document)
    }

    /// Wraps an already-decoded document.
    pub fn from_json(mut document: Json) -> Result<Self, ValueError> {
        let Some(fields) = document.as_object_mut() else {
            return Err(ValueError::NotAnObject);
        };
        if let Some(payload) = fields.get_mut(VALUE_KEY) {
            normalize_numbers(payload);
        }
        Ok(Self::from_document(document))
    }

    /// Non-finite numbers have no JSON encoding and become the NULL instance.
    pub fn from_number(number: f64) -> Self {
        serde_json::Number::from_f64(number)
            .map_or_else(Self::null, |n| Self::from_payload(Json::Number(n)))
    }

    pub fn from_string(text: impl Into<String>) -> Self {
        Self::from_payload(Json::String(text.into()))
    }

    pub fn from_bool(flag: bool) -> Self {
        Self::from_payload(Json::Bool(flag))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_payload(Json::String(date.format(DATE_FORMAT).to_string()))
    }

    pub fn from_list(values: impl IntoIterator<Item = Value>) -> Self {
        let items = values.into_iter().map(|v| v.inner.document.clone()).collect();
        Self::from_payload(Json::Array(items))
    }

    pub fn from_map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let pairs = entries
            .into_iter()
            .map(|(key, value)| {
                let key: String = key.into();
                json!({ MAP_KEY: key, MAP_VALUE: value.inner.document.clone() })
            })
            .collect();
        Self::from_payload(Json::Array(pairs))
    }

    pub(crate) fn from_payload(mut payload: Json) -> Self {
        normalize_numbers(&mut payload);
        Self::from_document(json!({ VALUE_KEY: payload }))
    }

    fn from_document(document: Json) -> Self {
        let raw = document.to_string().into_boxed_str();
        Self {
            inner: Arc::new(Inner { raw, document, views: Views::default() }),
        }
    }

    /// The payload under the `value` key. A document without one is null.
    pub fn payload(&self) -> &Json {
        self.inner.document.get(VALUE_KEY).unwrap_or(&Json::Null)
    }

    pub fn is_null(&self) -> bool {
        self.payload().is_null()
    }

    pub fn as_number(&self) -> Option<f64> {
        *self.inner.views.number.get_or_init(|| self.payload().as_f64())
    }

    pub fn as_boolean(&self) -> Option<bool> {
        *self.inner.views.boolean.get_or_init(|| self.payload().as_bool())
    }

    pub fn as_string(&self) -> Option<&str> {
        self.payload().as_str()
    }

    /// Enum options are stored by their code.
    pub fn as_enum(&self) -> Option<&str> {
        self.as_string()
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        *self.inner.views.date.get_or_init(|| {
            self.payload()
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
        })
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        self.inner
            .views
            .list
            .get_or_init(|| decode_list(self.payload()))
            .as_deref()
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        self.inner
            .views
            .map
            .get_or_init(|| decode_map(self.payload()))
            .as_ref()
    }

    pub fn attribute(&self, key: &str) -> Option<&Json> {
        if RESERVED_KEYS.contains(&key) {
            return None;
        }
        self.inner.document.get(key)
    }

    /// Returns a copy of this value carrying one more attribute.
    pub fn with_attribute(&self, key: &str, attribute: Json) -> Result<Self, ValueError> {
        if RESERVED_KEYS.contains(&key) {
            return Err(ValueError::ReservedAttribute(key.to_string()));
        }
        let mut document = self.inner.document.clone();
        if let Some(object) = document.as_object_mut() {
            object.insert(key.to_string(), attribute);
        }
        Ok(Self::from_document(document))
    }

    pub fn without_attributes(&self) -> Self {
        if self.is_null() {
            Self::null()
        } else {
            Self::from_payload(self.payload().clone())
        }
    }

    pub fn as_json(&self) -> &Json {
        &self.inner.document
    }

    /// The serialized form backing this value.
    pub fn as_raw(&self) -> &str {
        &self.inner.raw
    }
}

fn decode_list(payload: &Json) -> Option<Vec<Value>> {
    payload
        .as_array()?
        .iter()
        .map(|item| item.is_object().then(|| Value::from_document(item.clone())))
        .collect()
}

/// Payload numbers are held as f64, so integer and float encodings of the
/// same number compare and serialize alike.
fn normalize_numbers(payload: &mut Json) {
    match payload {
        Json::Number(number) if !number.is_f64() => {
            if let Some(float) = number.as_f64().and_then(serde_json::Number::from_f64) {
                *number = float;
            }
        }
        Json::Array(items) => items.iter_mut().for_each(normalize_numbers),
        Json::Object(fields) => fields.values_mut().for_each(normalize_numbers),
        _ => {}
    }
}

fn decode_map(payload: &Json) -> Option<IndexMap<String, Value>> {
    let entries = payload.as_array()?;
    let mut map = IndexMap::with_capacity(entries.len());
    for entry in entries {
        // malformed entries are skipped, the rest of the map still decodes
        let Some(pair) = entry.as_object() else { continue };
        let key = pair.get(MAP_KEY).and_then(Json::as_str);
        let (Some(key), Some(document)) = (key, pair.get(MAP_VALUE)) else {
            continue;
        };
        if document.is_object() {
            map.insert(key.to_string(), Value::from_document(document.clone()));
        }
    }
    Some(map)
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.document == other.inner.document
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.as_raw()).finish()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_raw())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Json::deserialize(deserializer)?;
        Value::from_json(document).map_err(serde::de::Error::custom)
    }
}
