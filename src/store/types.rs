use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        #[derive(Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(DataId);
id_type!(LocationId);
id_type!(PeriodId);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub code: String,
}

/// Classification partitioning data locations into disjoint groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataLocationType {
    pub code: String,
}

impl DataLocationType {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// An aggregate node of the location hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub code: String,
}

/// A leaf location; values are stored against these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataLocation {
    pub id: LocationId,
    pub code: String,
    pub location_type: DataLocationType,
}

/// Anything a calculation can be evaluated for. A data location collects
/// only itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationLocation {
    Location(Location),
    DataLocation(DataLocation),
}

impl CalculationLocation {
    pub fn id(&self) -> LocationId {
        match self {
            CalculationLocation::Location(l) => l.id,
            CalculationLocation::DataLocation(l) => l.id,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            CalculationLocation::Location(l) => &l.code,
            CalculationLocation::DataLocation(l) => &l.code,
        }
    }
}

impl From<Location> for CalculationLocation {
    fn from(location: Location) -> Self {
        CalculationLocation::Location(location)
    }
}

impl From<DataLocation> for CalculationLocation {
    fn from(location: DataLocation) -> Self {
        CalculationLocation::DataLocation(location)
    }
}

/// Variant tag of a `Data` entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    RawDataElement,
    NormalizedDataElement,
    Calculation,
}

/// The kind of entity a formula is allowed to reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Any entity.
    Data,
    /// Raw or normalized data elements: anything with one value per data location.
    DataElement,
    RawDataElement,
    NormalizedDataElement,
    Calculation,
}

impl Capability {
    pub fn admits(self, kind: DataKind) -> bool {
        match self {
            Capability::Data => true,
            Capability::DataElement => {
                matches!(kind, DataKind::RawDataElement | DataKind::NormalizedDataElement)
            }
            Capability::RawDataElement => kind == DataKind::RawDataElement,
            Capability::NormalizedDataElement => kind == DataKind::NormalizedDataElement,
            Capability::Calculation => kind == DataKind::Calculation,
        }
    }
}

/// A raw data element; its values are supplied from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataElement {
    pub id: DataId,
    pub code: String,
    pub value_type: ValueType,
}

/// A data element computed from one formula per (period, location type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDataElement {
    pub id: DataId,
    pub code: String,
    pub value_type: ValueType,
    /// period -> location type code -> expression
    pub expressions: BTreeMap<PeriodId, BTreeMap<String, String>>,
}

impl NormalizedDataElement {
    pub fn new(id: DataId, code: impl Into<String>, value_type: ValueType) -> Self {
        Self { id, code: code.into(), value_type, expressions: BTreeMap::new() }
    }

    pub fn with_expression(
        mut self,
        period: &Period,
        type_code: &str,
        expression: impl Into<String>,
    ) -> Self {
        self.expressions
            .entry(period.id)
            .or_default()
            .insert(type_code.to_string(), expression.into());
        self
    }

    pub fn expression(&self, period: &Period, type_code: &str) -> Option<&str> {
        self.expressions.get(&period.id)?.get(type_code).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalculationKind {
    Sum,
    Average,
    Mode,
}

/// A calculation: partial expressions evaluated independently per location type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculation {
    pub id: DataId,
    pub code: String,
    pub value_type: ValueType,
    pub kind: CalculationKind,
    pub partial_expressions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Data {
    Element(DataElement),
    Normalized(NormalizedDataElement),
    Calculation(Calculation),
}

impl Data {
    pub fn id(&self) -> DataId {
        match self {
            Data::Element(d) => d.id,
            Data::Normalized(d) => d.id,
            Data::Calculation(d) => d.id,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Data::Element(d) => &d.code,
            Data::Normalized(d) => &d.code,
            Data::Calculation(d) => &d.code,
        }
    }

    pub(crate) fn code_mut(&mut self) -> &mut String {
        match self {
            Data::Element(d) => &mut d.code,
            Data::Normalized(d) => &mut d.code,
            Data::Calculation(d) => &mut d.code,
        }
    }

    pub fn value_type(&self) -> &ValueType {
        match self {
            Data::Element(d) => &d.value_type,
            Data::Normalized(d) => &d.value_type,
            Data::Calculation(d) => &d.value_type,
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            Data::Element(_) => DataKind::RawDataElement,
            Data::Normalized(_) => DataKind::NormalizedDataElement,
            Data::Calculation(_) => DataKind::Calculation,
        }
    }

    pub fn as_normalized(&self) -> Option<&NormalizedDataElement> {
        match self {
            Data::Normalized(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_calculation(&self) -> Option<&Calculation> {
        match self {
            Data::Calculation(d) => Some(d),
            _ => None,
        }
    }
}

/// One stored row as returned by a bulk read of the value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    pub location: LocationId,
    pub value: Value,
}
