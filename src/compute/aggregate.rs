//! Calculation results: per-type partial values and their combination.
use crate::store::{
    Calculation, CalculationKind, CalculationLocation, DataId, DataLocationType, LocationId, Period,
    PeriodId,
};
use crate::value::{StatusValuePair, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

/// One partial expression of a calculation, evaluated over the data locations
/// of one type beneath a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationPartialValue {
    pub data: DataId,
    pub expression: String,
    pub location: LocationId,
    pub period: PeriodId,
    pub location_type: DataLocationType,
    /// Sum/Average: numeric sum. Mode: map from payload text to count.
    /// NULL when no location contributed.
    pub value: Value,
    pub number_of_data_locations: usize,
}

impl CalculationPartialValue {
    /// Folds the point results of one type group. Only VALID non-null points
    /// contribute.
    pub fn from_points(
        calculation: &Calculation,
        expression: &str,
        location: &CalculationLocation,
        period: &Period,
        location_type: &DataLocationType,
        points: &IndexMap<LocationId, StatusValuePair>,
    ) -> Self {
        let contributing = points
            .values()
            .filter(|p| p.is_valid() && !p.value().is_null())
            .map(|p| p.value());

        let (value, number_of_data_locations) = match calculation.kind {
            CalculationKind::Sum | CalculationKind::Average => {
                let numbers: Vec<f64> = contributing.filter_map(Value::as_number).collect();
                let value = if numbers.is_empty() {
                    Value::null()
                } else {
                    Value::from_number(numbers.iter().sum())
                };
                (value, numbers.len())
            }
            CalculationKind::Mode => {
                // payloads are number-normalized, so 3 and 3.0 share a key
                let mut counts: IndexMap<String, usize> = IndexMap::new();
                for value in contributing {
                    *counts.entry(value.payload().to_string()).or_default() += 1;
                }
                let total: usize = counts.values().sum();
                let value = if counts.is_empty() {
                    Value::null()
                } else {
                    Value::from_map(
                        counts.into_iter().map(|(k, n)| (k, Value::from_number(n as f64))),
                    )
                };
                (value, total)
            }
        };

        Self {
            data: calculation.id,
            expression: expression.to_string(),
            location: location.id(),
            period: period.id,
            location_type: location_type.clone(),
            value,
            number_of_data_locations,
        }
    }
}

/// The value of a calculation at one location and period, restricted to a
/// set of location types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationValue {
    pub data: DataId,
    pub kind: CalculationKind,
    pub location: LocationId,
    pub period: PeriodId,
    partial_values: Vec<CalculationPartialValue>,
}

impl CalculationValue {
    pub fn new(
        calculation: &Calculation,
        location: &CalculationLocation,
        period: &Period,
        partials: impl IntoIterator<Item = CalculationPartialValue>,
        location_types: &HashSet<DataLocationType>,
    ) -> Self {
        let location_id = location.id();
        let partial_values = partials
            .into_iter()
            .filter(|p| {
                p.data == calculation.id
                    && p.location == location_id
                    && p.period == period.id
                    && location_types.contains(&p.location_type)
            })
            .collect();
        Self {
            data: calculation.id,
            kind: calculation.kind,
            location: location_id,
            period: period.id,
            partial_values,
        }
    }

    pub fn partial_values(&self) -> &[CalculationPartialValue] {
        &self.partial_values
    }

    pub fn number_of_data_locations(&self) -> usize {
        self.partial_values.iter().map(|p| p.number_of_data_locations).sum()
    }

    pub fn value(&self) -> Value {
        combine(self.kind, self.partial_values.iter())
    }

    /// The value of a single partial expression across the requested types.
    pub fn value_for_expression(&self, expression: &str) -> Value {
        combine(self.kind, self.partial_values.iter().filter(|p| p.expression == expression))
    }
}

fn combine<'a>(
    kind: CalculationKind,
    partials: impl Iterator<Item = &'a CalculationPartialValue>,
) -> Value {
    match kind {
        CalculationKind::Sum => {
            let mut sum = None;
            for number in partials.filter_map(|p| p.value.as_number()) {
                *sum.get_or_insert(0.0) += number;
            }
            sum.map_or_else(Value::null, Value::from_number)
        }
        CalculationKind::Average => {
            let (mut sum, mut count) = (0.0, 0usize);
            for partial in partials {
                if let Some(number) = partial.value.as_number() {
                    sum += number;
                    count += partial.number_of_data_locations;
                }
            }
            if count == 0 { Value::null() } else { Value::from_number(sum / count as f64) }
        }
        CalculationKind::Mode => {
            let mut counts: IndexMap<&str, f64> = IndexMap::new();
            for map in partials.filter_map(|p| p.value.as_map()) {
                for (payload, count) in map {
                    *counts.entry(payload.as_str()).or_default() +=
                        count.as_number().unwrap_or(0.0);
                }
            }

            let mut best: Option<(&str, f64)> = None;
            for (payload, count) in counts {
                if best.map_or(true, |(_, top)| count > top) {
                    best = Some((payload, count));
                }
            }
            best.and_then(|(payload, _)| serde_json::from_str(payload).ok())
                .map_or_else(Value::null, Value::from_payload)
        }
    }
}
