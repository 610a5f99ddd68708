//! Evaluates one expression at one (period, data location) point.
use super::cache::{self, ValueCache};
use super::formula::FormulaEvaluator;
use crate::error::{EngineResult, FormulaError};
use crate::expression::DataResolver;
use crate::store::{
    Capability, DataId, DataLocation, LocationId, NormalizedDataElement, Period, PeriodId,
    ValueStore,
};
use crate::value::{Status, StatusValuePair, Value, ValueType};
use serde::Serialize;
use std::collections::HashMap;

/// Target for per-point evaluation records.
pub const EXPRESSION_LOG: &str = "expression_log";

/// The computed value of a normalized data element at one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDataElementValue {
    pub data: DataId,
    pub location: LocationId,
    pub period: PeriodId,
    pub status: Status,
    pub value: Value,
}

#[derive(Clone, Copy)]
pub struct ValueEvaluator<'a> {
    resolver: DataResolver<'a>,
    store: &'a dyn ValueStore,
    formulas: &'a dyn FormulaEvaluator,
}

impl<'a> ValueEvaluator<'a> {
    pub fn new(
        resolver: DataResolver<'a>,
        store: &'a dyn ValueStore,
        formulas: &'a dyn FormulaEvaluator,
    ) -> Self {
        Self { resolver, store, formulas }
    }

    /// Never returns a bare absence: every non-valid status carries NULL.
    /// Store failures and evaluator failures other than invalid input are
    /// returned as errors.
    pub fn evaluate_point(
        &self,
        expression: Option<&str>,
        result_type: &ValueType,
        period: &Period,
        location: &DataLocation,
        capability: Capability,
        cache: Option<&ValueCache>,
    ) -> EngineResult<StatusValuePair> {
        tracing::debug!(
            target: EXPRESSION_LOG,
            expression,
            ?result_type,
            period = %period.code,
            location = %location.code,
            "getting expression status-value"
        );

        let expression = match expression {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Ok(StatusValuePair::missing_expression()),
        };

        let resolution = self.resolver.resolve(expression, capability)?;
        if !resolution.all_resolved() {
            let missing: Vec<&str> = resolution.unresolved().collect();
            tracing::debug!(target: EXPRESSION_LOG, ?missing, "data elements are missing");
            return Ok(StatusValuePair::missing_data_element());
        }

        let mut values = HashMap::with_capacity(resolution.len());
        let mut types = HashMap::with_capacity(resolution.len());
        for (_, data) in resolution.resolved() {
            // a resolved entity without a stored point is fed in as NULL
            let value = cache::lookup(self.store, data, location, period, cache)?
                .unwrap_or_else(Value::null);
            let key = data.id().to_string();
            values.insert(key.clone(), value);
            types.insert(key, data.value_type().clone());
        }
        tracing::trace!(target: EXPRESSION_LOG, ?values, ?types, "values and types");

        let result = match self.formulas.evaluate(expression, result_type, &values, &types) {
            Ok(value) => StatusValuePair::valid(value),
            Err(FormulaError::InvalidInput(reason)) => {
                tracing::warn!(expression, %reason, "there was an error evaluating expression");
                tracing::trace!(
                    target: EXPRESSION_LOG,
                    location = %location.code,
                    ?values,
                    ?types,
                    "rejected inputs"
                );
                StatusValuePair::error()
            }
            Err(other) => return Err(other.into()),
        };
        tracing::debug!(target: EXPRESSION_LOG, %result, "returning result");
        Ok(result)
    }

    /// Checks `expression` against placeholder values of the referenced types.
    ///
    /// Returns `Ok(false)` if a reference does not resolve. Unlike point
    /// evaluation, an invalid-input rejection from the evaluator is returned
    /// as an error.
    pub fn validate_expression(
        &self,
        expression: &str,
        capability: Capability,
    ) -> EngineResult<bool> {
        let resolution = self.resolver.resolve(expression, capability)?;
        if !resolution.all_resolved() {
            return Ok(false);
        }

        let placeholders: HashMap<String, String> = resolution
            .resolved()
            .map(|(token, data)| (token.to_string(), data.value_type().placeholder_literal()))
            .collect();
        self.formulas.check_syntax(expression, &placeholders)?;
        Ok(true)
    }

    /// Evaluates a normalized data element at one data location, using the
    /// expression declared for the period and the location's type.
    pub fn calculate_value(
        &self,
        element: &NormalizedDataElement,
        location: &DataLocation,
        period: &Period,
    ) -> EngineResult<NormalizedDataElementValue> {
        tracing::debug!(
            data = %element.id,
            location = %location.code,
            period = %period.code,
            "calculating value"
        );

        let expression = element.expression(period, &location.location_type.code);
        let pair = self.evaluate_point(
            expression,
            &element.value_type,
            period,
            location,
            Capability::DataElement,
            None,
        )?;
        let (status, value) = pair.into_parts();
        Ok(NormalizedDataElementValue {
            data: element.id,
            location: location.id,
            period: period.id,
            status,
            value,
        })
    }
}
