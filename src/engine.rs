//! Entry point tying the collaborators, the evaluators and the configuration
//! together.
use crate::analysis::{DependencyCycle, DependencyGraphChecker};
use crate::compute::{
    CalculationPartialValue, CalculationValue, FormulaEvaluator, NormalizedDataElementValue,
    PartialValueAggregator, ValueEvaluator,
};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::expression::{DataResolver, Resolution};
use crate::store::{
    Calculation, CalculationLocation, Capability, DataLocation, DataLocationType, DataLookup,
    LocationDirectory, NormalizedDataElement, Period, PeriodCatalog, Registry, ValueStore,
};
use crate::value::{StatusValuePair, ValueType};
use std::collections::HashSet;

/// Everything the engine reads from. The engine itself holds no state
/// between calls.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub data: &'a dyn DataLookup,
    pub values: &'a dyn ValueStore,
    pub locations: &'a dyn LocationDirectory,
    pub periods: &'a dyn PeriodCatalog,
    pub formulas: &'a dyn FormulaEvaluator,
}

impl<'a> Collaborators<'a> {
    /// Serves every storage-side role from one in-memory registry.
    pub fn from_registry(registry: &'a Registry, formulas: &'a dyn FormulaEvaluator) -> Self {
        Self {
            data: registry,
            values: registry,
            locations: registry,
            periods: registry,
            formulas,
        }
    }
}

pub struct ExpressionEngine<'a> {
    collaborators: Collaborators<'a>,
    config: EngineConfig,
}

impl<'a> ExpressionEngine<'a> {
    pub fn new(collaborators: Collaborators<'a>, config: EngineConfig) -> Self {
        Self { collaborators, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolver(&self) -> DataResolver<'a> {
        DataResolver::new(self.collaborators.data)
    }

    fn evaluator(&self) -> ValueEvaluator<'a> {
        let Collaborators { values, formulas, .. } = self.collaborators;
        ValueEvaluator::new(self.resolver(), values, formulas)
    }

    fn checker(&self) -> DependencyGraphChecker<'a> {
        let Collaborators { locations, periods, .. } = self.collaborators;
        DependencyGraphChecker::new(self.resolver(), locations, periods)
            .parallel(self.config.parallel_cycle_check)
    }

    pub fn calculate_partial_values(
        &self,
        calculation: &Calculation,
        location: &CalculationLocation,
        period: &Period,
    ) -> EngineResult<Vec<CalculationPartialValue>> {
        PartialValueAggregator::new(self.evaluator(), self.collaborators.locations, self.config)
            .compute_partial_values(calculation, location, period)
    }

    /// Computes the partial values and combines those of the requested types.
    pub fn calculation_value(
        &self,
        calculation: &Calculation,
        location: &CalculationLocation,
        period: &Period,
        location_types: &HashSet<DataLocationType>,
    ) -> EngineResult<CalculationValue> {
        let partials = self.calculate_partial_values(calculation, location, period)?;
        Ok(CalculationValue::new(calculation, location, period, partials, location_types))
    }

    pub fn calculate_value(
        &self,
        element: &NormalizedDataElement,
        location: &DataLocation,
        period: &Period,
    ) -> EngineResult<NormalizedDataElementValue> {
        self.evaluator().calculate_value(element, location, period)
    }

    /// Single point, read straight from the store.
    pub fn evaluate_point(
        &self,
        expression: Option<&str>,
        result_type: &ValueType,
        period: &Period,
        location: &DataLocation,
        capability: Capability,
    ) -> EngineResult<StatusValuePair> {
        self.evaluator()
            .evaluate_point(expression, result_type, period, location, capability, None)
    }

    pub fn validate_expression(
        &self,
        expression: &str,
        capability: Capability,
    ) -> EngineResult<bool> {
        self.evaluator().validate_expression(expression, capability)
    }

    pub fn data_in_expression(
        &self,
        expression: &str,
        capability: Capability,
    ) -> EngineResult<Resolution> {
        Ok(self.resolver().resolve(expression, capability)?)
    }

    pub fn has_circular_dependency(&self, element: &NormalizedDataElement) -> EngineResult<bool> {
        self.checker().has_circular_dependency(element)
    }

    pub fn find_circular_dependency(
        &self,
        element: &NormalizedDataElement,
    ) -> EngineResult<Option<DependencyCycle>> {
        self.checker().find_circular_dependency(element)
    }
}
