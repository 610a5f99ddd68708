//! Fan-out of a calculation's partial expressions over location types.
use super::aggregate::CalculationPartialValue;
use super::cache::ValueCache;
use super::evaluator::ValueEvaluator;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::store::{
    Calculation, CalculationLocation, Capability, DataLocation, DataLocationType, LocationDirectory,
    LocationId, Period,
};
use crate::value::StatusValuePair;
use indexmap::IndexMap;
use rayon::prelude::*;

/// A location type and its data locations beneath the calculation location.
type TypeGroup = (DataLocationType, Vec<DataLocation>);

pub struct PartialValueAggregator<'a> {
    evaluator: ValueEvaluator<'a>,
    locations: &'a dyn LocationDirectory,
    config: EngineConfig,
}

impl<'a> PartialValueAggregator<'a> {
    pub fn new(
        evaluator: ValueEvaluator<'a>,
        locations: &'a dyn LocationDirectory,
        config: EngineConfig,
    ) -> Self {
        Self { evaluator, locations, config }
    }

    /// One row per (partial expression, location type with members). Types
    /// without data locations beneath `location` produce nothing.
    pub fn compute_partial_values(
        &self,
        calculation: &Calculation,
        location: &CalculationLocation,
        period: &Period,
    ) -> EngineResult<Vec<CalculationPartialValue>> {
        tracing::debug!(
            calculation = %calculation.id,
            location = location.code(),
            period = %period.code,
            "computing partial values"
        );

        let groups = self.group_by_type(location)?;
        let mut rows = Vec::with_capacity(calculation.partial_expressions.len() * groups.len());
        for expression in &calculation.partial_expressions {
            let evaluate = |(location_type, members): &TypeGroup| {
                let group = (location_type, members.as_slice());
                self.evaluate_group(calculation, expression, location, period, group)
            };
            let group_rows: Vec<CalculationPartialValue> = if self.config.parallel_location_types {
                groups.par_iter().map(evaluate).collect::<EngineResult<_>>()?
            } else {
                groups.iter().map(evaluate).collect::<EngineResult<_>>()?
            };
            rows.extend(group_rows);
        }

        tracing::debug!(rows = rows.len(), "done computing partial values");
        Ok(rows)
    }

    /// Data locations beneath `location`, grouped in the directory's type order.
    fn group_by_type(&self, location: &CalculationLocation) -> EngineResult<Vec<TypeGroup>> {
        let mut groups: IndexMap<DataLocationType, Vec<DataLocation>> = self
            .locations
            .list_location_types()?
            .into_iter()
            .map(|location_type| (location_type, Vec::new()))
            .collect();

        for member in self.locations.collect_data_locations(location)? {
            match groups.get_mut(&member.location_type) {
                Some(group) => group.push(member),
                None => tracing::warn!(
                    location = %member.code,
                    location_type = %member.location_type.code,
                    "data location has an undeclared type"
                ),
            }
        }
        Ok(groups.into_iter().filter(|(_, members)| !members.is_empty()).collect())
    }

    fn evaluate_group(
        &self,
        calculation: &Calculation,
        expression: &str,
        location: &CalculationLocation,
        period: &Period,
        (location_type, members): (&DataLocationType, &[DataLocation]),
    ) -> EngineResult<CalculationPartialValue> {
        tracing::trace!(
            expression,
            location_type = %location_type.code,
            members = members.len(),
            "evaluating group"
        );

        let cache = self.config.batch_cache.then(ValueCache::new);
        let evaluate = |member: &DataLocation| -> EngineResult<(LocationId, StatusValuePair)> {
            let pair = self.evaluator.evaluate_point(
                Some(expression),
                &calculation.value_type,
                period,
                member,
                Capability::DataElement,
                cache.as_ref(),
            )?;
            Ok((member.id, pair))
        };
        let points: Vec<_> = if self.config.parallel_locations {
            members.par_iter().map(evaluate).collect::<EngineResult<_>>()?
        } else {
            members.iter().map(evaluate).collect::<EngineResult<_>>()?
        };
        let points: IndexMap<LocationId, StatusValuePair> = points.into_iter().collect();

        Ok(CalculationPartialValue::from_points(
            calculation,
            expression,
            location,
            period,
            location_type,
            &points,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::CalculationValue;
    use crate::expression::DataResolver;
    use crate::store::{CalculationKind, Data, DataElement, DataId, Registry};
    use crate::test_support::{init_tracing, CountingStore, FailingStore, ScriptedEvaluator};
    use crate::value::{Value, ValueType};
    use rstest::rstest;
    use std::collections::HashSet;

    struct District {
        registry: Registry,
        calculation: Calculation,
        district: CalculationLocation,
        period: Period,
    }

    /// Three declared types; the district only holds health centers and
    /// district hospitals.
    fn district() -> District {
        init_tracing();
        let mut registry = Registry::new();
        for (id, code) in [(1, "beds"), (2, "staff")] {
            registry.add_data(Data::Element(DataElement {
                id: DataId(id),
                code: code.into(),
                value_type: ValueType::Number,
            }));
        }
        let calculation = Calculation {
            id: DataId(3),
            code: "capacity".into(),
            value_type: ValueType::Number,
            kind: CalculationKind::Sum,
            partial_expressions: vec!["$1".into(), "$1 + $2".into()],
        };
        registry.add_data(Data::Calculation(calculation.clone()));

        let hc = registry.add_location_type("health_center");
        let dh = registry.add_location_type("district_hospital");
        registry.add_location_type("regional_hospital");
        let period = registry.add_period("2011");

        let root = registry.add_location("district", None);
        let sub = registry.add_location("sub_district", Some(&root));
        let members = [
            registry.add_data_location("hc1", &hc, Some(&root)),
            registry.add_data_location("hc2", &hc, Some(&sub)),
            registry.add_data_location("dh1", &dh, Some(&sub)),
        ];
        for (i, member) in members.iter().enumerate() {
            let beds = Value::from_number(10.0 * (i + 1) as f64);
            registry.set_value(DataId(1), member, &period, beds);
            registry.set_value(DataId(2), member, &period, Value::from_number(1.0));
        }
        District { registry, calculation, district: root.into(), period }
    }

    fn aggregator<'a>(
        d: &'a District,
        formulas: &'a ScriptedEvaluator,
        config: EngineConfig,
    ) -> PartialValueAggregator<'a> {
        let evaluator = ValueEvaluator::new(DataResolver::new(&d.registry), &d.registry, formulas);
        PartialValueAggregator::new(evaluator, &d.registry, config)
    }

    #[rstest]
    #[case(EngineConfig::default())]
    #[case(EngineConfig::parallel())]
    #[case(EngineConfig { batch_cache: false, ..EngineConfig::default() })]
    fn one_row_per_expression_and_populated_type(#[case] config: EngineConfig) {
        let d = district();
        let formulas = ScriptedEvaluator::default();
        let rows = aggregator(&d, &formulas, config)
            .compute_partial_values(&d.calculation, &d.district, &d.period)
            .unwrap();

        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.location_type.code != "regional_hospital"));
        assert!(rows.iter().all(|r| r.location == d.district.id() && r.period == d.period.id));

        let find = |expression: &str, type_code: &str| {
            rows.iter()
                .find(|r| r.expression == expression && r.location_type.code == type_code)
                .map(|r| (r.value.as_number(), r.number_of_data_locations))
        };
        assert_eq!(find("$1", "health_center"), Some((Some(30.0), 2)));
        assert_eq!(find("$1", "district_hospital"), Some((Some(30.0), 1)));
        assert_eq!(find("$1 + $2", "health_center"), Some((Some(32.0), 2)));
        assert_eq!(formulas.evaluations(), 6);
    }

    #[test]
    fn rows_follow_expression_then_type_order() {
        let d = district();
        let formulas = ScriptedEvaluator::default();
        let rows = aggregator(&d, &formulas, EngineConfig::parallel())
            .compute_partial_values(&d.calculation, &d.district, &d.period)
            .unwrap();
        let order: Vec<_> =
            rows.iter().map(|r| (r.expression.as_str(), r.location_type.code.as_str())).collect();
        assert_eq!(order, vec![
            ("$1", "health_center"),
            ("$1", "district_hospital"),
            ("$1 + $2", "health_center"),
            ("$1 + $2", "district_hospital"),
        ]);
    }

    #[test]
    fn single_data_location_yields_its_type_only() {
        let d = district();
        let formulas = ScriptedEvaluator::default();
        let dh1 = d
            .registry
            .collect_data_locations(&d.district)
            .unwrap()
            .into_iter()
            .find(|l| l.code == "dh1")
            .unwrap();
        let rows = aggregator(&d, &formulas, EngineConfig::default())
            .compute_partial_values(&d.calculation, &dh1.clone().into(), &d.period)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|r| r.location_type.code == "district_hospital" && r.location == dh1.id));
    }

    #[test]
    fn empty_location_yields_no_rows() {
        let mut d = district();
        let empty = d.registry.add_location("nowhere", None);
        let formulas = ScriptedEvaluator::default();
        let rows = aggregator(&d, &formulas, EngineConfig::default())
            .compute_partial_values(&d.calculation, &empty.into(), &d.period)
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(formulas.evaluations(), 0);
    }

    #[test]
    fn batch_cache_loads_each_entity_once_per_group() {
        let d = district();
        let formulas = ScriptedEvaluator::default();
        let store = CountingStore::new(&d.registry);
        let evaluator = ValueEvaluator::new(DataResolver::new(&d.registry), &store, &formulas);
        PartialValueAggregator::new(evaluator, &d.registry, EngineConfig::default())
            .compute_partial_values(&d.calculation, &d.district, &d.period)
            .unwrap();
        // "$1": one load per group; "$1 + $2": two loads per group
        assert_eq!(store.bulk_reads(), 6);
        assert_eq!(store.point_reads(), 0);
    }

    #[test]
    fn without_batch_cache_every_point_reads_the_store() {
        let d = district();
        let formulas = ScriptedEvaluator::default();
        let store = CountingStore::new(&d.registry);
        let evaluator = ValueEvaluator::new(DataResolver::new(&d.registry), &store, &formulas);
        let config = EngineConfig { batch_cache: false, ..EngineConfig::default() };
        PartialValueAggregator::new(evaluator, &d.registry, config)
            .compute_partial_values(&d.calculation, &d.district, &d.period)
            .unwrap();
        assert_eq!(store.point_reads(), 9);
        assert_eq!(store.bulk_reads(), 0);
    }

    #[test]
    fn unresolved_references_fold_to_null_rows() {
        let d = district();
        let formulas = ScriptedEvaluator::default();
        let calculation =
            Calculation { partial_expressions: vec!["$1 + $42".into()], ..d.calculation.clone() };
        let rows = aggregator(&d, &formulas, EngineConfig::default())
            .compute_partial_values(&calculation, &d.district, &d.period)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.value.is_null() && r.number_of_data_locations == 0));
    }

    #[test]
    fn store_failure_aborts_the_computation() {
        let d = district();
        let formulas = ScriptedEvaluator::default();
        let evaluator =
            ValueEvaluator::new(DataResolver::new(&d.registry), &FailingStore, &formulas);
        let result = PartialValueAggregator::new(evaluator, &d.registry, EngineConfig::parallel())
            .compute_partial_values(&d.calculation, &d.district, &d.period);
        assert!(result.is_err());
    }

    #[test]
    fn rows_feed_the_calculation_value() {
        let d = district();
        let formulas = ScriptedEvaluator::default();
        let rows = aggregator(&d, &formulas, EngineConfig::default())
            .compute_partial_values(&d.calculation, &d.district, &d.period)
            .unwrap();
        let types: HashSet<_> = [DataLocationType::new("health_center")].into_iter().collect();
        let value = CalculationValue::new(&d.calculation, &d.district, &d.period, rows, &types);
        assert_eq!(value.value_for_expression("$1").as_number(), Some(30.0));
        assert_eq!(value.value().as_number(), Some(62.0));
        assert_eq!(value.number_of_data_locations(), 4);
    }

    #[test]
    fn locations_beneath_unrelated_parents_are_excluded() {
        let mut d = district();
        let other = d.registry.add_location("other_district", None);
        let hc = DataLocationType::new("health_center");
        let stray = d.registry.add_data_location("hc_other", &hc, Some(&other));
        d.registry.set_value(DataId(1), &stray, &d.period, Value::from_number(1000.0));

        let formulas = ScriptedEvaluator::default();
        let rows = aggregator(&d, &formulas, EngineConfig::default())
            .compute_partial_values(&d.calculation, &d.district, &d.period)
            .unwrap();
        let hc_total = rows.iter().find(|r| r.expression == "$1" && r.location_type == hc).unwrap();
        assert_eq!(hc_total.value.as_number(), Some(30.0));
    }
}
