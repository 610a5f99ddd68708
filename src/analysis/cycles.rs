//! Circular reference detection between normalized data elements.
use crate::error::EngineResult;
use crate::expression::DataResolver;
use crate::store::{
    Capability, DataId, DataLocationType, LocationDirectory, NormalizedDataElement, Period,
    PeriodCatalog,
};
use rayon::prelude::*;
use serde::Serialize;
use smallvec::SmallVec;

/// Ids from the root down to the first repeated id, inclusive.
type Path = SmallVec<[DataId; 8]>;

type Found = EngineResult<Option<DependencyCycle>>;

/// The first cycle found: the combination it was found under and the chain
/// of references, ending with the id that closes the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyCycle {
    pub location_type: DataLocationType,
    pub period: Period,
    pub path: Vec<DataId>,
}

pub struct DependencyGraphChecker<'a> {
    resolver: DataResolver<'a>,
    locations: &'a dyn LocationDirectory,
    periods: &'a dyn PeriodCatalog,
    parallel: bool,
}

impl<'a> DependencyGraphChecker<'a> {
    pub fn new(
        resolver: DataResolver<'a>,
        locations: &'a dyn LocationDirectory,
        periods: &'a dyn PeriodCatalog,
    ) -> Self {
        Self { resolver, locations, periods, parallel: false }
    }

    /// Explore (location type, period) combinations on the rayon pool. The
    /// reported cycle is the same as in a sequential run.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn has_circular_dependency(&self, element: &NormalizedDataElement) -> EngineResult<bool> {
        Ok(self.find_circular_dependency(element)?.is_some())
    }

    /// Depth-first search from `element` under every (location type, period)
    /// combination, types outermost. Dependencies are visited in id order.
    pub fn find_circular_dependency(&self, element: &NormalizedDataElement) -> Found {
        tracing::debug!(data = %element.id, "checking for circular dependency");

        let periods = self.periods.list_periods()?;
        let combinations: Vec<(DataLocationType, &Period)> = self
            .locations
            .list_location_types()?
            .into_iter()
            .flat_map(|location_type| {
                periods.iter().map(move |period| (location_type.clone(), period))
            })
            .collect();

        let check = |(location_type, period): &(DataLocationType, &Period)| -> Found {
            let root: Path = smallvec::smallvec![element.id];
            Ok(self.visit(element, location_type, period, root)?.map(|path| DependencyCycle {
                location_type: location_type.clone(),
                period: (*period).clone(),
                path: path.into_vec(),
            }))
        };

        let found = if self.parallel {
            combinations.par_iter().map(check).find_map_first(Result::transpose)
        } else {
            combinations.iter().map(check).find_map(Result::transpose)
        };
        let cycle = found.transpose()?;

        if let Some(cycle) = &cycle {
            tracing::info!(
                data = %element.id,
                location_type = %cycle.location_type.code,
                period = %cycle.period.code,
                path = ?cycle.path,
                "circular dependency found"
            );
        }
        Ok(cycle)
    }

    /// `path` is owned by this branch; each descent gets its own copy.
    fn visit(
        &self,
        node: &NormalizedDataElement,
        location_type: &DataLocationType,
        period: &Period,
        path: Path,
    ) -> EngineResult<Option<Path>> {
        let Some(expression) = node.expression(period, &location_type.code) else {
            return Ok(None);
        };

        let resolution = self.resolver.resolve(expression, Capability::NormalizedDataElement)?;
        let mut dependencies: Vec<_> = resolution.resolved().map(|(_, data)| data).collect();
        dependencies.sort_by_key(|data| data.id());

        for dependency in dependencies {
            let mut next = path.clone();
            next.push(dependency.id());
            if path.contains(&dependency.id()) {
                return Ok(Some(next));
            }
            if let Some(normalized) = dependency.as_normalized() {
                if let Some(cycle) = self.visit(normalized, location_type, period, next)? {
                    return Ok(Some(cycle));
                }
            }
        }
        Ok(None)
    }
}
