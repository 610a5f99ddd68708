//! In-process implementation of every storage-side collaborator.
use super::services::{DataLookup, LocationDirectory, PeriodCatalog, ValueStore};
use super::types::*;
use crate::error::StoreError;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    data: HashMap<DataId, Arc<Data>>,
    used_codes: HashSet<String>,

    location_types: Vec<DataLocationType>,
    periods: Vec<Period>,

    // Location tree: parent -> children in insertion order.
    next_location: u64,
    children: HashMap<LocationId, Vec<LocationId>>,
    data_locations: HashMap<LocationId, DataLocation>,

    values: HashMap<(DataId, PeriodId), IndexMap<LocationId, Value>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Registers a data entity, replacing any previous entity with the same id.
    /// Codes are unique: a taken code gets a numeric suffix.
    pub fn add_data(&mut self, mut data: Data) -> Arc<Data> {
        if let Some(previous) = self.data.remove(&data.id()) {
            self.used_codes.remove(previous.code());
        }

        // --- Unique Code Enforcement ---
        let original_code = data.code().to_string();
        let mut candidate_code = original_code.clone();
        let mut counter = 1;
        while self.used_codes.contains(&candidate_code) {
            candidate_code = format!("{}_{}", original_code, counter);
            counter += 1;
        }
        self.used_codes.insert(candidate_code.clone());
        *data.code_mut() = candidate_code;

        let data = Arc::new(data);
        self.data.insert(data.id(), Arc::clone(&data));
        data
    }

    pub fn add_location_type(&mut self, code: &str) -> DataLocationType {
        let location_type = DataLocationType::new(code);
        if !self.location_types.contains(&location_type) {
            self.location_types.push(location_type.clone());
        }
        location_type
    }

    pub fn add_period(&mut self, code: &str) -> Period {
        let period = Period { id: PeriodId(self.periods.len() as u64 + 1), code: code.to_string() };
        self.periods.push(period.clone());
        period
    }

    pub fn add_location(&mut self, code: &str, parent: Option<&Location>) -> Location {
        let id = self.allocate_location(parent);
        Location { id, code: code.to_string() }
    }

    pub fn add_data_location(
        &mut self,
        code: &str,
        location_type: &DataLocationType,
        parent: Option<&Location>,
    ) -> DataLocation {
        let id = self.allocate_location(parent);
        let location =
            DataLocation { id, code: code.to_string(), location_type: location_type.clone() };
        self.data_locations.insert(id, location.clone());
        location
    }

    fn allocate_location(&mut self, parent: Option<&Location>) -> LocationId {
        self.next_location += 1;
        let id = LocationId(self.next_location);
        if let Some(parent) = parent {
            self.children.entry(parent.id).or_default().push(id);
        }
        id
    }

    pub fn set_value(
        &mut self,
        data: DataId,
        location: &DataLocation,
        period: &Period,
        value: Value,
    ) {
        self.values.entry((data, period.id)).or_default().insert(location.id, value);
    }

    pub fn data_count(&self) -> usize { self.data.len() }

    fn collect_beneath(&self, root: LocationId, out: &mut Vec<DataLocation>) {
        let Some(children) = self.children.get(&root) else { return };
        for child in children {
            match self.data_locations.get(child) {
                Some(location) => out.push(location.clone()),
                None => self.collect_beneath(*child, out),
            }
        }
    }
}

impl DataLookup for Registry {
    fn get_by_id(
        &self,
        id: DataId,
        capability: Capability,
    ) -> Result<Option<Arc<Data>>, StoreError> {
        Ok(self.data.get(&id).filter(|d| capability.admits(d.kind())).cloned())
    }
}

impl ValueStore for Registry {
    fn get_point(
        &self,
        data: &Data,
        location: &DataLocation,
        period: &Period,
    ) -> Result<Option<Value>, StoreError> {
        Ok(self
            .values
            .get(&(data.id(), period.id))
            .and_then(|by_location| by_location.get(&location.id))
            .cloned())
    }

    fn get_all_points(&self, data: &Data, period: &Period) -> Result<Vec<StoredValue>, StoreError> {
        Ok(self
            .values
            .get(&(data.id(), period.id))
            .map(|by_location| {
                by_location
                    .iter()
                    .map(|(location, value)| StoredValue {
                        location: *location,
                        value: value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl LocationDirectory for Registry {
    fn list_location_types(&self) -> Result<Vec<DataLocationType>, StoreError> {
        Ok(self.location_types.clone())
    }

    fn collect_data_locations(
        &self,
        location: &CalculationLocation,
    ) -> Result<Vec<DataLocation>, StoreError> {
        match location {
            CalculationLocation::DataLocation(leaf) => Ok(vec![leaf.clone()]),
            CalculationLocation::Location(parent) => {
                let mut out = Vec::new();
                self.collect_beneath(parent.id, &mut out);
                Ok(out)
            }
        }
    }
}

impl PeriodCatalog for Registry {
    fn list_periods(&self) -> Result<Vec<Period>, StoreError> {
        Ok(self.periods.clone())
    }
}
