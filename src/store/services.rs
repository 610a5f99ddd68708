//! Boundaries to the storage-side collaborators.
//!
//! The engine only reads through these traits. Implementations must be
//! shareable across threads because partial-value fan-out and cycle checks can
//! run on the rayon pool.
use super::types::{
    CalculationLocation, Capability, Data, DataId, DataLocation, DataLocationType, Period,
    StoredValue,
};
use crate::error::StoreError;
use crate::value::Value;
use std::sync::Arc;

pub trait DataLookup: Send + Sync {
    /// Returns the entity with this id if it exists and `capability` admits it.
    fn get_by_id(
        &self,
        id: DataId,
        capability: Capability,
    ) -> Result<Option<Arc<Data>>, StoreError>;
}

pub trait ValueStore: Send + Sync {
    /// The stored value of `data` at exactly one point.
    fn get_point(
        &self,
        data: &Data,
        location: &DataLocation,
        period: &Period,
    ) -> Result<Option<Value>, StoreError>;

    /// Every stored value of `data` for `period`, across all locations.
    fn get_all_points(&self, data: &Data, period: &Period) -> Result<Vec<StoredValue>, StoreError>;
}

pub trait LocationDirectory: Send + Sync {
    /// Every data location type, in the directory's order.
    fn list_location_types(&self) -> Result<Vec<DataLocationType>, StoreError>;

    /// The data locations transitively beneath `location`.
    fn collect_data_locations(
        &self,
        location: &CalculationLocation,
    ) -> Result<Vec<DataLocation>, StoreError>;
}

pub trait PeriodCatalog: Send + Sync {
    fn list_periods(&self) -> Result<Vec<Period>, StoreError>;
}
