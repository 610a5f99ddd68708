//! Batch-scoped memo of stored values.
//!
//! One `ValueCache` lives for exactly one bulk evaluation. The first lookup of
//! an entity loads all of its stored values for the period in a single store
//! read and indexes them by location; later lookups are map reads.
use crate::error::StoreError;
use crate::store::{Data, DataId, DataLocation, LocationId, Period, PeriodId, ValueStore};
use crate::value::Value;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type LocationIndex = HashMap<LocationId, Value>;

#[derive(Default)]
pub struct ValueCache {
    // The mutex only guards slot creation; each slot fills at most once.
    slots: Mutex<HashMap<(DataId, PeriodId), Arc<OnceCell<LocationIndex>>>>,
}

impl ValueCache {
    pub fn new() -> Self { Self::default() }

    /// Number of entities whose values have been loaded.
    pub fn filled(&self) -> usize {
        self.slots.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    fn value_at(
        &self,
        store: &dyn ValueStore,
        data: &Data,
        location: &DataLocation,
        period: &Period,
    ) -> Result<Option<Value>, StoreError> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry((data.id(), period.id)).or_default())
        };

        let mut loaded = false;
        let index = slot.get_or_try_init(|| {
            loaded = true;
            tracing::debug!(data = %data.id(), period = %period.id, "filling cache");
            let rows = store.get_all_points(data, period)?;
            // rows are moved into the index; nothing outside the batch holds them
            let index: LocationIndex =
                rows.into_iter().map(|row| (row.location, row.value)).collect();
            tracing::debug!(data = %data.id(), locations = index.len(), "done filling cache");
            Ok::<_, StoreError>(index)
        })?;
        if !loaded {
            tracing::trace!(data = %data.id(), "found values in cache");
        }
        Ok(index.get(&location.id).cloned())
    }
}

/// Reads the stored value of `data` at one point, through `cache` when given.
pub fn lookup(
    store: &dyn ValueStore,
    data: &Data,
    location: &DataLocation,
    period: &Period,
    cache: Option<&ValueCache>,
) -> Result<Option<Value>, StoreError> {
    match cache {
        None => store.get_point(data, location, period),
        Some(cache) => cache.value_at(store, data, location, period),
    }
}
