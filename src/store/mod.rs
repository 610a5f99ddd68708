//! Domain entities and the storage-side collaborators the engine reads from.
pub mod registry;
pub mod services;
pub mod types;

pub use registry::Registry;
pub use services::{DataLookup, LocationDirectory, PeriodCatalog, ValueStore};
pub use types::*;
