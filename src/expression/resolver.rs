use super::variables::extract_variables;
use crate::error::StoreError;
use crate::store::{Capability, Data, DataId, DataLookup};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of resolving every token of one expression: one entry per distinct
/// token, `None` where the token did not resolve to an admitted entity.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    entries: HashMap<String, Option<Arc<Data>>>,
}

impl Resolution {
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn all_resolved(&self) -> bool {
        self.entries.values().all(Option::is_some)
    }

    pub fn get(&self, token: &str) -> Option<Option<&Arc<Data>>> {
        self.entries.get(token).map(Option::as_ref)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter(|(_, d)| d.is_none()).map(|(t, _)| t.as_str())
    }

    pub fn resolved(&self) -> impl Iterator<Item = (&str, &Arc<Data>)> {
        self.entries.iter().filter_map(|(t, d)| d.as_ref().map(|d| (t.as_str(), d)))
    }

    pub fn into_map(self) -> HashMap<String, Option<Arc<Data>>> {
        self.entries
    }
}

/// Maps the tokens of an expression to data entities of a required kind.
#[derive(Clone, Copy)]
pub struct DataResolver<'a> {
    lookup: &'a dyn DataLookup,
}

impl<'a> DataResolver<'a> {
    pub fn new(lookup: &'a dyn DataLookup) -> Self {
        Self { lookup }
    }

    /// Unparsable ids, unknown ids and entities of the wrong kind all map to
    /// `None`; only a failing lookup is an error.
    pub fn resolve(
        &self,
        expression: &str,
        capability: Capability,
    ) -> Result<Resolution, StoreError> {
        tracing::trace!(expression, ?capability, "resolving data in expression");

        let mut entries = HashMap::new();
        for token in extract_variables(expression) {
            let data = match token[1..].parse::<u64>() {
                Ok(id) => self.lookup_admitted(DataId(id), capability)?,
                Err(_) => {
                    tracing::error!(token = %token, "wrong format for data reference");
                    None
                }
            };
            entries.insert(token, data);
        }

        tracing::trace!(tokens = entries.len(), "resolved data in expression");
        Ok(Resolution { entries })
    }

    fn lookup_admitted(
        &self,
        id: DataId,
        capability: Capability,
    ) -> Result<Option<Arc<Data>>, StoreError> {
        let data = self.lookup.get_by_id(id, capability)?;
        Ok(data.filter(|d| {
            let admitted = capability.admits(d.kind());
            if !admitted {
                let kind = d.kind();
                tracing::warn!(id = %id, ?kind, ?capability, "data is not of the required kind");
            }
            admitted
        }))
    }
}
