//! Fixtures shared by the unit tests.
use crate::compute::FormulaEvaluator;
use crate::error::{FormulaError, StoreError};
use crate::store::{Data, DataLocation, Period, Registry, StoredValue, ValueStore};
use crate::value::{Value, ValueType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;

/// Routes engine logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone)]
pub struct EvaluationCall {
    pub expression: String,
    pub values: HashMap<String, Value>,
    pub types: HashMap<String, ValueType>,
}

/// Stand-in formula language: the result is the sum of the numeric inputs.
/// An expression containing `#invalid` is rejected as invalid input, one
/// containing `#crash` fails internally.
#[derive(Default)]
pub struct ScriptedEvaluator {
    evaluations: AtomicUsize,
    last_evaluation: Mutex<Option<EvaluationCall>>,
    last_syntax_check: Mutex<Option<HashMap<String, String>>>,
}

impl ScriptedEvaluator {
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn last_evaluation(&self) -> Option<EvaluationCall> {
        self.last_evaluation.lock().clone()
    }

    pub fn last_syntax_check(&self) -> Option<HashMap<String, String>> {
        self.last_syntax_check.lock().clone()
    }

    fn screen(expression: &str) -> Result<(), FormulaError> {
        if expression.contains("#invalid") {
            return Err(FormulaError::InvalidInput(format!("cannot evaluate '{expression}'")));
        }
        if expression.contains("#crash") {
            return Err(FormulaError::Internal("evaluator crashed".into()));
        }
        Ok(())
    }
}

impl FormulaEvaluator for ScriptedEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        _expected: &ValueType,
        values: &HashMap<String, Value>,
        types: &HashMap<String, ValueType>,
    ) -> Result<Value, FormulaError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        *self.last_evaluation.lock() = Some(EvaluationCall {
            expression: expression.to_string(),
            values: values.clone(),
            types: types.clone(),
        });
        Self::screen(expression)?;
        Ok(Value::from_number(values.values().filter_map(Value::as_number).sum()))
    }

    fn check_syntax(
        &self,
        expression: &str,
        placeholders: &HashMap<String, String>,
    ) -> Result<(), FormulaError> {
        *self.last_syntax_check.lock() = Some(placeholders.clone());
        Self::screen(expression)
    }
}

/// Delegates to a registry and counts the round-trips.
pub struct CountingStore<'a> {
    inner: &'a Registry,
    point_reads: AtomicUsize,
    bulk_reads: AtomicUsize,
}

impl<'a> CountingStore<'a> {
    pub fn new(inner: &'a Registry) -> Self {
        Self { inner, point_reads: AtomicUsize::new(0), bulk_reads: AtomicUsize::new(0) }
    }

    pub fn point_reads(&self) -> usize {
        self.point_reads.load(Ordering::SeqCst)
    }

    pub fn bulk_reads(&self) -> usize {
        self.bulk_reads.load(Ordering::SeqCst)
    }
}

impl ValueStore for CountingStore<'_> {
    fn get_point(
        &self,
        data: &Data,
        location: &DataLocation,
        period: &Period,
    ) -> Result<Option<Value>, StoreError> {
        self.point_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_point(data, location, period)
    }

    fn get_all_points(&self, data: &Data, period: &Period) -> Result<Vec<StoredValue>, StoreError> {
        self.bulk_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_all_points(data, period)
    }
}

pub struct FailingStore;

impl ValueStore for FailingStore {
    fn get_point(
        &self,
        _: &Data,
        _: &DataLocation,
        _: &Period,
    ) -> Result<Option<Value>, StoreError> {
        Err(StoreError("store unavailable".into()))
    }

    fn get_all_points(&self, _: &Data, _: &Period) -> Result<Vec<StoredValue>, StoreError> {
        Err(StoreError("store unavailable".into()))
    }
}
