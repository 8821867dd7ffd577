//! # Grouping
//!
//! [`GroupBy`] describes one grouping request: up to four key mappings and up
//! to four collectors, at most four outputs in total.
//!
//! The matching engine groups by a single key. The Packer ([`pack_keys`])
//! folds 2-4 key mappings into one function returning a composite key tuple,
//! and the Unpacker ([`unpack_keys`]) re-exposes each component as its own
//! derived variable, so downstream operations address key components exactly
//! as if native multi-key grouping existed.

use crate::collector::GroupCollector;
use crate::condition::Condition;
use crate::error::{PlanError, PlanResult, MAX_DEGREE};
use crate::function::{tuple_function, TupleFunction};
use crate::value::Value;
use crate::variable::{Variable, VariableFactory};
use std::fmt;
use std::sync::Arc;

/// Key mappings and collectors of one `group_by` call.
#[derive(Clone, Default)]
pub struct GroupBy {
    keys: Vec<TupleFunction>,
    collectors: Vec<GroupCollector>,
}

impl GroupBy {
    pub fn new() -> Self {
        GroupBy::default()
    }

    /// Adds a key mapping over the pre-grouping tuple.
    pub fn key<F>(mut self, mapping: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.keys.push(Arc::new(mapping));
        self
    }

    pub fn key_function(mut self, mapping: TupleFunction) -> Self {
        self.keys.push(mapping);
        self
    }

    /// Adds a collector; its result becomes one output after the keys.
    pub fn collect(mut self, collector: GroupCollector) -> Self {
        self.collectors.push(collector);
        self
    }

    pub fn keys(&self) -> &[TupleFunction] {
        &self.keys
    }

    pub fn collectors(&self) -> &[GroupCollector] {
        &self.collectors
    }

    /// Degree of the grouped expression: keys first, then collector results.
    pub fn output_degree(&self) -> usize {
        self.keys.len() + self.collectors.len()
    }

    pub fn validate(&self) -> PlanResult<()> {
        match self.output_degree() {
            0 => Err(PlanError::EmptyGroupBy),
            n if n > MAX_DEGREE => Err(PlanError::DegreeOverflow {
                operation: "groupBy",
                requested: n,
                maximum: MAX_DEGREE,
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBy")
            .field("keys", &self.keys.len())
            .field("collectors", &self.collectors)
            .finish()
    }
}

/// Combines key mappings into one function returning a composite key tuple.
///
/// Components keep the order of `keys`; equality and hashing of the result
/// are structural.
pub fn pack_keys(keys: &[TupleFunction]) -> TupleFunction {
    let keys: Vec<TupleFunction> = keys.to_vec();
    tuple_function(move |values| Value::tuple(keys.iter().map(|key| key(values)).collect()))
}

/// Reads component `index` of the composite key bound as the only input.
pub fn component(index: usize) -> TupleFunction {
    tuple_function(move |values| {
        values
            .first()
            .and_then(|composite| composite.component(index))
            .cloned()
            .unwrap_or(Value::Null)
    })
}

/// Derives one variable per component of `composite`.
///
/// Returns the bind conditions in component order; each binds exactly one
/// new variable and reads only `composite`.
pub fn unpack_keys(
    factory: &mut VariableFactory,
    composite: &Variable,
    count: usize,
) -> Vec<(Variable, Condition)> {
    (0..count)
        .map(|index| {
            let variable = factory.create_value("groupKey");
            let condition = Condition::bind(variable.clone(), vec![composite.clone()], component(index));
            (variable, condition)
        })
        .collect()
}

/// Splits a composite key value back into its components.
pub fn unpack_value(composite: &Value) -> Vec<Value> {
    composite.as_tuple().map(<[Value]>::to_vec).unwrap_or_default()
}
