//! # Reference Session
//!
//! A small, naive evaluator for emitted plans. It is not an incremental
//! matching network: every `evaluate` call recomputes bindings from the
//! current facts, condition by condition, without indexes.
//!
//! Grouping is the exception. Each grouping construct keeps its partitions
//! and collector accumulations between calls, keyed by the construct's
//! condition id, and only the delta of the pre-grouping tuple multiset is fed
//! to the collectors (`accumulate` for new tuples, `undo` for vanished ones).
//! This exercises the collector lifecycle the way an incremental engine
//! would under insert, update and retract.

mod verification;

pub use verification::{ConstraintReport, Verification, VerificationReport};

use crate::collector::{CollectorBinding, FusedAccumulator, FusedUndo};
use crate::condition::{Condition, ConditionKind, Grouping};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::plan::{MatchWeight, Plan};
use crate::value::{FactType, Value};
use crate::variable::{Variable, VariableId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, trace};

/// Handle of a fact inserted into a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FactHandle(u64);

impl FactHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fact#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct StoredFact {
    fact_type: FactType,
    value: Value,
}

/// One live binding of a plan's visible variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Values of the plan's visible variables, in tuple order
    pub values: Vec<Value>,
    pub weight: MatchWeight,
    /// Facts the match was derived from, ascending
    pub facts: Vec<FactHandle>,
}

/// Partial binding produced while walking the condition list.
#[derive(Debug, Clone, Default)]
struct Row {
    values: HashMap<VariableId, Value>,
    facts: Vec<FactHandle>,
}

impl Row {
    fn get(&self, variable: &Variable) -> SessionResult<&Value> {
        self.values
            .get(&variable.id())
            .ok_or_else(|| SessionError::UnboundVariable(variable.name().to_string()))
    }

    fn values_of(&self, variables: &[Variable]) -> SessionResult<Vec<Value>> {
        variables.iter().map(|v| self.get(v).cloned()).collect()
    }

    fn with(&self, variable: &Variable, value: Value) -> Row {
        let mut row = self.clone();
        row.values.insert(variable.id(), value);
        row
    }

    fn merged(&self, other: &Row) -> Row {
        let mut row = self.clone();
        row.values.extend(other.values.iter().map(|(k, v)| (*k, v.clone())));
        row.facts.extend(other.facts.iter().copied());
        row
    }
}

/// One partition of a grouping construct.
struct Partition {
    accumulator: FusedAccumulator,
    /// Undo tokens per distinct source tuple, one per accumulated copy
    contributions: HashMap<Value, Vec<FusedUndo>>,
}

impl Partition {
    fn new(collectors: &[CollectorBinding]) -> Self {
        Partition {
            accumulator: FusedAccumulator::new(collectors),
            contributions: HashMap::new(),
        }
    }

    fn size(&self) -> usize {
        self.contributions.values().map(Vec::len).sum()
    }
}

/// Current pre-grouping multiset of one partition.
#[derive(Default)]
struct PartitionInput {
    contributions: HashMap<Value, usize>,
    facts: BTreeSet<FactHandle>,
}

#[derive(Default)]
struct GroupState {
    partitions: BTreeMap<Value, Partition>,
}

impl GroupState {
    /// Brings every partition in line with `current`, retracting first.
    fn reconcile(&mut self, current: &BTreeMap<Value, PartitionInput>, collectors: &[CollectorBinding]) {
        let mut undone = 0usize;
        let mut accumulated = 0usize;

        for (key, partition) in &mut self.partitions {
            let wanted = current.get(key);
            for (source, undos) in &mut partition.contributions {
                let target = wanted
                    .and_then(|input| input.contributions.get(source))
                    .copied()
                    .unwrap_or(0);
                while undos.len() > target {
                    if let Some(undo) = undos.pop() {
                        partition.accumulator.retract(undo);
                        undone += 1;
                    }
                }
            }
            partition.contributions.retain(|_, undos| !undos.is_empty());
        }
        self.partitions.retain(|_, partition| partition.size() > 0);

        for (key, input) in current {
            let partition = self
                .partitions
                .entry(key.clone())
                .or_insert_with(|| Partition::new(collectors));
            for (source, count) in &input.contributions {
                let undos = partition.contributions.entry(source.clone()).or_default();
                let tuple = source.as_tuple().unwrap_or(&[]);
                while undos.len() < *count {
                    undos.push(partition.accumulator.insert(tuple));
                    accumulated += 1;
                }
            }
        }

        trace!(
            partitions = self.partitions.len(),
            accumulated,
            undone,
            "group_state_reconciled"
        );
    }
}

/// Fact store plus the grouping state of every plan evaluated against it.
pub struct Session {
    facts: BTreeMap<FactHandle, StoredFact>,
    next_handle: u64,
    max_bindings: usize,
    groups: HashMap<u64, GroupState>,
}

impl Session {
    pub fn new() -> Self {
        Session::with_config(&SessionConfig::default())
    }

    pub fn with_config(config: &SessionConfig) -> Self {
        Session {
            facts: BTreeMap::new(),
            next_handle: 1,
            max_bindings: config.max_bindings,
            groups: HashMap::new(),
        }
    }

    pub fn insert(&mut self, fact_type: impl Into<FactType>, value: impl Into<Value>) -> FactHandle {
        let handle = FactHandle(self.next_handle);
        self.next_handle += 1;
        self.facts.insert(
            handle,
            StoredFact {
                fact_type: fact_type.into(),
                value: value.into(),
            },
        );
        handle
    }

    /// Replaces the value of a fact, keeping its handle and type.
    pub fn update(&mut self, handle: FactHandle, value: impl Into<Value>) -> SessionResult<()> {
        let fact = self
            .facts
            .get_mut(&handle)
            .ok_or(SessionError::UnknownFact(handle.0))?;
        fact.value = value.into();
        Ok(())
    }

    /// Removes a fact, returning its last value.
    pub fn retract(&mut self, handle: FactHandle) -> SessionResult<Value> {
        self.facts
            .remove(&handle)
            .map(|fact| fact.value)
            .ok_or(SessionError::UnknownFact(handle.0))
    }

    pub fn get(&self, handle: FactHandle) -> Option<&Value> {
        self.facts.get(&handle).map(|fact| &fact.value)
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// All live matches of `plan` over the current facts.
    pub fn evaluate(&mut self, plan: &Plan) -> SessionResult<Vec<Match>> {
        let rows = self.run(plan.conditions().iter(), vec![Row::default()])?;
        let matches = rows
            .into_iter()
            .map(|row| {
                let values = row.values_of(plan.variables())?;
                let weight = plan.weigher().weigh(&values);
                let mut facts = row.facts;
                facts.sort_unstable();
                facts.dedup();
                Ok(Match {
                    values,
                    weight,
                    facts,
                })
            })
            .collect::<SessionResult<Vec<_>>>()?;
        debug!(
            plan = plan.name().unwrap_or("anonymous"),
            conditions = plan.conditions().len(),
            matches = matches.len(),
            "plan_evaluated"
        );
        Ok(matches)
    }

    fn run<'a, I>(&mut self, conditions: I, mut rows: Vec<Row>) -> SessionResult<Vec<Row>>
    where
        I: Iterator<Item = &'a Condition>,
    {
        for condition in conditions {
            rows = self.apply(condition, rows)?;
            self.check_limit(rows.len())?;
        }
        Ok(rows)
    }

    fn check_limit(&self, bindings: usize) -> SessionResult<()> {
        if self.max_bindings > 0 && bindings > self.max_bindings {
            return Err(SessionError::BindingLimitExceeded {
                limit: self.max_bindings,
            });
        }
        Ok(())
    }

    fn facts_of<'s>(&'s self, fact_type: &'s FactType) -> impl Iterator<Item = (FactHandle, &'s Value)> + 's {
        self.facts
            .iter()
            .filter(move |(_, fact)| &fact.fact_type == fact_type)
            .map(|(handle, fact)| (*handle, &fact.value))
    }

    fn apply(&mut self, condition: &Condition, rows: Vec<Row>) -> SessionResult<Vec<Row>> {
        match condition.kind() {
            ConditionKind::Pattern {
                variable,
                fact_type,
            } => {
                let mut out = Vec::new();
                for row in &rows {
                    for (handle, value) in self.facts_of(fact_type) {
                        let mut next = row.with(variable, value.clone());
                        next.facts.push(handle);
                        out.push(next);
                    }
                    self.check_limit(out.len())?;
                }
                Ok(out)
            }
            ConditionKind::Filter { inputs, predicate } => {
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    if predicate(&row.values_of(inputs)?) {
                        out.push(row);
                    }
                }
                Ok(out)
            }
            ConditionKind::Join(test) => {
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    let tuple = row.values_of(&test.inputs)?;
                    if test.test(&tuple, row.get(&test.target)?) {
                        out.push(row);
                    }
                }
                Ok(out)
            }
            ConditionKind::Bind {
                variable,
                inputs,
                function,
            } => rows
                .into_iter()
                .map(|row| {
                    let value = function(&row.values_of(inputs)?);
                    Ok(row.with(variable, value))
                })
                .collect(),
            ConditionKind::Exists(test) => {
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    let tuple = row.values_of(&test.inputs)?;
                    let found = self
                        .facts_of(&test.fact_type)
                        .any(|(_, candidate)| test.satisfied_by(&tuple, candidate));
                    if test.quantifier.holds(found) {
                        out.push(row);
                    }
                }
                Ok(out)
            }
            ConditionKind::Group(grouping) => {
                let grouped = self.group(condition.id(), grouping)?;
                let mut out = Vec::with_capacity(rows.len() * grouped.len());
                for row in &rows {
                    for group_row in &grouped {
                        out.push(row.merged(group_row));
                    }
                    self.check_limit(out.len())?;
                }
                Ok(out)
            }
        }
    }

    /// Evaluates the pre-grouping sub-plan, reconciles the partitions and
    /// returns one row per non-empty partition, in key order.
    fn group(&mut self, id: u64, grouping: &Grouping) -> SessionResult<Vec<Row>> {
        let inner = self.run(grouping.input.iter_ordered(), vec![Row::default()])?;

        let mut current: BTreeMap<Value, PartitionInput> = BTreeMap::new();
        for row in &inner {
            let key = match &grouping.key {
                Some(key) => (key.function)(&row.values_of(&grouping.inputs)?),
                None => Value::Null,
            };
            let source = match &grouping.source {
                Some(source) => row.get(source)?.clone(),
                None => Value::Null,
            };
            let input = current.entry(key).or_default();
            *input.contributions.entry(source).or_insert(0) += 1;
            input.facts.extend(row.facts.iter().copied());
        }

        let state = self.groups.entry(id).or_default();
        state.reconcile(&current, &grouping.collectors);

        let mut out = Vec::with_capacity(state.partitions.len());
        for (key, partition) in &state.partitions {
            let mut row = Row::default();
            if let Some(group_key) = &grouping.key {
                row.values.insert(group_key.variable.id(), key.clone());
            }
            for (binding, result) in grouping.collectors.iter().zip(partition.accumulator.results()) {
                row.values.insert(binding.output.id(), result);
            }
            if let Some(input) = current.get(key) {
                row.facts.extend(input.facts.iter().copied());
            }
            out.push(row);
        }
        Ok(out)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("facts", &self.facts.len())
            .field("groups", &self.groups.len())
            .field("max_bindings", &self.max_bindings)
            .finish()
    }
}
