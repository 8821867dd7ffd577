//! # Match Expressions
//!
//! A [`MatchExpression`] of degree N (1-4) holds N [`PatternSlot`]s. Each slot
//! pairs one bound variable with the log of conditions that must hold for a
//! tuple containing that variable to be live.
//!
//! ## Slot invariant
//!
//! The log of slot k structurally extends the log of slot k-1: later slots
//! add conditions but never drop earlier ones, and share the earlier log by
//! reference. The last slot's log is therefore the whole plan, which is what
//! the [`RuleContext`] remembers for termination.
//!
//! Every operation returns a new expression and leaves its input untouched.
//!
//! ## Operations
//!
//! | Operation | Degree | Module |
//! |-----------|--------|--------|
//! | `for_each` | 1 | here |
//! | `filter` | N -> N | here |
//! | `join` | N -> N+1 | `join.rs` |
//! | `exists` / `not_exists` | N -> N | `join.rs` |
//! | `group_by` | N -> 1..=4 | `group.rs` |
//! | `map` | N -> 1 | here |
//! | `terminate` | sink | here |

mod group;
mod join;

use crate::condition::{Condition, ConditionLog};
use crate::error::{PlanError, PlanResult, MAX_DEGREE};
use crate::function::tuple_function;
use crate::plan::{Plan, Weigher};
use crate::value::{FactType, Value};
use crate::variable::{Variable, VariableFactory};
use std::sync::Arc;
use tracing::debug;

/// One bound variable plus its accumulated prerequisite conditions.
#[derive(Clone, Debug)]
pub struct PatternSlot {
    variable: Variable,
    conditions: ConditionLog,
}

impl PatternSlot {
    pub fn new(variable: Variable, conditions: ConditionLog) -> Self {
        PatternSlot {
            variable,
            conditions,
        }
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn conditions(&self) -> &ConditionLog {
        &self.conditions
    }

    /// Whether a change to `condition` can invalidate this slot.
    pub fn depends_on(&self, condition: &Condition) -> bool {
        self.conditions.contains(condition)
    }

    fn with_condition(&self, condition: Condition) -> PatternSlot {
        PatternSlot {
            variable: self.variable.clone(),
            conditions: self.conditions.append(condition),
        }
    }
}

/// Flattened variables and conditions needed to emit a plan.
#[derive(Clone, Debug)]
pub struct RuleContext {
    pub variables: Vec<Variable>,
    pub conditions: ConditionLog,
}

/// Immutable tuple algebra expression of degree 1-4.
#[derive(Clone, Debug)]
pub struct MatchExpression {
    slots: Vec<PatternSlot>,
    context: RuleContext,
}

impl MatchExpression {
    /// Builds an expression from slots that already satisfy the slot
    /// invariant.
    fn from_slots(slots: Vec<PatternSlot>) -> PlanResult<Self> {
        if slots.is_empty() || slots.len() > MAX_DEGREE {
            return Err(PlanError::DegreeOverflow {
                operation: "expression",
                requested: slots.len(),
                maximum: MAX_DEGREE,
            });
        }
        let context = RuleContext {
            variables: slots.iter().map(|s| s.variable.clone()).collect(),
            conditions: slots
                .last()
                .map(|s| s.conditions.clone())
                .unwrap_or_default(),
        };
        Ok(MatchExpression { slots, context })
    }

    /// Degree-1 expression over every fact of `fact_type`.
    pub fn for_each(factory: &mut VariableFactory, fact_type: impl Into<FactType>) -> Self {
        let fact_type = fact_type.into();
        let variable = factory.create_fact(&fact_type, &base_name(&fact_type));
        let pattern = Condition::pattern(variable.clone(), fact_type);
        let slot = PatternSlot::new(variable, ConditionLog::new().append(pattern));
        MatchExpression {
            context: RuleContext {
                variables: vec![slot.variable.clone()],
                conditions: slot.conditions.clone(),
            },
            slots: vec![slot],
        }
    }

    pub fn degree(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[PatternSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&PatternSlot> {
        self.slots.get(index)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.context.variables
    }

    pub fn context(&self) -> &RuleContext {
        &self.context
    }

    fn last_slot(&self) -> &PatternSlot {
        // from_slots rejects empty slot lists
        &self.slots[self.slots.len() - 1]
    }

    /// Replaces the last slot with one carrying `condition` in addition.
    fn with_last_condition(&self, condition: Condition) -> Self {
        let mut slots = self.slots.clone();
        let last = slots.len() - 1;
        slots[last] = self.last_slot().with_condition(condition);
        MatchExpression {
            context: RuleContext {
                variables: self.context.variables.clone(),
                conditions: slots[last].conditions.clone(),
            },
            slots,
        }
    }

    /// Keeps tuples whose N bound values satisfy `predicate`.
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        let condition = Condition::filter(self.context.variables.clone(), Arc::new(predicate));
        debug!(degree = self.degree(), condition = condition.id(), "filter_compiled");
        self.with_last_condition(condition)
    }

    /// Projects the N bound values to one derived value.
    ///
    /// The new slot depends on the union of all N slot logs, so the
    /// projection is invalidated whenever any upstream input changes.
    pub fn map<F>(&self, factory: &mut VariableFactory, mapping: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        let variable = factory.create_value("mapped");
        let upstream = ConditionLog::union(self.slots.iter().map(PatternSlot::conditions));
        let bind = Condition::bind(
            variable.clone(),
            self.context.variables.clone(),
            tuple_function(mapping),
        );
        debug!(degree = self.degree(), variable = %variable, "map_compiled");
        let slot = PatternSlot::new(variable, upstream.append(bind));
        MatchExpression {
            context: RuleContext {
                variables: vec![slot.variable.clone()],
                conditions: slot.conditions.clone(),
            },
            slots: vec![slot],
        }
    }

    /// Emits the plan; every live match weighs 1.
    pub fn terminate(&self) -> Plan {
        self.terminate_weighted(Weigher::Unit)
    }

    /// Emits the plan with `weigher` applied to the N visible values.
    pub fn terminate_weighted(&self, weigher: Weigher) -> Plan {
        debug!(
            degree = self.degree(),
            conditions = self.context.conditions.len(),
            weigher = weigher.kind_name(),
            "plan_emitted"
        );
        Plan::new(
            self.context.conditions.to_vec(),
            self.context.variables.clone(),
            weigher,
        )
    }

    /// Indices of the slots a change to `condition` invalidates.
    pub fn invalidated_slots(&self, condition: &Condition) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.depends_on(condition))
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether every slot's log structurally extends the previous slot's.
    pub fn verify_slot_order(&self) -> bool {
        self.slots
            .windows(2)
            .all(|pair| pair[1].conditions.extends(&pair[0].conditions))
    }
}

/// `Shift` -> `shift`
fn base_name(fact_type: &FactType) -> String {
    let mut chars = fact_type.name().chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => "fact".to_string(),
    }
}
