//! Joins and existential checks.
//!
//! Both run their joiner list through [`merge_joiners`] first, so a bad list
//! fails the same way whichever operation it was passed to.

use super::{MatchExpression, PatternSlot};
use crate::condition::{Condition, ConditionKind, ConditionLog, ExistentialTest, JoinTest, Quantifier};
use crate::error::{PlanError, PlanResult, MAX_DEGREE};
use crate::function::tuple_predicate;
use crate::joiner::{merge_joiners, Joiner};
use crate::value::{FactType, Value};
use crate::variable::{Variable, VariableFactory};
use std::collections::HashSet;
use tracing::debug;

impl MatchExpression {
    /// Joins a degree-1 expression, growing the degree by one.
    ///
    /// Each indexable mapping index becomes one join test on the new slot,
    /// followed by one filter over all N+1 values when filtering joiners are
    /// present. The new slot depends on every prior slot and on `right`.
    pub fn join(&self, right: &MatchExpression, joiners: &[Joiner]) -> PlanResult<Self> {
        if self.degree() >= MAX_DEGREE {
            return Err(PlanError::DegreeOverflow {
                operation: "join",
                requested: self.degree() + 1,
                maximum: MAX_DEGREE,
            });
        }
        if right.degree() != 1 {
            return Err(PlanError::JoinOperandDegree {
                degree: right.degree(),
            });
        }
        self.check_disjoint(right)?;
        let merged = merge_joiners(joiners)?;
        let inputs = self.context.variables.clone();
        let target = right.last_slot().variable().clone();

        let mut log = ConditionLog::union([self.last_slot().conditions(), right.last_slot().conditions()]);
        if let Some(indexed) = &merged.indexed {
            for (mapping_index, mapping) in indexed.mappings().iter().enumerate() {
                log = log.append(Condition::new(ConditionKind::Join(JoinTest {
                    inputs: inputs.clone(),
                    target: target.clone(),
                    joiner_type: mapping.joiner_type,
                    mapping_index,
                    mapping: mapping.mapping.clone(),
                })));
            }
        }
        if let Some(filter) = merged.filter.clone() {
            let mut filter_inputs = inputs.clone();
            filter_inputs.push(target.clone());
            let degree = inputs.len();
            log = log.append(Condition::filter(
                filter_inputs,
                tuple_predicate(move |values: &[Value]| {
                    filter.test(&values[..degree], &values[degree])
                }),
            ));
        }

        debug!(
            degree = self.degree() + 1,
            indexed = merged.indexed_len(),
            filters = merged.filter_len(),
            "join_compiled"
        );
        let mut slots = self.slots.clone();
        slots.push(PatternSlot::new(target, log));
        MatchExpression::from_slots(slots)
    }

    /// Rejects a right operand whose log binds a variable the left side
    /// already binds. Both slots would share one variable and the union would
    /// collapse the pair to a single fact.
    fn check_disjoint(&self, right: &MatchExpression) -> PlanResult<()> {
        let left_binds: Vec<Variable> = self.last_slot().conditions().iter().flat_map(|c| c.binds()).collect();
        let bound: HashSet<&Variable> = self.context.variables.iter().chain(&left_binds).collect();
        let shared = std::iter::once(right.last_slot().variable().clone())
            .chain(right.last_slot().conditions().iter().flat_map(|c| c.binds()))
            .find(|variable| bound.contains(variable));
        match shared {
            Some(variable) => Err(PlanError::SharedJoinVariable {
                variable: variable.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Keeps tuples for which at least one fact of `fact_type` satisfies the
    /// joiners.
    pub fn exists(
        &self,
        factory: &mut VariableFactory,
        fact_type: impl Into<FactType>,
        joiners: &[Joiner],
    ) -> PlanResult<Self> {
        self.existential(factory, Quantifier::Exists, fact_type.into(), joiners)
    }

    /// Keeps tuples for which no fact of `fact_type` satisfies the joiners.
    pub fn not_exists(
        &self,
        factory: &mut VariableFactory,
        fact_type: impl Into<FactType>,
        joiners: &[Joiner],
    ) -> PlanResult<Self> {
        self.existential(factory, Quantifier::NotExists, fact_type.into(), joiners)
    }

    /// The quantifier lands on the last slot only; the other N-1 slots are
    /// untouched.
    fn existential(
        &self,
        factory: &mut VariableFactory,
        quantifier: Quantifier,
        fact_type: FactType,
        joiners: &[Joiner],
    ) -> PlanResult<Self> {
        let merged = merge_joiners(joiners)?;
        let variable = factory.create_fact(&fact_type, "toExist");
        debug!(
            quantifier = %quantifier,
            fact_type = %fact_type,
            indexed = merged.indexed_len(),
            filters = merged.filter_len(),
            "existential_compiled"
        );
        let condition = Condition::new(ConditionKind::Exists(ExistentialTest {
            quantifier,
            variable,
            fact_type,
            inputs: self.context.variables.clone(),
            indexed: merged.indexed,
            filter: merged.filter,
        }));
        Ok(self.with_last_condition(condition))
    }
}
