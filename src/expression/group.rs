//! Grouped aggregation.
//!
//! The pre-grouping sub-plan is the union of every slot's log. When
//! collectors are present it also binds one source variable holding the
//! whole pre-grouping tuple, boxed, which every collector reads from.

use super::{MatchExpression, PatternSlot};
use crate::collector::CollectorBinding;
use crate::condition::{Condition, ConditionKind, ConditionLog, GroupKey, Grouping};
use crate::error::PlanResult;
use crate::function::boxed_tuple;
use crate::grouping::{pack_keys, unpack_keys, GroupBy};
use crate::variable::VariableFactory;
use tracing::debug;

impl MatchExpression {
    /// Groups the N-tuples, producing keys first and collector results
    /// after them.
    ///
    /// Zero keys form a single implicit group, one key groups natively, and
    /// 2-4 keys are packed into one composite key and unpacked into one
    /// derived variable per component.
    pub fn group_by(&self, factory: &mut VariableFactory, group_by: GroupBy) -> PlanResult<Self> {
        group_by.validate()?;
        let inputs = self.context.variables.clone();
        let mut input = ConditionLog::union(self.slots.iter().map(PatternSlot::conditions));

        let source = if group_by.collectors().is_empty() {
            None
        } else {
            let source = factory.create_tuple(inputs.len(), "source");
            input = input.append(Condition::bind(source.clone(), inputs.clone(), boxed_tuple()));
            Some(source)
        };

        let key_count = group_by.keys().len();
        let key = match key_count {
            0 => None,
            1 => Some(GroupKey {
                variable: factory.create_value("groupKey"),
                function: group_by.keys()[0].clone(),
            }),
            n => Some(GroupKey {
                variable: factory.create_tuple(n, "groupKey"),
                function: pack_keys(group_by.keys()),
            }),
        };

        let collectors: Vec<CollectorBinding> = match &source {
            Some(source) => group_by
                .collectors()
                .iter()
                .map(|collector| CollectorBinding {
                    source: source.clone(),
                    output: factory.create_value("result"),
                    collector: collector.clone(),
                })
                .collect(),
            None => Vec::new(),
        };

        let grouping = Condition::new(ConditionKind::Group(Grouping {
            input,
            inputs,
            source,
            key: key.clone(),
            collectors: collectors.clone(),
        }));
        debug!(
            degree = self.degree(),
            keys = key_count,
            collectors = collectors.len(),
            condition = grouping.id(),
            "group_by_compiled"
        );

        let mut log = ConditionLog::new().append(grouping);
        let mut slots = Vec::with_capacity(group_by.output_degree());
        match key {
            None => {}
            Some(key) if key_count == 1 => slots.push(PatternSlot::new(key.variable, log.clone())),
            Some(key) => {
                // Each key slot sees the unpacking of its own component and
                // every component before it.
                for (variable, bind) in unpack_keys(factory, &key.variable, key_count) {
                    log = log.append(bind);
                    slots.push(PatternSlot::new(variable, log.clone()));
                }
            }
        }
        for binding in collectors {
            slots.push(PatternSlot::new(binding.output, log.clone()));
        }
        MatchExpression::from_slots(slots)
    }
}
