//! # Plan Emission
//!
//! A [`Plan`] is the artifact handed to the matching engine: the ordered
//! condition list, the externally visible variables and the weigher that
//! turns each live binding into a [`MatchWeight`].

use crate::condition::{Condition, ConditionKind};
use crate::error::{PlanError, PlanResult};
use crate::function::{TupleToDecimal, TupleToLong};
use crate::value::Value;
use crate::variable::Variable;
use bigdecimal::BigDecimal;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::ops::Add;
use std::sync::Arc;
use tracing::warn;

/// Weight contributed by one live match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchWeight {
    Long(i64),
    Decimal(BigDecimal),
}

impl MatchWeight {
    pub fn zero() -> Self {
        MatchWeight::Long(0)
    }

    pub fn to_decimal(&self) -> BigDecimal {
        match self {
            MatchWeight::Long(v) => BigDecimal::from(*v),
            MatchWeight::Decimal(d) => d.clone(),
        }
    }
}

impl Default for MatchWeight {
    fn default() -> Self {
        MatchWeight::zero()
    }
}

impl Add for MatchWeight {
    type Output = MatchWeight;

    /// Long plus long stays long unless it overflows; anything else is
    /// promoted to decimal.
    fn add(self, other: MatchWeight) -> MatchWeight {
        match (&self, &other) {
            (MatchWeight::Long(a), MatchWeight::Long(b)) => match a.checked_add(*b) {
                Some(sum) => MatchWeight::Long(sum),
                None => MatchWeight::Decimal(BigDecimal::from(*a) + BigDecimal::from(*b)),
            },
            _ => MatchWeight::Decimal(self.to_decimal() + other.to_decimal()),
        }
    }
}

impl std::iter::Sum for MatchWeight {
    fn sum<I: Iterator<Item = MatchWeight>>(iter: I) -> Self {
        iter.fold(MatchWeight::zero(), Add::add)
    }
}

impl fmt::Display for MatchWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchWeight::Long(v) => write!(f, "{v}"),
            MatchWeight::Decimal(d) => write!(f, "{d}"),
        }
    }
}

impl Serialize for MatchWeight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MatchWeight::Long(v) => serializer.serialize_i64(*v),
            MatchWeight::Decimal(d) => serializer.serialize_str(&d.to_string()),
        }
    }
}

/// Maps the visible values of a live match to its weight.
#[derive(Clone, Default)]
pub enum Weigher {
    /// Every match weighs 1
    #[default]
    Unit,
    Long(TupleToLong),
    Decimal(TupleToDecimal),
}

impl Weigher {
    pub fn long<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> i64 + Send + Sync + 'static,
    {
        Weigher::Long(Arc::new(f))
    }

    pub fn decimal<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> BigDecimal + Send + Sync + 'static,
    {
        Weigher::Decimal(Arc::new(f))
    }

    pub fn weigh(&self, values: &[Value]) -> MatchWeight {
        match self {
            Weigher::Unit => MatchWeight::Long(1),
            Weigher::Long(f) => MatchWeight::Long(f(values)),
            Weigher::Decimal(f) => MatchWeight::Decimal(f(values)),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Weigher::Unit => "unit",
            Weigher::Long(_) => "long",
            Weigher::Decimal(_) => "decimal",
        }
    }
}

impl fmt::Debug for Weigher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Weigher({})", self.kind_name())
    }
}

/// Terminal artifact consumed by the matching engine.
#[derive(Clone, Debug)]
pub struct Plan {
    name: Option<String>,
    conditions: Vec<Condition>,
    variables: Vec<Variable>,
    weigher: Weigher,
}

impl Plan {
    pub fn new(conditions: Vec<Condition>, variables: Vec<Variable>, weigher: Weigher) -> Self {
        Plan {
            name: None,
            conditions,
            variables,
            weigher,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// All conditions, in evaluation order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Variables visible to the weigher and to match consumers, in tuple
    /// order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn degree(&self) -> usize {
        self.variables.len()
    }

    pub fn weigher(&self) -> &Weigher {
        &self.weigher
    }

    /// Checks that every condition reads only variables bound by an earlier
    /// condition, descending into grouping sub-plans, and that every visible
    /// variable is bound.
    pub fn verify_bindings(&self) -> PlanResult<()> {
        let bound = verify_sequence(self.conditions.iter(), HashSet::new())?;
        for variable in &self.variables {
            if !bound.contains(variable) {
                warn!(variable = %variable, "visible_variable_unbound");
                return Err(PlanError::UnboundVariable {
                    variable: variable.name().to_string(),
                    condition: self.conditions.len(),
                });
            }
        }
        Ok(())
    }

    /// Indented text rendering of the plan.
    pub fn explain(&self) -> String {
        let mut out = format!(
            "Plan({}) visible=[{}] weigher={}",
            self.name.as_deref().unwrap_or("anonymous"),
            self.variables
                .iter()
                .map(Variable::name)
                .collect::<Vec<_>>()
                .join(", "),
            self.weigher.kind_name()
        );
        for condition in &self.conditions {
            out.push('\n');
            out.push_str(&condition.pretty_print(1));
        }
        out
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            name: self.name.clone(),
            visible: self.variables.iter().map(|v| v.name().to_string()).collect(),
            weigher: self.weigher.kind_name(),
            conditions: self.conditions.iter().map(ConditionSummary::from).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }
}

fn verify_sequence<'a, I>(conditions: I, mut bound: HashSet<Variable>) -> PlanResult<HashSet<Variable>>
where
    I: Iterator<Item = &'a Condition>,
{
    for (position, condition) in conditions.enumerate() {
        if let ConditionKind::Group(grouping) = condition.kind() {
            let inner = verify_sequence(grouping.input.iter_ordered(), HashSet::new())?;
            let grouping_reads = grouping.inputs.iter().chain(grouping.source.iter());
            for variable in grouping_reads {
                if !inner.contains(variable) {
                    return Err(unbound(variable, position));
                }
            }
        }
        for variable in condition.reads() {
            if !bound.contains(&variable) {
                return Err(unbound(&variable, position));
            }
        }
        bound.extend(condition.binds());
    }
    Ok(bound)
}

fn unbound(variable: &Variable, condition: usize) -> PlanError {
    warn!(variable = %variable, condition, "condition_reads_unbound_variable");
    PlanError::UnboundVariable {
        variable: variable.name().to_string(),
        condition,
    }
}

/// Serializable description of a plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub name: Option<String>,
    pub visible: Vec<String>,
    pub weigher: &'static str,
    pub conditions: Vec<ConditionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConditionSummary {
    pub id: u64,
    pub kind: &'static str,
    pub description: String,
    pub binds: Vec<String>,
    pub reads: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inner: Vec<ConditionSummary>,
}

impl From<&Condition> for ConditionSummary {
    fn from(condition: &Condition) -> Self {
        let inner = match condition.kind() {
            ConditionKind::Group(grouping) => grouping
                .input
                .iter_ordered()
                .map(ConditionSummary::from)
                .collect(),
            _ => Vec::new(),
        };
        ConditionSummary {
            id: condition.id(),
            kind: condition.kind().name(),
            description: condition.describe(),
            binds: condition.binds().iter().map(|v| v.name().to_string()).collect(),
            reads: condition.reads().iter().map(|v| v.name().to_string()).collect(),
            inner,
        }
    }
}
