//! # Conditions
//!
//! A [`Condition`] is one engine-level requirement over plan variables: a
//! pattern, an indexed join test, a filter, a derived binding, an existential
//! sub-plan or a grouping construct. Conditions are immutable and compared by
//! identity; two structurally identical conditions built separately are
//! different conditions.
//!
//! Conditions compose only by concatenation into a [`ConditionLog`], an
//! ordered log with structural sharing. A log extended from another log
//! shares its prefix by reference, which makes the prerequisite relation
//! between pattern slots auditable with [`ConditionLog::extends`].

mod log;

pub use log::{ConditionLog, LogIter};

use crate::collector::CollectorBinding;
use crate::function::{TupleFunction, TuplePredicate};
use crate::joiner::{IndexedJoiner, JoinFilter, JoinerType, KeyMapping};
use crate::value::{FactType, Value};
use crate::variable::Variable;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Existential quantifier of an [`ExistentialTest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// At least one satisfying candidate exists
    Exists,
    /// No satisfying candidate exists
    NotExists,
}

impl Quantifier {
    /// Applies the quantifier to the outcome of the candidate search.
    pub fn holds(self, found: bool) -> bool {
        match self {
            Quantifier::Exists => found,
            Quantifier::NotExists => !found,
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::Exists => write!(f, "Exists"),
            Quantifier::NotExists => write!(f, "NotExists"),
        }
    }
}

/// Indexable comparison between the left tuple and a joined fact, for one
/// mapping index.
#[derive(Clone, Debug)]
pub struct JoinTest {
    /// Variables the left key is computed from
    pub inputs: Vec<Variable>,
    /// Variable bound to the joined fact
    pub target: Variable,
    pub joiner_type: JoinerType,
    pub mapping_index: usize,
    pub mapping: KeyMapping,
}

impl JoinTest {
    pub fn test(&self, tuple: &[Value], fact: &Value) -> bool {
        let left = (self.mapping.left())(tuple);
        let right = (self.mapping.right())(fact);
        self.joiner_type.matches(&left, &right)
    }
}

/// Existential or negated-existential sub-plan over facts of one type.
#[derive(Clone, Debug)]
pub struct ExistentialTest {
    pub quantifier: Quantifier,
    /// Fresh variable the candidate fact is bound to inside the sub-plan
    pub variable: Variable,
    pub fact_type: FactType,
    /// Variables of the parent tuple the joiners read
    pub inputs: Vec<Variable>,
    pub indexed: Option<IndexedJoiner>,
    pub filter: Option<JoinFilter>,
}

impl ExistentialTest {
    /// Whether `candidate` satisfies the merged indexed condition followed
    /// by the merged filter.
    pub fn satisfied_by(&self, tuple: &[Value], candidate: &Value) -> bool {
        self.indexed.as_ref().is_none_or(|i| i.test(tuple, candidate))
            && self.filter.as_ref().is_none_or(|f| f.test(tuple, candidate))
    }
}

/// Single-key grouping key: the variable it binds and its extractor.
#[derive(Clone)]
pub struct GroupKey {
    pub variable: Variable,
    pub function: TupleFunction,
}

impl fmt::Debug for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupKey({})", self.variable)
    }
}

/// Grouping construct over a self-contained pre-grouping sub-plan.
///
/// The engine groups by at most one key. Composite keys arrive here already
/// packed into one structural tuple.
#[derive(Clone, Debug)]
pub struct Grouping {
    /// Pre-grouping sub-plan
    pub input: ConditionLog,
    /// Pre-grouping variables, in tuple order
    pub inputs: Vec<Variable>,
    /// Boxed pre-grouping tuple all collectors read from
    pub source: Option<Variable>,
    pub key: Option<GroupKey>,
    pub collectors: Vec<CollectorBinding>,
}

/// What a condition requires.
#[derive(Clone)]
pub enum ConditionKind {
    /// Binds `variable` to each fact of `fact_type`
    Pattern {
        variable: Variable,
        fact_type: FactType,
    },
    /// Keeps tuples for which `predicate` holds over `inputs`
    Filter {
        inputs: Vec<Variable>,
        predicate: TuplePredicate,
    },
    Join(JoinTest),
    /// Binds `variable` to a pure function of `inputs`
    Bind {
        variable: Variable,
        inputs: Vec<Variable>,
        function: TupleFunction,
    },
    Exists(ExistentialTest),
    Group(Grouping),
}

impl ConditionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConditionKind::Pattern { .. } => "Pattern",
            ConditionKind::Filter { .. } => "Filter",
            ConditionKind::Join(_) => "Join",
            ConditionKind::Bind { .. } => "Bind",
            ConditionKind::Exists(test) => match test.quantifier {
                Quantifier::Exists => "Exists",
                Quantifier::NotExists => "NotExists",
            },
            ConditionKind::Group(_) => "GroupBy",
        }
    }
}

impl fmt::Debug for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct ConditionInner {
    id: u64,
    kind: ConditionKind,
}

/// Identity handle of an immutable condition.
#[derive(Clone)]
pub struct Condition(Arc<ConditionInner>);

impl Condition {
    pub fn new(kind: ConditionKind) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        Condition(Arc::new(ConditionInner {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            kind,
        }))
    }

    pub fn pattern(variable: Variable, fact_type: FactType) -> Self {
        Condition::new(ConditionKind::Pattern {
            variable,
            fact_type,
        })
    }

    pub fn filter(inputs: Vec<Variable>, predicate: TuplePredicate) -> Self {
        Condition::new(ConditionKind::Filter { inputs, predicate })
    }

    pub fn bind(variable: Variable, inputs: Vec<Variable>, function: TupleFunction) -> Self {
        Condition::new(ConditionKind::Bind {
            variable,
            inputs,
            function,
        })
    }

    /// Process-wide unique id, stable for the lifetime of the condition.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.0.kind
    }

    /// Variables this condition makes available to later conditions.
    pub fn binds(&self) -> Vec<Variable> {
        match self.kind() {
            ConditionKind::Pattern { variable, .. } | ConditionKind::Bind { variable, .. } => {
                vec![variable.clone()]
            }
            ConditionKind::Group(grouping) => grouping
                .key
                .iter()
                .map(|key| key.variable.clone())
                .chain(grouping.collectors.iter().map(|c| c.output.clone()))
                .collect(),
            ConditionKind::Filter { .. } | ConditionKind::Join(_) | ConditionKind::Exists(_) => {
                Vec::new()
            }
        }
    }

    /// Variables this condition requires to be bound by earlier conditions.
    ///
    /// A grouping construct reads nothing from its surroundings: its
    /// pre-grouping sub-plan binds everything it needs.
    pub fn reads(&self) -> Vec<Variable> {
        match self.kind() {
            ConditionKind::Pattern { .. } | ConditionKind::Group(_) => Vec::new(),
            ConditionKind::Filter { inputs, .. }
            | ConditionKind::Bind { inputs, .. }
            | ConditionKind::Exists(ExistentialTest { inputs, .. }) => inputs.clone(),
            ConditionKind::Join(test) => {
                let mut reads = test.inputs.clone();
                reads.push(test.target.clone());
                reads
            }
        }
    }

    /// One-line description, e.g. `Join#0(Equal [a_1] -> b_2)`.
    pub fn describe(&self) -> String {
        match self.kind() {
            ConditionKind::Pattern {
                variable,
                fact_type,
            } => format!("Pattern({variable}: {fact_type})"),
            ConditionKind::Filter { inputs, .. } => format!("Filter({})", names(inputs)),
            ConditionKind::Join(test) => format!(
                "Join#{}({} [{}] -> {})",
                test.mapping_index,
                test.joiner_type,
                names(&test.inputs),
                test.target
            ),
            ConditionKind::Bind {
                variable, inputs, ..
            } => format!("Bind({variable} <- [{}])", names(inputs)),
            ConditionKind::Exists(test) => {
                let indexed = test
                    .indexed
                    .as_ref()
                    .map(|i| {
                        i.joiner_types()
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                format!(
                    "{}({}: {}, inputs=[{}], indexed=[{}], filters={})",
                    test.quantifier,
                    test.variable,
                    test.fact_type,
                    names(&test.inputs),
                    indexed,
                    test.filter.as_ref().map_or(0, JoinFilter::len)
                )
            }
            ConditionKind::Group(grouping) => {
                let key = grouping
                    .key
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |k| k.variable.to_string());
                let collectors: Vec<String> = grouping
                    .collectors
                    .iter()
                    .map(|c| format!("{} -> {}", c.collector.name(), c.output))
                    .collect();
                format!(
                    "GroupBy(key={key}, collectors=[{}], inputs=[{}])",
                    collectors.join(", "),
                    names(&grouping.inputs)
                )
            }
        }
    }

    /// Indented rendering, descending into grouping sub-plans.
    pub fn pretty_print(&self, indent: usize) -> String {
        let prefix = "  ".repeat(indent);
        let mut out = format!("{prefix}{}", self.describe());
        if let ConditionKind::Group(grouping) = self.kind() {
            for inner in grouping.input.iter_ordered() {
                out.push('\n');
                out.push_str(&inner.pretty_print(indent + 1));
            }
        }
        out
    }
}

fn names(variables: &[Variable]) -> String {
    variables
        .iter()
        .map(Variable::name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Condition {}

impl std::hash::Hash for Condition {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id(), self.describe())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
