//! # Joiners
//!
//! A joiner describes how a key derived from the N values already bound is
//! compared against a key derived from a candidate fact.
//!
//! ## Variants
//!
//! | Variant | Indexable | Meaning |
//! |---------|-----------|---------|
//! | `Equal` .. `NotEqual` | yes | compare `left(tuple)` with `right(fact)` |
//! | `None` | - | match every candidate; must be the only joiner |
//! | `Filtering` | no | arbitrary predicate over the tuple and the fact |
//!
//! Indexable joiners let the matching engine use a hash or range index
//! instead of a scan. [`merge_joiners`] folds a joiner list into at most one
//! [`IndexedJoiner`] and one [`JoinFilter`].

mod merge;

pub use merge::{merge_joiners, MergedJoiners};

use crate::function::{FactFunction, JoinPredicate, TupleFunction};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Comparator of an indexable joiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinerType {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    NotEqual,
}

impl JoinerType {
    /// Compares the left key (from the bound tuple) with the right key
    /// (from the candidate fact).
    pub fn matches(self, left: &Value, right: &Value) -> bool {
        match self {
            JoinerType::Equal => left == right,
            JoinerType::NotEqual => left != right,
            JoinerType::LessThan => left < right,
            JoinerType::LessThanOrEqual => left <= right,
            JoinerType::GreaterThan => left > right,
            JoinerType::GreaterThanOrEqual => left >= right,
        }
    }

    /// The comparator with its operands swapped.
    pub fn flip(self) -> Self {
        match self {
            JoinerType::Equal => JoinerType::Equal,
            JoinerType::NotEqual => JoinerType::NotEqual,
            JoinerType::LessThan => JoinerType::GreaterThan,
            JoinerType::LessThanOrEqual => JoinerType::GreaterThanOrEqual,
            JoinerType::GreaterThan => JoinerType::LessThan,
            JoinerType::GreaterThanOrEqual => JoinerType::LessThanOrEqual,
        }
    }

    /// Whether a hash index (rather than a range index) serves this comparator.
    pub fn is_hash_indexable(self) -> bool {
        matches!(self, JoinerType::Equal)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            JoinerType::Equal => "==",
            JoinerType::NotEqual => "!=",
            JoinerType::LessThan => "<",
            JoinerType::LessThanOrEqual => "<=",
            JoinerType::GreaterThan => ">",
            JoinerType::GreaterThanOrEqual => ">=",
        }
    }
}

impl fmt::Display for JoinerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinerType::Equal => "Equal",
            JoinerType::LessThan => "LessThan",
            JoinerType::LessThanOrEqual => "LessThanOrEqual",
            JoinerType::GreaterThan => "GreaterThan",
            JoinerType::GreaterThanOrEqual => "GreaterThanOrEqual",
            JoinerType::NotEqual => "NotEqual",
        };
        f.write_str(name)
    }
}

/// Left and right key extraction for one mapping index.
#[derive(Clone)]
pub struct KeyMapping {
    left: TupleFunction,
    right: FactFunction,
}

impl KeyMapping {
    pub fn new<L, R>(left: L, right: R) -> Self
    where
        L: Fn(&[Value]) -> Value + Send + Sync + 'static,
        R: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        KeyMapping {
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    pub fn from_functions(left: TupleFunction, right: FactFunction) -> Self {
        KeyMapping { left, right }
    }

    pub fn left(&self) -> &TupleFunction {
        &self.left
    }

    pub fn right(&self) -> &FactFunction {
        &self.right
    }
}

impl fmt::Debug for KeyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMapping")
    }
}

/// A declarative join condition.
#[derive(Clone)]
pub enum Joiner {
    Equal(KeyMapping),
    LessThan(KeyMapping),
    LessThanOrEqual(KeyMapping),
    GreaterThan(KeyMapping),
    GreaterThanOrEqual(KeyMapping),
    NotEqual(KeyMapping),
    /// Matches every candidate without comparing keys.
    None,
    /// Arbitrary predicate over the bound tuple and the candidate; never indexable.
    Filtering(JoinPredicate),
}

impl Joiner {
    pub fn equal<L, R>(left: L, right: R) -> Self
    where
        L: Fn(&[Value]) -> Value + Send + Sync + 'static,
        R: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Joiner::Equal(KeyMapping::new(left, right))
    }

    pub fn less_than<L, R>(left: L, right: R) -> Self
    where
        L: Fn(&[Value]) -> Value + Send + Sync + 'static,
        R: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Joiner::LessThan(KeyMapping::new(left, right))
    }

    pub fn less_than_or_equal<L, R>(left: L, right: R) -> Self
    where
        L: Fn(&[Value]) -> Value + Send + Sync + 'static,
        R: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Joiner::LessThanOrEqual(KeyMapping::new(left, right))
    }

    pub fn greater_than<L, R>(left: L, right: R) -> Self
    where
        L: Fn(&[Value]) -> Value + Send + Sync + 'static,
        R: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Joiner::GreaterThan(KeyMapping::new(left, right))
    }

    pub fn greater_than_or_equal<L, R>(left: L, right: R) -> Self
    where
        L: Fn(&[Value]) -> Value + Send + Sync + 'static,
        R: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Joiner::GreaterThanOrEqual(KeyMapping::new(left, right))
    }

    pub fn not_equal<L, R>(left: L, right: R) -> Self
    where
        L: Fn(&[Value]) -> Value + Send + Sync + 'static,
        R: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Joiner::NotEqual(KeyMapping::new(left, right))
    }

    pub fn filtering<P>(predicate: P) -> Self
    where
        P: Fn(&[Value], &Value) -> bool + Send + Sync + 'static,
    {
        Joiner::Filtering(Arc::new(predicate))
    }

    /// Comparator and key mapping of an indexable joiner.
    pub fn comparison(&self) -> Option<(JoinerType, &KeyMapping)> {
        match self {
            Joiner::Equal(mapping) => Some((JoinerType::Equal, mapping)),
            Joiner::LessThan(mapping) => Some((JoinerType::LessThan, mapping)),
            Joiner::LessThanOrEqual(mapping) => Some((JoinerType::LessThanOrEqual, mapping)),
            Joiner::GreaterThan(mapping) => Some((JoinerType::GreaterThan, mapping)),
            Joiner::GreaterThanOrEqual(mapping) => Some((JoinerType::GreaterThanOrEqual, mapping)),
            Joiner::NotEqual(mapping) => Some((JoinerType::NotEqual, mapping)),
            Joiner::None | Joiner::Filtering(_) => None,
        }
    }

    pub fn is_filtering(&self) -> bool {
        matches!(self, Joiner::Filtering(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Joiner::Equal(_) => "Equal",
            Joiner::LessThan(_) => "LessThan",
            Joiner::LessThanOrEqual(_) => "LessThanOrEqual",
            Joiner::GreaterThan(_) => "GreaterThan",
            Joiner::GreaterThanOrEqual(_) => "GreaterThanOrEqual",
            Joiner::NotEqual(_) => "NotEqual",
            Joiner::None => "None",
            Joiner::Filtering(_) => "Filtering",
        }
    }
}

impl fmt::Display for Joiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}

impl fmt::Debug for Joiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}

/// Renders a joiner list with positions, e.g. `[#0 Equal, #1 Filtering]`.
pub fn describe_joiners(joiners: &[Joiner]) -> String {
    let parts: Vec<String> = joiners
        .iter()
        .enumerate()
        .map(|(i, joiner)| format!("#{i} {joiner}"))
        .collect();
    format!("[{}]", parts.join(", "))
}

/// One indexable comparison at a fixed mapping index.
#[derive(Clone, Debug)]
pub struct IndexedMapping {
    pub joiner_type: JoinerType,
    pub mapping: KeyMapping,
}

impl IndexedMapping {
    /// Evaluates the comparison for one tuple and one candidate.
    pub fn test(&self, tuple: &[Value], fact: &Value) -> bool {
        let left = (self.mapping.left())(tuple);
        let right = (self.mapping.right())(fact);
        self.joiner_type.matches(&left, &right)
    }
}

/// All indexable joiners of one call, merged into a multi-key joiner.
///
/// An empty joiner (from a sole `None`) matches every candidate.
#[derive(Clone, Debug, Default)]
pub struct IndexedJoiner {
    mappings: Vec<IndexedMapping>,
}

impl IndexedJoiner {
    pub fn new() -> Self {
        IndexedJoiner {
            mappings: Vec::new(),
        }
    }

    /// Concatenates the other joiner's per-index key extractors after ours.
    pub fn merge(mut self, other: IndexedJoiner) -> Self {
        self.mappings.extend(other.mappings);
        self
    }

    pub fn push(&mut self, joiner_type: JoinerType, mapping: KeyMapping) {
        self.mappings.push(IndexedMapping {
            joiner_type,
            mapping,
        });
    }

    pub fn mappings(&self) -> &[IndexedMapping] {
        &self.mappings
    }

    pub fn joiner_types(&self) -> Vec<JoinerType> {
        self.mappings.iter().map(|m| m.joiner_type).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn test(&self, tuple: &[Value], fact: &Value) -> bool {
        self.mappings.iter().all(|m| m.test(tuple, fact))
    }
}

/// All filtering joiners of one call, ANDed left to right.
#[derive(Clone, Default)]
pub struct JoinFilter {
    predicates: Vec<JoinPredicate>,
}

impl JoinFilter {
    pub fn new(predicate: JoinPredicate) -> Self {
        JoinFilter {
            predicates: vec![predicate],
        }
    }

    pub fn and(mut self, predicate: JoinPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Short-circuits on the first predicate that fails.
    pub fn test(&self, tuple: &[Value], fact: &Value) -> bool {
        self.predicates.iter().all(|p| p(tuple, fact))
    }
}

impl fmt::Debug for JoinFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JoinFilter({} predicates)", self.predicates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joiner_type_matches() {
        let one = Value::from(1);
        let two = Value::from(2);
        assert!(JoinerType::Equal.matches(&one, &one));
        assert!(JoinerType::NotEqual.matches(&one, &two));
        assert!(JoinerType::LessThan.matches(&one, &two));
        assert!(JoinerType::LessThanOrEqual.matches(&two, &two));
        assert!(JoinerType::GreaterThan.matches(&two, &one));
        assert!(JoinerType::GreaterThanOrEqual.matches(&one, &one));
        assert!(!JoinerType::GreaterThan.matches(&one, &one));
    }

    #[test]
    fn test_flip_is_involution() {
        for joiner_type in [
            JoinerType::Equal,
            JoinerType::LessThan,
            JoinerType::LessThanOrEqual,
            JoinerType::GreaterThan,
            JoinerType::GreaterThanOrEqual,
            JoinerType::NotEqual,
        ] {
            assert_eq!(joiner_type.flip().flip(), joiner_type);
            let a = Value::from(3);
            let b = Value::from(5);
            assert_eq!(joiner_type.matches(&a, &b), joiner_type.flip().matches(&b, &a));
        }
    }

    #[test]
    fn test_comparison_of_variants() {
        let joiner = Joiner::less_than(|t| t[0].clone(), Value::clone);
        assert_eq!(joiner.comparison().map(|(t, _)| t), Some(JoinerType::LessThan));
        assert!(Joiner::None.comparison().is_none());
        assert!(Joiner::filtering(|_, _| true).comparison().is_none());
    }

    #[test]
    fn test_describe_joiners() {
        let joiners = [
            Joiner::equal(|t| t[0].clone(), Value::clone),
            Joiner::filtering(|_, _| true),
        ];
        assert_eq!(describe_joiners(&joiners), "[#0 Equal, #1 Filtering]");
        assert_eq!(describe_joiners(&[]), "[]");
    }

    #[test]
    fn test_indexed_joiner_merge_concatenates() {
        let mut first = IndexedJoiner::new();
        first.push(JoinerType::Equal, KeyMapping::new(|t| t[0].clone(), Value::clone));
        let mut second = IndexedJoiner::new();
        second.push(JoinerType::LessThan, KeyMapping::new(|t| t[0].clone(), Value::clone));
        let merged = first.merge(second);
        assert_eq!(
            merged.joiner_types(),
            vec![JoinerType::Equal, JoinerType::LessThan]
        );
    }
}
