//! Ordered condition log with structural sharing.
//!
//! The log is a persistent cons list: appending creates a new head that
//! points at the old one, so a log and every log extended from it share
//! their common prefix by reference and nothing is ever copied.

use super::Condition;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

struct LogNode {
    condition: Condition,
    previous: Option<Arc<LogNode>>,
    len: usize,
}

/// Ordered list of conditions that must all hold. Cloning is O(1).
#[derive(Clone, Default)]
pub struct ConditionLog {
    head: Option<Arc<LogNode>>,
}

impl ConditionLog {
    pub fn new() -> Self {
        ConditionLog { head: None }
    }

    /// Returns a new log with `condition` appended; `self` is unchanged.
    pub fn append(&self, condition: Condition) -> ConditionLog {
        let len = self.len() + 1;
        ConditionLog {
            head: Some(Arc::new(LogNode {
                condition,
                previous: self.head.clone(),
                len,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |node| node.len)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Most recently appended condition.
    pub fn last(&self) -> Option<&Condition> {
        self.head.as_ref().map(|node| &node.condition)
    }

    /// Iterates newest first.
    pub fn iter(&self) -> LogIter<'_> {
        LogIter {
            node: self.head.as_deref(),
        }
    }

    /// Iterates oldest first.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Condition> {
        let mut conditions: Vec<&Condition> = self.iter().collect();
        conditions.reverse();
        conditions.into_iter()
    }

    /// Conditions oldest first.
    pub fn to_vec(&self) -> Vec<Condition> {
        self.iter_ordered().cloned().collect()
    }

    /// Whether `condition` (by identity) is part of this log.
    pub fn contains(&self, condition: &Condition) -> bool {
        self.iter().any(|c| c == condition)
    }

    /// Whether this log was built by appending to `prefix`, sharing it by
    /// reference. Every log extends the empty log and itself.
    pub fn extends(&self, prefix: &ConditionLog) -> bool {
        let target = prefix.len();
        let mut node = self.head.as_ref();
        while let Some(current) = node {
            if current.len == target {
                break;
            }
            node = current.previous.as_ref();
        }
        match (node, prefix.head.as_ref()) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Order-preserving union without duplicates by identity.
    ///
    /// Starts from the first log. A log that extends the running result
    /// replaces it, sharing the whole prefix; otherwise its missing
    /// conditions are appended in their original order.
    pub fn union<'a, I>(logs: I) -> ConditionLog
    where
        I: IntoIterator<Item = &'a ConditionLog>,
    {
        let mut result = ConditionLog::new();
        let mut seen: HashSet<u64> = HashSet::new();
        for log in logs {
            if log.extends(&result) {
                for condition in log.iter().take(log.len() - result.len()) {
                    seen.insert(condition.id());
                }
                result = log.clone();
            } else if !result.extends(log) {
                for condition in log.iter_ordered() {
                    if seen.insert(condition.id()) {
                        result = result.append(condition.clone());
                    }
                }
            }
        }
        result
    }
}

impl fmt::Debug for ConditionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter_ordered()).finish()
    }
}

impl FromIterator<Condition> for ConditionLog {
    fn from_iter<T: IntoIterator<Item = Condition>>(iter: T) -> Self {
        iter.into_iter()
            .fold(ConditionLog::new(), |log, condition| log.append(condition))
    }
}

/// Newest-first iterator over a [`ConditionLog`].
pub struct LogIter<'a> {
    node: Option<&'a LogNode>,
}

impl<'a> Iterator for LogIter<'a> {
    type Item = &'a Condition;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = node.previous.as_deref();
        Some(&node.condition)
    }
}
