//! # Collectors and the Aggregation Adapter
//!
//! A [`Collector`] is an incremental aggregation with a
//! seed / accumulate / undo / result lifecycle. `accumulate` returns an undo
//! value that, handed back to `undo`, reverses exactly that contribution; any
//! interleaving of the two must leave `result` equal to a recomputation over
//! the tuples still accumulated.
//!
//! Collectors have different container types, so the grouping construct
//! cannot store them directly. The adapter erases them behind
//! [`GroupCollector`] and [`Accumulation`], and [`FusedAccumulator`] drives
//! 1-4 of them from one partitioning pass over one input tuple.

mod builtin;

pub use builtin::{average, count, count_distinct, max, min, sum, to_sorted_list};

use crate::value::Value;
use crate::variable::Variable;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Incremental aggregation over pre-grouping tuples.
pub trait Collector: Send + Sync + 'static {
    /// Mutable aggregation state of one partition
    type Container: Send + 'static;
    /// Token that reverses one `accumulate` call
    type Undo: Send + 'static;

    fn seed(&self) -> Self::Container;

    fn accumulate(&self, container: &mut Self::Container, tuple: &[Value]) -> Self::Undo;

    fn undo(&self, container: &mut Self::Container, undo: Self::Undo);

    fn result(&self, container: &Self::Container) -> Value;

    /// Short name used when explaining plans.
    fn name(&self) -> &str {
        "collector"
    }
}

/// Opaque handle of one accumulated contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UndoToken(u64);

/// One partition's running aggregation, with the container type erased.
pub trait Accumulation: Send {
    fn accumulate(&mut self, tuple: &[Value]) -> UndoToken;

    /// Reverses the contribution behind `token`. Returns false for a token
    /// this accumulation never issued or already undid.
    fn undo(&mut self, token: UndoToken) -> bool;

    fn result(&self) -> Value;
}

struct TypedAccumulation<C: Collector> {
    collector: Arc<C>,
    container: C::Container,
    pending: HashMap<u64, C::Undo>,
    next_token: u64,
}

impl<C: Collector> Accumulation for TypedAccumulation<C> {
    fn accumulate(&mut self, tuple: &[Value]) -> UndoToken {
        let undo = self.collector.accumulate(&mut self.container, tuple);
        let token = self.next_token;
        self.next_token += 1;
        self.pending.insert(token, undo);
        UndoToken(token)
    }

    fn undo(&mut self, token: UndoToken) -> bool {
        match self.pending.remove(&token.0) {
            Some(undo) => {
                self.collector.undo(&mut self.container, undo);
                true
            }
            None => false,
        }
    }

    fn result(&self) -> Value {
        self.collector.result(&self.container)
    }
}

trait ErasedCollector: Send + Sync {
    fn start(&self) -> Box<dyn Accumulation>;
    fn name(&self) -> &str;
}

struct Erased<C: Collector>(Arc<C>);

impl<C: Collector> ErasedCollector for Erased<C> {
    fn start(&self) -> Box<dyn Accumulation> {
        Box::new(TypedAccumulation {
            collector: Arc::clone(&self.0),
            container: self.0.seed(),
            pending: HashMap::new(),
            next_token: 0,
        })
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

/// A collector ready to be attached to a grouping construct.
#[derive(Clone)]
pub struct GroupCollector {
    inner: Arc<dyn ErasedCollector>,
}

impl GroupCollector {
    pub fn new<C: Collector>(collector: C) -> Self {
        GroupCollector {
            inner: Arc::new(Erased(Arc::new(collector))),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Seeds a fresh accumulation for one partition.
    pub fn start(&self) -> Box<dyn Accumulation> {
        self.inner.start()
    }
}

impl fmt::Debug for GroupCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupCollector({})", self.name())
    }
}

/// Binds one collector to the shared source variable and its own output.
#[derive(Clone, Debug)]
pub struct CollectorBinding {
    pub source: Variable,
    pub output: Variable,
    pub collector: GroupCollector,
}

/// Undo tokens of one fused insert, one per collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusedUndo(Vec<UndoToken>);

/// The accumulations of every collector of one partition, fed together.
pub struct FusedAccumulator {
    accumulations: Vec<Box<dyn Accumulation>>,
}

impl FusedAccumulator {
    pub fn new(bindings: &[CollectorBinding]) -> Self {
        FusedAccumulator {
            accumulations: bindings.iter().map(|b| b.collector.start()).collect(),
        }
    }

    pub fn from_collectors(collectors: &[GroupCollector]) -> Self {
        FusedAccumulator {
            accumulations: collectors.iter().map(GroupCollector::start).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.accumulations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulations.is_empty()
    }

    /// Feeds one source tuple to every collector.
    pub fn insert(&mut self, tuple: &[Value]) -> FusedUndo {
        FusedUndo(
            self.accumulations
                .iter_mut()
                .map(|acc| acc.accumulate(tuple))
                .collect(),
        )
    }

    /// Reverses one earlier `insert`.
    pub fn retract(&mut self, undo: FusedUndo) {
        for (acc, token) in self.accumulations.iter_mut().zip(undo.0) {
            acc.undo(token);
        }
    }

    /// One result per collector, in binding order.
    pub fn results(&self) -> Vec<Value> {
        self.accumulations.iter().map(|acc| acc.result()).collect()
    }
}

impl fmt::Debug for FusedAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FusedAccumulator({} collectors)", self.accumulations.len())
    }
}
