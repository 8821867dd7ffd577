//! Plan variables and the per-compilation factory that names them.
//!
//! A [`Variable`] is an opaque slot for a bound value. Two variables are
//! equal only if they are the same slot: the identity is the pair of the
//! factory's scope and the factory's counter at creation time, so two
//! factories never hand out colliding identities even when they reuse names.
//!
//! A [`VariableFactory`] is the only mutable resource of a compilation. It is
//! passed by `&mut` through every algebra operation that introduces a
//! variable and must not be shared between concurrent compilations.

use crate::value::FactType;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Identity of a variable: (factory scope, creation index).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VariableId {
    scope: u32,
    index: u32,
}

impl VariableId {
    pub fn scope(self) -> u32 {
        self.scope
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

/// Declared type of the value a variable binds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// A fact of the given type, bound by a pattern
    Fact(FactType),
    /// A structural tuple of the given degree (composite key or boxed source tuple)
    Tuple(usize),
    /// Any derived value (mapping result, key component, collector output)
    Value,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::Fact(fact_type) => write!(f, "{fact_type}"),
            VariableType::Tuple(degree) => write!(f, "Tuple{degree}"),
            VariableType::Value => write!(f, "Value"),
        }
    }
}

/// A uniquely named slot for one bound value.
#[derive(Debug, Clone)]
pub struct Variable {
    id: VariableId,
    name: Arc<str>,
    declared_type: VariableType,
}

impl Variable {
    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &VariableType {
        &self.declared_type
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl std::hash::Hash for Variable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Source of uniquely named variables for one compilation.
#[derive(Debug)]
pub struct VariableFactory {
    scope: u32,
    counter: u32,
}

impl VariableFactory {
    /// Creates a factory with a fresh scope.
    pub fn new() -> Self {
        static NEXT_SCOPE: AtomicU32 = AtomicU32::new(1);

        VariableFactory {
            scope: NEXT_SCOPE.fetch_add(1, Ordering::Relaxed),
            counter: 0,
        }
    }

    pub fn scope(&self) -> u32 {
        self.scope
    }

    /// Number of variables created so far.
    pub fn created(&self) -> u32 {
        self.counter
    }

    /// Creates a variable named `{base_name}_{n}`, where `n` increases with
    /// every call on this factory.
    pub fn create(&mut self, base_name: &str, declared_type: VariableType) -> Variable {
        self.counter += 1;
        Variable {
            id: VariableId {
                scope: self.scope,
                index: self.counter,
            },
            name: Arc::from(format!("{base_name}_{}", self.counter)),
            declared_type,
        }
    }

    /// Creates a variable bound to facts of `fact_type`.
    pub fn create_fact(&mut self, fact_type: &FactType, base_name: &str) -> Variable {
        self.create(base_name, VariableType::Fact(fact_type.clone()))
    }

    /// Creates a variable holding a structural tuple of `degree` components.
    pub fn create_tuple(&mut self, degree: usize, base_name: &str) -> Variable {
        self.create(base_name, VariableType::Tuple(degree))
    }

    /// Creates a variable for a derived value.
    pub fn create_value(&mut self, base_name: &str) -> Variable {
        self.create(base_name, VariableType::Value)
    }
}

impl Default for VariableFactory {
    fn default() -> Self {
        Self::new()
    }
}
