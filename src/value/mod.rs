//! # Value Type System
//!
//! Dynamically typed values bound to plan variables.
//!
//! ## Design Decisions
//!
//! - **Value semantics everywhere**: equality, hashing and ordering are
//!   structural, so composite grouping keys behave the same no matter which
//!   fact produced them
//! - **Floats by bit pattern**: `Float` equality and hashing use `to_bits()`,
//!   ordering uses `total_cmp`, keeping `Eq`/`Hash`/`Ord` consistent
//! - **Cheap clones**: strings, decimals and tuples are reference counted
//!
//! ## Usage
//!
//! ```rust
//! use matchplan::value::Value;
//!
//! let key = Value::tuple(vec![Value::from(1), Value::from("x")]);
//! assert_eq!(key.component(1), Some(&Value::from("x")));
//! assert_eq!(key, Value::tuple(vec![Value::from(1), Value::from("x")]));
//! ```

use bigdecimal::BigDecimal;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Name of a kind of fact the matching engine holds (a "class" of facts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactType(Arc<str>);

impl FactType {
    pub fn new(name: &str) -> Self {
        FactType(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FactType {
    fn from(name: &str) -> Self {
        FactType::new(name)
    }
}

impl From<String> for FactType {
    fn from(name: String) -> Self {
        FactType(Arc::from(name))
    }
}

impl fmt::Display for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dynamically-typed value carried by a variable binding
#[derive(Debug, Clone)]
pub enum Value {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// Arbitrary precision decimal
    Decimal(Arc<BigDecimal>),
    /// UTF-8 string (reference counted for efficient cloning)
    String(Arc<str>),
    /// Ordered, structural tuple of values.
    ///
    /// Used for composite grouping keys and for the boxed pre-grouping tuple
    /// that collectors read from.
    Tuple(Arc<[Value]>),
}

impl Value {
    /// Create a string value from a &str
    pub fn string(s: &str) -> Self {
        Value::String(Arc::from(s))
    }

    /// Create a tuple value from its components
    pub fn tuple(values: Vec<Value>) -> Self {
        Value::Tuple(Arc::from(values))
    }

    /// Create a decimal value
    pub fn decimal(value: BigDecimal) -> Self {
        Value::Decimal(Arc::new(value))
    }

    /// Try to get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as decimal reference
    pub fn as_decimal(&self) -> Option<&BigDecimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }

    /// Try to get the components of a tuple
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(values) => Some(values),
            _ => None,
        }
    }

    /// Component `index` of a tuple value
    pub fn component(&self, index: usize) -> Option<&Value> {
        self.as_tuple().and_then(|values| values.get(index))
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert to i64 (for aggregation operations)
    /// Returns 0 for non-numeric types
    pub fn to_i64(&self) -> i64 {
        match self {
            Value::Int(v) => *v,
            Value::Float(v) => *v as i64,
            Value::Bool(b) => i64::from(*b),
            _ => 0,
        }
    }

    /// Convert to f64 (for aggregation operations)
    /// Returns 0.0 for non-numeric types
    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    /// Rank of the variant, used to order values of different types
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Decimal(_) => 4,
            Value::String(_) => 5,
            Value::Tuple(_) => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

// Implement Hash manually to handle f64
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::String(s) => s.hash(state),
            Value::Tuple(values) => {
                values.len().hash(state);
                for value in values.iter() {
                    value.hash(state);
                }
            }
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) => a.iter().cmp(b.iter()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Tuple(values) => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<BigDecimal> for Value {
    fn from(d: BigDecimal) -> Self {
        Value::decimal(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::tuple(values)
    }
}
