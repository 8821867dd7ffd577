//! Shared closure types used by conditions, joiners and collectors.
//!
//! Every function receives the bound values positionally: a `&[Value]` of
//! length N for an expression of degree N.

use crate::value::Value;
use std::sync::Arc;

/// Maps the N bound values of a tuple to one value.
pub type TupleFunction = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Tests the N bound values of a tuple.
pub type TuplePredicate = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Maps a single candidate fact to one value.
pub type FactFunction = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Tests the N bound values of a tuple against a candidate fact.
pub type JoinPredicate = Arc<dyn Fn(&[Value], &Value) -> bool + Send + Sync>;

/// Maps the N bound values of a tuple to an integer weight.
pub type TupleToLong = Arc<dyn Fn(&[Value]) -> i64 + Send + Sync>;

/// Maps the N bound values of a tuple to a decimal weight.
pub type TupleToDecimal = Arc<dyn Fn(&[Value]) -> bigdecimal::BigDecimal + Send + Sync>;

pub fn tuple_function<F>(f: F) -> TupleFunction
where
    F: Fn(&[Value]) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn tuple_predicate<F>(f: F) -> TuplePredicate
where
    F: Fn(&[Value]) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn fact_function<F>(f: F) -> FactFunction
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Projects the component at `index` of the bound values.
pub fn column(index: usize) -> TupleFunction {
    Arc::new(move |values: &[Value]| values.get(index).cloned().unwrap_or(Value::Null))
}

/// Boxes all bound values into one structural tuple.
pub fn boxed_tuple() -> TupleFunction {
    Arc::new(|values: &[Value]| Value::tuple(values.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column() {
        let values = [Value::from(1), Value::from("x")];
        assert_eq!(column(1)(&values), Value::from("x"));
        assert_eq!(column(5)(&values), Value::Null);
    }

    #[test]
    fn test_boxed_tuple() {
        let values = [Value::from(1), Value::from(2), Value::from(3)];
        let boxed = boxed_tuple()(&values);
        assert_eq!(boxed.as_tuple(), Some(&values[..]));
    }
}
