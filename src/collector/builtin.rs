//! Built-in collectors: count, count distinct, sum, min, max, average and
//! sorted list. Every accumulate is exactly reversible.

use super::{Collector, GroupCollector};
use crate::function::TupleFunction;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

struct Count;

impl Collector for Count {
    type Container = i64;
    type Undo = ();

    fn seed(&self) -> i64 {
        0
    }

    fn accumulate(&self, container: &mut i64, _tuple: &[Value]) {
        *container += 1;
    }

    fn undo(&self, container: &mut i64, _undo: ()) {
        *container -= 1;
    }

    fn result(&self, container: &i64) -> Value {
        Value::Int(*container)
    }

    fn name(&self) -> &str {
        "count"
    }
}

struct CountDistinct {
    mapping: TupleFunction,
}

impl Collector for CountDistinct {
    type Container = HashMap<Value, usize>;
    type Undo = Value;

    fn seed(&self) -> Self::Container {
        HashMap::new()
    }

    fn accumulate(&self, container: &mut Self::Container, tuple: &[Value]) -> Value {
        let value = (self.mapping)(tuple);
        *container.entry(value.clone()).or_insert(0) += 1;
        value
    }

    fn undo(&self, container: &mut Self::Container, undo: Value) {
        decrement(container, &undo);
    }

    fn result(&self, container: &Self::Container) -> Value {
        Value::from(container.len())
    }

    fn name(&self) -> &str {
        "countDistinct"
    }
}

struct Sum {
    mapping: TupleFunction,
}

impl Collector for Sum {
    type Container = i64;
    type Undo = i64;

    fn seed(&self) -> i64 {
        0
    }

    fn accumulate(&self, container: &mut i64, tuple: &[Value]) -> i64 {
        let amount = (self.mapping)(tuple).to_i64();
        // Wrapping arithmetic keeps undo exact even on overflow
        *container = container.wrapping_add(amount);
        amount
    }

    fn undo(&self, container: &mut i64, undo: i64) {
        *container = container.wrapping_sub(undo);
    }

    fn result(&self, container: &i64) -> Value {
        Value::Int(*container)
    }

    fn name(&self) -> &str {
        "sum"
    }
}

/// Multiset of mapped values, shared by min, max and sorted list.
struct Ordered {
    mapping: TupleFunction,
    pick: Pick,
}

#[derive(Clone, Copy)]
enum Pick {
    Min,
    Max,
    All,
}

impl Collector for Ordered {
    type Container = BTreeMap<Value, usize>;
    type Undo = Value;

    fn seed(&self) -> Self::Container {
        BTreeMap::new()
    }

    fn accumulate(&self, container: &mut Self::Container, tuple: &[Value]) -> Value {
        let value = (self.mapping)(tuple);
        *container.entry(value.clone()).or_insert(0) += 1;
        value
    }

    fn undo(&self, container: &mut Self::Container, undo: Value) {
        if let Some(count) = container.get_mut(&undo) {
            *count -= 1;
            if *count == 0 {
                container.remove(&undo);
            }
        }
    }

    fn result(&self, container: &Self::Container) -> Value {
        match self.pick {
            Pick::Min => container.keys().next().cloned().unwrap_or(Value::Null),
            Pick::Max => container.keys().next_back().cloned().unwrap_or(Value::Null),
            Pick::All => Value::tuple(
                container
                    .iter()
                    .flat_map(|(value, count)| std::iter::repeat(value.clone()).take(*count))
                    .collect(),
            ),
        }
    }

    fn name(&self) -> &str {
        match self.pick {
            Pick::Min => "min",
            Pick::Max => "max",
            Pick::All => "toSortedList",
        }
    }
}

struct Average {
    mapping: TupleFunction,
}

impl Collector for Average {
    // Integer inputs stay exact in i128; other inputs are kept as a multiset
    // and summed in key order, so the result only depends on the live values
    type Container = (i128, BTreeMap<Value, usize>, usize);
    type Undo = Value;

    fn seed(&self) -> Self::Container {
        (0, BTreeMap::new(), 0)
    }

    fn accumulate(&self, container: &mut Self::Container, tuple: &[Value]) -> Value {
        let value = (self.mapping)(tuple);
        match &value {
            Value::Int(v) => container.0 += i128::from(*v),
            other => *container.1.entry(other.clone()).or_insert(0) += 1,
        }
        container.2 += 1;
        value
    }

    fn undo(&self, container: &mut Self::Container, undo: Value) {
        match &undo {
            Value::Int(v) => container.0 -= i128::from(*v),
            other => {
                if let Some(count) = container.1.get_mut(other) {
                    *count -= 1;
                    if *count == 0 {
                        container.1.remove(other);
                    }
                }
            }
        }
        container.2 -= 1;
    }

    fn result(&self, container: &Self::Container) -> Value {
        let (int_sum, others, count) = container;
        if *count == 0 {
            return Value::Null;
        }
        let other_sum: f64 = others
            .iter()
            .map(|(value, times)| value.to_f64() * *times as f64)
            .sum();
        Value::Float((*int_sum as f64 + other_sum) / *count as f64)
    }

    fn name(&self) -> &str {
        "average"
    }
}

fn decrement(container: &mut HashMap<Value, usize>, value: &Value) {
    if let Some(count) = container.get_mut(value) {
        *count -= 1;
        if *count == 0 {
            container.remove(value);
        }
    }
}

/// Number of tuples in the partition.
pub fn count() -> GroupCollector {
    GroupCollector::new(Count)
}

/// Number of distinct mapped values in the partition.
pub fn count_distinct(mapping: TupleFunction) -> GroupCollector {
    GroupCollector::new(CountDistinct { mapping })
}

/// Integer sum of the mapped values.
pub fn sum(mapping: TupleFunction) -> GroupCollector {
    GroupCollector::new(Sum { mapping })
}

/// Smallest mapped value, or `Null` for an empty partition.
pub fn min(mapping: TupleFunction) -> GroupCollector {
    GroupCollector::new(Ordered {
        mapping,
        pick: Pick::Min,
    })
}

/// Largest mapped value, or `Null` for an empty partition.
pub fn max(mapping: TupleFunction) -> GroupCollector {
    GroupCollector::new(Ordered {
        mapping,
        pick: Pick::Max,
    })
}

/// Arithmetic mean of the mapped values as a `Float`.
pub fn average(mapping: TupleFunction) -> GroupCollector {
    GroupCollector::new(Average { mapping })
}

/// All mapped values, with multiplicity, as a sorted `Tuple`.
pub fn to_sorted_list(mapping: TupleFunction) -> GroupCollector {
    GroupCollector::new(Ordered {
        mapping,
        pick: Pick::All,
    })
}
