//! Property-based grouping, joiner and existential tests (proptest).

use proptest::prelude::*;
use std::collections::BTreeMap;

use matchplan::collector::{count, max, min, sum};
use matchplan::function::{column, tuple_function, TupleFunction};
use matchplan::grouping::{component, unpack_value};
use matchplan::{
    merge_joiners, pack_keys, FactHandle, GroupBy, Joiner, MatchExpression, Plan, Session, Value, VariableFactory,
};

fn field(index: usize) -> TupleFunction {
    tuple_function(move |t: &[Value]| t[0].component(index).cloned().unwrap_or(Value::Null))
}

fn item(a: i64, b: i64, amount: i64) -> Value {
    Value::tuple(vec![Value::from(a), Value::from(b), Value::from(amount)])
}

#[derive(Debug, Clone)]
enum Op {
    Insert(i64, i64, i64),
    Retract(usize),
    Update(usize, i64, i64, i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..3i64, 0..2i64, -5..10i64).prop_map(|(a, b, amount)| Op::Insert(a, b, amount)),
        1 => any::<usize>().prop_map(Op::Retract),
        1 => (any::<usize>(), 0..3i64, 0..2i64, -5..10i64)
            .prop_map(|(index, a, b, amount)| Op::Update(index, a, b, amount)),
    ]
}

fn two_key_plan() -> Plan {
    let mut factory = VariableFactory::new();
    MatchExpression::for_each(&mut factory, "Item")
        .group_by(
            &mut factory,
            GroupBy::new()
                .key_function(field(0))
                .key_function(field(1))
                .collect(count())
                .collect(sum(field(2))),
        )
        .unwrap()
        .terminate()
}

/// Group rows recomputed from scratch over the live items.
fn brute_force(live: &[(FactHandle, (i64, i64, i64))]) -> Vec<Vec<Value>> {
    let mut groups: BTreeMap<(i64, i64), (i64, i64)> = BTreeMap::new();
    for (_, (a, b, amount)) in live {
        let entry = groups.entry((*a, *b)).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += amount;
    }
    groups
        .into_iter()
        .map(|((a, b), (n, total))| vec![Value::from(a), Value::from(b), Value::from(n), Value::from(total)])
        .collect()
}

fn values_of(session: &mut Session, plan: &Plan) -> Vec<Vec<Value>> {
    session
        .evaluate(plan)
        .unwrap()
        .into_iter()
        .map(|m| m.values)
        .collect()
}

proptest! {
    #[test]
    fn prop_pack_then_unpack_is_identity(values in prop::collection::vec(-100..100i64, 2..=4)) {
        let tuple: Vec<Value> = values.iter().copied().map(Value::from).collect();
        let keys: Vec<TupleFunction> = (0..tuple.len()).map(column).collect();
        let composite = pack_keys(&keys)(&tuple[..]);

        prop_assert_eq!(unpack_value(&composite), tuple.clone());
        for (index, expected) in tuple.iter().enumerate() {
            prop_assert_eq!(&component(index)(std::slice::from_ref(&composite)), expected);
        }
    }

    #[test]
    fn prop_grouping_tracks_brute_force(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let plan = two_key_plan();
        let mut session = Session::new();
        let mut live: Vec<(FactHandle, (i64, i64, i64))> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(a, b, amount) => {
                    let handle = session.insert("Item", item(a, b, amount));
                    live.push((handle, (a, b, amount)));
                }
                Op::Retract(index) if !live.is_empty() => {
                    let (handle, _) = live.remove(index % live.len());
                    session.retract(handle).unwrap();
                }
                Op::Update(index, a, b, amount) if !live.is_empty() => {
                    let slot = index % live.len();
                    session.update(live[slot].0, item(a, b, amount)).unwrap();
                    live[slot].1 = (a, b, amount);
                }
                _ => {}
            }
            prop_assert_eq!(values_of(&mut session, &plan), brute_force(&live));
        }
    }

    #[test]
    fn prop_fused_collectors_agree_with_brute_force(amounts in prop::collection::vec((0..3i64, -20..20i64), 1..30),
                                                    retract in prop::collection::vec(any::<bool>(), 30)) {
        let mut factory = VariableFactory::new();
        let plan = MatchExpression::for_each(&mut factory, "Item")
            .group_by(
                &mut factory,
                GroupBy::new()
                    .key_function(field(0))
                    .collect(min(field(1)))
                    .collect(max(field(1)))
                    .collect(count()),
            )
            .unwrap()
            .terminate();

        let mut session = Session::new();
        let handles: Vec<FactHandle> = amounts
            .iter()
            .map(|(key, amount)| session.insert("Item", Value::tuple(vec![Value::from(*key), Value::from(*amount)])))
            .collect();
        // Evaluate once before retracting so undo paths run
        values_of(&mut session, &plan);

        let mut expected: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for ((handle, (key, amount)), gone) in handles.iter().zip(&amounts).zip(&retract) {
            if *gone {
                session.retract(*handle).unwrap();
            } else {
                expected.entry(*key).or_default().push(*amount);
            }
        }
        let expected: Vec<Vec<Value>> = expected
            .into_iter()
            .map(|(key, amounts)| {
                vec![
                    Value::from(key),
                    Value::from(amounts.iter().copied().min().unwrap_or_default()),
                    Value::from(amounts.iter().copied().max().unwrap_or_default()),
                    Value::from(amounts.len()),
                ]
            })
            .collect();
        prop_assert_eq!(values_of(&mut session, &plan), expected);
    }

    #[test]
    fn prop_joiner_order_rule(kinds in prop::collection::vec(any::<bool>(), 0..6)) {
        // true = filtering, false = indexable
        let joiners: Vec<Joiner> = kinds
            .iter()
            .map(|filtering| {
                if *filtering {
                    Joiner::filtering(|_, _| true)
                } else {
                    Joiner::equal(|t| t[0].clone(), Value::clone)
                }
            })
            .collect();
        let legal = kinds.windows(2).all(|pair| !(pair[0] && !pair[1]));
        let filters = kinds.iter().filter(|k| **k).count();

        match merge_joiners(&joiners) {
            Ok(merged) => {
                prop_assert!(legal);
                prop_assert_eq!(merged.filter_len(), filters);
                prop_assert_eq!(merged.indexed_len(), kinds.len() - filters);
            }
            Err(_) => prop_assert!(!legal),
        }
    }

    #[test]
    fn prop_exists_matches_brute_force(employees in prop::collection::vec(0..6i64, 0..8),
                                       leaves in prop::collection::vec(0..6i64, 0..8)) {
        let mut factory = VariableFactory::new();
        let base = MatchExpression::for_each(&mut factory, "Employee");
        let same = [Joiner::equal(|t| t[0].clone(), Value::clone)];
        let exists = base.exists(&mut factory, "Leave", &same).unwrap().terminate();
        let not_exists = base.not_exists(&mut factory, "Leave", &same).unwrap().terminate();

        let mut session = Session::new();
        for employee in &employees {
            session.insert("Employee", *employee);
        }
        for leave in &leaves {
            session.insert("Leave", *leave);
        }

        let (present, absent): (Vec<i64>, Vec<i64>) =
            employees.iter().copied().partition(|employee| leaves.contains(employee));
        let as_rows = |ids: Vec<i64>| ids.into_iter().map(|id| vec![Value::from(id)]).collect::<Vec<_>>();
        prop_assert_eq!(values_of(&mut session, &exists), as_rows(present));
        prop_assert_eq!(values_of(&mut session, &not_exists), as_rows(absent));
    }
}
