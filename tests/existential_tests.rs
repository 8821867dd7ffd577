//! Existential and negated-existential checks: presence flips on the first
//! satisfying insert and the last satisfying retract.

use matchplan::{Joiner, MatchExpression, Plan, Quantifier, Session, Value, VariableFactory};

fn same_employee() -> Joiner {
    Joiner::equal(|t| t[0].clone(), |leave| leave.component(0).cloned().unwrap_or(Value::Null))
}

fn leave(employee: i64, days: i64) -> Value {
    Value::tuple(vec![Value::from(employee), Value::from(days)])
}

fn plan(quantifier: Quantifier, joiners: &[Joiner]) -> Plan {
    let mut factory = VariableFactory::new();
    let employees = MatchExpression::for_each(&mut factory, "Employee");
    let checked = match quantifier {
        Quantifier::Exists => employees.exists(&mut factory, "Leave", joiners),
        Quantifier::NotExists => employees.not_exists(&mut factory, "Leave", joiners),
    };
    checked.unwrap().terminate()
}

fn live(session: &mut Session, plan: &Plan) -> Vec<Value> {
    session
        .evaluate(plan)
        .unwrap()
        .into_iter()
        .map(|m| m.values[0].clone())
        .collect()
}

#[test]
fn test_exists_flips_on_first_insert_and_last_retract() {
    let exists = plan(Quantifier::Exists, &[same_employee()]);
    let mut session = Session::new();
    session.insert("Employee", 1);
    session.insert("Employee", 2);
    assert!(live(&mut session, &exists).is_empty());

    let first = session.insert("Leave", leave(1, 3));
    assert_eq!(live(&mut session, &exists), vec![Value::from(1)]);

    let second = session.insert("Leave", leave(1, 4));
    assert_eq!(live(&mut session, &exists), vec![Value::from(1)]);

    session.retract(first).unwrap();
    assert_eq!(live(&mut session, &exists), vec![Value::from(1)]);

    session.retract(second).unwrap();
    assert!(live(&mut session, &exists).is_empty());
}

#[test]
fn test_not_exists_is_complement() {
    let exists = plan(Quantifier::Exists, &[same_employee()]);
    let not_exists = plan(Quantifier::NotExists, &[same_employee()]);
    let mut session = Session::new();
    for employee in 1..=4 {
        session.insert("Employee", employee);
    }
    session.insert("Leave", leave(2, 1));
    session.insert("Leave", leave(4, 1));
    session.insert("Leave", leave(9, 1));

    let present = live(&mut session, &exists);
    let absent = live(&mut session, &not_exists);
    assert_eq!(present, vec![Value::from(2), Value::from(4)]);
    assert_eq!(absent, vec![Value::from(1), Value::from(3)]);
}

#[test]
fn test_filter_applies_after_index() {
    let joiners = [
        same_employee(),
        Joiner::filtering(|_, leave| leave.component(1).and_then(Value::as_int) > Some(2)),
    ];
    let exists = plan(Quantifier::Exists, &joiners);
    let mut session = Session::new();
    session.insert("Employee", 1);
    let short = session.insert("Leave", leave(1, 1));
    assert!(live(&mut session, &exists).is_empty());

    session.update(short, leave(1, 5)).unwrap();
    assert_eq!(live(&mut session, &exists), vec![Value::from(1)]);
}

#[test]
fn test_none_joiner_matches_any_candidate() {
    let not_exists = plan(Quantifier::NotExists, &[Joiner::None]);
    let mut session = Session::new();
    session.insert("Employee", 1);
    assert_eq!(live(&mut session, &not_exists), vec![Value::from(1)]);
    session.insert("Leave", leave(7, 1));
    assert!(live(&mut session, &not_exists).is_empty());
}

#[test]
fn test_empty_joiners_behave_like_none() {
    let exists = plan(Quantifier::Exists, &[]);
    let mut session = Session::new();
    session.insert("Employee", 1);
    assert!(live(&mut session, &exists).is_empty());
    session.insert("Leave", leave(3, 1));
    assert_eq!(live(&mut session, &exists), vec![Value::from(1)]);
}

#[test]
fn test_range_joiner_over_two_values() {
    let mut factory = VariableFactory::new();
    let shifts = MatchExpression::for_each(&mut factory, "Start");
    let ends = MatchExpression::for_each(&mut factory, "End");
    let plan = shifts
        .join(&ends, &[Joiner::less_than(|t| t[0].clone(), Value::clone)])
        .unwrap()
        .not_exists(
            &mut factory,
            "Break",
            &[
                Joiner::less_than(|t| t[0].clone(), Value::clone),
                Joiner::greater_than(|t| t[1].clone(), Value::clone),
            ],
        )
        .unwrap()
        .terminate();

    let mut session = Session::new();
    session.insert("Start", 1);
    session.insert("End", 5);
    session.insert("End", 10);
    session.insert("Break", 7);

    let matches = session.evaluate(&plan).unwrap();
    let pairs: Vec<Vec<Value>> = matches.into_iter().map(|m| m.values).collect();
    // Only 1..5 has no break strictly inside it
    assert_eq!(pairs, vec![vec![Value::from(1), Value::from(5)]]);
}

#[test]
fn test_existential_facts_do_not_justify_matches() {
    let exists = plan(Quantifier::Exists, &[same_employee()]);
    let mut session = Session::new();
    let employee = session.insert("Employee", 1);
    session.insert("Leave", leave(1, 1));
    let matches = session.evaluate(&exists).unwrap();
    assert_eq!(matches[0].facts, vec![employee]);
}
