//! Constraint sets verified against given facts: match counts, weight
//! totals, score and indictments.

use bigdecimal::BigDecimal;
use matchplan::collector::{count, sum};
use matchplan::config::{CompilerConfig, SessionConfig};
use matchplan::function::tuple_function;
use matchplan::{
    ConstraintSet, GroupBy, Joiner, MatchExpression, MatchWeight, SessionError, Value, Verification, Weigher,
};

fn shift(id: i64, employee: &str, hours: i64) -> Value {
    Value::tuple(vec![Value::from(id), Value::from(employee), Value::from(hours)])
}

fn employee_of(fact: &Value) -> Value {
    fact.component(1).cloned().unwrap_or(Value::Null)
}

fn constraints() -> ConstraintSet {
    ConstraintSet::new()
        .add("overlapping shifts", |factory| {
            let shifts = MatchExpression::for_each(&mut *factory, "Shift");
            let others = MatchExpression::for_each(&mut *factory, "Shift");
            Ok(shifts
                .join(
                    &others,
                    &[
                        Joiner::equal(|t| employee_of(&t[0]), employee_of),
                        Joiner::filtering(|t, other| t[0].component(0) < other.component(0)),
                    ],
                )?
                .terminate())
        })
        .add("unavailable", |factory| {
            Ok(MatchExpression::for_each(&mut *factory, "Shift")
                .exists(
                    &mut *factory,
                    "Unavailable",
                    &[Joiner::equal(|t| employee_of(&t[0]), Value::clone)],
                )?
                .terminate_weighted(Weigher::long(|t| t[0].component(2).map_or(0, Value::to_i64))))
        })
        .add("hours per employee", |factory| {
            Ok(MatchExpression::for_each(&mut *factory, "Shift")
                .group_by(
                    &mut *factory,
                    GroupBy::new()
                        .key(|t| employee_of(&t[0]))
                        .collect(sum(tuple_function(|t: &[Value]| {
                            t[0].component(2).cloned().unwrap_or(Value::Null)
                        }))),
                )?
                .filter(|t| t[1].to_i64() > 8)
                .terminate_weighted(Weigher::decimal(|t| {
                    BigDecimal::from(t[1].to_i64() - 8) / BigDecimal::from(2)
                })))
        })
}

#[test]
fn test_report_per_constraint() {
    let compiled = constraints().compile(&CompilerConfig::default()).unwrap();
    let report = Verification::new(&compiled)
        .given([
            ("Shift", shift(1, "ann", 6)),
            ("Shift", shift(2, "ann", 5)),
            ("Shift", shift(3, "bob", 4)),
            ("Unavailable", Value::from("bob")),
        ])
        .unwrap();

    assert_eq!(report.match_count("overlapping shifts"), 1);
    assert_eq!(report.total("overlapping shifts"), Some(&MatchWeight::Long(1)));
    assert_eq!(report.match_count("unavailable"), 1);
    assert_eq!(report.total("unavailable"), Some(&MatchWeight::Long(4)));
    assert_eq!(report.match_count("hours per employee"), 1);
    assert_eq!(
        report.total("hours per employee").map(MatchWeight::to_decimal),
        Some(BigDecimal::from(3) / BigDecimal::from(2))
    );
    assert_eq!(
        report.score.to_decimal(),
        BigDecimal::from(5) + BigDecimal::from(3) / BigDecimal::from(2)
    );
}

#[test]
fn test_indictments_count_matches_per_fact() {
    let compiled = constraints().compile(&CompilerConfig::default()).unwrap();
    let report = Verification::new(&compiled)
        .given([
            ("Shift", shift(1, "ann", 6)),
            ("Shift", shift(2, "ann", 5)),
            ("Shift", shift(3, "bob", 4)),
            ("Unavailable", Value::from("bob")),
        ])
        .unwrap();

    // Shift 1: overlapping + hours; shift 2: overlapping + hours; shift 3: unavailable
    assert_eq!(report.indictment_count(report.fact(0).unwrap()), 2);
    assert_eq!(report.indictment_count(report.fact(1).unwrap()), 2);
    assert_eq!(report.indictment_count(report.fact(2).unwrap()), 1);
    // Existential facts justify nothing
    assert_eq!(report.indictment_count(report.fact(3).unwrap()), 0);
}

#[test]
fn test_empty_facts_score_zero() {
    let compiled = constraints().compile(&CompilerConfig::default()).unwrap();
    let report = Verification::new(&compiled)
        .given(Vec::<(&str, Value)>::new())
        .unwrap();
    assert_eq!(report.score, MatchWeight::Long(0));
    for constraint in &report.constraints {
        assert_eq!(constraint.match_count, 0);
    }
}

#[test]
fn test_keyless_count_constraint() {
    let compiled = ConstraintSet::new()
        .add("shift count", |factory| {
            Ok(MatchExpression::for_each(&mut *factory, "Shift")
                .group_by(&mut *factory, GroupBy::new().collect(count()))?
                .terminate_weighted(Weigher::long(|t| t[0].to_i64())))
        })
        .compile(&CompilerConfig {
            parallel: false,
            ..CompilerConfig::default()
        })
        .unwrap();

    let report = Verification::new(&compiled)
        .given([("Shift", shift(1, "ann", 1)), ("Shift", shift(2, "bob", 1))])
        .unwrap();
    assert_eq!(report.total("shift count"), Some(&MatchWeight::Long(2)));
}

#[test]
fn test_session_limit_applies() {
    let compiled = constraints().compile(&CompilerConfig::default()).unwrap();
    let facts: Vec<(&str, Value)> = (0..10).map(|i| ("Shift", shift(i, "ann", 1))).collect();
    let result = Verification::new(&compiled)
        .with_session_config(SessionConfig { max_bindings: 20 })
        .given(facts);
    assert_eq!(result.unwrap_err(), SessionError::BindingLimitExceeded { limit: 20 });
}

#[test]
fn test_report_serializes() {
    let compiled = constraints().compile(&CompilerConfig::default()).unwrap();
    let report = Verification::new(&compiled)
        .given([("Shift", shift(1, "ann", 9))])
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["constraints"][2]["name"], "hours per employee");
    assert_eq!(json["constraints"][2]["match_count"], 1);
    let score: BigDecimal = json["score"].as_str().unwrap().parse().unwrap();
    assert_eq!(score, BigDecimal::from(1) / BigDecimal::from(2));
}
