//! Joiner classification and merging through the public API.

use matchplan::{merge_joiners, Joiner, JoinerType, MatchExpression, PlanError, Value, VariableFactory};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn equal() -> Joiner {
    Joiner::equal(|t| t[0].clone(), Value::clone)
}

fn not_equal() -> Joiner {
    Joiner::not_equal(|t| t[0].clone(), Value::clone)
}

#[test]
fn test_none_alone_is_legal() {
    let merged = merge_joiners(&[Joiner::None]).unwrap();
    assert!(!merged.is_empty());
    assert_eq!(merged.indexed_len(), 0);
    assert_eq!(merged.filter_len(), 0);
}

#[test]
fn test_none_with_any_other_joiner_fails() {
    for others in [
        vec![Joiner::None, equal()],
        vec![equal(), Joiner::None],
        vec![Joiner::filtering(|_, _| true), Joiner::None],
        vec![Joiner::None, Joiner::None],
    ] {
        let err = merge_joiners(&others).unwrap_err();
        assert!(matches!(err, PlanError::NoneJoinerNotAlone { .. }), "{err}");
    }
}

#[test]
fn test_multiplicity_error_names_the_list() {
    let err = merge_joiners(&[equal(), not_equal(), Joiner::None]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "If present, the none joiner must be the only joiner, got [#0 Equal, #1 NotEqual, #2 None] instead (none joiner at #2)."
    );
}

#[test]
fn test_ordering_error_names_both_joiners() {
    let err = merge_joiners(&[Joiner::filtering(|_, _| true), Joiner::filtering(|_, _| true), not_equal()])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Indexing joiner #2 (NotEqual) must not follow a filtering joiner #0 (Filtering) in [#0 Filtering, #1 Filtering, #2 NotEqual]."
    );
}

#[test]
fn test_indexed_prefix_keeps_order() {
    let merged = merge_joiners(&[
        Joiner::greater_than(|t| t[0].clone(), Value::clone),
        equal(),
        Joiner::less_than_or_equal(|t| t[0].clone(), Value::clone),
    ])
    .unwrap();
    let indexed = merged.indexed.unwrap();
    assert_eq!(
        indexed.joiner_types(),
        vec![JoinerType::GreaterThan, JoinerType::Equal, JoinerType::LessThanOrEqual]
    );
    assert!(merged.filter.is_none());
}

#[test]
fn test_filters_are_anded_left_to_right_with_short_circuit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = {
        let calls = Arc::clone(&calls);
        Joiner::filtering(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            true
        })
    };
    let merged = merge_joiners(&[
        equal(),
        Joiner::filtering(|_, fact| fact.as_int() == Some(1)),
        counted,
    ])
    .unwrap();
    let filter = merged.filter.unwrap();

    assert!(!filter.test(&[Value::from(0)], &Value::from(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(filter.test(&[Value::from(0)], &Value::from(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_same_rules_apply_to_join_and_exists() {
    let mut factory = VariableFactory::new();
    let a = MatchExpression::for_each(&mut factory, "A");
    let b = MatchExpression::for_each(&mut factory, "B");
    let bad = [Joiner::filtering(|_, _| true), equal()];

    let join_err = a.join(&b, &bad).unwrap_err();
    let exists_err = a.exists(&mut factory, "B", &bad).unwrap_err();
    assert_eq!(join_err, exists_err);
}

#[test]
fn test_joiner_display() {
    assert_eq!(equal().to_string(), "Equal");
    assert_eq!(Joiner::None.to_string(), "None");
    assert_eq!(format!("{:?}", Joiner::filtering(|_, _| false)), "Filtering");
}
