//! # matchplan
//!
//! Compiles a fluent, arity-polymorphic tuple algebra (filter, indexed join,
//! existential and negated-existential checks, grouped aggregation,
//! projection, weighted termination) into a matching plan for an incremental
//! matching engine.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! for_each(fact type)                 → MatchExpression (degree 1)
//!     ↓
//! filter / join / exists / not_exists → MatchExpression (degree 1-4)
//!     ↓                                   joiners → merge_joiners → IndexedJoiner + JoinFilter
//! group_by                            → MatchExpression (keys, then collector results)
//!     ↓                                   2-4 keys → pack_keys → single key → unpack_keys
//! map                                 → MatchExpression (degree 1)
//!     ↓
//! terminate / terminate_weighted      → Plan (conditions + visible variables + weigher)
//! ```
//!
//! Every expression is immutable. Each pattern slot carries a
//! [`ConditionLog`] that structurally shares the log of the slot before it,
//! so the dependency graph between slots is explicit and auditable.
//!
//! ## Usage
//!
//! ```rust
//! use matchplan::{collector, GroupBy, Joiner, MatchExpression, Session, Value, VariableFactory};
//!
//! let mut factory = VariableFactory::new();
//! let plan = MatchExpression::for_each(&mut factory, "Shift")
//!     .not_exists(&mut factory, "Leave", &[Joiner::equal(|t| t[0].clone(), Value::clone)])?
//!     .group_by(&mut factory, GroupBy::new().collect(collector::count()))?
//!     .terminate();
//!
//! let mut session = Session::new();
//! session.insert("Shift", 1);
//! session.insert("Shift", 2);
//! session.insert("Leave", 2);
//! let matches = session.evaluate(&plan)?;
//! assert_eq!(matches[0].values, vec![Value::Int(1)]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `value` | Dynamically typed values and fact types |
//! | `variable` | Variables and the per-compilation factory |
//! | `joiner` | Joiner model, classifier and merger |
//! | `condition` | Conditions and the structurally shared condition log |
//! | `collector` | Incremental collectors and the aggregation adapter |
//! | `grouping` | Group-by requests, composite key packer and unpacker |
//! | `expression` | The match expression algebra |
//! | `plan` | Plan emission, weights and diagnostics |
//! | `constraint` | Named constraint sets, compiled in parallel |
//! | `session` | Reference evaluator and verification harness |

pub mod collector;
pub mod condition;
pub mod config;
pub mod constraint;
pub mod error;
pub mod expression;
pub mod function;
pub mod grouping;
pub mod joiner;
pub mod logging;
pub mod plan;
pub mod session;
pub mod value;
pub mod variable;

pub use collector::{Collector, CollectorBinding, FusedAccumulator, GroupCollector};
pub use condition::{Condition, ConditionKind, ConditionLog, Quantifier};
pub use config::Config;
pub use constraint::{CompiledConstraints, ConstraintSet};
pub use error::{PlanError, PlanResult, SessionError, SessionResult, MAX_DEGREE};
pub use expression::{MatchExpression, PatternSlot, RuleContext};
pub use grouping::{pack_keys, unpack_keys, GroupBy};
pub use joiner::{merge_joiners, IndexedJoiner, JoinFilter, Joiner, JoinerType, MergedJoiners};
pub use logging::init_logging;
pub use plan::{MatchWeight, Plan, PlanSummary, Weigher};
pub use session::{FactHandle, Match, Session, Verification, VerificationReport};
pub use value::{FactType, Value};
pub use variable::{Variable, VariableFactory, VariableType};
