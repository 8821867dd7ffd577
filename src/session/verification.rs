//! Given-facts verification of compiled constraints.
//!
//! Loads a fact set into a fresh [`Session`], evaluates every compiled
//! constraint and reports per-constraint match counts and weight totals, the
//! overall score, and how many matches each fact takes part in.

use super::{FactHandle, Match, Session};
use crate::config::SessionConfig;
use crate::constraint::CompiledConstraints;
use crate::error::SessionResult;
use crate::plan::MatchWeight;
use crate::value::{FactType, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Runs compiled constraints against given fact sets.
#[derive(Debug, Clone)]
pub struct Verification<'a> {
    constraints: &'a CompiledConstraints,
    session: SessionConfig,
}

impl<'a> Verification<'a> {
    pub fn new(constraints: &'a CompiledConstraints) -> Self {
        Verification {
            constraints,
            session: SessionConfig::default(),
        }
    }

    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Evaluates every constraint over exactly `facts`.
    pub fn given<I, T, V>(&self, facts: I) -> SessionResult<VerificationReport>
    where
        I: IntoIterator<Item = (T, V)>,
        T: Into<FactType>,
        V: Into<Value>,
    {
        let mut session = Session::with_config(&self.session);
        let handles: Vec<FactHandle> = facts
            .into_iter()
            .map(|(fact_type, value)| session.insert(fact_type, value))
            .collect();

        let mut reports = Vec::with_capacity(self.constraints.len());
        let mut indictments: BTreeMap<FactHandle, usize> = BTreeMap::new();
        for plan in self.constraints.plans() {
            let matches = session.evaluate(plan)?;
            for fact in matches.iter().flat_map(|m| m.facts.iter()) {
                *indictments.entry(*fact).or_insert(0) += 1;
            }
            reports.push(ConstraintReport {
                name: plan.name().unwrap_or("anonymous").to_string(),
                match_count: matches.len(),
                total: matches.iter().map(|m| m.weight.clone()).sum(),
                matches,
            });
        }

        let score = reports.iter().map(|r| r.total.clone()).sum();
        info!(
            facts = handles.len(),
            constraints = reports.len(),
            score = %score,
            "verification_completed"
        );
        Ok(VerificationReport {
            facts: handles,
            constraints: reports,
            score,
            indictments,
        })
    }
}

/// Outcome of one constraint in a [`VerificationReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintReport {
    pub name: String,
    pub match_count: usize,
    pub total: MatchWeight,
    #[serde(skip)]
    pub matches: Vec<Match>,
}

/// Outcome of evaluating every constraint over one fact set.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// Handles of the given facts, in the order they were given
    pub facts: Vec<FactHandle>,
    pub constraints: Vec<ConstraintReport>,
    /// Sum of every constraint's total
    pub score: MatchWeight,
    /// Number of matches each fact justifies, across all constraints
    pub indictments: BTreeMap<FactHandle, usize>,
}

impl VerificationReport {
    pub fn constraint(&self, name: &str) -> Option<&ConstraintReport> {
        self.constraints.iter().find(|r| r.name == name)
    }

    /// Matches of `name`, or 0 for an unknown constraint.
    pub fn match_count(&self, name: &str) -> usize {
        self.constraint(name).map_or(0, |r| r.match_count)
    }

    pub fn total(&self, name: &str) -> Option<&MatchWeight> {
        self.constraint(name).map(|r| &r.total)
    }

    pub fn indictment_count(&self, fact: FactHandle) -> usize {
        self.indictments.get(&fact).copied().unwrap_or(0)
    }

    /// Handle of the `index`-th given fact.
    pub fn fact(&self, index: usize) -> Option<FactHandle> {
        self.facts.get(index).copied()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::constraint::ConstraintSet;
    use crate::expression::MatchExpression;
    use crate::plan::Weigher;

    #[test]
    fn test_counts_score_and_indictments() {
        let compiled = ConstraintSet::new()
            .add("large", |factory| {
                Ok(MatchExpression::for_each(factory, "Load")
                    .filter(|values| values[0].to_i64() > 10)
                    .terminate_weighted(Weigher::long(|values| values[0].to_i64())))
            })
            .compile(&CompilerConfig::default())
            .unwrap();

        let report = Verification::new(&compiled)
            .given([("Load", 5), ("Load", 12), ("Load", 30)])
            .unwrap();
        assert_eq!(report.match_count("large"), 2);
        assert_eq!(report.total("large"), Some(&MatchWeight::Long(42)));
        assert_eq!(report.score, MatchWeight::Long(42));
        assert_eq!(report.indictment_count(report.fact(0).unwrap()), 0);
        assert_eq!(report.indictment_count(report.fact(2).unwrap()), 1);
        assert_eq!(report.match_count("missing"), 0);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"match_count\": 2"));
    }
}
