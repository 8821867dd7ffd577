//! # Constraint Sets
//!
//! A [`ConstraintSet`] is a list of named constraint builders. Compiling the
//! set runs every builder against its own [`VariableFactory`], optionally in
//! parallel, so no naming state is ever shared between two builds.

use crate::config::CompilerConfig;
use crate::error::PlanResult;
use crate::plan::Plan;
use crate::variable::VariableFactory;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Builds one constraint's plan from a fresh factory.
pub type ConstraintBuilder = Arc<dyn Fn(&mut VariableFactory) -> PlanResult<Plan> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<(String, ConstraintBuilder)>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        ConstraintSet::default()
    }

    pub fn add<F>(mut self, name: impl Into<String>, builder: F) -> Self
    where
        F: Fn(&mut VariableFactory) -> PlanResult<Plan> + Send + Sync + 'static,
    {
        self.constraints.push((name.into(), Arc::new(builder)));
        self
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().map(|(name, _)| name.as_str())
    }

    /// Compiles every constraint. Plans keep the order constraints were
    /// added in; the first failing constraint's error is returned.
    pub fn compile(&self, config: &CompilerConfig) -> PlanResult<CompiledConstraints> {
        let start = Instant::now();
        let results: Vec<PlanResult<Plan>> = if config.parallel {
            self.compile_parallel(config)
        } else {
            self.constraints
                .iter()
                .map(|(name, builder)| compile_one(name, builder, config))
                .collect()
        };

        let mut plans = Vec::with_capacity(results.len());
        for result in results {
            plans.push(result?);
        }
        info!(
            constraints = plans.len(),
            parallel = config.parallel,
            elapsed_us = start.elapsed().as_micros() as u64,
            "constraint_set_compiled"
        );
        Ok(CompiledConstraints { plans })
    }

    fn compile_parallel(&self, config: &CompilerConfig) -> Vec<PlanResult<Plan>> {
        let run = || -> Vec<PlanResult<Plan>> {
            self.constraints
                .par_iter()
                .map(|(name, builder)| compile_one(name, builder, config))
                .collect()
        };
        if config.num_threads == 0 {
            return run();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!(error = %e, num_threads = config.num_threads, "thread_pool_unavailable");
                run()
            }
        }
    }
}

fn compile_one(name: &str, builder: &ConstraintBuilder, config: &CompilerConfig) -> PlanResult<Plan> {
    let mut factory = VariableFactory::new();
    let plan = builder(&mut factory)?.with_name(name);
    if config.verify_plans {
        plan.verify_bindings()?;
    }
    Ok(plan)
}

impl fmt::Debug for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Compiled plans of a [`ConstraintSet`], in declaration order.
#[derive(Clone, Debug, Default)]
pub struct CompiledConstraints {
    plans: Vec<Plan>,
}

impl CompiledConstraints {
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn get(&self, name: &str) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.name() == Some(name))
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
