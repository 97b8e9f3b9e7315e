//! Resource bounds for a single evaluation.

use serde::{Deserialize, Serialize};

use crate::errors::{host_call_limit_exceeded, step_limit_exceeded, EvalError};

/// Optional caps on the work one evaluation may do. `None` is unlimited.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalLimits {
    /// Maximum number of expression nodes visited.
    pub max_steps: Option<u64>,
    /// Maximum number of host bridge invocations.
    pub max_host_calls: Option<u32>,
}

impl EvalLimits {
    pub const UNLIMITED: EvalLimits = EvalLimits {
        max_steps: None,
        max_host_calls: None,
    };

    #[must_use]
    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    #[must_use]
    pub fn with_max_host_calls(mut self, calls: u32) -> Self {
        self.max_host_calls = Some(calls);
        self
    }
}

/// Counters checked against [`EvalLimits`] as the evaluation advances.
#[derive(Clone, Debug, Default)]
pub(crate) struct Budget {
    limits: EvalLimits,
    steps: u64,
    host_calls: u32,
}

impl Budget {
    pub(crate) fn new(limits: EvalLimits) -> Self {
        Budget {
            limits,
            steps: 0,
            host_calls: 0,
        }
    }

    /// Count one step. Fails once the count passes `max_steps`.
    #[inline]
    pub(crate) fn charge_step(&mut self) -> Result<(), EvalError> {
        self.steps = self.steps.saturating_add(1);
        match self.limits.max_steps {
            Some(limit) if self.steps > limit => Err(step_limit_exceeded(limit)),
            _ => Ok(()),
        }
    }

    /// Count one host call. Fails once the count passes `max_host_calls`.
    pub(crate) fn charge_host_call(&mut self) -> Result<(), EvalError> {
        self.host_calls = self.host_calls.saturating_add(1);
        match self.limits.max_host_calls {
            Some(limit) if self.host_calls > limit => Err(host_call_limit_exceeded(limit)),
            _ => Ok(()),
        }
    }

    pub(crate) fn steps(&self) -> u64 {
        self.steps
    }

    pub(crate) fn host_calls(&self) -> u32 {
        self.host_calls
    }
}
