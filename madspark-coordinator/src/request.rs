//! Coordinator-facing request/response shapes (§6 Coordinator API).

use std::collections::HashMap;
use std::time::Duration;

use madspark_config::TemperatureManager;
use madspark_contracts::{Candidate, RequestInputs, ValidationError};

/// `runWorkflow`'s parameters (§6), minus the progress callback — that
/// one is carried separately by [`crate::async_coordinator::run_workflow_async`]
/// only, since the sync coordinator has nowhere concurrent to report from.
#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub inputs: RequestInputs,
    pub num_top_candidates: usize,
    pub temperatures: TemperatureManager,
    pub enable_reasoning: bool,
    pub multi_dimensional_eval: bool,
    pub enable_logical_inference: bool,
    pub enable_novelty_filter: bool,
    pub timeout_secs: u64,
    pub tags: Vec<String>,
}

impl WorkflowRequest {
    pub fn new(inputs: RequestInputs) -> Self {
        Self {
            inputs,
            num_top_candidates: 2,
            temperatures: TemperatureManager::default(),
            enable_reasoning: false,
            multi_dimensional_eval: false,
            enable_logical_inference: false,
            enable_novelty_filter: false,
            timeout_secs: 1200,
            tags: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.inputs.validate()?;
        if self.num_top_candidates < 1 {
            return Err(ValidationError::OutOfRange {
                field: "num_top_candidates",
                value: self.num_top_candidates as f64,
                min: 1.0,
                max: f64::INFINITY,
            });
        }
        self.temperatures.validate()?;
        Ok(())
    }

    /// True when the Reasoning Engine (C8) should be exercised at all
    /// (§4.9 step 1): `enable_reasoning` is the umbrella switch, and each
    /// of multi-dim eval / logical inference additionally needs its own
    /// flag set (see DESIGN.md for the gating rationale).
    pub fn reasoning_requested(&self) -> bool {
        self.enable_reasoning && (self.multi_dimensional_eval || self.enable_logical_inference)
    }
}

/// Per-stage wall-clock timings attached to the workflow's outcome
/// (supplemented from the original source's per-stage latency
/// breakdown), keyed by stage name.
#[derive(Debug, Clone, Default)]
pub struct StageTimings(pub HashMap<&'static str, Duration>);

impl StageTimings {
    pub fn record(&mut self, stage: &'static str, elapsed: Duration) {
        self.0.insert(stage, elapsed);
    }

    pub fn get(&self, stage: &str) -> Option<Duration> {
        self.0.get(stage).copied()
    }

    pub fn total(&self) -> Duration {
        self.0.values().sum()
    }
}

/// The Coordinator API's return value: the final ranked candidate list
/// plus the per-stage timing breakdown.
#[derive(Debug, Clone, Default)]
pub struct WorkflowOutcome {
    pub candidates: Vec<Candidate>,
    pub stage_timings: StageTimings,
}

impl WorkflowOutcome {
    pub fn empty() -> Self {
        Self::default()
    }
}
