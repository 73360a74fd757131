//! Batch Operations (C7, §4.7): preparation, execution, and
//! normalization helpers sitting between the Coordinator and the C6
//! agent functions.
//!
//! The shared bounded worker pool mentioned in §4.7 is the Coordinator's
//! semaphore (`madspark-coordinator`, §4.10's `MaxConcurrentAgents`);
//! this module only applies the per-call timeout and merges results back
//! onto candidates.

use std::collections::HashMap;
use std::time::Duration;

use madspark_contracts::{Advocacy, Candidate, Evaluation, ImprovedIdea, LogicalInference, MultiDimEvaluation, Skepticism};
use serde_json::Value;
use tracing::warn;

use crate::agents::{AdvocacyInput, ImprovementInput, SkepticismInput};
use crate::error::AgentError;

const MISSING_ADVOCACY: &str = "N/A";
const MISSING_SKEPTICISM: &str = "N/A";

fn summarize_advocacy(advocacy: Option<&Advocacy>) -> String {
    match advocacy {
        None => MISSING_ADVOCACY.to_string(),
        Some(advocacy) => advocacy
            .strengths
            .iter()
            .chain(advocacy.opportunities.iter())
            .map(|item| item.title.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    }
}

fn summarize_skepticism(skepticism: Option<&Skepticism>) -> String {
    match skepticism {
        None => MISSING_SKEPTICISM.to_string(),
        Some(skepticism) => skepticism
            .critical_flaws
            .iter()
            .chain(skepticism.risks_challenges.iter())
            .map(|item| item.title.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// `prepareAdvocacyInput`: one `{idea, evaluation, context}` row per
/// candidate (§4.7).
pub fn prepare_advocacy_input(candidates: &[Candidate]) -> Vec<AdvocacyInput<'_>> {
    candidates
        .iter()
        .map(|candidate| AdvocacyInput {
            idea: &candidate.original_idea,
            evaluation_comment: candidate.initial_critique.clone(),
        })
        .collect()
}

/// `prepareSkepticismInput`: one `{idea, advocacy, context}` row per
/// candidate; absent advocacy becomes `"N/A"` (§4.7).
pub fn prepare_skepticism_input(candidates: &[Candidate]) -> Vec<SkepticismInput<'_>> {
    candidates
        .iter()
        .map(|candidate| SkepticismInput {
            idea: &candidate.original_idea,
            advocacy_summary: summarize_advocacy(candidate.advocacy.as_ref()),
        })
        .collect()
}

/// `prepareImprovementInput`: one full-signal row per candidate; any
/// absent field becomes `"N/A"` (§4.7).
pub fn prepare_improvement_input(candidates: &[Candidate]) -> Vec<ImprovementInput<'_>> {
    candidates
        .iter()
        .map(|candidate| ImprovementInput {
            idea: &candidate.original_idea,
            critique: if candidate.initial_critique.is_empty() {
                "N/A".to_string()
            } else {
                candidate.initial_critique.clone()
            },
            advocacy_summary: summarize_advocacy(candidate.advocacy.as_ref()),
            skepticism_summary: summarize_skepticism(candidate.skepticism.as_ref()),
        })
        .collect()
}

/// Distinguishes the Sync (C9) and Async (C10) coordinators for
/// observability; both execute the same timeout-bounded call since the
/// worker-pool concurrency cap lives at the Coordinator layer, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sync,
    Async,
}

/// `runBatchWithTimeout`: bounds one named batch call by a wall-clock
/// timeout, propagating a timeout error to the caller on expiry (§4.7).
pub async fn run_batch_with_timeout<F, T>(name: &str, timeout_seconds: u64, mode: ExecutionMode, operation: F) -> Result<T, AgentError>
where
    F: std::future::Future<Output = Result<T, AgentError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_seconds), operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!(batch = name, timeout_seconds, ?mode, "batch call timed out");
            Err(AgentError::Timeout { timeout_secs: timeout_seconds })
        }
    }
}

/// Indexes `results` by `idea_index`, applying `on_hit` to the matching
/// candidate and `on_miss` (with a logged warning) to any candidate with
/// no corresponding result — the shared merge behavior behind every
/// `updateCandidatesWithResults(..., fieldName)` call site (§4.7).
fn merge_indexed<T>(
    candidates: &mut [Candidate],
    results: &[T],
    idea_index: impl Fn(&T) -> u32,
    field_name: &str,
    mut on_hit: impl FnMut(&mut Candidate, &T),
    mut on_miss: impl FnMut(&mut Candidate),
) {
    let by_index: HashMap<u32, &T> = results.iter().map(|r| (idea_index(r), r)).collect();
    for candidate in candidates.iter_mut() {
        let idx = candidate.original_idea.index;
        match by_index.get(&idx) {
            Some(result) => on_hit(candidate, result),
            None => {
                warn!(idea_index = idx, field = field_name, "missing batch result for index, using placeholder");
                on_miss(candidate);
            }
        }
    }
}

/// Merges Critic results onto candidates' `initial_score`/`initial_critique`.
pub fn update_candidates_with_critic_results(candidates: &mut [Candidate], results: &[Evaluation]) {
    merge_indexed(
        candidates,
        results,
        |r| r.idea_index,
        "initial_critique",
        |candidate, r| {
            candidate.initial_score = r.score;
            candidate.initial_critique = r.comment.clone();
        },
        |candidate| {
            candidate.initial_critique = "No evaluation available".to_string();
        },
    );
}

/// Merges re-evaluation Critic results onto `improved_score`/`improved_critique`.
pub fn update_candidates_with_reevaluation_results(candidates: &mut [Candidate], results: &[Evaluation]) {
    merge_indexed(
        candidates,
        results,
        |r| r.idea_index,
        "improved_critique",
        |candidate, r| {
            candidate.improved_score = r.score;
            candidate.improved_critique = r.comment.clone();
        },
        |candidate| {
            candidate.improved_critique = "No re-evaluation generated".to_string();
        },
    );
}

/// Merges Advocate results onto `advocacy`.
pub fn update_candidates_with_advocacy_results(candidates: &mut [Candidate], results: &[Advocacy]) {
    merge_indexed(
        candidates,
        results,
        |r| r.idea_index,
        "advocacy",
        |candidate, r| candidate.advocacy = Some(r.clone()),
        |candidate| candidate.advocacy = None,
    );
}

/// Merges Skeptic results onto `skepticism`.
pub fn update_candidates_with_skepticism_results(candidates: &mut [Candidate], results: &[Skepticism]) {
    merge_indexed(
        candidates,
        results,
        |r| r.idea_index,
        "skepticism",
        |candidate, r| candidate.skepticism = Some(r.clone()),
        |candidate| candidate.skepticism = None,
    );
}

/// Merges Multi-Dim Evaluation results onto `multi_dim_evaluation`.
pub fn update_candidates_with_multi_dim_results(candidates: &mut [Candidate], results: &[MultiDimEvaluation]) {
    merge_indexed(
        candidates,
        results,
        |r| r.idea_index,
        "multi_dim_evaluation",
        |candidate, r| candidate.multi_dim_evaluation = Some(r.clone()),
        |candidate| candidate.multi_dim_evaluation = None,
    );
}

/// Merges Logical Inference results onto `logical_inference`.
pub fn update_candidates_with_inference_results(candidates: &mut [Candidate], results: &[LogicalInference]) {
    merge_indexed(
        candidates,
        results,
        |r| r.idea_index,
        "logical_inference",
        |candidate, r| candidate.logical_inference = Some(r.clone()),
        |candidate| candidate.logical_inference = None,
    );
}

/// Merges Improver results onto `improved_idea`.
pub fn update_candidates_with_improvement_results(candidates: &mut [Candidate], results: &[ImprovedIdea]) {
    merge_indexed(
        candidates,
        results,
        |r| r.idea_index,
        "improved_idea",
        |candidate, r| {
            candidate.improved_idea = madspark_contracts::Idea {
                index: r.idea_index,
                title: r.title.clone(),
                description: r.description.clone(),
                key_features: r.key_improvements.clone(),
                category: candidate.original_idea.category.clone(),
            };
        },
        |candidate| {
            candidate.improved_idea = candidate.original_idea.clone();
            candidate.improved_idea.description = "No improvement generated".to_string();
        },
    );
}

/// The shape an agent's raw response is expected to normalize to
/// (§4.7's `expected∈{dict,list,string}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    Dict,
    List,
    StringValue,
}

/// `normalizeAgentResponse`: converts a raw agent `Value` into the shape
/// a caller expects, defaulting to a type-appropriate empty on an
/// unparsable string and logging a warning (§4.7).
pub fn normalize_agent_response(value: &Value, expected: ExpectedShape) -> Value {
    match expected {
        ExpectedShape::StringValue => match value {
            Value::String(s) => Value::String(s.clone()),
            Value::Null => Value::String(String::new()),
            other => Value::String(other.to_string()),
        },
        ExpectedShape::Dict => match value {
            Value::Object(_) => value.clone(),
            Value::Null => Value::Object(serde_json::Map::new()),
            Value::String(raw) => serde_json::from_str::<Value>(raw)
                .ok()
                .filter(Value::is_object)
                .unwrap_or_else(|| {
                    warn!(raw, "invalid JSON for dict-shaped agent response, defaulting to empty object");
                    Value::Object(serde_json::Map::new())
                }),
            other => {
                warn!(?other, "unexpected shape for dict-shaped agent response, defaulting to empty object");
                Value::Object(serde_json::Map::new())
            }
        },
        ExpectedShape::List => match value {
            Value::Array(_) => value.clone(),
            Value::Null => Value::Array(Vec::new()),
            Value::String(raw) => serde_json::from_str::<Value>(raw).ok().filter(Value::is_array).unwrap_or_else(|| Value::Array(Vec::new())),
            other => Value::Array(vec![other.clone()]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madspark_contracts::Idea;
    use serde_json::json;

    fn candidate(index: u32) -> Candidate {
        Candidate {
            original_idea: Idea {
                index,
                title: format!("Idea {index}"),
                description: "desc".into(),
                key_features: vec![],
                category: "cat".into(),
            },
            initial_score: 0.0,
            initial_critique: String::new(),
            advocacy: None,
            skepticism: None,
            multi_dim_evaluation: None,
            logical_inference: None,
            improved_idea: Idea {
                index,
                title: "Idea".into(),
                description: "desc".into(),
                key_features: vec![],
                category: "cat".into(),
            },
            improved_score: 0.0,
            improved_critique: String::new(),
            score_delta: 0.0,
            is_meaningful_improvement: false,
            similarity_score: 0.0,
            tags: vec![],
        }
    }

    #[test]
    fn prepare_skepticism_input_defaults_absent_advocacy_to_na() {
        let candidates = vec![candidate(0)];
        let inputs = prepare_skepticism_input(&candidates);
        assert_eq!(inputs[0].advocacy_summary, "N/A");
    }

    #[test]
    fn update_candidates_with_critic_results_fills_placeholder_for_missing_index() {
        let mut candidates = vec![candidate(0), candidate(1)];
        let results = vec![Evaluation {
            idea_index: 0,
            score: 7.5,
            comment: "good".into(),
            strengths: vec![],
            weaknesses: vec![],
        }];
        update_candidates_with_critic_results(&mut candidates, &results);
        assert_eq!(candidates[0].initial_score, 7.5);
        assert_eq!(candidates[1].initial_critique, "No evaluation available");
    }

    #[test]
    fn normalize_agent_response_invalid_dict_json_becomes_empty_object_with_warning() {
        let value = Value::String("not json".into());
        let normalized = normalize_agent_response(&value, ExpectedShape::Dict);
        assert_eq!(normalized, json!({}));
    }

    #[test]
    fn normalize_agent_response_null_list_becomes_empty_array() {
        let normalized = normalize_agent_response(&Value::Null, ExpectedShape::List);
        assert_eq!(normalized, json!([]));
    }

    #[test]
    fn normalize_agent_response_string_expected_passes_raw_text_through() {
        let value = Value::String("already text".into());
        let normalized = normalize_agent_response(&value, ExpectedShape::StringValue);
        assert_eq!(normalized, json!("already text"));
    }
}
