//! Shared data model (§3): requests, ideas, evaluations, and the
//! per-stage analysis records every agent produces.

use serde::{Deserialize, Serialize};

/// A caller's explicit provider pinning (§4.4 rule 1, §9 redesign note).
///
/// Kept as an enum rather than a free-form string so an invalid provider
/// name is a `ConfigurationError` raised eagerly, never a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChoice {
    Local,
    Cloud,
}

impl std::fmt::Display for ProviderChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderChoice::Local => write!(f, "local"),
            ProviderChoice::Cloud => write!(f, "cloud"),
        }
    }
}

/// Inputs to a workflow run (§3 `RequestInputs`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequestInputs {
    pub topic: String,
    pub context: String,
    pub multimodal_files: Vec<String>,
    pub multimodal_urls: Vec<String>,
}

pub const MAX_MULTIMODAL_FILES: usize = 20;
pub const MAX_MULTIMODAL_URLS: usize = 10;

impl RequestInputs {
    pub fn new(topic: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            context: context.into(),
            multimodal_files: Vec::new(),
            multimodal_urls: Vec::new(),
        }
    }

    /// Validates the non-empty-topic and file/URL-count invariants of §3.
    pub fn validate(&self) -> Result<(), crate::error::ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(crate::error::ValidationError::Empty { field: "topic" });
        }
        if self.multimodal_files.len() > MAX_MULTIMODAL_FILES {
            return Err(crate::error::ValidationError::TooMany {
                field: "multimodal_files",
                count: self.multimodal_files.len(),
                limit: MAX_MULTIMODAL_FILES,
            });
        }
        if self.multimodal_urls.len() > MAX_MULTIMODAL_URLS {
            return Err(crate::error::ValidationError::TooMany {
                field: "multimodal_urls",
                count: self.multimodal_urls.len(),
                limit: MAX_MULTIMODAL_URLS,
            });
        }
        Ok(())
    }
}

/// A single generated idea (§3 `Idea`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Idea {
    pub index: u32,
    pub title: String,
    pub description: String,
    pub key_features: Vec<String>,
    pub category: String,
}

/// A critique of one idea (§3 `Evaluation`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub idea_index: u32,
    pub score: f64,
    pub comment: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

/// The seven weighted scoring dimensions (§3 `DimensionScore`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DimensionScores {
    pub feasibility: f64,
    pub innovation: f64,
    pub impact: f64,
    pub cost_effectiveness: f64,
    pub scalability: f64,
    pub risk_assessment: f64,
    pub timeline: f64,
}

/// Fixed per-dimension weights, summing to 1.0 (§3 default weights).
#[derive(Debug, Clone, Copy)]
pub struct DimensionWeights {
    pub feasibility: f64,
    pub innovation: f64,
    pub impact: f64,
    pub cost_effectiveness: f64,
    pub scalability: f64,
    pub risk_assessment: f64,
    pub timeline: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            feasibility: 0.20,
            innovation: 0.15,
            impact: 0.20,
            cost_effectiveness: 0.15,
            scalability: 0.10,
            risk_assessment: 0.10,
            timeline: 0.10,
        }
    }
}

impl DimensionScores {
    /// Clamps every dimension to [0, 10].
    pub fn clamped(self) -> Self {
        let c = |v: f64| v.clamp(0.0, 10.0);
        Self {
            feasibility: c(self.feasibility),
            innovation: c(self.innovation),
            impact: c(self.impact),
            cost_effectiveness: c(self.cost_effectiveness),
            scalability: c(self.scalability),
            risk_assessment: c(self.risk_assessment),
            timeline: c(self.timeline),
        }
    }

    fn as_array(&self) -> [f64; 7] {
        [
            self.feasibility,
            self.innovation,
            self.impact,
            self.cost_effectiveness,
            self.scalability,
            self.risk_assessment,
            self.timeline,
        ]
    }

    pub fn overall_score(&self) -> f64 {
        let values = self.as_array();
        values.iter().sum::<f64>() / values.len() as f64
    }

    pub fn weighted_score(&self, weights: &DimensionWeights) -> f64 {
        self.feasibility * weights.feasibility
            + self.innovation * weights.innovation
            + self.impact * weights.impact
            + self.cost_effectiveness * weights.cost_effectiveness
            + self.scalability * weights.scalability
            + self.risk_assessment * weights.risk_assessment
            + self.timeline * weights.timeline
    }

    /// Population variance across the seven dimensions, used to derive
    /// `confidence_interval = max(0, 1 - variance/25)` (§4.8).
    pub fn variance(&self) -> f64 {
        let values = self.as_array();
        let mean = self.overall_score();
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
    }
}

/// Multi-dimensional evaluation of one idea (§3 `MultiDimEvaluation`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiDimEvaluation {
    pub idea_index: u32,
    pub scores: DimensionScores,
    pub overall_score: f64,
    pub weighted_score: f64,
    pub confidence_interval: f64,
    pub summary: String,
}

impl MultiDimEvaluation {
    pub fn from_scores(idea_index: u32, scores: DimensionScores, weights: &DimensionWeights, summary: String) -> Self {
        let scores = scores.clamped();
        let variance = scores.variance();
        Self {
            idea_index,
            overall_score: scores.overall_score(),
            weighted_score: scores.weighted_score(weights),
            confidence_interval: (1.0 - variance / 25.0).max(0.0),
            scores,
            summary,
        }
    }
}

/// A (title, description) pair used throughout advocacy/skepticism.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitledItem {
    pub title: String,
    pub description: String,
}

/// (concern, response) pair addressing a specific critique point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConcernResponse {
    pub concern: String,
    pub response: String,
}

/// (assumption, concern) pair identifying a questionable premise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssumptionConcern {
    pub assumption: String,
    pub concern: String,
}

/// (aspect, importance) pair noting a missing consideration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissingConsideration {
    pub aspect: String,
    pub importance: String,
}

/// Advocate agent output (§3 `Advocacy`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Advocacy {
    pub idea_index: u32,
    pub strengths: Vec<TitledItem>,
    pub opportunities: Vec<TitledItem>,
    pub addressing_concerns: Vec<ConcernResponse>,
}

/// Skeptic agent output (§3 `Skepticism`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Skepticism {
    pub idea_index: u32,
    pub critical_flaws: Vec<TitledItem>,
    pub risks_challenges: Vec<TitledItem>,
    pub questionable_assumptions: Vec<AssumptionConcern>,
    pub missing_considerations: Vec<MissingConsideration>,
}

/// The five logical-inference analysis types (§4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InferenceAnalysisType {
    Full,
    Causal,
    Constraint,
    Contradiction,
    Implications,
}

/// Logical-inference analysis of one idea (§3 `LogicalInference`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LogicalInference {
    pub idea_index: u32,
    pub inference_chain: Vec<String>,
    pub conclusion: String,
    pub confidence: f64,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub causal_chain: Vec<String>,
    #[serde(default)]
    pub constraint_satisfaction: Vec<String>,
    #[serde(default)]
    pub contradictions: Vec<String>,
    #[serde(default)]
    pub implications: Vec<String>,
}

/// Improver agent output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImprovedIdea {
    pub idea_index: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub key_improvements: Vec<String>,
    #[serde(default)]
    pub implementation_steps: Vec<String>,
    #[serde(default)]
    pub differentiators: Vec<String>,
}

/// Metadata returned with every provider call (§3 `LLMResponseMeta`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmResponseMeta {
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_millis: u64,
    pub cost: f64,
    pub cached: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// A workflow-internal, additively-mutated candidate (§3 `Candidate`).
///
/// `tags` is carried end-to-end from the Batch Job Runner (§4.11) so a
/// caller can correlate a result with the job item that produced it
/// without re-joining on index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub original_idea: Idea,
    pub initial_score: f64,
    pub initial_critique: String,
    pub advocacy: Option<Advocacy>,
    pub skepticism: Option<Skepticism>,
    pub multi_dim_evaluation: Option<MultiDimEvaluation>,
    pub logical_inference: Option<LogicalInference>,
    pub improved_idea: Idea,
    pub improved_score: f64,
    pub improved_critique: String,
    pub score_delta: f64,
    pub is_meaningful_improvement: bool,
    pub similarity_score: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Meaningful-improvement threshold constants (§3, §8).
pub const SIMILARITY_THRESHOLD: f64 = 0.75;
pub const SCORE_DELTA_THRESHOLD: f64 = 0.5;

impl Candidate {
    pub fn is_meaningful(similarity_score: f64, score_delta: f64) -> bool {
        similarity_score <= SIMILARITY_THRESHOLD && score_delta >= SCORE_DELTA_THRESHOLD
    }

    /// Ordering used for the final ranked list (§3): improved score desc,
    /// then initial score desc, then original idea index asc.
    pub fn ranking_key(&self) -> (std::cmp::Reverse<ordered_float::OrderedFloat<f64>>, std::cmp::Reverse<ordered_float::OrderedFloat<f64>>, u32) {
        (
            std::cmp::Reverse(ordered_float::OrderedFloat(self.improved_score)),
            std::cmp::Reverse(ordered_float::OrderedFloat(self.initial_score)),
            self.original_idea.index,
        )
    }
}
