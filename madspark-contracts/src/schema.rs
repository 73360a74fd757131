//! Schema Registry (C1, §4.1).
//!
//! Each agent response type exposes (a) an implementation-neutral
//! `SchemaDescriptor` for structured-output requests and (b) a `validate`
//! function that either accepts a parsed record or raises a
//! `SchemaValidationError` naming the offending field.

use serde::{Deserialize, Serialize};

use crate::error::{SchemaKind, SchemaValidationError, ValidationIssue};
use crate::model::{Evaluation, Idea};

/// OpenAPI-3.0-style field type, per §6 "Schema descriptor format".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// A single field (or array-item, or nested object) in a schema descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSchema>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub properties: Vec<(String, FieldSchema)>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
}

impl FieldSchema {
    pub fn string() -> Self {
        Self {
            field_type: Some(FieldType::String),
            ..Default::default()
        }
    }

    pub fn number() -> Self {
        Self {
            field_type: Some(FieldType::Number),
            ..Default::default()
        }
    }

    pub fn with_bounds(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn array_of(item: FieldSchema) -> Self {
        Self {
            field_type: Some(FieldType::Array),
            items: Some(Box::new(item)),
            ..Default::default()
        }
    }

    pub fn object(properties: Vec<(&str, FieldSchema)>, required: Vec<&str>) -> Self {
        Self {
            field_type: Some(FieldType::Object),
            properties: properties.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            required: required.into_iter().map(str::to_string).collect(),
            ..Default::default()
        }
    }
}

/// Top-level schema descriptor for one agent response contract (§4.1a).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaDescriptor {
    pub name: &'static str,
    pub root: FieldSchema,
}

fn idea_field_schema() -> FieldSchema {
    FieldSchema::object(
        vec![
            (
                "index",
                FieldSchema {
                    field_type: Some(FieldType::Integer),
                    minimum: Some(0.0),
                    ..Default::default()
                },
            ),
            ("title", FieldSchema::string().with_min_length(1)),
            ("description", FieldSchema::string().with_min_length(1)),
            ("key_features", FieldSchema::array_of(FieldSchema::string())),
            ("category", FieldSchema::string()),
        ],
        vec!["index", "title", "description", "key_features", "category"],
    )
}

/// `GeneratedIdeas`: list of Idea; length 1..20 (§4.1).
pub fn generated_ideas_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "GeneratedIdeas",
        root: FieldSchema::array_of(idea_field_schema())
            .with_min_length(1)
            .with_max_length(20),
    }
}

/// `CriticEvaluations`: an Evaluation schema with score bounds (§4.1).
pub fn critic_evaluation_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "CriticEvaluations",
        root: FieldSchema::array_of(FieldSchema::object(
            vec![
                (
                    "idea_index",
                    FieldSchema {
                        field_type: Some(FieldType::Integer),
                        minimum: Some(0.0),
                        ..Default::default()
                    },
                ),
                ("score", FieldSchema::number().with_bounds(0.0, 10.0)),
                ("comment", FieldSchema::string().with_min_length(10)),
            ],
            vec!["idea_index", "score", "comment"],
        )),
    }
}

fn titled_item_schema() -> FieldSchema {
    FieldSchema::object(
        vec![
            ("title", FieldSchema::string().with_min_length(1)),
            ("description", FieldSchema::string().with_min_length(1)),
        ],
        vec!["title", "description"],
    )
}

fn idea_index_field() -> FieldSchema {
    FieldSchema {
        field_type: Some(FieldType::Integer),
        minimum: Some(0.0),
        ..Default::default()
    }
}

/// `AdvocacyResponse`: strengths, opportunities, addressingConcerns (§3 `Advocacy`).
pub fn advocacy_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "AdvocacyResponse",
        root: FieldSchema::object(
            vec![
                ("idea_index", idea_index_field()),
                ("strengths", FieldSchema::array_of(titled_item_schema()).with_min_length(1)),
                ("opportunities", FieldSchema::array_of(titled_item_schema()).with_min_length(1)),
                (
                    "addressing_concerns",
                    FieldSchema::array_of(FieldSchema::object(
                        vec![
                            ("concern", FieldSchema::string().with_min_length(1)),
                            ("response", FieldSchema::string().with_min_length(1)),
                        ],
                        vec!["concern", "response"],
                    ))
                    .with_min_length(1),
                ),
            ],
            vec!["idea_index", "strengths", "opportunities", "addressing_concerns"],
        ),
    }
}

/// `SkepticismResponse`: criticalFlaws, risksAndChallenges,
/// questionableAssumptions, missingConsiderations (§3 `Skepticism`).
pub fn skepticism_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "SkepticismResponse",
        root: FieldSchema::object(
            vec![
                ("idea_index", idea_index_field()),
                ("critical_flaws", FieldSchema::array_of(titled_item_schema()).with_min_length(1)),
                ("risks_challenges", FieldSchema::array_of(titled_item_schema()).with_min_length(1)),
                (
                    "questionable_assumptions",
                    FieldSchema::array_of(FieldSchema::object(
                        vec![
                            ("assumption", FieldSchema::string().with_min_length(1)),
                            ("concern", FieldSchema::string().with_min_length(1)),
                        ],
                        vec!["assumption", "concern"],
                    ))
                    .with_min_length(1),
                ),
                (
                    "missing_considerations",
                    FieldSchema::array_of(FieldSchema::object(
                        vec![
                            ("aspect", FieldSchema::string().with_min_length(1)),
                            ("importance", FieldSchema::string().with_min_length(1)),
                        ],
                        vec!["aspect", "importance"],
                    ))
                    .with_min_length(1),
                ),
            ],
            vec![
                "idea_index",
                "critical_flaws",
                "risks_challenges",
                "questionable_assumptions",
                "missing_considerations",
            ],
        ),
    }
}

/// `ImprovementResponse`: a revised idea plus its rationale (§3 `ImprovedIdea`).
pub fn improvement_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "ImprovementResponse",
        root: FieldSchema::object(
            vec![
                ("idea_index", idea_index_field()),
                ("title", FieldSchema::string().with_min_length(1)),
                ("description", FieldSchema::string().with_min_length(1)),
                ("key_improvements", FieldSchema::array_of(FieldSchema::string())),
                ("implementation_steps", FieldSchema::array_of(FieldSchema::string())),
                ("differentiators", FieldSchema::array_of(FieldSchema::string())),
            ],
            vec!["idea_index", "title", "description"],
        ),
    }
}

/// Array-of-[`advocacy_schema`] wrapper used for the N-input batch call
/// (§4.6, §4.7): one request covering every top-K candidate at once.
pub fn advocacy_batch_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "AdvocacyBatch",
        root: FieldSchema::array_of(advocacy_schema().root).with_min_length(1),
    }
}

/// Array-of-[`skepticism_schema`] batch wrapper (§4.6, §4.7).
pub fn skepticism_batch_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "SkepticismBatch",
        root: FieldSchema::array_of(skepticism_schema().root).with_min_length(1),
    }
}

/// Array-of-[`improvement_schema`] batch wrapper (§4.6, §4.7).
pub fn improvement_batch_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "ImprovementBatch",
        root: FieldSchema::array_of(improvement_schema().root).with_min_length(1),
    }
}

fn dimension_scores_schema() -> FieldSchema {
    let dims = [
        "feasibility",
        "innovation",
        "impact",
        "cost_effectiveness",
        "scalability",
        "risk_assessment",
        "timeline",
    ];
    FieldSchema::object(
        dims.iter().map(|d| (*d, FieldSchema::number().with_bounds(0.0, 10.0))).collect(),
        dims.to_vec(),
    )
}

/// `MultiDimBatch`: one scored record per idea across the seven
/// dimensions (§4.8 step 2, §3 `MultiDimEvaluation`).
pub fn multi_dim_batch_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "MultiDimBatch",
        root: FieldSchema::array_of(FieldSchema::object(
            vec![
                ("idea_index", idea_index_field()),
                ("scores", dimension_scores_schema()),
                ("summary", FieldSchema::string()),
            ],
            vec!["idea_index", "scores"],
        ))
        .with_min_length(1),
    }
}

/// `InferenceResult`: a chain of reasoning steps toward a conclusion,
/// with the four analysis-type-specific fields left empty unless that
/// analysis type was requested (§4.8, §3 `LogicalInference`).
pub fn inference_result_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "InferenceResult",
        root: FieldSchema::object(
            vec![
                ("idea_index", idea_index_field()),
                ("inference_chain", FieldSchema::array_of(FieldSchema::string()).with_min_length(1)),
                ("conclusion", FieldSchema::string().with_min_length(1)),
                ("confidence", FieldSchema::number().with_bounds(0.0, 1.0)),
                ("improvements", FieldSchema::array_of(FieldSchema::string())),
                ("causal_chain", FieldSchema::array_of(FieldSchema::string())),
                ("constraint_satisfaction", FieldSchema::array_of(FieldSchema::string())),
                ("contradictions", FieldSchema::array_of(FieldSchema::string())),
            ],
            vec!["idea_index", "inference_chain", "conclusion", "confidence"],
        ),
    }
}

/// Causal-analysis inference subtype: same envelope as
/// [`inference_result_schema`], required fields narrowed to `causal_chain`.
pub fn causal_inference_schema() -> SchemaDescriptor {
    let mut descriptor = inference_result_schema();
    descriptor.name = "InferenceResult.Causal";
    descriptor.root.required = vec!["idea_index".into(), "causal_chain".into(), "conclusion".into(), "confidence".into()];
    descriptor
}

/// Constraint-satisfaction inference subtype.
pub fn constraint_inference_schema() -> SchemaDescriptor {
    let mut descriptor = inference_result_schema();
    descriptor.name = "InferenceResult.Constraint";
    descriptor.root.required = vec![
        "idea_index".into(),
        "constraint_satisfaction".into(),
        "conclusion".into(),
        "confidence".into(),
    ];
    descriptor
}

/// Contradiction-detection inference subtype.
pub fn contradiction_inference_schema() -> SchemaDescriptor {
    let mut descriptor = inference_result_schema();
    descriptor.name = "InferenceResult.Contradiction";
    descriptor.root.required = vec!["idea_index".into(), "contradictions".into(), "conclusion".into(), "confidence".into()];
    descriptor
}

/// Implications inference subtype (uses the general `inference_chain`
/// to carry forward-looking implications).
pub fn implications_inference_schema() -> SchemaDescriptor {
    let mut descriptor = inference_result_schema();
    descriptor.name = "InferenceResult.Implications";
    descriptor
}

/// Array wrapper over one [`InferenceAnalysisType`]'s subtype schema, used
/// by `LogicalInferenceEngine::analyze_batch` (§4.8) to request one
/// result per idea, aligned by `idea_index`, in a single provider call.
pub fn inference_batch_schema(analysis_type: crate::model::InferenceAnalysisType) -> SchemaDescriptor {
    use crate::model::InferenceAnalysisType::*;
    let single = match analysis_type {
        Full => inference_result_schema(),
        Causal => causal_inference_schema(),
        Constraint => constraint_inference_schema(),
        Contradiction => contradiction_inference_schema(),
        Implications => implications_inference_schema(),
    };
    let name: &'static str = match analysis_type {
        Full => "InferenceBatch.Full",
        Causal => "InferenceBatch.Causal",
        Constraint => "InferenceBatch.Constraint",
        Contradiction => "InferenceBatch.Contradiction",
        Implications => "InferenceBatch.Implications",
    };
    SchemaDescriptor {
        name,
        root: FieldSchema::array_of(single.root).with_min_length(1),
    }
}

/// One `{idea_index, summary}` row, the second-call shape that fills
/// `MultiDimEvaluation::summary` without forcing the scoring call itself
/// to also produce prose (§4.8 step 4).
pub fn multi_dim_summary_batch_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "MultiDimSummaryBatch",
        root: FieldSchema::array_of(FieldSchema::object(
            vec![("idea_index", idea_index_field()), ("summary", FieldSchema::string().with_min_length(1))],
            vec!["idea_index", "summary"],
        ))
        .with_min_length(1),
    }
}

/// Validates a freshly parsed list of ideas against §4.1's length bound
/// and §3's per-idea invariants.
pub fn validate_generated_ideas(ideas: &[Idea]) -> Result<(), SchemaValidationError> {
    let mut issues = Vec::new();
    if ideas.is_empty() {
        issues.push(ValidationIssue::new("ideas", "must contain at least 1 idea"));
    }
    if ideas.len() > 20 {
        issues.push(ValidationIssue::new(
            "ideas",
            format!("must contain at most 20 ideas, got {}", ideas.len()),
        ));
    }
    for (i, idea) in ideas.iter().enumerate() {
        if idea.title.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("ideas[{i}].title"), "must not be empty"));
        }
        if idea.description.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("ideas[{i}].description"), "must not be empty"));
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError::new(SchemaKind::GeneratedIdeas, issues))
    }
}

/// `CriticEvaluations`: one Evaluation per idea, scores in [0,10],
/// comments length >= 10 (§4.1).
pub fn validate_critic_evaluations(evaluations: &[Evaluation]) -> Result<(), SchemaValidationError> {
    let mut issues = Vec::new();
    for (i, eval) in evaluations.iter().enumerate() {
        if !(0.0..=10.0).contains(&eval.score) {
            issues.push(ValidationIssue::new(
                format!("evaluations[{i}].score"),
                format!("{} is out of range [0, 10]", eval.score),
            ));
        }
        if eval.comment.chars().count() < 10 {
            issues.push(ValidationIssue::new(
                format!("evaluations[{i}].comment"),
                "must be at least 10 characters",
            ));
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError::new(SchemaKind::CriticEvaluations, issues))
    }
}

/// `AdvocacyResponse`: non-empty strengths, opportunities, addressingConcerns.
pub fn validate_advocacy(advocacy: &crate::model::Advocacy) -> Result<(), SchemaValidationError> {
    let mut issues = Vec::new();
    if advocacy.strengths.is_empty() {
        issues.push(ValidationIssue::new("strengths", "must be non-empty"));
    }
    if advocacy.opportunities.is_empty() {
        issues.push(ValidationIssue::new("opportunities", "must be non-empty"));
    }
    if advocacy.addressing_concerns.is_empty() {
        issues.push(ValidationIssue::new("addressing_concerns", "must be non-empty"));
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError::new(SchemaKind::AdvocacyResponse, issues))
    }
}

/// `SkepticismResponse`: non-empty criticalFlaws, risksAndChallenges,
/// questionableAssumptions, missingConsiderations.
pub fn validate_skepticism(skepticism: &crate::model::Skepticism) -> Result<(), SchemaValidationError> {
    let mut issues = Vec::new();
    if skepticism.critical_flaws.is_empty() {
        issues.push(ValidationIssue::new("critical_flaws", "must be non-empty"));
    }
    if skepticism.risks_challenges.is_empty() {
        issues.push(ValidationIssue::new("risks_challenges", "must be non-empty"));
    }
    if skepticism.questionable_assumptions.is_empty() {
        issues.push(ValidationIssue::new("questionable_assumptions", "must be non-empty"));
    }
    if skepticism.missing_considerations.is_empty() {
        issues.push(ValidationIssue::new("missing_considerations", "must be non-empty"));
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError::new(SchemaKind::SkepticismResponse, issues))
    }
}

/// `ImprovementResponse`: improvedIdea required (title/description non-empty).
pub fn validate_improvement(improved: &crate::model::ImprovedIdea) -> Result<(), SchemaValidationError> {
    let mut issues = Vec::new();
    if improved.title.trim().is_empty() {
        issues.push(ValidationIssue::new("title", "must not be empty"));
    }
    if improved.description.trim().is_empty() {
        issues.push(ValidationIssue::new("description", "must not be empty"));
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError::new(SchemaKind::ImprovementResponse, issues))
    }
}

/// `MultiDimBatch`: validates the post-clamp record's derived fields;
/// per-dimension clamping to [0, 10] happens in the reasoning engine
/// before this is called (§4.8 step 2).
pub fn validate_multi_dim_evaluation(eval: &crate::model::MultiDimEvaluation) -> Result<(), SchemaValidationError> {
    let mut issues = Vec::new();
    if !(0.0..=1.0).contains(&eval.confidence_interval) {
        issues.push(ValidationIssue::new(
            "confidence_interval",
            format!("{} is out of range [0, 1]", eval.confidence_interval),
        ));
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError::new(SchemaKind::MultiDimBatch, issues))
    }
}

/// `InferenceResult`: inferenceChain length >= 1, confidence in [0, 1].
pub fn validate_inference_result(inference: &crate::model::LogicalInference) -> Result<(), SchemaValidationError> {
    let mut issues = Vec::new();
    if inference.inference_chain.is_empty() {
        issues.push(ValidationIssue::new("inference_chain", "must contain at least 1 step"));
    }
    if inference.conclusion.trim().is_empty() {
        issues.push(ValidationIssue::new("conclusion", "must not be empty"));
    }
    if !(0.0..=1.0).contains(&inference.confidence) {
        issues.push(ValidationIssue::new(
            "confidence",
            format!("{} is out of range [0, 1]", inference.confidence),
        ));
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError::new(SchemaKind::InferenceResult, issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_idea(index: u32) -> Idea {
        Idea {
            index,
            title: "Vertical hydroponic towers".into(),
            description: "Stackable modular towers for apartment balconies".into(),
            key_features: vec!["modular".into(), "low-water".into()],
            category: "urban-farming".into(),
        }
    }

    #[test]
    fn generated_ideas_rejects_empty_list() {
        let err = validate_generated_ideas(&[]).unwrap_err();
        assert_eq!(err.kind, SchemaKind::GeneratedIdeas);
        assert_eq!(err.issues.len(), 1);
    }

    #[test]
    fn generated_ideas_rejects_over_twenty() {
        let ideas: Vec<Idea> = (0..21).map(sample_idea).collect();
        let err = validate_generated_ideas(&ideas).unwrap_err();
        assert!(err.issues.iter().any(|i| i.field_path == "ideas"));
    }

    #[test]
    fn generated_ideas_accepts_valid_list() {
        let ideas = vec![sample_idea(0), sample_idea(1)];
        assert!(validate_generated_ideas(&ideas).is_ok());
    }

    #[test]
    fn critic_evaluation_rejects_short_comment() {
        let eval = Evaluation {
            idea_index: 0,
            score: 8.0,
            comment: "too short".into(),
            strengths: vec![],
            weaknesses: vec![],
        };
        let err = validate_critic_evaluations(&[eval]).unwrap_err();
        assert_eq!(err.issues.len(), 1);
    }

    #[test]
    fn critic_evaluation_rejects_out_of_range_score() {
        let eval = Evaluation {
            idea_index: 0,
            score: 11.0,
            comment: "A sufficiently long comment explaining the score.".into(),
            strengths: vec![],
            weaknesses: vec![],
        };
        let err = validate_critic_evaluations(&[eval]).unwrap_err();
        assert_eq!(err.issues.len(), 1);
    }

    #[test]
    fn schema_descriptor_round_trips_through_json() {
        let descriptor = generated_ideas_schema();
        let json = serde_json::to_value(&descriptor).expect("serialize");
        let back: SchemaDescriptor = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, descriptor);
    }

    #[test]
    fn every_agent_response_schema_has_a_distinct_name() {
        let names = vec![
            generated_ideas_schema().name,
            critic_evaluation_schema().name,
            advocacy_schema().name,
            skepticism_schema().name,
            improvement_schema().name,
            multi_dim_batch_schema().name,
            inference_result_schema().name,
            causal_inference_schema().name,
            constraint_inference_schema().name,
            contradiction_inference_schema().name,
            implications_inference_schema().name,
        ];
        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn inference_subtypes_narrow_required_fields_but_keep_the_shared_envelope() {
        let full = inference_result_schema();
        let causal = causal_inference_schema();
        assert_eq!(causal.root.properties, full.root.properties);
        assert!(causal.root.required.contains(&"causal_chain".to_string()));
        assert!(!full.root.required.contains(&"causal_chain".to_string()));
    }

    #[test]
    fn advocacy_schema_requires_non_empty_collections() {
        let descriptor = advocacy_schema();
        assert_eq!(descriptor.root.required, vec!["idea_index", "strengths", "opportunities", "addressing_concerns"]);
    }
}
