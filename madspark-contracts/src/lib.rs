//! Shared data model and response schema registry for the MadSpark
//! multi-agent idea pipeline.
//!
//! Every agent response crossing a provider boundary is a strongly typed
//! record validated against the schemas in this crate (§4.1) rather than
//! a loosely parsed JSON blob, so invalid responses fail fast and
//! deterministically.

pub mod error;
pub mod model;
pub mod schema;

pub use error::{validate_temperature, SchemaKind, SchemaValidationError, ValidationError, ValidationIssue, MAX_TEMPERATURE, MIN_TEMPERATURE};
pub use model::{
    Advocacy, AssumptionConcern, Candidate, ConcernResponse, DimensionScores, DimensionWeights,
    Evaluation, Idea, ImprovedIdea, InferenceAnalysisType, LlmResponseMeta, LogicalInference,
    MissingConsideration, MultiDimEvaluation, ProviderChoice, RequestInputs, Skepticism,
    TitledItem, MAX_MULTIMODAL_FILES, MAX_MULTIMODAL_URLS, SCORE_DELTA_THRESHOLD,
    SIMILARITY_THRESHOLD,
};
pub use schema::{
    advocacy_batch_schema, advocacy_schema, causal_inference_schema, constraint_inference_schema,
    contradiction_inference_schema, critic_evaluation_schema, generated_ideas_schema,
    implications_inference_schema, improvement_batch_schema, improvement_schema,
    inference_batch_schema, inference_result_schema, multi_dim_batch_schema,
    multi_dim_summary_batch_schema, skepticism_batch_schema, skepticism_schema, validate_advocacy,
    validate_critic_evaluations, validate_generated_ideas, validate_improvement,
    validate_inference_result, validate_multi_dim_evaluation, validate_skepticism, FieldSchema,
    FieldType, SchemaDescriptor,
};
