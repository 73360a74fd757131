//! The five agent functions (C6, §4.6) and their batch operations (C7,
//! §4.7): pure prompt+schema calls through the Router, wrapped by retry.

pub mod agents;
pub mod batch;
pub mod error;
pub mod prompts;

pub use agents::{
    advocate_batch, critique_batch, generate_ideas, improve_batch, skeptic_batch, AdvocacyInput,
    ImprovementInput, SkepticismInput,
};
pub use batch::{
    normalize_agent_response, prepare_advocacy_input, prepare_improvement_input,
    prepare_skepticism_input, run_batch_with_timeout, update_candidates_with_advocacy_results,
    update_candidates_with_critic_results, update_candidates_with_improvement_results,
    update_candidates_with_inference_results, update_candidates_with_multi_dim_results,
    update_candidates_with_reevaluation_results, update_candidates_with_skepticism_results,
    ExecutionMode, ExpectedShape,
};
pub use error::AgentError;
