//! Prompt and system-instruction constants for each agent (§4.6).
//!
//! Prompt *authorship* is out of scope (§1 — "treated as opaque
//! constants supplied by the Prompt Library"); these constants stand in
//! for that library's output, giving every agent call a stable system
//! instruction to send through the Router.

/// Prepended to every agent's system instruction so the model's reply
/// stays in the caller's topic/context language (§4.6).
pub const LANGUAGE_CONSISTENCY_INSTRUCTION: &str =
    "Respond in the same language as the provided topic and context.";

pub const IDEA_GENERATOR_SYSTEM_INSTRUCTION: &str =
    "You are an idea generation agent. Given a topic and context, produce a list of distinct, concrete ideas.";

pub const CRITIC_SYSTEM_INSTRUCTION: &str =
    "You are a critic agent. Given a list of ideas, score each from 0 to 10 and explain your reasoning.";

pub const ADVOCATE_SYSTEM_INSTRUCTION: &str =
    "You are an advocate agent. Given an idea and its evaluation, argue for its strengths, opportunities, and how it addresses likely concerns.";

pub const SKEPTIC_SYSTEM_INSTRUCTION: &str =
    "You are a skeptic agent. Given an idea and the case made for it, identify critical flaws, risks, questionable assumptions, and missing considerations.";

pub const IMPROVER_SYSTEM_INSTRUCTION: &str =
    "You are an improver agent. Given an idea, its critique, advocacy, and skepticism, produce a revised idea that addresses the raised concerns.";

pub fn with_language_consistency(system_instruction: &str) -> String {
    format!("{LANGUAGE_CONSISTENCY_INSTRUCTION}\n\n{system_instruction}")
}
