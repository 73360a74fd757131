use std::fmt;

/// Agent response contract categories handled by the schema registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    GeneratedIdeas,
    CriticEvaluations,
    AdvocacyResponse,
    SkepticismResponse,
    ImprovementResponse,
    MultiDimBatch,
    InferenceResult,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SchemaKind::GeneratedIdeas => "generated-ideas",
            SchemaKind::CriticEvaluations => "critic-evaluations",
            SchemaKind::AdvocacyResponse => "advocacy-response",
            SchemaKind::SkepticismResponse => "skepticism-response",
            SchemaKind::ImprovementResponse => "improvement-response",
            SchemaKind::MultiDimBatch => "multi-dim-batch",
            SchemaKind::InferenceResult => "inference-result",
        };
        write!(f, "{}", label)
    }
}

/// A single field-level validation failure, as required by §4.1(b): the
/// offending field path and the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field_path: String,
    pub reason: String,
}

impl ValidationIssue {
    pub fn new(field_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field_path, self.reason)
    }
}

/// Raised when a provider's response fails schema validation (§4.1, §7).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} schema validation failed: {issues:?}")]
pub struct SchemaValidationError {
    pub kind: SchemaKind,
    pub issues: Vec<ValidationIssue>,
}

impl SchemaValidationError {
    pub fn new(kind: SchemaKind, issues: Vec<ValidationIssue>) -> Self {
        Self { kind, issues }
    }

    pub fn single(kind: SchemaKind, field_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(kind, vec![ValidationIssue::new(field_path, reason)])
    }
}

/// Inclusive bounds accepted for a sampling temperature at any provider
/// boundary: "Temperature 0.0 and 2.0 accepted... outside range rejected
/// with ValidationError."
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Rejects a caller-supplied temperature outside `[MIN_TEMPERATURE,
/// MAX_TEMPERATURE]`. Shared by every call site that accepts a
/// temperature from a caller, so the bound is enforced once.
pub fn validate_temperature(value: f64) -> Result<(), ValidationError> {
    if value < MIN_TEMPERATURE || value > MAX_TEMPERATURE {
        return Err(ValidationError::OutOfRange {
            field: "temperature",
            value,
            min: MIN_TEMPERATURE,
            max: MAX_TEMPERATURE,
        });
    }
    Ok(())
}

/// Caller input validation failures. Raised immediately, never retried,
/// never routed through a provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} has {count} items, exceeding the limit of {limit}")]
    TooMany {
        field: &'static str,
        count: usize,
        limit: usize,
    },
}
