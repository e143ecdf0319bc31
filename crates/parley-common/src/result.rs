use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures that travel through the execution pipeline.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PipelineError {
    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),
    #[error("Handler failed: {0}")]
    Handler(String),
    #[error("Cancelled")]
    Cancelled,
}

/// Outcome of a dispatched command. Not mutated once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub message: String,
    pub error: Option<PipelineError>,
}

impl PipelineResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failed(error: PipelineError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            error: Some(error),
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        match &self.error {
            Some(PipelineError::Validation(v)) => v,
            _ => &[],
        }
    }
}

impl From<PipelineError> for PipelineResult {
    fn from(error: PipelineError) -> Self {
        PipelineResult::failed(error)
    }
}
