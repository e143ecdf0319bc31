use super::{Next, Stage, StageResult};
use async_trait::async_trait;
use parley_common::{Command, CommandKind, FieldViolation, PipelineError, entity};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Checks one aspect of a command before it runs.
pub trait Validator: Send + Sync {
    fn validate(&self, command: &Command) -> Vec<FieldViolation>;
}

/// Parameters that must be present and non-blank.
pub struct RequiredParameters {
    fields: Vec<&'static str>,
}

impl RequiredParameters {
    pub fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
        }
    }
}

impl Validator for RequiredParameters {
    fn validate(&self, command: &Command) -> Vec<FieldViolation> {
        self.fields
            .iter()
            .filter(|field| {
                command
                    .parameters
                    .get(**field)
                    .is_none_or(|value| value.is_blank())
            })
            .map(|field| FieldViolation::new(*field, "is required"))
            .collect()
    }
}

/// Validators per command kind.
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<CommandKind, Vec<Arc<dyn Validator>>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required-parameter checks for every built-in command kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let required: [(CommandKind, &[&'static str]); 5] = [
            (CommandKind::OpenApplication, &[entity::APPLICATION]),
            (CommandKind::CloseApplication, &[entity::APPLICATION]),
            (CommandKind::SendEmail, &[entity::RECIPIENT, entity::BODY]),
            (CommandKind::SendSms, &[entity::RECIPIENT, entity::MESSAGE]),
            (CommandKind::DeviceControl, &[entity::SETTING]),
        ];
        for (kind, fields) in required {
            registry.register(kind, Arc::new(RequiredParameters::new(fields)));
        }
        registry
    }

    pub fn register(&mut self, kind: CommandKind, validator: Arc<dyn Validator>) {
        self.validators.entry(kind).or_default().push(validator);
    }

    /// Every violation from every validator registered for the command's kind.
    pub fn validate(&self, command: &Command) -> Vec<FieldViolation> {
        self.validators
            .get(&command.kind)
            .into_iter()
            .flatten()
            .flat_map(|v| v.validate(command))
            .collect()
    }
}

pub struct ValidationStage {
    validators: ValidatorRegistry,
}

impl ValidationStage {
    pub fn new(validators: ValidatorRegistry) -> Self {
        Self { validators }
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(&self, command: &Command, next: Next<'_>) -> StageResult {
        let violations = self.validators.validate(command);
        if !violations.is_empty() {
            debug!(command = %command.kind, count = violations.len(), "validation rejected command");
            return Err(PipelineError::Validation(violations));
        }
        next.run(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_parameters_flags_missing_and_blank() {
        let registry = ValidatorRegistry::with_defaults();
        let cmd = Command::new(CommandKind::SendEmail).with_param(entity::RECIPIENT, "  ");
        let violations = registry.validate(&cmd);
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec![entity::RECIPIENT, entity::BODY]);
    }

    #[test]
    fn test_kind_without_validators_passes() {
        let registry = ValidatorRegistry::with_defaults();
        assert!(registry.validate(&Command::new(CommandKind::PauseMusic)).is_empty());
    }
}
