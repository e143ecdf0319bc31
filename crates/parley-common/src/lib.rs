pub mod command;
pub mod decision;
pub mod intent;
pub mod normalizer;
pub mod result;
pub mod strategy;

pub use command::{CachePolicy, Command, CommandKind};
pub use decision::IntentDecision;
pub use intent::{Entities, EntityValue, IntentLabel, entity};
pub use normalizer::normalize;
pub use result::{FieldViolation, PipelineError, PipelineResult};
pub use strategy::{StrategyFailure, StrategyOutcome, StrategyResult};
