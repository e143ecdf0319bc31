//! Intent resolution and command execution for natural-language commands.
//!
//! An utterance is classified by an [`classifier::EnsembleClassifier`],
//! corrected by the conversation's [`context::ContextAdjuster`], turned into
//! a [`parley_common::Command`] and dispatched through the execution
//! [`pipeline::Pipeline`] to its [`handler::Handler`].

pub mod cache;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod executor;
pub mod handler;
pub mod pipeline;
pub mod resolver;
pub mod vocabulary;

pub use commands::CommandFactory;
pub use dispatcher::{DispatchError, Dispatcher};
pub use executor::{ExecutionResult, UtteranceExecutor};
pub use resolver::Resolver;
