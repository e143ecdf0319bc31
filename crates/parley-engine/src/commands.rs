use parley_common::{CachePolicy, Command, CommandKind, IntentDecision, entity};
use std::time::Duration;

/// Cache group holding results of application commands.
pub const APP_COMMANDS_GROUP: &str = "AppCmds";
/// Cache group holding results of music commands.
pub const MUSIC_COMMANDS_GROUP: &str = "MusicCmds";

const MUSIC_SLIDING: Duration = Duration::from_secs(60);

/// Turns resolved intents into executable commands.
pub struct CommandFactory;

impl CommandFactory {
    /// `None` when the decision is `Unknown`.
    pub fn build(decision: &IntentDecision) -> Option<Command> {
        let kind = CommandKind::from_label(decision.label)?;
        let command = Command::new(kind).with_params(decision.entities.clone());

        let command = match kind {
            CommandKind::OpenApplication => match decision.entity_text(entity::APPLICATION) {
                Some(app) => command.cached(
                    CachePolicy::new(format!("open:{}", cache_segment(app)))
                        .in_group(APP_COMMANDS_GROUP),
                ),
                None => command,
            },
            CommandKind::CloseApplication => command.invalidating(APP_COMMANDS_GROUP),
            CommandKind::PlayMusic => {
                let app = decision
                    .entity_text(entity::APPLICATION)
                    .or_else(|| decision.entity_text(entity::PREFERRED_APPLICATION))
                    .unwrap_or("default");
                let query = decision.entity_text(entity::QUERY).unwrap_or("");
                command.cached(
                    CachePolicy::new(format!(
                        "play:{}:{}",
                        cache_segment(app),
                        cache_segment(query)
                    ))
                    .in_group(MUSIC_COMMANDS_GROUP)
                    .sliding(MUSIC_SLIDING),
                )
            }
            _ => command,
        };
        Some(command)
    }
}

fn cache_segment(value: &str) -> String {
    value.trim().to_lowercase()
}
