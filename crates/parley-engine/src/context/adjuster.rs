use super::state::{ConversationState, HistoryEntry, RuleKind};
use crate::vocabulary::{Lexicon, Vocabulary, contains_any};
use parley_common::{Entities, EntityValue, IntentDecision, IntentLabel, entity, normalize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

const OPEN_FLOOR: f64 = 0.9;
const PLAY_FLOOR: f64 = 0.85;
const CLOSE_FLOOR: f64 = 0.9;
const PREFERENCE_BONUS: f64 = 0.1;

/// Preference category for the user's music application.
pub const MUSIC_PREFERENCE: &str = "music";

/// Rules in evaluation order; the first one that applies wins.
const RULES: [RuleKind; 4] = [
    RuleKind::OpenApplication,
    RuleKind::PlayMusic,
    RuleKind::CloseApplication,
    RuleKind::PreferredApplication,
];

/// Corrects ensemble decisions using what the conversation already said.
pub struct ContextAdjuster {
    vocabulary: Arc<Vocabulary>,
}

impl ContextAdjuster {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn adjust(
        &self,
        decision: IntentDecision,
        state: &mut ConversationState,
    ) -> IntentDecision {
        let text = normalize(&decision.original_text);
        let lex = self.vocabulary.lexicon(&decision.language);

        let matched = RULES.iter().find_map(|rule| {
            self.apply(*rule, &decision, &text, lex, state)
                .map(|d| (*rule, d))
        });
        let (rule, adjusted) = match matched {
            Some(found) => found,
            None => (RuleKind::PassThrough, decision),
        };

        debug!(
            rule = %rule,
            label = %adjusted.label,
            confidence = adjusted.confidence,
            "context adjusted decision"
        );

        self.remember(rule, &adjusted, state);
        adjusted
    }

    fn apply(
        &self,
        rule: RuleKind,
        decision: &IntentDecision,
        text: &str,
        lex: &Lexicon,
        state: &ConversationState,
    ) -> Option<IntentDecision> {
        match rule {
            RuleKind::OpenApplication => {
                if !contains_any(text, &lex.open_verbs) {
                    return None;
                }
                let app = self
                    .vocabulary
                    .find_application(text)
                    .or_else(|| state.recent_application().map(String::from))?;
                Some(forced(
                    decision,
                    IntentLabel::OpenApplication,
                    OPEN_FLOOR,
                    app_entities(app),
                ))
            }
            RuleKind::PlayMusic => {
                if !contains_any(text, &lex.play_verbs) {
                    return None;
                }
                let musical = contains_any(text, &lex.music_terms) || state.recently_musical();
                let app_open_vocabulary =
                    contains_any(text, &lex.app_terms) || contains_any(text, &lex.open_verbs);
                if !musical || app_open_vocabulary {
                    return None;
                }
                let entities = if decision.label == IntentLabel::PlayMusic {
                    decision.entities.clone()
                } else {
                    Entities::new()
                };
                Some(forced(decision, IntentLabel::PlayMusic, PLAY_FLOOR, entities))
            }
            RuleKind::CloseApplication => {
                if !contains_any(text, &lex.close_verbs)
                    || contains_any(text, &lex.music_terms)
                    || contains_any(text, &lex.pause_verbs)
                {
                    return None;
                }
                let open = state.open_applications();
                let most_recent = open.first()?;
                let target = self
                    .vocabulary
                    .find_application(text)
                    .unwrap_or_else(|| most_recent.to_string());
                Some(forced(
                    decision,
                    IntentLabel::CloseApplication,
                    CLOSE_FLOOR,
                    app_entities(target),
                ))
            }
            RuleKind::PreferredApplication => {
                if decision.label != IntentLabel::PlayMusic {
                    return None;
                }
                let preferred = state.preference(MUSIC_PREFERENCE)?;
                let mut adjusted = decision.clone();
                adjusted.entities.insert(
                    entity::PREFERRED_APPLICATION.to_string(),
                    EntityValue::Text(preferred.to_string()),
                );
                adjusted.confidence = (adjusted.confidence + PREFERENCE_BONUS).min(1.0);
                Some(adjusted)
            }
            RuleKind::PassThrough => None,
        }
    }

    /// Record the turn and keep app/preference bookkeeping current.
    fn remember(&self, rule: RuleKind, decision: &IntentDecision, state: &mut ConversationState) {
        let now = Instant::now();
        let application = decision.entity_text(entity::APPLICATION).map(String::from);

        match (decision.label, application.as_deref()) {
            (IntentLabel::OpenApplication, Some(app)) => state.set_app_open(app, true, now),
            (IntentLabel::CloseApplication, Some(app)) => state.set_app_open(app, false, now),
            (IntentLabel::PlayMusic, Some(app)) if self.vocabulary.is_music_application(app) => {
                state.set_preference(MUSIC_PREFERENCE, app, now)
            }
            _ => {}
        }

        state.record(HistoryEntry {
            rule,
            input: decision.original_text.clone(),
            label: decision.label,
            application,
            at: now,
        });
    }
}

fn forced(
    decision: &IntentDecision,
    label: IntentLabel,
    floor: f64,
    entities: Entities,
) -> IntentDecision {
    IntentDecision {
        label,
        confidence: decision.confidence.max(floor),
        entities,
        original_text: decision.original_text.clone(),
        language: decision.language.clone(),
    }
}

fn app_entities(app: String) -> Entities {
    let mut entities = Entities::new();
    entities.insert(entity::APPLICATION.to_string(), EntityValue::Text(app));
    entities
}
