use super::Strategy;
use crate::vocabulary::{Lexicon, Vocabulary, contains_any, first_match, primary_language};
use async_trait::async_trait;
use parley_common::{Entities, EntityValue, IntentLabel, StrategyOutcome, StrategyResult, entity};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tokio_util::sync::CancellationToken;

/// Verb plus a recognised object (an app name, a music term...).
const STRONG: f64 = 0.8;
/// Verb alone.
const WEAK: f64 = 0.55;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,3})\b").unwrap());

/// Per-language regexes for pulling entities out of a message request.
struct Extractors {
    recipient: Regex,
    body: Regex,
    on_app: Regex,
}

impl Extractors {
    fn english() -> Self {
        Self {
            recipient: Regex::new(r"\bto ([\p{L}']+)").unwrap(),
            body: Regex::new(r"\b(?:saying|that says|that) (.+)$").unwrap(),
            on_app: Regex::new(r"\b(?:on|in|with) ([\p{L} ]+)$").unwrap(),
        }
    }

    fn spanish() -> Self {
        Self {
            recipient: Regex::new(r"\ba ([\p{L}']+)").unwrap(),
            body: Regex::new(r"\b(?:diciendo|que diga|que) (.+)$").unwrap(),
            on_app: Regex::new(r"\b(?:en|con) ([\p{L} ]+)$").unwrap(),
        }
    }
}

/// Keyword and regex matcher. Fast and predictable; confidence is fixed by
/// how much of the utterance it recognised.
pub struct PatternStrategy {
    vocabulary: Arc<Vocabulary>,
    extractors: HashMap<&'static str, Extractors>,
    fallback: Extractors,
}

impl PatternStrategy {
    pub const NAME: &'static str = "pattern";

    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        let mut extractors = HashMap::new();
        extractors.insert("es", Extractors::spanish());
        Self {
            vocabulary,
            extractors,
            fallback: Extractors::english(),
        }
    }

    fn extractors(&self, language: &str) -> &Extractors {
        self.extractors
            .get(primary_language(language).as_str())
            .unwrap_or(&self.fallback)
    }

    /// Classify already-normalized text.
    pub fn match_text(&self, text: &str, language: &str) -> StrategyResult {
        let lex = self.vocabulary.lexicon(language);
        let extract = self.extractors(language);
        let app = self.vocabulary.find_application(text);

        let (label, confidence, entities) = if contains_any(text, &lex.pause_verbs) {
            (IntentLabel::PauseMusic, STRONG, Entities::new())
        } else if contains_any(text, &lex.close_verbs) && !contains_any(text, &lex.music_terms) {
            match app {
                Some(app) => (IntentLabel::CloseApplication, STRONG, app_entity(app)),
                None => (IntentLabel::CloseApplication, WEAK, Entities::new()),
            }
        } else if contains_any(text, &lex.open_verbs) {
            match app {
                Some(app) => (IntentLabel::OpenApplication, STRONG, app_entity(app)),
                None if contains_any(text, &lex.app_terms) => {
                    (IntentLabel::OpenApplication, WEAK, Entities::new())
                }
                None => return StrategyResult::unknown(Self::NAME),
            }
        } else if let Some(verb) = first_match(text, &lex.play_verbs) {
            self.play(text, verb, app, lex, extract)
        } else if contains_any(text, &lex.send_verbs) || contains_any(text, &lex.sms_terms) {
            match self.message(text, lex, extract) {
                Some(found) => found,
                None => return StrategyResult::unknown(Self::NAME),
            }
        } else if let Some(setting) = first_match(text, &lex.device_terms) {
            let mut entities = Entities::new();
            entities.insert(entity::SETTING.to_string(), setting.into());
            if let Some(value) = NUMBER_RE
                .captures(text)
                .and_then(|c| c[1].parse::<f64>().ok())
            {
                entities.insert(entity::VALUE.to_string(), EntityValue::Number(value));
            }
            (IntentLabel::DeviceControl, STRONG, entities)
        } else {
            return StrategyResult::unknown(Self::NAME);
        };

        StrategyResult::new(label, confidence, entities, Self::NAME)
    }

    fn play(
        &self,
        text: &str,
        verb: &str,
        app: Option<String>,
        lex: &Lexicon,
        extract: &Extractors,
    ) -> (IntentLabel, f64, Entities) {
        let music_app = app.filter(|a| self.vocabulary.is_music_application(a));
        let musical = contains_any(text, &lex.music_terms) || music_app.is_some();

        let mut entities = Entities::new();
        let padded = format!(" {} ", text);
        let after_verb = padded
            .split_once(&format!(" {} ", verb))
            .map(|(_, rest)| rest.trim())
            .unwrap_or_default();
        let query = match extract.on_app.captures(after_verb) {
            Some(c) if music_app.is_some() => after_verb[..c.get(0).map_or(0, |m| m.start())].trim(),
            _ => after_verb,
        };
        if !query.is_empty() {
            entities.insert(entity::QUERY.to_string(), query.into());
        }
        if let Some(app) = music_app {
            entities.insert(entity::APPLICATION.to_string(), app.into());
        }

        let confidence = if musical { STRONG } else { WEAK };
        (IntentLabel::PlayMusic, confidence, entities)
    }

    fn message(
        &self,
        text: &str,
        lex: &Lexicon,
        extract: &Extractors,
    ) -> Option<(IntentLabel, f64, Entities)> {
        let label = if contains_any(text, &lex.email_terms) {
            IntentLabel::SendEmail
        } else if contains_any(text, &lex.sms_terms) {
            IntentLabel::SendSms
        } else {
            return None;
        };

        let mut entities = Entities::new();
        let body_field = match label {
            IntentLabel::SendEmail => entity::BODY,
            _ => entity::MESSAGE,
        };
        let body_start = extract.body.captures(text).and_then(|c| {
            let whole = c.get(0)?;
            entities.insert(body_field.to_string(), c[1].trim().into());
            Some(whole.start())
        });
        let head = &text[..body_start.unwrap_or(text.len())];
        if let Some(c) = extract.recipient.captures(head) {
            entities.insert(entity::RECIPIENT.to_string(), c[1].trim().into());
        }

        let confidence = if entities.contains_key(entity::RECIPIENT) {
            STRONG
        } else {
            WEAK
        };
        Some((label, confidence, entities))
    }
}

fn app_entity(app: String) -> Entities {
    let mut entities = Entities::new();
    entities.insert(entity::APPLICATION.to_string(), EntityValue::Text(app));
    entities
}

#[async_trait]
impl Strategy for PatternStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn detect(
        &self,
        text: &str,
        language: &str,
        _cancel: &CancellationToken,
    ) -> StrategyOutcome {
        Ok(self.match_text(&parley_common::normalize(text), language))
    }
}
