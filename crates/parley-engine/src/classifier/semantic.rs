use super::Strategy;
use crate::vocabulary::{Vocabulary, primary_language};
use async_trait::async_trait;
use parley_common::{Entities, IntentLabel, StrategyOutcome, StrategyResult, entity, normalize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use strsim::sorensen_dice;
use tokio_util::sync::CancellationToken;

const MIN_SIMILARITY: f64 = 0.35;
const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Memo of previous similarity lookups, keyed by `(language, normalized text)`.
///
/// Handed to [`SemanticStrategy`] by whoever builds it, so each engine (and
/// each test) gets its own.
#[derive(Clone)]
pub struct SimilarityCache {
    entries: Arc<Mutex<HashMap<(String, String), StrategyResult>>>,
    capacity: usize,
}

impl Default for SimilarityCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl SimilarityCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    pub fn get(&self, language: &str, text: &str) -> Option<StrategyResult> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&(language.to_string(), text.to_string()))
            .cloned()
    }

    pub fn insert(&self, language: &str, text: &str, result: StrategyResult) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        // Crude bound: start over rather than track recency.
        if entries.len() >= self.capacity {
            entries.clear();
        }
        entries.insert((language.to_string(), text.to_string()), result);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Nearest-exemplar lookup: the utterance is compared with canned phrases
/// for every intent and the closest one wins.
pub struct SemanticStrategy {
    vocabulary: Arc<Vocabulary>,
    exemplars: HashMap<String, Vec<(IntentLabel, String)>>,
    cache: SimilarityCache,
}

impl SemanticStrategy {
    pub const NAME: &'static str = "semantic";

    pub fn new(vocabulary: Arc<Vocabulary>, cache: SimilarityCache) -> Self {
        let mut exemplars = HashMap::new();
        exemplars.insert("en".to_string(), english_exemplars());
        exemplars.insert("es".to_string(), spanish_exemplars());
        Self {
            vocabulary,
            exemplars,
            cache,
        }
    }

    pub fn with_exemplars(
        mut self,
        language: &str,
        phrases: impl IntoIterator<Item = (IntentLabel, String)>,
    ) -> Self {
        self.exemplars
            .entry(primary_language(language))
            .or_default()
            .extend(phrases);
        self
    }

    pub fn lookup(&self, text: &str, language: &str) -> StrategyResult {
        let primary = primary_language(language);
        if let Some(hit) = self.cache.get(&primary, text) {
            return hit;
        }

        let phrases = self
            .exemplars
            .get(&primary)
            .or_else(|| self.exemplars.get("en"));

        let best = phrases
            .into_iter()
            .flatten()
            .map(|(label, phrase)| (*label, similarity(text, phrase)))
            .fold(None, |best: Option<(IntentLabel, f64)>, candidate| match best {
                Some(b) if b.1 >= candidate.1 => Some(b),
                _ => Some(candidate),
            });

        let result = match best {
            Some((label, score)) if score >= MIN_SIMILARITY => {
                let mut entities = Entities::new();
                if matches!(
                    label,
                    IntentLabel::OpenApplication | IntentLabel::CloseApplication
                ) && let Some(app) = self.vocabulary.find_application(text)
                {
                    entities.insert(entity::APPLICATION.to_string(), app.into());
                }
                StrategyResult::new(label, score, entities, Self::NAME)
            }
            _ => StrategyResult::unknown(Self::NAME),
        };

        self.cache.insert(&primary, text, result.clone());
        result
    }
}

/// Character-bigram overlap blended with word overlap, both in [0, 1].
fn similarity(a: &str, b: &str) -> f64 {
    let chars = sorensen_dice(a, b);
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    if a_words.is_empty() || b_words.is_empty() {
        return 0.0;
    }
    let shared = b_words.iter().filter(|w| a_words.contains(w)).count();
    let words = shared as f64 / b_words.len() as f64;
    (chars + words) / 2.0
}

fn phrases(list: &[(IntentLabel, &str)]) -> Vec<(IntentLabel, String)> {
    list.iter().map(|(l, p)| (*l, p.to_string())).collect()
}

fn english_exemplars() -> Vec<(IntentLabel, String)> {
    use IntentLabel::*;
    phrases(&[
        (OpenApplication, "open the app"),
        (OpenApplication, "launch the program"),
        (OpenApplication, "start the application"),
        (CloseApplication, "close the app"),
        (CloseApplication, "quit the program"),
        (CloseApplication, "shut the application"),
        (PlayMusic, "play some music"),
        (PlayMusic, "put on a song"),
        (PlayMusic, "play my playlist"),
        (PauseMusic, "pause the music"),
        (PauseMusic, "stop the song"),
        (SendEmail, "send an email"),
        (SendEmail, "write a mail to"),
        (SendSms, "send a text message"),
        (SendSms, "text my friend"),
        (DeviceControl, "turn up the volume"),
        (DeviceControl, "lower the brightness"),
        (DeviceControl, "turn off the wifi"),
    ])
}

fn spanish_exemplars() -> Vec<(IntentLabel, String)> {
    use IntentLabel::*;
    phrases(&[
        (OpenApplication, "abre la aplicacion"),
        (OpenApplication, "inicia el programa"),
        (CloseApplication, "cierra la aplicacion"),
        (PlayMusic, "pon musica"),
        (PlayMusic, "reproduce una cancion"),
        (PauseMusic, "pausa la musica"),
        (SendEmail, "envia un correo"),
        (SendSms, "manda un mensaje"),
        (DeviceControl, "sube el volumen"),
    ])
}

#[async_trait]
impl Strategy for SemanticStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn detect(
        &self,
        text: &str,
        language: &str,
        _cancel: &CancellationToken,
    ) -> StrategyOutcome {
        Ok(self.lookup(&normalize(text), language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_exemplar() {
        let s = SemanticStrategy::new(Arc::new(Vocabulary::default()), SimilarityCache::default());
        let r = s.lookup("please pause the music", "en");
        assert_eq!(r.label, IntentLabel::PauseMusic);
        assert!(r.confidence >= MIN_SIMILARITY && r.confidence <= 1.0);
    }

    #[test]
    fn test_far_from_everything_is_unknown() {
        let s = SemanticStrategy::new(Arc::new(Vocabulary::default()), SimilarityCache::default());
        assert_eq!(s.lookup("xyzzy", "en").label, IntentLabel::Unknown);
    }

    #[test]
    fn test_language_code_normalized_for_exemplars_and_cache() {
        let cache = SimilarityCache::default();
        let s = SemanticStrategy::new(Arc::new(Vocabulary::default()), cache.clone());

        let lower = s.lookup("pausa la musica", "es");
        let upper = s.lookup("pausa la musica", "ES");
        assert_eq!(upper.label, IntentLabel::PauseMusic);
        assert_eq!(upper, lower);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_injected_cache_is_used_and_isolated() {
        let cache = SimilarityCache::default();
        let s = SemanticStrategy::new(Arc::new(Vocabulary::default()), cache.clone());
        s.lookup("pause the music", "en");
        assert_eq!(cache.len(), 1);

        let other = SimilarityCache::default();
        let _t = SemanticStrategy::new(Arc::new(Vocabulary::default()), other.clone());
        assert!(other.is_empty());
    }
}
