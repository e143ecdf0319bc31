use crate::classifier::{
    EnsembleClassifier, EnsembleError, ModelClient, ModelStrategy, PatternStrategy,
    SemanticStrategy, SimilarityCache,
};
use crate::config::ParleyConfig;
use crate::context::{ContextAdjuster, SessionStore};
use crate::vocabulary::Vocabulary;
use parley_common::{IntentDecision, normalize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Understands an utterance within its conversation: ensemble
/// classification followed by context adjustment.
pub struct Resolver {
    classifier: EnsembleClassifier,
    adjuster: ContextAdjuster,
    sessions: Arc<SessionStore>,
}

impl Resolver {
    pub fn new(
        classifier: EnsembleClassifier,
        adjuster: ContextAdjuster,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            classifier,
            adjuster,
            sessions,
        }
    }

    /// Build the resolver with the built-in strategies. The model strategy
    /// joins the ensemble only when a client is supplied.
    pub fn from_config(
        config: &ParleyConfig,
        model: Option<Arc<dyn ModelClient>>,
    ) -> Result<Self, EnsembleError> {
        let vocabulary = Arc::new(Vocabulary::new(
            config.context.known_applications.clone(),
            config.context.music_applications.clone(),
        ));
        let weights = &config.ensemble.weights;

        let mut builder = EnsembleClassifier::builder()
            .timeout(config.ensemble.strategy_timeout())
            .strategy(
                Arc::new(PatternStrategy::new(Arc::clone(&vocabulary))),
                weights.pattern,
            )?
            .strategy(
                Arc::new(SemanticStrategy::new(
                    Arc::clone(&vocabulary),
                    SimilarityCache::default(),
                )),
                weights.semantic,
            )?;
        if let Some(client) = model {
            builder = builder.strategy(Arc::new(ModelStrategy::new(client)), weights.model)?;
        }
        let classifier = builder.build();

        info!(
            strategies = classifier.strategies().len(),
            timeout_ms = config.ensemble.strategy_timeout_ms,
            "intent resolver ready"
        );

        let sessions = Arc::new(SessionStore::new(
            config.context.history_size,
            config.context.retention(),
        ));
        Ok(Self::new(
            classifier,
            ContextAdjuster::new(vocabulary),
            sessions,
        ))
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn classifier(&self) -> &EnsembleClassifier {
        &self.classifier
    }

    /// Resolve `text` for `session_id`. Blank input is `Unknown` without
    /// consulting any strategy or touching the session.
    pub async fn resolve(
        &self,
        text: &str,
        language: &str,
        session_id: &str,
        cancel: &CancellationToken,
    ) -> IntentDecision {
        if normalize(text).is_empty() {
            debug!("blank utterance");
            return IntentDecision::unknown(text, language);
        }

        let decision = self.classifier.classify(text, language, cancel).await;

        let session = self.sessions.session(session_id);
        let mut state = session.lock().await;
        self.adjuster.adjust(decision, &mut state)
    }
}
