use async_trait::async_trait;
use parley_common::{CachePolicy, Command, CommandKind, PipelineError, PipelineResult, entity};
use parley_engine::cache::{CacheError, CacheStore, GroupIndex, GroupLocks, MemoryCacheStore};
use parley_engine::config::ParleyConfig;
use parley_engine::handler::Handler;
use parley_engine::pipeline::{Pipeline, StageResult, ValidatorRegistry, standard_pipeline};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Answers with how many times it has been called.
#[derive(Default)]
struct Counting {
    calls: AtomicUsize,
}

impl Counting {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for Counting {
    async fn handle(&self, _command: &Command, _cancel: &CancellationToken) -> StageResult {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PipelineResult::ok(format!("call {n}")))
    }
}

struct Broken;

#[async_trait]
impl Handler for Broken {
    async fn handle(&self, _command: &Command, _cancel: &CancellationToken) -> StageResult {
        Err(PipelineError::Handler("device offline".into()))
    }
}

/// Wraps a memory store and counts every operation.
#[derive(Default)]
struct Recording {
    inner: MemoryCacheStore,
    ops: AtomicUsize,
}

impl Recording {
    fn ops(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.ops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStore for Recording {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.touch();
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, sliding: Duration) -> Result<(), CacheError> {
        self.touch();
        self.inner.set(key, value, sliding).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.touch();
        self.inner.remove(key).await
    }

    async fn get_group(&self, group: &str) -> Result<Option<GroupIndex>, CacheError> {
        self.touch();
        self.inner.get_group(group).await
    }

    async fn set_group(&self, group: &str, index: GroupIndex) -> Result<(), CacheError> {
        self.touch();
        self.inner.set_group(group, index).await
    }

    async fn remove_group(&self, group: &str) -> Result<Vec<String>, CacheError> {
        self.touch();
        self.inner.remove_group(group).await
    }
}

/// A store that is always down.
struct Unavailable;

#[async_trait]
impl CacheStore for Unavailable {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _sliding: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn get_group(&self, _group: &str) -> Result<Option<GroupIndex>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set_group(&self, _group: &str, _index: GroupIndex) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn remove_group(&self, _group: &str) -> Result<Vec<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

/// Memory store whose writes announce themselves and then take a while.
#[derive(Default)]
struct SlowWrites {
    inner: MemoryCacheStore,
    writing: Notify,
}

#[async_trait]
impl CacheStore for SlowWrites {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, sliding: Duration) -> Result<(), CacheError> {
        self.writing.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.set(key, value, sliding).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key).await
    }

    async fn get_group(&self, group: &str) -> Result<Option<GroupIndex>, CacheError> {
        self.inner.get_group(group).await
    }

    async fn set_group(&self, group: &str, index: GroupIndex) -> Result<(), CacheError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.set_group(group, index).await
    }

    async fn remove_group(&self, group: &str) -> Result<Vec<String>, CacheError> {
        self.inner.remove_group(group).await
    }
}

fn standard(store: Arc<dyn CacheStore>) -> Pipeline {
    standard_pipeline(
        ValidatorRegistry::with_defaults(),
        store,
        &ParleyConfig::default(),
    )
}

fn open(app: &str) -> Command {
    Command::new(CommandKind::OpenApplication)
        .with_param(entity::APPLICATION, app)
        .cached(CachePolicy::new(format!("open:{}", app.to_lowercase())).in_group("AppCmds"))
}

fn close(app: &str) -> Command {
    Command::new(CommandKind::CloseApplication)
        .with_param(entity::APPLICATION, app)
        .invalidating("AppCmds")
}

#[test]
fn test_stage_order_is_fixed() {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let locks = Arc::new(GroupLocks::new());

    // Builder calls in scrambled order still produce the canonical chain.
    let pipeline = Pipeline::builder()
        .invalidation(Arc::clone(&store), Arc::clone(&locks))
        .caching(Arc::clone(&store), locks, Duration::from_secs(60))
        .performance(Duration::from_millis(500))
        .logging()
        .validation(ValidatorRegistry::with_defaults())
        .build();

    let expected = vec!["validation", "logging", "performance", "caching", "invalidation"];
    assert_eq!(pipeline.stage_names(), expected);
    assert_eq!(standard(store).stage_names(), expected);
}

#[tokio::test]
async fn test_repeated_command_served_from_cache() {
    let store = Arc::new(MemoryCacheStore::new());
    let pipeline = standard(store.clone());
    let handler = Counting::default();
    let cancel = CancellationToken::new();

    let first = pipeline.execute(&open("Spotify"), &handler, &cancel).await.unwrap();
    let second = pipeline.execute(&open("Spotify"), &handler, &cancel).await.unwrap();

    assert_eq!(first.message, "call 1");
    assert_eq!(second, first);
    assert_eq!(handler.calls(), 1);
    assert!(store.contains("open:spotify"));
}

#[tokio::test]
async fn test_bypass_never_returns_stored_value() {
    let store = Arc::new(MemoryCacheStore::new());
    let pipeline = standard(store.clone());
    let handler = Counting::default();
    let cancel = CancellationToken::new();

    pipeline.execute(&open("Spotify"), &handler, &cancel).await.unwrap();
    assert!(store.contains("open:spotify"));

    let mut bypass = open("Spotify");
    if let Some(policy) = bypass.cache.take() {
        bypass.cache = Some(policy.bypassing());
    }
    let fresh = pipeline.execute(&bypass, &handler, &cancel).await.unwrap();
    assert_eq!(fresh.message, "call 2");
    assert_eq!(handler.calls(), 2);

    // The refreshed value is what a normal read now sees.
    let cached = pipeline.execute(&open("Spotify"), &handler, &cancel).await.unwrap();
    assert_eq!(cached.message, "call 2");
}

#[tokio::test]
async fn test_validation_short_circuits_before_cache_and_handler() {
    let store = Arc::new(Recording::default());
    let pipeline = standard(store.clone());
    let handler = Counting::default();

    let blank = Command::new(CommandKind::OpenApplication)
        .with_param(entity::APPLICATION, "  ")
        .cached(CachePolicy::new("open:").in_group("AppCmds"));
    let outcome = pipeline
        .execute(&blank, &handler, &CancellationToken::new())
        .await;

    match outcome {
        Err(PipelineError::Validation(violations)) => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].field, entity::APPLICATION);
            assert_eq!(violations[0].message, "is required");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(handler.calls(), 0);
    assert_eq!(store.ops(), 0);
}

#[tokio::test]
async fn test_every_violation_reported() {
    let pipeline = standard(Arc::new(MemoryCacheStore::new()));
    let email = Command::new(CommandKind::SendEmail);

    let err = pipeline
        .execute(&email, &Counting::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    let PipelineError::Validation(violations) = err else {
        panic!("expected validation failure");
    };
    let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec![entity::RECIPIENT, entity::BODY]);
}

#[tokio::test]
async fn test_close_invalidates_open_entries_only() {
    let store = Arc::new(MemoryCacheStore::new());
    let pipeline = standard(store.clone());
    let handler = Counting::default();
    let cancel = CancellationToken::new();

    pipeline.execute(&open("Spotify"), &handler, &cancel).await.unwrap();
    pipeline.execute(&open("Chrome"), &handler, &cancel).await.unwrap();
    let music = Command::new(CommandKind::PlayMusic)
        .cached(CachePolicy::new("play:vlc:jazz").in_group("MusicCmds"));
    pipeline.execute(&music, &handler, &cancel).await.unwrap();

    let closed = pipeline.execute(&close("Spotify"), &handler, &cancel).await.unwrap();
    assert!(closed.success);

    assert!(!store.contains("open:spotify"));
    assert!(!store.contains("open:chrome"));
    assert!(store.contains("play:vlc:jazz"));

    // Next open reaches the handler again.
    let before = handler.calls();
    pipeline.execute(&open("Spotify"), &handler, &cancel).await.unwrap();
    assert_eq!(handler.calls(), before + 1);
}

#[tokio::test]
async fn test_failed_close_keeps_cache() {
    let store = Arc::new(MemoryCacheStore::new());
    let pipeline = standard(store.clone());
    let cancel = CancellationToken::new();

    pipeline
        .execute(&open("Spotify"), &Counting::default(), &cancel)
        .await
        .unwrap();
    let outcome = pipeline.execute(&close("Spotify"), &Broken, &cancel).await;

    assert_eq!(outcome, Err(PipelineError::Handler("device offline".into())));
    assert!(store.contains("open:spotify"));
}

#[tokio::test]
async fn test_handler_errors_are_not_cached() {
    let store = Arc::new(MemoryCacheStore::new());
    let pipeline = standard(store.clone());

    let outcome = pipeline
        .execute(&open("Spotify"), &Broken, &CancellationToken::new())
        .await;
    assert!(outcome.is_err());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unavailable_store_degrades_to_miss() {
    let pipeline = standard(Arc::new(Unavailable));
    let handler = Counting::default();
    let cancel = CancellationToken::new();

    for expected in ["call 1", "call 2"] {
        let result = pipeline.execute(&open("Spotify"), &handler, &cancel).await.unwrap();
        assert_eq!(result.message, expected);
    }

    let closed = pipeline.execute(&close("Spotify"), &handler, &cancel).await.unwrap();
    assert!(closed.success);
}

#[tokio::test]
async fn test_cancelled_pipeline_skips_handler() {
    let pipeline = standard(Arc::new(MemoryCacheStore::new()));
    let handler = Counting::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = pipeline.execute(&open("Spotify"), &handler, &cancel).await;
    assert_eq!(outcome, Err(PipelineError::Cancelled));
    assert_eq!(handler.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cache_write_finishes_after_caller_is_dropped() {
    let store = Arc::new(SlowWrites::default());
    let pipeline = standard(store.clone());
    let handler = Counting::default();
    let cancel = CancellationToken::new();
    let request = open("Spotify");

    tokio::select! {
        _ = pipeline.execute(&request, &handler, &cancel) => {
            panic!("request should still be writing to the cache");
        }
        _ = store.writing.notified() => {
            // The handler has returned and the write is underway.
            cancel.cancel();
        }
    }
    assert_eq!(handler.calls(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(store.inner.contains("open:spotify"));
    let index = store.get_group("AppCmds").await.unwrap().unwrap();
    assert!(index.keys.contains("open:spotify"));
}
