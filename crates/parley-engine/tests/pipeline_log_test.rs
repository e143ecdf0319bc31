use async_trait::async_trait;
use parley_common::{CachePolicy, Command, CommandKind, PipelineError, PipelineResult, entity};
use parley_engine::cache::MemoryCacheStore;
use parley_engine::config::ParleyConfig;
use parley_engine::handler::Handler;
use parley_engine::pipeline::{Pipeline, StageResult, ValidatorRegistry, standard_pipeline};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::subscriber::DefaultGuard;

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's log events into a buffer for the guard's lifetime.
fn capture() -> (Captured, DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    (captured, tracing::subscriber::set_default(subscriber))
}

struct Ok200;

#[async_trait]
impl Handler for Ok200 {
    async fn handle(&self, _command: &Command, _cancel: &CancellationToken) -> StageResult {
        Ok(PipelineResult::ok("done"))
    }
}

struct Broken;

#[async_trait]
impl Handler for Broken {
    async fn handle(&self, _command: &Command, _cancel: &CancellationToken) -> StageResult {
        Err(PipelineError::Handler("device offline".into()))
    }
}

fn standard() -> Pipeline {
    standard_pipeline(
        ValidatorRegistry::with_defaults(),
        Arc::new(MemoryCacheStore::new()),
        &ParleyConfig::default(),
    )
}

fn open(app: &str) -> Command {
    Command::new(CommandKind::OpenApplication)
        .with_param(entity::APPLICATION, app)
        .cached(CachePolicy::new(format!("open:{}", app.to_lowercase())).in_group("AppCmds"))
}

#[tokio::test]
async fn test_successful_command_logged_before_and_after() {
    let (logs, _guard) = capture();

    standard()
        .execute(&open("Spotify"), &Ok200, &CancellationToken::new())
        .await
        .unwrap();

    let text = logs.text();
    assert!(text.contains("handling command"));
    assert!(text.contains("handled command"));
    assert!(text.contains("command timing"));
}

#[tokio::test]
async fn test_validation_failure_never_reaches_logging_stage() {
    let (logs, _guard) = capture();

    let outcome = standard()
        .execute(&open("   "), &Ok200, &CancellationToken::new())
        .await;
    assert!(matches!(outcome, Err(PipelineError::Validation(_))));

    let text = logs.text();
    assert!(text.contains("validation rejected command"));
    assert!(!text.contains("handling command"));
    assert!(!text.contains("handled command"));
    assert!(!text.contains("command timing"));
}

#[tokio::test]
async fn test_timing_logged_when_chain_fails() {
    let (logs, _guard) = capture();
    let pipeline = Pipeline::builder()
        .performance(Duration::from_millis(500))
        .build();

    let outcome = pipeline
        .execute(&open("Spotify"), &Broken, &CancellationToken::new())
        .await;
    assert_eq!(outcome, Err(PipelineError::Handler("device offline".into())));

    let text = logs.text();
    assert!(text.contains("command timing"));
    assert!(text.contains("command=open_application"));
}

#[tokio::test]
async fn test_failed_command_logged_as_error() {
    let (logs, _guard) = capture();

    let outcome = standard()
        .execute(&open("Spotify"), &Broken, &CancellationToken::new())
        .await;
    assert!(outcome.is_err());

    let text = logs.text();
    assert!(text.contains("ERROR"));
    assert!(text.contains("command failed"));
    assert!(!text.contains("handled command"));
}
