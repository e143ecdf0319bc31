mod handlers;

use clap::Parser;
use parley_engine::cache::MemoryCacheStore;
use parley_engine::cli::{self, ConsoleOutput, PromptOptions};
use parley_engine::config::{ConfigLoader, ParleyConfig};
use parley_engine::dispatcher::Dispatcher;
use parley_engine::executor::UtteranceExecutor;
use parley_engine::pipeline::{ValidatorRegistry, standard_pipeline};
use parley_engine::resolver::Resolver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley", version, about = "Natural-language command console")]
struct Args {
    /// Configuration file (defaults to ./parley.yaml, then ~/.parley/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Language code of the utterances, overrides the configured one
    #[arg(long)]
    language: Option<String>,

    /// Conversation session id
    #[arg(long, default_value = "console")]
    session: String,

    /// Script of utterances to execute (non-interactive mode)
    #[arg(long)]
    file: Option<PathBuf>,
}

async fn load_config(path: Option<&PathBuf>) -> Result<ParleyConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout only carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match load_config(args.config.as_ref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    let language = args.language.unwrap_or_else(|| config.language.clone());

    let resolver = Resolver::from_config(&config, None)?;
    let pipeline = standard_pipeline(
        ValidatorRegistry::with_defaults(),
        Arc::new(MemoryCacheStore::new()),
        &config,
    );
    let dispatcher = Dispatcher::new(handlers::dry_run_registry(), pipeline);
    let executor = UtteranceExecutor::new(resolver, dispatcher, language, args.session);

    let sweeper = Arc::clone(executor.resolver().sessions()).spawn_sweeper(
        config.context.sweep_interval(),
        executor.cancel_token().clone(),
    );

    let output = ConsoleOutput {
        out: |msg| println!("{}", msg),
        err: |msg| eprintln!("{}", msg),
    };

    let outcome = match args.file.as_deref() {
        Some(path) => cli::run_script(&executor, output, path).await.map(|summary| {
            info!(
                executed = summary.executed,
                succeeded = summary.succeeded,
                "script finished"
            );
        }),
        None => {
            cli::run_prompt(
                &executor,
                output,
                PromptOptions {
                    greeting: &[
                        "Say what you want done (e.g., 'open spotify', 'play some jazz').",
                        "Type 'exit' or 'quit' to close.",
                    ],
                    prompt: "> ",
                    quit_words: &["exit", "quit"],
                    interrupted_message: "Interrupted.",
                },
            )
            .await
        }
    };
    if let Err(e) = &outcome {
        eprintln!("Error: {}", e);
    }

    executor.cancel_token().cancel();
    let _ = sweeper.await;
    outcome.map_err(Into::into)
}
