//! Console front ends for an [`UtteranceExecutor`]: an interactive prompt
//! and a script runner.

use crate::executor::{ExecutorError, UtteranceExecutor};
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

const COMMENT_PREFIX: char = '#';

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line} ('{utterance}'): {source}")]
    Script {
        line: usize,
        utterance: String,
        #[source]
        source: ExecutorError,
    },
}

/// Where the console writes answers and problems.
#[derive(Clone, Copy)]
pub struct ConsoleOutput {
    pub out: fn(&str),
    pub err: fn(&str),
}

pub struct PromptOptions<'a> {
    pub greeting: &'a [&'a str],
    pub prompt: &'a str,
    pub quit_words: &'a [&'a str],
    pub interrupted_message: &'a str,
}

/// Tally of a finished script.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptSummary {
    pub executed: usize,
    pub succeeded: usize,
}

/// Utterances of a script with their 1-based line numbers.
fn script_utterances(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with(COMMENT_PREFIX))
}

/// Execute every utterance in the script at `path`, echoing each one.
/// Stops at the first line the executor cannot process.
pub async fn run_script(
    executor: &UtteranceExecutor,
    output: ConsoleOutput,
    path: &Path,
) -> Result<ScriptSummary, ConsoleError> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut summary = ScriptSummary::default();

    for (line, utterance) in script_utterances(&content) {
        (output.out)(&format!("> {}", utterance));
        let result = executor
            .execute_line(utterance)
            .await
            .map_err(|source| ConsoleError::Script {
                line,
                utterance: utterance.to_string(),
                source,
            })?;
        (output.out)(&result.output);

        summary.executed += 1;
        if result.success {
            summary.succeeded += 1;
        }
    }
    Ok(summary)
}

#[derive(Debug, PartialEq, Eq)]
enum PromptLine {
    Utterance(String),
    Blank,
    Quit,
}

fn read_prompt_line(line: Option<String>, quit_words: &[&str]) -> PromptLine {
    let Some(line) = line else {
        return PromptLine::Quit;
    };
    let trimmed = line.trim();
    if trimmed.is_empty() {
        PromptLine::Blank
    } else if quit_words.iter().any(|w| w.eq_ignore_ascii_case(trimmed)) {
        PromptLine::Quit
    } else {
        PromptLine::Utterance(trimmed.to_string())
    }
}

/// Read utterances from stdin until a quit word, end of input or Ctrl-C.
/// Executor errors are reported and the prompt carries on.
pub async fn run_prompt(
    executor: &UtteranceExecutor,
    output: ConsoleOutput,
    options: PromptOptions<'_>,
) -> Result<(), ConsoleError> {
    for line in options.greeting {
        (output.out)(line);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        print!("{}", options.prompt);
        stdout.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                (output.out)(options.interrupted_message);
                break;
            }
        };

        match read_prompt_line(line, options.quit_words) {
            PromptLine::Utterance(utterance) => match executor.execute_line(&utterance).await {
                Ok(result) => (output.out)(&result.output),
                Err(e) => (output.err)(&format!("Error: {}", e)),
            },
            PromptLine::Blank => continue,
            PromptLine::Quit => break,
        }
    }
    Ok(())
}
