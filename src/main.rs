//! askcmd - turn natural language into shell commands.
//!
//! Describes the current environment to a language model, asks it for a
//! command (or an explanation of one), and prints the cleaned-up answer.
//! Nothing it suggests is ever executed.

mod config;
mod context;
mod error;
mod history;
mod llm;
mod normalize;
mod pipeline;
mod present;
mod prompt;
mod protocol;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use config::StoredConfig;
use history::HistoryStore;
use pipeline::Pipeline;
use present::{Presenter, RenderMode};
use protocol::PromptRequest;
use std::io;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "askcmd")]
#[command(author, version, about = "Turn natural language into shell commands")]
#[command(
    long_about = "Describe what you want to do and get the shell command for it.\n\nThe command is printed, never run."
)]
struct Cli {
    /// What you want to do, in plain words (or the command to explain)
    #[arg(value_name = "QUESTION", trailing_var_arg = true, allow_hyphen_values = true)]
    question: Vec<String>,

    /// Explain the given command instead of generating one
    #[arg(short = 'e', long)]
    explain: bool,

    /// Print the answer (or the history) as JSON
    #[arg(long)]
    json: bool,

    /// Print the answer at once instead of typing it out
    #[arg(long)]
    instant: bool,

    /// Enable debug logging on stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Save the API key to the config file
    #[arg(long, value_name = "KEY", group = "action", conflicts_with = "question")]
    set_key: Option<String>,

    /// Show past requests
    #[arg(long, group = "action", conflicts_with = "question")]
    history: bool,

    /// Number of history entries to show
    #[arg(short = 'n', long, default_value_t = 20)]
    limit: usize,

    /// Delete all history (with --history)
    #[arg(long)]
    clear: bool,

    /// Show where config and history are stored
    #[arg(long, group = "action", conflicts_with = "question")]
    config: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(key) = &cli.set_key {
        handle_set_key(key)?;
    } else if cli.history {
        handle_history(cli.limit, cli.json, cli.clear)?;
    } else if cli.config {
        handle_config()?;
    } else {
        return handle_query(&cli).await;
    }
    Ok(ExitCode::SUCCESS)
}

/// Initialize logging. Everything goes to stderr so stdout stays clean.
fn init_logging(verbose: bool) {
    let default = if verbose { "askcmd=debug" } else { "askcmd=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Handle --set-key.
fn handle_set_key(key: &str) -> Result<()> {
    let path = StoredConfig::config_path()?;
    StoredConfig::set_api_key(&path, key)?;
    println!("API key saved to {}", path.display());
    Ok(())
}

/// Handle --history.
fn handle_history(limit: usize, json: bool, clear: bool) -> Result<()> {
    let store = HistoryStore::new(StoredConfig::history_path()?);

    if clear {
        store.clear()?;
        println!("Cleared {}", store.path().display());
        return Ok(());
    }

    let presenter = if json {
        Presenter::new(false, Duration::ZERO)
    } else {
        Presenter::for_stdout()
    };
    let entries = store.recent(limit);
    presenter.render_history(&mut io::stdout().lock(), &entries, json)?;
    Ok(())
}

/// Handle --config.
fn handle_config() -> Result<()> {
    let stored = StoredConfig::load()?;

    println!("Config:  {}", StoredConfig::config_path()?.display());
    println!("History: {}", StoredConfig::history_path()?.display());

    match stored.masked_key() {
        Some(masked) => println!("API key: {} (config file)", masked),
        None => {
            let from_env = [config::PRIMARY_KEY_VAR, config::SECONDARY_KEY_VAR]
                .into_iter()
                .find(|var| std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false));
            match from_env {
                Some(var) => println!("API key: from ${}", var),
                None => println!("API key: not set (run `askcmd --set-key <KEY>`)"),
            }
        }
    }

    Ok(())
}

/// A generate or explain invocation, resolved before anything is sent.
#[derive(Debug, PartialEq, Eq)]
enum Query {
    /// No question was given.
    Usage,
    Ready {
        request: PromptRequest,
        credential: String,
    },
}

/// Turn the question words into a request and find the credential for it.
fn resolve_query<F>(
    words: &[String],
    explain: bool,
    config: &StoredConfig,
    lookup: F,
) -> Result<Query, error::Error>
where
    F: Fn(&str) -> Option<String>,
{
    let text = words.join(" ").trim().to_string();
    if text.is_empty() {
        return Ok(Query::Usage);
    }

    let credential = config
        .resolve_credential(lookup)
        .ok_or(error::Error::MissingCredential)?;

    let request = if explain {
        PromptRequest::Explain { command_text: text }
    } else {
        PromptRequest::Generate { question: text }
    };
    Ok(Query::Ready {
        request,
        credential,
    })
}

/// Handle a generate or explain request.
async fn handle_query(cli: &Cli) -> Result<ExitCode> {
    let config = StoredConfig::load()?;
    let query = resolve_query(&cli.question, cli.explain, &config, |name| {
        std::env::var(name).ok()
    });

    let (request, credential) = match query {
        Ok(Query::Usage) => {
            Cli::command().print_help()?;
            println!();
            return Ok(ExitCode::SUCCESS);
        }
        Ok(Query::Ready {
            request,
            credential,
        }) => (request, credential),
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let history = HistoryStore::new(StoredConfig::history_path()?);
    let client = llm::OpenAIClient::new()?;
    let pipeline = Pipeline::new(&client, &history).with_classifier(error::classify_message);

    let outcome = match pipeline.run(request, &cwd, &credential).await {
        Ok(outcome) => outcome,
        Err(e) => {
            debug!("Request failed with {:?}", e.kind());
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    debug!("Normalized answer: {:?}", outcome.normalized);

    let interactive = atty::is(atty::Stream::Stdout);
    let (presenter, mode) = if cli.json {
        (Presenter::new(false, Duration::ZERO), RenderMode::Json)
    } else if cli.instant || !interactive {
        (Presenter::for_stdout(), RenderMode::Plain)
    } else {
        (Presenter::for_stdout(), RenderMode::Progressive)
    };

    presenter.render(
        &mut io::stdout().lock(),
        &outcome.request,
        &outcome.answer,
        mode,
    )?;
    Ok(ExitCode::SUCCESS)
}
