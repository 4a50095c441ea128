//! diffsage: local-LLM code review CLI.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use diffsage::budget::ContextBudgetResolver;
use diffsage::cache::{self, ResultCache};
use diffsage::config::Config;
use diffsage::constants;
use diffsage::diff::{self, DiffSource, ExclusionFilter, StaticDiffSource};
use diffsage::env::Env;
use diffsage::inference::InferenceClient;
use diffsage::models::ReviewRequest;
use diffsage::orchestrator::{ReviewOrchestrator, ReviewSession, ReviewState};
use diffsage::progress::TerminalView;
use diffsage::prompt;
use diffsage::providers::{self, ModelCatalog, ModelSummary, OllamaClient};

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use cli::args::{CacheAction, Cli, Command, ModelsArgs, ReviewArgs};
use cli::{SESSION_HELP, SessionCommand};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Review(args) => run_review(*args).await,
        Command::Models(args) => run_models(args).await,
        Command::Cache { action } => run_cache(action),
        Command::Version => run_version(),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(constants::ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config() -> Result<Config> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    Config::load(Some(cwd.as_path()), &Env::real()).context("failed to load configuration")
}

async fn fetch_models(client: &OllamaClient) -> Result<Vec<ModelSummary>> {
    client
        .list_models()
        .await
        .with_context(|| format!("cannot list models from {}", client.base_url()))
}

/// Run a review, optionally keeping an interactive session open.
async fn run_review(args: ReviewArgs) -> Result<()> {
    let input = args.validate_input().map_err(|e| anyhow::anyhow!(e))?;
    let config = load_config()?;

    let description = match (&args.description, &args.description_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read description file {}", path.display()))?,
        (None, None) => String::new(),
    };

    let http = reqwest::Client::new();
    let server = args.server.clone().unwrap_or(config.server.url.clone());
    let ollama = Arc::new(OllamaClient::with_client(http.clone(), server));

    let models = fetch_models(&ollama).await?;
    let preferred = args.model.as_deref().or(config.server.model.as_deref());
    let model = providers::select_model(&models, preferred)?;

    let source = diff::source_for(&input, http)
        .await
        .context("failed to read diff")?;
    // Without an explicit id the diff is read once up front; the session
    // then reviews exactly the text its cache key was derived from.
    let (source, change_id): (Arc<dyn DiffSource>, String) = match &args.change_id {
        Some(id) => (source, id.clone()),
        None => {
            let raw = source.load().await.context("failed to read diff")?;
            let id = args.change_id(&input, &raw);
            (Arc::new(StaticDiffSource::new(raw)), id)
        }
    };
    let request = ReviewRequest::new(change_id, args.title.clone(), description);
    let cache_enabled = config.cache.enabled && !args.no_cache;
    let cache = ResultCache::new(cache_enabled, Arc::new(cache::FileStore::new()));
    let filter = ExclusionFilter::default().with_extra(config.diff.exclude.iter().cloned());

    let orchestrator = Arc::new(ReviewOrchestrator::new(
        source,
        filter,
        ContextBudgetResolver::new(ollama.clone(), config.budget),
        InferenceClient::new(ollama.clone(), prompt::system_prompt()),
        cache,
        Arc::new(TerminalView::new(args.quiet)),
    ));

    if !args.interactive {
        let outcome = if args.rerun {
            orchestrator.rerun(&request, &model).await
        } else {
            orchestrator.open(&request, &model).await
        };
        if outcome.state == ReviewState::Failed {
            process::exit(1);
        }
        return Ok(());
    }

    let mut session = ReviewSession::new(orchestrator, request, model);
    eprintln!("{}", SESSION_HELP.dimmed());
    if args.rerun {
        session.rerun();
    } else {
        session.open();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read command")? {
        let Some(command) = SessionCommand::parse(&line) else {
            continue;
        };
        match command {
            SessionCommand::Rerun => session.rerun(),
            SessionCommand::SwitchModel(name) => match providers::find_model(&models, &name) {
                Some(found) => session.switch_model(found.name.clone()),
                None => eprintln!("{} model {name} is not installed", "✖".red().bold()),
            },
            SessionCommand::ListModels => print_models(&models, Some(session.model())),
            SessionCommand::Quit => break,
            SessionCommand::Unknown(text) => {
                eprintln!("unknown command: {text}");
                eprintln!("{}", SESSION_HELP.dimmed());
            }
        }
    }

    let pending = session.pending();
    if pending > 0 {
        eprintln!("{}", format!("waiting for {pending} running review(s)").dimmed());
    }
    session.drain().await;

    Ok(())
}

/// List installed models, marking the configured one.
async fn run_models(args: ModelsArgs) -> Result<()> {
    let config = load_config()?;
    let server = args.server.unwrap_or(config.server.url);
    let client = OllamaClient::new(server);
    let models = fetch_models(&client).await?;
    let current = providers::select_model(&models, config.server.model.as_deref())?;
    print_models(&models, Some(&current));
    Ok(())
}

fn print_models(models: &[ModelSummary], current: Option<&str>) {
    for model in models {
        if Some(model.name.as_str()) == current {
            println!("{} {}", "*".green().bold(), model.name.bold());
        } else {
            println!("  {}", model.name);
        }
    }
}

/// Manage the file-backed result cache.
fn run_cache(action: CacheAction) -> Result<()> {
    let store = cache::FileStore::new();

    match action {
        CacheAction::Clear => {
            let stats = store.clear().context("failed to clear cache")?;
            println!(
                "Cleared {} cached entry/entries ({}).",
                stats.entries,
                stats.human_size(),
            );
        }
        CacheAction::Stats => {
            let stats = store.stats().context("failed to read cache stats")?;
            println!("Cache entries: {}", stats.entries);
            println!("Cache size:    {}", stats.human_size());
        }
        CacheAction::Path => match store.path() {
            Some(p) => println!("{}", p.display()),
            None => bail!("cache directory could not be determined"),
        },
    }

    Ok(())
}

/// Print version information.
fn run_version() -> Result<()> {
    println!("{} {}", constants::APP_NAME.bold(), constants::VERSION.green().bold());
    Ok(())
}
