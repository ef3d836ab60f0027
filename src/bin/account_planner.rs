//! Account Planner interactive CLI
//!
//! # Usage
//!
//! ```bash
//! # Offline: built-in catalog, built-in facts, deterministic generator
//! account-planner --offline
//!
//! # Anthropic backend (reads ANTHROPIC_API_KEY from the environment or .env)
//! account-planner --catalog companies.json
//! ```

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::sync::Arc;

use account_planner::research::{
    ClaudeGenerator, NameExtractor, OfflineGenerator, PromptRenderer, StaticFactLookup,
    TextGenerator,
};
use account_planner::{AgentConfig, DialogueOrchestrator, EntityIndex};

#[derive(Parser)]
#[command(name = "account-planner")]
#[command(version = "0.1.0")]
#[command(about = "Conversational company research and account planning")]
#[command(long_about = None)]
struct Cli {
    /// Entity catalog JSON (`{"entities": [...]}`) replacing the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Use the offline generator even when an API key is configured
    #[arg(long)]
    offline: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = AgentConfig::from_env().context("loading configuration")?;
    let catalog = cli
        .catalog
        .as_deref()
        .map(EntityIndex::load)
        .transpose()
        .context("loading entity catalog")?;

    let remote = if cli.offline {
        None
    } else {
        ClaudeGenerator::from_config(&config.generator)
    };
    let generator: Arc<dyn TextGenerator> = match remote {
        Some(claude) => Arc::new(claude),
        None => Arc::new(OfflineGenerator),
    };
    let backend = generator.model_name().to_string();
    let extract = !cli.offline && config.has_remote_generator();

    let lookup = Arc::new(StaticFactLookup::builtin()?);
    let mut agent = DialogueOrchestrator::from_collaborators(
        config,
        catalog,
        lookup,
        generator.clone(),
    )?;
    if extract {
        agent = agent.with_extractor(NameExtractor::new(generator, Arc::new(PromptRenderer::new()?)));
    }

    tracing::info!(backend, extraction = extract, "Account planner ready");
    println!("{}", "Account Planner".bold().cyan());
    println!("{}\n", agent.greeting());

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline(&format!("{} ", "you>".green().bold())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                let out = agent.process_turn("exit").await;
                println!("{}", out.display_text);
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        let out = agent.process_turn(&line).await;
        println!("\n{}\n", out.display_text);
        if out.session_ended {
            break;
        }
    }

    Ok(())
}
