//! Cogito command line.
//!
//! Asks the Deep Thought engine one question and prints the answer. Tools are
//! offered according to the provider keys found in the environment:
//! `EXA_API_KEY` enables research and `MEDIA_API_KEY` enables images and video.

mod config;
mod keys;
mod output;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cogito_abstraction::Model;
use cogito_models::{
    DirectedVideoGenerator, ExaResearch, MockModel, OpenAiImageGenerator, OpenRouterModel,
    VideoConfig,
};
use cogito_orchestrator::{
    CapabilityKeys, Collaborators, DeepThought, ProgressUpdate, RunRequest, ToolDispatcher,
    list_available,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{CliConfig, ProviderKind};
use keys::{EnvKeyStore, MEDIA_KEY_ENV, SEARCH_KEY_ENV, env_key};

/// Cogito - delegate a question to a tool-using research model
#[derive(Parser, Debug)]
#[command(name = "cogito", author, version, about, long_about = None)]
struct Args {
    /// The question to answer
    #[arg(required_unless_present = "list_tools")]
    query: Vec<String>,

    /// Maximum model turns for the run
    #[arg(short = 't', long)]
    max_turns: Option<u32>,

    /// Chat model identifier
    #[arg(short, long)]
    model: Option<String>,

    /// Replace the base system prompt
    #[arg(long)]
    system_prompt: Option<String>,

    /// Abort the run after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Configuration file (defaults to ./.cogitorc or ~/.cogito/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full run result as JSON
    #[arg(long)]
    json: bool,

    /// Hide progress updates
    #[arg(short, long)]
    quiet: bool,

    /// Show which tools the current keys enable and exit
    #[arg(long)]
    list_tools: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cli_config = CliConfig::resolve(args.config.as_deref())?;

    // Initialize tracing
    let level = match args.log_level.as_deref().or(cli_config.log_level.as_deref()).unwrap_or("warn") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false);
    if std::env::var("RUST_LOG").is_ok() {
        tracing::subscriber::set_global_default(builder.with_env_filter(EnvFilter::from_default_env()).finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.with_max_level(level).finish())?;
    }

    let keys = EnvKeyStore::new();

    if args.list_tools {
        let availability = list_available(CapabilityKeys::snapshot(&keys));
        for tool in &availability.available {
            println!("{:<16} {}", tool.name, tool.description);
        }
        for reason in &availability.unavailable {
            eprintln!("unavailable: {reason}");
        }
        return Ok(());
    }

    let engine = build_engine(&cli_config, keys)?;

    let model = args.model.clone().unwrap_or_else(|| cli_config.provider.model.clone());
    let mut request = RunRequest::new(args.query.join(" "), model);
    if let Some(max_turns) = args.max_turns.or(cli_config.max_turns) {
        request = request.with_max_turns(max_turns);
    }
    if let Some(prompt) = args.system_prompt {
        request = request.with_system_prompt(prompt);
    }
    if let Some(secs) = args.deadline_secs {
        request = request.with_deadline(Duration::from_secs(secs));
    }
    if !args.quiet {
        request = request.with_progress(Arc::new(|update: &ProgressUpdate| output::print_progress(update)));
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            interrupt.cancel();
        }
    });
    request = request.with_cancellation(cancel);

    let result = engine.run(request).await;
    output::print_result(&result, args.json || cli_config.json)?;

    if !result.success {
        bail!(result.error.unwrap_or_else(|| "run failed".to_string()));
    }
    Ok(())
}

/// Wire the chat model and whichever tool providers have keys
fn build_engine(config: &CliConfig, keys: EnvKeyStore) -> Result<DeepThought> {
    let provider = &config.provider;

    let model: Arc<dyn Model> = match provider.kind {
        ProviderKind::Mock => Arc::new(MockModel::new(provider.model.clone())),
        ProviderKind::Openrouter => {
            let mut chat = OpenRouterModel::from_env()
                .context("The openrouter provider needs an API key")?
                .with_app_name("Cogito");
            if let Some(url) = &provider.chat_base_url {
                chat = chat.with_base_url(url.clone());
            }
            Arc::new(chat)
        }
    };

    let mut collaborators = Collaborators::new();
    if let Some(key) = env_key(SEARCH_KEY_ENV) {
        let mut research = ExaResearch::new(key);
        if let Some(url) = &provider.research_base_url {
            research = research.with_base_url(url.clone());
        }
        collaborators = collaborators.with_research(Arc::new(research));
    }
    if let Some(key) = env_key(MEDIA_KEY_ENV) {
        let mut images = OpenAiImageGenerator::new(key.clone(), provider.image_model.clone());
        let mut video_config = VideoConfig {
            default_model: provider.video_model.clone(),
            director_model: provider.director_model.clone(),
            ..VideoConfig::default()
        };
        if let Some(url) = &provider.media_base_url {
            images = images.with_base_url(url.clone());
            video_config.base_url = url.clone();
        }
        let videos = DirectedVideoGenerator::new(key, Arc::clone(&model), video_config);
        collaborators = collaborators.with_images(Arc::new(images)).with_videos(Arc::new(videos));
    }

    let dispatcher = ToolDispatcher::standard(&collaborators, &config.engine);
    let engine = DeepThought::new(model, dispatcher, Arc::new(keys), config.engine.clone());
    debug!(handlers = ?engine.dispatcher().registered(), "Tool handlers registered");
    info!(
        provider = ?provider.kind,
        max_turns_limit = engine.config().max_turns_limit,
        finish_tool = engine.config().finish_tool,
        "Engine ready"
    );
    Ok(engine)
}
