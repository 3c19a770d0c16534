use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use lucid_ai::{fetch_models, HttpLocalEngine, LOCAL_MODELS};
use lucid_core::{
    AppContext, HtmlMarkdown, MarkdownRenderer, PlainText, Settings, TurnOutcome,
};
use tracing::{info, warn};

use crate::logging::{init_tracing, log_config};
use crate::page_source::page_source_for;
use crate::paths::LucidPaths;
use crate::settings_store::{apply_env_key, render_masked, set_value, SettingsStore, API_KEY_ENV};
use crate::terminal::TerminalSink;

#[derive(Parser, Debug)]
#[command(
    name = "lucid",
    version,
    about = "Summarize web pages or ask about them with a local or remote model"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub conf_dir: Option<PathBuf>,
    #[command(flatten)]
    pub backend: BackendArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Use the OpenAI-compatible provider for this run.
    #[arg(long, global = true, conflicts_with = "local")]
    pub provider: bool,
    /// Use the local engine for this run.
    #[arg(long, global = true)]
    pub local: bool,
    #[arg(long, global = true)]
    pub url: Option<String>,
    #[arg(long, global = true)]
    pub model: Option<String>,
    #[arg(long, global = true)]
    pub local_model: Option<String>,
    #[arg(long, global = true)]
    pub local_url: Option<String>,
    /// Print rendered HTML instead of plain text.
    #[arg(long, global = true, default_value_t = false)]
    pub html: bool,
    #[arg(long, global = true, default_value_t = false)]
    pub hide_reasoning: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Summarize a page (http(s) URL, file path, or `-` for stdin).
    Summarize { page: Option<String> },
    /// Ask a question about a page.
    Ask {
        #[arg(long, short)]
        page: Option<String>,
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List models on the provider, or the local catalog with `--local`.
    Models,
    /// Reset the local engine's chat state.
    Clear,
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    Show,
    Set { key: String, value: String },
}

impl BackendArgs {
    fn overrides_mode(&self) -> bool {
        self.provider || self.local
    }

    pub fn apply(&self, settings: &mut Settings) {
        if self.provider {
            settings.use_provider = true;
        }
        if self.local {
            settings.use_provider = false;
        }
        if let Some(url) = &self.url {
            settings.url = url.trim().to_string();
        }
        if let Some(model) = &self.model {
            settings.model = model.trim().to_string();
        }
        if let Some(local_model) = &self.local_model {
            settings.local_model = local_model.trim().to_string();
        }
        if let Some(local_url) = &self.local_url {
            settings.local_url = local_url.trim().to_string();
        }
    }
}

pub async fn run(cli: Cli) -> Result<(), String> {
    let paths = LucidPaths::resolve(cli.conf_dir.as_deref()).map_err(|error| error.to_string())?;
    let store = SettingsStore::new(paths.home());
    let stored = store.load().map_err(|error| error.to_string())?;
    let log_dir = paths.log_dir(&stored.log).map_err(|error| error.to_string())?;
    init_tracing(&log_config(log_dir, &stored.log));

    if let Command::Config(config) = &cli.command {
        return run_config(&store, stored, &config.command);
    }

    let mut settings = stored;
    apply_env_key(&mut settings, std::env::var(API_KEY_ENV).ok());
    cli.backend.apply(&mut settings);

    match cli.command {
        Command::Models => run_models(&settings).await,
        Command::Clear => {
            let ctx = ready_context(settings, &cli.backend).await?;
            let mut sink = terminal_sink(&cli.backend);
            ctx.clear_chat(&mut sink).await;
            sink.take_error().map_or(Ok(()), Err)
        }
        Command::Summarize { page } => {
            let ctx = ready_context(require_configured(settings, &cli.backend)?, &cli.backend).await?;
            let source = page_source_for(page.as_deref());
            let mut sink = terminal_sink(&cli.backend);
            let outcome = ctx.summarize(source.as_ref(), &mut sink).await;
            finish_turn(outcome, &mut sink)
        }
        Command::Ask { page, question } => {
            let ctx = ready_context(require_configured(settings, &cli.backend)?, &cli.backend).await?;
            let source = page_source_for(page.as_deref());
            let mut sink = terminal_sink(&cli.backend);
            let outcome = ctx.ask(source.as_ref(), &question.join(" "), &mut sink).await;
            finish_turn(outcome, &mut sink)
        }
        Command::Config(_) => Ok(()),
    }
}

fn require_configured(settings: Settings, backend: &BackendArgs) -> Result<Settings, String> {
    if !settings.configured && !backend.overrides_mode() {
        return Err(
            "lucid is not configured; run `lucid config set use_provider true|false` first"
                .to_string(),
        );
    }
    settings.validate()?;
    Ok(settings)
}

async fn ready_context(settings: Settings, backend: &BackendArgs) -> Result<AppContext, String> {
    let renderer: Arc<dyn MarkdownRenderer> = if backend.html {
        Arc::new(HtmlMarkdown)
    } else {
        Arc::new(PlainText)
    };
    let mut ctx = AppContext::new(settings, renderer);
    if ctx.needs_engine_load() {
        let local_url = ctx.settings().local_url.trim().to_string();
        let model_id = ctx.settings().local_model_id().to_string();
        let engine = HttpLocalEngine::load(local_url, model_id)
            .await
            .map_err(|error| format!("Failed to load: {error}"))?;
        ctx.install_engine(Arc::new(engine));
    }
    info!(backend = ?ctx.backend_kind(), "context ready");
    Ok(ctx)
}

fn terminal_sink(backend: &BackendArgs) -> TerminalSink<std::io::Stdout, std::io::Stderr> {
    let styled = std::io::stdout().is_terminal() && !backend.html;
    TerminalSink::new(std::io::stdout(), std::io::stderr())
        .with_ansi(styled)
        .with_reasoning(!backend.hide_reasoning)
}

fn finish_turn(
    outcome: Option<TurnOutcome>,
    sink: &mut TerminalSink<std::io::Stdout, std::io::Stderr>,
) -> Result<(), String> {
    if let Some(error) = sink.take_error() {
        return Err(error);
    }
    match outcome {
        Some(TurnOutcome::Completed) => Ok(()),
        Some(TurnOutcome::Failed) => Err("generation failed".to_string()),
        Some(TurnOutcome::Pending) | None => Err("no generation was started".to_string()),
    }
}

fn run_config(store: &SettingsStore, stored: Settings, command: &ConfigCommand) -> Result<(), String> {
    match command {
        ConfigCommand::Show => {
            println!("# {}", store.path().display());
            print!("{}", render_masked(&stored).map_err(|error| error.to_string())?);
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            let mut settings = stored;
            set_value(&mut settings, key, value).map_err(|error| error.to_string())?;
            settings.configured = true;
            store.save(&settings).map_err(|error| error.to_string())?;
            println!("saved: {}", store.path().display());
            if let Err(message) = settings.validate() {
                eprintln!("note: {message}");
            }
            Ok(())
        }
    }
}

async fn run_models(settings: &Settings) -> Result<(), String> {
    if !settings.use_provider {
        let selected = settings.local_model_id();
        for model in LOCAL_MODELS {
            let marker = if model.id == selected { "*" } else { " " };
            let tag = if model.tag.is_empty() {
                String::new()
            } else {
                format!(" [{}]", model.tag)
            };
            println!(
                "{marker} {}  {} {}, {}, {} ctx{tag}",
                model.id, model.name, model.params, model.vram, model.context_window
            );
        }
        return Ok(());
    }

    let url = settings.url.trim();
    let key = settings.key.trim();
    if url.is_empty() || key.is_empty() {
        return Err("Enter URL and API key first.".to_string());
    }
    let models = fetch_models(url, key).await.map_err(|error| {
        warn!("model listing failed: {error}");
        error.to_string()
    })?;
    if models.is_empty() {
        return Err("No models available on this server.".to_string());
    }
    let plural = if models.len() > 1 { "s" } else { "" };
    println!("Connected. {} model{plural} found.", models.len());
    for id in models {
        let marker = if id == settings.model.trim() { "*" } else { " " };
        println!("{marker} {id}");
    }
    Ok(())
}
