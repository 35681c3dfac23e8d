mod clipboard;
mod interactive;
mod render;

use std::path::{Path, PathBuf};

use amzlisting_contracts::events::{EventLog, SessionEvent};
use amzlisting_contracts::listing::ListingSection;
use amzlisting_contracts::models::{ModelSelector, LISTING_CAPABILITY};
use amzlisting_engine::{
    default_generator_registry, CredentialGate, EngineConfig, EnvCredentialSource,
    GeneratorRegistry, ListingGenerator, ListingSession, SessionView,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::clipboard::{copy_or_print, SystemClipboard};

#[derive(Debug, Parser)]
#[command(
    name = "amzlisting",
    version,
    about = "Generate optimized Amazon listings from product mockups"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Append session events as JSONL to this file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    /// Generation model (defaults to AMZLISTING_MODEL, then the provider default).
    #[arg(long, global = true)]
    model: Option<String>,
    /// `gemini` or the offline `dryrun` generator.
    #[arg(long, global = true)]
    provider: Option<String>,
    /// Override GEMINI_API_BASE.
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// Raise log verbosity to debug.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session: upload, generate, copy, start over.
    Session,
    /// Generate one listing and exit.
    Generate(GenerateArgs),
    /// Report whether an API key is available.
    KeyStatus,
    /// List models that can produce listings.
    Models,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long)]
    image: PathBuf,
    /// Print the listing as JSON instead of cards.
    #[arg(long)]
    json: bool,
    /// Copy one section (title, bullets, description, search_terms) to the clipboard.
    #[arg(long)]
    copy: Option<ListingSection>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("amzlisting error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    let config = EngineConfig::from_env()
        .with_provider(cli.global.provider.clone())
        .with_model(cli.global.model.clone())
        .with_api_base(cli.global.api_base.clone());

    match cli.command.unwrap_or(Command::Session) {
        Command::Session => {
            interactive::run_session(&config, cli.global.events.as_deref())?;
            Ok(0)
        }
        Command::Generate(args) => run_generate(&config, cli.global.events.as_deref(), args),
        Command::KeyStatus => Ok(run_key_status()),
        Command::Models => {
            print_models(&config.provider);
            Ok(0)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "amzlisting={default_level},amzlisting_engine={default_level},amzlisting_contracts={default_level}"
        ))
    });
    // A second init only happens under test harnesses; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(crate) fn open_event_log(path: Option<&Path>) -> EventLog {
    let session_id = uuid::Uuid::new_v4().to_string();
    match path {
        Some(path) => EventLog::new(path, session_id),
        None => EventLog::disabled(session_id),
    }
}

/// Resolves the generator and model for the configured provider.
pub(crate) fn resolve_generator<'a>(
    registry: &'a GeneratorRegistry,
    config: &EngineConfig,
) -> Result<(&'a dyn ListingGenerator, String)> {
    let generator = registry.get(&config.provider).ok_or_else(|| {
        anyhow!(
            "unknown provider '{}' (available: {})",
            config.provider,
            registry.names().join(", ")
        )
    })?;
    let selection = config.resolve_model().map_err(|err| anyhow!(err))?;
    if let (Some(requested), Some(reason)) = (&selection.requested, &selection.fallback_reason) {
        warn!(%requested, "{reason} Using {}.", selection.model.name);
    }
    Ok((generator, selection.model.name))
}

fn run_generate(config: &EngineConfig, events: Option<&Path>, args: GenerateArgs) -> Result<i32> {
    let registry = default_generator_registry(config);
    let (generator, model) = resolve_generator(&registry, config)?;
    let event_log = open_event_log(events);
    event_log.emit(&SessionEvent::SessionStarted {
        provider: config.provider.clone(),
        model: model.clone(),
    })?;

    let mut session = ListingSession::new(
        CredentialGate::from_capability(EnvCredentialSource::new()),
        event_log,
        model,
    );
    session.check_credentials();
    session
        .select_path(&args.image)
        .with_context(|| format!("failed to load {}", args.image.display()))?;
    if let Some(error) = session.state().error.clone() {
        bail!("{error}");
    }

    let view = match interactive::generate_with_progress(&mut session, generator, print_progress) {
        Ok(view) => view,
        Err(rejected) => {
            if generator.requires_credential() {
                eprintln!("{}", render::credential_banner());
            }
            session.finish();
            bail!("{rejected}");
        }
    };
    session.finish();

    let Some(listing) = session.state().listing.clone() else {
        let error = session
            .state()
            .error
            .clone()
            .unwrap_or_else(|| format!("generation ended in state {view}"));
        eprintln!("{error}");
        return Ok(1);
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        println!("{}", render::render_listing(&listing));
    }
    if let Some(section) = args.copy {
        let mut clipboard = SystemClipboard::default();
        let copied = copy_or_print(&mut clipboard, section.heading(), &listing.section_text(section));
        session.events().emit(&SessionEvent::SectionCopied {
            section: section.key().to_string(),
            clipboard: copied,
        })?;
    }
    info!(view = %SessionView::Listed, "listing ready");
    Ok(0)
}

fn print_progress(message: &'static str) {
    eprintln!("{message}");
}

fn run_key_status() -> i32 {
    let mut gate = CredentialGate::from_capability(EnvCredentialSource::new());
    let status = gate.check_available();
    println!("{}", render::credential_line(status, gate.source_name()));
    if status.blocks_generation() {
        println!();
        println!("{}", render::credential_banner());
        return 1;
    }
    0
}

pub(crate) fn print_models(provider: &str) {
    let selector = ModelSelector::new(None);
    println!("Models with '{LISTING_CAPABILITY}' capability:");
    for model in selector.registry.by_capability(LISTING_CAPABILITY) {
        let marker = if model.provider == provider { "*" } else { " " };
        println!(" {marker} {} ({})", model.name, model.provider);
    }
}
