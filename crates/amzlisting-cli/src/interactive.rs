use std::io::{self, BufRead, ErrorKind, Write};
use std::path::Path;

use amzlisting_contracts::commands::{parse_command, SessionCommand, SESSION_HELP};
use amzlisting_contracts::events::SessionEvent;
use amzlisting_contracts::listing::ListingSection;
use amzlisting_contracts::models::{ModelSelector, LISTING_CAPABILITY};
use amzlisting_engine::{
    default_generator_registry, Completion, CredentialCapability, CredentialGate,
    CredentialStatus, EngineConfig, EnvCredentialSource, GenerateRejected,
    InteractiveCredentialSource, ListingGenerator, ListingSession, LoadingTicker, SessionView,
    LOADING_MESSAGE_INTERVAL,
};
use anyhow::{Context, Result};
use tracing::warn;

use crate::clipboard::{copy_or_print, ClipboardSink, SystemClipboard};
use crate::{open_event_log, print_models, render, resolve_generator};

/// Reads one line from the terminal. The key stays in memory for this session only.
fn prompt_key_from_stdin() -> Result<Option<String>> {
    print!("Paste API key (input is visible, blank line cancels): ");
    io::stdout().flush()?;
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed reading API key")?;
    if read == 0 {
        return Ok(None);
    }
    let key = line.trim().to_string();
    Ok((!key.is_empty()).then_some(key))
}

pub fn run_session(config: &EngineConfig, events: Option<&Path>) -> Result<()> {
    let registry = default_generator_registry(config);
    let (generator, model) = resolve_generator(&registry, config)?;
    let event_log = open_event_log(events);
    event_log.emit(&SessionEvent::SessionStarted {
        provider: config.provider.clone(),
        model: model.clone(),
    })?;

    let credentials = CredentialGate::from_capability(
        InteractiveCredentialSource::new(prompt_key_from_stdin)
            .with_initial_key(EnvCredentialSource::new().api_key()),
    );
    let mut session = ListingSession::new(credentials, event_log, model);
    session.check_credentials();

    println!("AmzListing Optimizer. Type /help for commands.");
    println!("{}", render::credential_line(session.credential_status(), session.credential_source()));
    if generator.requires_credential() && session.credential_status() == CredentialStatus::Absent {
        println!();
        println!("{}", render::credential_banner());
    }
    println!();
    println!("{}", render::render_state(session.state(), session.credential_status(), generator.requires_credential()));

    let mut clipboard = SystemClipboard::default();
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.lock().read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let command = parse_command(line.trim_end_matches(['\n', '\r']));
        if command == SessionCommand::Quit {
            break;
        }
        handle_command(&mut session, generator, &mut clipboard, command);
    }

    session.finish();
    println!("Generated {} listing(s). Bye.", session.generations());
    Ok(())
}

fn print_caption(message: &'static str) {
    println!("  {message}");
}

/// Runs one generation with rotating captions. Nothing is shown for a rejected attempt.
pub(crate) fn generate_with_progress(
    session: &mut ListingSession,
    generator: &dyn ListingGenerator,
    on_caption: fn(&'static str),
) -> Result<SessionView, GenerateRejected> {
    let ticket = session.begin_generation(generator)?;
    let ticker = LoadingTicker::start(LOADING_MESSAGE_INTERVAL, on_caption);
    if let Err(err) = &ticker {
        warn!("loading indicator unavailable: {err}");
    }
    let result = generator.generate(&ticket.request());
    drop(ticker);
    Ok(match session.complete_generation(ticket, result) {
        Completion::Applied(view) => view,
        Completion::Discarded => session.view(),
    })
}

/// Applies one parsed command to the session and prints the resulting view.
fn handle_command(
    session: &mut ListingSession,
    generator: &dyn ListingGenerator,
    clipboard: &mut dyn ClipboardSink,
    command: SessionCommand,
) {
    let needs_key = generator.requires_credential();
    match command {
        SessionCommand::Noop | SessionCommand::Quit => {}
        SessionCommand::Help => {
            for (usage, description) in SESSION_HELP {
                println!("  {usage:<52} {description}");
            }
            println!("  Any other line is treated as a path to upload.");
        }
        SessionCommand::Upload { path } => {
            if path.is_empty() {
                println!("/upload requires a path");
                return;
            }
            match session.select_path(Path::new(&path)) {
                Ok(_) => println!(
                    "{}",
                    render::render_state(session.state(), session.credential_status(), needs_key)
                ),
                Err(err) => println!("Upload failed: {err}"),
            }
        }
        SessionCommand::Generate => {
            match generate_with_progress(session, generator, print_caption) {
                Ok(_) => println!(
                    "{}",
                    render::render_state(session.state(), session.credential_status(), needs_key)
                ),
                Err(rejected) => {
                    println!("{rejected}");
                    if needs_key && session.credential_status().blocks_generation() {
                        println!("{}", render::credential_banner());
                    }
                }
            }
        }
        SessionCommand::Reset => {
            session.reset();
            println!(
                "{}",
                render::render_state(session.state(), session.credential_status(), needs_key)
            );
        }
        SessionCommand::Connect => {
            if session.connect_credentials() {
                println!("API key connected.");
            } else {
                println!("API key not connected.");
            }
            println!(
                "{}",
                render::credential_line(session.credential_status(), session.credential_source())
            );
        }
        SessionCommand::KeyStatus => {
            let status = session.check_credentials();
            println!("{}", render::credential_line(status, session.credential_source()));
        }
        SessionCommand::Copy { section } => copy_sections(session, clipboard, section.as_deref()),
        SessionCommand::Show => println!(
            "{}",
            render::render_state(session.state(), session.credential_status(), needs_key)
        ),
        SessionCommand::Model { name: None } => println!("Model: {}", session.model()),
        SessionCommand::Model { name: Some(name) } => {
            let provider = generator.name();
            match ModelSelector::new(None).select(Some(&name), LISTING_CAPABILITY, Some(provider)) {
                Ok(selection) if selection.fallback_reason.is_none() => {
                    session.set_model(selection.model.name.clone());
                    println!("Model set to {}", selection.model.name);
                }
                Ok(selection) => println!(
                    "{} Keeping {}.",
                    selection.fallback_reason.unwrap_or_default(),
                    session.model()
                ),
                Err(err) => println!("{err}"),
            }
        }
        SessionCommand::Models => print_models(generator.name()),
        SessionCommand::Unknown { command, .. } => {
            println!("Unknown command: /{command}. Type /help for commands.");
        }
    }
}

fn copy_sections(session: &ListingSession, clipboard: &mut dyn ClipboardSink, section: Option<&str>) {
    let Some(listing) = session.state().listing.as_ref() else {
        println!("Nothing to copy yet. Generate a listing first.");
        return;
    };
    let sections: Vec<ListingSection> = match section {
        None => ListingSection::ALL.to_vec(),
        Some(raw) => match raw.parse::<ListingSection>() {
            Ok(section) => vec![section],
            Err(err) => {
                println!("{err}");
                return;
            }
        },
    };
    let text = sections
        .iter()
        .map(|section| listing.section_text(*section))
        .collect::<Vec<String>>()
        .join("\n\n");
    let label = match sections.as_slice() {
        [single] => single.heading().to_string(),
        _ => "the full listing".to_string(),
    };
    let copied = copy_or_print(clipboard, &label, &text);
    for section in &sections {
        if let Err(err) = session.events().emit(&SessionEvent::SectionCopied {
            section: section.key().to_string(),
            clipboard: copied,
        }) {
            warn!("failed to write session event: {err:#}");
        }
    }
}
