//! Talk command handler.
//!
//! Opens a live voice session and keeps it running until the user quits.
//! Stdin accepts simple control commands while audio flows through the
//! default microphone and speakers.

use std::sync::Arc;

use anyhow::Result;
use dambru_core::{PersonaConfig, Settings, validate_settings};
use dambru_live::{GeminiLiveTransport, LiveClientConfig};
use dambru_voice::{CompanionService, LocalAudioBackend, SessionConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_status;

/// Options for the talk command.
#[derive(Debug, Clone, Default)]
pub struct TalkArgs {
    pub persona: Option<String>,
    pub model: Option<String>,
    pub frame_size: Option<usize>,
}

/// A line typed while a conversation is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TalkCommand {
    Start,
    Stop,
    Persona(String),
    Help,
    Quit,
}

/// Parse one stdin line. Blank lines yield `Ok(None)`.
pub fn parse_talk_command(line: &str) -> Result<Option<TalkCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let command = match word.to_ascii_lowercase().as_str() {
        "start" | "connect" => TalkCommand::Start,
        "stop" | "disconnect" => TalkCommand::Stop,
        "persona" | "p" if rest.is_empty() => {
            return Err("usage: persona <id or name>".to_string());
        }
        "persona" | "p" => TalkCommand::Persona(rest.to_string()),
        "help" | "?" => TalkCommand::Help,
        "quit" | "exit" | "q" => TalkCommand::Quit,
        other => return Err(format!("unknown command '{other}' (type 'help')")),
    };
    Ok(Some(command))
}

/// Apply command-line overrides on top of the resolved settings.
fn session_settings(base: &Settings, args: &TalkArgs) -> Result<Settings, CliError> {
    let mut settings = base.clone();
    if let Some(model) = &args.model {
        settings.live_model = Some(model.clone());
    }
    if let Some(size) = args.frame_size {
        settings.capture_frame_size = Some(size);
    }
    validate_settings(&settings)?;
    Ok(settings)
}

/// Execute the talk command.
pub async fn execute(ctx: &CliContext, args: TalkArgs) -> Result<()> {
    let settings = session_settings(ctx.settings(), &args)?;
    ctx.require_api_key()?;
    let persona = ctx.resolve_persona(args.persona.as_deref())?.clone();

    let transport =
        GeminiLiveTransport::new(LiveClientConfig::from_settings(&settings)).map_err(CliError::from)?;
    let audio = LocalAudioBackend::new().map_err(CliError::from)?;

    let service = CompanionService::spawn(
        Arc::new(transport),
        Arc::new(audio),
        persona.clone(),
        SessionConfig::from_settings(&settings),
    );

    print_intro(&persona, settings.effective_live_model());
    service.start().map_err(CliError::from)?;

    let result = run_loop(ctx, &service).await;
    service.shutdown().await;
    println!("Goodbye.");
    result
}

async fn run_loop(ctx: &CliContext, service: &CompanionService) -> Result<()> {
    let mut status = service.status();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_printed = String::new();

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    tracing::debug!("Session worker stopped");
                    return Ok(());
                }
                let rendered = format_status(&status.borrow_and_update());
                if rendered != last_printed {
                    println!("{rendered}");
                    last_printed = rendered;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.map_err(CliError::from)? else {
                    return Ok(());
                };
                match parse_talk_command(&line) {
                    Ok(Some(TalkCommand::Quit)) => return Ok(()),
                    Ok(Some(command)) => apply(ctx, service, command)?,
                    Ok(None) => {}
                    Err(message) => eprintln!("{message}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }
}

fn apply(ctx: &CliContext, service: &CompanionService, command: TalkCommand) -> Result<()> {
    match command {
        TalkCommand::Start => service.start().map_err(CliError::from)?,
        TalkCommand::Stop => service.stop().map_err(CliError::from)?,
        TalkCommand::Persona(key) => match ctx.catalog().get(&key) {
            Some(persona) => {
                println!(
                    "Switched to {} (type 'start' to talk).",
                    persona.display_name
                );
                service
                    .select_persona(persona.clone())
                    .map_err(CliError::from)?;
            }
            None => eprintln!("unknown persona '{key}'"),
        },
        TalkCommand::Help => print_help(),
        TalkCommand::Quit => {}
    }
    Ok(())
}

fn print_intro(persona: &PersonaConfig, model: &str) {
    println!("{} {}", persona.icon, persona.display_name);
    println!("{}", persona.description);
    println!("voice: {}  model: {model}", persona.voice_id);
    println!();
    print_help();
}

fn print_help() {
    println!("Commands: start | stop | persona <name> | help | quit");
}
