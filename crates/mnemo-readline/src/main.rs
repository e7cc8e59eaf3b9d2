mod command;
mod helper;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local};
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use mnemo_application::ChatService;
use mnemo_core::MnemoError;
use mnemo_core::context::ContextStrategy;
use mnemo_core::session::{Session, SessionFlags, SessionStore};
use mnemo_infrastructure::{AppConfig, FileKeyValueStore, LoggingConfig, SecretConfig};
use mnemo_interaction::build_agent;

use command::{Command, HELP, Input, Toggle};
use helper::CliHelper;

const SHORT_ID_CHARS: usize = 8;

/// Installs the fmt subscriber on stderr. `RUST_LOG` wins over the config file.
fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn notice(message: impl std::fmt::Display) {
    println!("{}", message.to_string().yellow());
}

fn error_notice(err: &MnemoError) {
    println!("{}", format!("Error: {}", err).red());
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_CHARS).unwrap_or(id)
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn describe_flags(flags: &SessionFlags) -> String {
    format!(
        "memory: {}, prioritized: {}, fast: {}, learning: {}",
        on_off(flags.use_memory),
        on_off(flags.prioritized_memory),
        on_off(flags.fast_mode),
        on_off(flags.learning_mode)
    )
}

/// Renders an RFC 3339 timestamp as local `YYYY-MM-DD HH:MM`, or verbatim if
/// it does not parse.
fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn print_session_line(session: &Session, active: bool) {
    let marker = if active { "*" } else { " " };
    let line = format!(
        "{} {}  {}  ({} turns, updated {})",
        marker,
        short_id(&session.id),
        session.title,
        session.turn_count(),
        format_timestamp(&session.updated_at)
    );
    if active {
        println!("{}", line.bright_green());
    } else {
        println!("{}", line);
    }
}

/// Resolves a full id or a unique id prefix.
fn resolve_session_id(store: &SessionStore, query: &str) -> Result<String, MnemoError> {
    let matches: Vec<&Session> = store
        .list()
        .into_iter()
        .filter(|s| s.id.starts_with(query))
        .collect();
    match matches.as_slice() {
        [session] => Ok(session.id.clone()),
        [] => Err(MnemoError::not_found("session", query)),
        _ => Err(MnemoError::invalid_input(format!(
            "Session id prefix '{}' is ambiguous",
            query
        ))),
    }
}

async fn submit(service: &mut ChatService, prompt: &str) {
    print!("{}", "assistant> ".bright_magenta());
    let _ = io::stdout().flush();

    let result = service
        .submit(prompt, |chunk| {
            print!("{}", chunk.bright_blue());
            let _ = io::stdout().flush();
        })
        .await;
    println!();

    match result {
        Ok(outcome) => {
            if let ContextStrategy::RecentFallback { reason } = &outcome.strategy {
                notice(format!("Prioritized context unavailable ({}); used recent turns", reason));
            }
            if !outcome.learned.is_empty() {
                println!(
                    "{}",
                    format!("Learned: {}", outcome.learned.join("; ")).bright_black()
                );
            }
        }
        Err(e) => error_notice(&e),
    }
}

/// Runs one command. Returns `false` when the REPL should exit.
async fn run_command(service: &mut ChatService, command: Command) -> Result<bool, MnemoError> {
    match command {
        Command::New => {
            let session = service.new_session()?;
            notice(format!("Started session {}", short_id(&session.id)));
        }
        Command::List => {
            let active_id = service.store().active_id().to_string();
            for session in service.sessions() {
                print_session_line(session, session.id == active_id);
            }
        }
        Command::Switch(query) => {
            let id = resolve_session_id(service.store(), &query)?;
            service.switch_session(&id)?;
            let session = service.active()?;
            notice(format!("Switched to \"{}\" ({} turns)", session.title, session.turn_count()));
        }
        Command::Delete(query) => {
            let id = match query {
                Some(query) => resolve_session_id(service.store(), &query)?,
                None => service.store().active_id().to_string(),
            };
            service.delete_session(&id)?;
            notice(format!(
                "Deleted session {}; active: {}",
                short_id(&id),
                short_id(service.store().active_id())
            ));
        }
        Command::DeleteAll => {
            let session = service.delete_all()?;
            notice(format!("All sessions deleted; started {}", short_id(&session.id)));
        }
        Command::Toggle(toggle) => {
            let flags = service.update_flags(|flags| match toggle {
                Toggle::Memory => flags.use_memory = !flags.use_memory,
                Toggle::Prioritized => flags.prioritized_memory = !flags.prioritized_memory,
                Toggle::Fast => flags.fast_mode = !flags.fast_mode,
                Toggle::Learning => flags.learning_mode = !flags.learning_mode,
            })?;
            notice(describe_flags(&flags));
        }
        Command::Insights => {
            let session = service.active()?;
            if session.insights().is_empty() {
                notice("No insights learned yet");
            }
            for insight in session.insights() {
                println!("{}", format!("- {}", insight).bright_blue());
            }
        }
        Command::Summary => {
            notice("Summarizing...");
            let summary = service.summarize_active().await?;
            println!("{}", summary.bright_blue());
        }
        Command::ShowSettings => {
            let settings = service.settings();
            println!("temperature              {}", settings.temperature);
            println!("topP                     {}", settings.top_p);
            println!("topK                     {}", settings.top_k);
            println!("contextMessageCount      {}", settings.context_message_count);
            println!("prioritizedContextCount  {}", settings.prioritized_context_count);
            println!("{}", describe_flags(&service.active()?.flags).bright_black());
        }
        Command::SetSetting { key, value } => {
            service.update_settings(|settings| settings.set_field(&key, &value))?;
            notice(format!("{} = {}", key, value));
        }
        Command::Help => println!("{}", HELP.bright_black()),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    init_tracing(&config.logging);
    if let Some(e) = config_error {
        tracing::warn!("Using default configuration: {}", e);
    }

    let secrets = SecretConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring secret file: {}", e);
        SecretConfig::default()
    });

    let store_dir = config.store_dir()?;
    tracing::info!("Session data in {}", store_dir.display());
    let store = SessionStore::load(Arc::new(FileKeyValueStore::new(store_dir)));
    let agent = build_agent(&config.model, &secrets)?;
    let mut service = ChatService::new(store, agent);

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    println!("{}", "=== Mnemo ===".bright_magenta().bold());
    println!(
        "{}",
        format!("Model: {}. Type /help for commands, /quit to exit.", service.agent_name())
            .bright_black()
    );
    if let Ok(session) = service.active() {
        println!(
            "{}",
            format!("Session \"{}\" ({})", session.title, describe_flags(&session.flags))
                .bright_black()
        );
    }
    println!();

    loop {
        match rl.readline(">> ") {
            Ok(line) => match command::parse(&line) {
                Input::Empty => continue,
                Input::Invalid(message) => notice(message),
                Input::Prompt(prompt) => {
                    let _ = rl.add_history_entry(&line);
                    submit(&mut service, &prompt).await;
                }
                Input::Command(command) => {
                    let _ = rl.add_history_entry(&line);
                    match run_command(&mut service, command).await {
                        Ok(true) => {}
                        Ok(false) => {
                            println!("{}", "Goodbye!".bright_green());
                            break;
                        }
                        Err(e) => error_notice(&e),
                    }
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
