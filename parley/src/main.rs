//! Parley: line-based chat client over a simulated service.
//!
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/parley/config.toml`).
//!
//! ```bash
//! cargo run --bin parley
//!
//! # Reproducible data, flaky service, logs to a file
//! cargo run --bin parley -- --seed 7 --failure-rate 0.2 --log-file /tmp/parley.log
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use parley::command::{Command, HELP};
use parley::config::{CliArgs, ClientConfig};
use parley::delay::RandomDelays;
use parley::log::LogEvent;
use parley::service::{IncomingFeed, SimulatedService};
use parley::session::Session;
use parley::view;
use parley_proto::ChatId;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!("parley starting");

    let service = Arc::new(SimulatedService::new(config.service.clone()));
    let feed = IncomingFeed::new(service.users().to_vec(), config.incoming.clone());
    let delays = Arc::new(RandomDelays::new(config.status.clone()));
    let (session, events) = Session::new(service, delays, config.event_buffer);
    let session = session.with_incoming(feed);

    let result = run(&session, events, &config).await;

    tracing::info!("parley exiting");
    result
}

/// Logs go to `file_path` when given, otherwise to stderr.
///
/// The returned [`WorkerGuard`] must be held until shutdown so buffered
/// file entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let Some(log_path) = file_path else {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(env_filter)
            .init();
        return None;
    };

    let log_dir = log_path.parent().filter(|p| !p.as_os_str().is_empty());
    let log_dir = log_dir.unwrap_or_else(|| Path::new("."));
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Interactive loop: reads commands from stdin and prints log events.
async fn run(
    session: &Session<SimulatedService>,
    mut events: mpsc::Receiver<LogEvent>,
    config: &ClientConfig,
) -> io::Result<()> {
    println!("Loading chats...");
    session.load().await;
    let mut listing = print_chats(session, config);
    if config.incoming_enabled {
        session.connect_incoming();
    }
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                let Some(command) = Command::parse(&line) else {
                    continue;
                };
                if !handle_command(session, config, &mut listing, command).await {
                    return Ok(());
                }
            }
            Some(event) = events.recv() => print_event(session, config, &event),
        }
    }
}

/// Returns `false` when the client should exit.
async fn handle_command(
    session: &Session<SimulatedService>,
    config: &ClientConfig,
    listing: &mut Vec<ChatId>,
    command: Command,
) -> bool {
    match command {
        Command::Chats => *listing = print_chats(session, config),
        Command::Open(n) => {
            let Some(chat_id) = listing.get(n - 1).cloned() else {
                println!("No chat number {n}; /chats lists them.");
                return true;
            };
            if session.open_chat(&chat_id) {
                println!("Loading {}...", peer_name(session, &chat_id));
            } else {
                print_transcript(session, &chat_id, config.transcript_tail);
            }
        }
        Command::Retry => {
            session.retry().await;
            *listing = print_chats(session, config);
        }
        Command::Connect => {
            if session.connect_incoming() {
                println!("Incoming messages on.");
            }
        }
        Command::Disconnect => {
            session.disconnect_incoming();
            println!("Incoming messages off.");
        }
        Command::Dump => {
            let state = serde_json::json!({
                "chats": session.chats_view(),
                "messages": session.messages_view(None),
            });
            match serde_json::to_string_pretty(&state) {
                Ok(json) => println!("{json}"),
                Err(e) => println!("Could not serialize state: {e}"),
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Send(text) => {
            if session.send(text).is_none() {
                println!("Open a chat first with /open <n>.");
            }
        }
        Command::Invalid(hint) => println!("{hint}"),
    }
    true
}

fn print_chats(session: &Session<SimulatedService>, config: &ClientConfig) -> Vec<ChatId> {
    let chats = session.chats_view();
    if let Some(error) = &chats.error {
        println!("Could not load chats: {error} (/retry)");
    }
    let selected = chats.selected_chat.as_ref().map(|c| &c.id);
    for (i, chat) in chats.chats.iter().enumerate() {
        let line = view::chat_line(i + 1, chat, selected == Some(&chat.id), config.preview_len);
        println!("{line}");
    }
    chats.chats.into_iter().map(|c| c.id).collect()
}

fn print_transcript(session: &Session<SimulatedService>, chat_id: &ChatId, tail: usize) {
    let transcript = session.messages_view(Some(chat_id));
    if let Some(error) = &transcript.error
        && transcript.messages.is_empty()
    {
        println!("Could not load messages: {error} (/retry)");
        return;
    }
    let peer = peer_name(session, chat_id);
    let skip = transcript.messages.len().saturating_sub(tail);
    if let Some(first) = transcript.messages.first() {
        println!("--- {peer}, since {} ---", view::format_full_time(first.timestamp));
    }
    if skip > 0 {
        println!("... {skip} earlier messages");
    }
    for message in &transcript.messages[skip..] {
        println!("{}", view::message_line(message, &peer));
    }
}

fn print_event(session: &Session<SimulatedService>, config: &ClientConfig, event: &LogEvent) {
    let selected = session.directory().selected_chat_id();
    match event {
        LogEvent::MessagesLoaded { chat_id, .. } if selected.as_ref() == Some(chat_id) => {
            print_transcript(session, chat_id, config.transcript_tail);
        }
        LogEvent::MessageAdded { message } if !message.is_own() => {
            let peer = peer_name(session, &message.chat_id);
            if selected.as_ref() == Some(&message.chat_id) {
                println!("{}", view::message_line(message, &peer));
            } else {
                println!("* {peer}: {}", view::truncate_text(&message.text, config.preview_len));
            }
        }
        LogEvent::StatusChanged {
            chat_id,
            message_id,
            status,
        } if selected.as_ref() == Some(chat_id) => {
            if let Some(message) = session.log().message(chat_id, message_id) {
                println!(
                    "  {} {}",
                    status.symbol(),
                    view::truncate_text(&message.text, config.preview_len)
                );
            }
        }
        LogEvent::FetchFailed { error, .. } => {
            println!("Could not load messages: {error} (/retry)");
        }
        _ => {}
    }
}

fn peer_name(session: &Session<SimulatedService>, chat_id: &ChatId) -> String {
    session
        .directory()
        .chat(chat_id)
        .map_or_else(|| chat_id.to_string(), |c| c.name)
}
