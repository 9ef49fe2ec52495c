#![deny(dead_code)] // DO NOT REMOVE THIS EVER
use anyhow::{anyhow, Result};
use clap::Parser;
use log::{debug, error, info, LevelFilter};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

use parley::api::{HttpChatApi, TokenMinter};
use parley::config::{self, Config};
use parley::logging::setup_logging;
use parley::transport::{spawn_hub_connection, HubConfig};
use parley::{ChatClient, ChatEngine, Command, Effect, MessageDraft, NoticeLevel, Preferences, SessionContext, ViewSnapshot};

/// Command line arguments for Parley
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Parley: a terminal client for realtime one-to-one chat.",
    long_about = "Parley keeps a live contact list and conversation in sync with a chat hub.\n\n\
    Settings are read from <config dir>/parley/config.json and PARLEY_* environment variables.\n\
    Use -h or --help to see all options."
)]
struct Args {
    /// Directory holding config.json and the default log file
    #[arg(long, value_name = "PATH")]
    config_dir: Option<PathBuf>,

    /// Log file (default: parley.log in the config directory)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// One of off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: String,

    /// REST endpoint of the chat server
    #[arg(long)]
    api_url: Option<String>,

    /// Websocket endpoint of the realtime hub
    #[arg(long)]
    hub_url: Option<String>,

    /// Persist the effective settings after a successful start
    #[arg(long)]
    save: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(url) = &self.hub_url {
            config.hub_url = url.clone();
        }
    }
}

const HELP: &str = "\
Commands:
  /contacts [filter]     list contacts, newest activity first
  /refresh               fetch the contact list again
  /open <name>           open a conversation by handle or id
  /history               show the open conversation
  /edit <id>             edit one of your messages; the next line replaces its text
  /cancel                stop editing
  /react <id> <emoji>    react to a message
  /delete <id>           delete one of your messages
  /read                  mark the open conversation read
  /image <url> [text]    send an image
  /add <email>           add a contact
  /mute on|off           toggle notification sounds
  /sound <file>          choose the notification sound
  /quit                  leave
Anything else is sent to the open conversation.";

/// Read a line of input from stdin, trimming whitespace
fn read_line() -> Result<String> {
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Ask for whatever the config and environment did not provide.
fn prompt_missing(config: &mut Config) -> Result<bool> {
    let missing = config.missing_fields();
    for field in &missing {
        eprint!("Enter {}: ", field);
        std::io::stderr().flush()?;
        let value = read_line()?;
        match *field {
            "apiUrl" => config.api_url = value,
            "hubUrl" => config.hub_url = value,
            "userId" => config.user_id = value,
            "tokenSecret" => config.set_secret(&value),
            _ => {}
        }
    }
    if !config.missing_fields().is_empty() {
        return Err(anyhow!("Incomplete configuration: {}", config.missing_fields().join(", ")));
    }
    Ok(!missing.is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(dir) = &args.config_dir {
        std::fs::create_dir_all(dir)?;
        config::set_config_dir_override(dir.clone());
    }
    let log_file = match &args.log_file {
        Some(path) => path.clone(),
        None => config::get_config_dir()?.join("parley.log"),
    };
    let level = args.log_level.parse().unwrap_or(LevelFilter::Info);
    setup_logging(log_file.to_str(), level)?;
    info!("Parley starting up on {} {}", std::env::consts::OS, std::env::consts::ARCH);
    info!("Logging to file: {}", log_file.display());

    let mut config = config::load_config()?;
    args.apply(&mut config);
    let prompted = prompt_missing(&mut config)?;
    if prompted || args.save {
        if let Err(e) = config::save_config(&config) {
            eprintln!("Warning: Failed to save config: {}", e);
        }
    }

    let api = HttpChatApi::new(config.api_url.clone(), config.user_id.clone(), TokenMinter::new(config.secret()?));
    let me = config.identity();
    println!("Connecting to {} as {}... type /help for commands\n", config.hub_url, me.handle());

    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    let (effect_tx, effect_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let engine = ChatEngine::new(SessionContext::new(me), intent_tx, effect_tx);
    let hub = spawn_hub_connection(HubConfig::new(config.hub_url.clone()), event_tx, intent_rx);
    let client = tokio::spawn(ChatClient::new(engine, Arc::new(api)).run(command_rx, event_rx));
    tokio::spawn(show_effects(effect_rx, command_tx.clone()));

    if let Err(e) = run_prompt(&command_tx).await {
        error!("Input loop failed: {}", e);
    }
    let _ = command_tx.send(Command::Shutdown);
    let engine = client.await?;
    hub.abort();

    info!("Session ended with {} contacts", engine.directory().len());
    println!("Chat session ended.");
    Ok(())
}

/// Print effects as they arrive. A composer reset also clears our typing state at the peer.
async fn show_effects(mut effects: mpsc::UnboundedReceiver<Effect>, commands: mpsc::UnboundedSender<Command>) {
    while let Some(effect) = effects.recv().await {
        match effect {
            Effect::Notice { level: NoticeLevel::Info, text } => println!("* {}", text),
            Effect::Notice { level: NoticeLevel::Error, text } => eprintln!("! {}", text),
            Effect::NewMessage { from } => println!("* {} sent you a message", from),
            Effect::PlaySound(sound) => {
                debug!("Playing {}", sound);
                print!("\x07");
                let _ = std::io::stdout().flush();
            }
            Effect::ComposerReset => {
                let _ = commands.send(Command::Draft(String::new()));
            }
        }
    }
}

async fn snapshot(commands: &mpsc::UnboundedSender<Command>, query: &str) -> Result<ViewSnapshot> {
    let (reply, rx) = oneshot::channel();
    commands
        .send(Command::Snapshot { query: query.to_string(), reply })
        .map_err(|_| anyhow!("Client stopped"))?;
    Ok(rx.await?)
}

fn print_contacts(view: &ViewSnapshot) {
    if view.contacts.is_empty() {
        println!("No contacts yet. Use /add <email> to add one.");
    }
    for row in &view.contacts {
        let preview = row
            .contact
            .last_message
            .as_ref()
            .map(|m| if m.has_image() { "[image]".to_string() } else { m.text.clone() })
            .unwrap_or_default();
        println!(
            "{} {}{} {}",
            if row.online { "●" } else { "○" },
            row.contact.display_name(),
            if row.unread { " (new)" } else { "" },
            preview
        );
    }
}

fn print_history(view: &ViewSnapshot) {
    let Some(peer) = &view.selected else {
        println!("No conversation open. Use /open <name>.");
        return;
    };
    println!("--- {} ---", peer.display_name());
    for message in &view.timeline {
        let who = if message.sender.id == peer.id { peer.handle() } else { "me" };
        let body = match &message.image {
            Some(url) => format!("[image {}] {}", url, message.text),
            None => message.text.clone(),
        };
        let reaction = message.reaction.as_deref().map(|r| format!(" {}", r)).unwrap_or_default();
        println!(
            "{} [{}] {}: {}{} ({:?})",
            message.created_at.format("%H:%M"),
            message.id,
            who,
            body,
            reaction,
            message.status
        );
    }
    if let Some(typist) = &view.typing.sender {
        println!("{} is typing: {}", typist.handle(), view.typing.message);
    }
    if let Some(editing) = &view.editing {
        println!("(editing {}: {})", editing.id, editing.text);
    }
}

async fn run_prompt(commands: &mpsc::UnboundedSender<Command>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match head {
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{}", HELP);
                continue;
            }
            "/contacts" => {
                print_contacts(&snapshot(commands, rest).await?);
                continue;
            }
            "/history" => {
                print_history(&snapshot(commands, "").await?);
                continue;
            }
            "/refresh" => Command::LoadContacts,
            "/open" => Command::Open(rest.to_string()),
            "/edit" => Command::BeginEdit(rest.to_string()),
            "/cancel" => Command::CancelEdit,
            "/delete" => Command::Delete(rest.to_string()),
            "/read" => Command::MarkRead,
            "/add" => Command::AddContact(rest.to_string()),
            "/react" => {
                let (id, reaction) = rest.split_once(' ').unwrap_or((rest, "👍"));
                Command::React { id: id.to_string(), reaction: reaction.trim().to_string() }
            }
            "/image" => {
                let (url, text) = rest.split_once(' ').unwrap_or((rest, ""));
                Command::Submit(MessageDraft::text(text.trim()).with_image(url))
            }
            "/mute" => Command::UpdatePreferences(Preferences {
                muted: Some(rest != "off"),
                ..Default::default()
            }),
            "/sound" => Command::UpdatePreferences(Preferences {
                notification_sound: Some(rest.to_string()),
                ..Default::default()
            }),
            _ if head.starts_with('/') => {
                eprintln!("Unknown command {}. Type /help.", head);
                continue;
            }
            _ => {
                let _ = commands.send(Command::Draft(line.to_string()));
                Command::Submit(MessageDraft::text(line))
            }
        };

        if commands.send(command).is_err() {
            return Err(anyhow!("Client stopped"));
        }
    }
    Ok(())
}
