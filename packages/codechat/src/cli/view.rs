//! `codechat view`: the conversation viewer in a terminal.

use anyhow::{Context, Result};
use chat_session::Chat;
use chat_viewer::{BridgeClient, ClientError, Viewer, ViewerState};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  /open <n|id>     open a chat by contact number or id
  /close [<n|id>]  close a tab (default: the active one)
  /tabs            list open tabs
  /contacts        list contacts
  /help            show this help
  /quit            exit
Anything else is sent to the active chat.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewInput {
    Open(String),
    Close(Option<String>),
    Tabs,
    Contacts,
    Help,
    Quit,
    Send(String),
    Empty,
    Invalid(String),
}

pub fn parse_input(line: &str) -> ViewInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ViewInput::Empty;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ViewInput::Send(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (command, None),
    };

    match (name, arg) {
        ("open" | "o", Some(target)) => ViewInput::Open(target.to_string()),
        ("open" | "o", None) => ViewInput::Invalid("usage: /open <n|id>".into()),
        ("close" | "c", target) => ViewInput::Close(target.map(str::to_string)),
        ("tabs", _) => ViewInput::Tabs,
        ("contacts" | "ls", _) => ViewInput::Contacts,
        ("help" | "h" | "?", _) => ViewInput::Help,
        ("quit" | "q" | "exit", _) => ViewInput::Quit,
        (other, _) => ViewInput::Invalid(format!("unknown command: /{other} (try /help)")),
    }
}

/// Resolve a contact number (1-based, as printed by `/contacts`), an exact
/// chat id or a case-insensitive contact name to a chat id. Unknown targets
/// are taken as raw chat ids.
pub fn resolve_target(contacts: &[Chat], target: &str) -> String {
    if let Ok(n) = target.parse::<usize>() {
        if let Some(chat) = n.checked_sub(1).and_then(|i| contacts.get(i)) {
            return chat.id.clone();
        }
    }
    contacts
        .iter()
        .find(|c| c.id == target)
        .or_else(|| contacts.iter().find(|c| c.name.eq_ignore_ascii_case(target)))
        .map(|c| c.id.clone())
        .unwrap_or_else(|| target.to_string())
}

pub fn format_contacts(contacts: &[Chat]) -> String {
    if contacts.is_empty() {
        return "  (no contacts yet)".to_string();
    }
    contacts
        .iter()
        .enumerate()
        .map(|(i, chat)| {
            let mut line = format!("{:>3}. {}", i + 1, chat.name);
            if chat.is_group {
                line.push_str(" [group]");
            }
            if chat.unread_count > 0 {
                line.push_str(&format!(" ({} unread)", chat.unread_count));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_tabs(state: &ViewerState) -> String {
    if state.tabs().is_empty() {
        return "  (no open tabs)".to_string();
    }
    state
        .tabs()
        .iter()
        .map(|id| {
            let marker = if state.active() == Some(id.as_str()) { '*' } else { ' ' };
            let name = state.contact_name(id).unwrap_or(id);
            format!("{marker} {name}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// What to tell the user after a push was applied. `was_challenged` is the
/// challenge visibility before the push.
pub fn push_notice(
    name: &str,
    was_challenged: bool,
    state: &ViewerState,
    base_url: &str,
) -> Option<String> {
    match name {
        "qr" => state.challenge().filter(|_| state.challenge_visible()).map(|image| {
            format!(
                "Login required: scan the code at {base_url}, or paste this into a browser:\n{image}"
            )
        }),
        "ready" => {
            let mut notice = String::new();
            if was_challenged && !state.challenge_visible() {
                notice.push_str("Logged in. ");
            }
            notice.push_str("Contacts:\n");
            notice.push_str(&format_contacts(state.contacts()));
            Some(notice)
        }
        _ => None,
    }
}

fn print_transcript(state: &ViewerState) {
    let title = state
        .active()
        .map(|id| state.contact_name(id).unwrap_or(id))
        .unwrap_or("no chat");
    println!("── {} ──", title);
    println!("{}", state.transcript());
}

/// Connect to the bridge at `url` and run the interactive viewer until
/// `/quit`, end of input, or the bridge closing the push channel.
pub async fn view_command(url: &str) -> Result<()> {
    let client = BridgeClient::new(url).with_context(|| format!("Invalid bridge url {url}"))?;
    let mut pushes = match client.connect_push().await {
        Ok(stream) => stream,
        Err(ClientError::Unavailable) => {
            anyhow::bail!("No bridge is listening at {url}. Start one with `codechat server`.")
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to open push channel")),
    };
    let base_url = client.base_url().to_string();

    let mut viewer = Viewer::new(client);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Connected to {}", base_url);
    println!("{}", viewer.state().transcript());
    println!("{}", HELP);

    loop {
        let shown = viewer.state().transcript().to_string();

        tokio::select! {
            push = pushes.next() => match push {
                Some(Ok(event)) => {
                    let name = event.name();
                    let was_challenged = viewer.state().challenge_visible();
                    viewer.handle_push(event).await;
                    match push_notice(name, was_challenged, viewer.state(), &base_url) {
                        Some(notice) => println!("{}", notice),
                        None => debug!("Push {} handled", name),
                    }
                }
                Some(Err(e)) => warn!("Push channel error: {}", e),
                None => {
                    println!("Bridge closed the push channel.");
                    break;
                }
            },
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match parse_input(&line) {
                    ViewInput::Open(target) => {
                        let chat_id = resolve_target(viewer.state().contacts(), &target);
                        viewer.open_conversation(&chat_id).await;
                    }
                    ViewInput::Close(target) => {
                        let chat_id = match target {
                            Some(t) => Some(resolve_target(viewer.state().contacts(), &t)),
                            None => viewer.state().active().map(str::to_string),
                        };
                        match chat_id {
                            Some(id) => viewer.close_tab(&id).await,
                            None => println!("No tab to close."),
                        }
                    }
                    ViewInput::Tabs => println!("{}", format_tabs(viewer.state())),
                    ViewInput::Contacts => println!("{}", format_contacts(viewer.state().contacts())),
                    ViewInput::Help => println!("{}", HELP),
                    ViewInput::Quit => break,
                    ViewInput::Send(text) => {
                        if viewer.state().active().is_none() {
                            println!("No contact selected. Use /open first.");
                        }
                        viewer.send_message(&text).await;
                    }
                    ViewInput::Empty => {}
                    ViewInput::Invalid(reason) => println!("{}", reason),
                }
            }
        }

        if viewer.state().transcript() != shown {
            print_transcript(viewer.state());
        }
    }

    Ok(())
}
