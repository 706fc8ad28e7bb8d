// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Line-oriented terminal front end.

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::bluetooth::RemoteDevice;
use crate::chat::ChatSession;
use crate::commands::{ChatCommand, HELP};
use crate::error::ChatError;
use crate::notification::{Notification, Notifier};
use crate::storage::{format_entry, History};

/// Prints notifications to stdout.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        match notification {
            Notification::Received(_) | Notification::Sent(_) => println!("{}", notification),
            _ => println!("* {}", notification),
        }
    }
}

/// Whether the input loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Dispatches console commands to the chat session.
pub struct Console<W: Write> {
    session: Arc<ChatSession>,
    notifier: Arc<dyn Notifier>,
    history: Option<History>,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(session: Arc<ChatSession>, notifier: Arc<dyn Notifier>, out: W) -> Self {
        Self {
            session,
            notifier,
            history: None,
            out,
        }
    }

    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Parse and run one input line.
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match ChatCommand::parse(line) {
            Some(command) => self.execute(command).await,
            None => Ok(Flow::Continue),
        }
    }

    /// Run a parsed command.
    pub async fn execute(&mut self, command: ChatCommand) -> Result<Flow> {
        debug!("Console command: {:?}", command);

        match command {
            ChatCommand::Devices => match self.session.list_paired_devices().await {
                Ok(devices) => self.print_devices(&devices)?,
                Err(e) => self.report(&e),
            },
            ChatCommand::Select(selector) => match self.session.select_device(&selector).await {
                Ok(device) => self
                    .notifier
                    .notify(&Notification::DeviceSelected(device.display_name())),
                Err(e) => self.report(&e),
            },
            ChatCommand::Connect(selector) => {
                if let Some(selector) = selector {
                    if let Err(e) = self.session.select_device(&selector).await {
                        self.report(&e);
                        return Ok(Flow::Continue);
                    }
                }
                if let Err(e) = self.session.start_connect() {
                    self.report(&e);
                }
            }
            ChatCommand::Serve => {
                if let Err(e) = self.session.start_server().await {
                    self.report(&e);
                }
            }
            ChatCommand::StopServer => {
                if !self.session.stop_server().await {
                    writeln!(self.out, "Server is not running")?;
                }
            }
            ChatCommand::Disconnect => {
                if let Err(e) = self.session.disconnect().await {
                    self.report(&e);
                }
            }
            ChatCommand::Status => self.print_status()?,
            ChatCommand::History(_)
            | ChatCommand::Search(_)
            | ChatCommand::Export(_)
            | ChatCommand::ClearHistory => {
                if let Err(e) = self.run_history(command) {
                    error!("History command failed: {:#}", e);
                    self.notifier.notify(&Notification::Error(e.to_string()));
                }
            }
            ChatCommand::Help => writeln!(self.out, "{}", HELP)?,
            ChatCommand::Quit => return Ok(Flow::Quit),
            ChatCommand::Send(text) => {
                if let Err(e) = self.session.send_message(&text).await {
                    self.report(&e);
                }
            }
            ChatCommand::Usage(usage) => writeln!(self.out, "Usage: {}", usage)?,
            ChatCommand::Unknown(name) => {
                writeln!(self.out, "Unknown command: /{} (try /help)", name)?
            }
        }

        Ok(Flow::Continue)
    }

    fn run_history(&mut self, command: ChatCommand) -> Result<()> {
        let Some(history) = &self.history else {
            writeln!(self.out, "History is disabled")?;
            return Ok(());
        };

        match command {
            ChatCommand::History(limit) => {
                let entries = history.get_recent(limit)?;
                if entries.is_empty() {
                    writeln!(self.out, "No messages yet")?;
                }
                for entry in entries.iter().rev() {
                    writeln!(self.out, "{}", format_entry(entry))?;
                }
            }
            ChatCommand::Search(query) => {
                let entries = history.search(&query, 50)?;
                writeln!(self.out, "{} matches for '{}'", entries.len(), query)?;
                for entry in entries.iter().rev() {
                    writeln!(self.out, "{}", format_entry(entry))?;
                }
            }
            ChatCommand::Export(path) => {
                let count = history
                    .export(&path)
                    .with_context(|| format!("Could not export to {}", path.display()))?;
                writeln!(self.out, "Exported {} messages to {}", count, path.display())?;
            }
            ChatCommand::ClearHistory => {
                history.clear()?;
                writeln!(self.out, "History cleared")?;
            }
            _ => {}
        }
        Ok(())
    }

    fn report(&self, error: &ChatError) {
        debug!("Command failed: {}", error);
        self.notifier.notify(&Notification::from(error));
    }

    fn print_devices(&mut self, devices: &[RemoteDevice]) -> Result<()> {
        writeln!(self.out, "Paired devices:")?;
        for (i, device) in devices.iter().enumerate() {
            writeln!(
                self.out,
                "  {}. {} ({})",
                i + 1,
                device.display_name(),
                device.address
            )?;
        }
        Ok(())
    }

    fn print_status(&mut self) -> Result<()> {
        let state = self.session.state();
        writeln!(self.out, "Status: {}", state.get_status().as_str())?;
        match self.session.connected_peer() {
            Some(peer) => writeln!(self.out, "Peer: {}", peer)?,
            None => writeln!(self.out, "Peer: none")?,
        }
        match state.get_selected_device() {
            Some(device) => writeln!(self.out, "Selected: {}", device)?,
            None => writeln!(self.out, "Selected: none")?,
        }
        let server = if self.session.is_listening() {
            "waiting for a connection"
        } else {
            "idle"
        };
        writeln!(self.out, "Server: {}", server)?;
        if let Some(history) = &self.history {
            match history.count() {
                Ok(count) => writeln!(self.out, "Stored messages: {}", count)?,
                Err(e) => warn!("Could not count history: {}", e),
            }
        }
        Ok(())
    }
}
