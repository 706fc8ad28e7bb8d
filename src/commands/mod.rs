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

//! Console command parsing.
//!
//! Maps input lines to chat actions. Lines that are not commands are chat
//! messages.

use std::path::PathBuf;

/// Help text listing every command.
pub const HELP: &str = "\
Commands:
  /devices              list paired devices (alias /scan)
  /select <n|address>   choose the device to connect to
  /connect [n|address]  connect to the selected device
  /serve                wait for one incoming connection (alias /listen)
  /stop                 stop waiting for a connection
  /disconnect           close the current connection
  /status               show connection status
  /history [n]          show the last n messages (default 20)
  /search <text>        search message history
  /export <path>        write message history to a file
  /clear-history        delete message history
  /help                 show this help
  /quit                 exit (alias /exit)
Any other line is sent to the peer. Start a line with // to send a leading /.";

/// Default number of history lines shown by `/history`.
pub const DEFAULT_HISTORY_LINES: u32 = 20;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// List paired devices.
    Devices,
    /// Select a device by list index or address.
    Select(String),
    /// Connect, optionally selecting a device first.
    Connect(Option<String>),
    /// Start the RFCOMM server.
    Serve,
    /// Cancel a pending server.
    StopServer,
    /// Close the connection.
    Disconnect,
    /// Show status.
    Status,
    /// Show recent history.
    History(u32),
    /// Search history.
    Search(String),
    /// Export history.
    Export(PathBuf),
    /// Delete history.
    ClearHistory,
    /// Show help.
    Help,
    /// Exit.
    Quit,
    /// Send a chat message.
    Send(String),
    /// Known command with missing or bad arguments.
    Usage(&'static str),
    /// Unrecognized command.
    Unknown(String),
}

impl ChatCommand {
    /// Parse a console line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return None;
        }

        if let Some(literal) = line.strip_prefix("//") {
            return Some(Self::Send(format!("/{}", literal)));
        }

        let Some(command_line) = line.strip_prefix('/') else {
            return Some(Self::Send(line.to_string()));
        };

        let command_line = command_line.trim();
        let (name, arg) = match command_line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command_line, ""),
        };
        let arg = (!arg.is_empty()).then(|| arg.to_string());

        let command = match name.to_lowercase().as_str() {
            "devices" | "scan" => Self::Devices,
            "select" => match arg {
                Some(selector) => Self::Select(selector),
                None => Self::Usage("/select <n|address>"),
            },
            "connect" => Self::Connect(arg),
            "serve" | "listen" => Self::Serve,
            "stop" => Self::StopServer,
            "disconnect" => Self::Disconnect,
            "status" => Self::Status,
            "history" => match arg {
                None => Self::History(DEFAULT_HISTORY_LINES),
                Some(n) => match n.parse::<u32>() {
                    Ok(n) if n > 0 => Self::History(n),
                    _ => Self::Usage("/history [n]"),
                },
            },
            "search" => match arg {
                Some(query) => Self::Search(query),
                None => Self::Usage("/search <text>"),
            },
            "export" => match arg {
                Some(path) => Self::Export(PathBuf::from(path)),
                None => Self::Usage("/export <path>"),
            },
            "clear-history" => Self::ClearHistory,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        };

        Some(command)
    }
}
