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

//! Application state management.

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::bluetooth::RemoteDevice;

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Listening,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Listening => "Waiting for connection...",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error => "Error",
        }
    }
}

/// Kind of transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptKind {
    Received,
    Sent,
    Notice,
}

/// One line of the on-screen message transcript.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub timestamp: DateTime<Local>,
    pub kind: TranscriptKind,
    pub text: String,
}

impl TranscriptEntry {
    pub fn new(kind: TranscriptKind, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TranscriptKind::Received => write!(f, "Received: {}", self.text),
            TranscriptKind::Sent => write!(f, "Sent: {}", self.text),
            TranscriptKind::Notice => write!(f, "{}", self.text),
        }
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Current connection status.
    pub connection_status: RwLock<ConnectionStatus>,

    /// Devices from the last paired-device listing.
    pub paired_devices: RwLock<Vec<RemoteDevice>>,

    /// Device chosen as connect target.
    pub selected_device: RwLock<Option<RemoteDevice>>,

    /// Peer of the open connection.
    pub connected_peer: RwLock<Option<RemoteDevice>>,

    /// Recent messages, oldest first.
    pub transcript: RwLock<VecDeque<TranscriptEntry>>,

    transcript_limit: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_transcript_limit(500)
    }
}

impl AppState {
    pub fn new(transcript_limit: usize) -> Arc<Self> {
        Arc::new(Self::with_transcript_limit(transcript_limit))
    }

    fn with_transcript_limit(transcript_limit: usize) -> Self {
        Self {
            connection_status: RwLock::new(ConnectionStatus::Disconnected),
            paired_devices: RwLock::new(Vec::new()),
            selected_device: RwLock::new(None),
            connected_peer: RwLock::new(None),
            transcript: RwLock::new(VecDeque::new()),
            transcript_limit: transcript_limit.max(1),
        }
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        *self.connection_status.write() = status;
    }

    pub fn get_status(&self) -> ConnectionStatus {
        *self.connection_status.read()
    }

    pub fn set_connected(&self, peer: RemoteDevice) {
        *self.connection_status.write() = ConnectionStatus::Connected;
        *self.connected_peer.write() = Some(peer);
    }

    pub fn set_disconnected(&self) {
        *self.connection_status.write() = ConnectionStatus::Disconnected;
        *self.connected_peer.write() = None;
    }

    pub fn set_error(&self) {
        *self.connection_status.write() = ConnectionStatus::Error;
    }

    pub fn get_connected_peer(&self) -> Option<RemoteDevice> {
        self.connected_peer.read().clone()
    }

    pub fn set_paired_devices(&self, devices: Vec<RemoteDevice>) {
        *self.paired_devices.write() = devices;
    }

    pub fn get_paired_devices(&self) -> Vec<RemoteDevice> {
        self.paired_devices.read().clone()
    }

    pub fn select_device(&self, device: RemoteDevice) {
        *self.selected_device.write() = Some(device);
    }

    pub fn get_selected_device(&self) -> Option<RemoteDevice> {
        self.selected_device.read().clone()
    }

    /// Append a transcript line, dropping the oldest past the limit.
    pub fn push_transcript(&self, entry: TranscriptEntry) {
        let mut transcript = self.transcript.write();
        transcript.push_back(entry);
        while transcript.len() > self.transcript_limit {
            transcript.pop_front();
        }
    }

    /// Most recent `limit` transcript lines, oldest first.
    pub fn recent_transcript(&self, limit: usize) -> Vec<TranscriptEntry> {
        let transcript = self.transcript.read();
        let skip = transcript.len().saturating_sub(limit);
        transcript.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluer::Address;

    #[test]
    fn test_connect_and_disconnect() {
        let state = AppState::new(10);
        let peer = RemoteDevice::new(Address::new([1, 1, 1, 1, 1, 1]), None);

        state.set_connected(peer.clone());
        assert_eq!(state.get_status(), ConnectionStatus::Connected);
        assert_eq!(state.get_connected_peer(), Some(peer));

        state.set_disconnected();
        assert_eq!(state.get_status(), ConnectionStatus::Disconnected);
        assert_eq!(state.get_connected_peer(), None);
    }

    #[test]
    fn test_transcript_is_bounded() {
        let state = AppState::new(3);
        for i in 0..5 {
            state.push_transcript(TranscriptEntry::new(TranscriptKind::Received, i.to_string()));
        }

        let lines: Vec<String> = state
            .recent_transcript(10)
            .iter()
            .map(|e| e.text.clone())
            .collect();
        assert_eq!(lines, vec!["2", "3", "4"]);

        let last = state.recent_transcript(1);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].to_string(), "Received: 4");
    }
}
