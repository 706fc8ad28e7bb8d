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

//! Transient user-facing notifications.

use std::fmt;

use crate::error::ChatError;

/// A short message shown to the user once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    BluetoothNotSupported,
    NoPairedDevices,
    DeviceSelected(String),
    NoDeviceSelected,
    UnknownDevice(String),
    Connecting(String),
    ConnectedTo(String),
    ConnectionFailed,
    StartingServer,
    ServerStopped,
    ClientConnected(String),
    AlreadyConnected(String),
    AlreadyListening,
    ConnectInProgress,
    Received(String),
    Sent(String),
    NotConnected,
    SendFailed,
    ConnectionLost,
    Disconnected(String),
    Error(String),
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BluetoothNotSupported => write!(f, "Bluetooth not supported"),
            Self::NoPairedDevices => write!(f, "No paired devices found"),
            Self::DeviceSelected(name) => write!(f, "Selected: {}", name),
            Self::NoDeviceSelected => write!(f, "No device selected!"),
            Self::UnknownDevice(selector) => write!(f, "Unknown device: {}", selector),
            Self::Connecting(name) => write!(f, "Connecting to {}...", name),
            Self::ConnectedTo(name) => write!(f, "Connected to {}", name),
            Self::ConnectionFailed => write!(f, "Connection failed"),
            Self::StartingServer => write!(f, "Starting server..."),
            Self::ServerStopped => write!(f, "Server stopped"),
            Self::ClientConnected(name) => write!(f, "Client Connected! ({})", name),
            Self::AlreadyConnected(name) => write!(f, "Already connected to {}", name),
            Self::AlreadyListening => write!(f, "Server already waiting for a connection"),
            Self::ConnectInProgress => write!(f, "Already connecting..."),
            Self::Received(text) => write!(f, "Received: {}", text),
            Self::Sent(text) => write!(f, "Sent: {}", text),
            Self::NotConnected => write!(f, "Not connected"),
            Self::SendFailed => write!(f, "Error sending message"),
            Self::ConnectionLost => write!(f, "Connection lost"),
            Self::Disconnected(name) => write!(f, "Disconnected from {}", name),
            Self::Error(e) => write!(f, "Error: {}", e),
        }
    }
}

impl From<&ChatError> for Notification {
    fn from(error: &ChatError) -> Self {
        match error {
            ChatError::NoDeviceSelected => Self::NoDeviceSelected,
            ChatError::NoPairedDevices => Self::NoPairedDevices,
            ChatError::UnknownDevice(selector) => Self::UnknownDevice(selector.clone()),
            ChatError::AlreadyConnected(peer) => Self::AlreadyConnected(peer.display_name()),
            ChatError::AlreadyListening => Self::AlreadyListening,
            ChatError::ConnectInProgress => Self::ConnectInProgress,
            ChatError::NotConnected => Self::NotConnected,
            ChatError::ConnectTimeout { .. } => Self::ConnectionFailed,
            ChatError::SendFailed(_) => Self::SendFailed,
            ChatError::Transport(e) => Self::Error(e.to_string()),
        }
    }
}

/// Sink for notifications (console, tests).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}
