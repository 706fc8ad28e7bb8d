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

//! Errors returned by chat session operations.

use thiserror::Error;

use crate::bluetooth::RemoteDevice;

/// Failures of user-triggered chat operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no device selected")]
    NoDeviceSelected,

    #[error("no paired devices found")]
    NoPairedDevices,

    #[error("unknown device: {0}")]
    UnknownDevice(String),

    #[error("already connected to {0}")]
    AlreadyConnected(RemoteDevice),

    #[error("server is already waiting for a connection")]
    AlreadyListening,

    #[error("a connection attempt is already in progress")]
    ConnectInProgress,

    #[error("not connected")]
    NotConnected,

    #[error("connection to {device} timed out after {secs}s")]
    ConnectTimeout { device: RemoteDevice, secs: u64 },

    #[error("error sending message: {0}")]
    SendFailed(#[from] std::io::Error),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
