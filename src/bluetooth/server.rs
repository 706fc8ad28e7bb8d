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

//! RFCOMM accept routine.
//!
//! Publishes the chat service through a BlueZ server profile, takes the
//! first incoming connection and closes the listener.

use anyhow::{anyhow, Context, Result};
use bluer::rfcomm::{Profile, Role, Stream};
use bluer::{Address, Session};
use futures::StreamExt;
use tracing::{debug, error, info};

use crate::config::BluetoothConfig;

/// Build the server profile published for the chat service.
pub fn server_profile(config: &BluetoothConfig) -> Profile {
    Profile {
        uuid: config.service_uuid,
        name: Some(config.service_name.clone()),
        role: Some(Role::Server),
        channel: Some(u16::from(config.channel)),
        require_authentication: Some(false),
        require_authorization: Some(false),
        ..Default::default()
    }
}

/// Wait for one client and return its stream.
///
/// The profile handle is dropped on return, which unregisters the SDP
/// record and stops further connections.
pub async fn accept_one(session: &Session, config: &BluetoothConfig) -> Result<(Stream, Address)> {
    let mut handle = session
        .register_profile(server_profile(config))
        .await
        .context("Socket listen() failed")?;
    info!(
        "RFCOMM server '{}' ({}) listening on channel {}",
        config.service_name, config.service_uuid, config.channel
    );

    debug!("Waiting for connection...");
    let request = handle
        .next()
        .await
        .ok_or_else(|| anyhow!("Bluetooth server profile closed"))?;

    let address = request.device();
    let stream = match request.accept() {
        Ok(stream) => stream,
        Err(e) => {
            error!("Socket accept() failed: {}", e);
            return Err(anyhow!("Socket accept() failed: {}", e));
        }
    };
    info!("Client connected: {}", address);

    drop(handle);
    debug!("Server profile unregistered");

    Ok((stream, address))
}
