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

//! RFCOMM connect routine.

use anyhow::{anyhow, bail, Context, Result};
use bluer::rfcomm::{Profile, ReqError, Role, SocketAddr, Stream};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::BluetoothConfig;

/// Build the client profile used to reach the chat service on a peer.
pub fn client_profile(config: &BluetoothConfig) -> Profile {
    Profile {
        uuid: config.service_uuid,
        name: Some(config.service_name.clone()),
        role: Some(Role::Client),
        require_authentication: Some(false),
        require_authorization: Some(false),
        auto_connect: Some(false),
        ..Default::default()
    }
}

/// Connect to the chat service on `address`.
///
/// With `peer_channel` configured the channel is dialed directly; otherwise
/// BlueZ resolves the channel through SDP using the service UUID.
pub async fn connect(
    session: &Session,
    adapter: &Adapter,
    config: &BluetoothConfig,
    address: Address,
) -> Result<Stream> {
    if let Some(channel) = config.peer_channel {
        info!("Dialing {} on RFCOMM channel {}", address, channel);
        let stream = Stream::connect(SocketAddr::new(address, channel))
            .await
            .with_context(|| format!("Connection to {} failed", address))?;
        return Ok(stream);
    }

    let mut handle = session
        .register_profile(client_profile(config))
        .await
        .context("failed to register client profile")?;

    let device = adapter.device(address)?;
    let uuid = config.service_uuid;
    info!("Connecting to {} ({})", address, uuid);

    let mut connect = tokio::spawn(async move { device.connect_profile(&uuid).await });
    let mut connect_done = false;

    loop {
        tokio::select! {
            result = &mut connect, if !connect_done => {
                connect_done = true;
                match result {
                    Ok(Ok(())) => debug!("Profile connect returned for {}", address),
                    Ok(Err(e)) => bail!("Connection to {} failed: {}", address, e),
                    Err(e) => bail!("Connect task failed: {}", e),
                }
            }
            request = handle.next() => {
                let request = request.ok_or_else(|| anyhow!("Bluetooth client profile closed"))?;
                if request.device() != address {
                    warn!("Rejecting unexpected connection from {}", request.device());
                    request.reject(ReqError::Rejected);
                    continue;
                }
                let stream = request
                    .accept()
                    .with_context(|| format!("Connection to {} failed", address))?;
                info!("Connected to {}", address);
                return Ok(stream);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_profile_role() {
        let config = BluetoothConfig::default();
        let profile = client_profile(&config);

        assert!(matches!(profile.role, Some(Role::Client)));
        assert_eq!(profile.uuid, config.service_uuid);
        assert_eq!(profile.channel, None);
    }
}
