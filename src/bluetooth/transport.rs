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

//! Transport abstraction over the Bluetooth stack.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bluer::{Adapter, Address, Session};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::device::RemoteDevice;
use super::{client, server};
use crate::config::BluetoothConfig;

/// A connected, bidirectional byte stream.
pub trait ChatStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ChatStream for T {}

/// Type-erased chat stream.
pub type BoxedStream = Box<dyn ChatStream>;

/// Trait for the link layer used by a chat session.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Get the backend name (e.g., "BlueZ").
    fn backend_name(&self) -> &'static str;

    /// Devices bonded with the local adapter.
    async fn paired_devices(&self) -> Result<Vec<RemoteDevice>>;

    /// Look up a device by address, paired or not.
    async fn resolve(&self, address: Address) -> Result<RemoteDevice>;

    /// Wait for a single inbound connection.
    ///
    /// The listener is closed before this returns.
    async fn accept(&self) -> Result<(BoxedStream, RemoteDevice)>;

    /// Open an outbound connection to the chat service on `device`.
    async fn connect(&self, device: &RemoteDevice) -> Result<BoxedStream>;
}

/// Transport backed by BlueZ over D-Bus.
pub struct BluezTransport {
    session: Session,
    adapter: Adapter,
    config: BluetoothConfig,
}

impl BluezTransport {
    /// Open a BlueZ session and prepare the adapter.
    pub async fn new(config: &BluetoothConfig) -> Result<Self> {
        info!("Initializing Bluetooth transport...");

        let session = Session::new()
            .await
            .context("failed to open BlueZ session")?;
        debug!("BlueZ session created");

        let adapter = match &config.adapter {
            Some(name) => session
                .adapter(name)
                .with_context(|| format!("Bluetooth adapter '{}' not found", name))?,
            None => session
                .default_adapter()
                .await
                .map_err(|e| anyhow!("Bluetooth not supported: {}", e))?,
        };
        info!("Using Bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        if config.discoverable {
            adapter.set_discoverable(true).await?;
            adapter.set_pairable(true).await?;
            info!("Adapter is discoverable and pairable");
        }

        info!("Local address: {}", adapter.address().await?);

        Ok(Self {
            session,
            adapter,
            config: config.clone(),
        })
    }

    async fn device_name(&self, address: Address) -> Option<String> {
        let device = self.adapter.device(address).ok()?;
        match device.alias().await {
            Ok(alias) => Some(alias),
            Err(_) => device.name().await.ok().flatten(),
        }
    }
}

#[async_trait]
impl ChatTransport for BluezTransport {
    fn backend_name(&self) -> &'static str {
        "BlueZ"
    }

    async fn paired_devices(&self) -> Result<Vec<RemoteDevice>> {
        let mut devices = Vec::new();

        for address in self.adapter.device_addresses().await? {
            let device = self.adapter.device(address)?;
            match device.is_paired().await {
                Ok(true) => {
                    let name = self.device_name(address).await;
                    devices.push(RemoteDevice::new(address, name));
                }
                Ok(false) => {}
                Err(e) => warn!("Could not query device {}: {}", address, e),
            }
        }

        devices.sort_by_key(|d| d.display_name().to_lowercase());
        Ok(devices)
    }

    async fn resolve(&self, address: Address) -> Result<RemoteDevice> {
        Ok(RemoteDevice::new(address, self.device_name(address).await))
    }

    async fn accept(&self) -> Result<(BoxedStream, RemoteDevice)> {
        let (stream, address) = server::accept_one(&self.session, &self.config).await?;
        let peer = self.resolve(address).await?;
        Ok((Box::new(stream), peer))
    }

    async fn connect(&self, device: &RemoteDevice) -> Result<BoxedStream> {
        let stream =
            client::connect(&self.session, &self.adapter, &self.config, device.address).await?;
        Ok(Box::new(stream))
    }
}
