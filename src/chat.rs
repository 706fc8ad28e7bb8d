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

//! Chat session: the controller between user actions and the transport.
//!
//! At most one connection is open at a time, whichever side established
//! it. The server accepts a single client per start; a client connection
//! cancels a pending server.

use bluer::Address;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bluetooth::{
    BoxedStream, ChatTransport, ConnectionEvent, ConnectionHandle, ConnectionHandler,
    DisconnectReason, LinkRole, RemoteDevice,
};
use crate::config::BluetoothConfig;
use crate::error::{ChatError, ChatResult};
use crate::state::AppState;

/// Tunables for a chat session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Service name reported while listening.
    pub service_name: String,
    /// Bytes taken from the socket per read.
    pub read_buffer_size: usize,
    /// Abort dialing after this long.
    pub connect_timeout: Option<Duration>,
}

impl From<&BluetoothConfig> for SessionOptions {
    fn from(config: &BluetoothConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            read_buffer_size: config.read_buffer_size,
            connect_timeout: match config.connect_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&BluetoothConfig::default())
    }
}

/// Two-device chat over a single connection.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    state: Arc<AppState>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    options: SessionOptions,
    active: Mutex<Option<ConnectionHandle>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    connect_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSession {
    /// Create a new chat session.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        state: Arc<AppState>,
        event_tx: mpsc::Sender<ConnectionEvent>,
        options: SessionOptions,
    ) -> Arc<Self> {
        info!("Chat session using {} transport", transport.backend_name());
        Arc::new(Self {
            transport,
            state,
            event_tx,
            options,
            active: Mutex::new(None),
            accept_task: Mutex::new(None),
            connect_task: Mutex::new(None),
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Peer of the open connection, if any.
    pub fn connected_peer(&self) -> Option<RemoteDevice> {
        self.active
            .lock()
            .as_ref()
            .filter(|c| c.is_open())
            .map(|c| c.peer().clone())
    }

    pub fn is_connected(&self) -> bool {
        self.connected_peer().is_some()
    }

    /// Whether the server is waiting for a client.
    pub fn is_listening(&self) -> bool {
        task_running(&self.accept_task)
    }

    /// Whether a background connect is running.
    pub fn is_connecting(&self) -> bool {
        task_running(&self.connect_task)
    }

    /// List devices bonded with the adapter and remember them for selection.
    pub async fn list_paired_devices(&self) -> ChatResult<Vec<RemoteDevice>> {
        let devices = self.transport.paired_devices().await?;
        info!("Found {} paired devices", devices.len());

        self.state.set_paired_devices(devices.clone());
        if devices.is_empty() {
            return Err(ChatError::NoPairedDevices);
        }
        Ok(devices)
    }

    /// Select the connect target.
    ///
    /// `selector` is a 1-based index into the last listing, a Bluetooth
    /// address, or the exact name of a listed device.
    pub async fn select_device(&self, selector: &str) -> ChatResult<RemoteDevice> {
        let selector = selector.trim();
        let listed = self.state.get_paired_devices();

        let device = if let Ok(index) = selector.parse::<usize>() {
            index
                .checked_sub(1)
                .and_then(|i| listed.get(i).cloned())
                .ok_or_else(|| ChatError::UnknownDevice(selector.to_string()))?
        } else if let Ok(address) = selector.parse::<Address>() {
            match listed.iter().find(|d| d.address == address) {
                Some(device) => device.clone(),
                None => self.transport.resolve(address).await?,
            }
        } else {
            listed
                .iter()
                .find(|d| {
                    d.name
                        .as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case(selector))
                })
                .cloned()
                .ok_or_else(|| ChatError::UnknownDevice(selector.to_string()))?
        };

        info!("Selected device: {}", device);
        self.state.select_device(device.clone());
        Ok(device)
    }

    /// Dial the selected device and install the connection.
    pub async fn connect(&self) -> ChatResult<RemoteDevice> {
        let device = self
            .state
            .get_selected_device()
            .ok_or(ChatError::NoDeviceSelected)?;
        if let Some(peer) = self.connected_peer() {
            return Err(ChatError::AlreadyConnected(peer));
        }

        self.emit(ConnectionEvent::Connecting {
            device: device.clone(),
        })
        .await;

        let result = match self.options.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.transport.connect(&device)).await
            {
                Ok(result) => result.map_err(ChatError::from),
                Err(_) => Err(ChatError::ConnectTimeout {
                    device: device.clone(),
                    secs: limit.as_secs(),
                }),
            },
            None => self.transport.connect(&device).await.map_err(ChatError::from),
        };

        match result {
            Ok(stream) => {
                self.install(stream, device.clone(), LinkRole::Client)
                    .await?;
                Ok(device)
            }
            Err(e) => {
                error!("Connection failed: {}", e);
                self.emit(ConnectionEvent::ConnectFailed {
                    device,
                    reason: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    /// Run [`connect`](Self::connect) in the background.
    ///
    /// Preconditions are checked before returning so the caller sees them.
    pub fn start_connect(self: &Arc<Self>) -> ChatResult<()> {
        if self.state.get_selected_device().is_none() {
            return Err(ChatError::NoDeviceSelected);
        }
        if let Some(peer) = self.connected_peer() {
            return Err(ChatError::AlreadyConnected(peer));
        }

        let mut slot = self.connect_task.lock();
        if slot.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(ChatError::ConnectInProgress);
        }

        let session = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            if let Err(e) = session.connect().await {
                debug!("Background connect ended: {}", e);
            }
        }));
        Ok(())
    }

    /// Wait for one inbound connection in the background.
    pub async fn start_server(self: &Arc<Self>) -> ChatResult<()> {
        if let Some(peer) = self.connected_peer() {
            return Err(ChatError::AlreadyConnected(peer));
        }
        if self.is_listening() {
            return Err(ChatError::AlreadyListening);
        }

        self.emit(ConnectionEvent::Listening {
            service_name: self.options.service_name.clone(),
        })
        .await;

        let mut slot = self.accept_task.lock();
        if slot.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(ChatError::AlreadyListening);
        }
        let session = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            session.accept_once().await;
        }));
        Ok(())
    }

    /// Cancel a pending server. Returns whether one was running.
    pub async fn stop_server(&self) -> bool {
        let task = self.accept_task.lock().take();
        match task {
            Some(task) if !task.is_finished() => {
                task.abort();
                info!("Server stopped");
                self.emit(ConnectionEvent::ServerStopped).await;
                true
            }
            _ => false,
        }
    }

    /// Send a message over the open connection.
    ///
    /// Empty messages are ignored.
    pub async fn send_message(&self, text: &str) -> ChatResult<()> {
        if text.is_empty() {
            return Ok(());
        }

        let (writer, peer) = {
            let active = self.active.lock();
            match active.as_ref().filter(|c| c.is_open()) {
                Some(connection) => (connection.writer(), connection.peer().clone()),
                None => return Err(ChatError::NotConnected),
            }
        };

        if let Err(e) = writer.write_message(text).await {
            error!("Error sending data: {}", e);
            return Err(ChatError::SendFailed(e));
        }
        debug!("Sent {} bytes to {}", text.len(), peer.address);

        self.emit(ConnectionEvent::MessageSent {
            peer,
            text: text.to_string(),
        })
        .await;
        Ok(())
    }

    /// Close the open connection.
    pub async fn disconnect(&self) -> ChatResult<RemoteDevice> {
        let connection = self.active.lock().take();
        match connection {
            Some(connection) if connection.is_open() => {
                let peer = connection.peer().clone();
                connection.close().await;
                self.emit(ConnectionEvent::Disconnected {
                    peer: peer.clone(),
                    reason: DisconnectReason::Local,
                })
                .await;
                Ok(peer)
            }
            _ => Err(ChatError::NotConnected),
        }
    }

    /// Cancel background work and close the connection.
    pub async fn shutdown(&self) {
        for slot in [&self.accept_task, &self.connect_task] {
            if let Some(task) = slot.lock().take() {
                task.abort();
            }
        }

        let connection = self.active.lock().take();
        if let Some(connection) = connection {
            connection.close().await;
        }
        info!("Chat session stopped");
    }

    async fn accept_once(&self) {
        match self.transport.accept().await {
            Ok((stream, peer)) => {
                info!("Client connected: {}", peer);
                if let Err(e) = self.install(stream, peer, LinkRole::Server).await {
                    warn!("Dropped incoming connection: {}", e);
                }
            }
            Err(e) => {
                error!("Socket accept() failed: {:#}", e);
                self.emit(ConnectionEvent::Error(format!(
                    "Socket accept() failed: {}",
                    e
                )))
                .await;
            }
        }
    }

    /// Start the read loop for `stream` unless a connection is already open.
    ///
    /// `Connected` comes from the read task; a rejected stream is dropped.
    async fn install(
        &self,
        stream: BoxedStream,
        peer: RemoteDevice,
        role: LinkRole,
    ) -> ChatResult<()> {
        let handler = ConnectionHandler::new(
            stream,
            peer.clone(),
            role,
            self.options.read_buffer_size,
            self.event_tx.clone(),
        );

        let rejected = {
            let mut active = self.active.lock();
            let current = active
                .as_ref()
                .filter(|c| c.is_open())
                .map(|c| c.peer().clone());
            match current {
                Some(current) => Some((current, handler)),
                None => {
                    *active = Some(handler.spawn());
                    None
                }
            }
        };

        if let Some((existing, handler)) = rejected {
            drop(handler);
            warn!(
                "Closed connection from {}: already connected to {}",
                peer, existing
            );
            self.emit(ConnectionEvent::Error(format!(
                "Rejected connection from {}: already connected to {}",
                peer.display_name(),
                existing.display_name()
            )))
            .await;
            return Err(ChatError::AlreadyConnected(existing));
        }

        if role == LinkRole::Client {
            if let Some(task) = self.accept_task.lock().take() {
                if !task.is_finished() {
                    info!("Connected as client, stopping server");
                    task.abort();
                }
            }
        }

        info!("Connection to {} installed as {:?}", peer, role);
        Ok(())
    }

    async fn emit(&self, event: ConnectionEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}

fn task_running(slot: &Mutex<Option<JoinHandle<()>>>) -> bool {
    slot.lock().as_ref().is_some_and(|t| !t.is_finished())
}
