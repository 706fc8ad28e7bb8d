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

//! Individual chat connection: read loop and writer.

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::decoder::Utf8Decoder;
use super::device::RemoteDevice;
use super::transport::BoxedStream;

/// Which side established the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// We accepted the connection.
    Server,
    /// We dialed the peer.
    Client,
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Closed on request of the local user.
    Local,
    /// The peer closed the stream.
    Remote,
    /// The stream failed.
    Error(String),
}

/// Events emitted by the chat session and its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Server is waiting for a client.
    Listening { service_name: String },
    /// Server stopped waiting without a client.
    ServerStopped,
    /// Dialing a device.
    Connecting { device: RemoteDevice },
    /// Connection established.
    Connected { peer: RemoteDevice, role: LinkRole },
    /// Dialing a device failed.
    ConnectFailed { device: RemoteDevice, reason: String },
    /// Text arrived from the peer.
    MessageReceived { peer: RemoteDevice, text: String },
    /// Text was written to the peer.
    MessageSent { peer: RemoteDevice, text: String },
    /// Connection closed.
    Disconnected {
        peer: RemoteDevice,
        reason: DisconnectReason,
    },
    /// Error occurred.
    Error(String),
}

/// Shared write half of a connection.
#[derive(Clone)]
pub struct MessageWriter {
    inner: Arc<Mutex<WriteHalf<BoxedStream>>>,
}

impl MessageWriter {
    fn new(writer: WriteHalf<BoxedStream>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write the raw UTF-8 bytes of `text`.
    pub async fn write_message(&self, text: &str) -> io::Result<()> {
        let mut writer = self.inner.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await
    }

    async fn shutdown(&self) -> io::Result<()> {
        self.inner.lock().await.shutdown().await
    }
}

/// Handle to a running connection.
pub struct ConnectionHandle {
    peer: RemoteDevice,
    role: LinkRole,
    writer: MessageWriter,
    reader: JoinHandle<()>,
}

impl ConnectionHandle {
    pub fn peer(&self) -> &RemoteDevice {
        &self.peer
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    /// Whether the read loop is still running.
    pub fn is_open(&self) -> bool {
        !self.reader.is_finished()
    }

    pub fn writer(&self) -> MessageWriter {
        self.writer.clone()
    }

    /// Stop reading and shut down the write half.
    pub async fn close(self) {
        self.reader.abort();
        if let Err(e) = self.writer.shutdown().await {
            debug!("Error closing socket: {}", e);
        }
        info!("Connection to {} closed", self.peer);
    }
}

/// Handler for a single chat connection.
pub struct ConnectionHandler {
    stream: BoxedStream,
    peer: RemoteDevice,
    role: LinkRole,
    buffer_size: usize,
    event_tx: mpsc::Sender<ConnectionEvent>,
}

impl ConnectionHandler {
    /// Create a new connection handler.
    pub fn new(
        stream: BoxedStream,
        peer: RemoteDevice,
        role: LinkRole,
        buffer_size: usize,
        event_tx: mpsc::Sender<ConnectionEvent>,
    ) -> Self {
        Self {
            stream,
            peer,
            role,
            buffer_size: buffer_size.max(1),
            event_tx,
        }
    }

    /// Split the stream and start the read loop.
    ///
    /// The read task announces `Connected` before anything it reads.
    pub fn spawn(self) -> ConnectionHandle {
        let (reader, writer) = tokio::io::split(self.stream);

        let reader = tokio::spawn(Self::read_loop(
            reader,
            self.peer.clone(),
            self.role,
            self.buffer_size,
            self.event_tx,
        ));

        ConnectionHandle {
            peer: self.peer,
            role: self.role,
            writer: MessageWriter::new(writer),
            reader,
        }
    }

    async fn read_loop(
        mut reader: ReadHalf<BoxedStream>,
        peer: RemoteDevice,
        role: LinkRole,
        buffer_size: usize,
        event_tx: mpsc::Sender<ConnectionEvent>,
    ) {
        debug!("Connection handler started for {}", peer);
        let _ = event_tx
            .send(ConnectionEvent::Connected {
                peer: peer.clone(),
                role,
            })
            .await;

        let mut buf = vec![0u8; buffer_size];
        let mut decoder = Utf8Decoder::new();

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    if let Some(text) = decoder.finish() {
                        let _ = event_tx
                            .send(ConnectionEvent::MessageReceived {
                                peer: peer.clone(),
                                text,
                            })
                            .await;
                    }
                    info!("Connection closed by remote");
                    let _ = event_tx
                        .send(ConnectionEvent::Disconnected {
                            peer,
                            reason: DisconnectReason::Remote,
                        })
                        .await;
                    break;
                }
                Ok(n) => {
                    let text = decoder.decode(&buf[..n]);
                    if text.is_empty() {
                        continue;
                    }
                    debug!("Received {} bytes from {}", n, peer.address);
                    let _ = event_tx
                        .send(ConnectionEvent::MessageReceived {
                            peer: peer.clone(),
                            text,
                        })
                        .await;
                }
                Err(e) => {
                    error!("Connection lost: {}", e);
                    let _ = event_tx
                        .send(ConnectionEvent::Disconnected {
                            peer,
                            reason: DisconnectReason::Error(e.to_string()),
                        })
                        .await;
                    break;
                }
            }
        }
    }
}
