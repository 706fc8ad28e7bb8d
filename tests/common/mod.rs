//! In-memory transport shared by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bluer::Address;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{duplex, DuplexStream};
use tokio::sync::{mpsc, oneshot};

use bluetooth_chat::bluetooth::{BoxedStream, ChatTransport, ConnectionEvent, RemoteDevice};
use bluetooth_chat::notification::{Notification, Notifier};
use bluetooth_chat::state::AppState;
use bluetooth_chat::{ChatSession, SessionOptions};

/// What the next outbound `connect` does.
pub enum Outcome {
    Connect(DuplexStream),
    /// Connect once the gate is released.
    Gated(oneshot::Receiver<()>, DuplexStream),
    Fail(String),
    Hang,
}

pub struct FakeTransport {
    paired: Vec<RemoteDevice>,
    outbound: Mutex<VecDeque<Outcome>>,
    inbound: tokio::sync::Mutex<mpsc::Receiver<(DuplexStream, RemoteDevice)>>,
}

#[async_trait]
impl ChatTransport for FakeTransport {
    fn backend_name(&self) -> &'static str {
        "fake"
    }

    async fn paired_devices(&self) -> Result<Vec<RemoteDevice>> {
        Ok(self.paired.clone())
    }

    async fn resolve(&self, address: Address) -> Result<RemoteDevice> {
        Ok(RemoteDevice::new(address, None))
    }

    async fn accept(&self) -> Result<(BoxedStream, RemoteDevice)> {
        let (stream, peer) = self
            .inbound
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| anyhow!("listener closed"))?;
        Ok((Box::new(stream), peer))
    }

    async fn connect(&self, device: &RemoteDevice) -> Result<BoxedStream> {
        let outcome = self.outbound.lock().pop_front();
        match outcome {
            Some(Outcome::Connect(stream)) => Ok(Box::new(stream)),
            Some(Outcome::Gated(gate, stream)) => {
                gate.await.map_err(|_| anyhow!("gate dropped"))?;
                Ok(Box::new(stream))
            }
            Some(Outcome::Fail(reason)) => Err(anyhow!("{}: {}", device.address, reason)),
            Some(Outcome::Hang) => std::future::pending().await,
            None => Err(anyhow!("no route to {}", device.address)),
        }
    }
}

/// Handles a test keeps to drive the fake transport.
pub struct Harness {
    pub session: Arc<ChatSession>,
    pub state: Arc<AppState>,
    pub events: mpsc::Receiver<ConnectionEvent>,
    pub transport: Arc<FakeTransport>,
    pub inbound: mpsc::Sender<(DuplexStream, RemoteDevice)>,
}

impl Harness {
    pub fn new(paired: Vec<RemoteDevice>) -> Self {
        Self::with_options(paired, SessionOptions::default())
    }

    pub fn with_options(paired: Vec<RemoteDevice>, options: SessionOptions) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(4);
        let transport = Arc::new(FakeTransport {
            paired,
            outbound: Mutex::new(VecDeque::new()),
            inbound: tokio::sync::Mutex::new(inbound_rx),
        });
        let state = AppState::new(100);
        let (event_tx, events) = mpsc::channel(64);
        let session = ChatSession::new(transport.clone(), state.clone(), event_tx, options);

        Self {
            session,
            state,
            events,
            transport,
            inbound: inbound_tx,
        }
    }

    /// Queue an outbound connection and return the peer's end of it.
    pub fn expect_connect(&self) -> DuplexStream {
        let (local, remote) = duplex(4096);
        self.transport
            .outbound
            .lock()
            .push_back(Outcome::Connect(local));
        remote
    }

    /// Queue an outbound connection that completes on `release`.
    pub fn expect_gated_connect(&self) -> (oneshot::Sender<()>, DuplexStream) {
        let (local, remote) = duplex(4096);
        let (release, gate) = oneshot::channel();
        self.expect_outcome(Outcome::Gated(gate, local));
        (release, remote)
    }

    pub fn expect_outcome(&self, outcome: Outcome) {
        self.transport.outbound.lock().push_back(outcome);
    }

    /// Deliver an inbound connection from `peer` and return its end.
    pub async fn incoming(&self, peer: RemoteDevice) -> DuplexStream {
        let (local, remote) = duplex(4096);
        self.inbound.send((local, peer)).await.unwrap();
        remote
    }

    pub async fn next_event(&mut self) -> ConnectionEvent {
        tokio::time::timeout(Duration::from_secs(2), self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    /// Skip events until one matches.
    pub async fn wait_for<F>(&mut self, mut matches: F) -> ConnectionEvent
    where
        F: FnMut(&ConnectionEvent) -> bool,
    {
        loop {
            let event = self.next_event().await;
            if matches(&event) {
                return event;
            }
        }
    }
}

pub fn device(last: u8, name: &str) -> RemoteDevice {
    RemoteDevice::new(
        Address::new([0x00, 0x11, 0x22, 0x33, 0x44, last]),
        Some(name.to_string()),
    )
}

/// Notifier that keeps rendered notifications.
#[derive(Default)]
pub struct RecordingNotifier {
    pub seen: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().push(notification.to_string());
    }
}

/// Wait until `condition` holds or fail after a second.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}
