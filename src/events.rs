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

//! Event processing and message dispatch.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::bluetooth::{ConnectionEvent, DisconnectReason, LinkRole};
use crate::notification::{Notification, Notifier};
use crate::state::{AppState, ConnectionStatus, TranscriptEntry, TranscriptKind};
use crate::storage::History;

/// Applies connection events to state, transcript, history and notifications.
pub struct EventProcessor {
    state: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    history: Option<History>,
}

impl EventProcessor {
    /// Create a new event processor.
    pub fn new(state: Arc<AppState>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state,
            notifier,
            history: None,
        }
    }

    /// Record chat messages in `history`.
    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    /// Process a single event.
    pub async fn process_event(&mut self, event: ConnectionEvent) -> Result<()> {
        match &event {
            ConnectionEvent::Listening { service_name } => {
                info!("Waiting for connection on '{}'", service_name);
                self.state.set_status(ConnectionStatus::Listening);
            }
            ConnectionEvent::ServerStopped => {
                if self.state.get_status() == ConnectionStatus::Listening {
                    self.state.set_status(ConnectionStatus::Disconnected);
                }
            }
            ConnectionEvent::Connecting { device } => {
                info!("Connecting to {}", device);
                self.state.set_status(ConnectionStatus::Connecting);
            }
            ConnectionEvent::Connected { peer, role } => {
                info!("Device connected: {} ({:?})", peer, role);
                self.state.set_connected(peer.clone());
                self.notice(format!("Connected to {}", peer.display_name()));
            }
            ConnectionEvent::ConnectFailed { device, reason } => {
                error!("Connection to {} failed: {}", device, reason);
                self.state.set_error();
            }
            ConnectionEvent::MessageReceived { peer, text } => {
                debug!("Message from {}: {} chars", peer.address, text.chars().count());
                self.state
                    .push_transcript(TranscriptEntry::new(TranscriptKind::Received, text.as_str()));
            }
            ConnectionEvent::MessageSent { peer, text } => {
                debug!("Message to {}: {} chars", peer.address, text.chars().count());
                self.state
                    .push_transcript(TranscriptEntry::new(TranscriptKind::Sent, text.as_str()));
            }
            ConnectionEvent::Disconnected { peer, reason } => {
                info!("Device disconnected: {} ({:?})", peer, reason);
                self.state.set_disconnected();
                self.notice(match reason {
                    DisconnectReason::Local => format!("Disconnected from {}", peer.display_name()),
                    _ => "Connection lost".to_string(),
                });
            }
            ConnectionEvent::Error(e) => {
                error!("Connection error: {}", e);
                if self.state.get_status() != ConnectionStatus::Connected {
                    self.state.set_error();
                }
            }
        }

        self.notifier.notify(&Self::notification_for(&event));

        self.record(&event)
    }

    /// Notification shown for an event.
    pub fn notification_for(event: &ConnectionEvent) -> Notification {
        match event {
            ConnectionEvent::Listening { .. } => Notification::StartingServer,
            ConnectionEvent::ServerStopped => Notification::ServerStopped,
            ConnectionEvent::Connecting { device } => {
                Notification::Connecting(device.display_name())
            }
            ConnectionEvent::Connected { peer, role } => match role {
                LinkRole::Server => Notification::ClientConnected(peer.display_name()),
                LinkRole::Client => Notification::ConnectedTo(peer.display_name()),
            },
            ConnectionEvent::ConnectFailed { .. } => Notification::ConnectionFailed,
            ConnectionEvent::MessageReceived { text, .. } => Notification::Received(text.clone()),
            ConnectionEvent::MessageSent { text, .. } => Notification::Sent(text.clone()),
            ConnectionEvent::Disconnected { peer, reason } => match reason {
                DisconnectReason::Local => Notification::Disconnected(peer.display_name()),
                DisconnectReason::Remote | DisconnectReason::Error(_) => {
                    Notification::ConnectionLost
                }
            },
            ConnectionEvent::Error(e) => Notification::Error(e.clone()),
        }
    }

    fn notice(&self, text: String) {
        self.state
            .push_transcript(TranscriptEntry::new(TranscriptKind::Notice, text));
    }

    fn record(&self, event: &ConnectionEvent) -> Result<()> {
        let Some(history) = &self.history else {
            return Ok(());
        };
        match event {
            ConnectionEvent::MessageReceived { peer, text } => {
                history.add_incoming(&peer.display_name(), text)
            }
            ConnectionEvent::MessageSent { peer, text } => {
                history.add_outgoing(&peer.display_name(), text)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::RemoteDevice;
    use bluer::Address;
    use parking_lot::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) {
            self.seen.lock().push(notification.to_string());
        }
    }

    fn peer() -> RemoteDevice {
        RemoteDevice::new(Address::new([9, 8, 7, 6, 5, 4]), Some("Pixel".to_string()))
    }

    #[tokio::test]
    async fn test_connected_and_received() {
        let state = AppState::new(50);
        let notifier = Arc::new(RecordingNotifier::default());
        let mut processor = EventProcessor::new(state.clone(), notifier.clone());

        processor
            .process_event(ConnectionEvent::Connected {
                peer: peer(),
                role: LinkRole::Server,
            })
            .await
            .unwrap();
        processor
            .process_event(ConnectionEvent::MessageReceived {
                peer: peer(),
                text: "hello".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(state.get_status(), ConnectionStatus::Connected);
        assert_eq!(state.get_connected_peer(), Some(peer()));
        assert_eq!(
            *notifier.seen.lock(),
            vec!["Client Connected! (Pixel)".to_string(), "Received: hello".to_string()]
        );

        let transcript: Vec<String> = state
            .recent_transcript(10)
            .iter()
            .map(|e| e.to_string())
            .collect();
        assert_eq!(transcript, vec!["Connected to Pixel", "Received: hello"]);
    }

    #[tokio::test]
    async fn test_remote_disconnect_reports_connection_lost() {
        let state = AppState::new(50);
        let notifier = Arc::new(RecordingNotifier::default());
        let mut processor = EventProcessor::new(state.clone(), notifier.clone());

        state.set_connected(peer());
        processor
            .process_event(ConnectionEvent::Disconnected {
                peer: peer(),
                reason: DisconnectReason::Remote,
            })
            .await
            .unwrap();

        assert_eq!(state.get_status(), ConnectionStatus::Disconnected);
        assert_eq!(*notifier.seen.lock(), vec!["Connection lost".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_connect_sets_error() {
        let state = AppState::new(50);
        let notifier = Arc::new(RecordingNotifier::default());
        let mut processor = EventProcessor::new(state.clone(), notifier.clone());

        processor
            .process_event(ConnectionEvent::Connecting { device: peer() })
            .await
            .unwrap();
        assert_eq!(state.get_status(), ConnectionStatus::Connecting);

        processor
            .process_event(ConnectionEvent::ConnectFailed {
                device: peer(),
                reason: "host is down".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(state.get_status(), ConnectionStatus::Error);
        assert_eq!(
            notifier.seen.lock().last().cloned(),
            Some("Connection failed".to_string())
        );
    }

    #[tokio::test]
    async fn test_messages_recorded_in_history() {
        let dir = tempdir().unwrap();
        let history = History::new(dir.path()).unwrap();
        let state = AppState::new(50);
        let mut processor =
            EventProcessor::new(state, Arc::new(RecordingNotifier::default()))
                .with_history(history.clone());

        processor
            .process_event(ConnectionEvent::MessageSent {
                peer: peer(),
                text: "ping".to_string(),
            })
            .await
            .unwrap();
        processor
            .process_event(ConnectionEvent::MessageReceived {
                peer: peer(),
                text: "pong".to_string(),
            })
            .await
            .unwrap();
        processor
            .process_event(ConnectionEvent::ServerStopped)
            .await
            .unwrap();

        assert_eq!(history.count().unwrap(), 2);
        let recent = history.get_recent(1).unwrap();
        assert_eq!(recent[0].content, "pong");
        assert_eq!(recent[0].peer, "Pixel");
    }
}
