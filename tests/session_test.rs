//! Chat session flows over an in-memory transport.

mod common;

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use bluetooth_chat::bluetooth::{ConnectionEvent, DisconnectReason, LinkRole};
use bluetooth_chat::{ChatError, SessionOptions};
use common::{device, eventually, Harness, Outcome};

#[tokio::test]
async fn test_connect_requires_selection() {
    let harness = Harness::new(vec![device(1, "Pixel")]);

    let result = harness.session.connect().await;
    assert!(matches!(result, Err(ChatError::NoDeviceSelected)));

    let result = harness.session.start_connect();
    assert!(matches!(result, Err(ChatError::NoDeviceSelected)));
}

#[tokio::test]
async fn test_no_paired_devices() {
    let harness = Harness::new(vec![]);

    let result = harness.session.list_paired_devices().await;
    assert!(matches!(result, Err(ChatError::NoPairedDevices)));
}

#[tokio::test]
async fn test_select_by_index_address_and_name() {
    let harness = Harness::new(vec![device(1, "Pixel"), device(2, "Galaxy")]);
    let listed = harness.session.list_paired_devices().await.unwrap();
    assert_eq!(listed.len(), 2);

    let selected = harness.session.select_device("2").await.unwrap();
    assert_eq!(selected, device(2, "Galaxy"));

    let selected = harness
        .session
        .select_device("00:11:22:33:44:01")
        .await
        .unwrap();
    assert_eq!(selected, device(1, "Pixel"));

    let selected = harness.session.select_device("galaxy").await.unwrap();
    assert_eq!(selected, device(2, "Galaxy"));
    assert_eq!(harness.state.get_selected_device(), Some(device(2, "Galaxy")));

    // Unlisted addresses are resolved through the transport
    let selected = harness
        .session
        .select_device("AA:BB:CC:DD:EE:FF")
        .await
        .unwrap();
    assert_eq!(selected.name, None);

    assert!(matches!(
        harness.session.select_device("3").await,
        Err(ChatError::UnknownDevice(_))
    ));
    assert!(matches!(
        harness.session.select_device("0").await,
        Err(ChatError::UnknownDevice(_))
    ));
}

#[tokio::test]
async fn test_client_chat_round_trip() {
    let mut harness = Harness::new(vec![device(1, "Pixel")]);
    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();
    let mut remote = harness.expect_connect();

    let peer = harness.session.connect().await.unwrap();
    assert_eq!(peer, device(1, "Pixel"));

    assert_eq!(
        harness.next_event().await,
        ConnectionEvent::Connecting {
            device: device(1, "Pixel")
        }
    );
    assert_eq!(
        harness.next_event().await,
        ConnectionEvent::Connected {
            peer: device(1, "Pixel"),
            role: LinkRole::Client,
        }
    );

    // Outgoing messages are the raw bytes, nothing else
    harness.session.send_message("hello").await.unwrap();
    let mut buf = [0u8; 5];
    remote.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");
    assert_eq!(
        harness.next_event().await,
        ConnectionEvent::MessageSent {
            peer: device(1, "Pixel"),
            text: "hello".to_string(),
        }
    );

    remote.write_all("héllo back".as_bytes()).await.unwrap();
    assert_eq!(
        harness.next_event().await,
        ConnectionEvent::MessageReceived {
            peer: device(1, "Pixel"),
            text: "héllo back".to_string(),
        }
    );
}

#[tokio::test]
async fn test_only_one_connection_at_a_time() {
    let mut harness = Harness::new(vec![device(1, "Pixel")]);
    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();
    let _remote = harness.expect_connect();
    harness.session.connect().await.unwrap();
    harness
        .wait_for(|e| matches!(e, ConnectionEvent::Connected { .. }))
        .await;

    assert!(matches!(
        harness.session.connect().await,
        Err(ChatError::AlreadyConnected(_))
    ));
    assert!(matches!(
        harness.session.start_connect(),
        Err(ChatError::AlreadyConnected(_))
    ));
    assert!(matches!(
        harness.session.start_server().await,
        Err(ChatError::AlreadyConnected(_))
    ));
}

#[tokio::test]
async fn test_remote_close_ends_connection() {
    let mut harness = Harness::new(vec![device(1, "Pixel")]);
    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();
    let remote = harness.expect_connect();
    harness.session.connect().await.unwrap();
    harness
        .wait_for(|e| matches!(e, ConnectionEvent::Connected { .. }))
        .await;

    drop(remote);

    assert_eq!(
        harness
            .wait_for(|e| matches!(e, ConnectionEvent::Disconnected { .. }))
            .await,
        ConnectionEvent::Disconnected {
            peer: device(1, "Pixel"),
            reason: DisconnectReason::Remote,
        }
    );
    let session = harness.session.clone();
    eventually(|| !session.is_connected()).await;
    assert!(matches!(
        harness.session.send_message("anyone?").await,
        Err(ChatError::NotConnected)
    ));

    // A fresh connection may be made once the old one is gone
    let _remote = harness.expect_connect();
    harness.session.connect().await.unwrap();
}

#[tokio::test]
async fn test_send_without_connection() {
    let harness = Harness::new(vec![]);

    assert!(matches!(
        harness.session.send_message("hello").await,
        Err(ChatError::NotConnected)
    ));
    // Empty messages are ignored before the connection is checked
    assert!(harness.session.send_message("").await.is_ok());
}

#[tokio::test]
async fn test_empty_message_writes_nothing() {
    let mut harness = Harness::new(vec![device(1, "Pixel")]);
    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();
    let mut remote = harness.expect_connect();
    harness.session.connect().await.unwrap();

    harness.session.send_message("").await.unwrap();
    harness.session.send_message("x").await.unwrap();

    let mut buf = [0u8; 1];
    remote.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"x");

    let sent = harness
        .wait_for(|e| matches!(e, ConnectionEvent::MessageSent { .. }))
        .await;
    assert_eq!(
        sent,
        ConnectionEvent::MessageSent {
            peer: device(1, "Pixel"),
            text: "x".to_string(),
        }
    );
}

#[tokio::test]
async fn test_server_accepts_single_client() {
    let mut harness = Harness::new(vec![]);

    harness.session.start_server().await.unwrap();
    assert_eq!(
        harness.next_event().await,
        ConnectionEvent::Listening {
            service_name: "BluetoothChat".to_string()
        }
    );
    assert!(harness.session.is_listening());
    assert!(matches!(
        harness.session.start_server().await,
        Err(ChatError::AlreadyListening)
    ));

    let mut remote = harness.incoming(device(7, "Laptop")).await;
    assert_eq!(
        harness.next_event().await,
        ConnectionEvent::Connected {
            peer: device(7, "Laptop"),
            role: LinkRole::Server,
        }
    );

    let session = harness.session.clone();
    eventually(|| !session.is_listening()).await;
    assert_eq!(harness.session.connected_peer(), Some(device(7, "Laptop")));

    remote.write_all(b"ping").await.unwrap();
    assert_eq!(
        harness.next_event().await,
        ConnectionEvent::MessageReceived {
            peer: device(7, "Laptop"),
            text: "ping".to_string(),
        }
    );
}

#[tokio::test]
async fn test_stop_server() {
    let mut harness = Harness::new(vec![]);

    assert!(!harness.session.stop_server().await);

    harness.session.start_server().await.unwrap();
    harness.next_event().await;
    assert!(harness.session.stop_server().await);
    assert_eq!(harness.next_event().await, ConnectionEvent::ServerStopped);
    assert!(!harness.session.is_listening());

    // Can listen again after stopping
    harness.session.start_server().await.unwrap();
}

#[tokio::test]
async fn test_client_connection_cancels_server() {
    let mut harness = Harness::new(vec![device(1, "Pixel")]);
    harness.session.start_server().await.unwrap();
    assert!(harness.session.is_listening());

    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();
    let _remote = harness.expect_connect();
    harness.session.start_connect().unwrap();

    harness
        .wait_for(|e| matches!(e, ConnectionEvent::Connected { .. }))
        .await;
    let session = harness.session.clone();
    eventually(|| !session.is_listening()).await;
    assert!(harness.session.is_connected());
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    let mut harness = Harness::new(vec![device(1, "Pixel")]);
    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();
    harness.expect_outcome(Outcome::Fail("host is down".to_string()));

    let result = harness.session.connect().await;
    assert!(matches!(result, Err(ChatError::Transport(_))));

    let event = harness
        .wait_for(|e| matches!(e, ConnectionEvent::ConnectFailed { .. }))
        .await;
    match event {
        ConnectionEvent::ConnectFailed { device: d, reason } => {
            assert_eq!(d, device(1, "Pixel"));
            assert!(reason.contains("host is down"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(!harness.session.is_connected());
}

#[tokio::test]
async fn test_connect_timeout() {
    let options = SessionOptions {
        connect_timeout: Some(Duration::from_millis(50)),
        ..SessionOptions::default()
    };
    let mut harness = Harness::with_options(vec![device(1, "Pixel")], options);
    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();
    harness.expect_outcome(Outcome::Hang);

    let result = harness.session.connect().await;
    assert!(matches!(result, Err(ChatError::ConnectTimeout { .. })));
    harness
        .wait_for(|e| matches!(e, ConnectionEvent::ConnectFailed { .. }))
        .await;
}

#[tokio::test]
async fn test_local_disconnect() {
    let mut harness = Harness::new(vec![device(1, "Pixel")]);
    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();
    let mut remote = harness.expect_connect();
    harness.session.connect().await.unwrap();

    let peer = harness.session.disconnect().await.unwrap();
    assert_eq!(peer, device(1, "Pixel"));
    assert_eq!(
        harness
            .wait_for(|e| matches!(e, ConnectionEvent::Disconnected { .. }))
            .await,
        ConnectionEvent::Disconnected {
            peer: device(1, "Pixel"),
            reason: DisconnectReason::Local,
        }
    );

    // The peer sees end of stream
    let mut buf = Vec::new();
    remote.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());

    assert!(matches!(
        harness.session.disconnect().await,
        Err(ChatError::NotConnected)
    ));
}

#[tokio::test]
async fn test_shutdown_closes_everything() {
    let mut harness = Harness::new(vec![device(1, "Pixel")]);
    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();
    let mut remote = harness.expect_connect();
    harness.session.connect().await.unwrap();
    harness
        .wait_for(|e| matches!(e, ConnectionEvent::Connected { .. }))
        .await;

    harness.session.shutdown().await;

    assert!(!harness.session.is_connected());
    let mut buf = Vec::new();
    remote.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());
}

#[tokio::test]
async fn test_second_connection_is_closed() {
    let mut harness = Harness::new(vec![device(1, "Pixel")]);
    harness.session.list_paired_devices().await.unwrap();
    harness.session.select_device("1").await.unwrap();

    // Dial out, but hold the connection back until the server has a client
    let (release, mut dialed) = harness.expect_gated_connect();
    harness.session.start_connect().unwrap();
    harness
        .wait_for(|e| matches!(e, ConnectionEvent::Connecting { .. }))
        .await;

    harness.session.start_server().await.unwrap();
    let _accepted = harness.incoming(device(7, "Laptop")).await;
    assert_eq!(
        harness
            .wait_for(|e| matches!(e, ConnectionEvent::Connected { .. }))
            .await,
        ConnectionEvent::Connected {
            peer: device(7, "Laptop"),
            role: LinkRole::Server,
        }
    );

    release.send(()).unwrap();

    let mut connected = 0;
    let message = loop {
        match harness.next_event().await {
            ConnectionEvent::Connected { .. } => connected += 1,
            ConnectionEvent::Error(message) => break message,
            _ => {}
        }
    };
    assert_eq!(connected, 0);
    assert!(message.contains("Pixel"));
    assert!(message.contains("Laptop"));

    // The rejected stream is closed
    let mut buf = Vec::new();
    dialed.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());

    let session = harness.session.clone();
    eventually(|| !session.is_connecting()).await;
    assert_eq!(harness.session.connected_peer(), Some(device(7, "Laptop")));
    while let Ok(event) = harness.events.try_recv() {
        assert!(!matches!(event, ConnectionEvent::Connected { .. }));
    }
}
