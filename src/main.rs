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

//! Bluetooth Chat terminal application

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bluetooth_chat::bluetooth::{BluezTransport, ConnectionEvent};
use bluetooth_chat::commands::ChatCommand;
use bluetooth_chat::config::Config;
use bluetooth_chat::events::EventProcessor;
use bluetooth_chat::notification::{Notification, Notifier};
use bluetooth_chat::state::AppState;
use bluetooth_chat::storage::History;
use bluetooth_chat::ui::{Console, ConsoleNotifier, Flow};
use bluetooth_chat::{ChatSession, SessionOptions};

/// Chat with one other device over Bluetooth RFCOMM.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bluetooth adapter to use, e.g. hci0
    #[arg(short, long)]
    adapter: Option<String>,

    /// Wait for an incoming connection on startup
    #[arg(short, long, conflicts_with = "connect")]
    serve: bool,

    /// Connect to this device address on startup
    #[arg(long, value_name = "ADDRESS")]
    connect: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they don't interleave with chat output
    let directive = if cli.verbose {
        "bluetooth_chat=debug"
    } else {
        "bluetooth_chat=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    info!("Starting Bluetooth Chat v{}...", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load_from(path)?;
            std::fs::create_dir_all(&config.data_dir)?;
            config
        }
        None => Config::load()?,
    };
    if let Some(adapter) = cli.adapter {
        config.bluetooth.adapter = Some(adapter);
    }
    info!("Configuration loaded");

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let transport = match BluezTransport::new(&config.bluetooth).await {
        Ok(transport) => transport,
        Err(e) => {
            notifier.notify(&Notification::BluetoothNotSupported);
            return Err(e);
        }
    };

    let history = if config.history.enabled {
        Some(History::new(&config.data_dir)?.with_max_entries(config.history.max_entries))
    } else {
        None
    };

    let state = AppState::new(config.display.transcript_limit);
    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<ConnectionEvent>(64);
    let session = ChatSession::new(
        Arc::new(transport),
        state.clone(),
        event_tx,
        SessionOptions::from(&config.bluetooth),
    );

    // Handle connection events
    let mut processor = EventProcessor::new(state.clone(), notifier.clone());
    if let Some(history) = &history {
        processor = processor.with_history(history.clone());
    }
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if let Err(e) = processor.process_event(event).await {
                error!("Error processing event: {}", e);
            }
        }
    });

    let mut console = Console::new(session.clone(), notifier.clone(), std::io::stdout());
    if let Some(history) = history {
        console = console.with_history(history);
    }

    if cli.serve {
        console.execute(ChatCommand::Serve).await?;
    } else if let Some(address) = cli.connect {
        console.execute(ChatCommand::Connect(Some(address))).await?;
    }

    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => match console.handle_line(&line).await {
                        Ok(Flow::Quit) => {
                            info!("Quit requested");
                            break;
                        }
                        Ok(Flow::Continue) => {}
                        Err(e) => error!("Command failed: {:#}", e),
                    },
                    None => {
                        info!("Input closed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    session.shutdown().await;
    info!("Bluetooth Chat stopped");
    Ok(())
}
