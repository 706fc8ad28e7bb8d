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

//! Bluetooth communication module.
//!
//! RFCOMM server and client for the chat service, plus the connection
//! handler shared by both directions.

mod client;
pub mod connection;
pub mod constants;
pub mod decoder;
mod device;
mod server;
mod transport;

pub use connection::{
    ConnectionEvent, ConnectionHandle, ConnectionHandler, DisconnectReason, LinkRole,
    MessageWriter,
};
pub use constants::{READ_BUFFER_SIZE, SERVICE_NAME, SPP_UUID};
pub use decoder::Utf8Decoder;
pub use device::RemoteDevice;
pub use transport::{BluezTransport, BoxedStream, ChatStream, ChatTransport};
