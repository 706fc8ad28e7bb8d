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

//! Fixed identifiers of the chat service.

use uuid::Uuid;

/// Serial Port Profile UUID, shared by both ends of a chat.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Service name published in the SDP record.
pub const SERVICE_NAME: &str = "BluetoothChat";

/// RFCOMM channel the server listens on unless configured otherwise.
pub const DEFAULT_RFCOMM_CHANNEL: u8 = 1;

/// Highest valid RFCOMM channel.
pub const MAX_RFCOMM_CHANNEL: u8 = 30;

/// Maximum number of bytes taken from the socket per read.
pub const READ_BUFFER_SIZE: usize = 1024;
