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

//! Two-device chat over Bluetooth RFCOMM.
//!
//! One side publishes the chat service and accepts a single client, the
//! other dials a paired device. Messages are the raw UTF-8 bytes of each
//! send; whatever arrives on a read is shown as text.

pub mod bluetooth;
pub mod chat;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod notification;
pub mod state;
pub mod storage;
pub mod ui;

pub use chat::{ChatSession, SessionOptions};
pub use error::{ChatError, ChatResult};
