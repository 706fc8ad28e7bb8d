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

//! Remote device description.

use bluer::Address;
use std::fmt;

/// A remote Bluetooth device known by address and, when available, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDevice {
    pub address: Address,
    pub name: Option<String>,
}

impl RemoteDevice {
    /// Create a device entry.
    pub fn new(address: Address, name: Option<String>) -> Self {
        Self { address, name }
    }

    /// Name shown to the user, falling back to the address.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.address.to_string(),
        }
    }

    /// Two-line list entry: name on the first line, address on the second.
    pub fn list_label(&self) -> String {
        format!("{}\n{}", self.display_name(), self.address)
    }
}

impl fmt::Display for RemoteDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if !name.trim().is_empty() => write!(f, "{} [{}]", name, self.address),
            _ => write!(f, "{}", self.address),
        }
    }
}
