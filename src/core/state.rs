// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 rogem contributors
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

//! Save-state byte buffer
//!
//! A little-endian append/consume buffer. Every serializable component
//! writes its fields in a fixed order; deserialization reads them back
//! in the same order. There is no per-field tagging: the layout itself
//! is the format.

use crate::core::error::{EmulatorError, Result};

/// Little-endian save-state buffer
///
/// # Example
///
/// ```
/// use rogem::core::state::StateBuffer;
///
/// let mut buf = StateBuffer::new();
/// buf.write_u32(0xCAFEBABE);
/// buf.write_u8(7);
///
/// let mut buf = StateBuffer::from_bytes(buf.into_bytes());
/// assert_eq!(buf.read_u32().unwrap(), 0xCAFEBABE);
/// assert_eq!(buf.read_u8().unwrap(), 7);
/// ```
pub struct StateBuffer {
    data: Vec<u8>,
    cursor: usize,
}

impl StateBuffer {
    /// Create an empty buffer for writing
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            cursor: 0,
        }
    }

    /// Wrap an existing byte vector for reading
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, cursor: 0 }
    }

    /// Consume the buffer and return the written bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn take(&mut self, count: usize) -> Result<&[u8]> {
        if self.cursor + count > self.data.len() {
            return Err(EmulatorError::SaveState(format!(
                "read past end of buffer (cursor {}, want {}, len {})",
                self.cursor,
                count,
                self.data.len()
            )));
        }
        let slice = &self.data[self.cursor..self.cursor + count];
        self.cursor += count;
        Ok(slice)
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Booleans are stored as a single byte (0 or 1)
    pub fn write_bool(&mut self, value: bool) {
        self.data.push(value as u8);
    }

    /// Byte slices are stored with a u32 length prefix
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.data.extend_from_slice(bytes);
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.take(1)?[0] != 0)
    }

    /// Read a length-prefixed byte vector
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a length-prefixed byte vector into an existing slice
    ///
    /// The stored length must match the slice length exactly.
    pub fn read_bytes_into(&mut self, out: &mut [u8]) -> Result<()> {
        let len = self.read_u32()? as usize;
        if len != out.len() {
            return Err(EmulatorError::SaveState(format!(
                "byte block length mismatch: stored {}, expected {}",
                len,
                out.len()
            )));
        }
        out.copy_from_slice(self.take(len)?);
        Ok(())
    }
}

impl Default for StateBuffer {
    fn default() -> Self {
        Self::new()
    }
}
