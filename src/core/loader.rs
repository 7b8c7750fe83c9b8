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

//! PSX-EXE sidecar executable loader
//!
//! The 2 KiB header carries the entry PC, initial GP, RAM destination,
//! body length and the stack base/offset; the body follows at offset
//! 0x800 and is copied verbatim into RAM.

use crate::core::error::{EmulatorError, Result};
use std::fs;
use std::path::Path;

/// Header magic at offset 0
const MAGIC: &[u8; 8] = b"PS-X EXE";

/// Size of the header block preceding the body
const HEADER_SIZE: usize = 0x800;

/// A parsed PSX-EXE image
pub struct PsxExe {
    /// Entry point PC
    pub initial_pc: u32,
    /// Initial global pointer (GP/R28)
    pub initial_gp: u32,
    /// RAM address the body is copied to
    pub ram_destination: u32,
    /// Initial stack base (SP/FP); 0 means "leave the BIOS default"
    pub initial_sp_base: u32,
    /// Offset added to the stack base
    pub initial_sp_offset: u32,
    /// Executable body
    pub body: Vec<u8>,
}

impl PsxExe {
    /// Parse a PSX-EXE image from bytes
    ///
    /// # Errors
    ///
    /// [`EmulatorError::LoaderError`] when the magic is wrong, the
    /// header is truncated, or the body length runs past the file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(EmulatorError::LoaderError(format!(
                "file too small for a PSX-EXE header ({} bytes)",
                data.len()
            )));
        }
        if &data[0..8] != MAGIC {
            return Err(EmulatorError::LoaderError(
                "missing PS-X EXE magic".to_string(),
            ));
        }

        let word = |offset: usize| {
            u32::from_le_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ])
        };

        let initial_pc = word(0x10);
        let initial_gp = word(0x14);
        let ram_destination = word(0x18);
        let body_len = word(0x1C) as usize;
        let initial_sp_base = word(0x30);
        let initial_sp_offset = word(0x34);

        if HEADER_SIZE + body_len > data.len() {
            return Err(EmulatorError::LoaderError(format!(
                "body length {} exceeds file size {}",
                body_len,
                data.len()
            )));
        }

        Ok(Self {
            initial_pc,
            initial_gp,
            ram_destination,
            initial_sp_base,
            initial_sp_offset,
            body: data[HEADER_SIZE..HEADER_SIZE + body_len].to_vec(),
        })
    }

    /// Load a PSX-EXE from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref()).map_err(|e| {
            EmulatorError::LoaderError(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::parse(&data)
    }

    /// Initial SP/FP value, or None to keep the BIOS default
    pub fn stack_pointer(&self) -> Option<u32> {
        if self.initial_sp_base == 0 {
            None
        } else {
            Some(self.initial_sp_base.wrapping_add(self.initial_sp_offset))
        }
    }
}
