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

//! Error types for the emulator core
//!
//! Host-facing failures only. Guest CPU exceptions (Overflow, address
//! errors, Syscall, ...) are architectural behavior and never surface
//! as an [`EmulatorError`]; they mutate COP0 and PC instead.

use thiserror::Error;

/// Result type alias used throughout the core
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Emulator error type
///
/// Covers the fatal initialization failures and explicit host-facing
/// statuses of the core. Recoverable guest misbehavior (unmapped
/// access, unknown device commands) is logged, not returned.
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// BIOS file could not be opened
    #[error("BIOS file not found: {0}")]
    BiosNotFound(String),

    /// BIOS file has the wrong size (must be exactly 512 KiB)
    #[error("invalid BIOS size: expected {expected} bytes, got {got}")]
    InvalidBiosSize { expected: usize, got: usize },

    /// Access to an address no device claims
    #[error("invalid memory access at 0x{address:08X}")]
    InvalidMemoryAccess { address: u32 },

    /// Halfword or word access on a misaligned address
    #[error("unaligned {size}-byte access at 0x{address:08X}")]
    UnalignedAccess { address: u32, size: u32 },

    /// PSX-EXE loading failure (bad magic, truncated body, ...)
    #[error("loader error: {0}")]
    LoaderError(String),

    /// CD-ROM subsystem failure (disc image missing, short read, ...)
    #[error("CD-ROM error: {0}")]
    CdRom(String),

    /// Save-state buffer exhausted or otherwise malformed
    #[error("save state error: {0}")]
    SaveState(String),

    /// Save-state file carries an unknown magic number
    #[error("save state magic mismatch: expected 0x{expected:08X}, got 0x{got:08X}")]
    SaveStateMagic { expected: u32, got: u32 },

    /// Save-state file carries an unsupported version
    #[error("save state version mismatch: expected {expected}, got {got}")]
    SaveStateVersion { expected: u32, got: u32 },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_bios_not_found() {
        let err = EmulatorError::BiosNotFound("scph1001.bin".to_string());
        assert!(err.to_string().contains("scph1001.bin"));
    }

    #[test]
    fn test_error_display_invalid_bios_size() {
        let err = EmulatorError::InvalidBiosSize {
            expected: 524_288,
            got: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("524288"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn test_error_display_unaligned() {
        let err = EmulatorError::UnalignedAccess {
            address: 0x8000_0001,
            size: 4,
        };
        assert!(err.to_string().contains("80000001"));
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EmulatorError = io.into();
        assert!(matches!(err, EmulatorError::Io(_)));
    }
}
