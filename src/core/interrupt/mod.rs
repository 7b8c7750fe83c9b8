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

//! Interrupt Controller
//!
//! Manages the I_STAT/I_MASK register pair at 0x1F801070/0x1F801074.
//! Devices raise their line by setting the matching I_STAT bit; the
//! CPU sees the wire as COP0 Cause.IP2 whenever `(I_STAT & I_MASK)`
//! is non-zero. Writing I_STAT acknowledges: `I_STAT &= written`.
//!
//! ## Interrupt Sources (bit positions)
//!
//! ```text
//! Bit  | Source
//! -----|--------------------
//! 0    | VBLANK
//! 1    | GPU
//! 2    | CDROM
//! 3    | DMA
//! 4    | TIMER0
//! 5    | TIMER1
//! 6    | TIMER2
//! 7    | CONTROLLER_MEMCARD
//! 8    | SIO
//! 9    | SPU
//! 10   | LIGHTPEN
//! ```

use crate::core::error::Result;
use crate::core::state::StateBuffer;

/// Interrupt source bit flags for I_STAT and I_MASK
pub mod interrupts {
    /// Vertical blank (bit 0)
    pub const VBLANK: u16 = 1 << 0;
    /// GPU command interrupt (bit 1)
    pub const GPU: u16 = 1 << 1;
    /// CD-ROM controller (bit 2)
    pub const CDROM: u16 = 1 << 2;
    /// DMA transfer complete (bit 3)
    pub const DMA: u16 = 1 << 3;
    /// Timer 0 (bit 4)
    pub const TIMER0: u16 = 1 << 4;
    /// Timer 1 (bit 5)
    pub const TIMER1: u16 = 1 << 5;
    /// Timer 2 (bit 6)
    pub const TIMER2: u16 = 1 << 6;
    /// Controller / memory card ACK (bit 7)
    pub const CONTROLLER_MEMCARD: u16 = 1 << 7;
    /// Serial port (bit 8)
    pub const SIO: u16 = 1 << 8;
    /// Sound processing unit (bit 9)
    pub const SPU: u16 = 1 << 9;
    /// Lightpen / PIO (bit 10)
    pub const LIGHTPEN: u16 = 1 << 10;
}

/// Interrupt Controller
///
/// # Example
///
/// ```
/// use rogem::core::interrupt::{interrupts, InterruptController};
///
/// let mut ic = InterruptController::new();
/// ic.request(interrupts::VBLANK);
/// ic.write_mask(interrupts::VBLANK as u32);
/// assert!(ic.is_pending());
///
/// // Acknowledge: write 0 to the bit to clear
/// ic.write_status(!interrupts::VBLANK as u32);
/// assert!(!ic.is_pending());
/// ```
pub struct InterruptController {
    /// I_STAT - pending interrupt lines
    status: u16,

    /// I_MASK - which lines reach the CPU
    mask: u16,
}

impl InterruptController {
    /// Create a controller with all lines cleared and masked
    pub fn new() -> Self {
        Self { status: 0, mask: 0 }
    }

    /// Raise interrupt line(s)
    ///
    /// Called by devices; multiple bits may be ORed together.
    pub fn request(&mut self, interrupt: u16) {
        self.status |= interrupt;
        log::trace!(
            "IRQ requested: 0x{:04X}, status=0x{:04X}",
            interrupt,
            self.status
        );
    }

    /// Whether any unmasked line is active
    pub fn is_pending(&self) -> bool {
        (self.status & self.mask) != 0
    }

    /// Read I_STAT
    pub fn read_status(&self) -> u32 {
        self.status as u32
    }

    /// Write I_STAT (acknowledge)
    ///
    /// Bits written as 0 are cleared; bits written as 1 keep their
    /// current value.
    pub fn write_status(&mut self, value: u32) {
        self.status &= value as u16;
        log::trace!("IRQ acknowledged, status=0x{:04X}", self.status);
    }

    /// Read I_MASK
    pub fn read_mask(&self) -> u32 {
        self.mask as u32
    }

    /// Write I_MASK
    pub fn write_mask(&mut self, value: u32) {
        self.mask = value as u16;
        log::debug!("IRQ mask set: 0x{:04X}", self.mask);
    }

    /// Halfword lane read: offset from I_STAT (0, 2, 4, 6)
    pub fn read_lane16(&self, offset: u32) -> u16 {
        match offset {
            0 => self.status,
            2 => 0,
            4 => self.mask,
            6 => 0,
            _ => 0,
        }
    }

    /// Halfword lane write
    pub fn write_lane16(&mut self, offset: u32, value: u16) {
        match offset {
            0 => self.status &= value,
            4 => self.mask = value,
            // upper halves of both registers are fixed zero
            2 | 6 => {}
            _ => {}
        }
    }

    /// Byte lane read: offset from I_STAT (0-7)
    pub fn read_lane8(&self, offset: u32) -> u8 {
        match offset {
            0 => self.status as u8,
            1 => (self.status >> 8) as u8,
            4 => self.mask as u8,
            5 => (self.mask >> 8) as u8,
            _ => 0,
        }
    }

    /// Byte lane write
    ///
    /// Acknowledging through a byte lane leaves the other lane's bits
    /// unchanged.
    pub fn write_lane8(&mut self, offset: u32, value: u8) {
        match offset {
            0 => self.status &= (value as u16) | 0xFF00,
            1 => self.status &= ((value as u16) << 8) | 0x00FF,
            4 => self.mask = (self.mask & 0xFF00) | value as u16,
            5 => self.mask = (self.mask & 0x00FF) | ((value as u16) << 8),
            _ => {}
        }
    }

    /// Serialize I_STAT and I_MASK
    pub fn serialize(&self, buf: &mut StateBuffer) {
        buf.write_u16(self.status);
        buf.write_u16(self.mask);
    }

    /// Restore I_STAT and I_MASK
    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        self.status = buf.read_u16()?;
        self.mask = buf.read_u16()?;
        Ok(())
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_sets_status() {
        let mut ic = InterruptController::new();
        ic.request(interrupts::CDROM);
        assert_eq!(ic.read_status(), interrupts::CDROM as u32);
    }

    #[test]
    fn test_masked_interrupt_not_pending() {
        let mut ic = InterruptController::new();
        ic.request(interrupts::VBLANK);
        assert!(!ic.is_pending());

        ic.write_mask(interrupts::VBLANK as u32);
        assert!(ic.is_pending());
    }

    #[test]
    fn test_acknowledge_is_and_write() {
        let mut ic = InterruptController::new();
        ic.request(interrupts::VBLANK | interrupts::TIMER0);

        ic.write_status(!interrupts::VBLANK as u32);
        assert_eq!(ic.read_status(), interrupts::TIMER0 as u32);

        // writing 1-bits does not set anything
        ic.write_status(0xFFFF);
        assert_eq!(ic.read_status(), interrupts::TIMER0 as u32);
    }

    #[test]
    fn test_byte_lane_acknowledge() {
        let mut ic = InterruptController::new();
        ic.request(interrupts::SIO | interrupts::VBLANK);

        // Clear only the low byte's VBLANK bit; SIO (bit 8) survives
        ic.write_lane8(0, !(interrupts::VBLANK as u8));
        assert_eq!(ic.read_status(), interrupts::SIO as u32);
    }

    #[test]
    fn test_byte_lane_mask_write() {
        let mut ic = InterruptController::new();
        ic.write_lane8(4, 0x80);
        ic.write_lane8(5, 0x01);
        assert_eq!(ic.read_mask(), 0x0180);
    }

    #[test]
    fn test_halfword_lanes() {
        let mut ic = InterruptController::new();
        ic.write_lane16(4, 0x7FF);
        assert_eq!(ic.read_lane16(4), 0x7FF);
        assert_eq!(ic.read_lane16(2), 0);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut ic = InterruptController::new();
        ic.request(interrupts::DMA | interrupts::SPU);
        ic.write_mask(0x3F);

        let mut buf = StateBuffer::new();
        ic.serialize(&mut buf);

        let mut restored = InterruptController::new();
        let mut buf = StateBuffer::from_bytes(buf.into_bytes());
        restored.deserialize(&mut buf).unwrap();

        assert_eq!(restored.read_status(), ic.read_status());
        assert_eq!(restored.read_mask(), 0x3F);
    }
}
