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

//! Serial interface (SIO0) and the pad ports
//!
//! Writing TX_DATA shifts a byte to the selected pad; the pad's reply
//! latches into RX_DATA immediately and an ACK interrupt
//! (CONTROLLER_MEMCARD) follows roughly 100 cycles later. SIO1 is not
//! wired to anything.

mod pad;

pub use pad::{Buttons, DigitalPad};

use crate::core::error::Result;
use crate::core::state::StateBuffer;

/// SIO register window base (JOY_DATA)
const SIO_BASE: u32 = 0x1F80_1040;

/// Cycles from a TX_DATA write to the ACK interrupt
const ACK_IRQ_DELAY: i64 = 100;

/// SIO0 controller/memory-card interface
pub struct SerialInterface {
    /// Latched reply from the last exchange
    rx_data: u16,

    mode: u16,
    ctrl: u16,
    baud: u16,

    /// Countdown to the ACK interrupt; inactive at 0
    ack_timer: i64,

    /// Edge-triggered CONTROLLER_MEMCARD line
    irq_line: bool,

    /// The two pad ports
    pads: [DigitalPad; 2],
}

impl SerialInterface {
    /// Create the interface with a pad in port 1
    pub fn new() -> Self {
        let mut serial = Self {
            rx_data: 0xFFFF,
            mode: 0,
            ctrl: 0,
            baud: 0,
            ack_timer: 0,
            irq_line: false,
            pads: [DigitalPad::new(), DigitalPad::new()],
        };
        serial.pads[0].connect();
        serial
    }

    pub fn reset(&mut self) {
        self.rx_data = 0xFFFF;
        self.mode = 0;
        self.ctrl = 0;
        self.baud = 0;
        self.ack_timer = 0;
        self.irq_line = false;
        for pad in &mut self.pads {
            pad.reset();
        }
        self.pads[0].connect();
    }

    /// Pad port selected by CTRL bit 13
    fn selected_port(&self) -> usize {
        ((self.ctrl >> 13) & 1) as usize
    }

    /// Read an SIO register (halfword granularity)
    pub fn read16(&mut self, paddr: u32) -> u16 {
        let offset = paddr - SIO_BASE;

        // SIO1 window (0x1F801050-0x1F80105F): nothing attached
        if offset & 0x10 != 0 {
            log::debug!("SIO1 read at 0x{:08X} unhandled", paddr);
            return 0x7;
        }

        match offset & 0xF {
            // JOY_RX_DATA
            0x0 => self.rx_data,
            // JOY_STAT: TX ready, RX available
            0x4 => 0x07,
            0x8 => self.mode,
            0xA => self.ctrl,
            0xE => self.baud,
            _ => {
                log::warn!("SIO0 read at unknown offset 0x{:X}", offset);
                0
            }
        }
    }

    /// Write an SIO register (halfword granularity)
    pub fn write16(&mut self, paddr: u32, value: u16) {
        let offset = paddr - SIO_BASE;

        if offset & 0x10 != 0 {
            log::debug!("SIO1 write 0x{:04X} at 0x{:08X} unhandled", value, paddr);
            return;
        }

        match offset & 0xF {
            // JOY_TX_DATA: exchange one byte with the selected pad
            0x0 => {
                let port = self.selected_port();
                self.pads[port].tx(value as u8);
                self.rx_data = self.pads[port].rx();
                self.ack_timer = ACK_IRQ_DELAY;
            }
            0x8 => self.mode = value,
            0xA => self.ctrl = value,
            0xE => self.baud = value,
            _ => {
                log::warn!("SIO0 write 0x{:04X} at unknown offset 0x{:X}", value, offset);
            }
        }
    }

    /// Advance the ACK countdown
    pub fn update(&mut self, cycles: u32) {
        if self.ack_timer > 0 {
            self.ack_timer -= cycles as i64;
            if self.ack_timer <= 0 {
                self.ack_timer = 0;
                self.irq_line = true;
            }
        }
    }

    /// Edge-triggered interrupt line; reading clears it
    pub fn take_irq(&mut self) -> bool {
        std::mem::take(&mut self.irq_line)
    }

    /// Host input update for one pad port (active-low mask)
    pub fn update_pad_buttons(&mut self, port: usize, mask: u16) {
        if port < 2 {
            self.pads[port].update_buttons(mask);
        }
    }

    /// Access a pad port (tests and hosts)
    pub fn pad_mut(&mut self, port: usize) -> &mut DigitalPad {
        &mut self.pads[port]
    }

    /// Serialize the register file and both pads
    pub fn serialize(&self, buf: &mut StateBuffer) {
        buf.write_u16(self.rx_data);
        buf.write_u16(self.mode);
        buf.write_u16(self.ctrl);
        buf.write_u16(self.baud);
        buf.write_u64(self.ack_timer as u64);
        buf.write_bool(self.irq_line);
        for pad in &self.pads {
            pad.serialize(buf);
        }
    }

    /// Restore the register file and both pads
    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        self.rx_data = buf.read_u16()?;
        self.mode = buf.read_u16()?;
        self.ctrl = buf.read_u16()?;
        self.baud = buf.read_u16()?;
        self.ack_timer = buf.read_u64()? as i64;
        self.irq_line = buf.read_bool()?;
        for pad in &mut self.pads {
            pad.deserialize(buf)?;
        }
        Ok(())
    }
}

impl Default for SerialInterface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOY_DATA: u32 = 0x1F80_1040;
    const JOY_STAT: u32 = 0x1F80_1044;
    const JOY_CTRL: u32 = 0x1F80_104A;

    #[test]
    fn test_pad_exchange_through_registers() {
        let mut serial = SerialInterface::new();

        serial.write16(JOY_DATA, 0x01);
        assert_eq!(serial.read16(JOY_DATA), 0xFF);

        serial.write16(JOY_DATA, 0x42);
        assert_eq!(serial.read16(JOY_DATA), 0x41);

        serial.write16(JOY_DATA, 0x00);
        assert_eq!(serial.read16(JOY_DATA), 0x5A);
    }

    #[test]
    fn test_ack_irq_after_delay() {
        let mut serial = SerialInterface::new();
        serial.write16(JOY_DATA, 0x01);

        serial.update(50);
        assert!(!serial.take_irq());

        serial.update(60);
        assert!(serial.take_irq());
        assert!(!serial.take_irq(), "edge triggered");
    }

    #[test]
    fn test_port_two_is_empty() {
        let mut serial = SerialInterface::new();
        // select port 2
        serial.write16(JOY_CTRL, 1 << 13);
        serial.write16(JOY_DATA, 0x01);
        assert_eq!(serial.read16(JOY_DATA), 0xFFFF);
    }

    #[test]
    fn test_stat_reports_ready() {
        let mut serial = SerialInterface::new();
        assert_eq!(serial.read16(JOY_STAT), 0x07);
    }

    #[test]
    fn test_button_update_reaches_reply() {
        let mut serial = SerialInterface::new();
        serial.update_pad_buttons(0, Buttons::SELECT.to_wire_mask());

        serial.write16(JOY_DATA, 0x01);
        serial.write16(JOY_DATA, 0x42);
        serial.write16(JOY_DATA, 0x00);
        serial.write16(JOY_DATA, 0x00);
        assert_eq!(serial.read16(JOY_DATA), 0xFE);
    }

    #[test]
    fn test_sio1_reads_stub() {
        let mut serial = SerialInterface::new();
        assert_eq!(serial.read16(0x1F80_1050), 0x7);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut serial = SerialInterface::new();
        serial.write16(JOY_CTRL, 0x1003);
        serial.write16(JOY_DATA, 0x01);

        let mut buf = StateBuffer::new();
        serial.serialize(&mut buf);

        let mut restored = SerialInterface::new();
        let mut buf = StateBuffer::from_bytes(buf.into_bytes());
        restored.deserialize(&mut buf).unwrap();

        assert_eq!(restored.read16(JOY_CTRL), 0x1003);
    }
}
