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

//! Digital controller reply automaton
//!
//! Each host byte advances the exchange one step:
//! HighZ -> IDLo -> IDHi -> SwLo -> SwHi -> HighZ, answering
//! 0xFF, 0x41, 0x5A, buttonsLo, buttonsHi. The button mask is
//! active-low (a cleared bit means pressed). A disconnected pad
//! answers 0xFF in every state.

use crate::core::error::Result;
use crate::core::state::StateBuffer;
use bitflags::bitflags;

bitflags! {
    /// Digital pad buttons, by bit position in the reply mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Buttons: u16 {
        const SELECT = 1 << 0;
        const START = 1 << 3;
        const UP = 1 << 4;
        const RIGHT = 1 << 5;
        const DOWN = 1 << 6;
        const LEFT = 1 << 7;
        const L2 = 1 << 8;
        const R2 = 1 << 9;
        const L1 = 1 << 10;
        const R1 = 1 << 11;
        const TRIANGLE = 1 << 12;
        const CIRCLE = 1 << 13;
        const CROSS = 1 << 14;
        const SQUARE = 1 << 15;
    }
}

impl Buttons {
    /// Active-low wire mask for a set of held buttons
    pub fn to_wire_mask(self) -> u16 {
        !self.bits()
    }
}

/// Exchange sequence state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PadSequence {
    HighZ,
    IdLo,
    IdHi,
    SwLo,
    SwHi,
}

impl PadSequence {
    fn to_u8(self) -> u8 {
        match self {
            PadSequence::HighZ => 0,
            PadSequence::IdLo => 1,
            PadSequence::IdHi => 2,
            PadSequence::SwLo => 3,
            PadSequence::SwHi => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => PadSequence::IdLo,
            2 => PadSequence::IdHi,
            3 => PadSequence::SwLo,
            4 => PadSequence::SwHi,
            _ => PadSequence::HighZ,
        }
    }
}

/// A digital controller on one pad port
pub struct DigitalPad {
    state: PadSequence,
    /// Active-low button mask (0xFFFF = nothing pressed)
    buttons: u16,
    /// Last byte shifted in from the host
    tx: u8,
    connected: bool,
}

impl DigitalPad {
    pub fn new() -> Self {
        Self {
            state: PadSequence::HighZ,
            buttons: 0xFFFF,
            tx: 0,
            connected: false,
        }
    }

    pub fn reset(&mut self) {
        self.state = PadSequence::HighZ;
        self.buttons = 0xFFFF;
        self.tx = 0;
    }

    pub fn connect(&mut self) {
        self.connected = true;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Latch the next host byte
    pub fn tx(&mut self, value: u8) {
        self.tx = value;
    }

    /// Produce the reply byte and advance the sequence
    pub fn rx(&mut self) -> u16 {
        if !self.connected {
            return 0xFFFF;
        }

        match self.state {
            PadSequence::HighZ => {
                if self.tx == 0x01 {
                    self.state = PadSequence::IdLo;
                    0xFF
                } else {
                    0xFFFF
                }
            }
            PadSequence::IdLo => {
                if self.tx == 0x42 {
                    self.state = PadSequence::IdHi;
                    0x41
                } else {
                    0xFFFF
                }
            }
            PadSequence::IdHi => {
                self.state = PadSequence::SwLo;
                0x5A
            }
            PadSequence::SwLo => {
                self.state = PadSequence::SwHi;
                self.buttons & 0xFF
            }
            PadSequence::SwHi => {
                self.state = PadSequence::HighZ;
                (self.buttons >> 8) & 0xFF
            }
        }
    }

    /// Update the active-low button mask from the host
    pub fn update_buttons(&mut self, mask: u16) {
        self.buttons = mask;
    }

    pub fn serialize(&self, buf: &mut StateBuffer) {
        buf.write_u8(self.state.to_u8());
        buf.write_u16(self.buttons);
        buf.write_u8(self.tx);
        buf.write_bool(self.connected);
    }

    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        self.state = PadSequence::from_u8(buf.read_u8()?);
        self.buttons = buf.read_u16()?;
        self.tx = buf.read_u8()?;
        self.connected = buf.read_bool()?;
        Ok(())
    }
}

impl Default for DigitalPad {
    fn default() -> Self {
        Self::new()
    }
}
