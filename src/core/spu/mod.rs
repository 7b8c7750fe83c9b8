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

//! SPU register-file stub
//!
//! No audio is synthesized. The BIOS expects the register window at
//! 0x1F801C00 to hold its writes, so the stub is plain storage over
//! the 512 halfword registers.

use crate::core::error::Result;
use crate::core::state::StateBuffer;

/// SPU register window base
const SPU_BASE: u32 = 0x1F80_1C00;

/// Number of halfword registers in the window
const SPU_NB_REGS: usize = 512;

/// Sound processing unit stub
pub struct Spu {
    regs: [u16; SPU_NB_REGS],
}

impl Spu {
    pub fn new() -> Self {
        Self {
            regs: [0u16; SPU_NB_REGS],
        }
    }

    pub fn reset(&mut self) {
        self.regs = [0u16; SPU_NB_REGS];
    }

    /// Read a register (halfword granularity)
    pub fn read16(&self, paddr: u32) -> u16 {
        let index = ((paddr - SPU_BASE) >> 1) as usize;
        if index < SPU_NB_REGS {
            self.regs[index]
        } else {
            0
        }
    }

    /// Write a register
    pub fn write16(&mut self, paddr: u32, value: u16) {
        let index = ((paddr - SPU_BASE) >> 1) as usize;
        if index < SPU_NB_REGS {
            self.regs[index] = value;
        }
    }

    /// Serialize the register file
    pub fn serialize(&self, buf: &mut StateBuffer) {
        for reg in &self.regs {
            buf.write_u16(*reg);
        }
    }

    /// Restore the register file
    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        for reg in &mut self.regs {
            *reg = buf.read_u16()?;
        }
        Ok(())
    }
}

impl Default for Spu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_storage() {
        let mut spu = Spu::new();
        spu.write16(0x1F801D80, 0x3FFF); // main volume left
        spu.write16(0x1F801C00, 0x1234); // voice 0 volume
        assert_eq!(spu.read16(0x1F801D80), 0x3FFF);
        assert_eq!(spu.read16(0x1F801C00), 0x1234);
    }

    #[test]
    fn test_out_of_window_access() {
        let mut spu = Spu::new();
        spu.write16(0x1F802000, 0xFFFF);
        assert_eq!(spu.read16(0x1F802000), 0);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut spu = Spu::new();
        spu.write16(0x1F801C06, 0xABCD);

        let mut buf = StateBuffer::new();
        spu.serialize(&mut buf);

        let mut restored = Spu::new();
        let mut buf = StateBuffer::from_bytes(buf.into_bytes());
        restored.deserialize(&mut buf).unwrap();
        assert_eq!(restored.read16(0x1F801C06), 0xABCD);
    }
}
