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

use super::super::decode::{decode_i_type, decode_r_type};
use super::super::{ExceptionCause, CPU};
use crate::core::error::Result;
use crate::core::memory::Bus;

impl CPU {
    // === COP2 (GTE) Instructions ===

    /// Dispatch a COP2 operation
    ///
    /// Bit 25 set means a GTE command; otherwise the rs field selects
    /// the register move form.
    pub(crate) fn execute_cop2(&mut self, instruction: u32) -> Result<()> {
        if instruction & (1 << 25) != 0 {
            self.gte.execute(instruction);
            return Ok(());
        }

        let (rs, rt, rd, _, _) = decode_r_type(instruction);
        match rs {
            // MFC2: rt = gte.data[rd], through the load-delay pipeline
            0x00 => {
                let value = self.gte.read_data(rd as usize) as u32;
                self.set_reg_delayed(rt, value);
            }
            // CFC2: rt = gte.control[rd]
            0x02 => {
                let value = self.gte.read_control(rd as usize) as u32;
                self.set_reg_delayed(rt, value);
            }
            // MTC2: gte.data[rd] = rt
            0x04 => {
                self.gte.write_data(rd as usize, self.reg(rt) as i32);
            }
            // CTC2: gte.control[rd] = rt
            0x06 => {
                self.gte.write_control(rd as usize, self.reg(rt) as i32);
            }
            _ => {
                log::warn!("COP2: unhandled rs field 0x{:02X}", rs);
            }
        }
        Ok(())
    }

    /// LWC2: Load Word to Coprocessor 2
    ///
    /// Format: lwc2 rt, offset(rs)
    pub(crate) fn op_lwc2(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (_, rs, rt, imm) = decode_i_type(instruction);
        let addr = self.reg(rs).wrapping_add((imm as i16) as u32);
        if addr & 0x3 != 0 {
            self.bad_vaddr_latch = addr;
            self.exception(ExceptionCause::AddressErrorLoad);
            return Ok(());
        }
        let value = bus.read32(addr)?;
        self.gte.write_data(rt as usize, value as i32);
        Ok(())
    }

    /// SWC2: Store Word from Coprocessor 2
    ///
    /// Format: swc2 rt, offset(rs)
    pub(crate) fn op_swc2(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (_, rs, rt, imm) = decode_i_type(instruction);
        let addr = self.reg(rs).wrapping_add((imm as i16) as u32);
        if addr & 0x3 != 0 {
            self.bad_vaddr_latch = addr;
            self.exception(ExceptionCause::AddressErrorStore);
            return Ok(());
        }
        let value = self.gte.read_data(rt as usize) as u32;
        bus.write32(addr, value)
    }
}
