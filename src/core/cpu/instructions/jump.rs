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

use super::super::decode::decode_j_type;
use super::super::CPU;
use crate::core::error::Result;

impl CPU {
    // === Jump Instructions ===

    /// J: Jump
    ///
    /// Format: j target
    /// Operation: PC = (delay_slot_pc & 0xF0000000) | (target << 2)
    pub(crate) fn op_j(&mut self, instruction: u32) -> Result<()> {
        let (_, target) = decode_j_type(instruction);
        let base = self.pc.wrapping_add(4) & 0xF000_0000;
        self.branch_slot_addr = base | (target << 2);
        self.branch_pending = true;
        Ok(())
    }

    /// JAL: Jump and Link
    ///
    /// Format: jal target
    ///
    /// The return address (the instruction after the delay slot) goes
    /// to r31.
    pub(crate) fn op_jal(&mut self, instruction: u32) -> Result<()> {
        let ra = self.pc.wrapping_add(8);
        self.set_reg(31, ra);
        self.op_j(instruction)
    }

    /// JR: Jump Register
    ///
    /// Format: jr rs
    ///
    /// A non-word-aligned target does not fault here: the delay slot
    /// still executes and the AddressErrorLoad fires at the following
    /// fetch, with BadVaddr recording this instruction's PC.
    pub(crate) fn op_jr(&mut self, rs: u8) -> Result<()> {
        let target = self.reg(rs);
        if target & 0x3 != 0 {
            self.unaligned_jump_pending = true;
            self.bad_vaddr_latch = self.pc;
        }
        self.branch_slot_addr = target;
        self.branch_pending = true;
        Ok(())
    }

    /// JALR: Jump and Link Register
    ///
    /// Format: jalr rd, rs
    pub(crate) fn op_jalr(&mut self, rs: u8, rd: u8) -> Result<()> {
        self.op_jr(rs)?;
        let ra = self.pc.wrapping_add(8);
        self.set_reg(rd, ra);
        Ok(())
    }
}
