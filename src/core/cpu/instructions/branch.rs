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

use super::super::decode::decode_i_type;
use super::super::CPU;
use crate::core::error::Result;

impl CPU {
    // === Branch Instructions ===
    //
    // All branches are delayed: the following instruction executes
    // unconditionally before the PC redirect takes effect.

    /// Arm the branch-delay machinery with a PC-relative target
    ///
    /// Target address: PC + 4 + (sign-extended immediate << 2)
    fn take_branch(&mut self, imm: u16) {
        let offset = ((imm as i16) as i32) << 2;
        self.branch_slot_addr = self.pc.wrapping_add(4).wrapping_add(offset as u32);
        self.branch_pending = true;
    }

    /// BEQ: Branch on Equal
    ///
    /// Format: beq rs, rt, offset
    pub(crate) fn op_beq(&mut self, instruction: u32) -> Result<()> {
        let (_, rs, rt, imm) = decode_i_type(instruction);
        if self.reg(rs) == self.reg(rt) {
            self.take_branch(imm);
        }
        Ok(())
    }

    /// BNE: Branch on Not Equal
    ///
    /// Format: bne rs, rt, offset
    pub(crate) fn op_bne(&mut self, instruction: u32) -> Result<()> {
        let (_, rs, rt, imm) = decode_i_type(instruction);
        if self.reg(rs) != self.reg(rt) {
            self.take_branch(imm);
        }
        Ok(())
    }

    /// BLEZ: Branch on Less Than or Equal to Zero
    ///
    /// Format: blez rs, offset
    pub(crate) fn op_blez(&mut self, instruction: u32) -> Result<()> {
        let (_, rs, _, imm) = decode_i_type(instruction);
        if (self.reg(rs) as i32) <= 0 {
            self.take_branch(imm);
        }
        Ok(())
    }

    /// BGTZ: Branch on Greater Than Zero
    ///
    /// Format: bgtz rs, offset
    pub(crate) fn op_bgtz(&mut self, instruction: u32) -> Result<()> {
        let (_, rs, _, imm) = decode_i_type(instruction);
        if (self.reg(rs) as i32) > 0 {
            self.take_branch(imm);
        }
        Ok(())
    }

    /// BCONDZ: the rt-decoded branch group
    ///
    /// rt bit 0 selects BGEZ over BLTZ; `(rt & 0x1E) == 0x10` selects
    /// the linking variants. The link register is written whether or
    /// not the branch is taken.
    pub(crate) fn op_bcondz(&mut self, instruction: u32) -> Result<()> {
        let (_, rs, rt, imm) = decode_i_type(instruction);

        let value = self.reg(rs) as i32;
        let ge = (rt & 0x01) != 0;
        let link = (rt & 0x1E) == 0x10;

        if link {
            let ra = self.pc.wrapping_add(8);
            self.set_reg(31, ra);
        }

        let taken = if ge { value >= 0 } else { value < 0 };
        if taken {
            self.take_branch(imm);
        }
        Ok(())
    }
}
