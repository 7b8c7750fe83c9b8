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

//! Instruction dispatch
//!
//! The primary opcode selects the family; SPECIAL (op 0x00) re-decodes
//! on the funct field and BCONDZ (op 0x01) on the rt field.

mod arithmetic;
mod branch;
mod cop0;
mod cop2;
mod exception;
mod jump;
mod logical;
mod memory;
mod multiply;
mod shift;

use super::decode::decode_r_type;
use super::{ExceptionCause, CPU};
use crate::core::error::Result;
use crate::core::memory::Bus;

impl CPU {
    /// Decode and execute one instruction
    pub(super) fn execute_instruction(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let op = ((instruction >> 26) & 0x3F) as u8;

        match op {
            0x00 => self.execute_special(instruction),
            0x01 => self.op_bcondz(instruction),
            0x02 => self.op_j(instruction),
            0x03 => self.op_jal(instruction),
            0x04 => self.op_beq(instruction),
            0x05 => self.op_bne(instruction),
            0x06 => self.op_blez(instruction),
            0x07 => self.op_bgtz(instruction),
            0x08 => self.op_addi(instruction),
            0x09 => self.op_addiu(instruction),
            0x0A => self.op_slti(instruction),
            0x0B => self.op_sltiu(instruction),
            0x0C => self.op_andi(instruction),
            0x0D => self.op_ori(instruction),
            0x0E => self.op_xori(instruction),
            0x0F => self.op_lui(instruction),
            0x10 => self.execute_cop0(instruction),
            0x12 => self.execute_cop2(instruction),
            // COP1 and COP3 do not exist on this console
            0x11 | 0x13 => {
                self.exception(ExceptionCause::CoprocessorUnusable);
                Ok(())
            }
            0x20 => self.op_lb(instruction, bus),
            0x21 => self.op_lh(instruction, bus),
            0x22 => self.op_lwl(instruction, bus),
            0x23 => self.op_lw(instruction, bus),
            0x24 => self.op_lbu(instruction, bus),
            0x25 => self.op_lhu(instruction, bus),
            0x26 => self.op_lwr(instruction, bus),
            0x28 => self.op_sb(instruction, bus),
            0x29 => self.op_sh(instruction, bus),
            0x2A => self.op_swl(instruction, bus),
            0x2B => self.op_sw(instruction, bus),
            0x2E => self.op_swr(instruction, bus),
            0x32 => self.op_lwc2(instruction, bus),
            0x3A => self.op_swc2(instruction, bus),
            _ => self.op_illegal(instruction),
        }
    }

    /// SPECIAL sub-table (funct-decoded)
    fn execute_special(&mut self, instruction: u32) -> Result<()> {
        let (rs, rt, rd, shamt, funct) = decode_r_type(instruction);

        match funct {
            0x00 => self.op_sll(rt, rd, shamt),
            0x02 => self.op_srl(rt, rd, shamt),
            0x03 => self.op_sra(rt, rd, shamt),
            0x04 => self.op_sllv(rs, rt, rd),
            0x06 => self.op_srlv(rs, rt, rd),
            0x07 => self.op_srav(rs, rt, rd),
            0x08 => self.op_jr(rs),
            0x09 => self.op_jalr(rs, rd),
            0x0C => self.op_syscall(),
            0x0D => self.op_break(),
            0x10 => self.op_mfhi(rd),
            0x11 => self.op_mthi(rs),
            0x12 => self.op_mflo(rd),
            0x13 => self.op_mtlo(rs),
            0x18 => self.op_mult(rs, rt),
            0x19 => self.op_multu(rs, rt),
            0x1A => self.op_div(rs, rt),
            0x1B => self.op_divu(rs, rt),
            0x20 => self.op_add(rs, rt, rd),
            0x21 => self.op_addu(rs, rt, rd),
            0x22 => self.op_sub(rs, rt, rd),
            0x23 => self.op_subu(rs, rt, rd),
            0x24 => self.op_and(rs, rt, rd),
            0x25 => self.op_or(rs, rt, rd),
            0x26 => self.op_xor(rs, rt, rd),
            0x27 => self.op_nor(rs, rt, rd),
            0x2A => self.op_slt(rs, rt, rd),
            0x2B => self.op_sltu(rs, rt, rd),
            _ => self.op_illegal(instruction),
        }
    }
}
