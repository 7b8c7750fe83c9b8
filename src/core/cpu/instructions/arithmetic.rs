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
use super::super::{ExceptionCause, CPU};
use crate::core::error::Result;

impl CPU {
    // === Arithmetic Instructions ===

    /// ADD: Add (with overflow exception)
    ///
    /// Format: add rd, rs, rt
    /// Operation: rd = rs + rt
    ///
    /// Signed overflow raises an Overflow exception and leaves the
    /// destination register unmodified.
    pub(crate) fn op_add(&mut self, rs: u8, rt: u8, rd: u8) -> Result<()> {
        let a = self.reg(rs) as i32;
        let b = self.reg(rt) as i32;

        match a.checked_add(b) {
            Some(result) => self.set_reg(rd, result as u32),
            None => self.exception(ExceptionCause::Overflow),
        }
        Ok(())
    }

    /// ADDU: Add Unsigned (wraps silently)
    ///
    /// Format: addu rd, rs, rt
    /// Operation: rd = rs + rt
    pub(crate) fn op_addu(&mut self, rs: u8, rt: u8, rd: u8) -> Result<()> {
        let result = self.reg(rs).wrapping_add(self.reg(rt));
        self.set_reg(rd, result);
        Ok(())
    }

    /// ADDI: Add Immediate (with overflow exception)
    ///
    /// Format: addi rt, rs, imm
    /// Operation: rt = rs + sign_extend(imm)
    pub(crate) fn op_addi(&mut self, instruction: u32) -> Result<()> {
        let (_, rs, rt, imm) = decode_i_type(instruction);
        let imm = (imm as i16) as i32;
        let a = self.reg(rs) as i32;

        match a.checked_add(imm) {
            Some(result) => self.set_reg(rt, result as u32),
            None => self.exception(ExceptionCause::Overflow),
        }
        Ok(())
    }

    /// ADDIU: Add Immediate Unsigned (wraps silently)
    ///
    /// Despite the name, the immediate is sign-extended.
    ///
    /// Format: addiu rt, rs, imm
    /// Operation: rt = rs + sign_extend(imm)
    pub(crate) fn op_addiu(&mut self, instruction: u32) -> Result<()> {
        let (_, rs, rt, imm) = decode_i_type(instruction);
        let imm = (imm as i16) as u32;
        let result = self.reg(rs).wrapping_add(imm);
        self.set_reg(rt, result);
        Ok(())
    }

    /// SUB: Subtract (with overflow exception)
    ///
    /// Format: sub rd, rs, rt
    /// Operation: rd = rs - rt
    pub(crate) fn op_sub(&mut self, rs: u8, rt: u8, rd: u8) -> Result<()> {
        let a = self.reg(rs) as i32;
        let b = self.reg(rt) as i32;

        match a.checked_sub(b) {
            Some(result) => self.set_reg(rd, result as u32),
            None => self.exception(ExceptionCause::Overflow),
        }
        Ok(())
    }

    /// SUBU: Subtract Unsigned (wraps silently)
    ///
    /// Format: subu rd, rs, rt
    /// Operation: rd = rs - rt
    pub(crate) fn op_subu(&mut self, rs: u8, rt: u8, rd: u8) -> Result<()> {
        let result = self.reg(rs).wrapping_sub(self.reg(rt));
        self.set_reg(rd, result);
        Ok(())
    }

    /// SLT: Set on Less Than (signed)
    ///
    /// Format: slt rd, rs, rt
    /// Operation: rd = (rs < rt) ? 1 : 0
    pub(crate) fn op_slt(&mut self, rs: u8, rt: u8, rd: u8) -> Result<()> {
        let result = ((self.reg(rs) as i32) < (self.reg(rt) as i32)) as u32;
        self.set_reg(rd, result);
        Ok(())
    }

    /// SLTU: Set on Less Than Unsigned
    ///
    /// Format: sltu rd, rs, rt
    /// Operation: rd = (rs < rt) ? 1 : 0
    pub(crate) fn op_sltu(&mut self, rs: u8, rt: u8, rd: u8) -> Result<()> {
        let result = (self.reg(rs) < self.reg(rt)) as u32;
        self.set_reg(rd, result);
        Ok(())
    }

    /// SLTI: Set on Less Than Immediate (signed compare)
    ///
    /// Format: slti rt, rs, imm
    /// Operation: rt = (rs < sign_extend(imm)) ? 1 : 0
    pub(crate) fn op_slti(&mut self, instruction: u32) -> Result<()> {
        let (_, rs, rt, imm) = decode_i_type(instruction);
        let result = ((self.reg(rs) as i32) < (imm as i16) as i32) as u32;
        self.set_reg(rt, result);
        Ok(())
    }

    /// SLTIU: Set on Less Than Immediate Unsigned
    ///
    /// The immediate is sign-extended, then compared unsigned.
    ///
    /// Format: sltiu rt, rs, imm
    /// Operation: rt = (rs < sign_extend(imm)) ? 1 : 0
    pub(crate) fn op_sltiu(&mut self, instruction: u32) -> Result<()> {
        let (_, rs, rt, imm) = decode_i_type(instruction);
        let result = (self.reg(rs) < (imm as i16) as u32) as u32;
        self.set_reg(rt, result);
        Ok(())
    }
}
