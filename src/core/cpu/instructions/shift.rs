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

use super::super::CPU;
use crate::core::error::Result;

impl CPU {
    // === Shift Instructions ===
    //
    // Shift amounts are masked to the low 5 bits; SRA/SRAV sign-extend.

    /// SLL: Shift Left Logical
    ///
    /// Format: sll rd, rt, shamt
    pub(crate) fn op_sll(&mut self, rt: u8, rd: u8, shamt: u8) -> Result<()> {
        let result = self.reg(rt) << (shamt & 0x1F);
        self.set_reg(rd, result);
        Ok(())
    }

    /// SRL: Shift Right Logical
    ///
    /// Format: srl rd, rt, shamt
    pub(crate) fn op_srl(&mut self, rt: u8, rd: u8, shamt: u8) -> Result<()> {
        let result = self.reg(rt) >> (shamt & 0x1F);
        self.set_reg(rd, result);
        Ok(())
    }

    /// SRA: Shift Right Arithmetic
    ///
    /// Format: sra rd, rt, shamt
    pub(crate) fn op_sra(&mut self, rt: u8, rd: u8, shamt: u8) -> Result<()> {
        let result = (self.reg(rt) as i32) >> (shamt & 0x1F);
        self.set_reg(rd, result as u32);
        Ok(())
    }

    /// SLLV: Shift Left Logical Variable
    ///
    /// Format: sllv rd, rt, rs
    /// Operation: rd = rt << (rs & 0x1F)
    pub(crate) fn op_sllv(&mut self, rs: u8, rt: u8, rd: u8) -> Result<()> {
        let result = self.reg(rt) << (self.reg(rs) & 0x1F);
        self.set_reg(rd, result);
        Ok(())
    }

    /// SRLV: Shift Right Logical Variable
    ///
    /// Format: srlv rd, rt, rs
    /// Operation: rd = rt >> (rs & 0x1F)
    pub(crate) fn op_srlv(&mut self, rs: u8, rt: u8, rd: u8) -> Result<()> {
        let result = self.reg(rt) >> (self.reg(rs) & 0x1F);
        self.set_reg(rd, result);
        Ok(())
    }

    /// SRAV: Shift Right Arithmetic Variable
    ///
    /// Format: srav rd, rt, rs
    /// Operation: rd = rt >> (rs & 0x1F) (sign-extending)
    pub(crate) fn op_srav(&mut self, rs: u8, rt: u8, rd: u8) -> Result<()> {
        let result = (self.reg(rt) as i32) >> (self.reg(rs) & 0x1F);
        self.set_reg(rd, result as u32);
        Ok(())
    }
}
