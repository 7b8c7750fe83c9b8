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
    // === Multiply / Divide Instructions ===
    //
    // Results land in HI:LO. Division never traps; the by-zero and
    // INT_MIN/-1 cases produce the R3000A's defined garbage instead.

    /// MULT: Multiply (signed)
    ///
    /// Format: mult rs, rt
    /// Operation: HI:LO = rs * rt
    pub(crate) fn op_mult(&mut self, rs: u8, rt: u8) -> Result<()> {
        let a = (self.reg(rs) as i32) as i64;
        let b = (self.reg(rt) as i32) as i64;
        let result = (a * b) as u64;

        self.hi = (result >> 32) as u32;
        self.lo = result as u32;
        Ok(())
    }

    /// MULTU: Multiply Unsigned
    ///
    /// Format: multu rs, rt
    /// Operation: HI:LO = rs * rt
    pub(crate) fn op_multu(&mut self, rs: u8, rt: u8) -> Result<()> {
        let a = self.reg(rs) as u64;
        let b = self.reg(rt) as u64;
        let result = a * b;

        self.hi = (result >> 32) as u32;
        self.lo = result as u32;
        Ok(())
    }

    /// DIV: Divide (signed)
    ///
    /// Format: div rs, rt
    /// Operation: LO = rs / rt, HI = rs % rt
    ///
    /// Division by zero yields LO = -1 for a non-negative dividend and
    /// LO = 1 for a negative one, with HI = dividend. INT32_MIN / -1
    /// yields LO = INT32_MIN, HI = 0.
    pub(crate) fn op_div(&mut self, rs: u8, rt: u8) -> Result<()> {
        let dividend = self.reg(rs) as i32;
        let divisor = self.reg(rt) as i32;

        if divisor == 0 {
            self.lo = if dividend >= 0 { 0xFFFF_FFFF } else { 1 };
            self.hi = dividend as u32;
        } else if dividend == i32::MIN && divisor == -1 {
            self.lo = i32::MIN as u32;
            self.hi = 0;
        } else {
            self.lo = (dividend / divisor) as u32;
            self.hi = (dividend % divisor) as u32;
        }
        Ok(())
    }

    /// DIVU: Divide Unsigned
    ///
    /// Format: divu rs, rt
    /// Operation: LO = rs / rt, HI = rs % rt
    ///
    /// Division by zero yields LO = 0xFFFFFFFF, HI = dividend.
    pub(crate) fn op_divu(&mut self, rs: u8, rt: u8) -> Result<()> {
        let dividend = self.reg(rs);
        let divisor = self.reg(rt);

        if divisor == 0 {
            self.lo = 0xFFFF_FFFF;
            self.hi = dividend;
        } else {
            self.lo = dividend / divisor;
            self.hi = dividend % divisor;
        }
        Ok(())
    }

    /// MFHI: Move From HI
    ///
    /// Format: mfhi rd
    pub(crate) fn op_mfhi(&mut self, rd: u8) -> Result<()> {
        self.set_reg(rd, self.hi);
        Ok(())
    }

    /// MTHI: Move To HI
    ///
    /// Format: mthi rs
    pub(crate) fn op_mthi(&mut self, rs: u8) -> Result<()> {
        self.hi = self.reg(rs);
        Ok(())
    }

    /// MFLO: Move From LO
    ///
    /// Format: mflo rd
    pub(crate) fn op_mflo(&mut self, rd: u8) -> Result<()> {
        self.set_reg(rd, self.lo);
        Ok(())
    }

    /// MTLO: Move To LO
    ///
    /// Format: mtlo rs
    pub(crate) fn op_mtlo(&mut self, rs: u8) -> Result<()> {
        self.lo = self.reg(rs);
        Ok(())
    }
}
