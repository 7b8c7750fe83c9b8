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

use super::super::cop0::COP0;
use super::super::decode::decode_i_type;
use super::super::{ExceptionCause, CPU};
use crate::core::error::Result;
use crate::core::memory::Bus;

impl CPU {
    // === Load / Store Instructions ===
    //
    // Loads go through the delay pipeline; their value is visible only
    // after the next instruction commits. While SR bit 16 isolates the
    // cache, every store is a no-op (the BIOS scrubs the instruction
    // cache this way without touching RAM).

    /// Whether stores are currently swallowed by cache isolation
    fn cache_isolated(&self) -> bool {
        (self.cop0.regs[COP0::SR] & COP0::SR_ISOLATE_CACHE) != 0
    }

    /// Effective address: base register + sign-extended offset
    fn effective_address(&self, instruction: u32) -> (u8, u32) {
        let (_, rs, rt, imm) = decode_i_type(instruction);
        let offset = (imm as i16) as u32;
        (rt, self.reg(rs).wrapping_add(offset))
    }

    /// LB: Load Byte (sign-extended)
    pub(crate) fn op_lb(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        let value = bus.read8(addr)? as i8;
        self.set_reg_delayed(rt, value as u32);
        Ok(())
    }

    /// LBU: Load Byte Unsigned
    pub(crate) fn op_lbu(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        let value = bus.read8(addr)?;
        self.set_reg_delayed(rt, value as u32);
        Ok(())
    }

    /// LH: Load Halfword (sign-extended)
    pub(crate) fn op_lh(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        if addr & 0x1 != 0 {
            self.bad_vaddr_latch = addr;
            self.exception(ExceptionCause::AddressErrorLoad);
            return Ok(());
        }
        let value = bus.read16(addr)? as i16;
        self.set_reg_delayed(rt, value as u32);
        Ok(())
    }

    /// LHU: Load Halfword Unsigned
    pub(crate) fn op_lhu(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        if addr & 0x1 != 0 {
            self.bad_vaddr_latch = addr;
            self.exception(ExceptionCause::AddressErrorLoad);
            return Ok(());
        }
        let value = bus.read16(addr)?;
        self.set_reg_delayed(rt, value as u32);
        Ok(())
    }

    /// LW: Load Word
    pub(crate) fn op_lw(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        if addr & 0x3 != 0 {
            self.bad_vaddr_latch = addr;
            self.exception(ExceptionCause::AddressErrorLoad);
            return Ok(());
        }
        let value = bus.read32(addr)?;
        self.set_reg_delayed(rt, value);
        Ok(())
    }

    /// LWL: Load Word Left
    ///
    /// Unaligned load of the high-order bytes, merged with the current
    /// register contents. A preceding LWR to the same register is
    /// observed through the load-delay pipeline.
    pub(crate) fn op_lwl(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        let word = bus.read32(addr & !0x3)?;

        let shift = (3 - (addr & 0x3)) * 8;
        let mask = 0xFFFF_FFFFu32 >> shift;

        let current = self.pending_or_reg(rt);
        let section = (word & mask) << shift;
        let result = section | (current & !(mask << shift));
        self.set_reg_delayed(rt, result);
        Ok(())
    }

    /// LWR: Load Word Right
    ///
    /// Unaligned load of the low-order bytes; the counterpart of LWL.
    pub(crate) fn op_lwr(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        let word = bus.read32(addr & !0x3)?;

        let shift = (addr & 0x3) * 8;
        let mask = 0xFFFF_FFFFu32 << shift;

        let current = self.pending_or_reg(rt);
        let section = (word & mask) >> shift;
        let result = (current & !(mask >> shift)) | section;
        self.set_reg_delayed(rt, result);
        Ok(())
    }

    /// SB: Store Byte
    pub(crate) fn op_sb(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        if self.cache_isolated() {
            return Ok(());
        }
        bus.write8(addr, self.reg(rt) as u8)
    }

    /// SH: Store Halfword
    pub(crate) fn op_sh(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        if addr & 0x1 != 0 {
            self.bad_vaddr_latch = addr;
            self.exception(ExceptionCause::AddressErrorStore);
            return Ok(());
        }
        if self.cache_isolated() {
            return Ok(());
        }
        bus.write16(addr, self.reg(rt) as u16)
    }

    /// SW: Store Word
    pub(crate) fn op_sw(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        if addr & 0x3 != 0 {
            self.bad_vaddr_latch = addr;
            self.exception(ExceptionCause::AddressErrorStore);
            return Ok(());
        }
        if self.cache_isolated() {
            return Ok(());
        }
        bus.write32(addr, self.reg(rt))
    }

    /// SWL: Store Word Left
    ///
    /// Read-modify-write of the word-aligned location; stores the
    /// high-order bytes of rt.
    pub(crate) fn op_swl(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        if self.cache_isolated() {
            return Ok(());
        }
        let aligned = addr & !0x3;
        let current = bus.read32(aligned)?;

        let shift = (3 - (addr & 0x3)) * 8;
        let mask = 0xFFFF_FFFFu32 >> shift;

        let result = (current & !mask) | (self.reg(rt) >> shift);
        bus.write32(aligned, result)
    }

    /// SWR: Store Word Right
    ///
    /// Read-modify-write of the word-aligned location; stores the
    /// low-order bytes of rt.
    pub(crate) fn op_swr(&mut self, instruction: u32, bus: &mut Bus) -> Result<()> {
        let (rt, addr) = self.effective_address(instruction);
        if self.cache_isolated() {
            return Ok(());
        }
        let aligned = addr & !0x3;
        let current = bus.read32(aligned)?;

        let shift = (addr & 0x3) * 8;
        let mask = 0xFFFF_FFFFu32 << shift;

        let result = (current & !mask) | (self.reg(rt) << shift);
        bus.write32(aligned, result)
    }
}
