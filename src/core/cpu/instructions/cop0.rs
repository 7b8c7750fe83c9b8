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
use super::super::decode::decode_r_type;
use super::super::CPU;
use crate::core::error::Result;

impl CPU {
    // === COP0 Instructions ===

    /// Dispatch a COP0 operation (rs-decoded)
    pub(crate) fn execute_cop0(&mut self, instruction: u32) -> Result<()> {
        let (rs, rt, rd, _, funct) = decode_r_type(instruction);

        match rs {
            // MFC0: rt = cop0[rd], through the load-delay pipeline
            0x00 => {
                let value = self.cop0.mfc(rd);
                self.set_reg_delayed(rt, value);
                Ok(())
            }
            // MTC0: cop0[rd] = rt
            0x04 => {
                self.cop0.mtc(rd, self.reg(rt));
                Ok(())
            }
            // Coprocessor operation (bit 4 of rs set)
            _ if rs & 0x10 != 0 => {
                if funct == 0x10 {
                    self.op_rfe();
                } else {
                    log::warn!("COP0: unhandled operation funct=0x{:02X}", funct);
                }
                Ok(())
            }
            _ => {
                log::warn!("COP0: unhandled rs field 0x{:02X}", rs);
                Ok(())
            }
        }
    }

    /// RFE: Restore From Exception
    ///
    /// Pops the 6-bit kernel/interrupt-enable stack:
    /// SR[3:0] = SR[5:2], SR[5:4] unchanged.
    fn op_rfe(&mut self) {
        let sr = self.cop0.regs[COP0::SR];
        let popped = (sr >> 2) & 0x0F;
        self.cop0.regs[COP0::SR] = (sr & !0x0F) | popped;
    }
}
