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

//! I/O port dispatch
//!
//! Routes accesses inside the 0x1F801000 window to the owning
//! peripheral. Writes to a DMA channel-control register that raise the
//! start bits launch the transfer synchronously, before the store
//! instruction retires.

use super::Bus;
use crate::core::dma::Dma;
use crate::core::error::Result;

// Sub-ranges of the I/O window (physical addresses)
const MEMCTL1_START: u32 = 0x1F80_1000;
const MEMCTL1_END: u32 = 0x1F80_1023;
const SERIAL_START: u32 = 0x1F80_1040;
const SERIAL_END: u32 = 0x1F80_105F;
const MEMCTL2: u32 = 0x1F80_1060;
const I_STAT: u32 = 0x1F80_1070;
const I_MASK: u32 = 0x1F80_1074;
const DMA_START: u32 = 0x1F80_1080;
const DMA_END: u32 = 0x1F80_10FF;
const TIMERS_START: u32 = 0x1F80_1100;
const TIMERS_END: u32 = 0x1F80_112F;
const CDROM_START: u32 = 0x1F80_1800;
const CDROM_END: u32 = 0x1F80_1803;
const GPU_GP0: u32 = 0x1F80_1810;
const GPU_GP1: u32 = 0x1F80_1814;
const SPU_START: u32 = 0x1F80_1C00;
const SPU_END: u32 = 0x1F80_1FFF;

impl Bus {
    pub(super) fn read_io32(&mut self, paddr: u32) -> Result<u32> {
        match paddr {
            MEMCTL1_START..=MEMCTL1_END => {
                let index = ((paddr - MEMCTL1_START) >> 2) as usize;
                Ok(self.memory_control1[index])
            }
            SERIAL_START..=SERIAL_END => match &self.serial {
                Some(serial) => Ok(serial.borrow_mut().read16(paddr) as u32),
                None => Ok(0),
            },
            MEMCTL2 => Ok(self.memory_control2),
            I_STAT => match &self.interrupt_controller {
                Some(ic) => Ok(ic.borrow().read_status()),
                None => Ok(0),
            },
            I_MASK => match &self.interrupt_controller {
                Some(ic) => Ok(ic.borrow().read_mask()),
                None => Ok(0),
            },
            DMA_START..=DMA_END => match &self.dma {
                Some(dma) => Ok(dma.borrow().read32(paddr)),
                None => Ok(0),
            },
            TIMERS_START..=TIMERS_END => match &self.timers {
                Some(timers) => Ok(timers.borrow().read(paddr)),
                None => Ok(0),
            },
            CDROM_START..=CDROM_END => match self.cdrom.clone() {
                Some(cdrom) => {
                    let mut cdrom = cdrom.borrow_mut();
                    let b0 = cdrom.read8(paddr) as u32;
                    let b1 = cdrom.read8(paddr + 1) as u32;
                    let b2 = cdrom.read8(paddr + 2) as u32;
                    let b3 = cdrom.read8(paddr + 3) as u32;
                    Ok(b0 | (b1 << 8) | (b2 << 16) | (b3 << 24))
                }
                None => Ok(0),
            },
            GPU_GP0 => match &self.gpu {
                Some(gpu) => Ok(gpu.borrow_mut().read_gpuread()),
                None => Ok(0),
            },
            GPU_GP1 => match &self.gpu {
                Some(gpu) => Ok(gpu.borrow().status()),
                None => Ok(0),
            },
            SPU_START..=SPU_END => match &self.spu {
                Some(spu) => {
                    let spu = spu.borrow();
                    let lo = spu.read16(paddr) as u32;
                    let hi = spu.read16(paddr + 2) as u32;
                    Ok(lo | (hi << 16))
                }
                None => Ok(0),
            },
            _ => {
                log::warn!("read32 from unknown I/O port 0x{:08X}", paddr);
                Ok(0)
            }
        }
    }

    pub(super) fn write_io32(&mut self, paddr: u32, value: u32) -> Result<()> {
        match paddr {
            MEMCTL1_START..=MEMCTL1_END => {
                let index = ((paddr - MEMCTL1_START) >> 2) as usize;
                self.memory_control1[index] = value;
                Ok(())
            }
            SERIAL_START..=SERIAL_END => {
                if let Some(serial) = &self.serial {
                    serial.borrow_mut().write16(paddr, value as u16);
                }
                Ok(())
            }
            MEMCTL2 => {
                self.memory_control2 = value;
                Ok(())
            }
            I_STAT => {
                if let Some(ic) = &self.interrupt_controller {
                    ic.borrow_mut().write_status(value);
                }
                Ok(())
            }
            I_MASK => {
                if let Some(ic) = &self.interrupt_controller {
                    ic.borrow_mut().write_mask(value);
                }
                Ok(())
            }
            DMA_START..=DMA_END => {
                if let Some(dma_rc) = self.dma.clone() {
                    let mut dma = dma_rc.borrow_mut();
                    dma.write32(paddr, value);
                    // A CHCR write that raised active/force-start runs
                    // the whole transfer before this store returns
                    if let Some(channel) = dma.take_pending_transfer() {
                        self.execute_dma(&mut dma, channel);
                    }
                }
                Ok(())
            }
            TIMERS_START..=TIMERS_END => {
                if let Some(timers) = &self.timers {
                    timers.borrow_mut().write(paddr, value);
                }
                Ok(())
            }
            CDROM_START..=CDROM_END => {
                if let Some(cdrom) = self.cdrom.clone() {
                    let mut cdrom = cdrom.borrow_mut();
                    cdrom.write8(paddr, value as u8);
                    cdrom.write8(paddr + 1, (value >> 8) as u8);
                    cdrom.write8(paddr + 2, (value >> 16) as u8);
                    cdrom.write8(paddr + 3, (value >> 24) as u8);
                }
                Ok(())
            }
            GPU_GP0 => {
                if let Some(gpu) = &self.gpu {
                    gpu.borrow_mut().write_gp0(value);
                }
                Ok(())
            }
            GPU_GP1 => {
                if let Some(gpu) = &self.gpu {
                    gpu.borrow_mut().write_gp1(value);
                }
                Ok(())
            }
            SPU_START..=SPU_END => {
                if let Some(spu) = &self.spu {
                    let mut spu = spu.borrow_mut();
                    spu.write16(paddr, value as u16);
                    spu.write16(paddr + 2, (value >> 16) as u16);
                }
                Ok(())
            }
            _ => {
                log::warn!(
                    "write32 0x{:08X} to unknown I/O port 0x{:08X} dropped",
                    value,
                    paddr
                );
                Ok(())
            }
        }
    }

    pub(super) fn read_io16(&mut self, paddr: u32) -> Result<u16> {
        match paddr {
            SERIAL_START..=SERIAL_END => match &self.serial {
                Some(serial) => Ok(serial.borrow_mut().read16(paddr)),
                None => Ok(0),
            },
            MEMCTL2 => Ok(self.memory_control2 as u16),
            I_STAT | I_MASK => {
                // halfword lanes into the interrupt registers
                match &self.interrupt_controller {
                    Some(ic) => Ok(ic.borrow().read_lane16(paddr - I_STAT)),
                    None => Ok(0),
                }
            }
            TIMERS_START..=TIMERS_END => match &self.timers {
                Some(timers) => Ok(timers.borrow().read(paddr) as u16),
                None => Ok(0),
            },
            CDROM_START..=CDROM_END => match self.cdrom.clone() {
                Some(cdrom) => {
                    let mut cdrom = cdrom.borrow_mut();
                    let lo = cdrom.read8(paddr) as u16;
                    let hi = cdrom.read8(paddr + 1) as u16;
                    Ok(lo | (hi << 8))
                }
                None => Ok(0),
            },
            SPU_START..=SPU_END => match &self.spu {
                Some(spu) => Ok(spu.borrow().read16(paddr)),
                None => Ok(0),
            },
            GPU_GP0 | GPU_GP1 => {
                log::warn!("GPU read16 at 0x{:08X} unhandled", paddr);
                Ok(0)
            }
            _ => {
                log::warn!("read16 from unknown I/O port 0x{:08X}", paddr);
                Ok(0)
            }
        }
    }

    pub(super) fn write_io16(&mut self, paddr: u32, value: u16) -> Result<()> {
        match paddr {
            MEMCTL1_START..=MEMCTL1_END => {
                let index = ((paddr - MEMCTL1_START) >> 2) as usize;
                self.memory_control1[index] =
                    (self.memory_control1[index] & 0xFFFF_0000) | value as u32;
                Ok(())
            }
            SERIAL_START..=SERIAL_END => {
                if let Some(serial) = &self.serial {
                    serial.borrow_mut().write16(paddr, value);
                }
                Ok(())
            }
            MEMCTL2 => {
                self.memory_control2 = (self.memory_control2 & 0xFFFF_0000) | value as u32;
                Ok(())
            }
            I_STAT | I_MASK => {
                if let Some(ic) = &self.interrupt_controller {
                    ic.borrow_mut().write_lane16(paddr - I_STAT, value);
                }
                Ok(())
            }
            TIMERS_START..=TIMERS_END => {
                if let Some(timers) = &self.timers {
                    timers.borrow_mut().write(paddr, value as u32);
                }
                Ok(())
            }
            CDROM_START..=CDROM_END => {
                if let Some(cdrom) = self.cdrom.clone() {
                    let mut cdrom = cdrom.borrow_mut();
                    cdrom.write8(paddr, value as u8);
                    cdrom.write8(paddr + 1, (value >> 8) as u8);
                }
                Ok(())
            }
            SPU_START..=SPU_END => {
                if let Some(spu) = &self.spu {
                    spu.borrow_mut().write16(paddr, value);
                }
                Ok(())
            }
            _ => {
                log::warn!(
                    "write16 0x{:04X} to unknown I/O port 0x{:08X} dropped",
                    value,
                    paddr
                );
                Ok(())
            }
        }
    }

    pub(super) fn read_io8(&mut self, paddr: u32) -> Result<u8> {
        match paddr {
            CDROM_START..=CDROM_END => match self.cdrom.clone() {
                Some(cdrom) => Ok(cdrom.borrow_mut().read8(paddr)),
                None => Ok(0),
            },
            SERIAL_START..=SERIAL_END => match &self.serial {
                Some(serial) => {
                    let half = serial.borrow_mut().read16(paddr & !1);
                    Ok(if paddr & 1 != 0 {
                        (half >> 8) as u8
                    } else {
                        half as u8
                    })
                }
                None => Ok(0xFF),
            },
            I_STAT..=0x1F80_1077 => match &self.interrupt_controller {
                Some(ic) => Ok(ic.borrow().read_lane8(paddr - I_STAT)),
                None => Ok(0),
            },
            _ => {
                log::warn!("read8 from unknown I/O port 0x{:08X}", paddr);
                Ok(0)
            }
        }
    }

    pub(super) fn write_io8(&mut self, paddr: u32, value: u8) -> Result<()> {
        match paddr {
            CDROM_START..=CDROM_END => {
                if let Some(cdrom) = self.cdrom.clone() {
                    cdrom.borrow_mut().write8(paddr, value);
                }
                Ok(())
            }
            SERIAL_START..=SERIAL_END => {
                if let Some(serial) = &self.serial {
                    let value16 = if paddr & 1 != 0 {
                        (value as u16) << 8
                    } else {
                        value as u16
                    };
                    serial.borrow_mut().write16(paddr & !1, value16);
                }
                Ok(())
            }
            I_STAT..=0x1F80_1077 => {
                if let Some(ic) = &self.interrupt_controller {
                    ic.borrow_mut().write_lane8(paddr - I_STAT, value);
                }
                Ok(())
            }
            _ => {
                log::warn!(
                    "write8 0x{:02X} to unknown I/O port 0x{:08X} dropped",
                    value,
                    paddr
                );
                Ok(())
            }
        }
    }

    /// Run a launched DMA transfer to completion
    ///
    /// OTC fills the ordering table in RAM; the GPU channel pushes
    /// words to GP0 per its sync mode. Other channels are not modeled.
    fn execute_dma(&mut self, dma: &mut Dma, channel: usize) {
        match channel {
            // GPU
            2 => {
                if let Some(gpu_rc) = self.gpu.clone() {
                    let mut gpu = gpu_rc.borrow_mut();
                    dma.run_gpu(&mut self.ram, &mut gpu);
                } else {
                    log::warn!("DMA: GPU channel launched with no GPU wired");
                    dma.finish_channel(channel);
                }
            }
            // OTC
            6 => dma.run_otc(&mut self.ram),
            _ => {
                log::warn!("DMA: transfer on unsupported channel {}", channel);
                dma.finish_channel(channel);
            }
        }
    }
}
