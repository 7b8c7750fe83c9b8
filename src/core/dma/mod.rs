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

//! DMA controller
//!
//! Seven channels at 0x1F801080 + 0x10*n (MDECin, MDECout, GPU, CDROM,
//! SPU, PIO, OTC), each exposing MADR/BCR/CHCR, plus the common
//! DPCR/DICR pair. A CHCR write that raises the active or force-start
//! bit launches the transfer synchronously; from the CPU's point of
//! view the data has already moved when the store retires.
//!
//! Only the ordering-table (OTC) and GPU transfers are modeled. The
//! channel interrupt bits in DICR are storage only and never drive the
//! interrupt controller.

mod channel;

pub use channel::{Direction, DmaChannel, Step, SyncMode};

use crate::core::error::Result;
use crate::core::gpu::GPU;
use crate::core::state::StateBuffer;

/// Linked-list terminator / MADR mask
const END_TAG: u32 = 0x00FF_FFFF;

/// Channel register window base
const DMA_BASE: u32 = 0x1F80_1080;

/// DMA controller
///
/// # Channels
///
/// | # | Device  |
/// |---|---------|
/// | 0 | MDECin  |
/// | 1 | MDECout |
/// | 2 | GPU     |
/// | 3 | CDROM   |
/// | 4 | SPU     |
/// | 5 | PIO     |
/// | 6 | OTC     |
pub struct Dma {
    channels: [DmaChannel; 7],

    /// DPCR - per-channel priority/enable, storage only
    dpcr: u32,

    /// DICR - interrupt control, storage only in this core
    dicr: u32,

    /// Channel whose launch bits were just raised by a CHCR write
    pending_transfer: Option<usize>,
}

impl Dma {
    /// Create the controller in its reset state
    pub fn new() -> Self {
        Self {
            channels: [DmaChannel::new(); 7],
            dpcr: 0x0765_4321,
            dicr: 0,
            pending_transfer: None,
        }
    }

    /// Reset all channels and the common registers
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Channel accessor (diagnostics and tests)
    pub fn channel(&self, index: usize) -> &DmaChannel {
        &self.channels[index]
    }

    /// Read a DMA register by physical address
    pub fn read32(&self, paddr: u32) -> u32 {
        let offset = paddr - DMA_BASE;
        let channel = ((offset >> 4) & 0xF) as usize;
        let register = (offset & 0xF) >> 2;

        if channel == 7 {
            return match register {
                0 => self.dpcr,
                1 => self.dicr,
                _ => 0,
            };
        }

        match register {
            0 => self.channels[channel].madr(),
            1 => self.channels[channel].bcr(),
            2 => self.channels[channel].chcr(),
            _ => 0,
        }
    }

    /// Write a DMA register by physical address
    ///
    /// A CHCR write that raises active/force-start marks the channel
    /// pending; the bus collects it via [`Dma::take_pending_transfer`]
    /// and runs the transfer immediately.
    pub fn write32(&mut self, paddr: u32, value: u32) {
        let offset = paddr - DMA_BASE;
        let channel = ((offset >> 4) & 0xF) as usize;
        let register = (offset & 0xF) >> 2;

        if channel == 7 {
            match register {
                0 => self.dpcr = value,
                1 => self.dicr = value,
                _ => log::warn!("DMA: write to unknown common register {}", register),
            }
            return;
        }

        match register {
            0 => self.channels[channel].set_madr(value),
            1 => self.channels[channel].set_bcr(value),
            2 => {
                self.channels[channel].set_chcr(value);
                let chan = &self.channels[channel];
                if chan.active || chan.force_start {
                    self.pending_transfer = Some(channel);
                }
            }
            _ => log::warn!("DMA: write to unknown channel register {}", register),
        }
    }

    /// Take the channel launched by the last CHCR write, if any
    pub fn take_pending_transfer(&mut self) -> Option<usize> {
        self.pending_transfer.take()
    }

    /// Drop a channel's launch bits without running a transfer
    ///
    /// Used for channels whose device side is not modeled.
    pub fn finish_channel(&mut self, channel: usize) {
        self.channels[channel].finish();
    }

    /// OTC (channel 6): initialize the ordering table
    ///
    /// Writes the end marker at MADR; each of the `count - 1` words
    /// above it points at the entry one word below:
    /// `mem[MADR + i*4] = MADR + (i-1)*4`.
    pub fn run_otc(&mut self, ram: &mut [u8]) {
        let madr = self.channels[6].madr() & !0x3;
        let count = self.channels[6].block_count() as u32;

        log::debug!("DMA: OTC init, MADR=0x{:06X}, count={}", madr, count);

        write_ram_word(ram, madr, END_TAG);
        for i in 1..count {
            let addr = madr.wrapping_add(i * 4);
            write_ram_word(ram, addr, (addr.wrapping_sub(4)) & END_TAG);
        }

        self.channels[6].finish();
    }

    /// GPU (channel 2): linked-list or slice transfer into GP0
    pub fn run_gpu(&mut self, ram: &mut [u8], gpu: &mut GPU) {
        match self.channels[2].sync_mode {
            SyncMode::LinkedList => self.run_gpu_linked_list(ram, gpu),
            SyncMode::Slice => self.run_gpu_slice(ram, gpu),
            mode => {
                log::warn!("DMA: GPU sync mode {:?} not supported", mode);
                self.channels[2].finish();
            }
        }
    }

    /// Walk a chain of GPU packets
    ///
    /// Each header carries the packet word count in its top byte and
    /// the next-packet pointer in the low 24 bits; the chain ends on a
    /// pointer of 0xFFFFFF.
    fn run_gpu_linked_list(&mut self, ram: &mut [u8], gpu: &mut GPU) {
        if self.channels[2].direction != Direction::FromRam {
            log::warn!("DMA: GPU linked list only runs RAM->device");
            self.channels[2].finish();
            return;
        }

        let step = match self.channels[2].step {
            Step::Increment => 4u32,
            Step::Decrement => 4u32.wrapping_neg(),
        };

        let mut addr = self.channels[2].madr() & !0x3;
        // A malformed chain with no terminator would spin forever;
        // cap the walk at one packet per RAM word.
        let mut packet_budget = (ram.len() / 4) as u32;

        loop {
            let header = read_ram_word(ram, addr);
            let word_count = header >> 24;

            let mut word_addr = addr;
            for _ in 0..word_count {
                word_addr = word_addr.wrapping_add(step);
                gpu.write_gp0(read_ram_word(ram, word_addr));
            }
            self.channels[2].set_madr(word_addr);

            let next = header & END_TAG;
            if next == END_TAG {
                break;
            }
            addr = next & !0x3;

            packet_budget = packet_budget.saturating_sub(1);
            if packet_budget == 0 {
                log::error!("DMA: GPU linked list never terminated, aborting walk");
                break;
            }
        }

        self.channels[2].finish();
    }

    /// Copy block_size * block_count words from MADR into GP0
    fn run_gpu_slice(&mut self, ram: &mut [u8], gpu: &mut GPU) {
        if self.channels[2].direction != Direction::FromRam {
            log::warn!("DMA: GPU slice transfer device->RAM not supported");
            self.channels[2].finish();
            return;
        }

        let words = self.channels[2].block_size() as u32 * self.channels[2].block_count() as u32;
        let step = match self.channels[2].step {
            Step::Increment => 4u32,
            Step::Decrement => 4u32.wrapping_neg(),
        };

        let mut addr = self.channels[2].madr() & !0x3;
        for _ in 0..words {
            gpu.write_gp0(read_ram_word(ram, addr));
            addr = addr.wrapping_add(step);
        }
        self.channels[2].set_madr(addr);
        self.channels[2].finish();
    }

    /// Serialize all channels and the common registers
    pub fn serialize(&self, buf: &mut StateBuffer) {
        for chan in &self.channels {
            chan.serialize(buf);
        }
        buf.write_u32(self.dpcr);
        buf.write_u32(self.dicr);
    }

    /// Restore all channels and the common registers
    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        for chan in &mut self.channels {
            chan.deserialize(buf)?;
        }
        self.dpcr = buf.read_u32()?;
        self.dicr = buf.read_u32()?;
        self.pending_transfer = None;
        Ok(())
    }
}

impl Default for Dma {
    fn default() -> Self {
        Self::new()
    }
}

/// RAM word read, address folded onto the 2 MiB mirror
fn read_ram_word(ram: &[u8], addr: u32) -> u32 {
    let offset = (addr as usize) & (ram.len() - 1) & !0x3;
    u32::from_le_bytes([
        ram[offset],
        ram[offset + 1],
        ram[offset + 2],
        ram[offset + 3],
    ])
}

/// RAM word write, address folded onto the 2 MiB mirror
fn write_ram_word(ram: &mut [u8], addr: u32, value: u32) {
    let offset = (addr as usize) & (ram.len() - 1) & !0x3;
    ram[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram() -> Vec<u8> {
        vec![0u8; 2 * 1024 * 1024]
    }

    fn word_at(ram: &[u8], addr: u32) -> u32 {
        read_ram_word(ram, addr)
    }

    #[test]
    fn test_register_window_decode() {
        let mut dma = Dma::new();
        dma.write32(0x1F8010A0, 0x00123456); // GPU MADR
        dma.write32(0x1F8010A4, 0x00040010); // GPU BCR
        assert_eq!(dma.read32(0x1F8010A0), 0x00123456);
        assert_eq!(dma.read32(0x1F8010A4), 0x00040010);
    }

    #[test]
    fn test_dpcr_reset_value() {
        let dma = Dma::new();
        assert_eq!(dma.read32(0x1F8010F0), 0x0765_4321);
    }

    #[test]
    fn test_dicr_is_plain_storage() {
        let mut dma = Dma::new();
        dma.write32(0x1F8010F4, 0x00FF803F);
        assert_eq!(dma.read32(0x1F8010F4), 0x00FF803F);
    }

    #[test]
    fn test_chcr_start_marks_pending() {
        let mut dma = Dma::new();
        assert!(dma.take_pending_transfer().is_none());

        dma.write32(0x1F8010E8, 1 << 28); // OTC CHCR force start
        assert_eq!(dma.take_pending_transfer(), Some(6));
        assert!(dma.take_pending_transfer().is_none());
    }

    #[test]
    fn test_otc_ordering_table_layout() {
        let mut ram = ram();
        let mut dma = Dma::new();

        dma.write32(0x1F8010E0, 0x00100020); // OTC MADR
        dma.write32(0x1F8010E4, 8); // count in BCR low half
        dma.write32(0x1F8010E8, 1 << 28);
        assert_eq!(dma.take_pending_transfer(), Some(6));

        dma.run_otc(&mut ram);

        // End marker at MADR, each entry above pointing one word down
        assert_eq!(word_at(&ram, 0x100020), 0x00FF_FFFF);
        assert_eq!(word_at(&ram, 0x100024), 0x0010_0020);
        assert_eq!(word_at(&ram, 0x100028), 0x0010_0024);
        assert_eq!(word_at(&ram, 0x10002C), 0x0010_0028);
        assert_eq!(word_at(&ram, 0x100030), 0x0010_002C);
        assert_eq!(word_at(&ram, 0x100034), 0x0010_0030);
        assert_eq!(word_at(&ram, 0x100038), 0x0010_0034);
        assert_eq!(word_at(&ram, 0x10003C), 0x0010_0038);

        // launch bits cleared on completion
        let chcr = dma.read32(0x1F8010E8);
        assert_eq!(chcr & ((1 << 24) | (1 << 28)), 0);
    }

    #[test]
    fn test_gpu_linked_list_pushes_packet_words() {
        let mut ram = ram();
        let mut gpu = GPU::new();
        let mut dma = Dma::new();

        // One packet at 0x1000 with a single word (GP0 NOP), then end
        write_ram_word(&mut ram, 0x1000, (1 << 24) | END_TAG);
        write_ram_word(&mut ram, 0x1004, 0x00000000);

        dma.write32(0x1F8010A0, 0x1000);
        dma.write32(0x1F8010A8, (1 << 24) | (2 << 9) | 1); // active, linked list, from RAM
        assert_eq!(dma.take_pending_transfer(), Some(2));

        dma.run_gpu(&mut ram, &mut gpu);

        let chcr = dma.read32(0x1F8010A8);
        assert_eq!(chcr & (1 << 24), 0);
    }

    #[test]
    fn test_gpu_slice_transfers_all_words() {
        let mut ram = ram();
        let mut gpu = GPU::new();
        let mut dma = Dma::new();

        // 4 words of GP0 NOPs at 0x2000
        for i in 0..4 {
            write_ram_word(&mut ram, 0x2000 + i * 4, 0);
        }

        dma.write32(0x1F8010A0, 0x2000);
        dma.write32(0x1F8010A4, (2 << 16) | 2); // 2 blocks of 2 words
        dma.write32(0x1F8010A8, (1 << 24) | (1 << 9) | 1); // active, slice, from RAM
        dma.take_pending_transfer();

        dma.run_gpu(&mut ram, &mut gpu);

        // MADR advanced past the 4 words
        assert_eq!(dma.read32(0x1F8010A0), 0x2010);
        assert_eq!(dma.read32(0x1F8010A8) & (1 << 24), 0);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut dma = Dma::new();
        dma.write32(0x1F8010A0, 0x00123456);
        dma.write32(0x1F8010F4, 0x1234);

        let mut buf = StateBuffer::new();
        dma.serialize(&mut buf);

        let mut restored = Dma::new();
        let mut buf = StateBuffer::from_bytes(buf.into_bytes());
        restored.deserialize(&mut buf).unwrap();

        assert_eq!(restored.read32(0x1F8010A0), 0x00123456);
        assert_eq!(restored.read32(0x1F8010F4), 0x1234);
    }
}
