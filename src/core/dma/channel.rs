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

//! Per-channel DMA register state

use crate::core::error::Result;
use crate::core::state::StateBuffer;

/// CHCR sync mode (bits 10:9)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Transfer everything at once
    Burst = 0,
    /// Transfer block-by-block on device request
    Slice = 1,
    /// Walk a linked list of GPU packets
    LinkedList = 2,
    /// Not a valid mode
    Reserved = 3,
}

impl SyncMode {
    fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => SyncMode::Burst,
            1 => SyncMode::Slice,
            2 => SyncMode::LinkedList,
            _ => SyncMode::Reserved,
        }
    }
}

/// CHCR address step direction (bit 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// +4 per word
    Increment = 0,
    /// -4 per word
    Decrement = 1,
}

/// CHCR transfer direction (bit 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to RAM
    ToRam = 0,
    /// RAM to device
    FromRam = 1,
}

/// One DMA channel: MADR, BCR and the decomposed CHCR
#[derive(Debug, Clone, Copy)]
pub struct DmaChannel {
    /// Base address (low 24 bits stored)
    madr: u32,

    /// Block count (BCR low 16) / word count for OTC
    block_count: u16,

    /// Block size in words (BCR high 16)
    block_size: u16,

    // Decomposed CHCR
    pub direction: Direction,
    pub step: Step,
    pub chop_enable: bool,
    pub sync_mode: SyncMode,
    pub chop_dma_size: u8,
    pub chop_cpu_size: u8,
    /// Transfer active (bit 24)
    pub active: bool,
    /// Force start without waiting for DREQ (bit 28)
    pub force_start: bool,
}

impl DmaChannel {
    pub fn new() -> Self {
        Self {
            madr: 0,
            block_count: 0,
            block_size: 0,
            direction: Direction::ToRam,
            step: Step::Increment,
            chop_enable: false,
            sync_mode: SyncMode::Burst,
            chop_dma_size: 0,
            chop_cpu_size: 0,
            active: false,
            force_start: false,
        }
    }

    /// MADR: base address, masked to 24 bits
    pub fn madr(&self) -> u32 {
        self.madr
    }

    pub fn set_madr(&mut self, value: u32) {
        self.madr = value & 0x00FF_FFFF;
    }

    /// BCR: block count low, block size high
    pub fn bcr(&self) -> u32 {
        ((self.block_size as u32) << 16) | self.block_count as u32
    }

    pub fn set_bcr(&mut self, value: u32) {
        self.block_count = value as u16;
        self.block_size = (value >> 16) as u16;
    }

    pub fn block_count(&self) -> u16 {
        self.block_count
    }

    pub fn block_size(&self) -> u16 {
        self.block_size
    }

    /// CHCR assembled from the decomposed fields
    pub fn chcr(&self) -> u32 {
        let mut value = 0;
        value |= self.direction as u32;
        value |= (self.step as u32) << 1;
        value |= (self.chop_enable as u32) << 8;
        value |= (self.sync_mode as u32) << 9;
        value |= (self.chop_dma_size as u32) << 16;
        value |= (self.chop_cpu_size as u32) << 20;
        value |= (self.active as u32) << 24;
        value |= (self.force_start as u32) << 28;
        value
    }

    pub fn set_chcr(&mut self, value: u32) {
        self.direction = if value & 1 != 0 {
            Direction::FromRam
        } else {
            Direction::ToRam
        };
        self.step = if value & (1 << 1) != 0 {
            Step::Decrement
        } else {
            Step::Increment
        };
        self.chop_enable = value & (1 << 8) != 0;
        self.sync_mode = SyncMode::from_bits(value >> 9);
        self.chop_dma_size = ((value >> 16) & 7) as u8;
        self.chop_cpu_size = ((value >> 20) & 7) as u8;
        self.active = value & (1 << 24) != 0;
        self.force_start = value & (1 << 28) != 0;
    }

    /// A completed transfer drops both launch bits
    pub fn finish(&mut self) {
        self.active = false;
        self.force_start = false;
    }

    pub fn serialize(&self, buf: &mut StateBuffer) {
        buf.write_u32(self.madr);
        buf.write_u32(self.bcr());
        buf.write_u32(self.chcr());
    }

    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        self.madr = buf.read_u32()?;
        let bcr = buf.read_u32()?;
        self.set_bcr(bcr);
        let chcr = buf.read_u32()?;
        self.set_chcr(chcr);
        Ok(())
    }
}

impl Default for DmaChannel {
    fn default() -> Self {
        Self::new()
    }
}
