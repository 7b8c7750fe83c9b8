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

//! GPUSTAT as a decomposed struct
//!
//! The status register is never stored as a word; it is assembled on
//! demand from the fields GP0(E1)/GP1 writes maintain.

use crate::core::error::Result;
use crate::core::gpu::primitives::TextureDepth;
use crate::core::state::StateBuffer;

/// Horizontal resolution select (display mode bits 0-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalRes {
    H256 = 0,
    H320 = 1,
    H512 = 2,
    H640 = 3,
}

/// Vertical resolution select (display mode bit 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalRes {
    V240 = 0,
    V480 = 1,
}

/// PAL/NTSC select (display mode bit 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMode {
    Ntsc = 0,
    Pal = 1,
}

/// Display color depth (display mode bit 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayDepth {
    Bits15 = 0,
    Bits24 = 1,
}

/// GP1(0x04) DMA direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDirection {
    Off = 0,
    Fifo = 1,
    CpuToGp0 = 2,
    VramToCpu = 3,
}

/// Decomposed GPUSTAT
#[derive(Debug, Clone, Copy)]
pub struct GpuStatus {
    /// Texture page base x in 64-pixel units (bits 0-3)
    pub tex_page_x: u8,
    /// Texture page base y in 256-pixel units (bit 4)
    pub tex_page_y: u8,
    /// Semi-transparency mode (bits 5-6)
    pub semi_transparency: u8,
    /// Texture page color depth (bits 7-8)
    pub tex_depth: TextureDepth,
    /// Dither 24-bit to 15-bit (bit 9)
    pub dither: bool,
    /// Drawing to the display area allowed (bit 10)
    pub draw_to_display: bool,
    /// Force mask bit on drawn pixels (bit 11)
    pub set_mask_bit: bool,
    /// Skip masked pixels when drawing (bit 12)
    pub preserve_masked: bool,
    /// Interlace field (bit 13)
    pub interlace_field: bool,
    /// Horizontal resolution 2 (bit 16)
    pub h_res2: u8,
    /// Horizontal resolution 1 (bits 17-18)
    pub h_res1: HorizontalRes,
    /// Vertical resolution (bit 19)
    pub v_res: VerticalRes,
    /// PAL/NTSC (bit 20)
    pub video_mode: VideoMode,
    /// Display color depth (bit 21)
    pub display_depth: DisplayDepth,
    /// Vertical interlace enable (bit 22)
    pub v_interlace: bool,
    /// Display disabled (bit 23)
    pub display_disabled: bool,
    /// Interrupt request (bit 24)
    pub irq: bool,
    /// DMA data request (bit 25)
    pub dreq: bool,
    /// Ready to receive a GP0 command (bit 26)
    pub ready_receive_cmd: bool,
    /// Ready to send VRAM to the CPU (bit 27)
    pub ready_send_vram: bool,
    /// Ready to receive a DMA block (bit 28)
    pub ready_receive_dma: bool,
    /// DMA direction (bits 29-30)
    pub dma_direction: DmaDirection,
    /// Drawing even/odd lines in interlace (bit 31)
    pub interlace_draw_lines: bool,
}

impl GpuStatus {
    /// Power-on status: ready bits raised, display disabled
    pub fn new() -> Self {
        Self {
            tex_page_x: 0,
            tex_page_y: 0,
            semi_transparency: 0,
            tex_depth: TextureDepth::Bits4,
            dither: false,
            draw_to_display: false,
            set_mask_bit: false,
            preserve_masked: false,
            interlace_field: true,
            h_res2: 0,
            h_res1: HorizontalRes::H256,
            v_res: VerticalRes::V240,
            video_mode: VideoMode::Ntsc,
            display_depth: DisplayDepth::Bits15,
            v_interlace: false,
            display_disabled: true,
            irq: false,
            dreq: false,
            ready_receive_cmd: true,
            ready_send_vram: true,
            ready_receive_dma: true,
            dma_direction: DmaDirection::Off,
            interlace_draw_lines: false,
        }
    }

    /// Assemble the GPUSTAT word
    pub fn word(&self) -> u32 {
        let mut result = 0u32;
        result |= self.tex_page_x as u32;
        result |= (self.tex_page_y as u32) << 4;
        result |= (self.semi_transparency as u32) << 5;
        result |= (self.tex_depth as u32) << 7;
        result |= (self.dither as u32) << 9;
        result |= (self.draw_to_display as u32) << 10;
        result |= (self.set_mask_bit as u32) << 11;
        result |= (self.preserve_masked as u32) << 12;
        result |= (self.interlace_field as u32) << 13;
        result |= (self.h_res2 as u32) << 16;
        result |= (self.h_res1 as u32) << 17;
        result |= (self.v_res as u32) << 19;
        result |= (self.video_mode as u32) << 20;
        result |= (self.display_depth as u32) << 21;
        result |= (self.v_interlace as u32) << 22;
        result |= (self.display_disabled as u32) << 23;
        result |= (self.irq as u32) << 24;
        result |= (self.dreq as u32) << 25;
        result |= (self.ready_receive_cmd as u32) << 26;
        result |= (self.ready_send_vram as u32) << 27;
        result |= (self.ready_receive_dma as u32) << 28;
        result |= (self.dma_direction as u32) << 29;
        result |= (self.interlace_draw_lines as u32) << 31;
        result
    }

    /// Apply a GP0(E1) draw-mode word
    pub fn set_draw_mode(&mut self, mode: u32) {
        self.tex_page_x = (mode & 0xF) as u8;
        self.tex_page_y = ((mode >> 4) & 1) as u8;
        self.semi_transparency = ((mode >> 5) & 3) as u8;
        self.tex_depth = TextureDepth::from_bits(mode >> 7);
        self.dither = (mode >> 9) & 1 != 0;
        self.draw_to_display = (mode >> 10) & 1 != 0;
    }

    /// Apply a GP1(0x08) display-mode word
    pub fn set_display_mode(&mut self, mode: u32) {
        self.h_res1 = match mode & 3 {
            0 => HorizontalRes::H256,
            1 => HorizontalRes::H320,
            2 => HorizontalRes::H512,
            _ => HorizontalRes::H640,
        };
        self.v_res = if (mode >> 2) & 1 != 0 {
            VerticalRes::V480
        } else {
            VerticalRes::V240
        };
        self.video_mode = if (mode >> 3) & 1 != 0 {
            VideoMode::Pal
        } else {
            VideoMode::Ntsc
        };
        self.display_depth = if (mode >> 4) & 1 != 0 {
            DisplayDepth::Bits24
        } else {
            DisplayDepth::Bits15
        };
        self.v_interlace = (mode >> 5) & 1 != 0;
        self.h_res2 = ((mode >> 6) & 1) as u8;
    }

    /// Serialize as the assembled word plus the depth discriminant
    pub fn serialize(&self, buf: &mut StateBuffer) {
        buf.write_u32(self.word());
    }

    /// Restore from the assembled word
    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        let word = buf.read_u32()?;
        self.tex_page_x = (word & 0xF) as u8;
        self.tex_page_y = ((word >> 4) & 1) as u8;
        self.semi_transparency = ((word >> 5) & 3) as u8;
        self.tex_depth = TextureDepth::from_bits(word >> 7);
        self.dither = (word >> 9) & 1 != 0;
        self.draw_to_display = (word >> 10) & 1 != 0;
        self.set_mask_bit = (word >> 11) & 1 != 0;
        self.preserve_masked = (word >> 12) & 1 != 0;
        self.interlace_field = (word >> 13) & 1 != 0;
        self.h_res2 = ((word >> 16) & 1) as u8;
        self.h_res1 = match (word >> 17) & 3 {
            0 => HorizontalRes::H256,
            1 => HorizontalRes::H320,
            2 => HorizontalRes::H512,
            _ => HorizontalRes::H640,
        };
        self.v_res = if (word >> 19) & 1 != 0 {
            VerticalRes::V480
        } else {
            VerticalRes::V240
        };
        self.video_mode = if (word >> 20) & 1 != 0 {
            VideoMode::Pal
        } else {
            VideoMode::Ntsc
        };
        self.display_depth = if (word >> 21) & 1 != 0 {
            DisplayDepth::Bits24
        } else {
            DisplayDepth::Bits15
        };
        self.v_interlace = (word >> 22) & 1 != 0;
        self.display_disabled = (word >> 23) & 1 != 0;
        self.irq = (word >> 24) & 1 != 0;
        self.dreq = (word >> 25) & 1 != 0;
        self.ready_receive_cmd = (word >> 26) & 1 != 0;
        self.ready_send_vram = (word >> 27) & 1 != 0;
        self.ready_receive_dma = (word >> 28) & 1 != 0;
        self.dma_direction = match (word >> 29) & 3 {
            0 => DmaDirection::Off,
            1 => DmaDirection::Fifo,
            2 => DmaDirection::CpuToGp0,
            _ => DmaDirection::VramToCpu,
        };
        self.interlace_draw_lines = (word >> 31) != 0;
        Ok(())
    }
}

impl Default for GpuStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_ready_bits() {
        let status = GpuStatus::new();
        let word = status.word();
        assert_ne!(word & (1 << 26), 0, "ready to receive command");
        assert_ne!(word & (1 << 27), 0, "ready to send VRAM");
        assert_ne!(word & (1 << 28), 0, "ready to receive DMA");
        assert_ne!(word & (1 << 23), 0, "display starts disabled");
    }

    #[test]
    fn test_draw_mode_fields() {
        let mut status = GpuStatus::new();
        status.set_draw_mode(0x0000_02A7);
        assert_eq!(status.tex_page_x, 7);
        assert_eq!(status.tex_page_y, 0);
        assert_eq!(status.semi_transparency, 1);
        assert_eq!(status.tex_depth, TextureDepth::Bits8);
        assert!(status.dither);

        let word = status.word();
        assert_eq!(word & 0xF, 7);
        assert_eq!((word >> 7) & 3, 1);
    }

    #[test]
    fn test_display_mode_fields() {
        let mut status = GpuStatus::new();
        // 320x240 NTSC, 15-bit
        status.set_display_mode(0x01);
        assert_eq!(status.h_res1, HorizontalRes::H320);
        assert_eq!(status.v_res, VerticalRes::V240);
        assert_eq!(status.video_mode, VideoMode::Ntsc);

        // PAL + 480i
        status.set_display_mode(0x2C);
        assert_eq!(status.v_res, VerticalRes::V480);
        assert_eq!(status.video_mode, VideoMode::Pal);
        assert!(status.v_interlace);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut status = GpuStatus::new();
        status.set_draw_mode(0x1FF);
        status.irq = true;
        status.dma_direction = DmaDirection::CpuToGp0;

        let mut buf = StateBuffer::new();
        status.serialize(&mut buf);

        let mut restored = GpuStatus::new();
        let mut buf = StateBuffer::from_bytes(buf.into_bytes());
        restored.deserialize(&mut buf).unwrap();

        assert_eq!(restored.word(), status.word());
    }
}
