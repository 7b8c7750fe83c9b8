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

//! GPU: command ports, software rasterizer and VRAM
//!
//! GP0 (0x1F801810 writes) takes rendering commands and VRAM data;
//! GP1 (0x1F801814 writes) takes display control. Reads return GPUREAD
//! and GPUSTAT respectively. VRAM is a flat 1024x512 buffer of 16-bit
//! ABGR-1555 pixels.

mod gp0;
mod gp1;
pub mod primitives;
mod registers;
mod render;

pub use gp0::{CommandKind, Gp0State};
pub use registers::{DmaDirection, GpuStatus, HorizontalRes, VerticalRes, VideoMode};

use crate::core::error::Result;
use crate::core::state::StateBuffer;
use gp0::{Gp0Command, VramCopy};
use primitives::Vec2;

/// VRAM width in pixels
pub const VRAM_WIDTH: i32 = 1024;
/// VRAM height in pixels
pub const VRAM_HEIGHT: i32 = 512;
/// VRAM size in bytes (16 bpp)
pub const VRAM_SIZE: usize = (VRAM_WIDTH * VRAM_HEIGHT * 2) as usize;

// NTSC timing: the GPU clock runs at 11/7 the CPU clock, one scanline
// is 3413 dot cycles and a frame scans 263 lines
const NTSC_CLOCK_NUMERATOR: u64 = 11;
const NTSC_CLOCK_DENOMINATOR: u64 = 7;
const NTSC_HCYCLES: u64 = 3413;
const NTSC_SCANLINES: u32 = 263;

/// Device events produced by one GPU tick
#[derive(Debug, Clone, Copy, Default)]
pub struct GpuTickEvents {
    /// Scanlines completed during this tick
    pub hblanks: u32,
    /// A full frame completed (raise VBLANK)
    pub vblank: bool,
}

/// GPU state: VRAM, decomposed status, and the GP0 command machine
///
/// # Example
///
/// ```
/// use rogem::core::gpu::GPU;
///
/// let mut gpu = GPU::new();
/// // Quick fill 16x16 at the origin with red
/// gpu.write_gp0(0x02FF0000);
/// gpu.write_gp0(0x00000000);
/// gpu.write_gp0(0x00100010);
/// ```
pub struct GPU {
    /// VRAM backing store (1 MiB of 16-bit pixels)
    vram: Vec<u8>,

    /// Decomposed GPUSTAT
    pub(in crate::core::gpu) status: GpuStatus,

    /// Latched GPUREAD value
    pub(in crate::core::gpu) gpu_read: u32,

    /// GP0 decoder state
    pub(in crate::core::gpu) gp0_state: Gp0State,

    /// The in-flight GP0 command
    pub(in crate::core::gpu) current_cmd: Gp0Command,

    /// CPU-to-VRAM blit cursor
    pub(in crate::core::gpu) vram_copy: VramCopy,

    // Drawing environment (GP0 E2-E6)
    pub(in crate::core::gpu) draw_area_top_left: Vec2,
    pub(in crate::core::gpu) draw_area_bottom_right: Vec2,
    pub(in crate::core::gpu) draw_offset: Vec2,
    pub(in crate::core::gpu) texture_window_mask_x: u8,
    pub(in crate::core::gpu) texture_window_mask_y: u8,
    pub(in crate::core::gpu) texture_window_offset_x: u8,
    pub(in crate::core::gpu) texture_window_offset_y: u8,
    pub(in crate::core::gpu) texture_rect_flip_x: bool,
    pub(in crate::core::gpu) texture_rect_flip_y: bool,

    // Display configuration (GP1 0x05-0x07)
    pub(in crate::core::gpu) display_vram_start: (u16, u16),
    pub(in crate::core::gpu) display_h_range: (u16, u16),
    pub(in crate::core::gpu) display_v_range: (u16, u16),

    /// Dot-cycle accumulator (in CPU cycles * 11)
    dot_cycles: u64,

    /// Current scanline (0..263)
    scanline: u32,
}

impl GPU {
    /// Create a GPU in its power-on state
    pub fn new() -> Self {
        Self {
            vram: vec![0u8; VRAM_SIZE],
            status: GpuStatus::new(),
            gpu_read: 0,
            gp0_state: Gp0State::WaitingForCommand,
            current_cmd: Gp0Command::new(),
            vram_copy: VramCopy::default(),
            draw_area_top_left: Vec2::default(),
            draw_area_bottom_right: Vec2::default(),
            draw_offset: Vec2::default(),
            texture_window_mask_x: 0,
            texture_window_mask_y: 0,
            texture_window_offset_x: 0,
            texture_window_offset_y: 0,
            texture_rect_flip_x: false,
            texture_rect_flip_y: false,
            display_vram_start: (0, 0),
            display_h_range: (0, 0),
            display_v_range: (0, 0),
            dot_cycles: 0,
            scanline: 0,
        }
    }

    /// Full reset (GP1 0x00 and system reset): status, command state
    /// and VRAM
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Assemble GPUSTAT
    pub fn status(&self) -> u32 {
        self.status.word()
    }

    /// Read GPUREAD
    pub fn read_gpuread(&self) -> u32 {
        self.gpu_read
    }

    /// Advance the video beam
    ///
    /// Accumulates `cycles * 11/7` dot cycles; every 3413 of them ends
    /// a scanline, and rolling past 263 scanlines completes the frame
    /// and raises VBLANK exactly once.
    pub fn tick(&mut self, cycles: u32) -> GpuTickEvents {
        let mut events = GpuTickEvents::default();

        self.dot_cycles += cycles as u64 * NTSC_CLOCK_NUMERATOR;
        let scanline_cost = NTSC_HCYCLES * NTSC_CLOCK_DENOMINATOR;

        while self.dot_cycles >= scanline_cost {
            self.dot_cycles -= scanline_cost;
            events.hblanks += 1;

            if self.status.v_interlace || self.status.interlace_field {
                self.status.interlace_draw_lines = !self.status.interlace_draw_lines;
            }

            self.scanline += 1;
            if self.scanline >= NTSC_SCANLINES {
                self.scanline = 0;
                self.status.interlace_draw_lines = false;
                events.vblank = true;
            }
        }

        events
    }

    /// Current scanline (diagnostics)
    pub fn scanline(&self) -> u32 {
        self.scanline
    }

    /// Raw VRAM bytes (for a host front-end)
    pub fn vram(&self) -> &[u8] {
        &self.vram
    }

    /// Write one VRAM pixel; coordinates wrap like the hardware
    pub(in crate::core::gpu) fn set_pixel(&mut self, pos: Vec2, pixel: u16) {
        let x = (pos.x & (VRAM_WIDTH - 1)) as usize;
        let y = (pos.y & (VRAM_HEIGHT - 1)) as usize;
        let index = (y * VRAM_WIDTH as usize + x) * 2;
        self.vram[index] = pixel as u8;
        self.vram[index + 1] = (pixel >> 8) as u8;
    }

    /// Read one VRAM pixel
    pub(in crate::core::gpu) fn get_pixel(&self, pos: Vec2) -> u16 {
        let x = (pos.x & (VRAM_WIDTH - 1)) as usize;
        let y = (pos.y & (VRAM_HEIGHT - 1)) as usize;
        let index = (y * VRAM_WIDTH as usize + x) * 2;
        self.vram[index] as u16 | ((self.vram[index + 1] as u16) << 8)
    }

    /// Read one VRAM pixel by absolute coordinate (tests and hosts)
    pub fn vram_pixel(&self, x: i32, y: i32) -> u16 {
        self.get_pixel(Vec2::new(x, y))
    }

    /// Whether GP0 is between commands
    pub fn is_waiting_for_command(&self) -> bool {
        self.gp0_state == Gp0State::WaitingForCommand
    }

    #[cfg(test)]
    pub(crate) fn set_irq_for_test(&mut self) {
        self.status.irq = true;
    }

    /// Serialize the GPU block (VRAM, status, command machine)
    pub fn serialize(&self, buf: &mut StateBuffer) {
        buf.write_bytes(&self.vram);
        self.status.serialize(buf);
        buf.write_u32(self.gpu_read);
        buf.write_u8(match self.gp0_state {
            Gp0State::WaitingForCommand => 0,
            Gp0State::ReceivingParameters => 1,
            Gp0State::ReceivingDataWords => 2,
        });
        self.current_cmd.serialize(buf);
        buf.write_i32(self.vram_copy.start.x);
        buf.write_i32(self.vram_copy.start.y);
        buf.write_i32(self.vram_copy.size.x);
        buf.write_i32(self.vram_copy.size.y);
        buf.write_i32(self.vram_copy.current.x);
        buf.write_i32(self.vram_copy.current.y);
        buf.write_i32(self.draw_area_top_left.x);
        buf.write_i32(self.draw_area_top_left.y);
        buf.write_i32(self.draw_area_bottom_right.x);
        buf.write_i32(self.draw_area_bottom_right.y);
        buf.write_i32(self.draw_offset.x);
        buf.write_i32(self.draw_offset.y);
        buf.write_u8(self.texture_window_mask_x);
        buf.write_u8(self.texture_window_mask_y);
        buf.write_u8(self.texture_window_offset_x);
        buf.write_u8(self.texture_window_offset_y);
        buf.write_bool(self.texture_rect_flip_x);
        buf.write_bool(self.texture_rect_flip_y);
        buf.write_u16(self.display_vram_start.0);
        buf.write_u16(self.display_vram_start.1);
        buf.write_u16(self.display_h_range.0);
        buf.write_u16(self.display_h_range.1);
        buf.write_u16(self.display_v_range.0);
        buf.write_u16(self.display_v_range.1);
        buf.write_u64(self.dot_cycles);
        buf.write_u32(self.scanline);
    }

    /// Restore the GPU block
    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        buf.read_bytes_into(&mut self.vram)?;
        self.status.deserialize(buf)?;
        self.gpu_read = buf.read_u32()?;
        self.gp0_state = match buf.read_u8()? {
            1 => Gp0State::ReceivingParameters,
            2 => Gp0State::ReceivingDataWords,
            _ => Gp0State::WaitingForCommand,
        };
        self.current_cmd.deserialize(buf)?;
        self.vram_copy.start.x = buf.read_i32()?;
        self.vram_copy.start.y = buf.read_i32()?;
        self.vram_copy.size.x = buf.read_i32()?;
        self.vram_copy.size.y = buf.read_i32()?;
        self.vram_copy.current.x = buf.read_i32()?;
        self.vram_copy.current.y = buf.read_i32()?;
        self.draw_area_top_left.x = buf.read_i32()?;
        self.draw_area_top_left.y = buf.read_i32()?;
        self.draw_area_bottom_right.x = buf.read_i32()?;
        self.draw_area_bottom_right.y = buf.read_i32()?;
        self.draw_offset.x = buf.read_i32()?;
        self.draw_offset.y = buf.read_i32()?;
        self.texture_window_mask_x = buf.read_u8()?;
        self.texture_window_mask_y = buf.read_u8()?;
        self.texture_window_offset_x = buf.read_u8()?;
        self.texture_window_offset_y = buf.read_u8()?;
        self.texture_rect_flip_x = buf.read_bool()?;
        self.texture_rect_flip_y = buf.read_bool()?;
        self.display_vram_start = (buf.read_u16()?, buf.read_u16()?);
        self.display_h_range = (buf.read_u16()?, buf.read_u16()?);
        self.display_v_range = (buf.read_u16()?, buf.read_u16()?);
        self.dot_cycles = buf.read_u64()?;
        self.scanline = buf.read_u32()?;
        Ok(())
    }
}

impl Default for GPU {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_rect_fill_scenario() {
        let mut gpu = GPU::new();
        gpu.write_gp0(0x02FF0000);
        gpu.write_gp0(0x00000000);
        gpu.write_gp0(0x00100010);

        // 16x16 block of red, r channel in the low five bits
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(gpu.vram_pixel(x, y), 0x001F, "pixel ({}, {})", x, y);
            }
        }
        // outside the block untouched
        assert_eq!(gpu.vram_pixel(16, 0), 0);
        assert_eq!(gpu.vram_pixel(0, 16), 0);

        // and the decoder accepts a fresh command
        assert!(gpu.is_waiting_for_command());
    }

    #[test]
    fn test_flat_triangle_fills_inside() {
        let mut gpu = GPU::new();
        // Flat white triangle (0,0) (31,0) (0,31)
        gpu.write_gp0(0x20FF_FFFF);
        gpu.write_gp0(0x0000_0000);
        gpu.write_gp0(0x0000_001F);
        gpu.write_gp0(0x001F_0000);

        assert!(gpu.is_waiting_for_command());
        // A point near the corner is inside
        assert_eq!(gpu.vram_pixel(1, 1), 0x7FFF);
        // Far corner stays empty
        assert_eq!(gpu.vram_pixel(30, 30), 0);
    }

    #[test]
    fn test_cpu_to_vram_blit() {
        let mut gpu = GPU::new();
        // 2x2 blit at (10, 10)
        gpu.write_gp0(0xA000_0000);
        gpu.write_gp0(0x000A_000A);
        gpu.write_gp0(0x0002_0002);
        gpu.write_gp0(0x2222_1111);
        gpu.write_gp0(0x4444_3333);

        assert_eq!(gpu.vram_pixel(10, 10), 0x1111);
        assert_eq!(gpu.vram_pixel(11, 10), 0x2222);
        assert_eq!(gpu.vram_pixel(10, 11), 0x3333);
        assert_eq!(gpu.vram_pixel(11, 11), 0x4444);
        assert!(gpu.is_waiting_for_command());
    }

    #[test]
    fn test_vram_to_vram_copy() {
        let mut gpu = GPU::new();
        gpu.set_pixel(Vec2::new(0, 0), 0xABCD);
        gpu.set_pixel(Vec2::new(1, 0), 0x1234);

        // Copy 2x1 from (0,0) to (100,200)
        gpu.write_gp0(0x8000_0000);
        gpu.write_gp0(0x0000_0000);
        gpu.write_gp0(0x00C8_0064);
        gpu.write_gp0(0x0001_0002);

        assert_eq!(gpu.vram_pixel(100, 200), 0xABCD);
        assert_eq!(gpu.vram_pixel(101, 200), 0x1234);
    }

    #[test]
    fn test_vblank_cadence() {
        let mut gpu = GPU::new();
        // One frame of NTSC video: 263 scanlines of 3413 dot cycles,
        // at 11/7 dots per CPU cycle
        let frame_cycles = (263u64 * 3413 * 7 / 11 + 1) as u32;

        let events = gpu.tick(frame_cycles);
        assert!(events.vblank);
        assert!(events.hblanks >= 263);

        // The next few cycles do not raise another VBlank
        let events = gpu.tick(100);
        assert!(!events.vblank);
    }

    #[test]
    fn test_vblank_exactly_once_per_frame() {
        let mut gpu = GPU::new();
        let frame_cycles = 263u64 * 3413 * 7 / 11 + 1;

        let mut vblanks = 0;
        let mut spent = 0u64;
        // Two frames in small steps
        while spent < frame_cycles * 2 {
            let events = gpu.tick(100);
            if events.vblank {
                vblanks += 1;
            }
            spent += 100;
        }
        assert_eq!(vblanks, 2);
    }

    #[test]
    fn test_gpuread_default_zero() {
        let gpu = GPU::new();
        assert_eq!(gpu.read_gpuread(), 0);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut gpu = GPU::new();
        gpu.write_gp0(0x02FF0000);
        gpu.write_gp0(0x00000000);
        gpu.write_gp0(0x00100010);
        gpu.write_gp1(0x0800_0001);
        gpu.tick(10_000);

        let mut buf = StateBuffer::new();
        gpu.serialize(&mut buf);
        let bytes = buf.into_bytes();

        let mut restored = GPU::new();
        let mut rbuf = StateBuffer::from_bytes(bytes.clone());
        restored.deserialize(&mut rbuf).unwrap();

        let mut buf2 = StateBuffer::new();
        restored.serialize(&mut buf2);
        assert_eq!(buf2.into_bytes(), bytes);
    }
}
