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

//! Texture sampling
//!
//! Texture pages sit on a 64x256-pixel grid in VRAM; 4- and 8-bit
//! texels index a CLUT row. A sampled value of all zeros means fully
//! transparent and the rasterizer skips the write.

use super::super::primitives::{TextureDepth, TextureInfo, Vec2};
use super::super::GPU;

impl GPU {
    /// Sample one texel
    ///
    /// Returns the raw 15-bit pixel (with mask bit); 0 means
    /// transparent.
    pub(in crate::core::gpu) fn sample_texture(&self, u: u8, v: u8, info: &TextureInfo) -> u16 {
        let page_x = info.page_x * 64;
        let page_y = info.page_y * 256;

        match info.depth {
            TextureDepth::Bits4 => {
                // 4 texels per VRAM word
                let texel_x = page_x + (u as i32) / 4;
                let texel_y = page_y + v as i32;
                let data = self.get_pixel(Vec2::new(texel_x, texel_y));
                let index = (data >> ((u % 4) * 4)) & 0xF;
                self.get_pixel(Vec2::new(info.clut_x + index as i32, info.clut_y))
            }
            TextureDepth::Bits8 => {
                // 2 texels per VRAM word
                let texel_x = page_x + (u as i32) / 2;
                let texel_y = page_y + v as i32;
                let data = self.get_pixel(Vec2::new(texel_x, texel_y));
                let index = (data >> ((u % 2) * 8)) & 0xFF;
                self.get_pixel(Vec2::new(info.clut_x + index as i32, info.clut_y))
            }
            TextureDepth::Bits15 | TextureDepth::Reserved => {
                self.get_pixel(Vec2::new(page_x + u as i32, page_y + v as i32))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_15bit_sampling() {
        let mut gpu = GPU::new();
        gpu.set_pixel(Vec2::new(64, 256), 0x7C1F);

        let info = TextureInfo {
            page_x: 1,
            page_y: 1,
            clut_x: 0,
            clut_y: 0,
            depth: TextureDepth::Bits15,
        };
        assert_eq!(gpu.sample_texture(0, 0, &info), 0x7C1F);
    }

    #[test]
    fn test_4bit_clut_indexing() {
        let mut gpu = GPU::new();
        // One VRAM word holding texel indices 1,2,3,4 (low nibble first)
        gpu.set_pixel(Vec2::new(0, 0), 0x4321);
        // CLUT row at y=500
        for i in 0..16 {
            gpu.set_pixel(Vec2::new(i, 500), 0x1000 + i as u16);
        }

        let info = TextureInfo {
            page_x: 0,
            page_y: 0,
            clut_x: 0,
            clut_y: 500,
            depth: TextureDepth::Bits4,
        };

        assert_eq!(gpu.sample_texture(0, 0, &info), 0x1001);
        assert_eq!(gpu.sample_texture(1, 0, &info), 0x1002);
        assert_eq!(gpu.sample_texture(2, 0, &info), 0x1003);
        assert_eq!(gpu.sample_texture(3, 0, &info), 0x1004);
    }

    #[test]
    fn test_8bit_clut_indexing() {
        let mut gpu = GPU::new();
        // Two texels 0x05 (low byte) and 0x0A (high byte)
        gpu.set_pixel(Vec2::new(0, 0), 0x0A05);
        gpu.set_pixel(Vec2::new(5, 100), 0xAAAA);
        gpu.set_pixel(Vec2::new(10, 100), 0xBBBB);

        let info = TextureInfo {
            page_x: 0,
            page_y: 0,
            clut_x: 0,
            clut_y: 100,
            depth: TextureDepth::Bits8,
        };

        assert_eq!(gpu.sample_texture(0, 0, &info), 0xAAAA);
        assert_eq!(gpu.sample_texture(1, 0, &info), 0xBBBB);
    }

    #[test]
    fn test_zero_pixel_is_transparent_marker() {
        let gpu = GPU::new();
        let info = TextureInfo {
            page_x: 0,
            page_y: 0,
            clut_x: 0,
            clut_y: 0,
            depth: TextureDepth::Bits15,
        };
        assert_eq!(gpu.sample_texture(10, 10, &info), 0);
    }
}
