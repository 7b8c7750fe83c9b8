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

//! GP1 port: display control commands

use super::gp0::Gp0State;
use super::registers::DmaDirection;
use super::GPU;

impl GPU {
    /// Feed one command word into the GP1 port
    pub fn write_gp1(&mut self, word: u32) {
        let opcode = (word >> 24) & 0xFF;

        match opcode {
            // Full reset: status, command state and VRAM
            0x00 => self.reset(),
            // Reset the command FIFO: drop any half-collected command
            0x01 => {
                self.current_cmd.reset();
                self.gp0_state = Gp0State::WaitingForCommand;
            }
            // Acknowledge the GPU interrupt
            0x02 => {
                self.status.irq = false;
            }
            // Display enable (0 = on)
            0x03 => {
                self.status.display_disabled = word & 1 != 0;
            }
            // DMA direction
            0x04 => {
                self.status.dma_direction = match word & 3 {
                    0 => DmaDirection::Off,
                    1 => DmaDirection::Fifo,
                    2 => DmaDirection::CpuToGp0,
                    _ => DmaDirection::VramToCpu,
                };
            }
            // Start of display area in VRAM
            0x05 => {
                self.display_vram_start = ((word & 0x3FF) as u16, ((word >> 10) & 0x1FF) as u16);
            }
            // Horizontal display range
            0x06 => {
                self.display_h_range = ((word & 0xFFF) as u16, ((word >> 12) & 0xFFF) as u16);
            }
            // Vertical display range
            0x07 => {
                self.display_v_range = ((word & 0x3FF) as u16, ((word >> 10) & 0x3FF) as u16);
            }
            // Display mode
            0x08 => {
                self.status.set_display_mode(word & 0xFF);
            }
            // Read internal register into GPUREAD
            0x10..=0x1F => self.read_internal_register(word & 0xF),
            _ => {
                log::warn!("GPU: unknown GP1 command 0x{:08X}", word);
            }
        }
    }

    /// GP1(0x10): latch an internal register into GPUREAD
    fn read_internal_register(&mut self, register: u32) {
        match register {
            // Texture window setting
            0x02 => {
                self.gpu_read = (self.texture_window_mask_x as u32)
                    | ((self.texture_window_mask_y as u32) << 5)
                    | ((self.texture_window_offset_x as u32) << 10)
                    | ((self.texture_window_offset_y as u32) << 15);
            }
            // Draw area top left
            0x03 => {
                self.gpu_read = (self.draw_area_top_left.x as u32 & 0x3FF)
                    | ((self.draw_area_top_left.y as u32 & 0x3FF) << 10);
            }
            // Draw area bottom right
            0x04 => {
                self.gpu_read = (self.draw_area_bottom_right.x as u32 & 0x3FF)
                    | ((self.draw_area_bottom_right.y as u32 & 0x3FF) << 10);
            }
            // Draw offset
            0x05 => {
                self.gpu_read = (self.draw_offset.x as u32 & 0x7FF)
                    | ((self.draw_offset.y as u32 & 0x7FF) << 11);
            }
            // GPU version
            0x07 => {
                self.gpu_read = 2;
            }
            0x08 => {
                self.gpu_read = 0;
            }
            // Remaining selectors leave GPUREAD unchanged
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_enable() {
        let mut gpu = GPU::new();
        assert_ne!(gpu.status() & (1 << 23), 0);

        gpu.write_gp1(0x0300_0000);
        assert_eq!(gpu.status() & (1 << 23), 0);

        gpu.write_gp1(0x0300_0001);
        assert_ne!(gpu.status() & (1 << 23), 0);
    }

    #[test]
    fn test_dma_direction_bits() {
        let mut gpu = GPU::new();
        gpu.write_gp1(0x0400_0002);
        assert_eq!((gpu.status() >> 29) & 3, 2);
    }

    #[test]
    fn test_irq_acknowledge() {
        let mut gpu = GPU::new();
        gpu.set_irq_for_test();
        assert_ne!(gpu.status() & (1 << 24), 0);

        gpu.write_gp1(0x0200_0000);
        assert_eq!(gpu.status() & (1 << 24), 0);
    }

    #[test]
    fn test_display_mode() {
        let mut gpu = GPU::new();
        // 320 wide, PAL
        gpu.write_gp1(0x0800_0009);
        let stat = gpu.status();
        assert_eq!((stat >> 17) & 3, 1);
        assert_ne!(stat & (1 << 20), 0);
    }

    #[test]
    fn test_internal_register_draw_offset() {
        let mut gpu = GPU::new();
        gpu.write_gp0(0xE500_0000 | (5 << 11) | 3);
        gpu.write_gp1(0x1000_0005);
        assert_eq!(gpu.read_gpuread() & 0x7FF, 3);
        assert_eq!((gpu.read_gpuread() >> 11) & 0x7FF, 5);
    }

    #[test]
    fn test_gp1_reset_restores_waiting_state() {
        let mut gpu = GPU::new();
        // Latch a polygon command, then abort it mid-collection
        gpu.write_gp0(0x2000_0000);
        gpu.write_gp1(0x0100_0000);
        // A fresh command is accepted immediately
        gpu.write_gp0(0x0200_0000);
        gpu.write_gp0(0x0000_0000);
        gpu.write_gp0(0x0001_0001);
        // back to waiting after the fill
        assert!(gpu.is_waiting_for_command());
    }
}
