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

//! GP0 port: rendering commands and VRAM data
//!
//! GP0 is a small state machine. In `WaitingForCommand` the top three
//! bits of the incoming word classify it; drawing commands latch a
//! current-command record and collect parameter words until the count
//! derived from the command header is reached; CPU-to-VRAM blits then
//! stream pixel data through `ReceivingDataWords`.

use super::primitives::Vec2;
use super::GPU;

/// GP0 decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gp0State {
    /// Next word starts a command
    WaitingForCommand,
    /// Collecting parameter words for the latched command
    ReceivingParameters,
    /// Streaming pixel pairs into a VRAM rectangle
    ReceivingDataWords,
}

/// Decoded command class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Polygon,
    Line,
    Rectangle,
    QuickFill,
    CpuToVram,
    VramToVram,
}

/// The in-flight GP0 command
///
/// `params[0]` is always the command word itself (it doubles as the
/// first color for flat and Gouraud commands).
pub struct Gp0Command {
    raw: u32,
    kind: CommandKind,
    params: Vec<u32>,
}

impl Gp0Command {
    pub fn new() -> Self {
        Self {
            raw: 0,
            kind: CommandKind::QuickFill,
            params: Vec::new(),
        }
    }

    /// Latch a fresh command word
    pub fn set(&mut self, raw: u32, kind: CommandKind) {
        self.raw = raw;
        self.kind = kind;
        self.params.clear();
        self.params.push(raw);
    }

    pub fn reset(&mut self) {
        self.params.clear();
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn params(&self) -> &[u32] {
        &self.params
    }

    pub fn push_param(&mut self, word: u32) {
        self.params.push(word);
    }

    /// Gouraud-shaded polygon/line (bit 28)
    pub fn shaded(&self) -> bool {
        self.raw & (1 << 28) != 0
    }

    /// Four-vertex polygon (bit 27)
    pub fn quad(&self) -> bool {
        self.raw & (1 << 27) != 0
    }

    /// Textured polygon/rectangle (bit 26)
    pub fn textured(&self) -> bool {
        self.raw & (1 << 26) != 0
    }

    /// Texture blending disabled (bit 24)
    pub fn raw_texture(&self) -> bool {
        self.raw & (1 << 24) != 0
    }

    /// Polyline mode for line commands (bit 27)
    pub fn polyline(&self) -> bool {
        self.raw & (1 << 27) != 0
    }

    /// Rectangle size selector (bits 27-28): fixed edge length, or
    /// None for a variable-size rectangle
    pub fn rect_size(&self) -> Option<i32> {
        match (self.raw >> 27) & 3 {
            0 => None,
            1 => Some(1),
            2 => Some(8),
            _ => Some(16),
        }
    }

    pub fn vertex_count(&self) -> usize {
        if self.quad() {
            4
        } else {
            3
        }
    }

    /// Expected total parameter count, including the command word
    ///
    /// Polygons: one position word per vertex, plus one color word per
    /// extra vertex when shaded, plus one texcoord word per vertex
    /// when textured. Polylines have no fixed count; they end on the
    /// terminator word.
    pub fn expected_params(&self) -> Option<usize> {
        match self.kind {
            CommandKind::Polygon => {
                let nb = self.vertex_count();
                let per_vertex = 1 + self.textured() as usize;
                Some(if self.shaded() {
                    nb * (per_vertex + 1)
                } else {
                    1 + nb * per_vertex
                })
            }
            CommandKind::Line => {
                if self.polyline() {
                    None
                } else if self.shaded() {
                    Some(4)
                } else {
                    Some(3)
                }
            }
            CommandKind::Rectangle => {
                let variable = self.rect_size().is_none() as usize;
                Some(2 + self.textured() as usize + variable)
            }
            CommandKind::QuickFill => Some(3),
            CommandKind::CpuToVram => Some(3),
            CommandKind::VramToVram => Some(4),
        }
    }
    /// Serialize the latched command and collected parameters
    pub fn serialize(&self, buf: &mut crate::core::state::StateBuffer) {
        buf.write_u32(self.raw);
        buf.write_u8(match self.kind {
            CommandKind::Polygon => 0,
            CommandKind::Line => 1,
            CommandKind::Rectangle => 2,
            CommandKind::QuickFill => 3,
            CommandKind::CpuToVram => 4,
            CommandKind::VramToVram => 5,
        });
        buf.write_u32(self.params.len() as u32);
        for param in &self.params {
            buf.write_u32(*param);
        }
    }

    /// Restore the latched command and collected parameters
    pub fn deserialize(
        &mut self,
        buf: &mut crate::core::state::StateBuffer,
    ) -> crate::core::error::Result<()> {
        self.raw = buf.read_u32()?;
        self.kind = match buf.read_u8()? {
            0 => CommandKind::Polygon,
            1 => CommandKind::Line,
            2 => CommandKind::Rectangle,
            4 => CommandKind::CpuToVram,
            5 => CommandKind::VramToVram,
            _ => CommandKind::QuickFill,
        };
        let count = buf.read_u32()? as usize;
        self.params.clear();
        for _ in 0..count {
            self.params.push(buf.read_u32()?);
        }
        Ok(())
    }
}

impl Default for Gp0Command {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor state of an in-flight CPU-to-VRAM blit
#[derive(Debug, Clone, Copy, Default)]
pub struct VramCopy {
    pub start: Vec2,
    pub size: Vec2,
    pub current: Vec2,
}

impl GPU {
    /// Feed one word into the GP0 port
    pub fn write_gp0(&mut self, word: u32) {
        match self.gp0_state {
            Gp0State::ReceivingDataWords => self.receive_data_word(word),
            Gp0State::ReceivingParameters => self.receive_parameter(word),
            Gp0State::WaitingForCommand => match word >> 29 {
                0b000 => self.execute_misc_command(word),
                0b001 => self.begin_command(word, CommandKind::Polygon),
                0b010 => self.begin_command(word, CommandKind::Line),
                0b011 => self.begin_command(word, CommandKind::Rectangle),
                0b100 => self.begin_command(word, CommandKind::VramToVram),
                0b101 => self.begin_command(word, CommandKind::CpuToVram),
                0b111 => self.execute_env_command(word),
                _ => {
                    log::warn!("GPU: unknown GP0 command 0x{:08X}", word);
                }
            },
        }
    }

    fn begin_command(&mut self, word: u32, kind: CommandKind) {
        self.current_cmd.set(word, kind);
        self.gp0_state = Gp0State::ReceivingParameters;
    }

    /// Misc group (top bits 000)
    fn execute_misc_command(&mut self, word: u32) {
        match word >> 24 {
            // NOP
            0x00 => {}
            // Clear cache: no texture cache is modeled
            0x01 => {}
            0x02 => self.begin_command(word, CommandKind::QuickFill),
            _ => {
                log::warn!("GPU: unknown GP0 misc command 0x{:08X}", word);
            }
        }
    }

    /// Environment group (top bits 111)
    fn execute_env_command(&mut self, word: u32) {
        match word >> 24 {
            // E1: draw mode
            0xE1 => {
                self.status.set_draw_mode(word & 0xFF_FFFF);
                self.texture_rect_flip_x = (word >> 12) & 1 != 0;
                self.texture_rect_flip_y = (word >> 13) & 1 != 0;
            }
            // E2: texture window
            0xE2 => {
                self.texture_window_mask_x = (word & 0x1F) as u8;
                self.texture_window_mask_y = ((word >> 5) & 0x1F) as u8;
                self.texture_window_offset_x = ((word >> 10) & 0x1F) as u8;
                self.texture_window_offset_y = ((word >> 15) & 0x1F) as u8;
            }
            // E3: drawing area top left
            0xE3 => {
                self.draw_area_top_left = Vec2::new((word & 0x3FF) as i32, ((word >> 10) & 0x3FF) as i32);
            }
            // E4: drawing area bottom right
            0xE4 => {
                self.draw_area_bottom_right =
                    Vec2::new((word & 0x3FF) as i32, ((word >> 10) & 0x3FF) as i32);
            }
            // E5: drawing offset (11-bit signed pair)
            0xE5 => {
                let x = ((word & 0x7FF) as i32) << 21 >> 21;
                let y = (((word >> 11) & 0x7FF) as i32) << 21 >> 21;
                self.draw_offset = Vec2::new(x, y);
            }
            // E6: mask bit setting
            0xE6 => {
                self.status.set_mask_bit = word & 1 != 0;
                self.status.preserve_masked = (word >> 1) & 1 != 0;
            }
            _ => {
                log::warn!("GPU: unknown GP0 environment command 0x{:08X}", word);
            }
        }
    }

    /// Collect one parameter word and dispatch once complete
    fn receive_parameter(&mut self, word: u32) {
        self.current_cmd.push_param(word);

        let expected = self.current_cmd.expected_params();

        // Polylines run until the terminator word
        if expected.is_none() && (word & 0xF000_F000) == 0x5000_5000 {
            // Guard against a terminator arriving before one full segment
            let needed = 3 + self.current_cmd.shaded() as usize;
            if self.current_cmd.params().len() >= needed {
                self.draw_line();
            }
            self.finish_command();
            return;
        }

        if Some(self.current_cmd.params().len()) == expected {
            match self.current_cmd.kind() {
                CommandKind::Polygon => {
                    self.draw_polygon();
                    self.finish_command();
                }
                CommandKind::Line => {
                    self.draw_line();
                    self.finish_command();
                }
                CommandKind::Rectangle => {
                    self.draw_rectangle();
                    self.finish_command();
                }
                CommandKind::QuickFill => {
                    self.quick_rect_fill();
                    self.finish_command();
                }
                CommandKind::VramToVram => {
                    self.vram_to_vram_copy();
                    self.finish_command();
                }
                CommandKind::CpuToVram => self.begin_cpu_to_vram(),
            }
        }
    }

    fn finish_command(&mut self) {
        self.current_cmd.reset();
        self.gp0_state = Gp0State::WaitingForCommand;
    }

    /// Start streaming CPU data into a VRAM rectangle
    fn begin_cpu_to_vram(&mut self) {
        let params = self.current_cmd.params();
        let dest = params[1];
        let size = params[2];

        self.vram_copy = VramCopy {
            start: Vec2::new((dest & 0x3FF) as i32, ((dest >> 16) & 0x1FF) as i32),
            size: Vec2::new(
                (((size & 0xFFFF).wrapping_sub(1) & 0x3FF) + 1) as i32,
                ((size >> 16).wrapping_sub(1) & 0x1FF) as i32,
            ),
            current: Vec2::new(0, 0),
        };
        self.gp0_state = Gp0State::ReceivingDataWords;
    }

    /// One data word delivers two 16-bit pixels in raster order
    fn receive_data_word(&mut self, word: u32) {
        for half in 0..2 {
            let pixel = (word >> (16 * half)) as u16;
            let pos = Vec2::new(
                self.vram_copy.start.x + self.vram_copy.current.x,
                self.vram_copy.start.y + self.vram_copy.current.y,
            );
            self.set_pixel(pos, pixel);

            self.vram_copy.current.x += 1;
            if self.vram_copy.current.x >= self.vram_copy.size.x {
                self.vram_copy.current.x = 0;
                self.vram_copy.current.y += 1;
            }
            if self.vram_copy.current.y > self.vram_copy.size.y {
                self.finish_command();
                return;
            }
        }
    }
}
