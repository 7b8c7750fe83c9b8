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

//! Root counters (timers)
//!
//! Three 16-bit channels at 0x1F801100 + 0x10*n, each with a counter,
//! a mode register and a target. Clock sources: timer 0 counts the
//! system clock (the dot clock option is approximated by it), timer 1
//! can count H-blanks, timer 2 can divide the system clock by 8. Sync
//! modes pause or reset the counter on the matching blanking signal.

use crate::core::error::Result;
use crate::core::state::StateBuffer;

/// Timer register window base
const TIMERS_BASE: u32 = 0x1F80_1100;

// Mode register bits
const MODE_SYNC_ENABLE: u32 = 1 << 0;
const MODE_RESET_ON_TARGET: u32 = 1 << 3;
const MODE_IRQ_ON_TARGET: u32 = 1 << 4;
const MODE_IRQ_ON_MAX: u32 = 1 << 5;
const MODE_IRQ_ONCE: u32 = 1 << 6;
const MODE_IRQ: u32 = 1 << 10;
const MODE_REACHED_TARGET: u32 = 1 << 11;
const MODE_REACHED_MAX: u32 = 1 << 12;

/// One timer channel
#[derive(Debug, Clone, Copy, Default)]
struct Timer {
    /// Current value (16-bit)
    current: u32,
    /// Target value (16-bit)
    target: u32,
    /// Raw mode register, including the live IRQ/reached bits
    mode: u32,
    /// Frozen by a sync mode
    paused: bool,
}

impl Timer {
    fn sync_enable(&self) -> bool {
        self.mode & MODE_SYNC_ENABLE != 0
    }

    fn sync_mode(&self) -> u32 {
        (self.mode >> 1) & 3
    }

    fn clock_source(&self) -> u32 {
        (self.mode >> 8) & 3
    }
}

/// The three root counters
pub struct Timers {
    timers: [Timer; 3],
}

impl Timers {
    pub fn new() -> Self {
        Self {
            timers: [Timer::default(); 3],
        }
    }

    pub fn reset(&mut self) {
        self.timers = [Timer::default(); 3];
    }

    /// Read a timer register by physical address
    pub fn read(&self, paddr: u32) -> u32 {
        let index = ((paddr - TIMERS_BASE) >> 4) as usize & 0x3;
        if index > 2 {
            return 0;
        }
        match paddr & 0xF {
            0x0 => self.timers[index].current & 0xFFFF,
            0x4 => self.timers[index].mode,
            0x8 => self.timers[index].target & 0xFFFF,
            _ => 0,
        }
    }

    /// Write a timer register by physical address
    ///
    /// Writing the mode register restarts the counter from 0. Sync
    /// mode 3 parks the counter until the first blanking event frees
    /// it.
    pub fn write(&mut self, paddr: u32, value: u32) {
        let index = ((paddr - TIMERS_BASE) >> 4) as usize & 0x3;
        if index > 2 {
            log::warn!("timer write to invalid channel at 0x{:08X}", paddr);
            return;
        }
        match paddr & 0xF {
            0x0 => self.timers[index].current = value & 0xFFFF,
            0x4 => {
                let timer = &mut self.timers[index];
                timer.mode = value & 0x3FF;
                timer.current = 0;
                timer.paused = timer.sync_enable() && timer.sync_mode() == 3;
            }
            0x8 => self.timers[index].target = value & 0xFFFF,
            _ => {}
        }
    }

    /// Advance all channels by a CPU cycle count
    ///
    /// Returns one IRQ flag per channel.
    pub fn tick(&mut self, cycles: u32) -> [bool; 3] {
        let mut irqs = [false; 3];
        for index in 0..3 {
            irqs[index] = self.tick_timer(index, cycles);
        }
        irqs
    }

    fn tick_timer(&mut self, index: usize, cycles: u32) -> bool {
        let timer = &self.timers[index];
        if timer.paused {
            return false;
        }

        let advance = match index {
            // Dot clock is approximated by the system clock
            0 => cycles,
            // Clock source bit 0 switches timer 1 to H-blank counting
            1 => {
                if timer.clock_source() & 1 != 0 {
                    0
                } else {
                    cycles
                }
            }
            // Clock source bit 1 divides by 8
            _ => {
                if timer.clock_source() & 2 != 0 {
                    cycles / 8
                } else {
                    cycles
                }
            }
        };

        if advance == 0 {
            return false;
        }

        self.timers[index].current += advance;
        self.check_events(index)
    }

    /// Target/overflow handling shared by the tick and blank paths
    fn check_events(&mut self, index: usize) -> bool {
        let mut irq = false;
        let timer = &mut self.timers[index];

        if timer.current >= (timer.target & 0xFFFF) {
            timer.mode |= MODE_REACHED_TARGET;
            if timer.mode & MODE_IRQ_ON_TARGET != 0 {
                irq = true;
            }
            if timer.mode & MODE_RESET_ON_TARGET != 0 {
                timer.current = 0;
            }
        }

        if timer.current >= 0xFFFF {
            timer.mode |= MODE_REACHED_MAX;
            if timer.mode & MODE_IRQ_ON_MAX != 0 {
                irq = true;
            }
            if timer.mode & MODE_RESET_ON_TARGET == 0 {
                timer.current = 0;
            }
        }

        if irq {
            timer.mode |= MODE_IRQ;
            if timer.mode & MODE_IRQ_ONCE != 0 {
                // one-shot: both IRQ sources disarm after the first hit
                timer.mode &= !(MODE_IRQ_ON_TARGET | MODE_IRQ_ON_MAX);
            }
            log::trace!("timer {} IRQ", index);
        }
        irq
    }

    /// H-blank rising edge: timer 1 hblank clocking, timer 0 sync
    ///
    /// Returns an IRQ flag for timer 1 in case the hblank count hits
    /// the target.
    pub fn on_hblank(&mut self) -> bool {
        let mut irq = false;
        if self.timers[1].clock_source() & 1 != 0 && !self.timers[1].paused {
            self.timers[1].current += 1;
            irq = self.check_events(1);
        }

        if self.timers[0].sync_enable() {
            match self.timers[0].sync_mode() {
                0 => self.timers[0].paused = true,
                1 => self.timers[0].current = 0,
                2 => {
                    self.timers[0].current = 0;
                    self.timers[0].paused = false;
                }
                _ => {
                    // wait-for-blank, then free run
                    self.timers[0].paused = false;
                    self.timers[0].mode &= !MODE_SYNC_ENABLE;
                }
            }
        }
        irq
    }

    /// H-blank falling edge: timer 0 sync
    pub fn on_hblank_end(&mut self) {
        if !self.timers[0].sync_enable() {
            return;
        }
        match self.timers[0].sync_mode() {
            0 => self.timers[0].paused = false,
            2 => self.timers[0].paused = true,
            _ => {}
        }
    }

    /// V-blank rising edge: timer 1 sync
    pub fn on_vblank(&mut self) {
        if !self.timers[1].sync_enable() {
            return;
        }
        match self.timers[1].sync_mode() {
            0 => self.timers[1].paused = true,
            1 => self.timers[1].current = 0,
            2 => {
                self.timers[1].current = 0;
                self.timers[1].paused = false;
            }
            _ => {
                self.timers[1].paused = false;
                self.timers[1].mode &= !MODE_SYNC_ENABLE;
            }
        }
    }

    /// V-blank falling edge: timer 1 sync
    pub fn on_vblank_end(&mut self) {
        if !self.timers[1].sync_enable() {
            return;
        }
        match self.timers[1].sync_mode() {
            0 => self.timers[1].paused = false,
            2 => self.timers[1].paused = true,
            _ => {}
        }
    }

    /// Serialize all three channels
    pub fn serialize(&self, buf: &mut StateBuffer) {
        for timer in &self.timers {
            buf.write_u32(timer.current);
            buf.write_u32(timer.target);
            buf.write_u32(timer.mode);
            buf.write_bool(timer.paused);
        }
    }

    /// Restore all three channels
    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        for timer in &mut self.timers {
            timer.current = buf.read_u32()?;
            timer.target = buf.read_u32()?;
            timer.mode = buf.read_u32()?;
            timer.paused = buf.read_bool()?;
        }
        Ok(())
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}
