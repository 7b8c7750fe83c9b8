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

//! CD-ROM command handlers
//!
//! Every command answers with a first response after the fixed command
//! latency; the two-phase commands queue a Complete (or Error) second
//! response behind a longer countdown. These delays are tuning
//! constants, monotone rather than exact.

use super::disc::{from_bcd, to_bcd, Msf};
use super::{irq_codes, Cdrom, DriveState, READ_DELAY_DOUBLE, READ_DELAY_SINGLE};

/// Human-readable command name for diagnostics
pub(super) fn command_name(command: u8) -> &'static str {
    match command {
        0x01 => "GetStat",
        0x02 => "SetLoc",
        0x03 => "Play",
        0x06 => "ReadN",
        0x07 => "MotorOn",
        0x08 => "Stop",
        0x09 => "Pause",
        0x0A => "Init",
        0x0B => "Mute",
        0x0C => "Demute",
        0x0D => "SetFilter",
        0x0E => "SetMode",
        0x10 => "GetLocL",
        0x11 => "GetLocP",
        0x13 => "GetTN",
        0x14 => "GetTD",
        0x15 => "SeekL",
        0x19 => "Test",
        0x1A => "GetID",
        0x1B => "ReadS",
        0x1E => "ReadTOC",
        _ => "Unknown",
    }
}

impl Cdrom {
    /// Dispatch the pending command once its first-response delay
    /// expires
    pub(super) fn execute_command(&mut self) {
        self.response_fifo.clear();

        match self.current_command {
            0x01 => self.cmd_get_stat(),
            0x02 => self.cmd_set_loc(),
            0x03 => self.cmd_play(),
            0x06 => self.cmd_read(),
            0x07 => self.cmd_motor_on(),
            0x08 => self.cmd_stop(),
            0x09 => self.cmd_pause(),
            0x0A => self.cmd_init(),
            0x0B => self.cmd_mute(),
            0x0C => self.cmd_demute(),
            0x0D => self.cmd_set_filter(),
            0x0E => self.cmd_set_mode(),
            0x10 => self.cmd_get_loc_l(),
            0x11 => self.cmd_get_loc_p(),
            0x13 => self.cmd_get_tn(),
            0x14 => self.cmd_get_td(),
            0x15 => self.cmd_seek_l(),
            0x19 => self.cmd_test(),
            0x1A => self.cmd_get_id(),
            0x1B => self.cmd_read(),
            0x1E => self.cmd_read_toc(),
            other => {
                log::warn!("CDROM: unknown command 0x{:02X}", other);
                let stat = self.stat | 0x01;
                self.push_response(irq_codes::ERROR, &[stat, 0x40]);
            }
        }

        self.parameter_fifo.clear();
    }

    fn cmd_get_stat(&mut self) {
        let stat = self.stat;
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    /// SetLoc: three BCD bytes (minute, second, frame)
    fn cmd_set_loc(&mut self) {
        let minute = from_bcd(self.parameter_fifo.pop());
        let second = from_bcd(self.parameter_fifo.pop());
        let frame = from_bcd(self.parameter_fifo.pop());
        self.seek_target = Msf::new(minute, second, frame);

        let stat = self.stat;
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    fn cmd_play(&mut self) {
        // Optional track parameter; CD audio is not synthesized
        if !self.parameter_fifo.is_empty() {
            self.parameter_fifo.pop();
        }
        self.stat |= 0x80;
        let stat = self.stat;
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    /// ReadN/ReadS: start streaming sectors from the seek target
    fn cmd_read(&mut self) {
        self.stat |= 0x20;
        let stat = self.stat;

        if self.has_disc() {
            self.read_pos = self.seek_target;
            self.read_delay_counter = if self.mode & 0x80 != 0 {
                READ_DELAY_DOUBLE
            } else {
                READ_DELAY_SINGLE
            };
            self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
            // push_response parked us Idle; reading overrides
            self.state = DriveState::Reading;
        } else {
            self.set_second_response(irq_codes::ERROR, &[stat | 0x01, 0x40], 1_000_000);
            self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
        }
    }

    fn cmd_motor_on(&mut self) {
        self.stat |= 0x02;
        let stat = self.stat;
        self.set_second_response(irq_codes::COMPLETE, &[stat], 1_000_000);
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    fn cmd_stop(&mut self) {
        self.stat = 0x00;
        let stat = self.stat;
        self.set_second_response(irq_codes::COMPLETE, &[stat], 2_000_000);
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    fn cmd_pause(&mut self) {
        self.stat &= !0x20;
        let stat = self.stat;
        self.set_second_response(irq_codes::COMPLETE, &[stat], 1_000_000);
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    fn cmd_init(&mut self) {
        self.mode = 0x00;
        self.stat &= !(0x20 | 0x40 | 0x80);
        self.stat |= 0x02;
        let stat = self.stat;
        self.set_second_response(irq_codes::COMPLETE, &[stat], 30_000);
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    fn cmd_mute(&mut self) {
        let stat = self.stat;
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    fn cmd_demute(&mut self) {
        let stat = self.stat;
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    fn cmd_set_filter(&mut self) {
        // file and channel bytes; XA audio is not modeled
        if !self.parameter_fifo.is_empty() {
            self.parameter_fifo.pop();
        }
        if !self.parameter_fifo.is_empty() {
            self.parameter_fifo.pop();
        }
        let stat = self.stat;
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    /// SetMode: bit 7 = double speed, bit 5 = whole-sector delivery
    fn cmd_set_mode(&mut self) {
        if !self.parameter_fifo.is_empty() {
            self.mode = self.parameter_fifo.pop();
        }
        let stat = self.stat;
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    /// GetLocL: header bytes of the last read sector
    fn cmd_get_loc_l(&mut self) {
        if self.has_disc() {
            let header = self.last_sector_header;
            self.push_response(irq_codes::ACKNOWLEDGE, &header);
        } else {
            let stat = self.stat | 0x01;
            self.push_response(irq_codes::ERROR, &[stat, 0x80]);
        }
    }

    /// GetLocP: track/index and position (single-track discs)
    fn cmd_get_loc_p(&mut self) {
        if self.has_disc() {
            let pos = self.read_pos;
            self.push_response(
                irq_codes::ACKNOWLEDGE,
                &[
                    0x01, 0x01, pos.minute, pos.second, pos.frame, pos.minute, pos.second,
                    pos.frame,
                ],
            );
        } else {
            self.push_response(
                irq_codes::ACKNOWLEDGE,
                &[0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00],
            );
        }
    }

    /// GetTN: first and last track number
    fn cmd_get_tn(&mut self) {
        let stat = self.stat;
        if self.has_disc() {
            self.push_response(irq_codes::ACKNOWLEDGE, &[stat, 0x01, 0x01]);
        } else {
            self.push_response(irq_codes::ERROR, &[stat | 0x01, 0x40]);
        }
    }

    /// GetTD: start of a track (track 0 means end of disc)
    fn cmd_get_td(&mut self) {
        let track = if self.parameter_fifo.is_empty() {
            0
        } else {
            from_bcd(self.parameter_fifo.pop())
        };

        let stat = self.stat;
        if !self.has_disc() {
            self.push_response(irq_codes::ERROR, &[stat | 0x01, 0x40]);
            return;
        }

        if track == 0 {
            let sectors = self.disc.as_ref().map(|d| d.sector_count()).unwrap_or(0);
            let end = Msf::from_lba(sectors);
            self.push_response(
                irq_codes::ACKNOWLEDGE,
                &[stat, to_bcd(end.minute), to_bcd(end.second)],
            );
        } else {
            self.push_response(irq_codes::ACKNOWLEDGE, &[stat, 0x00, 0x02]);
        }
    }

    fn cmd_seek_l(&mut self) {
        self.stat |= 0x40;
        self.read_pos = self.seek_target;
        let stat = self.stat;
        self.set_second_response(irq_codes::COMPLETE, &[stat & !0x40], 1_000_000);
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    /// Test: only sub-function 0x20 (controller BIOS date) answers
    fn cmd_test(&mut self) {
        let sub_function = if self.parameter_fifo.is_empty() {
            0
        } else {
            self.parameter_fifo.pop()
        };

        match sub_function {
            0x20 => {
                self.push_response(irq_codes::ACKNOWLEDGE, &[0x97, 0x01, 0x10, 0xC2]);
            }
            other => {
                log::warn!("CDROM: Test sub-function 0x{:02X} not implemented", other);
                let stat = self.stat | 0x01;
                self.push_response(irq_codes::ERROR, &[stat, 0x40]);
            }
        }
    }

    /// GetID: licensed-disc handshake
    fn cmd_get_id(&mut self) {
        let stat = self.stat;
        if self.has_disc() {
            self.set_second_response(
                irq_codes::COMPLETE,
                &[stat, 0x00, 0x20, 0x00, b'S', b'C', b'E', b'A'],
                1_000_000,
            );
        } else {
            self.set_second_response(
                irq_codes::ERROR,
                &[0x08, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
                1_000_000,
            );
        }
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }

    fn cmd_read_toc(&mut self) {
        let stat = self.stat;
        self.set_second_response(irq_codes::COMPLETE, &[stat], 16_000_000);
        self.push_response(irq_codes::ACKNOWLEDGE, &[stat]);
    }
}
