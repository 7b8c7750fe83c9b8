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

//! CD-ROM drive
//!
//! Four MMIO bytes at 0x1F801800-0x1F801803 decode against the index
//! register (low two bits of byte 0). Commands move the drive through
//! Idle -> WaitingFirstResponse -> optionally WaitingSecondResponse ->
//! optionally Reading; delays are modeled as cycle countdowns checked
//! on every device tick.

mod commands;
pub mod disc;

pub use disc::{BinDisc, Disc, Msf};

use disc::RAW_SECTOR_SIZE;

/// First-response latency for every command, in CPU cycles (~1.5 ms)
const FIRST_RESPONSE_DELAY: i64 = 50_000;

/// Cycles between delivered sectors at double speed
const READ_DELAY_DOUBLE: i64 = 225_792;

/// Cycles between delivered sectors at normal speed
const READ_DELAY_SINGLE: i64 = 451_584;

/// Interrupt codes written into the 5-bit interrupt flag
pub mod irq_codes {
    /// INT1: a sector is waiting in the data FIFO
    pub const DATA_READY: u8 = 1;
    /// INT2: second response of a two-phase command
    pub const COMPLETE: u8 = 2;
    /// INT3: first response acknowledge
    pub const ACKNOWLEDGE: u8 = 3;
    /// INT5: command or read error
    pub const ERROR: u8 = 5;
}

/// Bounded byte FIFO
///
/// Pushing past capacity drops the byte with a diagnostic; popping an
/// empty FIFO yields 0, like the hardware bus keeps its last level.
pub struct Fifo {
    data: std::collections::VecDeque<u8>,
    capacity: usize,
}

impl Fifo {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, byte: u8) {
        if self.data.len() >= self.capacity {
            log::warn!("CDROM: FIFO overflow, byte 0x{:02X} dropped", byte);
            return;
        }
        self.data.push_back(byte);
    }

    pub fn pop(&mut self) -> u8 {
        self.data.pop_front().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Outer drive state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    Idle,
    WaitingFirstResponse,
    WaitingSecondResponse,
    Reading,
}

/// A queued second response
pub(crate) struct SecondResponse {
    irq: u8,
    payload: Vec<u8>,
}

/// CD-ROM drive and controller
pub struct Cdrom {
    /// Register bank select (low two bits of byte 0)
    index: u8,

    /// 5-bit interrupt flag (the last raised INT code)
    interrupt_flag: u8,

    /// 5-bit interrupt enable
    interrupt_enable: u8,

    /// Host-to-drive command parameters (16 bytes)
    parameter_fifo: Fifo,

    /// Drive-to-host responses (16 bytes)
    response_fifo: Fifo,

    /// Sector payload staging (2340 bytes)
    data_fifo: Fifo,

    state: DriveState,

    /// Command byte being processed
    current_command: u8,

    /// Countdown to the pending first/second response
    delay_counter: i64,

    second_response: Option<SecondResponse>,

    /// Drive status byte
    stat: u8,

    /// Mode byte (bit 7 double speed, bit 5 whole-sector delivery)
    mode: u8,

    /// SetLoc target
    seek_target: Msf,

    /// Position the next sector is read from
    read_pos: Msf,

    /// Request register bit 7
    want_data: bool,

    // Audio volume registers (storage only; the SPU is a stub)
    volume_rr: u8,
    volume_rl: u8,
    volume_lr: u8,
    volume_ll: u8,

    /// Countdown to the next delivered sector while Reading
    read_delay_counter: i64,

    /// Last raw sector fetched from the disc
    sector_buffer: [u8; RAW_SECTOR_SIZE],

    /// Bytes 12-19 of the last sector (GetLocL payload)
    last_sector_header: [u8; 8],

    /// Mounted disc, if any
    disc: Option<Box<dyn Disc>>,

    /// Edge-triggered line to the interrupt controller
    irq_line: bool,
}

impl Cdrom {
    /// Create a drive with no disc mounted
    pub fn new() -> Self {
        Self {
            index: 0,
            interrupt_flag: 0,
            interrupt_enable: 0,
            parameter_fifo: Fifo::new(16),
            response_fifo: Fifo::new(16),
            data_fifo: Fifo::new(2340),
            state: DriveState::Idle,
            current_command: 0,
            delay_counter: 0,
            second_response: None,
            stat: 0x02,
            mode: 0x00,
            seek_target: Msf::default(),
            read_pos: Msf::default(),
            want_data: false,
            volume_rr: 0,
            volume_rl: 0,
            volume_lr: 0,
            volume_ll: 0,
            read_delay_counter: 0,
            sector_buffer: [0u8; RAW_SECTOR_SIZE],
            last_sector_header: [0u8; 8],
            disc: None,
            irq_line: false,
        }
    }

    /// Reset the controller; the mounted disc stays in the tray
    pub fn reset(&mut self) {
        self.index = 0;
        self.interrupt_flag = 0;
        self.interrupt_enable = 0;
        self.parameter_fifo.clear();
        self.response_fifo.clear();
        self.data_fifo.clear();
        self.state = DriveState::Idle;
        self.current_command = 0;
        self.delay_counter = 0;
        self.second_response = None;
        self.stat = 0x02;
        self.mode = 0x00;
        self.seek_target = Msf::default();
        self.read_pos = Msf::default();
        self.want_data = false;
        self.volume_rr = 0;
        self.volume_rl = 0;
        self.volume_lr = 0;
        self.volume_ll = 0;
        self.read_delay_counter = 0;
        self.sector_buffer = [0u8; RAW_SECTOR_SIZE];
        self.last_sector_header = [0u8; 8];
        self.irq_line = false;
    }

    /// Mount a disc image
    pub fn load_disc(&mut self, disc: Box<dyn Disc>) {
        log::info!("CDROM: disc mounted, {} sectors", disc.sector_count());
        self.disc = Some(disc);
    }

    pub fn has_disc(&self) -> bool {
        self.disc.is_some()
    }

    /// Status register: index plus FIFO/busy flags
    fn status_register(&self) -> u8 {
        let mut status = self.index & 0x03;
        if self.parameter_fifo.is_empty() {
            status |= 1 << 3; // PRMEMPT
        }
        if !self.parameter_fifo.is_full() {
            status |= 1 << 4; // PRMWRDY
        }
        if !self.response_fifo.is_empty() {
            status |= 1 << 5; // RSLRRDY
        }
        if !self.data_fifo.is_empty() {
            status |= 1 << 6; // DRQSTS
        }
        if self.state != DriveState::Idle {
            status |= 1 << 7; // BUSYSTS
        }
        status
    }

    /// Read one of the four MMIO bytes
    pub fn read8(&mut self, paddr: u32) -> u8 {
        match paddr & 0x3 {
            0 => self.status_register(),
            1 => self.response_fifo.pop(),
            2 => self.data_fifo.pop(),
            _ => {
                if self.index == 0 || self.index == 2 {
                    0xE0 | (self.interrupt_enable & 0x1F)
                } else {
                    0xE0 | (self.interrupt_flag & 0x1F)
                }
            }
        }
    }

    /// Write one of the four MMIO bytes
    pub fn write8(&mut self, paddr: u32, value: u8) {
        match paddr & 0x3 {
            0 => self.index = value & 0x3,
            1 => match self.index {
                0 => self.start_command(value),
                1 => log::debug!("CDROM: sound map data out 0x{:02X} ignored", value),
                2 => log::debug!("CDROM: sound map coding info 0x{:02X} ignored", value),
                _ => self.volume_rr = value,
            },
            2 => match self.index {
                0 => self.parameter_fifo.push(value),
                1 => self.interrupt_enable = value & 0x1F,
                2 => self.volume_ll = value,
                _ => self.volume_rl = value,
            },
            _ => match self.index {
                0 => {
                    // Request register
                    if value & 0x80 == 0 {
                        self.parameter_fifo.clear();
                    }
                    self.want_data = value & 0x80 != 0;
                }
                1 => {
                    // Interrupt flag acknowledge
                    self.interrupt_flag &= !(value & 0x1F);
                    if value & 0x40 != 0 {
                        self.parameter_fifo.clear();
                    }
                    if value & 0x1F != 0 {
                        self.response_fifo.clear();
                    }
                }
                2 => self.volume_lr = value,
                _ => log::debug!("CDROM: apply volume changes 0x{:02X} ignored", value),
            },
        }
    }

    /// Pop a 32-bit little-endian word from the data FIFO (DMA path)
    pub fn read_data_word(&mut self) -> u32 {
        let b0 = self.data_fifo.pop() as u32;
        let b1 = self.data_fifo.pop() as u32;
        let b2 = self.data_fifo.pop() as u32;
        let b3 = self.data_fifo.pop() as u32;
        b0 | (b1 << 8) | (b2 << 16) | (b3 << 24)
    }

    /// Advance the drive state machine
    pub fn update(&mut self, cycles: u32) {
        match self.state {
            DriveState::Idle => {}
            DriveState::WaitingFirstResponse => {
                self.delay_counter -= cycles as i64;
                if self.delay_counter <= 0 {
                    self.execute_command();
                }
            }
            DriveState::WaitingSecondResponse => {
                self.delay_counter -= cycles as i64;
                // Hold the second response until the first is acked
                if self.delay_counter <= 0 && self.interrupt_flag == 0 {
                    self.deliver_second_response();
                }
            }
            DriveState::Reading => {
                if self.interrupt_flag != 0 {
                    return;
                }
                self.read_delay_counter -= cycles as i64;
                if self.read_delay_counter <= 0 {
                    if self.has_disc() {
                        self.read_sector();
                    } else {
                        self.response_fifo.clear();
                        let stat = self.stat | 0x01;
                        self.push_response(irq_codes::ERROR, &[stat, 0x40]);
                    }
                }
            }
        }
    }

    /// Deliver one sector into the data FIFO
    ///
    /// Whole-sector mode (mode bit 5) delivers bytes 12..2352; data
    /// mode delivers the 2048 payload bytes at 24..2072. An INT1 with
    /// the status byte announces the data, and the countdown rearms
    /// from the speed bit.
    fn read_sector(&mut self) {
        let msf = self.read_pos;
        let read_result = match self.disc.as_mut() {
            Some(disc) => disc.read_sector(msf),
            None => return,
        };
        let sector = match read_result {
            Ok(sector) => sector,
            Err(e) => {
                log::error!(
                    "CDROM: failed to read sector {:02}:{:02}:{:02}: {}",
                    msf.minute,
                    msf.second,
                    msf.frame,
                    e
                );
                self.response_fifo.clear();
                let stat = self.stat | 0x01;
                self.push_response(irq_codes::ERROR, &[stat, 0x40]);
                return;
            }
        };

        self.sector_buffer = sector;
        self.last_sector_header
            .copy_from_slice(&self.sector_buffer[12..20]);
        self.read_pos = msf.next();

        self.data_fifo.clear();
        if self.mode & 0x20 != 0 {
            for byte in &self.sector_buffer[12..2352] {
                self.data_fifo.push(*byte);
            }
        } else {
            for byte in &self.sector_buffer[24..2072] {
                self.data_fifo.push(*byte);
            }
        }

        self.response_fifo.clear();
        self.response_fifo.push(self.stat);
        self.deliver_interrupt(irq_codes::DATA_READY);

        self.read_delay_counter = if self.mode & 0x80 != 0 {
            READ_DELAY_DOUBLE
        } else {
            READ_DELAY_SINGLE
        };
    }

    /// Accept a command byte: the drive goes busy and answers after
    /// the first-response delay
    fn start_command(&mut self, command: u8) {
        log::debug!(
            "CDROM: command {} (0x{:02X})",
            commands::command_name(command),
            command
        );
        self.current_command = command;
        self.state = DriveState::WaitingFirstResponse;
        self.delay_counter = FIRST_RESPONSE_DELAY;
        self.second_response = None;
    }

    /// Raise an INT code and the controller line if enabled
    fn deliver_interrupt(&mut self, code: u8) {
        self.interrupt_flag = code & 0x1F;
        if self.interrupt_enable & self.interrupt_flag != 0 {
            self.irq_line = true;
        }
    }

    /// Push a response payload and its INT code
    ///
    /// The next state depends on whether a second response is queued.
    pub(crate) fn push_response(&mut self, code: u8, payload: &[u8]) {
        for byte in payload {
            self.response_fifo.push(*byte);
        }
        self.deliver_interrupt(code);

        self.state = if self.second_response.is_some() {
            DriveState::WaitingSecondResponse
        } else {
            DriveState::Idle
        };
    }

    /// Queue the second phase of a two-phase command
    pub(crate) fn set_second_response(&mut self, code: u8, payload: &[u8], delay: i64) {
        self.second_response = Some(SecondResponse {
            irq: code,
            payload: payload.to_vec(),
        });
        self.delay_counter = delay;
    }

    fn deliver_second_response(&mut self) {
        if let Some(second) = self.second_response.take() {
            self.response_fifo.clear();
            for byte in &second.payload {
                self.response_fifo.push(*byte);
            }
            self.deliver_interrupt(second.irq);
        }
        self.state = DriveState::Idle;
    }

    /// Edge-triggered interrupt line; reading clears it
    pub fn take_irq(&mut self) -> bool {
        std::mem::take(&mut self.irq_line)
    }

    /// Current interrupt flag (diagnostics)
    pub fn interrupt_flag(&self) -> u8 {
        self.interrupt_flag
    }

    /// Current drive state (diagnostics)
    pub fn state(&self) -> DriveState {
        self.state
    }
}

impl Default for Cdrom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An in-memory disc for exercising the read path
    struct TestDisc {
        sectors: u32,
    }

    impl Disc for TestDisc {
        fn read_sector(&mut self, msf: Msf) -> crate::core::error::Result<[u8; RAW_SECTOR_SIZE]> {
            let mut sector = [0u8; RAW_SECTOR_SIZE];
            // header carries the address for GetLocL checks
            sector[12] = msf.minute;
            sector[13] = msf.second;
            sector[14] = msf.frame;
            sector[24] = 0x42;
            Ok(sector)
        }

        fn sector_count(&self) -> u32 {
            self.sectors
        }
    }

    fn drive_with_disc() -> Cdrom {
        let mut cdrom = Cdrom::new();
        cdrom.load_disc(Box::new(TestDisc { sectors: 1000 }));
        cdrom
    }

    fn ack_irq(cdrom: &mut Cdrom) {
        cdrom.write8(0x1F801800, 1); // index 1
        cdrom.write8(0x1F801803, 0x1F); // acknowledge all INT bits
        cdrom.write8(0x1F801800, 0);
    }

    #[test]
    fn test_index_register() {
        let mut cdrom = Cdrom::new();
        cdrom.write8(0x1F801800, 2);
        assert_eq!(cdrom.read8(0x1F801800) & 0x3, 2);
    }

    #[test]
    fn test_status_fifo_flags() {
        let mut cdrom = Cdrom::new();
        let status = cdrom.read8(0x1F801800);
        assert_ne!(status & (1 << 3), 0, "parameter FIFO empty");
        assert_ne!(status & (1 << 4), 0, "parameter FIFO writable");
        assert_eq!(status & (1 << 5), 0, "no response pending");
        assert_eq!(status & (1 << 7), 0, "idle");
    }

    #[test]
    fn test_getstat_first_response() {
        let mut cdrom = Cdrom::new();
        cdrom.write8(0x1F801801, 0x01); // GetStat
        assert_eq!(cdrom.state(), DriveState::WaitingFirstResponse);

        cdrom.update(60_000);
        assert_eq!(cdrom.state(), DriveState::Idle);
        assert_eq!(cdrom.interrupt_flag(), irq_codes::ACKNOWLEDGE);
        // response is the stat byte (motor on)
        assert_eq!(cdrom.read8(0x1F801801), 0x02);
    }

    #[test]
    fn test_interrupt_enable_gates_line() {
        let mut cdrom = Cdrom::new();
        // no enable bits: command completes without raising the line
        cdrom.write8(0x1F801801, 0x01);
        cdrom.update(60_000);
        assert!(!cdrom.take_irq());

        // enable INT3 and repeat
        ack_irq(&mut cdrom);
        cdrom.write8(0x1F801800, 1);
        cdrom.write8(0x1F801802, 0x1F);
        cdrom.write8(0x1F801800, 0);
        cdrom.write8(0x1F801801, 0x01);
        cdrom.update(60_000);
        assert!(cdrom.take_irq());
        assert!(!cdrom.take_irq(), "edge triggered");
    }

    #[test]
    fn test_getid_with_disc() {
        let mut cdrom = drive_with_disc();
        cdrom.write8(0x1F801801, 0x1A); // GetID
        cdrom.update(60_000);
        assert_eq!(cdrom.state(), DriveState::WaitingSecondResponse);
        assert_eq!(cdrom.interrupt_flag(), irq_codes::ACKNOWLEDGE);

        ack_irq(&mut cdrom);
        cdrom.update(2_000_000);
        assert_eq!(cdrom.interrupt_flag(), irq_codes::COMPLETE);

        // licensed-disc payload: stat, 00, 20, 00, "SCEA"
        assert_eq!(cdrom.read8(0x1F801801), 0x02);
        assert_eq!(cdrom.read8(0x1F801801), 0x00);
        assert_eq!(cdrom.read8(0x1F801801), 0x20);
        assert_eq!(cdrom.read8(0x1F801801), 0x00);
        assert_eq!(cdrom.read8(0x1F801801), b'S');
        assert_eq!(cdrom.read8(0x1F801801), b'C');
        assert_eq!(cdrom.read8(0x1F801801), b'E');
        assert_eq!(cdrom.read8(0x1F801801), b'A');
    }

    #[test]
    fn test_getid_without_disc() {
        let mut cdrom = Cdrom::new();
        cdrom.write8(0x1F801801, 0x1A);
        cdrom.update(60_000);
        ack_irq(&mut cdrom);
        cdrom.update(2_000_000);

        assert_eq!(cdrom.interrupt_flag(), irq_codes::ERROR);
        assert_eq!(cdrom.read8(0x1F801801), 0x08);
        assert_eq!(cdrom.read8(0x1F801801), 0x40);
    }

    #[test]
    fn test_test_command_bios_date() {
        let mut cdrom = Cdrom::new();
        cdrom.write8(0x1F801802, 0x20); // sub-function
        cdrom.write8(0x1F801801, 0x19); // Test
        cdrom.update(60_000);

        assert_eq!(cdrom.read8(0x1F801801), 0x97);
        assert_eq!(cdrom.read8(0x1F801801), 0x01);
        assert_eq!(cdrom.read8(0x1F801801), 0x10);
        assert_eq!(cdrom.read8(0x1F801801), 0xC2);
    }

    #[test]
    fn test_setloc_consumes_bcd_parameters() {
        let mut cdrom = drive_with_disc();
        // SetLoc 00:02:16 in BCD
        cdrom.write8(0x1F801802, 0x00);
        cdrom.write8(0x1F801802, 0x02);
        cdrom.write8(0x1F801802, 0x16);
        cdrom.write8(0x1F801801, 0x02);
        cdrom.update(60_000);

        assert_eq!(cdrom.seek_target, Msf::new(0, 2, 16));
    }

    #[test]
    fn test_readn_delivers_sector_after_delay() {
        let mut cdrom = drive_with_disc();
        // enable all INT sources
        cdrom.write8(0x1F801800, 1);
        cdrom.write8(0x1F801802, 0x1F);
        cdrom.write8(0x1F801800, 0);

        // SetLoc 00:02:00, then ReadN
        cdrom.write8(0x1F801802, 0x00);
        cdrom.write8(0x1F801802, 0x02);
        cdrom.write8(0x1F801802, 0x00);
        cdrom.write8(0x1F801801, 0x02);
        cdrom.update(60_000);
        ack_irq(&mut cdrom);

        cdrom.write8(0x1F801801, 0x06); // ReadN
        cdrom.update(60_000);
        assert_eq!(cdrom.state(), DriveState::Reading);
        ack_irq(&mut cdrom);

        // single speed: one sector after 451584 cycles
        cdrom.update(500_000);
        assert_eq!(cdrom.interrupt_flag(), irq_codes::DATA_READY);
        assert!(cdrom.take_irq());

        // data-only mode delivers offset 24 first
        assert_eq!(cdrom.read8(0x1F801802), 0x42);
        // 2048 bytes total, one popped
        assert_eq!(cdrom.data_fifo.len(), 2047);
    }

    #[test]
    fn test_whole_sector_mode_size() {
        let mut cdrom = drive_with_disc();
        // SetMode with whole-sector bit
        cdrom.write8(0x1F801802, 0x20);
        cdrom.write8(0x1F801801, 0x0E);
        cdrom.update(60_000);
        ack_irq(&mut cdrom);

        cdrom.write8(0x1F801801, 0x06); // ReadN
        cdrom.update(60_000);
        ack_irq(&mut cdrom);
        cdrom.update(500_000);

        assert_eq!(cdrom.data_fifo.len(), 2340);
    }

    #[test]
    fn test_interrupt_flag_acknowledge_bits() {
        let mut cdrom = Cdrom::new();
        cdrom.write8(0x1F801801, 0x01);
        cdrom.update(60_000);
        assert_ne!(cdrom.interrupt_flag(), 0);

        // write 1-bits to acknowledge
        cdrom.write8(0x1F801800, 1);
        cdrom.write8(0x1F801803, 0x1F);
        assert_eq!(cdrom.interrupt_flag(), 0);
    }

    #[test]
    fn test_volume_and_request_registers_latch() {
        let mut cdrom = Cdrom::new();

        cdrom.write8(0x1F801800, 3);
        cdrom.write8(0x1F801801, 0x11); // right-to-right
        cdrom.write8(0x1F801802, 0x22); // right-to-left
        cdrom.write8(0x1F801800, 2);
        cdrom.write8(0x1F801802, 0x33); // left-to-left
        cdrom.write8(0x1F801803, 0x44); // left-to-right
        assert_eq!(cdrom.volume_rr, 0x11);
        assert_eq!(cdrom.volume_rl, 0x22);
        assert_eq!(cdrom.volume_ll, 0x33);
        assert_eq!(cdrom.volume_lr, 0x44);

        cdrom.write8(0x1F801800, 0);
        cdrom.write8(0x1F801803, 0x80); // request data
        assert!(cdrom.want_data);
        cdrom.write8(0x1F801803, 0x00);
        assert!(!cdrom.want_data);
    }

    #[test]
    fn test_reading_pauses_until_ack() {
        let mut cdrom = drive_with_disc();
        cdrom.write8(0x1F801801, 0x06);
        cdrom.update(60_000); // ack response, now Reading with INT3 pending
        assert_eq!(cdrom.state(), DriveState::Reading);

        // Without acknowledging, no sector is delivered
        cdrom.update(1_000_000);
        assert_eq!(cdrom.interrupt_flag(), irq_codes::ACKNOWLEDGE);
        assert!(cdrom.data_fifo.is_empty());
    }
}
