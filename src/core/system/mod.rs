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

//! System integration
//!
//! Ties every component together and drives the deterministic
//! step-CPU-then-advance-devices loop. Device interrupts raised during
//! a tick become visible to the CPU at the start of its next fetch.

use crate::core::cdrom::{Cdrom, Disc};
use crate::core::cpu::CPU;
use crate::core::dma::Dma;
use crate::core::error::{EmulatorError, Result};
use crate::core::gpu::GPU;
use crate::core::interrupt::{interrupts, InterruptController};
use crate::core::loader::PsxExe;
use crate::core::memory::Bus;
use crate::core::sio::SerialInterface;
use crate::core::spu::Spu;
use crate::core::state::StateBuffer;
use crate::core::timer::Timers;
use crate::core::CPU_CLOCK;
use std::cell::RefCell;
use std::rc::Rc;

/// Save-state magic ("ROGE", little-endian)
const SAVESTATE_MAGIC: u32 = 0x524F_4745;

/// Save-state format version
const SAVESTATE_VERSION: u32 = 1;

/// CPU cycles per 60 Hz frame
const CYCLES_PER_FRAME: u64 = (CPU_CLOCK / 60) as u64;

/// The BIOS address where a queued PSX-EXE takes over
const EXE_SIDELOAD_PC: u32 = 0x8003_0000;

/// Host TTY sink
pub type TtyCallback = Box<dyn FnMut(&str)>;

/// Per-step debugger hook
pub type DebuggerCallback = Box<dyn FnMut()>;

/// The whole console
///
/// # Example
/// ```no_run
/// use rogem::core::system::System;
///
/// let mut system = System::new();
/// system.load_bios("SCPH1001.BIN")?;
/// loop {
///     system.run_frame()?;
/// }
/// # Ok::<(), rogem::core::error::EmulatorError>(())
/// ```
pub struct System {
    cpu: CPU,
    bus: Bus,
    gpu: Rc<RefCell<GPU>>,
    dma: Rc<RefCell<Dma>>,
    cdrom: Rc<RefCell<Cdrom>>,
    serial: Rc<RefCell<SerialInterface>>,
    timers: Rc<RefCell<Timers>>,
    interrupt_controller: Rc<RefCell<InterruptController>>,
    spu: Rc<RefCell<Spu>>,

    /// Total cycles executed since reset
    cycles: u64,

    /// Executable waiting for the BIOS to finish its init
    pending_exe: Option<PsxExe>,

    tty_callback: Option<TtyCallback>,
    debugger_callback: Option<DebuggerCallback>,
}

impl System {
    /// Create a powered-on console with every peripheral wired to the
    /// bus
    pub fn new() -> Self {
        let gpu = Rc::new(RefCell::new(GPU::new()));
        let dma = Rc::new(RefCell::new(Dma::new()));
        let cdrom = Rc::new(RefCell::new(Cdrom::new()));
        let serial = Rc::new(RefCell::new(SerialInterface::new()));
        let timers = Rc::new(RefCell::new(Timers::new()));
        let interrupt_controller = Rc::new(RefCell::new(InterruptController::new()));
        let spu = Rc::new(RefCell::new(Spu::new()));

        let mut bus = Bus::new();
        bus.set_gpu(gpu.clone());
        bus.set_dma(dma.clone());
        bus.set_cdrom(cdrom.clone());
        bus.set_serial(serial.clone());
        bus.set_timers(timers.clone());
        bus.set_interrupt_controller(interrupt_controller.clone());
        bus.set_spu(spu.clone());

        log::info!("system: all components initialized");

        Self {
            cpu: CPU::new(),
            bus,
            gpu,
            dma,
            cdrom,
            serial,
            timers,
            interrupt_controller,
            spu,
            cycles: 0,
            pending_exe: None,
            tty_callback: None,
            debugger_callback: None,
        }
    }

    /// Load a BIOS ROM (exactly 512 KiB)
    pub fn load_bios(&mut self, path: &str) -> Result<()> {
        self.bus.load_bios(path)
    }

    /// Queue a PSX-EXE for sideloading
    ///
    /// The file is validated now; the register/RAM takeover happens
    /// when the CPU first reaches the BIOS post-init address.
    pub fn load_executable(&mut self, path: &str) -> Result<()> {
        let exe = PsxExe::load(path)?;
        log::info!(
            "executable queued: PC=0x{:08X}, GP=0x{:08X}, dest=0x{:08X}, {} bytes",
            exe.initial_pc,
            exe.initial_gp,
            exe.ram_destination,
            exe.body.len()
        );
        self.pending_exe = Some(exe);
        Ok(())
    }

    /// Mount a disc image in the CD-ROM drive
    pub fn load_disc(&mut self, disc: Box<dyn Disc>) {
        self.cdrom.borrow_mut().load_disc(disc);
    }

    /// Power-cycle the console (the BIOS image survives)
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.reset();
        self.gpu.borrow_mut().reset();
        self.dma.borrow_mut().reset();
        self.cdrom.borrow_mut().reset();
        self.serial.borrow_mut().reset();
        self.timers.borrow_mut().reset();
        *self.interrupt_controller.borrow_mut() = InterruptController::new();
        self.spu.borrow_mut().reset();
        self.cycles = 0;
    }

    /// Execute one instruction and advance every device by the same
    /// cycle count
    pub fn step(&mut self) -> Result<u32> {
        // Sideload takes over once the BIOS has initialized the kernel
        if self.cpu.pc() == EXE_SIDELOAD_PC && self.pending_exe.is_some() {
            self.apply_sideload()?;
        }

        let cycles = self.cpu.step(&mut self.bus)?;

        // Video beam; hblank/vblank edges feed the timers
        let video = self.gpu.borrow_mut().tick(cycles);
        {
            let mut timers = self.timers.borrow_mut();
            for _ in 0..video.hblanks {
                if timers.on_hblank() {
                    self.interrupt_controller
                        .borrow_mut()
                        .request(interrupts::TIMER1);
                }
                timers.on_hblank_end();
            }
            if video.vblank {
                timers.on_vblank();
                timers.on_vblank_end();
            }
        }
        if video.vblank {
            self.interrupt_controller
                .borrow_mut()
                .request(interrupts::VBLANK);
        }

        // Timers
        let timer_irqs = self.timers.borrow_mut().tick(cycles);
        {
            let mut ic = self.interrupt_controller.borrow_mut();
            if timer_irqs[0] {
                ic.request(interrupts::TIMER0);
            }
            if timer_irqs[1] {
                ic.request(interrupts::TIMER1);
            }
            if timer_irqs[2] {
                ic.request(interrupts::TIMER2);
            }
        }

        // CD-ROM
        self.cdrom.borrow_mut().update(cycles);
        if self.cdrom.borrow_mut().take_irq() {
            self.interrupt_controller
                .borrow_mut()
                .request(interrupts::CDROM);
        }

        // Serial / pads
        self.serial.borrow_mut().update(cycles);
        if self.serial.borrow_mut().take_irq() {
            self.interrupt_controller
                .borrow_mut()
                .request(interrupts::CONTROLLER_MEMCARD);
        }

        // Host call-outs
        if self.cpu.tty_flush_ready() {
            let output = self.cpu.take_tty_output();
            if let Some(callback) = &mut self.tty_callback {
                callback(&output);
            }
        }
        if let Some(callback) = &mut self.debugger_callback {
            callback();
        }

        self.cycles += cycles as u64;
        Ok(cycles)
    }

    /// Execute `n` instructions
    pub fn step_n(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    /// Run one 60 Hz frame worth of cycles
    pub fn run_frame(&mut self) -> Result<()> {
        let target = self.cycles + CYCLES_PER_FRAME;
        while self.cycles < target {
            self.step()?;
        }
        Ok(())
    }

    /// Copy the queued executable into RAM and take over the CPU
    fn apply_sideload(&mut self) -> Result<()> {
        let exe = match self.pending_exe.take() {
            Some(exe) => exe,
            None => return Ok(()),
        };

        self.bus.write_ram_slice(exe.ram_destination, &exe.body)?;
        self.cpu.set_pc(exe.initial_pc);
        self.cpu.set_reg(28, exe.initial_gp);
        if let Some(sp) = exe.stack_pointer() {
            self.cpu.set_reg(29, sp);
            self.cpu.set_reg(30, sp);
        }

        log::info!("executable sideloaded, entry 0x{:08X}", exe.initial_pc);
        Ok(())
    }

    /// Host input update: active-low button mask for one pad port
    pub fn update_pad_input(&mut self, port: usize, mask: u16) {
        self.serial.borrow_mut().update_pad_buttons(port, mask);
    }

    /// Install the TTY text sink
    pub fn set_tty_callback(&mut self, callback: TtyCallback) {
        self.tty_callback = Some(callback);
    }

    /// Install the per-step debugger hook
    pub fn set_debugger_callback(&mut self, callback: DebuggerCallback) {
        self.debugger_callback = Some(callback);
    }

    /// Current PC
    pub fn pc(&self) -> u32 {
        self.cpu.pc()
    }

    /// Total cycles executed since reset
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn cpu(&self) -> &CPU {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CPU {
        &mut self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn gpu(&self) -> Rc<RefCell<GPU>> {
        Rc::clone(&self.gpu)
    }

    pub fn cdrom(&self) -> Rc<RefCell<Cdrom>> {
        Rc::clone(&self.cdrom)
    }

    pub fn serial(&self) -> Rc<RefCell<SerialInterface>> {
        Rc::clone(&self.serial)
    }

    /// Serialize the whole machine into a byte vector
    ///
    /// Layout: magic, version, the CPU block, then each device in the
    /// fixed order (RAM, ScratchPad, GPU, DMA, SPU, SerialInterface,
    /// Timers, InterruptController, MemoryControl1, MemoryControl2,
    /// CacheControl, Expansion2).
    pub fn save_state_bytes(&self) -> Vec<u8> {
        let mut buf = StateBuffer::new();
        buf.write_u32(SAVESTATE_MAGIC);
        buf.write_u32(SAVESTATE_VERSION);
        self.cpu.serialize(&mut buf);
        self.bus.serialize(&mut buf);
        buf.into_bytes()
    }

    /// Restore the whole machine from a byte vector
    ///
    /// A magic or version mismatch rejects the load before any state
    /// is touched.
    pub fn load_state_bytes(&mut self, data: Vec<u8>) -> Result<()> {
        let mut buf = StateBuffer::from_bytes(data);

        let magic = buf.read_u32()?;
        if magic != SAVESTATE_MAGIC {
            return Err(EmulatorError::SaveStateMagic {
                expected: SAVESTATE_MAGIC,
                got: magic,
            });
        }
        let version = buf.read_u32()?;
        if version != SAVESTATE_VERSION {
            return Err(EmulatorError::SaveStateVersion {
                expected: SAVESTATE_VERSION,
                got: version,
            });
        }

        self.cpu.deserialize(&mut buf)?;
        self.bus.deserialize(&mut buf)?;
        Ok(())
    }

    /// Save the machine state to a file
    pub fn save_state(&self, path: &str) -> Result<()> {
        let bytes = self.save_state_bytes();
        std::fs::write(path, &bytes)?;
        log::info!("state saved to {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    /// Load the machine state from a file
    pub fn load_state(&mut self, path: &str) -> Result<()> {
        let data = std::fs::read(path)?;
        self.load_state_bytes(data)?;
        log::info!("state loaded from {}", path);
        Ok(())
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_creation() {
        let system = System::new();
        assert_eq!(system.cycles(), 0);
        assert_eq!(system.pc(), 0xBFC00000);
    }

    #[test]
    fn test_system_reset() {
        let mut system = System::new();
        system.cycles = 1000;
        system.reset();
        assert_eq!(system.cycles(), 0);
        assert_eq!(system.pc(), 0xBFC00000);
    }

    #[test]
    fn test_components_are_shared() {
        let system = System::new();
        let gpu1 = system.gpu();
        let gpu2 = system.gpu();
        assert!(Rc::ptr_eq(&gpu1, &gpu2));
    }

    #[test]
    fn test_step_executes_instruction() {
        let mut system = System::new();
        // NOPs in RAM; run from there
        system.cpu_mut().set_pc(0x80001000);
        let cycles = system.step().unwrap();
        assert_eq!(cycles, 2);
        assert_eq!(system.pc(), 0x80001004);
        assert_eq!(system.cycles(), 2);
    }

    #[test]
    fn test_small_program_runs() {
        let mut system = System::new();
        // lui r8, 0x1234 / ori r8, r8, 0x5678
        system.bus_mut().write32(0x80001000, 0x3C081234).unwrap();
        system.bus_mut().write32(0x80001004, 0x35085678).unwrap();
        system.cpu_mut().set_pc(0x80001000);

        system.step_n(2).unwrap();
        assert_eq!(system.cpu().reg(8), 0x12345678);
    }

    #[test]
    fn test_tty_callback_receives_flushed_text() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut system = System::new();
        let captured = Rc::new(RefCell::new(String::new()));
        let sink = captured.clone();
        system.set_tty_callback(Box::new(move |text| {
            sink.borrow_mut().push_str(text);
        }));

        // Fake the BIOS putchar entry: PC = 0xA0, T1 = 0x3C, A0 = 'H'
        // with a NOP at the hook address, then the flush with '\n'
        system.cpu_mut().set_reg(9, 0x3C);
        system.cpu_mut().set_reg(4, 'H' as u32);
        system.cpu_mut().set_pc(0xA0);
        system.step().unwrap();
        assert!(captured.borrow().is_empty());

        system.cpu_mut().set_reg(4, '\n' as u32);
        system.cpu_mut().set_pc(0xA0);
        system.step().unwrap();
        assert_eq!(captured.borrow().as_str(), "H");
    }

    #[test]
    fn test_debugger_callback_fires_each_step() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut system = System::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        system.set_debugger_callback(Box::new(move || {
            counter.set(counter.get() + 1);
        }));

        system.cpu_mut().set_pc(0x80001000);
        system.step_n(5).unwrap();
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn test_pad_input_reaches_serial() {
        let mut system = System::new();
        system.update_pad_input(0, 0xFFFE); // SELECT held

        let serial = system.serial();
        let mut serial = serial.borrow_mut();
        serial.write16(0x1F801040, 0x01);
        serial.write16(0x1F801040, 0x42);
        serial.write16(0x1F801040, 0x00);
        serial.write16(0x1F801040, 0x00);
        assert_eq!(serial.read16(0x1F801040), 0xFE);
    }

    #[test]
    fn test_save_state_round_trip_is_byte_identical() {
        let mut system = System::new();
        // put some texture into the state
        system.bus_mut().write32(0x80001000, 0xDEADBEEF).unwrap();
        system.cpu_mut().set_reg(5, 0x1234);
        system.cpu_mut().set_pc(0x80001000);
        system.step().unwrap();

        let saved = system.save_state_bytes();

        let mut restored = System::new();
        restored.load_state_bytes(saved.clone()).unwrap();
        let saved_again = restored.save_state_bytes();

        assert_eq!(saved, saved_again);
    }

    #[test]
    fn test_load_state_rejects_bad_magic() {
        let mut system = System::new();
        let mut data = system.save_state_bytes();
        data[0] ^= 0xFF;

        let mut target = System::new();
        assert!(matches!(
            target.load_state_bytes(data),
            Err(EmulatorError::SaveStateMagic { .. })
        ));
    }

    #[test]
    fn test_load_state_rejects_bad_version() {
        let system = System::new();
        let mut data = system.save_state_bytes();
        data[4] = 99;

        let mut target = System::new();
        assert!(matches!(
            target.load_state_bytes(data),
            Err(EmulatorError::SaveStateVersion { .. })
        ));
    }

    #[test]
    fn test_save_state_preserves_cpu_and_ram(){
        let mut system = System::new();
        system.bus_mut().write32(0x80001234, 0xCAFED00D).unwrap();
        system.cpu_mut().set_reg(17, 0x8BADF00D);

        let saved = system.save_state_bytes();

        let mut restored = System::new();
        restored.load_state_bytes(saved).unwrap();
        assert_eq!(restored.bus_mut().read32(0x80001234).unwrap(), 0xCAFED00D);
        assert_eq!(restored.cpu().reg(17), 0x8BADF00D);
    }

    #[test]
    fn test_vblank_raises_interrupt_status() {
        let mut system = System::new();
        system.cpu_mut().set_pc(0x80001000);

        // Two frames of NOPs are guaranteed to cross a VBlank rollover
        system.run_frame().unwrap();
        system.run_frame().unwrap();

        let istat = system
            .interrupt_controller
            .borrow()
            .read_status();
        assert_ne!(istat & interrupts::VBLANK as u32, 0);
    }

    #[test]
    fn test_exe_sideload_at_bios_handoff() {
        use std::io::Write;

        // Build a tiny PSX-EXE: entry 0x80010000, body = lui r9,0xBEEF
        let mut data = vec![0u8; 0x800 + 4];
        data[0..8].copy_from_slice(b"PS-X EXE");
        data[0x10..0x14].copy_from_slice(&0x80010000u32.to_le_bytes());
        data[0x14..0x18].copy_from_slice(&0x80020000u32.to_le_bytes());
        data[0x18..0x1C].copy_from_slice(&0x80010000u32.to_le_bytes());
        data[0x1C..0x20].copy_from_slice(&4u32.to_le_bytes());
        data[0x30..0x34].copy_from_slice(&0x801FFF00u32.to_le_bytes());
        data[0x800..0x804].copy_from_slice(&0x3C09BEEFu32.to_le_bytes());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();

        let mut system = System::new();
        system
            .load_executable(file.path().to_str().unwrap())
            .unwrap();

        // Jump the CPU to the handoff address; the next step sideloads
        system.cpu_mut().set_pc(0x80030000);
        system.step().unwrap();

        assert_eq!(system.cpu().reg(28), 0x80020000);
        assert_eq!(system.cpu().reg(29), 0x801FFF00);
        assert_eq!(system.cpu().reg(30), 0x801FFF00);
        // the body executed from its new home
        assert_eq!(system.cpu().pc(), 0x80010004);
        system.step().unwrap();
        assert_eq!(system.cpu().reg(9), 0xBEEF0000);
    }
}
