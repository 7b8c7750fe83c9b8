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

//! Memory bus implementation
//!
//! The Bus is the central component for all memory operations. It folds
//! virtual addresses onto the physical map, enforces alignment, and
//! routes accesses to backing memory or the owning peripheral.
//!
//! # Memory Map (physical)
//!
//! | Range                  | Region       | Size   | Access |
//! |------------------------|--------------|--------|--------|
//! | 0x00000000-0x001FFFFF  | RAM          | 2 MiB  | R/W    |
//! | 0x1F800000-0x1F8003FF  | Scratchpad   | 1 KiB  | R/W    |
//! | 0x1F801000-0x1F801FFF  | I/O Ports    | 4 KiB  | R/W    |
//! | 0x1F802000-0x1F803FFF  | Expansion 2  | 8 KiB  | R/W    |
//! | 0x1FC00000-0x1FC7FFFF  | BIOS ROM     | 512KiB | R only |
//!
//! Unaligned halfword/word accesses are reported to the caller as an
//! error; the CPU turns them into guest exceptions at its call site.
//! Unmapped accesses are logged and read as 0.
//!
//! # Example
//!
//! ```
//! use rogem::core::memory::Bus;
//!
//! let mut bus = Bus::new();
//! bus.write32(0x80000000, 0x12345678).unwrap();
//!
//! // KUSEG/KSEG0/KSEG1 mirror the same word
//! assert_eq!(bus.read32(0x00000000).unwrap(), 0x12345678);
//! assert_eq!(bus.read32(0xA0000000).unwrap(), 0x12345678);
//! ```

use crate::core::cdrom::Cdrom;
use crate::core::dma::Dma;
use crate::core::error::{EmulatorError, Result};
use crate::core::gpu::GPU;
use crate::core::interrupt::InterruptController;
use crate::core::sio::SerialInterface;
use crate::core::spu::Spu;
use crate::core::state::StateBuffer;
use crate::core::timer::Timers;
use std::cell::RefCell;
use std::fs::File;
use std::io::Read;
use std::rc::Rc;

// Sub-modules
mod io_ports;
mod region;

// Re-export public types
pub use region::{identify_region, translate_address, MemoryRegion};

/// Memory bus managing all memory accesses
///
/// Owns the backing memory blocks and the small register files wired
/// directly into the bus (memory control, cache control, Expansion 2);
/// peripherals are shared with the system orchestrator through
/// `Rc<RefCell<...>>` handles.
pub struct Bus {
    /// Main RAM (2 MiB)
    ram: Vec<u8>,

    /// Scratchpad (1 KiB fast RAM, mirrored through a 4 KiB window)
    scratchpad: [u8; 1024],

    /// BIOS ROM (512 KiB), loaded from a raw image
    bios: Vec<u8>,

    /// Memory Control 1 (9 words at 0x1F801000): expansion base
    /// addresses and delay/size configuration, storage only
    memory_control1: [u32; 9],

    /// Memory Control 2 (0x1F801060): RAM_SIZE, storage only
    memory_control2: u32,

    /// Cache control register (0xFFFE0130)
    cache_control: u32,

    /// Expansion Region 2 POST register (0x1F802041), latched
    expansion2_post: u8,

    /// GPU handle (shared with the system orchestrator)
    gpu: Option<Rc<RefCell<GPU>>>,

    /// DMA controller handle
    dma: Option<Rc<RefCell<Dma>>>,

    /// CD-ROM drive handle
    cdrom: Option<Rc<RefCell<Cdrom>>>,

    /// Serial interface (SIO0 + pads) handle
    serial: Option<Rc<RefCell<SerialInterface>>>,

    /// Timers handle
    timers: Option<Rc<RefCell<Timers>>>,

    /// Interrupt controller handle
    interrupt_controller: Option<Rc<RefCell<InterruptController>>>,

    /// SPU register-file stub handle
    spu: Option<Rc<RefCell<Spu>>>,
}

impl Bus {
    /// RAM size (2 MiB)
    pub const RAM_SIZE: usize = 2 * 1024 * 1024;

    /// BIOS size (512 KiB)
    pub const BIOS_SIZE: usize = 512 * 1024;

    const SCRATCHPAD_START: u32 = 0x1F80_0000;
    const BIOS_START: u32 = 0x1FC0_0000;

    /// Create a new Bus with zeroed memory and no peripherals wired
    pub fn new() -> Self {
        Self {
            ram: vec![0u8; Self::RAM_SIZE],
            scratchpad: [0u8; 1024],
            bios: vec![0u8; Self::BIOS_SIZE],
            memory_control1: [0u32; 9],
            memory_control2: 0,
            cache_control: 0,
            expansion2_post: 0,
            gpu: None,
            dma: None,
            cdrom: None,
            serial: None,
            timers: None,
            interrupt_controller: None,
            spu: None,
        }
    }

    /// Wire the GPU for memory-mapped access
    pub fn set_gpu(&mut self, gpu: Rc<RefCell<GPU>>) {
        self.gpu = Some(gpu);
    }

    /// Wire the DMA controller for memory-mapped access
    pub fn set_dma(&mut self, dma: Rc<RefCell<Dma>>) {
        self.dma = Some(dma);
    }

    /// Wire the CD-ROM drive for memory-mapped access
    pub fn set_cdrom(&mut self, cdrom: Rc<RefCell<Cdrom>>) {
        self.cdrom = Some(cdrom);
    }

    /// Wire the serial interface for memory-mapped access
    pub fn set_serial(&mut self, serial: Rc<RefCell<SerialInterface>>) {
        self.serial = Some(serial);
    }

    /// Wire the timers for memory-mapped access
    pub fn set_timers(&mut self, timers: Rc<RefCell<Timers>>) {
        self.timers = Some(timers);
    }

    /// Wire the interrupt controller for memory-mapped access
    pub fn set_interrupt_controller(&mut self, ic: Rc<RefCell<InterruptController>>) {
        self.interrupt_controller = Some(ic);
    }

    /// Wire the SPU stub for memory-mapped access
    pub fn set_spu(&mut self, spu: Rc<RefCell<Spu>>) {
        self.spu = Some(spu);
    }

    /// Reset volatile memory and bus registers
    ///
    /// BIOS contents survive: the ROM image is not cleared by a
    /// power-cycle.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.scratchpad.fill(0);
        self.memory_control1 = [0u32; 9];
        self.memory_control2 = 0;
        self.cache_control = 0;
        self.expansion2_post = 0;
    }

    /// Load a BIOS ROM image from a file
    ///
    /// The file must be exactly 512 KiB; it is copied verbatim.
    ///
    /// # Errors
    ///
    /// [`EmulatorError::BiosNotFound`] when the file cannot be opened,
    /// [`EmulatorError::InvalidBiosSize`] when it is not 512 KiB.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rogem::core::memory::Bus;
    ///
    /// let mut bus = Bus::new();
    /// bus.load_bios("SCPH1001.BIN").unwrap();
    /// ```
    pub fn load_bios(&mut self, path: &str) -> Result<()> {
        let mut file =
            File::open(path).map_err(|_| EmulatorError::BiosNotFound(path.to_string()))?;

        let metadata = file.metadata()?;
        if metadata.len() != Self::BIOS_SIZE as u64 {
            return Err(EmulatorError::InvalidBiosSize {
                expected: Self::BIOS_SIZE,
                got: metadata.len() as usize,
            });
        }

        file.read_exact(&mut self.bios)?;
        log::info!("BIOS loaded from {}", path);
        Ok(())
    }

    /// Read 8-bit value from memory
    pub fn read8(&mut self, vaddr: u32) -> Result<u8> {
        let paddr = translate_address(vaddr);

        match identify_region(paddr) {
            MemoryRegion::Ram => Ok(self.ram[paddr as usize]),
            MemoryRegion::Scratchpad => {
                let offset = ((paddr - Self::SCRATCHPAD_START) & 0x3FF) as usize;
                Ok(self.scratchpad[offset])
            }
            MemoryRegion::Bios => Ok(self.bios[(paddr - Self::BIOS_START) as usize]),
            MemoryRegion::Io => self.read_io8(paddr),
            MemoryRegion::Expansion2 => {
                log::trace!("Expansion 2 read8 at 0x{:08X} -> 0x00", vaddr);
                Ok(0)
            }
            MemoryRegion::CacheControl => Ok(0),
            MemoryRegion::Expansion => Ok(Self::expansion_fill(paddr) as u8),
            MemoryRegion::Unmapped => {
                log::warn!("read8 from unmapped address 0x{:08X}", vaddr);
                Ok(0)
            }
        }
    }

    /// Read 16-bit value from memory (little-endian)
    ///
    /// The address must be 2-byte aligned.
    pub fn read16(&mut self, vaddr: u32) -> Result<u16> {
        if vaddr & 0x1 != 0 {
            return Err(EmulatorError::UnalignedAccess {
                address: vaddr,
                size: 2,
            });
        }

        let paddr = translate_address(vaddr);
        match identify_region(paddr) {
            MemoryRegion::Ram => {
                let offset = paddr as usize;
                Ok(u16::from_le_bytes([self.ram[offset], self.ram[offset + 1]]))
            }
            MemoryRegion::Scratchpad => {
                let offset = ((paddr - Self::SCRATCHPAD_START) & 0x3FF) as usize;
                Ok(u16::from_le_bytes([
                    self.scratchpad[offset],
                    self.scratchpad[offset + 1],
                ]))
            }
            MemoryRegion::Bios => {
                let offset = (paddr - Self::BIOS_START) as usize;
                Ok(u16::from_le_bytes([
                    self.bios[offset],
                    self.bios[offset + 1],
                ]))
            }
            MemoryRegion::Io => self.read_io16(paddr),
            MemoryRegion::Expansion2 => Ok(0),
            MemoryRegion::CacheControl => Ok(0),
            MemoryRegion::Expansion => Ok(Self::expansion_fill(paddr) as u16),
            MemoryRegion::Unmapped => {
                log::warn!("read16 from unmapped address 0x{:08X}", vaddr);
                Ok(0)
            }
        }
    }

    /// Read 32-bit value from memory (little-endian)
    ///
    /// The address must be 4-byte aligned.
    ///
    /// # Example
    ///
    /// ```
    /// use rogem::core::memory::Bus;
    ///
    /// let mut bus = Bus::new();
    /// bus.write32(0x80000000, 0x12345678).unwrap();
    /// assert_eq!(bus.read32(0x80000000).unwrap(), 0x12345678);
    /// assert!(bus.read32(0x80000001).is_err());
    /// ```
    pub fn read32(&mut self, vaddr: u32) -> Result<u32> {
        if vaddr & 0x3 != 0 {
            return Err(EmulatorError::UnalignedAccess {
                address: vaddr,
                size: 4,
            });
        }

        let paddr = translate_address(vaddr);
        match identify_region(paddr) {
            MemoryRegion::Ram => {
                let offset = paddr as usize;
                Ok(u32::from_le_bytes([
                    self.ram[offset],
                    self.ram[offset + 1],
                    self.ram[offset + 2],
                    self.ram[offset + 3],
                ]))
            }
            MemoryRegion::Scratchpad => {
                let offset = ((paddr - Self::SCRATCHPAD_START) & 0x3FF) as usize;
                Ok(u32::from_le_bytes([
                    self.scratchpad[offset],
                    self.scratchpad[offset + 1],
                    self.scratchpad[offset + 2],
                    self.scratchpad[offset + 3],
                ]))
            }
            MemoryRegion::Bios => {
                let offset = (paddr - Self::BIOS_START) as usize;
                Ok(u32::from_le_bytes([
                    self.bios[offset],
                    self.bios[offset + 1],
                    self.bios[offset + 2],
                    self.bios[offset + 3],
                ]))
            }
            MemoryRegion::Io => self.read_io32(paddr),
            MemoryRegion::Expansion2 => Ok(0),
            MemoryRegion::CacheControl => Ok(self.cache_control),
            MemoryRegion::Expansion => Ok(Self::expansion_fill(paddr)),
            MemoryRegion::Unmapped => {
                log::warn!("read32 from unmapped address 0x{:08X}", vaddr);
                Ok(0)
            }
        }
    }

    /// Write 8-bit value to memory
    pub fn write8(&mut self, vaddr: u32, value: u8) -> Result<()> {
        let paddr = translate_address(vaddr);

        match identify_region(paddr) {
            MemoryRegion::Ram => {
                self.ram[paddr as usize] = value;
                Ok(())
            }
            MemoryRegion::Scratchpad => {
                let offset = ((paddr - Self::SCRATCHPAD_START) & 0x3FF) as usize;
                self.scratchpad[offset] = value;
                Ok(())
            }
            MemoryRegion::Bios => {
                log::trace!("write to BIOS at 0x{:08X} ignored", paddr);
                Ok(())
            }
            MemoryRegion::Io => self.write_io8(paddr, value),
            MemoryRegion::Expansion2 => {
                if paddr == 0x1F80_2041 {
                    self.expansion2_post = value;
                    log::debug!("POST status 0x{:02X}", value);
                } else {
                    log::trace!(
                        "Expansion 2 write8 0x{:02X} at 0x{:08X} ignored",
                        value,
                        vaddr
                    );
                }
                Ok(())
            }
            MemoryRegion::CacheControl => Ok(()),
            MemoryRegion::Expansion => Ok(()),
            MemoryRegion::Unmapped => {
                log::warn!("write8 to unmapped address 0x{:08X} dropped", vaddr);
                Ok(())
            }
        }
    }

    /// Write 16-bit value to memory (little-endian)
    ///
    /// The address must be 2-byte aligned.
    pub fn write16(&mut self, vaddr: u32, value: u16) -> Result<()> {
        if vaddr & 0x1 != 0 {
            return Err(EmulatorError::UnalignedAccess {
                address: vaddr,
                size: 2,
            });
        }

        let paddr = translate_address(vaddr);
        let bytes = value.to_le_bytes();
        match identify_region(paddr) {
            MemoryRegion::Ram => {
                let offset = paddr as usize;
                self.ram[offset] = bytes[0];
                self.ram[offset + 1] = bytes[1];
                Ok(())
            }
            MemoryRegion::Scratchpad => {
                let offset = ((paddr - Self::SCRATCHPAD_START) & 0x3FF) as usize;
                self.scratchpad[offset] = bytes[0];
                self.scratchpad[offset + 1] = bytes[1];
                Ok(())
            }
            MemoryRegion::Bios => {
                log::trace!("write to BIOS at 0x{:08X} ignored", paddr);
                Ok(())
            }
            MemoryRegion::Io => self.write_io16(paddr, value),
            MemoryRegion::Expansion2 | MemoryRegion::CacheControl | MemoryRegion::Expansion => {
                Ok(())
            }
            MemoryRegion::Unmapped => {
                log::warn!("write16 to unmapped address 0x{:08X} dropped", vaddr);
                Ok(())
            }
        }
    }

    /// Write 32-bit value to memory (little-endian)
    ///
    /// The address must be 4-byte aligned.
    pub fn write32(&mut self, vaddr: u32, value: u32) -> Result<()> {
        if vaddr & 0x3 != 0 {
            return Err(EmulatorError::UnalignedAccess {
                address: vaddr,
                size: 4,
            });
        }

        let paddr = translate_address(vaddr);
        let bytes = value.to_le_bytes();
        match identify_region(paddr) {
            MemoryRegion::Ram => {
                let offset = paddr as usize;
                self.ram[offset..offset + 4].copy_from_slice(&bytes);
                Ok(())
            }
            MemoryRegion::Scratchpad => {
                let offset = ((paddr - Self::SCRATCHPAD_START) & 0x3FF) as usize;
                self.scratchpad[offset..offset + 4].copy_from_slice(&bytes);
                Ok(())
            }
            MemoryRegion::Bios => {
                log::trace!("write to BIOS at 0x{:08X} ignored", paddr);
                Ok(())
            }
            MemoryRegion::Io => self.write_io32(paddr, value),
            MemoryRegion::Expansion2 | MemoryRegion::Expansion => Ok(()),
            MemoryRegion::CacheControl => {
                log::debug!("cache control <- 0x{:08X}", value);
                self.cache_control = value;
                Ok(())
            }
            MemoryRegion::Unmapped => {
                log::warn!("write32 to unmapped address 0x{:08X} dropped", vaddr);
                Ok(())
            }
        }
    }

    /// Expansion regions: ROM header slots answer 0 (no ROM present),
    /// everything else reads as open bus
    fn expansion_fill(paddr: u32) -> u32 {
        if (0x1F00_0000..=0x1F00_00FF).contains(&paddr) {
            0x0000_0000
        } else {
            0xFFFF_FFFF
        }
    }

    /// Whether the interrupt controller has any unmasked pending line
    ///
    /// Polled by the CPU before every fetch.
    pub fn is_interrupt_pending(&self) -> bool {
        match &self.interrupt_controller {
            Some(ic) => ic.borrow().is_pending(),
            None => false,
        }
    }

    /// Copy a byte slice directly into RAM
    ///
    /// Used by the executable loader. The address is masked onto the
    /// physical RAM range.
    pub fn write_ram_slice(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let paddr = (address & 0x1F_FFFF) as usize;
        if paddr + data.len() > Self::RAM_SIZE {
            return Err(EmulatorError::InvalidMemoryAccess { address });
        }
        self.ram[paddr..paddr + data.len()].copy_from_slice(data);
        log::trace!("wrote {} bytes to RAM at 0x{:08X}", data.len(), address);
        Ok(())
    }

    /// Direct access to RAM for the DMA engine
    pub(crate) fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    /// Write directly to BIOS memory (test helper)
    #[cfg(test)]
    pub(crate) fn write_bios_for_test(&mut self, offset: usize, data: &[u8]) {
        self.bios[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Serialize the bus-owned blocks and every peripheral, in the
    /// fixed save-state order
    pub fn serialize(&self, buf: &mut StateBuffer) {
        buf.write_bytes(&self.ram);
        buf.write_bytes(&self.scratchpad);

        if let Some(gpu) = &self.gpu {
            gpu.borrow().serialize(buf);
        }
        if let Some(dma) = &self.dma {
            dma.borrow().serialize(buf);
        }
        if let Some(spu) = &self.spu {
            spu.borrow().serialize(buf);
        }
        if let Some(serial) = &self.serial {
            serial.borrow().serialize(buf);
        }
        if let Some(timers) = &self.timers {
            timers.borrow().serialize(buf);
        }
        if let Some(ic) = &self.interrupt_controller {
            ic.borrow().serialize(buf);
        }

        for reg in &self.memory_control1 {
            buf.write_u32(*reg);
        }
        buf.write_u32(self.memory_control2);
        buf.write_u32(self.cache_control);
        buf.write_u8(self.expansion2_post);
    }

    /// Restore the bus-owned blocks and every peripheral
    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        buf.read_bytes_into(&mut self.ram)?;
        buf.read_bytes_into(&mut self.scratchpad)?;

        if let Some(gpu) = &self.gpu {
            gpu.borrow_mut().deserialize(buf)?;
        }
        if let Some(dma) = &self.dma {
            dma.borrow_mut().deserialize(buf)?;
        }
        if let Some(spu) = &self.spu {
            spu.borrow_mut().deserialize(buf)?;
        }
        if let Some(serial) = &self.serial {
            serial.borrow_mut().deserialize(buf)?;
        }
        if let Some(timers) = &self.timers {
            timers.borrow_mut().deserialize(buf)?;
        }
        if let Some(ic) = &self.interrupt_controller {
            ic.borrow_mut().deserialize(buf)?;
        }

        for reg in &mut self.memory_control1 {
            *reg = buf.read_u32()?;
        }
        self.memory_control2 = buf.read_u32()?;
        self.cache_control = buf.read_u32()?;
        self.expansion2_post = buf.read_u8()?;
        Ok(())
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_read_write_round_trip() {
        let mut bus = Bus::new();
        bus.write32(0x80000100, 0xCAFEBABE).unwrap();
        assert_eq!(bus.read32(0x80000100).unwrap(), 0xCAFEBABE);
        assert_eq!(bus.read16(0x80000100).unwrap(), 0xBABE);
        assert_eq!(bus.read8(0x80000100).unwrap(), 0xBE);
        assert_eq!(bus.read8(0x80000103).unwrap(), 0xCA);
    }

    #[test]
    fn test_segment_mirroring() {
        let mut bus = Bus::new();
        bus.write32(0x00000040, 0x11223344).unwrap();
        assert_eq!(bus.read32(0x80000040).unwrap(), 0x11223344);
        assert_eq!(bus.read32(0xA0000040).unwrap(), 0x11223344);
    }

    #[test]
    fn test_unaligned_access_is_reported() {
        let mut bus = Bus::new();
        assert!(bus.read32(0x80000001).is_err());
        assert!(bus.read16(0x80000001).is_err());
        assert!(bus.write32(0x80000002, 0).is_err());
        assert!(bus.write16(0x80000003, 0).is_err());
    }

    #[test]
    fn test_bios_is_read_only() {
        let mut bus = Bus::new();
        bus.write_bios_for_test(0, &[0xAA, 0xBB, 0xCC, 0xDD]);

        assert_eq!(bus.read32(0xBFC00000).unwrap(), 0xDDCCBBAA);
        bus.write32(0xBFC00000, 0x00000000).unwrap();
        assert_eq!(bus.read32(0xBFC00000).unwrap(), 0xDDCCBBAA);
    }

    #[test]
    fn test_scratchpad_mirror() {
        let mut bus = Bus::new();
        bus.write32(0x1F800010, 0x55AA55AA).unwrap();
        // 0x400..0xFFF mirrors the 1 KiB backing store
        assert_eq!(bus.read32(0x1F800410).unwrap(), 0x55AA55AA);
    }

    #[test]
    fn test_unmapped_reads_zero() {
        let mut bus = Bus::new();
        assert_eq!(bus.read32(0x1FC80000).unwrap(), 0);
        bus.write32(0x1FC80000, 0x1234).unwrap();
    }

    #[test]
    fn test_cache_control_register() {
        let mut bus = Bus::new();
        bus.write32(0xFFFE0130, 0x0001_E988).unwrap();
        assert_eq!(bus.read32(0xFFFE0130).unwrap(), 0x0001_E988);
    }

    #[test]
    fn test_expansion2_post_register() {
        let mut bus = Bus::new();
        bus.write8(0x1F802041, 0x07).unwrap();
        assert_eq!(bus.expansion2_post, 0x07);
        // reads are open (return 0)
        assert_eq!(bus.read8(0x1F802041).unwrap(), 0);
    }

    #[test]
    fn test_load_bios_rejects_wrong_size() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 1024]).unwrap();

        let mut bus = Bus::new();
        let result = bus.load_bios(file.path().to_str().unwrap());
        assert!(matches!(
            result,
            Err(EmulatorError::InvalidBiosSize { expected: _, got: 1024 })
        ));
    }

    #[test]
    fn test_load_bios_accepts_exact_size() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let image = vec![0x42u8; Bus::BIOS_SIZE];
        file.write_all(&image).unwrap();

        let mut bus = Bus::new();
        bus.load_bios(file.path().to_str().unwrap()).unwrap();
        assert_eq!(bus.read8(0xBFC00000).unwrap(), 0x42);
    }

    #[test]
    fn test_load_bios_missing_file() {
        let mut bus = Bus::new();
        assert!(matches!(
            bus.load_bios("/nonexistent/bios.bin"),
            Err(EmulatorError::BiosNotFound(_))
        ));
    }

    #[test]
    fn test_write_ram_slice_bounds() {
        let mut bus = Bus::new();
        bus.write_ram_slice(0x80010000, &[1, 2, 3, 4]).unwrap();
        assert_eq!(bus.read32(0x80010000).unwrap(), 0x04030201);

        let too_big = vec![0u8; 16];
        assert!(bus
            .write_ram_slice(0x801FFFF8, &too_big)
            .is_err());
    }

    #[test]
    fn test_reset_clears_ram_not_bios() {
        let mut bus = Bus::new();
        bus.write_bios_for_test(0, &[0x11, 0x22, 0x33, 0x44]);
        bus.write32(0x80000000, 0xDEADBEEF).unwrap();

        bus.reset();

        assert_eq!(bus.read32(0x80000000).unwrap(), 0);
        assert_eq!(bus.read32(0xBFC00000).unwrap(), 0x44332211);
    }
}
