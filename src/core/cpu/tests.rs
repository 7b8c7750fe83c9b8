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

//! CPU integration tests: pipeline behavior, exceptions and the
//! documented arithmetic edge cases

use super::cop0::COP0;
use super::CPU;
use crate::core::interrupt::{interrupts, InterruptController};
use crate::core::memory::Bus;
use std::cell::RefCell;
use std::rc::Rc;

/// Program origin in RAM (KSEG0)
const ORIGIN: u32 = 0x8000_1000;

/// Load a program at the origin and point the CPU at it
fn setup(program: &[u32]) -> (CPU, Bus) {
    let mut bus = Bus::new();
    for (i, word) in program.iter().enumerate() {
        bus.write32(ORIGIN + (i as u32) * 4, *word).unwrap();
    }
    let mut cpu = CPU::new();
    cpu.set_pc(ORIGIN);
    (cpu, bus)
}

#[test]
fn test_lui_ori_builds_constant() {
    // lui r8, 0xCAFE / ori r8, r8, 0xBABE
    let (mut cpu, mut bus) = setup(&[0x3C08CAFE, 0x3508BABE]);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.reg(8), 0xCAFEBABE);
}

#[test]
fn test_load_delay_visibility() {
    // lw r9, 0(r8) / ori r10, r9, 0
    let (mut cpu, mut bus) = setup(&[0x8D090000, 0x352A0000]);
    bus.write32(0x1000, 0xDEADBEEF).unwrap();
    cpu.set_reg(8, 0x1000);
    cpu.set_reg(9, 0x11111111);

    // Immediately after the load, the old value is still visible
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.reg(9), 0x11111111);

    // The next instruction reads the stale value; afterwards the load
    // has committed
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.reg(9), 0xDEADBEEF);
    assert_eq!(cpu.reg(10), 0x11111111);
}

#[test]
fn test_load_delay_cancelled_by_overlapping_load() {
    // Two back-to-back loads into r9: the earlier pending value is
    // superseded, never architecturally visible
    let (mut cpu, mut bus) = setup(&[0x8D090000, 0x8D090004, 0x00000000]);
    bus.write32(0x1000, 0x11110000).unwrap();
    bus.write32(0x1004, 0x22220000).unwrap();
    cpu.set_reg(8, 0x1000);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.reg(9), 0x22220000);
}

#[test]
fn test_branch_delay_slot_executes() {
    // beq r0, r0, +0x20 / ori r9, r0, 0x1234
    let (mut cpu, mut bus) = setup(&[0x10000020, 0x34091234]);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.pc(), ORIGIN + 4 + (0x20 << 2));
    assert_eq!(cpu.reg(9), 0x1234);
}

#[test]
fn test_branch_not_taken_falls_through() {
    // bne r0, r0, +0x20 / nop
    let (mut cpu, mut bus) = setup(&[0x14000020, 0x00000000]);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc(), ORIGIN + 8);
}

#[test]
fn test_jal_links_past_delay_slot() {
    // jal 0x80002000 / nop
    let target = 0x8000_2000u32;
    let encoded = 0x0C00_0000 | ((target & 0x0FFF_FFFF) >> 2);
    let (mut cpu, mut bus) = setup(&[encoded, 0x00000000]);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.pc(), target);
    assert_eq!(cpu.reg(31), ORIGIN + 8);
}

#[test]
fn test_syscall_exception_state() {
    let (mut cpu, mut bus) = setup(&[0x0000000C]);
    cpu.set_cop0_reg(COP0::SR as u8, 0x0000000A);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.pc(), 0x80000080);
    assert_eq!(cpu.cop0_reg(COP0::EPC as u8), ORIGIN);

    let cause = cpu.cop0_reg(COP0::CAUSE as u8);
    assert_eq!((cause >> 2) & 0x1F, 8, "ExcCode = Syscall");
    assert_eq!(cause >> 31, 0, "not in a delay slot");

    // the 6-bit mode stack pushed two positions left
    assert_eq!(cpu.cop0_reg(COP0::SR as u8) & 0x3F, 0x28);
}

#[test]
fn test_break_uses_dedicated_vector() {
    let (mut cpu, mut bus) = setup(&[0x0000000D]);
    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.pc(), 0x80000040);
    let cause = cpu.cop0_reg(COP0::CAUSE as u8);
    assert_eq!((cause >> 2) & 0x1F, 9);
}

#[test]
fn test_rfe_pops_mode_stack() {
    // rfe
    let (mut cpu, mut bus) = setup(&[0x42000010]);
    cpu.set_cop0_reg(COP0::SR as u8, 0x2C); // 0b101100

    cpu.step(&mut bus).unwrap();

    // SR[3:0] = old SR[5:2], SR[5:4] unchanged
    assert_eq!(cpu.cop0_reg(COP0::SR as u8) & 0x3F, 0x2B);
}

#[test]
fn test_addi_overflow_leaves_destination() {
    // addi r2, r1, 1
    let (mut cpu, mut bus) = setup(&[0x20220001]);
    cpu.set_reg(1, i32::MAX as u32);
    cpu.set_reg(2, 0x55555555);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.reg(2), 0x55555555, "destination unmodified");
    assert_eq!(cpu.pc(), 0x80000080);
    assert_eq!((cpu.cop0_reg(COP0::CAUSE as u8) >> 2) & 0x1F, 12);
}

#[test]
fn test_addiu_wraps_silently() {
    // addiu r2, r1, 1
    let (mut cpu, mut bus) = setup(&[0x24220001]);
    cpu.set_reg(1, i32::MAX as u32);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.reg(2), i32::MIN as u32);
    assert_eq!(cpu.pc(), ORIGIN + 4, "no exception");
}

#[test]
fn test_div_int_min_by_minus_one() {
    // div r1, r2
    let (mut cpu, mut bus) = setup(&[0x0022001A]);
    cpu.set_reg(1, i32::MIN as u32);
    cpu.set_reg(2, (-1i32) as u32);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.lo(), i32::MIN as u32);
    assert_eq!(cpu.hi(), 0);
    assert_eq!(cpu.pc(), ORIGIN + 4, "no trap");
}

#[test]
fn test_div_by_zero_results() {
    // positive dividend: LO = -1, HI = dividend
    let (mut cpu, mut bus) = setup(&[0x0022001A]);
    cpu.set_reg(1, 1000);
    cpu.set_reg(2, 0);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.lo(), 0xFFFF_FFFF);
    assert_eq!(cpu.hi(), 1000);

    // negative dividend: LO = 1, HI = dividend
    let (mut cpu, mut bus) = setup(&[0x0022001A]);
    cpu.set_reg(1, (-1000i32) as u32);
    cpu.set_reg(2, 0);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.lo(), 1);
    assert_eq!(cpu.hi(), (-1000i32) as u32);
}

#[test]
fn test_divu_by_zero_results() {
    // divu r1, r2
    let (mut cpu, mut bus) = setup(&[0x0022001B]);
    cpu.set_reg(1, 1234);
    cpu.set_reg(2, 0);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.lo(), 0xFFFF_FFFF);
    assert_eq!(cpu.hi(), 1234);
}

#[test]
fn test_mult_produces_hi_lo() {
    // mult r1, r2
    let (mut cpu, mut bus) = setup(&[0x00220018]);
    cpu.set_reg(1, 0x10000);
    cpu.set_reg(2, 0x10000);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.hi(), 1);
    assert_eq!(cpu.lo(), 0);
}

#[test]
fn test_variable_shift_masks_to_five_bits() {
    // sllv r3, r2, r1 with a shift amount of 35
    let (mut cpu, mut bus) = setup(&[0x00221804]);
    cpu.set_reg(1, 35);
    cpu.set_reg(2, 1);

    cpu.step(&mut bus).unwrap();

    // 35 & 0x1F == 3
    assert_eq!(cpu.reg(3), 1 << 3);
}

#[test]
fn test_gpr0_reads_zero_after_writes() {
    // lui r0, 0xFFFF / addiu r0, r0, 0x100
    let (mut cpu, mut bus) = setup(&[0x3C00FFFF, 0x24000100]);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.reg(0), 0);

    cpu.set_reg(0, 0xDEADBEEF);
    assert_eq!(cpu.reg(0), 0);
}

#[test]
fn test_lwl_lwr_pair_merges_through_pipeline() {
    // Unaligned word at 0x1001, little-endian: the classic pair is
    //   lwl r9, 4(r8) ; lwr r9, 1(r8)
    let (mut cpu, mut bus) = setup(&[0x89090004, 0x99090001, 0x00000000]);
    bus.write32(0x1000, 0x44332211).unwrap();
    bus.write32(0x1004, 0x88776655).unwrap();
    cpu.set_reg(8, 0x1000);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();

    // bytes 0x1001-0x1004
    assert_eq!(cpu.reg(9), 0x55443322);
}

#[test]
fn test_unaligned_load_raises_address_error() {
    // lw r9, 1(r8)
    let (mut cpu, mut bus) = setup(&[0x8D090001]);
    cpu.set_reg(8, 0x1000);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.pc(), 0x80000080);
    assert_eq!((cpu.cop0_reg(COP0::CAUSE as u8) >> 2) & 0x1F, 4);
    assert_eq!(cpu.cop0_reg(COP0::BADV as u8), 0x1001);
}

#[test]
fn test_unaligned_store_raises_address_error() {
    // sw r9, 2(r8)
    let (mut cpu, mut bus) = setup(&[0xAD090002]);
    cpu.set_reg(8, 0x1000);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.pc(), 0x80000080);
    assert_eq!((cpu.cop0_reg(COP0::CAUSE as u8) >> 2) & 0x1F, 5);
    assert_eq!(cpu.cop0_reg(COP0::BADV as u8), 0x1002);
}

#[test]
fn test_jr_unaligned_target_faults_after_delay_slot() {
    // jr r8 / ori r9, r0, 0x42
    let (mut cpu, mut bus) = setup(&[0x01000008, 0x34090042]);
    cpu.set_reg(8, 0x8000_2001);

    // the jump itself does not fault
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc(), ORIGIN + 4);

    // the delay slot executes, then the fetch faults
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.reg(9), 0x42, "delay slot still executed");
    assert_eq!(cpu.pc(), 0x80000080);
    assert_eq!((cpu.cop0_reg(COP0::CAUSE as u8) >> 2) & 0x1F, 4);
    // BadVaddr records the branch's own PC
    assert_eq!(cpu.cop0_reg(COP0::BADV as u8), ORIGIN);
}

#[test]
fn test_cache_isolation_swallows_stores() {
    // sw r9, 0(r8) with SR.IsC set
    let (mut cpu, mut bus) = setup(&[0xAD090000]);
    bus.write32(0x2000, 0x12345678).unwrap();
    cpu.set_reg(8, 0x2000);
    cpu.set_reg(9, 0xAAAAAAAA);
    let sr = cpu.cop0_reg(COP0::SR as u8);
    cpu.set_cop0_reg(COP0::SR as u8, sr | (1 << 16));

    cpu.step(&mut bus).unwrap();

    assert_eq!(bus.read32(0x2000).unwrap(), 0x12345678, "store dropped");
}

#[test]
fn test_interrupt_dispatch() {
    let (mut cpu, mut bus) = setup(&[0x34090042, 0x00000000]);

    let ic = Rc::new(RefCell::new(InterruptController::new()));
    ic.borrow_mut().write_mask(interrupts::VBLANK as u32);
    ic.borrow_mut().request(interrupts::VBLANK);
    bus.set_interrupt_controller(ic);

    // IEc + IM2
    cpu.set_cop0_reg(COP0::SR as u8, 0x0000_0401);

    cpu.step(&mut bus).unwrap();

    // the instruction did not execute; it re-runs after the handler
    assert_eq!(cpu.reg(9), 0);
    assert_eq!(cpu.pc(), 0x80000080);
    assert_eq!(cpu.cop0_reg(COP0::EPC as u8), ORIGIN);

    let cause = cpu.cop0_reg(COP0::CAUSE as u8);
    assert_eq!((cause >> 2) & 0x1F, 0, "ExcCode = Interrupt");
    assert_ne!(cause & (1 << 10), 0, "IP2 mirrored");
}

#[test]
fn test_interrupt_masked_by_sr() {
    let (mut cpu, mut bus) = setup(&[0x34090042]);

    let ic = Rc::new(RefCell::new(InterruptController::new()));
    ic.borrow_mut().write_mask(interrupts::VBLANK as u32);
    ic.borrow_mut().request(interrupts::VBLANK);
    bus.set_interrupt_controller(ic);

    // interrupts globally disabled
    cpu.set_cop0_reg(COP0::SR as u8, 0x0000_0400);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.reg(9), 0x42, "instruction executed normally");
    assert_eq!(cpu.pc(), ORIGIN + 4);
}

#[test]
fn test_mfc0_goes_through_load_delay() {
    // mfc0 r9, EPC / ori r10, r9, 0
    let (mut cpu, mut bus) = setup(&[0x40097000, 0x352A0000, 0x00000000]);
    cpu.set_cop0_reg(COP0::EPC as u8, 0x1234);
    cpu.set_reg(9, 0x5555);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.reg(9), 0x5555, "not visible yet");

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.reg(9), 0x1234);
    assert_eq!(cpu.reg(10), 0x5555);
}

#[test]
fn test_store_load_round_trip_through_bus() {
    // sw r9, 0(r8) / lw r10, 0(r8) / nop
    let (mut cpu, mut bus) = setup(&[0xAD090000, 0x8D0A0000, 0x00000000]);
    cpu.set_reg(8, 0x3000);
    cpu.set_reg(9, 0xFEEDFACE);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.reg(10), 0xFEEDFACE);
}

#[test]
fn test_bcondz_variants() {
    // bltz r1, +4
    let (mut cpu, mut bus) = setup(&[0x04200004, 0x00000000]);
    cpu.set_reg(1, (-5i32) as u32);
    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc(), ORIGIN + 4 + (4 << 2));

    // bgezal r1, +4 with r1 >= 0 links r31
    let (mut cpu, mut bus) = setup(&[0x04310004, 0x00000000]);
    cpu.set_reg(1, 7);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.reg(31), ORIGIN + 8);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc(), ORIGIN + 4 + (4 << 2));
}

#[test]
fn test_reserved_instruction_exception() {
    // opcode 0x3F does not exist
    let (mut cpu, mut bus) = setup(&[0xFC000000]);
    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.pc(), 0x80000080);
    assert_eq!((cpu.cop0_reg(COP0::CAUSE as u8) >> 2) & 0x1F, 10);
}

#[test]
fn test_exception_in_delay_slot_reports_branch() {
    // beq r0, r0, +0x10 / syscall
    let (mut cpu, mut bus) = setup(&[0x10000010, 0x0000000C]);

    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();

    let cause = cpu.cop0_reg(COP0::CAUSE as u8);
    assert_eq!(cause >> 31, 1, "BD flag set");
    // EPC points at the branch, not the delay slot
    assert_eq!(cpu.cop0_reg(COP0::EPC as u8), ORIGIN);
    assert_eq!(cpu.pc(), 0x80000080);
}
