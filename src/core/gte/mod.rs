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

//! GTE (Geometry Transformation Engine) implementation
//!
//! The GTE is Coprocessor 2: fixed-point matrix and vector math used
//! for 3D transformation and projection. Matrices are 3x3 grids of
//! s16 values in 4.12 fixed point, stored across pairs of control
//! registers; the FLAG register accumulates saturation bits.

use crate::core::error::Result;
use crate::core::state::StateBuffer;

/// IR saturation range
const IR_LIMIT_HIGH: i64 = 0x7FFF;
const IR_LIMIT_LOW: i64 = -0x8000;

/// GTE (Geometry Transformation Engine) - COP2
///
/// # Example
///
/// ```
/// use rogem::core::gte::GTE;
///
/// let mut gte = GTE::new();
/// gte.write_control(0, 0x1000); // R11 = 1.0 in 4.12 fixed point
/// assert_eq!(gte.read_control(0), 0x1000);
/// ```
pub struct GTE {
    /// Data registers (32 x 32-bit)
    ///
    /// Input vectors (VXY0-2/VZ0-2), screen coordinate FIFO (SXY0-2),
    /// depth FIFO (SZ0-3), accumulators (MAC0-3, IR0-3), color FIFO
    /// (RGB0-2 in regs 20-22).
    data: [i32; 32],

    /// Control registers (32 x 32-bit)
    ///
    /// Rotation/light/color matrices, translation vectors, screen
    /// offset (OFX, OFY), projection distance (H), Z scale factors.
    control: [i32; 32],

    /// FLAG register (control reg 31)
    ///
    /// Accumulates overflow/underflow/saturation bits until explicitly
    /// rewritten.
    flags: u32,
}

impl GTE {
    // Data register indices
    const VXY0: usize = 0;
    const VZ0: usize = 1;
    const OTZ: usize = 7;
    const IR1: usize = 9;
    const IR2: usize = 10;
    const IR3: usize = 11;
    const SXY0: usize = 12;
    const SXY1: usize = 13;
    const SXY2: usize = 14;
    const SZ1: usize = 17;
    const SZ2: usize = 18;
    const SZ3: usize = 19;
    const MAC0: usize = 24;
    const MAC1: usize = 25;
    const MAC2: usize = 26;
    const MAC3: usize = 27;

    // Control register indices
    const TRX: usize = 5;
    const TRY: usize = 6;
    const TRZ: usize = 7;
    const OFX: usize = 24;
    const OFY: usize = 25;
    const H: usize = 26;
    const ZSF3: usize = 29;
    const ZSF4: usize = 30;
    const FLAG: usize = 31;

    /// Create a new GTE with cleared registers
    pub fn new() -> Self {
        Self {
            data: [0; 32],
            control: [0; 32],
            flags: 0,
        }
    }

    /// Clear all registers
    pub fn reset(&mut self) {
        self.data = [0; 32];
        self.control = [0; 32];
        self.flags = 0;
    }

    /// Read a data register (MFC2)
    ///
    /// Out-of-range indices read as 0.
    pub fn read_data(&self, index: usize) -> i32 {
        if index < 32 {
            self.data[index]
        } else {
            log::warn!("GTE: data register index {} out of range", index);
            0
        }
    }

    /// Write a data register (MTC2)
    pub fn write_data(&mut self, index: usize, value: i32) {
        if index < 32 {
            self.data[index] = value;
        } else {
            log::warn!("GTE: data register index {} out of range", index);
        }
    }

    /// Read a control register (CFC2)
    pub fn read_control(&self, index: usize) -> i32 {
        match index {
            Self::FLAG => self.flags as i32,
            _ if index < 32 => self.control[index],
            _ => {
                log::warn!("GTE: control register index {} out of range", index);
                0
            }
        }
    }

    /// Write a control register (CTC2)
    pub fn write_control(&mut self, index: usize, value: i32) {
        match index {
            Self::FLAG => self.flags = value as u32,
            _ if index < 32 => self.control[index] = value,
            _ => log::warn!("GTE: control register index {} out of range", index),
        }
    }

    /// Rotation matrix from control regs 0-4 (s16 pairs, 4.12 fixed)
    fn rotation_matrix(&self) -> [[i32; 3]; 3] {
        let c = &self.control;
        [
            [
                (c[0] >> 16) as i16 as i32,
                (c[0] & 0xFFFF) as i16 as i32,
                (c[1] >> 16) as i16 as i32,
            ],
            [
                (c[1] & 0xFFFF) as i16 as i32,
                (c[2] >> 16) as i16 as i32,
                (c[2] & 0xFFFF) as i16 as i32,
            ],
            [
                (c[3] >> 16) as i16 as i32,
                (c[3] & 0xFFFF) as i16 as i32,
                (c[4] >> 16) as i16 as i32,
            ],
        ]
    }

    /// Clamp a MAC value into IR range, accumulating the flag bit
    fn clamp_ir(&mut self, value: i64, flag_bit: u32) -> i32 {
        if value > IR_LIMIT_HIGH {
            self.flags |= flag_bit;
            IR_LIMIT_HIGH as i32
        } else if value < IR_LIMIT_LOW {
            self.flags |= flag_bit;
            IR_LIMIT_LOW as i32
        } else {
            value as i32
        }
    }

    /// One perspective transformation of (vx, vy, vz)
    ///
    /// Rotates, translates, clamps into IR1-3, projects onto the
    /// screen plane and returns (sxy, sz).
    fn transform_vertex(&mut self, vx: i32, vy: i32, vz: i32) -> (i32, i32) {
        let rt = self.rotation_matrix();
        let (trx, try_, trz) = (
            self.control[Self::TRX],
            self.control[Self::TRY],
            self.control[Self::TRZ],
        );

        // Matrix multiply in 4.12 fixed point, then translate
        let mac1 = (((rt[0][0] as i64) * vx as i64
            + (rt[0][1] as i64) * vy as i64
            + (rt[0][2] as i64) * vz as i64)
            >> 12)
            + trx as i64;
        let mac2 = (((rt[1][0] as i64) * vx as i64
            + (rt[1][1] as i64) * vy as i64
            + (rt[1][2] as i64) * vz as i64)
            >> 12)
            + try_ as i64;
        let mac3 = (((rt[2][0] as i64) * vx as i64
            + (rt[2][1] as i64) * vy as i64
            + (rt[2][2] as i64) * vz as i64)
            >> 12)
            + trz as i64;

        self.data[Self::MAC1] = mac1 as i32;
        self.data[Self::MAC2] = mac2 as i32;
        self.data[Self::MAC3] = mac3 as i32;

        self.data[Self::IR1] = self.clamp_ir(mac1, 1 << 24);
        self.data[Self::IR2] = self.clamp_ir(mac2, 1 << 23);
        self.data[Self::IR3] = self.clamp_ir(mac3, 1 << 22);

        let ofx = self.control[Self::OFX];
        let ofy = self.control[Self::OFY];
        let h = self.control[Self::H];

        // Perspective divide using IR3 as depth; guard non-positive Z
        let z = self.data[Self::IR3];
        let zc = if z > 0 { z } else { 1 };
        let sx = (self.data[Self::IR1].wrapping_mul(h) / zc + ofx) & 0xFFFF;
        let sy = (self.data[Self::IR2].wrapping_mul(h) / zc + ofy) & 0xFFFF;

        ((sy << 16) | (sx & 0xFFFF), z)
    }

    /// RTPS: Rotate, Translate and Perspective transform a Single vector
    ///
    /// Consumes V0, produces SXY2/SZ3/OTZ.
    pub fn rtps(&mut self) {
        let vx = (self.data[Self::VXY0] & 0xFFFF) as i16 as i32;
        let vy = (self.data[Self::VXY0] >> 16) as i16 as i32;
        let vz = (self.data[Self::VZ0] & 0xFFFF) as i16 as i32;

        let (sxy, sz) = self.transform_vertex(vx, vy, vz);
        self.data[Self::SXY2] = sxy;
        self.data[Self::SZ3] = sz;
        self.data[Self::OTZ] = sz & 0xFFFF;
    }

    /// RTPT: Rotate, Translate and Perspective transform a Triple
    ///
    /// Processes V0, V1 and V2 into the SXY/SZ FIFOs; OTZ tracks the
    /// last vertex.
    pub fn rtpt(&mut self) {
        const VECTOR_REGS: [(usize, usize); 3] = [(0, 1), (2, 3), (4, 5)];
        const SXY_REGS: [usize; 3] = [GTE::SXY0, GTE::SXY1, GTE::SXY2];
        const SZ_REGS: [usize; 3] = [GTE::SZ1, GTE::SZ2, GTE::SZ3];

        let mut last_z = 0;
        for i in 0..3 {
            let (xy_reg, z_reg) = VECTOR_REGS[i];
            let vx = (self.data[xy_reg] & 0xFFFF) as i16 as i32;
            let vy = (self.data[xy_reg] >> 16) as i16 as i32;
            let vz = (self.data[z_reg] & 0xFFFF) as i16 as i32;

            let (sxy, sz) = self.transform_vertex(vx, vy, vz);
            self.data[SXY_REGS[i]] = sxy;
            self.data[SZ_REGS[i]] = sz;
            last_z = sz;
        }

        self.data[Self::SZ3] = last_z;
        self.data[Self::OTZ] = last_z & 0xFFFF;
    }

    /// NCLIP: Normal Clipping
    ///
    /// Signed area of the SXY0/SXY1/SXY2 screen triangle into MAC0.
    /// The sign tells front faces from back faces.
    pub fn nclip(&mut self) {
        let (sx0, sy0) = Self::unpack_sxy(self.data[Self::SXY0]);
        let (sx1, sy1) = Self::unpack_sxy(self.data[Self::SXY1]);
        let (sx2, sy2) = Self::unpack_sxy(self.data[Self::SXY2]);

        let mac0 = (sx0 as i64) * (sy1 as i64) + (sx1 as i64) * (sy2 as i64)
            + (sx2 as i64) * (sy0 as i64)
            - (sx0 as i64) * (sy2 as i64)
            - (sx1 as i64) * (sy0 as i64)
            - (sx2 as i64) * (sy1 as i64);

        if mac0 > i32::MAX as i64 {
            self.flags |= 1 << 16;
        } else if mac0 < i32::MIN as i64 {
            self.flags |= 1 << 15;
        }
        self.data[Self::MAC0] = mac0 as i32;
    }

    /// SQR: Square of IR vector
    ///
    /// MAC1-3 = IR1-3 squared (shifted by 12 when the sf bit is set),
    /// then saturated back into IR1-3.
    pub fn sqr(&mut self, shift_fraction: bool) {
        let shift = if shift_fraction { 12 } else { 0 };
        for (i, (mac, ir)) in [
            (Self::MAC1, Self::IR1),
            (Self::MAC2, Self::IR2),
            (Self::MAC3, Self::IR3),
        ]
        .iter()
        .enumerate()
        {
            let v = self.data[*ir] as i64;
            let squared = (v * v) >> shift;
            self.data[*mac] = squared as i32;
            self.data[*ir] = self.clamp_ir(squared, 1 << (24 - i as u32));
        }
    }

    /// AVSZ3: Average of three screen depths
    ///
    /// MAC0 = ZSF3 * (SZ1 + SZ2 + SZ3); OTZ = MAC0 >> 12, saturated to
    /// 0..0xFFFF.
    pub fn avsz3(&mut self) {
        let zsf3 = self.control[Self::ZSF3] as i16 as i64;
        let sum = (self.data[Self::SZ1] as i64)
            + (self.data[Self::SZ2] as i64)
            + (self.data[Self::SZ3] as i64);
        let mac0 = zsf3 * sum;
        self.data[Self::MAC0] = mac0 as i32;
        self.data[Self::OTZ] = self.saturate_otz(mac0 >> 12);
    }

    /// AVSZ4: Average of four screen depths
    pub fn avsz4(&mut self) {
        let zsf4 = self.control[Self::ZSF4] as i16 as i64;
        let sum = (self.data[16] as i64)
            + (self.data[Self::SZ1] as i64)
            + (self.data[Self::SZ2] as i64)
            + (self.data[Self::SZ3] as i64);
        let mac0 = zsf4 * sum;
        self.data[Self::MAC0] = mac0 as i32;
        self.data[Self::OTZ] = self.saturate_otz(mac0 >> 12);
    }

    fn saturate_otz(&mut self, value: i64) -> i32 {
        if value < 0 {
            self.flags |= 1 << 18;
            0
        } else if value > 0xFFFF {
            self.flags |= 1 << 18;
            0xFFFF
        } else {
            value as i32
        }
    }

    fn unpack_sxy(packed: i32) -> (i16, i16) {
        ((packed & 0xFFFF) as i16, (packed >> 16) as i16)
    }

    /// Execute a GTE command word (COP2 with bit 25 set)
    ///
    /// The low 6 bits select the function; unimplemented functions are
    /// logged and skipped.
    pub fn execute(&mut self, command: u32) {
        let funct = command & 0x3F;
        let sf = (command >> 19) & 1 != 0;

        match funct {
            0x01 => self.rtps(),
            0x06 => self.nclip(),
            0x28 => self.sqr(sf),
            0x2D => self.avsz3(),
            0x2E => self.avsz4(),
            0x30 => self.rtpt(),
            _ => {
                log::warn!("GTE: unimplemented function 0x{:02X}", funct);
            }
        }
    }

    /// Serialize the GTE block
    pub fn serialize(&self, buf: &mut StateBuffer) {
        for reg in &self.data {
            buf.write_i32(*reg);
        }
        for reg in &self.control {
            buf.write_i32(*reg);
        }
        buf.write_u32(self.flags);
    }

    /// Restore the GTE block
    pub fn deserialize(&mut self, buf: &mut StateBuffer) -> Result<()> {
        for reg in &mut self.data {
            *reg = buf.read_i32()?;
        }
        for reg in &mut self.control {
            *reg = buf.read_i32()?;
        }
        self.flags = buf.read_u32()?;
        Ok(())
    }
}

impl Default for GTE {
    fn default() -> Self {
        Self::new()
    }
}
