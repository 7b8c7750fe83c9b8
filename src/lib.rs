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

//! rogem: A PlayStation (PSX) emulator core
//!
//! This crate provides a headless PSX emulator core: the MIPS R3000A
//! interpreter, the memory bus, and the peripherals that are tightly
//! coupled to CPU timing (DMA, GPU, CD-ROM, interrupt controller,
//! timers, serial I/O).
//!
//! # Architecture
//!
//! The emulator is organized into the following modules:
//!
//! - [`core`]: Core emulation components (CPU, Bus, GPU, DMA, CD-ROM, ...)
//!
//! # Example
//!
//! ```no_run
//! use rogem::core::system::System;
//!
//! let mut system = System::new();
//! system.load_bios("path/to/bios.bin")?;
//! system.run_frame()?;
//! # Ok::<(), rogem::core::error::EmulatorError>(())
//! ```
//!
//! # Getting Started
//!
//! 1. Create a [`core::system::System`] instance
//! 2. Load a BIOS file (exactly 512 KiB)
//! 3. Optionally arm a PSX-EXE sideload
//! 4. Drive the emulation loop one frame at a time
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an alias for
//! `Result<T, EmulatorError>`. Guest CPU exceptions are not host errors;
//! they only mutate architectural state (COP0 and PC).

pub mod core;

// Re-export commonly used types
pub use crate::core::error::{EmulatorError, Result};
