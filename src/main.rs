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

//! Headless emulator runner
//!
//! Boots a BIOS image and runs frames forever (or for a fixed count),
//! printing guest TTY output to stdout. A PSX-EXE can be sideloaded
//! and a raw disc image mounted.

use clap::Parser;
use rogem::core::cdrom::BinDisc;
use rogem::core::system::System;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rogem", about = "PlayStation emulator core, headless runner")]
struct Args {
    /// Path to a 512 KiB BIOS ROM image
    bios: PathBuf,

    /// Optional PSX-EXE to sideload once the BIOS shell is up
    exe: Option<PathBuf>,

    /// Optional raw .bin disc image to mount
    #[arg(long)]
    disc: Option<PathBuf>,

    /// Stop after this many frames (runs forever when omitted)
    #[arg(long)]
    frames: Option<u64>,

    /// Write a save state to this path when the frame budget runs out
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Restore a save state before running
    #[arg(long)]
    load_state: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    if let Err(err) = run(&args) {
        log::error!("{}", err);
        eprintln!("rogem: {}", err);
        std::process::exit(-1);
    }
}

fn run(args: &Args) -> rogem::Result<()> {
    let mut system = System::new();

    system.load_bios(&args.bios.to_string_lossy())?;

    if let Some(exe) = &args.exe {
        system.load_executable(&exe.to_string_lossy())?;
    }

    if let Some(disc) = &args.disc {
        system.load_disc(Box::new(BinDisc::open(disc)?));
    }

    if let Some(path) = &args.load_state {
        system.load_state(&path.to_string_lossy())?;
    }

    system.set_tty_callback(Box::new(|text| {
        print!("{}", text);
        println!();
        let _ = std::io::stdout().flush();
    }));

    log::info!("booting");

    match args.frames {
        Some(frames) => {
            for _ in 0..frames {
                system.run_frame()?;
            }
            log::info!("ran {} frames, {} cycles", frames, system.cycles());
        }
        None => loop {
            system.run_frame()?;
        },
    }

    if let Some(path) = &args.save_state {
        system.save_state(&path.to_string_lossy())?;
    }

    Ok(())
}
