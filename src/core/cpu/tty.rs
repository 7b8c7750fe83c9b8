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

//! TTY output capture
//!
//! The BIOS putchar entry points (A0h function 0x3C, B0h function 0x3D)
//! are intercepted at fetch time; the bytes build up here until a flush
//! character arrives, at which point the host collaborator is notified.

/// Accumulated TTY output with flush detection
#[derive(Default)]
pub(super) struct TtyOutput {
    buffer: String,
    flush_ready: bool,
}

impl TtyOutput {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Feed one byte from the guest's putchar call
    ///
    /// Control characters follow the console TTY rules: TAB expands to
    /// the next multiple of 8 columns, backspace pops, BEL renders as
    /// `[BELL]`, and newline (or NUL) marks the buffer ready to flush.
    pub(super) fn push_byte(&mut self, byte: u8) {
        match byte {
            b'\t' => {
                let pad = 8 - (self.buffer.len() % 8);
                for _ in 0..pad {
                    self.buffer.push(' ');
                }
            }
            b'\0' | b'\n' => {
                self.flush_ready = true;
            }
            0x08 => {
                self.buffer.pop();
            }
            0x07 => {
                self.buffer.push_str("[BELL]");
            }
            _ => {
                self.buffer.push(byte as char);
            }
        }
    }

    /// Whether a flush character has been seen since the last take
    pub(super) fn flush_ready(&self) -> bool {
        self.flush_ready
    }

    /// Drain the buffer and clear the flush flag
    pub(super) fn take(&mut self) -> String {
        self.flush_ready = false;
        std::mem::take(&mut self.buffer)
    }

    pub(super) fn reset(&mut self) {
        self.buffer.clear();
        self.flush_ready = false;
    }

    pub(super) fn buffer(&self) -> &str {
        &self.buffer
    }

    pub(super) fn restore(&mut self, buffer: String, flush_ready: bool) {
        self.buffer = buffer;
        self.flush_ready = flush_ready;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_accumulates() {
        let mut tty = TtyOutput::new();
        for b in b"hello" {
            tty.push_byte(*b);
        }
        assert!(!tty.flush_ready());
        assert_eq!(tty.buffer(), "hello");
    }

    #[test]
    fn test_newline_marks_flush() {
        let mut tty = TtyOutput::new();
        tty.push_byte(b'h');
        tty.push_byte(b'i');
        tty.push_byte(b'\n');
        assert!(tty.flush_ready());
        assert_eq!(tty.take(), "hi");
        assert!(!tty.flush_ready());
    }

    #[test]
    fn test_tab_expands_to_multiple_of_8() {
        let mut tty = TtyOutput::new();
        tty.push_byte(b'a');
        tty.push_byte(b'b');
        tty.push_byte(b'\t');
        assert_eq!(tty.buffer().len(), 8);

        tty.push_byte(b'\t');
        assert_eq!(tty.buffer().len(), 16);
    }

    #[test]
    fn test_backspace_pops() {
        let mut tty = TtyOutput::new();
        tty.push_byte(b'a');
        tty.push_byte(b'b');
        tty.push_byte(0x08);
        assert_eq!(tty.buffer(), "a");

        // backspace on an empty buffer is a no-op
        tty.push_byte(0x08);
        tty.push_byte(0x08);
        assert_eq!(tty.buffer(), "");
    }

    #[test]
    fn test_bell_renders_as_text() {
        let mut tty = TtyOutput::new();
        tty.push_byte(0x07);
        assert_eq!(tty.buffer(), "[BELL]");
    }
}
