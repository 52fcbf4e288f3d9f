// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Terminal control for the passive remote wait loop.

use std::io::Write;

use nix::sys::termios::{self, LocalFlags, SetArg, Termios};

/// Keys the remote wait loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// `q` or ESC: ask the server for a graceful exit from remote mode.
    ExitRequest,
    /// Ctrl-C: force-quit without waiting for the server.
    ForceQuit,
    Other,
}

/// Decode one raw-mode input byte.
pub fn decode_key(byte: u8) -> Key {
    match byte {
        b'q' | b'Q' | 0x1b => Key::ExitRequest,
        0x03 => Key::ForceQuit,
        _ => Key::Other,
    }
}

/// Raw-mode guard for stdin; restores the original settings on drop.
pub struct RawModeGuard {
    original: Termios,
}

impl RawModeGuard {
    /// Put stdin into raw mode (no echo, byte-at-a-time reads).
    pub fn enter() -> std::io::Result<Self> {
        let stdin = std::io::stdin();
        let original = termios::tcgetattr(&stdin).map_err(std::io::Error::from)?;
        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        // Keep output post-processing so status lines still render normally.
        raw.output_flags.insert(termios::OutputFlags::OPOST);
        raw.local_flags.remove(LocalFlags::ECHO | LocalFlags::ICANON);
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw).map_err(std::io::Error::from)?;
        Ok(Self { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let stdin = std::io::stdin();
        let _ = termios::tcsetattr(&stdin, SetArg::TCSANOW, &self.original);
    }
}

/// Clear the terminal and home the cursor.
pub fn clear_screen() {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(b"\x1b[2J\x1b[H");
    let _ = stdout.flush();
}

#[cfg(test)]
#[path = "term_tests.rs"]
mod tests;
