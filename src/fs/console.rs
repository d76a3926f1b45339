//! The system console device.
//!
//! `con:` is a character device backed by two byte queues: the input
//! queue is fed by the terminal driver (or by tests), the output queue
//! collects everything written. `getch` drains input and reports
//! end-of-input with `None`; reads through the vnode stop there.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::errno::{Errno, Result};
use crate::fs::uio::Uio;
use crate::fs::vnode::{NodeKind, Stat, Vnode};

/// Device name understood by `vfs::open`.
pub const CONSOLE_DEVICE: &str = "con:";

pub struct Console {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
}

impl Console {
    fn new() -> Self {
        Console {
            input: Mutex::new(VecDeque::new()),
            output: Mutex::new(Vec::new()),
        }
    }

    /// Write one character to the console output.
    pub fn putch(&self, ch: u8) {
        self.output.lock().push(ch);
    }

    /// Read one character, or `None` at end-of-input.
    pub fn getch(&self) -> Option<u8> {
        self.input.lock().pop_front()
    }

    /// Queue bytes on the input side (terminal driver / tests).
    pub fn feed_input(&self, bytes: &[u8]) {
        let mut input = self.input.lock();
        input.extend(bytes.iter().copied());
    }

    /// Drain and return everything written so far.
    pub fn take_output(&self) -> Vec<u8> {
        core::mem::take(&mut *self.output.lock())
    }
}

lazy_static! {
    pub static ref CONSOLE: Console = Console::new();
}

/// Vnode handle for `con:`. Carries no state of its own; every handle
/// talks to the one console.
pub struct ConsoleVnode;

impl Vnode for ConsoleVnode {
    fn read(&self, uio: &mut Uio) -> Result<()> {
        while uio.resid() > 0 {
            match CONSOLE.getch() {
                Some(ch) => {
                    uio.fill(&[ch]);
                }
                None => break,
            }
        }
        Ok(())
    }

    fn write(&self, uio: &mut Uio) -> Result<()> {
        let src = uio.src_bytes();
        for &ch in src {
            CONSOLE.putch(ch);
        }
        let n = src.len();
        uio.advance(n);
        Ok(())
    }

    fn stat(&self) -> Result<Stat> {
        Ok(Stat {
            size: 0,
            kind: NodeKind::Device,
        })
    }

    fn seekable(&self) -> bool {
        false
    }

    fn truncate(&self) -> Result<()> {
        Err(Errno::Invalid)
    }

    fn path(&self) -> &str {
        CONSOLE_DEVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_stops_at_end_of_input() {
        let vn = ConsoleVnode;
        CONSOLE.feed_input(b"ab");
        let mut buf = [0u8; 8];
        let mut uio = Uio::read(&mut buf, 0);
        vn.read(&mut uio).unwrap();
        assert_eq!(uio.transferred(), 2);
        assert_eq!(&buf[..2], b"ab");
    }

    #[test]
    fn write_lands_in_output_queue() {
        let vn = ConsoleVnode;
        CONSOLE.take_output();
        let mut uio = Uio::write(b"hi\n", 0);
        vn.write(&mut uio).unwrap();
        assert_eq!(uio.transferred(), 3);
        assert_eq!(CONSOLE.take_output(), b"hi\n");
    }
}
