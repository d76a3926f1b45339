//! Bounded copies between user and kernel memory.
//!
//! Every transfer resolves user virtual addresses through the owning
//! process's address space; a null pointer or an unmapped range is
//! `Fault` before any bytes move. String copy-in is bounded and reports
//! `NameTooLong` when no terminator appears within the bound.

use alloc::string::String;
use alloc::vec::Vec;

use crate::errno::{Errno, Result};
use crate::proc::Process;

pub fn copyin(proc: &Process, uaddr: u64, dst: &mut [u8]) -> Result<()> {
    if uaddr == 0 {
        return Err(Errno::Fault);
    }
    proc.with_addrspace(|aspace| aspace.read_bytes(uaddr, dst))
}

pub fn copyout(proc: &Process, src: &[u8], uaddr: u64) -> Result<()> {
    if uaddr == 0 {
        return Err(Errno::Fault);
    }
    proc.with_addrspace(|aspace| aspace.write_bytes(uaddr, src))
}

/// Read one user pointer (a native word) from `uaddr`.
pub fn copyin_ptr(proc: &Process, uaddr: u64) -> Result<u64> {
    let mut word = [0u8; core::mem::size_of::<u64>()];
    copyin(proc, uaddr, &mut word)?;
    Ok(u64::from_ne_bytes(word))
}

/// Copy in a NUL-terminated string of at most `max` bytes (terminator
/// included). Returns the string without its terminator.
pub fn copyinstr(proc: &Process, uaddr: u64, max: usize) -> Result<String> {
    if uaddr == 0 {
        return Err(Errno::Fault);
    }
    let bytes = proc.with_addrspace(|aspace| {
        let mut bytes: Vec<u8> = Vec::new();
        for i in 0..max as u64 {
            let mut ch = [0u8];
            aspace.read_bytes(uaddr + i, &mut ch)?;
            if ch[0] == 0 {
                return Ok(bytes);
            }
            bytes.try_reserve(1).map_err(|_| Errno::NoMemory)?;
            bytes.push(ch[0]);
        }
        Err(Errno::NameTooLong)
    })?;
    String::from_utf8(bytes).map_err(|_| Errno::Invalid)
}

/// Copy `s` plus its NUL terminator out to `uaddr`.
pub fn copyoutstr(proc: &Process, s: &str, uaddr: u64) -> Result<()> {
    copyout(proc, s.as_bytes(), uaddr)?;
    copyout(proc, &[0u8], uaddr + s.len() as u64)
}
