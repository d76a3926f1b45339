pub mod addrspace;
pub mod usercopy;

pub use addrspace::AddressSpace;

use alloc::vec::Vec;

use crate::errno::{Errno, Result};

/// Allocate a zero-filled kernel buffer, failing with `NoMemory` instead
/// of aborting when the heap cannot satisfy the request.
pub fn kmalloc(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Errno::NoMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}
