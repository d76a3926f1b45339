//! User address spaces.
//!
//! An address space is the set of memory regions a process may touch
//! from user mode. Regions are owned byte images; translation walks the
//! region list, and anything outside a region is a fault, the same
//! contract the MMU enforces on hardware. Installing the mapping into
//! the MMU on a context switch is the architecture layer's job.

use alloc::vec::Vec;

use crate::abi::{USER_STACK_SIZE, USER_STACK_TOP};
use crate::errno::{Errno, Result};

const PAGE_SIZE: u64 = 4096;

struct Region {
    base: u64,
    data: Vec<u8>,
}

impl Region {
    fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    fn contains(&self, vaddr: u64, len: usize) -> bool {
        vaddr >= self.base && vaddr + len as u64 <= self.end()
    }
}

pub struct AddressSpace {
    regions: Vec<Region>,
}

impl AddressSpace {
    pub fn new() -> Self {
        AddressSpace {
            regions: Vec::new(),
        }
    }

    /// Map `[vaddr, vaddr + len)`, extended outward to page boundaries.
    /// Overlapping an existing region is a caller bug surfaced as
    /// `Invalid`; allocation failure is `NoMemory`.
    pub fn define_region(&mut self, vaddr: u64, len: u64) -> Result<()> {
        if len == 0 {
            return Err(Errno::Invalid);
        }
        let base = vaddr & !(PAGE_SIZE - 1);
        let end = (vaddr + len + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
        for r in &self.regions {
            if base < r.end() && r.base < end {
                return Err(Errno::Invalid);
            }
        }

        let size = (end - base) as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(size).map_err(|_| Errno::NoMemory)?;
        data.resize(size, 0);

        self.regions.try_reserve(1).map_err(|_| Errno::NoMemory)?;
        self.regions.push(Region { base, data });
        Ok(())
    }

    /// Map the user stack and return its top, the initial stack pointer.
    pub fn define_stack(&mut self) -> Result<u64> {
        self.define_region(USER_STACK_TOP - USER_STACK_SIZE, USER_STACK_SIZE)?;
        Ok(USER_STACK_TOP)
    }

    /// Deep-copy every region, as `fork` requires.
    pub fn try_clone(&self) -> Result<AddressSpace> {
        let mut regions = Vec::new();
        regions
            .try_reserve_exact(self.regions.len())
            .map_err(|_| Errno::NoMemory)?;
        for r in &self.regions {
            let mut data = Vec::new();
            data.try_reserve_exact(r.data.len())
                .map_err(|_| Errno::NoMemory)?;
            data.extend_from_slice(&r.data);
            regions.push(Region {
                base: r.base,
                data,
            });
        }
        Ok(AddressSpace { regions })
    }

    /// Make this address space the one user-mode translation uses.
    /// The MMU switch itself happens in the architecture layer.
    pub fn activate(&self) {}

    fn region_for(&self, vaddr: u64, len: usize) -> Option<usize> {
        self.regions
            .iter()
            .position(|r| r.contains(vaddr, len))
    }

    /// Copy mapped memory at `vaddr` into `dst`. Unmapped → `Fault`.
    pub fn read_bytes(&self, vaddr: u64, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        let idx = self.region_for(vaddr, dst.len()).ok_or(Errno::Fault)?;
        let r = &self.regions[idx];
        let off = (vaddr - r.base) as usize;
        dst.copy_from_slice(&r.data[off..off + dst.len()]);
        Ok(())
    }

    /// Copy `src` into mapped memory at `vaddr`. Unmapped → `Fault`.
    pub fn write_bytes(&mut self, vaddr: u64, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        let idx = self.region_for(vaddr, src.len()).ok_or(Errno::Fault)?;
        let r = &mut self.regions[idx];
        let off = (vaddr - r.base) as usize;
        r.data[off..off + src.len()].copy_from_slice(src);
        Ok(())
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_round_trip() {
        let mut space = AddressSpace::new();
        space.define_region(0x400000, 8192).unwrap();
        space.write_bytes(0x400100, b"nucleos").unwrap();
        let mut buf = [0u8; 7];
        space.read_bytes(0x400100, &mut buf).unwrap();
        assert_eq!(&buf, b"nucleos");
    }

    #[test]
    fn unmapped_access_faults() {
        let space = AddressSpace::new();
        let mut buf = [0u8; 4];
        assert_eq!(space.read_bytes(0x1000, &mut buf), Err(Errno::Fault));
    }

    #[test]
    fn access_straddling_region_end_faults() {
        let mut space = AddressSpace::new();
        space.define_region(0x1000, 4096).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(space.read_bytes(0x1ffc, &mut buf), Err(Errno::Fault));
    }

    #[test]
    fn overlapping_region_rejected() {
        let mut space = AddressSpace::new();
        space.define_region(0x1000, 4096).unwrap();
        assert_eq!(space.define_region(0x1800, 16), Err(Errno::Invalid));
    }

    #[test]
    fn clone_is_deep() {
        let mut space = AddressSpace::new();
        space.define_region(0x1000, 4096).unwrap();
        space.write_bytes(0x1000, b"parent").unwrap();

        let mut copy = space.try_clone().unwrap();
        copy.write_bytes(0x1000, b"child!").unwrap();

        let mut buf = [0u8; 6];
        space.read_bytes(0x1000, &mut buf).unwrap();
        assert_eq!(&buf, b"parent");
    }

    #[test]
    fn stack_sits_below_its_top() {
        let mut space = AddressSpace::new();
        let top = space.define_stack().unwrap();
        assert_eq!(top, USER_STACK_TOP);
        space.write_bytes(top - 16, &[0xAA; 16]).unwrap();
        let mut one = [0u8];
        assert_eq!(space.read_bytes(top, &mut one), Err(Errno::Fault));
    }
}
