use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::errno::{Errno, Result};
use crate::fs::uio::Uio;
use crate::fs::vnode::Vnode;
use crate::mm;
use crate::proc::Process;

// ELF64 constants
const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const ET_EXEC: u16 = 2;
const EM_X86_64: u16 = 62;
const PT_LOAD: u32 = 1;

struct Elf64Ehdr {
    e_entry: u64,
    e_phoff: u64,
    e_phentsize: u16,
    e_phnum: u16,
}

impl Elf64Ehdr {
    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 64 {
            return Err(Errno::NoExec);
        }
        if data[0..4] != ELF_MAGIC {
            return Err(Errno::NoExec);
        }
        if data[4] != ELFCLASS64 || data[5] != ELFDATA2LSB {
            return Err(Errno::NoExec);
        }

        let e_type = u16::from_le_bytes([data[16], data[17]]);
        let e_machine = u16::from_le_bytes([data[18], data[19]]);
        if e_type != ET_EXEC || e_machine != EM_X86_64 {
            return Err(Errno::NoExec);
        }

        Ok(Elf64Ehdr {
            e_entry: u64::from_le_bytes(data[24..32].try_into().unwrap()),
            e_phoff: u64::from_le_bytes(data[32..40].try_into().unwrap()),
            e_phentsize: u16::from_le_bytes([data[54], data[55]]),
            e_phnum: u16::from_le_bytes([data[56], data[57]]),
        })
    }
}

struct Elf64Phdr {
    p_type: u32,
    p_offset: u64,
    p_vaddr: u64,
    p_filesz: u64,
    p_memsz: u64,
}

impl Elf64Phdr {
    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 56 {
            return Err(Errno::NoExec);
        }
        Ok(Elf64Phdr {
            p_type: u32::from_le_bytes(data[0..4].try_into().unwrap()),
            p_offset: u64::from_le_bytes(data[8..16].try_into().unwrap()),
            p_vaddr: u64::from_le_bytes(data[16..24].try_into().unwrap()),
            p_filesz: u64::from_le_bytes(data[32..40].try_into().unwrap()),
            p_memsz: u64::from_le_bytes(data[40..48].try_into().unwrap()),
        })
    }
}

/// Load an ELF64 executable into the process's current address space.
/// Returns the entry point. The caller installs the address space
/// before calling and owns rollback on failure.
pub fn load_elf(proc: &Process, vn: &Arc<dyn Vnode>) -> Result<u64> {
    let image = read_all(vn)?;
    let ehdr = Elf64Ehdr::parse(&image)?;

    // Find the span the loadable segments cover.
    let mut load_base: u64 = u64::MAX;
    let mut load_end: u64 = 0;
    for i in 0..ehdr.e_phnum as usize {
        let off = ehdr.e_phoff as usize + i * ehdr.e_phentsize as usize;
        if off + 56 > image.len() {
            return Err(Errno::NoExec);
        }
        let phdr = Elf64Phdr::parse(&image[off..])?;
        if phdr.p_type != PT_LOAD {
            continue;
        }
        load_base = load_base.min(phdr.p_vaddr);
        load_end = load_end.max(phdr.p_vaddr + phdr.p_memsz);
    }
    if load_base == u64::MAX {
        return Err(Errno::NoExec);
    }

    proc.with_addrspace(|aspace| {
        aspace.define_region(load_base, load_end - load_base)?;

        // Copy segment bytes; memory beyond p_filesz (BSS) stays zero.
        for i in 0..ehdr.e_phnum as usize {
            let off = ehdr.e_phoff as usize + i * ehdr.e_phentsize as usize;
            let phdr = Elf64Phdr::parse(&image[off..])?;
            if phdr.p_type != PT_LOAD {
                continue;
            }
            let file_off = phdr.p_offset as usize;
            let file_size = phdr.p_filesz as usize;
            if file_off + file_size > image.len() {
                return Err(Errno::NoExec);
            }
            aspace.write_bytes(phdr.p_vaddr, &image[file_off..file_off + file_size])?;
        }
        Ok(())
    })?;

    log::debug!(
        "elf: loaded {:#x}..{:#x}, entry {:#x}",
        load_base,
        load_end,
        ehdr.e_entry
    );
    Ok(ehdr.e_entry)
}

fn read_all(vn: &Arc<dyn Vnode>) -> Result<Vec<u8>> {
    let size = vn.stat()?.size as usize;
    if size == 0 {
        return Err(Errno::NoExec);
    }
    let mut buf = mm::kmalloc(size)?;
    let mut uio = Uio::read(&mut buf, 0);
    vn.read(&mut uio)?;
    let n = uio.transferred();
    buf.truncate(n);
    Ok(buf)
}
