//! execv: replace the process image.
//!
//! The ordering here is the critical part. The new address space is
//! installed before the ELF load so the loader operates on the intended
//! space; every failure up to and including the argv push restores the
//! old space; the old space is destroyed only once nothing can fail.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::abi::{ARG_MAX, O_RDONLY, PATH_MAX};
use crate::errno::{Errno, Result};
use crate::fs::vfs;
use crate::loader;
use crate::mm::usercopy::{copyin_ptr, copyinstr, copyout, copyoutstr};
use crate::mm::AddressSpace;
use crate::proc::Process;

const PTR_SIZE: usize = core::mem::size_of::<u64>();

/// User-mode entry state for a freshly exec'd image. The dispatch layer
/// installs it in the trapframe; control never returns to the old image.
#[derive(Debug, Clone, Copy)]
pub struct UserEntry {
    pub entry: u64,
    pub stack_ptr: u64,
    pub argc: i64,
    pub argv_ptr: u64,
}

pub fn sys_execv(proc: &Arc<Process>, prog_ptr: u64, argv_ptr: u64) -> Result<UserEntry> {
    if prog_ptr == 0 || argv_ptr == 0 {
        return Err(Errno::Fault);
    }

    let progname = copyinstr(proc, prog_ptr, PATH_MAX)?;
    if progname.is_empty() {
        return Err(Errno::Invalid);
    }

    // Count the argument vector: user pointers up to the first null.
    let mut argc = 0usize;
    loop {
        let uptr = copyin_ptr(proc, argv_ptr + (argc * PTR_SIZE) as u64)?;
        if uptr == 0 {
            break;
        }
        argc += 1;
        if argc > ARG_MAX / PTR_SIZE {
            return Err(Errno::TooBig);
        }
    }

    // Copy each string into kernel memory, tracking the projected
    // user-stack footprint: 4-byte-aligned strings plus the pointer
    // array itself. Reject oversized vectors before any copy-out.
    let mut kargs: Vec<String> = Vec::new();
    kargs.try_reserve(argc).map_err(|_| Errno::NoMemory)?;
    let mut footprint = (argc + 1) * PTR_SIZE;
    for i in 0..argc {
        let uptr = copyin_ptr(proc, argv_ptr + (i * PTR_SIZE) as u64)?;
        let arg = copyinstr(proc, uptr, PATH_MAX)?;
        footprint += round_up_4(arg.len() + 1);
        if footprint > ARG_MAX {
            return Err(Errno::TooBig);
        }
        kargs.push(arg);
    }

    let vn = vfs::open(proc, &progname, O_RDONLY)?;

    // Install the fresh address space, keeping the old one for rollback.
    let old_as = proc.set_addrspace(Some(AddressSpace::new()));
    proc.with_addrspace(|aspace| {
        aspace.activate();
        Ok(())
    })?;

    let entry = match loader::load_elf(proc, &vn) {
        Ok(entry) => entry,
        Err(e) => {
            drop(vn);
            restore_old_address_space(proc, old_as);
            return Err(e);
        }
    };
    drop(vn);

    let stack_top = match proc.with_addrspace(|aspace| aspace.define_stack()) {
        Ok(top) => top,
        Err(e) => {
            restore_old_address_space(proc, old_as);
            return Err(e);
        }
    };

    let (stack_ptr, user_argv) = match push_argv(proc, &kargs, stack_top) {
        Ok(placed) => placed,
        Err(e) => {
            restore_old_address_space(proc, old_as);
            return Err(e);
        }
    };

    // Point of no return: the old image is gone.
    drop(old_as);

    log::debug!(
        "execv: pid {} -> '{}', argc {}, entry {:#x}",
        proc.pid(),
        progname,
        argc,
        entry
    );
    Ok(UserEntry {
        entry,
        stack_ptr,
        argc: argc as i64,
        argv_ptr: user_argv,
    })
}

/// Undo the address-space swap after a failure: put the old space back,
/// reactivate it, and drop the half-built one.
fn restore_old_address_space(proc: &Arc<Process>, old_as: Option<AddressSpace>) {
    drop(proc.set_addrspace(old_as));
    let _ = proc.with_addrspace(|aspace| {
        aspace.activate();
        Ok(())
    });
}

/// Lay out argv on the new user stack (which grows down):
/// string bytes high-to-low, each aligned to 4; then the
/// null-terminated pointer array as one block, aligned to 8.
/// Returns (stack pointer, user address of argv[0]).
pub(super) fn push_argv(proc: &Arc<Process>, args: &[String], stack_top: u64) -> Result<(u64, u64)> {
    let mut sp = stack_top;

    let mut user_ptrs: Vec<u64> = Vec::new();
    user_ptrs
        .try_reserve(args.len() + 1)
        .map_err(|_| Errno::NoMemory)?;
    user_ptrs.resize(args.len() + 1, 0);

    for i in (0..args.len()).rev() {
        let len = args[i].len() as u64 + 1;
        sp -= len;
        sp &= !3;
        copyoutstr(proc, &args[i], sp)?;
        user_ptrs[i] = sp;
    }
    user_ptrs[args.len()] = 0;

    sp -= ((args.len() + 1) * PTR_SIZE) as u64;
    sp &= !7;
    let argv_base = sp;
    for (i, uptr) in user_ptrs.iter().enumerate() {
        copyout(proc, &uptr.to_ne_bytes(), argv_base + (i * PTR_SIZE) as u64)?;
    }

    Ok((sp, argv_base))
}

fn round_up_4(n: usize) -> usize {
    (n + 3) & !3
}
