//! Launching a program in a fresh process.
//!
//! This is the kernel launcher's path (the boot shell starting the
//! first user program), not a syscall. It shares execv's machinery but
//! starts from a brand-new process, so there is no old image to roll
//! back to: failures unwind by destroying the half-built process.

use alloc::string::String;
use alloc::sync::Arc;

use crate::abi::O_RDONLY;
use crate::errno::Result;
use crate::fs::vfs;
use crate::loader;
use crate::mm::AddressSpace;
use crate::proc::{self, thread, Process};
use crate::syscalls::exec::{push_argv, UserEntry};

/// Create a process running `progname` with `argv = [progname]`.
/// Returns the process and its user entry state; the caller hands both
/// to the scheduler for the first dispatch.
pub fn runprogram(progname: &str, creator: &Arc<Process>) -> Result<(Arc<Process>, UserEntry)> {
    let new_proc = Process::create_runprogram(progname, creator)?;

    let result = load_into(&new_proc, progname);
    match result {
        Ok(entry) => {
            thread::attach_thread(&new_proc);
            log::info!("runprogram: '{}' as pid {}", progname, new_proc.pid());
            Ok((new_proc, entry))
        }
        Err(e) => {
            proc::destroy(new_proc);
            Err(e)
        }
    }
}

fn load_into(new_proc: &Arc<Process>, progname: &str) -> Result<UserEntry> {
    let vn = vfs::open(new_proc, progname, O_RDONLY)?;

    new_proc.set_addrspace(Some(AddressSpace::new()));
    new_proc.with_addrspace(|aspace| {
        aspace.activate();
        Ok(())
    })?;

    let entry = loader::load_elf(new_proc, &vn)?;
    drop(vn);

    let stack_top = new_proc.with_addrspace(|aspace| aspace.define_stack())?;
    let args = [String::from(progname)];
    let (stack_ptr, argv_ptr) = push_argv(new_proc, &args, stack_top)?;

    Ok(UserEntry {
        entry,
        stack_ptr,
        argc: 1,
        argv_ptr,
    })
}
