//! NucleOS process & file-descriptor subsystem.
//!
//! The POSIX-flavored core of a teaching kernel: a global process
//! table, processes with descriptor tables of shared open files, and
//! the syscalls that operate on them (getpid, fork, execv, waitpid,
//! _exit, open, close, read, write, lseek, dup2, chdir, __getcwd).
//!
//! Boot code, interrupt plumbing, and the scheduler live outside this
//! crate; the seams they plug into are `syscalls::dispatch`, the
//! `proc::thread` handshake, and `AddressSpace::activate`.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod abi;
pub mod errno;
pub mod fs;
pub mod loader;
pub mod mm;
pub mod proc;
pub mod sync;
pub mod syscalls;
pub mod trapframe;

use spin::Once;

/// One-time subsystem bootstrap: mount the filesystems, then install
/// the kernel process (whose working directory is the fresh root).
pub fn bootstrap() {
    static BOOT: Once<()> = Once::new();
    BOOT.call_once(|| {
        fs::init();
        proc::bootstrap();
    });
}
