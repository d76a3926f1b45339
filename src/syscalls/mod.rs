//! Syscall dispatch.
//!
//! The trap entry saves user registers into a `Trapframe` and hands it
//! here with the calling process. Handlers return `Result<i64, Errno>`;
//! the scalar goes back in `rax`, errors as `-errno`. The saved program
//! counter points at the trapping instruction, so every normal return
//! advances it.

pub mod exec;
pub mod file;
pub mod process;
pub mod runprogram;

pub use exec::{sys_execv, UserEntry};
pub use runprogram::runprogram;
pub use file::{
    sys___getcwd, sys_chdir, sys_close, sys_dup2, sys_lseek, sys_open, sys_read, sys_write,
};
pub use process::{sys_exit, sys_fork, sys_getpid, sys_waitpid};

use alloc::sync::Arc;

use crate::errno::Errno;
use crate::proc::Process;
use crate::trapframe::Trapframe;

pub mod numbers {
    pub const SYS_GETPID: u64 = 1;
    pub const SYS_FORK: u64 = 2;
    pub const SYS_EXECV: u64 = 3;
    pub const SYS_WAITPID: u64 = 4;
    pub const SYS_EXIT: u64 = 5;
    pub const SYS_OPEN: u64 = 10;
    pub const SYS_CLOSE: u64 = 11;
    pub const SYS_READ: u64 = 12;
    pub const SYS_WRITE: u64 = 13;
    pub const SYS_LSEEK: u64 = 14;
    pub const SYS_DUP2: u64 = 15;
    pub const SYS_CHDIR: u64 = 16;
    pub const SYS___GETCWD: u64 = 17;
}

use numbers::*;

/// Route one trap to its handler and fold the result back into the
/// frame. `_exit` leaves the frame alone (the thread is finished);
/// `execv` rewrites it for the new image.
pub fn dispatch(proc: &Arc<Process>, tf: &mut Trapframe) {
    let result = match tf.syscall_number() {
        SYS_GETPID => sys_getpid(proc),
        SYS_FORK => {
            let snapshot = *tf;
            sys_fork(proc, &snapshot)
        }
        SYS_EXECV => match sys_execv(proc, tf.arg0(), tf.arg1()) {
            Ok(entry) => {
                enter_new_process(tf, entry);
                return;
            }
            Err(e) => Err(e),
        },
        SYS_WAITPID => sys_waitpid(proc, tf.arg0() as i32, tf.arg1(), tf.arg2() as i32),
        SYS_EXIT => {
            sys_exit(proc, tf.arg0() as i32);
            return;
        }
        SYS_OPEN => sys_open(proc, tf.arg0(), tf.arg1() as u32, tf.arg2() as u32),
        SYS_CLOSE => sys_close(proc, tf.arg0() as i32),
        SYS_READ => sys_read(proc, tf.arg0() as i32, tf.arg1(), tf.arg2() as usize),
        SYS_WRITE => sys_write(proc, tf.arg0() as i32, tf.arg1(), tf.arg2() as usize),
        SYS_LSEEK => sys_lseek(proc, tf.arg0() as i32, tf.arg1() as i64, tf.arg2() as i32),
        SYS_DUP2 => sys_dup2(proc, tf.arg0() as i32, tf.arg1() as i32),
        SYS_CHDIR => sys_chdir(proc, tf.arg0()),
        SYS___GETCWD => sys___getcwd(proc, tf.arg0(), tf.arg1() as usize),
        unknown => {
            log::warn!("pid {}: unknown syscall {}", proc.pid(), unknown);
            Err(Errno::Invalid)
        }
    };

    tf.set_syscall_result(result);
    tf.advance_past_syscall();
}

/// Install a fresh image's entry state: argc and the argv user pointer
/// in the first two argument registers, a null environment pointer in
/// the third, the stack pointer 8-byte aligned, and control at the ELF
/// entry point.
fn enter_new_process(tf: &mut Trapframe, entry: UserEntry) {
    *tf = Trapframe::default();
    tf.rdi = entry.argc as u64;
    tf.rsi = entry.argv_ptr;
    tf.rdx = 0;
    tf.rsp = entry.stack_ptr;
    tf.rip = entry.entry;
}
