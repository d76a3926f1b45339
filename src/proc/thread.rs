//! The thread seam.
//!
//! Scheduling lives outside this subsystem; what the process layer
//! needs is thread accounting and the forked-child handshake. `fork`
//! attaches the child's thread and parks the copied trapframe; when
//! the scheduler first runs the child, `enter_forked_process` activates
//! the child's address space and hands back the frame rewritten to
//! look like a syscall that returned 0.

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::errno::{Errno, Result};
use crate::proc::process::Process;
use crate::trapframe::Trapframe;

/// Attach a thread to `proc`. Used for the child thread in `fork` and
/// for the initial thread of a process entering user mode.
pub fn attach_thread(proc: &Arc<Process>) {
    proc.add_thread();
}

/// Attach the child's (only) thread and park its startup frame.
pub fn fork_thread(child: &Arc<Process>, tf: Box<Trapframe>) -> Result<()> {
    child.park_trapframe(tf);
    attach_thread(child);
    Ok(())
}

/// First entry of a forked child: activate its address space, make the
/// parked frame report a successful `fork` returning 0, and hand it to
/// the caller for the return to user mode.
pub fn enter_forked_process(child: &Arc<Process>) -> Result<Trapframe> {
    let mut tf = child.take_trapframe().ok_or(Errno::Invalid)?;

    child.with_addrspace(|aspace| {
        aspace.activate();
        Ok(())
    })?;

    tf.set_forked_child_return();
    Ok(*tf)
}

/// Detach the calling thread from its process. The switch away from
/// the dead thread is the scheduler's job.
pub fn exit_thread(proc: &Arc<Process>) {
    proc.remove_thread();
}
