//! Process syscalls: getpid, fork, waitpid, _exit.
//! (execv lives in `syscalls::exec`.)

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::abi::{encode_exit, PROC_MAX};
use crate::errno::{Errno, Result};
use crate::proc::{self, table, thread, Process};
use crate::trapframe::Trapframe;

pub fn sys_getpid(proc: &Arc<Process>) -> Result<i64> {
    Ok(proc.pid() as i64)
}

/// Duplicate the calling process. The parent gets the child's PID; the
/// child's parked trapframe will report 0 when it first runs.
pub fn sys_fork(proc: &Arc<Process>, tf: &Trapframe) -> Result<i64> {
    // 1. Fresh process: new PID, console descriptors, inherited CWD.
    let child = Process::create_runprogram(proc.name(), proc)?;

    // 2. Parentage, for waitpid's is-my-child check.
    child.set_parent_pid(proc.pid());

    // 3. Independent deep copy of the address space.
    let child_as = match proc.with_addrspace(|aspace| aspace.try_clone()) {
        Ok(aspace) => aspace,
        Err(e) => {
            proc::destroy(child);
            return Err(e);
        }
    };
    child.set_addrspace(Some(child_as));

    // 4. Share the file table slot by slot: tables are independent,
    // the objects behind them are shared.
    {
        let parent_files = proc.files.lock();
        let mut child_files = child.files.lock();
        for (i, slot) in parent_files.slots().iter().enumerate() {
            match slot {
                Some(of) => {
                    let _ = child_files.install_at(i as i32, Arc::clone(of));
                }
                None => {
                    let _ = child_files.take(i as i32);
                }
            }
        }
    }

    // 5. Snapshot the trapframe; the child thread consumes it on its
    // first run. Failure past this point unwinds the shared references
    // by destroying the child.
    let child_tf = Box::new(*tf);
    if let Err(e) = thread::fork_thread(&child, child_tf) {
        proc::destroy(child);
        return Err(e);
    }

    log::debug!("fork: pid {} -> child {}", proc.pid(), child.pid());
    Ok(child.pid() as i64)
}

/// Wait for a specific child to exit, copy out its encoded status, and
/// reap it.
pub fn sys_waitpid(proc: &Arc<Process>, pid: i32, status_ptr: u64, options: i32) -> Result<i64> {
    if options != 0 {
        return Err(Errno::Invalid);
    }
    if pid <= 0 || pid > PROC_MAX {
        return Err(Errno::NoSuchProcess);
    }

    let child = table::lookup(pid).ok_or(Errno::NoSuchProcess)?;
    if child.parent_pid() != proc.pid() {
        return Err(Errno::NoChild);
    }

    let status = child.wait_for_exit();

    if status_ptr != 0 {
        crate::mm::usercopy::copyout(proc, &status.to_ne_bytes(), status_ptr)?;
    }

    proc::destroy(child);
    Ok(pid as i64)
}

/// Terminate the calling process. The process object stays in the
/// table, exited, until the parent reaps it with waitpid. The final
/// switch off the dead thread belongs to the scheduler, which must
/// never run it again.
pub fn sys_exit(proc: &Arc<Process>, code: i32) {
    // Release the address space and working directory.
    drop(proc.set_addrspace(None));
    proc.clear_cwd();

    // Sweep the descriptor table; last references close their files.
    proc.files.lock().clear();

    // Detach the thread before publishing the exit so a woken parent
    // never reaps a process that still has a live thread.
    thread::exit_thread(proc);

    proc.mark_exited(encode_exit(code));
    log::debug!("pid {} exited ({})", proc.pid(), code);
}
