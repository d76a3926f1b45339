//! Process objects.
//!
//! A process owns its address space and working directory, shares open
//! files through its descriptor table, and coordinates with `waitpid`
//! through an exit flag and condition variable. Pointer-like fields
//! live under a spinlock; the exit state has its own mutex so a parent
//! can sleep on it.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use spin::Mutex;

use crate::abi::{O_RDONLY, O_WRONLY, STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use crate::errno::{Errno, Result};
use crate::fs::console::CONSOLE_DEVICE;
use crate::fs::vfs;
use crate::fs::vnode::Vnode;
use crate::fs::{FileTable, OpenFile};
use crate::mm::AddressSpace;
use crate::proc::table;
use crate::sync::Condvar;
use crate::trapframe::Trapframe;

/// Pointer fields, guarded by a spinlock. Held only for short,
/// non-blocking critical sections.
struct ProcInner {
    parent_pid: i32,
    addrspace: Option<AddressSpace>,
    cwd: Option<Arc<dyn Vnode>>,
    numthreads: u32,
}

/// Exit coordination, guarded by the state mutex.
struct ExitState {
    exited: bool,
    exit_code: i32,
}

pub struct Process {
    pid: i32,
    name: String,
    inner: Mutex<ProcInner>,
    /// Descriptor table. Touched by the owning thread, plus `fork`
    /// reading the parent's slots from the parent's own context.
    pub files: Mutex<FileTable>,
    state: Mutex<ExitState>,
    child_done: Condvar,
    /// Startup trapframe parked by `fork` until the child first runs.
    pending_tf: Mutex<Option<Box<Trapframe>>>,
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .finish()
    }
}

impl Process {
    /// Bare process object; no descriptors, no working directory.
    pub(super) fn new_raw(pid: i32, name: &str) -> Arc<Process> {
        Arc::new(Process {
            pid,
            name: String::from(name),
            inner: Mutex::new(ProcInner {
                parent_pid: -1,
                addrspace: None,
                cwd: None,
                numthreads: 0,
            }),
            files: Mutex::new(FileTable::new()),
            state: Mutex::new(ExitState {
                exited: false,
                exit_code: 0,
            }),
            child_done: Condvar::new(),
            pending_tf: Mutex::new(None),
        })
    }

    /// Create a fresh process for running a user program: a new PID,
    /// the console on descriptors 0/1/2, and the creator's working
    /// directory. The process is visible in the process table on return.
    pub fn create_runprogram(name: &str, creator: &Arc<Process>) -> Result<Arc<Process>> {
        let pid = table::allocate_pid()?;
        let proc = Process::new_raw(pid, name);

        start_console(&proc, STDIN_FILENO, O_RDONLY)?;
        start_console(&proc, STDOUT_FILENO, O_WRONLY)?;
        start_console(&proc, STDERR_FILENO, O_WRONLY)?;

        // Lock the creator to copy its current directory. (No need to
        // lock the new process; we hold the only reference to it.)
        if let Some(cwd) = creator.cwd() {
            proc.set_cwd(cwd);
        }

        table::insert(pid, Arc::clone(&proc));
        Ok(proc)
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_pid(&self) -> i32 {
        self.inner.lock().parent_pid
    }

    pub fn set_parent_pid(&self, pid: i32) {
        self.inner.lock().parent_pid = pid;
    }

    /// Run `f` against the current address space. A process without one
    /// cannot touch user memory, so that case is `Fault`.
    pub fn with_addrspace<R>(&self, f: impl FnOnce(&mut AddressSpace) -> Result<R>) -> Result<R> {
        let mut inner = self.inner.lock();
        match inner.addrspace.as_mut() {
            Some(aspace) => f(aspace),
            None => Err(Errno::Fault),
        }
    }

    /// Swap the address space, returning the old one for rollback or
    /// disposal.
    pub fn set_addrspace(&self, aspace: Option<AddressSpace>) -> Option<AddressSpace> {
        let mut inner = self.inner.lock();
        core::mem::replace(&mut inner.addrspace, aspace)
    }

    pub fn cwd(&self) -> Option<Arc<dyn Vnode>> {
        self.inner.lock().cwd.clone()
    }

    pub fn set_cwd(&self, vn: Arc<dyn Vnode>) {
        self.inner.lock().cwd = Some(vn);
    }

    pub fn clear_cwd(&self) {
        self.inner.lock().cwd = None;
    }

    /// Absolute path of the working directory; the root until one is set.
    pub fn cwd_path(&self) -> String {
        match &self.inner.lock().cwd {
            Some(vn) => String::from(vn.path()),
            None => String::from("/"),
        }
    }

    pub fn thread_count(&self) -> u32 {
        self.inner.lock().numthreads
    }

    pub(super) fn add_thread(&self) {
        self.inner.lock().numthreads += 1;
    }

    pub(super) fn remove_thread(&self) {
        let mut inner = self.inner.lock();
        assert!(inner.numthreads > 0, "process has no threads to remove");
        inner.numthreads -= 1;
    }

    pub(super) fn park_trapframe(&self, tf: Box<Trapframe>) {
        *self.pending_tf.lock() = Some(tf);
    }

    pub(super) fn take_trapframe(&self) -> Option<Box<Trapframe>> {
        self.pending_tf.lock().take()
    }

    /// Publish the encoded exit status and wake any waiting parent.
    /// Exiting twice is a kernel bug.
    pub fn mark_exited(&self, encoded: i32) {
        let mut state = self.state.lock();
        assert!(!state.exited, "process {} exited twice", self.pid);
        state.exit_code = encoded;
        state.exited = true;
        self.child_done.signal();
    }

    pub fn is_exited(&self) -> bool {
        self.state.lock().exited
    }

    /// Block until this process has exited; returns the encoded status.
    pub fn wait_for_exit(&self) -> i32 {
        let mut state = self.state.lock();
        while !state.exited {
            state = self.child_done.wait(state, &self.state);
        }
        state.exit_code
    }
}

fn start_console(proc: &Arc<Process>, fd: i32, flags: u32) -> Result<()> {
    let vn = vfs::open(proc, CONSOLE_DEVICE, flags)?;
    let of = OpenFile::new(vn, flags, 0);
    proc.files.lock().install_at(fd, of)?;
    Ok(())
}

/// Tear a process down: drop it from the table, release the working
/// directory and address space, and sweep the descriptor table. Only
/// legal once the process has no running threads.
pub fn destroy(proc: Arc<Process>) {
    debug_assert_eq!(proc.thread_count(), 0);

    table::remove(proc.pid());

    proc.clear_cwd();
    drop(proc.set_addrspace(None));
    proc.files.lock().clear();
}
