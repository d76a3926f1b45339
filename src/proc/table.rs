//! The global process table.
//!
//! A fixed array of slots indexed by PID, guarded by one spinlock.
//! PIDs are handed out with a circular scan so a freshly released PID
//! is not reused immediately; stale-PID bugs then fail loudly instead
//! of silently addressing the wrong process.

use alloc::sync::Arc;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::abi::PROC_MAX;
use crate::errno::{Errno, Result};
use crate::proc::process::Process;

struct ProcessTable {
    slots: Vec<Option<Arc<Process>>>,
    last_pid: i32,
}

impl ProcessTable {
    fn new() -> Self {
        let mut slots = Vec::with_capacity(PROC_MAX as usize + 1);
        for _ in 0..=PROC_MAX {
            slots.push(None);
        }
        ProcessTable {
            slots,
            last_pid: 0,
        }
    }
}

lazy_static! {
    static ref TABLE: Mutex<ProcessTable> = Mutex::new(ProcessTable::new());
}

/// Pick a free PID, scanning circularly from just past the previous
/// allocation. PID 0 is never handed out.
pub fn allocate_pid() -> Result<i32> {
    let mut table = TABLE.lock();

    let mut pid = if table.last_pid + 1 > PROC_MAX {
        1
    } else {
        table.last_pid + 1
    };
    while pid != table.last_pid {
        if table.slots[pid as usize].is_none() {
            table.last_pid = pid;
            return Ok(pid);
        }
        pid = if pid + 1 > PROC_MAX { 1 } else { pid + 1 };
    }

    Err(Errno::NoProcSlot)
}

/// Make `proc` visible at its PID.
pub fn insert(pid: i32, proc: Arc<Process>) {
    assert!(pid >= 0 && pid <= PROC_MAX);
    assert_eq!(proc.pid(), pid);

    let mut table = TABLE.lock();
    debug_assert!(table.slots[pid as usize].is_none());
    table.slots[pid as usize] = Some(proc);
}

/// Drop the table's reference at `pid`.
pub fn remove(pid: i32) -> Option<Arc<Process>> {
    if pid <= 0 || pid > PROC_MAX {
        return None;
    }
    TABLE.lock().slots[pid as usize].take()
}

/// Find a process by PID. Out-of-range PIDs (including 0, the kernel
/// process) resolve to nothing.
pub fn lookup(pid: i32) -> Option<Arc<Process>> {
    if pid <= 0 || pid > PROC_MAX {
        return None;
    }
    let table = TABLE.lock();
    let found = table.slots[pid as usize].clone();
    if let Some(ref proc) = found {
        assert_eq!(proc.pid(), pid, "process table slot out of sync");
    }
    found
}

/// The kernel process, created by `bootstrap`.
pub fn kernel_proc() -> Arc<Process> {
    TABLE
        .lock()
        .slots[0]
        .clone()
        .expect("proc table not bootstrapped")
}

pub(super) fn install_kernel_proc(proc: Arc<Process>) {
    assert_eq!(proc.pid(), 0);
    let mut table = TABLE.lock();
    assert!(table.slots[0].is_none(), "kernel process already installed");
    table.slots[0] = Some(proc);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_circular_and_slots_stay_consistent() {
        crate::bootstrap();

        let a = allocate_pid().unwrap();
        let proc_a = Process::new_raw(a, "a");
        insert(a, Arc::clone(&proc_a));

        let b = allocate_pid().unwrap();
        assert_ne!(a, b);

        assert_eq!(lookup(a).unwrap().pid(), a);
        remove(a);
        assert!(lookup(a).is_none());

        // The freed slot is not immediately reused.
        let c = allocate_pid().unwrap();
        assert_ne!(c, a);
    }

    #[test]
    fn out_of_range_lookups_fail() {
        crate::bootstrap();
        assert!(lookup(0).is_none());
        assert!(lookup(-3).is_none());
        assert!(lookup(PROC_MAX + 1).is_none());
    }
}
