use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::abi::OPEN_MAX;
use crate::errno::{Errno, Result};
use crate::fs::openfile::OpenFile;

/// Per-process descriptor table: a fixed array of slots, each either
/// empty or holding a shared reference to an open file.
pub struct FileTable {
    slots: Vec<Option<Arc<OpenFile>>>,
}

impl FileTable {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(OPEN_MAX);
        for _ in 0..OPEN_MAX {
            slots.push(None);
        }
        FileTable { slots }
    }

    fn index(fd: i32) -> Result<usize> {
        if fd < 0 || fd as usize >= OPEN_MAX {
            return Err(Errno::BadFd);
        }
        Ok(fd as usize)
    }

    /// Shared reference at `fd`, if installed. Out-of-range is `BadFd`;
    /// an empty slot is `Ok(None)` so callers can distinguish the
    /// console fall-back case.
    pub fn get(&self, fd: i32) -> Result<Option<Arc<OpenFile>>> {
        Ok(self.slots[Self::index(fd)?].clone())
    }

    /// Install at the lowest empty slot and return its descriptor.
    pub fn install(&mut self, of: Arc<OpenFile>) -> Result<i32> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(of);
                return Ok(i as i32);
            }
        }
        Err(Errno::TooManyFiles)
    }

    /// Install at a specific descriptor, returning whatever was there.
    pub fn install_at(&mut self, fd: i32, of: Arc<OpenFile>) -> Result<Option<Arc<OpenFile>>> {
        let idx = Self::index(fd)?;
        Ok(self.slots[idx].replace(of))
    }

    /// Detach and return the reference at `fd`.
    pub fn take(&mut self, fd: i32) -> Result<Option<Arc<OpenFile>>> {
        let idx = Self::index(fd)?;
        Ok(self.slots[idx].take())
    }

    /// Slot view for fork's per-slot sharing.
    pub fn slots(&self) -> &[Option<Arc<OpenFile>>] {
        &self.slots
    }

    /// Drop every installed reference (process exit sweep).
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::O_RDWR;
    use crate::fs::console::ConsoleVnode;

    fn console_file() -> Arc<OpenFile> {
        OpenFile::new(Arc::new(ConsoleVnode), O_RDWR, 0)
    }

    #[test]
    fn install_uses_lowest_free_slot() {
        let mut table = FileTable::new();
        assert_eq!(table.install(console_file()), Ok(0));
        assert_eq!(table.install(console_file()), Ok(1));
        table.take(0).unwrap();
        assert_eq!(table.install(console_file()), Ok(0));
    }

    #[test]
    fn full_table_reports_too_many_files() {
        let mut table = FileTable::new();
        for _ in 0..OPEN_MAX {
            table.install(console_file()).unwrap();
        }
        assert_eq!(table.install(console_file()), Err(Errno::TooManyFiles));
    }

    #[test]
    fn out_of_range_descriptors_rejected() {
        let mut table = FileTable::new();
        assert_eq!(table.get(-1).unwrap_err(), Errno::BadFd);
        assert_eq!(table.get(OPEN_MAX as i32).unwrap_err(), Errno::BadFd);
        assert_eq!(table.take(OPEN_MAX as i32).unwrap_err(), Errno::BadFd);
    }

    #[test]
    fn shared_reference_counting_follows_slots() {
        let mut a = FileTable::new();
        let mut b = FileTable::new();
        let of = console_file();
        assert_eq!(Arc::strong_count(&of), 1);

        a.install(of.clone()).unwrap();
        b.install(of.clone()).unwrap();
        assert_eq!(Arc::strong_count(&of), 3);

        a.clear();
        assert_eq!(Arc::strong_count(&of), 2);
        b.take(0).unwrap();
        assert_eq!(Arc::strong_count(&of), 1);
    }
}
