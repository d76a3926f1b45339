//! Shared open-file objects.
//!
//! An `OpenFile` pairs a vnode handle with the per-open state: access
//! mode and byte offset. Descriptor slots across any number of
//! processes share one object through `Arc`; the strong count is the
//! reference count, and the last drop releases the vnode handle.
//! The offset lock is held across the vnode call so concurrent I/O on
//! shared descriptors serializes and each transfer advances the offset
//! contiguously.

use alloc::sync::Arc;
use spin::Mutex;

use crate::abi::{O_ACCMODE, O_RDONLY, O_WRONLY, SEEK_CUR, SEEK_END, SEEK_SET};
use crate::errno::{Errno, Result};
use crate::fs::uio::Uio;
use crate::fs::vnode::Vnode;

pub struct OpenFile {
    vn: Arc<dyn Vnode>,
    flags: u32,
    pos: Mutex<u64>,
}

impl core::fmt::Debug for OpenFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OpenFile").field("flags", &self.flags).finish()
    }
}

impl OpenFile {
    /// Wrap an opened vnode. `initial_offset` is 0, or the file size for
    /// an append-mode open.
    pub fn new(vn: Arc<dyn Vnode>, flags: u32, initial_offset: u64) -> Arc<OpenFile> {
        Arc::new(OpenFile {
            vn,
            flags,
            pos: Mutex::new(initial_offset),
        })
    }

    pub fn readable(&self) -> bool {
        self.flags & O_ACCMODE != O_WRONLY
    }

    pub fn writable(&self) -> bool {
        self.flags & O_ACCMODE != O_RDONLY
    }

    pub fn offset(&self) -> u64 {
        *self.pos.lock()
    }

    /// Read into `buf` at the current offset; on success the offset
    /// advances by the byte count. Errors leave the offset untouched.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut pos = self.pos.lock();
        let mut uio = Uio::read(buf, *pos);
        self.vn.read(&mut uio)?;
        *pos = uio.offset;
        Ok(uio.transferred())
    }

    /// Write from `buf` at the current offset; symmetric with `read`.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut pos = self.pos.lock();
        let mut uio = Uio::write(buf, *pos);
        self.vn.write(&mut uio)?;
        *pos = uio.offset;
        Ok(uio.transferred())
    }

    /// Reposition the offset. Rejects unknown `whence` values, seeks on
    /// non-seekable objects, and any position that would go negative.
    pub fn seek(&self, pos: i64, whence: i32) -> Result<i64> {
        if !matches!(whence, SEEK_SET | SEEK_CUR | SEEK_END) {
            return Err(Errno::Invalid);
        }
        if !self.vn.seekable() {
            return Err(Errno::IllegalSeek);
        }

        let mut cur = self.pos.lock();
        let base = match whence {
            SEEK_SET => 0,
            SEEK_CUR => *cur as i64,
            _ => self.vn.stat()?.size as i64,
        };
        let target = base.checked_add(pos).ok_or(Errno::Invalid)?;
        if target < 0 {
            return Err(Errno::Invalid);
        }

        *cur = target as u64;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{O_RDWR, O_WRONLY};
    use crate::fs::mount::FileSystem;
    use crate::fs::ramfs::RamFs;
    use crate::fs::vnode::Stat;

    fn file_vnode(data: &[u8]) -> Arc<dyn Vnode> {
        struct TestVnode {
            fs: &'static RamFs,
        }
        impl Vnode for TestVnode {
            fn read(&self, uio: &mut crate::fs::uio::Uio) -> Result<()> {
                let mut scratch = alloc::vec![0u8; uio.resid()];
                let n = self.fs.read("/f", uio.offset, &mut scratch)?;
                uio.fill(&scratch[..n]);
                Ok(())
            }
            fn write(&self, uio: &mut crate::fs::uio::Uio) -> Result<()> {
                let n = self.fs.write("/f", uio.offset, uio.src_bytes())?;
                uio.advance(n);
                Ok(())
            }
            fn stat(&self) -> Result<Stat> {
                self.fs.lookup("/f")
            }
            fn seekable(&self) -> bool {
                true
            }
            fn truncate(&self) -> Result<()> {
                self.fs.truncate("/f")
            }
            fn path(&self) -> &str {
                "/f"
            }
        }

        let fs: &'static RamFs = alloc::boxed::Box::leak(alloc::boxed::Box::new(RamFs::new("t")));
        fs.create("/f").unwrap();
        fs.write("/f", 0, data).unwrap();
        Arc::new(TestVnode { fs })
    }

    #[test]
    fn offset_advances_by_transfer() {
        let of = OpenFile::new(file_vnode(b"abcdef"), O_RDWR, 0);
        let mut buf = [0u8; 4];
        assert_eq!(of.read(&mut buf), Ok(4));
        assert_eq!(of.offset(), 4);
        assert_eq!(of.read(&mut buf), Ok(2));
        assert_eq!(of.offset(), 6);
        assert_eq!(of.read(&mut buf), Ok(0));
        assert_eq!(of.offset(), 6);
    }

    #[test]
    fn seek_set_cur_end() {
        let of = OpenFile::new(file_vnode(&[0u8; 26]), O_RDWR, 26);
        assert_eq!(of.seek(0, SEEK_SET), Ok(0));
        assert_eq!(of.seek(0, SEEK_END), Ok(26));
        assert_eq!(of.seek(10, SEEK_SET), Ok(10));
        assert_eq!(of.seek(5, SEEK_CUR), Ok(15));
    }

    #[test]
    fn negative_offset_rejected() {
        let of = OpenFile::new(file_vnode(b"xy"), O_RDWR, 0);
        assert_eq!(of.seek(-1, SEEK_SET), Err(Errno::Invalid));
        assert_eq!(of.seek(-3, SEEK_END), Err(Errno::Invalid));
        assert_eq!(of.offset(), 0);
    }

    #[test]
    fn bad_whence_rejected() {
        let of = OpenFile::new(file_vnode(b"xy"), O_RDWR, 0);
        assert_eq!(of.seek(0, 9), Err(Errno::Invalid));
    }

    #[test]
    fn access_mode_predicates() {
        let of = OpenFile::new(file_vnode(b""), O_WRONLY, 0);
        assert!(!of.readable());
        assert!(of.writable());
    }
}
