//! File syscalls.
//!
//! Inputs are validated before anything is allocated; kernel buffers
//! are dropped on every error path; user-pointer outputs are written
//! only on success. Errors from the VFS pass through unchanged.

use alloc::sync::Arc;

use crate::abi::{
    O_ACCMODE, O_APPEND, O_RDONLY, O_RDWR, O_WRONLY, PATH_MAX, STDERR_FILENO, STDIN_FILENO,
    STDOUT_FILENO,
};
use crate::errno::{Errno, Result};
use crate::fs::console::CONSOLE;
use crate::fs::uio::Uio;
use crate::fs::{vfs, OpenFile};
use crate::mm;
use crate::mm::usercopy::{copyin, copyinstr, copyout};
use crate::proc::Process;

pub fn sys_open(proc: &Arc<Process>, path_ptr: u64, flags: u32, _mode: u32) -> Result<i64> {
    if path_ptr == 0 {
        return Err(Errno::Fault);
    }
    let path = copyinstr(proc, path_ptr, PATH_MAX)?;
    if path.is_empty() {
        return Err(Errno::Invalid);
    }

    let accmode = flags & O_ACCMODE;
    if !matches!(accmode, O_RDONLY | O_WRONLY | O_RDWR) {
        return Err(Errno::Invalid);
    }
    if flags & O_APPEND != 0 && accmode == O_RDONLY {
        return Err(Errno::Invalid);
    }

    let vn = vfs::open(proc, &path, flags)?;

    let initial_offset = if flags & O_APPEND != 0 {
        vn.stat()?.size
    } else {
        0
    };
    let of = OpenFile::new(vn, flags, initial_offset);

    // A full table drops the sole reference, closing the vnode.
    let fd = proc.files.lock().install(of)?;
    Ok(fd as i64)
}

pub fn sys_close(proc: &Arc<Process>, fd: i32) -> Result<i64> {
    match proc.files.lock().take(fd)? {
        Some(of) => {
            drop(of);
            Ok(0)
        }
        None => Err(Errno::BadFd),
    }
}

pub fn sys_read(proc: &Arc<Process>, fd: i32, buf_ptr: u64, len: usize) -> Result<i64> {
    if buf_ptr == 0 {
        return Err(Errno::Fault);
    }

    let slot = proc.files.lock().get(fd)?;
    let of = match slot {
        Some(of) => of,
        // Console fall-back for a table-less stdin.
        None if fd == STDIN_FILENO => return console_read(proc, buf_ptr, len),
        None => return Err(Errno::BadFd),
    };

    if !of.readable() {
        return Err(Errno::BadFd);
    }

    let mut kbuf = mm::kmalloc(len)?;
    let n = of.read(&mut kbuf)?;
    copyout(proc, &kbuf[..n], buf_ptr)?;
    Ok(n as i64)
}

pub fn sys_write(proc: &Arc<Process>, fd: i32, buf_ptr: u64, len: usize) -> Result<i64> {
    if buf_ptr == 0 {
        return Err(Errno::Fault);
    }

    let slot = proc.files.lock().get(fd)?;
    let of = match slot {
        Some(of) => of,
        // Console fall-back for table-less stdout/stderr.
        None if fd == STDOUT_FILENO || fd == STDERR_FILENO => {
            return console_write(proc, buf_ptr, len)
        }
        None => return Err(Errno::BadFd),
    };

    if !of.writable() {
        return Err(Errno::BadFd);
    }

    let mut kbuf = mm::kmalloc(len)?;
    copyin(proc, buf_ptr, &mut kbuf)?;
    let n = of.write(&kbuf)?;
    Ok(n as i64)
}

pub fn sys_lseek(proc: &Arc<Process>, fd: i32, pos: i64, whence: i32) -> Result<i64> {
    let of = proc.files.lock().get(fd)?.ok_or(Errno::BadFd)?;
    of.seek(pos, whence)
}

pub fn sys_dup2(proc: &Arc<Process>, oldfd: i32, newfd: i32) -> Result<i64> {
    let mut files = proc.files.lock();

    let of = files.get(oldfd)?.ok_or(Errno::BadFd)?;
    files.get(newfd)?; // range check only; the slot may be empty

    if oldfd == newfd {
        return Ok(newfd as i64);
    }

    // Displacing a live entry releases it, possibly closing the file.
    let displaced = files.install_at(newfd, of)?;
    drop(files);
    drop(displaced);
    Ok(newfd as i64)
}

pub fn sys_chdir(proc: &Arc<Process>, path_ptr: u64) -> Result<i64> {
    if path_ptr == 0 {
        return Err(Errno::Fault);
    }
    let path = copyinstr(proc, path_ptr, PATH_MAX)?;
    if path.is_empty() {
        return Err(Errno::NoEntry);
    }
    vfs::chdir(proc, &path)?;
    Ok(0)
}

pub fn sys___getcwd(proc: &Arc<Process>, buf_ptr: u64, len: usize) -> Result<i64> {
    if buf_ptr == 0 {
        return Err(Errno::Fault);
    }
    if len == 0 {
        return Err(Errno::Invalid);
    }

    let mut kbuf = mm::kmalloc(len)?;
    let mut uio = Uio::read(&mut kbuf, 0);
    vfs::getcwd(proc, &mut uio)?;
    let n = uio.transferred();

    copyout(proc, &kbuf[..n], buf_ptr)?;
    Ok(n as i64)
}

fn console_read(proc: &Arc<Process>, buf_ptr: u64, len: usize) -> Result<i64> {
    let mut kbuf = mm::kmalloc(len)?;
    let mut n = 0;
    while n < len {
        match CONSOLE.getch() {
            Some(ch) => {
                kbuf[n] = ch;
                n += 1;
            }
            None => break,
        }
    }
    copyout(proc, &kbuf[..n], buf_ptr)?;
    Ok(n as i64)
}

fn console_write(proc: &Arc<Process>, buf_ptr: u64, len: usize) -> Result<i64> {
    let mut kbuf = mm::kmalloc(len)?;
    copyin(proc, buf_ptr, &mut kbuf)?;
    for &ch in kbuf.iter() {
        CONSOLE.putch(ch);
    }
    Ok(len as i64)
}
