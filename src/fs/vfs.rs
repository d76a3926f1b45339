use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::abi::{O_ACCMODE, O_CREAT, O_RDONLY, O_TRUNC};
use crate::errno::{Errno, Result};
use crate::fs::console::{ConsoleVnode, CONSOLE_DEVICE};
use crate::fs::mount::FileSystem;
use crate::fs::uio::Uio;
use crate::fs::vnode::{NodeKind, Stat, Vnode};
use crate::mm;
use crate::proc::Process;

/// A mount point associates a path prefix with a concrete filesystem.
struct MountPoint {
    path: String,
    fs: &'static dyn FileSystem,
}

/// The Virtual File System — resolves paths to mount points and delegates.
pub struct Vfs {
    mounts: Vec<MountPoint>,
}

impl Vfs {
    pub fn new() -> Self {
        Vfs { mounts: Vec::new() }
    }

    /// Mount a filesystem at the given path.
    pub fn mount(&mut self, path: &str, fs: &'static dyn FileSystem) {
        self.mounts.push(MountPoint {
            path: String::from(path),
            fs,
        });
        // Sort by path length descending so longer prefixes match first
        self.mounts.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
    }

    /// Resolve which mount point handles a given absolute path.
    /// Returns (filesystem, path relative to mount point).
    fn resolve(&self, abs_path: &str) -> Result<(&'static dyn FileSystem, String)> {
        for mp in &self.mounts {
            let under_mount = abs_path == mp.path
                || abs_path.starts_with(&alloc::format!("{}/", mp.path.trim_end_matches('/')))
                || mp.path == "/";
            if under_mount {
                let relative = if mp.path == "/" {
                    String::from(abs_path)
                } else {
                    let stripped = &abs_path[mp.path.len()..];
                    if stripped.is_empty() {
                        String::from("/")
                    } else {
                        String::from(stripped)
                    }
                };
                return Ok((mp.fs, relative));
            }
        }
        Err(Errno::NoEntry)
    }
}

lazy_static! {
    pub static ref VFS: Mutex<Vfs> = Mutex::new(Vfs::new());
}

/// Initialize the VFS with RAMFS at root and a separate TmpFS at /tmp.
pub fn init() {
    let mut vfs = VFS.lock();

    let ramfs: &'static super::ramfs::RamFs = &super::ramfs::RAMFS_INSTANCE;
    vfs.mount("/", ramfs);

    let tmpfs: &'static super::ramfs::RamFs = &super::ramfs::TMPFS_INSTANCE;
    vfs.mount("/tmp", tmpfs);
    drop(vfs);

    log::info!("VFS initialized: ramfs at /, tmpfs at /tmp");
}

/// Vnode handle to an object on a mounted filesystem.
struct FsVnode {
    fs: &'static dyn FileSystem,
    rel: String,
    abs: String,
    kind: NodeKind,
}

impl Vnode for FsVnode {
    fn read(&self, uio: &mut Uio) -> Result<()> {
        let mut scratch = mm::kmalloc(uio.resid())?;
        let n = self.fs.read(&self.rel, uio.offset, &mut scratch)?;
        uio.fill(&scratch[..n]);
        Ok(())
    }

    fn write(&self, uio: &mut Uio) -> Result<()> {
        let n = self.fs.write(&self.rel, uio.offset, uio.src_bytes())?;
        uio.advance(n);
        Ok(())
    }

    fn stat(&self) -> Result<Stat> {
        self.fs.lookup(&self.rel)
    }

    fn seekable(&self) -> bool {
        self.kind == NodeKind::File
    }

    fn truncate(&self) -> Result<()> {
        self.fs.truncate(&self.rel)
    }

    fn path(&self) -> &str {
        &self.abs
    }
}

/// Resolve `input` against the process's working directory.
/// Handles absolute paths, relative paths, `.` and `..`.
fn resolve_path(proc: &Process, input: &str) -> String {
    let raw = if input.starts_with('/') {
        String::from(input)
    } else {
        let cwd = proc.cwd_path();
        if cwd == "/" {
            alloc::format!("/{}", input)
        } else {
            alloc::format!("{}/{}", cwd, input)
        }
    };

    // Normalize: split by '/', handle . and ..
    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }

    if parts.is_empty() {
        String::from("/")
    } else {
        let mut result = String::new();
        for p in parts {
            result.push('/');
            result.push_str(p);
        }
        result
    }
}

/// Open a path (or the console device) on behalf of `proc`.
pub fn open(proc: &Process, path: &str, flags: u32) -> Result<Arc<dyn Vnode>> {
    if path == CONSOLE_DEVICE {
        return Ok(Arc::new(ConsoleVnode));
    }

    let abs = resolve_path(proc, path);
    let (fs, rel) = VFS.lock().resolve(&abs)?;

    let stat = match fs.lookup(&rel) {
        Ok(stat) => stat,
        Err(Errno::NoEntry) if flags & O_CREAT != 0 => {
            fs.create(&rel)?;
            fs.lookup(&rel)?
        }
        Err(e) => return Err(e),
    };

    if stat.kind == NodeKind::Directory && (flags & O_ACCMODE) != O_RDONLY {
        return Err(Errno::IsDir);
    }

    if flags & O_TRUNC != 0 && stat.kind == NodeKind::File {
        fs.truncate(&rel)?;
    }

    Ok(Arc::new(FsVnode {
        fs,
        rel,
        abs,
        kind: stat.kind,
    }))
}

/// Look up a path without opening it.
pub fn stat(proc: &Process, path: &str) -> Result<Stat> {
    let abs = resolve_path(proc, path);
    let (fs, rel) = VFS.lock().resolve(&abs)?;
    fs.lookup(&rel)
}

/// Change the process's working directory.
pub fn chdir(proc: &Process, path: &str) -> Result<()> {
    let abs = resolve_path(proc, path);
    let (fs, rel) = VFS.lock().resolve(&abs)?;

    let stat = fs.lookup(&rel)?;
    if stat.kind != NodeKind::Directory {
        return Err(Errno::NotDir);
    }

    proc.set_cwd(Arc::new(FsVnode {
        fs,
        rel,
        abs,
        kind: NodeKind::Directory,
    }));
    Ok(())
}

/// Report the process's working directory into `uio`.
pub fn getcwd(proc: &Process, uio: &mut Uio) -> Result<()> {
    let path = proc.cwd_path();
    uio.fill(path.as_bytes());
    Ok(())
}

/// Create a directory. Kernel-internal; there is no mkdir syscall here.
pub fn mkdir(proc: &Process, path: &str) -> Result<()> {
    let abs = resolve_path(proc, path);
    let (fs, rel) = VFS.lock().resolve(&abs)?;
    fs.mkdir(&rel)
}

/// Handle to the root directory, for bootstrapping the kernel process.
pub(crate) fn root_vnode() -> Result<Arc<dyn Vnode>> {
    let (fs, rel) = VFS.lock().resolve("/")?;
    Ok(Arc::new(FsVnode {
        fs,
        rel,
        abs: String::from("/"),
        kind: NodeKind::Directory,
    }))
}
