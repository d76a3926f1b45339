pub mod console;
pub mod filetable;
pub mod mount;
pub mod openfile;
pub mod ramfs;
pub mod uio;
pub mod vfs;
pub mod vnode;

pub use filetable::FileTable;
pub use openfile::OpenFile;
pub use uio::Uio;
pub use vnode::{NodeKind, Stat, Vnode};

/// Initialize the VFS and its mounts.
pub fn init() {
    vfs::init();
}
