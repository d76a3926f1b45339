pub mod process;
pub mod table;
pub mod thread;

pub use process::{destroy, Process};

use alloc::sync::Arc;

/// Create the kernel process (PID 0). Its working directory is the
/// filesystem root; it has no address space and no user descriptors.
pub fn bootstrap() {
    let kproc = process::Process::new_raw(0, "[kernel]");
    if let Ok(root) = crate::fs::vfs::root_vnode() {
        kproc.set_cwd(root);
    }
    table::install_kernel_proc(Arc::clone(&kproc));
    log::info!("kernel process installed");
}
