use crate::errno::Result;
use crate::fs::uio::Uio;

/// Type of filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    Device,
}

/// Metadata snapshot of a vnode.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
    pub size: u64,
    pub kind: NodeKind,
}

/// A handle to an open filesystem object.
///
/// Handles are shared as `Arc<dyn Vnode>`; cloning and dropping the
/// `Arc` are the reference-count operations. Implementations carry no
/// per-open state; the byte offset lives in the open-file object.
pub trait Vnode: Send + Sync {
    /// Fill `uio` from this object starting at `uio.offset`.
    fn read(&self, uio: &mut Uio) -> Result<()>;

    /// Drain `uio` into this object starting at `uio.offset`.
    fn write(&self, uio: &mut Uio) -> Result<()>;

    fn stat(&self) -> Result<Stat>;

    /// Whether byte offsets are meaningful for this object.
    fn seekable(&self) -> bool;

    /// Drop the object's contents (open with `O_TRUNC`).
    fn truncate(&self) -> Result<()>;

    /// Absolute path this handle was opened under, for `__getcwd`.
    fn path(&self) -> &str;
}
