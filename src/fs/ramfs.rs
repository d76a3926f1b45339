use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::errno::{Errno, Result};
use crate::fs::mount::FileSystem;
use crate::fs::vnode::{NodeKind, Stat};

/// Total bytes of file data one ramfs instance may hold.
const RAMFS_CAPACITY: usize = 1 << 20;

/// An in-memory node (file or directory).
struct RamNode {
    kind: NodeKind,
    data: Vec<u8>,
}

/// RAMFS — a fully in-memory filesystem.
pub struct RamFs {
    label: &'static str,
    nodes: Mutex<BTreeMap<String, RamNode>>,
    used: Mutex<usize>,
}

impl RamFs {
    pub fn new(label: &'static str) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            String::from("/"),
            RamNode {
                kind: NodeKind::Directory,
                data: Vec::new(),
            },
        );

        RamFs {
            label,
            nodes: Mutex::new(nodes),
            used: Mutex::new(0),
        }
    }

    fn parent_of(path: &str) -> &str {
        let path = path.trim_end_matches('/');
        match path.rfind('/') {
            Some(0) | None => "/",
            Some(i) => &path[..i],
        }
    }

    fn normalize(path: &str) -> String {
        let p = if path.starts_with('/') {
            String::from(path)
        } else {
            alloc::format!("/{}", path)
        };
        if p.len() > 1 && p.ends_with('/') {
            String::from(p.trim_end_matches('/'))
        } else {
            p
        }
    }

    fn insert_node(&self, path: &str, kind: NodeKind) -> Result<()> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.lock();

        if nodes.contains_key(&path) {
            return Err(Errno::Exists);
        }

        let parent = String::from(Self::parent_of(&path));
        let parent_node = nodes.get(&parent).ok_or(Errno::NoEntry)?;
        if parent_node.kind != NodeKind::Directory {
            return Err(Errno::NotDir);
        }

        nodes.insert(
            path,
            RamNode {
                kind,
                data: Vec::new(),
            },
        );
        Ok(())
    }
}

impl FileSystem for RamFs {
    fn name(&self) -> &str {
        self.label
    }

    fn create(&self, path: &str) -> Result<()> {
        self.insert_node(path, NodeKind::File)
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        self.insert_node(path, NodeKind::Directory)
    }

    fn lookup(&self, path: &str) -> Result<Stat> {
        let path = Self::normalize(path);
        let nodes = self.nodes.lock();
        nodes
            .get(&path)
            .map(|n| Stat {
                size: n.data.len() as u64,
                kind: n.kind,
            })
            .ok_or(Errno::NoEntry)
    }

    fn read(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let path = Self::normalize(path);
        let nodes = self.nodes.lock();
        let node = nodes.get(&path).ok_or(Errno::NoEntry)?;

        if node.kind == NodeKind::Directory {
            return Err(Errno::IsDir);
        }

        let offset = offset as usize;
        if offset >= node.data.len() {
            return Ok(0);
        }

        let available = &node.data[offset..];
        let to_read = buf.len().min(available.len());
        buf[..to_read].copy_from_slice(&available[..to_read]);
        Ok(to_read)
    }

    fn write(&self, path: &str, offset: u64, data: &[u8]) -> Result<usize> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.lock();
        let node = nodes.get_mut(&path).ok_or(Errno::NoEntry)?;

        if node.kind == NodeKind::Directory {
            return Err(Errno::IsDir);
        }

        let offset = offset as usize;
        let end = offset + data.len();
        if end > node.data.len() {
            let growth = end - node.data.len();
            let mut used = self.used.lock();
            if *used + growth > RAMFS_CAPACITY {
                return Err(Errno::NoSpace);
            }
            *used += growth;
            node.data.resize(end, 0);
        }
        node.data[offset..end].copy_from_slice(data);

        Ok(data.len())
    }

    fn truncate(&self, path: &str) -> Result<()> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.lock();
        let node = nodes.get_mut(&path).ok_or(Errno::NoEntry)?;

        if node.kind == NodeKind::Directory {
            return Err(Errno::IsDir);
        }

        let mut used = self.used.lock();
        *used -= node.data.len();
        node.data.clear();
        Ok(())
    }
}

lazy_static! {
    pub static ref RAMFS_INSTANCE: RamFs = RamFs::new("ramfs");
    pub static ref TMPFS_INSTANCE: RamFs = RamFs::new("tmpfs");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_write_read() {
        let fs = RamFs::new("test");
        fs.create("/a").unwrap();
        assert_eq!(fs.write("/a", 0, b"hello"), Ok(5));
        let mut buf = [0u8; 16];
        assert_eq!(fs.read("/a", 0, &mut buf), Ok(5));
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(fs.lookup("/a").unwrap().size, 5);
    }

    #[test]
    fn sparse_write_zero_fills() {
        let fs = RamFs::new("test");
        fs.create("/a").unwrap();
        fs.write("/a", 4, b"x").unwrap();
        let mut buf = [0xFFu8; 5];
        assert_eq!(fs.read("/a", 0, &mut buf), Ok(5));
        assert_eq!(&buf, b"\0\0\0\0x");
    }

    #[test]
    fn read_past_end_is_empty() {
        let fs = RamFs::new("test");
        fs.create("/a").unwrap();
        fs.write("/a", 0, b"ab").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(fs.read("/a", 10, &mut buf), Ok(0));
    }

    #[test]
    fn duplicate_create_rejected() {
        let fs = RamFs::new("test");
        fs.create("/a").unwrap();
        assert_eq!(fs.create("/a"), Err(Errno::Exists));
    }

    #[test]
    fn missing_parent_rejected() {
        let fs = RamFs::new("test");
        assert_eq!(fs.create("/no/such/dir/file"), Err(Errno::NoEntry));
    }

    #[test]
    fn directory_io_rejected() {
        let fs = RamFs::new("test");
        fs.mkdir("/d").unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(fs.read("/d", 0, &mut buf), Err(Errno::IsDir));
        assert_eq!(fs.write("/d", 0, b"x"), Err(Errno::IsDir));
    }

    #[test]
    fn truncate_resets_size_and_accounting() {
        let fs = RamFs::new("test");
        fs.create("/a").unwrap();
        fs.write("/a", 0, b"some data").unwrap();
        fs.truncate("/a").unwrap();
        assert_eq!(fs.lookup("/a").unwrap().size, 0);
        assert_eq!(*fs.used.lock(), 0);
    }

    #[test]
    fn capacity_limit_reports_no_space() {
        let fs = RamFs::new("test");
        fs.create("/big").unwrap();
        let chunk = alloc::vec![0u8; RAMFS_CAPACITY];
        fs.write("/big", 0, &chunk).unwrap();
        assert_eq!(fs.write("/big", RAMFS_CAPACITY as u64, b"x"), Err(Errno::NoSpace));
    }
}
