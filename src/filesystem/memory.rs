//! A small filesystem kept entirely in memory
//!
//! Useful as the backing of a jail in tests, or for a scratch tree that
//! never touches disk. Paths may use either path style, chosen when the
//! filesystem is created.

use crate::filesystem::{
    backing::{Backing, EntityType, Stat},
    path::PathStyle,
};
use futures_util::future::{ready, BoxFuture};
use std::{
    collections::BTreeMap,
    io,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::SystemTime,
};

type INodeNum = usize;

const ROOT: INodeNum = 0;

pub struct MemoryFilesystem {
    style: PathStyle,
    table: RwLock<INodeTable>,
}

struct INodeTable {
    style: PathStyle,
    inodes: Vec<Option<Arc<INode>>>,
}

#[derive(Clone)]
struct INode {
    mode: u32,
    created: SystemTime,
    data: Node,
}

#[derive(Debug, Clone, Copy)]
struct DirEntryRef {
    parent: INodeNum,
    child: INodeNum,
}

#[derive(Clone)]
enum Node {
    NormalDirectory(BTreeMap<String, INodeNum>),
    File(Vec<u8>),
    SymbolicLink(String),
}

#[derive(Debug)]
struct Limits {
    path_segment: usize,
    symbolic_link: usize,
}

impl DirEntryRef {
    fn root() -> Self {
        DirEntryRef {
            parent: ROOT,
            child: ROOT,
        }
    }
}

impl Limits {
    fn reset() -> Self {
        Limits {
            path_segment: 1000,
            symbolic_link: 50,
        }
    }

    fn take_path_segment(&mut self) -> io::Result<()> {
        if self.path_segment > 0 {
            self.path_segment -= 1;
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(libc::ENAMETOOLONG))
        }
    }

    fn take_symbolic_link(&mut self) -> io::Result<()> {
        if self.symbolic_link > 0 {
            self.symbolic_link -= 1;
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(libc::ELOOP))
        }
    }
}

fn not_found() -> io::Error {
    io::Error::from_raw_os_error(libc::ENOENT)
}

fn directory_expected() -> io::Error {
    io::Error::from_raw_os_error(libc::ENOTDIR)
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "memory filesystem lock poisoned")
}

fn is_missing(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound || err.raw_os_error() == Some(libc::ENOTDIR)
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        MemoryFilesystem::new()
    }
}

impl MemoryFilesystem {
    /// An empty posix-style filesystem holding only `/`
    pub fn new() -> Self {
        MemoryFilesystem::with_style(PathStyle::Posix)
    }

    /// An empty filesystem with the given path style. The root of a
    /// windows-style filesystem is reachable as any drive.
    pub fn with_style(style: PathStyle) -> Self {
        let mut table = INodeTable {
            style,
            inodes: vec![None],
        };
        table.put_directory(ROOT, ROOT);
        MemoryFilesystem {
            style,
            table: RwLock::new(table),
        }
    }

    fn read(&self) -> io::Result<RwLockReadGuard<'_, INodeTable>> {
        self.table.read().map_err(|_| poisoned())
    }

    fn write(&self) -> io::Result<RwLockWriteGuard<'_, INodeTable>> {
        self.table.write().map_err(|_| poisoned())
    }
}

impl INodeTable {
    fn get_inode(&self, num: INodeNum) -> io::Result<&INode> {
        match self.inodes.get(num) {
            Some(Some(node)) => Ok(node),
            _ => Err(not_found()),
        }
    }

    fn resolve_symlinks(
        &self,
        limits: &mut Limits,
        mut entry: DirEntryRef,
    ) -> io::Result<DirEntryRef> {
        while let Node::SymbolicLink(target) = &self.get_inode(entry.child)?.data {
            log::trace!("following symlink, {:?} -> {:?}", entry, target);
            limits.take_symbolic_link()?;
            entry = self.resolve_path(limits, entry.parent, target)?;
        }
        Ok(entry)
    }

    fn resolve_path_segment(
        &self,
        limits: &mut Limits,
        parent: INodeNum,
        part: &str,
    ) -> io::Result<DirEntryRef> {
        limits.take_path_segment()?;
        match &self.get_inode(parent)?.data {
            Node::NormalDirectory(map) => match map.get(part) {
                None => Err(not_found()),
                Some(child) => Ok(DirEntryRef {
                    parent,
                    child: *child,
                }),
            },
            _ => Err(directory_expected()),
        }
    }

    fn resolve_path(
        &self,
        limits: &mut Limits,
        parent: INodeNum,
        path: &str,
    ) -> io::Result<DirEntryRef> {
        // resolve symlinks in-between steps but not after the last step,
        // the result itself might be a link.
        let mut entry = if self.style.is_absolute(path) {
            DirEntryRef::root()
        } else {
            DirEntryRef {
                parent,
                child: parent,
            }
        };
        for part in self.style.split(path) {
            entry = self.resolve_symlinks(limits, entry)?;
            entry = self.resolve_path_segment(limits, entry.child, part)?;
        }
        Ok(entry)
    }

    fn lookup(&self, path: &str, follow_links: bool) -> io::Result<INodeNum> {
        let mut limits = Limits::reset();
        let entry = self.resolve_path(&mut limits, ROOT, path)?;
        let entry = if follow_links {
            self.resolve_symlinks(&mut limits, entry)?
        } else {
            entry
        };
        Ok(entry.child)
    }

    fn alloc_inode_number(&mut self) -> INodeNum {
        let num = self.inodes.len();
        self.inodes.push(None);
        num
    }

    fn put_inode(&mut self, num: INodeNum, mode: u32, data: Node) {
        assert!(self.inodes[num].is_none());
        self.inodes[num] = Some(Arc::new(INode {
            mode,
            created: SystemTime::now(),
            data,
        }));
    }

    fn put_directory(&mut self, num: INodeNum, parent: INodeNum) {
        let mut map = BTreeMap::new();
        map.insert(".".to_string(), num);
        map.insert("..".to_string(), parent);
        self.put_inode(num, 0o755, Node::NormalDirectory(map));
    }

    /// Find the directory that will hold a new entry, and the entry's name
    fn resolve_parent<'p>(&self, path: &'p str) -> io::Result<(INodeNum, &'p str)> {
        let segments = self.style.split(path);
        let (name, parents) = match segments.split_last() {
            Some((name, parents)) if *name != "." && *name != ".." => (*name, parents),
            _ => return Err(io::Error::from_raw_os_error(libc::EEXIST)),
        };
        let mut limits = Limits::reset();
        let mut entry = DirEntryRef::root();
        for part in parents {
            entry = self.resolve_symlinks(&mut limits, entry)?;
            entry = self.resolve_path_segment(&mut limits, entry.child, part)?;
        }
        let entry = self.resolve_symlinks(&mut limits, entry)?;
        match &self.get_inode(entry.child)?.data {
            Node::NormalDirectory(map) if map.contains_key(name) => {
                Err(io::Error::from_raw_os_error(libc::EEXIST))
            }
            Node::NormalDirectory(_) => Ok((entry.child, name)),
            _ => Err(directory_expected()),
        }
    }

    fn add_child_to_directory(
        &mut self,
        parent: INodeNum,
        name: &str,
        child: INodeNum,
    ) -> io::Result<()> {
        let node = match self.inodes.get_mut(parent) {
            Some(Some(node)) => Arc::make_mut(node),
            _ => return Err(not_found()),
        };
        match &mut node.data {
            Node::NormalDirectory(map) => {
                map.insert(name.to_string(), child);
                Ok(())
            }
            _ => Err(directory_expected()),
        }
    }

    fn write_node(&mut self, path: &str, mode: u32, data: Option<Node>) -> io::Result<()> {
        let (parent, name) = self.resolve_parent(path)?;
        let num = self.alloc_inode_number();
        match data {
            Some(data) => self.put_inode(num, mode, data),
            None => self.put_directory(num, parent),
        }
        self.add_child_to_directory(parent, name, num)
    }

    fn entity_type(&self, path: &str, follow_links: bool) -> io::Result<EntityType> {
        match self.lookup(path, follow_links) {
            Ok(num) => Ok(match &self.get_inode(num)?.data {
                Node::NormalDirectory(_) => EntityType::Directory,
                Node::File(_) => EntityType::File,
                Node::SymbolicLink(_) => EntityType::Link,
            }),
            Err(err) if is_missing(&err) => Ok(EntityType::NotFound),
            Err(err) => Err(err),
        }
    }

    fn read_link(&self, path: &str) -> io::Result<String> {
        match &self.get_inode(self.lookup(path, false)?)?.data {
            Node::SymbolicLink(target) => Ok(target.clone()),
            _ => Err(io::Error::from_raw_os_error(libc::EINVAL)),
        }
    }

    fn stat(&self, path: &str) -> io::Result<Stat> {
        let num = match self.lookup(path, true) {
            Ok(num) => num,
            Err(err) if is_missing(&err) => return Ok(Stat::not_found()),
            Err(err) => return Err(err),
        };
        let inode = self.get_inode(num)?;
        let (entity_type, size) = match &inode.data {
            Node::NormalDirectory(_) => (EntityType::Directory, 0),
            Node::File(contents) => (EntityType::File, contents.len() as i64),
            Node::SymbolicLink(target) => (EntityType::Link, target.len() as i64),
        };
        Ok(Stat {
            changed: Some(inode.created),
            modified: Some(inode.created),
            accessed: Some(inode.created),
            entity_type,
            mode: inode.mode,
            size,
        })
    }

    fn identical(&self, a: &str, b: &str) -> io::Result<bool> {
        Ok(self.lookup(a, false)? == self.lookup(b, false)?)
    }
}

impl Backing for MemoryFilesystem {
    fn style(&self) -> PathStyle {
        self.style
    }

    fn create_dir(&self, path: &str) -> io::Result<()> {
        log::trace!("memory create_dir {:?}", path);
        self.write()?.write_node(path, 0o755, None)
    }

    fn create_file(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        log::trace!("memory create_file {:?}, {} bytes", path, contents.len());
        self.write()?
            .write_node(path, 0o644, Some(Node::File(contents.to_vec())))
    }

    fn create_link(&self, path: &str, target: &str) -> io::Result<()> {
        log::trace!("memory create_link {:?} -> {:?}", path, target);
        self.write()?
            .write_node(path, 0o777, Some(Node::SymbolicLink(target.to_string())))
    }

    fn entity_type(&self, path: &str, follow_links: bool) -> io::Result<EntityType> {
        self.read()?.entity_type(path, follow_links)
    }

    fn read_link(&self, path: &str) -> io::Result<String> {
        self.read()?.read_link(path)
    }

    fn stat(&self, path: &str) -> io::Result<Stat> {
        self.read()?.stat(path)
    }

    fn identical(&self, a: &str, b: &str) -> io::Result<bool> {
        self.read()?.identical(a, b)
    }

    fn entity_type_async<'a>(
        &'a self,
        path: &'a str,
        follow_links: bool,
    ) -> BoxFuture<'a, io::Result<EntityType>> {
        Box::pin(ready(self.entity_type(path, follow_links)))
    }

    fn read_link_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<String>> {
        Box::pin(ready(self.read_link(path)))
    }

    fn create_dir_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(ready(self.create_dir(path)))
    }

    fn stat_async<'a>(&'a self, path: &'a str) -> BoxFuture<'a, io::Result<Stat>> {
        Box::pin(ready(self.stat(path)))
    }

    fn identical_async<'a>(&'a self, a: &'a str, b: &'a str) -> BoxFuture<'a, io::Result<bool>> {
        Box::pin(ready(self.identical(a, b)))
    }
}
