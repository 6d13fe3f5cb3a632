//! # 控制层
//!
//! 超级块 + 分组表。
//! 新 inode 按轮转选取分组，目录与文件操作按 inode 编号派发到所属分组。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;
use vfs::{DirEntry, DirEntryType, DirSink, Error, Mode, ReadBuf, Stat, StatFs, WriteBuf};

use crate::config::{self, Geometry};
use crate::layout::{DirRecord, Group, InodeInfo};
use crate::{BlockId, Inode, InodeId};

#[derive(Debug)]
pub struct RamFileSystem {
    magic: u64,
    version: u64,
    geometry: Geometry,
    groups: Box<[Group]>,
    /// 上一次分配 inode 的分组
    last_group: Mutex<usize>,
    root: InodeId,
}

impl RamFileSystem {
    /// 挂载：建立所有分组，创建根目录。
    ///
    /// 根目录的`.`与`..`都指向它自己。
    pub fn new(geometry: Geometry) -> Result<Arc<Self>, Error> {
        geometry.validate()?;

        let mut groups = Vec::new();
        groups
            .try_reserve_exact(geometry.groups)
            .map_err(|_| Error::AllocationFailure)?;
        for index in 0..geometry.groups {
            match Group::new(index, &geometry) {
                Ok(group) => groups.push(group),
                Err(e) => {
                    // 已建立的分组随 groups 一同释放
                    log::error!("mount failed at group {index}: {e}");
                    return Err(e);
                }
            }
        }

        let mut fs = Self {
            magic: config::MAGIC,
            version: config::VERSION,
            geometry,
            groups: groups.into_boxed_slice(),
            last_group: Mutex::new(0),
            root: InodeId::from(0),
        };

        let root = fs.alloc_inode(Mode::directory(config::ROOT_PERM))?;
        fs.add_entry(root, ".", root)?;
        fs.add_entry(root, "..", root)?;
        fs.root = root;

        log::info!(
            "mounted: magic {:#x}, {} groups, {} bytes of data, root {root}",
            fs.magic,
            fs.groups.len(),
            geometry.data_bytes()
        );

        Ok(Arc::new(fs))
    }

    #[inline]
    pub fn root(self: &Arc<Self>) -> Inode {
        Inode::new(self.clone(), self.root)
    }

    #[inline]
    pub fn root_id(&self) -> InodeId {
        self.root
    }

    #[inline]
    pub fn magic(&self) -> u64 {
        self.magic
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// 轮转到下一个分组分配 inode。
    ///
    /// 该分组耗尽即失败，不会去别的分组找；失败时轮转位置不变。
    pub fn alloc_inode(&self, mode: Mode) -> Result<InodeId, Error> {
        let mut last_group = self.last_group.lock();
        let next = (*last_group + 1) % self.groups.len();
        let id = self.groups[next].alloc_inode(mode)?;
        *last_group = next;
        Ok(id)
    }

    /// 宿主回收 inode 对象时调用。
    ///
    /// 引擎不缓存 inode 的临时状态，只确认它仍然有效。
    pub fn recycle_inode(&self, id: InodeId) -> Result<(), Error> {
        self.with_inode(id, |inode, _| {
            log::debug!("recycle inode {}", inode.id());
            Ok(())
        })
    }

    /// 归还 inode 及其块链
    pub fn release_inode(&self, id: InodeId) -> Result<(), Error> {
        self.with_inode(id, |inode, group| {
            group.release_inode(inode);
            Ok(())
        })
    }

    /// 为`id`分配一个块，接在块链末尾
    pub fn alloc_block(&self, id: InodeId) -> Result<BlockId, Error> {
        self.with_inode(id, |inode, group| group.alloc_block(inode))
    }

    fn locate(&self, id: InodeId) -> Result<(&Group, &Mutex<InodeInfo>), Error> {
        let (group, slot) = id.decode().ok_or(Error::InvalidInode)?;
        let group = self.groups.get(group).ok_or(Error::InvalidInode)?;
        let inode = group.inode(slot).ok_or(Error::InvalidInode)?;
        Ok((group, inode))
    }

    /// 锁住`id`的描述符后执行`f`
    fn with_inode<V>(
        &self,
        id: InodeId,
        f: impl FnOnce(&mut InodeInfo, &Group) -> Result<V, Error>,
    ) -> Result<V, Error> {
        let (group, inode) = self.locate(id)?;
        let mut inode = inode.lock();
        if !inode.is_in_use() {
            return Err(Error::InvalidInode);
        }
        f(&mut *inode, group)
    }

    pub fn add_entry(&self, dir: InodeId, name: &str, target: InodeId) -> Result<(), Error> {
        self.with_inode(dir, |inode, group| inode.add_entry(name, target, group))
            .inspect_err(|e| log::error!("dir {dir}: failed to add {name:?}: {e}"))
    }

    pub fn lookup(&self, dir: InodeId, name: &str) -> Result<InodeId, Error> {
        self.with_inode(dir, |inode, group| inode.find_entry(name, group))
    }

    pub fn kind_of(&self, id: InodeId) -> Result<DirEntryType, Error> {
        self.with_inode(id, |inode, _| Ok(inode.mode().ty))
    }

    /// 从`start`开始的目录项，逐项加锁读取
    pub fn entries(&self, dir: InodeId, start: u64) -> Result<DirEntries<'_>, Error> {
        self.with_inode(dir, |inode, _| {
            if inode.is_dir() {
                Ok(())
            } else {
                Err(Error::NotADirectory)
            }
        })?;

        Ok(DirEntries {
            fs: self,
            dir,
            offset: start,
            error: None,
        })
    }

    /// 从`*pos`开始把目录项交给`sink`，直到目录末尾或被拒收。
    ///
    /// 每交付成功一项，`*pos`前进到下一项。
    /// 目标 inode 不再有效的项照常交付，类型为 [`DirEntryType::Unknown`]。
    pub fn enumerate<S>(&self, dir: InodeId, pos: &mut u64, sink: &mut S) -> Result<(), Error>
    where
        S: DirSink + ?Sized,
    {
        let mut entries = self.entries(dir, *pos)?;
        for record in entries.by_ref() {
            let next = record.next();
            let entry = DirEntry {
                inode: record.inode.into(),
                ty: self.kind_of(record.inode).unwrap_or(DirEntryType::Unknown),
                name: record.name,
            };
            if !sink.accept(entry) {
                break;
            }
            *pos = next;
        }

        match entries.error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// 在`dir`下创建名为`name`的文件或目录。
    ///
    /// 新目录先写入`.`与`..`。任何一步失败，新分配的 inode 都会被归还。
    pub fn create_entry(&self, dir: InodeId, name: &str, mode: Mode) -> Result<InodeId, Error> {
        if name.is_empty() || name.contains(['/', '\0']) {
            return Err(Error::InvalidName);
        }
        match self.lookup(dir, name) {
            Ok(_) => return Err(Error::AlreadyExists),
            Err(Error::NotFound) => {}
            Err(e) => return Err(e),
        }

        let id = self.alloc_inode(mode)?;
        if let Err(e) = self.link(dir, name, id, mode) {
            if let Err(e) = self.release_inode(id) {
                log::warn!("failed to release inode {id}: {e}");
            }
            return Err(e);
        }

        log::debug!("dir {dir}: created {name:?} -> {id}");

        Ok(id)
    }

    fn link(&self, dir: InodeId, name: &str, id: InodeId, mode: Mode) -> Result<(), Error> {
        if mode.is_dir() {
            self.add_entry(id, ".", id)?;
            self.add_entry(id, "..", dir)?;
        }

        self.with_inode(dir, |inode, group| match inode.find_entry(name, group) {
            Ok(_) => Err(Error::AlreadyExists),
            Err(Error::NotFound) => inode.add_entry(name, id, group),
            Err(e) => Err(e),
        })
    }

    pub fn read_at<B>(&self, id: InodeId, offset: u64, buf: &mut B) -> Result<usize, Error>
    where
        B: ReadBuf + ?Sized,
    {
        self.with_inode(id, |inode, group| {
            if inode.is_dir() {
                return Err(Error::IsADirectory);
            }
            inode.read_at(offset, buf, group)
        })
    }

    pub fn write_at<B>(&self, id: InodeId, offset: u64, buf: &B) -> Result<usize, Error>
    where
        B: WriteBuf + ?Sized,
    {
        self.with_inode(id, |inode, group| {
            if inode.is_dir() {
                return Err(Error::IsADirectory);
            }
            inode.write_at(offset, buf, group)
        })
    }

    pub fn stat(&self, id: InodeId) -> Result<Stat, Error> {
        self.with_inode(id, |inode, group| Ok(inode.stat(group.block_size())))
    }

    pub fn statfs(&self) -> StatFs {
        let mut statfs = StatFs {
            magic: self.magic,
            block_size: self.geometry.block_size as u64,
            groups: self.groups.len() as u64,
            total_inodes: 0,
            free_inodes: 0,
            total_blocks: 0,
            free_blocks: 0,
        };
        for group in &self.groups {
            statfs.total_inodes += group.inode_count() as u64;
            statfs.free_inodes += group.free_inodes() as u64;
            statfs.total_blocks += group.block_count() as u64;
            statfs.free_blocks += group.free_blocks() as u64;
        }
        statfs
    }
}

impl Drop for RamFileSystem {
    fn drop(&mut self) {
        log::info!("unmounted, {} groups freed", self.groups.len());
    }
}

/// 目录项迭代器。
///
/// 不持有目录的锁，每取一项锁一次；可以从任意一项的偏移重新开始。
/// 读取出错时迭代结束，错误由 [`DirEntries::error`] 取得。
#[derive(Debug)]
pub struct DirEntries<'a> {
    fs: &'a RamFileSystem,
    dir: InodeId,
    offset: u64,
    error: Option<Error>,
}

impl DirEntries<'_> {
    /// 下一项的偏移
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 使迭代提前结束的错误
    #[inline]
    pub fn error(&self) -> Option<Error> {
        self.error
    }
}

impl Iterator for DirEntries<'_> {
    type Item = DirRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }

        let offset = self.offset;
        match self
            .fs
            .with_inode(self.dir, |inode, group| inode.entry_at(offset, group))
        {
            Ok(Some(record)) => {
                self.offset = record.next();
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("dir {}: listing stopped at {offset}: {e}", self.dir);
                self.error = Some(e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use vfs::Resource;

    use super::*;
    use crate::config::{FILE_PERM, ROOT_PERM};
    use crate::entry_size;

    fn geometry(groups: usize, inodes: usize, blocks: usize, block_size: usize) -> Geometry {
        Geometry {
            groups,
            inodes_per_group: inodes,
            blocks_per_group: blocks,
            block_size,
        }
    }

    fn names(fs: &RamFileSystem, dir: InodeId) -> Vec<(String, InodeId)> {
        fs.entries(dir, 0)
            .unwrap()
            .map(|record| (record.name, record.inode))
            .collect()
    }

    /// 收下`quota`项后拒收
    struct Quota {
        quota: usize,
        entries: Vec<DirEntry>,
    }

    impl DirSink for Quota {
        fn accept(&mut self, entry: DirEntry) -> bool {
            if self.entries.len() == self.quota {
                return false;
            }
            self.entries.push(entry);
            true
        }
    }

    #[test]
    fn mount_seeds_root() {
        let fs = RamFileSystem::new(Geometry::default()).unwrap();
        let root = fs.root_id();

        assert_eq!(config::MAGIC, fs.magic());
        assert_eq!(InodeId::new(0, 0), root);
        assert_eq!(
            vec![(".".to_string(), root), ("..".to_string(), root)],
            names(&fs, root)
        );

        let stat = fs.stat(root).unwrap();
        assert_eq!(0o040775, stat.mode.bits());
        assert_eq!((entry_size(".") + entry_size("..")) as u64, stat.size);
        assert_eq!(1, stat.blocks);

        let statfs = fs.statfs();
        assert_eq!(127, statfs.free_inodes);
        assert_eq!(15, statfs.free_blocks);
    }

    #[test]
    fn reject_geometry() {
        assert_eq!(
            Err(Error::InvalidGeometry),
            RamFileSystem::new(geometry(0, 4, 4, 1024)).map(|_| ())
        );
    }

    #[test]
    fn round_robin() {
        let fs = RamFileSystem::new(geometry(2, 4, 4, 1024)).unwrap();
        let root = fs.root_id();
        assert_eq!(Some(1), root.group());

        let a = fs.create_entry(root, "a", Mode::regular(FILE_PERM)).unwrap();
        let b = fs.create_entry(root, "b", Mode::regular(FILE_PERM)).unwrap();
        let c = fs.create_entry(root, "c", Mode::regular(FILE_PERM)).unwrap();
        assert_eq!(InodeId::new(0, 0), a);
        assert_eq!(InodeId::new(1, 1), b);
        assert_eq!(InodeId::new(0, 1), c);

        assert_eq!(Ok(3), fs.write_at(a, 0, &b"abc"[..]));
        assert_eq!(Err(Error::NotWritable), fs.write_at(b, 0, &b"abc"[..]));
    }

    #[test]
    fn no_fallback_group() {
        let fs = RamFileSystem::new(geometry(2, 1, 4, 1024)).unwrap();
        let root = fs.root_id();
        fs.create_entry(root, "a", Mode::regular(FILE_PERM)).unwrap();

        // 分组 0 已满，分组 1 只剩根目录占着的槽位
        for _ in 0..2 {
            assert_eq!(
                Err(Error::Exhausted(Resource::Inode)),
                fs.create_entry(root, "b", Mode::regular(FILE_PERM))
            );
        }
        assert_eq!(Err(Error::NotFound), fs.lookup(root, "b"));
        assert_eq!(0, fs.statfs().free_inodes);
    }

    #[test]
    fn create_rejects() {
        let fs = RamFileSystem::new(Geometry::default()).unwrap();
        let root = fs.root_id();
        let file = Mode::regular(FILE_PERM);

        for name in ["", "a/b", "a\0"] {
            assert_eq!(Err(Error::InvalidName), fs.create_entry(root, name, file));
        }

        let a = fs.create_entry(root, "a", file).unwrap();
        assert_eq!(Err(Error::AlreadyExists), fs.create_entry(root, "a", file));
        assert_eq!(Err(Error::NotADirectory), fs.create_entry(a, "b", file));
        assert_eq!(Err(Error::IsADirectory), fs.read_at(root, 0, &mut [0u8; 4][..]));
    }

    #[test]
    fn failed_link_releases_inode() {
        let fs = RamFileSystem::new(geometry(1, 8, 8, 64)).unwrap();
        let root = fs.root_id();
        let file = Mode::regular(FILE_PERM);
        // 18 + 19 + 27 == 64
        fs.create_entry(root, "abcdefghij", file).unwrap();
        let free = fs.statfs();

        assert_eq!(Err(Error::NoSpace), fs.create_entry(root, "z", file));
        assert_eq!(
            Err(Error::NoSpace),
            fs.create_entry(root, "d", Mode::directory(ROOT_PERM))
        );
        assert_eq!(free, fs.statfs());
    }

    #[test]
    fn mkdir_seeds_dots() {
        let fs = RamFileSystem::new(Geometry::default()).unwrap();
        let root = fs.root_id();
        let dir = fs
            .create_entry(root, "d", Mode::directory(ROOT_PERM))
            .unwrap();

        assert_eq!(
            vec![(".".to_string(), dir), ("..".to_string(), root)],
            names(&fs, dir)
        );
        assert_eq!(Ok(DirEntryType::Directory), fs.kind_of(dir));
    }

    #[test]
    fn release_returns_blocks() {
        let fs = RamFileSystem::new(Geometry::default()).unwrap();
        let before = fs.statfs();

        let id = fs.alloc_inode(Mode::regular(FILE_PERM)).unwrap();
        assert_eq!(Ok(3000), fs.write_at(id, 0, &[7u8; 3000][..]));
        assert_eq!(before.free_blocks - 3, fs.statfs().free_blocks);

        fs.recycle_inode(id).unwrap();
        fs.release_inode(id).unwrap();
        assert_eq!(before, fs.statfs());
        assert_eq!(Err(Error::InvalidInode), fs.stat(id));
        assert_eq!(Err(Error::InvalidInode), fs.release_inode(id));
    }

    #[test]
    fn enumerate_resumes() {
        let fs = RamFileSystem::new(Geometry::default()).unwrap();
        let root = fs.root_id();
        let a = fs.create_entry(root, "a", Mode::regular(FILE_PERM)).unwrap();

        let mut pos = 0;
        let mut sink = Quota {
            quota: 1,
            entries: Vec::new(),
        };
        fs.enumerate(root, &mut pos, &mut sink).unwrap();
        assert_eq!(entry_size(".") as u64, pos);
        assert_eq!(".", sink.entries[0].name);

        let mut rest: Vec<DirEntry> = Vec::new();
        fs.enumerate(root, &mut pos, &mut rest).unwrap();
        assert_eq!(2, rest.len());
        assert_eq!("a", rest[1].name);
        assert_eq!(u64::from(a), rest[1].inode);
        assert_eq!(DirEntryType::Regular, rest[1].ty);
        assert_eq!(fs.stat(root).unwrap().size, pos);

        let mut none: Vec<DirEntry> = Vec::new();
        fs.enumerate(root, &mut pos, &mut none).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn enumerate_dangling_targets() {
        let fs = RamFileSystem::new(Geometry::default()).unwrap();
        let dir = fs
            .create_entry(fs.root_id(), "d", Mode::directory(ROOT_PERM))
            .unwrap();
        fs.add_entry(dir, "a", InodeId::from(10)).unwrap();
        fs.add_entry(dir, "b", InodeId::from(11)).unwrap();

        let mut pos = (entry_size(".") + entry_size("..")) as u64;
        let mut entries: Vec<DirEntry> = Vec::new();
        fs.enumerate(dir, &mut pos, &mut entries).unwrap();
        assert_eq!(
            vec![
                DirEntry {
                    inode: 10,
                    ty: DirEntryType::Unknown,
                    name: "a".to_string(),
                },
                DirEntry {
                    inode: 11,
                    ty: DirEntryType::Unknown,
                    name: "b".to_string(),
                },
            ],
            entries
        );
        assert_eq!(fs.stat(dir).unwrap().size, pos);
    }

    #[test]
    fn list_after_child_released() {
        let fs = RamFileSystem::new(Geometry::default()).unwrap();
        let root = fs.root_id();
        let f = fs.create_entry(root, "f", Mode::regular(FILE_PERM)).unwrap();
        fs.release_inode(f).unwrap();

        let mut pos = 0;
        let mut entries: Vec<DirEntry> = Vec::new();
        fs.enumerate(root, &mut pos, &mut entries).unwrap();
        assert_eq!(3, entries.len());
        assert_eq!(DirEntryType::Unknown, entries[2].ty);
        assert_eq!(DirEntryType::Directory, entries[0].ty);
    }

    #[test]
    fn entries_keep_error() {
        let fs = RamFileSystem::new(Geometry::default()).unwrap();
        let dir = fs
            .create_entry(fs.root_id(), "d", Mode::directory(ROOT_PERM))
            .unwrap();

        let mut entries = fs.entries(dir, 0).unwrap();
        assert_eq!(".", entries.next().unwrap().name);
        fs.release_inode(dir).unwrap();
        assert_eq!(None, entries.next());
        assert_eq!(Some(Error::InvalidInode), entries.error());
        assert_eq!(None, entries.next());
        assert_eq!(entry_size(".") as u64, entries.offset());
    }

    #[test]
    fn invalid_ids() {
        let fs = RamFileSystem::new(Geometry::default()).unwrap();
        assert_eq!(Err(Error::InvalidInode), fs.stat(InodeId::from(0)));
        assert_eq!(Err(Error::InvalidInode), fs.stat(InodeId::new(5, 0)));
        assert_eq!(Err(Error::InvalidInode), fs.stat(InodeId::new(0, 1000)));
        assert_eq!(Err(Error::InvalidInode), fs.stat(InodeId::new(0, 1)));
    }
}
