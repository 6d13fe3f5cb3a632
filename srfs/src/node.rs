//! # 索引节点层
//!
//! 宿主看到的对象：[`Inode`]是文件系统中的一个节点，
//! [`File`]是一次打开，带着自己的读写位置。

use alloc::sync::Arc;
use alloc::vec::Vec;

use enumflags2::{BitFlags, bitflags};
use spin::Mutex;
use vfs::{DirEntry, DirEntryType, DirSink, Error, Mode, Permission, ReadBuf, Stat, WriteBuf};

use crate::{InodeId, RamFileSystem};

#[derive(Debug, Clone)]
pub struct Inode {
    fs: Arc<RamFileSystem>,
    id: InodeId,
}

impl Inode {
    #[inline]
    pub fn new(fs: Arc<RamFileSystem>, id: InodeId) -> Self {
        Self { fs, id }
    }

    #[inline]
    pub fn id(&self) -> InodeId {
        self.id
    }

    #[inline]
    pub fn fs(&self) -> &Arc<RamFileSystem> {
        &self.fs
    }

    pub fn kind(&self) -> Result<DirEntryType, Error> {
        self.fs.kind_of(self.id)
    }

    /// 目录
    pub fn lookup(&self, name: &str) -> Result<Self, Error> {
        let id = self.fs.lookup(self.id, name)?;
        Ok(Self::new(self.fs.clone(), id))
    }

    /// 目录
    ///
    /// # 参数
    ///
    /// `relat_path`: 相对于[`Inode`]的路径，以`/`分隔，空的部分被忽略。
    pub fn find(&self, relat_path: &str) -> Result<Self, Error> {
        let mut inode = self.clone();
        for cmp in relat_path.split('/').filter(|cmp| !cmp.is_empty()) {
            if inode.kind()? != DirEntryType::Directory {
                log::error!("middle segment {cmp:?} isn't under a directory");
                return Err(Error::NotADirectory);
            }
            inode = inode.lookup(cmp)?;
        }
        Ok(inode)
    }

    /// 目录
    pub fn create(&self, name: &str, mode: Mode) -> Result<Self, Error> {
        let id = self.fs.create_entry(self.id, name, mode)?;
        Ok(Self::new(self.fs.clone(), id))
    }

    /// 目录
    #[inline]
    pub fn create_file(&self, name: &str, perm: BitFlags<Permission>) -> Result<Self, Error> {
        self.create(name, Mode::regular(perm))
    }

    /// 目录
    #[inline]
    pub fn mkdir(&self, name: &str, perm: BitFlags<Permission>) -> Result<Self, Error> {
        self.create(name, Mode::directory(perm))
    }

    /// 文件
    #[inline]
    pub fn read_at<B>(&self, offset: u64, buf: &mut B) -> Result<usize, Error>
    where
        B: ReadBuf + ?Sized,
    {
        self.fs.read_at(self.id, offset, buf)
    }

    /// 文件
    #[inline]
    pub fn write_at<B>(&self, offset: u64, buf: &B) -> Result<usize, Error>
    where
        B: WriteBuf + ?Sized,
    {
        self.fs.write_at(self.id, offset, buf)
    }

    /// 目录
    ///
    /// 从`at`开始把目录项交给`sink`，返回下次开始的位置。
    pub fn ls_at<S>(&self, at: u64, sink: &mut S) -> Result<u64, Error>
    where
        S: DirSink + ?Sized,
    {
        let mut pos = at;
        self.fs.enumerate(self.id, &mut pos, sink)?;
        Ok(pos)
    }

    /// 目录
    pub fn ls(&self) -> Result<Vec<DirEntry>, Error> {
        let mut entries: Vec<DirEntry> = Vec::new();
        self.ls_at(0, &mut entries)?;
        Ok(entries)
    }

    pub fn stat(&self) -> Result<Stat, Error> {
        self.fs.stat(self.id)
    }
}

#[rustfmt::skip]
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    Read   = 0b001,
    Write  = 0b010,
    /// 每次写之前把位置移到文件末尾
    Append = 0b100,
}

/// 表示一次打开的文件或目录
#[derive(Debug)]
pub struct File {
    flags: BitFlags<OpenFlag>,
    inode: Inode,
    /// 文件内的字节偏移；对目录而言是目录项的字节偏移
    offset: Mutex<u64>,
}

impl File {
    #[inline]
    pub fn new(inode: Inode, flags: BitFlags<OpenFlag>) -> Self {
        Self {
            flags,
            inode,
            offset: Mutex::new(0),
        }
    }

    /// 打开`dir`下`path`所指的节点
    pub fn open(dir: &Inode, path: &str, flags: BitFlags<OpenFlag>) -> Result<Self, Error> {
        Ok(Self::new(dir.find(path)?, flags))
    }

    #[inline]
    pub fn inode(&self) -> &Inode {
        &self.inode
    }

    #[inline]
    pub fn readable(&self) -> bool {
        self.flags.contains(OpenFlag::Read)
    }

    #[inline]
    pub fn writable(&self) -> bool {
        self.flags.intersects(OpenFlag::Write | OpenFlag::Append)
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        *self.offset.lock()
    }

    #[inline]
    pub fn seek(&self, pos: u64) {
        *self.offset.lock() = pos;
    }

    pub fn read<B>(&self, buf: &mut B) -> Result<usize, Error>
    where
        B: ReadBuf + ?Sized,
    {
        if !self.readable() {
            return Err(Error::AccessDenied);
        }

        let mut offset = self.offset.lock();
        let read_size = self.inode.read_at(*offset, buf)?;
        *offset += read_size as u64;
        Ok(read_size)
    }

    pub fn write<B>(&self, buf: &B) -> Result<usize, Error>
    where
        B: WriteBuf + ?Sized,
    {
        if !self.writable() {
            return Err(Error::AccessDenied);
        }

        let mut offset = self.offset.lock();
        if self.flags.contains(OpenFlag::Append) {
            *offset = self.inode.stat()?.size;
        }
        let write_size = self.inode.write_at(*offset, buf)?;
        *offset += write_size as u64;
        Ok(write_size)
    }

    /// 从当前位置读到文件末尾
    pub fn read_all(&self) -> Result<Vec<u8>, Error> {
        let mut buffer = [0u8; 512];

        let mut bytes = Vec::new();
        loop {
            match self.read(&mut buffer[..]) {
                Ok(len) => bytes.extend_from_slice(&buffer[..len]),
                Err(Error::InvalidOffset) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(bytes)
    }

    /// 从当前位置继续枚举目录，返回消耗的目录字节数
    pub fn getdents<S>(&self, sink: &mut S) -> Result<u64, Error>
    where
        S: DirSink + ?Sized,
    {
        if !self.readable() {
            return Err(Error::AccessDenied);
        }

        let mut offset = self.offset.lock();
        let start = *offset;
        *offset = self.inode.ls_at(start, sink)?;
        Ok(*offset - start)
    }

    #[inline]
    pub fn stat(&self) -> Result<Stat, Error> {
        self.inode.stat()
    }
}
