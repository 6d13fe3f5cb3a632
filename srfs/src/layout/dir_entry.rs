//! 目录项
//!
//! 目录的数据是一串紧密排列的目录项，按创建顺序追加，从第一个块的 0 偏移开始：
//!
//! ```text
//! | inode 编号: u64 | 名字长度(含 NUL): u64 | 名字 ... NUL |
//! ```
//!
//! 整数均为小端。目录大小即所有目录项的字节数之和，不超过目录区容量。

use alloc::string::{String, ToString};

use vfs::Error;

use crate::InodeId;
use crate::layout::{Group, InodeInfo};

/// 目录项头部的字节数
pub const HEADER_SIZE: usize = 16;

/// 名为`name`的目录项所占字节数
#[inline]
pub const fn entry_size(name: &str) -> usize {
    HEADER_SIZE + name.len() + 1
}

/// 从目录中取出的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    pub name: String,
    pub inode: InodeId,
    /// 在目录中的字节偏移
    pub offset: u64,
}

impl DirRecord {
    #[inline]
    pub fn size(&self) -> usize {
        entry_size(&self.name)
    }

    /// 下一项的偏移
    #[inline]
    pub fn next(&self) -> u64 {
        self.offset + self.size() as u64
    }
}

struct DirEntryHead {
    inode: u64,
    name_len: u64,
}

impl DirEntryHead {
    fn read(buf: &[u8]) -> Option<Self> {
        let inode = u64::from_le_bytes(buf.get(0..8)?.try_into().ok()?);
        let name_len = u64::from_le_bytes(buf.get(8..16)?.try_into().ok()?);
        Some(Self { inode, name_len })
    }

    fn write(&self, buf: &mut [u8]) {
        buf[0..8].copy_from_slice(&self.inode.to_le_bytes());
        buf[8..16].copy_from_slice(&self.name_len.to_le_bytes());
    }
}

/// 把目录项写进`buf`，`buf`的长度恰为 [`entry_size`]
fn encode(buf: &mut [u8], name: &str, inode: InodeId) {
    DirEntryHead {
        inode: inode.into(),
        name_len: name.len() as u64 + 1,
    }
    .write(buf);
    let name_start = HEADER_SIZE;
    buf[name_start..name_start + name.len()].copy_from_slice(name.as_bytes());
    buf[name_start + name.len()] = 0;
}

/// 解出`region`中`offset`处的目录项：名字、inode 编号、整项字节数
fn decode(region: &[u8], offset: usize) -> Option<(&str, InodeId, usize)> {
    let head = DirEntryHead::read(region.get(offset..)?)?;
    let name_len = usize::try_from(head.name_len).ok().filter(|&len| len > 0)?;
    let name_start = offset + HEADER_SIZE;
    let (&nul, name) = region
        .get(name_start..name_start.checked_add(name_len)?)?
        .split_last()?;
    if nul != 0 {
        return None;
    }
    let name = core::str::from_utf8(name).ok()?;

    Some((name, InodeId::from(head.inode), HEADER_SIZE + name_len))
}

impl InodeInfo {
    /// 在目录末尾追加一项。
    ///
    /// 目录区放不下时报`NoSpace`，目录保持原样。
    pub fn add_entry(&mut self, name: &str, inode: InodeId, group: &Group) -> Result<(), Error> {
        if !self.is_dir() {
            return Err(Error::NotADirectory);
        }

        let size = entry_size(name);
        if self.block_count() == 0 {
            group.alloc_block(self)?;
        }

        let offset = self.size() as usize;
        if offset + size > group.dir_region_size() {
            log::warn!(
                "dir {}: no room for {name:?}, {offset} of {} bytes used",
                self.id(),
                group.dir_region_size()
            );
            return Err(Error::NoSpace);
        }

        let block = group.chain(self).next().ok_or(Error::NoSpace)?;
        block.map_mut(|data| encode(&mut data[offset..offset + size], name, inode));
        self.grow_size((offset + size) as u64);

        log::debug!("dir {}: add {name:?} -> {inode} at {offset}", self.id());

        Ok(())
    }

    /// 按名字线性查找，完全匹配
    pub fn find_entry(&self, name: &str, group: &Group) -> Result<InodeId, Error> {
        if !self.is_dir() {
            return Err(Error::NotADirectory);
        }
        let Some(block) = group.chain(self).next() else {
            return Err(Error::NotFound);
        };

        let size = self.size() as usize;
        block.map(|data| {
            let region = &data[..size];
            let mut offset = 0;
            while let Some((entry, inode, len)) = decode(region, offset) {
                if entry == name {
                    return Ok(inode);
                }
                offset += len;
            }
            Err(Error::NotFound)
        })
    }

    /// `offset`处的目录项，越过末尾则为`None`
    pub fn entry_at(&self, offset: u64, group: &Group) -> Result<Option<DirRecord>, Error> {
        if !self.is_dir() {
            return Err(Error::NotADirectory);
        }
        if offset >= self.size() {
            return Ok(None);
        }
        let Some(block) = group.chain(self).next() else {
            return Ok(None);
        };

        let size = self.size() as usize;
        Ok(block.map(|data| {
            decode(&data[..size], offset as usize).map(|(name, inode, _)| DirRecord {
                name: name.to_string(),
                inode,
                offset,
            })
        }))
    }
}
