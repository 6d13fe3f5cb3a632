//! 文件系统的规格与常量

use enumflags2::{BitFlags, make_bitflags};
use vfs::{Error, Permission};

use crate::id;

pub const MAGIC: u64 = 0x2016_0622;
pub const VERSION: u64 = 1;

pub const GROUP_NR: usize = 1;
pub const GROUP_INODE_NR: usize = 128;
pub const GROUP_DATA_BLOCK_NR: usize = 16;
pub const BLOCK_SIZE: usize = 1024;

/// 只有此分组内的 inode 可写
pub const PRIMARY_GROUP: usize = 0;

/// rwxrwxr-x
pub const ROOT_PERM: BitFlags<Permission> = make_bitflags!(Permission::{
    OwnerRead | OwnerWrite | OwnerExec | GroupRead | GroupWrite | GroupExec | OtherRead | OtherExec
});

/// rw-r--r--
pub const FILE_PERM: BitFlags<Permission> =
    make_bitflags!(Permission::{OwnerRead | OwnerWrite | GroupRead | OtherRead});

/// 挂载时确定、之后不再改变的容量规格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub groups: usize,
    pub inodes_per_group: usize,
    pub blocks_per_group: usize,
    pub block_size: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            groups: GROUP_NR,
            inodes_per_group: GROUP_INODE_NR,
            blocks_per_group: GROUP_DATA_BLOCK_NR,
            block_size: BLOCK_SIZE,
        }
    }
}

impl Geometry {
    /// 至少要放得下根目录的`.`与`..`
    pub const MIN_BLOCK_SIZE: usize = 64;

    pub fn validate(&self) -> Result<(), Error> {
        let slots_fit = |n: usize| n > 0 && (n as u64) <= id::SLOT_LIMIT;

        if self.groups == 0
            || (self.groups as u64) > id::GROUP_LIMIT
            || !slots_fit(self.inodes_per_group)
            || !slots_fit(self.blocks_per_group)
            || self.block_size < Self::MIN_BLOCK_SIZE
        {
            log::error!("invalid geometry: {self:?}");
            return Err(Error::InvalidGeometry);
        }

        Ok(())
    }

    /// 目录区域的容量。
    ///
    /// 目录项只写进目录的第一个块，所以一个目录最多占一个块的字节。
    #[inline]
    pub const fn dir_region_size(&self) -> usize {
        self.block_size
    }

    /// 全部分组的数据区字节数
    #[inline]
    pub const fn data_bytes(&self) -> usize {
        self.groups * self.blocks_per_group * self.block_size
    }
}
