//! 对象编号
//!
//! inode 与数据块都由`(分组, 槽位)`编码出全局编号：
//! 分组序号放在 [`GROUP_NR_OFFSET`] 位以上，槽位放在以下，再整体加上 [`INODE_ID_BASE`]。
//! 宿主把 0 号 inode 视为非法，所以编号从`0x100`开始。
//! 由编号反推分组是 O(1) 的。

use derive_more::{Display, From, Into};

pub const INODE_ID_BASE: u64 = 0x100;
pub const GROUP_NR_OFFSET: u32 = 32;

const SLOT_MASK: u64 = (1 << GROUP_NR_OFFSET) - 1;

/// 分组数量上限
pub(crate) const GROUP_LIMIT: u64 = u32::MAX as u64;
/// 组内槽位数量上限
pub(crate) const SLOT_LIMIT: u64 = 1 << GROUP_NR_OFFSET;

#[inline]
pub const fn encode(group: usize, slot: usize) -> u64 {
    (((group as u64) << GROUP_NR_OFFSET) | slot as u64) + INODE_ID_BASE
}

/// 小于 [`INODE_ID_BASE`] 的编号没有对应的对象
#[inline]
pub const fn decode(id: u64) -> Option<(usize, usize)> {
    match id.checked_sub(INODE_ID_BASE) {
        Some(raw) => Some(((raw >> GROUP_NR_OFFSET) as usize, (raw & SLOT_MASK) as usize)),
        None => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[display(fmt = "{:#x}", _0)]
#[repr(transparent)]
pub struct InodeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[display(fmt = "{:#x}", _0)]
#[repr(transparent)]
pub struct BlockId(u64);

impl InodeId {
    #[inline]
    pub const fn new(group: usize, slot: usize) -> Self {
        Self(encode(group, slot))
    }

    #[inline]
    pub const fn decode(self) -> Option<(usize, usize)> {
        decode(self.0)
    }

    /// 所属分组，非法编号返回`None`
    #[inline]
    pub const fn group(self) -> Option<usize> {
        match self.decode() {
            Some((group, _)) => Some(group),
            None => None,
        }
    }
}

impl BlockId {
    #[inline]
    pub const fn new(group: usize, slot: usize) -> Self {
        Self(encode(group, slot))
    }

    #[inline]
    pub const fn decode(self) -> Option<(usize, usize)> {
        decode(self.0)
    }
}
