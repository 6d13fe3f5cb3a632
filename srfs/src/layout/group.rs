//! 分组：容量管理与分配局部性的单位
//!
//! 每个分组独占一组 inode 描述符与一组数据块，各配一条空闲队列。
//! 队列里存的是组内槽位，初始化时按编号升序排列；分配从队头取，归还放到队尾。
//! 任一时刻，空闲队列与已分配对象恰好划分全部槽位。

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use spin::Mutex;
use vfs::{Error, Mode, Resource};

use crate::config::Geometry;
use crate::layout::{Block, InodeInfo};
use crate::{BlockId, InodeId};

#[derive(Debug)]
pub struct Group {
    id: usize,
    block_size: usize,
    dir_region_size: usize,
    inodes: Box<[Mutex<InodeInfo>]>,
    blocks: Box<[Block]>,
    inode_free: Mutex<VecDeque<usize>>,
    block_free: Mutex<VecDeque<usize>>,
}

impl Group {
    /// 建立第`index`个分组。任何一步分配失败，已分配的部分随之释放。
    pub fn new(index: usize, geometry: &Geometry) -> Result<Self, Error> {
        let inodes = try_build(geometry.inodes_per_group, |slot| {
            Ok(Mutex::new(InodeInfo::new(InodeId::new(index, slot), slot)))
        })?;
        let blocks = try_build(geometry.blocks_per_group, |slot| {
            Block::new(BlockId::new(index, slot), geometry.block_size)
        })?;

        let group = Self {
            id: index,
            block_size: geometry.block_size,
            dir_region_size: geometry.dir_region_size().min(geometry.block_size),
            inode_free: free_queue(inodes.len())?,
            block_free: free_queue(blocks.len())?,
            inodes,
            blocks,
        };

        log::info!(
            "group {index}: {} inodes, {} blocks x {} bytes",
            group.inode_count(),
            group.block_count(),
            group.block_size
        );

        Ok(group)
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn dir_region_size(&self) -> usize {
        self.dir_region_size
    }

    #[inline]
    pub fn inode_count(&self) -> usize {
        self.inodes.len()
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn free_inodes(&self) -> usize {
        self.inode_free.lock().len()
    }

    pub fn free_blocks(&self) -> usize {
        self.block_free.lock().len()
    }

    /// 空闲 inode 槽位的快照，按出队顺序
    pub fn free_inode_slots(&self) -> Vec<usize> {
        self.inode_free.lock().iter().copied().collect()
    }

    /// 空闲块槽位的快照，按出队顺序
    pub fn free_block_slots(&self) -> Vec<usize> {
        self.block_free.lock().iter().copied().collect()
    }

    #[inline]
    pub fn inode(&self, slot: usize) -> Option<&Mutex<InodeInfo>> {
        self.inodes.get(slot)
    }

    #[inline]
    pub fn block(&self, slot: usize) -> Option<&Block> {
        self.blocks.get(slot)
    }

    /// `inode`块链上的块，按逻辑顺序
    pub fn chain<'a>(&'a self, inode: &'a InodeInfo) -> impl Iterator<Item = &'a Block> {
        inode.chain().iter().map(|&slot| &self.blocks[slot])
    }

    /// 从空闲队列头取出一个 inode，清空其大小与块链
    pub fn alloc_inode(&self, mode: Mode) -> Result<InodeId, Error> {
        let Some(slot) = self.inode_free.lock().pop_front() else {
            log::warn!("group {}: inode resource exhausted", self.id);
            return Err(Error::Exhausted(Resource::Inode));
        };

        let mut inode = self.inodes[slot].lock();
        inode.init(mode);
        log::debug!("group {}: alloc inode {}", self.id, inode.id());

        Ok(inode.id())
    }

    /// 归还 inode，连同它拥有的整条块链。
    ///
    /// 调用者持有`inode`的锁。
    pub fn release_inode(&self, inode: &mut InodeInfo) {
        if !inode.is_in_use() {
            log::warn!("group {}: inode {} released twice", self.id, inode.id());
            return;
        }

        let chain = inode.take_chain();
        for &slot in &chain {
            self.blocks[slot].zeroize();
        }
        log::debug!(
            "group {}: release inode {} with {} blocks",
            self.id,
            inode.id(),
            chain.len()
        );
        self.block_free.lock().extend(chain);

        inode.reset();
        self.inode_free.lock().push_back(inode.slot());
    }

    /// 从空闲队列头取出一个块，接到`inode`块链的末尾。
    ///
    /// 这是唯一会让块链变长的地方，块链的顺序就是分配的顺序。
    pub fn alloc_block(&self, inode: &mut InodeInfo) -> Result<BlockId, Error> {
        debug_assert_eq!(Some(self.id), inode.id().group());

        let Some(slot) = self.block_free.lock().pop_front() else {
            log::warn!("group {}: block resource exhausted", self.id);
            return Err(Error::Exhausted(Resource::Block));
        };

        if let Err(e) = inode.push_block(slot) {
            self.block_free.lock().push_front(slot);
            return Err(e);
        }

        let id = self.blocks[slot].id();
        log::debug!(
            "group {}: alloc block {id} for inode {}, {} blocks now",
            self.id,
            inode.id(),
            inode.block_count()
        );

        Ok(id)
    }
}

fn try_build<T>(
    count: usize,
    mut f: impl FnMut(usize) -> Result<T, Error>,
) -> Result<Box<[T]>, Error> {
    let mut items = Vec::new();
    items
        .try_reserve_exact(count)
        .map_err(|_| Error::AllocationFailure)?;
    for i in 0..count {
        items.push(f(i)?);
    }
    Ok(items.into_boxed_slice())
}

fn free_queue(count: usize) -> Result<Mutex<VecDeque<usize>>, Error> {
    let mut queue = VecDeque::new();
    queue
        .try_reserve_exact(count)
        .map_err(|_| Error::AllocationFailure)?;
    queue.extend(0..count);
    Ok(Mutex::new(queue))
}
