//! inode 描述符
//!
//! 描述符常驻于所属分组的数组中，按槽位编号。
//! 一个 inode 拥有一条块链，链上的块按分配顺序排列，
//! 第 i 个块承载文件的第`[i * 块大小, (i + 1) * 块大小)`字节。
//!
//! 始终满足：块数 * 块大小 >= 文件大小。

use alloc::vec::Vec;

use vfs::{Error, Mode, ReadBuf, Stat, WriteBuf};

use crate::InodeId;
use crate::config::PRIMARY_GROUP;
use crate::layout::{Block, Group};

#[derive(Debug)]
pub struct InodeInfo {
    /// ID
    id: InodeId,
    /// 组内槽位
    slot: usize,
    mode: Mode,
    /// 文件大小；对目录而言是已用目录区的字节数
    size: u64,
    /// 块链，存放组内块槽位
    chain: Vec<usize>,
    in_use: bool,
}

impl InodeInfo {
    pub fn new(id: InodeId, slot: usize) -> Self {
        Self {
            id,
            slot,
            mode: Mode::default(),
            size: 0,
            chain: Vec::new(),
            in_use: false,
        }
    }

    #[inline]
    pub fn init(&mut self, mode: Mode) {
        self.mode = mode;
        self.size = 0;
        self.chain.clear();
        self.in_use = true;
    }

    #[inline]
    pub fn reset(&mut self) {
        self.mode = Mode::default();
        self.size = 0;
        self.in_use = false;
    }

    #[inline]
    pub fn id(&self) -> InodeId {
        self.id
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.chain.len()
    }

    #[inline]
    pub fn chain(&self) -> &[usize] {
        &self.chain
    }

    #[inline]
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub(crate) fn push_block(&mut self, slot: usize) -> Result<(), Error> {
        self.chain
            .try_reserve(1)
            .map_err(|_| Error::AllocationFailure)?;
        self.chain.push(slot);
        Ok(())
    }

    pub(crate) fn take_chain(&mut self) -> Vec<usize> {
        core::mem::take(&mut self.chain)
    }

    pub(crate) fn grow_size(&mut self, size: u64) {
        self.size = self.size.max(size);
    }

    pub fn stat(&self, block_size: usize) -> Stat {
        Stat {
            inode: self.id.into(),
            mode: self.mode,
            block_size: block_size as u64,
            blocks: self.chain.len() as u64,
            size: self.size,
        }
    }

    /// 第`index`个逻辑块
    fn block<'a>(&self, index: usize, group: &'a Group) -> Option<&'a Block> {
        self.chain.get(index).and_then(|&slot| group.block(slot))
    }

    /// 从`offset`处读取至多`buf.len()`个字节，返回实际读取的字节数。
    ///
    /// 目的端接收不完整时，下一次从停下的位置继续；一个字节都接收不了就停止。
    pub fn read_at<B>(&self, offset: u64, buf: &mut B, group: &Group) -> Result<usize, Error>
    where
        B: ReadBuf + ?Sized,
    {
        if offset >= self.size {
            return Err(Error::InvalidOffset);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let block_size = group.block_size() as u64;
        let end = offset.saturating_add(buf.len() as u64).min(self.size);

        let mut start = offset;
        // 已读取多少字节
        let mut read_size = 0;
        while start < end {
            let Some(block) = self.block((start / block_size) as usize, group) else {
                break;
            };
            // 块内偏移
            let inner = (start % block_size) as usize;
            let chunk = (block_size - start % block_size).min(end - start) as usize;

            let moved = block.map(|data| buf.fill(read_size, &data[inner..inner + chunk]));
            if moved == 0 {
                log::debug!("inode {}: read stalled at {start}", self.id);
                break;
            }

            read_size += moved;
            start += moved as u64;
        }

        if read_size == 0 {
            return Err(Error::Fault);
        }

        Ok(read_size)
    }

    /// 把`buf`写到`offset`处，按需增长块链，返回实际写入的字节数。
    ///
    /// 起始位置所在的块分配失败时整体失败；
    /// 写到一半无块可用时停下，返回已写入的字节数。
    pub fn write_at<B>(&mut self, offset: u64, buf: &B, group: &Group) -> Result<usize, Error>
    where
        B: WriteBuf + ?Sized,
    {
        if buf.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(Error::InvalidOffset)?;
        if group.id() != PRIMARY_GROUP {
            log::debug!("inode {}: group {} is read-only", self.id, group.id());
            return Err(Error::NotWritable);
        }

        let block_size = group.block_size() as u64;
        let first = (offset / block_size) as usize;
        while self.chain.len() <= first {
            group.alloc_block(self)?;
        }

        let mut start = offset;
        // 已写入多少字节
        let mut write_size = 0;
        while start < end {
            let index = (start / block_size) as usize;
            if index == self.chain.len() {
                if let Err(e) = group.alloc_block(self) {
                    log::debug!("inode {}: write stopped at {start}: {e}", self.id);
                    break;
                }
            }
            let Some(block) = self.block(index, group) else {
                break;
            };
            let inner = (start % block_size) as usize;
            let chunk = (block_size - start % block_size).min(end - start) as usize;

            let moved = block.map_mut(|data| buf.drain(write_size, &mut data[inner..inner + chunk]));
            if moved == 0 {
                log::debug!("inode {}: write stalled at {start}", self.id);
                break;
            }

            write_size += moved;
            start += moved as u64;
            self.grow_size(start);
        }

        if write_size == 0 {
            return Err(Error::Fault);
        }

        Ok(write_size)
    }
}
