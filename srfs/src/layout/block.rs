//! 数据块

use alloc::boxed::Box;
use alloc::vec::Vec;

use spin::Mutex;
use vfs::Error;

use crate::BlockId;

/// 内存中的定长数据块。缓冲区分配后地址不变。
#[derive(Debug)]
pub struct Block {
    id: BlockId,
    data: Mutex<Box<[u8]>>,
}

impl Block {
    pub fn new(id: BlockId, size: usize) -> Result<Self, Error> {
        Ok(Self {
            id,
            data: Mutex::new(zeroed(size)?),
        })
    }

    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub fn map<V>(&self, f: impl FnOnce(&[u8]) -> V) -> V {
        f(&self.data.lock()[..])
    }

    #[inline]
    pub fn map_mut<V>(&self, f: impl FnOnce(&mut [u8]) -> V) -> V {
        f(&mut self.data.lock()[..])
    }

    #[inline]
    pub fn zeroize(&self) {
        self.data.lock().fill(0);
    }
}

/// 申请一段清零的缓冲，内存不足时报错而不是中止
pub(crate) fn zeroed(size: usize) -> Result<Box<[u8]>, Error> {
    let mut data = Vec::new();
    data.try_reserve_exact(size)
        .map_err(|_| Error::AllocationFailure)?;
    data.resize(size, 0);
    Ok(data.into_boxed_slice())
}
