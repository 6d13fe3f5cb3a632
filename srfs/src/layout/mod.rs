//! # 布局层
//!
//! 分组 | inode 描述符 | 数据块 | 目录项
//!
//! 所有存储都在挂载时一次分配好，运行期间只在空闲队列与块链之间流转。

mod block;
mod dir_entry;
mod group;
mod inode;

pub use self::{
    block::Block,
    dir_entry::{DirRecord, HEADER_SIZE, entry_size},
    group::Group,
    inode::InodeInfo,
};
