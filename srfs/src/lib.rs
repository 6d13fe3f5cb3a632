//! srfs: simple ram fs
//!
//! 固定容量的内存文件系统，数据不落盘。
//!
//! 自上而下：
//!
//! 1. 索引节点层：宿主使用的 [`Inode`] 与 [`File`]
//! 2. 控制层：[`RamFileSystem`]，轮转分配 inode，派发目录与文件操作
//! 3. 布局层：分组、inode 描述符、数据块、目录项编码

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
mod control;
mod id;
mod layout;
mod node;

pub use self::{
    config::Geometry,
    control::{DirEntries, RamFileSystem},
    id::{BlockId, GROUP_NR_OFFSET, INODE_ID_BASE, InodeId},
    layout::{Block, DirRecord, Group, HEADER_SIZE, InodeInfo, entry_size},
    node::{File, Inode, OpenFlag},
};
