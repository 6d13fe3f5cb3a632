//! 宿主文件系统框架与具体文件系统之间的契约
//!
//! 具体文件系统只需认识这里的类型：目录项、权限、元信息、错误，
//! 以及读写时宿主提供的缓冲区与目录项接收端。

#![no_std]

extern crate alloc;

mod dirent;
mod error;
mod io;
mod stat;

pub use self::{
    dirent::{DirEntry, DirEntryType, DirSink},
    error::{Error, Resource},
    io::{ReadBuf, WriteBuf},
    stat::{Mode, Permission, Stat, StatFs},
};
