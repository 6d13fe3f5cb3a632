use alloc::string::String;
use alloc::vec::Vec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Inode number
    pub inode: u64,
    pub ty: DirEntryType,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirEntryType {
    Directory,
    #[default]
    Regular,
    /// 目标 inode 已失效，类型无从得知
    Unknown,
}

/// 目录项的接收端，由宿主在枚举目录时提供。
///
/// 每次交付一项；返回`false`表示拒收，枚举随即停止，
/// 被拒收的项不计入读取进度，下次从它开始。
pub trait DirSink {
    fn accept(&mut self, entry: DirEntry) -> bool;
}

impl DirSink for Vec<DirEntry> {
    fn accept(&mut self, entry: DirEntry) -> bool {
        self.push(entry);
        true
    }
}
