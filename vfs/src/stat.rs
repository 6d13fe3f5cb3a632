use enumflags2::{BitFlags, bitflags};

use crate::DirEntryType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(32))]
pub struct Stat {
    /// Inode number
    pub inode: u64,
    pub mode: Mode,
    /// Optimal I/O block size
    pub block_size: u64,
    /// Occupying blocks
    pub blocks: u64,
    /// File size
    pub size: u64,
}

/// 文件系统整体的容量信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub magic: u64,
    pub block_size: u64,
    pub groups: u64,
    pub total_inodes: u64,
    pub free_inodes: u64,
    pub total_blocks: u64,
    pub free_blocks: u64,
}

/// 类型 + 权限位。权限只记录，不检查。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode {
    pub ty: DirEntryType,
    pub perm: BitFlags<Permission>,
}

#[bitflags]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    OtherExec = 0o001,
    OtherWrite = 0o002,
    OtherRead = 0o004,
    GroupExec = 0o010,
    GroupWrite = 0o020,
    GroupRead = 0o040,
    OwnerExec = 0o100,
    OwnerWrite = 0o200,
    OwnerRead = 0o400,
}

impl Mode {
    const S_IFDIR: u32 = 0o040000;
    const S_IFREG: u32 = 0o100000;

    #[inline]
    pub const fn new(ty: DirEntryType, perm: BitFlags<Permission>) -> Self {
        Self { ty, perm }
    }

    #[inline]
    pub const fn directory(perm: BitFlags<Permission>) -> Self {
        Self::new(DirEntryType::Directory, perm)
    }

    #[inline]
    pub const fn regular(perm: BitFlags<Permission>) -> Self {
        Self::new(DirEntryType::Regular, perm)
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.ty == DirEntryType::Directory
    }

    /// st_mode 形式的原始值
    pub fn bits(&self) -> u32 {
        let ty = match self.ty {
            DirEntryType::Directory => Self::S_IFDIR,
            DirEntryType::Regular => Self::S_IFREG,
            DirEntryType::Unknown => 0,
        };
        ty | u32::from(self.perm.bits())
    }
}

#[cfg(test)]
mod tests {
    use enumflags2::make_bitflags;

    use super::*;

    #[test]
    fn mode_bits() {
        let dir = Mode::directory(make_bitflags!(Permission::{OwnerRead | OwnerWrite | OwnerExec}));
        assert_eq!(0o040700, dir.bits());
        assert!(dir.is_dir());

        let file = Mode::regular(make_bitflags!(Permission::{OwnerRead | OwnerWrite | GroupRead | OtherRead}));
        assert_eq!(0o100644, file.bits());
        assert!(!Mode::default().is_dir());
    }
}
