use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Error {
    /// 目标分组内没有空闲的 inode 或数据块
    #[display(fmt = "no free {} left in the target group", _0)]
    Exhausted(Resource),
    /// 目录区域已满
    #[display(fmt = "no space left in directory region")]
    NoSpace,
    #[display(fmt = "no such entry")]
    NotFound,
    #[display(fmt = "offset out of range")]
    InvalidOffset,
    #[display(fmt = "not a directory")]
    NotADirectory,
    #[display(fmt = "is a directory")]
    IsADirectory,
    /// 挂载时无法取得后备内存
    #[display(fmt = "backing storage allocation failed")]
    AllocationFailure,
    #[display(fmt = "entry already exists")]
    AlreadyExists,
    #[display(fmt = "invalid entry name")]
    InvalidName,
    /// 只有主分组内的 inode 可写
    #[display(fmt = "inode is not writable")]
    NotWritable,
    /// 打开方式不允许此操作
    #[display(fmt = "operation not permitted by open mode")]
    AccessDenied,
    /// 一次搬运都没成功
    #[display(fmt = "bad buffer address")]
    Fault,
    #[display(fmt = "no such inode")]
    InvalidInode,
    #[display(fmt = "invalid filesystem geometry")]
    InvalidGeometry,
}

/// 按分组管理的两类资源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Resource {
    #[display(fmt = "inode")]
    Inode,
    #[display(fmt = "block")]
    Block,
}

impl Error {
    /// 对应的 POSIX errno，宿主直接取负值返回给调用者
    pub const fn errno(self) -> i32 {
        match self {
            Self::Exhausted(_) | Self::NoSpace => 28,
            Self::NotFound | Self::InvalidInode => 2,
            Self::InvalidOffset
            | Self::InvalidName
            | Self::NotWritable
            | Self::InvalidGeometry => 22,
            Self::NotADirectory => 20,
            Self::IsADirectory => 21,
            Self::AllocationFailure => 12,
            Self::AlreadyExists => 17,
            Self::AccessDenied => 9,
            Self::Fault => 14,
        }
    }
}

impl core::error::Error for Error {}
